//! Orchestrator (C8): sequences ingest → normalize/detect/persist →
//! rule-classify → LLM-classify → report over a single [`EngineContext`]
//! (`spec.md` §4.8).
//!
//! Each stage lives in its own module under [`stages`] as a plain function,
//! not a `Phase` trait object — [`run::run_pipeline`] drives them as an
//! ordered list, checkpointing `last_completed_stage` through the
//! Persistence Gateway after each one flushes, so a crash resumes from the
//! next unstarted stage rather than from scratch.

pub mod context;
pub mod run;
pub mod stages;

pub use context::EngineContext;
pub use run::{run_pipeline, RunReport};
pub use stages::report::KpiBlock;
