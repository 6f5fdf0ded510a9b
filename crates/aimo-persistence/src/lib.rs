//! Persistence Gateway (`spec.md` §4.1): the single writer onto the engine's
//! SQLite store, with a bounded queue, a dedicated writer thread, and a
//! narrow set of write operations that every other crate shares instead of
//! opening their own connections.

pub mod compat;
pub mod error;
pub mod gateway;
pub mod ops;
pub mod schema;

pub use error::PersistError;
pub use gateway::{FlushReport, PersistenceGateway};
pub use ops::{dedup_batch, WriteOp};
