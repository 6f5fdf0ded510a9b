//! Evidence Bundle Assembler (C9): renders a run's persisted state into the
//! canonical, checksum-verified file tree the AIMO Standard defines
//! (`spec.md` §4.9).

pub mod checksums;
pub mod error;
pub mod logs;
pub mod manifest;
pub mod taxonomy_assignments;
pub mod writer;

pub use checksums::{build_checksum_manifest, ChecksumManifest};
pub use error::BundleError;
pub use logs::{build_agent_activity_record, build_shadow_ai_discovery_record, AgentActivityRecord, Decision, ShadowAiDiscoveryRecord};
pub use manifest::{aggregate_taxonomy_summary, build_run_manifest, evidence_file_refs, EvidenceFileRef, EvidencePackManifest, ExtractionParameters, ManifestVersions, RunManifest};
pub use taxonomy_assignments::{build_taxonomy_assignment_record, TaxonomyAssignmentRecord};
pub use writer::{emit_bundle, BundleOutput, BundleRequest};
