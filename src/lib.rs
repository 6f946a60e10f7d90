//! Core library for the filecycle sample harness.
//!
//! The crate exposes a file-store abstraction for a remote share service, a
//! lifecycle runner that guarantees create → use → delete for every
//! provisioned resource, an in-memory store implementation, the basic and
//! advanced sample groups, and a janitor sweep that backstops their cleanup.

pub mod config;
pub mod janitor;
pub mod lifecycle;
pub mod memory;
pub mod samples;
pub mod store;
pub mod test_support;

pub use config::{ConfigError, StorageConfig};
pub use janitor::{Janitor, JanitorConfig, JanitorError, SweepSummary};
pub use lifecycle::{
    CleanupFailure, Lifecycle, LifecycleError, RunOutcome, Stage, Step, StepRecord,
};
pub use memory::MemoryStore;
pub use samples::{AdvancedSamples, BasicSamples, SampleError, StepError};
pub use store::{
    ByteRange, CopyState, CopyStatus, CorsRule, DirectoryRef, FileRef, FileStore, Metadata,
    MetricsPolicy, NameList, ResourceKind, RetentionPolicy, ServiceProperties,
    ServicePropertiesUpdate, ShareOptions, ShareRef, StoreError, unique_name, wait_for_copy,
};
