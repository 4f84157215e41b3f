pub mod cache;
pub mod config;
pub mod discovery;
pub mod error;
pub mod parser;
pub mod publish;
pub mod registry;
pub mod store;
pub mod transform;
pub mod analyzer {
    pub mod adapter;
    pub mod command;
    pub mod extract;
    pub mod metadata;
}
#[cfg(feature = "napi-bindings")]
pub mod bridge;

// Re-export selected API for consumers
pub use analyzer::adapter::{AnalyzeRequest, Analyzer};
pub use analyzer::metadata::ComponentMetadata;
pub use cache::{CacheEntry, EntryStatus};
pub use config::EngineOptions;
pub use error::{EngineError, EntryFailure, FailureKind};
pub use parser::ComponentMetaParser;
pub use publish::{ComponentRecord, PublishedSnapshot, QueryableSet};
pub use registry::{ComponentDescriptor, ComponentIdentity};
