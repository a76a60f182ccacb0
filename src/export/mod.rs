//! Artifact persistence
//!
//! - [`ModelStore`]: bincode files under a root directory, committed atomically
//! - [`ArtifactCache`]: load-once, shareable slot used at serve time

mod cache;
mod store;

pub use cache::{ArtifactCache, CacheState};
pub use store::{
    Artifact, ModelStore, ARTIFACT_EXTENSION, FRAUD_MODEL, FRAUD_PREPROCESSOR, PRICE_MODEL,
    PRICE_PREPROCESSOR,
};
