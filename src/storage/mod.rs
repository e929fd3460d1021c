pub mod cache;
pub mod document_store;
pub mod kv_tier;
pub mod metadata_store;
pub mod remote_tier;

pub use cache::RedisCache;
pub use document_store::DocumentStore;
pub use kv_tier::KvTier;
pub use metadata_store::{IndexMetadataStore, IndexPatch};
pub use remote_tier::RemoteTier;
