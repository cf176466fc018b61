//! gasp-admanager
//!
//! Remote side of the sync: the ad-platform service boundary, the per-run
//! lookup cache, the four entity synchronizers and the pipeline that runs
//! them in dependency order.

pub mod cache;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod service;
pub mod sync;

pub use cache::{entity_id, AdManager, LookupCache, LookupKey, RemoteCallStats};
pub use error::{ConfigurationError, ObjectNotFound, RemoteError, SyncError};
pub use http::HttpAdManagerClient;
pub use pipeline::{Pipeline, SyncReport};
pub use service::{endpoints, AdManagerService, Endpoint, Predicate, Statement};
pub use sync::{StageReport, SyncSettings, MAX_CHUNK_SIZE};
