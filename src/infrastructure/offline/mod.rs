mod mappers;
pub mod metrics;
mod rows;
pub mod sqlite_store;

pub use metrics::{SyncMetrics, SyncMetricsSnapshot};
pub use sqlite_store::SqliteOfflineStore;
