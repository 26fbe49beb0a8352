mod fixed_point;
pub mod money;
pub mod payload;
pub mod sync_operation_kind;
pub mod sync_queue_id;

pub use money::{Money, Quantity};
pub use payload::SyncPayload;
pub use sync_operation_kind::SyncOperationKind;
pub use sync_queue_id::SyncQueueId;
