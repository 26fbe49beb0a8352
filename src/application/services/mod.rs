pub mod pos_service;
pub mod remote_applier;
pub mod sync_engine;
pub mod sync_queue_writer;

pub use pos_service::{
    CheckoutLine, CheckoutRequest, CreditPaymentRequest, InventoryAdjustmentRequest, PosService,
    Submission,
};
pub use remote_applier::RemoteApplier;
pub use sync_engine::SyncEngine;
pub use sync_queue_writer::SyncQueueWriter;
