pub mod catalog;
pub mod credit;
pub mod drain_report;
pub mod inventory;
pub mod sale;
pub mod session;
pub mod sync_operation;
pub mod sync_queue_entry;

pub use catalog::{Customer, Product};
pub use credit::{Credit, CreditPayment, CreditTransaction, CreditTransactionType, LedgerError};
pub use drain_report::{DrainReport, DrainTrigger, ReplayFailure, SkipReason};
pub use inventory::{AdjustmentType, InventoryAdjustment, InventoryItem};
pub use sale::{PaymentType, Sale, SaleItem, SalePayload};
pub use session::AuthSession;
pub use sync_operation::SyncOperation;
pub use sync_queue_entry::SyncQueueEntry;
