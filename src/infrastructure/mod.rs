pub mod connectivity;
pub mod database;
pub mod jobs;
pub mod offline;
pub mod remote;
pub mod session;

pub use connectivity::ConnectivityMonitor;
pub use session::SessionSlot;
