pub mod connectivity;
pub mod offline_store;
pub mod remote_store;
pub mod session;

pub use connectivity::ConnectivityService;
pub use offline_store::OfflineStore;
pub use remote_store::{
    Filter, FilterOp, Order, RemoteError, RemoteProcedure, RemoteStore, RemoteTable, Row,
    SelectQuery,
};
pub use session::SessionProvider;
