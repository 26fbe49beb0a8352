pub mod postgrest;
pub mod schema;

pub use postgrest::PostgrestRemoteStore;
