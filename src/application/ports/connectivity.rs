use tokio::sync::watch;

/// Best-effort view of whether the remote store is reachable.
pub trait ConnectivityService: Send + Sync {
    fn current(&self) -> bool;
    /// Receiver that observes every reachability change. The initial value is the current state.
    fn subscribe(&self) -> watch::Receiver<bool>;
}
