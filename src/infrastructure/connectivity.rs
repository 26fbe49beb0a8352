use crate::application::ports::connectivity::ConnectivityService;
use tokio::sync::watch;

/// Reachability flag fed by platform signals. Subscribers only wake on real transitions.
pub struct ConnectivityMonitor {
    sender: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (sender, _) = watch::channel(initially_online);
        Self { sender }
    }

    pub fn became_reachable(&self) {
        self.set_online(true);
    }

    pub fn became_unreachable(&self) {
        self.set_online(false);
    }

    /// Returns whether the state changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.sender.send_if_modified(|current| {
            if *current == online {
                return false;
            }
            *current = online;
            true
        });
        if changed {
            if online {
                tracing::info!(target: "connectivity", "back online");
            } else {
                tracing::info!(target: "connectivity", "offline mode");
            }
        }
        changed
    }
}

impl ConnectivityService for ConnectivityMonitor {
    fn current(&self) -> bool {
        *self.sender.borrow()
    }

    fn subscribe(&self) -> watch::Receiver<bool> {
        self.sender.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn only_transitions_notify_subscribers() {
        let monitor = ConnectivityMonitor::new(false);
        let mut receiver = monitor.subscribe();
        assert!(!monitor.current());

        monitor.became_unreachable();
        assert!(!receiver.has_changed().unwrap());

        monitor.became_reachable();
        receiver.changed().await.unwrap();
        assert!(*receiver.borrow_and_update());
        assert!(monitor.current());

        assert!(!monitor.set_online(true));
        assert!(!receiver.has_changed().unwrap());
    }
}
