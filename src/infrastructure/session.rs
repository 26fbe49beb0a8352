use crate::application::ports::session::SessionProvider;
use crate::domain::entities::AuthSession;
use std::sync::RwLock;

/// Holds the signed-in identity for the process.
#[derive(Default)]
pub struct SessionSlot {
    current: RwLock<Option<AuthSession>>,
}

impl SessionSlot {
    pub fn new(session: Option<AuthSession>) -> Self {
        Self {
            current: RwLock::new(session),
        }
    }

    pub fn sign_in(&self, session: AuthSession) {
        if let Ok(mut guard) = self.current.write() {
            *guard = Some(session);
        }
        tracing::info!(
            target: "sync::agent",
            user_id = %session.user_id,
            organization_id = %session.organization_id,
            "session started"
        );
    }

    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.current.write() {
            *guard = None;
        }
    }
}

impl SessionProvider for SessionSlot {
    fn current(&self) -> Option<AuthSession> {
        self.current.read().ok().and_then(|guard| *guard)
    }
}
