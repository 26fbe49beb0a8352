use crate::domain::entities::AuthSession;

pub trait SessionProvider: Send + Sync {
    fn current(&self) -> Option<AuthSession>;
}
