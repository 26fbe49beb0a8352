use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity stamped on every row written to the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub user_id: Uuid,
    pub organization_id: Uuid,
}

impl AuthSession {
    pub fn new(user_id: Uuid, organization_id: Uuid) -> Self {
        Self {
            user_id,
            organization_id,
        }
    }
}
