use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncOperationKind {
    Sale,
    Inventory,
    Payment,
}

impl SyncOperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncOperationKind::Sale => "sale",
            SyncOperationKind::Inventory => "inventory",
            SyncOperationKind::Payment => "payment",
        }
    }
}

impl FromStr for SyncOperationKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "sale" => Ok(SyncOperationKind::Sale),
            "inventory" => Ok(SyncOperationKind::Inventory),
            "payment" => Ok(SyncOperationKind::Payment),
            other => Err(format!("Unknown sync operation kind: {other}")),
        }
    }
}

impl fmt::Display for SyncOperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
