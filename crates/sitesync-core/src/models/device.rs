//! Device identity model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Per-install provenance tag sent with every sync request.
///
/// Never used as a conflict key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Generate a fresh random device id
    #[must_use]
    pub fn generate() -> Self {
        Self(format!("dev_{}", Uuid::new_v4().simple()))
    }

    /// Wrap a previously persisted token
    pub fn from_persisted(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_unique() {
        let id1 = DeviceId::generate();
        let id2 = DeviceId::generate();
        assert_ne!(id1, id2);
        assert!(id1.as_str().starts_with("dev_"));
    }
}
