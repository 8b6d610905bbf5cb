//! Per-installation device and owner identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::persist::{OpBackend, PersistResult};

/// Stable identifiers stamped on every operation from this installation.
///
/// `owner_id` is a placeholder until operations are attributed to an
/// authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Generated once per installation.
    pub device_id: String,
    /// Generated once per installation, prefixed with `local-`.
    pub owner_id: String,
}

impl DeviceIdentity {
    /// Generates a fresh identity.
    pub fn generate() -> Self {
        Self {
            device_id: Uuid::now_v7().to_string(),
            owner_id: format!("local-{}", Uuid::now_v7()),
        }
    }
}

/// Returns the identity stored in `backend`, creating and storing one on
/// first access.
pub fn provision(backend: &mut dyn OpBackend) -> PersistResult<DeviceIdentity> {
    if let Some(identity) = backend.load_identity()? {
        return Ok(identity);
    }

    let identity = DeviceIdentity::generate();
    backend.store_identity(&identity)?;
    tracing::info!(device_id = %identity.device_id, "provisioned new device identity");
    Ok(identity)
}
