//! Device identity for scoping remote data to this installation.
//!
//! The identifier is generated once and stored as a plain text file in the
//! data directory:
//!
//! ```text
//! ~/.local/share/mood/
//! ├── device_id        # text file with the device identifier
//! └── entries.json     # local diary entries
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;

use uuid::Uuid;

/// Filename for the device identifier file.
const DEVICE_ID_FILE: &str = "device_id";

/// Stable identifier of the local installation.
#[derive(Clone, Debug)]
pub struct DeviceIdentity {
    data_dir: PathBuf,
}

impl DeviceIdentity {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// Returns the path to the device identifier file.
    pub fn path(&self) -> PathBuf {
        self.data_dir.join(DEVICE_ID_FILE)
    }

    /// Returns the stored device id, generating and persisting one if absent.
    ///
    /// Never fails. If the id cannot be stored, a fresh id is returned and the
    /// next call will generate another one.
    pub fn current_device_id(&self) -> String {
        match self.load() {
            Ok(Some(id)) => return id,
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "Failed to read device id"),
        }

        let id = Uuid::new_v4().to_string().to_uppercase();
        match self.store(&id) {
            Ok(()) => tracing::info!(device_id = %id, "Generated new device id"),
            Err(e) => tracing::warn!(error = %e, "Failed to persist device id"),
        }
        id
    }

    fn load(&self) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path()) {
            Ok(content) => {
                let content = content.trim();
                if content.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(content.to_string()))
                }
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn store(&self, id: &str) -> io::Result<()> {
        fs::create_dir_all(&self.data_dir)?;
        fs::write(self.path(), id)
    }
}
