//! Connection files
//!
//! A connection file tells frontends where a kernel listens:
//!
//! ```json
//! {"ip": "127.0.0.1", "xrep_port": 5550, "pub_port": 5551,
//!  "req_port": 5552, "hb_port": 5553, "key": ""}
//! ```

use crate::error::KerneldError;
use kernel_api::KernelPorts;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Contents of a connection file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub ip: String,
    #[serde(flatten)]
    pub ports: KernelPorts,
    /// Signing key; empty when messages are unsigned
    #[serde(default)]
    pub key: String,
}

impl ConnectionInfo {
    /// Creates connection info for `ip` and `ports`
    pub fn new(ip: impl Into<String>, ports: KernelPorts, key: Option<&str>) -> Self {
        Self {
            ip: ip.into(),
            ports,
            key: key.unwrap_or_default().to_string(),
        }
    }

    /// Writes the file
    ///
    /// The JSON is staged in an owner-only temporary file next to `path` and
    /// renamed into place.
    pub fn write(&self, path: &Path) -> Result<(), KerneldError> {
        let failed = |source: io::Error| KerneldError::ConnectionFile {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_vec_pretty(self).map_err(|err| failed(err.into()))?;
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut staging = NamedTempFile::new_in(dir).map_err(failed)?;
        staging.write_all(&json).map_err(failed)?;
        staging.persist(path).map_err(|err| failed(err.error))?;
        tracing::info!(path = %path.display(), "wrote connection file");
        Ok(())
    }

    /// Reads a connection file
    pub fn read(path: &Path) -> Result<Self, KerneldError> {
        let bytes = fs::read(path).map_err(|source| KerneldError::ConnectionFile {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| KerneldError::InvalidConnectionFile {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kernel.json");
        let info = ConnectionInfo::new("127.0.0.1", KernelPorts::new(1, 2, 3, 4), Some("k"));

        info.write(&path).unwrap();
        assert_eq!(ConnectionInfo::read(&path).unwrap(), info);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_rewrite_replaces_previous_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kernel.json");
        fs::write(&path, b"stale").unwrap();

        let info = ConnectionInfo::new("127.0.0.1", KernelPorts::new(7, 8, 9, 10), None);
        info.write(&path).unwrap();
        assert_eq!(ConnectionInfo::read(&path).unwrap(), info);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_private_to_owner() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kernel.json");
        fs::write(&path, b"{}").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        ConnectionInfo::new("127.0.0.1", KernelPorts::new(1, 2, 3, 4), Some("secret"))
            .write(&path)
            .unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_flat_layout() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("kernel.json");
        ConnectionInfo::new("10.0.0.1", KernelPorts::new(5550, 5551, 5552, 5553), None)
            .write(&path)
            .unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(
            raw,
            json!({
                "ip": "10.0.0.1",
                "xrep_port": 5550,
                "pub_port": 5551,
                "req_port": 5552,
                "hb_port": 5553,
                "key": "",
            })
        );
    }

    #[test]
    fn test_missing_and_invalid_files() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            ConnectionInfo::read(&missing),
            Err(KerneldError::ConnectionFile { .. })
        ));

        let garbage = dir.path().join("garbage.json");
        fs::write(&garbage, b"{not json").unwrap();
        assert!(matches!(
            ConnectionInfo::read(&garbage),
            Err(KerneldError::InvalidConnectionFile { .. })
        ));
    }
}
