//! File-backed credential store
//!
//! Each key maps to one file named after the hex-encoded key, so arbitrary
//! identifiers (dots, tildes, slashes) never escape the store directory.
//! Long keys are split into nested directories of fixed-size hex segments
//! to stay below file name limits. Writes go to a temp file first and are
//! renamed into place.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{CredentialStore, StoreError};

/// Extension of credential files
const CREDENTIAL_EXTENSION: &str = "cred";

/// Hex characters per path segment, well below the usual 255 byte name limit
const SEGMENT_LEN: usize = 128;

/// Credential store persisting one file per key
///
/// Files are plain bytes; place the directory on encrypted storage or wrap
/// this store when encryption at rest is required.
pub struct FileCredentialStore {
    root: PathBuf,
}

impl FileCredentialStore {
    /// Open (and create if needed) a store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&root, fs::Permissions::from_mode(0o700))?;
        }

        Ok(Self { root })
    }

    /// Get the default store location
    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("warden")
            .join("credentials")
    }

    /// Directory holding the credential files
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let encoded = hex::encode(key);
        let mut segments: Vec<&str> = encoded
            .as_bytes()
            .chunks(SEGMENT_LEN)
            // hex output is ASCII
            .map(|chunk| std::str::from_utf8(chunk).unwrap_or_default())
            .collect();
        let file = segments.pop().unwrap_or_default();

        let mut path = self.root.clone();
        path.extend(segments);
        path.push(format!("{}.{}", file, CREDENTIAL_EXTENSION));
        path
    }

    /// Remove directories left empty by a deleted long key
    fn prune_empty_dirs(&self, path: &Path) {
        let mut dir = path.parent();
        while let Some(current) = dir {
            if current == self.root.as_path() || fs::remove_dir(current).is_err() {
                break;
            }
            dir = current.parent();
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let temp_path = path.with_extension("cred.tmp");
        fs::write(&temp_path, value)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&temp_path, fs::Permissions::from_mode(0o600))?;
        }

        fs::rename(&temp_path, &path)?;
        debug!(path = %path.display(), "Wrote credential file");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::metadata(&path) {
            Ok(metadata) => {
                // Overwrite with zeros before removal
                fs::write(&path, vec![0u8; metadata.len() as usize])?;
                fs::remove_file(&path)?;
                self.prune_empty_dirs(&path);
                debug!(path = %path.display(), "Removed credential file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
