//! On-disk session state.
//!
//! Lives in `~/.config/media-acquire/` (or `$XDG_CONFIG_HOME/media-acquire/`):
//! - `fingerprint`: guest identifier, created once and never rotated
//! - `session.json`: signed-in profile and access token, removed on logout

use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::{SessionError, UserProfile};

const APP_DIR_NAME: &str = "media-acquire";
const FINGERPRINT_FILE_NAME: &str = "fingerprint";
const SESSION_FILE_NAME: &str = "session.json";
const FINGERPRINT_PREFIX: &str = "guest_";
const FINGERPRINT_SEED_LEN: usize = 32;

/// Signed-in state as persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub profile: UserProfile,
    pub access_token: String,
}

/// Reads and writes session files under one state directory.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    /// Store rooted at an explicit directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the per-user config directory.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::StateDirUnavailable`] when neither
    /// `XDG_CONFIG_HOME` nor `HOME` (nor `APPDATA`) is set.
    pub fn at_default_location() -> Result<Self, SessionError> {
        Ok(Self::new(default_state_dir()?))
    }

    /// Directory holding the session files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the persisted guest fingerprint, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when the file cannot be read or written.
    pub fn load_or_create_fingerprint(&self) -> Result<String, SessionError> {
        let path = self.dir.join(FINGERPRINT_FILE_NAME);
        match fs::read_to_string(&path) {
            Ok(existing) => {
                let existing = existing.trim();
                if is_valid_fingerprint(existing) {
                    return Ok(existing.to_string());
                }
                warn!(path = %path.display(), "ignoring malformed fingerprint file");
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let fingerprint = generate_fingerprint();
        write_atomically(&path, fingerprint.as_bytes())?;
        debug!(path = %path.display(), "created guest fingerprint");
        Ok(fingerprint)
    }

    /// Loads the persisted signed-in session, if any.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] or [`SessionError::Json`] when the file
    /// exists but cannot be read or parsed.
    pub fn load_session(&self) -> Result<Option<StoredSession>, SessionError> {
        let path = self.session_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    /// Persists `session`, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] or [`SessionError::Json`] on failure.
    pub fn save_session(&self, session: &StoredSession) -> Result<(), SessionError> {
        let payload = serde_json::to_vec_pretty(session)?;
        let path = self.session_path();
        write_atomically(&path, &payload)?;
        set_owner_only_permissions(&path)?;
        Ok(())
    }

    /// Removes the persisted session. Returns whether one existed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when removal fails for a reason other
    /// than the file being absent.
    pub fn clear_session(&self) -> Result<bool, SessionError> {
        match fs::remove_file(self.session_path()) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE_NAME)
    }
}

fn default_state_dir() -> Result<PathBuf, SessionError> {
    resolve_state_dir(
        sanitize_env_path(env::var_os("XDG_CONFIG_HOME")),
        sanitize_env_path(env::var_os("HOME")),
        sanitize_env_path(env::var_os("APPDATA")),
    )
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(value))
}

fn resolve_state_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, SessionError> {
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join(APP_DIR_NAME));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join(APP_DIR_NAME));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join(APP_DIR_NAME));
    }
    Err(SessionError::StateDirUnavailable)
}

fn generate_fingerprint() -> String {
    let mut seed = [0_u8; FINGERPRINT_SEED_LEN];
    rand::thread_rng().fill_bytes(&mut seed);
    let digest = Sha256::digest(seed);
    format!("{FINGERPRINT_PREFIX}{}", hex_encode(&digest))
}

fn is_valid_fingerprint(value: &str) -> bool {
    value
        .strip_prefix(FINGERPRINT_PREFIX)
        .is_some_and(|hex| !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit()))
}

fn hex_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        out.push(char::from(HEX[usize::from(byte >> 4)]));
        out.push(char::from(HEX[usize::from(byte & 0x0f)]));
    }
    out
}

/// Writes through a sibling temp file and renames over `path`.
fn write_atomically(path: &Path, payload: &[u8]) -> Result<(), SessionError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, payload)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), SessionError> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    Ok(())
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), SessionError> {
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_session() -> StoredSession {
        StoredSession {
            profile: UserProfile {
                id: "u-1".to_string(),
                email: Some("u1@example.com".to_string()),
                name: None,
                avatar: None,
            },
            access_token: "tok".to_string(),
        }
    }

    #[test]
    fn test_fingerprint_is_created_once_and_reused() {
        let tempdir = TempDir::new().unwrap();
        let store = SessionStore::new(tempdir.path().join("state"));

        let first = store.load_or_create_fingerprint().unwrap();
        let second = store.load_or_create_fingerprint().unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("guest_"));
        assert_eq!(first.len(), "guest_".len() + 64);
    }

    #[test]
    fn test_malformed_fingerprint_is_replaced() {
        let tempdir = TempDir::new().unwrap();
        fs::write(tempdir.path().join(FINGERPRINT_FILE_NAME), "not-a-fingerprint").unwrap();
        let store = SessionStore::new(tempdir.path());

        let fingerprint = store.load_or_create_fingerprint().unwrap();

        assert!(is_valid_fingerprint(&fingerprint));
    }

    #[test]
    fn test_session_save_load_clear() {
        let tempdir = TempDir::new().unwrap();
        let store = SessionStore::new(tempdir.path());

        assert!(store.load_session().unwrap().is_none());
        store.save_session(&sample_session()).unwrap();
        assert_eq!(store.load_session().unwrap(), Some(sample_session()));
        assert!(!tempdir.path().join("session.tmp").exists());

        assert!(store.clear_session().unwrap());
        assert!(store.load_session().unwrap().is_none());
        assert!(!store.clear_session().unwrap());
    }

    #[test]
    fn test_corrupt_session_is_json_error() {
        let tempdir = TempDir::new().unwrap();
        fs::write(tempdir.path().join(SESSION_FILE_NAME), "{oops").unwrap();
        let store = SessionStore::new(tempdir.path());

        assert!(matches!(store.load_session(), Err(SessionError::Json(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let tempdir = TempDir::new().unwrap();
        let store = SessionStore::new(tempdir.path());
        store.save_session(&sample_session()).unwrap();

        let mode = fs::metadata(tempdir.path().join(SESSION_FILE_NAME))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[test]
    fn test_resolve_state_dir_prefers_xdg_over_home() {
        let resolved = resolve_state_dir(
            Some(PathBuf::from("/tmp/xdg")),
            Some(PathBuf::from("/tmp/home")),
            None,
        )
        .unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/xdg/media-acquire"));
    }

    #[test]
    fn test_resolve_state_dir_falls_back_to_home() {
        let resolved = resolve_state_dir(None, Some(PathBuf::from("/tmp/home")), None).unwrap();
        assert_eq!(resolved, PathBuf::from("/tmp/home/.config/media-acquire"));
    }

    #[test]
    fn test_resolve_state_dir_errors_when_all_sources_missing() {
        assert!(matches!(
            resolve_state_dir(None, None, None),
            Err(SessionError::StateDirUnavailable)
        ));
    }

    #[test]
    fn test_sanitize_env_path_rejects_blank_values() {
        assert!(sanitize_env_path(Some(OsString::from("  "))).is_none());
    }
}
