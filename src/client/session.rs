use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::board::models::UserView;
use crate::errors::ClientError;

/// Explicit authentication context: who is logged in, where, with which token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub server: String,
    pub token: String,
    pub user: UserView,
}

/// Reads and writes the session file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved session. A missing file means "not logged in".
    pub fn load(&self) -> Result<Option<Session>, ClientError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.error(anyhow::Error::new(e).context("Failed to read session"))),
        };
        toml::from_str(&contents)
            .context("Failed to parse session file")
            .map(Some)
            .map_err(|e| self.error(e))
    }

    /// Like `load`, but a missing session is `ClientError::NotLoggedIn`.
    pub fn require(&self) -> Result<Session, ClientError> {
        self.load()?.ok_or(ClientError::NotLoggedIn)
    }

    pub fn save(&self, session: &Session) -> Result<(), ClientError> {
        self.write(session).map_err(|e| self.error(e))
    }

    fn write(&self, session: &Session) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).context("Failed to create session directory")?;
        }
        let contents = toml::to_string_pretty(session).context("Failed to serialize session")?;
        std::fs::write(&self.path, contents).context("Failed to write session file")?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .context("Failed to restrict session file permissions")?;
        }
        Ok(())
    }

    /// Remove the session file. Returns whether one existed.
    pub fn clear(&self) -> Result<bool, ClientError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(self.error(anyhow::Error::new(e).context("Failed to remove session"))),
        }
    }

    fn error(&self, source: anyhow::Error) -> ClientError {
        ClientError::Session {
            path: self.path.clone(),
            source,
        }
    }
}
