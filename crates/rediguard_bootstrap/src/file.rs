//! The JSON configuration file.

use crate::error::BootstrapResult;
use rand::Rng;
use rediguard_core::ClientConfig;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::time::Duration;

const PREFIX_LEN: usize = 6;

/// Contents of the configuration file.
///
/// Field names match the on-disk JSON keys. `db` is accepted as an alias
/// for `select`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Server host.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Password, empty for none.
    pub password: String,
    /// Database index.
    #[serde(alias = "db")]
    pub select: u32,
    /// Connect timeout in seconds, 0 for none.
    pub timeout: u64,
    /// Default value expiry in seconds, 0 for none.
    pub expire: u64,
    /// Reuse a process-wide connection.
    pub persistent: bool,
    /// Key prefix.
    pub prefix: String,
    /// Token tying this file to its deployment directory.
    pub prefix_validate: String,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: String::new(),
            select: 0,
            timeout: 0,
            expire: 0,
            persistent: false,
            prefix: String::new(),
            prefix_validate: String::new(),
        }
    }
}

/// Explicit settings that win over the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Server host.
    pub host: Option<String>,
    /// Server port.
    pub port: Option<u16>,
    /// Password.
    pub password: Option<String>,
    /// Database index.
    pub select: Option<u32>,
    /// Connect timeout in seconds.
    pub timeout: Option<u64>,
    /// Default value expiry in seconds.
    pub expire: Option<u64>,
    /// Persistent connection.
    pub persistent: Option<bool>,
    /// Key prefix.
    pub prefix: Option<String>,
}

impl ConfigFile {
    /// A default configuration bound to `deployment_dir`, with a fresh
    /// random prefix.
    pub fn fresh(deployment_dir: &Path) -> Self {
        Self {
            prefix: random_prefix(),
            prefix_validate: validation_token(deployment_dir),
            ..Self::default()
        }
    }

    /// Loads the file at `path`, or writes and returns a fresh one.
    ///
    /// An existing file is used only if it parses and its `prefix_validate`
    /// matches `deployment_dir`. A missing, unparseable or foreign file is
    /// replaced.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read (other than not existing)
    /// or the replacement cannot be written.
    pub fn load_or_init(path: &Path, deployment_dir: &Path) -> BootstrapResult<Self> {
        match fs::read_to_string(path) {
            Ok(data) => {
                let token = validation_token(deployment_dir);
                match serde_json::from_str::<Self>(&data) {
                    Ok(file) if file.prefix_validate == token => {
                        tracing::debug!(path = %path.display(), "loaded config file");
                        return Ok(file);
                    }
                    Ok(_) => {
                        tracing::info!(path = %path.display(), "config file belongs to another deployment, regenerating");
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "config file unreadable, regenerating");
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "config file missing, creating");
            }
            Err(e) => return Err(e.into()),
        }

        let file = Self::fresh(deployment_dir);
        file.save(path)?;
        Ok(file)
    }

    /// Writes the file as pretty-printed JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save(&self, path: &Path) -> BootstrapResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Merges explicit settings over the file's values.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(host) = &overrides.host {
            self.host.clone_from(host);
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(password) = &overrides.password {
            self.password.clone_from(password);
        }
        if let Some(select) = overrides.select {
            self.select = select;
        }
        if let Some(timeout) = overrides.timeout {
            self.timeout = timeout;
        }
        if let Some(expire) = overrides.expire {
            self.expire = expire;
        }
        if let Some(persistent) = overrides.persistent {
            self.persistent = persistent;
        }
        if let Some(prefix) = &overrides.prefix {
            self.prefix.clone_from(prefix);
        }
    }

    /// Converts to a client configuration with default reconnect and lock
    /// settings.
    pub fn into_client_config(self) -> ClientConfig {
        ClientConfig::new(self.host, self.port)
            .with_password(self.password)
            .with_db(self.select)
            .with_connect_timeout(Duration::from_secs(self.timeout))
            .with_default_expire(self.expire)
            .with_persistent(self.persistent)
            .with_prefix(self.prefix)
    }
}

/// SHA-256 of the directory path, as lowercase hex.
pub fn validation_token(deployment_dir: &Path) -> String {
    let digest = Sha256::digest(deployment_dir.to_string_lossy().as_bytes());
    let mut token = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        let _ = write!(token, "{byte:02x}");
    }
    token
}

/// Six random lowercase hex characters followed by `_`.
pub fn random_prefix() -> String {
    let mut rng = rand::thread_rng();
    let mut prefix = String::with_capacity(PREFIX_LEN + 1);
    for _ in 0..PREFIX_LEN {
        let nibble: u32 = rng.gen_range(0..16);
        prefix.push(char::from_digit(nibble, 16).unwrap_or('0'));
    }
    prefix.push('_');
    prefix
}
