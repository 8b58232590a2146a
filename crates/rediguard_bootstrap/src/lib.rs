//! # rediguard Bootstrap
//!
//! Loads client settings from a JSON file, creating one with defaults on
//! first use.
//!
//! A file is trusted only if its `prefix_validate` field matches a token
//! derived from the deployment directory. Moving or copying a deployment
//! therefore produces a fresh file with a new random key prefix, so two
//! deployments sharing one store never collide.
//!
//! ```rust,no_run
//! use rediguard_bootstrap::ConfigFile;
//! use std::path::Path;
//!
//! let file = ConfigFile::load_or_init(Path::new("config.json"), Path::new("/srv/app")).unwrap();
//! let config = file.into_client_config();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod file;

pub use error::{BootstrapError, BootstrapResult};
pub use file::{random_prefix, validation_token, ConfigFile, ConfigOverrides};
