//! Configuration loading.
//!
//! - [`EnvFile`] parses `.env` files
//! - [`GovernorConfig`] resolves and validates the settings a run needs
//!
//! # Example
//!
//! ```
//! use mcgov::config::GovernorConfig;
//! use std::collections::HashMap;
//!
//! let vars: HashMap<String, String> = [
//!     ("VULTR_API_KEY", "key"),
//!     ("TARGET_INSTANCE_LABEL", "mc-1"),
//!     ("TARGET_INSTANCE_REGION", "ams"),
//!     ("TARGET_INSTANCE_PLAN", "vc2-2c-4gb"),
//!     ("TARGET_INSTANCE_OS_ID", "1743"),
//!     ("TARGET_SCRIPT_ID", "script"),
//!     ("TARGET_BLOCK_LABEL", "world"),
//!     ("INSTANCE_SSH_KEY_PATH", "/keys/id_ed25519"),
//! ]
//! .into_iter()
//! .map(|(k, v)| (k.to_string(), v.to_string()))
//! .collect();
//!
//! let config = GovernorConfig::from_vars(&vars).unwrap();
//! assert_eq!(config.mount_point, "/mnt/minecraft");
//! ```

pub mod env_file;
pub mod settings;

pub use env_file::EnvFile;
pub use settings::{keys, GovernorConfig};
