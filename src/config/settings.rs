//! Governor settings.
//!
//! Settings are resolved once, before any workflow starts. A missing or
//! malformed required setting aborts right there.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cloud::vultr::DEFAULT_API_URL;
use crate::error::{GovernorError, Result};

use super::env_file::EnvFile;

/// Setting names.
pub mod keys {
    pub const VULTR_API_KEY: &str = "VULTR_API_KEY";
    pub const VULTR_API_URL: &str = "VULTR_API_URL";
    pub const TARGET_INSTANCE_LABEL: &str = "TARGET_INSTANCE_LABEL";
    pub const TARGET_INSTANCE_REGION: &str = "TARGET_INSTANCE_REGION";
    pub const TARGET_INSTANCE_PLAN: &str = "TARGET_INSTANCE_PLAN";
    pub const TARGET_INSTANCE_OS_ID: &str = "TARGET_INSTANCE_OS_ID";
    pub const TARGET_SCRIPT_ID: &str = "TARGET_SCRIPT_ID";
    pub const TARGET_BLOCK_LABEL: &str = "TARGET_BLOCK_LABEL";
    pub const INSTANCE_SSH_KEY_PATH: &str = "INSTANCE_SSH_KEY_PATH";
    pub const INSTANCE_SSH_USER: &str = "INSTANCE_SSH_USER";
    pub const TARGET_MOUNT_POINT: &str = "TARGET_MOUNT_POINT";
    pub const TARGET_BLOCK_DEVICE: &str = "TARGET_BLOCK_DEVICE";
}

pub const DEFAULT_SSH_USER: &str = "root";
pub const DEFAULT_MOUNT_POINT: &str = "/mnt/minecraft";
pub const DEFAULT_BLOCK_DEVICE: &str = "/dev/sda";

/// Everything a workflow needs to know before it starts.
#[derive(Clone, PartialEq, Eq)]
pub struct GovernorConfig {
    pub api_key: String,
    pub api_url: String,
    pub instance_label: String,
    pub region: String,
    pub plan: String,
    pub os_id: u32,
    pub script_id: String,
    pub block_label: String,
    pub ssh_key_path: PathBuf,
    pub ssh_user: String,
    pub mount_point: String,
    pub block_device: String,
}

impl GovernorConfig {
    /// Resolve settings from a map of variables.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let api_key = required(vars, keys::VULTR_API_KEY)?;
        let os_id_raw = required(vars, keys::TARGET_INSTANCE_OS_ID)?;
        let os_id = os_id_raw
            .parse::<u32>()
            .map_err(|e| GovernorError::ConfigInvalid {
                key: keys::TARGET_INSTANCE_OS_ID.to_string(),
                message: format!("'{}' is not an OS id: {}", os_id_raw, e),
            })?;

        let mount_point = remote_path(vars, keys::TARGET_MOUNT_POINT, DEFAULT_MOUNT_POINT)?;
        let block_device = remote_path(vars, keys::TARGET_BLOCK_DEVICE, DEFAULT_BLOCK_DEVICE)?;

        Ok(Self {
            api_key,
            api_url: optional(vars, keys::VULTR_API_URL, DEFAULT_API_URL),
            instance_label: required(vars, keys::TARGET_INSTANCE_LABEL)?,
            region: required(vars, keys::TARGET_INSTANCE_REGION)?,
            plan: required(vars, keys::TARGET_INSTANCE_PLAN)?,
            os_id,
            script_id: required(vars, keys::TARGET_SCRIPT_ID)?,
            block_label: required(vars, keys::TARGET_BLOCK_LABEL)?,
            ssh_key_path: PathBuf::from(required(vars, keys::INSTANCE_SSH_KEY_PATH)?),
            ssh_user: optional(vars, keys::INSTANCE_SSH_USER, DEFAULT_SSH_USER),
            mount_point,
            block_device,
        })
    }

    /// Resolve settings from `env_file` (if it exists) overlaid by the
    /// process environment. Variables already set in the environment win.
    pub fn load(env_file: &Path) -> Result<Self> {
        let mut vars = EnvFile::load_optional(env_file)?;
        vars.extend(std::env::vars());
        Self::from_vars(&vars)
    }

    /// API key safe to print: the first four characters, then asterisks.
    pub fn masked_api_key(&self) -> String {
        let visible: String = self.api_key.chars().take(4).collect();
        let hidden = self.api_key.chars().count().saturating_sub(4);
        format!("{}{}", visible, "*".repeat(hidden))
    }
}

impl fmt::Debug for GovernorConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GovernorConfig")
            .field("api_key", &self.masked_api_key())
            .field("api_url", &self.api_url)
            .field("instance_label", &self.instance_label)
            .field("region", &self.region)
            .field("plan", &self.plan)
            .field("os_id", &self.os_id)
            .field("script_id", &self.script_id)
            .field("block_label", &self.block_label)
            .field("ssh_key_path", &self.ssh_key_path)
            .field("ssh_user", &self.ssh_user)
            .field("mount_point", &self.mount_point)
            .field("block_device", &self.block_device)
            .finish()
    }
}

fn required(vars: &HashMap<String, String>, key: &str) -> Result<String> {
    match vars.get(key).map(|v| v.trim()) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(GovernorError::ConfigMissing {
            key: key.to_string(),
        }),
    }
}

fn optional(vars: &HashMap<String, String>, key: &str, default: &str) -> String {
    match vars.get(key).map(|v| v.trim()) {
        Some(value) if !value.is_empty() => value.to_string(),
        _ => default.to_string(),
    }
}

/// An absolute path that is spliced into a remote shell command, so it may
/// only contain letters, digits, `/`, `.`, `_` and `-`.
fn remote_path(vars: &HashMap<String, String>, key: &str, default: &str) -> Result<String> {
    let value = optional(vars, key, default);
    if !value.starts_with('/') {
        return Err(GovernorError::ConfigInvalid {
            key: key.to_string(),
            message: format!("'{}' is not an absolute path", value),
        });
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-')))
    {
        return Err(GovernorError::ConfigInvalid {
            key: key.to_string(),
            message: format!("'{}' contains unsupported character {:?}", value, bad),
        });
    }
    Ok(value)
}
