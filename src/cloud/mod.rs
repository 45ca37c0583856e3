//! Cloud resource API.
//!
//! Workflows talk to the provider through [`CloudApi`]. [`VultrClient`] is
//! the real implementation; [`MockCloud`] records calls for tests.

pub mod mock;
pub mod vultr;

use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use mock::{CloudCall, MockCloud};
pub use vultr::VultrClient;

/// Address the provider reports before a real one has been assigned.
const UNASSIGNED_ADDRESS: &str = "0.0.0.0";

/// A compute instance as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Instance {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub main_ip: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub power_status: String,
    #[serde(default)]
    pub server_status: String,
}

impl Instance {
    /// Public address, if one has been assigned yet.
    pub fn address(&self) -> Option<&str> {
        match self.main_ip.as_str() {
            "" | UNASSIGNED_ADDRESS => None,
            ip => Some(ip),
        }
    }

    /// Active, powered on, and past its install phase.
    pub fn is_ready(&self) -> bool {
        self.status == "active" && self.power_status == "running" && self.server_status == "ok"
    }

    /// Short status description for progress messages.
    pub fn status_line(&self) -> String {
        format!(
            "status={} power={} server={}",
            self.status, self.power_status, self.server_status
        )
    }
}

/// A block storage volume.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub size_gb: u32,
    #[serde(default)]
    pub attached_to_instance: String,
}

impl Volume {
    /// Instance the volume is attached to, if any.
    pub fn attached_to(&self) -> Option<&str> {
        if self.attached_to_instance.is_empty() {
            None
        } else {
            Some(&self.attached_to_instance)
        }
    }
}

/// Parameters for creating an instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstanceRequest {
    pub label: String,
    pub region: String,
    pub plan: String,
    pub os_id: u32,
    pub script_id: String,
}

/// Parameters for creating a volume.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeRequest {
    pub region: String,
    pub label: String,
    pub size_gb: u32,
}

/// Operations the workflows need from the provider.
///
/// Every error is terminal for the step that triggered it.
pub trait CloudApi: Send + Sync {
    /// Instances whose label and region match exactly.
    fn list_instances(&self, label: &str, region: &str) -> Result<Vec<Instance>>;

    fn create_instance(&self, request: &InstanceRequest) -> Result<Instance>;

    fn get_instance(&self, id: &str) -> Result<Instance>;

    fn delete_instance(&self, id: &str) -> Result<()>;

    /// Volumes whose label matches exactly.
    fn list_volumes(&self, label: &str) -> Result<Vec<Volume>>;

    fn create_volume(&self, request: &VolumeRequest) -> Result<Volume>;

    fn attach_volume(&self, volume_id: &str, instance_id: &str, live: bool) -> Result<()>;
}
