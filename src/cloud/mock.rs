//! In-memory cloud for tests.
//!
//! `MockCloud` implements [`CloudApi`] against a small in-memory inventory
//! and records every call so tests can assert on what a workflow did.
//!
//! # Example
//!
//! ```
//! use mcgov::cloud::{CloudApi, CloudCall, MockCloud};
//!
//! let cloud = MockCloud::new();
//! assert!(cloud.list_instances("mc-1", "ams").unwrap().is_empty());
//! assert_eq!(cloud.count(|c| matches!(c, CloudCall::ListInstances { .. })), 1);
//! ```

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{GovernorError, Result};

use super::{CloudApi, Instance, InstanceRequest, Volume, VolumeRequest};

/// One recorded call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloudCall {
    ListInstances { label: String, region: String },
    CreateInstance(InstanceRequest),
    GetInstance(String),
    DeleteInstance(String),
    ListVolumes(String),
    CreateVolume(VolumeRequest),
    AttachVolume {
        volume_id: String,
        instance_id: String,
        live: bool,
    },
}

impl CloudCall {
    /// Operation name, as used by [`MockCloud::fail`].
    pub fn operation(&self) -> &'static str {
        match self {
            CloudCall::ListInstances { .. } => "list-instances",
            CloudCall::CreateInstance(_) => "create-instance",
            CloudCall::GetInstance(_) => "get-instance",
            CloudCall::DeleteInstance(_) => "delete-instance",
            CloudCall::ListVolumes(_) => "list-volumes",
            CloudCall::CreateVolume(_) => "create-volume",
            CloudCall::AttachVolume { .. } => "attach-volume",
        }
    }
}

#[derive(Debug)]
struct State {
    instances: Vec<Instance>,
    volumes: Vec<Volume>,
    calls: Vec<CloudCall>,
    failures: HashMap<&'static str, String>,
    polls: HashMap<String, u32>,
    unready_polls: u32,
    next_address: String,
    created_instances: u32,
    created_volumes: u32,
}

/// Recording fake for [`CloudApi`].
#[derive(Debug)]
pub struct MockCloud {
    state: Mutex<State>,
}

impl MockCloud {
    /// Empty inventory. New instances get address `1.2.3.4` and report
    /// ready on their first status poll.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                instances: Vec::new(),
                volumes: Vec::new(),
                calls: Vec::new(),
                failures: HashMap::new(),
                polls: HashMap::new(),
                unready_polls: 0,
                next_address: "1.2.3.4".to_string(),
                created_instances: 0,
                created_volumes: 0,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Seed an existing instance.
    pub fn with_instance(self, instance: Instance) -> Self {
        self.state().instances.push(instance);
        self
    }

    /// Seed an existing volume.
    pub fn with_volume(self, volume: Volume) -> Self {
        self.state().volumes.push(volume);
        self
    }

    /// Address handed to the next created instance. An empty string or
    /// `0.0.0.0` means the address only appears once the instance is ready.
    pub fn with_next_address(self, address: &str) -> Self {
        self.state().next_address = address.to_string();
        self
    }

    /// Number of status polls that report "not ready" before an instance
    /// becomes ready. `u32::MAX` means never.
    pub fn with_unready_polls(self, polls: u32) -> Self {
        self.state().unready_polls = polls;
        self
    }

    /// Make every call to `operation` fail with `message`.
    pub fn fail(self, operation: &'static str, message: &str) -> Self {
        self.state().failures.insert(operation, message.to_string());
        self
    }

    /// All calls so far, in order.
    pub fn calls(&self) -> Vec<CloudCall> {
        self.state().calls.clone()
    }

    /// Number of calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&CloudCall) -> bool) -> usize {
        self.state().calls.iter().filter(|c| predicate(c)).count()
    }

    /// Current instance inventory.
    pub fn instances(&self) -> Vec<Instance> {
        self.state().instances.clone()
    }

    /// Current volume inventory.
    pub fn volumes(&self) -> Vec<Volume> {
        self.state().volumes.clone()
    }

    fn record(&self, call: CloudCall) -> Result<MutexGuard<'_, State>> {
        let mut state = self.state();
        let operation = call.operation();
        state.calls.push(call);
        if let Some(message) = state.failures.get(operation) {
            return Err(GovernorError::Api {
                operation: operation.to_string(),
                status: 500,
                message: message.clone(),
            });
        }
        Ok(state)
    }
}

impl Default for MockCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl CloudApi for MockCloud {
    fn list_instances(&self, label: &str, region: &str) -> Result<Vec<Instance>> {
        let state = self.record(CloudCall::ListInstances {
            label: label.to_string(),
            region: region.to_string(),
        })?;
        Ok(state
            .instances
            .iter()
            .filter(|i| i.label == label && i.region == region)
            .cloned()
            .collect())
    }

    fn create_instance(&self, request: &InstanceRequest) -> Result<Instance> {
        let mut state = self.record(CloudCall::CreateInstance(request.clone()))?;
        state.created_instances += 1;
        let instance = Instance {
            id: format!("i-{}", state.created_instances),
            label: request.label.clone(),
            region: request.region.clone(),
            main_ip: state.next_address.clone(),
            status: "pending".to_string(),
            power_status: "stopped".to_string(),
            server_status: "none".to_string(),
        };
        state.instances.push(instance.clone());
        Ok(instance)
    }

    fn get_instance(&self, id: &str) -> Result<Instance> {
        let mut state = self.record(CloudCall::GetInstance(id.to_string()))?;
        let polls = {
            let count = state.polls.entry(id.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let ready = polls > state.unready_polls;

        let instance = state
            .instances
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| GovernorError::Api {
                operation: "get-instance".to_string(),
                status: 404,
                message: format!("instance {} not found", id),
            })?;

        if ready {
            instance.status = "active".to_string();
            instance.power_status = "running".to_string();
            instance.server_status = "ok".to_string();
            if instance.address().is_none() {
                instance.main_ip = "1.2.3.4".to_string();
            }
        } else {
            instance.server_status = "installingbooting".to_string();
        }
        Ok(instance.clone())
    }

    fn delete_instance(&self, id: &str) -> Result<()> {
        let mut state = self.record(CloudCall::DeleteInstance(id.to_string()))?;
        let before = state.instances.len();
        state.instances.retain(|i| i.id != id);
        if state.instances.len() == before {
            return Err(GovernorError::Api {
                operation: "delete-instance".to_string(),
                status: 404,
                message: format!("instance {} not found", id),
            });
        }
        Ok(())
    }

    fn list_volumes(&self, label: &str) -> Result<Vec<Volume>> {
        let state = self.record(CloudCall::ListVolumes(label.to_string()))?;
        Ok(state
            .volumes
            .iter()
            .filter(|v| v.label == label)
            .cloned()
            .collect())
    }

    fn create_volume(&self, request: &VolumeRequest) -> Result<Volume> {
        let mut state = self.record(CloudCall::CreateVolume(request.clone()))?;
        state.created_volumes += 1;
        let volume = Volume {
            id: format!("v-{}", state.created_volumes),
            label: request.label.clone(),
            region: request.region.clone(),
            size_gb: request.size_gb,
            attached_to_instance: String::new(),
        };
        state.volumes.push(volume.clone());
        Ok(volume)
    }

    fn attach_volume(&self, volume_id: &str, instance_id: &str, live: bool) -> Result<()> {
        let mut state = self.record(CloudCall::AttachVolume {
            volume_id: volume_id.to_string(),
            instance_id: instance_id.to_string(),
            live,
        })?;
        let volume = state
            .volumes
            .iter_mut()
            .find(|v| v.id == volume_id)
            .ok_or_else(|| GovernorError::Api {
                operation: "attach-volume".to_string(),
                status: 404,
                message: format!("volume {} not found", volume_id),
            })?;
        volume.attached_to_instance = instance_id.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(label: &str) -> InstanceRequest {
        InstanceRequest {
            label: label.to_string(),
            region: "ams".to_string(),
            plan: "vc2-1c-1gb".to_string(),
            os_id: 1743,
            script_id: String::new(),
        }
    }

    #[test]
    fn created_instances_get_sequential_ids() {
        let cloud = MockCloud::new();
        assert_eq!(cloud.create_instance(&request("a")).unwrap().id, "i-1");
        assert_eq!(cloud.create_instance(&request("b")).unwrap().id, "i-2");
        assert_eq!(cloud.list_instances("b", "ams").unwrap().len(), 1);
    }

    #[test]
    fn instance_becomes_ready_after_unready_polls() {
        let cloud = MockCloud::new().with_unready_polls(2);
        let id = cloud.create_instance(&request("a")).unwrap().id;

        assert!(!cloud.get_instance(&id).unwrap().is_ready());
        assert!(!cloud.get_instance(&id).unwrap().is_ready());
        assert!(cloud.get_instance(&id).unwrap().is_ready());
    }

    #[test]
    fn address_appears_when_ready() {
        let cloud = MockCloud::new().with_next_address("0.0.0.0");
        let created = cloud.create_instance(&request("a")).unwrap();
        assert_eq!(created.address(), None);
        assert_eq!(cloud.get_instance(&created.id).unwrap().address(), Some("1.2.3.4"));
    }

    #[test]
    fn injected_failure_is_recorded_and_returned() {
        let cloud = MockCloud::new().fail("list-volumes", "token expired");
        let err = cloud.list_volumes("world").unwrap_err();
        assert!(err.to_string().contains("token expired"));
        assert_eq!(cloud.calls(), vec![CloudCall::ListVolumes("world".to_string())]);
    }

    #[test]
    fn attach_marks_volume() {
        let cloud = MockCloud::new();
        let volume = cloud
            .create_volume(&VolumeRequest {
                region: "ams".into(),
                label: "world".into(),
                size_gb: 10,
            })
            .unwrap();
        cloud.attach_volume(&volume.id, "i-7", true).unwrap();
        assert_eq!(cloud.volumes()[0].attached_to(), Some("i-7"));
    }

    #[test]
    fn delete_unknown_instance_fails() {
        let cloud = MockCloud::new();
        assert!(cloud.delete_instance("i-404").is_err());
    }
}
