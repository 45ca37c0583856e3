//! Decommissioning workflow.
//!
//! Deletes the labeled instance if it exists. The block storage volume is
//! never touched, so the world data survives for the next provision.

use std::sync::Arc;

use crate::cloud::CloudApi;
use crate::config::GovernorConfig;
use crate::error::Result;
use crate::routine::{ProgressSink, Step};

use super::{fail, record_once, require};

/// State for one decommissioning run.
pub struct DecommissionContext {
    cloud: Arc<dyn CloudApi>,
    pub instance_label: String,
    pub region: String,
    pub block_label: String,
    instance_id: Option<String>,
    deleted: bool,
}

impl DecommissionContext {
    pub fn new(config: &GovernorConfig, cloud: Arc<dyn CloudApi>) -> Self {
        Self {
            cloud,
            instance_label: config.instance_label.clone(),
            region: config.region.clone(),
            block_label: config.block_label.clone(),
            instance_id: None,
            deleted: false,
        }
    }

    /// Id of the instance found by [`DecommissionStep::LocateInstance`].
    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    /// Whether an instance was deleted during this run.
    pub fn deleted(&self) -> bool {
        self.deleted
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecommissionStep {
    LocateInstance,
    DeleteInstance,
}

/// First step of the workflow.
pub fn entry() -> DecommissionStep {
    DecommissionStep::LocateInstance
}

impl Step for DecommissionStep {
    type Context = DecommissionContext;

    fn name(&self) -> &'static str {
        match self {
            DecommissionStep::LocateInstance => "locate-instance",
            DecommissionStep::DeleteInstance => "delete-instance",
        }
    }

    fn execute(
        &self,
        ctx: &mut DecommissionContext,
        sink: &mut dyn ProgressSink,
    ) -> Result<Option<Self>> {
        match self {
            DecommissionStep::LocateInstance => locate_instance(ctx, sink),
            DecommissionStep::DeleteInstance => delete_instance(ctx, sink),
        }
    }
}

fn locate_instance(
    ctx: &mut DecommissionContext,
    sink: &mut dyn ProgressSink,
) -> Result<Option<DecommissionStep>> {
    sink.info(&format!("Looking for instance '{}'", ctx.instance_label));
    let instances = match ctx.cloud.list_instances(&ctx.instance_label, &ctx.region) {
        Ok(instances) => instances,
        Err(e) => return fail(sink, "Error occurred while fetching instances", e),
    };

    match instances.first() {
        Some(instance) => {
            record_once(&mut ctx.instance_id, &instance.id, "instance id");
            sink.info(&format!("Found instance, ID: {}", instance.id));
            Ok(Some(DecommissionStep::DeleteInstance))
        }
        None => {
            sink.info("No instance found, nothing to remove");
            Ok(None)
        }
    }
}

fn delete_instance(
    ctx: &mut DecommissionContext,
    sink: &mut dyn ProgressSink,
) -> Result<Option<DecommissionStep>> {
    let step = DecommissionStep::DeleteInstance.name();
    let id = require(sink, ctx.instance_id(), step, "an instance id")?.to_string();

    sink.info(&format!("Deleting instance {}", id));
    if let Err(e) = ctx.cloud.delete_instance(&id) {
        return fail(sink, "Error occurred while deleting instance", e);
    }
    ctx.deleted = true;
    sink.info("Instance deleted");
    sink.info(&format!("Block storage '{}' kept", ctx.block_label));

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::{CloudCall, Instance, MockCloud};
    use crate::error::GovernorError;
    use crate::routine::{ProgressLevel, RecordingSink, Routine};
    use std::collections::HashMap;

    fn config() -> GovernorConfig {
        let vars: HashMap<String, String> = [
            ("VULTR_API_KEY", "key"),
            ("TARGET_INSTANCE_LABEL", "mc-1"),
            ("TARGET_INSTANCE_REGION", "ams"),
            ("TARGET_INSTANCE_PLAN", "vc2-2c-4gb"),
            ("TARGET_INSTANCE_OS_ID", "1743"),
            ("TARGET_SCRIPT_ID", "s-1"),
            ("TARGET_BLOCK_LABEL", "world"),
            ("INSTANCE_SSH_KEY_PATH", "/keys/id"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
        GovernorConfig::from_vars(&vars).unwrap()
    }

    fn existing() -> Instance {
        Instance {
            id: "i-9".into(),
            label: "mc-1".into(),
            region: "ams".into(),
            main_ip: "9.9.9.9".into(),
            ..Default::default()
        }
    }

    #[test]
    fn missing_instance_finishes_without_delete() {
        let cloud = Arc::new(MockCloud::new());
        let mut ctx = DecommissionContext::new(&config(), cloud.clone());
        let mut sink = RecordingSink::new();

        let next = DecommissionStep::LocateInstance
            .execute(&mut ctx, &mut sink)
            .unwrap();

        assert_eq!(next, None);
        assert!(!ctx.deleted());
        assert_eq!(cloud.count(|c| matches!(c, CloudCall::DeleteInstance(_))), 0);
    }

    #[test]
    fn found_instance_is_deleted() {
        let cloud = Arc::new(MockCloud::new().with_instance(existing()));
        let ctx = DecommissionContext::new(&config(), cloud.clone());
        let mut sink = RecordingSink::new();

        let mut routine = Routine::new(entry(), ctx, &mut sink);
        routine.run().unwrap();
        let ctx = routine.into_context();

        assert!(ctx.deleted());
        assert_eq!(ctx.instance_id(), Some("i-9"));
        assert!(cloud.instances().is_empty());
        assert!(sink.contains("Instance deleted"));
    }

    #[test]
    fn delete_failure_is_terminal() {
        let cloud = Arc::new(
            MockCloud::new()
                .with_instance(existing())
                .fail("delete-instance", "locked"),
        );
        let ctx = DecommissionContext::new(&config(), cloud.clone());
        let mut sink = RecordingSink::new();

        let mut routine = Routine::new(entry(), ctx, &mut sink);
        let err = routine.run().unwrap_err();

        assert!(matches!(err, GovernorError::Api { .. }));
        assert_eq!(routine.queued(), Some(DecommissionStep::DeleteInstance));
        drop(routine);
        assert_eq!(
            sink.messages(ProgressLevel::Error),
            vec!["Error occurred while deleting instance"]
        );
    }

    #[test]
    fn delete_without_located_instance_is_missing_state() {
        let cloud = Arc::new(MockCloud::new());
        let mut ctx = DecommissionContext::new(&config(), cloud);
        let mut sink = RecordingSink::new();

        let err = DecommissionStep::DeleteInstance
            .execute(&mut ctx, &mut sink)
            .unwrap_err();
        assert!(matches!(err, GovernorError::MissingState { .. }));
        assert_eq!(
            sink.messages(ProgressLevel::Error),
            vec!["Cannot run delete-instance: an instance id is not known yet"]
        );
        assert!(!ctx.deleted());
    }
}
