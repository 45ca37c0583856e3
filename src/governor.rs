//! Entry points for running the workflows.
//!
//! A [`Governor`] owns the resolved settings and the two outside-world
//! seams (cloud API and SSH connector). Every run goes through the
//! process-wide [`RunLock`]; a second request while one is in flight is
//! rejected with [`GovernorError::Busy`](crate::GovernorError::Busy).

use std::sync::Arc;

use tracing::{error, info};

use crate::cloud::{CloudApi, VultrClient};
use crate::config::GovernorConfig;
use crate::error::Result;
use crate::remote::{OpenSshConnector, ShellConnector};
use crate::routine::{PollPolicy, ProgressSink, Routine, RunLock, Step};
use crate::workflows::decommission::{self, DecommissionContext};
use crate::workflows::provision::{self, ProvisionContext, INSTANCE_POLL, SHELL_POLL};

/// What a successful provisioning run ended up with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionReport {
    pub instance_id: String,
    pub address: String,
    pub volume_id: String,
}

/// What a successful decommissioning run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecommissionReport {
    /// Id of the deleted instance, or `None` if there was nothing to delete.
    pub deleted: Option<String>,
}

pub struct Governor {
    config: GovernorConfig,
    cloud: Arc<dyn CloudApi>,
    connector: Arc<dyn ShellConnector>,
    lock: &'static RunLock,
    instance_poll: PollPolicy,
    shell_poll: PollPolicy,
}

impl Governor {
    pub fn new(
        config: GovernorConfig,
        cloud: Arc<dyn CloudApi>,
        connector: Arc<dyn ShellConnector>,
    ) -> Self {
        Self {
            config,
            cloud,
            connector,
            lock: RunLock::global(),
            instance_poll: INSTANCE_POLL,
            shell_poll: SHELL_POLL,
        }
    }

    /// Wire up the real Vultr client and the system `ssh` binary.
    pub fn from_config(config: GovernorConfig) -> Result<Self> {
        let cloud = VultrClient::new(&config.api_url, &config.api_key)?;
        Ok(Self::new(
            config,
            Arc::new(cloud),
            Arc::new(OpenSshConnector::new()),
        ))
    }

    /// Use `lock` instead of the process-wide lock.
    pub fn with_lock(mut self, lock: &'static RunLock) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_poll_policies(mut self, instance: PollPolicy, shell: PollPolicy) -> Self {
        self.instance_poll = instance;
        self.shell_poll = shell;
        self
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Bring the server up, reusing whatever already exists.
    pub fn provision(&self, sink: &mut dyn ProgressSink) -> Result<ProvisionReport> {
        self.lock.run_exclusive(|| self.run_provision(sink))
    }

    /// Delete the server. The world volume is kept.
    pub fn decommission(&self, sink: &mut dyn ProgressSink) -> Result<DecommissionReport> {
        self.lock.run_exclusive(|| self.run_decommission(sink))
    }

    fn run_provision(&self, sink: &mut dyn ProgressSink) -> Result<ProvisionReport> {
        info!(
            "Provisioning {} in {}",
            self.config.instance_label, self.config.region
        );

        let context = ProvisionContext::new(
            &self.config,
            Arc::clone(&self.cloud),
            Arc::clone(&self.connector),
        )
        .with_poll_policies(self.instance_poll, self.shell_poll);

        let mut routine = Routine::new(provision::entry(), context, sink);
        if let Err(e) = routine.run() {
            let step = routine.queued().map(|s| s.name()).unwrap_or("none");
            error!("Provisioning stopped at {}: {}", step, e);
            return Err(e);
        }

        let context = routine.into_context();
        Ok(ProvisionReport {
            instance_id: context.instance_id().unwrap_or_default().to_string(),
            address: context.instance_address().unwrap_or_default().to_string(),
            volume_id: context.volume_id().unwrap_or_default().to_string(),
        })
    }

    fn run_decommission(&self, sink: &mut dyn ProgressSink) -> Result<DecommissionReport> {
        info!(
            "Decommissioning {} in {}",
            self.config.instance_label, self.config.region
        );

        let context = DecommissionContext::new(&self.config, Arc::clone(&self.cloud));
        let mut routine = Routine::new(decommission::entry(), context, sink);
        if let Err(e) = routine.run() {
            let step = routine.queued().map(|s| s.name()).unwrap_or("none");
            error!("Decommissioning stopped at {}: {}", step, e);
            return Err(e);
        }

        let context = routine.into_context();
        Ok(DecommissionReport {
            deleted: context
                .deleted()
                .then(|| context.instance_id().unwrap_or_default().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cloud::MockCloud;
    use crate::error::GovernorError;
    use crate::remote::MockConnector;
    use crate::routine::RecordingSink;
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

    #[test]
    fn busy_lock_rejects_without_cloud_calls() {
        static LOCK: RunLock = RunLock::new();
        let cloud = Arc::new(MockCloud::new());
        let governor = Governor::new(config(), cloud.clone(), Arc::new(MockConnector::new()))
            .with_lock(&LOCK);

        let _held = LOCK.try_acquire().unwrap();
        let mut sink = RecordingSink::new();

        let err = governor.decommission(&mut sink).unwrap_err();
        assert!(matches!(err, GovernorError::Busy));
        assert!(cloud.calls().is_empty());
        assert!(sink.events().is_empty());
    }

    #[test]
    fn lock_released_after_failed_run() {
        static LOCK: RunLock = RunLock::new();
        let cloud = Arc::new(MockCloud::new().fail("list-instances", "down"));
        let governor = Governor::new(config(), cloud, Arc::new(MockConnector::new()))
            .with_lock(&LOCK);

        let mut sink = RecordingSink::new();
        assert!(governor.provision(&mut sink).is_err());
        assert!(!LOCK.is_held());
    }

    #[test]
    fn decommission_reports_nothing_deleted() {
        static LOCK: RunLock = RunLock::new();
        let governor = Governor::new(
            config(),
            Arc::new(MockCloud::new()),
            Arc::new(MockConnector::new()),
        )
        .with_lock(&LOCK);

        let report = governor.decommission(&mut RecordingSink::new()).unwrap();
        assert_eq!(report.deleted, None);
    }
}
