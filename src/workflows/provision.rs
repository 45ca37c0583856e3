//! Provisioning workflow.
//!
//! Steps, in nominal order:
//!
//! 1. [`ProvisionStep::CheckInstanceExists`] - reuse a labeled instance if
//!    one exists, which makes the whole workflow safe to re-run
//! 2. [`ProvisionStep::CreateInstance`]
//! 3. [`ProvisionStep::WaitForInstanceActive`] - bounded status polling
//! 4. [`ProvisionStep::FindOrCreateBlockStorage`] - same reuse rule for
//!    the volume
//! 5. [`ProvisionStep::AwaitRemoteShell`] - bounded SSH polling
//! 6. [`ProvisionStep::AttachBlockStorage`]
//! 7. [`ProvisionStep::MountVolume`]
//!
//! A failed run leaves whatever it created in place; the next run picks
//! those resources up again through steps 1 and 4.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::cloud::{CloudApi, InstanceRequest, VolumeRequest};
use crate::config::GovernorConfig;
use crate::error::{GovernorError, Result};
use crate::remote::{RemoteShell, ShellConnector, SshKey};
use crate::routine::{AttemptCounter, PollPolicy, ProgressSink, Step};

use super::{fail, missing, record_once, require};

/// Attempt counter key for instance status polling.
pub const WAIT_FOR_INSTANCE: &str = "wait_for_instance";
/// Attempt counter key for SSH polling.
pub const AWAIT_SHELL: &str = "await_shell";

/// Status polling: every 10 seconds, at most 10 polls.
pub const INSTANCE_POLL: PollPolicy = PollPolicy::new(Duration::from_secs(10), 10);
/// SSH polling: every 10 seconds, at most 5 attempts.
pub const SHELL_POLL: PollPolicy = PollPolicy::new(Duration::from_secs(10), 5);

/// Size of a newly created volume.
pub const VOLUME_SIZE_GB: u32 = 10;

/// State for one provisioning run.
pub struct ProvisionContext {
    cloud: Arc<dyn CloudApi>,
    connector: Arc<dyn ShellConnector>,

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

    pub instance_poll: PollPolicy,
    pub shell_poll: PollPolicy,
    pub attempts: AttemptCounter,

    instance_id: Option<String>,
    instance_address: Option<String>,
    volume_id: Option<String>,
    volume_attached_to: Option<String>,
    shell: Option<Box<dyn RemoteShell>>,
}

impl ProvisionContext {
    pub fn new(
        config: &GovernorConfig,
        cloud: Arc<dyn CloudApi>,
        connector: Arc<dyn ShellConnector>,
    ) -> Self {
        Self {
            cloud,
            connector,
            instance_label: config.instance_label.clone(),
            region: config.region.clone(),
            plan: config.plan.clone(),
            os_id: config.os_id,
            script_id: config.script_id.clone(),
            block_label: config.block_label.clone(),
            ssh_key_path: config.ssh_key_path.clone(),
            ssh_user: config.ssh_user.clone(),
            mount_point: config.mount_point.clone(),
            block_device: config.block_device.clone(),
            instance_poll: INSTANCE_POLL,
            shell_poll: SHELL_POLL,
            attempts: AttemptCounter::new(),
            instance_id: None,
            instance_address: None,
            volume_id: None,
            volume_attached_to: None,
            shell: None,
        }
    }

    /// Replace both polling policies.
    pub fn with_poll_policies(mut self, instance: PollPolicy, shell: PollPolicy) -> Self {
        self.instance_poll = instance;
        self.shell_poll = shell;
        self
    }

    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    pub fn instance_address(&self) -> Option<&str> {
        self.instance_address.as_deref()
    }

    pub fn volume_id(&self) -> Option<&str> {
        self.volume_id.as_deref()
    }

    /// Whether a remote shell has been established.
    pub fn has_shell(&self) -> bool {
        self.shell.is_some()
    }
}

/// The steps of the provisioning workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionStep {
    CheckInstanceExists,
    CreateInstance,
    WaitForInstanceActive,
    FindOrCreateBlockStorage,
    AwaitRemoteShell,
    AttachBlockStorage,
    MountVolume,
}

/// First step of the workflow.
pub fn entry() -> ProvisionStep {
    ProvisionStep::CheckInstanceExists
}

impl Step for ProvisionStep {
    type Context = ProvisionContext;

    fn name(&self) -> &'static str {
        match self {
            ProvisionStep::CheckInstanceExists => "check-instance-exists",
            ProvisionStep::CreateInstance => "create-instance",
            ProvisionStep::WaitForInstanceActive => "wait-for-instance-active",
            ProvisionStep::FindOrCreateBlockStorage => "find-or-create-block-storage",
            ProvisionStep::AwaitRemoteShell => "await-remote-shell",
            ProvisionStep::AttachBlockStorage => "attach-block-storage",
            ProvisionStep::MountVolume => "mount-volume",
        }
    }

    fn execute(
        &self,
        ctx: &mut ProvisionContext,
        sink: &mut dyn ProgressSink,
    ) -> Result<Option<Self>> {
        match self {
            ProvisionStep::CheckInstanceExists => check_instance_exists(ctx, sink),
            ProvisionStep::CreateInstance => create_instance(ctx, sink),
            ProvisionStep::WaitForInstanceActive => wait_for_instance_active(ctx, sink),
            ProvisionStep::FindOrCreateBlockStorage => find_or_create_block_storage(ctx, sink),
            ProvisionStep::AwaitRemoteShell => await_remote_shell(ctx, sink),
            ProvisionStep::AttachBlockStorage => attach_block_storage(ctx, sink),
            ProvisionStep::MountVolume => mount_volume(ctx, sink),
        }
    }
}

type Next = Result<Option<ProvisionStep>>;

fn check_instance_exists(ctx: &mut ProvisionContext, sink: &mut dyn ProgressSink) -> Next {
    sink.info(&format!("Looking for instance '{}'", ctx.instance_label));
    let instances = match ctx.cloud.list_instances(&ctx.instance_label, &ctx.region) {
        Ok(instances) => instances,
        Err(e) => return fail(sink, "Error occurred while fetching instances", e),
    };

    if instances.len() > 1 {
        warn!(
            "{} instances labeled {}, using the first",
            instances.len(),
            ctx.instance_label
        );
    }

    let Some(instance) = instances.into_iter().next() else {
        sink.info("No existing instance found");
        return Ok(Some(ProvisionStep::CreateInstance));
    };

    record_once(&mut ctx.instance_id, &instance.id, "instance id");
    sink.info(&format!("Found existing instance, ID: {}", instance.id));

    match instance.address() {
        Some(address) => {
            record_once(&mut ctx.instance_address, address, "instance address");
            Ok(Some(ProvisionStep::FindOrCreateBlockStorage))
        }
        None => Ok(Some(ProvisionStep::WaitForInstanceActive)),
    }
}

fn create_instance(ctx: &mut ProvisionContext, sink: &mut dyn ProgressSink) -> Next {
    sink.info("Creating new instance");
    let request = InstanceRequest {
        label: ctx.instance_label.clone(),
        region: ctx.region.clone(),
        plan: ctx.plan.clone(),
        os_id: ctx.os_id,
        script_id: ctx.script_id.clone(),
    };

    let instance = match ctx.cloud.create_instance(&request) {
        Ok(instance) => instance,
        Err(e) => return fail(sink, "Error occurred while creating instance", e),
    };

    record_once(&mut ctx.instance_id, &instance.id, "instance id");
    if let Some(address) = instance.address() {
        record_once(&mut ctx.instance_address, address, "instance address");
    }
    sink.info(&format!("Instance created, ID: {}", instance.id));

    Ok(Some(ProvisionStep::WaitForInstanceActive))
}

fn wait_for_instance_active(ctx: &mut ProvisionContext, sink: &mut dyn ProgressSink) -> Next {
    let step = ProvisionStep::WaitForInstanceActive.name();
    let id = require(sink, ctx.instance_id(), step, "an instance id")?.to_string();
    let policy = ctx.instance_poll;

    sink.info(&format!("Waiting for instance {} to become active", id));
    loop {
        let instance = match ctx.cloud.get_instance(&id) {
            Ok(instance) => instance,
            Err(e) => return fail(sink, "Error occurred while checking instance status", e),
        };

        if let Some(address) = instance.address() {
            record_once(&mut ctx.instance_address, address, "instance address");
        }

        if instance.is_ready() && ctx.instance_address.is_some() {
            ctx.attempts.reset(WAIT_FOR_INSTANCE);
            sink.info("Instance is active");
            return Ok(Some(ProvisionStep::FindOrCreateBlockStorage));
        }

        let attempts = ctx.attempts.increment(WAIT_FOR_INSTANCE);
        debug!("Instance {} not ready: {}", id, instance.status_line());
        if attempts >= policy.max_attempts {
            sink.error("Max attempts reached while waiting for instance");
            return Err(GovernorError::AttemptsExhausted {
                action: WAIT_FOR_INSTANCE.to_string(),
                attempts,
                last_error: format!("instance {} not active ({})", id, instance.status_line()),
            });
        }

        sink.info(&format!("Attempt {}: instance not active yet", attempts));
        policy.pause();
    }
}

fn find_or_create_block_storage(ctx: &mut ProvisionContext, sink: &mut dyn ProgressSink) -> Next {
    sink.info("Checking if block storage already created");
    let volumes = match ctx.cloud.list_volumes(&ctx.block_label) {
        Ok(volumes) => volumes,
        Err(e) => return fail(sink, "Error occurred while fetching block storage", e),
    };

    if let Some(volume) = volumes.into_iter().next() {
        record_once(&mut ctx.volume_id, &volume.id, "volume id");
        if let Some(instance) = volume.attached_to() {
            record_once(&mut ctx.volume_attached_to, instance, "volume attachment");
        }
        sink.info(&format!("Found existing block storage, ID: {}", volume.id));
        return Ok(Some(ProvisionStep::AwaitRemoteShell));
    }

    sink.info("Creating new block storage");
    let request = VolumeRequest {
        region: ctx.region.clone(),
        label: ctx.block_label.clone(),
        size_gb: VOLUME_SIZE_GB,
    };
    let volume = match ctx.cloud.create_volume(&request) {
        Ok(volume) => volume,
        Err(e) => return fail(sink, "Error occurred while creating block storage", e),
    };

    record_once(&mut ctx.volume_id, &volume.id, "volume id");
    sink.info(&format!("Block storage created, ID: {}", volume.id));
    Ok(Some(ProvisionStep::AwaitRemoteShell))
}

fn await_remote_shell(ctx: &mut ProvisionContext, sink: &mut dyn ProgressSink) -> Next {
    let step = ProvisionStep::AwaitRemoteShell.name();
    let address = require(sink, ctx.instance_address(), step, "an instance address")?.to_string();
    let policy = ctx.shell_poll;

    sink.info(&format!("Waiting for server SSH, IP: {}", address));
    let key = match SshKey::load(&ctx.ssh_key_path) {
        Ok(key) => key,
        Err(e) => return fail(sink, "Unable to load SSH key", e),
    };
    sink.info("Loaded key");

    loop {
        let last_error = match ctx.connector.connect(&ctx.ssh_user, &address, &key) {
            Ok(shell) => {
                if ctx.shell.is_none() {
                    ctx.shell = Some(shell);
                }
                ctx.attempts.reset(AWAIT_SHELL);
                sink.info("SSH connection established");
                return Ok(Some(ProvisionStep::AttachBlockStorage));
            }
            Err(GovernorError::ShellConnect { message, .. }) => message,
            Err(e) => return fail(sink, "Error occurred while connecting over SSH", e),
        };

        let attempts = ctx.attempts.increment(AWAIT_SHELL);
        sink.info(&format!("Attempt {}: Server not booted yet", attempts));
        debug!("SSH to {} failed: {}", address, last_error);

        if attempts >= policy.max_attempts {
            sink.error("Max attempts reached");
            return Err(GovernorError::AttemptsExhausted {
                action: AWAIT_SHELL.to_string(),
                attempts,
                last_error,
            });
        }
        policy.pause();
    }
}

fn attach_block_storage(ctx: &mut ProvisionContext, sink: &mut dyn ProgressSink) -> Next {
    let step = ProvisionStep::AttachBlockStorage.name();
    let volume_id = require(sink, ctx.volume_id(), step, "a volume id")?.to_string();
    let instance_id = require(sink, ctx.instance_id(), step, "an instance id")?.to_string();

    if ctx.volume_attached_to.as_deref() == Some(instance_id.as_str()) {
        sink.info("Block storage already attached");
        return Ok(Some(ProvisionStep::MountVolume));
    }

    sink.info("Attaching block storage");
    if let Err(e) = ctx.cloud.attach_volume(&volume_id, &instance_id, true) {
        return fail(sink, "Error occurred while attaching block storage", e);
    }
    record_once(&mut ctx.volume_attached_to, &instance_id, "volume attachment");
    sink.info("Block storage attached");

    Ok(Some(ProvisionStep::MountVolume))
}

fn mount_volume(ctx: &mut ProvisionContext, sink: &mut dyn ProgressSink) -> Next {
    let mkdir = format!("mkdir -p {}", ctx.mount_point);
    let mount = format!(
        "mountpoint -q {mp} || mount {dev} {mp}",
        mp = ctx.mount_point,
        dev = ctx.block_device
    );

    let Some(shell) = ctx.shell.as_mut() else {
        return missing(sink, ProvisionStep::MountVolume.name(), "a remote shell");
    };

    if let Err(e) = shell.run(&mkdir) {
        return fail(sink, "Error occurred while creating directory", e);
    }
    sink.info("Directory created");

    if let Err(e) = shell.run(&mount) {
        return fail(sink, "Error occurred while mounting block storage", e);
    }
    sink.info("Block storage mounted");

    Ok(None)
}
