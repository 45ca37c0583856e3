//! Remote shell over the system OpenSSH client.

use std::process::{Command, Output, Stdio};
use std::time::Duration;

use tracing::debug;

use crate::error::{GovernorError, Result};

use super::{RemoteShell, ShellConnector, SshKey};

/// Connects by running the `ssh` binary.
///
/// Host keys are not checked: a freshly created instance has no known key.
#[derive(Debug, Clone)]
pub struct OpenSshConnector {
    program: String,
    connect_timeout: Duration,
}

impl OpenSshConnector {
    pub fn new() -> Self {
        Self {
            program: "ssh".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Use a different client binary.
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Arguments shared by every invocation, ending with the destination.
    pub fn base_args(&self, user: &str, host: &str, key: &SshKey) -> Vec<String> {
        let mut args = vec!["-i".to_string(), key.path().display().to_string()];
        for option in [
            "BatchMode=yes".to_string(),
            "StrictHostKeyChecking=no".to_string(),
            "UserKnownHostsFile=/dev/null".to_string(),
            "LogLevel=ERROR".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
        ] {
            args.push("-o".to_string());
            args.push(option);
        }
        args.push(format!("{}@{}", user, host));
        args
    }
}

impl Default for OpenSshConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellConnector for OpenSshConnector {
    fn connect(&self, user: &str, host: &str, key: &SshKey) -> Result<Box<dyn RemoteShell>> {
        let args = self.base_args(user, host, key);
        let output = invoke(&self.program, &args, "true")?;

        if !output.status.success() {
            return Err(GovernorError::ShellConnect {
                host: host.to_string(),
                message: failure_message(&output),
            });
        }

        Ok(Box::new(OpenSshSession {
            program: self.program.clone(),
            args,
            host: host.to_string(),
        }))
    }
}

/// A verified destination; each command runs in its own `ssh` invocation.
struct OpenSshSession {
    program: String,
    args: Vec<String>,
    host: String,
}

impl RemoteShell for OpenSshSession {
    fn run(&mut self, command: &str) -> Result<String> {
        let output = invoke(&self.program, &self.args, command)?;
        if !output.status.success() {
            return Err(GovernorError::ShellCommand {
                command: command.to_string(),
                message: failure_message(&output),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    fn host(&self) -> &str {
        &self.host
    }
}

fn invoke(program: &str, args: &[String], command: &str) -> Result<Output> {
    debug!("{} {} {}", program, args.join(" "), command);
    let output = Command::new(program)
        .args(args)
        .arg(command)
        .stdin(Stdio::null())
        .output()?;
    Ok(output)
}

fn failure_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        format!("exited with code {:?}", output.status.code())
    } else {
        stderr.to_string()
    }
}
