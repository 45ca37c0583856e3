//! Integration tests for the mcgov binary.
// The cargo_bin function is marked deprecated in favor of cargo_bin! macro,
// but both work correctly. Suppressing until assert_cmd stabilizes the new API.
#![allow(deprecated)]

use assert_cmd::cargo::cargo_bin;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn mcgov() -> Command {
    let mut cmd = Command::new(cargo_bin("mcgov"));
    cmd.env_clear();
    cmd
}

#[test]
fn cli_shows_help() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = mcgov();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("provision"))
        .stdout(predicate::str::contains("decommission"));
    Ok(())
}

#[test]
fn cli_shows_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = mcgov();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn cli_requires_subcommand() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = mcgov();
    cmd.assert().failure();
    Ok(())
}

#[test]
fn cli_provision_help_lists_global_flags() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = mcgov();
    cmd.args(["provision", "--help"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("--env-file"))
        .stdout(predicate::str::contains("--transcript"));
    Ok(())
}

#[test]
fn cli_missing_settings_exit_one() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let mut cmd = mcgov();
    cmd.current_dir(temp.path());
    cmd.arg("provision");
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("VULTR_API_KEY"));
    Ok(())
}

#[test]
fn cli_reports_invalid_setting_from_env_file() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let env_file = temp.path().join("server.env");
    fs::write(
        &env_file,
        r#"
VULTR_API_KEY=abcdef
TARGET_INSTANCE_LABEL=mc-1
TARGET_INSTANCE_REGION=ams
TARGET_INSTANCE_PLAN=vc2-2c-4gb
TARGET_INSTANCE_OS_ID=ubuntu
TARGET_SCRIPT_ID=s-1
TARGET_BLOCK_LABEL=world
INSTANCE_SSH_KEY_PATH=/keys/id
"#,
    )?;

    let mut cmd = mcgov();
    cmd.arg("decommission").arg("--env-file").arg(&env_file);
    cmd.assert()
        .code(1)
        .stderr(predicate::str::contains("TARGET_INSTANCE_OS_ID"));
    Ok(())
}

#[test]
fn cli_transcript_is_padded_after_failure() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let mut cmd = mcgov();
    cmd.current_dir(temp.path());
    cmd.args(["decommission", "--transcript"]);
    cmd.assert()
        .code(1)
        .stdout(predicate::str::contains("> \n> "));
    Ok(())
}

#[test]
fn cli_exits_two_while_another_run_holds_the_lock() -> Result<(), Box<dyn std::error::Error>> {
    let temp = TempDir::new()?;
    let env_file = temp.path().join("server.env");
    fs::write(
        &env_file,
        r#"
VULTR_API_KEY=abcdef
VULTR_API_URL=http://127.0.0.1:9
TARGET_INSTANCE_LABEL=mc-1
TARGET_INSTANCE_REGION=ams
TARGET_INSTANCE_PLAN=vc2-2c-4gb
TARGET_INSTANCE_OS_ID=1743
TARGET_SCRIPT_ID=s-1
TARGET_BLOCK_LABEL=world
INSTANCE_SSH_KEY_PATH=/keys/id
"#,
    )?;
    let lock_file = temp.path().join("mcgov.lock");
    let mut held = fd_lock::RwLock::new(fs::File::create(&lock_file)?);
    let _guard = held.try_write()?;

    let mut cmd = mcgov();
    cmd.arg("provision")
        .arg("--env-file")
        .arg(&env_file)
        .arg("--lock-file")
        .arg(&lock_file);
    cmd.assert()
        .code(2)
        .stderr(predicate::str::contains("already running"));
    Ok(())
}
