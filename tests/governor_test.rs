//! Integration tests for run exclusivity.

use std::collections::HashMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;

use mcgov::cloud::MockCloud;
use mcgov::config::GovernorConfig;
use mcgov::remote::MockConnector;
use mcgov::routine::{ProgressLevel, RecordingSink, RunLock};
use mcgov::{Governor, GovernorError};

fn config() -> GovernorConfig {
    let vars: HashMap<String, String> = [
        ("VULTR_API_KEY", "test-key"),
        ("TARGET_INSTANCE_LABEL", "mc-1"),
        ("TARGET_INSTANCE_REGION", "ams"),
        ("TARGET_INSTANCE_PLAN", "vc2-2c-4gb"),
        ("TARGET_INSTANCE_OS_ID", "1743"),
        ("TARGET_SCRIPT_ID", "s-1"),
        ("TARGET_BLOCK_LABEL", "world"),
        ("INSTANCE_SSH_KEY_PATH", "/keys/id_ed25519"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    GovernorConfig::from_vars(&vars).unwrap()
}

#[test]
fn second_request_is_rejected_while_first_runs() {
    static LOCK: RunLock = RunLock::new();
    let cloud = Arc::new(MockCloud::new());
    let governor = Arc::new(
        Governor::new(config(), cloud.clone(), Arc::new(MockConnector::new())).with_lock(&LOCK),
    );

    let (started_tx, started_rx) = mpsc::channel();
    let (finish_tx, finish_rx) = mpsc::channel::<()>();

    // A sink that parks the first run inside its first step.
    let first = {
        let governor = Arc::clone(&governor);
        thread::spawn(move || {
            let mut parked = false;
            let mut sink = |_: ProgressLevel, _: &str| {
                if !parked {
                    parked = true;
                    started_tx.send(()).unwrap();
                    finish_rx.recv().unwrap();
                }
            };
            governor.decommission(&mut sink)
        })
    };

    started_rx.recv().unwrap();
    let calls_before = cloud.calls().len();

    let mut sink = RecordingSink::new();
    let err = governor.provision(&mut sink).unwrap_err();
    assert!(matches!(err, GovernorError::Busy));
    assert!(err.is_busy());
    assert!(sink.events().is_empty());
    assert_eq!(cloud.calls().len(), calls_before);

    finish_tx.send(()).unwrap();
    first.join().unwrap().unwrap();

    assert!(!LOCK.is_held());
    assert!(governor.decommission(&mut RecordingSink::new()).is_ok());
}

#[test]
fn separate_locks_do_not_interfere() {
    static FIRST: RunLock = RunLock::new();
    static SECOND: RunLock = RunLock::new();
    let governor = Governor::new(
        config(),
        Arc::new(MockCloud::new()),
        Arc::new(MockConnector::new()),
    )
    .with_lock(&SECOND);

    let _held = FIRST.try_acquire().unwrap();
    assert!(governor.decommission(&mut RecordingSink::new()).is_ok());
}
