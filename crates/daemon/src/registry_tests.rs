// SPDX-License-Identifier: MIT

use super::*;
use dispatcher_core::FakeClock;
use std::time::Duration;
use yare::parameterized;

fn registry() -> Registry<FakeClock> {
    Registry::new(FakeClock::new())
}

#[test]
fn touch_inserts_online_worker() {
    let mut r = registry();
    let h = Hostname::new("w1");
    r.touch(&h);
    assert!(r.get(&h).unwrap().online);
}

#[test]
fn touch_revives_offline_worker() {
    let h = Hostname::new("w1");
    let config = MasterConfig { dispatcher_timeout: Duration::from_secs(1), ..MasterConfig::default() };
    let clock = FakeClock::new();
    let mut r = Registry::new(clock.clone());
    r.touch(&h);
    clock.advance(Duration::from_secs(2));
    r.sweep(&config);
    assert!(!r.get(&h).unwrap().online);
    r.touch(&h);
    assert!(r.get(&h).unwrap().online);
}

#[parameterized(
    new_worker = { false, HelloKind::Hello, RestartOutcome::New },
    restart = { true, HelloKind::Hello, RestartOutcome::Restarted },
    retry_not_confirmed = { true, HelloKind::HelloRetry, RestartOutcome::NotConfirmed },
)]
fn note_restart_outcomes(preexisting: bool, kind: HelloKind, expected: RestartOutcome) {
    let mut r = registry();
    let h = Hostname::new("w1");
    if preexisting {
        r.touch(&h);
    }
    assert_eq!(r.note_restart(&h, kind), expected);
}

#[test]
fn sweep_marks_stale_worker_offline_without_removing_it() {
    let clock = FakeClock::new();
    let mut r = Registry::new(clock.clone());
    let h = Hostname::new("w1");
    r.touch(&h);
    let config = MasterConfig { dispatcher_timeout: Duration::from_secs(30), ..MasterConfig::default() };

    clock.advance(Duration::from_secs(31));
    r.sweep(&config);

    assert!(r.get(&h).is_some());
    assert!(!r.get(&h).unwrap().online);
}

#[test]
fn sweep_leaves_fresh_worker_online() {
    let clock = FakeClock::new();
    let mut r = Registry::new(clock.clone());
    let h = Hostname::new("w1");
    r.touch(&h);
    let config = MasterConfig::default();

    clock.advance(Duration::from_secs(1));
    r.sweep(&config);

    assert!(r.get(&h).unwrap().online);
}
