//! Tests for the mutex primitive.

use super::*;
use crate::clock::ThreadSleeper;
use crate::error::CoordError;
use crate::test_support::FakeSleeper;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn quick_policy(attempts: u32) -> MutexPolicy {
    MutexPolicy::new(Duration::from_millis(1), attempts)
}

#[test]
fn test_sentinel_path_appends_locker() {
    assert_eq!(
        sentinel_path(Path::new("/srv/config/rmanrun.res.used")),
        Path::new("/srv/config/rmanrun.res.used.locker")
    );
}

#[test]
fn test_acquire_creates_and_release_removes_sentinel() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("rmanrun.lock");
    let sleeper = FakeSleeper::new();

    let guard = acquire(&target, quick_policy(3), &sleeper).unwrap();
    assert!(guard.sentinel().exists());
    assert_eq!(guard.target(), target.as_path());

    let sentinel = guard.sentinel().to_path_buf();
    guard.release().unwrap();
    assert!(!sentinel.exists());
    assert_eq!(sleeper.count(), 0);
}

#[test]
fn test_second_acquire_times_out_after_policy_attempts() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("rmanrun.lock");
    let sleeper = FakeSleeper::new();

    let _held = acquire(&target, quick_policy(3), &sleeper).unwrap();
    let err = acquire(&target, quick_policy(4), &sleeper).unwrap_err();

    assert!(matches!(err, CoordError::LockTimeout(_)));
    // Four attempts, three sleeps in between.
    assert_eq!(sleeper.count(), 3);
}

#[test]
fn test_acquire_succeeds_once_holder_releases() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("rmanrun.lock");
    let held = acquire(&target, quick_policy(1), &FakeSleeper::new()).unwrap();
    let sentinel = held.sentinel().to_path_buf();
    std::mem::forget(held);

    let sleeper = FakeSleeper::with_hook(move |count| {
        if count == 2 {
            fs::remove_file(&sentinel).unwrap();
        }
    });

    let guard = acquire(&target, quick_policy(10), &sleeper).unwrap();
    assert_eq!(sleeper.count(), 2);
    guard.release().unwrap();
}

#[test]
fn test_missing_directory_fails_without_retry() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("no-such-dir").join("rmanrun.lock");
    let sleeper = FakeSleeper::new();

    let err = acquire(&target, quick_policy(5), &sleeper).unwrap_err();

    assert!(matches!(err, CoordError::IoFailure(_)));
    assert_eq!(sleeper.count(), 0);
}

#[test]
fn test_release_of_absent_sentinel_is_success() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("rmanrun.lock");

    let guard = acquire(&target, quick_policy(1), &FakeSleeper::new()).unwrap();
    fs::remove_file(guard.sentinel()).unwrap();

    guard.release().unwrap();
}

#[test]
fn test_drop_releases_sentinel() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("rmanrun.lock");

    {
        let _guard = acquire(&target, quick_policy(1), &FakeSleeper::new()).unwrap();
        assert!(sentinel_path(&target).exists());
    }

    assert!(!sentinel_path(&target).exists());
}

#[test]
fn test_with_mutex_releases_on_error() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("rmanrun.lock");
    let sleeper = FakeSleeper::new();

    let result: crate::error::Result<()> = with_mutex(&target, quick_policy(1), &sleeper, |_| {
        Err(CoordError::LedgerCorruption("boom".to_string()))
    });

    assert!(matches!(result, Err(CoordError::LedgerCorruption(_))));
    assert!(!sentinel_path(&target).exists());
}

#[test]
fn test_with_mutex_returns_body_value() {
    let temp_dir = TempDir::new().unwrap();
    let target = temp_dir.path().join("rmanrun.lock");

    let value = with_mutex(&target, quick_policy(1), &FakeSleeper::new(), |guard| {
        assert!(guard.sentinel().exists());
        Ok(42)
    })
    .unwrap();

    assert_eq!(value, 42);
    assert!(!sentinel_path(&target).exists());
}

#[test]
fn test_tiered_policy_matches_historical_rule() {
    assert_eq!(
        MutexPolicy::tiered(1),
        MutexPolicy::new(Duration::from_millis(100), 10)
    );
    assert_eq!(
        MutexPolicy::tiered(9),
        MutexPolicy::new(Duration::from_millis(100), 90)
    );
    assert_eq!(
        MutexPolicy::tiered(20),
        MutexPolicy::new(Duration::from_secs(1), 20)
    );
    assert_eq!(MutexPolicy::tiered(0), MutexPolicy::tiered(1));
}

#[test]
fn test_explicit_quantum_scales_attempts_not_sleep() {
    let quantum = Duration::from_millis(250);
    let short = MutexPolicy::with_quantum(1, quantum);
    let long = MutexPolicy::with_quantum(20, quantum);

    assert_eq!(short.quantum, quantum);
    assert_eq!(long.quantum, quantum);
    assert_eq!(short.attempts, 4);
    assert_eq!(long.attempts, 80);
    assert!(long.max_wait() > short.max_wait());
}

#[test]
fn test_concurrent_writers_are_serialized() {
    let temp_dir = TempDir::new().unwrap();
    let counter = Arc::new(temp_dir.path().join("counter"));
    fs::write(counter.as_ref(), "0").unwrap();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let counter = Arc::clone(&counter);
            std::thread::spawn(move || {
                let sleeper = ThreadSleeper::default();
                let policy = MutexPolicy::new(Duration::from_millis(1), 10_000);
                for _ in 0..25 {
                    with_mutex(&counter, policy, &sleeper, |_| {
                        let value: u32 = fs::read_to_string(counter.as_ref())
                            .unwrap()
                            .trim()
                            .parse()
                            .unwrap();
                        fs::write(counter.as_ref(), (value + 1).to_string()).unwrap();
                        Ok(())
                    })
                    .unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(fs::read_to_string(counter.as_ref()).unwrap(), "200");
}
