// Tests for single-flight semantics: concurrent same-key calls share one
// execution of the body, and rollback only happens after settling.
use rememo_async::memoize_async;
use rememo_core::{OwnerIdentity, OwnerToken};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

// Test 1: concurrent callers join the pending future instead of spawning
static SLOW_CALLS: AtomicU32 = AtomicU32::new(0);

#[memoize_async]
async fn slow_double(n: u32) -> u32 {
    SLOW_CALLS.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(50)).await;
    n * 2
}

#[tokio::test]
async fn test_concurrent_calls_share_one_execution() {
    let handles: Vec<_> = (0..8).map(|_| tokio::spawn(slow_double(21))).collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), 42);
    }
    // Eight callers, one execution
    assert_eq!(SLOW_CALLS.load(Ordering::SeqCst), 1);
}

// Test 2: every waiter on a failing future receives the same Err, and the
// entry is gone once they have settled
static FAIL_CALLS: AtomicU32 = AtomicU32::new(0);

#[memoize_async]
async fn slow_failure(job: String) -> Result<u32, String> {
    FAIL_CALLS.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(40)).await;
    Err(format!("{} unavailable", job))
}

#[tokio::test]
async fn test_waiters_share_the_error_then_roll_back() {
    let handles: Vec<_> = (0..4)
        .map(|_| tokio::spawn(slow_failure("sync".to_string())))
        .collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), Err("sync unavailable".to_string()));
    }
    assert_eq!(FAIL_CALLS.load(Ordering::SeqCst), 1);

    // The rolled-back entry forces a fresh execution
    let retry = slow_failure("sync".to_string()).await;
    assert!(retry.is_err());
    assert_eq!(FAIL_CALLS.load(Ordering::SeqCst), 2);
}

// Test 3: a pending None is shared, then rolled back after settling
static PENDING_NONE_CALLS: AtomicU32 = AtomicU32::new(0);

#[memoize_async]
async fn slow_lookup(id: u32) -> Option<u32> {
    PENDING_NONE_CALLS.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_millis(40)).await;
    if id == 0 {
        None
    } else {
        Some(id)
    }
}

#[tokio::test]
async fn test_pending_empty_shared_then_rolled_back() {
    // While in flight, the pending future is shared even though the
    // eventual None will not stay cached.
    let handles: Vec<_> = (0..3).map(|_| tokio::spawn(slow_lookup(0))).collect();
    for handle in handles {
        assert_eq!(handle.await.unwrap(), None);
    }
    assert_eq!(PENDING_NONE_CALLS.load(Ordering::SeqCst), 1);

    // After settling the entry is gone
    assert_eq!(slow_lookup(0).await, None);
    assert_eq!(PENDING_NONE_CALLS.load(Ordering::SeqCst), 2);
}

// Test 4: owner scope partitions the store per owner value
struct Session {
    label: &'static str,
    token: OwnerToken,
}

impl OwnerIdentity for Session {
    fn owner_token(&self) -> OwnerToken {
        self.token
    }
}

static GREET_CALLS: AtomicU32 = AtomicU32::new(0);

#[memoize_async(scope = "owner", owner = session)]
async fn greet(session: Arc<Session>, name: String) -> String {
    GREET_CALLS.fetch_add(1, Ordering::SeqCst);
    format!("[{}] hello {}", session.label, name)
}

#[tokio::test]
async fn test_owner_scope_partitions_per_owner() {
    let a = Arc::new(Session { label: "a", token: OwnerToken::unique() });
    let b = Arc::new(Session { label: "b", token: OwnerToken::unique() });

    let first = greet(a.clone(), "ada".to_string()).await;
    assert_eq!(first, "[a] hello ada");
    assert_eq!(GREET_CALLS.load(Ordering::SeqCst), 1);

    // Same owner and key: served from the partition
    let again = greet(a.clone(), "ada".to_string()).await;
    assert_eq!(again, "[a] hello ada");
    assert_eq!(GREET_CALLS.load(Ordering::SeqCst), 1);

    // A different owner with the same key computes its own entry
    let other = greet(b.clone(), "ada".to_string()).await;
    assert_eq!(other, "[b] hello ada");
    assert_eq!(GREET_CALLS.load(Ordering::SeqCst), 2);
}
