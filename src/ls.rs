//! Advisory lock table.
//!
//! Locks are bookkeeping only. A LOCK request always gets a fresh
//! token, which is remembered here until it is UNLOCKed, used once by
//! a PUT, or swept away after [`LOCK_TTL`]. Nothing is ever refused
//! because some other client holds a lock.
//!
//! The table lives behind a plain mutex that is only taken for a single
//! lookup or mutation, never across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::davpath::DavPath;

/// How long a lock lives if nobody unlocks it.
pub const LOCK_TTL: Duration = Duration::from_secs(2 * 60 * 60);

/// Default period of the expiry sweep.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Shortest period the sweeper task runs at.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// One advisory lock.
#[derive(Debug, Clone)]
pub struct DavLock {
    pub token: String,
    pub path: DavPath,
    pub created_at: Instant,
}

struct Inner {
    ttl: Duration,
    table: Mutex<Table>,
}

struct Table {
    locks: HashMap<String, DavLock>,
    last_sweep: Instant,
}

/// Owner of the lock table. Cloning is cheap and shares the table.
#[derive(Clone)]
pub struct LockManager {
    inner: Arc<Inner>,
}

impl Default for LockManager {
    fn default() -> Self {
        LockManager::new()
    }
}

impl LockManager {
    /// Lock manager with the default two hour TTL.
    pub fn new() -> LockManager {
        LockManager::with_ttl(LOCK_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> LockManager {
        LockManager {
            inner: Arc::new(Inner {
                ttl,
                table: Mutex::new(Table {
                    locks: HashMap::new(),
                    last_sweep: Instant::now(),
                }),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Create a lock on `path`, timestamped now.
    pub fn create(&self, path: &DavPath) -> DavLock {
        self.create_at(path, Instant::now())
    }

    /// Create a lock on `path` with an explicit creation time.
    ///
    /// Once a TTL has passed since the last sweep, expired locks are
    /// swept first, so the table stays bounded without a sweeper task.
    pub fn create_at(&self, path: &DavPath, now: Instant) -> DavLock {
        let lock = DavLock {
            token: new_token(),
            path: path.clone(),
            created_at: now,
        };
        debug!("lock {} created on {}", lock.token, lock.path);
        let mut table = self.inner.table.lock();
        if now.saturating_duration_since(table.last_sweep) >= self.inner.ttl {
            self.inner.sweep_table(&mut table, now);
        }
        table.locks.insert(lock.token.clone(), lock.clone());
        lock
    }

    /// Remove a lock. Returns the removed lock, if there was one.
    pub fn remove(&self, token: &str) -> Option<DavLock> {
        let lock = self.inner.table.lock().locks.remove(token);
        if lock.is_some() {
            debug!("lock {token} removed");
        }
        lock
    }

    /// Is `token` a known lock that hasn't outlived the TTL yet.
    pub fn contains(&self, token: &str) -> bool {
        let now = Instant::now();
        self.inner
            .table
            .lock()
            .locks
            .get(token)
            .map_or(false, |lock| self.inner.is_live(lock, now))
    }

    /// Number of entries, including expired ones not swept yet.
    pub fn len(&self) -> usize {
        self.inner.table.lock().locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every lock that is older than the TTL at `now`.
    /// Returns the number of evicted locks.
    pub fn sweep_expired(&self, now: Instant) -> usize {
        self.inner.sweep_expired(now)
    }

    /// Start the periodic expiry sweep on the current tokio runtime.
    ///
    /// The task stops by itself once the last `LockManager` handle
    /// sharing this table is dropped. Periods below
    /// [`MIN_SWEEP_INTERVAL`] are raised to it.
    pub fn spawn_sweeper(&self, every: Duration) -> JoinHandle<()> {
        let every = every.max(MIN_SWEEP_INTERVAL);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let mut interval = time::interval_at(Instant::now() + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::spawn(async move {
            loop {
                interval.tick().await;
                match weak.upgrade() {
                    Some(inner) => {
                        inner.sweep_expired(Instant::now());
                    }
                    None => break,
                }
            }
            trace!("lock sweeper stopped");
        })
    }
}

impl Inner {
    fn is_live(&self, lock: &DavLock, now: Instant) -> bool {
        now.saturating_duration_since(lock.created_at) <= self.ttl
    }

    fn sweep_expired(&self, now: Instant) -> usize {
        let mut table = self.table.lock();
        self.sweep_table(&mut table, now)
    }

    fn sweep_table(&self, table: &mut Table, now: Instant) -> usize {
        let before = table.locks.len();
        table.locks.retain(|_, lock| self.is_live(lock, now));
        table.last_sweep = now;
        let evicted = before - table.locks.len();
        if evicted > 0 {
            debug!("lock sweep: {evicted} expired, {} left", table.locks.len());
        }
        evicted
    }
}

// 128 random bits (well, 122 of them), hex encoded.
fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}
