//! Per-journey serialization.
//!
//! Each journey key gets its own async mutex, created on demand. A key's
//! entry counts everyone holding or waiting for it and is removed when that
//! count drops to zero, including when a waiter is cancelled before it gets
//! the lock. Different keys never share a mutex.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

struct Slot {
    mutex: Arc<AsyncMutex<()>>,
    users: usize,
}

type SlotTable = Arc<Mutex<HashMap<String, Slot>>>;

/// Table of per-key async mutexes.
#[derive(Default)]
pub struct KeyedLocks {
    slots: SlotTable,
}

/// One holder's or waiter's claim on a key's slot.
struct Registration {
    key: String,
    slots: SlotTable,
}

impl Drop for Registration {
    fn drop(&mut self) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.users -= 1;
            if slot.users == 0 {
                slots.remove(&self.key);
            }
        }
    }
}

/// Exclusive hold on one key.
pub struct KeyGuard {
    // Field order matters: the mutex is released before the slot can be freed.
    _guard: OwnedMutexGuard<()>,
    _registration: Registration,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn lock(&self, key: &str) -> KeyGuard {
        let (mutex, registration) = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            let slot = slots.entry(key.to_string()).or_insert_with(|| Slot {
                mutex: Arc::new(AsyncMutex::new(())),
                users: 0,
            });
            slot.users += 1;
            (
                slot.mutex.clone(),
                Registration {
                    key: key.to_string(),
                    slots: self.slots.clone(),
                },
            )
        };

        let guard = mutex.lock_owned().await;

        KeyGuard {
            _guard: guard,
            _registration: registration,
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
