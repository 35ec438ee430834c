use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::config::get_config;
use crate::errors::{AppError, AppResult};

type LockTable = Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>;

/// One async mutex per cart id, so read-then-act sequences on a cart run one
/// at a time within this process.
pub struct CartLocks {
    /// Map: cart_id -> lock. Entries live only while held or awaited.
    locks: LockTable,
    timeout: Duration,
}

/// Held for the duration of one cart mutation. Dropping the last guard for a
/// cart removes its entry from the table.
pub struct CartGuard {
    cart_id: String,
    locks: LockTable,
    _guard: OwnedMutexGuard<()>,
}

impl Drop for CartGuard {
    fn drop(&mut self) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        // The table and this guard each hold one reference; more means a waiter.
        let idle = locks
            .get(&self.cart_id)
            .map_or(false, |lock| Arc::strong_count(lock) <= 2);
        if idle {
            locks.remove(&self.cart_id);
        }
    }
}

impl CartLocks {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
            timeout,
        }
    }

    pub fn from_config() -> Self {
        Self::new(Duration::from_secs(get_config().pricing.cart_lock_timeout_secs))
    }

    fn lock_for(&self, cart_id: &str) -> AppResult<Arc<AsyncMutex<()>>> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| AppError::Internal("Failed to acquire cart lock table".into()))?;
        Ok(locks
            .entry(cart_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone())
    }

    /// Waits up to the configured timeout for the cart's lock.
    pub async fn acquire(&self, cart_id: &str) -> AppResult<CartGuard> {
        let lock = self.lock_for(cart_id)?;
        let guard = tokio::time::timeout(self.timeout, lock.lock_owned())
            .await
            .map_err(|_| AppError::Validation(format!("Cart {} is busy, try again", cart_id)))?;

        Ok(CartGuard {
            cart_id: cart_id.to_string(),
            locks: Arc::clone(&self.locks),
            _guard: guard,
        })
    }

    /// Number of carts with a lock currently held or awaited.
    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        self.locks.lock().map_or(0, |locks| locks.len())
    }
}

impl Default for CartLocks {
    fn default() -> Self {
        Self::from_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_second_acquire_times_out_while_held() {
        let locks = CartLocks::new(Duration::from_millis(20));
        let guard = locks.acquire("cart_1").await.expect("first");

        let busy = locks.acquire("cart_1").await;
        assert!(matches!(busy, Err(AppError::Validation(_))));

        // Other carts are independent
        locks.acquire("cart_2").await.expect("other cart");

        drop(guard);
        locks.acquire("cart_1").await.expect("after release");
    }

    #[tokio::test]
    async fn test_released_locks_leave_the_table() {
        let locks = CartLocks::new(Duration::from_millis(20));
        let held = locks.acquire("held").await.expect("held");
        drop(locks.acquire("idle").await.expect("idle"));
        assert_eq!(locks.tracked(), 1);

        // A timed-out waiter does not keep the entry alive
        assert!(locks.acquire("held").await.is_err());
        drop(held);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn test_waiter_keeps_entry_until_done() {
        let locks = Arc::new(CartLocks::new(Duration::from_secs(5)));
        let held = locks.acquire("cart_1").await.expect("held");

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("cart_1").await.expect("waiter");
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(held);
        assert_eq!(locks.tracked(), 1);
        waiter.await.expect("join");
        assert_eq!(locks.tracked(), 0);
    }
}
