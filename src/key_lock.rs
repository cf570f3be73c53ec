//! per group key locks to serialize reconciliation of the same alert group
use std::sync::{Arc, Mutex, PoisonError, Weak};

use hashbrown::HashMap;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Hands out one async mutex per group key. Entries only live as long as a
/// guard or a waiter holds them.
#[derive(Debug, Default)]
pub struct GroupKeyLocks {
	locks: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl GroupKeyLocks {
	pub fn new() -> Self {
		Self::default()
	}

	/// waits until no other caller holds the lock for `group_key`
	pub async fn lock(&self, group_key: &str) -> OwnedMutexGuard<()> {
		let mutex = {
			let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
			locks.retain(|_, lock| lock.strong_count() > 0);

			match locks.get(group_key).and_then(Weak::upgrade) {
				Some(mutex) => mutex,
				None => {
					let mutex = Arc::new(AsyncMutex::new(()));
					locks.insert(group_key.to_owned(), Arc::downgrade(&mutex));
					mutex
				}
			}
		};

		mutex.lock_owned().await
	}

	/// number of keys currently locked or waited on
	pub fn len(&self) -> usize {
		let locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
		locks.values().filter(|lock| lock.strong_count() > 0).count()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}
