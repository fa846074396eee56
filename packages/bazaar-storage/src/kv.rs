use std::{collections::HashMap, sync::RwLock};

use time::{Duration, OffsetDateTime};

use crate::{Error, Result};

#[derive(Debug, Clone)]
struct KvEntry {
	value: String,
	expires_at: OffsetDateTime,
}

/// TTL key-value store. Expired entries read as absent and are dropped lazily.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
	entries: RwLock<HashMap<String, KvEntry>>,
}
impl MemoryKvStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, key: &str, now: OffsetDateTime) -> Result<Option<String>> {
		let expired = {
			let entries = crate::read(&self.entries);

			match entries.get(key) {
				Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
				Some(_) => true,
				None => false,
			}
		};

		if expired {
			let mut entries = crate::write(&self.entries);

			if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
				entries.remove(key);
			}
		}

		Ok(None)
	}

	/// Writes `value` under `key`, replacing any previous entry.
	pub fn put(&self, key: &str, value: String, ttl: Duration, now: OffsetDateTime) -> Result<()> {
		if key.is_empty() {
			return Err(Error::InvalidArgument("key must be non-empty".to_string()));
		}
		if ttl <= Duration::ZERO {
			return Err(Error::InvalidArgument("ttl must be positive".to_string()));
		}

		let entry = KvEntry { value, expires_at: now + ttl };

		crate::write(&self.entries).insert(key.to_string(), entry);

		Ok(())
	}

	/// Removes every key starting with `prefix`. Returns how many were removed.
	pub fn evict_prefix(&self, prefix: &str) -> Result<usize> {
		let mut entries = crate::write(&self.entries);
		let before = entries.len();

		entries.retain(|key, _| !key.starts_with(prefix));

		Ok(before - entries.len())
	}

	pub fn len(&self) -> usize {
		crate::read(&self.entries).len()
	}

	pub fn is_empty(&self) -> bool {
		crate::read(&self.entries).is_empty()
	}
}
