use std::{collections::HashMap, sync::RwLock};

use bazaar_domain::profile::UserSearchProfile;

#[derive(Debug, Default)]
pub struct MemoryProfileStore {
	profiles: RwLock<HashMap<String, UserSearchProfile>>,
}
impl MemoryProfileStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn get(&self, user_id: &str) -> Option<UserSearchProfile> {
		crate::read(&self.profiles).get(user_id).cloned()
	}

	pub fn put(&self, user_id: &str, profile: UserSearchProfile) {
		crate::write(&self.profiles).insert(user_id.to_string(), profile);
	}

	pub fn remove(&self, user_id: &str) -> bool {
		crate::write(&self.profiles).remove(user_id).is_some()
	}
}
