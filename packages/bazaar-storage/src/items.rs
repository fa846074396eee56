use std::{collections::HashMap, sync::RwLock};

use uuid::Uuid;

use crate::{Error, Result};
use bazaar_domain::{item::SearchableItem, query::SearchFilters};

#[derive(Debug, Default)]
pub struct MemoryItemStore {
	items: RwLock<HashMap<Uuid, SearchableItem>>,
}
impl MemoryItemStore {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_items(items: impl IntoIterator<Item = SearchableItem>) -> Self {
		let store = Self::new();

		for item in items {
			store.upsert(item);
		}

		store
	}

	/// Eligible items matching every structural filter, ordered by item id.
	pub fn find_eligible_by_filters(&self, filters: &SearchFilters) -> Vec<SearchableItem> {
		let items = crate::read(&self.items);
		let mut out: Vec<SearchableItem> =
			items.values().filter(|item| filters.matches(item)).cloned().collect();

		out.sort_by_key(|item| item.item_id);

		out
	}

	pub fn get_by_id(&self, item_id: Uuid) -> Option<SearchableItem> {
		crate::read(&self.items).get(&item_id).cloned()
	}

	/// Returns the previous version, if any.
	pub fn upsert(&self, item: SearchableItem) -> Option<SearchableItem> {
		crate::write(&self.items).insert(item.item_id, item)
	}

	/// Stores a freshly computed embedding without touching the other fields.
	///
	/// Skips the write when the item's text no longer hashes to `fingerprint`, so a vector
	/// computed from an older version never lands on a newer one.
	pub fn set_embedding(
		&self,
		item_id: Uuid,
		fingerprint: &str,
		vector: Vec<f32>,
	) -> Result<bool> {
		let mut items = crate::write(&self.items);
		let item = items.get_mut(&item_id).ok_or_else(|| Error::NotFound(item_id.to_string()))?;

		if item.text_fingerprint() != fingerprint {
			return Ok(false);
		}

		item.set_embedding(vector);

		Ok(true)
	}

	pub fn remove(&self, item_id: Uuid) -> Result<SearchableItem> {
		crate::write(&self.items)
			.remove(&item_id)
			.ok_or_else(|| Error::NotFound(item_id.to_string()))
	}

	pub fn len(&self) -> usize {
		crate::read(&self.items).len()
	}

	pub fn is_empty(&self) -> bool {
		crate::read(&self.items).is_empty()
	}
}
