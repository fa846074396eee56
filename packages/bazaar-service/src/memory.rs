//! Collaborator implementations over the in-memory stores.

use std::sync::Arc;

use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::{
	BoxFuture, Collaborators, EmbeddingProvider, ItemStore, KvStore, ProfileProvider, Result,
	TextIndex,
};
use bazaar_config::SearchFields;
use bazaar_domain::{item::SearchableItem, profile::UserSearchProfile, query::SearchFilters};
use bazaar_storage::{
	fulltext::{FieldWeights, MemoryTextIndex, TextHit, WeightedTerm},
	items::MemoryItemStore,
	kv::MemoryKvStore,
	profiles::MemoryProfileStore,
};

/// Handles to every in-memory store, shared with whoever feeds them.
#[derive(Clone)]
pub struct MemoryBackends {
	pub items: Arc<MemoryItemStore>,
	pub text_index: Arc<MemoryTextIndex>,
	pub kv: Arc<MemoryKvStore>,
	pub profiles: Arc<MemoryProfileStore>,
}
impl MemoryBackends {
	pub fn new(fields: &SearchFields) -> Self {
		Self {
			items: Arc::new(MemoryItemStore::new()),
			text_index: Arc::new(MemoryTextIndex::new(field_weights(fields))),
			kv: Arc::new(MemoryKvStore::new()),
			profiles: Arc::new(MemoryProfileStore::new()),
		}
	}

	pub fn collaborators(&self, embedding: Arc<dyn EmbeddingProvider>) -> Collaborators {
		Collaborators {
			embedding,
			items: self.items.clone(),
			text_index: self.text_index.clone(),
			kv: self.kv.clone(),
			profiles: self.profiles.clone(),
		}
	}
}

pub fn field_weights(fields: &SearchFields) -> FieldWeights {
	FieldWeights {
		name: fields.name_weight,
		description: fields.description_weight,
		tags: fields.tags_weight,
		prefix_credit: fields.prefix_match_credit,
		min_prefix_chars: fields.min_prefix_chars as usize,
	}
}

impl ItemStore for MemoryItemStore {
	fn find_eligible_by_filters<'a>(
		&'a self,
		filters: &'a SearchFilters,
	) -> BoxFuture<'a, Result<Vec<SearchableItem>>> {
		Box::pin(async move { Ok(MemoryItemStore::find_eligible_by_filters(self, filters)) })
	}

	fn get_by_id<'a>(&'a self, item_id: Uuid) -> BoxFuture<'a, Result<Option<SearchableItem>>> {
		Box::pin(async move { Ok(MemoryItemStore::get_by_id(self, item_id)) })
	}

	fn set_embedding<'a>(
		&'a self,
		item_id: Uuid,
		fingerprint: &'a str,
		vector: Vec<f32>,
	) -> BoxFuture<'a, Result<bool>> {
		Box::pin(async move {
			Ok(MemoryItemStore::set_embedding(self, item_id, fingerprint, vector)?)
		})
	}
}

impl TextIndex for MemoryTextIndex {
	fn query<'a>(
		&'a self,
		terms: &'a [WeightedTerm],
		filters: &'a SearchFilters,
		page_size: usize,
	) -> BoxFuture<'a, Result<Vec<TextHit>>> {
		Box::pin(async move { Ok(MemoryTextIndex::query(self, terms, filters, page_size)?) })
	}

	fn index_item<'a>(&'a self, item: &'a SearchableItem) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			MemoryTextIndex::index_item(self, item);

			Ok(())
		})
	}

	fn update_item<'a>(&'a self, item: &'a SearchableItem) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			MemoryTextIndex::update_item(self, item);

			Ok(())
		})
	}

	fn delete_item<'a>(&'a self, item_id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			MemoryTextIndex::delete_item(self, item_id);

			Ok(())
		})
	}
}

impl KvStore for MemoryKvStore {
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
		Box::pin(async move { Ok(MemoryKvStore::get(self, key, OffsetDateTime::now_utc())?) })
	}

	fn put<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			Ok(MemoryKvStore::put(self, key, value, ttl, OffsetDateTime::now_utc())?)
		})
	}

	fn evict_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<usize>> {
		Box::pin(async move { Ok(MemoryKvStore::evict_prefix(self, prefix)?) })
	}
}

impl ProfileProvider for MemoryProfileStore {
	fn get_search_profile<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, Result<Option<UserSearchProfile>>> {
		Box::pin(async move { Ok(MemoryProfileStore::get(self, user_id)) })
	}
}
