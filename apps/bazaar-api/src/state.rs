use std::sync::Arc;

use uuid::Uuid;

use bazaar_config::Config;
use bazaar_domain::{item::SearchableItem, profile::UserSearchProfile};
use bazaar_service::{
	BazaarService, DefaultProviders, EmbeddingProvider, Error, ItemChangeReport, Result,
	memory::MemoryBackends,
};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<BazaarService>,
	pub backends: MemoryBackends,
}
impl AppState {
	pub fn new(config: Config) -> Self {
		Self::with_embedding(config, Arc::new(DefaultProviders))
	}

	pub fn with_embedding(config: Config, embedding: Arc<dyn EmbeddingProvider>) -> Self {
		let backends = MemoryBackends::new(&config.search.fields);
		let service = BazaarService::new(config, backends.collaborators(embedding));

		Self { service: Arc::new(service), backends }
	}

	/// Seeds the stores without touching the embedding provider or the result cache.
	pub async fn load_catalog(&self, items: Vec<SearchableItem>) -> Result<usize> {
		let mut loaded = 0;

		for item in items {
			validate_item(&item)?;
			self.service.collaborators.text_index.index_item(&item).await?;
			self.backends.items.upsert(item);

			loaded += 1;
		}

		Ok(loaded)
	}

	pub async fn upsert_item(&self, item: SearchableItem) -> Result<ItemChangeReport> {
		validate_item(&item)?;
		self.backends.items.upsert(item.clone());

		self.service.on_item_changed(&item).await
	}

	/// Returns `None` when the item is unknown.
	pub async fn remove_item(&self, item_id: Uuid) -> Result<Option<ItemChangeReport>> {
		if self.backends.items.get_by_id(item_id).is_none() {
			return Ok(None);
		}

		self.backends.items.remove(item_id)?;

		Ok(Some(self.service.on_item_removed(item_id).await?))
	}

	pub fn put_profile(&self, user_id: &str, profile: UserSearchProfile) -> Result<()> {
		let user_id = user_id.trim();

		if user_id.is_empty() {
			return Err(Error::InvalidRequest { message: "user_id must not be empty.".to_string() });
		}

		self.backends.profiles.put(user_id, profile);

		Ok(())
	}
}

fn validate_item(item: &SearchableItem) -> Result<()> {
	if item.name.trim().is_empty() {
		return Err(Error::InvalidRequest { message: "Item name must not be empty.".to_string() });
	}
	if !item.price.is_valid() {
		return Err(Error::InvalidRequest {
			message: format!("Item {} has an invalid price range.", item.item_id),
		});
	}

	Ok(())
}
