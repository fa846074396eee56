pub mod embedding;
pub mod feedback;
pub mod memory;
pub mod search;
pub mod suggest;
pub mod trends;

mod error;

pub use error::{Error, Result};
pub use feedback::{QueryEvent, RecordQueryRequest, RecordQueryResponse};
pub use search::{
	Facets, ItemChangeReport, RankedPage, ResultExplain, SearchRequest, SearchResult,
	SearchStatus,
};
pub use suggest::{AutocompleteRequest, SuggestionEntry, SuggestionSource};
pub use trends::TrendingRequest;

use std::{
	future::Future,
	pin::Pin,
	sync::{
		Arc,
		atomic::{AtomicU64, Ordering},
	},
};

use time::Duration;
use uuid::Uuid;

use bazaar_config::{Config, EmbeddingProviderConfig};
use bazaar_domain::{item::SearchableItem, profile::UserSearchProfile, query::SearchFilters};
use bazaar_providers::embedding as provider_embedding;
use bazaar_storage::fulltext::{TextHit, WeightedTerm};
use feedback::{FeedbackQueue, QueryLog};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;

	fn embed_image<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		url: &'a str,
	) -> BoxFuture<'a, Result<Vec<f32>>>;
}

/// Read access to the catalog.
pub trait ItemStore
where
	Self: Send + Sync,
{
	fn find_eligible_by_filters<'a>(
		&'a self,
		filters: &'a SearchFilters,
	) -> BoxFuture<'a, Result<Vec<SearchableItem>>>;

	fn get_by_id<'a>(&'a self, item_id: Uuid) -> BoxFuture<'a, Result<Option<SearchableItem>>>;

	/// Stores `vector` on the item while its text still hashes to `fingerprint`.
	/// Returns whether the item was updated.
	fn set_embedding<'a>(
		&'a self,
		item_id: Uuid,
		fingerprint: &'a str,
		vector: Vec<f32>,
	) -> BoxFuture<'a, Result<bool>>;
}

pub trait TextIndex
where
	Self: Send + Sync,
{
	fn query<'a>(
		&'a self,
		terms: &'a [WeightedTerm],
		filters: &'a SearchFilters,
		page_size: usize,
	) -> BoxFuture<'a, Result<Vec<TextHit>>>;

	fn index_item<'a>(&'a self, item: &'a SearchableItem) -> BoxFuture<'a, Result<()>>;

	fn update_item<'a>(&'a self, item: &'a SearchableItem) -> BoxFuture<'a, Result<()>>;

	fn delete_item<'a>(&'a self, item_id: Uuid) -> BoxFuture<'a, Result<()>>;
}

pub trait KvStore
where
	Self: Send + Sync,
{
	fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>>>;

	fn put<'a>(&'a self, key: &'a str, value: String, ttl: Duration) -> BoxFuture<'a, Result<()>>;

	/// Returns the number of evicted keys.
	fn evict_prefix<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<usize>>;
}

pub trait ProfileProvider
where
	Self: Send + Sync,
{
	fn get_search_profile<'a>(
		&'a self,
		user_id: &'a str,
	) -> BoxFuture<'a, Result<Option<UserSearchProfile>>>;
}

#[derive(Clone)]
pub struct Collaborators {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub items: Arc<dyn ItemStore>,
	pub text_index: Arc<dyn TextIndex>,
	pub kv: Arc<dyn KvStore>,
	pub profiles: Arc<dyn ProfileProvider>,
}

pub struct BazaarService {
	pub cfg: Config,
	pub collaborators: Collaborators,
	query_log: Arc<QueryLog>,
	feedback: FeedbackQueue,
	/// Bumped on every catalog change; part of every result cache key.
	result_generation: AtomicU64,
}

/// Embedding provider backed by the HTTP client.
pub struct DefaultProviders;

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(provider_embedding::embed(cfg, texts).await?) })
	}

	fn embed_image<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		url: &'a str,
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move { Ok(provider_embedding::embed_image(cfg, url).await?) })
	}
}

impl BazaarService {
	pub fn new(cfg: Config, collaborators: Collaborators) -> Self {
		let query_log = Arc::new(QueryLog::new(&cfg));
		let feedback = FeedbackQueue::new(cfg.trends.feedback_queue as usize);

		Self { cfg, collaborators, query_log, feedback, result_generation: AtomicU64::new(0) }
	}

	pub fn result_generation(&self) -> u64 {
		self.result_generation.load(Ordering::SeqCst)
	}
}
