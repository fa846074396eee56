use std::sync::{
	Arc,
	atomic::{AtomicUsize, Ordering},
};

use time::{Duration, OffsetDateTime};

use bazaar_domain::{
	query::{Pagination, QueryContext, SearchFilters, SortMode},
	vector,
};
use bazaar_config::EmbeddingProviderConfig;
use bazaar_service::{
	BoxFuture, EmbeddingProvider, Error, Result, SearchStatus, embedding::EmbeddingSource,
	search::cache,
};
use bazaar_testkit::{EMBEDDING_DIMENSIONS, SUNSET_PHOTOGRAPHY};

use super::{ConceptEmbedding, FailingEmbedding, FailingTextIndex, UnavailableKv};

/// Fails every call with either a retryable or a permanent error.
struct CountingFailure {
	calls: Arc<AtomicUsize>,
	transient: bool,
}
impl CountingFailure {
	fn error(&self) -> Error {
		if self.transient {
			Error::Unavailable { message: "embedding service is overloaded".to_string() }
		} else {
			bazaar_providers::Error::InvalidConfig { message: "api key rejected".to_string() }
				.into()
		}
	}
}
impl EmbeddingProvider for CountingFailure {
	fn embed<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let err = self.error();

		Box::pin(async move { Err(err) })
	}

	fn embed_image<'a>(
		&'a self,
		_cfg: &'a EmbeddingProviderConfig,
		_url: &'a str,
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let err = self.error();

		Box::pin(async move { Err(err) })
	}
}

#[tokio::test]
async fn permanent_provider_errors_are_not_retried() {
	let calls = Arc::new(AtomicUsize::new(0));
	let provider = CountingFailure { calls: calls.clone(), transient: false };
	let harness = super::harness(Arc::new(provider));
	let embedded = harness.service.embed_text("floral decor").await;

	assert!(embedded.is_fallback());
	assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transient_provider_errors_use_every_attempt() {
	let cfg = bazaar_testkit::test_config();
	let attempts = cfg.providers.embedding.max_attempts as usize;
	let calls = Arc::new(AtomicUsize::new(0));
	let provider = CountingFailure { calls: calls.clone(), transient: true };
	let harness = super::harness_with(cfg, Arc::new(provider));
	let embedded = harness.service.embed_text("floral decor").await;

	assert!(embedded.is_fallback());
	assert!(attempts > 1);
	assert_eq!(calls.load(Ordering::SeqCst), attempts);
}

#[tokio::test]
async fn embedding_outage_returns_unit_fallback() {
	let harness = super::harness(Arc::new(FailingEmbedding));
	let embedded = harness.service.embed_text("floral decor").await;
	let again = harness.service.embed_text("  Floral   Decor ").await;

	assert_eq!(embedded.source, EmbeddingSource::Fallback);
	assert_eq!(embedded.vector.len(), EMBEDDING_DIMENSIONS as usize);
	assert!(vector::is_unit_length(&embedded.vector));
	assert_eq!(embedded.vector, again.vector);
}

#[tokio::test]
async fn image_embedding_uses_the_same_pipeline() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));
	let first = harness.service.embed_image("https://cdn.example.com/floral.jpg").await;
	let second = harness.service.embed_image("https://cdn.example.com/floral.jpg").await;
	let failing = super::harness(Arc::new(FailingEmbedding));
	let fallback = failing.service.embed_image("https://cdn.example.com/floral.jpg").await;

	assert_eq!(first.source, EmbeddingSource::Provider);
	assert_eq!(second.source, EmbeddingSource::Cache);
	assert!(first.vector.iter().zip(&second.vector).all(|(a, b)| (a - b).abs() < 1e-6));
	assert!(fallback.is_fallback());
	assert!(vector::is_unit_length(&fallback.vector));
}

#[tokio::test]
async fn semantic_outage_yields_partial_keyword_results() {
	let harness = super::harness(Arc::new(FailingEmbedding));
	let first =
		harness.service.search(super::request("sunset photo")).await.expect("Search failed.");
	let second =
		harness.service.search(super::request("sunset photo")).await.expect("Search failed.");

	assert_eq!(first.status, SearchStatus::Partial);
	assert_eq!(first.results[0].item_id, SUNSET_PHOTOGRAPHY);
	assert!(first.results.iter().all(|result| result.explain.semantic.is_none()));
	assert!(!second.cached);
}

#[tokio::test]
async fn total_outage_is_degraded_not_an_error() {
	let cfg = bazaar_testkit::test_config();
	let backends = super::backends(&cfg);
	let mut collaborators = backends.collaborators(Arc::new(FailingEmbedding));

	collaborators.text_index = Arc::new(FailingTextIndex);

	let service = bazaar_service::BazaarService::new(cfg, collaborators);
	let page = service.search(super::request("sunset photo")).await.expect("Search failed.");

	assert_eq!(page.status, SearchStatus::Degraded);
	assert!(page.results.is_empty());
	assert_eq!(page.total, 0);
}

#[tokio::test]
async fn unreachable_cache_is_bypassed() {
	let cfg = bazaar_testkit::test_config();
	let backends = super::backends(&cfg);
	let mut collaborators = backends.collaborators(Arc::new(ConceptEmbedding::new()));

	collaborators.kv = Arc::new(UnavailableKv);

	let service = bazaar_service::BazaarService::new(cfg, collaborators);
	let first = service.search(super::request("sunset photo")).await.expect("Search failed.");
	let second = service.search(super::request("sunset photo")).await.expect("Search failed.");

	assert_eq!(first.status, SearchStatus::Ok);
	assert!(!first.cached);
	assert!(!second.cached);
	assert_eq!(first.results, second.results);
}

#[tokio::test]
async fn corrupt_cache_entries_are_misses() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));
	let first =
		harness.service.search(super::request("sunset photo")).await.expect("Search failed.");
	let ctx = QueryContext::new(
		"sunset photo",
		None,
		SearchFilters::default(),
		Pagination { offset: 0, size: 10 },
		SortMode::Relevance,
		100,
	)
	.expect("Invalid context.");
	let generation = harness.service.result_generation();
	let key = cache::build_result_cache_key(&ctx, cache::ANONYMOUS_SEGMENT, generation)
		.expect("Key failed.");

	harness
		.backends
		.kv
		.put(&key, "{not json".to_string(), Duration::minutes(5), OffsetDateTime::now_utc())
		.expect("Overwrite failed.");

	let second =
		harness.service.search(super::request("sunset photo")).await.expect("Search failed.");
	let third =
		harness.service.search(super::request("sunset photo")).await.expect("Search failed.");

	assert!(!second.cached);
	assert_eq!(super::ids(&second), super::ids(&first));
	assert!(third.cached);
}
