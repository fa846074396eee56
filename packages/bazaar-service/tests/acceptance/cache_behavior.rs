use std::sync::{Arc, atomic::Ordering};

use bazaar_domain::query::Pagination;
use bazaar_service::{SearchStatus, embedding};
use bazaar_testkit::SUNSET_PHOTOGRAPHY;

use super::ConceptEmbedding;

#[tokio::test]
async fn repeated_search_is_served_from_cache() {
	let embedding = ConceptEmbedding::new();
	let calls = embedding.calls.clone();
	let harness = super::harness(Arc::new(embedding));
	let first =
		harness.service.search(super::request("sunset photo")).await.expect("Search failed.");
	let calls_after_first = calls.load(Ordering::SeqCst);
	let second =
		harness.service.search(super::request("  SUNSET photo")).await.expect("Search failed.");

	assert_eq!(first.status, SearchStatus::Ok);
	assert!(!first.cached);
	assert!(second.cached);
	assert_eq!(super::ids(&second), super::ids(&first));
	assert_eq!(second.facets, first.facets);
	assert_eq!(calls.load(Ordering::SeqCst), calls_after_first);
}

#[tokio::test]
async fn embeddings_are_reused_across_queries() {
	let embedding = ConceptEmbedding::new();
	let calls = embedding.calls.clone();
	let harness = super::harness(Arc::new(embedding));

	harness.service.search(super::request("sunset photo")).await.expect("Search failed.");

	let calls_after_first = calls.load(Ordering::SeqCst);

	harness.service.search(super::request("wedding venue")).await.expect("Search failed.");

	// Only the new query text needs the provider; item vectors are stored on the items.
	assert_eq!(calls.load(Ordering::SeqCst), calls_after_first + 1);
}

#[tokio::test]
async fn item_vectors_outlive_the_embedding_cache() {
	let embedding = ConceptEmbedding::new();
	let calls = embedding.calls.clone();
	let harness = super::harness(Arc::new(embedding));

	harness.service.search(super::request("sunset photo")).await.expect("Search failed.");

	let stored = harness.backends.items.get_by_id(SUNSET_PHOTOGRAPHY).expect("Missing item.");

	assert!(stored.cached_embedding().is_some());

	let evicted =
		harness.backends.kv.evict_prefix(embedding::ITEM_NAMESPACE).expect("Evict failed.");
	let calls_after_first = calls.load(Ordering::SeqCst);

	harness.service.search(super::request("wedding venue")).await.expect("Search failed.");

	assert!(evicted > 0);
	assert_eq!(calls.load(Ordering::SeqCst), calls_after_first + 1);
}

#[tokio::test]
async fn disabled_cache_always_recomputes() {
	let mut cfg = bazaar_testkit::test_config();

	cfg.search.cache.enabled = false;

	let harness = super::harness_with(cfg, Arc::new(ConceptEmbedding::new()));
	let first =
		harness.service.search(super::request("sunset photo")).await.expect("Search failed.");
	let second =
		harness.service.search(super::request("sunset photo")).await.expect("Search failed.");

	assert!(!first.cached);
	assert!(!second.cached);
	assert!(harness.backends.kv.is_empty());
}

#[tokio::test]
async fn pagination_is_part_of_the_key() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));
	let mut second_page = super::request("wedding");

	second_page.pagination = Some(Pagination { offset: 1, size: 1 });

	let full = harness.service.search(super::request("wedding")).await.expect("Search failed.");
	let page = harness.service.search(second_page).await.expect("Search failed.");

	assert!(!page.cached);
	assert_eq!(page.total, full.total);
	assert_eq!(page.results.len(), 1);
	assert_eq!(page.results[0].item_id, full.results[1].item_id);
}
