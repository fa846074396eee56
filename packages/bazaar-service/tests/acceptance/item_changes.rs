use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use bazaar_domain::query::{Pagination, QueryContext, SearchFilters, SortMode};
use bazaar_service::{embedding::EmbeddingSource, search::cache};
use bazaar_testkit::{SUNSET_PHOTOGRAPHY, SUNSET_STUDIOS};

use super::{ConceptEmbedding, FailingEmbedding};

#[tokio::test]
async fn item_change_invalidates_cached_pages() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));

	harness.service.search(super::request("sunset photo")).await.expect("Search failed.");

	let mut studios = bazaar_testkit::sample_item(SUNSET_STUDIOS).expect("Missing fixture.");

	studios.name = "Sunset Photo Studios".to_string();
	harness.backends.items.upsert(studios.clone());

	let report = harness.service.on_item_changed(&studios).await.expect("Change failed.");
	let page =
		harness.service.search(super::request("sunset photo")).await.expect("Search failed.");

	assert_eq!(report.item_id, SUNSET_STUDIOS);
	assert_eq!(report.embedding, Some(EmbeddingSource::Provider));
	assert!(
		harness
			.backends
			.items
			.get_by_id(SUNSET_STUDIOS)
			.is_some_and(|item| item.cached_embedding().is_some())
	);
	assert!(report.evicted_pages >= 1);
	assert!(!page.cached);
	assert!(page.results.iter().any(|result| result.name == "Sunset Photo Studios"));
}

#[tokio::test]
async fn stored_embedding_skips_the_provider() {
	let harness = super::harness(Arc::new(FailingEmbedding));
	let mut item = bazaar_testkit::sample_item(SUNSET_PHOTOGRAPHY).expect("Missing fixture.");
	let dim = harness.service.cfg.providers.embedding.dimensions as usize;
	let mut vector = super::concept_vector(&item.embedding_input(), dim);

	bazaar_domain::vector::l2_normalize(&mut vector);
	item.set_embedding(vector);

	let report = harness.service.on_item_changed(&item).await.expect("Change failed.");

	assert_eq!(report.embedding, Some(EmbeddingSource::Item));
}

#[tokio::test]
async fn removed_items_disappear_from_results() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));
	let before = harness.service.search(super::request("sunset")).await.expect("Search failed.");

	assert!(super::ids(&before).contains(&SUNSET_STUDIOS));

	harness.backends.items.remove(SUNSET_STUDIOS).expect("Remove failed.");

	let report = harness.service.on_item_removed(SUNSET_STUDIOS).await.expect("Removal failed.");
	let after = harness.service.search(super::request("sunset")).await.expect("Search failed.");

	assert_eq!(report.embedding, None);
	assert!(report.evicted_pages >= 1);
	assert!(!after.cached);
	assert!(!super::ids(&after).contains(&SUNSET_STUDIOS));
}

#[tokio::test]
async fn pages_computed_before_a_change_are_never_served_after_it() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));
	let ctx = QueryContext::new(
		"sunset photo",
		None,
		SearchFilters::default(),
		Pagination { offset: 0, size: 10 },
		SortMode::Relevance,
		100,
	)
	.expect("Invalid context.");
	let before = harness.service.result_generation();
	let stale_key = cache::build_result_cache_key(&ctx, cache::ANONYMOUS_SEGMENT, before)
		.expect("Key failed.");
	let mut stale =
		harness.service.search(super::request("sunset photo")).await.expect("Search failed.");
	let mut studios = bazaar_testkit::sample_item(SUNSET_STUDIOS).expect("Missing fixture.");

	studios.name = "Sunset Photo Studios".to_string();
	harness.backends.items.upsert(studios.clone());
	harness.service.on_item_changed(&studios).await.expect("Change failed.");

	// A search that started before the change finishes and writes its page afterwards.
	stale.results.retain(|result| result.item_id != SUNSET_STUDIOS);
	harness
		.backends
		.kv
		.put(
			&stale_key,
			serde_json::to_string(&stale).expect("Encode failed."),
			Duration::minutes(5),
			OffsetDateTime::now_utc(),
		)
		.expect("Put failed.");

	let page =
		harness.service.search(super::request("sunset photo")).await.expect("Search failed.");

	assert!(harness.service.result_generation() > before);
	assert!(!page.cached);
	assert!(page.results.iter().any(|result| result.name == "Sunset Photo Studios"));
}
