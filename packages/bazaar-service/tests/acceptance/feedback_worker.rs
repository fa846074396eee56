use std::{sync::Arc, time::Duration};

use bazaar_service::{AutocompleteRequest, RecordQueryRequest};

use super::{ConceptEmbedding, FailingEmbedding};

#[tokio::test]
async fn worker_applies_recorded_queries() {
	let harness = super::harness(Arc::new(FailingEmbedding));
	let worker = harness.service.spawn_feedback_worker().expect("Worker should start once.");

	assert!(harness.service.spawn_feedback_worker().is_none());

	let response = harness
		.service
		.record_query(RecordQueryRequest { query: "Vegan Catering".to_string(), user_id: None })
		.expect("Record failed.");

	assert!(response.accepted);

	let mut applied = false;

	for _ in 0..100 {
		if !harness.service.get_frequent("vegan", 5).is_empty() {
			applied = true;

			break;
		}

		tokio::time::sleep(Duration::from_millis(10)).await;
	}

	assert!(applied);

	drop(harness);

	tokio::time::timeout(Duration::from_secs(1), worker)
		.await
		.expect("Worker should stop with the service.")
		.expect("Worker panicked.");
}

#[tokio::test]
async fn completed_searches_feed_autocomplete() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));

	harness.service.search(super::request("Wedding Cake")).await.expect("Search failed.");
	harness.service.search(super::request("wedding cake")).await.expect("Search failed.");
	harness.service.drain_feedback();

	let suggestions = harness
		.service
		.autocomplete(AutocompleteRequest {
			partial_query: "wed".to_string(),
			user_id: None,
			max_results: Some(5),
		})
		.await
		.expect("Autocomplete failed.");

	assert!(suggestions.iter().any(|entry| entry.text == "wedding cake"));
	assert!(suggestions.iter().all(|entry| entry.text.starts_with("wed")));
}
