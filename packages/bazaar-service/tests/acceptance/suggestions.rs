use std::{collections::BTreeSet, sync::Arc};

use time::{Duration, OffsetDateTime};

use bazaar_service::{
	AutocompleteRequest, BazaarService, Error, QueryEvent, SuggestionEntry, SuggestionSource,
};

use super::{ConceptEmbedding, FailingEmbedding};

fn replay(service: &BazaarService, queries: &[(&str, Option<&str>)]) {
	let start = OffsetDateTime::now_utc() - Duration::minutes(queries.len() as i64);
	let events: Vec<QueryEvent> = queries
		.iter()
		.enumerate()
		.map(|(idx, (query, user_id))| QueryEvent {
			query: query.to_string(),
			user_id: user_id.map(ToString::to_string),
			at: start + Duration::minutes(idx as i64),
		})
		.collect();

	service.replay_queries(&events);
}

async fn suggest(
	service: &BazaarService,
	prefix: &str,
	user_id: Option<&str>,
) -> Vec<SuggestionEntry> {
	service
		.autocomplete(AutocompleteRequest {
			partial_query: prefix.to_string(),
			user_id: user_id.map(ToString::to_string),
			max_results: None,
		})
		.await
		.expect("Autocomplete failed.")
}

#[tokio::test]
async fn prefix_returns_only_matching_queries() {
	let harness = super::harness(Arc::new(FailingEmbedding));

	replay(&harness.service, &[("wedding", None), ("wedding cake", None), ("venue", None)]);

	let texts: BTreeSet<String> =
		suggest(&harness.service, "we", None).await.into_iter().map(|entry| entry.text).collect();

	assert_eq!(texts, BTreeSet::from(["wedding".to_string(), "wedding cake".to_string()]));
}

#[tokio::test]
async fn short_prefix_is_empty_not_an_error() {
	let harness = super::harness(Arc::new(FailingEmbedding));

	replay(&harness.service, &[("wedding", None)]);

	assert!(suggest(&harness.service, "w", None).await.is_empty());
	assert!(suggest(&harness.service, "  ", None).await.is_empty());
}

#[tokio::test]
async fn zero_max_results_is_invalid() {
	let harness = super::harness(Arc::new(FailingEmbedding));
	let err = harness
		.service
		.autocomplete(AutocompleteRequest {
			partial_query: "wedding".to_string(),
			user_id: None,
			max_results: Some(0),
		})
		.await
		.expect_err("Zero results should be rejected.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
}

#[tokio::test]
async fn personal_history_outscores_plain_completion() {
	let harness = super::harness(Arc::new(FailingEmbedding));

	replay(
		&harness.service,
		&[("wedding dj", Some("u1")), ("wedding venue", None), ("wedding venue", None)],
	);

	let personal = suggest(&harness.service, "wed", Some("u1")).await;
	let anonymous = suggest(&harness.service, "wed", None).await;
	let dj = personal.iter().find(|entry| entry.text == "wedding dj").expect("Missing entry.");

	assert_eq!(dj.source, SuggestionSource::Personalized);
	assert!(anonymous.iter().all(|entry| entry.source != SuggestionSource::Personalized));
}

#[tokio::test]
async fn related_terms_follow_prefix_matches() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));

	replay(&harness.service, &[("bridal makeup", None), ("wedding", None), ("wedding", None)]);

	let entries = suggest(&harness.service, "bridal", None).await;
	let texts: Vec<&str> = entries.iter().map(|entry| entry.text.as_str()).collect();
	let wedding_at = texts.iter().position(|text| *text == "wedding").expect("Missing entry.");
	let wedding = &entries[wedding_at];

	assert!(texts.contains(&"bridal makeup"));
	assert!(texts[..wedding_at].iter().all(|text| text.starts_with("bridal")));
	assert_eq!(wedding.source, SuggestionSource::Semantic);
	assert_eq!(wedding.frequency, Some(2));
}

#[tokio::test]
async fn results_are_capped() {
	let mut cfg = bazaar_testkit::test_config();

	cfg.suggest.max_results_cap = 2;

	let harness = super::harness_with(cfg, Arc::new(FailingEmbedding));

	replay(
		&harness.service,
		&[("wedding", None), ("wedding cake", None), ("wedding dj", None), ("west", None)],
	);

	let entries = harness
		.service
		.autocomplete(AutocompleteRequest {
			partial_query: "we".to_string(),
			user_id: None,
			max_results: Some(10),
		})
		.await
		.expect("Autocomplete failed.");

	assert_eq!(entries.len(), 2);
	assert!(entries.windows(2).all(|pair| pair[0].score >= pair[1].score));
}
