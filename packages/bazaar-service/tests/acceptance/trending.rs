use std::sync::Arc;

use time::{Duration, OffsetDateTime};

use bazaar_service::{QueryEvent, RecordQueryRequest, TrendingRequest};

use super::FailingEmbedding;

fn event(query: &str, user_id: Option<&str>, at: OffsetDateTime) -> QueryEvent {
	QueryEvent { query: query.to_string(), user_id: user_id.map(ToString::to_string), at }
}

#[tokio::test]
async fn repeated_query_outranks_a_single_one() {
	let harness = super::harness(Arc::new(FailingEmbedding));

	harness
		.service
		.record_query(RecordQueryRequest { query: "live band".to_string(), user_id: None })
		.expect("Record failed.");

	for _ in 0..5 {
		harness
			.service
			.record_query(RecordQueryRequest {
				query: "Bridal Makeup".to_string(),
				user_id: Some("u1".to_string()),
			})
			.expect("Record failed.");
	}

	assert_eq!(harness.service.drain_feedback(), 6);

	let trending = harness
		.service
		.get_trending(TrendingRequest { window_hours: Some(24 * 365), max_results: Some(10) })
		.expect("Trending failed.");

	assert_eq!(trending[0].query, "bridal makeup");
	assert_eq!(trending[0].frequency, 5);
	assert!(trending.iter().any(|trend| trend.query == "live band"));
	assert_eq!(harness.service.recent_queries("u1"), vec!["bridal makeup".to_string()]);
}

#[tokio::test]
async fn invalid_trending_requests_are_rejected() {
	let harness = super::harness(Arc::new(FailingEmbedding));

	for request in [
		TrendingRequest { window_hours: Some(0), max_results: None },
		TrendingRequest { window_hours: None, max_results: Some(0) },
	] {
		assert!(harness.service.get_trending(request).is_err());
	}

	assert!(
		harness
			.service
			.record_query(RecordQueryRequest { query: "   ".to_string(), user_id: None })
			.is_err()
	);
}

#[tokio::test]
async fn pruning_drops_old_activity() {
	let harness = super::harness(Arc::new(FailingEmbedding));
	let now = OffsetDateTime::now_utc();

	harness.service.replay_queries(&[
		event("dj", Some("u3"), now - Duration::days(40)),
		event("photo booth", None, now - Duration::hours(1)),
	]);

	let report = harness.service.prune_trends(now);
	let trending = harness
		.service
		.get_trending_at(TrendingRequest { window_hours: Some(24 * 90), max_results: None }, now)
		.expect("Trending failed.");
	let queries: Vec<&str> = trending.iter().map(|trend| trend.query.as_str()).collect();

	assert_eq!(report.events_removed, 1);
	assert_eq!(report.users_removed, 1);
	assert_eq!(queries, vec!["photo booth"]);
	assert!(harness.service.get_frequent("d", 5).is_empty());
	assert!(harness.service.recent_queries("u3").is_empty());
	assert_eq!(harness.service.get_frequent("photo", 5)[0].query, "photo booth");
}

#[tokio::test]
async fn history_is_most_recent_first() {
	let harness = super::harness(Arc::new(FailingEmbedding));
	let now = OffsetDateTime::now_utc();

	harness.service.replay_queries(&[
		event("venue", Some("u2"), now - Duration::minutes(3)),
		event("catering", Some("u2"), now - Duration::minutes(2)),
		event("venue", Some("u2"), now - Duration::minutes(1)),
	]);

	assert_eq!(harness.service.recent_queries("u2"), vec!["venue", "catering"]);
	assert!(harness.service.recent_queries("nobody").is_empty());
}
