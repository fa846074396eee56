use std::sync::Arc;

use bazaar_domain::query::{GeoFilter, Pagination, SearchFilters, SortMode};
use bazaar_service::{SearchStatus, search::ranking::Signal};
use bazaar_testkit::{GLOW_MAKEUP, LISBON, OLD_TOWN_CATERING, SUNSET_PHOTOGRAPHY, SUNSET_STUDIOS};

use super::ConceptEmbedding;

#[tokio::test]
async fn stronger_name_match_ranks_first() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));
	let page =
		harness.service.search(super::request("Sunset Photo")).await.expect("Search failed.");
	let position = |id| page.results.iter().position(|result| result.item_id == id);

	assert_eq!(page.status, SearchStatus::Ok);
	assert_eq!(page.query, "sunset photo");
	assert_eq!(page.results[0].item_id, SUNSET_PHOTOGRAPHY);
	assert!(position(SUNSET_STUDIOS).expect("Studios should match.") > 0);
	assert!(page.results[0].explain.signals.contains(&Signal::Keyword));
	assert!(page.results[0].explain.signals.contains(&Signal::Semantic));
}

#[tokio::test]
async fn suspended_items_never_surface() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));
	let page =
		harness.service.search(super::request("wedding catering")).await.expect("Search failed.");

	assert!(page.results.iter().all(|result| result.item_id != OLD_TOWN_CATERING));
}

#[tokio::test]
async fn distance_sort_is_non_decreasing() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));
	let mut request = super::request("wedding");

	request.filters = SearchFilters {
		geo: Some(GeoFilter { center: LISBON, radius_km: 50.0 }),
		..Default::default()
	};
	request.sort = SortMode::Distance;

	let page = harness.service.search(request).await.expect("Search failed.");
	let distances: Vec<f64> = page
		.results
		.iter()
		.map(|result| result.explain.distance_km.expect("Geo search reports distance."))
		.collect();

	assert!(!distances.is_empty());
	assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
	assert!(distances.iter().all(|distance| *distance <= 50.0));
	assert!(page.results.iter().all(|result| result.item_id != GLOW_MAKEUP));
}

#[tokio::test]
async fn empty_query_browses_by_popularity() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));
	let page = harness.service.search(super::request("   ")).await.expect("Search failed.");

	assert_eq!(page.status, SearchStatus::Ok);
	assert_eq!(page.total, 5);
	assert!(page.results.iter().all(|result| result.explain.keyword.is_none()));
	assert!(page.results.windows(2).all(|pair| pair[0].score >= pair[1].score));
}

#[tokio::test]
async fn facets_cover_the_full_ranked_set() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));
	let mut request = super::request("");

	request.pagination = Some(Pagination { offset: 0, size: 2 });

	let page = harness.service.search(request).await.expect("Search failed.");
	let by_category: u32 = page.facets.categories.values().sum();
	let by_price: u32 = page.facets.price_buckets.values().sum();

	assert_eq!(page.results.len(), 2);
	assert_eq!(by_category, page.total);
	assert_eq!(by_price, page.total);
	assert_eq!(page.facets.categories.get("photography"), Some(&2));
	assert_eq!(page.facets.price_buckets.get("over_2000"), Some(&1));
}

#[tokio::test]
async fn profile_adds_personalization_scores() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));

	harness.backends.profiles.put("u-photo", bazaar_testkit::photography_profile());

	let mut request = super::request("wedding");

	request.user_id = Some("u-photo".to_string());

	let personal = harness.service.search(request).await.expect("Search failed.");
	let anonymous =
		harness.service.search(super::request("wedding")).await.expect("Search failed.");

	assert!(personal.results.iter().all(|result| result.explain.personalization.is_some()));
	assert!(anonymous.results.iter().all(|result| result.explain.personalization.is_none()));
	assert!(!anonymous.cached);
}

#[tokio::test]
async fn invalid_requests_are_rejected() {
	let harness = super::harness(Arc::new(ConceptEmbedding::new()));
	let mut zero_page = super::request("venue");
	let mut distance_without_geo = super::request("venue");

	zero_page.pagination = Some(Pagination { offset: 0, size: 0 });
	distance_without_geo.sort = SortMode::Distance;

	for request in [zero_page, distance_without_geo] {
		let err = harness.service.search(request).await.expect_err("Request should be rejected.");

		assert!(matches!(err, bazaar_service::Error::InvalidRequest { .. }));
	}
}
