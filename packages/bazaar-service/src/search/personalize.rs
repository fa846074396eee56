use std::collections::HashMap;

use uuid::Uuid;

use crate::search::ranking::{self, ScoredCandidate};
use bazaar_config::Personalization;
use bazaar_domain::{geo, item::SearchableItem, profile::UserSearchProfile};

/// Affinity between `item` and `profile` in [0, 1].
///
/// Components the profile does not define are left out of the weighted mean.
pub fn personalization_score(
	item: &SearchableItem,
	profile: &UserSearchProfile,
	cfg: &Personalization,
) -> f32 {
	let mut weighted = 0.0_f32;
	let mut total = 0.0_f32;

	if !profile.preferred_categories.is_empty() {
		let category = if profile.prefers_category(&item.category) { 1.0 } else { 0.0 };

		weighted += cfg.category_weight * category;
		total += cfg.category_weight;
	}
	if let Some(range) = profile.price_range.as_ref() {
		weighted += cfg.price_weight * item.price.overlap_ratio(range);
		total += cfg.price_weight;
	}
	if !profile.locations.is_empty() {
		let nearest = item.coordinate.and_then(|point| {
			profile
				.locations
				.iter()
				.map(|home| geo::haversine_km(*home, point))
				.min_by(|a, b| a.total_cmp(b))
		});
		let location = nearest
			.map(|distance| geo::proximity_score(distance, cfg.location_radius_km))
			.unwrap_or(0.0);

		weighted += cfg.location_weight * location;
		total += cfg.location_weight;
	}
	if let Some(preferred) = profile.quality_preference {
		let quality = 1.0 - (item.rating - preferred).abs() / 5.0;

		weighted += cfg.quality_weight * quality.clamp(0.0, 1.0);
		total += cfg.quality_weight;
	}

	if total <= 0.0 {
		return 0.0;
	}

	(weighted / total).clamp(0.0, 1.0)
}

/// Scales each score by `1 + personalization * boost` and re-sorts.
pub fn adjust(
	mut ranked: Vec<ScoredCandidate>,
	items: &HashMap<Uuid, SearchableItem>,
	profile: &UserSearchProfile,
	cfg: &Personalization,
) -> Vec<ScoredCandidate> {
	if !cfg.enabled || profile.is_empty() {
		return ranked;
	}

	for candidate in ranked.iter_mut() {
		let Some(item) = items.get(&candidate.item_id) else { continue };
		let score = personalization_score(item, profile, cfg);

		candidate.personalization = Some(score);
		candidate.final_score = candidate.combined * (1.0 + score * cfg.boost);
	}

	ranking::sort_by_final_score(&mut ranked);

	ranked
}

#[cfg(test)]
mod tests {
	use super::*;
	use bazaar_testkit::{BLOOM_FLORAL, SUNSET_PHOTOGRAPHY, SUNSET_STUDIOS};

	fn items() -> HashMap<Uuid, SearchableItem> {
		bazaar_testkit::sample_items().into_iter().map(|item| (item.item_id, item)).collect()
	}

	fn scored(item_id: Uuid, combined: f32) -> ScoredCandidate {
		ScoredCandidate {
			item_id,
			keyword: Some(combined),
			semantic: None,
			geo: None,
			popularity: 0.0,
			combined,
			personalization: None,
			final_score: combined,
			signals: Vec::new(),
		}
	}

	#[test]
	fn matching_profile_scores_higher() {
		let items = items();
		let profile = bazaar_testkit::photography_profile();
		let cfg = Personalization::default();
		let photographer = personalization_score(&items[&SUNSET_PHOTOGRAPHY], &profile, &cfg);
		let florist = personalization_score(&items[&BLOOM_FLORAL], &profile, &cfg);

		assert!(photographer > florist);
		assert!((0.0..=1.0).contains(&photographer));
	}

	#[test]
	fn boost_nudges_close_scores_only() {
		let items = items();
		let profile = bazaar_testkit::photography_profile();
		let cfg = Personalization::default();
		let close = adjust(
			vec![scored(BLOOM_FLORAL, 0.50), scored(SUNSET_PHOTOGRAPHY, 0.48)],
			&items,
			&profile,
			&cfg,
		);
		let far = adjust(
			vec![scored(BLOOM_FLORAL, 0.90), scored(SUNSET_STUDIOS, 0.40)],
			&items,
			&profile,
			&cfg,
		);

		assert_eq!(close[0].item_id, SUNSET_PHOTOGRAPHY);
		assert_eq!(far[0].item_id, BLOOM_FLORAL);
		assert!(far.iter().all(|c| c.final_score <= c.combined * (1.0 + cfg.boost)));
	}

	#[test]
	fn empty_profile_changes_nothing() {
		let ranked = vec![scored(BLOOM_FLORAL, 0.5), scored(SUNSET_PHOTOGRAPHY, 0.4)];
		let adjusted = adjust(
			ranked.clone(),
			&items(),
			&UserSearchProfile::default(),
			&Personalization::default(),
		);

		assert_eq!(adjusted, ranked);
	}
}
