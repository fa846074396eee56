use std::{cmp::Ordering, collections::HashMap};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use bazaar_config::{Ranking, RankingPopularity};
use bazaar_domain::item::Popularity;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
	Keyword,
	Semantic,
	Geo,
	Popularity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
	pub item_id: Uuid,
	pub keyword: Option<f32>,
	pub semantic: Option<f32>,
	pub geo: Option<f32>,
	pub popularity: f32,
	/// Weighted fusion of the partial scores.
	pub combined: f32,
	pub personalization: Option<f32>,
	/// `combined` after personalization; what results are ordered by.
	pub final_score: f32,
	/// Signals that contributed, in fixed order.
	pub signals: Vec<Signal>,
}

/// Partial scores per retrieval path. `geo` is `None` when the query has no geo filter.
#[derive(Debug, Clone, Copy)]
pub struct RankSignals<'a> {
	pub keyword: &'a [(Uuid, f32)],
	pub semantic: &'a [(Uuid, f32)],
	pub geo: Option<&'a HashMap<Uuid, f32>>,
	pub popularity: &'a HashMap<Uuid, f32>,
}

/// Fuses keyword and semantic candidates into one list, best first.
///
/// Only active signal classes count toward the normalizing weight, so combined scores stay in
/// [0, 1]. Candidates seen by exactly one of the keyword and semantic paths are scaled by
/// `single_signal_factor`. Equal scores are ordered by item id.
pub fn merge(signals: RankSignals<'_>, cfg: &Ranking) -> Vec<ScoredCandidate> {
	let mut by_item: HashMap<Uuid, (Option<f32>, Option<f32>)> = HashMap::new();

	for (item_id, score) in signals.keyword {
		let entry = by_item.entry(*item_id).or_default();

		entry.0 = Some(entry.0.map_or(*score, |existing| existing.max(*score)));
	}
	for (item_id, score) in signals.semantic {
		let entry = by_item.entry(*item_id).or_default();

		entry.1 = Some(entry.1.map_or(*score, |existing| existing.max(*score)));
	}

	let total_weight = cfg.keyword_weight
		+ cfg.semantic_weight
		+ cfg.popularity_weight
		+ if signals.geo.is_some() { cfg.geo_weight } else { 0.0 };
	let mut out: Vec<ScoredCandidate> = by_item
		.into_iter()
		.map(|(item_id, (keyword, semantic))| {
			let geo = signals.geo.map(|geo| geo.get(&item_id).copied().unwrap_or(0.0));
			let popularity = signals.popularity.get(&item_id).copied().unwrap_or(0.0);
			let weighted = cfg.keyword_weight * keyword.unwrap_or(0.0)
				+ cfg.semantic_weight * semantic.unwrap_or(0.0)
				+ cfg.geo_weight * geo.unwrap_or(0.0)
				+ cfg.popularity_weight * popularity;
			let mut combined = normalize_weighted(weighted, total_weight);

			if keyword.is_some() != semantic.is_some() {
				combined *= cfg.single_signal_factor;
			}

			candidate(item_id, keyword, semantic, geo, popularity, combined)
		})
		.collect();

	sort_by_final_score(&mut out);

	out
}

/// Ranks items without a text query using only geo and popularity.
pub fn browse(
	item_ids: &[Uuid],
	geo: Option<&HashMap<Uuid, f32>>,
	popularity: &HashMap<Uuid, f32>,
	cfg: &Ranking,
) -> Vec<ScoredCandidate> {
	let total_weight = cfg.popularity_weight + if geo.is_some() { cfg.geo_weight } else { 0.0 };
	let mut out: Vec<ScoredCandidate> = item_ids
		.iter()
		.map(|item_id| {
			let geo = geo.map(|geo| geo.get(item_id).copied().unwrap_or(0.0));
			let popularity = popularity.get(item_id).copied().unwrap_or(0.0);
			let weighted = cfg.geo_weight * geo.unwrap_or(0.0) + cfg.popularity_weight * popularity;
			let combined = if total_weight > 0.0 {
				normalize_weighted(weighted, total_weight)
			} else {
				popularity
			};

			candidate(*item_id, None, None, geo, popularity, combined)
		})
		.collect();

	sort_by_final_score(&mut out);
	out.dedup_by_key(|candidate| candidate.item_id);

	out
}

/// Saturating blend of recent and lifetime interactions, in [0, 1).
pub fn popularity_score(popularity: &Popularity, cfg: &RankingPopularity) -> f32 {
	let recent = popularity.recent_interactions as f32;
	let total = popularity.total_interactions as f32;
	let recent_part = recent / (recent + cfg.recent_half_saturation);
	let total_part = total / (total + cfg.total_half_saturation);

	(cfg.recent_share * recent_part + (1.0 - cfg.recent_share) * total_part).clamp(0.0, 1.0)
}

pub fn sort_by_final_score(candidates: &mut [ScoredCandidate]) {
	candidates.sort_by(cmp_final_desc);
}

pub fn cmp_final_desc(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
	cmp_f32_desc(a.final_score, b.final_score).then_with(|| a.item_id.cmp(&b.item_id))
}

pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	b.partial_cmp(&a).unwrap_or(Ordering::Equal)
}

fn normalize_weighted(weighted: f32, total_weight: f32) -> f32 {
	if total_weight <= 0.0 {
		return 0.0;
	}

	(weighted / total_weight).clamp(0.0, 1.0)
}

fn candidate(
	item_id: Uuid,
	keyword: Option<f32>,
	semantic: Option<f32>,
	geo: Option<f32>,
	popularity: f32,
	combined: f32,
) -> ScoredCandidate {
	let mut signals = Vec::with_capacity(4);

	if keyword.is_some() {
		signals.push(Signal::Keyword);
	}
	if semantic.is_some() {
		signals.push(Signal::Semantic);
	}
	if geo.is_some_and(|score| score > 0.0) {
		signals.push(Signal::Geo);
	}
	if popularity > 0.0 {
		signals.push(Signal::Popularity);
	}

	ScoredCandidate {
		item_id,
		keyword,
		semantic,
		geo,
		popularity,
		combined,
		personalization: None,
		final_score: combined,
		signals,
	}
}
