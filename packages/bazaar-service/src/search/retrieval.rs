use std::collections::HashMap;

use uuid::Uuid;

use crate::{BazaarService, Error, Result, search::ranking};
use bazaar_domain::{geo, item::SearchableItem, query::QueryContext, vector};
use bazaar_storage::fulltext::WeightedTerm;

#[derive(Debug, Clone, Default)]
pub struct SemanticCandidates {
	pub candidates: Vec<(Uuid, f32)>,
	/// Every eligible item that matched the filters, whether or not it passed the threshold.
	pub items: Vec<SearchableItem>,
}

/// Distance and proximity score per item with a coordinate inside the geo filter.
#[derive(Debug, Clone, Default)]
pub struct GeoScores {
	pub scores: HashMap<Uuid, f32>,
	pub distances_km: HashMap<Uuid, f64>,
}

impl BazaarService {
	pub async fn keyword_candidates(
		&self,
		ctx: &QueryContext,
		cap: usize,
	) -> Result<Vec<(Uuid, f32)>> {
		let terms: Vec<WeightedTerm> = ctx.tokens.iter().map(WeightedTerm::new).collect();

		if terms.is_empty() {
			return Ok(Vec::new());
		}

		let hits = self.collaborators.text_index.query(&terms, &ctx.filters, cap.max(1)).await?;

		Ok(hits.into_iter().map(|hit| (hit.item_id, hit.score)).collect())
	}

	/// Cosine similarity between the query embedding and every filter-matching item.
	///
	/// Fails with `Unavailable` when the query embedding is the fallback vector.
	pub async fn semantic_candidates(
		&self,
		ctx: &QueryContext,
		cap: usize,
	) -> Result<SemanticCandidates> {
		let query = self.embed_text(&ctx.normalized_query).await;

		if query.is_fallback() {
			return Err(Error::Unavailable {
				message: "Query embedding is unavailable.".to_string(),
			});
		}

		let items = self.collaborators.items.find_eligible_by_filters(&ctx.filters).await?;
		let threshold = self.cfg.search.semantic_threshold;
		let mut candidates = Vec::new();

		for item in &items {
			let embedded = self.embed_item(item).await;

			if embedded.is_fallback() {
				continue;
			}

			self.store_item_embedding(item, &embedded).await;
			if embedded.vector.len() != query.vector.len() {
				tracing::error!(
					item_id = %item.item_id,
					dimensions = embedded.vector.len(),
					expected = query.vector.len(),
					"Embedding dimension mismatch."
				);

				continue;
			}

			let similarity = vector::cosine_similarity(&query.vector, &embedded.vector);

			if similarity >= threshold {
				candidates.push((item.item_id, similarity.clamp(0.0, 1.0)));
			}
		}

		candidates.sort_by(|a, b| ranking::cmp_f32_desc(a.1, b.1).then_with(|| a.0.cmp(&b.0)));
		candidates.truncate(cap.max(1));

		Ok(SemanticCandidates { candidates, items })
	}
}

pub fn geo_scores<'a>(
	ctx: &QueryContext,
	items: impl IntoIterator<Item = &'a SearchableItem>,
) -> Option<GeoScores> {
	let filter = ctx.filters.geo.as_ref()?;
	let mut out = GeoScores::default();

	for item in items {
		let Some(distance) = item.coordinate.and_then(|point| filter.distance_within(point)) else {
			continue;
		};

		out.scores.insert(item.item_id, geo::proximity_score(distance, filter.radius_km));
		out.distances_km.insert(item.item_id, distance);
	}

	Some(out)
}
