use std::{collections::HashMap, sync::RwLock};

use uuid::Uuid;

use crate::{Error, Result};
use bazaar_domain::{item::SearchableItem, normalize, query::SearchFilters};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldWeights {
	pub name: f32,
	pub description: f32,
	pub tags: f32,
	/// Credit for a query term that is a prefix of an indexed token.
	pub prefix_credit: f32,
	/// Shorter query terms only match exactly.
	pub min_prefix_chars: usize,
}
impl Default for FieldWeights {
	fn default() -> Self {
		Self { name: 3.0, description: 1.5, tags: 1.0, prefix_credit: 0.75, min_prefix_chars: 3 }
	}
}

/// A query term and its importance relative to the other terms.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightedTerm {
	pub term: String,
	pub weight: f32,
}
impl WeightedTerm {
	pub fn new(term: impl Into<String>) -> Self {
		Self { term: term.into(), weight: 1.0 }
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextHit {
	pub item_id: Uuid,
	/// In [0, 1].
	pub score: f32,
}

#[derive(Debug)]
struct IndexedDoc {
	item: SearchableItem,
	name: Vec<String>,
	description: Vec<String>,
	tags: Vec<String>,
}

/// Field-weighted keyword index over eligible items.
#[derive(Debug)]
pub struct MemoryTextIndex {
	weights: FieldWeights,
	docs: RwLock<HashMap<Uuid, IndexedDoc>>,
}
impl MemoryTextIndex {
	pub fn new(weights: FieldWeights) -> Self {
		Self { weights, docs: RwLock::new(HashMap::new()) }
	}

	pub fn index_item(&self, item: &SearchableItem) {
		let doc = IndexedDoc {
			item: item.clone(),
			name: normalize::text_terms(&item.name),
			description: normalize::text_terms(&item.description),
			tags: item.service_tags.iter().flat_map(|tag| normalize::text_terms(tag)).collect(),
		};

		crate::write(&self.docs).insert(item.item_id, doc);
	}

	pub fn update_item(&self, item: &SearchableItem) {
		self.index_item(item);
	}

	pub fn delete_item(&self, item_id: Uuid) -> bool {
		crate::write(&self.docs).remove(&item_id).is_some()
	}

	pub fn len(&self) -> usize {
		crate::read(&self.docs).len()
	}

	pub fn is_empty(&self) -> bool {
		crate::read(&self.docs).is_empty()
	}

	/// Items matching `filters` with a positive keyword score, best first.
	///
	/// A term's credit is the best field weight it earns, exact token matches earning the full
	/// weight and prefix matches `prefix_credit` of it. The score divides the summed credit by
	/// the best achievable credit, so a document matching every term in its name scores 1.
	pub fn query(
		&self,
		terms: &[WeightedTerm],
		filters: &SearchFilters,
		page_size: usize,
	) -> Result<Vec<TextHit>> {
		if page_size == 0 {
			return Err(Error::InvalidArgument("page_size must be greater than zero".to_string()));
		}

		let terms: Vec<&WeightedTerm> = terms
			.iter()
			.filter(|term| !term.term.is_empty() && term.weight.is_finite() && term.weight > 0.0)
			.collect();

		if terms.is_empty() {
			return Ok(Vec::new());
		}

		let best_field = self.weights.name.max(self.weights.description).max(self.weights.tags);
		let ceiling: f32 = terms.iter().map(|term| term.weight * best_field).sum();

		if ceiling <= 0.0 {
			return Ok(Vec::new());
		}

		let docs = crate::read(&self.docs);
		let mut hits = Vec::new();

		for (item_id, doc) in docs.iter() {
			if !filters.matches(&doc.item) {
				continue;
			}

			let earned: f32 =
				terms.iter().map(|term| term.weight * self.term_credit(&term.term, doc)).sum();

			if earned > 0.0 {
				hits.push(TextHit { item_id: *item_id, score: (earned / ceiling).clamp(0.0, 1.0) });
			}
		}

		hits.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.item_id.cmp(&b.item_id)));
		hits.truncate(page_size);

		Ok(hits)
	}

	fn term_credit(&self, term: &str, doc: &IndexedDoc) -> f32 {
		[
			(self.weights.name, &doc.name),
			(self.weights.description, &doc.description),
			(self.weights.tags, &doc.tags),
		]
		.into_iter()
		.map(|(weight, tokens)| weight * self.match_credit(term, tokens))
		.fold(0.0, f32::max)
	}

	fn match_credit(&self, term: &str, tokens: &[String]) -> f32 {
		let mut best = 0.0_f32;

		for token in tokens {
			if token == term {
				return 1.0;
			}
			if term.chars().count() >= self.weights.min_prefix_chars && token.starts_with(term) {
				best = self.weights.prefix_credit;
			}
		}

		best
	}
}
