use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
	Eligible,
	Pending,
	Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
	pub min: f64,
	pub max: f64,
}
impl PriceRange {
	pub fn new(min: f64, max: f64) -> Self {
		Self { min, max }
	}

	pub fn is_valid(&self) -> bool {
		self.min.is_finite() && self.max.is_finite() && self.min >= 0.0 && self.min <= self.max
	}

	pub fn overlaps(&self, other: &PriceRange) -> bool {
		self.min <= other.max && other.min <= self.max
	}

	/// Share of this range covered by `other`, in [0, 1].
	pub fn overlap_ratio(&self, other: &PriceRange) -> f32 {
		if !self.overlaps(other) {
			return 0.0;
		}

		let width = self.max - self.min;

		if width <= 0.0 {
			return 1.0;
		}

		let covered = self.max.min(other.max) - self.min.max(other.min);

		(covered / width).clamp(0.0, 1.0) as f32
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Popularity {
	pub total_interactions: u64,
	pub recent_interactions: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchableItem {
	pub item_id: Uuid,
	pub name: String,
	#[serde(default)]
	pub description: String,
	#[serde(default)]
	pub service_tags: Vec<String>,
	pub category: String,
	#[serde(default)]
	pub location_label: Option<String>,
	#[serde(default)]
	pub coordinate: Option<GeoPoint>,
	pub price: PriceRange,
	#[serde(default)]
	pub rating: f32,
	#[serde(default)]
	pub popularity: Popularity,
	/// Boolean attributes usable as filters, e.g. "instant_booking".
	#[serde(default)]
	pub flags: Vec<String>,
	pub status: ItemStatus,
	/// Unit-length embedding computed from the text fields.
	#[serde(default)]
	pub embedding: Option<Vec<f32>>,
	/// Fingerprint of the text fields `embedding` was computed from.
	#[serde(default)]
	pub embedding_fingerprint: Option<String>,
}
impl SearchableItem {
	pub fn is_eligible(&self) -> bool {
		self.status == ItemStatus::Eligible
	}

	pub fn has_flag(&self, flag: &str) -> bool {
		self.flags.iter().any(|value| value == flag)
	}

	/// Hash over every field that feeds the embedding input.
	pub fn text_fingerprint(&self) -> String {
		let mut hasher = blake3::Hasher::new();

		for part in [
			self.name.as_str(),
			self.description.as_str(),
			self.category.as_str(),
			self.location_label.as_deref().unwrap_or_default(),
		] {
			hasher.update(part.as_bytes());
			hasher.update(&[0x1f_u8]);
		}
		for tag in &self.service_tags {
			hasher.update(tag.as_bytes());
			hasher.update(&[0x1e_u8]);
		}

		hasher.finalize().to_hex()[..32].to_string()
	}

	/// The stored embedding, only while it still matches the current text fields.
	pub fn cached_embedding(&self) -> Option<&[f32]> {
		let fingerprint = self.embedding_fingerprint.as_deref()?;

		if fingerprint != self.text_fingerprint() {
			return None;
		}

		self.embedding.as_deref()
	}

	pub fn set_embedding(&mut self, vector: Vec<f32>) {
		self.embedding_fingerprint = Some(self.text_fingerprint());
		self.embedding = Some(vector);
	}

	/// Weighted text used to embed the item. The name is repeated for emphasis.
	pub fn embedding_input(&self) -> String {
		let mut parts = vec![self.name.trim(), self.name.trim()];

		if !self.description.trim().is_empty() {
			parts.push(self.description.trim());
		}

		parts.push(self.category.trim());

		let tags = self.service_tags.join(", ");

		if !tags.is_empty() {
			parts.push(tags.as_str());
		}
		if let Some(location) = self.location_label.as_deref().map(str::trim)
			&& !location.is_empty()
		{
			parts.push(location);
		}

		parts.join(" | ")
	}
}
