use serde::{Deserialize, Serialize};

use crate::{geo::GeoPoint, item::PriceRange};

/// Search preferences derived from a user's history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSearchProfile {
	pub preferred_categories: Vec<String>,
	pub price_range: Option<PriceRange>,
	/// Locations the user searched or booked around, most relevant first.
	pub locations: Vec<GeoPoint>,
	/// Preferred rating on the 0..5 scale.
	pub quality_preference: Option<f32>,
}
impl UserSearchProfile {
	pub fn is_empty(&self) -> bool {
		self.preferred_categories.is_empty()
			&& self.price_range.is_none()
			&& self.locations.is_empty()
			&& self.quality_preference.is_none()
	}

	pub fn prefers_category(&self, category: &str) -> bool {
		self.preferred_categories.iter().any(|preferred| preferred.eq_ignore_ascii_case(category))
	}
}
