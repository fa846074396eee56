use serde::{Deserialize, Serialize};

use crate::{
	geo::{self, BoundingBox, GeoPoint},
	item::{PriceRange, SearchableItem},
	normalize,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidInput {
	#[error("{field} must be greater than zero.")]
	NonPositive { field: &'static str },
	#[error("{field} exceeds the maximum of {max}.")]
	TooLarge { field: &'static str, max: u64 },
	#[error("{field} is malformed: {reason}.")]
	Malformed { field: &'static str, reason: &'static str },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoFilter {
	pub center: GeoPoint,
	pub radius_km: f64,
}
impl GeoFilter {
	pub fn validate(&self) -> Result<(), InvalidInput> {
		if !self.center.is_valid() {
			return Err(InvalidInput::Malformed {
				field: "filters.geo.center",
				reason: "latitude must be within -90..90 and longitude within -180..180",
			});
		}
		if !self.radius_km.is_finite() || self.radius_km <= 0.0 {
			return Err(InvalidInput::NonPositive { field: "filters.geo.radius_km" });
		}

		Ok(())
	}

	pub fn bounding_box(&self) -> BoundingBox {
		BoundingBox::around(self.center, self.radius_km)
	}

	/// Distance to `point` when it lies within the radius.
	pub fn distance_within(&self, point: GeoPoint) -> Option<f64> {
		if !self.bounding_box().contains(point) {
			return None;
		}

		let distance = geo::haversine_km(self.center, point);

		(distance <= self.radius_km).then_some(distance)
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchFilters {
	/// Empty means any category. Order does not matter.
	pub categories: Vec<String>,
	pub min_price: Option<f64>,
	pub max_price: Option<f64>,
	pub min_rating: Option<f32>,
	pub geo: Option<GeoFilter>,
	/// Items must carry every listed flag.
	pub flags: Vec<String>,
}
impl SearchFilters {
	pub fn validate(&self) -> Result<(), InvalidInput> {
		for (field, value) in
			[("filters.min_price", self.min_price), ("filters.max_price", self.max_price)]
		{
			if let Some(value) = value
				&& (!value.is_finite() || value < 0.0)
			{
				return Err(InvalidInput::Malformed {
					field,
					reason: "must be a non-negative number",
				});
			}
		}

		if let (Some(min), Some(max)) = (self.min_price, self.max_price)
			&& min > max
		{
			return Err(InvalidInput::Malformed {
				field: "filters.min_price",
				reason: "must not exceed filters.max_price",
			});
		}
		if let Some(rating) = self.min_rating
			&& (!rating.is_finite() || !(0.0..=5.0).contains(&rating))
		{
			return Err(InvalidInput::Malformed {
				field: "filters.min_rating",
				reason: "must be within 0..5",
			});
		}
		if let Some(geo) = self.geo.as_ref() {
			geo.validate()?;
		}

		Ok(())
	}

	/// Structural match, including the eligibility requirement.
	pub fn matches(&self, item: &SearchableItem) -> bool {
		if !item.is_eligible() {
			return false;
		}
		if !self.categories.is_empty()
			&& !self.categories.iter().any(|category| category.eq_ignore_ascii_case(&item.category))
		{
			return false;
		}

		let wanted = PriceRange::new(
			self.min_price.unwrap_or(0.0),
			self.max_price.unwrap_or(f64::INFINITY),
		);

		if !item.price.overlaps(&wanted) {
			return false;
		}
		if let Some(min_rating) = self.min_rating
			&& item.rating < min_rating
		{
			return false;
		}
		if !self.flags.iter().all(|flag| item.has_flag(flag)) {
			return false;
		}
		if let Some(geo) = self.geo.as_ref() {
			let Some(point) = item.coordinate else { return false };

			return geo.distance_within(point).is_some();
		}

		true
	}

	/// Copy with list fields sorted and deduplicated, for order-independent hashing.
	pub fn canonical(&self) -> Self {
		let mut out = self.clone();

		out.categories = out.categories.iter().map(|c| c.trim().to_lowercase()).collect();
		out.categories.sort();
		out.categories.dedup();
		out.flags.sort();
		out.flags.dedup();

		out
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
	pub offset: u32,
	pub size: u32,
}
impl Pagination {
	pub fn validate(&self, max_size: u32) -> Result<(), InvalidInput> {
		if self.size == 0 {
			return Err(InvalidInput::NonPositive { field: "pagination.size" });
		}
		if self.size > max_size {
			return Err(InvalidInput::TooLarge { field: "pagination.size", max: max_size as u64 });
		}

		Ok(())
	}

	pub fn window(&self) -> std::ops::Range<usize> {
		let start = self.offset as usize;

		start..start.saturating_add(self.size as usize)
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
	#[default]
	Relevance,
	Rating,
	Price,
	Popularity,
	Distance,
}
impl SortMode {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Relevance => "relevance",
			Self::Rating => "rating",
			Self::Price => "price",
			Self::Popularity => "popularity",
			Self::Distance => "distance",
		}
	}
}

/// A validated search request with its normalized query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryContext {
	pub raw_query: String,
	pub normalized_query: String,
	pub tokens: Vec<String>,
	pub user_id: Option<String>,
	pub filters: SearchFilters,
	pub pagination: Pagination,
	pub sort: SortMode,
}
impl QueryContext {
	pub fn new(
		raw_query: &str,
		user_id: Option<String>,
		filters: SearchFilters,
		pagination: Pagination,
		sort: SortMode,
		max_page_size: u32,
	) -> Result<Self, InvalidInput> {
		pagination.validate(max_page_size)?;
		filters.validate()?;

		if sort == SortMode::Distance && filters.geo.is_none() {
			return Err(InvalidInput::Malformed {
				field: "sort",
				reason: "distance sorting requires filters.geo",
			});
		}

		let normalized_query = normalize::normalize(raw_query);
		let tokens = normalize::tokenize(&normalized_query);
		let user_id = user_id.map(|id| id.trim().to_string()).filter(|id| !id.is_empty());

		Ok(Self {
			raw_query: raw_query.to_string(),
			normalized_query,
			tokens,
			user_id,
			filters: filters.canonical(),
			pagination,
			sort,
		})
	}

	/// Candidate budget per retrieval path.
	pub fn candidate_cap(&self, multiplier: u32) -> usize {
		(self.pagination.offset as usize + self.pagination.size as usize)
			.saturating_mul(multiplier.max(1) as usize)
	}
}
