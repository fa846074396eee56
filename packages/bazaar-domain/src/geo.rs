use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6_371.008_8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
	pub lat: f64,
	pub lon: f64,
}
impl GeoPoint {
	pub fn new(lat: f64, lon: f64) -> Self {
		Self { lat, lon }
	}

	pub fn is_valid(&self) -> bool {
		self.lat.is_finite()
			&& self.lon.is_finite()
			&& (-90.0..=90.0).contains(&self.lat)
			&& (-180.0..=180.0).contains(&self.lon)
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
	pub min_lat: f64,
	pub max_lat: f64,
	pub min_lon: f64,
	pub max_lon: f64,
}
impl BoundingBox {
	/// Smallest lat/lon box containing the circle of `radius_km` around `center`.
	pub fn around(center: GeoPoint, radius_km: f64) -> Self {
		let lat_delta = (radius_km / EARTH_RADIUS_KM).to_degrees();
		let min_lat = (center.lat - lat_delta).max(-90.0);
		let max_lat = (center.lat + lat_delta).min(90.0);
		let cos_lat = center.lat.to_radians().cos();

		if max_lat >= 90.0 || min_lat <= -90.0 || cos_lat <= f64::EPSILON {
			return Self { min_lat, max_lat, min_lon: -180.0, max_lon: 180.0 };
		}

		let lon_delta = (radius_km / (EARTH_RADIUS_KM * cos_lat)).to_degrees();

		if lon_delta >= 180.0 {
			return Self { min_lat, max_lat, min_lon: -180.0, max_lon: 180.0 };
		}

		Self { min_lat, max_lat, min_lon: center.lon - lon_delta, max_lon: center.lon + lon_delta }
	}

	pub fn contains(&self, point: GeoPoint) -> bool {
		if point.lat < self.min_lat || point.lat > self.max_lat {
			return false;
		}

		// Boxes crossing the antimeridian carry longitudes outside [-180, 180].
		let lon = point.lon;

		[lon, lon + 360.0, lon - 360.0]
			.iter()
			.any(|candidate| *candidate >= self.min_lon && *candidate <= self.max_lon)
	}
}

/// Great-circle distance in kilometers.
pub fn haversine_km(a: GeoPoint, b: GeoPoint) -> f64 {
	let d_lat = (b.lat - a.lat).to_radians();
	let d_lon = (b.lon - a.lon).to_radians();
	let lat_a = a.lat.to_radians();
	let lat_b = b.lat.to_radians();
	let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

	2.0 * EARTH_RADIUS_KM * h.sqrt().min(1.0).asin()
}

/// Linear proximity score: 1 at the center, 0 at or beyond `radius_km`.
pub fn proximity_score(distance_km: f64, radius_km: f64) -> f32 {
	if radius_km <= 0.0 || !distance_km.is_finite() {
		return 0.0;
	}

	(1.0 - distance_km / radius_km).clamp(0.0, 1.0) as f32
}
