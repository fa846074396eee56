/// Cosine similarity in [-1, 1].
///
/// Zero-norm inputs yield 0. Mismatched dimensions are a caller bug: debug builds panic, release
/// builds return 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
	debug_assert_eq!(a.len(), b.len(), "Embedding dimensions must match.");

	if a.len() != b.len() || a.is_empty() {
		return 0.0;
	}

	let mut dot = 0.0_f64;
	let mut norm_a = 0.0_f64;
	let mut norm_b = 0.0_f64;

	for (x, y) in a.iter().zip(b) {
		let x = f64::from(*x);
		let y = f64::from(*y);

		dot += x * y;
		norm_a += x * x;
		norm_b += y * y;
	}

	if norm_a == 0.0 || norm_b == 0.0 || !norm_a.is_finite() || !norm_b.is_finite() {
		return 0.0;
	}

	(dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(-1.0, 1.0) as f32
}

/// Scales `vector` to unit length in place. Returns false when the vector has no usable norm.
pub fn l2_normalize(vector: &mut [f32]) -> bool {
	let norm = vector.iter().map(|v| f64::from(*v) * f64::from(*v)).sum::<f64>().sqrt();

	if norm == 0.0 || !norm.is_finite() {
		return false;
	}

	for value in vector.iter_mut() {
		*value = (f64::from(*value) / norm) as f32;
	}

	true
}

pub fn is_unit_length(vector: &[f32]) -> bool {
	let norm = vector.iter().map(|v| f64::from(*v) * f64::from(*v)).sum::<f64>().sqrt();

	(norm - 1.0).abs() < 1e-3
}

/// Deterministic unit vector seeded from the hash of `seed_text`.
///
/// Used when the embedding service is unavailable, so identical text always degrades to the
/// same vector.
pub fn fallback_vector(seed_text: &str, dimensions: usize) -> Vec<f32> {
	if dimensions == 0 {
		return Vec::new();
	}

	let digest = blake3::hash(seed_text.as_bytes());
	let mut seed_bytes = [0_u8; 8];

	seed_bytes.copy_from_slice(&digest.as_bytes()[..8]);

	let mut state = u64::from_le_bytes(seed_bytes);
	let mut out = Vec::with_capacity(dimensions);

	for _ in 0..dimensions {
		let bits = splitmix64(&mut state);
		// Top 24 bits mapped onto [-1, 1).
		let unit = (bits >> 40) as f32 / (1_u64 << 24) as f32;

		out.push(unit * 2.0 - 1.0);
	}

	if !l2_normalize(&mut out) {
		out.iter_mut().for_each(|v| *v = 0.0);
		out[0] = 1.0;
	}

	out
}

fn splitmix64(state: &mut u64) -> u64 {
	*state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);

	let mut z = *state;

	z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
	z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);

	z ^ (z >> 31)
}
