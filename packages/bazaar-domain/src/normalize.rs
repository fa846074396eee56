use unicode_normalization::UnicodeNormalization;

/// Canonical form of a raw query: NFKC, lowercase, trimmed, single-spaced.
///
/// Idempotent: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
	let folded: String = raw.nfkc().collect::<String>().to_lowercase().nfkc().collect();
	let mut out = String::with_capacity(folded.len());

	for token in folded.split_whitespace() {
		if !out.is_empty() {
			out.push(' ');
		}

		out.push_str(token);
	}

	out
}

pub fn tokenize(normalized: &str) -> Vec<String> {
	normalized.split_whitespace().map(ToString::to_string).collect()
}

/// Splits free text into lowercase alphanumeric terms for indexing.
pub fn text_terms(text: &str) -> Vec<String> {
	let mut cleaned = String::with_capacity(text.len());

	for ch in normalize(text).chars() {
		if ch.is_alphanumeric() {
			cleaned.push(ch);
		} else {
			cleaned.push(' ');
		}
	}

	cleaned.split_whitespace().map(ToString::to_string).collect()
}
