use bazaar_domain::query::InvalidInput;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String, transient: bool },
	#[error("Storage error: {message}")]
	Storage { message: String },
	#[error("Cache error: {message}")]
	Cache { message: String },
	#[error("Unavailable: {message}")]
	Unavailable { message: String },
}

impl Error {
	/// Whether retrying the same call may succeed.
	pub fn is_transient(&self) -> bool {
		match self {
			Self::Provider { transient, .. } => *transient,
			Self::Unavailable { .. } => true,
			_ => false,
		}
	}
}

impl From<InvalidInput> for Error {
	fn from(err: InvalidInput) -> Self {
		Self::InvalidRequest { message: err.to_string() }
	}
}

impl From<bazaar_providers::Error> for Error {
	fn from(err: bazaar_providers::Error) -> Self {
		Self::Provider { transient: err.is_transient(), message: err.to_string() }
	}
}

impl From<bazaar_storage::Error> for Error {
	fn from(err: bazaar_storage::Error) -> Self {
		match err {
			bazaar_storage::Error::Unavailable(message) => Self::Unavailable { message },
			bazaar_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			bazaar_storage::Error::NotFound(message) => Self::Storage { message },
		}
	}
}
