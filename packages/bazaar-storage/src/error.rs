#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Unavailable: {0}")]
	Unavailable(String),
	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
	#[error("Not found: {0}")]
	NotFound(String),
}
