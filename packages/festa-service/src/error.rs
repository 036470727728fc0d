pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	Validation { message: String, fields: Vec<String> },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Unknown field '{field}' on record kind '{kind}'.")]
	SchemaMismatch { kind: String, field: String },
	#[error("Forbidden: {message}")]
	Forbidden { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}

impl Error {
	pub fn validation(message: impl Into<String>) -> Self {
		Self::Validation { message: message.into(), fields: Vec::new() }
	}

	pub fn not_found(message: impl Into<String>) -> Self {
		Self::NotFound { message: message.into() }
	}

	pub fn schema_mismatch(kind: festa_domain::schema::RecordKind, field: &str) -> Self {
		Self::SchemaMismatch { kind: kind.as_str().to_string(), field: field.to_string() }
	}
}

impl From<serde_json::Error> for Error {
	fn from(err: serde_json::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<festa_storage::Error> for Error {
	fn from(err: festa_storage::Error) -> Self {
		match err {
			festa_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			festa_storage::Error::InvalidArgument(message) =>
				Self::Validation { message, fields: Vec::new() },
		}
	}
}
