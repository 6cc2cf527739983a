//! Entry ingestion: validation and deduplicated persistence

pub mod engine;
pub mod validator;

pub use engine::{IngestEngine, Outcome};
pub use validator::{validate, EmailAddress, ValidationError};
