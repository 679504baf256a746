//! Identity and type resolution for raw records

mod identity;
mod infer;
mod raw;

use thiserror::Error;

pub use identity::{parse_timestamp, IdentityResolver, DEFAULT_CONFIDENCE, VALUE_FIELDS};
pub use infer::{infer_type, FieldRule, ValueRule, FIELD_RULES, VALUE_RULES};
pub use raw::RawRecord;

/// A single record could not be turned into a graph element
///
/// Always recoverable: the record is dropped and processing continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("no value could be derived from record with fields [{fields}]")]
    NoValue { fields: String },

    #[error("relationship record is missing {0}")]
    MissingEndpointId(&'static str),
}

pub type ValidationResult<T> = Result<T, ValidationError>;
