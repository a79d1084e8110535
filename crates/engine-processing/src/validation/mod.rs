use crate::error::ValidationError;
use serde_json::Value;

mod card;
mod card_set;
pub mod fields;

/// Builds a typed record from one raw source element.
///
/// Implementations are pure and report the first violation they meet, in
/// field-declaration order. Absent optional fields never fail.
pub trait Validate: Sized {
    fn validate(raw: &Value) -> Result<Self, ValidationError>;
}
