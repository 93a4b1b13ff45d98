//! Record normalization: the transformer contract and its helpers.
//!
//! A transformer is supplied per dataset; the pipeline only fixes the
//! contract. Three behaviors every implementation must honor:
//!
//! 1. The document identifier is a deterministic function of the record's
//!    natural key ([`stable_id`] for compound keys, or the key verbatim).
//! 2. A field that fails numeric/date coercion is dropped alone; the record
//!    continues. The `coerce_*` helpers return `None` and log the field at
//!    debug level, pairing with [`DocumentBuilder::opt_field`].
//! 3. A field that is semantically a list always materializes as a list,
//!    even when the source collapses a singleton to a bare scalar
//!    ([`ensure_list`]). Downstream consumers never branch on
//!    "list or scalar".
//!
//! [`DocumentBuilder::opt_field`]: crate::document::DocumentBuilder::opt_field

use crate::document::{Document, DocumentId};
use crate::error::TransformError;
use crate::xref::CrossReferenceIndex;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

/// Per-dataset normalization of raw records into canonical documents.
///
/// `Send + Sync` so the same transformer instance can serve the worker
/// pool. Implemented for plain closures of the same shape.
pub trait RecordTransformer<R>: Send + Sync {
    /// Normalize one record, optionally consulting the run's
    /// cross-reference index.
    ///
    /// # Errors
    ///
    /// Returns a [`TransformError`] when the record cannot produce a
    /// document at all, most commonly a missing natural key. The pipeline
    /// counts such records and continues.
    fn transform(
        &self,
        record: R,
        xrefs: Option<&CrossReferenceIndex>,
    ) -> Result<Document, TransformError>;
}

impl<R, F> RecordTransformer<R> for F
where
    F: Fn(R, Option<&CrossReferenceIndex>) -> Result<Document, TransformError> + Send + Sync,
{
    fn transform(
        &self,
        record: R,
        xrefs: Option<&CrossReferenceIndex>,
    ) -> Result<Document, TransformError> {
        self(record, xrefs)
    }
}

/// Deterministic identifier from the parts of a compound natural key.
///
/// Parts are digested with a separator so `("ab", "c")` and `("a", "bc")`
/// never collide. Same parts, same identifier, across runs and machines.
#[must_use]
pub fn stable_id(parts: &[&str]) -> DocumentId {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update([0u8]);
        }
        hasher.update(part.as_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    DocumentId::new(&digest[..32])
}

/// Parse an integer field; malformed input drops the field.
#[must_use]
pub fn coerce_integer(field: &str, raw: &str) -> Option<i64> {
    match raw.trim().parse::<i64>() {
        Ok(v) => Some(v),
        Err(_) => {
            debug!(field, raw, "dropping field: not an integer");
            None
        }
    }
}

/// Parse a float field; malformed input drops the field.
#[must_use]
pub fn coerce_float(field: &str, raw: &str) -> Option<f64> {
    match raw.trim().parse::<f64>() {
        Ok(v) => Some(v),
        Err(_) => {
            debug!(field, raw, "dropping field: not a number");
            None
        }
    }
}

/// Date layouts seen across reference dumps.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%b-%Y", "%Y%m%d"];

/// Parse a date field; malformed input drops the field.
#[must_use]
pub fn coerce_date(field: &str, raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    debug!(field, raw, "dropping field: not a date");
    None
}

/// Parse a datetime field (RFC 3339, or a naive timestamp taken as UTC);
/// malformed input drops the field.
#[must_use]
pub fn coerce_datetime(field: &str, raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    debug!(field, raw, "dropping field: not a datetime");
    None
}

/// Materialize a value as a list.
///
/// Arrays pass through, `Null` becomes the empty list, and any other value
/// wraps into a one-element list. Idempotent.
#[must_use]
pub fn ensure_list(value: Value) -> Value {
    match value {
        Value::Array(_) => value,
        Value::Null => Value::Array(Vec::new()),
        other => Value::Array(vec![other]),
    }
}

/// Apply [`ensure_list`] to the named fields of a field map, in place.
///
/// This is the single normalization point for one-or-many ambiguity; fields
/// absent from the map stay absent.
pub fn normalize_lists(fields: &mut serde_json::Map<String, Value>, list_fields: &[&str]) {
    for name in list_fields {
        if let Some(value) = fields.get_mut(*name) {
            let taken = value.take();
            *value = ensure_list(taken);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_stable_id_is_deterministic() {
        assert_eq!(stable_id(&["pdb", "1ABC"]), stable_id(&["pdb", "1ABC"]));
        assert_eq!(stable_id(&["pdb", "1ABC"]).as_str().len(), 32);
    }

    #[test]
    fn test_stable_id_separates_parts() {
        assert_ne!(stable_id(&["ab", "c"]), stable_id(&["a", "bc"]));
        assert_ne!(stable_id(&["abc"]), stable_id(&["ab", "c"]));
    }

    #[test]
    fn test_coerce_integer() {
        assert_eq!(coerce_integer("revision", " 42 "), Some(42));
        assert_eq!(coerce_integer("revision", "-7"), Some(-7));
        assert_eq!(coerce_integer("revision", "4.2"), None);
        assert_eq!(coerce_integer("revision", "soon"), None);
    }

    #[test]
    fn test_coerce_float() {
        assert_eq!(coerce_float("mass", "3.5"), Some(3.5));
        assert_eq!(coerce_float("mass", " 12 "), Some(12.0));
        assert_eq!(coerce_float("mass", "heavy"), None);
    }

    #[test]
    fn test_coerce_date_accepts_known_layouts() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(coerce_date("released", "2024-03-01"), Some(expected));
        assert_eq!(coerce_date("released", "2024/03/01"), Some(expected));
        assert_eq!(coerce_date("released", "01-Mar-2024"), Some(expected));
        assert_eq!(coerce_date("released", "20240301"), Some(expected));
        assert_eq!(coerce_date("released", "March 1st"), None);
    }

    #[test]
    fn test_coerce_datetime_takes_naive_as_utc() {
        let from_rfc = coerce_datetime("updated", "2024-03-01T12:00:00Z");
        let from_naive = coerce_datetime("updated", "2024-03-01 12:00:00");
        assert!(from_rfc.is_some());
        assert_eq!(from_rfc, from_naive);
        assert_eq!(coerce_datetime("updated", "noonish"), None);
    }

    #[test]
    fn test_ensure_list() {
        assert_eq!(ensure_list(json!("a")), json!(["a"]));
        assert_eq!(ensure_list(json!(["a", "b"])), json!(["a", "b"]));
        assert_eq!(ensure_list(Value::Null), json!([]));
    }

    #[test]
    fn test_normalize_lists_touches_only_named_present_fields() {
        let mut fields = serde_json::Map::new();
        fields.insert("tags".to_string(), json!("soluble"));
        fields.insert("name".to_string(), json!("alpha"));

        normalize_lists(&mut fields, &["tags", "synonyms"]);

        assert_eq!(fields["tags"], json!(["soluble"]));
        assert_eq!(fields["name"], json!("alpha"));
        assert!(!fields.contains_key("synonyms"));
    }
}
