//! Record payload encoding.
//!
//! A record's own [`StringRepr`](crate::StringRepr) wins; otherwise the
//! record is marshalled structurally as JSON.

use crate::{Record, StashResult};

/// Encodes a record into its cache payload.
pub fn encode<R: Record>(record: &R) -> StashResult<String> {
    match record.as_string_repr() {
        Some(repr) => repr.to_repr(),
        None => Ok(serde_json::to_string(record)?),
    }
}

/// Decodes a cache payload into a fresh record.
pub fn decode<R: Record>(payload: &str) -> StashResult<R> {
    let mut record = R::default();
    decode_into(payload, &mut record)?;
    Ok(record)
}

/// Decodes a cache payload into an existing record, replacing its contents.
pub fn decode_into<R: Record>(payload: &str, record: &mut R) -> StashResult<()> {
    if let Some(repr) = record.as_string_repr_mut() {
        return repr.parse_from(payload);
    }
    *record = serde_json::from_str(payload)?;
    Ok(())
}
