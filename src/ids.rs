//! Sequential identifier allocation

use crate::error::{LibraryError, Result};
use crate::store::Record;

/// Next free numeric identifier: one past the largest all-digit id, or 1 when
/// there is none. Legacy ids such as `BONUS-1` are ignored.
pub fn next_id<R: Record>(records: &[R]) -> Result<u64> {
    next_id_from(records.iter().map(|r| r.id()))
}

/// An all-digit id that does not fit in `u64`, or a maximum id with no
/// successor, is a validation error rather than a legacy id.
pub fn next_id_from<'a>(ids: impl IntoIterator<Item = &'a str>) -> Result<u64> {
    let mut max: Option<u64> = None;
    for id in ids {
        let id = id.trim();
        if id.is_empty() || !id.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let value = id.parse::<u64>().map_err(|_| LibraryError::Validation {
            message: format!("Identifier {} is too large to extend", id),
        })?;
        max = Some(max.map_or(value, |m| m.max(value)));
    }
    match max {
        None => Ok(1),
        Some(m) => m.checked_add(1).ok_or_else(|| LibraryError::Validation {
            message: format!("Identifier {} has no successor", m),
        }),
    }
}
