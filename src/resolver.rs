//! Dotted-path lookup into nested records

use serde_json::Value;

/// Separator between segments of a source path
pub const PATH_SEPARATOR: char = '.';

/// Resolve `path` inside `record` without mutating it.
///
/// A path without a separator is a single-key lookup. A dotted path descends
/// one mapping per segment. Any missing segment, non-mapping intermediate,
/// or explicit `null` yields `None`.
pub fn resolve<'a>(record: &'a Value, path: &str) -> Option<&'a Value> {
    let value = if path.contains(PATH_SEPARATOR) {
        path.split(PATH_SEPARATOR)
            .try_fold(record, |current, segment| current.as_object()?.get(segment))?
    } else {
        record.as_object()?.get(path)?
    };

    if value.is_null() {
        None
    } else {
        Some(value)
    }
}
