//! Property merging
//!
//! Combines the properties recorded when a view started with the properties
//! supplied when it ended.

use crate::types::Properties;

/// Merge two optional property sets
///
/// When `base` holds any values it is reused as the result and every key in
/// `overrides` is written into it, so the override wins on collisions. When
/// `base` is absent or empty the overrides are returned as-is.
///
/// # Example
/// ```
/// use page_view_tracker::{merge, Properties};
///
/// let base: Properties = [("a".to_string(), "1".to_string())].into();
/// let overrides: Properties = [("a".to_string(), "9".to_string())].into();
///
/// let merged = merge(Some(base), Some(overrides));
/// assert_eq!(merged["a"], "9");
/// ```
pub fn merge(base: Option<Properties>, overrides: Option<Properties>) -> Properties {
    match (base, overrides) {
        (Some(mut base), Some(overrides)) if !base.is_empty() => {
            base.extend(overrides);
            base
        }
        (Some(base), None) => base,
        (_, Some(overrides)) => overrides,
        (None, None) => Properties::new(),
    }
}
