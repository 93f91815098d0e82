//! Partial-update merging
//!
//! An update request carries only the fields the client sent. The merge
//! overlays them on a full snapshot of the stored entity and revalidates the
//! result, so fields absent from the request keep their value.
//!
//! File fields get one extra rule: when the request does not carry the file
//! field it is dropped from the snapshot before validation, so the stored
//! reference is neither revalidated nor overwritten.

use crate::models::{FieldMap, FieldSchema, ValidationErrors};

/// Overlay a sparse update on a snapshot.
///
/// Keys in `excluded` are removed from the snapshot first. Keys present in
/// `update` always win, including explicit nulls.
pub fn merge_fields(snapshot: &FieldMap, update: &FieldMap, excluded: &[&str]) -> FieldMap {
    let mut merged: FieldMap = snapshot
        .iter()
        .filter(|(key, _)| !excluded.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    for (key, value) in update {
        merged.insert(key.clone(), value.clone());
    }

    merged
}

/// Fields to withhold from the snapshot for this update.
pub fn excluded_fields<T: FieldSchema>(update: &FieldMap) -> Vec<&'static str> {
    T::FILE_FIELD
        .filter(|field| !update.contains_key(*field))
        .into_iter()
        .collect()
}

/// Merge a sparse update into `current` and validate the result.
///
/// The returned entity keeps the identity and read-only fields of `current`.
pub fn merge_update<T: FieldSchema>(current: &T, update: &FieldMap) -> Result<T, ValidationErrors> {
    let excluded = excluded_fields::<T>(update);
    let merged = merge_fields(&current.to_fields(), update, &excluded);
    T::from_fields(&merged, Some(current))
}
