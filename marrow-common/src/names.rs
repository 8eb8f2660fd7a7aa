//! Bone/node name normalization
//!
//! Source files disagree on capitalization and namespacing ("mixamorig:Hips"
//! vs "Hips"), so every place a name is used as a lookup key goes through
//! [`normalize_name`] first. Skeleton bones are stored already normalized.

/// Normalize a bone/node name for use as a lookup key.
///
/// Strips any namespace prefix up to and including the first `:`, removes
/// all whitespace, and lowercases the rest.
pub fn normalize_name(name: &str) -> String {
    let stripped = match name.find(':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    };
    stripped
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}
