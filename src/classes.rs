//! Class dictionary loading, resolution and filtering.
//!
//! The dictionary maps integer class ids to human-readable names. It is
//! loaded once, optionally restricted to a requested subset, and immutable
//! afterwards. The bundled default is the 60-class xView taxonomy.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use log::info;

use crate::error::ChipviewError;
use crate::lfs::{self, LfsClient};

/// The 60 xView object classes. Ids are sparse by design.
const XVIEW_CLASSES: &[(i64, &str)] = &[
    (11, "Fixed-wing Aircraft"),
    (12, "Small Aircraft"),
    (13, "Cargo Plane"),
    (15, "Helicopter"),
    (17, "Passenger Vehicle"),
    (18, "Small Car"),
    (19, "Bus"),
    (20, "Pickup Truck"),
    (21, "Utility Truck"),
    (23, "Truck"),
    (24, "Cargo Truck"),
    (25, "Truck w/Box"),
    (26, "Truck Tractor"),
    (27, "Trailer"),
    (28, "Truck w/Flatbed"),
    (29, "Truck w/Liquid"),
    (32, "Crane Truck"),
    (33, "Railway Vehicle"),
    (34, "Passenger Car"),
    (35, "Cargo Car"),
    (36, "Flat Car"),
    (37, "Tank car"),
    (38, "Locomotive"),
    (40, "Maritime Vessel"),
    (41, "Motorboat"),
    (42, "Sailboat"),
    (44, "Tugboat"),
    (45, "Barge"),
    (47, "Fishing Vessel"),
    (49, "Ferry"),
    (50, "Yacht"),
    (51, "Container Ship"),
    (52, "Oil Tanker"),
    (53, "Engineering Vehicle"),
    (54, "Tower crane"),
    (55, "Container Crane"),
    (56, "Reach Stacker"),
    (57, "Straddle Carrier"),
    (59, "Mobile Crane"),
    (60, "Dump Truck"),
    (61, "Haul Truck"),
    (62, "Scraper/Tractor"),
    (63, "Front loader/Bulldozer"),
    (64, "Excavator"),
    (65, "Cement Mixer"),
    (66, "Ground Grader"),
    (71, "Hut/Tent"),
    (72, "Shed"),
    (73, "Building"),
    (74, "Aircraft Hangar"),
    (76, "Damaged Building"),
    (77, "Facility"),
    (79, "Construction Site"),
    (83, "Vehicle Lot"),
    (84, "Helipad"),
    (86, "Storage Tank"),
    (89, "Shipping container lot"),
    (91, "Shipping Container"),
    (93, "Pylon"),
    (94, "Tower"),
];

/// An id -> name class mapping, immutable after load (apart from the
/// one-shot subset filter applied right after resolution).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassDict {
    names: BTreeMap<i64, String>,
}

impl ClassDict {
    /// The bundled xView dictionary.
    pub fn bundled() -> Self {
        let names = XVIEW_CLASSES
            .iter()
            .map(|(id, name)| (*id, (*name).to_string()))
            .collect();
        Self { names }
    }

    /// Parse `id:name` lines. Blank lines are skipped; anything else
    /// malformed is a hard error naming the offending line.
    pub fn parse(text: &str, source_name: &str) -> Result<Self, ChipviewError> {
        let mut names = BTreeMap::new();

        for (line_idx, line) in text.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            let (id_raw, name) =
                trimmed
                    .split_once(':')
                    .ok_or_else(|| ChipviewError::DictionaryInvalid {
                        source_name: source_name.to_string(),
                        message: format!("line {}: expected 'id:name'", line_idx + 1),
                    })?;

            let id =
                id_raw
                    .trim()
                    .parse::<i64>()
                    .map_err(|_| ChipviewError::DictionaryInvalid {
                        source_name: source_name.to_string(),
                        message: format!("line {}: invalid class id '{id_raw}'", line_idx + 1),
                    })?;

            let name = name.trim();
            if name.is_empty() {
                return Err(ChipviewError::DictionaryInvalid {
                    source_name: source_name.to_string(),
                    message: format!("line {}: empty class name", line_idx + 1),
                });
            }

            names.insert(id, name.to_string());
        }

        if names.is_empty() {
            return Err(ChipviewError::DictionaryInvalid {
                source_name: source_name.to_string(),
                message: "dictionary has no entries".to_string(),
            });
        }

        Ok(Self { names })
    }

    pub fn from_path(path: &Path) -> Result<Self, ChipviewError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text, &path.to_string_lossy())
    }

    pub fn contains(&self, id: i64) -> bool {
        self.names.contains_key(&id)
    }

    pub fn get(&self, id: i64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Restrict the dictionary to the requested ids. Requested ids with no
    /// dictionary entry are silently ignored, matching the filter's intent
    /// of narrowing rather than extending.
    pub fn retain_ids(&mut self, keep: &BTreeSet<i64>) {
        self.names.retain(|id, _| keep.contains(id));
    }

    /// Entries in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (i64, &str)> {
        self.names.iter().map(|(id, name)| (*id, name.as_str()))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Resolve the `--dictionary` argument to a loaded dictionary.
///
/// Resolution order: bundled default when absent, then remote URI, then
/// local path, then a path relative to the checkout tree. Anything else is
/// an error naming the value.
pub fn resolve_dictionary(
    spec: Option<&str>,
    client: &LfsClient,
    tree: &Path,
) -> Result<ClassDict, ChipviewError> {
    let Some(spec) = spec else {
        info!("class dictionary: bundled xView defaults");
        return Ok(ClassDict::bundled());
    };

    if lfs::is_uri(spec) {
        let local = client.get(spec)?;
        info!("class dictionary: {spec}");
        return ClassDict::from_path(&local);
    }

    let direct = Path::new(spec);
    if direct.is_file() {
        info!("class dictionary: {spec}");
        return ClassDict::from_path(direct);
    }

    if direct.is_relative() {
        let in_tree = tree.join(direct);
        if in_tree.is_file() {
            info!("class dictionary: {} (from checkout tree)", spec);
            return ClassDict::from_path(&in_tree);
        }
    }

    Err(ChipviewError::DictionaryNotFound(spec.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_dictionary_has_sixty_classes() {
        let dict = ClassDict::bundled();
        assert_eq!(dict.len(), 60);
        assert_eq!(dict.get(73), Some("Building"));
        assert_eq!(dict.get(11), Some("Fixed-wing Aircraft"));
        assert!(!dict.contains(0));
    }

    #[test]
    fn parse_accepts_id_name_lines() {
        let dict = ClassDict::parse("1:cat\n\n 2 : spotted dog \n", "test").expect("valid dict");
        assert_eq!(dict.len(), 2);
        assert_eq!(dict.get(1), Some("cat"));
        assert_eq!(dict.get(2), Some("spotted dog"));
    }

    #[test]
    fn parse_rejects_missing_separator() {
        let err = ClassDict::parse("1 cat\n", "test").unwrap_err();
        assert!(matches!(err, ChipviewError::DictionaryInvalid { .. }));
    }

    #[test]
    fn parse_rejects_non_numeric_id() {
        let err = ClassDict::parse("one:cat\n", "test").unwrap_err();
        assert!(matches!(err, ChipviewError::DictionaryInvalid { .. }));
    }

    #[test]
    fn parse_rejects_empty_input() {
        let err = ClassDict::parse("\n\n", "test").unwrap_err();
        assert!(matches!(err, ChipviewError::DictionaryInvalid { .. }));
    }

    #[test]
    fn retain_ids_drops_everything_else() {
        let mut dict = ClassDict::bundled();
        dict.retain_ids(&BTreeSet::from([73, 86, 9999]));

        assert_eq!(dict.len(), 2);
        assert!(dict.contains(73));
        assert!(dict.contains(86));
        assert!(!dict.contains(11));
    }

    #[test]
    fn iter_is_ordered_by_id() {
        let dict = ClassDict::parse("5:b\n3:a\n9:c\n", "test").expect("valid dict");
        let ids: Vec<i64> = dict.iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec![3, 5, 9]);
    }
}
