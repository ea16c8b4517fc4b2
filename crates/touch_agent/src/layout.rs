//! Coordinate table binding touch identifiers to device screen positions

use phf::phf_map;
use serde::de::{self, Deserialize, Deserializer, MapAccess, Visitor};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use crate::error::{Result, TouchError};

/// Touch layout of the original target application (1280x720 emulator)
static LEGACY_LAYOUT: phf::Map<&'static str, (i32, i32)> = phf_map! {
    "`" => (0x3f, 0x10c),
    "TAB" => (0x14d, 0x295),
    "T" => (0x280, 0x23b),
    "B" => (0x280, 0x287),
    "N" => (0x33f, 0x295),
    "A" => (0x3b8, 0x299),
    "X" => (0x441, 0x279),
    "C" => (0x4bf, 0x260),
    "S" => (0x3b5, 0x236),
    "D" => (0x401, 0x1e7),
    "F" => (0x46f, 0x1e8),
    "G" => (0x4ca, 0x1ea),
    "I" => (0x398, 0x190),
    "O" => (0x3e0, 0x185),
    "P" => (0x42d, 0x183),
    "[" => (0x478, 0x182),
    "]" => (0x4cd, 0x183),
    "=" => (0x4d6, 0x136),
    "-" => (0x4d6, 0xf0),
    "L" => (0x498, 0xa1),
    "U" => (0x3d7, 0x80),
    "E" => (0x280, 0xda),
    "0" => (0x4d5, 0x28),
    "1" => (0x2a9, 0x29),
    "2" => (0x2ec, 0x29),
    "3" => (0x328, 0x2a),
    "4" => (0x364, 0x29),
    "5" => (0x3a2, 0x29),
    "6" => (0x3db, 0x28),
    "7" => (0x414, 0x26),
    "8" => (0x454, 0x26),
    "9" => (0x493, 0x26),
};

/// Normalize an identifier to the canonical (upper-case) form used for lookups
pub fn canonical_identifier(identifier: &str) -> String {
    identifier.to_uppercase()
}

/// Immutable-after-load mapping from touch identifier to `(x, y)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoordinateTable {
    points: BTreeMap<String, (i32, i32)>,
}

impl CoordinateTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(identifier, (x, y))` pairs, rejecting duplicates
    pub fn from_entries<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, (i32, i32))>,
        S: AsRef<str>,
    {
        let mut table = Self::new();
        for (name, xy) in entries {
            table.insert(name.as_ref(), xy)?;
        }
        Ok(table)
    }

    /// The layout shipped with the original automation script
    pub fn legacy() -> Self {
        Self {
            points: LEGACY_LAYOUT
                .entries()
                .map(|(name, xy)| (name.to_string(), *xy))
                .collect(),
        }
    }

    /// Parse a JSON object of the form `{ "A": [952, 665], ... }`
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a JSON layout file
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await.map_err(TouchError::Io)?;
        let table = Self::from_json_str(&content)?;
        debug!("Loaded {} touch points from {}", table.len(), path.display());
        Ok(table)
    }

    /// Add a touch point. Identifiers are case-insensitive; a second binding
    /// for the same identifier is an error.
    pub fn insert(&mut self, identifier: &str, xy: (i32, i32)) -> Result<()> {
        let name = canonical_identifier(identifier);
        if name.trim().is_empty() {
            return Err(TouchError::InvalidConfig(
                "empty touch identifier".to_string(),
            ));
        }
        if xy.0 < 0 || xy.1 < 0 {
            return Err(TouchError::InvalidConfig(format!(
                "negative coordinates for {}: ({}, {})",
                name, xy.0, xy.1
            )));
        }
        if self.points.contains_key(&name) {
            return Err(TouchError::InvalidConfig(format!(
                "duplicate touch identifier: {}",
                name
            )));
        }
        self.points.insert(name, xy);
        Ok(())
    }

    /// Look up a canonical identifier
    pub fn get(&self, identifier: &str) -> Option<(i32, i32)> {
        self.points.get(identifier).copied()
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.points.contains_key(identifier)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over `(identifier, (x, y))` in identifier order
    pub fn iter(&self) -> impl Iterator<Item = (&str, (i32, i32))> {
        self.points.iter().map(|(name, xy)| (name.as_str(), *xy))
    }
}

impl<'de> Deserialize<'de> for CoordinateTable {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = CoordinateTable;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of touch identifiers to [x, y] pairs")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                // serde_json keeps the last value for repeated keys; insert rejects them instead
                let mut table = CoordinateTable::new();
                while let Some((name, xy)) = map.next_entry::<String, (i32, i32)>()? {
                    table.insert(&name, xy).map_err(de::Error::custom)?;
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}
