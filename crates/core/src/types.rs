//! Domain types shared by the favorites controller, its adapters and the CLI.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// Upper bound for any identifier, in bytes.
pub const MAX_ID_LEN: usize = 256;

fn validate_id(field: &'static str, raw: &str) -> Result<(), ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if raw.len() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field,
            len: raw.len(),
            max: MAX_ID_LEN,
        });
    }
    Ok(())
}

/// Subject identifier issued by the external identity provider.
///
/// Opaque to ShelfShare; used as the partition key for both the Remote
/// Store and the local cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        validate_id("user", &raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for UserId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<UserId> for String {
    fn from(id: UserId) -> Self {
        id.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a favoritable item (a book listing).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ItemId(String);

impl ItemId {
    pub fn new(raw: impl Into<String>) -> Result<Self, ValidationError> {
        let raw = raw.into();
        validate_id("item", &raw)?;
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for ItemId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ItemId> for String {
    fn from(id: ItemId) -> Self {
        id.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which way a toggle went.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToggleAction {
    Added,
    Removed,
}

impl ToggleAction {
    /// Parses the wire tag, case-insensitively.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "added" => Some(Self::Added),
            "removed" => Some(Self::Removed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Added => "added",
            Self::Removed => "removed",
        }
    }
}

impl fmt::Display for ToggleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the in-memory favorites currently come from.
///
/// Not persisted. Reset on every controller operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncStatus {
    /// Confirmed by a Remote Store response
    Synced,
    /// Derived from the local cache; not confirmed by the Remote Store
    OfflinePending,
    /// The last operation was rejected (bad input or malformed response)
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Synced => "synced",
            Self::OfflinePending => "offline-pending",
            Self::Error => "error",
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Synced)
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A user's favorited items.
///
/// Membership is unordered; serialization emits a sorted array so the
/// cached form is stable across writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FavoriteSet {
    items: HashSet<ItemId>,
}

impl FavoriteSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, item: &ItemId) -> bool {
        self.items.contains(item)
    }

    /// Returns `true` if the item was not already present.
    pub fn insert(&mut self, item: ItemId) -> bool {
        self.items.insert(item)
    }

    /// Returns `true` if the item was present.
    pub fn remove(&mut self, item: &ItemId) -> bool {
        self.items.remove(item)
    }

    /// Flips membership of `item` and reports which way it went.
    pub fn toggle(&mut self, item: &ItemId) -> ToggleAction {
        if self.items.remove(item) {
            ToggleAction::Removed
        } else {
            self.items.insert(item.clone());
            ToggleAction::Added
        }
    }

    /// Applies an action reported by the Remote Store.
    pub fn apply(&mut self, action: ToggleAction, item: &ItemId) {
        match action {
            ToggleAction::Added => {
                self.items.insert(item.clone());
            }
            ToggleAction::Removed => {
                self.items.remove(item);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn to_sorted_vec(&self) -> Vec<ItemId> {
        let mut items: Vec<ItemId> = self.items.iter().cloned().collect();
        items.sort();
        items
    }
}

impl FromIterator<ItemId> for FavoriteSet {
    fn from_iter<I: IntoIterator<Item = ItemId>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl Serialize for FavoriteSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_sorted_vec().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FavoriteSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<ItemId>::deserialize(deserializer)?;
        Ok(items.into_iter().collect())
    }
}
