//! Remote Store response normalization.
//!
//! The backend is not consistent about key spelling (`favoriteBooks`,
//! `FavoriteBooks`, `favorite_books`; `action`/`Action`) and may return the
//! list either as plain ids or as populated documents carrying `_id`.
//! [`normalize`] runs once per response and produces [`FavoritesPayload`];
//! nothing past this module sees the wire shape.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use shelfshare_core::types::{ItemId, ToggleAction};

use crate::error::FavoritesError;

/// Canonical Remote Store response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoritesPayload {
    /// Full favorites list after the operation
    pub items: Vec<ItemId>,
    /// Present for toggle responses; `None` when absent or unrecognized
    pub action: Option<ToggleAction>,
}

impl FavoritesPayload {
    pub fn new(items: Vec<ItemId>) -> Self {
        Self {
            items,
            action: None,
        }
    }

    pub fn with_action(mut self, action: ToggleAction) -> Self {
        self.action = Some(action);
        self
    }
}

#[derive(Debug, Deserialize)]
struct WirePayload {
    #[serde(default, alias = "Success")]
    success: Option<bool>,
    #[serde(default, alias = "Action")]
    action: Option<String>,
    #[serde(
        default,
        rename = "favoriteBooks",
        alias = "FavoriteBooks",
        alias = "favorite_books"
    )]
    favorite_books: Option<Vec<Value>>,
    #[serde(default, alias = "Message", alias = "error")]
    message: Option<String>,
}

/// Decodes and normalizes a 2xx response body.
///
/// # Errors
///
/// - `Rejected` when the body says `success: false`
/// - `MalformedResponse` when the body is not JSON or has no favorites list
pub fn normalize(body: &[u8]) -> Result<FavoritesPayload, FavoritesError> {
    let wire: WirePayload = serde_json::from_slice(body)
        .map_err(|e| FavoritesError::MalformedResponse(format!("undecodable body: {e}")))?;

    if wire.success == Some(false) {
        return Err(FavoritesError::Rejected(
            wire.message
                .unwrap_or_else(|| "success=false without message".to_owned()),
        ));
    }

    let raw_items = wire.favorite_books.ok_or_else(|| {
        FavoritesError::MalformedResponse("response carries no favoriteBooks list".to_owned())
    })?;

    let items = raw_items.iter().filter_map(item_from_value).collect();

    let action = match wire.action.as_deref() {
        None => None,
        Some(tag) => {
            let parsed = ToggleAction::parse(tag);
            if parsed.is_none() {
                warn!(action = tag, "unrecognized toggle action tag");
            }
            parsed
        }
    };

    Ok(FavoritesPayload { items, action })
}

/// Accepts `"id"`, `{"_id": "id"}` or `{"id": "id"}`; anything else is skipped.
fn item_from_value(value: &Value) -> Option<ItemId> {
    let raw = match value {
        Value::String(s) => s.as_str(),
        Value::Object(map) => map
            .get("_id")
            .or_else(|| map.get("id"))
            .and_then(Value::as_str)?,
        _ => {
            warn!(value = %value, "skipping non-string favorite entry");
            return None;
        }
    };

    match ItemId::new(raw) {
        Ok(id) => Some(id),
        Err(e) => {
            warn!(error = %e, "skipping invalid favorite entry");
            None
        }
    }
}
