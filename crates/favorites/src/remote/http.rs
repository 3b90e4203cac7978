//! `reqwest`-backed Remote Store client.

use std::sync::Arc;

use metrics::counter;
use reqwest::{RequestBuilder, Url};
use serde::Serialize;
use tracing::{debug, warn};

use shelfshare_core::metrics::{FAVORITES_REMOTE_REQUESTS_TOTAL, LABEL_OPERATION, LABEL_RESULT};
use shelfshare_core::types::{ItemId, UserId};

use crate::config::FavoritesConfig;
use crate::error::FavoritesError;
use crate::remote::RemoteStore;
use crate::remote::payload::{FavoritesPayload, normalize};

/// Mutation body for add and toggle.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody<'a> {
    book_id: &'a str,
}

/// Production Remote Store client.
///
/// Identifiers are pushed as single path segments; `Url` percent-encodes
/// any `/` or space they contain.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Arc<reqwest::Client>,
    base_url: Url,
    max_error_body_bytes: usize,
}

impl HttpRemoteStore {
    /// Builds the client from validated config.
    ///
    /// # Errors
    ///
    /// `Config` when the config is invalid, the base URL cannot carry path
    /// segments, or the TLS backend fails to initialize.
    pub fn new(config: &FavoritesConfig) -> Result<Self, FavoritesError> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url).map_err(|e| FavoritesError::Config {
            field: "base_url".to_owned(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(FavoritesError::Config {
                field: "base_url".to_owned(),
                reason: "url cannot carry path segments".to_owned(),
            });
        }

        let client = reqwest::ClientBuilder::new()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FavoritesError::Config {
                field: "http_client".to_owned(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            max_error_body_bytes: config.max_error_body_bytes,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, FavoritesError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| FavoritesError::Config {
                field: "base_url".to_owned(),
                reason: "url cannot carry path segments".to_owned(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends the request and turns transport errors and non-2xx statuses
    /// into [`FavoritesError`]. Returns the raw body on success.
    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Vec<u8>, FavoritesError> {
        let result = self.send_inner(request).await;
        let label = if result.is_ok() { "success" } else { "failure" };
        counter!(
            FAVORITES_REMOTE_REQUESTS_TOTAL,
            LABEL_OPERATION => operation,
            LABEL_RESULT => label
        )
        .increment(1);
        if let Err(e) = &result {
            debug!(operation, error = %e, "remote store request failed");
        }
        result
    }

    async fn send_inner(&self, request: RequestBuilder) -> Result<Vec<u8>, FavoritesError> {
        let response = request.send().await.map_err(map_transport_error)?;
        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;

        if !status.is_success() {
            let mut text = String::from_utf8_lossy(&body).into_owned();
            truncate_at_char_boundary(&mut text, self.max_error_body_bytes);
            return Err(FavoritesError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(body.to_vec())
    }
}

fn map_transport_error(err: reqwest::Error) -> FavoritesError {
    if err.is_timeout() {
        FavoritesError::Timeout(err.to_string())
    } else {
        FavoritesError::Network(err.to_string())
    }
}

fn truncate_at_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
    text.push('…');
}

impl RemoteStore for HttpRemoteStore {
    async fn fetch(&self, user: &UserId) -> Result<FavoritesPayload, FavoritesError> {
        let url = self.endpoint(&["favorites", user.as_str()])?;
        let body = self.send("load", self.client.get(url)).await?;
        normalize(&body)
    }

    async fn add(&self, user: &UserId, item: &ItemId) -> Result<FavoritesPayload, FavoritesError> {
        let url = self.endpoint(&["favorites", user.as_str()])?;
        let request = self.client.post(url).json(&ItemBody {
            book_id: item.as_str(),
        });
        let body = self.send("add", request).await?;
        normalize(&body)
    }

    async fn remove(
        &self,
        user: &UserId,
        item: &ItemId,
    ) -> Result<FavoritesPayload, FavoritesError> {
        let url = self.endpoint(&["favorites", user.as_str(), item.as_str()])?;
        let body = self.send("remove", self.client.delete(url)).await?;
        normalize(&body)
    }

    async fn toggle(
        &self,
        user: &UserId,
        item: &ItemId,
    ) -> Result<FavoritesPayload, FavoritesError> {
        let url = self.endpoint(&["favorites", user.as_str(), "toggle"])?;
        let request = self.client.put(url).json(&ItemBody {
            book_id: item.as_str(),
        });
        let body = self.send("toggle", request).await?;
        let payload = normalize(&body)?;
        if payload.action.is_none() {
            warn!(user = %user, item = %item, "toggle response carried no action");
        }
        Ok(payload)
    }

    async fn ping(&self) -> Result<(), FavoritesError> {
        let url = self.endpoint(&["health"])?;
        self.send("health", self.client.get(url)).await?;
        Ok(())
    }
}
