//! Profile rows over the REST endpoint (`/rest/v1/users`).

use uuid::Uuid;

use super::{Endpoint, SessionCell};
use crate::profile::{ProfileError, ProfileStore, UserProfile, single_row};

const USERS_PATH: &str = "/rest/v1/users";

pub struct HttpProfileStore {
    http: reqwest::Client,
    endpoint: Endpoint,
    session: SessionCell,
}

impl HttpProfileStore {
    #[must_use]
    pub fn new(http: reqwest::Client, endpoint: Endpoint, session: SessionCell) -> Self {
        Self { http, endpoint, session }
    }
}

#[async_trait::async_trait]
impl ProfileStore for HttpProfileStore {
    async fn fetch_profile(&self, id: Uuid) -> Result<UserProfile, ProfileError> {
        let url = format!("{}?id=eq.{id}&select=*", self.endpoint.url(USERS_PATH));
        let session = self.session.get();
        let response = self
            .http
            .get(url)
            .header("apikey", &self.endpoint.anon_key)
            .header("Authorization", self.endpoint.bearer(session.as_ref()))
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| ProfileError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| ProfileError::Network(e.to_string()))?;

        if !(200..300).contains(&status) {
            return Err(ProfileError::Rejected { status, body: text });
        }

        let rows = parse_rows(&text)?;
        tracing::debug!(user_id = %id, rows = rows.len(), "profile rows fetched");
        single_row(rows)
    }
}

/// Parse a `users` query result (a JSON array of rows).
///
/// # Errors
///
/// [`ProfileError::Decode`] when the body is not an array of profile rows.
pub fn parse_rows(json: &str) -> Result<Vec<UserProfile>, ProfileError> {
    serde_json::from_str(json).map_err(|e| ProfileError::Decode(e.to_string()))
}

#[cfg(test)]
#[path = "rest_test.rs"]
mod tests;
