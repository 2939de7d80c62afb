//! Profile name resolution for legacy player files.

use std::future::Future;
use std::time::Duration;

use credits_types::UserId;
use serde::Deserialize;

use crate::error::MigrateError;

/// Resolves a player id to its current display name.
pub trait NameResolver: Send + Sync + 'static {
    /// Look up `id`.
    ///
    /// `Ok(None)` means the service answered without a name (unknown
    /// profile, throttled). `Err` means the request itself failed. Both are
    /// retried by the caller.
    fn resolve(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<String>, MigrateError>> + Send;
}

/// Reply body of the profile endpoint. Other fields are ignored.
#[derive(Debug, Deserialize)]
struct ProfileReply {
    name: String,
}

/// HTTP resolver calling `GET {base_url}/{simple-uuid}`.
#[derive(Debug, Clone)]
pub struct ProfileResolver {
    client: reqwest::Client,
    base_url: String,
}

impl ProfileResolver {
    /// Per-request timeout.
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

    /// Resolver against the given profile endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`MigrateError::Lookup`] if the HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, MigrateError> {
        let client = reqwest::Client::builder()
            .timeout(Self::REQUEST_TIMEOUT)
            .build()
            .map_err(|e| MigrateError::Lookup(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Full lookup URL for `id`.
    pub fn url_for(&self, id: UserId) -> String {
        format!("{}/{}", self.base_url, id.simple())
    }
}

impl NameResolver for ProfileResolver {
    async fn resolve(&self, id: UserId) -> Result<Option<String>, MigrateError> {
        let response = self
            .client
            .get(self.url_for(id))
            .send()
            .await
            .map_err(|e| MigrateError::Lookup(format!("request for {id}: {e}")))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            tracing::debug!(user = %id, status = status.as_u16(), "Profile lookup returned no name");
            return Ok(None);
        }

        let reply: ProfileReply = response
            .json()
            .await
            .map_err(|e| MigrateError::Lookup(format!("invalid reply for {id}: {e}")))?;
        Ok(Some(reply.name))
    }
}
