//! Legacy per-player file source.
//!
//! The legacy layout stores one `<uuid>.yml` file per player holding only
//! balances. Names come from an optional local name cache first, then from
//! a remote [`NameResolver`]. Remote lookups run concurrently behind a
//! shared rate limiter and are tried a bounded number of times with a fixed
//! delay between attempts. Players whose
//! name still cannot be resolved are dropped from the import.

use std::collections::HashMap;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use credits_types::{UserId, UserRecord};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::Deserialize;
use tokio::task::JoinSet;

use crate::error::MigrateError;
use crate::resolver::NameResolver;
use crate::source::UserSource;

/// Default number of lookup attempts per player, the first one included.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default pause between lookup attempts for one player.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Default lookup rate shared by all concurrent requests.
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 15;

// ---------------------------------------------------------------------------
// File formats
// ---------------------------------------------------------------------------

/// Balances as stored in a legacy player file.
#[derive(Debug, Default, Deserialize)]
struct PlayerFile {
    #[serde(rename = "Credits", default)]
    credits: u32,
    #[serde(rename = "Credits_Spent", default)]
    redeemed: u32,
}

/// One entry of a `usercache.json` style name cache.
#[derive(Debug, Deserialize)]
struct CachedName {
    uuid: String,
    name: String,
}

/// A player file whose name is not known yet.
#[derive(Debug, Clone, Copy)]
struct Unnamed {
    id: UserId,
    credits: u32,
    redeemed: u32,
}

impl Unnamed {
    const fn named(self, name: String) -> UserRecord {
        UserRecord {
            id: self.id,
            name,
            credits: self.credits,
            redeemed: self.redeemed,
        }
    }
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Reads legacy player files and resolves their names.
pub struct PlayerFileSource<R> {
    dir: PathBuf,
    name_cache: Option<PathBuf>,
    resolver: Arc<R>,
    max_attempts: u32,
    retry_delay: Duration,
    requests_per_second: u32,
}

impl<R> std::fmt::Debug for PlayerFileSource<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayerFileSource")
            .field("dir", &self.dir)
            .field("name_cache", &self.name_cache)
            .field("max_attempts", &self.max_attempts)
            .field("retry_delay", &self.retry_delay)
            .field("requests_per_second", &self.requests_per_second)
            .finish_non_exhaustive()
    }
}

impl<R: NameResolver> PlayerFileSource<R> {
    /// Source over the files in `dir`, resolving names with `resolver`.
    pub fn new(dir: impl AsRef<Path>, resolver: R) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            name_cache: None,
            resolver: Arc::new(resolver),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
        }
    }

    /// Consult a local name cache before any remote lookup.
    #[must_use]
    pub fn with_name_cache(mut self, path: impl AsRef<Path>) -> Self {
        self.name_cache = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set how many lookups are tried per player before it is dropped.
    /// Zero is treated as one.
    #[must_use]
    pub const fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the pause between lookup attempts.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Set the shared lookup rate. Zero is treated as one.
    #[must_use]
    pub const fn with_requests_per_second(mut self, rate: u32) -> Self {
        self.requests_per_second = rate;
        self
    }

    async fn read_player_files(&self) -> Result<Vec<Unnamed>, MigrateError> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| MigrateError::io(&self.dir, e))?;

        let mut players = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| MigrateError::io(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("yml") {
                continue;
            }
            let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse::<UserId>().ok())
            else {
                tracing::warn!(path = %path.display(), "Skipping player file without an id name");
                continue;
            };
            match read_player_file(&path).await {
                Ok(file) => players.push(Unnamed {
                    id,
                    credits: file.credits,
                    redeemed: file.redeemed,
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable player file");
                }
            }
        }
        Ok(players)
    }

    async fn read_name_cache(&self) -> Result<HashMap<UserId, String>, MigrateError> {
        let Some(path) = &self.name_cache else {
            return Ok(HashMap::new());
        };
        let contents = match tokio::fs::read_to_string(path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "Name cache not found, resolving every player remotely");
                return Ok(HashMap::new());
            }
            Err(e) => return Err(MigrateError::io(path, e)),
        };
        let entries: Vec<CachedName> = serde_json::from_str(&contents)?;
        Ok(entries
            .into_iter()
            .filter_map(|entry| Some((entry.uuid.parse::<UserId>().ok()?, entry.name)))
            .collect())
    }

    fn limiter(&self) -> Arc<DefaultDirectRateLimiter> {
        let rate = NonZeroU32::new(self.requests_per_second).unwrap_or(NonZeroU32::MIN);
        Arc::new(RateLimiter::direct(Quota::per_second(rate)))
    }
}

async fn read_player_file(path: &Path) -> Result<PlayerFile, MigrateError> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| MigrateError::io(path, e))?;
    if contents.trim().is_empty() {
        return Ok(PlayerFile::default());
    }
    serde_yml::from_str(&contents).map_err(|source| MigrateError::PlayerFile {
        path: path.display().to_string(),
        source,
    })
}

/// Resolve one player's name in at most `max_attempts` lookups.
async fn resolve_with_retries<R: NameResolver>(
    resolver: &R,
    limiter: &DefaultDirectRateLimiter,
    id: UserId,
    max_attempts: u32,
    retry_delay: Duration,
) -> Option<String> {
    let max_attempts = max_attempts.max(1);
    for attempt in 1..=max_attempts {
        limiter.until_ready().await;
        match resolver.resolve(id).await {
            Ok(Some(name)) => return Some(name),
            Ok(None) => tracing::debug!(user = %id, attempt, "Lookup returned no name"),
            Err(e) => tracing::warn!(user = %id, attempt, error = %e, "Lookup failed"),
        }
        if attempt < max_attempts {
            tokio::time::sleep(retry_delay).await;
        }
    }
    None
}

impl<R: NameResolver> UserSource for PlayerFileSource<R> {
    fn name(&self) -> &'static str {
        "player_files"
    }

    async fn load_users(&self) -> Result<Vec<UserRecord>, MigrateError> {
        let players = self.read_player_files().await?;
        let names = self.read_name_cache().await?;

        let mut users = Vec::with_capacity(players.len());
        let mut lookups = JoinSet::new();
        let limiter = self.limiter();

        for player in players {
            if let Some(name) = names.get(&player.id) {
                users.push(player.named(name.clone()));
                continue;
            }
            let resolver = Arc::clone(&self.resolver);
            let limiter = Arc::clone(&limiter);
            let (max_attempts, retry_delay) = (self.max_attempts, self.retry_delay);
            lookups.spawn(async move {
                let name = resolve_with_retries(
                    resolver.as_ref(),
                    &limiter,
                    player.id,
                    max_attempts,
                    retry_delay,
                )
                .await;
                (player, name)
            });
        }

        let cached = users.len();
        tracing::info!(
            cached,
            remote = lookups.len(),
            "Resolving player names"
        );

        let mut dropped: usize = 0;
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok((player, Some(name))) => users.push(player.named(name)),
                Ok((player, None)) => {
                    dropped = dropped.saturating_add(1);
                    tracing::warn!(user = %player.id, "Dropping player with unresolved name");
                }
                Err(e) => {
                    dropped = dropped.saturating_add(1);
                    tracing::error!(error = %e, "Name lookup task failed");
                }
            }
            tracing::debug!(remaining = lookups.len(), "Users remaining");
        }

        tracing::info!(
            resolved = users.len(),
            dropped,
            "Player files loaded"
        );
        Ok(users)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn broken_player_file_is_a_typed_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yml");
        std::fs::write(&path, "Credits: [unclosed\n").unwrap();

        match read_player_file(&path).await {
            Err(MigrateError::PlayerFile { path: reported, .. }) => {
                assert_eq!(reported, path.display().to_string());
            }
            other => panic!("expected a player file error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn blank_player_file_has_zero_balances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.yml");
        std::fs::write(&path, "\n").unwrap();

        let file = read_player_file(&path).await.unwrap();
        assert_eq!((file.credits, file.redeemed), (0, 0));
    }
}
