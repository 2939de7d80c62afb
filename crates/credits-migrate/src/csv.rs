//! Delimited-file source: one `uuid,name,credits,redeemed` record per line.

use std::path::{Path, PathBuf};

use credits_types::{UserId, UserRecord};

use crate::error::MigrateError;
use crate::source::UserSource;

/// Reads records from a comma-separated text file.
///
/// Lines that are not valid UTF-8 or not well-formed are skipped and
/// counted; they never fail the load.
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
}

impl CsvSource {
    /// Source reading the file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// Parse one line. Returns `None` for anything that is not exactly four
/// well-formed fields.
pub fn parse_line(line: &str) -> Option<UserRecord> {
    let fields: Vec<&str> = line.trim().split(',').map(str::trim).collect();
    let [id, name, credits, redeemed] = fields.as_slice() else {
        return None;
    };
    if name.is_empty() {
        return None;
    }
    Some(UserRecord {
        id: id.parse::<UserId>().ok()?,
        name: (*name).to_owned(),
        credits: credits.parse().ok()?,
        redeemed: redeemed.parse().ok()?,
    })
}

impl UserSource for CsvSource {
    fn name(&self) -> &'static str {
        "csv"
    }

    async fn load_users(&self) -> Result<Vec<UserRecord>, MigrateError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| MigrateError::io(&self.path, e))?;

        let mut skipped: usize = 0;
        let mut users = Vec::new();
        for (index, raw) in bytes.split(|&byte| byte == b'\n').enumerate() {
            let Ok(line) = std::str::from_utf8(raw) else {
                skipped = skipped.saturating_add(1);
                tracing::warn!(
                    path = %self.path.display(),
                    line = index.saturating_add(1),
                    "Skipping line that is not valid UTF-8"
                );
                continue;
            };
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                Some(record) => users.push(record),
                None => skipped = skipped.saturating_add(1),
            }
        }

        tracing::debug!(
            path = %self.path.display(),
            loaded = users.len(),
            skipped,
            "Parsed delimited user file"
        );
        Ok(users)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_well_formed_line() {
        let id = UserId::new();
        let record = parse_line(&format!("{id},Steve,120,30")).unwrap();
        assert_eq!(record, UserRecord::new(id, "Steve").with_credits(120).with_redeemed(30));
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let id = UserId::new();
        let record = parse_line(&format!("  {id} , Alex , 1 , 0 \r")).unwrap();
        assert_eq!(record.name, "Alex");
        assert_eq!(record.credits, 1);
    }

    #[test]
    fn rejects_malformed_lines() {
        let id = UserId::new();
        assert!(parse_line(&format!("{id},Steve,120")).is_none());
        assert!(parse_line(&format!("{id},Steve,120,30,extra")).is_none());
        assert!(parse_line("uuid,name,credits,redeemed").is_none());
        assert!(parse_line(&format!("{id},Steve,-5,0")).is_none());
        assert!(parse_line(&format!("{id},Steve,lots,0")).is_none());
        assert!(parse_line(&format!("{id},,1,0")).is_none());
        assert!(parse_line("").is_none());
    }
}
