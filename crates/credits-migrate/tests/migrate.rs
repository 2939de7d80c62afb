//! Integration tests for the legacy data importer.
//!
//! Every source runs against temporary files and in-memory `SQLite` stores.
//! Remote name lookups use a scripted resolver, and the HTTP resolver is
//! exercised against a local stub server.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use credits_core::{MigrationConfig, MigrationSource};
use credits_db::{RecordStore, StoreConfig};
use credits_migrate::{
    CsvSource, Importer, MigrateError, NameResolver, PlayerFileSource, ProfileResolver, Source,
    StoreSource, UserSource,
};
use credits_types::{UserId, UserRecord};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

// =============================================================================
// Helpers
// =============================================================================

async fn memory_store() -> RecordStore {
    RecordStore::connect(&StoreConfig::in_memory())
        .await
        .expect("in-memory SQLite should always connect")
}

fn sorted(mut users: Vec<UserRecord>) -> Vec<UserRecord> {
    users.sort_by_key(|user| user.id);
    users
}

fn write_csv(path: &Path, users: &[UserRecord], extra: &[&str]) {
    let mut contents = String::new();
    for user in users {
        writeln!(
            contents,
            "{},{},{},{}",
            user.id, user.name, user.credits, user.redeemed
        )
        .unwrap();
    }
    for line in extra {
        writeln!(contents, "{line}").unwrap();
    }
    std::fs::write(path, contents).unwrap();
}

fn generated_users(count: u32) -> Vec<UserRecord> {
    (0..count)
        .map(|i| {
            UserRecord::new(UserId::new(), format!("player{i}"))
                .with_credits(i * 3)
                .with_redeemed(i % 7)
        })
        .collect()
}

/// What the scripted resolver answers for one id, in call order.
#[derive(Debug, Clone)]
enum Reply {
    Name(&'static str),
    Nothing,
    Failure,
}

#[derive(Debug, Default)]
struct Script {
    replies: Mutex<HashMap<UserId, Vec<Reply>>>,
    calls: Mutex<HashMap<UserId, u32>>,
}

/// Resolver answering from a per-id script. Clones share the script.
#[derive(Debug, Default, Clone)]
struct ScriptedResolver {
    script: Arc<Script>,
}

impl ScriptedResolver {
    fn with(self, id: UserId, replies: Vec<Reply>) -> Self {
        self.script.replies.lock().unwrap().insert(id, replies);
        self
    }

    fn calls(&self, id: UserId) -> u32 {
        self.script.calls.lock().unwrap().get(&id).copied().unwrap_or(0)
    }

    fn next_reply(&self, id: UserId) -> Reply {
        *self.script.calls.lock().unwrap().entry(id).or_insert(0) += 1;
        let mut replies = self.script.replies.lock().unwrap();
        let queue = replies.entry(id).or_default();
        if queue.is_empty() {
            Reply::Nothing
        } else {
            queue.remove(0)
        }
    }
}

impl NameResolver for ScriptedResolver {
    async fn resolve(&self, id: UserId) -> Result<Option<String>, MigrateError> {
        match self.next_reply(id) {
            Reply::Name(name) => Ok(Some(name.to_owned())),
            Reply::Nothing => Ok(None),
            Reply::Failure => Err(MigrateError::Lookup("connection reset".to_owned())),
        }
    }
}

fn write_player_file(dir: &Path, id: UserId, credits: u32, spent: u32) {
    std::fs::write(
        dir.join(format!("{id}.yml")),
        format!("Credits: {credits}\nCredits_Spent: {spent}\n"),
    )
    .unwrap();
}

// =============================================================================
// CSV
// =============================================================================

#[tokio::test]
async fn csv_import_copies_every_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database.csv");
    let users = generated_users(500);
    write_csv(&path, &users, &[]);

    let importer = Importer::new(memory_store().await.with_batch_size(64));
    let report = importer.run(&CsvSource::new(&path)).await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.source, "csv");
    assert_eq!(report.loaded, 500);
    assert_eq!(report.inserted, 500);
    assert_eq!(report.verified, 500);
    assert_eq!(importer.target().count().await.unwrap(), 500);
    assert_eq!(
        sorted(importer.target().get_all().await.unwrap()),
        sorted(users)
    );
}

#[tokio::test]
async fn csv_skips_malformed_lines() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database.csv");
    let users = generated_users(3);
    let bad_id = format!("{},Broken,1", UserId::new());
    write_csv(
        &path,
        &users,
        &["not-a-uuid,Steve,1,0", &bad_id, "", "uuid,name,credits,redeemed"],
    );

    let loaded = CsvSource::new(&path).load_users().await.unwrap();
    assert_eq!(sorted(loaded), sorted(users));
}

#[tokio::test]
async fn csv_skips_lines_that_are_not_utf8() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database.csv");
    let users = generated_users(2);

    let mut bytes = Vec::new();
    for user in &users {
        bytes.extend_from_slice(
            format!("{},{},{},{}\n", user.id, user.name, user.credits, user.redeemed).as_bytes(),
        );
        // A Latin-1 encoded name between the good lines.
        bytes.extend_from_slice(format!("{},Sch", UserId::new()).as_bytes());
        bytes.push(0xF6);
        bytes.extend_from_slice(b"n,5,0\n");
    }
    std::fs::write(&path, bytes).unwrap();

    let loaded = CsvSource::new(&path).load_users().await.unwrap();
    assert_eq!(sorted(loaded), sorted(users));
}

#[tokio::test]
async fn csv_missing_file_aborts() {
    let dir = tempfile::tempdir().unwrap();
    let result = CsvSource::new(dir.path().join("absent.csv")).load_users().await;
    assert!(matches!(result, Err(MigrateError::Io { .. })));
}

#[tokio::test]
async fn rerunning_an_import_inserts_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("database.csv");
    write_csv(&path, &generated_users(20), &[]);

    let importer = Importer::new(memory_store().await);
    let source = CsvSource::new(&path);
    assert_eq!(importer.run(&source).await.unwrap().inserted, 20);

    let again = importer.run(&source).await.unwrap();
    assert_eq!(again.inserted, 0);
    assert!(again.is_complete());
    assert_eq!(importer.target().count().await.unwrap(), 20);
}

// =============================================================================
// Previous store
// =============================================================================

#[tokio::test]
async fn store_source_reads_everything_then_closes() {
    let previous = memory_store().await;
    let users = generated_users(25);
    previous.add_batch(&users).await.unwrap();

    let importer = Importer::new(memory_store().await);
    let report = importer
        .run(&StoreSource::new(previous.clone()))
        .await
        .unwrap();

    assert!(report.is_complete());
    assert_eq!(report.loaded, 25);
    assert!(previous.is_closed());
    assert_eq!(
        sorted(importer.target().get_all().await.unwrap()),
        sorted(users)
    );
}

// =============================================================================
// Player files
// =============================================================================

fn fast<R: NameResolver>(source: PlayerFileSource<R>) -> PlayerFileSource<R> {
    source
        .with_max_attempts(3)
        .with_retry_delay(Duration::ZERO)
        .with_requests_per_second(1_000)
}

#[tokio::test]
async fn player_files_prefer_the_name_cache() {
    let dir = tempfile::tempdir().unwrap();
    let cached = UserId::new();
    write_player_file(dir.path(), cached, 40, 2);

    let cache_path = dir.path().join("usercache.json");
    std::fs::write(
        &cache_path,
        format!(r#"[{{"name":"Cached","uuid":"{cached}","expiresOn":"2030-01-01"}}]"#),
    )
    .unwrap();

    let resolver = ScriptedResolver::default();
    let source =
        fast(PlayerFileSource::new(dir.path(), resolver.clone())).with_name_cache(&cache_path);
    let users = source.load_users().await.unwrap();

    assert_eq!(
        users,
        vec![UserRecord::new(cached, "Cached").with_credits(40).with_redeemed(2)]
    );
    assert_eq!(resolver.calls(cached), 0);
}

#[tokio::test]
async fn player_files_retry_then_resolve() {
    let dir = tempfile::tempdir().unwrap();
    let id = UserId::new();
    write_player_file(dir.path(), id, 10, 0);

    let resolver = ScriptedResolver::default().with(
        id,
        vec![Reply::Failure, Reply::Nothing, Reply::Name("Late")],
    );
    let users = fast(PlayerFileSource::new(dir.path(), resolver.clone()))
        .load_users()
        .await
        .unwrap();

    assert_eq!(users, vec![UserRecord::new(id, "Late").with_credits(10)]);
    assert_eq!(resolver.calls(id), 3);
}

#[tokio::test]
async fn player_files_drop_unresolved_players() {
    let dir = tempfile::tempdir().unwrap();
    let known = UserId::new();
    let unknown = UserId::new();
    write_player_file(dir.path(), known, 5, 1);
    write_player_file(dir.path(), unknown, 9, 9);

    let resolver = ScriptedResolver::default().with(known, vec![Reply::Name("Known")]);
    let users = fast(PlayerFileSource::new(dir.path(), resolver.clone()))
        .load_users()
        .await
        .unwrap();

    assert_eq!(
        users,
        vec![UserRecord::new(known, "Known").with_credits(5).with_redeemed(1)]
    );
    assert_eq!(resolver.calls(unknown), 3);
}

#[tokio::test]
async fn player_files_always_make_at_least_one_lookup() {
    let dir = tempfile::tempdir().unwrap();
    let id = UserId::new();
    write_player_file(dir.path(), id, 3, 0);

    let resolver = ScriptedResolver::default().with(id, vec![Reply::Nothing, Reply::Name("Late")]);
    let users = fast(PlayerFileSource::new(dir.path(), resolver.clone()))
        .with_max_attempts(0)
        .load_users()
        .await
        .unwrap();

    assert!(users.is_empty());
    assert_eq!(resolver.calls(id), 1);
}

#[tokio::test]
async fn player_files_skip_unrelated_and_broken_files() {
    let dir = tempfile::tempdir().unwrap();
    let good = UserId::new();
    let empty = UserId::new();
    write_player_file(dir.path(), good, 1, 0);
    std::fs::write(dir.path().join(format!("{empty}.yml")), "").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("steve.yml"), "Credits: 1\n").unwrap();
    std::fs::write(
        dir.path().join(format!("{}.yml", UserId::new())),
        "Credits: [unterminated\n",
    )
    .unwrap();

    let resolver = ScriptedResolver::default()
        .with(good, vec![Reply::Name("Good")])
        .with(empty, vec![Reply::Name("Empty")]);
    let users = fast(PlayerFileSource::new(dir.path(), resolver))
        .load_users()
        .await
        .unwrap();

    assert_eq!(
        sorted(users),
        sorted(vec![
            UserRecord::new(good, "Good").with_credits(1),
            UserRecord::new(empty, "Empty"),
        ])
    );
}

// =============================================================================
// HTTP resolver
// =============================================================================

/// Serve `replies` (keyed by request path) until the test ends.
async fn stub_profile_server(replies: HashMap<String, (u16, String)>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let replies = replies.clone();
            tokio::spawn(async move {
                let mut request = Vec::new();
                let mut buf = [0_u8; 1024];
                while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                    let Ok(read) = socket.read(&mut buf).await else {
                        return;
                    };
                    if read == 0 {
                        return;
                    }
                    request.extend_from_slice(&buf[..read]);
                }
                let text = String::from_utf8_lossy(&request);
                let path = text.split_whitespace().nth(1).unwrap_or("/").to_owned();
                let (status, body) = replies
                    .get(&path)
                    .cloned()
                    .unwrap_or((404, String::new()));
                let response = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    format!("http://{addr}/profile")
}

#[tokio::test]
async fn profile_resolver_reads_name_from_ok_reply() {
    let id = UserId::new();
    let replies = HashMap::from([(
        format!("/profile/{}", id.simple()),
        (200, format!(r#"{{"id":"{}","name":"Notch"}}"#, id.simple())),
    )]);
    let resolver = ProfileResolver::new(&stub_profile_server(replies).await).unwrap();

    assert_eq!(resolver.resolve(id).await.unwrap(), Some("Notch".to_owned()));
}

#[tokio::test]
async fn profile_resolver_treats_other_statuses_as_no_name() {
    let throttled = UserId::new();
    let replies = HashMap::from([(
        format!("/profile/{}", throttled.simple()),
        (429, String::new()),
    )]);
    let resolver = ProfileResolver::new(&stub_profile_server(replies).await).unwrap();

    assert_eq!(resolver.resolve(throttled).await.unwrap(), None);
    assert_eq!(resolver.resolve(UserId::new()).await.unwrap(), None);
}

#[tokio::test]
async fn profile_resolver_reports_unreachable_service() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let resolver = ProfileResolver::new(&format!("http://{addr}/profile")).unwrap();
    assert!(matches!(
        resolver.resolve(UserId::new()).await,
        Err(MigrateError::Lookup(_))
    ));
}

// =============================================================================
// Config-driven source selection
// =============================================================================

#[tokio::test]
async fn source_follows_configuration() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.csv");
    let users = generated_users(4);
    write_csv(&path, &users, &[]);

    let config = MigrationConfig {
        enabled: true,
        source: MigrationSource::Csv,
        csv_path: path,
        ..MigrationConfig::default()
    };
    let source = Source::from_config(&config).await.unwrap();
    assert_eq!(source.name(), "csv");
    assert_eq!(sorted(source.load_users().await.unwrap()), sorted(users));

    let player_config = MigrationConfig {
        source: MigrationSource::PlayerFiles,
        ..MigrationConfig::default()
    };
    let player_source = Source::from_config(&player_config).await.unwrap();
    assert_eq!(player_source.name(), "player_files");
}
