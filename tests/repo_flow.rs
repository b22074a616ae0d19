//! End-to-end flows over the registry, key mapper and object store:
//! create a repository, push files, browse it, read content back, delete
//! everything.

use bytes::Bytes;
use repovault::{
    config::RepoNameScope,
    db,
    models::{listing::EntryKind, principal::Principal},
    services::{blob_store::BlobStore, keyspace, registry::RepoRegistry},
    session::{BrowserSession, Navigation},
};
use tempfile::TempDir;
use tokio::io::AsyncReadExt;

struct Fixture {
    registry: RepoRegistry,
    store: BlobStore,
    _dir: TempDir,
}

async fn fixture() -> Fixture {
    let dir = TempDir::new().unwrap();
    let pool = db::connect("sqlite::memory:", 1).await.unwrap();
    db::apply_sql(&pool, include_str!("../migrations/0001_init.sql"))
        .await
        .unwrap();
    let store = BlobStore::new(pool.clone(), dir.path().to_path_buf());
    let registry = RepoRegistry::new(pool, store.clone(), RepoNameScope::Global);
    Fixture {
        registry,
        store,
        _dir: dir,
    }
}

fn jane() -> Principal {
    Principal {
        id: 1,
        first_name: "Jane".into(),
        last_name: "Doe".into(),
    }
}

async fn push(fixture: &Fixture, label: &str, repo: &str, path: &str, content: &[u8]) -> String {
    let key = keyspace::to_storage_key(label, repo, path);
    fixture
        .store
        .put(&key, Bytes::copy_from_slice(content), None)
        .await
        .unwrap();
    key
}

async fn read_back(fixture: &Fixture, key: &str) -> String {
    let (_, mut file) = fixture.store.get_reader(key).await.unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).await.unwrap();
    content
}

#[tokio::test]
async fn demo_repo_lists_folder_then_file_at_root() {
    let fx = fixture().await;
    let owner = jane();
    fx.registry.create(&owner, "demo").await.unwrap();

    let label = keyspace::owner_bucket_label("Jane", "Doe", 1);
    push(&fx, &label, "demo", "a.txt", b"alpha").await;
    push(&fx, &label, "demo", "sub/b.txt", b"beta").await;

    let root = keyspace::list_children(&fx.store, &format!("{}/demo", label))
        .await
        .unwrap();
    assert_eq!(root.len(), 2);
    assert_eq!(root[0].kind, EntryKind::Folder);
    assert_eq!(root[0].name, "sub");
    assert_eq!(root[1].kind, EntryKind::File);
    assert_eq!(root[1].name, "a.txt");

    let sub = keyspace::list_children(&fx.store, &format!("{}/demo/sub/", label))
        .await
        .unwrap();
    assert_eq!(sub.len(), 1);
    assert_eq!(sub[0].name, "b.txt");
    assert_eq!(sub[0].kind, EntryKind::File);
}

#[tokio::test]
async fn ingested_content_round_trips() {
    let fx = fixture().await;
    fx.registry.create(&jane(), "demo").await.unwrap();

    let label = keyspace::owner_bucket_label("Jane", "Doe", 1);
    let body = "fn main() {\n    println!(\"hi\");\n}\n";
    let key = push(&fx, &label, "demo", "src/main.rs", body.as_bytes()).await;

    assert_eq!(read_back(&fx, &key).await, body);
}

#[tokio::test]
async fn repush_overwrites_instead_of_duplicating() {
    let fx = fixture().await;
    fx.registry.create(&jane(), "demo").await.unwrap();

    let label = keyspace::owner_bucket_label("Jane", "Doe", 1);
    let key = push(&fx, &label, "demo", "a.txt", b"first").await;
    push(&fx, &label, "demo", "a.txt", b"second").await;

    let root = keyspace::list_children(&fx.store, &format!("{}/demo", label))
        .await
        .unwrap();
    assert_eq!(root.len(), 1);
    assert_eq!(read_back(&fx, &key).await, "second");
}

#[tokio::test]
async fn traversal_paths_stay_inside_the_repo() {
    let fx = fixture().await;
    fx.registry.create(&jane(), "demo").await.unwrap();

    let label = keyspace::owner_bucket_label("Jane", "Doe", 1);
    let key = push(&fx, &label, "demo", "../../outside.txt", b"contained").await;

    assert!(key.starts_with(&keyspace::repo_prefix(&label, "demo")));
    let all = fx.store.list_keys("").await.unwrap();
    assert!(all.iter().all(|k| k.starts_with(&format!("{}/demo/", label))));
}

#[tokio::test]
async fn deletion_is_complete_for_the_owner() {
    let fx = fixture().await;
    let owner = jane();
    let repo = fx.registry.create(&owner, "demo").await.unwrap();

    let label = keyspace::owner_bucket_label("Jane", "Doe", 1);
    push(&fx, &label, "demo", "a.txt", b"alpha").await;
    push(&fx, &label, "demo", "sub/b.txt", b"beta").await;

    fx.registry.delete(&owner, repo.id, "demo").await.unwrap();

    assert!(fx.registry.list_for_owner(1).await.unwrap().is_empty());
    let prefix = keyspace::repo_prefix(&label, "demo");
    assert!(fx.store.list_keys(&prefix).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_someone_elses_repo_fails_and_changes_nothing() {
    let fx = fixture().await;
    let other = Principal {
        id: 2,
        first_name: "John".into(),
        last_name: "Smith".into(),
    };
    let repo = fx.registry.create(&other, "demo").await.unwrap();
    let other_label = keyspace::owner_bucket_label("John", "Smith", 2);
    push(&fx, &other_label, "demo", "a.txt", b"private").await;

    // Owner 1 tries to delete owner 2's repo by id.
    assert!(fx.registry.delete(&jane(), repo.id, "demo").await.is_err());

    assert_eq!(fx.registry.list_for_owner(2).await.unwrap().len(), 1);
    let prefix = keyspace::repo_prefix(&other_label, "demo");
    assert_eq!(fx.store.list_keys(&prefix).await.unwrap().len(), 1);
}

#[tokio::test]
async fn browser_session_walks_the_pushed_tree() {
    let fx = fixture().await;
    fx.registry.create(&jane(), "demo").await.unwrap();

    let label = keyspace::owner_bucket_label("Jane", "Doe", 1);
    push(&fx, &label, "demo", "a.txt", b"alpha").await;
    push(&fx, &label, "demo", "sub/b.txt", b"beta").await;

    let (mut session, nav) = BrowserSession::open(label.clone(), "demo");
    let Navigation::FetchListing { prefix } = nav else {
        panic!("expected a root listing fetch");
    };
    let items = keyspace::list_children(&fx.store, &prefix).await.unwrap();
    session.store_listing(prefix, items);

    let entries = session.current_items().unwrap().to_vec();
    assert_eq!(entries[0].name, "sub");

    let nav = session.select_entry(&entries[0]).unwrap();
    let Navigation::FetchListing { prefix } = nav else {
        panic!("expected a subfolder listing fetch");
    };
    let items = keyspace::list_children(&fx.store, &prefix).await.unwrap();
    session.store_listing(prefix, items);

    let entries = session.current_items().unwrap().to_vec();
    assert_eq!(entries.len(), 1);
    let nav = session.select_entry(&entries[0]).unwrap();
    assert_eq!(
        nav,
        Navigation::FetchFile {
            key: format!("{}/demo/sub/b.txt", label)
        }
    );
}
