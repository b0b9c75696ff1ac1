use pretty_assertions::assert_eq;
use tempfile::TempDir;

use socialkit::store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
use socialkit::types::{Account, AccountKind, ACCESS_TOKEN, OAUTH_TOKEN, OAUTH_TOKEN_SECRET};

fn alice(token: &str) -> Account {
    Account::new("alice", "facebook", AccountKind::OAuth2)
        .with_property(ACCESS_TOKEN, token)
        .with_property("username", "alice")
}

async fn assert_store_contract(store: &dyn CredentialStore) {
    assert!(store.load_all("facebook").await.unwrap().is_empty());

    let first = alice("one");
    store.save("facebook", &first).await.unwrap();
    assert_eq!(store.load_all("facebook").await.unwrap(), vec![first]);

    // Same id, new properties: replaced, not duplicated.
    let second = alice("two");
    store.save("facebook", &second).await.unwrap();
    assert_eq!(store.load_all("facebook").await.unwrap(), vec![second.clone()]);

    let bob = Account::new("bob", "twitter", AccountKind::OAuth1)
        .with_property(OAUTH_TOKEN, "t")
        .with_property(OAUTH_TOKEN_SECRET, "s");
    store.save("twitter", &bob).await.unwrap();
    assert_eq!(store.load_all("facebook").await.unwrap(), vec![second.clone()]);
    assert_eq!(store.load_all("twitter").await.unwrap(), vec![bob]);

    store.delete("facebook", &second).await.unwrap();
    assert!(store.load_all("facebook").await.unwrap().is_empty());

    // Deleting something absent is a no-op.
    store.delete("facebook", &second).await.unwrap();
}

#[tokio::test]
async fn memory_store_contract() {
    assert_store_contract(&MemoryCredentialStore::new()).await;
}

#[tokio::test]
async fn file_store_contract() {
    let dir = TempDir::new().unwrap();
    assert_store_contract(&FileCredentialStore::new(dir.path())).await;
}

#[tokio::test]
async fn file_store_survives_reopening() {
    let dir = TempDir::new().unwrap();
    let account = alice("persisted");
    FileCredentialStore::new(dir.path())
        .save("facebook", &account)
        .await
        .unwrap();

    let reopened = FileCredentialStore::new(dir.path());
    let loaded = reopened.load_all("facebook").await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id(), account.id());
    assert_eq!(loaded[0].properties(), account.properties());
    assert_eq!(loaded[0].kind(), AccountKind::OAuth2);
}

#[tokio::test]
async fn file_store_keeps_similar_service_ids_apart() {
    let dir = TempDir::new().unwrap();
    let store = FileCredentialStore::new(dir.path());
    let dotted =
        Account::new("alice", "face.book", AccountKind::OAuth2).with_property(ACCESS_TOKEN, "t");
    store.save("face.book", &dotted).await.unwrap();

    assert!(store.load_all("face-book").await.unwrap().is_empty());
    assert!(store.load_all("face book").await.unwrap().is_empty());
    assert_eq!(store.load_all("face.book").await.unwrap(), vec![dotted]);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn file_store_reports_corrupt_files() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("facebook.toml"), "not = [valid").unwrap();

    let err = FileCredentialStore::new(dir.path())
        .load_all("facebook")
        .await
        .unwrap_err();
    assert_eq!(err.category(), socialkit::error::ErrorCategory::Storage);
}

#[tokio::test]
async fn memory_store_clones_share_accounts() {
    let store = MemoryCredentialStore::new();
    let clone = store.clone();
    store.save("facebook", &alice("x")).await.unwrap();
    assert_eq!(clone.load_all("facebook").await.unwrap().len(), 1);
}
