use std::collections::HashMap;

use super::*;
use crate::config::DatabaseConfig;
use crate::query::QueryPlanner;

async fn db_with_user() -> (Database, User) {
    let db = Database::open_in_memory().await.unwrap();
    let user = db.insert_user("Alice", "alice@example.com", "hash").await.unwrap();
    (db, user)
}

fn new_quote(user_id: i64, content: &str, tags: &[&str]) -> NewQuote {
    NewQuote {
        user_id,
        content: content.to_string(),
        author: "Anon".to_string(),
        source: Source::default(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
    }
}

fn plan(pairs: &[(&str, &str)]) -> crate::query::QuotePlan {
    let params: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    QueryPlanner::quotes().plan(&params).unwrap()
}

#[tokio::test]
async fn test_duplicate_email() {
    let (db, _) = db_with_user().await;
    let err = db
        .insert_user("Other", "ALICE@example.com", "hash")
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Duplicate("email")));
}

#[tokio::test]
async fn test_user_lookup() {
    let (db, user) = db_with_user().await;
    assert_eq!(db.get_user_by_email("alice@example.com").await.unwrap().id, user.id);
    assert!(matches!(db.get_user_by_email("bob@example.com").await, Err(StoreError::NotFound)));
    assert!(matches!(db.get_user(user.id + 100).await, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn test_token_expiry_and_revocation() {
    let (db, user) = db_with_user().await;
    let now = unix_timestamp();
    db.insert_token("live", user.id, now + 3600, "authentication").await.unwrap();
    db.insert_token("stale", user.id, now - 1, "authentication").await.unwrap();

    let found = db.user_for_token("live", "authentication", now).await.unwrap();
    assert_eq!(found.map(|u| u.id), Some(user.id));
    assert!(db.user_for_token("stale", "authentication", now).await.unwrap().is_none());
    assert!(db.user_for_token("live", "activation", now).await.unwrap().is_none());

    assert_eq!(db.delete_tokens_for_user(user.id, "authentication").await.unwrap(), 2);
    assert!(db.user_for_token("live", "authentication", now).await.unwrap().is_none());
}

#[tokio::test]
async fn test_grant_permissions() {
    let (db, user) = db_with_user().await;
    assert!(db.permissions_for_user(user.id).await.unwrap().is_empty());

    db.grant_permissions(user.id, &[permissions::QUOTES_READ, "no:such", permissions::QUOTES_READ])
        .await
        .unwrap();
    let perms = db.permissions_for_user(user.id).await.unwrap();
    assert!(perms.include(permissions::QUOTES_READ));
    assert!(!perms.include(permissions::QUOTES_WRITE));
    assert_eq!(perms.codes().len(), 1);
}

#[tokio::test]
async fn test_register_user_grants_permissions() {
    let db = Database::open_in_memory().await.unwrap();
    let codes = [permissions::QUOTES_READ, permissions::QUOTES_WRITE];
    let user = db.register_user("Alice", "alice@example.com", "hash", &codes).await.unwrap();

    let perms = db.permissions_for_user(user.id).await.unwrap();
    assert!(perms.include(permissions::QUOTES_READ));
    assert!(perms.include(permissions::QUOTES_WRITE));

    assert!(matches!(
        db.register_user("Again", "alice@example.com", "hash", &codes).await,
        Err(StoreError::Duplicate("email"))
    ));
}

#[tokio::test]
async fn test_register_user_rolls_back_on_failed_grant() {
    let db = Database::open_in_memory().await.unwrap();
    sqlx::query("DROP TABLE users_permissions").execute(db.pool()).await.unwrap();

    let codes = [permissions::QUOTES_READ, permissions::QUOTES_WRITE];
    assert!(db.register_user("Alice", "alice@example.com", "hash", &codes).await.is_err());
    assert!(matches!(
        db.get_user_by_email("alice@example.com").await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test]
async fn test_insert_and_get_quote() {
    let (db, user) = db_with_user().await;
    let mut new = new_quote(user.id, "Stay hungry", &["life"]);
    new.source = Source {
        title: "Commencement".into(),
        kind: "speech".into(),
    };
    let quote = db.insert_quote(&new).await.unwrap();

    assert_eq!(quote.version, 1);
    assert_eq!(quote.created_at, quote.modified_at);
    assert_eq!(db.get_quote(quote.id).await.unwrap(), quote);
    assert!(matches!(db.get_quote(quote.id + 1).await, Err(StoreError::NotFound)));
}

#[tokio::test]
async fn test_conditional_update() {
    let (db, user) = db_with_user().await;
    let mut quote = db.insert_quote(&new_quote(user.id, "v1", &["a"])).await.unwrap();

    quote.content = "v2".into();
    let now = unix_timestamp();
    assert_eq!(db.update_quote_if_version(&quote, 1, now).await.unwrap(), Some(2));
    assert_eq!(db.update_quote_if_version(&quote, 1, now).await.unwrap(), None);
    assert_eq!(db.get_quote(quote.id).await.unwrap().content, "v2");
}

#[tokio::test]
async fn test_list_empty_table() {
    let (db, _) = db_with_user().await;
    let (quotes, meta) = db
        .list_quotes(&plan(&[("page", "1"), ("page_size", "20"), ("sort", "-created_at")]), None)
        .await
        .unwrap();
    assert!(quotes.is_empty());
    assert_eq!(meta, crate::query::Metadata::default());
}

#[tokio::test]
async fn test_list_filters_and_pages() {
    let (db, user) = db_with_user().await;
    let other = db.insert_user("Bob", "bob@example.com", "hash").await.unwrap();

    db.insert_quote(&new_quote(user.id, "The stars are far", &["space", "science"])).await.unwrap();
    db.insert_quote(&new_quote(user.id, "Look at the STARS", &["space"])).await.unwrap();
    db.insert_quote(&new_quote(other.id, "Cook the rice", &["food"])).await.unwrap();

    let (all, meta) = db.list_quotes(&plan(&[]), None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(meta.total_records, 3);
    assert_eq!(meta.total_pages, 1);

    let (found, _) = db.list_quotes(&plan(&[("content", "stars")]), None).await.unwrap();
    assert_eq!(found.len(), 2);

    let (found, _) = db
        .list_quotes(&plan(&[("tags", "space,science")]), None)
        .await
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].content, "The stars are far");

    let (found, _) = db.list_quotes(&plan(&[("tags", "nothing")]), None).await.unwrap();
    assert!(found.is_empty());

    let (mine, _) = db.list_quotes(&plan(&[]), Some(other.id)).await.unwrap();
    assert_eq!(mine.len(), 1);

    let (page, meta) = db
        .list_quotes(&plan(&[("page", "2"), ("page_size", "2"), ("sort", "-id")]), None)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].content, "The stars are far");
    assert_eq!(meta.current_page, 2);
    assert_eq!(meta.total_pages, 2);
    assert_eq!(meta.total_records, 3);
}

#[tokio::test]
async fn test_reaction_toggle() {
    let (db, user) = db_with_user().await;
    let quote = db.insert_quote(&new_quote(user.id, "q", &["t"])).await.unwrap();

    assert_eq!(db.toggle_reaction(user.id, quote.id, Reaction::Like).await.unwrap(), Some(Reaction::Like));
    assert_eq!(db.reaction_counts(quote.id).await.unwrap(), ReactionCounts { likes: 1, dislikes: 0 });

    assert_eq!(
        db.toggle_reaction(user.id, quote.id, Reaction::Dislike).await.unwrap(),
        Some(Reaction::Dislike)
    );
    assert_eq!(db.reaction_counts(quote.id).await.unwrap(), ReactionCounts { likes: 0, dislikes: 1 });

    assert_eq!(db.toggle_reaction(user.id, quote.id, Reaction::Dislike).await.unwrap(), None);
    assert_eq!(db.reaction_counts(quote.id).await.unwrap(), ReactionCounts::default());
    assert_eq!(db.reaction_of(user.id, quote.id).await.unwrap(), None);

    assert!(matches!(
        db.toggle_reaction(user.id, quote.id + 1, Reaction::Like).await,
        Err(StoreError::NotFound)
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_toggles_on_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let config = DatabaseConfig {
        path: dir.path().join("quotable.db").display().to_string(),
        ..DatabaseConfig::default()
    };
    let db = Database::open(&config).await.unwrap();
    let user = db.insert_user("Alice", "alice@example.com", "hash").await.unwrap();
    let quote = db.insert_quote(&new_quote(user.id, "q", &["t"])).await.unwrap();
    let (user_id, quote_id) = (user.id, quote.id);

    for _ in 0..20 {
        let mut writers = tokio::task::JoinSet::new();
        for _ in 0..4 {
            let db = db.clone();
            writers.spawn(async move { db.toggle_reaction(user_id, quote_id, Reaction::Like).await });
        }
        while let Some(result) = writers.join_next().await {
            result.unwrap().unwrap();
        }
        // four toggles of the same reaction cancel out
        assert_eq!(db.reaction_of(user_id, quote_id).await.unwrap(), None);
    }
    db.close().await;
}
