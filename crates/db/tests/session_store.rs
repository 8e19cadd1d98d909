//! Integration tests for the PostgreSQL store.
//!
//! These need a live database (`DATABASE_URL`) and are ignored by default:
//! `cargo test -p playground-db -- --ignored`.

use assert_matches::assert_matches;
use playground_core::pagination::PageRequest;
use playground_core::session::{MessageDraft, MessageRole, SessionDraft, SessionFields, SessionPatch};
use playground_db::models::session::{OwnedSessionFilter, PublicSessionFilter};
use playground_db::models::user::{CreateUser, UpdateProfile, User};
use playground_db::{PgStore, SessionStore, Store, StoreError, UserStore};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_user(store: &PgStore, email: &str) -> User {
    store
        .create_user(&CreateUser {
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            name: "Tester".to_string(),
        })
        .await
        .expect("user creation should succeed")
}

fn draft(name: &str, tags: &[&str], is_public: bool) -> SessionDraft {
    SessionDraft::from_fields(SessionFields {
        name: Some(name.to_string()),
        description: Some(format!("{name} description")),
        tags: Some(tags.iter().map(|t| t.to_string()).collect()),
        is_public: Some(is_public),
        ..Default::default()
    })
    .expect("draft should be valid")
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_email_is_conflict(pool: PgPool) {
    let store = PgStore::new(pool);
    new_user(&store, "dup@example.com").await;

    let err = store
        .create_user(&CreateUser {
            email: "dup@example.com".into(),
            password_hash: "x".into(),
            name: "Other".into(),
        })
        .await
        .unwrap_err();
    assert_matches!(err, StoreError::Conflict(_));
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_profile_update_keeps_unsupplied_fields(pool: PgPool) {
    let store = PgStore::new(pool);
    let user = new_user(&store, "p@example.com").await;

    let updated = store
        .update_profile(
            user.id,
            &UpdateProfile {
                name: None,
                avatar: Some("https://cdn.example.com/a.png".into()),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.name, "Tester");
    assert_eq!(updated.avatar.as_deref(), Some("https://cdn.example.com/a.png"));

    store.record_login(user.id).await.unwrap();
    let reloaded = store.find_user_by_id(user.id).await.unwrap().unwrap();
    assert!(reloaded.last_login_at.is_some());
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_session_lifecycle(pool: PgPool) {
    let store = PgStore::new(pool);
    let owner = new_user(&store, "owner@example.com").await;
    let other = new_user(&store, "other@example.com").await;

    let created = store
        .insert_session(owner.id, &draft("Button", &["ui"], false))
        .await
        .unwrap();
    assert!(created.messages.is_empty());
    assert_eq!(created.language.as_str(), "tsx");

    assert!(store
        .find_owned_session(created.id, other.id)
        .await
        .unwrap()
        .is_none());

    let patched = store
        .update_owned_session(
            created.id,
            owner.id,
            &SessionPatch {
                code: Some("export const B = () => null;".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(patched.name, "Button");
    assert_eq!(patched.code, "export const B = () => null;");
    assert!(patched.last_modified >= created.last_modified);

    let user_msg = MessageDraft::new(Some("user"), Some("make it blue")).unwrap();
    let reply = MessageDraft::new(Some("assistant"), Some("done")).unwrap();
    store.append_message(created.id, owner.id, user_msg).await.unwrap();
    let with_chat = store
        .append_message(created.id, owner.id, reply)
        .await
        .unwrap()
        .unwrap();
    let roles: Vec<_> = with_chat.messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![MessageRole::User, MessageRole::Assistant]);

    assert!(!store.delete_owned_session(created.id, other.id).await.unwrap());
    assert!(store.delete_owned_session(created.id, owner.id).await.unwrap());
    assert!(store.find_session(created.id).await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_appends_are_not_lost(pool: PgPool) {
    let store = PgStore::new(pool);
    let owner = new_user(&store, "busy@example.com").await;
    let created = store
        .insert_session(owner.id, &draft("Busy", &[], false))
        .await
        .unwrap();

    let (session_id, owner_id) = (created.id, owner.id);
    let mut handles = Vec::new();
    for i in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let message = MessageDraft::new(Some("user"), Some(&format!("m{i}"))).unwrap();
            store
                .append_message(session_id, owner_id, message)
                .await
                .unwrap()
                .is_some()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap());
    }

    let stored = store.find_session(created.id).await.unwrap().unwrap();
    let mut contents: Vec<_> = stored.messages.iter().map(|m| m.content.clone()).collect();
    contents.sort();
    contents.dedup();
    assert_eq!(contents.len(), 20);
    assert_eq!(stored.messages.len(), 20);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_owned_listing_search_and_pagination(pool: PgPool) {
    let store = PgStore::new(pool);
    let owner = new_user(&store, "lister@example.com").await;

    for i in 0..12 {
        store
            .insert_session(owner.id, &draft(&format!("Card {i}"), &["react"], false))
            .await
            .unwrap();
    }
    store
        .insert_session(owner.id, &draft("Navbar", &["layout"], false))
        .await
        .unwrap();

    let page = store
        .list_owned_sessions(
            owner.id,
            &OwnedSessionFilter {
                search: Some("REACT".into()),
            },
            PageRequest::new(Some(2), Some(5)).unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(page.total_count, 12);
    assert_eq!(page.items.len(), 5);

    let literal = store
        .list_owned_sessions(
            owner.id,
            &OwnedSessionFilter {
                search: Some("%".into()),
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(literal.total_count, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
#[ignore = "requires DATABASE_URL"]
async fn test_public_listing(pool: PgPool) {
    let store = PgStore::new(pool);
    let owner = new_user(&store, "pub@example.com").await;

    store
        .insert_session(owner.id, &draft("Hidden", &["react"], false))
        .await
        .unwrap();
    store
        .insert_session(owner.id, &draft("Older", &["vue"], true))
        .await
        .unwrap();
    store
        .insert_session(owner.id, &draft("Newer", &["react", "ui"], true))
        .await
        .unwrap();

    let all = store
        .list_public_sessions(&PublicSessionFilter::default(), PageRequest::default())
        .await
        .unwrap();
    let names: Vec<_> = all.items.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["Newer", "Older"]);
    assert_eq!(all.items[0].owner.name, "Tester");

    let tagged = store
        .list_public_sessions(
            &PublicSessionFilter {
                search: None,
                tags: vec!["ui".into()],
            },
            PageRequest::default(),
        )
        .await
        .unwrap();
    assert_eq!(tagged.total_count, 1);
    assert_eq!(tagged.items[0].name, "Newer");

    assert!(store.health_check().await);
}
