//! LibSQL storage backend against a real database file

mod common;

use chrono::{Duration, TimeZone, Utc};
use common::create_test_storage;
use insightflow_core::{
    Category, FeedbackQuery, FeedbackScope, InsightError, LibsqlStorage, NewFeedback, NewUser,
    Role, Sentiment, StorageBackend,
};

fn feedback(message: &str, email: Option<&str>, sentiment: Sentiment) -> NewFeedback {
    NewFeedback {
        name: Some("Tester".to_string()),
        email: email.map(str::to_string),
        message: message.to_string(),
        category: Category::General,
        sentiment,
        confidence_score: 0.85,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_user_round_trip() {
    let (storage, _dir) = create_test_storage().await;

    let user = storage
        .create_user(&NewUser {
            name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            role: Role::Admin,
        })
        .await
        .unwrap();
    assert!(user.id > 0);
    assert_eq!(user.role, Role::Admin);

    let by_email = storage
        .find_user_by_email("ada@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_email.id, user.id);
    assert_eq!(by_email.password_hash, "$2b$04$hash");

    let by_id = storage.find_user_by_id(user.id).await.unwrap().unwrap();
    assert_eq!(by_id.email, "ada@example.com");

    assert!(storage.find_user_by_id(9_999).await.unwrap().is_none());
    assert!(storage
        .find_user_by_email("nobody@example.com")
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_duplicate_email_is_already_exists() {
    let (storage, _dir) = create_test_storage().await;
    let new_user = NewUser {
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        password_hash: "hash".to_string(),
        role: Role::User,
    };

    storage.create_user(&new_user).await.unwrap();
    let err = storage.create_user(&new_user).await.unwrap_err();
    assert!(matches!(err, InsightError::AlreadyExists(_)), "{:?}", err);
}

#[tokio::test]
async fn test_feedback_writes_sentiment_result() {
    let (storage, _dir) = create_test_storage().await;

    let stored = storage
        .create_feedback(&feedback("great stuff", Some("a@b.co"), Sentiment::Positive))
        .await
        .unwrap();
    assert!(stored.id > 0);
    assert_eq!(stored.sentiment, Sentiment::Positive);
    assert_eq!(stored.email.as_deref(), Some("a@b.co"));

    let stats = storage.sentiment_stats(None).await.unwrap();
    assert_eq!(stats.positive, 1);
    assert_eq!(stats.total(), 1);
}

#[tokio::test]
async fn test_list_scopes_and_order() {
    let (storage, _dir) = create_test_storage().await;
    let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

    for (i, email) in ["a@b.co", "a@b.co", "c@d.co"].into_iter().enumerate() {
        let mut item = feedback(&format!("note {}", i), Some(email), Sentiment::Neutral);
        item.created_at = base + Duration::minutes(i as i64);
        storage.create_feedback(&item).await.unwrap();
    }

    let page = storage
        .list_feedback(
            &FeedbackScope::Email("a@b.co".to_string()),
            &FeedbackQuery::default(),
        )
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 2);
    assert_eq!(page.data[0].message, "note 1");
    assert_eq!(page.data[1].message, "note 0");
    assert_eq!(page.data[0].created_at, base + Duration::minutes(1));

    let page = storage
        .list_feedback(&FeedbackScope::All, &FeedbackQuery::default())
        .await
        .unwrap();
    assert_eq!(page.pagination.total_items, 3);
    assert_eq!(page.pagination.total_pages, 1);
}

#[tokio::test]
async fn test_trend_and_stats_respect_window() {
    let (storage, _dir) = create_test_storage().await;
    let now = Utc::now();

    let mut old = feedback("bad, long ago", None, Sentiment::Negative);
    old.created_at = now - Duration::days(40);
    storage.create_feedback(&old).await.unwrap();

    let mut recent = feedback("good, yesterday", None, Sentiment::Positive);
    recent.created_at = now - Duration::days(1);
    storage.create_feedback(&recent).await.unwrap();

    storage
        .create_feedback(&feedback("good, today", None, Sentiment::Positive))
        .await
        .unwrap();

    let all = storage.sentiment_stats(None).await.unwrap();
    assert_eq!((all.positive, all.negative), (2, 1));

    let month = storage
        .sentiment_stats(Some(now - Duration::days(30)))
        .await
        .unwrap();
    assert_eq!((month.positive, month.negative), (2, 0));

    let trend = storage
        .sentiment_trend(now - Duration::days(7))
        .await
        .unwrap();
    assert_eq!(trend.len(), 2);
    assert!(trend[0].date < trend[1].date);
    assert!(trend.iter().all(|p| p.positive == 1 && p.total == 1));

    let analytics = storage.feedback_analytics(now).await.unwrap();
    assert_eq!(analytics.total_feedback, 3);
    assert_eq!(analytics.recent_trend.iter().map(|d| d.count).sum::<u64>(), 2);
}

#[tokio::test]
async fn test_reopen_keeps_data_and_skips_migrations() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("nested").join("reopen.db");

    {
        let storage = LibsqlStorage::open(&path).await.unwrap();
        storage
            .create_feedback(&feedback("persisted", None, Sentiment::Neutral))
            .await
            .unwrap();
    }

    let storage = LibsqlStorage::open(&path).await.unwrap();
    storage.run_migrations().await.unwrap();
    storage.health_check().await.unwrap();

    let page = storage
        .list_feedback(&FeedbackScope::All, &FeedbackQuery::default())
        .await
        .unwrap();
    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].message, "persisted");
}

#[tokio::test]
async fn test_search_ignores_case_beyond_ascii() {
    let (storage, _dir) = create_test_storage().await;

    let mut item = feedback("Le CAFÉ était froid", Some("zoe@example.com"), Sentiment::Neutral);
    item.name = Some("Zoë".to_string());
    storage.create_feedback(&item).await.unwrap();
    storage
        .create_feedback(&feedback("unrelated", None, Sentiment::Neutral))
        .await
        .unwrap();

    for term in ["café", "CAFÉ", "Café", "zoë", "ZOË"] {
        let query = FeedbackQuery {
            search: Some(term.to_string()),
            ..Default::default()
        };
        let page = storage
            .list_feedback(&FeedbackScope::All, &query)
            .await
            .unwrap();
        assert_eq!(page.pagination.total_items, 1, "search {:?}", term);
        assert_eq!(page.data[0].message, "Le CAFÉ était froid");
    }
}
