//! LibSQL storage backend implementation
//!
//! Persists accounts, feedback and sentiment results in an embedded libSQL
//! (SQLite dialect) database. Timestamps are stored as RFC 3339 UTC text with
//! millisecond precision, so lexical order matches chronological order and
//! `date(created_at)` yields the calendar day.

use crate::error::{InsightError, Result};
use crate::storage::StorageBackend;
use crate::types::{
    Category, CategoryCount, DailyCount, Feedback, FeedbackAnalytics, FeedbackQuery,
    FeedbackScope, NewFeedback, NewUser, Page, Pagination, Role, Sentiment, SentimentCount,
    SentimentStats, TrendPoint, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveTime, SecondsFormat, Utc};
use libsql::params::Params;
use libsql::{params, Builder, Connection, Database, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Schema migrations, applied in order and recorded in `_migrations_applied`
const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_initial_schema.sql",
        include_str!("../../migrations/libsql/001_initial_schema.sql"),
    ),
    (
        "002_add_indexes.sql",
        include_str!("../../migrations/libsql/002_add_indexes.sql"),
    ),
    (
        "003_add_search_columns.sql",
        include_str!("../../migrations/libsql/003_add_search_columns.sql"),
    ),
];

/// Migration that introduces the lowercased search columns
const SEARCH_COLUMNS_MIGRATION: &str = "003_add_search_columns.sql";

const FEEDBACK_COLUMNS: &str =
    "id, name, email, message, category, sentiment, confidence_score, created_at";

const USER_COLUMNS: &str = "id, name, email, password_hash, role, created_at";

/// Days covered by the dashboard's recent trend
const RECENT_TREND_DAYS: i64 = 7;

/// LibSQL storage backend
pub struct LibsqlStorage {
    db: Database,
    path: PathBuf,
}

impl LibsqlStorage {
    /// Open (creating if needed) a local database file and run migrations
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        info!("Opening LibSQL database: {}", path.display());

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                InsightError::Database(format!(
                    "Failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let db = Builder::new_local(&path)
            .build()
            .await
            .map_err(|e| InsightError::Database(format!("Failed to open local database: {}", e)))?;

        let storage = Self { db, path };

        let conn = storage.connect().await?;
        // journal_mode answers with a row, so it has to go through query()
        conn.query("PRAGMA journal_mode=WAL", ()).await?;

        storage.health_check().await?;
        storage.run_migrations().await?;

        info!("LibSQL database ready");
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run database migrations
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");
        let conn = self.connect().await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations_applied (
                migration_name TEXT PRIMARY KEY,
                applied_at INTEGER NOT NULL
            )",
            (),
        )
        .await
        .map_err(|e| InsightError::Migration(format!("Failed to create migrations table: {}", e)))?;

        for (name, sql) in MIGRATIONS {
            let mut rows = conn
                .query(
                    "SELECT COUNT(*) FROM _migrations_applied WHERE migration_name = ?",
                    params![*name],
                )
                .await?;
            let applied = match rows.next().await? {
                Some(row) => row.get::<i64>(0)?,
                None => 0,
            };

            if applied > 0 {
                debug!("Skipping already applied migration: {}", name);
                continue;
            }

            conn.execute_batch(sql)
                .await
                .map_err(|e| InsightError::Migration(format!("Failed to apply {}: {}", name, e)))?;

            if *name == SEARCH_COLUMNS_MIGRATION {
                backfill_search_columns(&conn).await.map_err(|e| {
                    InsightError::Migration(format!("Failed to backfill {}: {}", name, e))
                })?;
            }

            conn.execute(
                "INSERT INTO _migrations_applied (migration_name, applied_at) VALUES (?, ?)",
                params![*name, Utc::now().timestamp()],
            )
            .await
            .map_err(|e| InsightError::Migration(format!("Failed to record {}: {}", name, e)))?;

            info!("Executed migration: {}", name);
        }

        info!("Database migrations completed");
        Ok(())
    }

    /// Get a connection with the per-connection pragmas applied
    async fn connect(&self) -> Result<Connection> {
        let conn = self
            .db
            .connect()
            .map_err(|e| InsightError::Database(format!("Failed to get connection: {}", e)))?;

        conn.execute("PRAGMA foreign_keys = ON", ()).await?;
        conn.query("PRAGMA busy_timeout = 5000", ()).await?;

        Ok(conn)
    }

    async fn find_user_where(&self, column: &str, value: Value) -> Result<Option<User>> {
        let conn = self.connect().await?;
        let sql = format!("SELECT {} FROM users WHERE {} = ?", USER_COLUMNS, column);

        let mut rows = conn.query(&sql, Params::Positional(vec![value])).await?;
        match rows.next().await? {
            Some(row) => Ok(Some(row_to_user(&row)?)),
            None => Ok(None),
        }
    }

    async fn count(&self, conn: &Connection, sql: &str, params: Vec<Value>) -> Result<u64> {
        let mut rows = conn.query(sql, Params::Positional(params)).await?;
        match rows.next().await? {
            Some(row) => to_count(row.get::<i64>(0)?),
            None => Ok(0),
        }
    }
}

#[async_trait]
impl StorageBackend for LibsqlStorage {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        debug!("Creating user: {}", user.email);
        let conn = self.connect().await?;

        let sql = format!(
            "INSERT INTO users (name, email, password_hash, role, created_at)
             VALUES (?, ?, ?, ?, ?)
             RETURNING {}",
            USER_COLUMNS
        );

        let result = conn
            .query(
                &sql,
                params![
                    user.name.clone(),
                    user.email.clone(),
                    user.password_hash.clone(),
                    user.role.as_str(),
                    format_timestamp(Utc::now())
                ],
            )
            .await;

        let mut rows = match result {
            Ok(rows) => rows,
            Err(e) if is_unique_violation(&e) => {
                return Err(InsightError::AlreadyExists(user.email.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let row = match rows.next().await {
            Ok(Some(row)) => row,
            Ok(None) => {
                return Err(InsightError::Database(
                    "Insert into users returned no row".to_string(),
                ))
            }
            Err(e) if is_unique_violation(&e) => {
                return Err(InsightError::AlreadyExists(user.email.clone()))
            }
            Err(e) => return Err(e.into()),
        };

        let created = row_to_user(&row)?;
        info!("Created {} account {}", created.role, created.id);
        Ok(created)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.find_user_where("email", Value::Text(email.to_string()))
            .await
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.find_user_where("id", Value::Integer(id)).await
    }

    async fn create_feedback(&self, feedback: &NewFeedback) -> Result<Feedback> {
        let conn = self.connect().await?;
        let tx = conn.transaction().await?;

        let sql = format!(
            "INSERT INTO feedback (name, email, message, category, sentiment, confidence_score, created_at,
                                   message_search, name_search, email_search)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING {}",
            FEEDBACK_COLUMNS
        );

        let stored = {
            let mut rows = tx
                .query(
                    &sql,
                    Params::Positional(vec![
                        text_or_null(&feedback.name),
                        text_or_null(&feedback.email),
                        Value::Text(feedback.message.clone()),
                        Value::Text(feedback.category.as_str().to_string()),
                        Value::Text(feedback.sentiment.as_str().to_string()),
                        Value::Real(feedback.confidence_score),
                        Value::Text(format_timestamp(feedback.created_at)),
                        Value::Text(search_text(&feedback.message)),
                        text_or_null(&feedback.name.as_deref().map(search_text)),
                        text_or_null(&feedback.email.as_deref().map(search_text)),
                    ]),
                )
                .await?;

            let row = rows.next().await?.ok_or_else(|| {
                InsightError::Database("Insert into feedback returned no row".to_string())
            })?;
            row_to_feedback(&row)?
        };

        tx.execute(
            "INSERT INTO sentiment_results (feedback_id, sentiment, confidence_score, created_at)
             VALUES (?, ?, ?, ?)",
            params![
                stored.id,
                stored.sentiment.as_str(),
                stored.confidence_score,
                format_timestamp(stored.created_at)
            ],
        )
        .await?;

        tx.commit().await?;

        debug!(
            "Stored feedback {} ({}, {})",
            stored.id, stored.category, stored.sentiment
        );
        Ok(stored)
    }

    async fn list_feedback(
        &self,
        scope: &FeedbackScope,
        query: &FeedbackQuery,
    ) -> Result<Page<Feedback>> {
        let conn = self.connect().await?;
        let (clause, mut values) = feedback_filter(scope, query);

        let total = self
            .count(
                &conn,
                &format!("SELECT COUNT(*) FROM feedback WHERE {}", clause),
                values.clone(),
            )
            .await?;

        let sql = format!(
            "SELECT {} FROM feedback WHERE {} ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
            FEEDBACK_COLUMNS, clause
        );
        values.push(Value::Integer(i64::from(query.limit)));
        values.push(Value::Integer(
            i64::try_from(query.offset()).unwrap_or(i64::MAX),
        ));

        let mut rows = conn.query(&sql, Params::Positional(values)).await?;
        let mut data = Vec::new();
        while let Some(row) = rows.next().await? {
            data.push(row_to_feedback(&row)?);
        }

        debug!(
            "Listed {} of {} feedback records (page {})",
            data.len(),
            total,
            query.page
        );

        Ok(Page {
            data,
            pagination: Pagination::new(query, total),
        })
    }

    async fn feedback_analytics(&self, now: DateTime<Utc>) -> Result<FeedbackAnalytics> {
        let conn = self.connect().await?;

        let mut sentiment_distribution = Vec::new();
        let mut rows = conn
            .query(
                "SELECT sentiment, COUNT(*) FROM feedback GROUP BY sentiment ORDER BY sentiment",
                (),
            )
            .await?;
        while let Some(row) = rows.next().await? {
            sentiment_distribution.push(SentimentCount {
                sentiment: row.get::<String>(0)?.parse::<Sentiment>()?,
                count: to_count(row.get::<i64>(1)?)?,
            });
        }

        let mut category_distribution = Vec::new();
        let mut rows = conn
            .query(
                "SELECT category, COUNT(*) FROM feedback GROUP BY category ORDER BY category",
                (),
            )
            .await?;
        while let Some(row) = rows.next().await? {
            category_distribution.push(CategoryCount {
                category: row.get::<String>(0)?.parse::<Category>()?,
                count: to_count(row.get::<i64>(1)?)?,
            });
        }

        let total_feedback = self
            .count(&conn, "SELECT COUNT(*) FROM feedback", Vec::new())
            .await?;

        let trend_start = (now - Duration::days(RECENT_TREND_DAYS))
            .date_naive()
            .and_time(NaiveTime::MIN)
            .and_utc();

        let mut recent_trend = Vec::new();
        let mut rows = conn
            .query(
                "SELECT date(created_at) AS day, COUNT(*) FROM feedback
                 WHERE created_at >= ?
                 GROUP BY day
                 ORDER BY day",
                params![format_timestamp(trend_start)],
            )
            .await?;
        while let Some(row) = rows.next().await? {
            recent_trend.push(DailyCount {
                date: row.get::<String>(0)?,
                count: to_count(row.get::<i64>(1)?)?,
            });
        }

        Ok(FeedbackAnalytics {
            sentiment_distribution,
            category_distribution,
            total_feedback,
            recent_trend,
        })
    }

    async fn sentiment_stats(&self, since: Option<DateTime<Utc>>) -> Result<SentimentStats> {
        let conn = self.connect().await?;

        let mut sql = String::from(
            "SELECT s.sentiment, COUNT(*) FROM sentiment_results s
             JOIN feedback f ON s.feedback_id = f.id",
        );
        let mut values = Vec::new();
        if let Some(since) = since {
            sql.push_str(" WHERE f.created_at >= ?");
            values.push(Value::Text(format_timestamp(since)));
        }
        sql.push_str(" GROUP BY s.sentiment");

        let mut stats = SentimentStats::default();
        let mut rows = conn.query(&sql, Params::Positional(values)).await?;
        while let Some(row) = rows.next().await? {
            let sentiment = row.get::<String>(0)?.parse::<Sentiment>()?;
            stats.add(sentiment, to_count(row.get::<i64>(1)?)?);
        }

        Ok(stats)
    }

    async fn sentiment_trend(&self, since: DateTime<Utc>) -> Result<Vec<TrendPoint>> {
        let conn = self.connect().await?;

        let mut rows = conn
            .query(
                "SELECT
                    date(f.created_at) AS day,
                    COUNT(*),
                    SUM(CASE WHEN s.sentiment = 'positive' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN s.sentiment = 'negative' THEN 1 ELSE 0 END),
                    SUM(CASE WHEN s.sentiment = 'neutral' THEN 1 ELSE 0 END)
                 FROM feedback f
                 JOIN sentiment_results s ON f.id = s.feedback_id
                 WHERE f.created_at >= ?
                 GROUP BY day
                 ORDER BY day ASC",
                params![format_timestamp(since)],
            )
            .await?;

        let mut points = Vec::new();
        while let Some(row) = rows.next().await? {
            points.push(TrendPoint {
                date: row.get::<String>(0)?,
                total: to_count(row.get::<i64>(1)?)?,
                positive: to_count(row.get::<i64>(2)?)?,
                negative: to_count(row.get::<i64>(3)?)?,
                neutral: to_count(row.get::<i64>(4)?)?,
            });
        }

        Ok(points)
    }

    async fn health_check(&self) -> Result<()> {
        let conn = self.connect().await?;
        conn.query("SELECT 1", ()).await.map_err(|e| {
            InsightError::Database(format!("Database health check failed: {}", e))
        })?;
        Ok(())
    }
}

/// WHERE clause and its positional values for a feedback listing
fn feedback_filter(scope: &FeedbackScope, query: &FeedbackQuery) -> (String, Vec<Value>) {
    let mut conditions = vec!["1=1".to_string()];
    let mut values = Vec::new();

    if let FeedbackScope::Email(email) = scope {
        conditions.push("email = ?".to_string());
        values.push(Value::Text(email.clone()));
    }

    if let Some(category) = query.category {
        conditions.push("category = ?".to_string());
        values.push(Value::Text(category.as_str().to_string()));
    }

    if let Some(sentiment) = query.sentiment {
        conditions.push("sentiment = ?".to_string());
        values.push(Value::Text(sentiment.as_str().to_string()));
    }

    if let Some(search) = &query.search {
        let pattern = format!("%{}%", escape_like(&search_text(search)));
        let columns: &[&str] = match scope {
            FeedbackScope::All => &["message_search", "name_search", "email_search"],
            FeedbackScope::Email(_) => &["message_search", "name_search"],
        };

        let matches: Vec<String> = columns
            .iter()
            .map(|column| format!("{} LIKE ? ESCAPE '\\'", column))
            .collect();
        conditions.push(format!("({})", matches.join(" OR ")));
        values.extend(columns.iter().map(|_| Value::Text(pattern.clone())));
    }

    (conditions.join(" AND "), values)
}

/// Case-folded form stored in the `*_search` columns
///
/// SQLite's LIKE only folds ASCII, so both the stored text and the search
/// term are lowercased here with full Unicode rules.
fn search_text(text: &str) -> String {
    text.to_lowercase()
}

/// Fill the search columns for rows written before they existed
async fn backfill_search_columns(conn: &Connection) -> Result<()> {
    let mut rows = conn
        .query("SELECT id, name, email, message FROM feedback", ())
        .await?;

    let mut updates = Vec::new();
    while let Some(row) = rows.next().await? {
        updates.push((
            row.get::<i64>(0)?,
            row.get::<Option<String>>(1)?,
            row.get::<Option<String>>(2)?,
            row.get::<String>(3)?,
        ));
    }
    drop(rows);

    for (id, name, email, message) in &updates {
        conn.execute(
            "UPDATE feedback SET message_search = ?, name_search = ?, email_search = ? WHERE id = ?",
            Params::Positional(vec![
                Value::Text(search_text(message)),
                text_or_null(&name.as_deref().map(search_text)),
                text_or_null(&email.as_deref().map(search_text)),
                Value::Integer(*id),
            ]),
        )
        .await?;
    }

    if !updates.is_empty() {
        info!("Backfilled search columns for {} feedback rows", updates.len());
    }
    Ok(())
}

/// Make `%`, `_` and the escape character match literally
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn is_unique_violation(err: &libsql::Error) -> bool {
    err.to_string().contains("UNIQUE constraint failed")
}

fn text_or_null(value: &Option<String>) -> Value {
    match value {
        Some(text) => Value::Text(text.clone()),
        None => Value::Null,
    }
}

fn to_count(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| InsightError::Database(format!("Negative count: {}", value)))
}

pub(crate) fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| InsightError::Database(format!("Invalid timestamp '{}': {}", raw, e)))
}

fn row_to_feedback(row: &libsql::Row) -> Result<Feedback> {
    Ok(Feedback {
        id: row.get::<i64>(0)?,
        name: row.get::<Option<String>>(1)?,
        email: row.get::<Option<String>>(2)?,
        message: row.get::<String>(3)?,
        category: row.get::<String>(4)?.parse::<Category>()?,
        sentiment: row.get::<String>(5)?.parse::<Sentiment>()?,
        confidence_score: row.get::<f64>(6)?,
        created_at: parse_timestamp(&row.get::<String>(7)?)?,
    })
}

fn row_to_user(row: &libsql::Row) -> Result<User> {
    Ok(User {
        id: row.get::<i64>(0)?,
        name: row.get::<String>(1)?,
        email: row.get::<String>(2)?,
        password_hash: row.get::<String>(3)?,
        role: row.get::<String>(4)?.parse::<Role>()?,
        created_at: parse_timestamp(&row.get::<String>(5)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_timestamps_sort_lexically() {
        let earlier = Utc.with_ymd_and_hms(2026, 1, 9, 23, 59, 59).unwrap();
        let later = Utc.with_ymd_and_hms(2026, 1, 10, 0, 0, 0).unwrap();

        let (a, b) = (format_timestamp(earlier), format_timestamp(later));
        assert_eq!(a, "2026-01-09T23:59:59.000Z");
        assert!(a < b);
        assert_eq!(parse_timestamp(&b).unwrap(), later);
    }

    #[test]
    fn test_filter_for_user_scope() {
        let query = FeedbackQuery {
            sentiment: Some(Sentiment::Negative),
            search: Some("late".to_string()),
            ..Default::default()
        };
        let (clause, values) =
            feedback_filter(&FeedbackScope::Email("a@b.co".to_string()), &query);

        assert!(clause.contains("email = ?"));
        assert!(clause.contains("sentiment = ?"));
        assert!(clause.contains("message_search LIKE ?"));
        assert!(!clause.contains("email_search LIKE ?"));
        // email, sentiment, two search columns
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn test_filter_for_admin_scope_searches_email() {
        let query = FeedbackQuery {
            search: Some("acme".to_string()),
            ..Default::default()
        };
        let (clause, values) = feedback_filter(&FeedbackScope::All, &query);

        assert!(clause.contains("email_search LIKE ?"));
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_search_term_is_case_folded() {
        let query = FeedbackQuery {
            search: Some("CAFÉ_50%".to_string()),
            ..Default::default()
        };
        let (_, values) = feedback_filter(&FeedbackScope::All, &query);

        assert!(matches!(&values[0], Value::Text(p) if p == "%café\\_50\\%%"));
        assert_eq!(search_text("ZOË"), "zoë");
    }
}
