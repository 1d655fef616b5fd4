//! Profile persistence
//!
//! `ProfileStore` is the seam between the reconciler and the relational
//! datastore: select by subject, insert, single-statement update, and an
//! atomic read-modify-write of one row.

use async_trait::async_trait;
use sqlx::{sqlite::SqliteRow, Row, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::models::{ProfileRecord, QuestionnaireDocument};
use crate::{Error, Result};

/// Relational datastore holding one row per subject
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Select the row for `subject_id`, if any
    async fn fetch(&self, subject_id: &str) -> Result<Option<ProfileRecord>>;

    /// Insert a new row. Fails with [`Error::AlreadyExists`] if the subject
    /// already has one.
    async fn insert(&self, record: &ProfileRecord) -> Result<()>;

    /// Overwrite the existing row for `record.subject_id` in one statement.
    /// Fails with [`Error::NotFound`] if there is no such row.
    async fn update(&self, record: &ProfileRecord) -> Result<()>;

    /// Read the row for `subject_id`, apply `edit`, and write it back as one
    /// atomic unit. No other write to the row can land between the read and
    /// the write. An `Err` from `edit` leaves the row untouched and is
    /// returned as is. Fails with [`Error::NotFound`] if there is no row.
    async fn modify<'a>(&self, subject_id: &str, edit: RecordEdit<'a>) -> Result<ProfileRecord>;
}

/// In-place change applied by [`ProfileStore::modify`]
pub type RecordEdit<'a> = Box<dyn FnOnce(&mut ProfileRecord) -> Result<()> + Send + 'a>;

const SELECT_PROFILE: &str = r#"
    SELECT subject_id, role, talent_domain, display_name, bio, location,
           contact_email, phone, website, questionnaire_responses,
           created_at, updated_at
    FROM profiles
    WHERE subject_id = ?
"#;

/// SQLite-backed profile store
#[derive(Clone)]
pub struct SqliteProfileStore {
    pool: SqlitePool,
}

impl SqliteProfileStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn fetch(&self, subject_id: &str) -> Result<Option<ProfileRecord>> {
        let row = sqlx::query(SELECT_PROFILE)
            .bind(subject_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| record_from_row(&row)).transpose()
    }

    async fn insert(&self, record: &ProfileRecord) -> Result<()> {
        // Serialize before touching the database
        let responses = serde_json::to_string(&record.questionnaire_responses)?;

        let result = sqlx::query(
            r#"
            INSERT INTO profiles (
                subject_id, role, talent_domain, display_name, bio, location,
                contact_email, phone, website, questionnaire_responses,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.subject_id)
        .bind(&record.role)
        .bind(&record.talent_domain)
        .bind(&record.display_name)
        .bind(&record.bio)
        .bind(&record.location)
        .bind(&record.contact_email)
        .bind(&record.phone)
        .bind(&record.website)
        .bind(&responses)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(subject_id = %record.subject_id, "Inserted profile row");
                Ok(())
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(
                Error::AlreadyExists(format!("profile for subject {}", record.subject_id)),
            ),
            Err(e) => Err(Error::Database(e)),
        }
    }

    async fn update(&self, record: &ProfileRecord) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        write_row(&mut conn, record).await?;
        debug!(subject_id = %record.subject_id, "Updated profile row");
        Ok(())
    }

    async fn modify<'a>(&self, subject_id: &str, edit: RecordEdit<'a>) -> Result<ProfileRecord> {
        let mut tx = self.pool.begin().await?;

        // Write first: this takes the database write lock (waiting up to
        // busy_timeout) before the row is read. Dropping `tx` rolls back.
        let claimed = sqlx::query("UPDATE profiles SET updated_at = updated_at WHERE subject_id = ?")
            .bind(subject_id)
            .execute(&mut *tx)
            .await?;
        if claimed.rows_affected() == 0 {
            return Err(Error::NotFound(format!("profile for subject {}", subject_id)));
        }

        let row = sqlx::query(SELECT_PROFILE)
            .bind(subject_id)
            .fetch_one(&mut *tx)
            .await?;
        let mut record = record_from_row(&row)?;

        edit(&mut record)?;

        write_row(&mut tx, &record).await?;
        tx.commit().await?;

        debug!(subject_id, "Modified profile row");
        Ok(record)
    }
}

/// Overwrite every column of `record`'s row. Fails with [`Error::NotFound`]
/// if the row does not exist.
async fn write_row(conn: &mut SqliteConnection, record: &ProfileRecord) -> Result<()> {
    let responses = serde_json::to_string(&record.questionnaire_responses)?;

    let result = sqlx::query(
        r#"
        UPDATE profiles SET
            role = ?,
            talent_domain = ?,
            display_name = ?,
            bio = ?,
            location = ?,
            contact_email = ?,
            phone = ?,
            website = ?,
            questionnaire_responses = ?,
            updated_at = ?
        WHERE subject_id = ?
        "#,
    )
    .bind(&record.role)
    .bind(&record.talent_domain)
    .bind(&record.display_name)
    .bind(&record.bio)
    .bind(&record.location)
    .bind(&record.contact_email)
    .bind(&record.phone)
    .bind(&record.website)
    .bind(&responses)
    .bind(record.updated_at)
    .bind(&record.subject_id)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!(
            "profile for subject {}",
            record.subject_id
        )));
    }
    Ok(())
}

fn record_from_row(row: &SqliteRow) -> Result<ProfileRecord> {
    // Treat a blank or NULL document as "nothing recorded yet"
    let raw: Option<String> = row.try_get("questionnaire_responses")?;
    let questionnaire_responses = match raw.as_deref().map(str::trim) {
        None | Some("") => QuestionnaireDocument::new(),
        Some(json) => serde_json::from_str(json)?,
    };

    Ok(ProfileRecord {
        subject_id: row.try_get("subject_id")?,
        role: row.try_get("role")?,
        talent_domain: row.try_get("talent_domain")?,
        display_name: row.try_get("display_name")?,
        bio: row.try_get("bio")?,
        location: row.try_get("location")?,
        contact_email: row.try_get("contact_email")?,
        phone: row.try_get("phone")?,
        website: row.try_get("website")?,
        questionnaire_responses,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init::create_profiles_table;
    use crate::models::FieldValue;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn setup_test_store() -> SqliteProfileStore {
        // Single connection: every connection to sqlite::memory: is its own database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        create_profiles_table(&pool).await.unwrap();

        SqliteProfileStore::new(pool)
    }

    #[tokio::test]
    async fn test_fetch_missing_returns_none() {
        let store = setup_test_store().await;
        assert!(store.fetch("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_then_fetch() {
        let store = setup_test_store().await;

        let mut record = ProfileRecord::new("u1", "acting");
        record.display_name = "Ada".to_string();
        record
            .questionnaire_responses
            .set("acting", "roleTypes", FieldValue::List(vec!["lead".into()]));
        store.insert(&record).await.unwrap();

        let fetched = store.fetch("u1").await.unwrap().unwrap();
        assert_eq!(fetched.display_name, "Ada");
        assert_eq!(fetched.questionnaire_responses, record.questionnaire_responses);
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = setup_test_store().await;

        let record = ProfileRecord::new("u1", "acting");
        store.insert(&record).await.unwrap();

        let err = store.insert(&record).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyExists(_)), "got {:?}", err);
        assert!(err.is_persistence_failure());
    }

    #[tokio::test]
    async fn test_update_missing_is_not_found() {
        let store = setup_test_store().await;

        let record = ProfileRecord::new("ghost", "acting");
        let err = store.update(&record).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test]
    async fn test_update_overwrites_row() {
        let store = setup_test_store().await;

        let mut record = ProfileRecord::new("u1", "acting");
        store.insert(&record).await.unwrap();

        record.bio = "Stage and screen".to_string();
        record.questionnaire_responses.set("acting", "stageCombat", "yes".into());
        store.update(&record).await.unwrap();

        let fetched = store.fetch("u1").await.unwrap().unwrap();
        assert_eq!(fetched.bio, "Stage and screen");
        assert_eq!(
            fetched.questionnaire_responses.get("acting", "stageCombat"),
            Some(&FieldValue::from("yes"))
        );
    }

    #[tokio::test]
    async fn test_modify_applies_edit_and_returns_record() {
        let store = setup_test_store().await;
        store.insert(&ProfileRecord::new("u1", "acting")).await.unwrap();

        let modified = store
            .modify(
                "u1",
                Box::new(|record: &mut ProfileRecord| -> Result<()> {
                    record.location = "Leeds".to_string();
                    record
                        .questionnaire_responses
                        .set("acting", "accents", FieldValue::List(vec!["RP".into()]));
                    Ok(())
                }),
            )
            .await
            .unwrap();
        assert_eq!(modified.location, "Leeds");

        let fetched = store.fetch("u1").await.unwrap().unwrap();
        assert_eq!(fetched.location, "Leeds");
        assert_eq!(fetched.questionnaire_responses, modified.questionnaire_responses);
    }

    #[tokio::test]
    async fn test_modify_missing_is_not_found() {
        let store = setup_test_store().await;

        let err = store
            .modify("ghost", Box::new(|_: &mut ProfileRecord| -> Result<()> { Ok(()) }))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)), "got {:?}", err);
        assert!(store.fetch("ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_modify_edit_error_leaves_row_untouched() {
        let store = setup_test_store().await;
        let mut record = ProfileRecord::new("u1", "acting");
        record.bio = "original".to_string();
        store.insert(&record).await.unwrap();

        let err = store
            .modify(
                "u1",
                Box::new(|record: &mut ProfileRecord| -> Result<()> {
                    record.bio = "half-applied".to_string();
                    Err(Error::MalformedPayload("bad value".to_string()))
                }),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MalformedPayload(_)));

        let fetched = store.fetch("u1").await.unwrap().unwrap();
        assert_eq!(fetched.bio, "original");
    }

    #[tokio::test]
    async fn test_default_column_document_reads_as_empty() {
        let store = setup_test_store().await;

        sqlx::query(
            "INSERT INTO profiles (subject_id, created_at, updated_at) VALUES ('raw', '2025-01-01T00:00:00Z', '2025-01-01T00:00:00Z')",
        )
        .execute(store.pool())
        .await
        .unwrap();

        let fetched = store.fetch("raw").await.unwrap().unwrap();
        assert!(fetched.questionnaire_responses.is_empty());
        assert_eq!(fetched.role, "performer");
    }
}
