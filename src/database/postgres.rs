use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::manager::{DatabaseError, DatabaseManager};
use super::models::{Account, ChatRecord, ContactRequest, SourceContent, UserConfig, UserConfigPatch};
use super::store::{AccountStore, ChatStore};

const CHAT_COLUMNS: &str = "id, user_id, payload, is_newsletter, cadence";
const ACCOUNT_COLUMNS: &str = "id, free_searches_remaining, subscription_status";

/// `ChatStore` and `AccountStore` over the hosted Postgres database
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(manager: &DatabaseManager) -> Self {
        Self { pool: manager.pool().clone() }
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn upsert_chat(&self, record: &ChatRecord) -> Result<(), DatabaseError> {
        let sql = format!(
            r#"
            INSERT INTO chats ({CHAT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                payload = EXCLUDED.payload,
                is_newsletter = EXCLUDED.is_newsletter,
                cadence = EXCLUDED.cadence
            WHERE chats.user_id = EXCLUDED.user_id
            "#
        );
        let result = sqlx::query(&sql)
        .bind(&record.id)
        .bind(record.user_id)
        .bind(&record.payload)
        .bind(record.is_newsletter)
        .bind(&record.cadence)
        .execute(&self.pool)
        .await?;

        // The conflict guard skips the update when another user owns the id
        if result.rows_affected() == 0 {
            return Err(DatabaseError::ChatOwned(record.id.clone()));
        }

        tracing::debug!("Upserted chat {} for user {}", record.id, record.user_id);
        Ok(())
    }

    async fn get_chat(&self, user_id: Uuid, chat_id: &str) -> Result<Option<ChatRecord>, DatabaseError> {
        let sql = format!("SELECT {CHAT_COLUMNS} FROM chats WHERE id = $1 AND user_id = $2");
        let record = sqlx::query_as::<_, ChatRecord>(&sql)
        .bind(chat_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(record)
    }

    async fn list_chats(&self, user_id: Uuid) -> Result<Vec<ChatRecord>, DatabaseError> {
        let sql = format!(
            r#"
            SELECT {CHAT_COLUMNS}
            FROM chats
            WHERE user_id = $1 AND is_newsletter = false
            ORDER BY payload->>'createdAt' DESC
            "#
        );
        let records = sqlx::query_as::<_, ChatRecord>(&sql)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(records)
    }

    async fn delete_chat(&self, user_id: Uuid, chat_id: &str) -> Result<bool, DatabaseError> {
        let result = sqlx::query("DELETE FROM chats WHERE id = $1 AND user_id = $2")
            .bind(chat_id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn clear_chats(&self, user_id: Uuid) -> Result<u64, DatabaseError> {
        let result = sqlx::query("DELETE FROM chats WHERE user_id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn get_account(&self, user_id: Uuid) -> Result<Option<Account>, DatabaseError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM users WHERE id = $1");
        let account = sqlx::query_as::<_, Account>(&sql)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(account)
    }

    async fn consume_free_search(&self, user_id: Uuid) -> Result<Option<i32>, DatabaseError> {
        // Single statement so concurrent searches cannot both read the same count
        let remaining: Option<(i32,)> = sqlx::query_as(
            r#"
            UPDATE users
            SET free_searches_remaining = GREATEST(COALESCE(free_searches_remaining, 0) - 1, 0)
            WHERE id = $1
            RETURNING free_searches_remaining
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(remaining.map(|(n,)| n))
    }

    async fn get_user_config(&self, user_id: Uuid) -> Result<Option<UserConfig>, DatabaseError> {
        let config = sqlx::query_as::<_, UserConfig>(
            r#"
            SELECT user_id, job_title, industry, report_config, chart_config, favorite_theme
            FROM user_config
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(config)
    }

    async fn upsert_user_config(&self, user_id: Uuid, patch: UserConfigPatch) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            INSERT INTO user_config (user_id, job_title, industry, report_config, chart_config, favorite_theme)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id) DO UPDATE SET
                job_title = COALESCE(EXCLUDED.job_title, user_config.job_title),
                industry = COALESCE(EXCLUDED.industry, user_config.industry),
                report_config = COALESCE(EXCLUDED.report_config, user_config.report_config),
                chart_config = COALESCE(EXCLUDED.chart_config, user_config.chart_config),
                favorite_theme = COALESCE(EXCLUDED.favorite_theme, user_config.favorite_theme)
            "#,
        )
        .bind(user_id)
        .bind(patch.job_title)
        .bind(patch.industry)
        .bind(patch.report_config)
        .bind(patch.chart_config)
        .bind(patch.favorite_theme)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn insert_source_contents(
        &self,
        user_id: Uuid,
        chat_id: &str,
        sources: Vec<SourceContent>,
    ) -> Result<u64, DatabaseError> {
        if sources.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        let mut inserted = 0;
        for source in sources {
            let result = sqlx::query(
                r#"
                INSERT INTO web_source_content_raw (added_by, source_url, content, content_hash, chat_id)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(user_id)
            .bind(&source.source_url)
            .bind(&source.content)
            .bind(&source.content_hash)
            .bind(chat_id)
            .execute(&mut *tx)
            .await?;
            inserted += result.rows_affected();
        }
        tx.commit().await?;

        Ok(inserted)
    }

    async fn insert_contact(&self, contact: ContactRequest) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO enterprise_contact_and_waitlist (name, email, company, user_id) VALUES ($1, $2, $3, $4)",
        )
        .bind(contact.name)
        .bind(contact.email)
        .bind(contact.company)
        .bind(contact.user_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
