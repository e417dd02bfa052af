use uuid::Uuid;

use super::DBClient;
use crate::models::ContentCompletion;

pub trait ProgressExt {
    async fn get_completions(
        &self,
        user_id: Uuid,
        program_id: Uuid,
    ) -> Result<Vec<ContentCompletion>, sqlx::Error>;

    /// Append-only: repeated completions of the same content produce
    /// additional rows rather than an upsert.
    async fn mark_complete(
        &self,
        user_id: Uuid,
        content_id: Uuid,
        topic_id: Uuid,
        unit_id: Uuid,
        program_id: Uuid,
    ) -> Result<ContentCompletion, sqlx::Error>;

    async fn has_completed(&self, user_id: Uuid, content_id: Uuid) -> Result<bool, sqlx::Error>;
}

impl ProgressExt for DBClient {
    async fn get_completions(
        &self,
        user_id: Uuid,
        program_id: Uuid,
    ) -> Result<Vec<ContentCompletion>, sqlx::Error> {
        let completions = sqlx::query_as::<_, ContentCompletion>(
            r#"
            SELECT * FROM content_completions
            WHERE user_id = $1 AND program_id = $2
            ORDER BY completed_at ASC
            "#,
        )
        .bind(user_id)
        .bind(program_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(completions)
    }

    async fn mark_complete(
        &self,
        user_id: Uuid,
        content_id: Uuid,
        topic_id: Uuid,
        unit_id: Uuid,
        program_id: Uuid,
    ) -> Result<ContentCompletion, sqlx::Error> {
        let completion = sqlx::query_as::<_, ContentCompletion>(
            r#"
            INSERT INTO content_completions
                (user_id, content_id, topic_id, unit_id, program_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(content_id)
        .bind(topic_id)
        .bind(unit_id)
        .bind(program_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(completion)
    }

    async fn has_completed(&self, user_id: Uuid, content_id: Uuid) -> Result<bool, sqlx::Error> {
        let exists = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM content_completions
                WHERE user_id = $1 AND content_id = $2
            )
            "#,
        )
        .bind(user_id)
        .bind(content_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }
}
