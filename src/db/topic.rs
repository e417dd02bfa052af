use uuid::Uuid;

use super::DBClient;
use crate::models::Topic;

pub trait TopicExt {
    async fn get_topics(&self, unit_id: Uuid) -> Result<Vec<Topic>, sqlx::Error>;

    async fn get_topic(&self, topic_id: Uuid) -> Result<Option<Topic>, sqlx::Error>;

    /// `program_id` is denormalized from the parent unit; the handler
    /// verifies it against the unit before calling.
    async fn save_topic(
        &self,
        unit_id: Uuid,
        program_id: Uuid,
        title: &str,
        slug: &str,
        description: &str,
        sort_order: i32,
    ) -> Result<Topic, sqlx::Error>;

    async fn update_topic(
        &self,
        topic_id: Uuid,
        title: Option<&str>,
        slug: Option<&str>,
        description: Option<&str>,
        sort_order: Option<i32>,
    ) -> Result<Topic, sqlx::Error>;

    /// Cascading delete of the topic and its contents in one
    /// transaction.
    async fn delete_topic(&self, topic_id: Uuid) -> Result<(), sqlx::Error>;
}

impl TopicExt for DBClient {
    async fn get_topics(&self, unit_id: Uuid) -> Result<Vec<Topic>, sqlx::Error> {
        let topics = sqlx::query_as::<_, Topic>(
            r#"
            SELECT * FROM topics
            WHERE unit_id = $1
            ORDER BY sort_order ASC, created_at ASC
            "#,
        )
        .bind(unit_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(topics)
    }

    async fn get_topic(&self, topic_id: Uuid) -> Result<Option<Topic>, sqlx::Error> {
        let topic = sqlx::query_as::<_, Topic>("SELECT * FROM topics WHERE id = $1")
            .bind(topic_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(topic)
    }

    async fn save_topic(
        &self,
        unit_id: Uuid,
        program_id: Uuid,
        title: &str,
        slug: &str,
        description: &str,
        sort_order: i32,
    ) -> Result<Topic, sqlx::Error> {
        let topic = sqlx::query_as::<_, Topic>(
            r#"
            INSERT INTO topics (unit_id, program_id, title, slug, description, sort_order)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(unit_id)
        .bind(program_id)
        .bind(title)
        .bind(slug)
        .bind(description)
        .bind(sort_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(topic)
    }

    async fn update_topic(
        &self,
        topic_id: Uuid,
        title: Option<&str>,
        slug: Option<&str>,
        description: Option<&str>,
        sort_order: Option<i32>,
    ) -> Result<Topic, sqlx::Error> {
        let topic = sqlx::query_as::<_, Topic>(
            r#"
            UPDATE topics
            SET title = COALESCE($1, title),
                slug = COALESCE($2, slug),
                description = COALESCE($3, description),
                sort_order = COALESCE($4, sort_order),
                updated_at = Now()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(slug)
        .bind(description)
        .bind(sort_order)
        .bind(topic_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(topic)
    }

    async fn delete_topic(&self, topic_id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM contents WHERE topic_id = $1")
            .bind(topic_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM topics WHERE id = $1")
            .bind(topic_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;

        Ok(())
    }
}
