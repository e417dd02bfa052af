use sqlx::types::Json;
use uuid::Uuid;

use super::DBClient;
use crate::models::{Content, ContentKind, ContentPayload, Question};

/// Flat row shape of the "contents" table. The polymorphic payload is
/// spread over nullable columns; conversion into the domain type picks
/// the ones selected by `kind` and ignores the rest, the same lenient
/// read the original document parser performed.
#[derive(Debug, sqlx::FromRow)]
pub struct ContentRow {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub unit_id: Uuid,
    pub program_id: Uuid,
    pub title: String,
    pub kind: ContentKind,
    pub sort_order: i32,
    pub body: Option<String>,
    pub video_url: Option<String>,
    pub pdf_url: Option<String>,
    pub questions: Option<Json<Vec<Question>>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl From<ContentRow> for Content {
    fn from(row: ContentRow) -> Self {
        let payload = match row.kind {
            ContentKind::Theory => ContentPayload::Theory {
                body: row.body.unwrap_or_default(),
            },
            ContentKind::Example => ContentPayload::Example {
                body: row.body.unwrap_or_default(),
            },
            ContentKind::Exercise => ContentPayload::Exercise {
                body: row.body.unwrap_or_default(),
            },
            ContentKind::Video => ContentPayload::Video {
                video_url: row.video_url,
            },
            ContentKind::Pdf => ContentPayload::Pdf {
                pdf_url: row.pdf_url,
            },
            ContentKind::Quiz => ContentPayload::Quiz {
                questions: row.questions.map(|json| json.0).unwrap_or_default(),
            },
        };

        Content {
            id: row.id,
            topic_id: row.topic_id,
            unit_id: row.unit_id,
            program_id: row.program_id,
            title: row.title,
            sort_order: row.sort_order,
            payload,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Spread a payload back over the nullable columns. Fields that do not
/// belong to the kind are written as NULL, keeping rows minimal.
fn payload_columns(
    payload: &ContentPayload,
) -> (
    Option<String>,
    Option<String>,
    Option<String>,
    Option<Json<Vec<Question>>>,
) {
    match payload {
        ContentPayload::Theory { body }
        | ContentPayload::Example { body }
        | ContentPayload::Exercise { body } => (Some(body.clone()), None, None, None),
        ContentPayload::Video { video_url } => (None, video_url.clone(), None, None),
        ContentPayload::Pdf { pdf_url } => (None, None, pdf_url.clone(), None),
        ContentPayload::Quiz { questions } => (None, None, None, Some(Json(questions.clone()))),
    }
}

pub trait ContentExt {
    async fn get_contents(&self, topic_id: Uuid) -> Result<Vec<Content>, sqlx::Error>;

    async fn get_content(&self, content_id: Uuid) -> Result<Option<Content>, sqlx::Error>;

    async fn save_content(
        &self,
        topic_id: Uuid,
        unit_id: Uuid,
        program_id: Uuid,
        title: &str,
        sort_order: i32,
        payload: &ContentPayload,
    ) -> Result<Content, sqlx::Error>;

    /// `payload` is the complete new payload (merge and validation
    /// happen at the boundary); all payload columns are rewritten.
    async fn update_content(
        &self,
        content_id: Uuid,
        title: Option<&str>,
        sort_order: Option<i32>,
        payload: &ContentPayload,
    ) -> Result<Content, sqlx::Error>;

    /// Attach an uploaded file URL to a pdf-kind content record.
    async fn set_pdf_url(&self, content_id: Uuid, url: &str) -> Result<Content, sqlx::Error>;

    async fn delete_content(&self, content_id: Uuid) -> Result<(), sqlx::Error>;
}

impl ContentExt for DBClient {
    async fn get_contents(&self, topic_id: Uuid) -> Result<Vec<Content>, sqlx::Error> {
        let rows = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT * FROM contents
            WHERE topic_id = $1
            ORDER BY sort_order ASC, created_at ASC
            "#,
        )
        .bind(topic_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Content::from).collect())
    }

    async fn get_content(&self, content_id: Uuid) -> Result<Option<Content>, sqlx::Error> {
        let row = sqlx::query_as::<_, ContentRow>("SELECT * FROM contents WHERE id = $1")
            .bind(content_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Content::from))
    }

    async fn save_content(
        &self,
        topic_id: Uuid,
        unit_id: Uuid,
        program_id: Uuid,
        title: &str,
        sort_order: i32,
        payload: &ContentPayload,
    ) -> Result<Content, sqlx::Error> {
        let (body, video_url, pdf_url, questions) = payload_columns(payload);

        let row = sqlx::query_as::<_, ContentRow>(
            r#"
            INSERT INTO contents
                (topic_id, unit_id, program_id, title, kind, sort_order,
                 body, video_url, pdf_url, questions)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(topic_id)
        .bind(unit_id)
        .bind(program_id)
        .bind(title)
        .bind(payload.kind())
        .bind(sort_order)
        .bind(body)
        .bind(video_url)
        .bind(pdf_url)
        .bind(questions)
        .fetch_one(&self.pool)
        .await?;

        Ok(Content::from(row))
    }

    async fn update_content(
        &self,
        content_id: Uuid,
        title: Option<&str>,
        sort_order: Option<i32>,
        payload: &ContentPayload,
    ) -> Result<Content, sqlx::Error> {
        let (body, video_url, pdf_url, questions) = payload_columns(payload);

        let row = sqlx::query_as::<_, ContentRow>(
            r#"
            UPDATE contents
            SET title = COALESCE($1, title),
                sort_order = COALESCE($2, sort_order),
                kind = $3,
                body = $4,
                video_url = $5,
                pdf_url = $6,
                questions = $7,
                updated_at = Now()
            WHERE id = $8
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(sort_order)
        .bind(payload.kind())
        .bind(body)
        .bind(video_url)
        .bind(pdf_url)
        .bind(questions)
        .bind(content_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Content::from(row))
    }

    async fn set_pdf_url(&self, content_id: Uuid, url: &str) -> Result<Content, sqlx::Error> {
        let row = sqlx::query_as::<_, ContentRow>(
            r#"
            UPDATE contents
            SET pdf_url = $1, updated_at = Now()
            WHERE id = $2 AND kind = 'pdf'
            RETURNING *
            "#,
        )
        .bind(url)
        .bind(content_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(Content::from(row))
    }

    async fn delete_content(&self, content_id: Uuid) -> Result<(), sqlx::Error> {
        let result = sqlx::query("DELETE FROM contents WHERE id = $1")
            .bind(content_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(sqlx::Error::RowNotFound);
        }

        Ok(())
    }
}
