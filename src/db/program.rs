use uuid::Uuid;

use super::content::ContentRow;
use super::{DBClient, assemble_tree};
use crate::models::{Content, Program, ProgramKind, ProgramTree, Topic, Unit};

pub trait ProgramExt {
    async fn get_programs(&self) -> Result<Vec<Program>, sqlx::Error>;

    async fn get_program(&self, program_id: Uuid) -> Result<Option<Program>, sqlx::Error>;

    async fn save_program(
        &self,
        title: &str,
        slug: &str,
        description: &str,
        kind: ProgramKind,
        sort_order: i32,
    ) -> Result<Program, sqlx::Error>;

    async fn update_program(
        &self,
        program_id: Uuid,
        title: Option<&str>,
        slug: Option<&str>,
        description: Option<&str>,
        kind: Option<ProgramKind>,
        sort_order: Option<i32>,
    ) -> Result<Program, sqlx::Error>;

    /// Cascading delete of the whole subtree (units, topics, contents)
    /// in a single transaction, so a mid-cascade failure leaves the
    /// program intact rather than orphaning descendants.
    async fn delete_program(&self, program_id: Uuid) -> Result<(), sqlx::Error>;

    /// Assemble the full read model for one program. The three child
    /// levels are batch-fetched by the denormalized `program_id`
    /// instead of one request per parent node.
    async fn get_program_tree(&self, program_id: Uuid)
    -> Result<Option<ProgramTree>, sqlx::Error>;

    async fn get_all_program_trees(&self) -> Result<Vec<ProgramTree>, sqlx::Error>;
}

impl ProgramExt for DBClient {
    async fn get_programs(&self) -> Result<Vec<Program>, sqlx::Error> {
        let programs = sqlx::query_as::<_, Program>(
            "SELECT * FROM programs ORDER BY sort_order ASC, created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(programs)
    }

    async fn get_program(&self, program_id: Uuid) -> Result<Option<Program>, sqlx::Error> {
        let program = sqlx::query_as::<_, Program>("SELECT * FROM programs WHERE id = $1")
            .bind(program_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(program)
    }

    async fn save_program(
        &self,
        title: &str,
        slug: &str,
        description: &str,
        kind: ProgramKind,
        sort_order: i32,
    ) -> Result<Program, sqlx::Error> {
        let program = sqlx::query_as::<_, Program>(
            r#"
            INSERT INTO programs (title, slug, description, kind, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(slug)
        .bind(description)
        .bind(kind)
        .bind(sort_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(program)
    }

    async fn update_program(
        &self,
        program_id: Uuid,
        title: Option<&str>,
        slug: Option<&str>,
        description: Option<&str>,
        kind: Option<ProgramKind>,
        sort_order: Option<i32>,
    ) -> Result<Program, sqlx::Error> {
        let program = sqlx::query_as::<_, Program>(
            r#"
            UPDATE programs
            SET title = COALESCE($1, title),
                slug = COALESCE($2, slug),
                description = COALESCE($3, description),
                kind = COALESCE($4, kind),
                sort_order = COALESCE($5, sort_order),
                updated_at = Now()
            WHERE id = $6
            RETURNING *
            "#,
        )
        .bind(title)
        .bind(slug)
        .bind(description)
        .bind(kind)
        .bind(sort_order)
        .bind(program_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(program)
    }

    async fn delete_program(&self, program_id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM contents WHERE program_id = $1")
            .bind(program_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM topics WHERE program_id = $1")
            .bind(program_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM units WHERE program_id = $1")
            .bind(program_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM programs WHERE id = $1")
            .bind(program_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(sqlx::Error::RowNotFound);
        }

        tx.commit().await?;

        Ok(())
    }

    async fn get_program_tree(
        &self,
        program_id: Uuid,
    ) -> Result<Option<ProgramTree>, sqlx::Error> {
        let Some(program) = self.get_program(program_id).await? else {
            return Ok(None);
        };

        let units = sqlx::query_as::<_, Unit>(
            r#"
            SELECT * FROM units
            WHERE program_id = $1
            ORDER BY sort_order ASC, created_at ASC
            "#,
        )
        .bind(program_id)
        .fetch_all(&self.pool)
        .await?;

        let topics = sqlx::query_as::<_, Topic>(
            r#"
            SELECT * FROM topics
            WHERE program_id = $1
            ORDER BY sort_order ASC, created_at ASC
            "#,
        )
        .bind(program_id)
        .fetch_all(&self.pool)
        .await?;

        let contents = sqlx::query_as::<_, ContentRow>(
            r#"
            SELECT * FROM contents
            WHERE program_id = $1
            ORDER BY sort_order ASC, created_at ASC
            "#,
        )
        .bind(program_id)
        .fetch_all(&self.pool)
        .await?
        .into_iter()
        .map(Content::from)
        .collect();

        Ok(Some(assemble_tree(program, units, topics, contents)))
    }

    async fn get_all_program_trees(&self) -> Result<Vec<ProgramTree>, sqlx::Error> {
        let programs = self.get_programs().await?;
        let mut trees = Vec::with_capacity(programs.len());

        for program in programs {
            if let Some(tree) = self.get_program_tree(program.id).await? {
                trees.push(tree);
            }
        }

        Ok(trees)
    }
}
