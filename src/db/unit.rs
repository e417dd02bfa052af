use uuid::Uuid;

use super::DBClient;
use crate::models::Unit;

pub trait UnitExt {
    async fn get_units(&self, program_id: Uuid) -> Result<Vec<Unit>, sqlx::Error>;

    async fn get_unit(&self, unit_id: Uuid) -> Result<Option<Unit>, sqlx::Error>;

    async fn save_unit(
        &self,
        program_id: Uuid,
        title: &str,
        slug: &str,
        description: &str,
        sort_order: i32,
    ) -> Result<Unit, sqlx::Error>;

    async fn update_unit(
        &self,
        unit_id: Uuid,
        title: Option<&str>,
        slug: Option<&str>,
        description: Option<&str>,
        sort_order: Option<i32>,
    ) -> Result<Unit, sqlx::Error>;

    /// Cascading delete of the unit, its topics and their contents in
    /// one transaction. All-or-nothing for the caller.
    async fn delete_unit(&self, unit_id: Uuid) -> Result<(), sqlx::Error>;
}

impl UnitExt for DBClient {
    async fn get_units(&self, program_id: Uuid) -> Result<Vec<Unit>, sqlx::Error> {
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

        Ok(units)
    }

    async fn get_unit(&self, unit_id: Uuid) -> Result<Option<Unit>, sqlx::Error> {
        let unit = sqlx::query_as::<_, Unit>("SELECT * FROM units WHERE id = $1")
            .bind(unit_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(unit)
    }

    async fn save_unit(
        &self,
        program_id: Uuid,
        title: &str,
        slug: &str,
        description: &str,
        sort_order: i32,
    ) -> Result<Unit, sqlx::Error> {
        let unit = sqlx::query_as::<_, Unit>(
            r#"
            INSERT INTO units (program_id, title, slug, description, sort_order)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(program_id)
        .bind(title)
        .bind(slug)
        .bind(description)
        .bind(sort_order)
        .fetch_one(&self.pool)
        .await?;

        Ok(unit)
    }

    async fn update_unit(
        &self,
        unit_id: Uuid,
        title: Option<&str>,
        slug: Option<&str>,
        description: Option<&str>,
        sort_order: Option<i32>,
    ) -> Result<Unit, sqlx::Error> {
        let unit = sqlx::query_as::<_, Unit>(
            r#"
            UPDATE units
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
        .bind(unit_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(unit)
    }

    async fn delete_unit(&self, unit_id: Uuid) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM contents WHERE unit_id = $1")
            .bind(unit_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM topics WHERE unit_id = $1")
            .bind(unit_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM units WHERE id = $1")
            .bind(unit_id)
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
