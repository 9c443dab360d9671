//! Project repository implementation.

use async_trait::async_trait;
use sqlx::{Pool, Postgres, Row};
use tracing::info;
use uuid::Uuid;

use wisemark_core::defaults::DEFAULT_PROJECT_COLOR;
use wisemark_core::palette::validate_name;
use wisemark_core::{
    validate_hex, CreateProjectRequest, Error, Project, ProjectRepository, Result,
    UpdateProjectRequest,
};

use crate::map_db_error;

/// Counts are computed in the same statement so listing stays one query.
const PROJECT_SELECT: &str = r#"
    SELECT p.id, p.owner_id, p.name, p.color, p.created_at, p.updated_at,
           (SELECT COUNT(*) FROM document d WHERE d.project_id = p.id) AS document_count,
           (SELECT COUNT(*) FROM highlight h
              JOIN document d ON d.id = h.document_id
             WHERE d.project_id = p.id) AS annotation_count
    FROM project p
"#;

/// PostgreSQL implementation of ProjectRepository.
#[derive(Clone)]
pub struct PgProjectRepository {
    pool: Pool<Postgres>,
}

impl PgProjectRepository {
    /// Create a new PgProjectRepository with the given connection pool.
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn not_found(project_id: Uuid) -> Error {
        Error::NotFound(format!("Project {} not found", project_id))
    }
}

fn project_from_row(row: &sqlx::postgres::PgRow) -> Project {
    Project {
        id: row.get("id"),
        owner_id: row.get("owner_id"),
        name: row.get("name"),
        color: row.get("color"),
        document_count: row.get("document_count"),
        annotation_count: row.get("annotation_count"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn list(&self, user_id: Uuid) -> Result<Vec<Project>> {
        let query = format!("{} WHERE p.owner_id = $1 ORDER BY p.updated_at DESC", PROJECT_SELECT);
        let rows = sqlx::query(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(rows.iter().map(project_from_row).collect())
    }

    async fn get(&self, user_id: Uuid, project_id: Uuid) -> Result<Project> {
        let query = format!("{} WHERE p.id = $1 AND p.owner_id = $2", PROJECT_SELECT);
        let row = sqlx::query(&query)
            .bind(project_id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?
            .ok_or_else(|| Self::not_found(project_id))?;

        Ok(project_from_row(&row))
    }

    async fn create(&self, user_id: Uuid, req: CreateProjectRequest) -> Result<Project> {
        let name = validate_name("name", &req.name)?;
        let color = match req.color.as_deref() {
            Some(c) => {
                validate_hex("color", c)?;
                c.to_string()
            }
            None => DEFAULT_PROJECT_COLOR.to_string(),
        };

        let project_id = Uuid::now_v7();
        sqlx::query("INSERT INTO project (id, owner_id, name, color) VALUES ($1, $2, $3, $4)")
            .bind(project_id)
            .bind(user_id)
            .bind(&name)
            .bind(&color)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        info!(
            subsystem = "db",
            component = "projects",
            op = "create_project",
            user_id = %user_id,
            project_id = %project_id,
            "Project created"
        );
        self.get(user_id, project_id).await
    }

    async fn update(
        &self,
        user_id: Uuid,
        project_id: Uuid,
        req: UpdateProjectRequest,
    ) -> Result<Project> {
        let name = req
            .name
            .as_deref()
            .map(|n| validate_name("name", n))
            .transpose()?;
        if let Some(color) = req.color.as_deref() {
            validate_hex("color", color)?;
        }

        let result = sqlx::query(
            "UPDATE project SET
                name = COALESCE($3, name),
                color = COALESCE($4, color),
                updated_at = now()
             WHERE id = $1 AND owner_id = $2",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(name)
        .bind(req.color)
        .execute(&self.pool)
        .await
        .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(project_id));
        }
        self.get(user_id, project_id).await
    }

    async fn delete(&self, user_id: Uuid, project_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM project WHERE id = $1 AND owner_id = $2")
            .bind(project_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Self::not_found(project_id));
        }

        info!(
            subsystem = "db",
            component = "projects",
            op = "delete_project",
            user_id = %user_id,
            project_id = %project_id,
            "Project deleted with its documents"
        );
        Ok(())
    }
}
