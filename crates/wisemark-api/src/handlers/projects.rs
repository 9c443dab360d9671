//! Project handlers.

use axum::{extract::State, http::StatusCode, Json};
use tracing::info;
use uuid::Uuid;

use wisemark_core::{CreateProjectRequest, Project, ProjectRepository, UpdateProjectRequest};

use crate::auth::RequireAuth;
use crate::error::ApiError;
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;

/// List the caller's projects, most recently updated first.
#[utoipa::path(
    get,
    path = "/api/v1/projects",
    tag = "Projects",
    responses((status = 200, body = [Project]))
)]
pub async fn list_projects(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(state.db.projects.list(user_id).await?))
}

#[utoipa::path(
    get,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 200, body = Project), (status = 404, description = "Project not found"))
)]
pub async fn get_project(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(project_id): AppPath<Uuid>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(state.db.projects.get(user_id, project_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/projects",
    tag = "Projects",
    responses((status = 201, body = Project), (status = 400, description = "Invalid name or colour"))
)]
pub async fn create_project(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppJson(req): AppJson<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let project = state.db.projects.create(user_id, req).await?;
    info!(
        subsystem = "api",
        component = "projects",
        op = "create_project",
        project_id = %project.id,
        "Project created"
    );
    Ok((StatusCode::CREATED, Json(project)))
}

#[utoipa::path(
    patch,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 200, body = Project))
)]
pub async fn update_project(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(project_id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateProjectRequest>,
) -> Result<Json<Project>, ApiError> {
    Ok(Json(state.db.projects.update(user_id, project_id, req).await?))
}

/// Delete a project together with its documents, highlights, and notes.
#[utoipa::path(
    delete,
    path = "/api/v1/projects/{id}",
    tag = "Projects",
    params(("id" = Uuid, Path, description = "Project id")),
    responses((status = 204, description = "Deleted"))
)]
pub async fn delete_project(
    State(state): State<AppState>,
    RequireAuth { user_id }: RequireAuth,
    AppPath(project_id): AppPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.db.projects.delete(user_id, project_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
