//! OpenAPI document served at `/openapi.yaml` and rendered by Swagger UI at
//! `/docs`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::handlers::{documents, highlights, lenses, projects, system};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "WiseMark API",
        description = "PDF annotation for deal teams: projects, documents, highlights, and colour lenses"
    ),
    paths(
        system::health_check,
        system::rate_limit_status,
        system::list_legacy_colors,
        lenses::list_lenses,
        lenses::get_lens,
        lenses::create_lens,
        lenses::update_lens,
        lenses::delete_lens,
        lenses::add_lens_color,
        lenses::update_lens_color,
        lenses::delete_lens_color,
        projects::list_projects,
        projects::get_project,
        projects::create_project,
        projects::update_project,
        projects::delete_project,
        documents::list_documents,
        documents::get_document,
        documents::create_document,
        documents::update_document,
        documents::delete_document,
        documents::upload_pdf,
        documents::download_pdf,
        highlights::list_highlights,
        highlights::create_highlight,
        highlights::update_highlight,
        highlights::delete_highlight,
    ),
    components(schemas(
        system::HealthResponse,
        system::RateLimitStatus,
        lenses::LensResponse,
        lenses::LensColorResponse,
        documents::DocumentResponse,
        highlights::HighlightResponse,
        wisemark_core::Project,
        wisemark_core::LegacyColor,
        wisemark_core::Note,
        wisemark_core::StorageLocation,
    )),
    modifiers(&BearerAuth),
    tags(
        (name = "Lenses", description = "System and user colour lenses"),
        (name = "Projects", description = "Project folders"),
        (name = "Documents", description = "PDF documents and their storage"),
        (name = "Highlights", description = "Highlights and notes"),
        (name = "System", description = "Health checks and system info")
    )
)]
pub struct ApiDoc;

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Bearer).build()),
            );
        }
    }
}

/// The OpenAPI document as YAML.
pub fn openapi_yaml() -> String {
    ApiDoc::openapi()
        .to_yaml()
        .unwrap_or_else(|e| format!("# failed to render OpenAPI document: {}\n", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_lens_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/lenses"));
        assert!(doc.paths.paths.contains_key("/api/v1/lenses/{id}/colors/{color_id}"));
        assert!(doc.paths.paths.contains_key("/api/v1/documents/{id}/highlights"));
    }

    #[test]
    fn test_openapi_yaml_renders() {
        let yaml = openapi_yaml();
        assert!(yaml.contains("WiseMark API"));
        assert!(yaml.contains("bearer_auth"));
    }
}
