//! End-to-end HTTP tests for the lens catalog and highlight colours.
//!
//! **IMPORTANT**: These tests need a migrated database at `DATABASE_URL`.

use axum::http::HeaderValue;
use serde_json::{json, Value};

use wisemark_api::{build_router, AppState, RouterConfig};
use wisemark_db::test_fixtures::{TestDataBuilder, TestDatabase};

async fn spawn_server(test_db: &TestDatabase) -> String {
    let router = build_router(
        AppState::new(test_db.db.clone()),
        RouterConfig {
            allowed_origins: vec![HeaderValue::from_static("http://localhost:5173")],
            max_upload_bytes: 1024 * 1024,
        },
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    format!("http://{}", addr)
}

fn token_for(name: &str) -> String {
    format!("test-token-{}-{}", name, uuid::Uuid::new_v4())
}

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_lens_quota_over_http() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let token = token_for("quota");
    test_db.create_user_with_token(&token).await;
    let base_url = spawn_server(&test_db).await;
    let client = reqwest::Client::new();

    for name in ["Deal Review", "Credit Memo", "Board Pack"] {
        let response = client
            .post(format!("{}/api/v1/lenses", base_url))
            .bearer_auth(&token)
            .json(&json!({
                "name": name,
                "entries": [{"key": "risk", "display_name": "Risks", "hex": "#EF4444"}]
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201);
        let body: Value = response.json().await.unwrap();
        assert_eq!(body["is_system"], false);
        assert_eq!(body["colors"][0]["key"], "risk");
    }

    let response = client
        .post(format!("{}/api/v1/lenses", base_url))
        .bearer_auth(&token)
        .json(&json!({"name": "One Too Many"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 422);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "quota_exceeded");

    let lenses: Vec<Value> = client
        .get(format!("{}/api/v1/lenses", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let own = lenses.iter().filter(|l| l["is_system"] == false).count();
    assert_eq!(own, 3);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_system_lens_is_read_only_over_http() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let token = token_for("system");
    test_db.create_user_with_token(&token).await;
    let base_url = spawn_server(&test_db).await;
    let client = reqwest::Client::new();

    let lenses: Vec<Value> = client
        .get(format!("{}/api/v1/lenses", base_url))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let system = lenses
        .iter()
        .find(|l| l["is_system"] == true)
        .expect("seeded system lens");
    let system_id = system["id"].as_str().unwrap();

    let response = client
        .patch(format!("{}/api/v1/lenses/{}", base_url, system_id))
        .bearer_auth(&token)
        .json(&json!({"name": "Mine now"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    let response = client
        .delete(format!("{}/api/v1/lenses/{}", base_url, system_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 403);

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_removed_colour_renders_as_deleted_over_http() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let token = token_for("stale");
    let user_id = test_db.create_user_with_token(&token).await;
    let data = TestDataBuilder::for_user(&test_db, user_id)
        .with_document("cim.pdf")
        .build()
        .await;
    let document_id = data.documents[0];
    let base_url = spawn_server(&test_db).await;
    let client = reqwest::Client::new();

    let lens: Value = client
        .post(format!("{}/api/v1/lenses", base_url))
        .bearer_auth(&token)
        .json(&json!({
            "name": "Security Review",
            "entries": [
                {"key": "security", "display_name": "Security Package", "hex": "#6366F1"},
                {"key": "covenant", "display_name": "Covenants", "hex": "#22C55E"}
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let lens_id = lens["id"].as_str().unwrap().to_string();

    let response = client
        .patch(format!("{}/api/v1/documents/{}", base_url, document_id))
        .bearer_auth(&token)
        .json(&json!({"lens_id": lens_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let document: Value = response.json().await.unwrap();
    assert_eq!(document["effective_lens"]["name"], "Security Review");

    let response = client
        .post(format!("{}/api/v1/documents/{}/highlights", base_url, document_id))
        .bearer_auth(&token)
        .json(&json!({
            "page_number": 12,
            "position_data": {"rects": [[10, 20, 200, 34]]},
            "color": "security",
            "highlighted_text": "First lien on all assets",
            "comment": "Check intercreditor"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let highlight: Value = response.json().await.unwrap();
    assert_eq!(highlight["color_display_name"], "Security Package");
    assert_eq!(highlight["note"]["content"], "Check intercreditor");

    let security_id = lens["colors"]
        .as_array()
        .unwrap()
        .iter()
        .find(|c| c["key"] == "security")
        .unwrap()["id"]
        .as_str()
        .unwrap()
        .to_string();
    let response = client
        .delete(format!(
            "{}/api/v1/lenses/{}/colors/{}",
            base_url, lens_id, security_id
        ))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let highlights: Vec<Value> = client
        .get(format!("{}/api/v1/documents/{}/highlights", base_url, document_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(highlights.len(), 1);
    assert_eq!(highlights[0]["color_key"], "security");
    assert_eq!(highlights[0]["color_display_name"], "Security Package (Deleted)");
    assert_eq!(highlights[0]["is_stale"], true);

    // The lens is still assigned, so it cannot be deleted.
    let response = client
        .delete(format!("{}/api/v1/lenses/{}", base_url, lens_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);

    test_db.cleanup().await;
}
