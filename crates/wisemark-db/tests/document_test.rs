//! Integration tests for projects, documents, and PDF storage.
//!
//! **IMPORTANT**: These tests need a migrated database at `DATABASE_URL`.

use wisemark_db::test_fixtures::{TestDataBuilder, TestDatabase};
use wisemark_db::{
    compute_pdf_hash, CreateDocumentRequest, CreateLensRequest, DocumentRepository, Error,
    LensRepository, PdfStorage, ProjectRepository, StorageLocation, UpdateDocumentRequest,
    UpdateProjectRequest,
};

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_same_pdf_twice_in_project_is_duplicate() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let data = TestDataBuilder::new(&test_db)
        .with_project("Deal A")
        .with_project("Deal B")
        .with_document("teaser.pdf")
        .build()
        .await;

    let req = |project_id| CreateDocumentRequest {
        project_id,
        pdf_hash: compute_pdf_hash(b"teaser.pdf"),
        filename: "teaser copy.pdf".to_string(),
        file_size: Some(10),
    };

    let err = test_db
        .db
        .documents
        .create(data.user_id, req(data.projects[0]))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateName(ref m) if m.contains("already in this project")));

    // The same PDF may live in another project.
    test_db
        .db
        .documents
        .create(data.user_id, req(data.projects[1]))
        .await
        .unwrap();

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_documents_are_scoped_to_owner() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let data = TestDataBuilder::new(&test_db).with_document("teaser.pdf").build().await;
    let stranger = test_db.create_user().await;
    let document_id = data.documents[0];

    let err = test_db.db.documents.get(stranger, document_id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = test_db.db.documents.delete(stranger, document_id).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    let err = test_db
        .db
        .projects
        .get(stranger, data.projects[0])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_open_stamps_last_opened_at() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let data = TestDataBuilder::new(&test_db).with_document("teaser.pdf").build().await;

    let before = test_db.db.documents.get(data.user_id, data.documents[0]).await.unwrap();
    assert!(before.last_opened_at.is_none());

    let opened = test_db.db.documents.open(data.user_id, data.documents[0]).await.unwrap();
    assert!(opened.last_opened_at.is_some());

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_assigning_foreign_lens_is_not_found() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let data = TestDataBuilder::new(&test_db).with_document("teaser.pdf").build().await;
    let other = test_db.create_user().await;

    let foreign = test_db
        .db
        .lenses
        .create(
            other,
            CreateLensRequest {
                name: "Private".to_string(),
                entries: vec![],
            },
        )
        .await
        .unwrap();

    let err = test_db
        .db
        .documents
        .update(
            data.user_id,
            data.documents[0],
            UpdateDocumentRequest {
                lens_id: Some(Some(foreign.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_update_document_fields() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let data = TestDataBuilder::new(&test_db).with_document("teaser.pdf").build().await;
    let user = data.user_id;
    let document_id = data.documents[0];

    let updated = test_db
        .db
        .documents
        .update(
            user,
            document_id,
            UpdateDocumentRequest {
                filename: Some("  Project Falcon teaser.pdf ".to_string()),
                color: Some(Some("#10B981".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.filename, "Project Falcon teaser.pdf");
    assert_eq!(updated.color.as_deref(), Some("#10B981"));

    let cleared = test_db
        .db
        .documents
        .update(
            user,
            document_id,
            UpdateDocumentRequest {
                color: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert!(cleared.color.is_none());
    assert_eq!(cleared.filename, "Project Falcon teaser.pdf");

    let err = test_db
        .db
        .documents
        .update(
            user,
            document_id,
            UpdateDocumentRequest {
                color: Some(Some("green".to_string())),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_project_counts_and_update() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let data = TestDataBuilder::new(&test_db)
        .with_project("Deal A")
        .with_document("teaser.pdf")
        .with_document("cim.pdf")
        .build()
        .await;

    let projects = test_db.db.projects.list(data.user_id).await.unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].document_count, 2);
    assert_eq!(projects[0].annotation_count, 0);
    assert_eq!(projects[0].color, "#f59e0b");

    let renamed = test_db
        .db
        .projects
        .update(
            data.user_id,
            data.projects[0],
            UpdateProjectRequest {
                name: Some("Deal A (closed)".to_string()),
                color: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.name, "Deal A (closed)");

    test_db.db.projects.delete(data.user_id, data.projects[0]).await.unwrap();
    let err = test_db
        .db
        .documents
        .get(data.user_id, data.documents[0])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)), "documents go with the project");

    test_db.cleanup().await;
}

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_pdf_upload_recomputes_hash_and_size() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;
    let data = TestDataBuilder::new(&test_db).with_document("teaser.pdf").build().await;
    let document_id = data.documents[0];

    let bytes = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\n%%EOF".to_vec();
    let stored = test_db.db.pdf_storage.store(document_id, &bytes).await.unwrap();
    assert_eq!(stored.location, StorageLocation::Postgres);
    assert_eq!(stored.file_size, bytes.len() as i64);

    let document = test_db.db.documents.get(data.user_id, document_id).await.unwrap();
    assert_eq!(document.pdf_hash, compute_pdf_hash(&bytes));
    assert_eq!(document.file_size, bytes.len() as i64);

    let loaded = test_db.db.pdf_storage.load(document_id).await.unwrap();
    assert_eq!(loaded, bytes);

    test_db.cleanup().await;
}
