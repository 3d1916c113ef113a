use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};
use crate::repository::{ApiClient, Download};
use crate::schemas::{Document, DocumentKind};
use crate::services::schedules::path_segment;

pub async fn list_documents(client: &ApiClient) -> AppResult<Vec<Document>> {
    client.get("/documents").await
}

/// Documents of one kind, newest first.
pub fn documents_of_kind(documents: &[Document], kind: DocumentKind) -> Vec<Document> {
    let mut selected: Vec<Document> = documents
        .iter()
        .filter(|document| document.kind == kind)
        .cloned()
        .collect();
    selected.sort_by(|left, right| right.created_at.cmp(&left.created_at));
    selected
}

/// Download the receipt generated for a payment into `target_dir`.
pub async fn download_receipt(
    client: &ApiClient,
    payment_id: &str,
    target_dir: &Path,
) -> AppResult<PathBuf> {
    let id = path_segment(payment_id)?;
    let download = client.download(&format!("/payments/{id}/receipt")).await?;
    save_download(download, target_dir, &format!("receipt-{id}.pdf")).await
}

/// Download the lease document of a rental into `target_dir`.
pub async fn download_lease(
    client: &ApiClient,
    rental_id: &str,
    target_dir: &Path,
) -> AppResult<PathBuf> {
    let id = path_segment(rental_id)?;
    let download = client.download(&format!("/rentals/{id}/document")).await?;
    save_download(download, target_dir, &format!("lease-{id}.pdf")).await
}

async fn save_download(download: Download, target_dir: &Path, fallback: &str) -> AppResult<PathBuf> {
    if download.bytes.is_empty() {
        return Err(AppError::NotFound("The document is empty.".to_string()));
    }
    let file_name = download.file_name.unwrap_or_else(|| fallback.to_string());
    tokio::fs::create_dir_all(target_dir).await?;
    let path = target_dir.join(file_name);
    tokio::fs::write(&path, &download.bytes).await?;
    tracing::info!(path = %path.display(), bytes = download.bytes.len(), "Document saved");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use axum::extract::Path;
    use axum::http::{header, StatusCode};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::Router;
    use chrono::{TimeZone, Utc};

    use super::{documents_of_kind, download_lease, download_receipt};
    use crate::error::AppError;
    use crate::repository::test_support::{client_for, spawn_backend};
    use crate::schemas::{Document, DocumentKind};

    fn backend() -> Router {
        Router::new()
            .route(
                "/payments/{id}/receipt",
                get(|Path(id): Path<String>| async move {
                    if id == "missing" {
                        return StatusCode::NOT_FOUND.into_response();
                    }
                    (
                        [
                            (header::CONTENT_TYPE, "application/pdf"),
                            (
                                header::CONTENT_DISPOSITION,
                                "attachment; filename=\"receipt-october.pdf\"",
                            ),
                        ],
                        b"%PDF-1.4 receipt".to_vec(),
                    )
                        .into_response()
                }),
            )
            .route(
                "/rentals/{id}/document",
                get(|| async { ([(header::CONTENT_TYPE, "application/pdf")], b"%PDF-1.4 lease".to_vec()) }),
            )
    }

    #[tokio::test]
    async fn receipt_uses_the_server_file_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = client_for(&spawn_backend(backend()).await);

        let path = download_receipt(&client, "pay-1", dir.path())
            .await
            .expect("saved");
        assert_eq!(path, dir.path().join("receipt-october.pdf"));
        assert_eq!(
            std::fs::read(&path).expect("file"),
            b"%PDF-1.4 receipt".to_vec()
        );
    }

    #[tokio::test]
    async fn lease_falls_back_to_generated_name() {
        let dir = tempfile::tempdir().expect("tempdir");
        let target = dir.path().join("leases");
        let client = client_for(&spawn_backend(backend()).await);

        let path = download_lease(&client, "ren-7", &target).await.expect("saved");
        assert_eq!(path, target.join("lease-ren-7.pdf"));
    }

    #[tokio::test]
    async fn missing_receipt_is_not_found() {
        let dir = tempfile::tempdir().expect("tempdir");
        let client = client_for(&spawn_backend(backend()).await);

        let error = download_receipt(&client, "missing", dir.path())
            .await
            .expect_err("missing");
        assert!(matches!(error, AppError::NotFound(_)));
        assert!(std::fs::read_dir(dir.path()).expect("dir").next().is_none());
    }

    #[test]
    fn filters_documents_newest_first() {
        let document = |id: &str, kind: DocumentKind, day: u32| Document {
            id: id.to_string(),
            kind,
            file_name: format!("{id}.pdf"),
            created_at: Utc.with_ymd_and_hms(2026, 10, day, 9, 0, 0).single(),
            payment_id: None,
            rental_id: None,
        };
        let documents = vec![
            document("r1", DocumentKind::Receipt, 1),
            document("l1", DocumentKind::Lease, 2),
            document("r2", DocumentKind::Receipt, 3),
        ];
        let receipts = documents_of_kind(&documents, DocumentKind::Receipt);
        let ids: Vec<&str> = receipts.iter().map(|document| document.id.as_str()).collect();
        assert_eq!(ids, vec!["r2", "r1"]);
    }
}
