//! Uploaded document downloads (`<prefix>/<id>/<path>`).

use std::path::{Path, PathBuf};

use cashper_core::EntityId;

use crate::backend::Backend;
use crate::error::ClientError;

const FALLBACK_NAME: &str = "document";

/// Bytes of one downloaded document plus the name to save it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentDownload {
    pub file_name: String,
    pub content: Vec<u8>,
}

impl DocumentDownload {
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Write into `dir` (created if missing) and return the full path.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf, ClientError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.content)?;
        Ok(path)
    }
}

/// `<prefix>/<id>/<stored path>`, each id and path segment percent-encoded.
pub fn document_path(prefix: &str, id: &EntityId, stored_path: &str) -> String {
    let stored = stored_path
        .trim_start_matches('/')
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!(
        "{}/{}/{}",
        prefix.trim_end_matches('/'),
        id.as_path_segment(),
        stored
    )
}

/// Last path segment of a stored document path, reduced to a safe file name.
pub fn file_name_for(stored_path: &str) -> String {
    let last = stored_path
        .rsplit(['/', '\\'])
        .find(|s| !s.trim().is_empty())
        .unwrap_or_default();
    let cleaned: String = last
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        FALLBACK_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

pub async fn download(
    backend: &dyn Backend,
    prefix: &str,
    id: &EntityId,
    stored_path: &str,
) -> Result<DocumentDownload, ClientError> {
    if stored_path.trim().is_empty() {
        return Err(cashper_core::DomainError::validation("document path cannot be empty").into());
    }
    let path = document_path(prefix, id, stored_path);
    let content = backend.get_bytes(&path).await?;
    tracing::info!(%id, %path, bytes = content.len(), "document downloaded");
    Ok(DocumentDownload {
        file_name: file_name_for(stored_path),
        content,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testing::{Reply, ScriptedBackend};

    #[test]
    fn path_joins_prefix_id_and_stored_path() {
        assert_eq!(
            document_path("/api/loans/documents/download/", &EntityId::Number(4), "/uploads/pan.pdf"),
            "/api/loans/documents/download/4/uploads/pan.pdf"
        );
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        assert_eq!(
            document_path("/api/tax/documents", &EntityId::from("TAX/2024/07"), "kyc/aadhaar card#1.pdf"),
            "/api/tax/documents/TAX%2F2024%2F07/kyc/aadhaar%20card%231.pdf"
        );
    }

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(file_name_for("uploads/kyc/aadhaar card.pdf"), "aadhaar_card.pdf");
        assert_eq!(file_name_for("C:\\docs\\itr.pdf"), "itr.pdf");
        assert_eq!(file_name_for("../.."), FALLBACK_NAME);
        assert_eq!(file_name_for("statement/"), "statement");
    }

    #[tokio::test]
    async fn download_fetches_bytes() {
        let backend = ScriptedBackend::new();
        backend.reply(
            "/api/loans/documents/download/4/uploads/pan.pdf",
            Reply::Bytes(b"%PDF-1.4".to_vec()),
        );

        let doc = download(&backend, "/api/loans/documents/download", &EntityId::Number(4), "uploads/pan.pdf")
            .await
            .unwrap();

        assert_eq!(doc.file_name, "pan.pdf");
        assert_eq!(doc.content, b"%PDF-1.4");
    }

    #[test]
    fn save_creates_directory_and_maps_io_errors() {
        let dir = std::env::temp_dir().join(format!("cashper-doc-{}", uuid::Uuid::now_v7()));
        let doc = DocumentDownload {
            file_name: "pan.pdf".to_string(),
            content: vec![1, 2, 3],
        };

        let path = doc.save_to(&dir.join("nested")).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);

        let blocked = dir.join("nested").join("pan.pdf");
        assert!(matches!(doc.save_to(&blocked), Err(ClientError::Io(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn empty_path_is_rejected_without_request() {
        let backend = ScriptedBackend::new();
        let err = download(&backend, "/docs", &EntityId::Number(1), " ").await.unwrap_err();
        assert!(matches!(err, ClientError::Domain(_)));
        assert!(backend.calls().is_empty());
    }
}
