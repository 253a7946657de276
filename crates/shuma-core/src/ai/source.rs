//! Uploaded documents as inputs to extraction calls

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use base64::Engine;
use reqwest::Client;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::types::LoadedDocument;
use crate::error::{Error, Result};
use crate::models::{DocType, ExtractionKind, Upload};

/// Environment variable for the uploads directory
pub const UPLOADS_DIR_ENV: &str = "SHUMA_UPLOADS_DIR";

/// One uploaded file that feeds an extraction call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSource {
    pub doc_type: DocType,
    /// Upload type as recorded by the upload step (`tabu`, `interior_image`, ...)
    pub upload_type: String,
    pub name: String,
    pub url: String,
    /// Stable id; SHA-256 of the url when the upload has none
    pub document_id: String,
}

impl DocumentSource {
    /// Build from an upload entry; `None` for unknown types or missing urls
    pub fn from_upload(upload: &Upload) -> Option<Self> {
        let doc_type = DocType::from_upload_type(&upload.upload_type)?;
        let url = upload.url.clone().filter(|u| !u.trim().is_empty())?;
        let name = upload
            .name
            .clone()
            .unwrap_or_else(|| file_name_of(&url).to_string());
        let document_id = upload.id.clone().unwrap_or_else(|| document_id_for(&url));

        Some(Self {
            doc_type,
            upload_type: upload.upload_type.to_lowercase(),
            name,
            url,
            document_id,
        })
    }

    /// Whether this document is an input of the given extraction call
    ///
    /// Typed interior/exterior photos feed only their own analysis; untyped
    /// and building photos count as exterior, except `image`/`images` which
    /// feed both.
    pub fn feeds(&self, kind: ExtractionKind) -> bool {
        if kind.doc_type() != self.doc_type {
            return false;
        }
        match (kind, self.upload_type.as_str()) {
            (ExtractionKind::InteriorImages, "interior_image") => true,
            (ExtractionKind::InteriorImages, "image" | "images") => true,
            (ExtractionKind::InteriorImages, _) => false,
            (ExtractionKind::ExteriorImages, "interior_image") => false,
            _ => true,
        }
    }
}

/// SHA-256 of a url, hex encoded
pub fn document_id_for(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

fn file_name_of(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

/// All extractable documents listed in the uploads
pub fn document_sources(uploads: &[Upload]) -> Vec<DocumentSource> {
    uploads.iter().filter_map(DocumentSource::from_upload).collect()
}

/// The set of document types that have at least one usable upload
pub fn uploaded_document_types(uploads: &[Upload]) -> BTreeSet<DocType> {
    document_sources(uploads)
        .into_iter()
        .map(|s| s.doc_type)
        .collect()
}

/// Documents feeding one extraction call
pub fn documents_for(kind: ExtractionKind, sources: &[DocumentSource]) -> Vec<DocumentSource> {
    sources.iter().filter(|s| s.feeds(kind)).cloned().collect()
}

/// Guess a MIME type from a file extension
pub fn media_type_for(name: &str) -> &'static str {
    let ext = name
        .rsplit('.')
        .next()
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Fetches document bytes for provider requests
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    http_client: Client,
    uploads_dir: PathBuf,
}

impl DocumentLoader {
    pub fn new(uploads_dir: impl Into<PathBuf>) -> Self {
        Self {
            http_client: Client::new(),
            uploads_dir: uploads_dir.into(),
        }
    }

    /// Uses `SHUMA_UPLOADS_DIR`, defaulting to `./uploads`
    pub fn from_env() -> Self {
        let dir = std::env::var(UPLOADS_DIR_ENV).unwrap_or_else(|_| "uploads".to_string());
        Self::new(dir)
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    /// Load and base64-encode a document
    pub async fn load(&self, source: &DocumentSource) -> Result<LoadedDocument> {
        let bytes = if source.url.starts_with("http://") || source.url.starts_with("https://") {
            let response = self.http_client.get(&source.url).send().await?;
            if !response.status().is_success() {
                return Err(Error::InvalidData(format!(
                    "Failed to fetch {}: HTTP {}",
                    source.url,
                    response.status()
                )));
            }
            response.bytes().await?.to_vec()
        } else {
            let path = self.local_path(&source.url)?;
            tokio::fs::read(&path).await?
        };

        debug!(
            document = %source.name,
            doc_type = %source.doc_type,
            bytes = bytes.len(),
            "Loaded document"
        );

        let media_type = match media_type_for(&source.name) {
            "application/octet-stream" => media_type_for(&source.url),
            known => known,
        };

        Ok(LoadedDocument {
            name: source.name.clone(),
            media_type: media_type.to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        })
    }

    /// Resolve a local url inside the uploads directory
    fn local_path(&self, url: &str) -> Result<PathBuf> {
        let relative = url
            .trim_start_matches("file://")
            .trim_start_matches("/uploads/")
            .trim_start_matches('/');
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(Error::InvalidData(format!("Invalid upload path: {}", url)));
        }
        Ok(self.uploads_dir.join(relative))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(upload_type: &str, url: &str) -> Upload {
        Upload {
            upload_type: upload_type.into(),
            name: None,
            url: Some(url.into()),
            id: None,
        }
    }

    #[test]
    fn test_uploaded_document_types() {
        let uploads = vec![
            upload("tabu", "tabu.pdf"),
            upload("interior_image", "living.jpg"),
            upload("exterior_image", "front.jpg"),
            upload("gis_screenshot", "map.png"),
            Upload {
                upload_type: "permit".into(),
                name: None,
                url: None,
                id: None,
            },
        ];
        let types = uploaded_document_types(&uploads);
        assert_eq!(
            types.into_iter().collect::<Vec<_>>(),
            vec![DocType::Tabu, DocType::Images]
        );
    }

    #[test]
    fn test_document_id_derived_from_url() {
        let a = DocumentSource::from_upload(&upload("tabu", "sessions/1/tabu.pdf")).unwrap();
        let b = DocumentSource::from_upload(&upload("tabu", "sessions/1/tabu.pdf")).unwrap();
        assert_eq!(a.document_id, b.document_id);
        assert_eq!(a.document_id.len(), 64);
        assert_eq!(a.name, "tabu.pdf");
    }

    #[test]
    fn test_image_routing() {
        let sources = document_sources(&[
            upload("interior_image", "kitchen.jpg"),
            upload("exterior_image", "front.jpg"),
            upload("building_image", "entrance.jpg"),
            upload("tabu", "tabu.pdf"),
        ]);
        let interior = documents_for(ExtractionKind::InteriorImages, &sources);
        let exterior = documents_for(ExtractionKind::ExteriorImages, &sources);
        assert_eq!(interior.len(), 1);
        assert_eq!(interior[0].name, "kitchen.jpg");
        assert_eq!(exterior.len(), 2);
        assert_eq!(documents_for(ExtractionKind::LandRegistry, &sources).len(), 1);
        assert!(documents_for(ExtractionKind::BuildingPermit, &sources).is_empty());
    }

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for("tabu.PDF"), "application/pdf");
        assert_eq!(media_type_for("photo.jpeg"), "image/jpeg");
        assert_eq!(media_type_for("noext"), "application/octet-stream");
    }

    #[tokio::test]
    async fn test_load_local_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tabu.pdf"), b"%PDF-1.4").unwrap();
        let loader = DocumentLoader::new(dir.path());

        let source = DocumentSource::from_upload(&upload("tabu", "/uploads/tabu.pdf")).unwrap();
        let doc = loader.load(&source).await.unwrap();
        assert_eq!(doc.media_type, "application/pdf");
        assert_eq!(doc.data, "JVBERi0xLjQ=");
    }

    #[tokio::test]
    async fn test_load_rejects_traversal() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DocumentLoader::new(dir.path());
        let source = DocumentSource::from_upload(&upload("tabu", "../secret.pdf")).unwrap();
        assert!(matches!(
            loader.load(&source).await,
            Err(Error::InvalidData(_))
        ));
    }
}
