use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use application::interfaces::validation_archive::ValidationArchive;
use domain::value_objects::{
    enums::validation_types::ValidationType, phone_validation::PhoneValidationResult,
};

/// Writes each validation batch as a JSON document under `{base_dir}/{YYYY}/{MM}/`.
pub struct LocalValidationArchive {
    base_dir: PathBuf,
    prefix: String,
}

#[derive(Serialize)]
struct ArchiveDocument<'a> {
    user_id: Uuid,
    #[serde(rename = "type")]
    validation_type: ValidationType,
    total: usize,
    created_at: DateTime<Utc>,
    results: &'a [PhoneValidationResult],
}

impl LocalValidationArchive {
    pub fn new(base_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            base_dir: base_dir.into(),
            prefix: prefix.into(),
        }
    }

    /// `{PREFIX}{DDMMYYHHMM}-{8 hex}.json`; the suffix keeps same-minute batches apart.
    fn file_path(&self, now: DateTime<Utc>) -> PathBuf {
        let suffix = Uuid::new_v4().simple().to_string();
        self.base_dir
            .join(now.format("%Y").to_string())
            .join(now.format("%m").to_string())
            .join(format!(
                "{}{}-{}.json",
                self.prefix,
                now.format("%d%m%y%H%M"),
                &suffix[..8]
            ))
    }
}

#[async_trait]
impl ValidationArchive for LocalValidationArchive {
    async fn store(
        &self,
        user_id: Uuid,
        validation_type: ValidationType,
        results: Vec<PhoneValidationResult>,
    ) -> Result<String> {
        let now = Utc::now();
        let path = self.file_path(now);

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create archive dir {}", parent.display()))?;
        }

        let document = ArchiveDocument {
            user_id,
            validation_type,
            total: results.len(),
            created_at: now,
            results: &results,
        };
        let body = serde_json::to_vec_pretty(&document)?;
        tokio::fs::write(&path, body)
            .await
            .with_context(|| format!("write archive {}", path.display()))?;

        info!(%user_id, %validation_type, total = results.len(), path = %path.display(), "validation_archive: stored batch");
        Ok(display_path(&path))
    }
}

fn display_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
