use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use async_trait::async_trait;
use shared::types::{ServiceInput, ServiceRecord};
use super::{generate_id, validate, ServiceStore, StoreError, StoreResult};

/// Service store backed by a single human-readable JSON array.
///
/// Every mutation reads the whole file, edits it in memory, and rewrites it.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> StoreResult<Vec<ServiceRecord>> {
        let data = match tokio::fs::read_to_string(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&data).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn write_all(&self, services: &[ServiceRecord]) -> StoreResult<()> {
        let write_err = |source: std::io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        // Create parent directory if it doesn't exist
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let json = serde_json::to_string_pretty(services).map_err(|e| write_err(e.into()))?;
        tokio::fs::write(&self.path, json).await.map_err(write_err)
    }
}

#[async_trait]
impl ServiceStore for JsonFileStore {
    async fn list(&self) -> StoreResult<Vec<ServiceRecord>> {
        self.read_all().await
    }

    async fn add(&self, input: ServiceInput) -> StoreResult<ServiceRecord> {
        let valid = validate(input)?;
        let mut services = self.read_all().await?;

        let record = valid.into_record(generate_id());
        services.push(record.clone());
        self.write_all(&services).await?;

        Ok(record)
    }

    async fn update(&self, id: &str, input: ServiceInput) -> StoreResult<ServiceRecord> {
        let valid = validate(input)?;
        let mut services = self.read_all().await?;

        let slot = services
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        *slot = valid.into_record(id.to_string());
        let record = slot.clone();

        self.write_all(&services).await?;
        Ok(record)
    }

    async fn remove(&self, id: &str) -> StoreResult<()> {
        let mut services = self.read_all().await?;
        let before = services.len();
        services.retain(|s| s.id != id);

        if services.len() == before {
            return Err(StoreError::NotFound(id.to_string()));
        }

        self.write_all(&services).await
    }
}
