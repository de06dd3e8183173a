pub mod json_file;

use std::path::PathBuf;
use async_trait::async_trait;
use rand::RngCore;
use shared::protocol::DEFAULT_CATEGORY;
use shared::types::{ServiceInput, ServiceRecord};

pub use json_file::JsonFileStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Name and URL are required.")]
    Validation,

    #[error("service {0} not found")]
    NotFound(String),

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Persistent collection of service records.
///
/// Implementations own the stored collection exclusively. Mutations carry no
/// concurrency control: two overlapping writers race and the last one wins.
#[async_trait]
pub trait ServiceStore: Send + Sync {
    /// All records in stored order. An absent backing store is an empty list.
    async fn list(&self) -> StoreResult<Vec<ServiceRecord>>;

    async fn add(&self, input: ServiceInput) -> StoreResult<ServiceRecord>;

    /// Replace the record with `id` in place, keeping its id and position.
    async fn update(&self, id: &str, input: ServiceInput) -> StoreResult<ServiceRecord>;

    async fn remove(&self, id: &str) -> StoreResult<()>;
}

/// Input with required fields checked and defaults resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidInput {
    pub name: String,
    pub url: String,
    pub category: String,
    pub icon: String,
}

impl ValidInput {
    pub fn into_record(self, id: String) -> ServiceRecord {
        ServiceRecord {
            id,
            name: self.name,
            url: self.url,
            category: self.category,
            icon: self.icon,
        }
    }
}

/// Check `name`/`url` are present and non-blank, and fill in defaults.
pub fn validate(input: ServiceInput) -> StoreResult<ValidInput> {
    let name = non_blank(input.name).ok_or(StoreError::Validation)?;
    let url = non_blank(input.url).ok_or(StoreError::Validation)?;

    Ok(ValidInput {
        name,
        url,
        category: non_blank(input.category).unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
        icon: input.icon.unwrap_or_default(),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// 16 bytes from the thread-local CSPRNG, hex encoded.
pub fn generate_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_validate_resolves_defaults() {
        let valid = validate(ServiceInput::new("Router", "192.168.1.1")).unwrap();
        assert_eq!(valid.category, "General");
        assert_eq!(valid.icon, "");
    }

    #[test]
    fn test_validate_keeps_supplied_fields() {
        let input = ServiceInput::new("Plex", "http://plex:32400")
            .with_category("Media")
            .with_icon("film");
        let valid = validate(input).unwrap();
        assert_eq!(valid.category, "Media");
        assert_eq!(valid.icon, "film");
    }

    #[test]
    fn test_validate_rejects_missing_or_blank() {
        assert!(matches!(
            validate(ServiceInput::new("", "http://x")),
            Err(StoreError::Validation)
        ));
        assert!(matches!(
            validate(ServiceInput::new("name", "")),
            Err(StoreError::Validation)
        ));
        assert!(matches!(
            validate(ServiceInput::new("   ", "http://x")),
            Err(StoreError::Validation)
        ));
        assert!(matches!(
            validate(ServiceInput::default()),
            Err(StoreError::Validation)
        ));
    }

    #[test]
    fn test_blank_category_falls_back() {
        let valid = validate(ServiceInput::new("a", "b").with_category("")).unwrap();
        assert_eq!(valid.category, "General");
    }

    #[test]
    fn test_generated_ids_are_hex_and_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 1000);
        for id in &ids {
            assert_eq!(id.len(), 32);
            assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        }
    }
}
