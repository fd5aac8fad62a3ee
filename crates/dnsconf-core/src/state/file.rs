// # File Domain Registry
//
// File-based implementation of DomainRegistry with crash recovery.
//
// ## Crash Recovery
//
// - Atomic writes: write-then-rename
// - Corruption detection: JSON validation on load
// - Automatic backup: keeps a .backup of the last known good file
// - Recovery: falls back to the backup if the main file is corrupted
// - Claims: an apply claim never survives a restart; claims found on load
//   are dropped since no apply can be in flight in a fresh process
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "domains": {
//     "<domain id>": { "project_id": "...", "domain": "example.com", ... }
//   }
// }
// ```

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::{claim_row, new_registration, release_row};
use crate::Error;
use crate::traits::{ApplyClaim, CustomDomainRecord, DomainRegistration, DomainRegistry, DomainUpdate};

/// Registry file format version
const REGISTRY_FILE_VERSION: &str = "1.0";

/// File-based domain registry with crash recovery
///
/// Every mutation is written through to disk before the call returns.
#[derive(Debug)]
pub struct FileDomainRegistry {
    path: PathBuf,
    domains: Arc<RwLock<HashMap<String, CustomDomainRecord>>>,
}

/// Serializable registry file format
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct RegistryFileFormat {
    version: String,
    domains: HashMap<String, CustomDomainRecord>,
}

impl FileDomainRegistry {
    /// Create or load a file registry
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Load the existing file, falling back to the backup on corruption
    /// 3. Start empty if neither can be read
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    Error::config(format!(
                        "Failed to create registry directory {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let mut domains = Self::load_with_recovery(&path).await?;
        let stale = domains
            .values_mut()
            .filter_map(|record| record.apply_claim.take())
            .count();
        if stale > 0 {
            tracing::warn!(count = stale, "Dropped apply claims left by a previous process");
        }

        Ok(Self {
            path,
            domains: Arc::new(RwLock::new(domains)),
        })
    }

    /// Load with automatic recovery
    ///
    /// Only a parse failure counts as corruption; I/O errors propagate.
    async fn load_with_recovery(path: &Path) -> Result<HashMap<String, CustomDomainRecord>, Error> {
        match Self::load(path).await {
            Ok(domains) => {
                tracing::debug!(count = domains.len(), "Loaded domain registry");
                Ok(domains)
            }
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "Registry file appears corrupted: {}. Attempting recovery from backup.",
                    e
                );

                let backup_path = Self::backup_path(path);
                if !backup_path.exists() {
                    tracing::warn!("No backup file found. Starting with empty registry.");
                    return Ok(HashMap::new());
                }

                match Self::load(&backup_path).await {
                    Ok(domains) => {
                        tracing::info!(count = domains.len(), "Recovered registry from backup");
                        if let Err(restore_err) = fs::copy(&backup_path, path).await {
                            tracing::error!(
                                "Failed to restore registry file from backup: {}",
                                restore_err
                            );
                        }
                        Ok(domains)
                    }
                    Err(backup_err) => {
                        tracing::error!(
                            "Backup also unreadable: {}. Starting with empty registry.",
                            backup_err
                        );
                        Ok(HashMap::new())
                    }
                }
            }
            Err(e) => Err(e),
        }
    }

    async fn load(path: &Path) -> Result<HashMap<String, CustomDomainRecord>, Error> {
        if !path.exists() {
            tracing::debug!("Registry file does not exist: {}", path.display());
            return Ok(HashMap::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::registry(format!(
                "Failed to read registry file {}: {}",
                path.display(),
                e
            ))
        })?;

        let file: RegistryFileFormat = serde_json::from_str(&content)?;
        if file.version != REGISTRY_FILE_VERSION {
            tracing::warn!(
                "Registry file version mismatch: expected {}, got {}. Attempting to load anyway.",
                REGISTRY_FILE_VERSION,
                file.version
            );
        }

        Ok(file.domains)
    }

    /// Write the current rows atomically
    ///
    /// Caller passes the rows it holds under the lock so that concurrent
    /// writers serialize on the registry lock.
    async fn write(&self, domains: &HashMap<String, CustomDomainRecord>) -> Result<(), Error> {
        let file = RegistryFileFormat {
            version: REGISTRY_FILE_VERSION.to_string(),
            domains: domains.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        let temp_path = self.temp_path();
        {
            let mut temp = fs::File::create(&temp_path).await.map_err(|e| {
                Error::registry(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            temp.write_all(json.as_bytes()).await.map_err(|e| {
                Error::registry(format!(
                    "Failed to write temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
            temp.flush().await.map_err(|e| {
                Error::registry(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            if let Err(e) = fs::copy(&self.path, Self::backup_path(&self.path)).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::registry(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Registry written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl DomainRegistry for FileDomainRegistry {
    async fn create_domain(&self, project_id: &str, domain: &str) -> Result<DomainRegistration, Error> {
        let record = new_registration(project_id, domain)?;
        let registration = DomainRegistration {
            domain_id: record.id.clone(),
            verification_token: record.verification_token.clone(),
        };

        let mut guard = self.domains.write().await;
        guard.insert(record.id.clone(), record);
        if let Err(e) = self.write(&guard).await {
            guard.remove(&registration.domain_id);
            return Err(e);
        }

        tracing::debug!(domain_id = %registration.domain_id, "Registered domain");
        Ok(registration)
    }

    async fn get_domain(&self, domain_id: &str) -> Result<Option<CustomDomainRecord>, Error> {
        Ok(self.domains.read().await.get(domain_id).cloned())
    }

    async fn update_domain(&self, domain_id: &str, update: DomainUpdate) -> Result<(), Error> {
        let mut guard = self.domains.write().await;
        let record = guard
            .get_mut(domain_id)
            .ok_or_else(|| Error::domain_not_found(domain_id))?;
        let previous = record.clone();
        record.apply_update(update);

        // Memory never runs ahead of disk
        if let Err(e) = self.write(&guard).await {
            guard.insert(domain_id.to_string(), previous);
            return Err(e);
        }
        Ok(())
    }

    async fn remove_domain(&self, domain_id: &str) -> Result<(), Error> {
        let mut guard = self.domains.write().await;
        if let Some(previous) = guard.remove(domain_id) {
            if let Err(e) = self.write(&guard).await {
                guard.insert(domain_id.to_string(), previous);
                return Err(e);
            }
        }
        Ok(())
    }

    async fn try_claim_apply(&self, domain_id: &str, fingerprint: &str) -> Result<ApplyClaim, Error> {
        let mut guard = self.domains.write().await;
        let record = guard
            .get_mut(domain_id)
            .ok_or_else(|| Error::domain_not_found(domain_id))?;
        Ok(claim_row(record, fingerprint))
    }

    async fn release_apply(&self, domain_id: &str, fingerprint: &str) -> Result<(), Error> {
        if let Some(record) = self.domains.write().await.get_mut(domain_id) {
            release_row(record, fingerprint);
        }
        Ok(())
    }

    async fn flush(&self) -> Result<(), Error> {
        let guard = self.domains.read().await;
        self.write(&guard).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DnsRecord, DnsSnapshot, ProviderKind, RecordType};
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_registry_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("domains.json");

        let registry = FileDomainRegistry::new(&path).await.unwrap();
        let registration = registry.create_domain("p1", "example.com").await.unwrap();
        assert!(path.exists());

        let snapshot = DnsSnapshot::capture(
            ProviderKind::RegistrarA,
            vec![DnsRecord::new(RecordType::A, "@", "1.2.3.4")],
        );
        registry
            .update_domain(
                &registration.domain_id,
                DomainUpdate {
                    dns_snapshot: Some(snapshot.clone()),
                    dns_provider: Some(ProviderKind::RegistrarA),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reloaded = FileDomainRegistry::new(&path).await.unwrap();
        let record = reloaded
            .get_domain(&registration.domain_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.verification_token, registration.verification_token);
        assert_eq!(record.dns_snapshot, Some(snapshot));
        assert_eq!(record.dns_provider, Some(ProviderKind::RegistrarA));
    }

    #[tokio::test]
    async fn test_file_registry_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("domains.json");

        let registry = FileDomainRegistry::new(&path).await.unwrap();
        let first = registry.create_domain("p1", "example.com").await.unwrap();
        // Second write leaves the first state in the backup
        let second = registry.create_domain("p1", "example.org").await.unwrap();

        let backup_path = FileDomainRegistry::backup_path(&path);
        assert!(backup_path.exists(), "Backup file should exist after write");

        fs::write(&path, b"corrupted json data").await.unwrap();

        let recovered = FileDomainRegistry::new(&path).await.unwrap();
        assert!(recovered.get_domain(&first.domain_id).await.unwrap().is_some());
        assert!(recovered.get_domain(&second.domain_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_memory_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("domains.json");

        let registry = FileDomainRegistry::new(&path).await.unwrap();
        let registration = registry.create_domain("p1", "example.com").await.unwrap();

        // A directory where the temp file goes makes every write fail
        let blocker = registry.temp_path();
        fs::create_dir(&blocker).await.unwrap();

        let result = registry
            .update_domain(
                &registration.domain_id,
                DomainUpdate {
                    auto_configured: Some(true),
                    action_fingerprint: Some("fp".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(Error::Registry(_))));

        let record = registry
            .get_domain(&registration.domain_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!record.auto_configured);
        assert!(record.action_fingerprint.is_none());

        assert!(registry.remove_domain(&registration.domain_id).await.is_err());
        assert!(registry.get_domain(&registration.domain_id).await.unwrap().is_some());

        fs::remove_dir(&blocker).await.unwrap();
        let reloaded = FileDomainRegistry::new(&path).await.unwrap();
        let on_disk = reloaded
            .get_domain(&registration.domain_id)
            .await
            .unwrap()
            .unwrap();
        assert!(!on_disk.auto_configured);
        assert_eq!(on_disk.verification_token, record.verification_token);
    }

    #[tokio::test]
    async fn test_claims_do_not_survive_reload() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("domains.json");

        let registry = FileDomainRegistry::new(&path).await.unwrap();
        let registration = registry.create_domain("p1", "example.com").await.unwrap();
        assert_eq!(
            registry.try_claim_apply(&registration.domain_id, "fp").await.unwrap(),
            ApplyClaim::Claimed
        );
        registry.flush().await.unwrap();

        let reloaded = FileDomainRegistry::new(&path).await.unwrap();
        assert_eq!(
            reloaded.try_claim_apply(&registration.domain_id, "fp").await.unwrap(),
            ApplyClaim::Claimed
        );
    }
}
