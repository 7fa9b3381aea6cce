use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::fs;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::models::{Asset, AssociationPeriod, Id};

use super::{AssetRepository, AssociationRepository};

/// JSON file-based storage implementation.
///
/// Directory structure:
/// ```text
/// data/
///   assets/
///     {id}/
///       asset.json
///       associations.jsonl
/// ```
#[derive(Clone)]
pub struct JsonFileStorage {
    base_path: PathBuf,
    // Serializes read-compare-write on asset files within this process.
    write_lock: Arc<Mutex<()>>,
}

impl JsonFileStorage {
    pub fn new(base_path: impl AsRef<Path>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    fn assets_dir(&self) -> PathBuf {
        self.base_path.join("assets")
    }

    fn asset_dir(&self, id: &Id) -> Result<PathBuf> {
        if !Id::is_path_safe(id.as_str()) {
            anyhow::bail!("Refusing unsafe asset id {:?}", id.as_str());
        }
        Ok(self.assets_dir().join(id.as_str()))
    }

    fn asset_file(&self, id: &Id) -> Result<PathBuf> {
        Ok(self.asset_dir(id)?.join("asset.json"))
    }

    fn associations_file(&self, id: &Id) -> Result<PathBuf> {
        Ok(self.asset_dir(id)?.join("associations.jsonl"))
    }

    async fn ensure_dir(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
        Ok(())
    }

    async fn read_json<T: for<'de> serde::Deserialize<'de>>(
        &self,
        path: &Path,
    ) -> Result<Option<T>> {
        match fs::read_to_string(path).await {
            Ok(content) => {
                let value = serde_json::from_str(&content)
                    .with_context(|| format!("Failed to parse JSON from {}", path.display()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", path.display())),
        }
    }

    /// Write via a sibling temp file and rename, so readers never see a
    /// half-written record.
    async fn write_json<T: serde::Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        self.ensure_dir(path).await?;
        let content = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, content)
            .await
            .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
        if let Err(e) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e).with_context(|| format!("Failed to replace {}", path.display()));
        }
        Ok(())
    }

    async fn read_jsonl<T: for<'de> serde::Deserialize<'de>>(&self, path: &Path) -> Result<Vec<T>> {
        let file = match fs::File::open(path).await {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", path.display()))
            }
        };

        let reader = BufReader::new(file);
        let mut lines = reader.lines();
        let mut items = Vec::new();

        while let Some(line) = lines.next_line().await.context("Failed to read line")? {
            if line.trim().is_empty() {
                continue;
            }
            let item: T = serde_json::from_str(&line)
                .with_context(|| format!("Failed to parse JSONL line: {line}"))?;
            items.push(item);
        }

        Ok(items)
    }

    async fn append_jsonl<T: serde::Serialize>(&self, path: &Path, items: &[T]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }

        self.ensure_dir(path).await?;

        let mut buf = String::new();
        for item in items {
            buf.push_str(&serde_json::to_string(item).context("Failed to serialize item")?);
            buf.push('\n');
        }

        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open {} for append", path.display()))?;
        file.write_all(buf.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }

    async fn list_asset_dirs(&self) -> Result<Vec<Id>> {
        let mut ids = Vec::new();

        let mut entries = match fs::read_dir(self.assets_dir()).await {
            Ok(e) => e,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ids),
            Err(e) => return Err(e).context("Failed to read assets directory"),
        };

        while let Some(entry) = entries.next_entry().await.context("Failed to read entry")? {
            let Ok(file_type) = entry.file_type().await else {
                continue;
            };
            if !file_type.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if Id::is_path_safe(name) {
                    ids.push(Id::from_string(name));
                }
            }
        }

        ids.sort();
        Ok(ids)
    }

    /// Load an asset, trusting the directory name over the id stored in the file.
    async fn load_asset(&self, id: &Id) -> Result<Option<Asset>> {
        let asset: Option<Asset> = self.read_json(&self.asset_file(id)?).await?;
        Ok(asset.map(|mut asset| {
            if &asset.id != id {
                tracing::warn!(
                    dir_id = %id,
                    file_id = %asset.id,
                    "asset id in file does not match directory; using directory id"
                );
                asset.id = id.clone();
            }
            asset
        }))
    }
}

#[async_trait::async_trait]
impl AssetRepository for JsonFileStorage {
    async fn get_asset(&self, id: &Id) -> Result<Option<Asset>> {
        self.load_asset(id).await
    }

    /// Unreadable asset files are still listed so callers fail them loudly
    /// instead of silently leaving them out of a fleet run.
    async fn list_active_asset_ids(&self) -> Result<Vec<Id>> {
        let mut ids = Vec::new();

        for id in self.list_asset_dirs().await? {
            match self.load_asset(&id).await {
                Ok(Some(asset)) if asset.is_active() => ids.push(id),
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(asset_id = %id, error = %format!("{err:#}"), "listing unreadable asset");
                    ids.push(id);
                }
            }
        }

        Ok(ids)
    }

    async fn compare_and_set_rented_days(
        &self,
        id: &Id,
        expected: u64,
        value: u64,
    ) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let Some(mut asset) = self.load_asset(id).await? else {
            return Ok(false);
        };
        if asset.rented_days != expected {
            return Ok(false);
        }
        asset.rented_days = value;
        self.write_json(&self.asset_file(id)?, &asset).await?;
        Ok(true)
    }

    async fn save_asset(&self, asset: &Asset) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.write_json(&self.asset_file(&asset.id)?, asset).await
    }

    async fn list_assets(&self) -> Result<Vec<Asset>> {
        let ids = self.list_asset_dirs().await?;
        let mut assets = Vec::new();

        for id in ids {
            match self.load_asset(&id).await {
                Ok(Some(asset)) => assets.push(asset),
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(asset_id = %id, error = %format!("{err:#}"), "skipping unreadable asset");
                }
            }
        }

        Ok(assets)
    }
}

#[async_trait::async_trait]
impl AssociationRepository for JsonFileStorage {
    async fn list_periods_for_asset(&self, asset_id: &Id) -> Result<Vec<AssociationPeriod>> {
        self.read_jsonl(&self.associations_file(asset_id)?).await
    }

    async fn append_periods(&self, asset_id: &Id, periods: &[AssociationPeriod]) -> Result<()> {
        self.append_jsonl(&self.associations_file(asset_id)?, periods)
            .await
    }
}
