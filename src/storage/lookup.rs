use anyhow::Result;

use crate::models::{Asset, Id};

use super::AssetRepository;

/// Resolve an asset by id, falling back to a case-insensitive label match.
pub async fn find_asset(storage: &dyn AssetRepository, id_or_label: &str) -> Result<Option<Asset>> {
    if Id::is_path_safe(id_or_label) {
        let id = Id::from_string(id_or_label);
        if let Some(asset) = storage.get_asset(&id).await? {
            return Ok(Some(asset));
        }
    }

    let assets = storage.list_assets().await?;
    let mut matches: Vec<Asset> = assets
        .into_iter()
        .filter(|a| a.label.eq_ignore_ascii_case(id_or_label))
        .collect();

    if matches.len() > 1 {
        let ids: Vec<String> = matches.iter().map(|a| a.id.to_string()).collect();
        anyhow::bail!("Multiple assets labelled '{id_or_label}'. Use an ID instead: {ids:?}");
    }

    Ok(matches.pop())
}
