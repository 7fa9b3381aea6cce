mod support;

use std::sync::Arc;

use anyhow::Result;
use fleetdays::accrual::{AccrualService, ErrorKind, InvocationContext};
use fleetdays::models::{Asset, AssetKind, AssociationPeriod, Id};
use fleetdays::storage::{AssetRepository, AssociationRepository, JsonFileStorage};
use support::d;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn write_corrupt_asset(dir: &TempDir, id: &str, content: &str) -> Result<Id> {
    let asset_dir = dir.path().join("assets").join(id);
    std::fs::create_dir_all(&asset_dir)?;
    std::fs::write(asset_dir.join("asset.json"), content)?;
    Ok(Id::from_string(id))
}

#[tokio::test]
async fn invalid_json_is_hidden_from_labels_but_listed_as_active() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = JsonFileStorage::new(dir.path());

    let good = Asset::new("Router 1", AssetKind::Router);
    storage.save_asset(&good).await?;
    let mut retired = Asset::new("Router 2", AssetKind::Router);
    retired.deleted = true;
    storage.save_asset(&retired).await?;
    let bad = write_corrupt_asset(&dir, "bad-asset", "{not valid json")?;

    let assets = storage.list_assets().await?;
    assert_eq!(assets.len(), 2);
    assert!(assets.iter().all(|a| a.id != bad));

    let active = storage.list_active_asset_ids().await?;
    assert_eq!(active.len(), 2);
    assert!(active.contains(&good.id));
    assert!(active.contains(&bad));
    assert!(!active.contains(&retired.id));

    Ok(())
}

#[tokio::test]
async fn corrupt_asset_is_reported_by_batch_and_audit() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = Arc::new(JsonFileStorage::new(dir.path()));

    for n in 0..3 {
        let asset = Asset::new(format!("chip-{n}"), AssetKind::Chip);
        storage.save_asset(&asset).await?;
        storage
            .append_periods(
                &asset.id,
                &[AssociationPeriod::closed(asset.id.clone(), d(2024, 1, 1), d(2024, 1, 4))],
            )
            .await?;
    }
    let bad = write_corrupt_asset(
        &dir,
        "chip-bad",
        r#"{"id":"chip-bad","label":"chip-bad","rented_days":-1}"#,
    )?;

    let service = AccrualService::from_storage(storage.clone());
    let ctx = InvocationContext::system();
    let summary = service.update_all(&ctx, &CancellationToken::new()).await;

    assert_eq!(summary.total_processed, 4);
    assert_eq!(summary.total_updated, 3);
    assert_eq!(summary.total_errors, 1);
    assert_eq!(summary.errors[0].asset_id.as_ref(), Some(&bad));
    assert_eq!(summary.errors[0].kind, ErrorKind::Lookup);

    let ids = storage.list_active_asset_ids().await?;
    let audit = service.audit(&ctx, &ids).await;
    let bad_check = audit
        .iter()
        .find(|check| check.asset_id == bad)
        .expect("corrupt asset should be audited");
    assert!(!bad_check.is_consistent);
    assert_eq!(bad_check.current_rented_days, None);

    Ok(())
}

#[tokio::test]
async fn load_asset_overrides_mismatched_id() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = JsonFileStorage::new(dir.path());

    let dir_id = Id::new();
    let asset = Asset::new_with(Id::from_string("copied-id"), "Chip", AssetKind::Chip);
    let asset_dir = dir.path().join("assets").join(dir_id.as_str());
    std::fs::create_dir_all(&asset_dir)?;
    std::fs::write(
        asset_dir.join("asset.json"),
        serde_json::to_string_pretty(&asset)?,
    )?;

    let loaded = storage.get_asset(&dir_id).await?.expect("asset should load");
    assert_eq!(loaded.id, dir_id);

    Ok(())
}

#[tokio::test]
async fn unsafe_ids_are_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = JsonFileStorage::new(dir.path());

    let err = storage
        .get_asset(&Id::from_string("../escape"))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unsafe asset id"));

    Ok(())
}

#[tokio::test]
async fn compare_and_set_persists_only_on_match() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = JsonFileStorage::new(dir.path());
    let asset = Asset::new("Chip", AssetKind::Chip).with_rented_days(3);
    storage.save_asset(&asset).await?;

    assert!(!storage.compare_and_set_rented_days(&asset.id, 2, 9).await?);
    assert!(storage.compare_and_set_rented_days(&asset.id, 3, 9).await?);

    let reopened = JsonFileStorage::new(dir.path());
    assert_eq!(reopened.get_asset(&asset.id).await?.unwrap().rented_days, 9);
    assert!(!dir
        .path()
        .join("assets")
        .join(asset.id.as_str())
        .join("asset.json.tmp")
        .exists());

    Ok(())
}

#[tokio::test]
async fn periods_round_trip_through_jsonl() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = JsonFileStorage::new(dir.path());
    let asset = Asset::new("Router", AssetKind::Router);
    storage.save_asset(&asset).await?;

    let closed = AssociationPeriod::closed(asset.id.clone(), d(2024, 1, 1), d(2024, 1, 5))
        .with_client(Id::from_string("client-7"));
    let open = AssociationPeriod::open(asset.id.clone(), d(2024, 2, 1));
    storage.append_periods(&asset.id, &[closed.clone()]).await?;
    storage.append_periods(&asset.id, &[open.clone()]).await?;

    let periods = storage.list_periods_for_asset(&asset.id).await?;
    assert_eq!(periods, vec![closed, open]);

    Ok(())
}

#[tokio::test]
async fn reconcile_end_to_end_on_disk() -> Result<()> {
    let dir = TempDir::new()?;
    let storage = Arc::new(JsonFileStorage::new(dir.path()));

    let asset = Asset::new("8955-0001", AssetKind::Chip).with_historical_days(30);
    storage.save_asset(&asset).await?;
    storage
        .append_periods(
            &asset.id,
            &[
                AssociationPeriod::closed(asset.id.clone(), d(2024, 1, 1), d(2024, 1, 10)),
                AssociationPeriod::closed(asset.id.clone(), d(2024, 1, 5), d(2024, 1, 15)),
                AssociationPeriod::open(asset.id.clone(), d(2024, 3, 1)),
            ],
        )
        .await?;

    let service = AccrualService::from_storage(storage.clone());
    let ctx = InvocationContext::system();
    let summary = service.update_all(&ctx, &CancellationToken::new()).await;
    assert_eq!(summary.total_processed, 1);
    assert_eq!(summary.total_updated, 1);

    let stored = storage.get_asset(&asset.id).await?.unwrap();
    assert_eq!(stored.rented_days, 45);
    assert_eq!(stored.historical_days, 30);

    let audit = service.audit(&ctx, &[asset.id.clone()]).await;
    assert!(audit[0].is_consistent);

    Ok(())
}
