use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::error::ErrorKind;
use super::models::{AssetFailure, BatchSummary, InvocationContext};
use super::service::AccrualService;

impl AccrualService {
    /// Recompute every active asset.
    ///
    /// Per-asset failures are collected in the summary and never abort the
    /// run. Cancelling `cancel` stops new assets from starting; assets already
    /// in flight finish normally.
    pub async fn update_all(
        &self,
        ctx: &InvocationContext,
        cancel: &CancellationToken,
    ) -> BatchSummary {
        let mut summary = BatchSummary::new(self.clock.now());

        let ids = match self.assets.list_active_asset_ids().await {
            Ok(ids) => ids,
            Err(err) => {
                error!(actor = %ctx.actor, error = %format!("{err:#}"), "failed to list active assets");
                summary.record_failure(AssetFailure {
                    asset_id: None,
                    kind: ErrorKind::Lookup,
                    message: format!("failed to list active assets: {err:#}"),
                });
                return summary;
            }
        };

        info!(
            actor = %ctx.actor,
            assets = ids.len(),
            concurrency = self.concurrency,
            "starting rented days reconciliation"
        );

        let mut outcomes = stream::iter(ids)
            .map(|id| async move {
                if cancel.is_cancelled() {
                    return None;
                }
                Some(self.update_one(ctx, &id).await)
            })
            .buffer_unordered(self.concurrency);

        while let Some(outcome) = outcomes.next().await {
            match outcome {
                Some(Err(err)) => {
                    warn!(
                        asset_id = %err.asset_id(),
                        kind = ?err.kind(),
                        error = %err,
                        "asset update failed; continuing"
                    );
                    summary.record(Err(err));
                }
                Some(ok) => summary.record(ok),
                None => summary.cancelled = true,
            }
        }

        info!(
            actor = %ctx.actor,
            processed = summary.total_processed,
            updated = summary.total_updated,
            errors = summary.total_errors,
            regressions_prevented = summary.total_regressions_prevented,
            cancelled = summary.cancelled,
            "finished rented days reconciliation"
        );

        summary
    }
}
