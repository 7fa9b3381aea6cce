use std::cmp::Ordering;

use tracing::{info, warn};

use crate::models::Id;

use super::models::{IntegrityCheckResult, InvocationContext};
use super::service::AccrualService;

impl AccrualService {
    /// Recompute each sampled asset and compare against what is stored.
    ///
    /// Never writes. Assets that cannot be loaded are reported as inconsistent.
    pub async fn audit(
        &self,
        ctx: &InvocationContext,
        sample_ids: &[Id],
    ) -> Vec<IntegrityCheckResult> {
        let mut results = Vec::with_capacity(sample_ids.len());

        for asset_id in sample_ids {
            let check = match self.recompute(asset_id).await {
                Ok(recomputed) => {
                    let stored = recomputed.asset.rented_days;
                    let expected = recomputed.totals.total_days;
                    let mut message = match stored.cmp(&expected) {
                        Ordering::Equal => "stored value matches recomputed total".to_string(),
                        Ordering::Less => format!(
                            "stored value {stored} is {} days below recomputed total {expected}; update pending",
                            expected - stored
                        ),
                        Ordering::Greater => format!(
                            "stored value {stored} exceeds recomputed total {expected} by {} days; floor preserved or edited out of band",
                            stored - expected
                        ),
                    };
                    let malformed = recomputed.normalized.malformed.len();
                    if malformed > 0 {
                        message.push_str(&format!("; {malformed} malformed period(s) skipped"));
                    }

                    IntegrityCheckResult {
                        asset_id: asset_id.clone(),
                        current_rented_days: Some(stored),
                        calculated_days: Some(expected),
                        is_consistent: stored == expected,
                        message,
                    }
                }
                Err(err) => IntegrityCheckResult {
                    asset_id: asset_id.clone(),
                    current_rented_days: None,
                    calculated_days: None,
                    is_consistent: false,
                    message: err.to_string(),
                },
            };

            if !check.is_consistent {
                warn!(asset_id = %asset_id, message = %check.message, "integrity check failed");
            }
            results.push(check);
        }

        info!(
            actor = %ctx.actor,
            sampled = results.len(),
            inconsistent = results.iter().filter(|r| !r.is_consistent).count(),
            "integrity audit finished"
        );

        results
    }
}
