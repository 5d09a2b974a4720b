//! Behaviour reconciliation.
//!
//! One pass brings the caller's view of a station's rules up to date:
//!
//! 1. fetch the remote `(index, hash)` listing
//! 2. [`classify`] local rules against it
//! 3. fetch each unknown entry, one request at a time
//! 4. return kept rules followed by fetched ones
//!
//! A pass either completes or fails as a whole. The caller's rules are
//! never modified; the outcome is built from copies.

use std::future::Future;

use serde::Serialize;
use station_metrics::{metric_defs, metrics};
use tracing::{debug, info, warn};

use crate::behaviour::Behaviour;
use crate::client::StationClient;
use crate::error::ClientError;
use crate::index::RemoteIndexEntry;
use crate::transport::Transport;

/// Result of comparing local rules to the remote index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    /// Rules already present on the station, with their remote index.
    pub kept: Vec<Behaviour>,
    /// Rules with no index that the station does not hold.
    pub pending_upload: Vec<Behaviour>,
    /// Remote entries no local rule accounts for.
    pub to_fetch: Vec<RemoteIndexEntry>,
}

impl SyncPlan {
    pub fn is_synchronized(&self) -> bool {
        self.pending_upload.is_empty() && self.to_fetch.is_empty()
    }
}

/// Classify `local` rules against the `remote` index.
///
/// Unindexed rules start out pending. Each remote entry claims the first
/// unclaimed local rule with the same hash, which is kept under the entry's
/// index; an unindexed rule claimed this way is no longer pending. An entry
/// whose hash only matches already-claimed rules reuses that content and is
/// kept as well. Entries matching no local rule are fetched. Indexed rules no
/// entry claims are gone from the station and are dropped.
pub fn classify(local: &[Behaviour], remote: &[RemoteIndexEntry]) -> SyncPlan {
    let hashes: Vec<u32> = local.iter().map(Behaviour::hash).collect();
    let mut claimed = vec![false; local.len()];
    let mut plan = SyncPlan::default();

    for entry in remote {
        let unclaimed = (0..local.len()).find(|&i| !claimed[i] && hashes[i] == entry.hash);
        if let Some(i) = unclaimed {
            claimed[i] = true;
        }
        match unclaimed.or_else(|| hashes.iter().position(|&hash| hash == entry.hash)) {
            Some(i) => plan.kept.push(Behaviour::with_index(
                entry.index,
                local[i].payload.clone(),
            )),
            None => plan.to_fetch.push(*entry),
        }
    }

    for (behaviour, claimed) in local.iter().zip(&claimed) {
        if *claimed {
            continue;
        }
        match behaviour.index {
            None => plan.pending_upload.push(behaviour.clone()),
            Some(index) => debug!(index, "dropping behaviour no longer on station"),
        }
    }

    plan
}

/// Result of a completed pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub kept: Vec<Behaviour>,
    pub pending_upload: Vec<Behaviour>,
    pub fetched: Vec<Behaviour>,
}

impl SyncOutcome {
    pub fn len(&self) -> usize {
        self.kept.len() + self.pending_upload.len() + self.fetched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kept rules (synchronized, then pending upload) followed by fetched ones.
    pub fn into_behaviours(self) -> Vec<Behaviour> {
        let mut all = self.kept;
        all.extend(self.pending_upload);
        all.extend(self.fetched);
        all
    }
}

/// Drives reconciliation passes over a client.
pub struct Reconciler<'a, T: Transport> {
    client: &'a StationClient<T>,
}

impl<'a, T: Transport> Reconciler<'a, T> {
    pub fn new(client: &'a StationClient<T>) -> Self {
        Reconciler { client }
    }

    /// Run one pass.
    ///
    /// Any failure, including a timed-out step, aborts the pass and nothing
    /// fetched so far is returned.
    pub async fn reconcile(&self, local: &[Behaviour]) -> Result<SyncOutcome, ClientError> {
        let outcome = self.run(local).await;
        match &outcome {
            Ok(outcome) => {
                metrics::counter!(metric_defs::RECONCILE_PASSES.name).increment(1);
                metrics::gauge!(metric_defs::RECONCILE_PENDING.name)
                    .set(outcome.pending_upload.len() as f64);
                info!(
                    kept = outcome.kept.len(),
                    pending = outcome.pending_upload.len(),
                    fetched = outcome.fetched.len(),
                    "reconciliation complete"
                );
            }
            Err(e) => {
                metrics::counter!(metric_defs::RECONCILE_FAILURES.name).increment(1);
                warn!(error = %e, "reconciliation failed");
            }
        }
        outcome
    }

    /// Run one pass, abandoning it if `cancel` completes first.
    pub async fn reconcile_until<F>(
        &self,
        local: &[Behaviour],
        cancel: F,
    ) -> Result<SyncOutcome, ClientError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            outcome = self.reconcile(local) => outcome,
            _ = cancel => {
                metrics::counter!(metric_defs::RECONCILE_FAILURES.name).increment(1);
                info!("reconciliation cancelled");
                Err(ClientError::Cancelled)
            }
        }
    }

    async fn run(&self, local: &[Behaviour]) -> Result<SyncOutcome, ClientError> {
        let remote = self.client.get_behaviour_indices().await?;
        let plan = classify(local, &remote);
        debug!(
            remote = remote.len(),
            kept = plan.kept.len(),
            pending = plan.pending_upload.len(),
            to_fetch = plan.to_fetch.len(),
            "classified behaviours"
        );

        let mut fetched = Vec::with_capacity(plan.to_fetch.len());
        for entry in &plan.to_fetch {
            let behaviour = self.client.get_behaviour(entry.index).await?;
            metrics::counter!(metric_defs::RECONCILE_FETCHES.name).increment(1);
            if behaviour.hash() != entry.hash {
                warn!(
                    index = entry.index,
                    expected = entry.hash,
                    actual = behaviour.hash(),
                    "fetched behaviour hash differs from index"
                );
            }
            fetched.push(behaviour);
        }

        Ok(SyncOutcome {
            kept: plan.kept,
            pending_upload: plan.pending_upload,
            fetched,
        })
    }
}
