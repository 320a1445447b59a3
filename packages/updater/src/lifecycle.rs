//! Upload, activation and retention for the console's certificate store
//!
//! A run converges the store on the desired certificate:
//!
//! 1. fingerprint the desired certificate and look for it in the store
//! 2. upload it, named by its fingerprint, unless an identical one exists
//! 3. activate it unless it already is, then confirm by re-listing
//! 4. delete the oldest inactive certificates until the store is at the cap
//!
//! The decision for a snapshot is computed by [`plan`] without side effects.

use std::time::SystemTime;

use tracing::{debug, info, warn};
use unicert_fingerprint::Fingerprinter;
use unicert_unifi::{CertificateRecord, CertificateStore};

use crate::error::{Result, UpdaterError};
use crate::secret::CertificateBundle;

/// Retention cap used when none is configured
pub const DEFAULT_MAX_CERTIFICATES: usize = 5;

/// Effective retention cap; zero selects the default
#[must_use]
pub const fn retention_limit(configured: usize) -> usize {
    if configured == 0 {
        DEFAULT_MAX_CERTIFICATES
    } else {
        configured
    }
}

/// Where the target certificate comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The store already holds a certificate with the same fingerprint
    Reuse {
        /// Identifier of the stored copy
        id: String,
    },
    /// The certificate has to be uploaded
    Upload,
}

/// Whether the target needs an explicit activation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The target is the active certificate
    AlreadyActive,
    /// Another certificate, or none, is active
    Needed,
}

/// Deletion candidates, oldest `valid_from` first
///
/// Candidates are walked in order until `excess` deletions succeed; failed
/// deletions do not count.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrunePlan {
    /// Certificates above the cap
    pub excess: usize,
    /// Inactive certificate identifiers, oldest first
    pub candidates: Vec<String>,
}

impl PrunePlan {
    /// Plan deletions for `records`, never listing `protected`
    ///
    /// `pending` counts certificates about to be added that are not in
    /// `records` yet.
    #[must_use]
    pub fn for_records(
        records: &[CertificateRecord],
        protected: Option<&str>,
        pending: usize,
        limit: usize,
    ) -> Self {
        let limit = limit.max(1);
        let excess = (records.len() + pending).saturating_sub(limit);
        if excess == 0 {
            return Self::default();
        }

        let mut sorted: Vec<&CertificateRecord> = records.iter().collect();
        // Stable: records sharing a start date keep the store's order.
        sorted.sort_by_key(|record| record.valid_from);

        let candidates = sorted
            .into_iter()
            .filter(|record| Some(record.id.as_str()) != protected)
            .map(|record| record.id.clone())
            .collect();

        Self { excess, candidates }
    }

    /// Whether nothing needs deleting
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.excess == 0
    }
}

/// What a run does for one store snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleDecision {
    /// Reuse or upload
    pub resolution: Resolution,
    /// Activation requirement for the target
    pub activation: Activation,
    /// Retention work once the target is active
    pub prune: PrunePlan,
}

/// Decide what to do for `records` given the desired `fingerprint`
///
/// The prune plan assumes the run succeeds: an upload adds one certificate and
/// the target ends up as the only active one.
#[must_use]
pub fn plan(records: &[CertificateRecord], fingerprint: &str, max_certificates: usize) -> LifecycleDecision {
    let limit = retention_limit(max_certificates);

    match find_by_fingerprint(records, fingerprint) {
        Some(existing) => LifecycleDecision {
            resolution: Resolution::Reuse {
                id: existing.id.clone(),
            },
            activation: activation_for(records, &existing.id),
            prune: PrunePlan::for_records(records, Some(&existing.id), 0, limit),
        },
        None => LifecycleDecision {
            resolution: Resolution::Upload,
            activation: Activation::Needed,
            prune: PrunePlan::for_records(records, None, 1, limit),
        },
    }
}

fn find_by_fingerprint<'a>(
    records: &'a [CertificateRecord],
    fingerprint: &str,
) -> Option<&'a CertificateRecord> {
    records.iter().find(|record| record.fingerprint == fingerprint)
}

/// Only a store reporting the target as its sole active record needs nothing
fn activation_for(records: &[CertificateRecord], target: &str) -> Activation {
    if active_ids(records) == [target] {
        Activation::AlreadyActive
    } else {
        Activation::Needed
    }
}

fn active_ids(records: &[CertificateRecord]) -> Vec<&str> {
    records
        .iter()
        .filter(|record| record.active)
        .map(|record| record.id.as_str())
        .collect()
}

fn verify_activation(records: &[CertificateRecord], target: &str) -> Result<()> {
    let active = active_ids(records);
    if active == [target] {
        return Ok(());
    }

    Err(UpdaterError::ActivationAnomaly {
        expected: target.to_string(),
        active: active.into_iter().map(str::to_string).collect(),
    })
}

/// Outcome of [`Updater::run`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Fingerprint of the desired certificate
    pub fingerprint: String,
    /// Subject of the desired certificate
    pub subject: String,
    /// End of the desired certificate's validity
    pub not_after: SystemTime,
    /// Identifier of the certificate that is now active
    pub target_id: String,
    /// Decisions taken during the run
    pub decision: LifecycleDecision,
    /// A new certificate was uploaded
    pub uploaded: bool,
    /// `activate` was called
    pub activated: bool,
    /// Certificates removed by retention
    pub deleted: Vec<String>,
    /// Certificates whose deletion failed; the run still succeeds
    pub failed_deletes: Vec<String>,
}

/// Drives a [`CertificateStore`] towards the desired certificate
#[derive(Debug, Clone)]
pub struct Updater {
    fingerprinter: Fingerprinter,
    max_certificates: usize,
}

impl Default for Updater {
    fn default() -> Self {
        Self::new(Fingerprinter::default(), DEFAULT_MAX_CERTIFICATES)
    }
}

impl Updater {
    /// Updater keeping at most `max_certificates` (0 selects the default)
    #[must_use]
    pub fn new(fingerprinter: Fingerprinter, max_certificates: usize) -> Self {
        Self {
            fingerprinter,
            max_certificates: retention_limit(max_certificates),
        }
    }

    /// Effective retention cap
    #[must_use]
    pub fn max_certificates(&self) -> usize {
        self.max_certificates
    }

    /// Compute the decision for the store's current contents without changing it
    ///
    /// # Errors
    ///
    /// Returns an error if listing fails or the certificate cannot be fingerprinted.
    pub async fn preview<S>(&self, store: &mut S, bundle: &CertificateBundle) -> Result<LifecycleDecision>
    where
        S: CertificateStore + ?Sized,
    {
        let records = store.list().await?;
        let fingerprint = self.fingerprinter.fingerprint(&bundle.certificate_pem)?;
        Ok(plan(&records, &fingerprint, self.max_certificates))
    }

    /// Upload, activate and prune
    ///
    /// # Errors
    ///
    /// Listing, fingerprinting, upload and activation failures end the run, as
    /// does a store that does not report the target as its only active
    /// certificate afterwards. Failed deletions are logged and reported, not
    /// returned.
    pub async fn run<S>(&self, store: &mut S, bundle: &CertificateBundle) -> Result<RunReport>
    where
        S: CertificateStore + ?Sized,
    {
        let records = store.list().await?;
        info!(count = records.len(), "Existing certificates fetched");

        let summary = self.fingerprinter.summarize(&bundle.certificate_pem)?;
        let fingerprint = summary.fingerprint.clone();
        info!(
            %fingerprint,
            algorithm = %self.fingerprinter.algorithm(),
            subject = %summary.subject,
            "Desired certificate fingerprint"
        );
        match summary.not_after.duration_since(SystemTime::now()) {
            Ok(remaining) => info!(days = remaining.as_secs() / 86_400, "Days until the desired certificate expires"),
            Err(_) => warn!(subject = %summary.subject, "Desired certificate has already expired"),
        }

        let mut decision = plan(&records, &fingerprint, self.max_certificates);

        let (target_id, uploaded) = match &decision.resolution {
            Resolution::Reuse { id } => {
                info!(id = %id, "Certificate with the same fingerprint already exists");
                (id.clone(), false)
            }
            Resolution::Upload => {
                info!("No matching certificate found, uploading");
                let created = store
                    .create(&fingerprint, &bundle.certificate_pem, &bundle.key_pem)
                    .await?;
                (created.id, true)
            }
        };

        let snapshot = (!uploaded).then_some(records);
        decision.activation = self.ensure_active(store, &target_id, snapshot).await?;
        let activated = decision.activation == Activation::Needed;

        let remaining = store.list().await?;
        decision.prune = self.prune_plan(&remaining);
        let (deleted, failed_deletes) = prune(store, &decision.prune).await;

        Ok(RunReport {
            fingerprint,
            subject: summary.subject,
            not_after: summary.not_after,
            target_id,
            decision,
            uploaded,
            activated,
            deleted,
            failed_deletes,
        })
    }

    /// Make `target` the active certificate and confirm it
    ///
    /// `snapshot` is reused when it is still current, i.e. nothing was uploaded.
    async fn ensure_active<S>(
        &self,
        store: &mut S,
        target: &str,
        snapshot: Option<Vec<CertificateRecord>>,
    ) -> Result<Activation>
    where
        S: CertificateStore + ?Sized,
    {
        let records = match snapshot {
            Some(records) => records,
            None => store.list().await?,
        };

        let activation = activation_for(&records, target);
        match activation {
            Activation::AlreadyActive => {
                info!(id = target, "Certificate is already active");
                verify_activation(&records, target)?;
            }
            Activation::Needed => {
                for other in active_ids(&records).into_iter().filter(|id| *id != target) {
                    warn!(id = other, "A different certificate is active");
                }
                store.activate(target).await?;
                verify_activation(&store.list().await?, target)?;
                info!(id = target, "Certificate activated");
            }
        }

        Ok(activation)
    }

    fn prune_plan(&self, records: &[CertificateRecord]) -> PrunePlan {
        let active = active_ids(records).first().map(|id| (*id).to_string());
        let plan = PrunePlan::for_records(records, active.as_deref(), 0, self.max_certificates);

        if plan.is_empty() {
            info!(
                current_count = records.len(),
                max_count = self.max_certificates,
                "No excess certificates to delete"
            );
        } else {
            warn!(
                excess = plan.excess,
                max_count = self.max_certificates,
                "Deleting excess certificates"
            );
        }
        plan
    }
}

/// Walk the candidates oldest first until `excess` deletions succeed
async fn prune<S>(store: &mut S, plan: &PrunePlan) -> (Vec<String>, Vec<String>)
where
    S: CertificateStore + ?Sized,
{
    let mut deleted = Vec::new();
    let mut failed = Vec::new();

    for id in &plan.candidates {
        if deleted.len() == plan.excess {
            break;
        }

        match store.delete(id).await {
            Ok(()) => {
                debug!(id = %id, "Deleted excess certificate");
                deleted.push(id.clone());
            }
            Err(e) => {
                warn!(id = %id, error = %e, "Failed to delete certificate");
                failed.push(id.clone());
            }
        }
    }

    if deleted.len() < plan.excess {
        warn!(
            remaining = plan.excess - deleted.len(),
            "Retention cap not reached, no more deletable certificates"
        );
    }

    (deleted, failed)
}
