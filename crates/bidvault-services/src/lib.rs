//! Bidvault Services Layer
//!
//! Business services of the sealed-bid vault: the upload token issuer, the
//! download gate, the storage-event sealer, the per-slot status view and the
//! administrator review. Handlers in `bidvault-api` stay thin and call into
//! [`GateServices`].

pub mod audit;
pub mod context;
pub mod gate;
pub mod issuer;
pub mod retry;
pub mod review;
pub mod sealer;
pub mod status;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use context::{Caller, Stores};
pub use gate::{DownloadGate, OpenedSubmission};
pub use issuer::{IssuedUpload, UploadRequest, UploadTokenIssuer};
pub use retry::RetryPolicy;
pub use review::SubmissionReview;
pub use sealer::{SealReport, StorageEventNotification, SubmissionSealer};
pub use status::{SubmissionState, SubmissionStatus, SubmissionStatusService};

use bidvault_core::store::RoleStore;
use bidvault_core::{Clock, GateConfig};
use bidvault_storage::Presigner;
use std::sync::Arc;
use std::time::Duration;

/// All services, wired to one set of stores, one presigner and one clock.
pub struct GateServices {
    pub issuer: UploadTokenIssuer,
    pub gate: DownloadGate,
    pub sealer: SubmissionSealer,
    pub status: SubmissionStatusService,
    pub review: SubmissionReview,
    pub roles: Arc<dyn RoleStore>,
}

impl GateServices {
    pub fn new(
        stores: Stores,
        presigner: Arc<dyn Presigner>,
        clock: Arc<dyn Clock>,
        config: &GateConfig,
    ) -> Self {
        Self::with_retry(stores, presigner, clock, config, RetryPolicy::default())
    }

    pub fn with_retry(
        stores: Stores,
        presigner: Arc<dyn Presigner>,
        clock: Arc<dyn Clock>,
        config: &GateConfig,
        retry: RetryPolicy,
    ) -> Self {
        let issuer = UploadTokenIssuer::new(
            stores.rfps.clone(),
            stores.vendors.clone(),
            stores.tokens.clone(),
            stores.submissions.clone(),
            presigner.clone(),
            clock.clone(),
            Duration::from_secs(config.upload_url_ttl_secs),
        )
        .with_retry(retry);

        let gate = DownloadGate::new(
            stores.rfps.clone(),
            stores.submissions.clone(),
            presigner.clone(),
            clock.clone(),
            Duration::from_secs(config.download_url_ttl_secs),
        )
        .with_retry(retry);

        let sealer = SubmissionSealer::new(
            stores.vendors.clone(),
            stores.submissions.clone(),
            clock.clone(),
            presigner.bucket(),
        );

        let status = SubmissionStatusService::new(
            stores.rfps.clone(),
            stores.vendors.clone(),
            stores.tokens.clone(),
            stores.submissions.clone(),
            clock,
        );

        let review = SubmissionReview::new(stores.rfps, stores.submissions, stores.access_log);

        Self {
            issuer,
            gate,
            sealer,
            status,
            review,
            roles: stores.roles,
        }
    }
}
