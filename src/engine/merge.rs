//! Merge
//!
//! Pushes the anonymous cart into the remote cart after sign-in. Every line is sent as its
//! own request and all requests are awaited together; one failure never stops the others.

use futures_util::future::join_all;
use smallvec::SmallVec;
use tracing::{debug, warn};

use crate::{
    gateway::{CartGateway, GatewayError},
    lines::{CartLine, VariantId},
};

/// A local line the remote cart refused during a merge. The line is not retried.
#[derive(Debug)]
pub struct MergeLineFailure {
    /// Variant of the dropped line.
    pub variant: VariantId,

    /// Quantity of the dropped line.
    pub quantity: u32,

    /// Why the remote cart refused it.
    pub error: GatewayError,
}

/// Outcome of a sign-in merge.
#[derive(Debug, Default)]
pub struct MergeReport {
    pub(crate) merged: SmallVec<[VariantId; 8]>,
    pub(crate) failed: Vec<MergeLineFailure>,
    pub(crate) fetch_error: Option<GatewayError>,
}

impl MergeReport {
    /// Variants added to the remote cart.
    pub fn merged(&self) -> &[VariantId] {
        &self.merged
    }

    /// Local lines that were dropped.
    pub fn failed(&self) -> &[MergeLineFailure] {
        &self.failed
    }

    /// Error of the authoritative fetch that follows the merge, if it failed.
    pub fn fetch_error(&self) -> Option<&GatewayError> {
        self.fetch_error.as_ref()
    }

    /// Whether every line merged and the remote cart was fetched.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.fetch_error.is_none()
    }
}

pub(crate) async fn push_lines(gateway: &dyn CartGateway, lines: &[CartLine]) -> MergeReport {
    let requests = lines.iter().map(|line| async move {
        let variant = line.variant_id();
        let quantity = line.quantity();

        (variant, quantity, gateway.add_item(variant, quantity).await)
    });

    let mut report = MergeReport::default();

    for (variant, quantity, result) in join_all(requests).await {
        match result {
            Ok(_) => {
                debug!(%variant, quantity, "merged local line");

                report.merged.push(variant);
            }
            Err(error) => {
                warn!(%variant, quantity, %error, "dropping local line that failed to merge");

                report.failed.push(MergeLineFailure {
                    variant,
                    quantity,
                    error,
                });
            }
        }
    }

    report
}
