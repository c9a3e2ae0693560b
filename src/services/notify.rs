//! Notification gating and the delivery seam.

use thiserror::Error;

use crate::models::RideStatusKind;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification delivery failed: {0}")]
    DeliveryFailed(String),
}

/// Decide whether a genuine status transition should reach the user.
///
/// Policy: the park must be favorited, and then either the ride itself is
/// favorited or the user opted into chatty notifications for everything in
/// their favorite parks. Pure function of its inputs; all state is passed in.
pub fn should_notify(ride_favorited: bool, park_favorited: bool, chatty: bool) -> bool {
    park_favorited && (ride_favorited || chatty)
}

/// Delivery collaborator for user-facing notifications. Fire-and-forget from
/// the engine's perspective: a failed delivery is logged and never retried.
pub trait Notifier: Send + Sync {
    fn notify(
        &self,
        ride_name: &str,
        new_status: RideStatusKind,
        ride_id: &str,
        park_name: &str,
    ) -> Result<(), NotifyError>;
}

/// Default delivery: a structured log line. OS-level banner scheduling sits
/// behind this trait in deployments that have it.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(
        &self,
        ride_name: &str,
        new_status: RideStatusKind,
        ride_id: &str,
        park_name: &str,
    ) -> Result<(), NotifyError> {
        tracing::info!(
            ride = ride_name,
            ride_id,
            park = park_name,
            status = %new_status,
            "ride status notification"
        );
        Ok(())
    }
}
