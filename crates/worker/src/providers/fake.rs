//! Fake provider: no external I/O, used for tests and local development.
//! Deterministically fails ~5% of calls with `ServiceUnavailable` so the
//! retry path gets exercised without a real backend.

use async_trait::async_trait;
use notifyd_core::{FailureCategory, Provider, SendOutcome, SendRequest};
use rand::Rng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const FAILURE_RATE: f64 = 0.05;

pub struct FakeProvider;

#[async_trait]
impl Provider for FakeProvider {
    fn name(&self) -> &str {
        "fake"
    }

    async fn send(&self, request: SendRequest<'_>, _cancel: &CancellationToken) -> SendOutcome {
        let roll: f64 = rand::rng().random_range(0.0..1.0);
        if roll < FAILURE_RATE {
            warn!(token = request.device_token, "fake provider injecting failure");
            return SendOutcome::fail("fake provider unavailable", FailureCategory::ServiceUnavailable);
        }

        debug!(
            token = request.device_token,
            title = request.title,
            "fake provider delivered notification"
        );
        SendOutcome::Ok
    }
}
