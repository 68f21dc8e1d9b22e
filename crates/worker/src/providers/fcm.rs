//! Firebase-style (FCM) push provider: bearer-token auth, JSON payload.
//! No token caching is needed here — the server key is a static secret,
//! not a short-lived credential like WNS's OAuth2 token.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use notifyd_core::config::FcmConfig;
use notifyd_core::{FailureCategory, Provider, SendOutcome, SendRequest};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

const SEND_TIMEOUT: Duration = Duration::from_secs(30);

pub struct FcmProvider {
    config: FcmConfig,
    http: reqwest::Client,
}

#[derive(Serialize)]
struct FcmEnvelope<'a> {
    message: FcmMessage<'a>,
}

#[derive(Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    data: &'a HashMap<String, String>,
}

#[derive(Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

impl FcmProvider {
    pub fn new(config: FcmConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.config.project_id
        )
    }
}

#[async_trait]
impl Provider for FcmProvider {
    fn name(&self) -> &str {
        "fcm"
    }

    async fn send(&self, request: SendRequest<'_>, cancel: &CancellationToken) -> SendOutcome {
        let envelope = FcmEnvelope {
            message: FcmMessage {
                token: request.device_token,
                notification: FcmNotification {
                    title: request.title,
                    body: request.body,
                },
                data: request.data,
            },
        };

        let call = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.config.server_key)
            .timeout(SEND_TIMEOUT)
            .json(&envelope)
            .send();

        let resp = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                return SendOutcome::fail("cancelled mid-flight", FailureCategory::Unknown);
            }
            result = call => result,
        };

        match resp {
            Ok(resp) if resp.status().is_success() => SendOutcome::Ok,
            Ok(resp) => {
                let status = resp.status().as_u16();
                let category = FailureCategory::from_status(status);
                warn!(status, "FCM send rejected");
                SendOutcome::fail_with_code(format!("FCM returned status {status}"), status, category)
            }
            Err(e) => {
                error!(error = %e, "FCM send transport failure");
                SendOutcome::fail(format!("FCM transport error: {e}"), FailureCategory::NetworkError)
            }
        }
    }
}
