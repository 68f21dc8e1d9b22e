//! Windows Push Notification Service provider.
//!
//! Authenticates via OAuth2 client-credentials against Entra ID, caching
//! the bearer token and refreshing it proactively (>=5 minutes before
//! expiry). The refresh is "refresh-once, read-many": concurrent senders
//! either observe the still-valid cached token or block briefly behind
//! the single in-flight refresh, never triggering a second one.

use std::io::Cursor;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use notifyd_core::config::WnsConfig;
use notifyd_core::{FailureCategory, Provider, SendOutcome, SendRequest};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

const REFRESH_SKEW: chrono::Duration = chrono::Duration::minutes(5);
const SEND_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

pub struct WnsProvider {
    config: WnsConfig,
    http: reqwest::Client,
    token: RwLock<Option<CachedToken>>,
}

impl WnsProvider {
    pub fn new(config: WnsConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
            token: RwLock::new(None),
        }
    }

    fn token_endpoint(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.config.tenant_id
        )
    }

    async fn bearer_token(&self) -> Result<String, SendOutcome> {
        if let Some(tok) = self.valid_cached_token().await {
            return Ok(tok);
        }

        let mut guard = self.token.write().await;
        if let Some(tok) = guard.as_ref().filter(|t| !Self::needs_refresh(t)) {
            return Ok(tok.access_token.clone());
        }

        let resp = self
            .http
            .post(self.token_endpoint())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("scope", "https://wns.windows.net/.default"),
            ])
            .send()
            .await
            .map_err(|e| {
                SendOutcome::fail(format!("WNS token request failed: {e}"), FailureCategory::NetworkError)
            })?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SendOutcome::fail_with_code(
                format!("WNS token endpoint returned {status}"),
                status.as_u16(),
                FailureCategory::from_status(status.as_u16()),
            ));
        }

        let body: TokenResponse = resp.json().await.map_err(|e| {
            SendOutcome::fail(format!("WNS token response malformed: {e}"), FailureCategory::Unknown)
        })?;

        let cached = CachedToken {
            access_token: body.access_token.clone(),
            expires_at: Utc::now() + chrono::Duration::seconds(body.expires_in),
        };
        *guard = Some(cached);
        Ok(body.access_token)
    }

    async fn valid_cached_token(&self) -> Option<String> {
        let guard = self.token.read().await;
        guard
            .as_ref()
            .filter(|t| !Self::needs_refresh(t))
            .map(|t| t.access_token.clone())
    }

    fn needs_refresh(token: &CachedToken) -> bool {
        Utc::now() + REFRESH_SKEW >= token.expires_at
    }
}

#[async_trait]
impl Provider for WnsProvider {
    fn name(&self) -> &str {
        "wns"
    }

    async fn send(&self, request: SendRequest<'_>, cancel: &CancellationToken) -> SendOutcome {
        let token = match self.bearer_token().await {
            Ok(t) => t,
            Err(outcome) => return outcome,
        };

        let payload = toast_xml(request.title, request.body);

        let call = self
            .http
            .post(request.device_token)
            .bearer_auth(token)
            .header("X-WNS-Type", "wns/toast")
            .header("Content-Type", "text/xml")
            .timeout(SEND_TIMEOUT)
            .body(payload)
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
                warn!(status, "WNS send rejected");
                SendOutcome::fail_with_code(format!("WNS returned status {status}"), status, category)
            }
            Err(e) => {
                error!(error = %e, "WNS send transport failure");
                SendOutcome::fail(format!("WNS transport error: {e}"), FailureCategory::NetworkError)
            }
        }
    }
}

/// Builds a minimal `<toast>` XML payload, escaping `title`/`body` so
/// neither can inject markup into the notification payload.
fn toast_xml(title: &str, body: &str) -> Vec<u8> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));

    writer.write_event(Event::Start(BytesStart::new("toast"))).unwrap();
    writer.write_event(Event::Start(BytesStart::new("visual"))).unwrap();
    writer
        .write_event(Event::Start(BytesStart::new("binding").with_attributes([("template", "ToastGeneric")])))
        .unwrap();

    writer.write_event(Event::Start(BytesStart::new("text"))).unwrap();
    writer.write_event(Event::Text(BytesText::new(title))).unwrap();
    writer.write_event(Event::End(BytesEnd::new("text"))).unwrap();

    writer.write_event(Event::Start(BytesStart::new("text"))).unwrap();
    writer.write_event(Event::Text(BytesText::new(body))).unwrap();
    writer.write_event(Event::End(BytesEnd::new("text"))).unwrap();

    writer.write_event(Event::End(BytesEnd::new("binding"))).unwrap();
    writer.write_event(Event::End(BytesEnd::new("visual"))).unwrap();
    writer.write_event(Event::End(BytesEnd::new("toast"))).unwrap();

    writer.into_inner().into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toast_xml_escapes_markup() {
        let xml = String::from_utf8(toast_xml("<script>", "a & b")).unwrap();
        assert!(!xml.contains("<script>"));
        assert!(xml.contains("&lt;script&gt;"));
        assert!(xml.contains("a &amp; b"));
    }

    #[test]
    fn needs_refresh_true_within_skew_window() {
        let token = CachedToken {
            access_token: "t".into(),
            expires_at: Utc::now() + chrono::Duration::minutes(4),
        };
        assert!(WnsProvider::needs_refresh(&token));
    }

    #[test]
    fn needs_refresh_false_well_before_expiry() {
        let token = CachedToken {
            access_token: "t".into(),
            expires_at: Utc::now() + chrono::Duration::minutes(30),
        };
        assert!(!WnsProvider::needs_refresh(&token));
    }
}
