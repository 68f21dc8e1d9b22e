//! Dispatcher (C5): the background polling loop.
//!
//! Every `poll_interval` the dispatcher runs one cycle: claim eligible
//! `Pending` rows, then eligible `Failed` rows, dispatch each concurrently
//! bounded by a semaphore, wait for the cycle's dispatches to finish, and
//! sleep. Coordination across dispatcher instances happens entirely
//! through the outbox store's `SELECT ... FOR UPDATE SKIP LOCKED` claim.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use notifyd_core::{FailureCategory, NotificationMessage, OutboxStatus, ProviderRegistry, RetryPolicy};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::WorkerConfig;
use crate::store::OutboxStore;

pub async fn run_dispatcher(
    store: OutboxStore,
    registry: Arc<ProviderRegistry>,
    config: WorkerConfig,
    shutdown: CancellationToken,
) {
    let retry_policy = RetryPolicy::from(config.retry);
    let semaphore = Arc::new(Semaphore::new(config.dispatcher.max_concurrency));
    let poll_interval = tokio::time::Duration::from_secs(config.dispatcher.poll_interval_s);

    info!(
        batch_size = config.dispatcher.batch_size,
        poll_interval_s = config.dispatcher.poll_interval_s,
        max_concurrency = config.dispatcher.max_concurrency,
        "dispatcher starting"
    );

    loop {
        if shutdown.is_cancelled() {
            info!("dispatcher shutting down");
            break;
        }

        if let Err(e) = run_cycle(&store, &registry, &retry_policy, &config, &semaphore, &shutdown).await {
            error!(error = %e, "dispatch cycle failed");
        }

        tokio::select! {
            () = shutdown.cancelled() => {
                info!("dispatcher shutting down");
                break;
            }
            () = tokio::time::sleep(poll_interval) => {}
        }
    }
}

async fn run_cycle(
    store: &OutboxStore,
    registry: &Arc<ProviderRegistry>,
    retry_policy: &RetryPolicy,
    config: &WorkerConfig,
    semaphore: &Arc<Semaphore>,
    shutdown: &CancellationToken,
) -> Result<(), sqlx::Error> {
    let now = Utc::now();
    let batch_size = config.dispatcher.batch_size;

    let pending = store.claim_pending(batch_size, now).await.map_err(to_sqlx_error)?;
    let failed = store.claim_failed(batch_size, now).await.map_err(to_sqlx_error)?;

    if pending.is_empty() && failed.is_empty() {
        return Ok(());
    }
    info!(pending = pending.len(), failed = failed.len(), "claimed rows for dispatch");

    let mut tasks = JoinSet::new();
    for row in pending.into_iter().chain(failed.into_iter()) {
        if shutdown.is_cancelled() {
            break;
        }
        let store = store.clone();
        let registry = Arc::clone(registry);
        let retry_policy = *retry_policy;
        let permit = Arc::clone(semaphore);
        let cycle_cancel = shutdown.clone();
        tasks.spawn(async move {
            let _permit = permit.acquire_owned().await.expect("semaphore never closed");
            dispatch(&store, &registry, &retry_policy, row, &cycle_cancel).await;
        });
    }

    while let Some(res) = tasks.join_next().await {
        if let Err(e) = res {
            error!(error = %e, "dispatch task panicked");
        }
    }

    Ok(())
}

fn to_sqlx_error(e: crate::error::WorkerError) -> sqlx::Error {
    match e {
        crate::error::WorkerError::Db(inner) => inner,
        other => sqlx::Error::Protocol(other.to_string()),
    }
}

/// Drives a single claimed row (already `Processing`) to its next state.
async fn dispatch(
    store: &OutboxStore,
    registry: &ProviderRegistry,
    retry_policy: &RetryPolicy,
    row: NotificationMessage,
    cancel: &CancellationToken,
) {
    debug_assert_eq!(row.status, OutboxStatus::Processing);
    let now = Utc::now();

    let provider = match registry.get(&row.target_platform) {
        Ok(p) => p,
        Err(_) => {
            warn!(id = %row.id, platform = %row.target_platform, "no provider registered, dead-lettering");
            if let Err(e) = store
                .mark_dead_lettered(
                    row.id.into(),
                    "no provider registered for target platform",
                    FailureCategory::PlatformNotSupported,
                    now,
                )
                .await
            {
                error!(id = %row.id, error = %e, "failed to persist dead-letter");
            }
            return;
        }
    };

    let data = parse_data(&row);

    let request = notifyd_core::SendRequest {
        device_token: &row.device_token,
        title: &row.title,
        body: &row.body,
        data: &data,
    };

    let outcome = provider.send(request, cancel).await;

    match outcome {
        notifyd_core::SendOutcome::Ok => {
            if let Err(e) = store.mark_sent(row.id.into(), Utc::now()).await {
                error!(id = %row.id, error = %e, "failed to persist Sent");
            }
        }
        notifyd_core::SendOutcome::Fail { message, category, .. } => {
            let would_retry = category.retryable() && RetryPolicy::should_retry(row.retry_count + 1, row.max_retries);
            let now = Utc::now();
            if would_retry {
                let delay = retry_policy.delay_seconds(row.retry_count);
                let next_attempt = now + chrono::Duration::seconds(delay);
                if let Err(e) = store
                    .mark_failed(row.id.into(), &message, category, next_attempt, now)
                    .await
                {
                    error!(id = %row.id, error = %e, "failed to persist Failed");
                }
            } else if let Err(e) = store.mark_dead_lettered(row.id.into(), &message, category, now).await {
                error!(id = %row.id, error = %e, "failed to persist DeadLettered");
            }
        }
    }
}

/// `data` is opaque JSON persisted on insert; a malformed or non-object
/// value is logged and treated as empty rather than failing the send.
fn parse_data(row: &NotificationMessage) -> HashMap<String, String> {
    match &row.data {
        None => HashMap::new(),
        Some(serde_json::Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
            .collect(),
        Some(_) => {
            warn!(id = %row.id, "notification data is not a JSON object, ignoring");
            HashMap::new()
        }
    }
}
