//! Timer-expiration listener.
//!
//! Timers live as expiring store keys; the store's key-expiration
//! notifications funnel fired deadlines back into the engine as
//! ordinary actions for the owning game, preserving the single-writer
//! guarantee instead of mutating state out-of-band.

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

use rand::random;
use redis::aio::PubSub;
use redis::Client;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{error, info, warn};

use crate::actions::{ActionEnvelope, ActionType};
use crate::domain::timer::TimerKind;
use crate::engine::executor::ActionExecutor;
use crate::error::AppError;
use crate::store::keys;

/// Synthetic socket id carried by timer-driven envelopes.
pub const TIMER_SOCKET: &str = "timer";

const EXPIRED_PATTERN: &str = "__keyevent@*__:expired";

// Subscriber retry configuration (background task)
const INITIAL_RETRY_DELAY_SECS: u64 = 1;
const MAX_RETRY_DELAY_SECS: u64 = 60;
const RETRY_DELAY_MULTIPLIER: f64 = 2.0;
const JITTER_PERCENT: f64 = 0.2;

pub fn action_for(kind: TimerKind) -> ActionType {
    match kind {
        TimerKind::Question => ActionType::QuestionTimerExpired,
        TimerKind::Answer => ActionType::AnswerTimerExpired,
        TimerKind::Bid => ActionType::BidTimerExpired,
        TimerKind::Final => ActionType::FinalTimerExpired,
    }
}

/// Spawn the background listener. Runs until a permanent error.
pub fn spawn_listener(store_url: &str, executor: Arc<ActionExecutor>) {
    let store_url = store_url.to_string();
    tokio::spawn(async move {
        run_subscription_loop_with_retry(&store_url, executor).await;
    });
}

fn is_transient_error(err: &AppError) -> bool {
    if let AppError::Config { .. } = err {
        return false;
    }

    let error_msg = err.to_string().to_lowercase();

    if error_msg.contains("authentication failed")
        || error_msg.contains("invalid store_url")
        || error_msg.contains("unsupported")
        || error_msg.contains("non-tcp protocol")
    {
        return false;
    }

    if error_msg.contains("connection refused")
        || error_msg.contains("connection reset")
        || error_msg.contains("connection aborted")
        || error_msg.contains("timed out")
        || error_msg.contains("timeout")
        || error_msg.contains("broken pipe")
        || error_msg.contains("network")
        || error_msg.contains("io error")
        || error_msg.contains("stream ended")
    {
        return true;
    }

    if let Some(source) = StdError::source(err) {
        if let Some(io_err) = source.downcast_ref::<std::io::Error>() {
            match io_err.kind() {
                std::io::ErrorKind::ConnectionRefused => return true,
                std::io::ErrorKind::ConnectionAborted => return true,
                std::io::ErrorKind::ConnectionReset => return true,
                std::io::ErrorKind::TimedOut => return true,
                std::io::ErrorKind::WouldBlock => return true,
                std::io::ErrorKind::Interrupted => return true,
                std::io::ErrorKind::PermissionDenied => return false,
                std::io::ErrorKind::Unsupported => return false,
                _ => {}
            }
        }
    }

    true
}

fn calculate_retry_delay(attempt: u32) -> Duration {
    let base_delay =
        INITIAL_RETRY_DELAY_SECS as f64 * RETRY_DELAY_MULTIPLIER.powi(attempt as i32 - 1);
    let capped_delay = base_delay.min(MAX_RETRY_DELAY_SECS as f64);

    let jitter_range = capped_delay * JITTER_PERCENT;
    let jitter = (random::<f64>() * 2.0 - 1.0) * jitter_range;
    let final_delay = (capped_delay + jitter).max(0.1);

    Duration::from_secs_f64(final_delay)
}

async fn run_subscription_loop_with_retry(store_url: &str, executor: Arc<ActionExecutor>) {
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        let loop_res = run_subscription_loop(store_url, executor.clone()).await;
        match loop_res {
            Ok(()) => {
                info!("expiry subscription loop completed normally");
                break;
            }
            Err(err) => {
                if !is_transient_error(&err) {
                    error!(
                        error = %err,
                        attempt,
                        "expiry subscription failed with permanent error, exiting"
                    );
                    break;
                }

                let delay = calculate_retry_delay(attempt);
                warn!(
                    error = %err,
                    attempt,
                    retry_delay_secs = delay.as_secs_f64(),
                    "expiry subscription failed, retrying"
                );
                sleep(delay).await;

                if attempt >= 20 {
                    attempt = 10;
                }
            }
        }
    }
}

async fn run_subscription_loop(
    store_url: &str,
    executor: Arc<ActionExecutor>,
) -> Result<(), AppError> {
    let client = Client::open(store_url).map_err(|err| {
        AppError::config(format!("invalid STORE_URL for expiry subscription: {err}"))
    })?;

    let conn_info = client.get_connection_info();

    let addr = match conn_info.addr().clone() {
        redis::ConnectionAddr::Tcp(host, port) => (host, port),
        _ => {
            return Err(AppError::config(
                "only TCP protocol is supported for the expiry subscription".to_string(),
            ));
        }
    };

    info!("connecting to the store for expiry events at {}:{}", addr.0, addr.1);

    let stream = tokio::net::TcpStream::connect(addr).await.map_err(|err| {
        AppError::internal(format!("failed to connect for expiry subscription: {err}"))
    })?;

    let mut pubsub = PubSub::new(conn_info.redis_settings(), stream)
        .await
        .map_err(AppError::from)?;

    info!("subscribing to pattern '{EXPIRED_PATTERN}'");
    pubsub.psubscribe(EXPIRED_PATTERN).await.map_err(AppError::from)?;

    info!("expiry subscription established, processing events");

    let mut stream = pubsub.into_on_message();

    loop {
        let Some(msg) = stream.next().await else {
            break;
        };

        // For key-event notifications the payload is the expired key.
        let Ok(expired_key) = msg.get_payload::<String>() else {
            continue;
        };
        let Some((game_id, kind)) = keys::parse_timer_key(&expired_key) else {
            continue;
        };

        let envelope = ActionEnvelope {
            action_type: action_for(kind),
            game_id: game_id.clone(),
            payload: serde_json::Value::Null,
            socket_id: TIMER_SOCKET.to_string(),
        };

        if let Err(err) = executor.execute(envelope).await {
            warn!(game_id = %game_id, ?kind, error = %err, "timer expiration failed");
        }
    }

    warn!("expiry subscription stream ended, connection lost");
    Err(AppError::internal(
        "expiry subscription stream ended unexpectedly".to_string(),
    ))
}
