//! Exponential-backoff reattachment to the relay.
//!
//! The relay never reconnects on its own. A caller that wants to survive
//! relay restarts runs [`attach_with_backoff`] after the channel reports
//! [`ClientEvent::Closed`](crate::ClientEvent::Closed), until the
//! [`CancellationToken`] is triggered.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::channel::PresenceChannel;
use crate::client::{RelayClient, RelayClientError};
use crate::session::SessionIdentity;
use crate::transport::WsTransport;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Calculate the next backoff delay, clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Retry [`RelayClient::connect`] until it succeeds.
///
/// Returns `None` if `cancel` fires first or the relay rejects the access
/// token, which no amount of retrying would fix.
pub async fn reconnect_loop(
    client: &RelayClient,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> Option<WsTransport> {
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        tracing::info!(
            url = client.ws_url(),
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Reconnecting to relay",
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(url = client.ws_url(), "Reconnect cancelled");
                return None;
            }
            result = client.connect() => {
                match result {
                    Ok(transport) => {
                        tracing::info!(url = client.ws_url(), attempt, "Reconnected to relay");
                        return Some(transport);
                    }
                    Err(RelayClientError::Unauthorized) => {
                        tracing::warn!(url = client.ws_url(), "Access token rejected, giving up");
                        return None;
                    }
                    Err(e) => {
                        tracing::warn!(
                            url = client.ws_url(),
                            error = %e,
                            "Reconnect attempt {attempt} failed",
                        );
                    }
                }
            }
        }

        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        delay = next_delay(delay, config);
    }
}

/// Reconnect and attach a fresh channel for `session`.
///
/// The session keeps its token, so presence is re-tracked under the same
/// identity and token-addressed commands still reach it.
pub async fn attach_with_backoff(
    client: &RelayClient,
    session: SessionIdentity,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> Option<PresenceChannel> {
    let transport = reconnect_loop(client, config, cancel).await?;
    Some(PresenceChannel::attach(transport, session))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_doubles() {
        let config = ReconnectConfig::default();
        assert_eq!(next_delay(Duration::from_secs(1), &config), Duration::from_secs(2));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = ReconnectConfig {
            max_delay: Duration::from_secs(10),
            ..Default::default()
        };
        assert_eq!(next_delay(Duration::from_secs(8), &config), Duration::from_secs(10));
    }

    #[test]
    fn custom_multiplier() {
        let config = ReconnectConfig {
            multiplier: 1.5,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(5),
        };
        assert_eq!(
            next_delay(config.initial_delay, &config),
            Duration::from_millis(300)
        );
    }

    #[test]
    fn full_backoff_sequence() {
        let config = ReconnectConfig::default();
        let mut delay = config.initial_delay;
        for expected_secs in [1, 2, 4, 8, 16, 30, 30] {
            assert_eq!(delay.as_secs(), expected_secs);
            delay = next_delay(delay, &config);
        }
    }

    #[tokio::test]
    async fn cancellation_stops_attach() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let client = RelayClient::new("ws://127.0.0.1:9/api/v1/ws");
        let channel =
            attach_with_backoff(&client, SessionIdentity::new(), &ReconnectConfig::default(), &cancel)
                .await;
        assert!(channel.is_none());
    }

    #[tokio::test]
    async fn gives_up_after_cancel_during_backoff() {
        let cancel = CancellationToken::new();
        let config = ReconnectConfig {
            initial_delay: Duration::from_secs(60),
            ..Default::default()
        };
        let client = RelayClient::new("ws://127.0.0.1:9/api/v1/ws");

        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            stopper.cancel();
        });

        let transport = tokio::time::timeout(
            Duration::from_secs(5),
            reconnect_loop(&client, &config, &cancel),
        )
        .await
        .expect("loop should stop once cancelled");
        assert!(transport.is_none());
    }
}
