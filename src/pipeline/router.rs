//! Fans encoded chunks out to every transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::transport::Transport;
use crate::{
    EncodedChunk, EventCallback, LiveAudioError, SessionConfig, SessionEvent, TransportError,
};

/// A transport plus whether it has reported itself closed.
struct Route {
    transport: Arc<dyn Transport>,
    closed: AtomicBool,
}

/// Sends each chunk to all transports, retrying transient failures.
///
/// A transport that reports [`TransportError::ChannelClosed`] receives no
/// further chunks for the rest of the session.
pub struct Router {
    routes: Vec<Route>,
    event_callback: Option<EventCallback>,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl Router {
    /// Creates a new router with the given transports.
    pub fn new(
        transports: Vec<Arc<dyn Transport>>,
        config: &SessionConfig,
        event_callback: Option<EventCallback>,
    ) -> Self {
        let routes = transports
            .into_iter()
            .map(|transport| Route {
                transport,
                closed: AtomicBool::new(false),
            })
            .collect();
        Self {
            routes,
            event_callback,
            retry_attempts: config.transport_retry_attempts.max(1),
            retry_delay: config.transport_retry_delay,
        }
    }

    fn emit_event(&self, event: SessionEvent) {
        if let Some(ref callback) = self.event_callback {
            callback(event);
        }
    }

    /// Sends a chunk over one route.
    ///
    /// Every failed attempt is reported as an event. Only errors that a
    /// resend could fix are retried, with the delay doubling each time.
    async fn send_to(&self, route: &Route, chunk: &EncodedChunk) {
        if route.closed.load(Ordering::Relaxed) {
            return;
        }
        let name = route.transport.name();
        let mut delay = self.retry_delay;

        for attempt in 1..=self.retry_attempts {
            let Err(e) = route.transport.send(chunk).await else {
                return;
            };
            self.emit_event(SessionEvent::TransportError {
                transport: name.to_string(),
                error: e.to_string(),
            });

            if matches!(e, TransportError::ChannelClosed) {
                route.closed.store(true, Ordering::Relaxed);
                tracing::warn!(
                    transport = name,
                    sequence = chunk.sequence,
                    "transport closed, no further chunks will be routed to it"
                );
                return;
            }
            if !e.is_retryable() || attempt == self.retry_attempts {
                tracing::warn!(
                    transport = name,
                    sequence = chunk.sequence,
                    attempts = attempt,
                    error = %e,
                    "chunk dropped by transport"
                );
                return;
            }

            tracing::debug!(
                transport = name,
                sequence = chunk.sequence,
                attempt,
                error = %e,
                "transport send failed, retrying"
            );
            tokio::time::sleep(delay).await;
            delay = delay.saturating_mul(2);
        }
    }

    /// Sends a chunk to all open transports concurrently.
    pub async fn send_chunk(&self, chunk: &EncodedChunk) {
        let sends: Vec<_> = self
            .routes
            .iter()
            .map(|route| self.send_to(route, chunk))
            .collect();

        futures::future::join_all(sends).await;
    }

    /// Number of transports still accepting chunks.
    pub fn open_transports(&self) -> usize {
        self.routes
            .iter()
            .filter(|route| !route.closed.load(Ordering::Relaxed))
            .count()
    }

    /// Starts all transports.
    ///
    /// Returns an error if any transport fails to start.
    pub async fn start_transports(&self) -> Result<(), LiveAudioError> {
        for Route { transport, .. } in &self.routes {
            transport
                .on_start()
                .await
                .map_err(|e| LiveAudioError::TransportStartFailed {
                    transport: transport.name().to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Stops all transports, reporting failures as events.
    pub async fn stop_transports(&self) {
        for Route { transport, .. } in &self.routes {
            if let Err(e) = transport.on_stop().await {
                self.emit_event(SessionEvent::TransportError {
                    transport: transport.name().to_string(),
                    error: format!("Error during shutdown: {e}"),
                });
            }
        }
    }
}
