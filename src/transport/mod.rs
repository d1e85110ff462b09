//! Transport trait and implementations for captured audio.
//!
//! A [`Transport`] is anything that can ship an [`EncodedChunk`] to the
//! remote end of a live session: a websocket, an HTTP stream, a test
//! harness. The crate provides [`ChannelTransport`], which forwards chunks
//! to a tokio mpsc channel so the caller can frame and send them however
//! their protocol requires.

mod channel;

pub use channel::ChannelTransport;

use crate::{EncodedChunk, TransportError};
use async_trait::async_trait;

/// A destination for captured audio chunks.
///
/// Sending is fire-and-forget from the pipeline's point of view: errors are
/// retried and reported through the event callback, never propagated into
/// the audio path.
///
/// # Implementation Notes
///
/// - Methods take `&self` - use interior mutability (`Mutex`, `RwLock`) if needed
/// - All methods are async and run on the tokio runtime
/// - `on_start` is called before any audio flows; open connections here
/// - `on_stop` is called during graceful shutdown; close connections here
///
/// # Example
///
/// ```
/// use live_audio::{EncodedChunk, Transport, TransportError};
/// use async_trait::async_trait;
///
/// struct PrintTransport;
///
/// #[async_trait]
/// impl Transport for PrintTransport {
///     fn name(&self) -> &str {
///         "print"
///     }
///
///     async fn send(&self, chunk: &EncodedChunk) -> Result<(), TransportError> {
///         println!("chunk #{}: {} samples", chunk.sequence, chunk.len());
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    /// Human-readable name for logging and error messages.
    fn name(&self) -> &str;

    /// Called once before audio starts flowing.
    ///
    /// Errors here are fatal and prevent the session from starting.
    ///
    /// Default implementation does nothing.
    async fn on_start(&self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Sends one chunk.
    ///
    /// Errors are recoverable - the bridge emits a
    /// [`SessionEvent::TransportError`] and retries based on
    /// [`SessionConfig`] settings.
    ///
    /// [`SessionEvent::TransportError`]: crate::SessionEvent::TransportError
    /// [`SessionConfig`]: crate::SessionConfig
    async fn send(&self, chunk: &EncodedChunk) -> Result<(), TransportError>;

    /// Called during graceful shutdown, after the final chunk.
    ///
    /// Default implementation does nothing.
    async fn on_stop(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    struct CountingTransport {
        count: AtomicUsize,
    }

    #[async_trait]
    impl Transport for CountingTransport {
        fn name(&self) -> &str {
            "counting"
        }

        async fn send(&self, _chunk: &EncodedChunk) -> Result<(), TransportError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_transport_lifecycle() {
        let transport = CountingTransport {
            count: AtomicUsize::new(0),
        };

        transport.on_start().await.unwrap();
        let chunk = EncodedChunk::new(vec![0i16; 100], 0, Duration::ZERO, 16000);
        transport.send(&chunk).await.unwrap();
        transport.send(&chunk).await.unwrap();
        transport.on_stop().await.unwrap();

        assert_eq!(transport.count.load(Ordering::SeqCst), 2);
        assert_eq!(transport.name(), "counting");
    }

    #[test]
    fn test_transport_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Arc<dyn Transport>>();
    }
}
