//! Tokio mpsc channel transport implementation.

use crate::transport::Transport;
use crate::{EncodedChunk, TransportError};
use async_trait::async_trait;
use tokio::sync::mpsc;

/// A transport that forwards chunks to a tokio mpsc channel.
///
/// This is the usual way to hand captured audio to application code that
/// owns the network connection.
///
/// # Example
///
/// ```
/// use live_audio::{ChannelTransport, EncodedChunk};
/// use tokio::sync::mpsc;
///
/// let (tx, mut rx) = mpsc::channel::<EncodedChunk>(32);
/// let transport = ChannelTransport::new(tx);
///
/// // Use with the LiveAudio builder, then:
/// // while let Some(chunk) = rx.recv().await { socket.send(chunk.to_base64()).await?; }
/// ```
pub struct ChannelTransport {
    name: String,
    sender: mpsc::Sender<EncodedChunk>,
}

impl ChannelTransport {
    /// Creates a new channel transport with the given sender.
    pub fn new(sender: mpsc::Sender<EncodedChunk>) -> Self {
        Self {
            name: "channel".to_string(),
            sender,
        }
    }

    /// Creates a new channel transport with a custom name.
    pub fn with_name(name: impl Into<String>, sender: mpsc::Sender<EncodedChunk>) -> Self {
        Self {
            name: name.into(),
            sender,
        }
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, chunk: &EncodedChunk) -> Result<(), TransportError> {
        self.sender
            .send(chunk.clone())
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_channel_transport_forwards_chunks() {
        let (tx, mut rx) = mpsc::channel::<EncodedChunk>(10);
        let transport = ChannelTransport::new(tx);

        let chunk = EncodedChunk::new(vec![1, 2, 3], 7, Duration::ZERO, 16000);
        transport.send(&chunk).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(*received.samples, vec![1, 2, 3]);
        assert_eq!(received.sequence, 7);
    }

    #[tokio::test]
    async fn test_channel_transport_closed() {
        let (tx, rx) = mpsc::channel::<EncodedChunk>(10);
        let transport = ChannelTransport::new(tx);
        drop(rx);

        let chunk = EncodedChunk::new(vec![1, 2, 3], 0, Duration::ZERO, 16000);
        let result = transport.send(&chunk).await;

        assert!(matches!(result, Err(TransportError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_channel_transport_custom_name() {
        let (tx, _rx) = mpsc::channel::<EncodedChunk>(10);
        let transport = ChannelTransport::with_name("gemini-live", tx);
        assert_eq!(transport.name(), "gemini-live");
    }
}
