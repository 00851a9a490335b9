// Pluggable frame transports
//
// The publisher writes wire text into a `FrameSink` and the subscriber reads
// raw frames from a `FrameSource`. Both sides are fire-and-forget broadcast:
// a sink never waits on a slow reader, and a source may observe gaps.
//
// Current implementations:
// - ZeroMQ PUB/SUB over TCP (pure Rust, no C dependencies)
// - In-process broadcast channel (tests and embedding in one process)

use crate::types::{FeedError, FeedResult};
use async_trait::async_trait;
use tokio::sync::broadcast;
use zeromq::{Endpoint, PubSocket, Socket, SocketRecv, SocketSend, SubSocket, ZmqMessage};

/// Consecutive receive failures tolerated before a source is considered dead
pub const MAX_CONSECUTIVE_RECV_ERRORS: u64 = 100;

/// Outgoing side of the feed
#[async_trait]
pub trait FrameSink: Send {
    /// Broadcast one frame to every current subscriber.
    ///
    /// Must not block on slow or absent subscribers.
    async fn send(&mut self, frame: String) -> FeedResult<()>;

    /// Release transport resources. Called once when the publisher stops.
    async fn shutdown(&mut self) {}
}

/// Incoming side of the feed
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for the next frame. `FeedError::ChannelClosed` means the feed
    /// has ended and no further frames will arrive.
    async fn recv(&mut self) -> FeedResult<Vec<u8>>;
}

/// ZeroMQ PUB socket bound to a local endpoint
pub struct ZmqFrameSink {
    socket: Option<PubSocket>,
    endpoint: Endpoint,
}

impl ZmqFrameSink {
    /// Bind a PUB socket (e.g. "tcp://0.0.0.0:1132", "tcp://127.0.0.1:0")
    pub async fn bind(endpoint: &str) -> FeedResult<Self> {
        log::info!("Binding ZMQ PUB socket to {}", endpoint);

        let mut socket = PubSocket::new();
        let bound = socket
            .bind(endpoint)
            .await
            .map_err(|e| FeedError::Bind(format!("ZMQ PUB bind to {} failed: {}", endpoint, e)))?;

        log::info!("ZMQ PUB socket listening on {}", bound);

        Ok(Self {
            socket: Some(socket),
            endpoint: bound,
        })
    }

    /// Endpoint actually bound (resolves port 0 to the assigned port)
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// TCP port actually bound
    pub fn port(&self) -> Option<u16> {
        match &self.endpoint {
            Endpoint::Tcp(_, port) => Some(*port),
            #[allow(unreachable_patterns)]
            _ => None,
        }
    }
}

#[async_trait]
impl FrameSink for ZmqFrameSink {
    async fn send(&mut self, frame: String) -> FeedResult<()> {
        let socket = self
            .socket
            .as_mut()
            .ok_or_else(|| FeedError::Send("ZMQ PUB socket already closed".to_string()))?;

        socket
            .send(ZmqMessage::from(frame))
            .await
            .map_err(|e| FeedError::Send(format!("ZMQ send error: {}", e)))
    }

    async fn shutdown(&mut self) {
        if let Some(socket) = self.socket.take() {
            let errors = socket.close().await;
            if errors.is_empty() {
                log::info!("ZMQ PUB socket on {} closed", self.endpoint);
            } else {
                log::warn!(
                    "ZMQ PUB socket on {} closed with {} errors",
                    self.endpoint,
                    errors.len()
                );
            }
        }
    }
}

/// ZeroMQ SUB socket connected to a publisher
pub struct ZmqFrameSource {
    socket: SubSocket,
    endpoint: String,
}

impl ZmqFrameSource {
    /// Connect and subscribe. An empty topic receives every frame.
    pub async fn connect(endpoint: &str, topic: &str) -> FeedResult<Self> {
        log::info!("Connecting to ZMQ endpoint: {}", endpoint);

        let mut socket = SubSocket::new();
        socket
            .connect(endpoint)
            .await
            .map_err(|e| FeedError::Connect(format!("ZMQ SUB connect error: {}", e)))?;

        socket
            .subscribe(topic)
            .await
            .map_err(|e| FeedError::Connect(format!("ZMQ subscribe error: {}", e)))?;

        log::info!("ZMQ SUB socket connected to {}", endpoint);

        Ok(Self {
            socket,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl FrameSource for ZmqFrameSource {
    async fn recv(&mut self) -> FeedResult<Vec<u8>> {
        let msg = self
            .socket
            .recv()
            .await
            .map_err(|e| FeedError::Connect(format!("ZMQ receive error: {}", e)))?;

        // Frames are single-part; an empty message decodes as a missing delimiter
        let frames = msg.into_vec();
        Ok(frames
            .into_iter()
            .next()
            .map(|part| part.to_vec())
            .unwrap_or_default())
    }
}

/// In-process broadcast sink. Lagging receivers lose the oldest frames.
#[derive(Clone)]
pub struct BroadcastSink {
    sender: broadcast::Sender<String>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Attach a new subscriber; it sees frames sent from now on
    pub fn subscribe(&self) -> BroadcastSource {
        BroadcastSource {
            receiver: self.sender.subscribe(),
        }
    }
}

#[async_trait]
impl FrameSink for BroadcastSink {
    async fn send(&mut self, frame: String) -> FeedResult<()> {
        // No subscribers is not an error for a broadcast
        if self.sender.send(frame).is_err() {
            log::trace!("No subscribers attached, frame dropped");
        }
        Ok(())
    }
}

/// Receiving end of a `BroadcastSink`
pub struct BroadcastSource {
    receiver: broadcast::Receiver<String>,
}

#[async_trait]
impl FrameSource for BroadcastSource {
    async fn recv(&mut self) -> FeedResult<Vec<u8>> {
        loop {
            match self.receiver.recv().await {
                Ok(frame) => return Ok(frame.into_bytes()),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!("Subscriber lagged, {} frames skipped", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => return Err(FeedError::ChannelClosed),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_fan_out() {
        let mut sink = BroadcastSink::new(8);
        let mut first = sink.subscribe();
        let mut second = sink.subscribe();

        sink.send("1 a".to_string()).await.unwrap();

        assert_eq!(first.recv().await.unwrap(), b"1 a".to_vec());
        assert_eq!(second.recv().await.unwrap(), b"1 a".to_vec());
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_frames() {
        let mut sink = BroadcastSink::new(8);
        sink.send("1 early".to_string()).await.unwrap();

        let mut late = sink.subscribe();
        sink.send("2 late".to_string()).await.unwrap();

        assert_eq!(late.recv().await.unwrap(), b"2 late".to_vec());
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_frames() {
        let mut sink = BroadcastSink::new(2);
        let mut slow = sink.subscribe();

        for i in 0..5 {
            sink.send(format!("{} x", i)).await.unwrap();
        }

        // Only the two newest frames are still buffered
        assert_eq!(slow.recv().await.unwrap(), b"3 x".to_vec());
        assert_eq!(slow.recv().await.unwrap(), b"4 x".to_vec());
    }

    #[tokio::test]
    async fn test_closed_broadcast() {
        let sink = BroadcastSink::new(2);
        let mut source = sink.subscribe();
        drop(sink);

        assert!(matches!(source.recv().await, Err(FeedError::ChannelClosed)));
    }

    #[tokio::test]
    async fn test_send_without_subscribers() {
        let mut sink = BroadcastSink::new(2);
        assert!(sink.send("1 nobody".to_string()).await.is_ok());
    }
}
