// Frame subscriber - receives frames, decodes them and feeds a renderer
//
// Every frame is decoded independently. A frame that fails to decode is
// logged and dropped; the next receive is unaffected. Only a transport that
// keeps failing ends the loop with an error.

use crate::config::SubscriberConfig;
use crate::frame::{decode_bytes, DecodedGroup};
use crate::renderer::GroupRenderer;
use crate::transport::{FrameSource, ZmqFrameSource, MAX_CONSECUTIVE_RECV_ERRORS};
use crate::types::{DecodeError, FeedError, FeedResult, ReceiveStats};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub struct FrameSubscriber {
    config: SubscriberConfig,
    source: Box<dyn FrameSource>,
}

impl FrameSubscriber {
    /// Connect a ZeroMQ SUB socket to the configured publisher, subscribed
    /// to every topic
    pub async fn connect(config: SubscriberConfig) -> FeedResult<Self> {
        config.validate()?;

        let source = ZmqFrameSource::connect(&config.endpoint(), "").await?;
        Ok(Self::with_source(config, Box::new(source)))
    }

    /// Receive from an arbitrary source
    pub fn with_source(config: SubscriberConfig, source: Box<dyn FrameSource>) -> Self {
        Self { config, source }
    }

    pub fn config(&self) -> &SubscriberConfig {
        &self.config
    }

    /// Wait for the next frame and return its text
    pub async fn receive(&mut self) -> FeedResult<String> {
        let data = self.source.recv().await?;
        String::from_utf8(data).map_err(|_| FeedError::Decode(DecodeError::Utf8))
    }

    /// Decode one raw frame with this subscriber's schema
    pub fn decode(&self, data: &[u8]) -> Result<DecodedGroup, DecodeError> {
        decode_bytes(data, &self.config.columns, self.config.key_check)
    }

    /// Receive, decode and hand off frames until cancelled, the source
    /// closes, or `max_frames` frames were received.
    pub async fn run(
        &mut self,
        renderer: &mut dyn GroupRenderer,
        cancel: CancellationToken,
    ) -> FeedResult<ReceiveStats> {
        let mut stats = ReceiveStats::default();
        let mut error_count = 0u64;
        let mut refresh = self.config.refresh_interval().map(|period| {
            let mut timer = interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            timer
        });

        log::info!("Subscriber started, waiting for frames");

        loop {
            if self
                .config
                .max_frames
                .is_some_and(|max| stats.frames_received >= max)
            {
                log::info!("Frame limit reached ({})", stats.frames_received);
                break;
            }

            let received = tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    log::info!("Subscriber cancelled");
                    break;
                }

                _ = next_refresh(&mut refresh) => {
                    renderer.refresh();
                    stats.refreshes += 1;
                    continue;
                }

                received = self.source.recv() => received,
            };

            let data = match received {
                Ok(data) => {
                    error_count = 0;
                    data
                }
                Err(FeedError::ChannelClosed) => {
                    log::info!("Frame source closed");
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    log::error!("Receive error: {}", e);
                    if error_count > MAX_CONSECUTIVE_RECV_ERRORS {
                        return Err(FeedError::Connect(format!(
                            "Too many receive errors ({})",
                            error_count
                        )));
                    }
                    continue;
                }
            };

            stats.frames_received += 1;

            match decode_bytes(&data, &self.config.columns, self.config.key_check) {
                Ok(group) => {
                    log::debug!(
                        "Decoded frame {} ({} records)",
                        group.key,
                        group.records.len()
                    );
                    stats.frames_decoded += 1;
                    stats.records_delivered += group.records.len() as u64;
                    renderer.on_group_received(group.records);
                }
                Err(e) => {
                    stats.decode_failures += 1;
                    log::warn!("Dropping malformed frame: {}", e);
                    log::debug!("Malformed frame: {}", String::from_utf8_lossy(&data));
                }
            }
        }

        log::info!(
            "Subscriber stopped: {} frames received, {} decoded, {} dropped",
            stats.frames_received,
            stats.frames_decoded,
            stats.decode_failures
        );

        Ok(stats)
    }
}

/// Resolves on the next refresh tick, or never when refresh is disabled
async fn next_refresh(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Record, TimeKey};
    use crate::renderer::PointLayer;
    use crate::transport::BroadcastSink;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::time::Duration;

    /// Replays a fixed list of frames, then reports the source closed
    struct ScriptedSource {
        frames: VecDeque<FeedResult<Vec<u8>>>,
    }

    impl ScriptedSource {
        fn new(frames: Vec<FeedResult<Vec<u8>>>) -> Self {
            Self {
                frames: frames.into(),
            }
        }
    }

    #[async_trait]
    impl FrameSource for ScriptedSource {
        async fn recv(&mut self) -> FeedResult<Vec<u8>> {
            self.frames.pop_front().unwrap_or(Err(FeedError::ChannelClosed))
        }
    }

    /// Keeps every delivered group
    #[derive(Default)]
    struct CollectingRenderer {
        groups: Vec<Vec<Record>>,
    }

    impl GroupRenderer for CollectingRenderer {
        fn on_group_received(&mut self, records: Vec<Record>) {
            self.groups.push(records);
        }
    }

    fn frame(text: &str) -> FeedResult<Vec<u8>> {
        Ok(text.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_first_frame_hands_off_once() {
        let source = ScriptedSource::new(vec![frame("10 long,lat,Identity,TIME\n1.0,2.0,a,10\n")]);
        let mut subscriber = FrameSubscriber::with_source(SubscriberConfig::default(), Box::new(source));
        let mut renderer = CollectingRenderer::default();

        let stats = subscriber
            .run(&mut renderer, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stats.frames_decoded, 1);
        assert_eq!(renderer.groups, vec![vec![Record::new(1.0, 2.0, "a", 10_i64)]]);
    }

    #[tokio::test]
    async fn test_malformed_frames_are_isolated() {
        let source = ScriptedSource::new(vec![
            frame("no-delimiter"),
            frame("10 long,lat\n1.0,2.0\n"),
            Ok(vec![0x31, 0x20, 0xff]),
            frame("20 long,lat,Identity,TIME\n3.0,4.0,b,20\n"),
            frame("30 long,lat,Identity,TIME\n5.0,6.0,c,99\n"),
            frame("40 long,lat,Identity,TIME\n7.0,8.0,d,40\n"),
        ]);
        let mut subscriber = FrameSubscriber::with_source(SubscriberConfig::default(), Box::new(source));
        let mut renderer = CollectingRenderer::default();

        let stats = subscriber
            .run(&mut renderer, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(stats.frames_received, 6);
        assert_eq!(stats.frames_decoded, 2);
        assert_eq!(stats.decode_failures, 4);
        assert_eq!(stats.records_delivered, 2);

        let keys: Vec<TimeKey> = renderer.groups.iter().map(|g| g[0].time.clone()).collect();
        assert_eq!(keys, vec![TimeKey::Int(20), TimeKey::Int(40)]);
    }

    #[tokio::test]
    async fn test_transient_receive_errors_are_skipped() {
        let source = ScriptedSource::new(vec![
            Err(FeedError::Connect("blip".to_string())),
            frame("1 long,lat,Identity,TIME\n0.0,0.0,x,1\n"),
        ]);
        let mut subscriber = FrameSubscriber::with_source(SubscriberConfig::default(), Box::new(source));
        let mut layer = PointLayer::new();

        let stats = subscriber.run(&mut layer, CancellationToken::new()).await.unwrap();
        assert_eq!(stats.frames_decoded, 1);
        assert_eq!(layer.groups_received(), 1);
    }

    #[tokio::test]
    async fn test_persistent_receive_errors_abort() {
        let errors = (0..=MAX_CONSECUTIVE_RECV_ERRORS)
            .map(|_| Err(FeedError::Connect("down".to_string())))
            .collect();
        let mut subscriber =
            FrameSubscriber::with_source(SubscriberConfig::default(), Box::new(ScriptedSource::new(errors)));
        let mut layer = PointLayer::new();

        let result = subscriber.run(&mut layer, CancellationToken::new()).await;
        assert!(matches!(result, Err(FeedError::Connect(_))));
    }

    #[tokio::test]
    async fn test_max_frames() {
        let source = ScriptedSource::new(vec![
            frame("1 long,lat,Identity,TIME\n0.0,0.0,x,1\n"),
            frame("2 long,lat,Identity,TIME\n0.0,0.0,x,2\n"),
            frame("3 long,lat,Identity,TIME\n0.0,0.0,x,3\n"),
        ]);
        let config = SubscriberConfig {
            max_frames: Some(2),
            ..SubscriberConfig::default()
        };
        let mut subscriber = FrameSubscriber::with_source(config, Box::new(source));
        let mut layer = PointLayer::new();

        let stats = subscriber.run(&mut layer, CancellationToken::new()).await.unwrap();
        assert_eq!(stats.frames_received, 2);
        assert_eq!(layer.points()[0].time, TimeKey::Int(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_timer_and_cancel() {
        let sink = BroadcastSink::new(4);
        let config = SubscriberConfig {
            refresh_ms: Some(1000),
            ..SubscriberConfig::default()
        };
        let mut subscriber = FrameSubscriber::with_source(config, Box::new(sink.subscribe()));

        let cancel = CancellationToken::new();
        let stop = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(3500)).await;
            stop.cancel();
        });

        let mut layer = PointLayer::new();
        let stats = subscriber.run(&mut layer, cancel).await.unwrap();

        assert_eq!(stats.refreshes, 3);
        assert_eq!(layer.refreshes(), 3);
        assert_eq!(stats.frames_received, 0);
        drop(sink);
    }

    #[tokio::test]
    async fn test_receive_and_decode() {
        let mut sink = BroadcastSink::new(4);
        let mut subscriber =
            FrameSubscriber::with_source(SubscriberConfig::default(), Box::new(sink.subscribe()));

        use crate::transport::FrameSink;
        sink.send("7 long,lat,Identity,TIME\n1.5,2.5,q,7\n".to_string())
            .await
            .unwrap();

        let text = subscriber.receive().await.unwrap();
        assert!(text.starts_with("7 "));

        let group = subscriber.decode(text.as_bytes()).unwrap();
        assert_eq!(group.key, TimeKey::Int(7));
        assert_eq!(group.records, vec![Record::new(1.5, 2.5, "q", 7_i64)]);
    }
}
