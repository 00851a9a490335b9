// Frame publisher - replays the partitioned dataset at a fixed cadence
//
// The loop is single-task and synchronous per frame: encode, send, sleep.
// Pacing is a uniform wall-clock delay, unrelated to the spacing of the time
// keys themselves. Per-frame failures are logged and skipped; the loop only
// ends on cancellation or after `max_frames`.

use crate::config::PublisherConfig;
use crate::frame::{encode, Frame};
use crate::partition::Partitioner;
use crate::record::Group;
use crate::transport::{FrameSink, ZmqFrameSink};
use crate::types::{FeedError, FeedResult, PublishStats};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

pub struct FramePublisher {
    config: PublisherConfig,
    sink: Box<dyn FrameSink>,
    port: Option<u16>,
}

impl FramePublisher {
    /// Bind a ZeroMQ PUB socket on the configured endpoint
    pub async fn bind(config: PublisherConfig) -> FeedResult<Self> {
        config.validate()?;

        let sink = ZmqFrameSink::bind(&config.endpoint()).await?;
        let port = sink.port();

        Ok(Self {
            config,
            sink: Box::new(sink),
            port,
        })
    }

    /// Publish through an arbitrary sink
    pub fn with_sink(config: PublisherConfig, sink: Box<dyn FrameSink>) -> Self {
        Self {
            config,
            sink,
            port: None,
        }
    }

    pub fn config(&self) -> &PublisherConfig {
        &self.config
    }

    /// TCP port the publisher is bound to, when publishing over ZeroMQ
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// Encode and send a single group
    pub async fn publish(&mut self, group: &Group) -> FeedResult<Frame> {
        let frame = encode(group, &self.config.columns)?;
        let wire = frame.to_wire();

        log::info!("Publishing frame {} ({} rows)", frame.key(), group.len());
        log::debug!("{}", wire);

        self.sink.send(wire).await?;
        Ok(frame)
    }

    /// Replay groups until cancelled (or `max_frames` groups were handled).
    ///
    /// The transport is shut down before returning.
    pub async fn run(
        &mut self,
        partitioner: &mut Partitioner,
        cancel: CancellationToken,
    ) -> PublishStats {
        let mut stats = PublishStats {
            started_at: Some(chrono::Utc::now()),
            ..Default::default()
        };
        let interval = self.config.interval();
        let mut handled: u64 = 0;

        log::info!(
            "Starting replay of {} time buckets every {:?}",
            partitioner.len(),
            interval
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let group = partitioner.next_group();
            match self.publish(group).await {
                Ok(_) => stats.frames_sent += 1,
                Err(FeedError::Encode(e)) => {
                    stats.encode_failures += 1;
                    log::warn!("Skipping time bucket {}: {}", group.key, e);
                }
                Err(e) => {
                    stats.send_failures += 1;
                    log::warn!("Failed to send frame {}: {}", group.key, e);
                }
            }

            stats.cycles_completed = partitioner.cycles();
            handled += 1;

            if self.config.max_frames.is_some_and(|max| handled >= max) {
                log::info!("Frame limit reached ({})", handled);
                break;
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    log::info!("Publisher cancelled");
                    break;
                }

                _ = sleep(interval) => {}
            }
        }

        self.sink.shutdown().await;

        log::info!(
            "Replay stopped: {} frames sent, {} send failures, {} cycles completed",
            stats.frames_sent,
            stats.send_failures,
            stats.cycles_completed
        );

        stats
    }
}
