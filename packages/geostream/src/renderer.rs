// Hand-off between the subscriber and whatever displays the points
//
// The subscriber calls `on_group_received` exactly once per successfully
// decoded frame, in arrival order. How and when the points are drawn is up
// to the renderer; `refresh` is driven by the subscriber's optional timer.

use crate::record::Record;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub trait GroupRenderer: Send {
    /// Receive the records of one decoded frame
    fn on_group_received(&mut self, records: Vec<Record>);

    /// Redraw with whatever was last received
    fn refresh(&mut self) {}
}

/// Bounding box of a point set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_longitude: f64,
    pub min_latitude: f64,
    pub max_longitude: f64,
    pub max_latitude: f64,
}

/// Headless moving-points layer.
///
/// Each group replaces the previous point set entirely, so the layer always
/// shows the positions of a single time bucket.
#[derive(Debug, Default)]
pub struct PointLayer {
    points: Vec<Record>,
    groups_received: u64,
    refreshes: u64,
}

impl PointLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Points of the most recent group
    pub fn points(&self) -> &[Record] {
        &self.points
    }

    pub fn groups_received(&self) -> u64 {
        self.groups_received
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes
    }

    /// Bounding box of the current points, ignoring non-finite coordinates
    pub fn extent(&self) -> Option<Extent> {
        let mut finite = self
            .points
            .iter()
            .filter(|p| p.longitude.is_finite() && p.latitude.is_finite());

        let first = finite.next()?;
        let start = Extent {
            min_longitude: first.longitude,
            min_latitude: first.latitude,
            max_longitude: first.longitude,
            max_latitude: first.latitude,
        };

        Some(finite.fold(start, |e, p| Extent {
            min_longitude: e.min_longitude.min(p.longitude),
            min_latitude: e.min_latitude.min(p.latitude),
            max_longitude: e.max_longitude.max(p.longitude),
            max_latitude: e.max_latitude.max(p.latitude),
        }))
    }
}

impl GroupRenderer for PointLayer {
    fn on_group_received(&mut self, records: Vec<Record>) {
        self.points = records;
        self.groups_received += 1;
    }

    fn refresh(&mut self) {
        self.refreshes += 1;
        match self.extent() {
            Some(extent) => log::debug!(
                "Refreshing point layer: {} points within {:?}",
                self.points.len(),
                extent
            ),
            None => log::debug!("Refreshing empty point layer"),
        }
    }
}

/// Forwards each group to a channel for a consumer on another task.
///
/// A full channel drops the group rather than stalling the receive loop.
pub struct ChannelRenderer {
    sender: mpsc::Sender<Vec<Record>>,
    dropped: u64,
}

impl ChannelRenderer {
    pub fn new(sender: mpsc::Sender<Vec<Record>>) -> Self {
        Self { sender, dropped: 0 }
    }

    /// Groups that could not be forwarded
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl GroupRenderer for ChannelRenderer {
    fn on_group_received(&mut self, records: Vec<Record>) {
        match self.sender.try_send(records) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped += 1;
                log::warn!("Render channel full, group dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped += 1;
                log::debug!("Render channel closed, group dropped");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_layer_replaces_points() {
        let mut layer = PointLayer::new();
        assert!(layer.extent().is_none());

        layer.on_group_received(vec![
            Record::new(1.0, 2.0, "a", 10_i64),
            Record::new(-3.0, 5.0, "b", 10_i64),
        ]);
        assert_eq!(layer.points().len(), 2);
        assert_eq!(
            layer.extent(),
            Some(Extent {
                min_longitude: -3.0,
                min_latitude: 2.0,
                max_longitude: 1.0,
                max_latitude: 5.0,
            })
        );

        layer.on_group_received(vec![Record::new(7.0, 8.0, "c", 20_i64)]);
        assert_eq!(layer.points(), &[Record::new(7.0, 8.0, "c", 20_i64)]);
        assert_eq!(layer.groups_received(), 2);

        layer.refresh();
        assert_eq!(layer.refreshes(), 1);
    }

    #[test]
    fn test_extent_skips_nan() {
        let mut layer = PointLayer::new();
        layer.on_group_received(vec![
            Record::new(f64::NAN, 0.0, "a", 1_i64),
            Record::new(4.0, 4.0, "b", 1_i64),
        ]);
        let extent = layer.extent().unwrap();
        assert_eq!(extent.min_longitude, 4.0);
        assert_eq!(extent.max_longitude, 4.0);
    }

    #[tokio::test]
    async fn test_channel_renderer() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut renderer = ChannelRenderer::new(tx);

        renderer.on_group_received(vec![Record::new(1.0, 1.0, "a", 1_i64)]);
        renderer.on_group_received(vec![Record::new(2.0, 2.0, "b", 2_i64)]);
        assert_eq!(renderer.dropped(), 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received[0].identity.to_string(), "a");
    }
}
