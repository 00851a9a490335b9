// Cyclic replay of time-bucketed positional records over ZeroMQ pub/sub
//
// A producer loads a tabular dataset once, partitions it by a time key and
// publishes one text frame per time bucket at a fixed cadence, wrapping back
// to the first bucket forever. Consumers subscribe, decode each frame back
// into records and hand them to a renderer.
//
// Architecture:
// - `record`: Record model, time/identity keys and the column schema
// - `dataset`: CSV loading into an immutable in-memory dataset
// - `partition`: Grouping by time key and the replay cursor
// - `frame`: Text framing and defensive decoding
// - `transport`: Pluggable frame sinks/sources (ZeroMQ, in-process broadcast)
// - `publisher` / `subscriber`: Cancellable send and receive loops
// - `renderer`: Hand-off contract to whatever draws the points
// - `config`: Environment-driven configuration

pub mod config;
pub mod dataset;
pub mod frame;
pub mod partition;
pub mod publisher;
pub mod record;
pub mod renderer;
pub mod subscriber;
pub mod transport;
pub mod types;

pub use config::{ConfigError, PublisherConfig, SubscriberConfig};
pub use dataset::Dataset;
pub use frame::{decode, decode_bytes, encode, DecodedGroup, Frame, KeyCheck};
pub use partition::{group_by_time, GroupOrder, Partitioner};
pub use publisher::FramePublisher;
pub use record::{ColumnMap, Group, Identity, Record, TimeKey};
pub use renderer::{ChannelRenderer, GroupRenderer, PointLayer};
pub use subscriber::FrameSubscriber;
pub use transport::{FrameSink, FrameSource};
pub use types::{DecodeError, FeedError, FeedResult, LoadError, PublishStats, ReceiveStats};

/// Default TCP port for the replay feed
pub const DEFAULT_PORT: u16 = 1132;
