use clap::{Args, Parser, Subcommand};
use geostream::{ColumnMap, GroupOrder, PublisherConfig, SubscriberConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "geostream",
    version,
    about = "Replay time-bucketed positions over ZeroMQ pub/sub",
    long_about = "Load a CSV of positions (long, lat, Identity, TIME), publish one frame per\n\
                  time bucket on a ZeroMQ PUB socket in an endless loop, or subscribe to such\n\
                  a feed. GEOSTREAM_* environment variables (and a .env file) provide defaults."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Command {
    /// Replay a CSV dataset as a cyclic feed
    Publish(PublishArgs),
    /// Receive a feed and print every decoded time bucket
    Subscribe(SubscribeArgs),
    /// Show how a dataset partitions into time buckets
    Groups(GroupsArgs),
}

/// Overrides for the four field names
#[derive(Args)]
pub struct ColumnArgs {
    /// Longitude column name
    #[arg(long)]
    pub col_long: Option<String>,

    /// Latitude column name
    #[arg(long)]
    pub col_lat: Option<String>,

    /// Identity column name
    #[arg(long)]
    pub col_id: Option<String>,

    /// Time column name
    #[arg(long)]
    pub col_time: Option<String>,
}

impl ColumnArgs {
    pub fn apply(&self, columns: &mut ColumnMap) {
        if let Some(name) = &self.col_long {
            columns.longitude = name.clone();
        }
        if let Some(name) = &self.col_lat {
            columns.latitude = name.clone();
        }
        if let Some(name) = &self.col_id {
            columns.identity = name.clone();
        }
        if let Some(name) = &self.col_time {
            columns.time = name.clone();
        }
    }
}

#[derive(Args)]
pub struct PublishArgs {
    /// CSV dataset to replay
    #[arg(long)]
    pub data: PathBuf,

    /// Interface to bind ("*" for all)
    #[arg(long)]
    pub bind: Option<String>,

    /// Port to publish on [default: 1132]
    #[arg(long)]
    pub port: Option<u16>,

    /// Delay between frames in milliseconds [default: 1000]
    #[arg(long)]
    pub interval_ms: Option<u64>,

    /// Bucket order: first-seen or ascending
    #[arg(long)]
    pub order: Option<GroupOrder>,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    #[command(flatten)]
    pub columns: ColumnArgs,
}

impl PublishArgs {
    /// Layer command-line flags over the environment configuration
    pub fn apply(&self, config: &mut PublisherConfig) {
        if let Some(bind) = &self.bind {
            config.bind_host = bind.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(interval_ms) = self.interval_ms {
            config.interval_ms = interval_ms;
        }
        if let Some(order) = self.order {
            config.order = order;
        }
        if self.max_frames.is_some() {
            config.max_frames = self.max_frames;
        }
        self.columns.apply(&mut config.columns);
    }
}

#[derive(Args)]
pub struct SubscribeArgs {
    /// Publisher host [default: localhost]
    #[arg(long)]
    pub host: Option<String>,

    /// Publisher port [default: 1132]
    #[arg(long)]
    pub port: Option<u16>,

    /// Stop after this many frames
    #[arg(long)]
    pub max_frames: Option<u64>,

    /// Renderer refresh period in milliseconds
    #[arg(long)]
    pub refresh_ms: Option<u64>,

    /// Accept rows whose time differs from the frame key
    #[arg(long, default_value_t = false)]
    pub no_key_check: bool,

    /// Print one JSON object per frame
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub columns: ColumnArgs,
}

impl SubscribeArgs {
    /// Layer command-line flags over the environment configuration
    pub fn apply(&self, config: &mut SubscriberConfig) {
        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if self.max_frames.is_some() {
            config.max_frames = self.max_frames;
        }
        if self.refresh_ms.is_some() {
            config.refresh_ms = self.refresh_ms;
        }
        if self.no_key_check {
            config.key_check = geostream::KeyCheck::Ignore;
        }
        self.columns.apply(&mut config.columns);
    }
}

#[derive(Args)]
pub struct GroupsArgs {
    /// CSV dataset to partition
    #[arg(long)]
    pub data: PathBuf,

    /// Bucket order: first-seen or ascending
    #[arg(long)]
    pub order: Option<GroupOrder>,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Compact JSON output (no indentation)
    #[arg(long, default_value_t = false)]
    pub compact: bool,

    #[command(flatten)]
    pub columns: ColumnArgs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use geostream::KeyCheck;

    #[test]
    fn test_publish_flags_override_config() {
        let cli = Cli::parse_from([
            "geostream",
            "publish",
            "--data",
            "tracks.csv",
            "--port",
            "5556",
            "--order",
            "ascending",
            "--col-time",
            "tick",
        ]);
        let Command::Publish(args) = cli.command else {
            panic!("expected publish");
        };

        let mut config = PublisherConfig::default();
        args.apply(&mut config);
        assert_eq!(config.port, 5556);
        assert_eq!(config.order, GroupOrder::Ascending);
        assert_eq!(config.columns.time, "tick");
        assert_eq!(config.interval_ms, 1000);
        assert_eq!(config.bind_host, "*");
    }

    #[test]
    fn test_subscribe_flags_override_config() {
        let cli = Cli::parse_from([
            "geostream",
            "subscribe",
            "--host",
            "10.1.1.1",
            "--no-key-check",
            "--max-frames",
            "3",
        ]);
        let Command::Subscribe(args) = cli.command else {
            panic!("expected subscribe");
        };

        let mut config = SubscriberConfig::default();
        args.apply(&mut config);
        assert_eq!(config.endpoint(), "tcp://10.1.1.1:1132");
        assert_eq!(config.key_check, KeyCheck::Ignore);
        assert_eq!(config.max_frames, Some(3));
        assert_eq!(config.refresh_ms, None);
    }

    #[test]
    fn test_invalid_order_rejected() {
        let result = Cli::try_parse_from([
            "geostream",
            "groups",
            "--data",
            "tracks.csv",
            "--order",
            "random",
        ]);
        assert!(result.is_err());
    }
}
