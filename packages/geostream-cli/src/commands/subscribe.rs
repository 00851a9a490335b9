use super::{cancel_on_ctrl_c, startup_exit_code};
use crate::cli::SubscribeArgs;
use crate::exit_codes;
use crate::output;
use geostream::record::format_coordinate;
use geostream::{FrameSubscriber, GroupRenderer, Record, SubscriberConfig};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

#[derive(Serialize)]
struct FrameOutput<'a> {
    frame: u64,
    records: &'a [Record],
}

/// Prints every group as it arrives
struct ConsoleRenderer {
    json: bool,
    frames: u64,
}

impl ConsoleRenderer {
    fn render(&self, records: &[Record]) -> Result<(), String> {
        if self.json {
            let frame = FrameOutput {
                frame: self.frames,
                records,
            };
            return output::write_line(&output::to_json(&frame, true)?);
        }

        let time = records
            .first()
            .map(|r| r.time.to_string())
            .unwrap_or_else(|| "-".to_string());
        let mut text = format!("[{}] time {} ({} records)", self.frames, time, records.len());
        for record in records {
            text.push_str(&format!(
                "\n  {:<12} {:>14} {:>14}",
                record.identity.to_string(),
                format_coordinate(record.longitude),
                format_coordinate(record.latitude)
            ));
        }
        output::write_line(&text)
    }
}

impl GroupRenderer for ConsoleRenderer {
    fn on_group_received(&mut self, records: Vec<Record>) {
        self.frames += 1;
        if let Err(e) = self.render(&records) {
            log::warn!("{}", e);
        }
    }
}

pub async fn execute(args: SubscribeArgs) -> i32 {
    let mut config = match SubscriberConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };
    args.apply(&mut config);

    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return exit_codes::INPUT_ERROR;
    }

    let endpoint = config.endpoint();
    let mut subscriber = match FrameSubscriber::connect(config).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {}", e);
            return startup_exit_code(&e);
        }
    };
    log::info!("Subscribed to {}", endpoint);

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let mut renderer = ConsoleRenderer {
        json: args.json,
        frames: 0,
    };

    match subscriber.run(&mut renderer, cancel).await {
        Ok(stats) => {
            log::info!(
                "Received {} frames, {} decoded, {} dropped",
                stats.frames_received,
                stats.frames_decoded,
                stats.decode_failures
            );
            exit_codes::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            exit_codes::RUNTIME_ERROR
        }
    }
}
