use super::{cancel_on_ctrl_c, startup_exit_code};
use crate::cli::PublishArgs;
use crate::exit_codes;
use geostream::{Dataset, FramePublisher, Partitioner, PublisherConfig};
use tokio_util::sync::CancellationToken;

pub async fn execute(args: PublishArgs) -> i32 {
    let mut config = match PublisherConfig::from_env() {
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

    let dataset = match Dataset::load(&args.data, &config.columns) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: failed to load '{}': {}", args.data.display(), e);
            return exit_codes::INPUT_ERROR;
        }
    };
    let mut partitioner = Partitioner::new(&dataset, config.order);

    let mut publisher = match FramePublisher::bind(config).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: {}", e);
            return startup_exit_code(&e);
        }
    };

    eprintln!(
        "Publishing {} rows in {} time buckets on port {}",
        dataset.len(),
        partitioner.len(),
        publisher
            .port()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string())
    );

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let stats = publisher.run(&mut partitioner, cancel).await;

    eprintln!(
        "Stopped after {} frames ({} send failures, {} full cycles)",
        stats.frames_sent, stats.send_failures, stats.cycles_completed
    );

    exit_codes::SUCCESS
}
