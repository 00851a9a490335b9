use crate::cli::GroupsArgs;
use crate::exit_codes;
use crate::output;
use geostream::{group_by_time, Dataset, GroupOrder, PublisherConfig, TimeKey};
use serde::Serialize;

#[derive(Serialize)]
struct GroupSummary {
    key: TimeKey,
    rows: usize,
}

#[derive(Serialize)]
struct GroupsOutput {
    source: String,
    order: GroupOrder,
    total_rows: usize,
    groups: Vec<GroupSummary>,
}

pub fn execute(args: GroupsArgs) -> i32 {
    // Same schema and order the publisher would use
    let mut config = match PublisherConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };
    args.columns.apply(&mut config.columns);
    if let Some(order) = args.order {
        config.order = order;
    }
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

    let order = config.order;
    let summary = GroupsOutput {
        source: args.data.display().to_string(),
        order,
        total_rows: dataset.len(),
        groups: group_by_time(&dataset, order)
            .into_iter()
            .map(|g| GroupSummary {
                rows: g.len(),
                key: g.key,
            })
            .collect(),
    };

    let text = if args.json {
        match output::to_json(&summary, args.compact) {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Error: {}", e);
                return exit_codes::RUNTIME_ERROR;
            }
        }
    } else {
        let mut text = format!(
            "{}: {} rows in {} time buckets\n",
            summary.source,
            summary.total_rows,
            summary.groups.len()
        );
        text.push_str(&format!("{:<24} {:>8}", "TIME", "ROWS"));
        for group in &summary.groups {
            text.push_str(&format!("\n{:<24} {:>8}", group.key.to_string(), group.rows));
        }
        text
    };

    if let Err(e) = output::write_line(&text) {
        eprintln!("Error: {}", e);
        return exit_codes::RUNTIME_ERROR;
    }

    exit_codes::SUCCESS
}
