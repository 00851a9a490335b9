use clap::Parser;

mod cli;
mod commands;
mod exit_codes;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            if let Err(io) = e.print() {
                eprintln!("Error: {}", io);
            }
            std::process::exit(parse_error_exit_code(&e));
        }
    };

    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    let exit_code = match cli.command {
        cli::Command::Publish(args) => commands::publish::execute(args).await,
        cli::Command::Subscribe(args) => commands::subscribe::execute(args).await,
        cli::Command::Groups(args) => commands::groups::execute(args),
    };

    std::process::exit(exit_code);
}

/// Exit code for a failed parse. clap would use 2 for usage errors, which
/// here means a transport failure, so usage errors map to `INPUT_ERROR`.
/// Help and version output are not errors.
fn parse_error_exit_code(error: &clap::Error) -> i32 {
    if error.use_stderr() {
        exit_codes::INPUT_ERROR
    } else {
        exit_codes::SUCCESS
    }
}
