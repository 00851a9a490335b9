//! Process exit codes shared by every subcommand

pub const SUCCESS: i32 = 0;
/// Bad arguments, configuration or dataset
pub const INPUT_ERROR: i32 = 1;
/// Could not bind or connect the ZeroMQ socket
pub const TRANSPORT_ERROR: i32 = 2;
/// The feed failed after it started
pub const RUNTIME_ERROR: i32 = 3;
