//! Language server hosting annotations as inlay hints.

mod capabilities;
mod handlers;
mod server;
mod workspace;

pub use handlers::{CommandError, ServerState, CLEAR_COMMAND, EVALUATE_COMMAND};
pub use server::run_server;
pub use workspace::{ServerConfig, Workspace};
