/// Process execution, retry and polling helpers
pub mod command;
pub mod polling;
pub mod retry;

pub use command::{CommandBuilder, CommandError};
pub use polling::PollingConfig;
pub use retry::{run_until_success, RetryPolicy};
