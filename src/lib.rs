pub mod config;
pub mod fetch;
pub mod logging;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod retry;
pub mod score;
pub mod snapshot;
pub mod transport;
