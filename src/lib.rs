// Library interface for the client selection tool
// The binary and the integration tests both build on these modules

pub mod api;
pub mod browser;
pub mod clock;
pub mod config;
pub mod gallery;
pub mod http_client;
pub mod metrics;
pub mod models;
pub mod report;
