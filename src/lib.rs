//! Tracks how long desktop applications and websites are used each day.
//! A background daemon polls the foreground application and accepts usage batches from a browser
//! extension, both ending up as per day totals in a single SQLite database. The cli starts and
//! stops the daemon and renders daily reports.

pub mod cli;
pub mod config;
pub mod daemon;
pub mod report;
pub mod utils;
pub mod window_api;
