pub mod client;
pub mod config;
pub mod format;
pub mod rest_types;
pub mod ui;
