pub mod app;
pub mod cli;
pub mod config;
pub mod journal;
pub mod storage;
pub mod ui;
pub mod wellness;

pub use config::{AppConfig, ConfigLoader, ConfigPaths};
