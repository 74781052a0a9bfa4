pub mod config;
pub mod contexts;
pub mod coverage;
pub mod data;
pub mod error;
pub mod logging;
pub mod providers;
pub mod registries;
pub mod runner;
pub mod watcher;
