pub mod analysis;
pub mod config;
pub mod core;
pub mod db;
pub mod error;
pub mod fetcher;
pub mod indicators;
pub mod logging;
pub mod models;
pub mod render;

pub use crate::config::Config;
pub use crate::error::{BriefError, Result};
