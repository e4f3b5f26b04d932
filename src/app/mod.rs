pub mod aapt;
pub mod classifier;
pub mod collector;
pub mod config;
pub mod device;
pub mod error;
pub mod events;
pub mod explorer;
pub mod extras;
pub mod fsutil;
pub mod logging;
pub mod manifest;
pub mod models;
pub mod recovery;
pub mod stats;
