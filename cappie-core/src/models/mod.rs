pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod output;
pub mod permission;
pub mod recording;
pub mod sample;
