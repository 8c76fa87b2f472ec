pub mod client;
pub mod config;
pub mod mocks;

pub use client::{DeviceApi, DeviceClient, DeviceError};
pub use config::DeviceConfig;
