#![doc = "Common types shared across the robot HAL workspace."]

pub mod config;
pub mod error;
pub mod handles;
pub mod time;

pub use config::*;
pub use error::*;
pub use handles::*;
pub use time::*;
