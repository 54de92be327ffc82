pub mod components;
pub mod config;
pub mod digest;
pub mod error;
pub mod utils;
