pub mod backend;
pub mod browse;
pub mod config;
pub mod default_colors;
pub mod link;
pub mod proxy;
pub mod traits;
pub mod types;
