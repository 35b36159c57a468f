//! Incrementally loaded, searchable list of books backed by the proxy.

pub mod client;
pub mod controller;
pub mod debounce;
pub mod desktop;
pub mod render;
pub mod state;

pub use client::{ClientError, ProxyClient};
pub use controller::{Command, Controller, ControllerHandle, ControllerOptions};
