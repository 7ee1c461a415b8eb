//! Provider client: the public entry point of the runtime.
//!
//! Keep the public surface small: build a [`ProviderClient`] once, then call
//! [`ProviderClient::execute_request`] for every request. Implementation
//! details are split into submodules under `src/client/`.

pub mod assemble;
pub mod builder;
pub mod core;
mod execution;
pub mod timing;

pub use builder::{ClientConfig, ProviderClientBuilder, DEFAULT_MAX_ITERATIONS};
pub use core::ProviderClient;
