pub mod config;
pub mod error;
pub mod fetch;
pub mod pipeline;
pub mod storage;
pub mod transform;
pub mod warehouse;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{EtlError, TransportKind};
pub use pipeline::{Pipeline, RunStamp};
