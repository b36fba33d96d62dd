pub mod config;
pub mod container;
pub mod error;
pub mod export;
pub mod geometry;
pub mod latent;
pub mod math;
pub mod operations;
pub mod pipeline;
pub mod reconstruct;
pub mod sequence;
pub mod server;
pub mod tessellation;
pub mod topology;
pub mod validity;

pub use error::{Error, ErrorKind, Result};
