#![forbid(unsafe_code)]
#![warn(
    clippy::cargo,
    clippy::suspicious,
    // missing_docs,
    clippy::nursery,
    rust_2018_idioms
)]

pub mod collection;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod registry;
pub mod settings;
pub mod template;
pub mod timeline;
pub mod topology;

pub type Result<T> = anyhow::Result<T>;
