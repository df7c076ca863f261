//! Report generation.

pub mod generator;

pub use generator::{describe_sample, write_report, RenderOptions};
