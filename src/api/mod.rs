//! HTTP access to the open-data API.
//!
//! This module provides the retrying JSON client and the transport it
//! sends requests through.

pub mod client;
pub mod transport;

pub use client::{ApiClient, RetryPolicy};
pub use transport::{HttpResponse, Transport, TransportError};
