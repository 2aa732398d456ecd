//! Asynchronous listing refresh endpoint.

pub mod refresh;
