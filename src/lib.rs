//! Weighted catalog search augmentation for storefront hosts.
//!
//! Resolves search and filter parameters from any transport the host
//! forwards them over, normalizes them into a query specification,
//! injects that specification into host catalog queries with weighted
//! SQL relevance ranking, keeps the active state on pagination links,
//! and serves a stateless listing-refresh endpoint.

pub mod cli;
pub mod config;
pub mod endpoint;
pub mod host;
pub mod listing;
pub mod query;
pub mod request;
pub mod store;
