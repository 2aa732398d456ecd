//! Query specification, relevance scoring, and host query injection.

pub mod builder;
pub mod injection;
pub mod scorer;
pub mod spec;
