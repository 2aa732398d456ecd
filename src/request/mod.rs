//! Request parameter resolution: raw transport data, source adapters, and
//! tolerant typed parsing.

pub mod raw;
pub mod resolver;
pub mod source;
