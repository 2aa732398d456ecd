//! Host collaborator surface: the query object, catalog records, ambient
//! listing state, and typed extension points.

pub mod catalog;
pub mod context;
pub mod criteria;
pub mod hooks;
