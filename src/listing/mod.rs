//! Listing output: pagination persistence, render-mode dispatch, and
//! result markup assembly.

pub mod card;
pub mod dispatcher;
pub mod pagination;
pub mod renderer;
pub mod template;
