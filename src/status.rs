//! Everything the pipeline knows about the upstream service: the tracked
//! component model, and the two parsers that turn upstream payloads into it.
//!
//! The two parsing contracts share no state; see [page] and [feed].

pub mod feed;
pub mod model;
pub mod page;
