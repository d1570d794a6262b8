#![forbid(unsafe_code)]

//! Test harness and reference fixtures for cellmap.
//!
//! - [`domain`]: a small expression language and its [`domain::ExprFactory`].
//! - [`outline`]: text outlines of target trees and [`assert_outline!`].
//! - [`trace_capture`]: a tracing layer that records events for assertions.

pub mod domain;
pub mod outline;
pub mod trace_capture;

pub use domain::ExprFactory;
pub use outline::{content_outline, outline, overlay_outline};
