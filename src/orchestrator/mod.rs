//! Application-level orchestration utilities.
//!
//! This module owns the generation lifecycle (single-flight requests, PDF export
//! tasks) and post-generation processing such as command-line exports. UI/CLI
//! layers call into this module to keep responsibilities separated.

mod controller;
mod post_process;

pub(crate) use controller::{run_controller, UiCommand};
pub(crate) use post_process::process_generation;
