//! Binary-side plumbing: settings resolution, progress UI, file output.

pub(crate) mod output;
pub(crate) mod progress_ui;
pub(crate) mod runtime;
