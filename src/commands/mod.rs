//! CLI command handlers.

mod archive;
mod auth;
mod download;

pub(crate) use archive::run_archive_command;
pub(crate) use auth::{run_login_command, run_logout_command, run_quota_command};
pub(crate) use download::run_download_command;
