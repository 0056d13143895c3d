//! Session command handlers: login, logout, quota status.

use std::fmt::Write as _;
use std::io::{self, IsTerminal, Read};

use anyhow::{Result, anyhow, bail};
use media_acquire::{ClientSession, QuotaCategory, QuotaSnapshot};
use tracing::{info, warn};

use crate::app::runtime::RuntimeSettings;

pub(crate) async fn run_login_command(settings: &RuntimeSettings, token: Option<String>) -> Result<()> {
    let token = match token {
        Some(token) => token,
        None => read_token_input()?,
    };

    let session = settings.open_session()?;
    let provider = settings.identity_provider()?;
    let quota = settings.quota_service()?;

    let profile = session
        .login(&provider, &token, quota.as_ref())
        .await
        .map_err(|error| anyhow!("Login failed: {error}"))?;

    info!(user = profile.display_name(), "Signed in");
    log_snapshot(&session);
    Ok(())
}

pub(crate) async fn run_logout_command(settings: &RuntimeSettings) -> Result<()> {
    let session = settings.open_session()?;
    let quota = settings.quota_service()?;

    if session.user().is_none() {
        info!("Not signed in");
        return Ok(());
    }
    session
        .logout(quota.as_ref())
        .await
        .map_err(|error| anyhow!("Logout failed: {error}"))?;
    info!("Signed out");
    log_snapshot(&session);
    Ok(())
}

pub(crate) async fn run_quota_command(settings: &RuntimeSettings) -> Result<()> {
    let session = settings.open_session()?;
    let quota = settings.quota_service()?;

    match session.user() {
        Some(profile) => info!(user = profile.display_name(), "Signed in"),
        None => info!(fingerprint = %session.fingerprint(), "Guest"),
    }
    session
        .refresh_quota(quota.as_ref())
        .await
        .map_err(|error| anyhow!("Failed to fetch usage: {error}"))?;
    log_snapshot(&session);
    Ok(())
}

fn log_snapshot(session: &ClientSession) {
    match session.snapshot() {
        Some(snapshot) => info!("{}", format_snapshot(&snapshot)),
        None => warn!("Usage unavailable"),
    }
}

fn format_snapshot(snapshot: &QuotaSnapshot) -> String {
    let mut line = format!(
        "Plan {:?}: {} downloads, {} extractions, {} summaries",
        snapshot.plan,
        snapshot.count(QuotaCategory::Download),
        snapshot.count(QuotaCategory::Extract),
        snapshot.count(QuotaCategory::Summary),
    );
    if let Some(expire) = &snapshot.expire_time {
        let _ = write!(line, " (renews {expire})");
    }
    line
}

fn read_token_input() -> Result<String> {
    if io::stdin().is_terminal() {
        info!("Paste your access token, then press Enter:");
        let mut line = String::new();
        io::stdin().read_line(&mut line)?;
        return non_empty(line);
    }
    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    non_empty(buffer)
}

fn non_empty(raw: String) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("No access token provided");
    }
    Ok(trimmed.to_string())
}
