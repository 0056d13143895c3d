//! Resolves effective settings and wires library components together.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use media_acquire::{
    AcquisitionOrchestrator, BatchArchiver, ClientSession, DownloadController, HttpIdentityProvider,
    HttpParseClient, HttpQuotaService, HttpTimeouts, QuotaGate, RelayPool, SessionStore,
    StreamingFetcher,
};
use tracing::debug;

use crate::app_config::FileConfig;
use crate::cli::NetworkArgs;

/// Settings after merging CLI flags over the config file.
#[derive(Debug, Clone)]
pub(crate) struct RuntimeSettings {
    pub(crate) relays: Vec<String>,
    pub(crate) quota_endpoint: Option<String>,
    pub(crate) parse_endpoint: Option<String>,
    pub(crate) auth_endpoint: Option<String>,
    pub(crate) output_dir: PathBuf,
    pub(crate) state_dir: Option<PathBuf>,
    pub(crate) timeouts: HttpTimeouts,
}

impl RuntimeSettings {
    /// CLI values win over file values; defaults fill the rest.
    pub(crate) fn resolve(
        file: &FileConfig,
        network: Option<&NetworkArgs>,
        output_dir: Option<PathBuf>,
        state_dir: Option<PathBuf>,
    ) -> Self {
        let defaults = HttpTimeouts::default();
        let network = network.cloned().unwrap_or_default();

        let relays = if network.relays.is_empty() {
            file.relays.clone().unwrap_or_default()
        } else {
            network.relays
        };
        let connect = network
            .connect_timeout
            .or(file.connect_timeout_secs)
            .unwrap_or(defaults.connect.as_secs());
        let response = network
            .response_timeout
            .or(file.response_timeout_secs)
            .unwrap_or(defaults.response.as_secs());
        let read = network
            .read_timeout
            .or(file.read_timeout_secs)
            .unwrap_or(defaults.read.as_secs());

        Self {
            relays,
            quota_endpoint: file.quota_endpoint.clone(),
            parse_endpoint: file.parse_endpoint.clone(),
            auth_endpoint: file.auth_endpoint.clone(),
            output_dir: output_dir
                .or_else(|| file.output_dir.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            state_dir: state_dir.or_else(|| file.state_dir.clone()),
            timeouts: HttpTimeouts::from_secs(connect, response, read),
        }
    }

    pub(crate) fn open_session(&self) -> Result<Arc<ClientSession>> {
        let store = match &self.state_dir {
            Some(dir) => SessionStore::new(dir),
            None => SessionStore::at_default_location()?,
        };
        debug!(state_dir = %store.dir().display(), "opening session");
        let session = ClientSession::open(store).context("Failed to open session state")?;
        Ok(Arc::new(session))
    }

    pub(crate) fn quota_service(&self) -> Result<Arc<HttpQuotaService>> {
        let endpoint = self.quota_endpoint.as_deref().ok_or_else(|| {
            anyhow!("No quota endpoint configured; set `quota_endpoint` in the config file")
        })?;
        Ok(Arc::new(HttpQuotaService::new(endpoint, self.timeouts)?))
    }

    pub(crate) fn parse_client(&self) -> Result<HttpParseClient> {
        let endpoint = self.parse_endpoint.as_deref().ok_or_else(|| {
            anyhow!("No parse endpoint configured; set `parse_endpoint` in the config file")
        })?;
        Ok(HttpParseClient::new(endpoint, self.timeouts)?)
    }

    pub(crate) fn identity_provider(&self) -> Result<HttpIdentityProvider> {
        let endpoint = self.auth_endpoint.as_deref().ok_or_else(|| {
            anyhow!("No auth endpoint configured; set `auth_endpoint` in the config file")
        })?;
        Ok(HttpIdentityProvider::new(endpoint, self.timeouts)?)
    }

    fn orchestrator(&self) -> Result<Arc<AcquisitionOrchestrator>> {
        if self.relays.is_empty() {
            return Err(anyhow!(
                "No relays configured; set `relays` in the config file or pass --relay"
            ));
        }
        let pool = RelayPool::from_urls(self.relays.iter().cloned());
        let fetcher = StreamingFetcher::new(self.timeouts)?;
        Ok(Arc::new(AcquisitionOrchestrator::new(pool, fetcher)))
    }
}

/// Everything an acquisition command needs.
pub(crate) struct AcquireServices {
    pub(crate) parse: HttpParseClient,
    pub(crate) controller: DownloadController,
    pub(crate) archiver: BatchArchiver,
}

impl AcquireServices {
    pub(crate) fn build(settings: &RuntimeSettings) -> Result<Self> {
        let session = settings.open_session()?;
        let gate = QuotaGate::new(settings.quota_service()?, session);
        let orchestrator = settings.orchestrator()?;
        Ok(Self {
            parse: settings.parse_client()?,
            controller: DownloadController::new(Arc::clone(&orchestrator), gate.clone()),
            archiver: BatchArchiver::new(orchestrator, gate),
        })
    }
}
