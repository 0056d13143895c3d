//! Client session: who the user is and what the quota service last said.
//!
//! [`ClientSession`] is the single owner of identity and the cached
//! [`QuotaSnapshot`]. Components read it through an `Arc`; the snapshot is
//! only written by quota consume responses and explicit refreshes.

mod error;
mod identity;
mod store;

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, instrument, warn};

use crate::quota::{QuotaCategory, QuotaError, QuotaService, QuotaSnapshot};

pub use error::SessionError;
pub use identity::{HttpIdentityProvider, Identity, IdentityProvider, UserProfile};
pub use store::{SessionStore, StoredSession};

#[derive(Debug)]
struct SessionState {
    fingerprint: String,
    user: Option<StoredSession>,
    snapshot: Option<QuotaSnapshot>,
}

/// Shared session state for one client install.
#[derive(Debug)]
pub struct ClientSession {
    store: Option<SessionStore>,
    state: RwLock<SessionState>,
}

impl ClientSession {
    /// Opens the session persisted in `store`, creating a fingerprint if needed.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the state files cannot be read or written.
    pub fn open(store: SessionStore) -> Result<Self, SessionError> {
        let fingerprint = store.load_or_create_fingerprint()?;
        let user = match store.load_session() {
            Ok(user) => user,
            Err(SessionError::Json(error)) => {
                warn!(error = %error, "discarding unreadable session file");
                None
            }
            Err(error) => return Err(error),
        };
        Ok(Self {
            store: Some(store),
            state: RwLock::new(SessionState {
                fingerprint,
                user,
                snapshot: None,
            }),
        })
    }

    /// A session that keeps nothing on disk.
    #[must_use]
    pub fn in_memory(fingerprint: impl Into<String>) -> Self {
        Self {
            store: None,
            state: RwLock::new(SessionState {
                fingerprint: fingerprint.into(),
                user: None,
                snapshot: None,
            }),
        }
    }

    /// Identity quota is metered against right now.
    #[must_use]
    pub fn identity(&self) -> Identity {
        let state = self.read();
        match &state.user {
            Some(user) => Identity::User {
                id: user.profile.id.clone(),
            },
            None => Identity::Guest {
                fingerprint: state.fingerprint.clone(),
            },
        }
    }

    /// Guest fingerprint of this install, whether or not a user is signed in.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        self.read().fingerprint.clone()
    }

    /// Signed-in profile, if any.
    #[must_use]
    pub fn user(&self) -> Option<UserProfile> {
        self.read().user.as_ref().map(|u| u.profile.clone())
    }

    /// Last snapshot the quota service returned for the current identity.
    #[must_use]
    pub fn snapshot(&self) -> Option<QuotaSnapshot> {
        self.read().snapshot.clone()
    }

    /// Caches `snapshot` if `identity` is still the session's identity.
    ///
    /// Returns false, leaving the cache untouched, when a login or logout
    /// happened after `identity` was read.
    pub(crate) fn replace_snapshot_if_current(
        &self,
        identity: &Identity,
        snapshot: QuotaSnapshot,
    ) -> bool {
        let mut state = self.write();
        let still_current = match (identity, &state.user) {
            (Identity::User { id }, Some(user)) => *id == user.profile.id,
            (Identity::Guest { .. }, None) => true,
            _ => false,
        };
        if still_current {
            state.snapshot = Some(snapshot);
        }
        still_current
    }

    /// Signs in with an access token from the auth provider.
    ///
    /// Identity switches to the returned user, the cached snapshot is
    /// dropped and a refresh is attempted. A failed refresh leaves the
    /// snapshot empty without failing the login.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] when the token is blank, the exchange fails,
    /// or the session cannot be persisted. Identity is unchanged on error.
    #[instrument(skip(self, provider, access_token, quota))]
    pub async fn login(
        &self,
        provider: &dyn IdentityProvider,
        access_token: &str,
        quota: &dyn QuotaService,
    ) -> Result<UserProfile, SessionError> {
        let access_token = access_token.trim();
        if access_token.is_empty() {
            return Err(SessionError::EmptyToken);
        }

        let profile = provider.exchange(access_token).await?;
        let stored = StoredSession {
            profile: profile.clone(),
            access_token: access_token.to_string(),
        };
        if let Some(store) = &self.store {
            store.save_session(&stored)?;
        }
        {
            let mut state = self.write();
            state.user = Some(stored);
            state.snapshot = None;
        }
        info!(user_id = %profile.id, "signed in");

        self.refresh_best_effort(quota).await;
        Ok(profile)
    }

    /// Signs out, reverting to the guest identity.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Io`] when the persisted session cannot be removed.
    #[instrument(skip(self, quota))]
    pub async fn logout(&self, quota: &dyn QuotaService) -> Result<(), SessionError> {
        if let Some(store) = &self.store {
            store.clear_session()?;
        }
        {
            let mut state = self.write();
            state.user = None;
            state.snapshot = None;
        }
        info!("signed out");

        self.refresh_best_effort(quota).await;
        Ok(())
    }

    /// Fetches a fresh snapshot for the current identity and caches it.
    ///
    /// Implemented as a zero-unit check, which the service answers with
    /// the current usage.
    ///
    /// # Errors
    ///
    /// Returns [`QuotaError`] when the service fails or sends no usage.
    #[instrument(skip(self, quota))]
    pub async fn refresh_quota(
        &self,
        quota: &dyn QuotaService,
    ) -> Result<QuotaSnapshot, QuotaError> {
        let identity = self.identity();
        let response = quota.check(&identity, QuotaCategory::Download, 0).await?;
        let snapshot = response
            .usage
            .ok_or_else(|| QuotaError::missing_usage("refresh"))?;

        if !self.replace_snapshot_if_current(&identity, snapshot.clone()) {
            debug!(%identity, "identity changed during refresh, snapshot discarded");
        }
        Ok(snapshot)
    }

    async fn refresh_best_effort(&self, quota: &dyn QuotaService) {
        if let Err(error) = self.refresh_quota(quota).await {
            warn!(error = %error, "quota refresh failed, snapshot left empty");
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SessionState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SessionState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
