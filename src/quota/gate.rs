//! Check-then-consume wrapper around the quota service.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use crate::session::ClientSession;

use super::{QuotaCategory, QuotaError, QuotaService, QuotaSnapshot};

/// Result of a consume call that reached the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumeOutcome {
    /// Whether the service recorded the units.
    pub success: bool,
    /// Snapshot returned with the outcome, which is now the session's cached one.
    pub usage: Option<QuotaSnapshot>,
}

/// Gates billable operations on the quota service.
///
/// `check` runs before work starts and fails closed. `consume` runs only
/// after work succeeded and is the only place the cached snapshot changes
/// outside an explicit refresh.
#[derive(Clone)]
pub struct QuotaGate {
    service: Arc<dyn QuotaService>,
    session: Arc<ClientSession>,
}

impl std::fmt::Debug for QuotaGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuotaGate")
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

impl QuotaGate {
    /// Creates a gate that meters under `session`'s current identity.
    #[must_use]
    pub fn new(service: Arc<dyn QuotaService>, session: Arc<ClientSession>) -> Self {
        Self { service, session }
    }

    /// Session the gate reads identity from and writes snapshots to.
    #[must_use]
    pub fn session(&self) -> &Arc<ClientSession> {
        &self.session
    }

    /// Underlying service.
    #[must_use]
    pub fn service(&self) -> &Arc<dyn QuotaService> {
        &self.service
    }

    /// Returns whether `units` of `category` may be spent.
    ///
    /// Any failure to reach or understand the service yields `false`.
    #[instrument(skip(self), fields(%category, units))]
    pub async fn check(&self, category: QuotaCategory, units: u32) -> bool {
        let identity = self.session.identity();
        match self.service.check(&identity, category, units).await {
            Ok(response) => response.allowed,
            Err(error) => {
                warn!(error = %error, "quota check failed, treating as not allowed");
                false
            }
        }
    }

    /// Records `units` of `category` as spent.
    ///
    /// On an accepted consume the returned snapshot replaces the session's
    /// cached snapshot, unless the session switched identity while the call
    /// was in flight.
    ///
    /// # Errors
    ///
    /// - [`QuotaError::InvalidUnitCount`] when `units` is zero; the service is not called
    /// - any transport, status, or decode error from the service
    #[instrument(skip(self), fields(%category, units))]
    pub async fn consume(
        &self,
        category: QuotaCategory,
        units: u32,
    ) -> Result<ConsumeOutcome, QuotaError> {
        if units == 0 {
            return Err(QuotaError::InvalidUnitCount { units });
        }

        let identity = self.session.identity();
        let response = self.service.consume(&identity, category, units).await?;
        let success = response.succeeded();

        if success
            && let Some(snapshot) = &response.usage
            && !self
                .session
                .replace_snapshot_if_current(&identity, snapshot.clone())
        {
            debug!(%identity, "identity changed during consume, snapshot discarded");
        }
        if !success {
            warn!(
                message = response.message.as_deref().unwrap_or(""),
                "quota service refused consume"
            );
        }

        Ok(ConsumeOutcome {
            success,
            usage: response.usage,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::quota::{CheckResponse, ConsumeResponse, Plan};
    use crate::session::{Identity, IdentityProvider, SessionError, UserProfile};

    #[derive(Default)]
    struct ScriptedService {
        allowed: bool,
        fail_check: bool,
        consume_usage: Option<QuotaSnapshot>,
        calls: Mutex<Vec<(String, QuotaCategory, u32)>>,
    }

    #[async_trait]
    impl QuotaService for ScriptedService {
        async fn check(
            &self,
            identity: &Identity,
            category: QuotaCategory,
            units: u32,
        ) -> Result<CheckResponse, QuotaError> {
            self.calls
                .lock()
                .unwrap()
                .push((format!("check {identity}"), category, units));
            if self.fail_check {
                return Err(QuotaError::http_status("mock", 503));
            }
            Ok(CheckResponse {
                allowed: self.allowed,
                usage: None,
            })
        }

        async fn consume(
            &self,
            identity: &Identity,
            category: QuotaCategory,
            units: u32,
        ) -> Result<ConsumeResponse, QuotaError> {
            self.calls
                .lock()
                .unwrap()
                .push((format!("consume {identity}"), category, units));
            Ok(ConsumeResponse {
                success: Some(self.consume_usage.is_some()),
                usage: self.consume_usage.clone(),
                message: None,
            })
        }
    }

    fn gate(service: ScriptedService) -> (QuotaGate, Arc<ScriptedService>, Arc<ClientSession>) {
        let service = Arc::new(service);
        let session = Arc::new(ClientSession::in_memory("guest_test"));
        let gate = QuotaGate::new(service.clone(), session.clone());
        (gate, service, session)
    }

    #[tokio::test]
    async fn test_check_fails_closed_on_service_error() {
        let (gate, _, _) = gate(ScriptedService {
            allowed: true,
            fail_check: true,
            ..ScriptedService::default()
        });
        assert!(!gate.check(QuotaCategory::Download, 1).await);
    }

    #[tokio::test]
    async fn test_check_does_not_touch_snapshot() {
        let (gate, _, session) = gate(ScriptedService {
            allowed: true,
            ..ScriptedService::default()
        });
        assert!(gate.check(QuotaCategory::Download, 1).await);
        assert!(session.snapshot().is_none());
    }

    #[tokio::test]
    async fn test_consume_zero_units_never_calls_service() {
        let (gate, service, _) = gate(ScriptedService::default());
        let result = gate.consume(QuotaCategory::Download, 0).await;
        assert!(matches!(result, Err(QuotaError::InvalidUnitCount { units: 0 })));
        assert!(service.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_consume_success_replaces_snapshot() {
        let usage = QuotaSnapshot {
            plan: Plan::Pro,
            download_count: 5,
            ..QuotaSnapshot::default()
        };
        let (gate, service, session) = gate(ScriptedService {
            consume_usage: Some(usage.clone()),
            ..ScriptedService::default()
        });

        let outcome = gate.consume(QuotaCategory::Download, 3).await.unwrap();

        assert!(outcome.success);
        assert_eq!(session.snapshot(), Some(usage));
        let calls = service.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![("consume guest:guest_test".to_string(), QuotaCategory::Download, 3)]
        );
    }

    #[tokio::test]
    async fn test_consume_refusal_leaves_snapshot() {
        let (gate, _, session) = gate(ScriptedService::default());
        let outcome = gate.consume(QuotaCategory::Download, 1).await.unwrap();
        assert!(!outcome.success);
        assert!(session.snapshot().is_none());
    }

    /// Signs a user in from inside `consume`, then answers with the
    /// guest's usage, as a slow consume racing a login would.
    struct LoginDuringConsume {
        session: Arc<ClientSession>,
    }

    struct FixedUser;

    #[async_trait]
    impl IdentityProvider for FixedUser {
        async fn exchange(&self, _access_token: &str) -> Result<UserProfile, SessionError> {
            Ok(UserProfile {
                id: "u-1".to_string(),
                email: None,
                name: None,
                avatar: None,
            })
        }
    }

    #[async_trait]
    impl QuotaService for LoginDuringConsume {
        async fn check(
            &self,
            _identity: &Identity,
            _category: QuotaCategory,
            _units: u32,
        ) -> Result<CheckResponse, QuotaError> {
            Ok(CheckResponse {
                allowed: true,
                usage: Some(QuotaSnapshot {
                    plan: Plan::Elite,
                    ..QuotaSnapshot::default()
                }),
            })
        }

        async fn consume(
            &self,
            _identity: &Identity,
            _category: QuotaCategory,
            _units: u32,
        ) -> Result<ConsumeResponse, QuotaError> {
            self.session.login(&FixedUser, "tok", self).await.unwrap();
            Ok(ConsumeResponse {
                success: Some(true),
                usage: Some(QuotaSnapshot {
                    plan: Plan::Free,
                    download_count: 99,
                    ..QuotaSnapshot::default()
                }),
                message: None,
            })
        }
    }

    #[tokio::test]
    async fn test_consume_after_identity_switch_keeps_new_identity_snapshot() {
        let session = Arc::new(ClientSession::in_memory("guest_test"));
        let service = Arc::new(LoginDuringConsume {
            session: session.clone(),
        });
        let gate = QuotaGate::new(service, session.clone());

        let outcome = gate.consume(QuotaCategory::Download, 1).await.unwrap();

        assert!(outcome.success);
        assert_eq!(outcome.usage.map(|u| u.download_count), Some(99));
        assert_eq!(
            session.identity(),
            Identity::User {
                id: "u-1".to_string()
            }
        );
        let cached = session.snapshot().unwrap();
        assert_eq!(cached.plan, Plan::Elite);
        assert_eq!(cached.download_count, 0);
    }
}
