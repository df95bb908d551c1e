//! The assembled marketplace: every component wired to one store, one clock
//! and one set of metrics.

use std::sync::Arc;

use souk_chain::{BalanceOracle, PaymentVerifier};
use souk_crypto::{PayloadCipher, SessionSigner};
use souk_store::MarketStore;
use souk_types::Clock;

use crate::access::AccessGate;
use crate::admin::AdminDesk;
use crate::audit::AuditLog;
use crate::config::MarketConfig;
use crate::lifecycle::ListingLifecycle;
use crate::metrics::MarketMetrics;
use crate::reports::ReportDesk;
use crate::settlement::SettlementEngine;
use crate::MarketError;

/// External collaborators the marketplace is built on.
#[derive(Clone)]
pub struct Collaborators {
    pub store: Arc<dyn MarketStore>,
    pub balance_oracle: Arc<dyn BalanceOracle>,
    pub payment_verifier: Arc<dyn PaymentVerifier>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Clone)]
pub struct Marketplace {
    pub lifecycle: ListingLifecycle,
    pub settlement: SettlementEngine,
    pub access: AccessGate,
    /// `None` when admin routes are disabled.
    pub admin: Option<AdminDesk>,
    pub reports: ReportDesk,
    pub audit: AuditLog,
    pub metrics: Arc<MarketMetrics>,
    enforce_access: bool,
}

impl Marketplace {
    pub fn new(config: &MarketConfig, deps: Collaborators) -> Result<Self, MarketError> {
        let delivery_key = config
            .delivery_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| MarketError::Config("delivery_key is required".into()))?;
        let cipher = Arc::new(PayloadCipher::from_secret(delivery_key.as_bytes())?);
        let metrics = Arc::new(MarketMetrics::new());
        let audit = AuditLog::new(deps.store.clone(), deps.clock.clone(), config.log_ttl_secs());

        let lifecycle = ListingLifecycle::new(
            deps.store.clone(),
            deps.clock.clone(),
            cipher.clone(),
            audit.clone(),
            metrics.clone(),
        );
        let settlement = SettlementEngine::new(
            deps.store.clone(),
            deps.payment_verifier.clone(),
            deps.clock.clone(),
            cipher,
            lifecycle.clone(),
            audit.clone(),
            metrics.clone(),
            config.duplicate_policy,
        );
        let access = AccessGate::new(
            deps.store.clone(),
            deps.balance_oracle.clone(),
            deps.clock.clone(),
            config.min_token_balance,
        );
        let reports = ReportDesk::new(
            deps.store.clone(),
            deps.clock.clone(),
            lifecycle.clone(),
            audit.clone(),
            metrics.clone(),
        );

        let admin = if config.disable_admin {
            None
        } else {
            let code = config
                .admin_code
                .as_deref()
                .filter(|c| !c.is_empty())
                .ok_or_else(|| MarketError::Config("admin_code is required".into()))?;
            let secret = config
                .session_secret
                .as_deref()
                .ok_or_else(|| MarketError::Config("session_secret is required".into()))?;
            Some(AdminDesk::new(
                code,
                SessionSigner::new(secret.as_bytes())?,
                deps.clock.clone(),
                lifecycle.clone(),
                audit.clone(),
                metrics.clone(),
            ))
        };

        tracing::info!(
            policy = ?config.duplicate_policy,
            enforce_access = config.enforce_access,
            admin = admin.is_some(),
            "marketplace ready"
        );

        Ok(Self {
            lifecycle,
            settlement,
            access,
            admin,
            reports,
            audit,
            metrics,
            enforce_access: config.enforce_access,
        })
    }

    pub fn enforces_access(&self) -> bool {
        self.enforce_access
    }

    /// Require a gated, terms-accepting wallet when access is enforced.
    pub fn require_access(&self, wallet: &str) -> Result<(), MarketError> {
        if self.enforce_access {
            self.access.authorize(wallet)?;
        }
        Ok(())
    }

    /// One sweep of the audit-log expiry.
    pub fn purge_expired_logs(&self) -> Result<u64, MarketError> {
        let removed = self.audit.purge_expired()?;
        self.metrics.logs_purged.inc_by(removed);
        Ok(removed)
    }
}
