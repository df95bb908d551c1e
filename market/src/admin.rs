//! Admin moderation: code login, signed sessions and listing moderation.

use std::sync::Arc;

use souk_crypto::SessionSigner;
use souk_types::{Clock, LogKind, RiskLevel, Timestamp};
use zeroize::Zeroizing;

use crate::audit::AuditLog;
use crate::lifecycle::ListingLifecycle;
use crate::metrics::MarketMetrics;
use crate::view::ListingView;
use crate::MarketError;

/// Lifetime of an admin session token.
pub const SESSION_TTL_SECS: u64 = 24 * 60 * 60;

const ADMIN_SUBJECT: &str = "admin";

/// A freshly issued admin session.
#[derive(Clone, Debug)]
pub struct AdminSession {
    pub token: String,
    pub expires_at: Timestamp,
}

#[derive(Clone)]
pub struct AdminDesk {
    code: Arc<Zeroizing<String>>,
    signer: Arc<SessionSigner>,
    clock: Arc<dyn Clock>,
    lifecycle: ListingLifecycle,
    audit: AuditLog,
    metrics: Arc<MarketMetrics>,
}

impl AdminDesk {
    pub fn new(
        code: &str,
        signer: SessionSigner,
        clock: Arc<dyn Clock>,
        lifecycle: ListingLifecycle,
        audit: AuditLog,
        metrics: Arc<MarketMetrics>,
    ) -> Self {
        Self {
            code: Arc::new(Zeroizing::new(code.to_string())),
            signer: Arc::new(signer),
            clock,
            lifecycle,
            audit,
            metrics,
        }
    }

    /// Exchange the admin code for a session token.
    pub fn login(&self, code: &str, ip: Option<&str>) -> Result<AdminSession, MarketError> {
        if !self.signer.secrets_match(&self.code, code) {
            self.metrics.admin_login_failures.inc();
            self.audit
                .record(LogKind::AdminFail, "admin login rejected", None, ip);
            tracing::warn!(operation = "admin_login", ip = ip.unwrap_or("-"), "bad admin code");
            return Err(MarketError::Unauthorized);
        }

        let expires_at = self.clock.now().saturating_add_secs(SESSION_TTL_SECS);
        let token = self.signer.issue(ADMIN_SUBJECT, expires_at)?;
        self.audit
            .record(LogKind::AdminLogin, "admin logged in", None, ip);
        tracing::info!(operation = "admin_login", "admin session issued");
        Ok(AdminSession { token, expires_at })
    }

    pub fn verify_session(&self, token: &str) -> Result<(), MarketError> {
        match self.signer.verify(token, self.clock.now()) {
            Ok(subject) if subject == ADMIN_SUBJECT => Ok(()),
            Ok(_) => Err(MarketError::Unauthorized),
            Err(e) => {
                tracing::debug!(error = %e, "admin session rejected");
                Err(MarketError::Unauthorized)
            }
        }
    }

    pub fn list_all(&self) -> Result<Vec<ListingView>, MarketError> {
        self.lifecycle.list_all()
    }

    pub fn approve(&self, id: &str) -> Result<ListingView, MarketError> {
        let view = self.lifecycle.approve(id)?;
        self.moderated("approved", &view);
        Ok(view)
    }

    pub fn reject(&self, id: &str) -> Result<ListingView, MarketError> {
        let view = self.lifecycle.reject(id)?;
        self.moderated("rejected", &view);
        Ok(view)
    }

    pub fn set_risk(&self, id: &str, level: RiskLevel) -> Result<ListingView, MarketError> {
        let view = self.lifecycle.set_risk(id, level)?;
        self.moderated(&format!("marked {level}"), &view);
        Ok(view)
    }

    fn moderated(&self, action: &str, view: &ListingView) {
        self.metrics.listings_moderated.inc();
        self.audit.record(
            LogKind::ListingModerated,
            format!("listing {} {action}", view.id),
            None,
            None,
        );
    }
}
