//! Purchase settlement keyed on the payment reference.
//!
//! A payment reference settles at most one purchase. The pre-check against
//! existing transactions saves a verifier round trip; the authoritative check
//! is the store's atomic `commit_purchase`.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use souk_chain::PaymentVerifier;
use souk_crypto::PayloadCipher;
use souk_store::{
    MarketStore, PurchaseCommit, PurchaseDraft, StoreError, TransactionRecord, TransactionStore,
};
use souk_types::{Clock, ListingStatus, LogKind, TransactionId, UsdcAmount, WalletAddress};

use crate::audit::AuditLog;
use crate::config::DuplicatePolicy;
use crate::lifecycle::ListingLifecycle;
use crate::metrics::MarketMetrics;
use crate::validation::{parse_wallet, validate_reference};
use crate::MarketError;

/// A buyer's purchase claim, as received.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    pub listing_id: String,
    pub buyer_wallet: String,
    pub seller_wallet: String,
    /// Amount paid, in USDC.
    pub amount: f64,
    #[serde(alias = "txnHash")]
    pub payment_reference: String,
    /// Filled in by the calling surface, never by the client.
    #[serde(skip)]
    pub caller_ip: Option<String>,
}

/// Proof of purchase together with the disclosed delivery payload.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub transaction_id: String,
    #[serde(rename = "deliveryUrl")]
    pub delivery_payload: String,
    /// True when this answers a repeated submission of a recorded purchase.
    pub replayed: bool,
}

struct ValidPurchase {
    buyer: WalletAddress,
    seller: WalletAddress,
    amount: UsdcAmount,
}

#[derive(Clone)]
pub struct SettlementEngine {
    store: Arc<dyn MarketStore>,
    verifier: Arc<dyn PaymentVerifier>,
    clock: Arc<dyn Clock>,
    cipher: Arc<PayloadCipher>,
    lifecycle: ListingLifecycle,
    audit: AuditLog,
    metrics: Arc<MarketMetrics>,
    policy: DuplicatePolicy,
}

impl SettlementEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn MarketStore>,
        verifier: Arc<dyn PaymentVerifier>,
        clock: Arc<dyn Clock>,
        cipher: Arc<PayloadCipher>,
        lifecycle: ListingLifecycle,
        audit: AuditLog,
        metrics: Arc<MarketMetrics>,
        policy: DuplicatePolicy,
    ) -> Self {
        Self {
            store,
            verifier,
            clock,
            cipher,
            lifecycle,
            audit,
            metrics,
            policy,
        }
    }

    /// Settle a purchase and disclose the delivery payload.
    pub async fn purchase(&self, request: &PurchaseRequest) -> Result<Receipt, MarketError> {
        let started = Instant::now();
        let result = self.settle(request).await;
        self.metrics
            .settlement_time_ms
            .observe(started.elapsed().as_secs_f64() * 1000.0);

        if let Err(e) = &result {
            tracing::info!(
                operation = "purchase",
                listing_id = %request.listing_id,
                error = %e,
                "purchase refused"
            );
        }
        result
    }

    async fn settle(&self, request: &PurchaseRequest) -> Result<Receipt, MarketError> {
        let buyer = parse_wallet(&request.buyer_wallet)?;
        let seller = parse_wallet(&request.seller_wallet)?;
        let reference = validate_reference(&request.payment_reference)?;
        let amount = UsdcAmount::from_f64(request.amount)
            .ok()
            .filter(|a| !a.is_zero())
            .ok_or_else(|| MarketError::Validation("amount must be greater than zero".into()))?;

        let listing = self.lifecycle.load(&request.listing_id)?;
        if listing.status != ListingStatus::Live {
            return Err(MarketError::NotPurchasable(listing.status));
        }
        if seller != listing.wallet {
            return Err(MarketError::Validation(
                "seller wallet does not own this listing".into(),
            ));
        }
        if amount < listing.price {
            return Err(MarketError::Validation(format!(
                "amount {amount} is below the listing price {}",
                listing.price
            )));
        }

        let claim = ValidPurchase {
            buyer,
            seller,
            amount,
        };

        if let Some(existing) = self.store.find_by_reference(reference)? {
            return self.resolve_duplicate(&existing, &listing.id.to_hex(), &claim, request);
        }

        if !self.verifier.verify(reference).await? {
            self.metrics.payments_unverified.inc();
            self.audit.record(
                LogKind::PurchaseFailed,
                format!("payment {reference} not verified for listing {}", listing.id),
                Some(&claim.buyer),
                None,
            );
            if let Err(e) = self.lifecycle.record_failed_purchase(&listing.id) {
                tracing::warn!(listing_id = %listing.id, error = %e, "failed to count failed purchase");
            }
            return Err(MarketError::PaymentNotVerified);
        }

        let draft = PurchaseDraft {
            id: TransactionId::generate(),
            listing_id: listing.id,
            buyer_wallet: claim.buyer.clone(),
            seller_wallet: claim.seller.clone(),
            amount: claim.amount,
            payment_reference: reference.to_string(),
            created_at: self.clock.now(),
        };

        let tx = match self.store.commit_purchase(&draft) {
            Ok(PurchaseCommit::Recorded(tx)) => tx,
            Ok(PurchaseCommit::Duplicate(existing)) => {
                return self.resolve_duplicate(&existing, &listing.id.to_hex(), &claim, request);
            }
            Ok(PurchaseCommit::NotPurchasable(status)) => {
                return Err(MarketError::NotPurchasable(status));
            }
            Err(StoreError::NotFound(_)) => {
                return Err(MarketError::NotFound(format!("listing {}", listing.id)));
            }
            Err(e) => return Err(e.into()),
        };

        self.metrics.purchases_recorded.inc();
        self.audit.record(
            LogKind::Purchase,
            format!(
                "{} bought listing {} for {} USDC ({})",
                tx.buyer_wallet.short(),
                tx.listing_id,
                tx.amount,
                tx.payment_reference
            ),
            Some(&tx.buyer_wallet),
            None,
        );
        tracing::info!(
            operation = "purchase",
            listing_id = %tx.listing_id,
            transaction_id = %tx.id,
            wallet = tx.buyer_wallet.short(),
            "purchase recorded"
        );
        self.receipt(&tx, false)
    }

    fn resolve_duplicate(
        &self,
        existing: &TransactionRecord,
        listing_id: &str,
        claim: &ValidPurchase,
        request: &PurchaseRequest,
    ) -> Result<Receipt, MarketError> {
        let reference = existing.payment_reference.as_str();
        if self.policy == DuplicatePolicy::ReturnExisting {
            let same_purchase = existing.listing_id.to_hex() == listing_id
                && existing.buyer_wallet == claim.buyer
                && existing.seller_wallet == claim.seller
                && existing.amount == claim.amount;
            if same_purchase {
                self.metrics.purchases_replayed.inc();
                tracing::info!(
                    operation = "purchase",
                    transaction_id = %existing.id,
                    "replayed recorded purchase"
                );
                return self.receipt(existing, true);
            }
            self.audit.record(
                LogKind::FraudAttempt,
                format!(
                    "payment {reference} of transaction {} reused for listing {listing_id}",
                    existing.id
                ),
                Some(&claim.buyer),
                request.caller_ip.as_deref(),
            );
            tracing::warn!(
                operation = "purchase",
                listing_id,
                wallet = claim.buyer.short(),
                "payment reference reused with different purchase details"
            );
        }
        self.metrics.duplicate_payments.inc();
        Err(MarketError::DuplicatePayment(reference.to_string()))
    }

    fn receipt(&self, tx: &TransactionRecord, replayed: bool) -> Result<Receipt, MarketError> {
        let delivery_payload = self
            .cipher
            .open(tx.listing_id.as_bytes(), &tx.delivery_payload)?;
        Ok(Receipt {
            transaction_id: tx.id.to_hex(),
            delivery_payload,
            replayed,
        })
    }
}
