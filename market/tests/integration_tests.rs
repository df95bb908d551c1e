//! End-to-end marketplace flows:
//! submit → review → approve → purchase → disclose, plus reports and the
//! duplicate-payment guard, against both the in-memory and the LMDB store.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use souk_chain::{ChainError, PaymentVerifier};
use souk_market::{
    Collaborators, DuplicatePolicy, MarketConfig, MarketError, Marketplace, PurchaseRequest,
    SubmitListing,
};
use souk_nullables::{NullBalanceOracle, NullClock, NullPaymentVerifier, NullStore};
use souk_store::{ListingStore, LogStore, MarketStore, TransactionStore};
use souk_store_lmdb::LmdbEnvironment;
use souk_types::{ListingStatus, LogKind, Timestamp, TransactionStatus};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const SELLER: &str = "7xKXtg2CW87d97TXJSDpbD5jBkheTqA83TZRuJosgAsU";
const BUYER: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
const OTHER_BUYER: &str = "HN7cABqLq46Es1jh92dQQisAq662SmxELLLsHHe4YWrH";
const PAYLOAD: &str = "https://files.example/trading-bot-pro-x.zip?token=s3cr3t";

struct Harness {
    market: Marketplace,
    store: Arc<dyn MarketStore>,
    verifier: Arc<NullPaymentVerifier>,
    clock: Arc<NullClock>,
}

fn config(policy: DuplicatePolicy) -> MarketConfig {
    MarketConfig {
        mock_chain: true,
        duplicate_policy: policy,
        admin_code: Some("admin-code".into()),
        session_secret: Some("session-secret".into()),
        delivery_key: Some("delivery-key".into()),
        ..MarketConfig::default()
    }
}

fn harness_with(store: Arc<dyn MarketStore>, policy: DuplicatePolicy) -> Harness {
    let verifier = Arc::new(NullPaymentVerifier::accept_all());
    let clock = Arc::new(NullClock::new(1_700_000_000));
    let market = Marketplace::new(
        &config(policy),
        Collaborators {
            store: store.clone(),
            balance_oracle: Arc::new(NullBalanceOracle::new(100_000.0)),
            payment_verifier: verifier.clone(),
            clock: clock.clone(),
        },
    )
    .expect("marketplace");
    Harness {
        market,
        store,
        verifier,
        clock,
    }
}

fn harness(policy: DuplicatePolicy) -> Harness {
    harness_with(Arc::new(NullStore::new()), policy)
}

fn trading_bot() -> SubmitListing {
    SubmitListing {
        wallet: SELLER.into(),
        title: "Trading Bot Pro X".into(),
        description: "Momentum bot with stop-loss, trailing exits and backtest UI.".into(),
        image_url: "https://img.example/pro-x.png".into(),
        price: 5.0,
        category: "Trading Bot".into(),
        delivery_payload: PAYLOAD.into(),
        ..SubmitListing::default()
    }
}

fn live_listing(h: &Harness) -> String {
    let id = h.market.lifecycle.submit(&trading_bot()).unwrap().id;
    h.market.admin.as_ref().unwrap().approve(&id).unwrap();
    id
}

fn purchase(listing_id: &str, buyer: &str, amount: f64, reference: &str) -> PurchaseRequest {
    PurchaseRequest {
        listing_id: listing_id.into(),
        buyer_wallet: buyer.into(),
        seller_wallet: SELLER.into(),
        amount,
        payment_reference: reference.into(),
        caller_ip: Some("203.0.113.7".into()),
    }
}

fn transactions(h: &Harness) -> usize {
    h.store.iter_transactions().unwrap().len()
}

// ---------------------------------------------------------------------------
// 1. Scenario A: review before market
// ---------------------------------------------------------------------------

#[test]
fn scenario_a_listing_goes_live_only_after_approval() {
    let h = harness(DuplicatePolicy::default());
    let input = trading_bot();
    assert_eq!(input.description.chars().count(), 60);

    let view = h.market.lifecycle.submit(&input).unwrap();
    assert_eq!(view.status, ListingStatus::PendingReview);
    assert!(h.market.lifecycle.list_live(None).unwrap().is_empty());

    let approved = h.market.admin.as_ref().unwrap().approve(&view.id).unwrap();
    assert_eq!(approved.status, ListingStatus::Live);
    assert_eq!((approved.state, approved.approved), ("on_market", true));

    let live = h.market.lifecycle.list_live(None).unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0].id, view.id);
}

// ---------------------------------------------------------------------------
// 2. Scenario B: settlement and the duplicate-payment guard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_b_purchase_discloses_payload_once() {
    let h = harness(DuplicatePolicy::default());
    let id = live_listing(&h);

    let receipt = h
        .market
        .settlement
        .purchase(&purchase(&id, BUYER, 5.0, "tx_abc123"))
        .await
        .unwrap();
    assert_eq!(receipt.delivery_payload, PAYLOAD);
    assert!(!receipt.replayed);
    assert_eq!(transactions(&h), 1);

    let stolen = h
        .market
        .settlement
        .purchase(&purchase(&id, OTHER_BUYER, 5.0, "tx_abc123"))
        .await;
    assert!(matches!(stolen, Err(MarketError::DuplicatePayment(_))));
    assert_eq!(transactions(&h), 1);

    let fraud = h
        .store
        .logs_since(Timestamp::EPOCH)
        .unwrap()
        .into_iter()
        .find(|l| l.kind == LogKind::FraudAttempt)
        .expect("fraud attempt logged");
    assert_eq!(fraud.ip.as_deref(), Some("203.0.113.7"));
}

#[tokio::test]
async fn exact_retry_returns_original_receipt() {
    let h = harness(DuplicatePolicy::ReturnExisting);
    let id = live_listing(&h);
    let request = purchase(&id, BUYER, 5.0, "tx_retry");

    let first = h.market.settlement.purchase(&request).await.unwrap();
    let second = h.market.settlement.purchase(&request).await.unwrap();
    assert_eq!(second.transaction_id, first.transaction_id);
    assert_eq!(second.delivery_payload, PAYLOAD);
    assert!(second.replayed);
    assert_eq!(transactions(&h), 1);
    // The replay never went back to the payment network.
    assert_eq!(h.verifier.calls(), 1);
}

#[tokio::test]
async fn mismatched_amount_is_not_a_retry() {
    let h = harness(DuplicatePolicy::ReturnExisting);
    let id = live_listing(&h);
    h.market
        .settlement
        .purchase(&purchase(&id, BUYER, 5.0, "tx_amount"))
        .await
        .unwrap();
    let result = h
        .market
        .settlement
        .purchase(&purchase(&id, BUYER, 6.0, "tx_amount"))
        .await;
    assert!(matches!(result, Err(MarketError::DuplicatePayment(_))));
}

#[tokio::test]
async fn reject_policy_refuses_exact_retry() {
    let h = harness(DuplicatePolicy::Reject);
    let id = live_listing(&h);
    let request = purchase(&id, BUYER, 5.0, "tx_abc123");

    h.market.settlement.purchase(&request).await.unwrap();
    let again = h.market.settlement.purchase(&request).await;
    assert!(matches!(again, Err(MarketError::DuplicatePayment(_))));
    assert_eq!(transactions(&h), 1);
}

#[tokio::test]
async fn unverified_payment_is_counted_on_listing() {
    let store = Arc::new(NullStore::new());
    let verifier = Arc::new(NullPaymentVerifier::reject_all());
    let clock = Arc::new(NullClock::new(1_700_000_000));
    let market = Marketplace::new(
        &config(DuplicatePolicy::default()),
        Collaborators {
            store: store.clone(),
            balance_oracle: Arc::new(NullBalanceOracle::new(0.0)),
            payment_verifier: verifier.clone(),
            clock: clock.clone(),
        },
    )
    .unwrap();
    let id = market.lifecycle.submit(&trading_bot()).unwrap().id;
    market.lifecycle.approve(&id).unwrap();

    let result = market
        .settlement
        .purchase(&purchase(&id, BUYER, 5.0, "tx_unpaid"))
        .await;
    assert!(matches!(result, Err(MarketError::PaymentNotVerified)));

    let view = market.lifecycle.get(&id).unwrap();
    assert_eq!(view.failed_purchase_count, 1);
    assert_eq!(view.last_failure_at, Some(1_700_000_000));
    assert!(store.iter_transactions().unwrap().is_empty());
    assert!(store.logs().iter().any(|l| l.kind == LogKind::PurchaseFailed));

    verifier.confirm("tx_unpaid");
    let receipt = market
        .settlement
        .purchase(&purchase(&id, BUYER, 5.0, "tx_unpaid"))
        .await
        .unwrap();
    assert_eq!(receipt.delivery_payload, PAYLOAD);

    // Refused attempts leave the reference free; only settled purchases are stored.
    let txs = store.iter_transactions().unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].status, TransactionStatus::Success);
}

#[tokio::test]
async fn purchase_checks_reject_bad_claims_without_records() {
    let h = harness(DuplicatePolicy::default());
    let id = live_listing(&h);

    let cases = [
        (purchase(&id, "bad-wallet", 5.0, "tx_1"), "wallet"),
        (purchase(&id, BUYER, 5.0, ""), "reference"),
        (purchase(&id, BUYER, 0.0, "tx_2"), "zero amount"),
        (purchase(&id, BUYER, 4.99, "tx_3"), "underpaid"),
        (
            PurchaseRequest {
                seller_wallet: OTHER_BUYER.into(),
                ..purchase(&id, BUYER, 5.0, "tx_4")
            },
            "wrong seller",
        ),
        (purchase("ffffffffffffffffffffffff", BUYER, 5.0, "tx_5"), "unknown listing"),
    ];
    for (request, label) in cases {
        let result = h.market.settlement.purchase(&request).await;
        assert!(
            matches!(
                result,
                Err(MarketError::InvalidWallet(_))
                    | Err(MarketError::Validation(_))
                    | Err(MarketError::NotFound(_))
            ),
            "{label}: {result:?}"
        );
    }
    assert_eq!(transactions(&h), 0);
    assert_eq!(h.verifier.calls(), 0);
}

/// Confirms every payment; the first answer also takes the store offline, so
/// the outage lands between verification and the commit.
struct OutageAfterVerify {
    store: Arc<NullStore>,
    tripped: AtomicBool,
}

#[async_trait]
impl PaymentVerifier for OutageAfterVerify {
    async fn verify(&self, _reference: &str) -> Result<bool, ChainError> {
        if !self.tripped.swap(true, Ordering::SeqCst) {
            self.store.set_unavailable(true);
        }
        Ok(true)
    }
}

#[tokio::test]
async fn store_outage_at_commit_leaves_no_record() {
    let store = Arc::new(NullStore::new());
    let market = Marketplace::new(
        &config(DuplicatePolicy::default()),
        Collaborators {
            store: store.clone(),
            balance_oracle: Arc::new(NullBalanceOracle::new(100_000.0)),
            payment_verifier: Arc::new(OutageAfterVerify {
                store: store.clone(),
                tripped: AtomicBool::new(false),
            }),
            clock: Arc::new(NullClock::new(1_700_000_000)),
        },
    )
    .unwrap();
    let id = market.lifecycle.submit(&trading_bot()).unwrap().id;
    market.lifecycle.approve(&id).unwrap();
    let request = purchase(&id, BUYER, 5.0, "tx_outage");

    let result = market.settlement.purchase(&request).await;
    assert!(
        matches!(result, Err(MarketError::StoreUnavailable(_))),
        "{result:?}"
    );

    store.set_unavailable(false);
    assert!(store.iter_transactions().unwrap().is_empty());
    assert!(store.find_by_reference("tx_outage").unwrap().is_none());
    assert!(!store.logs().iter().any(|l| l.kind == LogKind::Purchase));
    assert_eq!(market.lifecycle.get(&id).unwrap().failed_purchase_count, 0);

    // The reference is still unused, so the buyer's retry settles normally.
    let receipt = market.settlement.purchase(&request).await.unwrap();
    assert!(!receipt.replayed);
    assert_eq!(receipt.delivery_payload, PAYLOAD);
    assert_eq!(store.iter_transactions().unwrap().len(), 1);
}

#[tokio::test]
async fn store_outage_before_settlement_is_unavailable() {
    let store = Arc::new(NullStore::new());
    let h = harness_with(store.clone(), DuplicatePolicy::default());
    let id = live_listing(&h);

    store.set_unavailable(true);
    let result = h
        .market
        .settlement
        .purchase(&purchase(&id, BUYER, 5.0, "tx_early_outage"))
        .await;
    assert!(matches!(result, Err(MarketError::StoreUnavailable(_))));
    assert_eq!(h.verifier.calls(), 0);

    store.set_unavailable(false);
    assert_eq!(transactions(&h), 0);
    assert!(h.store.find_by_reference("tx_early_outage").unwrap().is_none());
}

// ---------------------------------------------------------------------------
// 3. Scenario C: pulled listings cannot be bought
// ---------------------------------------------------------------------------

#[tokio::test]
async fn scenario_c_rejected_listing_is_not_purchasable() {
    let h = harness(DuplicatePolicy::default());
    let id = live_listing(&h);

    let pulled = h.market.admin.as_ref().unwrap().reject(&id).unwrap();
    assert_eq!(pulled.status, ListingStatus::Pulled);

    let result = h
        .market
        .settlement
        .purchase(&purchase(&id, BUYER, 5.0, "tx_late"))
        .await;
    assert!(matches!(
        result,
        Err(MarketError::NotPurchasable(ListingStatus::Pulled))
    ));

    let pending = h.market.lifecycle.submit(&trading_bot()).unwrap().id;
    let result = h
        .market
        .settlement
        .purchase(&purchase(&pending, BUYER, 5.0, "tx_early"))
        .await;
    assert!(matches!(
        result,
        Err(MarketError::NotPurchasable(ListingStatus::PendingReview))
    ));
    assert_eq!(transactions(&h), 0);
}

// ---------------------------------------------------------------------------
// 4. Scenario D: one report per wallet
// ---------------------------------------------------------------------------

#[test]
fn scenario_d_duplicate_report_rejected() {
    let h = harness(DuplicatePolicy::default());
    let id = live_listing(&h);

    h.market.reports.report(&id, BUYER, Some("fake reviews")).unwrap();
    assert!(matches!(
        h.market.reports.report(&id, BUYER, Some("again")),
        Err(MarketError::DuplicateReport)
    ));
    assert_eq!(h.market.reports.report(&id, OTHER_BUYER, None).unwrap(), 2);
    assert_eq!(h.market.lifecycle.get(&id).unwrap().reports_count, 2);
}

// ---------------------------------------------------------------------------
// 5. Read side never leaks the delivery payload
// ---------------------------------------------------------------------------

#[test]
fn listing_reads_never_carry_payload() {
    let h = harness(DuplicatePolicy::default());
    let id = live_listing(&h);

    let live = serde_json::to_string(&h.market.lifecycle.list_live(None).unwrap()).unwrap();
    let one = serde_json::to_string(&h.market.lifecycle.get(&id).unwrap()).unwrap();
    let all = serde_json::to_string(&h.market.lifecycle.list_all().unwrap()).unwrap();
    for json in [live, one, all] {
        assert!(!json.contains("s3cr3t"), "{json}");
        assert!(!json.contains("delivery"), "{json}");
    }

    let stored = h.store.get_listing(&id.parse().unwrap()).unwrap();
    assert!(!String::from_utf8_lossy(&stored.delivery_payload).contains("s3cr3t"));
}

// ---------------------------------------------------------------------------
// 6. Racing duplicates settle exactly once
// ---------------------------------------------------------------------------

async fn race_same_reference(h: Harness) {
    let id = live_listing(&h);
    let mut tasks = Vec::new();
    for buyer in [BUYER, OTHER_BUYER, BUYER, OTHER_BUYER, BUYER, BUYER] {
        let market = h.market.clone();
        let request = purchase(&id, buyer, 5.0, "tx_race");
        tasks.push(tokio::spawn(async move {
            market.settlement.purchase(&request).await
        }));
    }

    let mut recorded = Vec::new();
    for task in tasks {
        match task.await.unwrap() {
            Ok(receipt) => recorded.push(receipt.transaction_id),
            Err(MarketError::DuplicatePayment(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    let txs = h.store.iter_transactions().unwrap();
    assert_eq!(txs.len(), 1);
    assert!(!recorded.is_empty());
    assert!(recorded.iter().all(|t| *t == txs[0].id.to_hex()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_duplicates_in_memory() {
    race_same_reference(harness(DuplicatePolicy::ReturnExisting)).await;
    race_same_reference(harness(DuplicatePolicy::Reject)).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_duplicates_on_lmdb() {
    for policy in [DuplicatePolicy::ReturnExisting, DuplicatePolicy::Reject] {
        let dir = tempfile::tempdir().expect("temp dir");
        let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).expect("open env");
        race_same_reference(harness_with(Arc::new(env), policy)).await;
    }
}

#[tokio::test]
async fn lmdb_state_survives_reopen() {
    let dir = tempfile::tempdir().expect("temp dir");
    let id = {
        let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).unwrap();
        let h = harness_with(Arc::new(env), DuplicatePolicy::default());
        let id = live_listing(&h);
        h.market
            .settlement
            .purchase(&purchase(&id, BUYER, 5.0, "tx_persist"))
            .await
            .unwrap();
        id
    };

    let env = LmdbEnvironment::open(dir.path(), 16 * 1024 * 1024).unwrap();
    let h = harness_with(Arc::new(env), DuplicatePolicy::default());
    assert_eq!(h.market.lifecycle.get(&id).unwrap().status, ListingStatus::Live);
    let replay = h
        .market
        .settlement
        .purchase(&purchase(&id, BUYER, 5.0, "tx_persist"))
        .await
        .unwrap();
    assert!(replay.replayed);
    assert_eq!(replay.delivery_payload, PAYLOAD);
}

// ---------------------------------------------------------------------------
// 7. Access gate and audit expiry through the assembled marketplace
// ---------------------------------------------------------------------------

#[tokio::test]
async fn access_is_required_when_enforced() {
    let h = harness(DuplicatePolicy::default());
    assert!(h.market.enforces_access());
    assert!(matches!(
        h.market.require_access(BUYER),
        Err(MarketError::AccessDenied(_))
    ));

    let status = h.market.access.check_access(BUYER).await.unwrap();
    assert!(status.token_gating_passed);
    h.market.access.accept_tos(BUYER).unwrap();
    h.market.require_access(BUYER).unwrap();
}

#[test]
fn expired_audit_entries_are_swept() {
    let h = harness(DuplicatePolicy::default());
    live_listing(&h);
    assert!(!h.market.audit.recent().unwrap().is_empty());

    h.clock.advance(8 * 86_400);
    assert!(h.market.purge_expired_logs().unwrap() >= 2);
    assert!(h.market.audit.recent().unwrap().is_empty());
    assert!(h
        .market
        .metrics
        .encode_text()
        .unwrap()
        .contains("souk_logs_purged_total"));
}

#[test]
fn disabled_admin_has_no_desk() {
    let config = MarketConfig {
        disable_admin: true,
        admin_code: None,
        session_secret: None,
        ..config(DuplicatePolicy::default())
    };
    let market = Marketplace::new(
        &config,
        Collaborators {
            store: Arc::new(NullStore::new()),
            balance_oracle: Arc::new(NullBalanceOracle::new(0.0)),
            payment_verifier: Arc::new(NullPaymentVerifier::accept_all()),
            clock: Arc::new(NullClock::new(0)),
        },
    )
    .unwrap();
    assert!(market.admin.is_none());

    let missing_key = MarketConfig {
        delivery_key: None,
        ..config
    };
    let result = Marketplace::new(
        &missing_key,
        Collaborators {
            store: Arc::new(NullStore::new()),
            balance_oracle: Arc::new(NullBalanceOracle::new(0.0)),
            payment_verifier: Arc::new(NullPaymentVerifier::accept_all()),
            clock: Arc::new(NullClock::new(0)),
        },
    );
    assert!(matches!(result, Err(MarketError::Config(_))));
}
