//! 402 → pay → retry flow over an in-memory transport and chain.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use alloy::primitives::{address, Address, Signature, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use base64::Engine;
use reqwest::header::HeaderValue;
use serde_json::json;

use x402::eip712::{domain_separator_for, recover_authorizer};
use x402::{
    decode_payment, ChainReader, ConfigError, ExactSchemeClient, HttpRequest, HttpResponse,
    HttpTransport, NetworkConfig, PayerSigner, PaymentPolicy, X402Client, X402Error,
};

const PAY_TO: Address = address!("4444444444444444444444444444444444444444");

struct ScriptedTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    fn new(responses: Vec<HttpResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, X402Error> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| X402Error::HttpError("no scripted response left".to_string()))
    }
}

struct CountingSigner {
    inner: PrivateKeySigner,
    signs: Arc<AtomicUsize>,
}

impl PayerSigner for CountingSigner {
    fn address(&self) -> Address {
        self.inner.address()
    }

    fn sign_typed_hash(&self, hash: &B256) -> Result<Signature, X402Error> {
        self.signs.fetch_add(1, Ordering::SeqCst);
        self.inner.sign_typed_hash(hash)
    }
}

struct FakeChain {
    separator: B256,
    balance: U256,
    balance_queries: Arc<AtomicUsize>,
}

impl ChainReader for FakeChain {
    async fn domain_separator(&self, _contract: Address) -> Result<B256, X402Error> {
        Ok(self.separator)
    }

    async fn balance_of(&self, _token: Address, _owner: Address) -> Result<U256, X402Error> {
        self.balance_queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.balance)
    }
}

type TestClient = X402Client<ExactSchemeClient<CountingSigner, FakeChain>, ScriptedTransport>;

struct Harness {
    client: TestClient,
    payer: Address,
    signs: Arc<AtomicUsize>,
    balance_queries: Arc<AtomicUsize>,
}

impl Harness {
    fn sign_count(&self) -> usize {
        self.signs.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.client.transport().requests()
    }
}

fn harness(policy: PaymentPolicy, balance: u64, responses: Vec<HttpResponse>) -> Harness {
    let config = NetworkConfig::base_sepolia();
    let signer = PrivateKeySigner::random();
    let payer = signer.address();
    let signs = Arc::new(AtomicUsize::new(0));
    let balance_queries = Arc::new(AtomicUsize::new(0));

    let scheme = ExactSchemeClient::new(
        CountingSigner {
            inner: signer,
            signs: signs.clone(),
        },
        FakeChain {
            separator: domain_separator_for(&config),
            balance: U256::from(balance),
            balance_queries: balance_queries.clone(),
        },
        config,
    );

    Harness {
        client: X402Client::with_transport(scheme, policy, ScriptedTransport::new(responses)),
        payer,
        signs,
        balance_queries,
    }
}

fn payment_required(amount: &str) -> HttpResponse {
    let mut resp = HttpResponse::new(402);
    resp.body = serde_json::to_vec(&json!({
        "x402Version": 1,
        "accepts": [{
            "scheme": "exact",
            "network": "base-sepolia",
            "maxAmountRequired": amount,
            "resource": "https://gateway.example/api/v1/stamps/",
            "description": "Purchase postage stamp",
            "payTo": PAY_TO,
            "maxTimeoutSeconds": 120,
            "asset": x402::BASE_SEPOLIA_USDC,
        }],
        "error": "X-PAYMENT header is required",
    }))
    .unwrap()
    .into();
    resp
}

fn ok_with_outcome(status: u16, outcome: Option<serde_json::Value>) -> HttpResponse {
    let mut resp = HttpResponse::new(status);
    resp.body = bytes::Bytes::from_static(br#"{"batchID":"abc"}"#);
    if let Some(outcome) = outcome {
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(serde_json::to_vec(&outcome).unwrap());
        resp.headers.insert(
            "x-payment-response",
            HeaderValue::from_str(&encoded).unwrap(),
        );
    }
    resp
}

fn request() -> HttpRequest {
    HttpRequest::post("https://gateway.example/api/v1/stamps/")
        .json(&json!({"amount": 2000000000, "depth": 17}))
        .unwrap()
}

#[tokio::test]
async fn test_successful_payment_attaches_signed_header() {
    let h = harness(
        PaymentPolicy::auto_pay_up_to(1_000_000u64),
        5_000_000,
        vec![
            payment_required("10000"),
            ok_with_outcome(
                200,
                Some(json!({"success": true, "transaction": "0xfeed", "network": "base-sepolia"})),
            ),
        ],
    );

    let (resp, outcome) = h.client.execute(request()).await.unwrap();
    assert_eq!(resp.status, 200);
    let outcome = outcome.expect("settlement outcome");
    assert!(outcome.success);
    assert_eq!(outcome.transaction.as_deref(), Some("0xfeed"));
    assert_eq!(h.sign_count(), 1);
    assert_eq!(h.balance_queries.load(Ordering::SeqCst), 1);

    let requests = h.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].headers.get("x-payment").is_none());
    assert_eq!(requests[1].body, requests[0].body);

    let header = requests[1].headers.get("x-payment").unwrap().to_str().unwrap();
    let payload = decode_payment(header).unwrap();
    assert_eq!(payload.network, "base-sepolia");
    assert_eq!(payload.payload.authorization.to, PAY_TO);
    assert_eq!(payload.payload.authorization.value, "10000");
    assert_eq!(
        recover_authorizer(&payload, &NetworkConfig::base_sepolia()).unwrap(),
        h.payer
    );
}

#[tokio::test]
async fn test_settlement_failure_with_200_is_an_error() {
    let h = harness(
        PaymentPolicy::auto_pay_up_to(1_000_000u64),
        5_000_000,
        vec![
            payment_required("10000"),
            ok_with_outcome(
                200,
                Some(json!({
                    "success": false,
                    "errorReason": "transfer reverted",
                    "payer": "0xabc",
                })),
            ),
        ],
    );

    match h.client.execute(request()).await.unwrap_err() {
        X402Error::SettlementFailed {
            reason,
            payer,
            transaction,
        } => {
            assert_eq!(reason.as_deref(), Some("transfer reverted"));
            assert_eq!(payer.as_deref(), Some("0xabc"));
            assert!(transaction.is_none());
        }
        other => panic!("expected SettlementFailed, got {other:?}"),
    }
    assert_eq!(h.requests().len(), 2);
}

#[tokio::test]
async fn test_declined_confirmation_never_signs() {
    let asked = Arc::new(Mutex::new(Vec::new()));
    let seen = asked.clone();

    let mut h = harness(
        PaymentPolicy::default(),
        5_000_000,
        vec![payment_required("10000")],
    );
    h.client = h.client.with_confirmation(move |amount, description| {
        seen.lock()
            .unwrap()
            .push((amount.to_string(), description.to_string()));
        false
    });

    match h.client.execute(request()).await.unwrap_err() {
        X402Error::PaymentDeclined {
            amount,
            description,
        } => {
            assert_eq!(amount, "$0.01");
            assert_eq!(description, "Purchase postage stamp");
        }
        other => panic!("expected PaymentDeclined, got {other:?}"),
    }
    assert_eq!(h.sign_count(), 0);
    assert_eq!(h.requests().len(), 1);
    assert_eq!(
        *asked.lock().unwrap(),
        vec![("$0.01".to_string(), "Purchase postage stamp".to_string())]
    );
}

#[tokio::test]
async fn test_accepted_confirmation_pays() {
    let mut h = harness(
        PaymentPolicy::default(),
        5_000_000,
        vec![payment_required("10000"), ok_with_outcome(201, None)],
    );
    h.client = h.client.with_confirmation(|_, _| true);

    let (resp, outcome) = h.client.execute(request()).await.unwrap();
    assert_eq!(resp.status, 201);
    assert!(outcome.is_none());
    assert_eq!(h.sign_count(), 1);
}

#[tokio::test]
async fn test_no_auto_pay_and_no_callback_requires_payment() {
    let h = harness(
        PaymentPolicy::default(),
        5_000_000,
        vec![payment_required("10000")],
    );
    match h.client.execute(request()).await.unwrap_err() {
        X402Error::PaymentRequired { message, options } => {
            assert!(message.contains("$0.01"));
            assert_eq!(options.len(), 1);
            assert_eq!(options[0]["maxAmountRequired"], "10000");
        }
        other => panic!("expected PaymentRequired, got {other:?}"),
    }
    assert_eq!(h.sign_count(), 0);
}

#[tokio::test]
async fn test_amount_above_ceiling_is_not_auto_paid() {
    let h = harness(
        PaymentPolicy::auto_pay_up_to(5_000u64),
        5_000_000,
        vec![payment_required("10000")],
    );
    let err = h.client.execute(request()).await.unwrap_err();
    assert!(matches!(err, X402Error::PaymentRequired { ref message, .. } if message.contains("auto-pay limit")));
    assert_eq!(h.sign_count(), 0);
    assert_eq!(h.requests().len(), 1);
}

#[tokio::test]
async fn test_insufficient_balance_stops_before_signing() {
    let h = harness(
        PaymentPolicy::auto_pay_up_to(1_000_000u64),
        9_999,
        vec![payment_required("10000")],
    );
    match h.client.execute(request()).await.unwrap_err() {
        X402Error::InsufficientBalance {
            required,
            available,
        } => {
            assert_eq!(required, U256::from(10_000u64));
            assert_eq!(available, U256::from(9_999u64));
        }
        other => panic!("expected InsufficientBalance, got {other:?}"),
    }
    assert_eq!(h.sign_count(), 0);
}

#[tokio::test]
async fn test_balance_check_can_be_skipped() {
    let policy = PaymentPolicy {
        check_balance: false,
        ..PaymentPolicy::auto_pay_up_to(1_000_000u64)
    };
    let h = harness(
        policy,
        0,
        vec![payment_required("10000"), ok_with_outcome(200, None)],
    );
    h.client.execute(request()).await.unwrap();
    assert_eq!(h.balance_queries.load(Ordering::SeqCst), 0);
    assert_eq!(h.sign_count(), 1);
}

#[tokio::test]
async fn test_non_402_passes_through() {
    let h = harness(
        PaymentPolicy::auto_pay_up_to(1_000_000u64),
        5_000_000,
        vec![ok_with_outcome(404, None)],
    );
    let (resp, outcome) = h.client.execute(request()).await.unwrap();
    assert_eq!(resp.status, 404);
    assert!(outcome.is_none());
    assert_eq!(h.sign_count(), 0);
    assert_eq!(h.requests().len(), 1);
}

#[tokio::test]
async fn test_second_402_is_rejected_without_another_payment() {
    let h = harness(
        PaymentPolicy::auto_pay_up_to(1_000_000u64),
        5_000_000,
        vec![payment_required("10000"), payment_required("20000")],
    );
    let err = h.client.execute(request()).await.unwrap_err();
    assert!(matches!(err, X402Error::PaymentRejected(_)));
    assert_eq!(h.sign_count(), 1);
    assert_eq!(h.requests().len(), 2);
}

#[tokio::test]
async fn test_unparseable_outcome_header_is_ignored() {
    let mut paid = ok_with_outcome(200, None);
    paid.headers
        .insert("x-payment-response", HeaderValue::from_static("%%%"));
    let h = harness(
        PaymentPolicy::auto_pay_up_to(1_000_000u64),
        5_000_000,
        vec![payment_required("10000"), paid],
    );
    let (resp, outcome) = h.client.execute(request()).await.unwrap();
    assert_eq!(resp.status, 200);
    assert!(outcome.is_none());
}

#[tokio::test]
async fn test_network_mismatch_lists_offered_networks() {
    let mut resp = HttpResponse::new(402);
    resp.body = serde_json::to_vec(&json!({
        "x402Version": 1,
        "accepts": [
            {"scheme": "exact", "network": "base", "maxAmountRequired": "1",
             "resource": "r", "payTo": PAY_TO},
            {"scheme": "exact", "network": "polygon", "maxAmountRequired": "1",
             "resource": "r", "payTo": PAY_TO},
        ],
    }))
    .unwrap()
    .into();

    let h = harness(
        PaymentPolicy::auto_pay_up_to(1_000_000u64),
        5_000_000,
        vec![resp],
    );
    match h.client.execute(request()).await.unwrap_err() {
        X402Error::NetworkMismatch { expected, offered } => {
            assert_eq!(expected, "base-sepolia");
            assert_eq!(offered, vec!["base", "polygon"]);
        }
        other => panic!("expected NetworkMismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_malformed_402_body() {
    let mut resp = HttpResponse::new(402);
    resp.body = bytes::Bytes::from_static(br#"{"accepts": "soon"}"#);
    let h = harness(
        PaymentPolicy::auto_pay_up_to(1_000_000u64),
        5_000_000,
        vec![resp],
    );
    assert!(matches!(
        h.client.execute(request()).await,
        Err(X402Error::InvalidRequirements(_))
    ));
}

#[tokio::test]
async fn test_disabled_client_reports_offered_amounts() {
    let client: TestClient =
        X402Client::disabled(ScriptedTransport::new(vec![payment_required("10000")]));
    assert!(!client.payments_enabled());
    match client.execute(request()).await.unwrap_err() {
        X402Error::PaymentRequired { message, options } => {
            assert!(message.contains("10000"));
            assert!(message.contains("X402_ENABLED"));
            assert_eq!(options.len(), 1);
        }
        other => panic!("expected PaymentRequired, got {other:?}"),
    }
}

#[tokio::test]
async fn test_transport_errors_name_the_step() {
    let h = harness(PaymentPolicy::auto_pay_up_to(1_000_000u64), 5_000_000, vec![]);
    let err = h.client.execute(request()).await.unwrap_err();
    assert!(matches!(err, X402Error::HttpError(ref m) if m.starts_with("initial request failed")));

    let h = harness(
        PaymentPolicy::auto_pay_up_to(1_000_000u64),
        5_000_000,
        vec![payment_required("10000")],
    );
    let err = h.client.execute(request()).await.unwrap_err();
    assert!(matches!(err, X402Error::HttpError(ref m) if m.starts_with("paid retry failed")));
}

#[tokio::test]
async fn test_domain_mismatch_blocks_payment() {
    let config = NetworkConfig::base_sepolia();
    let signs = Arc::new(AtomicUsize::new(0));
    let scheme = ExactSchemeClient::new(
        CountingSigner {
            inner: PrivateKeySigner::random(),
            signs: signs.clone(),
        },
        FakeChain {
            separator: B256::repeat_byte(0x01),
            balance: U256::from(5_000_000u64),
            balance_queries: Arc::new(AtomicUsize::new(0)),
        },
        config,
    );
    let client = X402Client::with_transport(
        scheme,
        PaymentPolicy::auto_pay_up_to(1_000_000u64),
        ScriptedTransport::new(vec![payment_required("10000")]),
    );

    let err = client.execute(request()).await.unwrap_err();
    assert!(matches!(
        err,
        X402Error::Config(ConfigError::DomainMismatch { .. })
    ));
    assert_eq!(signs.load(Ordering::SeqCst), 0);
    assert_eq!(client.transport().requests().len(), 1);
}
