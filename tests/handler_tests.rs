//! MCP dispatch and HTTP surface tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Method, Request as HttpRequest, StatusCode},
};
use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, H256, U256};
use ethers::utils::to_checksum;
use mockito::{mock, server_url};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

use monad_mcp_server::{
    api::create_router,
    blockchain::{
        client::{ChainReader, ChainWriter},
        models::{ContractCall, PreparedCall, TxReceipt},
        services::{
            fetcher::{ResilientFetcher, RetryPolicy},
            indexer::IndexerClient,
            transfer::TransferOrchestrator,
        },
    },
    config::Config,
    mcp::{
        handler::handle_mcp_request,
        protocol::{error_codes, Request, Response},
    },
    AppState,
};

const NFT: &str = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed";
const RECIPIENT: &str = "0x0000000000000000000000000000000000000bee";

/// Every NFT belongs to `owner`; the signer is always someone else.
struct ForeignOwnerChain {
    signer: Address,
    owner: Address,
    submissions: AtomicUsize,
}

#[async_trait]
impl ChainReader for ForeignOwnerChain {
    async fn read_state(&self, call: &ContractCall) -> Result<Bytes> {
        match call.signature {
            "ownerOf(uint256)" => Ok(Bytes::from(encode(&[Token::Address(self.owner)]))),
            other => Err(anyhow!("unexpected read {}", other)),
        }
    }

    async fn gas_price(&self) -> Result<U256> {
        Ok(U256::from(1u64))
    }

    async fn estimate_gas(&self, _from: Address, _call: &ContractCall) -> Result<U256> {
        Ok(U256::from(21_000u64))
    }

    async fn native_balance(&self, _address: Address) -> Result<U256> {
        Ok(U256::exp10(18))
    }

    async fn wait_for_receipt(&self, _tx_hash: H256) -> Result<TxReceipt> {
        Err(anyhow!("no transactions expected"))
    }
}

#[async_trait]
impl ChainWriter for ForeignOwnerChain {
    fn address(&self) -> Address {
        self.signer
    }

    async fn submit(&self, _prepared: &PreparedCall) -> Result<H256> {
        self.submissions.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("no transactions expected"))
    }
}

fn test_state() -> (AppState, Arc<ForeignOwnerChain>) {
    let chain = Arc::new(ForeignOwnerChain {
        signer: Address::repeat_byte(0x11),
        owner: Address::repeat_byte(0x22),
        submissions: AtomicUsize::new(0),
    });
    let config = Config {
        blockvision_base_url: server_url(),
        reservoir_base_url: server_url(),
        blockvision_api_key: SecretString::new("test-key".to_string()),
        ..Config::default()
    };
    let transfers = TransferOrchestrator::new(
        chain.clone(),
        chain.clone(),
        config.explorer_tx_url.clone(),
        config.native_symbol.clone(),
    );
    let indexer = IndexerClient::new(
        ResilientFetcher::new(RetryPolicy {
            max_attempts: 2,
            delay: Duration::from_millis(10),
        }),
        &config.blockvision_base_url,
        &config.reservoir_base_url,
        SecretString::new("test-key".to_string()),
    );
    (AppState::new(config, transfers, indexer), chain)
}

fn request(method: &str, params: Value) -> Request {
    Request {
        jsonrpc: "2.0".to_string(),
        id: json!(1),
        method: method.to_string(),
        params: Some(params),
    }
}

async fn call(state: &AppState, req: Request) -> Response {
    handle_mcp_request(req, state.clone())
        .await
        .expect("request with an id gets a response")
}

#[tokio::test]
async fn initialize_and_list_tools() {
    let (state, _) = test_state();

    let init = call(&state, request("initialize", json!({}))).await;
    let result = init.result.unwrap();
    assert_eq!(result["protocolVersion"], "2025-06-18");
    assert!(result["capabilities"]["tools"].is_object());

    let list = call(&state, request("tools/list", json!({}))).await;
    let tools = list.result.unwrap()["tools"].as_array().unwrap().clone();
    let names: Vec<&str> = tools.iter().map(|t| t["name"].as_str().unwrap()).collect();
    assert_eq!(
        names,
        vec![
            "fetch-tokens-by-address",
            "get-nft-portfolio",
            "get-trending-nft-collections",
            "transfer_nft",
            "transfer_erc1155",
            "transfer_token",
        ]
    );
    assert!(tools.iter().all(|t| t["inputSchema"]["type"] == "object"));
}

#[tokio::test]
async fn notifications_get_no_response() {
    let (state, _) = test_state();
    let note = Request {
        jsonrpc: "2.0".to_string(),
        id: Value::Null,
        method: "notifications/initialized".to_string(),
        params: None,
    };
    assert!(handle_mcp_request(note, state).await.is_none());
}

#[tokio::test]
async fn unknown_tool_and_missing_name_are_protocol_errors() {
    let (state, _) = test_state();

    let resp = call(&state, request("tools/call", json!({"name": "transfer_eth"}))).await;
    assert_eq!(resp.error.unwrap().code, error_codes::METHOD_NOT_FOUND);

    let resp = call(&state, request("tools/call", json!({"arguments": {}}))).await;
    assert_eq!(resp.error.unwrap().code, error_codes::INVALID_PARAMS);

    let resp = call(&state, request("tools/call", json!({"name": "transfer_nft", "arguments": {"tokenId": "1"}}))).await;
    assert_eq!(resp.error.unwrap().code, error_codes::INVALID_PARAMS);
}

#[tokio::test]
async fn transfer_with_bad_address_is_a_tool_error() {
    let (state, chain) = test_state();
    let resp = call(
        &state,
        request(
            "tools/call",
            json!({"name": "transfer_token", "arguments": {
                "tokenAddress": "0x123", "toAddress": RECIPIENT, "amount": "1"
            }}),
        ),
    )
    .await;

    let result = resp.result.unwrap();
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["category"], "invalidInput");
    assert!(result["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Error transferring tokens:"));
    assert_eq!(chain.submissions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn nft_owned_elsewhere_reports_owner_without_tx_hash() {
    let (state, chain) = test_state();
    // the hyphenated alias resolves to the same tool
    let resp = call(
        &state,
        request(
            "tools/call",
            json!({"name": "transfer-nft", "arguments": {
                "tokenAddress": NFT, "tokenId": "9", "toAddress": RECIPIENT
            }}),
        ),
    )
    .await;

    let result = resp.result.unwrap();
    assert_eq!(result["isError"], true);
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with("Error transferring NFT: Account"));
    assert!(text.contains(&to_checksum(&chain.owner, None)));
    assert!(!text.contains("txHash"));
    assert_eq!(result["structuredContent"]["category"], "preconditionFailed");
    assert_eq!(chain.submissions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn token_portfolio_is_rendered_as_text() {
    let address = "0x0000000000000000000000000000000000000a11";
    let endpoint = mock("GET", mockito::Matcher::Regex(r"^/v2/monad/account/tokens".to_string()))
        .match_header("x-api-key", "test-key")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "code": 0,
                "message": "OK",
                "result": {"data": [
                    {"contractAddress": "0x0000000000000000000000000000000000000000", "balance": "2.5"}
                ]}
            })
            .to_string(),
        )
        .create();

    let (state, _) = test_state();
    // direct method name, as a CLI would send it
    let resp = call(&state, request("fetch_tokens_by_address", json!({"address": address}))).await;
    let result = resp.result.unwrap();
    let text = result["content"][0]["text"].as_str().unwrap();
    assert!(text.starts_with(&format!("Token Portfolio for {} on Monad Testnet", address)));
    assert!(text.contains("Native MON Balance: 2.5 MON"));
    assert!(result.get("isError").is_none());
    endpoint.assert();
}

#[tokio::test]
async fn portfolio_queries_reject_bad_addresses_without_calling_upstream() {
    let nfts = mock("GET", "/users/0x12/tokens/v10").expect(0).create();
    let balances = mock("GET", mockito::Matcher::Regex(r"^/v2/monad/account/tokens".to_string()))
        .match_query(mockito::Matcher::UrlEncoded("address".into(), "not-an-address".into()))
        .expect(0)
        .create();

    let (state, _) = test_state();
    let resp = call(
        &state,
        request("tools/call", json!({"name": "get-nft-portfolio", "arguments": {"address": "0x12"}})),
    )
    .await;
    let result = resp.result.unwrap();
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["category"], "invalidInput");
    assert!(result["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Failed to retrieve NFT portfolio for address: 0x12. Error:"));

    let resp = call(
        &state,
        request(
            "tools/call",
            json!({"name": "fetch-tokens-by-address", "arguments": {"address": "not-an-address"}}),
        ),
    )
    .await;
    assert!(resp.error.is_none());
    let result = resp.result.unwrap();
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["category"], "invalidInput");

    nfts.assert();
    balances.assert();
}

#[tokio::test]
async fn exhausted_upstream_is_a_tool_error() {
    let endpoint = mock("GET", "/users/0x0000000000000000000000000000000000000b0b/tokens/v10")
        .with_status(502)
        .expect(2)
        .create();

    let (state, _) = test_state();
    let resp = call(
        &state,
        request(
            "tools/call",
            json!({"name": "get-nft-portfolio", "arguments": {"address": "0x0000000000000000000000000000000000000b0b"}}),
        ),
    )
    .await;

    let result = resp.result.unwrap();
    assert_eq!(result["isError"], true);
    assert_eq!(result["structuredContent"]["category"], "upstreamUnavailable");
    assert!(result["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("Max retries reached after 2 attempts"));
    endpoint.assert();
}

#[tokio::test]
async fn http_health_and_rpc_routes() {
    let (state, chain) = test_state();
    let app = create_router(state);

    let response = app
        .clone()
        .oneshot(
            HttpRequest::builder()
                .method(Method::GET)
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["signer"], to_checksum(&chain.signer, None));

    let response = app
        .oneshot(
            HttpRequest::builder()
                .method(Method::POST)
                .uri("/api/rpc")
                .header("content-type", "application/json")
                .body(Body::from(json!({"jsonrpc": "2.0", "id": 7, "method": "ping"}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = serde_json::from_slice(&to_bytes(response.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["id"], 7);
    assert_eq!(body["result"], json!({}));
}
