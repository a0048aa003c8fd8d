//! Submission against a mocked JSON-RPC node.

use ethers::abi::Token;
use ethers::providers::{Http, Provider};
use ethers::types::{Address, H256, U256};
use mockito::{mock, server_url, Matcher};
use secrecy::SecretString;
use std::sync::Arc;

use monad_mcp_server::blockchain::{
    client::ChainWriter,
    models::{ContractCall, GasBudget, PreparedCall},
    signer::SigningAccount,
};

// well-known development key, never funded on a real network
const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

fn rpc_result(method: &str, result: &str) -> mockito::Mock {
    mock("POST", "/")
        .match_body(Matcher::Regex(method.to_string()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"{{"jsonrpc":"2.0","id":1,"result":{}}}"#, result))
        .create()
}

fn transfer_call() -> PreparedCall {
    PreparedCall {
        call: ContractCall::new(
            Address::repeat_byte(0x22),
            "transfer(address,uint256)",
            vec![Token::Address(Address::repeat_byte(0x33)), Token::Uint(U256::from(1u64))],
        ),
        gas: GasBudget {
            gas_units: U256::from(60_000u64),
            gas_price: U256::from(1_000_000_000u64),
            estimated_cost: U256::from(60_000_000_000_000u64),
        },
    }
}

#[tokio::test]
async fn every_submission_reads_the_pending_nonce() {
    let hash = H256::repeat_byte(0xcd);
    let chain_id = rpc_result("eth_chainId", r#""0x279f""#).expect(1);
    let nonce = rpc_result("eth_getTransactionCount", r#""0x5""#).expect(2);
    let send = rpc_result("eth_sendRawTransaction", &format!(r#""{:#x}""#, hash)).expect(2);

    let provider = Arc::new(Provider::<Http>::try_from(server_url()).unwrap());
    let account = SigningAccount::new(&SecretString::new(KEY.to_string()), provider).unwrap();
    let prepared = transfer_call();

    assert_eq!(account.submit(&prepared).await.unwrap(), hash);
    // a dropped transaction leaves the node's count unchanged; the next submission reuses it
    assert_eq!(account.submit(&prepared).await.unwrap(), hash);
    assert_eq!(account.chain_id().await.unwrap(), 10143);

    chain_id.assert();
    nonce.assert();
    send.assert();
}

#[tokio::test]
async fn malformed_key_is_rejected_at_startup() {
    let provider = Arc::new(Provider::<Http>::try_from("http://127.0.0.1:1").unwrap());
    let err = SigningAccount::new(&SecretString::new("0x1234".to_string()), provider).unwrap_err();
    assert!(err.to_string().starts_with("Invalid private key"));
}
