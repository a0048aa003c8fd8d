//! # MCP Handler Module
//!
//! Dispatches incoming MCP requests to the six Monad testnet tools.
//!
//! ## Supported Tools
//!
//! ### Portfolio Queries
//! - `fetch-tokens-by-address` - Native MON and ERC-20 balances (BlockVision)
//! - `get-nft-portfolio` - NFTs held by an address (Reservoir)
//! - `get-trending-nft-collections` - Trending mints (Reservoir)
//!
//! ### Transfers
//! - `transfer_nft` - Transfer one ERC-721 token
//! - `transfer_erc1155` - Transfer an amount of one ERC-1155 token id
//! - `transfer_token` - Transfer an ERC-20 amount
//!
//! Every tool also answers to its hyphen/underscore twin (`transfer-nft`,
//! `fetch_tokens_by_address`, ...). Tool failures come back as results with
//! `isError: true`; only malformed requests produce JSON-RPC errors.

use crate::{
    blockchain::{
        models::{ErrorCategory, FetchError, TransferError},
        services::{
            portfolio,
            token::{self, ADDRESS_RE, DECIMAL_RE, UINT_RE},
        },
    },
    mcp::protocol::{error_codes, Request, Response, ToolResult, PROTOCOL_VERSION},
    utils, AppState,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{error, info};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    FetchTokensByAddress,
    GetNftPortfolio,
    GetTrendingNftCollections,
    TransferNft,
    TransferErc1155,
    TransferToken,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::FetchTokensByAddress,
        Tool::GetNftPortfolio,
        Tool::GetTrendingNftCollections,
        Tool::TransferNft,
        Tool::TransferErc1155,
        Tool::TransferToken,
    ];

    /// The advertised name.
    pub fn name(self) -> &'static str {
        match self {
            Tool::FetchTokensByAddress => "fetch-tokens-by-address",
            Tool::GetNftPortfolio => "get-nft-portfolio",
            Tool::GetTrendingNftCollections => "get-trending-nft-collections",
            Tool::TransferNft => "transfer_nft",
            Tool::TransferErc1155 => "transfer_erc1155",
            Tool::TransferToken => "transfer_token",
        }
    }

    /// Resolves a tool name, treating `-` and `_` as the same character.
    pub fn from_name(name: &str) -> Option<Tool> {
        let key = name.trim().replace('_', "-");
        Tool::ALL
            .into_iter()
            .find(|tool| tool.name().replace('_', "-") == key)
    }

    fn description(self) -> &'static str {
        match self {
            Tool::FetchTokensByAddress => "Fetch native MON and ERC-20 token balances for a specified address on Monad Testnet using BlockVision API",
            Tool::GetNftPortfolio => "Get NFT portfolio for an address on Monad testnet",
            Tool::GetTrendingNftCollections => "Get trending NFT collections on Monad testnet",
            Tool::TransferNft => "Transfer an NFT (ERC721 token) from the server's signing account to another address on Monad Testnet.",
            Tool::TransferErc1155 => "Transfer ERC1155 tokens to another address on Monad Testnet. ERC1155 is a multi-token standard that can represent both fungible and non-fungible tokens in a single contract.",
            Tool::TransferToken => "Transfer ERC20 tokens to an address on Monad Testnet",
        }
    }

    fn input_schema(self) -> Value {
        let address = |description: &str| json!({"type": "string", "pattern": ADDRESS_RE.as_str(), "description": description});
        let token_id = json!({"type": "string", "pattern": UINT_RE.as_str(), "description": "The ID of the specific token to transfer (e.g., '1234')"});
        match self {
            Tool::FetchTokensByAddress => json!({
                "type": "object",
                "properties": {
                    "address": address("The address to query for token balances (e.g., '0xYourAddress')")
                },
                "required": ["address"]
            }),
            Tool::GetNftPortfolio => json!({
                "type": "object",
                "properties": {
                    "address": address("Monad testnet address to check NFT portfolio for")
                },
                "required": ["address"]
            }),
            Tool::GetTrendingNftCollections => json!({ "type": "object", "properties": {} }),
            Tool::TransferNft => json!({
                "type": "object",
                "properties": {
                    "tokenAddress": address("The contract address of the NFT collection on Monad Testnet"),
                    "tokenId": token_id,
                    "toAddress": address("The recipient wallet address that will receive the NFT")
                },
                "required": ["tokenAddress", "tokenId", "toAddress"]
            }),
            Tool::TransferErc1155 => json!({
                "type": "object",
                "properties": {
                    "tokenAddress": address("The contract address of the ERC1155 token collection on Monad Testnet"),
                    "tokenId": token_id,
                    "amount": {"type": "string", "pattern": UINT_RE.as_str(), "description": "The quantity of tokens to send (e.g., '1' for a single NFT or '10' for 10 fungible tokens)"},
                    "toAddress": address("The recipient wallet address that will receive the tokens")
                },
                "required": ["tokenAddress", "tokenId", "amount", "toAddress"]
            }),
            Tool::TransferToken => json!({
                "type": "object",
                "properties": {
                    "tokenAddress": address("The contract address of the ERC20 token to transfer on Monad Testnet"),
                    "toAddress": address("The recipient address that will receive the tokens"),
                    "amount": {"type": "string", "pattern": DECIMAL_RE.as_str(), "description": "Amount of tokens to send as a string (e.g., '100' for 100 tokens). This will be adjusted for the token's decimals."}
                },
                "required": ["tokenAddress", "toAddress", "amount"]
            }),
        }
    }

    fn definition(self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "inputSchema": self.input_schema(),
        })
    }
}

// --- Tool arguments ---

// Addresses are checked by the tools themselves so the failure carries its category.
#[derive(Debug, Deserialize, Validate)]
struct AddressArgs {
    address: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct NftTransferArgs {
    token_address: String,
    #[validate(regex(path = "UINT_RE", message = "Invalid token ID: must be a number"))]
    token_id: String,
    to_address: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct Erc1155TransferArgs {
    token_address: String,
    #[validate(regex(path = "UINT_RE", message = "Invalid token ID: must be a number"))]
    token_id: String,
    #[validate(regex(path = "UINT_RE", message = "Invalid amount: must be a positive integer"))]
    amount: String,
    to_address: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct TokenTransferArgs {
    token_address: String,
    to_address: String,
    #[validate(regex(path = "DECIMAL_RE", message = "Invalid amount: must be a positive number (e.g., '100')"))]
    amount: String,
}

/// This is the main dispatcher for all incoming MCP requests.
pub async fn handle_mcp_request(req: Request, state: AppState) -> Option<Response> {
    info!("Handling MCP request for method: {}", req.method);

    if req.is_notification() {
        return None;
    }

    let response = match req.method.as_str() {
        "initialize" => handle_initialize(&req),
        "ping" => Response::success(req.id.clone(), json!({})),
        "tools/list" => handle_tools_list(&req),
        "tools/call" => handle_tool_call(req, state).await,
        // Direct tool-name calls from the CLI are rewritten into tools/call
        other if Tool::from_name(other).is_some() => {
            let wrapped = Request {
                jsonrpc: req.jsonrpc.clone(),
                id: req.id.clone(),
                method: "tools/call".to_string(),
                params: Some(json!({
                    "name": other,
                    "arguments": req.params.clone().unwrap_or_else(|| json!({}))
                })),
            };
            handle_tool_call(wrapped, state).await
        }
        _ => Response::error(
            req.id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", req.method),
        ),
    };

    Some(response)
}

/// Handles a 'tools/call' request by dispatching it to the correct tool logic.
async fn handle_tool_call(req: Request, state: AppState) -> Response {
    let params = match req.params.as_ref() {
        Some(p) => p,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'params' object".into(),
            )
        }
    };

    let tool_name = match params.get("name").and_then(|n| n.as_str()) {
        Some(name) => name,
        None => {
            return Response::error(
                req.id,
                error_codes::INVALID_PARAMS,
                "Missing 'name' field in params".into(),
            )
        }
    };

    let tool = match Tool::from_name(tool_name) {
        Some(tool) => tool,
        None => {
            return Response::error(
                req.id,
                error_codes::METHOD_NOT_FOUND,
                format!("Unknown tool: {}", tool_name),
            )
        }
    };

    let empty_args = json!({});
    let args = params.get("arguments").unwrap_or(&empty_args);

    match call_tool(tool, args, &state).await {
        Ok(result) => match serde_json::to_value(&result) {
            Ok(value) => Response::success(req.id, value),
            Err(e) => Response::error(req.id, error_codes::INTERNAL_ERROR, e.to_string()),
        },
        Err(message) => Response::error(req.id, error_codes::INVALID_PARAMS, message),
    }
}

/// Runs one tool. `Err` means the arguments did not match the tool's schema.
pub async fn call_tool(tool: Tool, args: &Value, state: &AppState) -> Result<ToolResult, String> {
    let result = match tool {
        Tool::FetchTokensByAddress => {
            let AddressArgs { address } = utils::parse_args(args)?;
            let context = || format!("Failed to retrieve token portfolio for address: {}.", address);
            if let Err(e) = token::normalize_address("address", &address) {
                return Ok(query_input_error(e, context));
            }
            let report = state
                .indexer
                .account_tokens(&address)
                .await
                .and_then(|data| portfolio::format_token_portfolio(&address, &data, &state.config.native_symbol));
            query_result(report, context)
        }
        Tool::GetNftPortfolio => {
            let AddressArgs { address } = utils::parse_args(args)?;
            let context = || format!("Failed to retrieve NFT portfolio for address: {}.", address);
            if let Err(e) = token::normalize_address("address", &address) {
                return Ok(query_input_error(e, context));
            }
            let report = state
                .indexer
                .user_tokens(&address)
                .await
                .map(|data| portfolio::format_nft_portfolio(&address, &data, &state.config.native_symbol));
            query_result(report, context)
        }
        Tool::GetTrendingNftCollections => {
            let report = state
                .indexer
                .trending_mints()
                .await
                .map(|data| portfolio::format_trending_collections(&data, &state.config.native_symbol));
            query_result(report, || "Failed to retrieve trending NFT collections.".to_string())
        }
        Tool::TransferNft => {
            let a: NftTransferArgs = utils::parse_args(args)?;
            let outcome = state
                .transfers
                .transfer_non_fungible(&a.token_address, &a.token_id, &a.to_address)
                .await;
            transfer_result(outcome.map(|o| o.to_json()), "Error transferring NFT:")
        }
        Tool::TransferErc1155 => {
            let a: Erc1155TransferArgs = utils::parse_args(args)?;
            let outcome = state
                .transfers
                .transfer_semi_fungible(&a.token_address, &a.token_id, &a.amount, &a.to_address)
                .await;
            transfer_result(outcome.map(|o| o.to_json()), "Error transferring ERC1155 tokens:")
        }
        Tool::TransferToken => {
            let a: TokenTransferArgs = utils::parse_args(args)?;
            let outcome = state
                .transfers
                .transfer_fungible(&a.token_address, &a.to_address, &a.amount)
                .await;
            transfer_result(outcome.map(|o| o.to_json()), "Error transferring tokens:")
        }
    };
    Ok(result)
}

fn failure(category: ErrorCategory, text: String, message: String) -> ToolResult {
    ToolResult::error(text, json!({ "category": category, "message": message }))
}

fn query_result(report: Result<String, FetchError>, context: impl FnOnce() -> String) -> ToolResult {
    match report {
        Ok(text) => ToolResult::text(text),
        Err(e) => {
            let text = format!("{} Error: {}", context(), e);
            error!("{}", text);
            failure(e.category(), text, e.to_string())
        }
    }
}

fn query_input_error(e: TransferError, context: impl FnOnce() -> String) -> ToolResult {
    let text = format!("{} Error: {}", context(), e);
    error!("{}", text);
    failure(e.category(), text, e.to_string())
}

fn transfer_result(outcome: Result<Value, TransferError>, prefix: &str) -> ToolResult {
    match outcome {
        Ok(payload) => ToolResult::json(payload),
        Err(e) => {
            error!("{} {}", prefix, e);
            failure(e.category(), format!("{} {}", prefix, e), e.to_string())
        }
    }
}

/// Handles the 'initialize' request.
fn handle_initialize(req: &Request) -> Response {
    let server_info = json!({
        "name": "monad-mcp",
        "version": env!("CARGO_PKG_VERSION")
    });
    let capabilities = json!({ "tools": { "listChanged": false } });
    let instructions =
        "Monad testnet MCP server: token and NFT portfolio queries, trending collections, and ERC-20/721/1155 transfers from the configured account.";

    Response::success(
        req.id.clone(),
        json!({
            "serverInfo": server_info,
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": capabilities,
            "instructions": instructions
        }),
    )
}

/// Handles the 'tools/list' request.
fn handle_tools_list(req: &Request) -> Response {
    let tools: Vec<Value> = Tool::ALL.into_iter().map(Tool::definition).collect();
    Response::success(req.id.clone(), json!({ "tools": tools }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::Content;

    #[test]
    fn tool_names_accept_either_separator() {
        assert_eq!(Tool::from_name("transfer_nft"), Some(Tool::TransferNft));
        assert_eq!(Tool::from_name("transfer-nft"), Some(Tool::TransferNft));
        assert_eq!(Tool::from_name("fetch_tokens_by_address"), Some(Tool::FetchTokensByAddress));
        assert_eq!(Tool::from_name("get-trending-nft-collections"), Some(Tool::GetTrendingNftCollections));
        assert_eq!(Tool::from_name("transfer_eth"), None);
    }

    #[test]
    fn schemas_list_required_fields() {
        let schema = Tool::TransferErc1155.input_schema();
        assert_eq!(schema["required"], json!(["tokenAddress", "tokenId", "amount", "toAddress"]));
        assert_eq!(schema["properties"]["amount"]["pattern"], json!(r"^\d+$"));
    }

    #[test]
    fn token_id_must_be_numeric() {
        let err = utils::parse_args::<NftTransferArgs>(&json!({
            "tokenAddress": "0x0000000000000000000000000000000000000001",
            "tokenId": "12a",
            "toAddress": "0x0000000000000000000000000000000000000002"
        }))
        .unwrap_err();
        assert!(err.contains("Invalid token ID: must be a number"));
    }

    #[test]
    fn transfer_errors_keep_the_tool_prefix() {
        let result = transfer_result(
            Err(TransferError::TransactionReverted("0xabc".into())),
            "Error transferring NFT:",
        );
        assert!(result.is_error);
        assert_eq!(
            result.content,
            vec![Content::Text {
                text: "Error transferring NFT: Transaction failed: 0xabc".into()
            }]
        );
        assert_eq!(
            result.structured_content.unwrap()["category"],
            json!("transactionReverted")
        );
    }
}
