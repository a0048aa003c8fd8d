//! Plain-text reports built from indexer responses.
//!
//! All fields are optional as far as these functions are concerned: anything missing is
//! replaced with a placeholder, and a response with no list at all is reported as empty.

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

use crate::blockchain::models::FetchError;

const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

/// String form of a scalar, `None` for null/missing/containers.
fn text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Like `text`, but empty strings, zero and `false` count as absent.
fn present(v: &Value) -> Option<String> {
    truthy(v).then(|| text(v)).flatten()
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}

fn or_placeholder(v: &Value, placeholder: &str) -> String {
    present(v).unwrap_or_else(|| placeholder.to_string())
}

fn items(v: &Value) -> &[Value] {
    v.as_array().map(Vec::as_slice).unwrap_or(&[])
}

fn format_date(v: &Value) -> String {
    let rendered = match v {
        Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|d| d.date_naive())
            .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
            .ok(),
        Value::Number(n) => n
            .as_i64()
            // epoch milliseconds
            .and_then(DateTime::from_timestamp_millis)
            .map(|d| d.date_naive()),
        _ => None,
    };
    match rendered {
        Some(date) => date.format("%-m/%-d/%Y").to_string(),
        None => text(v).unwrap_or_else(|| "N/A".to_string()),
    }
}

/// BlockVision `account/tokens` response.
pub fn format_token_portfolio(address: &str, data: &Value, native_symbol: &str) -> Result<String, FetchError> {
    let code_ok = data["code"].as_i64() == Some(0);
    let message_ok = data["message"].as_str() == Some("OK");
    if !code_ok || !message_ok {
        let reason = present(&data["reason"])
            .or_else(|| present(&data["message"]))
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(FetchError::Upstream(format!("BlockVision API error: {}", reason)));
    }

    let tokens = items(&data["result"]["data"]);
    let is_native = |t: &Value| {
        t["contractAddress"]
            .as_str()
            .map(|a| a.eq_ignore_ascii_case(ZERO_ADDRESS))
            .unwrap_or(false)
    };

    let native_balance = tokens
        .iter()
        .find(|t| is_native(t))
        .and_then(|t| text(&t["balance"]))
        .unwrap_or_else(|| "0".to_string());

    let erc20: Vec<&Value> = tokens.iter().filter(|t| !is_native(t)).collect();
    let token_list = erc20
        .iter()
        .map(|t| {
            let symbol = or_placeholder(&t["symbol"], "Unknown");
            format!(
                "- Name: {}\n  Symbol: {}\n  Balance: {} {}\n  Contract: {}\n  Decimals: {}\n  Image URL: {}\n  Verified: {}",
                or_placeholder(&t["name"], "Unknown"),
                symbol,
                text(&t["balance"]).unwrap_or_else(|| "0".to_string()),
                symbol,
                or_placeholder(&t["contractAddress"], "Unknown"),
                or_placeholder(&t["decimal"], "Unknown"),
                or_placeholder(&t["imageURL"], "Not available"),
                if truthy(&t["verified"]) { "Yes" } else { "No" },
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(format!(
        "Token Portfolio for {} on Monad Testnet:\n\nNative {} Balance: {} {}\n\nERC-20 Tokens (Total: {}):\n\n{}",
        address,
        native_symbol,
        native_balance,
        native_symbol,
        erc20.len(),
        if token_list.is_empty() { "No ERC-20 tokens found.".to_string() } else { token_list }
    ))
}

/// Reservoir `users/{address}/tokens` response.
pub fn format_nft_portfolio(address: &str, data: &Value, native_symbol: &str) -> String {
    let tokens = items(&data["tokens"]);

    let nft_list = tokens
        .iter()
        .map(|item| {
            let token = &item["token"];
            let collection = &token["collection"];
            let mut lines = vec![
                format!("- Name: {}", or_placeholder(&token["name"], "Unnamed NFT")),
                format!("  Collection: {}", or_placeholder(&collection["name"], "Unknown collection")),
                format!("  Token ID: {}", or_placeholder(&token["tokenId"], "Unknown")),
                format!("  Contract: {}", or_placeholder(&token["contract"], "Unknown")),
                format!("  Type: {}", or_placeholder(&token["kind"], "Unknown type")),
            ];

            if let (Some(rank), Some(score)) =
                (present(&token["rarityRank"]), token["rarityScore"].as_f64().filter(|s| *s != 0.0))
            {
                lines.push(format!("  Rarity: Rank #{} (Score: {:.2})", rank, score));
            }

            let floor = &collection["floorAsk"]["price"];
            if let Some(amount) = present(&floor["amount"]["decimal"]) {
                let currency = or_placeholder(&floor["currency"]["symbol"], native_symbol);
                lines.push(format!("  Collection Floor: {} {}", amount, currency));
            }

            if let Some(image) = present(&token["image"]) {
                lines.push(format!("  Image: {}", image));
            }

            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!("NFT Portfolio for {}:\n\nTotal NFTs: {}\n\n{}", address, tokens.len(), nft_list)
}

/// Reservoir `collections/trending-mints` response.
pub fn format_trending_collections(data: &Value, native_symbol: &str) -> String {
    let mints = items(&data["mints"]);

    let list = mints
        .iter()
        .enumerate()
        .map(|(index, c)| {
            let mut details = vec![
                format!("{}. {}", index + 1, or_placeholder(&c["name"], "Unnamed Collection")),
                format!("Contract: {}", or_placeholder(&c["id"], "Unknown")),
                format!("Type: {}", or_placeholder(&c["contractKind"], "Unknown")),
            ];

            if let Some(description) = present(&c["description"]) {
                details.push(format!("Description: {}", description));
            }

            let stats: Vec<String> = [
                present(&c["tokenCount"]).map(|n| format!("{} tokens", n)),
                present(&c["ownerCount"]).map(|n| format!("{} owners", n)),
            ]
            .into_iter()
            .flatten()
            .collect();
            if !stats.is_empty() {
                details.push(format!("Stats: {}", stats.join(", ")));
            }

            if let Some(on_sale) = present(&c["onSaleCount"]) {
                details.push(format!("Items For Sale: {}", on_sale));
            }

            if let Some(mint_type) = present(&c["mintType"]) {
                let price = text(&c["mintPrice"]["amount"]["decimal"]).unwrap_or_else(|| "Free".to_string());
                let currency = or_placeholder(&c["mintPrice"]["currency"]["symbol"], native_symbol);
                details.push(format!("Mint: {} ({} {})", mint_type, price, currency));
                if let Some(max_supply) = present(&c["maxSupply"]) {
                    details.push(format!("Max Supply: {}", max_supply));
                }
            }

            if let Some(mint_count) = present(&c["mintCount"]) {
                details.push(format!("Total Mints: {}", mint_count));
                if let Some(n) = present(&c["oneHourCount"]) {
                    details.push(format!("Last Hour: {} mints", n));
                }
                if let Some(n) = present(&c["sixHourCount"]) {
                    details.push(format!("Last 6 Hours: {} mints", n));
                }
            }

            let change = &c["volumeChange"];
            if truthy(change) {
                if let Some(day) = change["1day"].as_f64() {
                    details.push(format!("Volume Change (24h): {:.2}%", day * 100.0));
                }
                if let Some(week) = change["7day"].as_f64() {
                    details.push(format!("Volume Change (7d): {:.2}%", week * 100.0));
                }
            }

            let volume = &c["collectionVolume"];
            if truthy(volume) {
                for (label, key) in [("24h", "1day"), ("7d", "7day"), ("30d", "30day"), ("All Time", "allTime")] {
                    let amount = volume[key].as_f64().unwrap_or(0.0);
                    details.push(format!("Volume ({}): {:.2} {}", label, amount, native_symbol));
                }
            }

            let floor = &c["floorAsk"];
            if let Some(amount) = present(&floor["price"]["amount"]["decimal"]) {
                let currency = or_placeholder(&floor["price"]["currency"]["symbol"], native_symbol);
                let marketplace = or_placeholder(&floor["sourceDomain"], "Unknown marketplace");
                details.push(format!("Floor Price: {} {} (on {})", amount, currency, marketplace));
            }

            if let Some(stage) = items(&c["mintStages"]).first() {
                details.push(format!(
                    "Current Mint Stage: {} ({})",
                    or_placeholder(&stage["stage"], "Unknown"),
                    or_placeholder(&stage["kind"], "Unknown")
                ));
                if let Some(max) = present(&stage["maxMintsPerWallet"]) {
                    details.push(format!("Max Mints Per Wallet: {}", max));
                }
            }

            if truthy(&c["startDate"]) || truthy(&c["endDate"]) {
                let start = if truthy(&c["startDate"]) { format_date(&c["startDate"]) } else { "N/A".to_string() };
                let end = if truthy(&c["endDate"]) { format_date(&c["endDate"]) } else { "N/A".to_string() };
                details.push(format!("Mint Period: {} to {}", start, end));
            }

            if let Some(image) = present(&c["image"]) {
                details.push(format!("Image: {}", image));
            }

            details.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "🔥 Trending NFT Collections on Monad Testnet 🔥\n\nTotal Collections: {}\n\n{}",
        mints.len(),
        list
    )
}
