// src/blockchain/services/token.rs

use anyhow::{anyhow, Result};
use ethers_core::abi::{decode, ParamType, Token};
use ethers_core::types::{Address, Bytes, U256};
use ethers_core::utils::to_checksum;
use lazy_static::lazy_static;
use regex::Regex;
use std::str::FromStr;

use crate::blockchain::{
    client::ChainReader,
    models::{ContractCall, TransferError},
};

lazy_static! {
    pub static ref ADDRESS_RE: Regex = Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap();
    pub static ref UINT_RE: Regex = Regex::new(r"^\d+$").unwrap();
    pub static ref DECIMAL_RE: Regex = Regex::new(r"^\d+(\.\d+)?$").unwrap();
}

// --- Input normalization ---

/// Parses a 0x-prefixed 40-hex-digit address.
/// Mixed-case input must carry a valid EIP-55 checksum.
pub fn normalize_address(field: &'static str, input: &str) -> Result<Address, TransferError> {
    let invalid = |reason: &str| TransferError::InvalidAddress {
        field,
        value: input.to_string(),
        reason: reason.to_string(),
    };
    if !ADDRESS_RE.is_match(input) {
        return Err(invalid("expected 0x followed by 40 hex digits"));
    }
    let address = Address::from_str(input).map_err(|e| invalid(&e.to_string()))?;
    let hex_part = &input[2..];
    let mixed_case = hex_part.chars().any(|c| c.is_ascii_lowercase())
        && hex_part.chars().any(|c| c.is_ascii_uppercase());
    if mixed_case && to_checksum(&address, None) != input {
        return Err(invalid("checksum mismatch"));
    }
    Ok(address)
}

pub fn parse_token_id(input: &str) -> Result<U256, TransferError> {
    if !UINT_RE.is_match(input) {
        return Err(TransferError::InvalidTokenId(input.to_string()));
    }
    U256::from_dec_str(input).map_err(|_| TransferError::InvalidTokenId(input.to_string()))
}

fn invalid_amount(input: &str, reason: &'static str) -> TransferError {
    TransferError::InvalidAmount {
        value: input.to_string(),
        reason,
    }
}

pub fn parse_quantity(input: &str) -> Result<U256, TransferError> {
    if !UINT_RE.is_match(input) {
        return Err(invalid_amount(input, "must be a non-negative integer"));
    }
    U256::from_dec_str(input).map_err(|_| invalid_amount(input, "exceeds uint256"))
}

/// Checks the shape of a human decimal amount ("5", "0.25") before any network call.
pub fn check_decimal_amount(input: &str) -> Result<(), TransferError> {
    if DECIMAL_RE.is_match(input) {
        Ok(())
    } else {
        Err(invalid_amount(input, "must be a non-negative decimal number"))
    }
}

/// Scales a decimal string into raw token units. Fractional digits beyond
/// `decimals` are rounded half-up on the first dropped digit.
pub fn scale_amount(input: &str, decimals: u8) -> Result<U256, TransferError> {
    check_decimal_amount(input)?;
    let overflow = || invalid_amount(input, "exceeds uint256");
    let width = decimals as usize;
    let (whole, frac) = input.split_once('.').unwrap_or((input, ""));
    let (kept, round_up) = if frac.len() > width {
        (&frac[..width], frac.as_bytes()[width] >= b'5')
    } else {
        (frac, false)
    };

    let whole = U256::from_dec_str(whole).map_err(|_| overflow())?;
    let frac_units = if kept.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(&format!("{:0<width$}", kept, width = width)).map_err(|_| overflow())?
    };
    let raw = whole
        .checked_mul(U256::exp10(width))
        .and_then(|w| w.checked_add(frac_units))
        .ok_or_else(overflow)?;
    if round_up {
        raw.checked_add(U256::one()).ok_or_else(overflow)
    } else {
        Ok(raw)
    }
}

/// Renders raw units as a decimal string with trailing zeros trimmed ("5", "0.25").
pub fn format_units_trimmed(value: U256, decimals: u8) -> String {
    let unit = U256::exp10(decimals as usize);
    let whole = value / unit;
    let frac = value % unit;
    if frac.is_zero() {
        return whole.to_string();
    }
    let frac = format!("{:0>width$}", frac.to_string(), width = decimals as usize);
    format!("{}.{}", whole, frac.trim_end_matches('0'))
}

// --- Output decoding ---

fn decode_string(raw: &Bytes) -> Option<String> {
    if let Ok(tokens) = decode(&[ParamType::String], raw) {
        if let Some(Token::String(s)) = tokens.first() {
            return Some(s.clone());
        }
    }
    // Fallback: bytes32 to string (strip zeros)
    if let Ok(tokens) = decode(&[ParamType::FixedBytes(32)], raw) {
        if let Some(Token::FixedBytes(b)) = tokens.first() {
            let trimmed: Vec<u8> = b.iter().copied().take_while(|c| *c != 0u8).collect();
            return String::from_utf8(trimmed).ok();
        }
    }
    None
}

fn decode_u256(raw: &Bytes) -> Result<U256> {
    match decode(&[ParamType::Uint(256)], raw)?.first() {
        Some(Token::Uint(n)) => Ok(*n),
        _ => Err(anyhow!("expected uint256 output")),
    }
}

fn decode_address(raw: &Bytes) -> Result<Address> {
    match decode(&[ParamType::Address], raw)?.first() {
        Some(Token::Address(a)) => Ok(*a),
        _ => Err(anyhow!("expected address output")),
    }
}

// --- Reads ---

pub async fn erc20_decimals(chain: &dyn ChainReader, token: Address) -> Result<u8> {
    let raw = chain
        .read_state(&ContractCall::new(token, "decimals()", vec![]))
        .await?;
    let decimals = decode_u256(&raw)?;
    if decimals > U256::from(77u8) {
        return Err(anyhow!("decimals() returned {}", decimals));
    }
    Ok(decimals.as_u32() as u8)
}

pub async fn erc20_balance_of(chain: &dyn ChainReader, token: Address, owner: Address) -> Result<U256> {
    let call = ContractCall::new(token, "balanceOf(address)", vec![Token::Address(owner)]);
    decode_u256(&chain.read_state(&call).await?)
}

/// Reads a string getter such as `name()` or `symbol()`. Missing or
/// undecodable values come back as `None`.
pub async fn read_string(chain: &dyn ChainReader, token: Address, signature: &'static str) -> Option<String> {
    match chain.read_state(&ContractCall::new(token, signature, vec![])).await {
        Ok(raw) => decode_string(&raw),
        Err(e) => {
            tracing::debug!("{} unavailable on {:?}: {:#}", signature, token, e);
            None
        }
    }
}

pub async fn erc721_owner_of(chain: &dyn ChainReader, token: Address, token_id: U256) -> Result<Address> {
    let call = ContractCall::new(token, "ownerOf(uint256)", vec![Token::Uint(token_id)]);
    decode_address(&chain.read_state(&call).await?)
}

pub async fn erc1155_balance_of(
    chain: &dyn ChainReader,
    token: Address,
    owner: Address,
    token_id: U256,
) -> Result<U256> {
    let call = ContractCall::new(
        token,
        "balanceOf(address,uint256)",
        vec![Token::Address(owner), Token::Uint(token_id)],
    );
    decode_u256(&chain.read_state(&call).await?)
}

// --- Transfer calls ---

pub fn erc20_transfer_call(token: Address, to: Address, amount: U256) -> ContractCall {
    ContractCall::new(
        token,
        "transfer(address,uint256)",
        vec![Token::Address(to), Token::Uint(amount)],
    )
}

pub fn erc721_transfer_from_call(token: Address, from: Address, to: Address, token_id: U256) -> ContractCall {
    ContractCall::new(
        token,
        "transferFrom(address,address,uint256)",
        vec![Token::Address(from), Token::Address(to), Token::Uint(token_id)],
    )
}

pub fn erc1155_safe_transfer_from_call(
    token: Address,
    from: Address,
    to: Address,
    token_id: U256,
    amount: U256,
) -> ContractCall {
    ContractCall::new(
        token,
        "safeTransferFrom(address,address,uint256,uint256,bytes)",
        vec![
            Token::Address(from),
            Token::Address(to),
            Token::Uint(token_id),
            Token::Uint(amount),
            Token::Bytes(Vec::new()),
        ],
    )
}
