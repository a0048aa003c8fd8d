use anyhow::{anyhow, Result};
use ethers_core::types::{Address, U256};
use tracing::info;

use crate::blockchain::{
    client::ChainReader,
    models::{ContractCall, GasBudget},
};

/// Samples the current gas price and estimates `call` as sent by `from`.
pub async fn estimate_gas_budget(
    chain: &dyn ChainReader,
    from: Address,
    call: &ContractCall,
) -> Result<GasBudget> {
    let gas_price = chain.gas_price().await?;
    let gas_units = chain.estimate_gas(from, call).await?;

    let estimated_cost = gas_price
        .checked_mul(gas_units)
        .ok_or_else(|| anyhow!("Fee calculation overflow"))?;

    info!(
        "Estimated {} gas at {} wei for {} (cost {} wei)",
        gas_units, gas_price, call.signature, estimated_cost
    );

    Ok(GasBudget {
        gas_units,
        gas_price,
        estimated_cost,
    })
}

/// True when `balance` covers the whole budget.
pub fn covers(balance: U256, budget: &GasBudget) -> bool {
    balance >= budget.estimated_cost
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_is_inclusive() {
        let budget = GasBudget {
            gas_units: U256::from(21_000u64),
            gas_price: U256::from(2u64),
            estimated_cost: U256::from(42_000u64),
        };
        assert!(covers(U256::from(42_000u64), &budget));
        assert!(!covers(U256::from(41_999u64), &budget));
    }
}
