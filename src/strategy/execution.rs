/// Execution params for a space's execution strategies.
use crate::domain::error::{GovernanceError, GovernanceResult};
use crate::domain::hex::{
    decode_hex_blob, encode_hex_blob, normalize_address, normalize_hex_blob,
    parse_u256_from_decimal_or_hex,
};
use crate::domain::types::{ExecutionStrategyType, MetaTransaction, ProposalTransaction};
use crate::strategy::abi::{decode_abi_params, encode_abi_params, AbiTypeSpec};
use alloy_primitives::U256;
use serde_json::{json, Value};

const META_TRANSACTIONS_TYPE: &str =
    "tuple(address to, uint256 value, bytes data, uint8 operation, uint256 salt)[]";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExecutionData {
    pub execution_params: Vec<String>,
}

impl ExecutionData {
    /// Params for the first (only) execution strategy.
    pub fn primary_params(&self) -> GovernanceResult<&str> {
        self.execution_params
            .first()
            .map(String::as_str)
            .ok_or_else(|| GovernanceError::Encoding("execution params are empty".to_string()))
    }
}

/// Anything exposing the executor lists of a space.
pub trait ExecutorTable {
    fn executors(&self) -> &[String];
    fn executors_types(&self) -> &[String];
}

impl ExecutorTable for crate::domain::types::Space {
    fn executors(&self) -> &[String] {
        &self.executors
    }

    fn executors_types(&self) -> &[String] {
        &self.executors_types
    }
}

impl ExecutorTable for crate::domain::types::ProposalSpace {
    fn executors(&self) -> &[String] {
        &self.executors
    }

    fn executors_types(&self) -> &[String] {
        &self.executors_types
    }
}

fn meta_transactions_spec() -> GovernanceResult<AbiTypeSpec> {
    AbiTypeSpec::parse(META_TRANSACTIONS_TYPE).map_err(GovernanceError::Encoding)
}

pub fn execution_data(
    space: &dyn ExecutorTable,
    execution_strategy: &str,
    transactions: &[MetaTransaction],
) -> GovernanceResult<ExecutionData> {
    let wanted = normalize_address(execution_strategy)
        .map_err(|_error| GovernanceError::NoSupportedExecutor(execution_strategy.to_string()))?;
    let position = space
        .executors()
        .iter()
        .position(|executor| normalize_address(executor).ok().as_deref() == Some(wanted.as_str()))
        .ok_or_else(|| GovernanceError::NoSupportedExecutor(execution_strategy.to_string()))?;
    let executor_type = space
        .executors_types()
        .get(position)
        .map(|raw| ExecutionStrategyType::parse(raw))
        .ok_or_else(|| GovernanceError::NoSupportedExecutor(execution_strategy.to_string()))?;

    match executor_type {
        ExecutionStrategyType::SimpleQuorumAvatar | ExecutionStrategyType::SimpleQuorumTimelock => {
            let params = encode_meta_transactions(transactions)?;
            Ok(ExecutionData {
                execution_params: vec![params],
            })
        }
        other => Err(GovernanceError::UnsupportedExecutionStrategy(other.to_string())),
    }
}

pub fn encode_meta_transactions(transactions: &[MetaTransaction]) -> GovernanceResult<String> {
    let rows = transactions
        .iter()
        .map(|tx| {
            json!([
                tx.to,
                tx.value.to_string(),
                tx.data,
                u64::from(tx.operation),
                tx.salt.to_string()
            ])
        })
        .collect::<Vec<_>>();
    let encoded = encode_abi_params(&[meta_transactions_spec()?], &[Value::Array(rows)])
        .map_err(GovernanceError::Encoding)?;
    Ok(encode_hex_blob(&encoded))
}

pub fn decode_meta_transactions(params: &str) -> GovernanceResult<Vec<MetaTransaction>> {
    let bytes = decode_hex_blob(params, "execution params").map_err(GovernanceError::Encoding)?;
    let decoded = decode_abi_params(&[meta_transactions_spec()?], &bytes)
        .map_err(GovernanceError::Encoding)?;
    let rows = decoded
        .first()
        .and_then(Value::as_array)
        .ok_or_else(|| GovernanceError::Encoding("execution params are not an array".to_string()))?;
    rows.iter().map(meta_transaction_from_row).collect()
}

fn meta_transaction_from_row(row: &Value) -> GovernanceResult<MetaTransaction> {
    let field = |index: usize| {
        row.get(index)
            .and_then(Value::as_str)
            .ok_or_else(|| GovernanceError::Encoding(format!("meta transaction field {index} missing")))
    };
    let quantity = |index: usize| -> GovernanceResult<U256> {
        parse_u256_from_decimal_or_hex(field(index)?, "meta transaction quantity")
            .map_err(GovernanceError::Encoding)
    };
    let operation = u8::try_from(quantity(3)?)
        .map_err(|_error| GovernanceError::Encoding("operation overflows uint8".to_string()))?;
    Ok(MetaTransaction {
        to: field(0)?.to_string(),
        value: quantity(1)?,
        data: field(2)?.to_string(),
        operation,
        salt: quantity(4)?,
    })
}

/// Indexer transactions as plain calls (`operation = 0`).
pub fn convert_to_meta_transactions(
    transactions: &[ProposalTransaction],
) -> GovernanceResult<Vec<MetaTransaction>> {
    transactions
        .iter()
        .map(|tx| {
            Ok(MetaTransaction {
                to: normalize_address(&tx.to).map_err(GovernanceError::Encoding)?,
                value: parse_u256_from_decimal_or_hex(&tx.value, "transaction value")
                    .map_err(GovernanceError::Encoding)?,
                data: normalize_hex_blob(&tx.data, "transaction data")
                    .map_err(GovernanceError::Encoding)?,
                operation: 0,
                salt: parse_u256_from_decimal_or_hex(&tx.salt, "transaction salt")
                    .map_err(GovernanceError::Encoding)?,
            })
        })
        .collect()
}
