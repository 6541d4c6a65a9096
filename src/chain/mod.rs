//! Contract introspection: point-in-time reads that may revert.

use crate::domain::{Address, Amount};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;
use tracing::warn;

pub mod mock;
pub mod rpc;

pub use mock::MockChainReader;
pub use rpc::RpcChainReader;

/// View functions the engine reads from pool, token, comptroller and oracle
/// contracts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainMethod {
    Underlying,
    Name,
    Symbol,
    Decimals,
    TotalSupply,
    ExchangeRateStored,
    TotalBorrows,
    SupplyRatePerBlock,
    BorrowRatePerBlock,
    ReserveFactorMantissa,
    LiquidationIncentiveMantissa,
    /// Versioned price source, queried by pool token.
    GetUnderlyingPrice,
    /// Legacy price source, queried by underlying asset.
    GetPrice,
}

impl ChainMethod {
    pub fn signature(&self) -> &'static str {
        match self {
            ChainMethod::Underlying => "underlying()",
            ChainMethod::Name => "name()",
            ChainMethod::Symbol => "symbol()",
            ChainMethod::Decimals => "decimals()",
            ChainMethod::TotalSupply => "totalSupply()",
            ChainMethod::ExchangeRateStored => "exchangeRateStored()",
            ChainMethod::TotalBorrows => "totalBorrows()",
            ChainMethod::SupplyRatePerBlock => "supplyRatePerBlock()",
            ChainMethod::BorrowRatePerBlock => "borrowRatePerBlock()",
            ChainMethod::ReserveFactorMantissa => "reserveFactorMantissa()",
            ChainMethod::LiquidationIncentiveMantissa => "liquidationIncentiveMantissa()",
            ChainMethod::GetUnderlyingPrice => "getUnderlyingPrice(address)",
            ChainMethod::GetPrice => "getPrice(address)",
        }
    }
}

/// A single view call: target contract, function and optional address argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContractCall {
    pub contract: Address,
    pub method: ChainMethod,
    pub arg: Option<Address>,
}

impl ContractCall {
    pub fn new(contract: &Address, method: ChainMethod) -> Self {
        ContractCall {
            contract: contract.clone(),
            method,
            arg: None,
        }
    }

    pub fn with_arg(contract: &Address, method: ChainMethod, arg: &Address) -> Self {
        ContractCall {
            contract: contract.clone(),
            method,
            arg: Some(arg.clone()),
        }
    }
}

impl fmt::Display for ContractCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.arg {
            Some(arg) => write!(f, "{}.{}[{}]", self.contract, self.method.signature(), arg),
            None => write!(f, "{}.{}", self.contract, self.method.signature()),
        }
    }
}

/// Why a read produced no value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallError {
    /// The call executed and reverted (or returned no data).
    #[error("call reverted: {0}")]
    Reverted(String),
    /// The node answered with a JSON-RPC error that is not a revert.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    /// Network failure talking to the node.
    #[error("transport error: {0}")]
    Transport(String),
    /// Return data could not be decoded into the expected type.
    #[error("decode error: {0}")]
    Decode(String),
    /// A stored contract or argument id is not a valid address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

pub type CallResult<T> = Result<T, CallError>;

/// Value-or-default combinator used at every read site.
pub trait CallResultExt<T> {
    /// Return the value, or log the failure and return `default`.
    fn or_default_logged(self, call: &str, default: T) -> T;

    /// Return the value, or log the failure and return `None`.
    fn ok_logged(self, call: &str) -> Option<T>;
}

impl<T> CallResultExt<T> for CallResult<T> {
    fn or_default_logged(self, call: &str, default: T) -> T {
        match self {
            Ok(value) => value,
            Err(e) => {
                warn!(call = %call, error = %e, "Contract read failed, using default");
                default
            }
        }
    }

    fn ok_logged(self, call: &str) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(call = %call, error = %e, "Contract read failed, leaving field unchanged");
                None
            }
        }
    }
}

/// Read-only view of contract state at a block height.
///
/// Implementations must not retry: a failed read is reported once and the
/// caller degrades the affected field.
#[async_trait]
pub trait ChainReader: Send + Sync + fmt::Debug {
    /// Read a `uint256` return value.
    async fn read_uint(&self, call: &ContractCall, block: u64) -> CallResult<Amount>;

    /// Read an `address` return value.
    async fn read_address(&self, call: &ContractCall, block: u64) -> CallResult<Address>;

    /// Read a `string` (or `bytes32`) return value.
    async fn read_string(&self, call: &ContractCall, block: u64) -> CallResult<String>;

    async fn underlying(&self, pool_token: &Address, block: u64) -> CallResult<Address> {
        self.read_address(&ContractCall::new(pool_token, ChainMethod::Underlying), block)
            .await
    }

    async fn token_name(&self, token: &Address, block: u64) -> CallResult<String> {
        self.read_string(&ContractCall::new(token, ChainMethod::Name), block)
            .await
    }

    async fn token_symbol(&self, token: &Address, block: u64) -> CallResult<String> {
        self.read_string(&ContractCall::new(token, ChainMethod::Symbol), block)
            .await
    }

    async fn token_decimals(&self, token: &Address, block: u64) -> CallResult<u32> {
        let raw = self
            .read_uint(&ContractCall::new(token, ChainMethod::Decimals), block)
            .await?;
        raw.to_canonical_string()
            .parse::<u32>()
            .ok()
            .filter(|d| *d <= 77)
            .ok_or_else(|| CallError::Decode(format!("decimals out of range: {}", raw)))
    }

    async fn total_supply(&self, pool_token: &Address, block: u64) -> CallResult<Amount> {
        self.read_uint(&ContractCall::new(pool_token, ChainMethod::TotalSupply), block)
            .await
    }

    async fn exchange_rate_stored(&self, pool_token: &Address, block: u64) -> CallResult<Amount> {
        self.read_uint(
            &ContractCall::new(pool_token, ChainMethod::ExchangeRateStored),
            block,
        )
        .await
    }

    async fn total_borrows(&self, pool_token: &Address, block: u64) -> CallResult<Amount> {
        self.read_uint(&ContractCall::new(pool_token, ChainMethod::TotalBorrows), block)
            .await
    }

    async fn supply_rate_per_block(&self, pool_token: &Address, block: u64) -> CallResult<Amount> {
        self.read_uint(
            &ContractCall::new(pool_token, ChainMethod::SupplyRatePerBlock),
            block,
        )
        .await
    }

    async fn borrow_rate_per_block(&self, pool_token: &Address, block: u64) -> CallResult<Amount> {
        self.read_uint(
            &ContractCall::new(pool_token, ChainMethod::BorrowRatePerBlock),
            block,
        )
        .await
    }

    async fn reserve_factor_mantissa(&self, pool_token: &Address, block: u64) -> CallResult<Amount> {
        self.read_uint(
            &ContractCall::new(pool_token, ChainMethod::ReserveFactorMantissa),
            block,
        )
        .await
    }

    async fn liquidation_incentive_mantissa(
        &self,
        comptroller: &Address,
        block: u64,
    ) -> CallResult<Amount> {
        self.read_uint(
            &ContractCall::new(comptroller, ChainMethod::LiquidationIncentiveMantissa),
            block,
        )
        .await
    }

    /// Versioned price source: price mantissa of `pool_token`'s underlying.
    async fn underlying_price(
        &self,
        oracle: &Address,
        pool_token: &Address,
        block: u64,
    ) -> CallResult<Amount> {
        self.read_uint(
            &ContractCall::with_arg(oracle, ChainMethod::GetUnderlyingPrice, pool_token),
            block,
        )
        .await
    }

    /// Legacy price source: price mantissa of `asset` in ETH.
    async fn legacy_price(&self, oracle: &Address, asset: &Address, block: u64) -> CallResult<Amount> {
        self.read_uint(&ContractCall::with_arg(oracle, ChainMethod::GetPrice, asset), block)
            .await
    }
}
