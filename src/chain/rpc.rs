//! Contract reads over Ethereum JSON-RPC, via alloy contract bindings.

use super::{CallError, CallResult, ChainMethod, ChainReader, ContractCall};
use crate::domain::{Address, Amount};
use alloy::eips::BlockId;
use alloy::primitives::{self, U256};
use alloy::providers::RootProvider;
use alloy::rpc::client::RpcClient;
use alloy::sol;
use alloy::transports::http::Http;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tracing::debug;

sol! {
    #[sol(rpc)]
    interface IPoolToken {
        function underlying() external view returns (address);
        function totalSupply() external view returns (uint256);
        function exchangeRateStored() external view returns (uint256);
        function totalBorrows() external view returns (uint256);
        function supplyRatePerBlock() external view returns (uint256);
        function borrowRatePerBlock() external view returns (uint256);
        function reserveFactorMantissa() external view returns (uint256);
    }

    #[sol(rpc)]
    interface IERC20Metadata {
        function name() external view returns (string memory);
        function symbol() external view returns (string memory);
        function decimals() external view returns (uint8);
    }

    #[sol(rpc)]
    interface IComptroller {
        function liquidationIncentiveMantissa() external view returns (uint256);
    }

    #[sol(rpc)]
    interface IPriceOracle {
        function getUnderlyingPrice(address cToken) external view returns (uint256);
    }

    #[sol(rpc)]
    interface ILegacyPriceOracle {
        function getPrice(address asset) external view returns (uint256);
    }
}

type HttpProvider = RootProvider;

/// Issue a view call pinned to a block and unwrap its single return value.
macro_rules! view {
    ($builder:expr, $block:expr) => {
        $builder
            .block($block)
            .call()
            .await
            .map_err(contract_error)?
    };
}

/// Chain reader backed by an Ethereum JSON-RPC endpoint.
///
/// Each read is a single `eth_call`. Failures are surfaced, never retried.
pub struct RpcChainReader {
    provider: HttpProvider,
    url: String,
}

impl fmt::Debug for RpcChainReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcChainReader").field("url", &self.url).finish()
    }
}

impl RpcChainReader {
    pub fn new(url: &str) -> CallResult<Self> {
        let endpoint = reqwest::Url::parse(url)
            .map_err(|e| CallError::Transport(format!("invalid RPC url {}: {}", url, e)))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| CallError::Transport(e.to_string()))?;
        let provider = RootProvider::new(RpcClient::new(Http::with_client(client, endpoint), false));
        Ok(Self {
            provider,
            url: url.to_string(),
        })
    }
}

/// Stored ids are trusted but not validated; a corrupt one must fail the
/// read rather than address some other contract.
fn to_alloy(address: &Address) -> CallResult<primitives::Address> {
    address
        .as_str()
        .parse::<primitives::Address>()
        .map_err(|_| CallError::InvalidAddress(address.to_string()))
}

fn from_alloy(address: primitives::Address) -> Address {
    Address::from_bytes(&address.0 .0)
}

fn required_arg(call: &ContractCall) -> CallResult<primitives::Address> {
    match &call.arg {
        Some(arg) => to_alloy(arg),
        None => Err(CallError::InvalidAddress(format!(
            "{} needs an address argument",
            call.method.signature()
        ))),
    }
}

fn unsupported(method: ChainMethod, returns: &str) -> CallError {
    CallError::Decode(format!("{} does not return {}", method.signature(), returns))
}

fn contract_error(err: alloy::contract::Error) -> CallError {
    match err {
        alloy::contract::Error::TransportError(e) => match e.as_error_resp() {
            Some(payload) => classify_error(payload.code, payload.message.to_string()),
            None => CallError::Transport(e.to_string()),
        },
        alloy::contract::Error::ZeroData(..) => {
            CallError::Reverted("call returned no data".to_string())
        }
        other => CallError::Decode(other.to_string()),
    }
}

fn classify_error(code: i64, message: String) -> CallError {
    // Geth reports reverts as code 3; other clients only say so in the message.
    if code == 3 || message.to_ascii_lowercase().contains("revert") {
        CallError::Reverted(message)
    } else {
        CallError::Rpc { code, message }
    }
}

fn to_amount(value: U256) -> Amount {
    Amount::from_be_bytes(&value.to_be_bytes::<32>())
}

#[async_trait]
impl ChainReader for RpcChainReader {
    async fn read_uint(&self, call: &ContractCall, block: u64) -> CallResult<Amount> {
        let target = to_alloy(&call.contract)?;
        let at = BlockId::number(block);
        debug!(call = %call, block, "eth_call");

        let pool = IPoolToken::new(target, &self.provider);
        let value = match call.method {
            ChainMethod::TotalSupply => view!(pool.totalSupply(), at),
            ChainMethod::ExchangeRateStored => view!(pool.exchangeRateStored(), at),
            ChainMethod::TotalBorrows => view!(pool.totalBorrows(), at),
            ChainMethod::SupplyRatePerBlock => view!(pool.supplyRatePerBlock(), at),
            ChainMethod::BorrowRatePerBlock => view!(pool.borrowRatePerBlock(), at),
            ChainMethod::ReserveFactorMantissa => view!(pool.reserveFactorMantissa(), at),
            ChainMethod::Decimals => {
                let token = IERC20Metadata::new(target, &self.provider);
                U256::from(view!(token.decimals(), at))
            }
            ChainMethod::LiquidationIncentiveMantissa => {
                let comptroller = IComptroller::new(target, &self.provider);
                view!(comptroller.liquidationIncentiveMantissa(), at)
            }
            ChainMethod::GetUnderlyingPrice => {
                let oracle = IPriceOracle::new(target, &self.provider);
                view!(oracle.getUnderlyingPrice(required_arg(call)?), at)
            }
            ChainMethod::GetPrice => {
                let oracle = ILegacyPriceOracle::new(target, &self.provider);
                view!(oracle.getPrice(required_arg(call)?), at)
            }
            other => return Err(unsupported(other, "uint256")),
        };
        Ok(to_amount(value))
    }

    async fn read_address(&self, call: &ContractCall, block: u64) -> CallResult<Address> {
        let target = to_alloy(&call.contract)?;
        debug!(call = %call, block, "eth_call");
        match call.method {
            ChainMethod::Underlying => {
                let pool = IPoolToken::new(target, &self.provider);
                Ok(from_alloy(view!(pool.underlying(), BlockId::number(block))))
            }
            other => Err(unsupported(other, "address")),
        }
    }

    async fn read_string(&self, call: &ContractCall, block: u64) -> CallResult<String> {
        let target = to_alloy(&call.contract)?;
        let at = BlockId::number(block);
        debug!(call = %call, block, "eth_call");

        let token = IERC20Metadata::new(target, &self.provider);
        match call.method {
            ChainMethod::Name => Ok(view!(token.name(), at)),
            ChainMethod::Symbol => Ok(view!(token.symbol(), at)),
            other => Err(unsupported(other, "string")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolCall;

    const POOL: &str = "0x39aa39c021dfbae8fac545936693ac917d5e7563";

    #[test]
    fn test_classify_error() {
        assert!(matches!(
            classify_error(3, "execution reverted".to_string()),
            CallError::Reverted(_)
        ));
        assert!(matches!(
            classify_error(-32000, "execution reverted: no price".to_string()),
            CallError::Reverted(_)
        ));
        assert!(matches!(
            classify_error(-32000, "header not found".to_string()),
            CallError::Rpc { code: -32000, .. }
        ));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        assert!(matches!(
            RpcChainReader::new("not a url"),
            Err(CallError::Transport(_))
        ));
    }

    #[test]
    fn test_address_conversion() {
        let addr = Address::new(POOL);
        assert_eq!(from_alloy(to_alloy(&addr).unwrap()), addr);
        assert!(matches!(
            to_alloy(&Address::new("0x")),
            Err(CallError::InvalidAddress(_))
        ));
        assert!(matches!(
            to_alloy(&Address::new("0xzz")),
            Err(CallError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_uint_conversion_is_lossless() {
        let big = U256::from(10u64).pow(U256::from(36u64)) + U256::from(7u64);
        assert_eq!(
            to_amount(big),
            Amount::from_str_canonical("1000000000000000000000000000000000007").unwrap()
        );
        assert_eq!(to_amount(U256::ZERO), Amount::zero());
    }

    #[test]
    fn test_malformed_string_return_is_rejected() {
        // Offset word far past the end of the return data.
        let mut data = vec![0u8; 64];
        data[24..32].copy_from_slice(&(u64::MAX - 8).to_be_bytes());
        assert!(IERC20Metadata::nameCall::abi_decode_returns_validate(&data).is_err());
    }

    #[tokio::test]
    async fn test_corrupt_stored_id_fails_before_any_request() {
        let reader = RpcChainReader::new("http://127.0.0.1:1").unwrap();
        let oracle = Address::new(POOL);
        let result = reader
            .underlying_price(&oracle, &Address::new("0x1"), 1)
            .await;
        assert!(matches!(result, Err(CallError::InvalidAddress(_))));

        let result = reader.total_supply(&Address::new(""), 1).await;
        assert!(matches!(result, Err(CallError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_transport_error() {
        let reader = RpcChainReader::new("http://127.0.0.1:1").unwrap();
        let result = reader.total_supply(&Address::new(POOL), 1).await;
        assert!(matches!(result, Err(CallError::Transport(_))));
    }
}
