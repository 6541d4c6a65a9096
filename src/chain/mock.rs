//! In-memory chain reader for tests.

use super::{CallError, CallResult, ChainMethod, ChainReader, ContractCall};
use crate::domain::{Address, Amount};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum MockValue {
    Uint(Amount),
    Address(Address),
    Text(String),
}

type CallKey = (Address, ChainMethod, Option<Address>);

/// Chain reader returning canned values regardless of block height.
///
/// Calls with no registered value revert, which is how tests exercise the
/// degrade-to-default paths.
#[derive(Debug, Clone, Default)]
pub struct MockChainReader {
    values: HashMap<CallKey, MockValue>,
    calls: Arc<AtomicUsize>,
}

impl MockChainReader {
    pub fn new() -> Self {
        Self::default()
    }

    fn with(mut self, contract: &Address, method: ChainMethod, arg: Option<&Address>, value: MockValue) -> Self {
        self.values
            .insert((contract.clone(), method, arg.cloned()), value);
        self
    }

    /// Register a uint return value.
    pub fn with_uint(self, contract: &Address, method: ChainMethod, value: impl Into<Amount>) -> Self {
        self.with(contract, method, None, MockValue::Uint(value.into()))
    }

    /// Register a uint return value for an address-argument call.
    pub fn with_uint_arg(
        self,
        contract: &Address,
        method: ChainMethod,
        arg: &Address,
        value: impl Into<Amount>,
    ) -> Self {
        self.with(contract, method, Some(arg), MockValue::Uint(value.into()))
    }

    pub fn with_address(self, contract: &Address, method: ChainMethod, value: &Address) -> Self {
        self.with(contract, method, None, MockValue::Address(value.clone()))
    }

    pub fn with_string(self, contract: &Address, method: ChainMethod, value: &str) -> Self {
        self.with(contract, method, None, MockValue::Text(value.to_string()))
    }

    /// Register name, symbol and decimals for an ERC-20 style token.
    pub fn with_token(self, token: &Address, name: &str, symbol: &str, decimals: u64) -> Self {
        self.with_string(token, ChainMethod::Name, name)
            .with_string(token, ChainMethod::Symbol, symbol)
            .with_uint(token, ChainMethod::Decimals, decimals)
    }

    /// Register a pool token: its own metadata (8 decimals) and its underlying.
    pub fn with_pool(self, pool: &Address, name: &str, symbol: &str, underlying: &Address) -> Self {
        self.with_token(pool, name, symbol, 8)
            .with_address(pool, ChainMethod::Underlying, underlying)
    }

    /// Number of reads served so far, including reverted ones.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn lookup(&self, call: &ContractCall) -> CallResult<&MockValue> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.values
            .get(&(call.contract.clone(), call.method, call.arg.clone()))
            .ok_or_else(|| CallError::Reverted(format!("no mock value for {}", call)))
    }
}

#[async_trait]
impl ChainReader for MockChainReader {
    async fn read_uint(&self, call: &ContractCall, _block: u64) -> CallResult<Amount> {
        match self.lookup(call)? {
            MockValue::Uint(v) => Ok(v.clone()),
            other => Err(CallError::Decode(format!("expected uint, mocked {:?}", other))),
        }
    }

    async fn read_address(&self, call: &ContractCall, _block: u64) -> CallResult<Address> {
        match self.lookup(call)? {
            MockValue::Address(v) => Ok(v.clone()),
            other => Err(CallError::Decode(format!("expected address, mocked {:?}", other))),
        }
    }

    async fn read_string(&self, call: &ContractCall, _block: u64) -> CallResult<String> {
        match self.lookup(call)? {
            MockValue::Text(v) => Ok(v.clone()),
            other => Err(CallError::Decode(format!("expected string, mocked {:?}", other))),
        }
    }
}
