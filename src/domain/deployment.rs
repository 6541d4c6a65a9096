//! Fixed addresses, block thresholds and metadata of one protocol deployment.

use crate::domain::fixed_point::BLOCKS_PER_YEAR;
use crate::domain::Address;

/// Descriptive fields copied onto the protocol entity at creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolMetadata {
    pub name: String,
    pub slug: String,
    pub schema_version: String,
    pub indexer_version: String,
    pub methodology_version: String,
    pub network: String,
    pub protocol_type: String,
    pub lending_type: String,
    pub risk_type: String,
}

/// Static description of a deployment; passed explicitly into every
/// component instead of living in module-level globals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deployment {
    /// Comptroller address; also the protocol singleton's id.
    pub comptroller: Address,
    /// Pool token whose underlying is native ETH.
    pub eth_pool: Address,
    /// Pseudo-address used as the underlying of `eth_pool`.
    pub eth_asset: Address,
    /// Stablecoin pool used to convert ETH-denominated prices to USD.
    pub reference_pool: Address,
    pub reference_asset: Address,
    pub reference_decimals: u32,
    /// Token without `name()`/`symbol()`; metadata is hard-coded.
    pub sai_asset: Address,
    /// Price source queried by underlying address before the versioned source.
    pub legacy_oracle: Address,
    /// Last height served by the legacy price source.
    pub legacy_oracle_until: u64,
    /// Last height at which prices are ETH-denominated.
    pub eth_denominated_until: u64,
    pub blocks_per_year: u64,
    pub metadata: ProtocolMetadata,
}

impl Deployment {
    /// Ethereum mainnet addresses and cut-over heights.
    pub fn compound_v2_mainnet() -> Self {
        Deployment {
            comptroller: Address::new("0x3d9819210a31b4961b30ef54be2aed79b9c9cd3b"),
            eth_pool: Address::new("0x4ddc2d193948926d02f9b1fe9e1daa0718270ed5"),
            eth_asset: Address::zero(),
            reference_pool: Address::new("0x39aa39c021dfbae8fac545936693ac917d5e7563"),
            reference_asset: Address::new("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
            reference_decimals: 6,
            sai_asset: Address::new("0x89d24a6b4ccb1b6faa2625fe562bdd9a23260359"),
            legacy_oracle: Address::new("0x02557a5e05defeffd4cae6d83ea3d173b272c904"),
            legacy_oracle_until: 7_715_908,
            eth_denominated_until: 10_678_764,
            blocks_per_year: BLOCKS_PER_YEAR,
            metadata: ProtocolMetadata {
                name: "Compound V2".to_string(),
                slug: "compound-v2".to_string(),
                schema_version: "1.1.0".to_string(),
                indexer_version: env!("CARGO_PKG_VERSION").to_string(),
                methodology_version: "1.0.0".to_string(),
                network: "ETHEREUM".to_string(),
                protocol_type: "LENDING".to_string(),
                lending_type: "POOLED".to_string(),
                risk_type: "GLOBAL".to_string(),
            },
        }
    }

    /// Same deployment with a different comptroller (forks, test networks).
    pub fn with_comptroller(mut self, comptroller: Address) -> Self {
        self.comptroller = comptroller;
        self
    }

    pub fn protocol_id(&self) -> &str {
        self.comptroller.as_str()
    }
}

impl Default for Deployment {
    fn default() -> Self {
        Self::compound_v2_mainnet()
    }
}
