use alloy::primitives::{address, Address};

/// WETH address
pub const WETH: Address = address!("0x4200000000000000000000000000000000000006");
/// USDC address
pub const USDC: Address = address!("0x833589fCD6eDb6E08f4c7C32D4f71b54bdA02913");
/// DAI address
pub const DAI: Address = address!("0x50c5725949A6F0c72E6C4a641F24049A917DB0Cb");

/// Uniswap V2 factory address
pub const UNISWAP_V2_FACTORY: Address = address!("0x8909Dc15e40173Ff4699343b6eB8132c65e18eC6");
/// SushiSwap V2 factory address
pub const SUSHISWAP_V2_FACTORY: Address = address!("0x71524B4f93c58fcbF659783284E38825f0622859");
/// Uniswap V3 factory address
pub const UNISWAP_V3_FACTORY: Address = address!("0x33128a8fC17869897dcE68Ed026d694621f6FDfD");

/// Default Uniswap V3 fee tier (0.05%)
pub const UNISWAP_V3_DEFAULT_FEE: u32 = 500;

/// Public Base RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://mainnet.base.org";
