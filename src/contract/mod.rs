/// Function signatures and ABI decoding helpers
pub mod abi;
/// Contract call builder
pub mod builder;
/// Transaction submission and confirmation
pub mod sender;

/// Number of decimal places of the locked token.
pub const TOKEN_DECIMALS: u32 = 18;
