/// Strategy subsystem: what a space's contracts accept and what a voter can cast.
///
/// 1. [`abi`]: Solidity ABI encoder/decoder and 4-byte selectors.
/// 2. [`picker`]: choose an authenticator for the wallet connector and filter the
///    space's strategies to those this chain supports.
/// 3. [`execution`]: encode proposal transactions for the space's execution strategy.
/// 4. [`registry`]: voting strategy implementations keyed by deployed address.
/// 5. [`power`]: bounded, order-preserving voting power fan-out.
pub mod abi;
pub mod execution;
pub mod picker;
pub mod power;
pub mod registry;
