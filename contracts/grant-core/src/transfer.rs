//! The asset-transfer boundary.
//!
//! `receive` pulls a deposit into the current contract, `pay` sends funds
//! out of it. Both use `try_transfer` so that a failing token call comes
//! back as a typed error the caller can map into its own taxonomy. Returning
//! that error from a contract entrypoint reverts the whole invocation, so
//! no storage write survives a failed transfer.

use soroban_sdk::{contracterror, token, Address, Env};

use crate::asset::AssetId;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum TransferError {
    /// The inbound transfer was rejected, typically because `from` does not
    /// hold `amount` of the token.
    ReceiveFailed = 210,
    /// The outbound transfer was rejected by the token contract.
    PayFailed = 211,
}

/// Pull `amount` of `token` from `from` into the current contract.
///
/// `from` must have authorized the transfer.
pub fn receive(env: &Env, token: &AssetId, from: &Address, amount: i128) -> Result<(), TransferError> {
    let client = token::Client::new(env, token);
    match client.try_transfer(from, &env.current_contract_address(), &amount) {
        Ok(Ok(())) => Ok(()),
        _ => Err(TransferError::ReceiveFailed),
    }
}

/// Send `amount` of `token` from the current contract to `to`.
pub fn pay(env: &Env, token: &AssetId, to: &Address, amount: i128) -> Result<(), TransferError> {
    let client = token::Client::new(env, token);
    match client.try_transfer(&env.current_contract_address(), to, &amount) {
        Ok(Ok(())) => Ok(()),
        _ => Err(TransferError::PayFailed),
    }
}
