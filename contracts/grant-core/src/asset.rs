use soroban_sdk::{contracterror, Address, Env};

/// Canonical token identifier. Always a deployed token contract address
/// (a Stellar Asset Contract or a custom token implementing the token
/// interface).
pub type AssetId = Address;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum AssetError {
    MustBeContractAddress = 200,
}

/// Validate that `asset_id` can be used for token operations.
///
/// Token operations require a Soroban contract address; account addresses
/// (strkey prefix `G`) cannot receive `token::Client` calls.
pub fn validate_asset_id(asset_id: &AssetId) -> Result<(), AssetError> {
    let strkey = asset_id.to_string();
    if strkey.len() != 56 {
        return Err(AssetError::MustBeContractAddress);
    }

    let mut raw = [0u8; 56];
    strkey.copy_into_slice(&mut raw);
    if raw[0] != b'C' {
        return Err(AssetError::MustBeContractAddress);
    }
    Ok(())
}

/// `validate_asset_id` as a predicate, for call sites that only branch.
pub fn is_contract_address(_env: &Env, asset_id: &AssetId) -> bool {
    validate_asset_id(asset_id).is_ok()
}
