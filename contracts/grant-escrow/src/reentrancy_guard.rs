//! Re-entry protection for the fund-moving entrypoints.
//!
//! A boolean flag in instance storage blocks a token callback from entering
//! a protected function while another invocation is in flight. Both a
//! `panic!` and an `Err(..)` return revert all storage changes in Soroban,
//! so the flag cannot be left stuck after a failed operation; `release` only
//! needs to run on the success path.

use crate::types::DataKey;
use soroban_sdk::Env;

/// Panics if a protected function is already executing.
pub fn acquire(env: &Env) {
    if env.storage().instance().has(&DataKey::ReentrancyGuard) {
        panic!("reentrant call");
    }
    env.storage()
        .instance()
        .set(&DataKey::ReentrancyGuard, &true);
}

pub fn release(env: &Env) {
    env.storage().instance().remove(&DataKey::ReentrancyGuard);
}
