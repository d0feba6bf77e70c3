//! Grant records and per-token escrow accounting.

use grant_core::asset::AssetId;
use soroban_sdk::{Env, Vec};

use crate::events::{emit_grant_completed, GrantCompleted, EVENT_VERSION};
use crate::types::{DataKey, Grant, GrantStatus, GrantTokenAmount, TokenEscrow};
use crate::{invariants, milestones, Error};

/// Read and advance the grant counter. Returns the id for the grant being
/// created; the stored counter equals the number of grants ever created.
pub fn next_grant_id(env: &Env) -> u64 {
    let id: u64 = env
        .storage()
        .persistent()
        .get(&DataKey::GrantCount)
        .unwrap_or(0);
    env.storage()
        .persistent()
        .set(&DataKey::GrantCount, &(id + 1));
    id
}

pub fn grant_count(env: &Env) -> u64 {
    env.storage()
        .persistent()
        .get(&DataKey::GrantCount)
        .unwrap_or(0)
}

pub fn save_grant(env: &Env, grant: &Grant) {
    env.storage()
        .persistent()
        .set(&DataKey::Grant(grant.id), grant);
}

pub fn load_grant(env: &Env, grant_id: u64) -> Result<Grant, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Grant(grant_id))
        .ok_or(Error::GrantNotFound)
}

/// Zeroed record until the first deposit for this (grant, token) pair.
pub fn load_token_escrow(env: &Env, grant_id: u64, token: &AssetId) -> TokenEscrow {
    env.storage()
        .persistent()
        .get(&DataKey::TokenEscrow(grant_id, token.clone()))
        .unwrap_or(TokenEscrow {
            total: 0,
            released: 0,
            escrowed: 0,
        })
}

/// Persist a per-token record, asserting the accounting identity first.
pub fn save_token_escrow(env: &Env, grant_id: u64, token: &AssetId, escrow: &TokenEscrow) {
    invariants::assert_token_escrow(escrow);
    env.storage()
        .persistent()
        .set(&DataKey::TokenEscrow(grant_id, token.clone()), escrow);
}

pub fn supports_token(grant: &Grant, token: &AssetId) -> bool {
    for t in grant.tokens.iter() {
        if &t == token {
            return true;
        }
    }
    false
}

/// Balance snapshot across all of a grant's supported tokens.
pub fn token_amounts(env: &Env, grant: &Grant) -> Vec<GrantTokenAmount> {
    let mut out: Vec<GrantTokenAmount> = Vec::new(env);
    for token in grant.tokens.iter() {
        let escrow = load_token_escrow(env, grant.id, &token);
        out.push_back(GrantTokenAmount {
            token,
            total: escrow.total,
            released: escrow.released,
            escrowed: escrow.escrowed,
        });
    }
    out
}

pub fn retained(env: &Env, grant_id: u64, token: &AssetId) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::Retained(grant_id, token.clone()))
        .unwrap_or(0)
}

pub fn set_retained(env: &Env, grant_id: u64, token: &AssetId, amount: i128) {
    env.storage()
        .persistent()
        .set(&DataKey::Retained(grant_id, token.clone()), &amount);
}

/// Invoked after every successful payout. Completion is detected by exact
/// equality: submission-time budget checks guarantee the paid sum can never
/// pass 100, so a threshold comparison is unnecessary.
pub fn mark_completed_if_done(env: &Env, grant: &mut Grant) -> bool {
    if grant.status != GrantStatus::Active {
        return false;
    }
    if milestones::paid_percentage_total(env, grant.id) != 100 {
        return false;
    }
    grant.status = GrantStatus::Completed;
    grant.completed_at = env.ledger().timestamp();
    save_grant(env, grant);
    emit_grant_completed(
        env,
        GrantCompleted {
            version: EVENT_VERSION,
            grant_id: grant.id,
            completed_at: grant.completed_at,
        },
    );
    true
}
