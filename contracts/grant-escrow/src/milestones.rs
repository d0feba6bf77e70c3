//! Milestone records, percentage-budget accounting, and deadline arithmetic.

use soroban_sdk::{Env, Vec};

use crate::types::{DataKey, Grant, Milestone, MilestoneStatus, PayoutRecord};
use crate::{grants, share_math, Error, LATE_PENALTY_PERCENT, LATE_SUBMISSION_WINDOW};

/// Read and advance the milestone counter.
pub fn next_milestone_id(env: &Env) -> u64 {
    let id: u64 = env
        .storage()
        .persistent()
        .get(&DataKey::MilestoneCount)
        .unwrap_or(0);
    env.storage()
        .persistent()
        .set(&DataKey::MilestoneCount, &(id + 1));
    id
}

pub fn milestone_count(env: &Env) -> u64 {
    env.storage()
        .persistent()
        .get(&DataKey::MilestoneCount)
        .unwrap_or(0)
}

pub fn save_milestone(env: &Env, milestone: &Milestone) {
    env.storage()
        .persistent()
        .set(&DataKey::Milestone(milestone.id), milestone);
}

pub fn load_milestone(env: &Env, milestone_id: u64) -> Result<Milestone, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Milestone(milestone_id))
        .ok_or(Error::MilestoneNotFound)
}

/// Ordered milestone ids for a grant. Empty until the first submission.
pub fn grant_milestones(env: &Env, grant_id: u64) -> Vec<u64> {
    env.storage()
        .persistent()
        .get(&DataKey::GrantMilestones(grant_id))
        .unwrap_or(Vec::new(env))
}

pub fn append_milestone(env: &Env, grant_id: u64, milestone_id: u64) {
    let mut ids = grant_milestones(env, grant_id);
    ids.push_back(milestone_id);
    env.storage()
        .persistent()
        .set(&DataKey::GrantMilestones(grant_id), &ids);
}

/// Sum of percentages over milestones currently counting against the budget
/// (everything not Rejected). A Rejected milestone frees its share until it
/// is resubmitted.
pub fn active_percentage_total(env: &Env, grant_id: u64) -> u32 {
    let mut total = 0u32;
    for id in grant_milestones(env, grant_id).iter() {
        if let Some(m) = env
            .storage()
            .persistent()
            .get::<DataKey, Milestone>(&DataKey::Milestone(id))
        {
            if m.status != MilestoneStatus::Rejected {
                total += m.percentage;
            }
        }
    }
    total
}

pub fn paid_percentage_total(env: &Env, grant_id: u64) -> u32 {
    let mut total = 0u32;
    for id in grant_milestones(env, grant_id).iter() {
        if let Some(m) = env
            .storage()
            .persistent()
            .get::<DataKey, Milestone>(&DataKey::Milestone(id))
        {
            if m.status == MilestoneStatus::Paid {
                total += m.percentage;
            }
        }
    }
    total
}

/// Late-submission policy, applied on submit and re-applied on resubmit
/// against the grant's unchanged deadline.
///
/// - deadline 0: never late, never locked;
/// - `now <= deadline`: on time;
/// - `deadline < now <= deadline + 30 days`: accepted with the 5% penalty;
/// - later: `SubmissionLocked`, no submission possible.
pub fn late_policy(now: u64, milestone_deadline: u64) -> Result<u32, Error> {
    if milestone_deadline == 0 || now <= milestone_deadline {
        return Ok(0);
    }
    if now > milestone_deadline + LATE_SUBMISSION_WINDOW {
        return Err(Error::SubmissionLocked);
    }
    Ok(LATE_PENALTY_PERCENT)
}

/// Per-token payout breakdown for a milestone at current escrow totals.
/// Pure computation; also serves as the preview for unpaid milestones.
pub fn compute_payouts(
    env: &Env,
    grant: &Grant,
    milestone: &Milestone,
) -> Result<Vec<PayoutRecord>, Error> {
    let mut out: Vec<PayoutRecord> = Vec::new(env);
    for token in grant.tokens.iter() {
        let escrow = grants::load_token_escrow(env, grant.id, &token);
        let b = share_math::breakdown(
            escrow.total,
            milestone.percentage,
            milestone.penalty_percent,
            grant.site_fee_percent,
        )
        .ok_or(Error::InvalidAmount)?;
        out.push_back(PayoutRecord {
            token,
            gross: b.gross,
            penalty: b.penalty,
            fee: b.fee,
            net: b.net,
        });
    }
    Ok(out)
}

/// Written exactly once, when the milestone is paid.
pub fn save_payouts(env: &Env, milestone_id: u64, payouts: &Vec<PayoutRecord>) {
    env.storage()
        .persistent()
        .set(&DataKey::MilestonePayout(milestone_id), payouts);
}

pub fn stored_payouts(env: &Env, milestone_id: u64) -> Vec<PayoutRecord> {
    env.storage()
        .persistent()
        .get(&DataKey::MilestonePayout(milestone_id))
        .unwrap_or(Vec::new(env))
}

/// True when the review window has elapsed with the milestone still
/// unreviewed. Evaluated lazily against the ledger clock at call time.
pub fn can_auto_approve(env: &Env, milestone: &Milestone) -> bool {
    milestone.status == MilestoneStatus::Submitted
        && env.ledger().timestamp() > milestone.review_deadline
}
