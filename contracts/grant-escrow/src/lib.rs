//! Milestone-based grant escrow.
//!
//! A funder escrows one or more tokens against a grant tied to an external
//! project or campaign. The designated grantee unlocks funds incrementally
//! by submitting milestones worth a percentage of the grant's total value;
//! the grant administrator approves (paying out atomically) or rejects, and
//! once the review window lapses anyone may trigger auto-approval. Late
//! submissions take a deterministic penalty, and every token balance
//! transition is event-logged and re-checked against the accounting
//! identity `total == released + escrowed`.

#![no_std]

mod events;
mod grants;
mod invariants;
mod milestones;
mod reentrancy_guard;
pub mod share_math;
mod types;

#[cfg(test)]
mod test_deadlines;
#[cfg(test)]
mod test_invariants;

use grant_core::{asset, transfer};
use soroban_sdk::{
    contract, contracterror, contractimpl, Address, BytesN, Env, String, Vec,
};

use events::{
    emit_funds_added, emit_funds_withdrawn, emit_grant_cancelled, emit_grant_created,
    emit_milestone_approved, emit_milestone_penalty_applied, emit_milestone_rejected,
    emit_milestone_resubmitted, emit_milestone_submitted, emit_retained_swept, FundsAdded,
    FundsWithdrawn, GrantCancelled, GrantCreated, MilestoneApproved, MilestonePenaltyApplied,
    MilestoneRejected, MilestoneResubmitted, MilestoneSubmitted, RetainedSwept, TokenRefund,
    EVENT_VERSION,
};
pub use types::{
    DataKey, EntityType, Grant, GrantStatus, GrantTokenAmount, Milestone, MilestoneStatus,
    PayoutRecord, TokenEscrow,
};

/// Per-grant token list bound; payout iterates every supported token.
pub const MAX_GRANT_TOKENS: u32 = 10;
pub const MIN_SITE_FEE_PERCENT: u32 = 1;
pub const MAX_SITE_FEE_PERCENT: u32 = 5;
/// Deduction applied to milestones submitted after the grant deadline.
pub const LATE_PENALTY_PERCENT: u32 = 5;
/// How long past the grant deadline submissions are still accepted.
pub const LATE_SUBMISSION_WINDOW: u64 = 30 * 24 * 60 * 60;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    GrantNotFound = 3,
    MilestoneNotFound = 4,
    /// Caller is not the funder, grantee, or admin the operation requires.
    NotAuthorized = 5,
    /// Site fee outside 1–5 percent.
    InvalidFee = 6,
    /// Declared amount exceeds the available balance (deposit or escrow).
    InsufficientFunds = 7,
    /// Milestone percentages would exceed 100 for the grant.
    BudgetExceeded = 8,
    /// Past the 30-day cutoff after the grant's milestone deadline.
    SubmissionLocked = 9,
    GrantNotActive = 10,
    /// Withdrawals are blocked once any milestone was ever submitted.
    MilestonesAlreadySubmitted = 11,
    /// Milestone is not in the state the transition requires.
    InvalidState = 12,
    /// The outbound token transfer was rejected; the operation reverted.
    TransferFailed = 13,
    InvalidAmount = 14,
    /// Token and amount lists empty, unequal, or longer than the bound.
    TokenListMismatch = 15,
    DuplicateToken = 16,
    /// Token is not in the grant's fixed supported list.
    UnsupportedToken = 17,
    /// Milestone percentage outside 1–100.
    InvalidPercentage = 18,
    /// Auto-approval attempted before the review window elapsed.
    ReviewWindowOpen = 19,
    InvalidAsset = 20,
    /// No retained fees or penalties to sweep for this (grant, token).
    NothingRetained = 21,
}

#[contract]
pub struct GrantEscrowContract;

#[contractimpl]
impl GrantEscrowContract {
    /// One-time setup. `admin` becomes the grant administrator who reviews
    /// milestone submissions for every grant.
    pub fn init(env: Env, admin: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        env.storage().instance().set(&DataKey::Admin, &admin);
        Ok(())
    }

    /// Create a grant and escrow the initial deposit for every token.
    ///
    /// `tokens` and `amounts` are parallel lists (1–10 entries, no
    /// duplicates, amounts > 0). The linked entity reference is stored
    /// opaquely; the registry is never consulted. `milestone_deadline` of 0
    /// disables deadline enforcement.
    #[allow(clippy::too_many_arguments)]
    pub fn create_grant(
        env: Env,
        funder: Address,
        grantee: Address,
        linked_entity_id: u64,
        entity_type: EntityType,
        tokens: Vec<asset::AssetId>,
        amounts: Vec<i128>,
        site_fee_percent: u32,
        review_time_lock: u64,
        milestone_deadline: u64,
    ) -> Result<u64, Error> {
        reentrancy_guard::acquire(&env);
        funder.require_auth();
        Self::require_initialized(&env)?;

        if !(MIN_SITE_FEE_PERCENT..=MAX_SITE_FEE_PERCENT).contains(&site_fee_percent) {
            return Err(Error::InvalidFee);
        }
        Self::check_token_lists(&tokens, &amounts)?;

        let now = env.ledger().timestamp();
        let grant_id = grants::next_grant_id(&env);
        let grant = Grant {
            id: grant_id,
            funder: funder.clone(),
            grantee: grantee.clone(),
            linked_entity_id,
            entity_type: entity_type.clone(),
            site_fee_percent,
            review_time_lock,
            milestone_deadline,
            status: GrantStatus::Active,
            created_at: now,
            completed_at: 0,
            tokens: tokens.clone(),
        };
        grants::save_grant(&env, &grant);

        // EFFECTS: record every deposit before pulling any funds
        for i in 0..tokens.len() {
            let token = tokens.get_unchecked(i);
            let amount = amounts.get_unchecked(i);
            grants::save_token_escrow(
                &env,
                grant_id,
                &token,
                &TokenEscrow {
                    total: amount,
                    released: 0,
                    escrowed: amount,
                },
            );
        }

        // INTERACTION: a failed deposit reverts the whole creation
        for i in 0..tokens.len() {
            let token = tokens.get_unchecked(i);
            let amount = amounts.get_unchecked(i);
            transfer::receive(&env, &token, &funder, amount)
                .map_err(|_| Error::InsufficientFunds)?;
        }

        emit_grant_created(
            &env,
            GrantCreated {
                version: EVENT_VERSION,
                grant_id,
                funder,
                grantee,
                linked_entity_id,
                entity_type,
                timestamp: now,
            },
        );

        reentrancy_guard::release(&env);
        Ok(grant_id)
    }

    /// Top up an active grant. Only tokens from the grant's fixed list are
    /// accepted; validation mirrors `create_grant`.
    pub fn add_funds(
        env: Env,
        grant_id: u64,
        from: Address,
        tokens: Vec<asset::AssetId>,
        amounts: Vec<i128>,
    ) -> Result<(), Error> {
        reentrancy_guard::acquire(&env);
        from.require_auth();
        Self::require_initialized(&env)?;

        let grant = grants::load_grant(&env, grant_id)?;
        if grant.status != GrantStatus::Active {
            return Err(Error::GrantNotActive);
        }
        Self::check_token_lists(&tokens, &amounts)?;
        for token in tokens.iter() {
            if !grants::supports_token(&grant, &token) {
                return Err(Error::UnsupportedToken);
            }
        }

        let now = env.ledger().timestamp();
        for i in 0..tokens.len() {
            let token = tokens.get_unchecked(i);
            let amount = amounts.get_unchecked(i);
            let mut escrow = grants::load_token_escrow(&env, grant_id, &token);
            escrow.total = escrow.total.checked_add(amount).ok_or(Error::InvalidAmount)?;
            escrow.escrowed = escrow
                .escrowed
                .checked_add(amount)
                .ok_or(Error::InvalidAmount)?;
            grants::save_token_escrow(&env, grant_id, &token, &escrow);

            emit_funds_added(
                &env,
                FundsAdded {
                    version: EVENT_VERSION,
                    grant_id,
                    token: token.clone(),
                    amount,
                    new_total: escrow.total,
                    timestamp: now,
                },
            );
        }

        for i in 0..tokens.len() {
            let token = tokens.get_unchecked(i);
            let amount = amounts.get_unchecked(i);
            transfer::receive(&env, &token, &from, amount)
                .map_err(|_| Error::InsufficientFunds)?;
        }

        reentrancy_guard::release(&env);
        Ok(())
    }

    /// Pull unspent escrow back out. Funder only, and only while no
    /// milestone has ever been submitted for the grant — once review has
    /// started the escrow is committed until payout or cancellation.
    pub fn withdraw_funds(
        env: Env,
        grant_id: u64,
        funder: Address,
        token: asset::AssetId,
        amount: i128,
        recipient: Address,
    ) -> Result<(), Error> {
        reentrancy_guard::acquire(&env);
        funder.require_auth();
        Self::require_initialized(&env)?;

        let grant = grants::load_grant(&env, grant_id)?;
        if funder != grant.funder {
            return Err(Error::NotAuthorized);
        }
        if grant.status != GrantStatus::Active {
            return Err(Error::GrantNotActive);
        }
        if !milestones::grant_milestones(&env, grant_id).is_empty() {
            return Err(Error::MilestonesAlreadySubmitted);
        }
        if !grants::supports_token(&grant, &token) {
            return Err(Error::UnsupportedToken);
        }
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        let mut escrow = grants::load_token_escrow(&env, grant_id, &token);
        if amount > escrow.escrowed {
            return Err(Error::InsufficientFunds);
        }
        escrow.total -= amount;
        escrow.escrowed -= amount;
        grants::save_token_escrow(&env, grant_id, &token, &escrow);

        transfer::pay(&env, &token, &recipient, amount).map_err(|_| Error::TransferFailed)?;

        emit_funds_withdrawn(
            &env,
            FundsWithdrawn {
                version: EVENT_VERSION,
                grant_id,
                token,
                amount,
                recipient,
                timestamp: env.ledger().timestamp(),
            },
        );

        reentrancy_guard::release(&env);
        Ok(())
    }

    /// Cancel an active grant and refund the remaining escrow of every
    /// token to `refund_recipient`. Amounts already released stay with the
    /// grantee. Terminal; a second call fails with `GrantNotActive`.
    pub fn cancel_grant(
        env: Env,
        grant_id: u64,
        funder: Address,
        refund_recipient: Address,
    ) -> Result<(), Error> {
        reentrancy_guard::acquire(&env);
        funder.require_auth();
        Self::require_initialized(&env)?;

        let mut grant = grants::load_grant(&env, grant_id)?;
        if funder != grant.funder {
            return Err(Error::NotAuthorized);
        }
        if grant.status != GrantStatus::Active {
            return Err(Error::GrantNotActive);
        }

        // EFFECTS: zero out every escrowed balance and mark terminal state
        let mut refunds: Vec<TokenRefund> = Vec::new(&env);
        for token in grant.tokens.iter() {
            let mut escrow = grants::load_token_escrow(&env, grant_id, &token);
            let amount = escrow.escrowed;
            if amount > 0 {
                escrow.total -= amount;
                escrow.escrowed = 0;
                grants::save_token_escrow(&env, grant_id, &token, &escrow);
            }
            refunds.push_back(TokenRefund { token, amount });
        }
        grant.status = GrantStatus::Cancelled;
        grants::save_grant(&env, &grant);

        // INTERACTION: refund transfers last
        for refund in refunds.iter() {
            if refund.amount > 0 {
                transfer::pay(&env, &refund.token, &refund_recipient, refund.amount)
                    .map_err(|_| Error::TransferFailed)?;
            }
        }

        emit_grant_cancelled(
            &env,
            GrantCancelled {
                version: EVENT_VERSION,
                grant_id,
                refund_recipient,
                refunds,
                timestamp: env.ledger().timestamp(),
            },
        );

        reentrancy_guard::release(&env);
        Ok(())
    }

    /// Submit a milestone claiming `percentage` of the grant's total value.
    ///
    /// Grantee only. The sum of percentages over non-rejected milestones may
    /// never pass 100. Submissions after the grant deadline carry the late
    /// penalty; past the 30-day cutoff they are locked out entirely.
    pub fn submit_milestone(
        env: Env,
        grant_id: u64,
        grantee: Address,
        title: String,
        description: String,
        evidence_hash: BytesN<32>,
        percentage: u32,
    ) -> Result<u64, Error> {
        grantee.require_auth();
        Self::require_initialized(&env)?;

        let grant = grants::load_grant(&env, grant_id)?;
        if grantee != grant.grantee {
            return Err(Error::NotAuthorized);
        }
        if grant.status != GrantStatus::Active {
            return Err(Error::GrantNotActive);
        }
        if !(1..=100).contains(&percentage) {
            return Err(Error::InvalidPercentage);
        }
        let budget = milestones::active_percentage_total(&env, grant_id) + percentage;
        if budget > 100 {
            return Err(Error::BudgetExceeded);
        }

        let now = env.ledger().timestamp();
        let penalty_percent = milestones::late_policy(now, grant.milestone_deadline)?;

        let milestone_id = milestones::next_milestone_id(&env);
        let milestone = Milestone {
            id: milestone_id,
            grant_id,
            title,
            description,
            evidence_hash,
            percentage,
            status: MilestoneStatus::Submitted,
            submitted_at: now,
            review_deadline: now + grant.review_time_lock,
            approved_by: None,
            approval_message: None,
            rejected_by: None,
            rejection_reason: None,
            auto_approved: false,
            penalty_percent,
        };
        milestones::save_milestone(&env, &milestone);
        milestones::append_milestone(&env, grant_id, milestone_id);
        invariants::assert_budget(budget);

        emit_milestone_submitted(
            &env,
            MilestoneSubmitted {
                version: EVENT_VERSION,
                grant_id,
                milestone_id,
                percentage,
                penalty_percent,
                review_deadline: milestone.review_deadline,
                timestamp: now,
            },
        );
        if penalty_percent > 0 {
            emit_milestone_penalty_applied(
                &env,
                MilestonePenaltyApplied {
                    version: EVENT_VERSION,
                    grant_id,
                    milestone_id,
                    penalty_percent,
                    submitted_at: now,
                    milestone_deadline: grant.milestone_deadline,
                },
            );
        }

        Ok(milestone_id)
    }

    /// Put a rejected milestone back under review with fresh evidence.
    ///
    /// The budget is re-checked (other milestones may have consumed budget
    /// in the meantime) and the late policy is re-applied against the
    /// grant's unchanged deadline. Rejection fields are cleared.
    pub fn resubmit_milestone(
        env: Env,
        grant_id: u64,
        grantee: Address,
        milestone_id: u64,
        new_evidence_hash: BytesN<32>,
    ) -> Result<(), Error> {
        grantee.require_auth();
        Self::require_initialized(&env)?;

        let grant = grants::load_grant(&env, grant_id)?;
        if grantee != grant.grantee {
            return Err(Error::NotAuthorized);
        }
        if grant.status != GrantStatus::Active {
            return Err(Error::GrantNotActive);
        }

        let mut milestone = milestones::load_milestone(&env, milestone_id)?;
        if milestone.grant_id != grant_id {
            return Err(Error::MilestoneNotFound);
        }
        if milestone.status != MilestoneStatus::Rejected {
            return Err(Error::InvalidState);
        }

        // A Rejected milestone is excluded from the active sum, so its own
        // percentage is added back here.
        let budget = milestones::active_percentage_total(&env, grant_id) + milestone.percentage;
        if budget > 100 {
            return Err(Error::BudgetExceeded);
        }

        let now = env.ledger().timestamp();
        let penalty_percent = milestones::late_policy(now, grant.milestone_deadline)?;

        milestone.evidence_hash = new_evidence_hash;
        milestone.status = MilestoneStatus::Submitted;
        milestone.submitted_at = now;
        milestone.review_deadline = now + grant.review_time_lock;
        milestone.rejected_by = None;
        milestone.rejection_reason = None;
        milestone.penalty_percent = penalty_percent;
        milestones::save_milestone(&env, &milestone);
        invariants::assert_budget(budget);

        emit_milestone_resubmitted(
            &env,
            MilestoneResubmitted {
                version: EVENT_VERSION,
                grant_id,
                milestone_id,
                penalty_percent,
                review_deadline: milestone.review_deadline,
                timestamp: now,
            },
        );
        if penalty_percent > 0 {
            emit_milestone_penalty_applied(
                &env,
                MilestonePenaltyApplied {
                    version: EVENT_VERSION,
                    grant_id,
                    milestone_id,
                    penalty_percent,
                    submitted_at: now,
                    milestone_deadline: grant.milestone_deadline,
                },
            );
        }

        Ok(())
    }

    /// Approve a submitted milestone and pay it out in one atomic step.
    /// Admin only. Splitting approval from payout would reopen a
    /// double-spend window, so the two never exist as separate states.
    pub fn approve_milestone(
        env: Env,
        grant_id: u64,
        caller: Address,
        milestone_id: u64,
        message: String,
    ) -> Result<(), Error> {
        caller.require_auth();
        Self::require_admin(&env, &caller)?;
        Self::payout(&env, grant_id, milestone_id, Some(caller), Some(message), false)
    }

    /// Reject a submitted milestone. Admin only; no funds move, and the
    /// grantee may resubmit with new evidence.
    pub fn reject_milestone(
        env: Env,
        grant_id: u64,
        caller: Address,
        milestone_id: u64,
        reason: String,
    ) -> Result<(), Error> {
        caller.require_auth();
        Self::require_admin(&env, &caller)?;

        grants::load_grant(&env, grant_id)?;
        let mut milestone = milestones::load_milestone(&env, milestone_id)?;
        if milestone.grant_id != grant_id {
            return Err(Error::MilestoneNotFound);
        }
        if milestone.status != MilestoneStatus::Submitted {
            return Err(Error::InvalidState);
        }

        milestone.status = MilestoneStatus::Rejected;
        milestone.rejected_by = Some(caller.clone());
        milestone.rejection_reason = Some(reason);
        milestones::save_milestone(&env, &milestone);

        emit_milestone_rejected(
            &env,
            MilestoneRejected {
                version: EVENT_VERSION,
                grant_id,
                milestone_id,
                rejected_by: caller,
                timestamp: env.ledger().timestamp(),
            },
        );

        Ok(())
    }

    /// Pay out a milestone the admin failed to review in time. Callable by
    /// anyone once the review window has strictly elapsed.
    pub fn check_and_auto_approve(env: Env, grant_id: u64, milestone_id: u64) -> Result<(), Error> {
        Self::require_initialized(&env)?;

        let milestone = milestones::load_milestone(&env, milestone_id)?;
        if milestone.grant_id != grant_id {
            return Err(Error::MilestoneNotFound);
        }
        if milestone.status != MilestoneStatus::Submitted {
            return Err(Error::InvalidState);
        }
        if env.ledger().timestamp() <= milestone.review_deadline {
            return Err(Error::ReviewWindowOpen);
        }

        Self::payout(&env, grant_id, milestone_id, None, None, true)
    }

    /// Pay retained fees and penalties for one (grant, token) out to
    /// `recipient` and zero the counter. Admin only.
    pub fn sweep_retained(
        env: Env,
        grant_id: u64,
        caller: Address,
        token: asset::AssetId,
        recipient: Address,
    ) -> Result<i128, Error> {
        reentrancy_guard::acquire(&env);
        caller.require_auth();
        Self::require_admin(&env, &caller)?;

        let grant = grants::load_grant(&env, grant_id)?;
        if !grants::supports_token(&grant, &token) {
            return Err(Error::UnsupportedToken);
        }
        let amount = grants::retained(&env, grant_id, &token);
        if amount == 0 {
            return Err(Error::NothingRetained);
        }

        grants::set_retained(&env, grant_id, &token, 0);
        transfer::pay(&env, &token, &recipient, amount).map_err(|_| Error::TransferFailed)?;

        emit_retained_swept(
            &env,
            RetainedSwept {
                version: EVENT_VERSION,
                grant_id,
                token,
                amount,
                recipient,
                timestamp: env.ledger().timestamp(),
            },
        );

        reentrancy_guard::release(&env);
        Ok(amount)
    }

    // ─── Read accessors ───

    pub fn get_grant(env: Env, grant_id: u64) -> Result<Grant, Error> {
        grants::load_grant(&env, grant_id)
    }

    pub fn get_grant_token_amounts(
        env: Env,
        grant_id: u64,
    ) -> Result<Vec<GrantTokenAmount>, Error> {
        let grant = grants::load_grant(&env, grant_id)?;
        Ok(grants::token_amounts(&env, &grant))
    }

    pub fn get_milestone(env: Env, milestone_id: u64) -> Result<Milestone, Error> {
        milestones::load_milestone(&env, milestone_id)
    }

    /// Per-token payout breakdown. For a paid milestone this returns the
    /// amounts actually paid; otherwise it is a dry-run preview at current
    /// escrow totals, so integrators can inspect amounts before approving.
    pub fn get_milestone_payout(env: Env, milestone_id: u64) -> Result<Vec<PayoutRecord>, Error> {
        let milestone = milestones::load_milestone(&env, milestone_id)?;
        if milestone.status == MilestoneStatus::Paid {
            return Ok(milestones::stored_payouts(&env, milestone_id));
        }
        let grant = grants::load_grant(&env, milestone.grant_id)?;
        milestones::compute_payouts(&env, &grant, &milestone)
    }

    pub fn get_grant_milestones(env: Env, grant_id: u64) -> Result<Vec<u64>, Error> {
        grants::load_grant(&env, grant_id)?;
        Ok(milestones::grant_milestones(&env, grant_id))
    }

    pub fn can_auto_approve_milestone(env: Env, milestone_id: u64) -> bool {
        match milestones::load_milestone(&env, milestone_id) {
            Ok(milestone) => milestones::can_auto_approve(&env, &milestone),
            Err(_) => false,
        }
    }

    pub fn get_grant_count(env: Env) -> u64 {
        grants::grant_count(&env)
    }

    pub fn get_milestone_count(env: Env) -> u64 {
        milestones::milestone_count(&env)
    }

    pub fn get_retained(env: Env, grant_id: u64, token: asset::AssetId) -> i128 {
        grants::retained(&env, grant_id, &token)
    }

    /// Recompute the accounting identity and the budget bound for a grant.
    /// Read-only; `false` means a stored record violates an invariant.
    pub fn verify_grant_accounting(env: Env, grant_id: u64) -> bool {
        let grant = match grants::load_grant(&env, grant_id) {
            Ok(g) => g,
            Err(_) => return false,
        };
        for token in grant.tokens.iter() {
            let escrow = grants::load_token_escrow(&env, grant_id, &token);
            if !invariants::verify_token_escrow(&escrow) {
                return false;
            }
        }
        invariants::verify_budget(milestones::active_percentage_total(&env, grant_id))
    }

    // ─── Internal ───

    fn require_initialized(env: &Env) -> Result<(), Error> {
        if !env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::NotInitialized);
        }
        Ok(())
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
        let admin: Address = env
            .storage()
            .instance()
            .get(&DataKey::Admin)
            .ok_or(Error::NotInitialized)?;
        if caller != &admin {
            return Err(Error::NotAuthorized);
        }
        Ok(())
    }

    fn check_token_lists(
        tokens: &Vec<asset::AssetId>,
        amounts: &Vec<i128>,
    ) -> Result<(), Error> {
        let len = tokens.len();
        if len == 0 || len != amounts.len() || len > MAX_GRANT_TOKENS {
            return Err(Error::TokenListMismatch);
        }
        for i in 0..len {
            let token = tokens.get_unchecked(i);
            asset::validate_asset_id(&token).map_err(|_| Error::InvalidAsset)?;
            for j in 0..i {
                if tokens.get_unchecked(j) == token {
                    return Err(Error::DuplicateToken);
                }
            }
            if amounts.get_unchecked(i) <= 0 {
                return Err(Error::InvalidAmount);
            }
        }
        Ok(())
    }

    /// Shared terminal transition for both approval paths: flips the
    /// milestone to Paid, moves each token's gross share from escrowed to
    /// released, parks penalty + fee in the retained counter, and pays the
    /// net amount to the grantee — all within one invocation, so a failed
    /// transfer reverts every part of it.
    fn payout(
        env: &Env,
        grant_id: u64,
        milestone_id: u64,
        approved_by: Option<Address>,
        message: Option<String>,
        auto_approved: bool,
    ) -> Result<(), Error> {
        reentrancy_guard::acquire(env);

        let mut grant = grants::load_grant(env, grant_id)?;
        if grant.status != GrantStatus::Active {
            return Err(Error::GrantNotActive);
        }
        let mut milestone = milestones::load_milestone(env, milestone_id)?;
        if milestone.grant_id != grant_id {
            return Err(Error::MilestoneNotFound);
        }
        if milestone.status != MilestoneStatus::Submitted {
            return Err(Error::InvalidState);
        }

        let payouts = milestones::compute_payouts(env, &grant, &milestone)?;

        // EFFECTS
        for record in payouts.iter() {
            let mut escrow = grants::load_token_escrow(env, grant_id, &record.token);
            escrow.released = escrow
                .released
                .checked_add(record.gross)
                .ok_or(Error::InvalidAmount)?;
            escrow.escrowed = escrow
                .escrowed
                .checked_sub(record.gross)
                .ok_or(Error::InsufficientFunds)?;
            if escrow.escrowed < 0 {
                return Err(Error::InsufficientFunds);
            }
            grants::save_token_escrow(env, grant_id, &record.token, &escrow);

            let held = grants::retained(env, grant_id, &record.token);
            grants::set_retained(env, grant_id, &record.token, held + record.penalty + record.fee);
        }

        let now = env.ledger().timestamp();
        milestone.status = MilestoneStatus::Paid;
        milestone.approved_by = approved_by;
        milestone.approval_message = message;
        milestone.auto_approved = auto_approved;
        milestones::save_milestone(env, &milestone);
        milestones::save_payouts(env, milestone_id, &payouts);

        // INTERACTION: grantee transfers last
        for record in payouts.iter() {
            if record.net > 0 {
                transfer::pay(env, &record.token, &grant.grantee, record.net)
                    .map_err(|_| Error::TransferFailed)?;
            }
        }

        emit_milestone_approved(
            env,
            MilestoneApproved {
                version: EVENT_VERSION,
                grant_id,
                milestone_id,
                auto_approved,
                payouts,
                timestamp: now,
            },
        );

        grants::mark_completed_if_done(env, &mut grant);

        reentrancy_guard::release(env);
        Ok(())
    }
}
