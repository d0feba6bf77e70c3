// Per-token escrow balances are stored under DataKey::TokenEscrow(grant_id, token)
// instead of inside the Grant struct, so the Grant record stays a fixed size
// and a payout only rewrites the balances it touches.

use grant_core::asset::AssetId;
use soroban_sdk::{contracttype, Address, BytesN, String, Vec};

/// Kind of external entity a grant is tied to. The registry itself is not
/// consulted; the reference is stored opaquely.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum EntityType {
    Project,
    Campaign,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum GrantStatus {
    /// Accepting funds and milestone submissions.
    Active,
    /// Paid milestone percentages reached exactly 100.
    Completed,
    /// Cancelled by the funder; remaining escrow refunded.
    Cancelled,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum MilestoneStatus {
    /// Awaiting review. The only state funds can be released from.
    Submitted,
    /// Rejected by the admin; the grantee may resubmit.
    Rejected,
    /// Approved and paid out. Terminal.
    Paid,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Grant {
    pub id: u64,
    /// Deposited the escrow; may add/withdraw funds and cancel.
    pub funder: Address,
    /// Only address allowed to submit milestones.
    pub grantee: Address,
    /// Opaque reference into the external project/campaign registry.
    pub linked_entity_id: u64,
    pub entity_type: EntityType,
    /// Whole-percent fee (1–5) retained from every payout. Immutable.
    pub site_fee_percent: u32,
    /// Seconds the admin has to review a submission before anyone may
    /// trigger auto-approval.
    pub review_time_lock: u64,
    /// Absolute ledger timestamp milestones are due by. 0 disables deadline
    /// enforcement entirely.
    pub milestone_deadline: u64,
    pub status: GrantStatus,
    pub created_at: u64,
    /// 0 until the grant completes.
    pub completed_at: u64,
    /// Supported tokens, fixed at creation. 1–10 entries, no duplicates.
    pub tokens: Vec<AssetId>,
}

/// Escrow accounting for one (grant, token) pair.
///
/// `total == released + escrowed` after every operation.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenEscrow {
    pub total: i128,
    pub released: i128,
    pub escrowed: i128,
}

/// Balance view returned by `get_grant_token_amounts`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GrantTokenAmount {
    pub token: AssetId,
    pub total: i128,
    pub released: i128,
    pub escrowed: i128,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Milestone {
    pub id: u64,
    pub grant_id: u64,
    pub title: String,
    pub description: String,
    /// Opaque content reference; replaced on resubmission.
    pub evidence_hash: BytesN<32>,
    /// Share of the grant's total value, 1–100.
    pub percentage: u32,
    pub status: MilestoneStatus,
    pub submitted_at: u64,
    /// `submitted_at + review_time_lock`; auto-approval opens strictly after.
    pub review_deadline: u64,
    /// `None` for auto-approved milestones.
    pub approved_by: Option<Address>,
    pub approval_message: Option<String>,
    pub rejected_by: Option<Address>,
    pub rejection_reason: Option<String>,
    pub auto_approved: bool,
    /// 0 or 5; frozen at submission time for that submission.
    pub penalty_percent: u32,
}

/// One token's payout breakdown for a paid milestone.
///
/// `gross == penalty + fee + net`; `released` is advanced by `gross`, the
/// grantee receives `net`, and `penalty + fee` moves to the retained counter.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PayoutRecord {
    pub token: AssetId,
    pub gross: i128,
    pub penalty: i128,
    pub fee: i128,
    pub net: i128,
}

#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    /// Monotonic counter; equals the number of grants ever created.
    GrantCount,
    /// Monotonic counter; equals the number of milestones ever created.
    MilestoneCount,
    Grant(u64),
    /// (grant_id, token) -> TokenEscrow
    TokenEscrow(u64, AssetId),
    /// grant_id -> Vec<u64>, ordered milestone ids (the owning collection)
    GrantMilestones(u64),
    Milestone(u64),
    /// milestone_id -> Vec<PayoutRecord>, written once at payout
    MilestonePayout(u64),
    /// (grant_id, token) -> i128 fees + penalties held pending sweep
    Retained(u64, AssetId),
    ReentrancyGuard,
}
