use crate::types::{EntityType, PayoutRecord};
use grant_core::asset::AssetId;
use soroban_sdk::{contracttype, symbol_short, Address, Env, Vec};

pub const EVENT_VERSION: u32 = 1;

#[contracttype]
#[derive(Clone, Debug)]
pub struct GrantCreated {
    pub version: u32,
    pub grant_id: u64,
    pub funder: Address,
    pub grantee: Address,
    pub linked_entity_id: u64,
    pub entity_type: EntityType,
    pub timestamp: u64,
}

pub fn emit_grant_created(env: &Env, event: GrantCreated) {
    let topics = (symbol_short!("g_new"), event.grant_id);
    env.events().publish(topics, event.clone());
}

/// Emitted once per token on `add_funds`.
#[contracttype]
#[derive(Clone, Debug)]
pub struct FundsAdded {
    pub version: u32,
    pub grant_id: u64,
    pub token: AssetId,
    pub amount: i128,
    pub new_total: i128,
    pub timestamp: u64,
}

pub fn emit_funds_added(env: &Env, event: FundsAdded) {
    let topics = (symbol_short!("g_fund"), event.grant_id);
    env.events().publish(topics, event.clone());
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct FundsWithdrawn {
    pub version: u32,
    pub grant_id: u64,
    pub token: AssetId,
    pub amount: i128,
    pub recipient: Address,
    pub timestamp: u64,
}

pub fn emit_funds_withdrawn(env: &Env, event: FundsWithdrawn) {
    let topics = (symbol_short!("g_wtd"), event.grant_id);
    env.events().publish(topics, event.clone());
}

/// One refunded token within a `GrantCancelled` event.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TokenRefund {
    pub token: AssetId,
    pub amount: i128,
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct GrantCancelled {
    pub version: u32,
    pub grant_id: u64,
    pub refund_recipient: Address,
    pub refunds: Vec<TokenRefund>,
    pub timestamp: u64,
}

pub fn emit_grant_cancelled(env: &Env, event: GrantCancelled) {
    let topics = (symbol_short!("g_cancel"), event.grant_id);
    env.events().publish(topics, event.clone());
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct MilestoneSubmitted {
    pub version: u32,
    pub grant_id: u64,
    pub milestone_id: u64,
    pub percentage: u32,
    pub penalty_percent: u32,
    pub review_deadline: u64,
    pub timestamp: u64,
}

pub fn emit_milestone_submitted(env: &Env, event: MilestoneSubmitted) {
    let topics = (symbol_short!("m_sub"), event.milestone_id);
    env.events().publish(topics, event.clone());
}

/// Emitted alongside `MilestoneSubmitted`/`MilestoneResubmitted` when the
/// submission landed inside the late window.
#[contracttype]
#[derive(Clone, Debug)]
pub struct MilestonePenaltyApplied {
    pub version: u32,
    pub grant_id: u64,
    pub milestone_id: u64,
    pub penalty_percent: u32,
    pub submitted_at: u64,
    pub milestone_deadline: u64,
}

pub fn emit_milestone_penalty_applied(env: &Env, event: MilestonePenaltyApplied) {
    let topics = (symbol_short!("m_pen"), event.milestone_id);
    env.events().publish(topics, event.clone());
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct MilestoneRejected {
    pub version: u32,
    pub grant_id: u64,
    pub milestone_id: u64,
    pub rejected_by: Address,
    pub timestamp: u64,
}

pub fn emit_milestone_rejected(env: &Env, event: MilestoneRejected) {
    let topics = (symbol_short!("m_rej"), event.milestone_id);
    env.events().publish(topics, event.clone());
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct MilestoneResubmitted {
    pub version: u32,
    pub grant_id: u64,
    pub milestone_id: u64,
    pub penalty_percent: u32,
    pub review_deadline: u64,
    pub timestamp: u64,
}

pub fn emit_milestone_resubmitted(env: &Env, event: MilestoneResubmitted) {
    let topics = (symbol_short!("m_resub"), event.milestone_id);
    env.events().publish(topics, event.clone());
}

/// Approval and payout are one atomic transition, so this event carries the
/// full per-token breakdown of what was paid.
#[contracttype]
#[derive(Clone, Debug)]
pub struct MilestoneApproved {
    pub version: u32,
    pub grant_id: u64,
    pub milestone_id: u64,
    pub auto_approved: bool,
    pub payouts: Vec<PayoutRecord>,
    pub timestamp: u64,
}

pub fn emit_milestone_approved(env: &Env, event: MilestoneApproved) {
    let topics = (symbol_short!("m_appr"), event.milestone_id);
    env.events().publish(topics, event.clone());
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct GrantCompleted {
    pub version: u32,
    pub grant_id: u64,
    pub completed_at: u64,
}

pub fn emit_grant_completed(env: &Env, event: GrantCompleted) {
    let topics = (symbol_short!("g_done"), event.grant_id);
    env.events().publish(topics, event.clone());
}

#[contracttype]
#[derive(Clone, Debug)]
pub struct RetainedSwept {
    pub version: u32,
    pub grant_id: u64,
    pub token: AssetId,
    pub amount: i128,
    pub recipient: Address,
    pub timestamp: u64,
}

pub fn emit_retained_swept(env: &Env, event: RetainedSwept) {
    let topics = (symbol_short!("swept"), event.grant_id);
    env.events().publish(topics, event.clone());
}
