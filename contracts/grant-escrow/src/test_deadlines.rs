//! Deadline behavior: late penalties, the submission cutoff, and
//! auto-approval after the review window.

use crate::{
    EntityType, GrantEscrowContract, GrantEscrowContractClient, MilestoneStatus,
    LATE_SUBMISSION_WINDOW,
};
use soroban_sdk::{
    testutils::{Address as _, Ledger},
    token, vec, Address, BytesN, Env, String,
};

struct Setup<'a> {
    env: Env,
    admin: Address,
    funder: Address,
    grantee: Address,
    token: token::Client<'a>,
    client: GrantEscrowContractClient<'a>,
}

impl<'a> Setup<'a> {
    fn new() -> Self {
        let env = Env::default();
        env.mock_all_auths();

        let admin = Address::generate(&env);
        let funder = Address::generate(&env);
        let grantee = Address::generate(&env);

        let sac = env.register_stellar_asset_contract_v2(admin.clone());
        let token = token::Client::new(&env, &sac.address());
        token::StellarAssetClient::new(&env, &sac.address()).mint(&funder, &1_000_000);

        let contract_id = env.register_contract(None, GrantEscrowContract);
        let client = GrantEscrowContractClient::new(&env, &contract_id);
        client.init(&admin);

        Self {
            env,
            admin,
            funder,
            grantee,
            token,
            client,
        }
    }

    fn grant_with(&self, review_lock: u64, deadline: u64) -> u64 {
        self.client.create_grant(
            &self.funder,
            &self.grantee,
            &1u64,
            &EntityType::Campaign,
            &vec![&self.env, self.token.address.clone()],
            &vec![&self.env, 1_000i128],
            &3u32,
            &review_lock,
            &deadline,
        )
    }

    fn submit(&self, grant_id: u64, percentage: u32) -> u64 {
        self.client.submit_milestone(
            &grant_id,
            &self.grantee,
            &String::from_str(&self.env, "phase"),
            &String::from_str(&self.env, "work completed"),
            &BytesN::from_array(&self.env, &[3u8; 32]),
            &percentage,
        )
    }
}

// =============================================================================
// Late penalty boundaries
// =============================================================================

#[test]
fn test_submission_at_deadline_is_on_time() {
    let s = Setup::new();
    let grant_id = s.grant_with(100, 10_000);
    s.env.ledger().set_timestamp(10_000);
    let milestone_id = s.submit(grant_id, 50);
    assert_eq!(s.client.get_milestone(&milestone_id).penalty_percent, 0);
}

#[test]
fn test_submission_one_second_late_takes_penalty() {
    let s = Setup::new();
    let grant_id = s.grant_with(100, 10_000);
    s.env.ledger().set_timestamp(10_001);
    let milestone_id = s.submit(grant_id, 50);
    assert_eq!(s.client.get_milestone(&milestone_id).penalty_percent, 5);
}

#[test]
fn test_submission_at_cutoff_still_accepted() {
    let s = Setup::new();
    let grant_id = s.grant_with(100, 10_000);
    s.env.ledger().set_timestamp(10_000 + LATE_SUBMISSION_WINDOW);
    let milestone_id = s.submit(grant_id, 50);
    assert_eq!(s.client.get_milestone(&milestone_id).penalty_percent, 5);
}

#[test]
#[should_panic(expected = "Error(Contract, #9)")]
fn test_submission_past_cutoff_locked() {
    let s = Setup::new();
    let grant_id = s.grant_with(100, 10_000);
    s.env.ledger().set_timestamp(10_000 + LATE_SUBMISSION_WINDOW + 1);
    s.submit(grant_id, 50);
}

#[test]
fn test_zero_deadline_never_late() {
    let s = Setup::new();
    let grant_id = s.grant_with(100, 0);
    s.env.ledger().set_timestamp(100 * LATE_SUBMISSION_WINDOW);
    let milestone_id = s.submit(grant_id, 50);
    assert_eq!(s.client.get_milestone(&milestone_id).penalty_percent, 0);
}

#[test]
fn test_late_payout_math() {
    let s = Setup::new();
    let grant_id = s.grant_with(100, 10);
    s.env.ledger().set_timestamp(11);
    let milestone_id = s.submit(grant_id, 50);
    s.client.approve_milestone(
        &grant_id,
        &s.admin,
        &milestone_id,
        &String::from_str(&s.env, "late but fine"),
    );

    // gross 500, penalty 5% of 500 = 25, fee 3% of 475 = 14, net 461
    assert_eq!(s.token.balance(&s.grantee), 461);
    assert_eq!(s.client.get_retained(&grant_id, &s.token.address), 39);

    let entry = s.client.get_grant_token_amounts(&grant_id).get_unchecked(0);
    assert_eq!(entry.released, 500);
    assert_eq!(entry.escrowed, 500);

    let r = s.client.get_milestone_payout(&milestone_id).get_unchecked(0);
    assert_eq!(r.gross, 500);
    assert_eq!(r.penalty, 25);
    assert_eq!(r.fee, 14);
    assert_eq!(r.net, 461);
}

// =============================================================================
// Resubmission against the unchanged deadline
// =============================================================================

#[test]
fn test_resubmit_after_deadline_picks_up_penalty() {
    let s = Setup::new();
    let grant_id = s.grant_with(100, 10_000);

    s.env.ledger().set_timestamp(5_000);
    let milestone_id = s.submit(grant_id, 50);
    assert_eq!(s.client.get_milestone(&milestone_id).penalty_percent, 0);

    s.client.reject_milestone(
        &grant_id,
        &s.admin,
        &milestone_id,
        &String::from_str(&s.env, "redo"),
    );

    s.env.ledger().set_timestamp(10_500);
    s.client.resubmit_milestone(
        &grant_id,
        &s.grantee,
        &milestone_id,
        &BytesN::from_array(&s.env, &[4u8; 32]),
    );
    assert_eq!(s.client.get_milestone(&milestone_id).penalty_percent, 5);
}

#[test]
#[should_panic(expected = "Error(Contract, #9)")]
fn test_resubmit_past_cutoff_locked() {
    let s = Setup::new();
    let grant_id = s.grant_with(100, 10_000);

    s.env.ledger().set_timestamp(5_000);
    let milestone_id = s.submit(grant_id, 50);
    s.client.reject_milestone(
        &grant_id,
        &s.admin,
        &milestone_id,
        &String::from_str(&s.env, "redo"),
    );

    s.env.ledger().set_timestamp(10_000 + LATE_SUBMISSION_WINDOW + 1);
    s.client.resubmit_milestone(
        &grant_id,
        &s.grantee,
        &milestone_id,
        &BytesN::from_array(&s.env, &[4u8; 32]),
    );
}

// =============================================================================
// Auto-approval
// =============================================================================

#[test]
fn test_auto_approve_after_review_window() {
    let s = Setup::new();
    let grant_id = s.grant_with(5, 0);

    s.env.ledger().set_timestamp(1_000);
    let milestone_id = s.submit(grant_id, 50);
    assert_eq!(s.client.get_milestone(&milestone_id).review_deadline, 1_005);

    // Exactly at the deadline the window is still open.
    s.env.ledger().set_timestamp(1_005);
    assert!(!s.client.can_auto_approve_milestone(&milestone_id));

    s.env.ledger().set_timestamp(1_006);
    assert!(s.client.can_auto_approve_milestone(&milestone_id));
    s.client.check_and_auto_approve(&grant_id, &milestone_id);

    let m = s.client.get_milestone(&milestone_id);
    assert_eq!(m.status, MilestoneStatus::Paid);
    assert_eq!(m.approved_by, None);
    assert_eq!(m.approval_message, None);
    assert!(m.auto_approved);

    // Same payout math as a manual approval: gross 500, fee 15, net 485.
    assert_eq!(s.token.balance(&s.grantee), 485);
}

#[test]
#[should_panic(expected = "Error(Contract, #19)")]
fn test_auto_approve_while_window_open() {
    let s = Setup::new();
    let grant_id = s.grant_with(5, 0);
    s.env.ledger().set_timestamp(1_000);
    let milestone_id = s.submit(grant_id, 50);

    s.env.ledger().set_timestamp(1_005);
    s.client.check_and_auto_approve(&grant_id, &milestone_id);
}

#[test]
#[should_panic(expected = "Error(Contract, #12)")]
fn test_auto_approve_already_paid() {
    let s = Setup::new();
    let grant_id = s.grant_with(5, 0);
    let milestone_id = s.submit(grant_id, 50);
    s.client.approve_milestone(
        &grant_id,
        &s.admin,
        &milestone_id,
        &String::from_str(&s.env, "ok"),
    );

    s.env.ledger().set_timestamp(1_000);
    s.client.check_and_auto_approve(&grant_id, &milestone_id);
}

#[test]
#[should_panic(expected = "Error(Contract, #12)")]
fn test_auto_approve_rejected_milestone() {
    let s = Setup::new();
    let grant_id = s.grant_with(5, 0);
    let milestone_id = s.submit(grant_id, 50);
    s.client.reject_milestone(
        &grant_id,
        &s.admin,
        &milestone_id,
        &String::from_str(&s.env, "no"),
    );

    s.env.ledger().set_timestamp(1_000);
    s.client.check_and_auto_approve(&grant_id, &milestone_id);
}

#[test]
fn test_can_auto_approve_unknown_milestone_is_false() {
    let s = Setup::new();
    assert!(!s.client.can_auto_approve_milestone(&404u64));
}

#[test]
fn test_rejection_resets_review_window() {
    let s = Setup::new();
    let grant_id = s.grant_with(5, 0);

    s.env.ledger().set_timestamp(1_000);
    let milestone_id = s.submit(grant_id, 50);
    s.client.reject_milestone(
        &grant_id,
        &s.admin,
        &milestone_id,
        &String::from_str(&s.env, "redo"),
    );

    s.env.ledger().set_timestamp(2_000);
    s.client.resubmit_milestone(
        &grant_id,
        &s.grantee,
        &milestone_id,
        &BytesN::from_array(&s.env, &[5u8; 32]),
    );
    assert_eq!(s.client.get_milestone(&milestone_id).review_deadline, 2_005);

    // The old window (1_005) has long passed but the fresh one is open.
    assert!(!s.client.can_auto_approve_milestone(&milestone_id));
}
