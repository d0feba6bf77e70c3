//! Accounting-identity checks across operation sequences.

use crate::{EntityType, GrantEscrowContract, GrantEscrowContractClient, GrantStatus};
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

    fn grant(&self, amount: i128, fee: u32) -> u64 {
        self.client.create_grant(
            &self.funder,
            &self.grantee,
            &1u64,
            &EntityType::Project,
            &vec![&self.env, self.token.address.clone()],
            &vec![&self.env, amount],
            &fee,
            &86_400u64,
            &0u64,
        )
    }

    fn submit(&self, grant_id: u64, percentage: u32) -> u64 {
        self.client.submit_milestone(
            &grant_id,
            &self.grantee,
            &String::from_str(&self.env, "phase"),
            &String::from_str(&self.env, "work completed"),
            &BytesN::from_array(&self.env, &[8u8; 32]),
            &percentage,
        )
    }

    fn approve(&self, grant_id: u64, milestone_id: u64) {
        self.client.approve_milestone(
            &grant_id,
            &self.admin,
            &milestone_id,
            &String::from_str(&self.env, "ok"),
        );
    }

    fn assert_identity(&self, grant_id: u64) {
        assert!(self.client.verify_grant_accounting(&grant_id));
        for entry in self.client.get_grant_token_amounts(&grant_id).iter() {
            assert_eq!(entry.total, entry.released + entry.escrowed);
        }
    }
}

#[test]
fn test_identity_holds_across_full_lifecycle() {
    let s = Setup::new();
    let grant_id = s.grant(1_000, 1);
    s.assert_identity(grant_id);

    s.client.add_funds(
        &grant_id,
        &s.funder,
        &vec![&s.env, s.token.address.clone()],
        &vec![&s.env, 500i128],
    );
    s.assert_identity(grant_id);

    s.client.withdraw_funds(
        &grant_id,
        &s.funder,
        &s.token.address,
        &300i128,
        &s.funder,
    );
    s.assert_identity(grant_id);

    let first = s.submit(grant_id, 40);
    s.assert_identity(grant_id);
    s.approve(grant_id, first);
    s.assert_identity(grant_id);

    let second = s.submit(grant_id, 30);
    s.client.reject_milestone(
        &grant_id,
        &s.admin,
        &second,
        &String::from_str(&s.env, "redo"),
    );
    s.assert_identity(grant_id);

    s.client.resubmit_milestone(
        &grant_id,
        &s.grantee,
        &second,
        &BytesN::from_array(&s.env, &[9u8; 32]),
    );
    s.approve(grant_id, second);
    s.assert_identity(grant_id);

    s.client
        .cancel_grant(&grant_id, &s.funder, &s.funder);
    s.assert_identity(grant_id);
}

#[test]
fn test_no_funds_leak_or_mint() {
    let s = Setup::new();
    let grant_id = s.grant(1_000, 3);

    let first = s.submit(grant_id, 50);
    s.approve(grant_id, first);
    let second = s.submit(grant_id, 50);
    s.approve(grant_id, second);

    // Every unit is either with the grantee or retained in the contract.
    let grantee = s.token.balance(&s.grantee);
    let retained = s.client.get_retained(&grant_id, &s.token.address);
    assert_eq!(grantee + retained, 1_000);
    assert_eq!(s.token.balance(&s.client.address), retained);
    s.assert_identity(grant_id);
}

#[test]
fn test_dust_percentages_complete_cleanly() {
    let s = Setup::new();
    let grant_id = s.grant(1_000, 1);

    for _ in 0..3 {
        let id = s.submit(grant_id, 33);
        s.approve(grant_id, id);
        s.assert_identity(grant_id);
    }
    // 99% paid: still active.
    assert_eq!(s.client.get_grant(&grant_id).status, GrantStatus::Active);

    let last = s.submit(grant_id, 1);
    s.approve(grant_id, last);

    // gross per 33% milestone: 330 (fee 3, net 327); final 1%: 10 (fee 0)
    let grant = s.client.get_grant(&grant_id);
    assert_eq!(grant.status, GrantStatus::Completed);
    let entry = s.client.get_grant_token_amounts(&grant_id).get_unchecked(0);
    assert_eq!(entry.released, 1_000);
    assert_eq!(entry.escrowed, 0);
    assert_eq!(s.token.balance(&s.grantee), 3 * 327 + 10);
    s.assert_identity(grant_id);
}

#[test]
#[should_panic(expected = "Error(Contract, #12)")]
fn test_manual_then_auto_cannot_double_pay() {
    let s = Setup::new();
    let grant_id = s.grant(1_000, 3);
    let milestone_id = s.submit(grant_id, 50);
    s.approve(grant_id, milestone_id);

    // Window elapsed, but the milestone already left Submitted.
    s.env.ledger().set_timestamp(100_000);
    s.client.check_and_auto_approve(&grant_id, &milestone_id);
}

#[test]
fn test_verify_accounting_false_for_unknown_grant() {
    let s = Setup::new();
    assert!(!s.client.verify_grant_accounting(&404u64));
}
