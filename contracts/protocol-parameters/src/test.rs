#![cfg(test)]

use super::*;
use soroban_sdk::{
    testutils::{Address as _, Events},
    vec, Address, BytesN, Env, IntoVal,
};

// Default deployment parameters: 5 minute minimum period, 5% cancel fees,
// no purchase grace period.
const MINIMUM_RESERVE_PERIOD: u64 = 300;
const SELLER_CANCEL_FEE_PERCENT: u32 = 5;
const BUYER_CANCEL_FEE_PERCENT: u32 = 5;
const BUYER_PURCHASE_GRACE_PERIOD: u64 = 0;

fn setup() -> (Env, ProtocolParametersClient<'static>, Address, Address) {
    let env = Env::default();
    env.mock_all_auths();

    let contract_id = env.register(ProtocolParameters, ());
    let client = ProtocolParametersClient::new(&env, &contract_id);

    let owner = Address::generate(&env);
    let governance = Address::generate(&env);

    client.initialize(
        &owner,
        &MINIMUM_RESERVE_PERIOD,
        &SELLER_CANCEL_FEE_PERCENT,
        &BUYER_CANCEL_FEE_PERCENT,
        &BUYER_PURCHASE_GRACE_PERIOD,
        &governance,
    );

    (env, client, owner, governance)
}

#[test]
fn test_initialize() {
    let (_, client, owner, governance) = setup();

    assert_eq!(client.minimum_reserve_period(), MINIMUM_RESERVE_PERIOD);
    assert_eq!(client.seller_cancel_fee_percent(), SELLER_CANCEL_FEE_PERCENT);
    assert_eq!(client.buyer_cancel_fee_percent(), BUYER_CANCEL_FEE_PERCENT);
    assert_eq!(client.buyer_purchase_grace_period(), BUYER_PURCHASE_GRACE_PERIOD);
    assert_eq!(client.governance(), governance);
    assert_eq!(client.owner(), owner);
}

#[test]
#[should_panic(expected = "Contract already initialized")]
fn test_initialize_twice() {
    let (_, client, owner, governance) = setup();
    client.initialize(&owner, &MINIMUM_RESERVE_PERIOD, &5, &5, &0, &governance);
}

#[test]
#[should_panic(expected = "Invalid minimum reserve period")]
fn test_initialize_zero_minimum_reserve_period() {
    let env = Env::default();
    env.mock_all_auths();

    let contract_id = env.register(ProtocolParameters, ());
    let client = ProtocolParametersClient::new(&env, &contract_id);

    let owner = Address::generate(&env);
    let governance = Address::generate(&env);
    client.initialize(&owner, &0, &5, &5, &0, &governance);
}

#[test]
#[should_panic(expected = "Invalid seller cancel fee percent")]
fn test_initialize_seller_fee_too_high() {
    let env = Env::default();
    env.mock_all_auths();

    let contract_id = env.register(ProtocolParameters, ());
    let client = ProtocolParametersClient::new(&env, &contract_id);

    let owner = Address::generate(&env);
    let governance = Address::generate(&env);
    client.initialize(&owner, &300, &100, &5, &0, &governance);
}

#[test]
#[should_panic(expected = "Invalid buyer cancel fee percent")]
fn test_initialize_buyer_fee_too_high() {
    let env = Env::default();
    env.mock_all_auths();

    let contract_id = env.register(ProtocolParameters, ());
    let client = ProtocolParametersClient::new(&env, &contract_id);

    let owner = Address::generate(&env);
    let governance = Address::generate(&env);
    client.initialize(&owner, &300, &5, &100, &0, &governance);
}

#[test]
fn test_setters_store_last_applied_value() {
    let (_, client, _, governance) = setup();

    client.set_minimum_reserve_period(&governance, &600);
    assert_eq!(client.minimum_reserve_period(), 600);

    client.set_minimum_reserve_period(&governance, &900);
    assert_eq!(client.minimum_reserve_period(), 900);

    client.set_seller_cancel_fee_percent(&governance, &7);
    assert_eq!(client.seller_cancel_fee_percent(), 7);

    client.set_buyer_cancel_fee_percent(&governance, &9);
    assert_eq!(client.buyer_cancel_fee_percent(), 9);

    client.set_buyer_purchase_grace_period(&governance, &3600);
    assert_eq!(client.buyer_purchase_grace_period(), 3600);
}

#[test]
fn test_setter_idempotent_in_effect() {
    let (_, client, _, governance) = setup();

    // re-applying the current value still succeeds (and still emits)
    client.set_seller_cancel_fee_percent(&governance, &SELLER_CANCEL_FEE_PERCENT);
    assert_eq!(client.seller_cancel_fee_percent(), SELLER_CANCEL_FEE_PERCENT);
}

#[test]
fn test_setter_event_carries_previous_value() {
    let (env, client, _, governance) = setup();

    client.set_minimum_reserve_period(&governance, &600);
    assert_eq!(
        env.events().all(),
        vec![
            &env,
            (
                client.address.clone(),
                (Symbol::new(&env, "MinimumReservePeriodUpdated"),).into_val(&env),
                (MINIMUM_RESERVE_PERIOD, 600u64).into_val(&env),
            ),
        ]
    );

    // the next update reports the last applied value as the previous one
    client.set_minimum_reserve_period(&governance, &900);
    assert_eq!(
        env.events().all(),
        vec![
            &env,
            (
                client.address.clone(),
                (Symbol::new(&env, "MinimumReservePeriodUpdated"),).into_val(&env),
                (600u64, 900u64).into_val(&env),
            ),
        ]
    );
}

#[test]
fn test_setter_emits_even_when_value_unchanged() {
    let (env, client, _, governance) = setup();

    client.set_seller_cancel_fee_percent(&governance, &SELLER_CANCEL_FEE_PERCENT);
    assert_eq!(
        env.events().all(),
        vec![
            &env,
            (
                client.address.clone(),
                (Symbol::new(&env, "SellerCancelFeePercentUpdated"),).into_val(&env),
                (SELLER_CANCEL_FEE_PERCENT, SELLER_CANCEL_FEE_PERCENT).into_val(&env),
            ),
        ]
    );
}

#[test]
#[should_panic(expected = "Only governance allowed")]
fn test_setter_requires_governance() {
    let (env, client, _, _) = setup();
    let outsider = Address::generate(&env);
    client.set_minimum_reserve_period(&outsider, &600);
}

#[test]
#[should_panic(expected = "Invalid minimum reserve period")]
fn test_set_minimum_reserve_period_zero() {
    let (_, client, _, governance) = setup();
    client.set_minimum_reserve_period(&governance, &0);
}

#[test]
#[should_panic(expected = "Invalid seller cancel fee percent")]
fn test_set_seller_fee_out_of_range() {
    let (_, client, _, governance) = setup();
    client.set_seller_cancel_fee_percent(&governance, &100);
}

#[test]
#[should_panic(expected = "Invalid buyer cancel fee percent")]
fn test_set_buyer_fee_out_of_range() {
    let (_, client, _, governance) = setup();
    client.set_buyer_cancel_fee_percent(&governance, &150);
}

#[test]
#[should_panic(expected = "caller is not the owner")]
fn test_upgrade_requires_owner() {
    let (env, client, _, governance) = setup();
    let wasm_hash = BytesN::from_array(&env, &[0u8; 32]);
    // governance is not the upgrade owner
    client.upgrade_to(&governance, &wasm_hash);
}
