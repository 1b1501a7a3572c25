//! Client interfaces for the manager's fixed collaborators.

use soroban_sdk::{contractclient, Address, Env};

/// The slice of the parameter registry the manager consults when resolving
/// reserves.
// only the generated clients are referenced, the traits themselves are not
#[allow(dead_code)]
#[contractclient(name = "ProtocolParametersClient")]
pub trait ProtocolParametersInterface {
    fn seller_cancel_fee_percent(env: Env) -> u32;
    fn buyer_cancel_fee_percent(env: Env) -> u32;
    fn buyer_purchase_grace_period(env: Env) -> u64;
}

/// NFT collection surface used for custody. `transfer_from` relies on the
/// approval the seller grants the manager before matching.
#[allow(dead_code)]
#[contractclient(name = "CollectionClient")]
pub trait CollectionInterface {
    fn transfer(env: Env, from: Address, to: Address, token_id: u32);
    fn transfer_from(env: Env, spender: Address, from: Address, to: Address, token_id: u32);
}
