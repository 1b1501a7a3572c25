//! Client interfaces for the marketplace's fixed collaborators.

use soroban_sdk::{contractclient, Address, BytesN, Env};

// only the generated clients are referenced, the traits themselves are not
#[allow(dead_code)]
#[contractclient(name = "ProtocolParametersClient")]
pub trait ProtocolParametersInterface {
    fn minimum_reserve_period(env: Env) -> u64;
}

/// NFT collection surface the marketplace consults: ownership for the
/// sell-side precondition, approval state for match readiness.
#[allow(dead_code)]
#[contractclient(name = "CollectionClient")]
pub trait CollectionInterface {
    fn owner_of(env: Env, token_id: u32) -> Address;
    fn get_approved(env: Env, token_id: u32) -> Option<Address>;
}

/// The custody handoff into the reserves manager. Called with the
/// marketplace's own address as `caller`; the manager rejects anyone else.
#[allow(dead_code)]
#[contractclient(name = "ReservesManagerClient")]
pub trait ReservesManagerInterface {
    fn start_reserve(
        env: Env,
        caller: Address,
        collection: Address,
        token_id: u32,
        payment_token: Address,
        price: i128,
        collateral_percent: u32,
        reserve_period: u64,
        seller: Address,
        buyer: Address,
    ) -> BytesN<32>;
}
