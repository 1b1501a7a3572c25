//! Data structures held by the reserves manager.

use soroban_sdk::{contracttype, Address, BytesN};

/// An active reserve: the manager custodies the NFT and the buyer's
/// collateral for the life of this record. Keyed by the hash over
/// `{collection, token_id, seller, buyer}`.
///
/// `collateral_amount` is a running balance: it starts at
/// `price * collateral_percent / 10000` and moves with every
/// increase/decrease. `paid` is monotonic, false to true only.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Reserve {
    pub collection: Address,
    pub token_id: u32,
    pub payment_token: Address,
    pub price: i128,
    pub collateral_percent: u32,
    pub seller: Address,
    pub buyer: Address,
    pub start_timestamp: u64,
    pub reserve_period: u64,
    pub collateral_amount: i128,
    pub paid: bool,
}

/// Settlement view of a reserve: the collateral currently held and the
/// payment owed to the seller (zero until the price is paid).
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReserveAmounts {
    pub collateral: i128,
    pub payment: i128,
}

#[contracttype]
pub enum DataKey {
    Owner,
    Marketplace,
    ProtocolParameters,
    Reserve(BytesN<32>),
}
