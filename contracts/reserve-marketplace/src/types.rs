//! Data structures held by the reserve marketplace.
//!
//! Proposals are identified by the hash over their [`ReserveTerms`] plus the
//! intended counterparty (see `lib.rs`), deliberately excluding the
//! expiration timestamp: two proposals with identical terms collide, which is
//! what makes the hash the matching key.

use soroban_sdk::{contracttype, Address, BytesN};

/// The economic terms of a reserve, shared verbatim by both proposal sides
/// and by the identity hash.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReserveTerms {
    pub collection: Address,
    pub token_id: u32,
    pub payment_token: Address,
    pub collateral_token: Address,
    pub price: i128,
    /// Basis points of `price` the buyer must post as collateral.
    pub collateral_percent: u32,
    /// Seconds the reserve stays open once matched.
    pub reserve_period: u64,
}

/// One-sided intent to reserve, recorded by the token owner pending a
/// matching purchase proposal.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SaleReserveProposal {
    pub terms: ReserveTerms,
    /// The token owner who submitted the proposal.
    pub owner: Address,
    /// Receiver of the sale proceeds, may differ from `owner`.
    pub beneficiary: Address,
    /// Submission time plus the caller-supplied validity window. Not part of
    /// the identity hash.
    pub expiration_timestamp: u64,
}

/// Buy-side mirror of `SaleReserveProposal`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PurchaseReserveProposal {
    pub terms: ReserveTerms,
    pub buyer: Address,
    pub beneficiary: Address,
    pub expiration_timestamp: u64,
}

#[contracttype]
pub enum DataKey {
    Owner,
    ProtocolParameters,
    ReservesManager,
    SaleProposal(BytesN<32>),
    PurchaseProposal(BytesN<32>),
}
