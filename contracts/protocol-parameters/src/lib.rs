/*!
 * Protocol Parameters Registry
 *
 * Holds the protocol-wide tunables consulted by the reserve marketplace and
 * the reserves manager: the minimum reserve period, the seller/buyer cancel
 * fee percents and the buyer purchase grace period. Every field sits behind a
 * governance-gated setter that validates its value and emits an
 * `<Field>Updated{from, to}` event, so off-chain indexers always see the prior
 * value alongside the new one.
 *
 * The registry is created through `initialize` rather than a constructor and
 * exposes an owner-gated `upgrade_to` hook, mirroring the upgradeable-proxy
 * deployment convention of the rest of the protocol.
 */

#![no_std]

#[cfg(test)]
mod test;

use soroban_sdk::{contract, contractimpl, contracttype, Address, BytesN, Env, Symbol};

#[contract]
pub struct ProtocolParameters;

#[contracttype]
pub enum DataKey {
    Owner,
    Governance,
    MinimumReservePeriod,
    SellerCancelFeePercent,
    BuyerCancelFeePercent,
    BuyerPurchaseGracePeriod,
}

#[contractimpl]
impl ProtocolParameters {
    /// Sets every protocol parameter plus the governance and owner addresses.
    /// Callable exactly once.
    ///
    /// # Arguments
    /// * `owner` - address allowed to swap the implementation (`upgrade_to`)
    /// * `minimum_reserve_period` - lower bound for reserve periods, seconds, > 0
    /// * `seller_cancel_fee_percent` / `buyer_cancel_fee_percent` - whole
    ///   percents charged on reserve cancellation, valid range [0, 100)
    /// * `buyer_purchase_grace_period` - extra window granted to the buyer
    ///   after a reserve expires, seconds, may be zero
    /// * `governance` - address allowed to mutate the parameters
    pub fn initialize(
        env: Env,
        owner: Address,
        minimum_reserve_period: u64,
        seller_cancel_fee_percent: u32,
        buyer_cancel_fee_percent: u32,
        buyer_purchase_grace_period: u64,
        governance: Address,
    ) {
        if env.storage().instance().has(&DataKey::Owner) {
            panic!("Contract already initialized");
        }
        if minimum_reserve_period == 0 {
            panic!("Invalid minimum reserve period");
        }
        if seller_cancel_fee_percent >= 100 {
            panic!("Invalid seller cancel fee percent");
        }
        if buyer_cancel_fee_percent >= 100 {
            panic!("Invalid buyer cancel fee percent");
        }

        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::Governance, &governance);
        env.storage().instance().set(&DataKey::MinimumReservePeriod, &minimum_reserve_period);
        env.storage().instance().set(&DataKey::SellerCancelFeePercent, &seller_cancel_fee_percent);
        env.storage().instance().set(&DataKey::BuyerCancelFeePercent, &buyer_cancel_fee_percent);
        env.storage().instance().set(&DataKey::BuyerPurchaseGracePeriod, &buyer_purchase_grace_period);
    }

    /// Updates the minimum reserve period. Governance only, value must be > 0.
    /// Emits `MinimumReservePeriodUpdated{from, to}` even when unchanged.
    pub fn set_minimum_reserve_period(env: Env, caller: Address, value: u64) {
        Self::require_governance(&env, &caller);
        if value == 0 {
            panic!("Invalid minimum reserve period");
        }

        let previous: u64 = env.storage().instance().get(&DataKey::MinimumReservePeriod).unwrap();
        env.storage().instance().set(&DataKey::MinimumReservePeriod, &value);

        env.events().publish(
            (Symbol::new(&env, "MinimumReservePeriodUpdated"),),
            (previous, value),
        );
    }

    /// Updates the fee percent charged when the seller cancels a reserve.
    /// Governance only, valid range [0, 100).
    pub fn set_seller_cancel_fee_percent(env: Env, caller: Address, value: u32) {
        Self::require_governance(&env, &caller);
        if value >= 100 {
            panic!("Invalid seller cancel fee percent");
        }

        let previous: u32 = env.storage().instance().get(&DataKey::SellerCancelFeePercent).unwrap();
        env.storage().instance().set(&DataKey::SellerCancelFeePercent, &value);

        env.events().publish(
            (Symbol::new(&env, "SellerCancelFeePercentUpdated"),),
            (previous, value),
        );
    }

    /// Updates the fee percent charged when the buyer cancels a reserve.
    /// Governance only, valid range [0, 100).
    pub fn set_buyer_cancel_fee_percent(env: Env, caller: Address, value: u32) {
        Self::require_governance(&env, &caller);
        if value >= 100 {
            panic!("Invalid buyer cancel fee percent");
        }

        let previous: u32 = env.storage().instance().get(&DataKey::BuyerCancelFeePercent).unwrap();
        env.storage().instance().set(&DataKey::BuyerCancelFeePercent, &value);

        env.events().publish(
            (Symbol::new(&env, "BuyerCancelFeePercentUpdated"),),
            (previous, value),
        );
    }

    /// Updates the buyer purchase grace period. Governance only, zero allowed.
    pub fn set_buyer_purchase_grace_period(env: Env, caller: Address, value: u64) {
        Self::require_governance(&env, &caller);

        let previous: u64 = env.storage().instance().get(&DataKey::BuyerPurchaseGracePeriod).unwrap();
        env.storage().instance().set(&DataKey::BuyerPurchaseGracePeriod, &value);

        env.events().publish(
            (Symbol::new(&env, "BuyerPurchaseGracePeriodUpdated"),),
            (previous, value),
        );
    }

    pub fn minimum_reserve_period(env: Env) -> u64 {
        env.storage().instance().get(&DataKey::MinimumReservePeriod).unwrap()
    }

    pub fn seller_cancel_fee_percent(env: Env) -> u32 {
        env.storage().instance().get(&DataKey::SellerCancelFeePercent).unwrap()
    }

    pub fn buyer_cancel_fee_percent(env: Env) -> u32 {
        env.storage().instance().get(&DataKey::BuyerCancelFeePercent).unwrap()
    }

    pub fn buyer_purchase_grace_period(env: Env) -> u64 {
        env.storage().instance().get(&DataKey::BuyerPurchaseGracePeriod).unwrap()
    }

    pub fn governance(env: Env) -> Address {
        env.storage().instance().get(&DataKey::Governance).unwrap()
    }

    pub fn owner(env: Env) -> Address {
        env.storage().instance().get(&DataKey::Owner).unwrap()
    }

    /// Swaps the running implementation. Owner only.
    /// Emits `Upgraded{implementation}`.
    pub fn upgrade_to(env: Env, caller: Address, wasm_hash: BytesN<32>) {
        caller.require_auth();

        let owner: Address = env.storage().instance().get(&DataKey::Owner).unwrap();
        if caller != owner {
            panic!("caller is not the owner");
        }

        env.events().publish((Symbol::new(&env, "Upgraded"),), wasm_hash.clone());
        env.deployer().update_current_contract_wasm(wasm_hash);
    }

    fn require_governance(env: &Env, caller: &Address) {
        caller.require_auth();

        let governance: Address = env.storage().instance().get(&DataKey::Governance).unwrap();
        if *caller != governance {
            panic!("Only governance allowed");
        }
    }
}
