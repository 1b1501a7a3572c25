/*!
 * NFT Collection Contract
 *
 * A minimal non-fungible collection with sequential token ids. The reserve
 * marketplace consults `owner_of`/`get_approved` and the reserves manager
 * takes custody through `transfer_from`, so the contract exposes the same
 * approve/transfer surface a fungible token does, adapted to unique tokens.
 *
 * Failure reasons are human-readable panic strings so they propagate verbatim
 * through the contracts that consult this one.
 */

#![no_std]


use soroban_sdk::{contract, contracttype, contractimpl, Address, Env, String, Symbol, symbol_short};

#[contract]
pub struct NftCollection;

#[contracttype]
pub enum DataKey {
    Admin,
    Name,
    Symbol,
    NextTokenId,
    Owner(u32),
    Approved(u32),
    Balance(Address),
}

const MINT: Symbol = symbol_short!("mint");
const TRANSFER: Symbol = symbol_short!("transfer");
const APPROVE: Symbol = symbol_short!("approve");

#[contractimpl]
impl NftCollection {
    /// Sets up the collection metadata and the admin allowed to mint.
    /// Callable exactly once.
    pub fn initialize(env: Env, admin: Address, name: String, symbol: String) {
        if env.storage().instance().has(&DataKey::Admin) {
            panic!("Contract already initialized");
        }
        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::Name, &name);
        env.storage().instance().set(&DataKey::Symbol, &symbol);
        env.storage().instance().set(&DataKey::NextTokenId, &0u32);
    }

    /// Mints the next sequential token to `to`. Admin only.
    pub fn mint(env: Env, to: Address) -> u32 {
        let admin: Address = env.storage().instance().get(&DataKey::Admin).unwrap();
        admin.require_auth();

        let token_id: u32 = env.storage().instance().get(&DataKey::NextTokenId).unwrap();
        env.storage().instance().set(&DataKey::NextTokenId, &(token_id + 1));
        env.storage().persistent().set(&DataKey::Owner(token_id), &to);
        Self::increase_balance(&env, &to);

        env.events().publish((MINT, to), token_id);

        token_id
    }

    /// Returns the owner of `token_id`, panicking for unknown ids so callers
    /// see the failure instead of a default address.
    pub fn owner_of(env: Env, token_id: u32) -> Address {
        match env.storage().persistent().get(&DataKey::Owner(token_id)) {
            Some(owner) => owner,
            None => panic!("owner query for nonexistent token"),
        }
    }

    /// Grants `approved` the right to move `token_id` once. Only the current
    /// owner can approve; the approval is cleared on transfer.
    pub fn approve(env: Env, owner: Address, approved: Address, token_id: u32) {
        owner.require_auth();

        if Self::owner_of(env.clone(), token_id) != owner {
            panic!("Only owner can approve transfers");
        }
        env.storage().persistent().set(&DataKey::Approved(token_id), &approved);

        env.events().publish((APPROVE, owner), (approved, token_id));
    }

    pub fn get_approved(env: Env, token_id: u32) -> Option<Address> {
        env.storage().persistent().get(&DataKey::Approved(token_id))
    }

    /// Direct transfer by the token owner.
    pub fn transfer(env: Env, from: Address, to: Address, token_id: u32) {
        from.require_auth();

        if Self::owner_of(env.clone(), token_id) != from {
            panic!("transfer of token that is not own");
        }
        Self::move_token(&env, &from, &to, token_id);
    }

    /// Transfer through a previously granted approval. `spender` must be the
    /// owner or the approved address for this token.
    pub fn transfer_from(env: Env, spender: Address, from: Address, to: Address, token_id: u32) {
        spender.require_auth();

        if Self::owner_of(env.clone(), token_id) != from {
            panic!("transfer of token that is not own");
        }
        let approved: Option<Address> = env.storage().persistent().get(&DataKey::Approved(token_id));
        if spender != from && approved != Some(spender) {
            panic!("caller is not owner nor approved");
        }
        Self::move_token(&env, &from, &to, token_id);
    }

    pub fn balance(env: Env, owner: Address) -> u32 {
        env.storage().persistent().get(&DataKey::Balance(owner)).unwrap_or(0)
    }

    pub fn name(env: Env) -> String {
        env.storage().instance().get(&DataKey::Name).unwrap()
    }

    pub fn symbol(env: Env) -> String {
        env.storage().instance().get(&DataKey::Symbol).unwrap()
    }

    pub fn next_token_id(env: Env) -> u32 {
        env.storage().instance().get(&DataKey::NextTokenId).unwrap()
    }

    fn move_token(env: &Env, from: &Address, to: &Address, token_id: u32) {
        env.storage().persistent().remove(&DataKey::Approved(token_id));
        env.storage().persistent().set(&DataKey::Owner(token_id), to);
        Self::decrease_balance(env, from);
        Self::increase_balance(env, to);

        env.events().publish((TRANSFER, from.clone(), to.clone()), token_id);
    }

    fn increase_balance(env: &Env, owner: &Address) {
        let current: u32 = env
            .storage()
            .persistent()
            .get(&DataKey::Balance(owner.clone()))
            .unwrap_or(0);
        env.storage().persistent().set(&DataKey::Balance(owner.clone()), &(current + 1));
    }

    fn decrease_balance(env: &Env, owner: &Address) {
        let current: u32 = env
            .storage()
            .persistent()
            .get(&DataKey::Balance(owner.clone()))
            .unwrap_or(0);
        // the ownership check in the transfer paths keeps this from underflowing
        let updated = match current.checked_sub(1) {
            Some(updated) => updated,
            None => panic!("balance accounting underflow"),
        };
        env.storage().persistent().set(&DataKey::Balance(owner.clone()), &updated);
    }
}
