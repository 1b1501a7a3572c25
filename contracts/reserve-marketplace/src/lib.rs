/*!
 * Reserve Marketplace Contract
 *
 * Matches sale and purchase reserve proposals for NFTs. A proposal's identity
 * is the hash over its economic terms plus the intended counterparty, so
 * matching needs no order book: an incoming proposal either finds its exact
 * counterpart (and hands custody to the reserves manager) or is recorded for a
 * future match. Exact-term matching is deliberate: no partial fills, no price
 * improvement.
 *
 * The marketplace owns unmatched proposals only. Once a reserve starts, the
 * reserves manager is the sole owner of the locked NFT and collateral; all
 * lifecycle actions from then on go directly against the manager. Matched
 * proposals are deleted before the custody call so a reentrant submission can
 * never consume the same proposal twice.
 */

#![no_std]

mod interfaces;
mod types;


use soroban_sdk::{
    contract, contractimpl, log, token, xdr::ToXdr, Address, Bytes, BytesN, Env, Symbol,
};

use interfaces::{CollectionClient, ProtocolParametersClient, ReservesManagerClient};
use types::{DataKey, PurchaseReserveProposal, ReserveTerms, SaleReserveProposal};

#[contract]
pub struct ReserveMarketplace;

// Collateral percents are expressed in basis points of the price.
const BASIS_POINTS_DIVISOR: i128 = 10_000;

#[contractimpl]
impl ReserveMarketplace {
    /// Wires the marketplace to its fixed collaborators. Callable exactly once.
    pub fn initialize(env: Env, owner: Address, protocol_parameters: Address, reserves_manager: Address) {
        if env.storage().instance().has(&DataKey::Owner) {
            panic!("Contract already initialized");
        }
        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::ProtocolParameters, &protocol_parameters);
        env.storage().instance().set(&DataKey::ReservesManager, &reserves_manager);
    }

    /// Submits a sale reserve proposal, matching it on the spot when its
    /// purchase counterpart is already recorded.
    ///
    /// The caller must own the token named by `terms`. When a live (not
    /// expired) purchase proposal with the same terms exists and its buyer's
    /// payment-token balance and allowance to the reserves manager cover the
    /// collateral, the purchase proposal is consumed, a reserve starts and
    /// `SaleReserved` is emitted. Otherwise the sale proposal is recorded
    /// with a validity of `validity_period` seconds and `SaleReserveProposed`
    /// is emitted.
    ///
    /// `counterparty` restricts who may take the other side; `None` means
    /// open to anyone.
    pub fn approve_reserve_to_sell(
        env: Env,
        caller: Address,
        terms: ReserveTerms,
        beneficiary: Address,
        validity_period: u64,
        counterparty: Option<Address>,
    ) {
        caller.require_auth();

        // propagates "owner query for nonexistent token" for unknown ids
        if CollectionClient::new(&env, &terms.collection).owner_of(&terms.token_id) != caller {
            panic!("Only owner can approve");
        }
        Self::validate_terms(&env, &terms);

        let manager: Address = env.storage().instance().get(&DataKey::ReservesManager).unwrap();

        if let Some((purchase_id, purchase)) =
            Self::find_purchase_match(&env, &terms, &caller, &counterparty)
        {
            let collateral = Self::required_collateral(terms.price, terms.collateral_percent);
            let payment_client = token::Client::new(&env, &terms.payment_token);
            let funded = payment_client.balance(&purchase.buyer) >= collateral
                && payment_client.allowance(&purchase.buyer, &manager) >= collateral;

            if funded {
                env.storage().persistent().remove(&DataKey::PurchaseProposal(purchase_id));

                ReservesManagerClient::new(&env, &manager).start_reserve(
                    &env.current_contract_address(),
                    &terms.collection,
                    &terms.token_id,
                    &terms.payment_token,
                    &terms.price,
                    &terms.collateral_percent,
                    &terms.reserve_period,
                    &caller,
                    &purchase.buyer,
                );

                env.events().publish(
                    (Symbol::new(&env, "SaleReserved"), terms.collection, terms.token_id),
                    (
                        terms.payment_token,
                        terms.collateral_token,
                        terms.price,
                        terms.collateral_percent,
                        terms.reserve_period,
                        caller,
                        purchase.buyer,
                    ),
                );
                return;
            }
            log!(&env, "Matched buyer cannot fund collateral of {}, recording proposal", collateral);
        }

        let proposal_id = Self::proposal_id(&env, &terms, &counterparty);
        let proposal = SaleReserveProposal {
            terms: terms.clone(),
            owner: caller,
            beneficiary,
            expiration_timestamp: env.ledger().timestamp() + validity_period,
        };
        env.storage().persistent().set(&DataKey::SaleProposal(proposal_id), &proposal);

        env.events().publish(
            (Symbol::new(&env, "SaleReserveProposed"), terms.collection, terms.token_id),
            (
                terms.payment_token,
                terms.collateral_token,
                terms.price,
                terms.collateral_percent,
                terms.reserve_period,
            ),
        );
    }

    /// Buy-side mirror of `approve_reserve_to_sell`.
    ///
    /// The caller must hold at least the collateral amount in the payment
    /// token. When a live sale proposal with the same terms exists and its
    /// seller still owns the token with the manager approved on it, the sale
    /// proposal is consumed, a reserve starts and `PurchaseReserved` is
    /// emitted; otherwise the purchase proposal is recorded and
    /// `PurchaseReserveProposed` is emitted.
    pub fn approve_reserve_to_buy(
        env: Env,
        caller: Address,
        terms: ReserveTerms,
        beneficiary: Address,
        validity_period: u64,
        counterparty: Option<Address>,
    ) {
        caller.require_auth();

        Self::validate_terms(&env, &terms);

        let collateral = Self::required_collateral(terms.price, terms.collateral_percent);
        let payment_client = token::Client::new(&env, &terms.payment_token);
        if payment_client.balance(&caller) < collateral {
            panic!("Not enough balance to pay for collateral");
        }

        let manager: Address = env.storage().instance().get(&DataKey::ReservesManager).unwrap();

        if let Some((sale_id, sale)) = Self::find_sale_match(&env, &terms, &caller, &counterparty) {
            let collection_client = CollectionClient::new(&env, &terms.collection);
            let ready = collection_client.owner_of(&terms.token_id) == sale.owner
                && collection_client.get_approved(&terms.token_id) == Some(manager.clone());

            if ready {
                env.storage().persistent().remove(&DataKey::SaleProposal(sale_id));

                ReservesManagerClient::new(&env, &manager).start_reserve(
                    &env.current_contract_address(),
                    &terms.collection,
                    &terms.token_id,
                    &terms.payment_token,
                    &terms.price,
                    &terms.collateral_percent,
                    &terms.reserve_period,
                    &sale.owner,
                    &caller,
                );

                env.events().publish(
                    (Symbol::new(&env, "PurchaseReserved"), terms.collection, terms.token_id),
                    (
                        terms.payment_token,
                        terms.collateral_token,
                        terms.price,
                        terms.collateral_percent,
                        terms.reserve_period,
                        sale.owner,
                        caller,
                    ),
                );
                return;
            }
            log!(&env, "Matched seller no longer ready to transfer token {}, recording proposal", terms.token_id);
        }

        let proposal_id = Self::proposal_id(&env, &terms, &counterparty);
        let proposal = PurchaseReserveProposal {
            terms: terms.clone(),
            buyer: caller,
            beneficiary,
            expiration_timestamp: env.ledger().timestamp() + validity_period,
        };
        env.storage().persistent().set(&DataKey::PurchaseProposal(proposal_id), &proposal);

        env.events().publish(
            (Symbol::new(&env, "PurchaseReserveProposed"), terms.collection, terms.token_id),
            (
                terms.payment_token,
                terms.collateral_token,
                terms.price,
                terms.collateral_percent,
                terms.reserve_period,
            ),
        );
    }

    /// Looks up a sale proposal by its full terms.
    pub fn get_sale_reserve_proposal(
        env: Env,
        terms: ReserveTerms,
        counterparty: Option<Address>,
    ) -> (SaleReserveProposal, BytesN<32>) {
        let proposal_id = Self::proposal_id(&env, &terms, &counterparty);
        match env.storage().persistent().get(&DataKey::SaleProposal(proposal_id.clone())) {
            Some(proposal) => (proposal, proposal_id),
            None => panic!("Non-existent proposal"),
        }
    }

    /// Looks up a purchase proposal by its full terms.
    pub fn get_purchase_reserve_proposal(
        env: Env,
        terms: ReserveTerms,
        counterparty: Option<Address>,
    ) -> (PurchaseReserveProposal, BytesN<32>) {
        let proposal_id = Self::proposal_id(&env, &terms, &counterparty);
        match env.storage().persistent().get(&DataKey::PurchaseProposal(proposal_id.clone())) {
            Some(proposal) => (proposal, proposal_id),
            None => panic!("Non-existent proposal"),
        }
    }

    /// Withdraws an unmatched sale proposal. Only its owner can cancel.
    pub fn cancel_sale_reserve_proposal(
        env: Env,
        caller: Address,
        terms: ReserveTerms,
        counterparty: Option<Address>,
    ) {
        caller.require_auth();

        let proposal_id = Self::proposal_id(&env, &terms, &counterparty);
        let proposal: SaleReserveProposal =
            match env.storage().persistent().get(&DataKey::SaleProposal(proposal_id.clone())) {
                Some(proposal) => proposal,
                None => panic!("Non-existent proposal"),
            };
        if proposal.owner != caller {
            panic!("Only owner can cancel");
        }

        env.storage().persistent().remove(&DataKey::SaleProposal(proposal_id));

        env.events().publish(
            (Symbol::new(&env, "SaleReserveProposalCanceled"), terms.collection, terms.token_id),
            (
                terms.payment_token,
                terms.collateral_token,
                terms.price,
                terms.collateral_percent,
                terms.reserve_period,
                caller,
            ),
        );
    }

    /// Withdraws an unmatched purchase proposal. Only its buyer can cancel.
    pub fn cancel_purchase_reserve_proposal(
        env: Env,
        caller: Address,
        terms: ReserveTerms,
        counterparty: Option<Address>,
    ) {
        caller.require_auth();

        let proposal_id = Self::proposal_id(&env, &terms, &counterparty);
        let proposal: PurchaseReserveProposal =
            match env.storage().persistent().get(&DataKey::PurchaseProposal(proposal_id.clone())) {
                Some(proposal) => proposal,
                None => panic!("Non-existent proposal"),
            };
        if proposal.buyer != caller {
            panic!("Only buyer can cancel");
        }

        env.storage().persistent().remove(&DataKey::PurchaseProposal(proposal_id));

        env.events().publish(
            (Symbol::new(&env, "PurchaseReserveProposalCanceled"), terms.collection, terms.token_id),
            (
                terms.payment_token,
                terms.collateral_token,
                terms.price,
                terms.collateral_percent,
                terms.reserve_period,
                caller,
            ),
        );
    }

    pub fn protocol_parameters(env: Env) -> Address {
        env.storage().instance().get(&DataKey::ProtocolParameters).unwrap()
    }

    pub fn reserves_manager(env: Env) -> Address {
        env.storage().instance().get(&DataKey::ReservesManager).unwrap()
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

    fn validate_terms(env: &Env, terms: &ReserveTerms) {
        if terms.price <= 0 {
            panic!("Invalid price");
        }
        if terms.collateral_percent == 0 || terms.collateral_percent >= 10_000 {
            panic!("Invalid collateral percent");
        }
        let protocol_parameters: Address =
            env.storage().instance().get(&DataKey::ProtocolParameters).unwrap();
        let minimum = ProtocolParametersClient::new(env, &protocol_parameters).minimum_reserve_period();
        if terms.reserve_period <= minimum {
            panic!("Reserve period must be greater");
        }
    }

    /// Finds a live purchase counterpart for an incoming sale proposal:
    /// first one that names the seller as counterparty, then an open one.
    /// A candidate past its expiration instant never matches, nor does one
    /// whose buyer differs from the seller's requested counterparty.
    fn find_purchase_match(
        env: &Env,
        terms: &ReserveTerms,
        caller: &Address,
        counterparty: &Option<Address>,
    ) -> Option<(BytesN<32>, PurchaseReserveProposal)> {
        let now = env.ledger().timestamp();
        for candidate_key in [Some(caller.clone()), None] {
            let proposal_id = Self::proposal_id(env, terms, &candidate_key);
            let candidate: Option<PurchaseReserveProposal> =
                env.storage().persistent().get(&DataKey::PurchaseProposal(proposal_id.clone()));
            if let Some(proposal) = candidate {
                if now >= proposal.expiration_timestamp {
                    continue;
                }
                if let Some(wanted) = counterparty {
                    if proposal.buyer != *wanted {
                        continue;
                    }
                }
                return Some((proposal_id, proposal));
            }
        }
        None
    }

    /// Sale-side mirror of `find_purchase_match`.
    fn find_sale_match(
        env: &Env,
        terms: &ReserveTerms,
        caller: &Address,
        counterparty: &Option<Address>,
    ) -> Option<(BytesN<32>, SaleReserveProposal)> {
        let now = env.ledger().timestamp();
        for candidate_key in [Some(caller.clone()), None] {
            let proposal_id = Self::proposal_id(env, terms, &candidate_key);
            let candidate: Option<SaleReserveProposal> =
                env.storage().persistent().get(&DataKey::SaleProposal(proposal_id.clone()));
            if let Some(proposal) = candidate {
                if now >= proposal.expiration_timestamp {
                    continue;
                }
                if let Some(wanted) = counterparty {
                    if proposal.owner != *wanted {
                        continue;
                    }
                }
                return Some((proposal_id, proposal));
            }
        }
        None
    }

    fn required_collateral(price: i128, collateral_percent: u32) -> i128 {
        price * collateral_percent as i128 / BASIS_POINTS_DIVISOR
    }

    /// Proposal identity: sha256 over the XDR encoding of the terms plus the
    /// counterparty. The expiration timestamp stays out on purpose so
    /// identical terms collide into the same matching key.
    fn proposal_id(env: &Env, terms: &ReserveTerms, counterparty: &Option<Address>) -> BytesN<32> {
        let mut payload = Bytes::new(env);
        payload.append(&terms.clone().to_xdr(env));
        payload.append(&counterparty.clone().to_xdr(env));
        env.crypto().sha256(&payload).into()
    }
}
