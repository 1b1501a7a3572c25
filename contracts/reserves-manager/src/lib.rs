/*!
 * Reserves Manager Contract
 *
 * Sole owner of every active reserve: once the marketplace matches a sale and
 * a purchase proposal it calls `start_reserve` here, and from that point the
 * manager custodies the NFT and the buyer's collateral until the reserve is
 * resolved through one of three terminal transitions:
 *
 * - `cancel_reserve`: either party backs out before expiry, paying a cancel
 *   fee to the counterparty;
 * - `liquidate_reserve` (unpaid): the buyer never paid, so past the deadline
 *   the seller keeps the NFT and the full collateral;
 * - `liquidate_reserve` (paid): the trade executes, price to the seller, NFT
 *   and collateral to the buyer.
 *
 * While a reserve is live the buyer may pay the price (`pay_the_price`) and
 * adjust the posted collateral, subject to the unpaid collateral floor.
 *
 * Records are deleted before any token transfer (checks-effects-interactions)
 * so a reentrant call can never settle the same custody twice. Time gates are
 * block-timestamp predicates: the deadline instant itself already counts as
 * expired.
 */

#![no_std]

mod interfaces;
mod types;


use soroban_sdk::{
    contract, contractimpl, token, xdr::ToXdr, Address, Bytes, BytesN, Env, Symbol,
};

use interfaces::{CollectionClient, ProtocolParametersClient};
use types::{DataKey, Reserve, ReserveAmounts};

#[contract]
pub struct ReservesManager;

// Collateral percents are expressed in basis points, cancel fees in whole
// percents of the price.
const BASIS_POINTS_DIVISOR: i128 = 10_000;
const PERCENT_DIVISOR: i128 = 100;

#[contractimpl]
impl ReservesManager {
    /// Wires the manager to its fixed collaborators. Callable exactly once.
    ///
    /// # Arguments
    /// * `owner` - address allowed to swap the implementation
    /// * `marketplace` - the only address allowed to start reserves
    /// * `protocol_parameters` - registry consulted for fees and grace period
    pub fn initialize(env: Env, owner: Address, marketplace: Address, protocol_parameters: Address) {
        if env.storage().instance().has(&DataKey::Owner) {
            panic!("Contract already initialized");
        }
        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::Marketplace, &marketplace);
        env.storage().instance().set(&DataKey::ProtocolParameters, &protocol_parameters);
    }

    /// Opens a reserve and takes custody of the NFT and the collateral.
    /// Restricted to the marketplace.
    ///
    /// Collateral is `price * collateral_percent / 10000` (floor), pulled from
    /// the buyer in `payment_token` through the allowance the buyer granted
    /// this contract; the NFT is pulled through the seller's approval on the
    /// collection. Both parties must have set those up beforehand, token
    /// failures propagate to the caller.
    ///
    /// Returns the reserve id: the hash over
    /// `{collection, token_id, seller, buyer}`.
    pub fn start_reserve(
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
    ) -> BytesN<32> {
        caller.require_auth();

        let marketplace: Address = env.storage().instance().get(&DataKey::Marketplace).unwrap();
        if caller != marketplace {
            panic!("Only callable from the marketplace");
        }

        let collateral_amount = Self::required_collateral(price, collateral_percent);
        let reserve_id = Self::reserve_id_for(&env, &collection, token_id, &seller, &buyer);

        let reserve = Reserve {
            collection: collection.clone(),
            token_id,
            payment_token: payment_token.clone(),
            price,
            collateral_percent,
            seller: seller.clone(),
            buyer: buyer.clone(),
            start_timestamp: env.ledger().timestamp(),
            reserve_period,
            collateral_amount,
            paid: false,
        };
        env.storage().persistent().set(&DataKey::Reserve(reserve_id.clone()), &reserve);

        // custody pulls happen after the record is written
        let this = env.current_contract_address();
        CollectionClient::new(&env, &collection).transfer_from(&this, &seller, &this, &token_id);
        token::Client::new(&env, &payment_token).transfer_from(&this, &buyer, &this, &collateral_amount);

        reserve_id
    }

    /// Cancels an unexpired reserve. Only the buyer or the seller may cancel,
    /// and the canceling party pays a cancel fee (`price * fee_percent / 100`,
    /// seller or buyer percent depending on role) to the counterparty through
    /// a pre-approved allowance. The NFT returns to the seller and the full
    /// collateral balance to the buyer.
    pub fn cancel_reserve(env: Env, caller: Address, reserve_id: BytesN<32>) {
        caller.require_auth();

        let reserve = match Self::load_reserve(&env, &reserve_id) {
            Some(reserve) => reserve,
            None => panic!("Non-existent active proposal"),
        };
        if caller != reserve.buyer && caller != reserve.seller {
            panic!("Invalid caller. This can be called only by the buyer or seller");
        }
        if env.ledger().timestamp() >= reserve.start_timestamp + reserve.reserve_period {
            panic!("Reserve expired. Pay or liquidate");
        }

        let parameters = Self::parameters_client(&env);
        let (fee_percent, counterparty) = if caller == reserve.seller {
            (parameters.seller_cancel_fee_percent(), reserve.buyer.clone())
        } else {
            (parameters.buyer_cancel_fee_percent(), reserve.seller.clone())
        };
        let fee_amount = reserve.price * fee_percent as i128 / PERCENT_DIVISOR;

        env.storage().persistent().remove(&DataKey::Reserve(reserve_id));

        let this = env.current_contract_address();
        let payment_token = token::Client::new(&env, &reserve.payment_token);
        if fee_amount > 0 {
            // pulled straight from the canceling party's wallet; a missing
            // allowance fails here with the token's own error
            payment_token.transfer_from(&this, &caller, &counterparty, &fee_amount);
        }
        CollectionClient::new(&env, &reserve.collection).transfer(&this, &reserve.seller, &reserve.token_id);
        payment_token.transfer(&this, &reserve.buyer, &reserve.collateral_amount);

        env.events().publish(
            (Symbol::new(&env, "ReserveCanceled"), reserve.collection, reserve.token_id),
            (
                reserve.payment_token,
                reserve.price,
                reserve.collateral_percent,
                reserve.seller,
                reserve.buyer,
                caller,
            ),
        );
    }

    /// Resolves an expired reserve. Only the buyer or the seller may call.
    ///
    /// Unpaid: the buyer must wait out the reserve period, the seller
    /// additionally the buyer purchase grace period; past the gate the NFT and
    /// the full collateral go to the seller (`PurchaseCanceled`).
    ///
    /// Paid: once the reserve period elapses the trade executes: price to the
    /// seller, collateral and NFT to the buyer (`PurchaseExecuted`).
    pub fn liquidate_reserve(env: Env, caller: Address, reserve_id: BytesN<32>) {
        caller.require_auth();

        let reserve = match Self::load_reserve(&env, &reserve_id) {
            Some(reserve) => reserve,
            None => panic!("Non-existent active reserve"),
        };
        if caller != reserve.buyer && caller != reserve.seller {
            panic!("Invalid caller. This can be called only by the buyer or seller");
        }

        let now = env.ledger().timestamp();
        let deadline = reserve.start_timestamp + reserve.reserve_period;

        if reserve.paid {
            if now < deadline {
                panic!("Reserve period not finished yet");
            }
            Self::execute_purchase(&env, reserve_id, reserve);
        } else {
            if caller == reserve.buyer && now < deadline {
                panic!("Reserve period not finished yet");
            }
            let grace_period = Self::parameters_client(&env).buyer_purchase_grace_period();
            if caller == reserve.seller && now < deadline + grace_period {
                panic!("Buyer period to pay not finished yet");
            }
            Self::cancel_purchase(&env, reserve_id, reserve);
        }
    }

    /// Pays the reserve price. Buyer only, within the reserve period, once.
    /// The price is pulled from the buyer into custody and released to the
    /// seller on liquidation.
    pub fn pay_the_price(env: Env, caller: Address, reserve_id: BytesN<32>) {
        caller.require_auth();

        let mut reserve = match Self::load_reserve(&env, &reserve_id) {
            Some(reserve) => reserve,
            None => panic!("Non-existent active reserve"),
        };
        if caller != reserve.buyer {
            panic!("Only proposal buyer allowed");
        }
        if env.ledger().timestamp() >= reserve.start_timestamp + reserve.reserve_period {
            panic!("Period to pay finished");
        }
        if reserve.paid {
            panic!("Already paid");
        }

        reserve.paid = true;
        env.storage().persistent().set(&DataKey::Reserve(reserve_id.clone()), &reserve);

        let this = env.current_contract_address();
        token::Client::new(&env, &reserve.payment_token).transfer_from(&this, &reserve.buyer, &this, &reserve.price);

        env.events().publish(
            (Symbol::new(&env, "ReservePricePaid"), reserve_id),
            (reserve.buyer, reserve.price),
        );
    }

    /// Tops up the buyer's collateral while the price is unpaid.
    pub fn increase_reserve_collateral(env: Env, caller: Address, reserve_id: BytesN<32>, amount: i128) {
        caller.require_auth();

        let mut reserve = match Self::load_reserve(&env, &reserve_id) {
            Some(reserve) => reserve,
            None => panic!("Non-existent active reserve"),
        };
        if caller != reserve.buyer {
            panic!("Only buyer allowed");
        }
        if reserve.paid {
            panic!("Price already paid");
        }
        if amount <= 0 {
            panic!("Invalid amount");
        }

        reserve.collateral_amount += amount;
        env.storage().persistent().set(&DataKey::Reserve(reserve_id.clone()), &reserve);

        let this = env.current_contract_address();
        token::Client::new(&env, &reserve.payment_token).transfer_from(&this, &reserve.buyer, &this, &amount);

        env.events().publish(
            (Symbol::new(&env, "CollateralIncreased"), reserve_id),
            amount,
        );
    }

    /// Withdraws part of the buyer's collateral.
    ///
    /// While unpaid the balance may not drop below the collateral floor
    /// (`price * collateral_percent / 10000`): the collateral still secures
    /// the buyer's payment obligation. Once paid it only secures the buyer
    /// against the seller and may be withdrawn down to zero.
    pub fn decrease_reserve_collateral(env: Env, caller: Address, reserve_id: BytesN<32>, amount: i128) {
        caller.require_auth();

        let mut reserve = match Self::load_reserve(&env, &reserve_id) {
            Some(reserve) => reserve,
            None => panic!("Non-existent active reserve"),
        };
        if caller != reserve.buyer {
            panic!("Only buyer allowed");
        }
        if amount <= 0 {
            panic!("Invalid amount");
        }

        if reserve.paid {
            if amount > reserve.collateral_amount {
                panic!("Insufficient amount for request");
            }
        } else {
            let floor = Self::required_collateral(reserve.price, reserve.collateral_percent);
            if reserve.collateral_amount - amount < floor {
                panic!("Attemp to uncollateralize reserve");
            }
        }

        reserve.collateral_amount -= amount;
        env.storage().persistent().set(&DataKey::Reserve(reserve_id.clone()), &reserve);

        let this = env.current_contract_address();
        token::Client::new(&env, &reserve.payment_token).transfer(&this, &reserve.buyer, &amount);

        env.events().publish(
            (Symbol::new(&env, "CollateralDecreased"), reserve_id),
            amount,
        );
    }

    /// Settlement amounts for a reserve: the collateral currently held and
    /// the payment owed to the seller (zero until paid).
    pub fn reserve_amounts(env: Env, reserve_id: BytesN<32>) -> ReserveAmounts {
        let reserve = match Self::load_reserve(&env, &reserve_id) {
            Some(reserve) => reserve,
            None => panic!("Non-existent active reserve"),
        };
        ReserveAmounts {
            collateral: reserve.collateral_amount,
            payment: if reserve.paid { reserve.price } else { 0 },
        }
    }

    pub fn get_reserve(env: Env, reserve_id: BytesN<32>) -> Option<Reserve> {
        Self::load_reserve(&env, &reserve_id)
    }

    /// Reserve identity: hash over `{collection, token_id, seller, buyer}`,
    /// roles positional at match time.
    pub fn reserve_id(env: Env, collection: Address, token_id: u32, seller: Address, buyer: Address) -> BytesN<32> {
        Self::reserve_id_for(&env, &collection, token_id, &seller, &buyer)
    }

    pub fn marketplace(env: Env) -> Address {
        env.storage().instance().get(&DataKey::Marketplace).unwrap()
    }

    pub fn protocol_parameters(env: Env) -> Address {
        env.storage().instance().get(&DataKey::ProtocolParameters).unwrap()
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

    /// Unpaid liquidation: the buyer forfeits the collateral for non-payment.
    fn cancel_purchase(env: &Env, reserve_id: BytesN<32>, reserve: Reserve) {
        env.storage().persistent().remove(&DataKey::Reserve(reserve_id));

        let this = env.current_contract_address();
        CollectionClient::new(env, &reserve.collection).transfer(&this, &reserve.seller, &reserve.token_id);
        token::Client::new(env, &reserve.payment_token).transfer(&this, &reserve.seller, &reserve.collateral_amount);

        env.events().publish(
            (Symbol::new(env, "PurchaseCanceled"), reserve.collection, reserve.token_id),
            (reserve.seller, reserve.buyer, reserve.collateral_amount),
        );
    }

    /// Paid liquidation: the trade executes.
    fn execute_purchase(env: &Env, reserve_id: BytesN<32>, reserve: Reserve) {
        env.storage().persistent().remove(&DataKey::Reserve(reserve_id));

        let this = env.current_contract_address();
        let payment_token = token::Client::new(env, &reserve.payment_token);
        payment_token.transfer(&this, &reserve.seller, &reserve.price);
        payment_token.transfer(&this, &reserve.buyer, &reserve.collateral_amount);
        CollectionClient::new(env, &reserve.collection).transfer(&this, &reserve.buyer, &reserve.token_id);

        env.events().publish(
            (Symbol::new(env, "PurchaseExecuted"), reserve.collection, reserve.token_id),
            (reserve.seller, reserve.buyer, reserve.price, reserve.collateral_amount),
        );
    }

    fn load_reserve(env: &Env, reserve_id: &BytesN<32>) -> Option<Reserve> {
        env.storage().persistent().get(&DataKey::Reserve(reserve_id.clone()))
    }

    fn parameters_client(env: &Env) -> ProtocolParametersClient {
        let protocol_parameters: Address =
            env.storage().instance().get(&DataKey::ProtocolParameters).unwrap();
        ProtocolParametersClient::new(env, &protocol_parameters)
    }

    fn required_collateral(price: i128, collateral_percent: u32) -> i128 {
        price * collateral_percent as i128 / BASIS_POINTS_DIVISOR
    }

    fn reserve_id_for(env: &Env, collection: &Address, token_id: u32, seller: &Address, buyer: &Address) -> BytesN<32> {
        let mut payload = Bytes::new(env);
        payload.append(&collection.clone().to_xdr(env));
        payload.append(&token_id.to_xdr(env));
        payload.append(&seller.clone().to_xdr(env));
        payload.append(&buyer.clone().to_xdr(env));
        env.crypto().sha256(&payload).into()
    }
}
