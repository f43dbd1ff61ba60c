/*!
 * Dutch Token Auction Smart Contract
 *
 * This contract sells a fixed supply of a fungible token at a price that starts
 * high and decays over time, until either every token is sold, the auction
 * duration elapses, or the price reaches the reserve. Bids are escrowed in a
 * payment token at the price in effect when they arrive; once the auction
 * closes, bidders pull their tokens and refunds through a claim call and the
 * unsold supply is burned.
 *
 * Key features:
 * - Linear per-minute price decay with a hard reserve-price floor
 * - Immediate token allocation at admission, with partial fills at sell-out
 * - Pull-based, one-shot claim of tokens and refunds after close
 * - Resumable bulk refund sweep bounded to a caller-chosen batch size
 * - Burn-on-close of the unsold supply
 *
 * Security features:
 * - Authorization checks on all critical functions
 * - State mutated before external transfers (checks-effects-interactions),
 *   with explicit rollback when a transfer fails
 * - The owner can never bid against its own auction
 * - Closing is one-way and idempotent across racing trigger paths
 *
 * Business Logic:
 * 1. The owner configures the auction and preallocates the token supply
 * 2. The owner starts the auction; the unit price begins decaying
 * 3. Bidders escrow payment and receive an immediate token allocation
 * 4. The auction closes on sell-out or elapsed duration; unsold supply burns
 * 5. Bidders claim tokens and refunds; the owner withdraws the proceeds
 */

#![no_std]

mod types;


use soroban_sdk::{
    contract,
    contractimpl,
    token,
    Address, Env, Map, Symbol, log, symbol_short
};

use types::{
    Bid, AuctionStatus, Error,
    AUCTION_STARTED, BID_PLACED, AUCTION_CLOSED, TOKENS_BURNED,
    BID_CLAIMED, REFUND_PAID, PROCEEDS_WITHDRAWN
};

#[contract]
pub struct DutchAuctionContract;

// Storage keys - Using short symbols for gas efficiency
// Persistent storage holds the immutable auction configuration; instance
// storage holds the runtime state that evolves while the auction runs.
const OWNER_KEY: Symbol = symbol_short!("OWNER");            // Auction owner address (persistent)
const TOKEN_KEY: Symbol = symbol_short!("TOKEN");            // Auction token contract address (persistent)
const PAY_TOKEN_KEY: Symbol = symbol_short!("PAY_TKN");      // Payment token contract address (persistent)
const START_PRICE_KEY: Symbol = symbol_short!("STRT_PRC");   // Opening unit price (persistent)
const RESERVE_PRICE_KEY: Symbol = symbol_short!("RSRV_PRC"); // Price floor (persistent)
const DECREMENT_KEY: Symbol = symbol_short!("DECR_MIN");     // Price drop per elapsed minute (persistent)
const DURATION_KEY: Symbol = symbol_short!("DURATION");      // Auction length in seconds (persistent)
const SUPPLY_KEY: Symbol = symbol_short!("SUPPLY");          // Total token supply on sale (persistent)
const STATUS_KEY: Symbol = symbol_short!("STATUS");          // Lifecycle status (instance)
const START_TS_KEY: Symbol = symbol_short!("START_TS");      // Timestamp of the Open transition (instance)
const REMAINING_KEY: Symbol = symbol_short!("REMAINING");    // Unallocated tokens (instance)
const RAISED_KEY: Symbol = symbol_short!("RAISED");          // Funds kept for the owner, net of refunds (instance)
const BIDS_KEY: Symbol = symbol_short!("BIDS");              // Map of all bids, dense ids (instance)
const NEXT_BID_ID: Symbol = symbol_short!("NXT_B_ID");       // Counter assigning dense bid ids (instance)
const BIDDER_IDS: Symbol = symbol_short!("BDR_IDS");         // Maps bidder Address to their latest bid id (instance)
const REFUND_CURSOR: Symbol = symbol_short!("RFND_CUR");     // Resume position of the bulk refund sweep (instance)
const SETTLED_KEY: Symbol = symbol_short!("SETTLED");        // Burn-on-close has executed (instance)
const PROCEEDS_KEY: Symbol = symbol_short!("PRC_WDRN");      // Owner has withdrawn the proceeds (instance)

const SECONDS_PER_MINUTE: u64 = 60;

#[contractimpl]
impl DutchAuctionContract {
    /// Initializes the auction with its immutable price curve and collaborators.
    /// This function can only be called once and sets up the configuration the
    /// whole lifecycle runs against. The token supply itself is fixed later,
    /// by `start`, once the supply has been preallocated to the contract.
    ///
    /// # Arguments
    /// * `owner` - The address that starts the auction and collects proceeds; barred from bidding
    /// * `token_id` - The contract address of the token being auctioned
    /// * `payment_token_id` - The contract address of the token bids are escrowed in
    /// * `start_price` - Opening unit price (payment units per auction token)
    /// * `reserve_price` - Hard price floor; decay never goes below it
    /// * `price_decrement_per_minute` - Linear price drop per elapsed minute
    /// * `duration_seconds` - Hard time limit after which the auction is closeable
    ///
    /// # Security Considerations
    /// - Validates both token addresses are real token contracts
    /// - Prevents double initialization
    /// - Rejects inverted price bounds and zero durations up front
    ///
    /// # Errors
    /// - InvalidConfig: If prices, decrement, or duration are out of range
    pub fn initialize(
        env: Env,
        owner: Address,
        token_id: Address,
        payment_token_id: Address,
        start_price: i128,
        reserve_price: i128,
        price_decrement_per_minute: i128,
        duration_seconds: u64,
    ) -> Result<(), Error> {
        // Prevent double initialization - critical security check
        if env.storage().persistent().has(&OWNER_KEY) {
            panic!("Contract already initialized");
        }

        // The reserve must be a positive floor below the opening price: it is
        // the divisor floor for every allocation, so zero is never legal.
        if start_price <= 0 || reserve_price <= 0 || reserve_price > start_price {
            return Err(Error::InvalidConfig);
        }
        if price_decrement_per_minute < 0 || duration_seconds == 0 {
            return Err(Error::InvalidConfig);
        }

        // Validate both collaborators are legitimate token contracts by
        // calling decimals() - this panics if the address is not a token
        let token_client = token::Client::new(&env, &token_id);
        let _ = token_client.decimals();
        let payment_client = token::Client::new(&env, &payment_token_id);
        let _ = payment_client.decimals();

        // Immutable configuration lives in persistent storage
        env.storage().persistent().set(&OWNER_KEY, &owner);
        env.storage().persistent().set(&TOKEN_KEY, &token_id);
        env.storage().persistent().set(&PAY_TOKEN_KEY, &payment_token_id);
        env.storage().persistent().set(&START_PRICE_KEY, &start_price);
        env.storage().persistent().set(&RESERVE_PRICE_KEY, &reserve_price);
        env.storage().persistent().set(&DECREMENT_KEY, &price_decrement_per_minute);
        env.storage().persistent().set(&DURATION_KEY, &duration_seconds);

        // Runtime state starts empty in instance storage
        env.storage().instance().set(&STATUS_KEY, &AuctionStatus::NotStarted);
        env.storage().instance().set(&BIDS_KEY, &Map::<u64, Bid>::new(&env));
        env.storage().instance().set(&BIDDER_IDS, &Map::<Address, u64>::new(&env));
        env.storage().instance().set(&NEXT_BID_ID, &0u64);
        env.storage().instance().set(&REFUND_CURSOR, &0u64);
        env.storage().instance().set(&RAISED_KEY, &0i128);
        env.storage().instance().set(&SETTLED_KEY, &false);
        env.storage().instance().set(&PROCEEDS_KEY, &false);

        Ok(())
    }

    /// Internal helper to verify owner authorization on privileged calls.
    /// Returns the owner address so callers can reuse it without a second read.
    fn _require_owner(env: &Env) -> Result<Address, Error> {
        let owner: Address = env.storage().persistent().get(&OWNER_KEY).unwrap();
        owner.require_auth(); // Fails if the owner has not signed the transaction
        Ok(owner)
    }

    /// Internal helper reading the stored lifecycle status.
    fn _status(env: &Env) -> AuctionStatus {
        env.storage().instance().get(&STATUS_KEY).unwrap_or(AuctionStatus::NotStarted)
    }

    /// Internal price oracle: maps a timestamp to the unit price in effect.
    /// Pure over the stored configuration - no side effects, callable any
    /// number of times.
    ///
    /// The price decays linearly per fully elapsed minute and is clamped to
    /// the reserve. Once the duration has elapsed the price is pinned to the
    /// reserve outright, independent of how far the decay arithmetic got.
    fn _price_at(env: &Env, now: u64) -> i128 {
        let start_price: i128 = env.storage().persistent().get(&START_PRICE_KEY).unwrap();
        let reserve_price: i128 = env.storage().persistent().get(&RESERVE_PRICE_KEY).unwrap();
        let decrement: i128 = env.storage().persistent().get(&DECREMENT_KEY).unwrap();
        let duration: u64 = env.storage().persistent().get(&DURATION_KEY).unwrap();
        let start_ts: u64 = env.storage().instance().get(&START_TS_KEY).unwrap();

        let elapsed = now.saturating_sub(start_ts);
        if elapsed >= duration {
            return reserve_price;
        }

        let elapsed_minutes = (elapsed / SECONDS_PER_MINUTE) as i128;
        let decayed = start_price.saturating_sub(decrement.saturating_mul(elapsed_minutes));
        if decayed < reserve_price {
            reserve_price
        } else {
            decayed
        }
    }

    /// Internal helper testing the close condition while Open: every token
    /// allocated, or the configured duration elapsed.
    fn _close_condition_met(env: &Env) -> bool {
        let remaining: i128 = env.storage().instance().get(&REMAINING_KEY).unwrap();
        if remaining == 0 {
            return true;
        }
        let start_ts: u64 = env.storage().instance().get(&START_TS_KEY).unwrap();
        let duration: u64 = env.storage().persistent().get(&DURATION_KEY).unwrap();
        env.ledger().timestamp().saturating_sub(start_ts) >= duration
    }

    /// Internal lazy close, run at the top of every command. Transitions
    /// Open auctions whose close condition holds, and retries finalization
    /// on Closed auctions where a previous burn attempt failed. A Closed
    /// auction that is fully settled passes through as a no-op, so racing
    /// trigger paths never error against each other.
    fn _try_close(env: &Env) -> Result<(), Error> {
        match Self::_status(env) {
            AuctionStatus::NotStarted | AuctionStatus::Paused => Ok(()),
            AuctionStatus::Open => {
                if Self::_close_condition_met(env) {
                    Self::_close_now(env)
                } else {
                    Ok(())
                }
            }
            AuctionStatus::Closed => Self::_finalize(env),
        }
    }

    /// Internal one-way transition to Closed. Freezes the remaining supply
    /// and the raised funds, then hands off to finalization.
    fn _close_now(env: &Env) -> Result<(), Error> {
        env.storage().instance().set(&STATUS_KEY, &AuctionStatus::Closed);

        let remaining: i128 = env.storage().instance().get(&REMAINING_KEY).unwrap();
        let raised: i128 = env.storage().instance().get(&RAISED_KEY).unwrap();
        env.events().publish(
            (AUCTION_CLOSED, env.current_contract_address()),
            (remaining, raised),
        );

        Self::_finalize(env)
    }

    /// Internal finalization: burn the unsold supply exactly once.
    /// Guarded by the settled flag so that invoking close repeatedly through
    /// different trigger paths can never burn twice. The flag is set before
    /// the burn and rolled back if the burn fails, leaving the next close
    /// trigger to retry.
    fn _finalize(env: &Env) -> Result<(), Error> {
        let settled: bool = env.storage().instance().get(&SETTLED_KEY).unwrap_or(false);
        if settled {
            return Ok(());
        }
        env.storage().instance().set(&SETTLED_KEY, &true);

        let unsold: i128 = env.storage().instance().get(&REMAINING_KEY).unwrap();
        if unsold > 0 {
            let token_id: Address = env.storage().persistent().get(&TOKEN_KEY).unwrap();
            let token_client = token::Client::new(env, &token_id);
            match token_client.try_burn(&env.current_contract_address(), &unsold) {
                Ok(_) => {}
                Err(_) => {
                    log!(env, "Failed to burn {} unsold tokens", unsold);
                    env.storage().instance().set(&SETTLED_KEY, &false);
                    return Err(Error::TokenTransferFailed);
                }
            }
            env.events().publish(
                (TOKENS_BURNED, env.current_contract_address()),
                (unsold,),
            );
        }

        Ok(())
    }

    /// Opens the auction for bidding.
    /// Only the owner can start, and only from NotStarted - a second call
    /// fails with AlreadyStarted rather than silently resetting the state.
    ///
    /// The token supply must already sit in the contract's balance: the
    /// engine only ever transfers out what was preallocated to it before
    /// start, so the balance is checked here rather than trusted later.
    ///
    /// # Arguments
    /// * `total_tokens` - Supply put up for sale; becomes the remaining-token counter
    /// * `price_decrement_per_minute` - Decay rate for this run, fixed at start
    ///
    /// # Errors
    /// - AlreadyStarted: If the auction is Open or Closed
    /// - InvalidConfig: If the supply or decrement is out of range
    /// - InsufficientSupply: If the contract does not hold the announced supply
    pub fn start(
        env: Env,
        total_tokens: i128,
        price_decrement_per_minute: i128,
    ) -> Result<(), Error> {
        Self::_require_owner(&env)?;

        if Self::_status(&env) != AuctionStatus::NotStarted {
            return Err(Error::AlreadyStarted);
        }
        if total_tokens <= 0 || price_decrement_per_minute < 0 {
            return Err(Error::InvalidConfig);
        }

        // The sale can only hand out tokens the contract already holds
        let token_id: Address = env.storage().persistent().get(&TOKEN_KEY).unwrap();
        let token_client = token::Client::new(&env, &token_id);
        let held = token_client.balance(&env.current_contract_address());
        if held < total_tokens {
            log!(&env, "Supply not preallocated. Required: {}, Held: {}", total_tokens, held);
            return Err(Error::InsufficientSupply);
        }

        let now = env.ledger().timestamp();
        env.storage().persistent().set(&SUPPLY_KEY, &total_tokens);
        env.storage().persistent().set(&DECREMENT_KEY, &price_decrement_per_minute);
        env.storage().instance().set(&START_TS_KEY, &now);
        env.storage().instance().set(&REMAINING_KEY, &total_tokens);
        env.storage().instance().set(&STATUS_KEY, &AuctionStatus::Open);

        let start_price: i128 = env.storage().persistent().get(&START_PRICE_KEY).unwrap();
        env.events().publish(
            (AUCTION_STARTED, env.current_contract_address()),
            (total_tokens, start_price, now),
        );

        Ok(())
    }

    /// Admits a bid at the unit price currently in effect.
    /// The committed value is escrowed in the payment token; tokens are
    /// allocated immediately at the admission price, clamped to the remaining
    /// supply. Whatever value did not buy tokens is recorded as a refund.
    ///
    /// # Business Flow
    /// 1. Validates the bidder, the committed value, and the auction status
    /// 2. Runs the lazy close check - an expired auction rejects the bid
    /// 3. Escrows the committed value with the contract
    /// 4. Allocates tokens at the current price, partial-filling at sell-out
    /// 5. Records the bid under the next dense id and publishes the event
    /// 6. A sell-out closes the auction immediately, independent of time
    ///
    /// # Security Checks
    /// - Requires bidder authorization
    /// - The owner is rejected in every auction state, not just Open
    /// - Escrow happens before any ledger mutation; a failed escrow admits nothing
    ///
    /// # Arguments
    /// * `bidder` - The address placing the bid (must sign transaction)
    /// * `value` - Payment-token amount to commit
    ///
    /// # Returns
    /// The dense, zero-based id assigned to the admitted bid
    ///
    /// # Errors
    /// - OwnerCannotBid: If the owner tries to bid on its own auction
    /// - ZeroBidValue: If the committed value is not strictly positive
    /// - SoldOut: If every token was already allocated
    /// - AuctionNotOpen: If the auction is not accepting bids
    /// - InsufficientBalance: If the bidder cannot cover the committed value
    /// - TokenTransferFailed: If the escrow transfer fails
    pub fn place_bid(env: Env, bidder: Address, value: i128) -> Result<u64, Error> {
        bidder.require_auth();

        // Self-dealing prevention comes first: the owner is rejected in
        // every state, even before the status is looked at
        let owner: Address = env.storage().persistent().get(&OWNER_KEY).unwrap();
        if bidder == owner {
            return Err(Error::OwnerCannotBid);
        }

        if value <= 0 {
            return Err(Error::ZeroBidValue);
        }

        // Lazy close: an auction whose condition holds closes before the
        // admission decision is made
        Self::_try_close(&env)?;

        match Self::_status(&env) {
            AuctionStatus::Open => {}
            AuctionStatus::Closed => {
                let remaining: i128 = env.storage().instance().get(&REMAINING_KEY).unwrap();
                if remaining == 0 {
                    return Err(Error::SoldOut);
                }
                return Err(Error::AuctionNotOpen);
            }
            _ => return Err(Error::AuctionNotOpen),
        }

        let price = Self::_price_at(&env, env.ledger().timestamp());
        let remaining: i128 = env.storage().instance().get(&REMAINING_KEY).unwrap();

        // Floor division: the engine never over-allocates; the sub-price
        // remainder of the committed value becomes refundable dust
        let requested = value / price;

        let (allocated, refund_owed) = if requested > remaining {
            // Partial fill: the unfilled portion of the value is refundable,
            // not just the rounding remainder
            let cost = remaining.saturating_mul(price);
            (remaining, value - cost)
        } else {
            (requested, value - requested.saturating_mul(price))
        };

        // Escrow the committed value before touching the ledger
        let pay_token_id: Address = env.storage().persistent().get(&PAY_TOKEN_KEY).unwrap();
        let pay_client = token::Client::new(&env, &pay_token_id);

        let bidder_balance = pay_client.balance(&bidder);
        if bidder_balance < value {
            log!(&env, "Insufficient balance. Required: {}, Available: {}", value, bidder_balance);
            return Err(Error::InsufficientBalance);
        }

        match pay_client.try_transfer(&bidder, &env.current_contract_address(), &value) {
            Ok(_) => {}
            Err(_) => {
                log!(&env, "Escrow transfer failed for amount: {}", value);
                return Err(Error::TokenTransferFailed);
            }
        }

        // Record the admission: supply down, raised funds up, bid appended
        // under the next dense id
        env.storage().instance().set(&REMAINING_KEY, &(remaining - allocated));

        let raised: i128 = env.storage().instance().get(&RAISED_KEY).unwrap();
        env.storage().instance().set(&RAISED_KEY, &(raised + (value - refund_owed)));

        let mut bids: Map<u64, Bid> = env.storage().instance().get(&BIDS_KEY).unwrap();
        let bid_id: u64 = env.storage().instance().get(&NEXT_BID_ID).unwrap();

        let bid = Bid {
            bidder: bidder.clone(),
            value_committed: value,
            price_at_admission: price,
            tokens_allocated: allocated,
            refund_owed,
            claimed: false,
            refund_settled: false,
        };

        bids.set(bid_id, bid);
        env.storage().instance().set(&BIDS_KEY, &bids);
        env.storage().instance().set(&NEXT_BID_ID, &(bid_id + 1));

        let mut bidder_ids: Map<Address, u64> = env.storage().instance().get(&BIDDER_IDS).unwrap();
        bidder_ids.set(bidder.clone(), bid_id);
        env.storage().instance().set(&BIDDER_IDS, &bidder_ids);

        env.events().publish(
            (BID_PLACED, bidder.clone()),
            (bid_id, value, price, allocated),
        );

        // Tokens-exhausted closure: the bid that drains the supply closes
        // the auction on the spot, independent of elapsed time
        if remaining - allocated == 0 {
            Self::_close_now(&env)?;
        }

        Ok(bid_id)
    }

    /// Checks the close condition and closes the auction if it holds.
    /// Anyone can call this; re-invoking it on a Closed auction is a no-op,
    /// so a scheduled closer and the lazy in-band triggers tolerate racing
    /// each other. Returns the status after the check.
    pub fn check_and_close(env: Env) -> Result<AuctionStatus, Error> {
        Self::_try_close(&env)?;
        Ok(Self::_status(&env))
    }

    /// Pays out one bid: the allocated tokens plus any outstanding refund.
    /// Pull-based - the bidder must call this after close; nothing is pushed.
    ///
    /// # Claim Protocol
    /// The claimed and refund-settled flags are set and persisted BEFORE the
    /// external transfers, so a reentrant re-invocation of claim for the same
    /// bid observes claimed == true and fails fast with AlreadyClaimed
    /// instead of re-executing the payout. If either transfer fails, the
    /// flags roll back together with it in the same invocation - the command
    /// fails whole, never leaving flags set with no funds moved.
    ///
    /// # Arguments
    /// * `claimant` - The address claiming (must sign and match the bid's bidder)
    /// * `bid_id` - The bid to pay out
    ///
    /// # Errors
    /// - AuctionNotClosed: If the auction is still open
    /// - BidNotFound: If no bid exists under the id
    /// - Unauthorized: If the claimant is not the bid's bidder
    /// - AlreadyClaimed: If this bid was already paid out
    /// - TokenTransferFailed: If a payout transfer fails (flags rolled back)
    pub fn claim(env: Env, claimant: Address, bid_id: u64) -> Result<(), Error> {
        claimant.require_auth();

        Self::_try_close(&env)?;
        if Self::_status(&env) != AuctionStatus::Closed {
            return Err(Error::AuctionNotClosed);
        }

        let mut bids: Map<u64, Bid> = env.storage().instance().get(&BIDS_KEY).unwrap();
        let mut bid = bids.get(bid_id).ok_or(Error::BidNotFound)?;

        // Ownership check, not trust-by-id: the signer must be the bidder
        if bid.bidder != claimant {
            return Err(Error::Unauthorized);
        }
        if bid.claimed {
            return Err(Error::AlreadyClaimed);
        }

        // The refund may already have been settled by the bulk sweep;
        // in that case this claim moves tokens only
        let refund_due = if bid.refund_settled { 0 } else { bid.refund_owed };
        let prior_refund_settled = bid.refund_settled;

        // Effects before interactions: latch both flags and persist them
        // ahead of any external call
        bid.claimed = true;
        bid.refund_settled = true;
        bids.set(bid_id, bid.clone());
        env.storage().instance().set(&BIDS_KEY, &bids);

        env.events().publish(
            (BID_CLAIMED, claimant.clone()),
            (bid_id, bid.tokens_allocated, refund_due),
        );

        let token_id: Address = env.storage().persistent().get(&TOKEN_KEY).unwrap();
        let token_client = token::Client::new(&env, &token_id);

        if bid.tokens_allocated > 0 {
            match token_client.try_transfer(&env.current_contract_address(), &claimant, &bid.tokens_allocated) {
                Ok(_) => {}
                Err(_) => {
                    log!(&env, "Failed to transfer {} tokens to claimant", bid.tokens_allocated);
                    // Roll the latches back together with the failed transfer
                    bid.claimed = false;
                    bid.refund_settled = prior_refund_settled;
                    bids.set(bid_id, bid);
                    env.storage().instance().set(&BIDS_KEY, &bids);
                    return Err(Error::TokenTransferFailed);
                }
            }
        }

        if refund_due > 0 {
            let pay_token_id: Address = env.storage().persistent().get(&PAY_TOKEN_KEY).unwrap();
            let pay_client = token::Client::new(&env, &pay_token_id);
            match pay_client.try_transfer(&env.current_contract_address(), &claimant, &refund_due) {
                Ok(_) => {}
                Err(_) => {
                    log!(&env, "Failed to refund {} to claimant", refund_due);
                    // Failing the command here reverts the whole invocation,
                    // token transfer included; the latches go back with it
                    bid.claimed = false;
                    bid.refund_settled = prior_refund_settled;
                    bids.set(bid_id, bid);
                    env.storage().instance().set(&BIDS_KEY, &bids);
                    return Err(Error::TokenTransferFailed);
                }
            }
        }

        Ok(())
    }

    /// Pays outstanding refunds for bidders who never claim, in bounded
    /// batches. Anyone can call this after close; each call walks at most
    /// `limit` bids from the stored cursor and can be repeated until the
    /// outstanding-refund set is empty. A single call is never required to
    /// drain the whole bidder list.
    ///
    /// A recipient whose transfer fails is skipped: its refund-settled flag
    /// rolls back, the cursor moves past it, and the individual claim path
    /// remains open to it. One hostile recipient cannot wedge the sweep.
    ///
    /// # Arguments
    /// * `limit` - Maximum number of bids to examine in this call
    ///
    /// # Returns
    /// The number of refunds actually paid in this call
    ///
    /// # Errors
    /// - AuctionNotClosed: If the auction is still open
    pub fn process_refunds(env: Env, limit: u32) -> Result<u32, Error> {
        Self::_try_close(&env)?;
        if Self::_status(&env) != AuctionStatus::Closed {
            return Err(Error::AuctionNotClosed);
        }

        let mut bids: Map<u64, Bid> = env.storage().instance().get(&BIDS_KEY).unwrap();
        let next_id: u64 = env.storage().instance().get(&NEXT_BID_ID).unwrap();
        let mut cursor: u64 = env.storage().instance().get(&REFUND_CURSOR).unwrap_or(0);

        let pay_token_id: Address = env.storage().persistent().get(&PAY_TOKEN_KEY).unwrap();
        let pay_client = token::Client::new(&env, &pay_token_id);

        let mut paid: u32 = 0;
        let mut scanned: u32 = 0;

        while cursor < next_id && scanned < limit {
            let mut bid = bids.get(cursor).unwrap();

            if !bid.claimed && !bid.refund_settled && bid.refund_owed > 0 {
                // Latch before the transfer, same ordering as claim
                bid.refund_settled = true;
                bids.set(cursor, bid.clone());
                env.storage().instance().set(&BIDS_KEY, &bids);

                match pay_client.try_transfer(&env.current_contract_address(), &bid.bidder, &bid.refund_owed) {
                    Ok(_) => {
                        env.events().publish(
                            (REFUND_PAID, bid.bidder.clone()),
                            (cursor, bid.refund_owed),
                        );
                        paid += 1;
                    }
                    Err(_) => {
                        log!(&env, "Refund of {} failed for bid {}", bid.refund_owed, cursor);
                        // Leave this bidder to the individual claim path
                        bid.refund_settled = false;
                        bids.set(cursor, bid);
                        env.storage().instance().set(&BIDS_KEY, &bids);
                    }
                }
            }

            cursor += 1;
            scanned += 1;
        }

        env.storage().instance().set(&REFUND_CURSOR, &cursor);

        Ok(paid)
    }

    /// Transfers the raised funds to the owner after close. One-shot: a
    /// second call fails with ProceedsAlreadyWithdrawn.
    ///
    /// # Errors
    /// - AuctionNotClosed: If the auction is still open
    /// - ProceedsAlreadyWithdrawn: If the proceeds were already collected
    /// - TokenTransferFailed: If the payout fails (the one-shot flag rolls back)
    pub fn withdraw_proceeds(env: Env) -> Result<(), Error> {
        let owner = Self::_require_owner(&env)?;

        Self::_try_close(&env)?;
        if Self::_status(&env) != AuctionStatus::Closed {
            return Err(Error::AuctionNotClosed);
        }

        let withdrawn: bool = env.storage().instance().get(&PROCEEDS_KEY).unwrap_or(false);
        if withdrawn {
            return Err(Error::ProceedsAlreadyWithdrawn);
        }

        let raised: i128 = env.storage().instance().get(&RAISED_KEY).unwrap();

        // Latch before the transfer
        env.storage().instance().set(&PROCEEDS_KEY, &true);

        if raised > 0 {
            let pay_token_id: Address = env.storage().persistent().get(&PAY_TOKEN_KEY).unwrap();
            let pay_client = token::Client::new(&env, &pay_token_id);
            match pay_client.try_transfer(&env.current_contract_address(), &owner, &raised) {
                Ok(_) => {}
                Err(_) => {
                    log!(&env, "Failed to withdraw {} to owner", raised);
                    env.storage().instance().set(&PROCEEDS_KEY, &false);
                    return Err(Error::TokenTransferFailed);
                }
            }
        }

        env.events().publish(
            (PROCEEDS_WITHDRAWN, owner),
            (raised,),
        );

        Ok(())
    }

    // ================================================================================================
    // QUERY FUNCTIONS (GETTERS)
    // ================================================================================================
    // Read-only snapshots for any presentation layer. Getters report the
    // EFFECTIVE status - an Open auction whose close condition already holds
    // reads as Closed - without writing storage, so reads never block a
    // writer; the actual transition happens on the next command.

    /// Internal helper computing the effective status without mutation.
    fn _effective_status(env: &Env) -> AuctionStatus {
        let status = Self::_status(env);
        if status == AuctionStatus::Open && Self::_close_condition_met(env) {
            AuctionStatus::Closed
        } else {
            status
        }
    }

    /// Returns the effective lifecycle status.
    pub fn get_status(env: Env) -> AuctionStatus {
        Self::_effective_status(&env)
    }

    /// Returns the unit price currently in effect.
    /// Before the auction starts this is the opening price; afterwards it is
    /// the decayed price, pinned to the reserve once the duration elapses.
    pub fn get_current_price(env: Env) -> i128 {
        match Self::_status(&env) {
            AuctionStatus::NotStarted => {
                env.storage().persistent().get(&START_PRICE_KEY).unwrap()
            }
            _ => Self::_price_at(&env, env.ledger().timestamp()),
        }
    }

    /// Returns the unallocated token count (the full supply before start).
    pub fn get_remaining_tokens(env: Env) -> i128 {
        env.storage().instance().get(&REMAINING_KEY).unwrap_or(0)
    }

    /// Returns the funds raised so far, net of recorded refunds.
    pub fn get_total_funds_raised(env: Env) -> i128 {
        env.storage().instance().get(&RAISED_KEY).unwrap_or(0)
    }

    /// Returns the seconds left until the duration-based close.
    /// The full duration before start, zero once effectively Closed.
    pub fn get_time_remaining(env: Env) -> u64 {
        let duration: u64 = env.storage().persistent().get(&DURATION_KEY).unwrap();
        match Self::_effective_status(&env) {
            AuctionStatus::NotStarted | AuctionStatus::Paused => duration,
            AuctionStatus::Open => {
                let start_ts: u64 = env.storage().instance().get(&START_TS_KEY).unwrap();
                duration.saturating_sub(env.ledger().timestamp().saturating_sub(start_ts))
            }
            AuctionStatus::Closed => 0,
        }
    }

    /// Returns a specific bid by its id, or None if no such bid exists.
    pub fn get_bid(env: Env, bid_id: u64) -> Option<Bid> {
        let bids: Map<u64, Bid> = env.storage().instance().get(&BIDS_KEY).unwrap();
        bids.get(bid_id)
    }

    /// Returns the latest bid id recorded for a bidder, or None if the
    /// address never bid.
    pub fn get_bidder_id(env: Env, bidder: Address) -> Option<u64> {
        let bidder_ids: Map<Address, u64> = env.storage().instance().get(&BIDDER_IDS).unwrap();
        bidder_ids.get(bidder)
    }

    /// Returns all bids keyed by id.
    /// Warning: This function can be expensive for large bid lists; prefer
    /// `get_bid` for specific lookups.
    pub fn get_bids(env: Env) -> Map<u64, Bid> {
        env.storage().instance().get(&BIDS_KEY).unwrap()
    }

    /// Returns the next bid id that will be assigned. Ids are dense, so
    /// this doubles as the count of admitted bids.
    pub fn get_next_bid_id(env: Env) -> u64 {
        env.storage().instance().get(&NEXT_BID_ID).unwrap()
    }

    /// Returns the number of distinct addresses that have placed a bid.
    pub fn get_total_bidders(env: Env) -> u32 {
        let bidder_ids: Map<Address, u64> = env.storage().instance().get(&BIDDER_IDS).unwrap();
        bidder_ids.len()
    }

    /// Returns the resume position of the bulk refund sweep.
    pub fn get_refund_cursor(env: Env) -> u64 {
        env.storage().instance().get(&REFUND_CURSOR).unwrap_or(0)
    }

    /// Returns the auction owner address.
    pub fn get_owner(env: Env) -> Address {
        env.storage().persistent().get(&OWNER_KEY).unwrap()
    }

    /// Returns the auctioned token contract address.
    pub fn get_token(env: Env) -> Address {
        env.storage().persistent().get(&TOKEN_KEY).unwrap()
    }

    /// Returns the payment token contract address.
    pub fn get_payment_token(env: Env) -> Address {
        env.storage().persistent().get(&PAY_TOKEN_KEY).unwrap()
    }

    /// Returns whether the burn-on-close finalization has executed.
    pub fn is_settled(env: Env) -> bool {
        env.storage().instance().get(&SETTLED_KEY).unwrap_or(false)
    }

    /// Returns the full auction configuration in one call.
    ///
    /// # Returns
    /// Tuple containing:
    /// (owner, token, payment_token, start_price, reserve_price,
    ///  price_decrement_per_minute, duration_seconds, total_supply)
    pub fn get_auction_info(env: Env) -> (Address, Address, Address, i128, i128, i128, u64, i128) {
        (
            Self::get_owner(env.clone()),
            Self::get_token(env.clone()),
            Self::get_payment_token(env.clone()),
            env.storage().persistent().get(&START_PRICE_KEY).unwrap(),
            env.storage().persistent().get(&RESERVE_PRICE_KEY).unwrap(),
            env.storage().persistent().get(&DECREMENT_KEY).unwrap(),
            env.storage().persistent().get(&DURATION_KEY).unwrap(),
            env.storage().persistent().get(&SUPPLY_KEY).unwrap_or(0),
        )
    }
}
