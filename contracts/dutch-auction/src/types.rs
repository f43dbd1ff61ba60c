/*!
 * Type Definitions for the Dutch Token Auction Contract
 *
 * This module defines the data structures, enums, and constants used throughout
 * the auction contract. Each type models one aspect of the descending-price
 * sale: the lifecycle status, the per-bid settlement record, and the error and
 * event vocabulary exposed to callers.
 */

use soroban_sdk::{contracterror, contracttype, Address, Symbol, symbol_short};

// ================================================================================================
// CORE DATA STRUCTURES
// ================================================================================================

/// A single admitted bid and its settlement record.
///
/// A bid is created once, at admission time, at the unit price in effect at
/// that instant. Token allocation happens immediately: the requested quantity
/// is `value_committed / price_at_admission` (floor division), clamped to the
/// remaining supply when the bid would overshoot it. Whatever part of the
/// committed value did not buy tokens (the unfilled remainder of a partial
/// fill, or the sub-price rounding dust of a full fill) is recorded as
/// `refund_owed` and paid back through `claim` or the bulk refund sweep.
///
/// # Mutability
/// Every field except `claimed` and `refund_settled` is immutable after
/// admission. Each flag can flip false → true exactly once; they are the
/// one-shot latches the claim protocol checks before moving any funds.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bid {
    /// The address that placed and escrowed this bid.
    /// Only this address can claim the allocated tokens and refund.
    pub bidder: Address,

    /// Amount of the payment token escrowed with the contract at admission.
    pub value_committed: i128,

    /// Unit price in effect at the moment the bid was accepted.
    /// Always at or above the reserve price.
    pub price_at_admission: i128,

    /// Auction tokens allocated to this bid, fixed at admission.
    /// May be less than requested when the bid exhausted the supply.
    pub tokens_allocated: i128,

    /// Escrowed value not converted into tokens: the unfilled portion of a
    /// partial fill plus any rounding dust. Owed back to the bidder.
    pub refund_owed: i128,

    /// Set once the bidder has claimed tokens (and refund) after close.
    pub claimed: bool,

    /// Set once `refund_owed` has been paid out, either through `claim`
    /// or through the bulk refund sweep.
    pub refund_settled: bool,
}

// ================================================================================================
// ENUMERATIONS
// ================================================================================================

/// Lifecycle status of the auction.
///
/// # State Transition Rules
/// - NotStarted → Open (explicit `start` by the owner)
/// - Open → Closed (sell-out, elapsed duration, or explicit `check_and_close`)
/// - Closed → Closed (re-triggering close is a no-op, never an error)
///
/// Closing is one-way. Bids exist only while Open; claims only once Closed.
#[contracttype]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuctionStatus {
    /// Configured but not yet started. No bids, no price decay.
    NotStarted,

    /// Accepting bids at the current decayed price.
    Open,

    /// Reserved status with no reachable transition. Kept in the public
    /// enumeration for API stability; no entry point sets or clears it.
    Paused,

    /// Bidding is over. Unsold supply is burned; bidders claim tokens and
    /// refunds. This is a final state.
    Closed,
}

// ================================================================================================
// ERROR DEFINITIONS
// ================================================================================================

/// Error types for every failure scenario in the auction.
///
/// Each error carries a unique numeric code for programmatic handling by
/// clients. No rejected command is silently swallowed; every entry point
/// reports a distinguishing reason.
///
/// # Error Code Ranges
/// - 1-4: lifecycle errors (wrong status, double start)
/// - 5-9: bid admission errors
/// - 10-13: claim errors
/// - 14-16: token and financial errors
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // ========== Lifecycle Errors (1-4) ==========

    /// The auction has already been started; `start` must not reset state.
    AlreadyStarted = 1,

    /// Operation requires a started auction.
    AuctionNotStarted = 2,

    /// Bid admission requires the auction to be Open.
    AuctionNotOpen = 3,

    /// Claims and settlement require the auction to be Closed.
    AuctionNotClosed = 4,

    // ========== Bid Admission Errors (5-9) ==========

    /// The contract owner can never place a bid, in any auction state.
    OwnerCannotBid = 5,

    /// A bid must commit a strictly positive value.
    ZeroBidValue = 6,

    /// Every token has been allocated; the auction closed by sell-out.
    SoldOut = 7,

    /// The bidder does not hold enough of the payment token to escrow
    /// the committed value.
    InsufficientBalance = 8,

    /// Configuration parameters are out of range (reserve above start
    /// price, zero duration, non-positive supply).
    InvalidConfig = 9,

    // ========== Claim Errors (10-13) ==========

    /// No bid exists under the requested id.
    BidNotFound = 10,

    /// Caller identity does not match the bid's bidder, or is not
    /// permitted to perform an owner-only operation.
    Unauthorized = 11,

    /// The bid has already been claimed; tokens and refund moved at most
    /// once no matter how often `claim` is retried.
    AlreadyClaimed = 12,

    /// The raised funds have already been withdrawn by the owner.
    ProceedsAlreadyWithdrawn = 13,

    // ========== Token and Financial Errors (14-16) ==========

    /// A token transfer (escrow, payout, refund, or burn) failed. Any
    /// settlement flags set in the same command are rolled back with it.
    TokenTransferFailed = 14,

    /// The contract does not hold enough of the auction token to cover
    /// the supply being put up for sale.
    InsufficientSupply = 15,

    /// Provided address is not a valid token contract.
    InvalidTokenAddress = 16,
}

// ================================================================================================
// EVENT CONSTANTS
// ================================================================================================
// Topics for the events published on every observable state change, enabling
// off-chain indexing of the auction's progress.

/// Auction opened for bidding.
/// Contains: (total_tokens, start_price, start_timestamp)
pub const AUCTION_STARTED: Symbol = symbol_short!("auc_strt");

/// A bid was admitted to the ledger.
/// Contains: (bid_id, value_committed, price_at_admission, tokens_allocated)
pub const BID_PLACED: Symbol = symbol_short!("bid_plcd");

/// The auction transitioned to Closed.
/// Contains: (remaining_tokens, total_funds_raised)
pub const AUCTION_CLOSED: Symbol = symbol_short!("auc_clsd");

/// Unsold supply was irrecoverably destroyed at close.
/// Contains: (burned_amount,)
pub const TOKENS_BURNED: Symbol = symbol_short!("tok_burn");

/// A bidder claimed allocated tokens (and any refund).
/// Contains: (bid_id, tokens_allocated, refund_paid)
pub const BID_CLAIMED: Symbol = symbol_short!("bid_clmd");

/// A refund was paid through the bulk sweep.
/// Contains: (bid_id, refund_paid)
pub const REFUND_PAID: Symbol = symbol_short!("rfnd_paid");

/// The owner withdrew the raised funds after close.
/// Contains: (amount,)
pub const PROCEEDS_WITHDRAWN: Symbol = symbol_short!("prcds_wd");
