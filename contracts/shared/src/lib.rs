//! Shared winner-selection math for the Snootboop contracts.
//!
//! The tick reduction and divisibility rule below drive every reward tick in
//! the stake-game contract. They are kept in a plain helper crate, free of any
//! `Env`, so the arithmetic can be unit tested directly.
#![no_std]
#![allow(unexpected_cfgs)]

/// Index returned when the reduction collapses to nothing usable: an empty
/// participant set, a tick of all zeros, or a reduction that lands on zero
/// twice. Even, so rank 1 never wins a fallback tick.
pub const EMPTY_FALLBACK_INDEX: u64 = 2;

/// Index substituted when the reduction lands on exactly 1.
pub const UNIT_FALLBACK_INDEX: u64 = 3;

/// Reduce a monotonic tick counter to a bounded winner-selection index.
///
/// The reduction strips trailing zeros, then repeatedly discards the leading
/// digit until the value drops below `active_count`. The fallback branches are
/// part of the selection rule's observable behavior and must stay literal:
///
/// 1. `active_count == 0` yields 2.
/// 2. A tick that collapses to 0 after trailing-zero stripping yields 2.
/// 3. If digit stripping reaches 0, the index becomes
///    `trimmed % active_count`; if that is again 0, it yields 2.
/// 4. A final index of exactly 1 yields 3.
pub fn reduce_tick(tick: u64, active_count: u32) -> u64 {
    if active_count == 0 {
        return EMPTY_FALLBACK_INDEX;
    }

    let mut trimmed = tick;
    while trimmed > 0 && trimmed % 10 == 0 {
        trimmed /= 10;
    }
    if trimmed == 0 {
        return EMPTY_FALLBACK_INDEX;
    }

    let cap = active_count as u64;
    let mut reduced = trimmed;
    while reduced >= cap {
        reduced = drop_leading_digit(reduced);
    }

    if reduced == 0 {
        reduced = trimmed % cap;
        if reduced == 0 {
            return EMPTY_FALLBACK_INDEX;
        }
    }

    if reduced == 1 {
        return UNIT_FALLBACK_INDEX;
    }

    reduced
}

/// Whether `rank` (1-indexed) wins the tick with the given reduced index.
///
/// Rank 1 wins only on odd indices. Any other rank wins when either value
/// divides the other, so several ranks usually win the same tick.
pub fn is_winning_rank(rank: u32, reduced: u64) -> bool {
    if rank == 0 {
        return false;
    }
    let rank = rank as u64;
    if rank == 1 {
        return reduced % 2 == 1;
    }
    reduced % rank == 0 || rank % reduced == 0
}

/// Remove the most significant digit: 784 -> 84, 9 -> 0.
fn drop_leading_digit(n: u64) -> u64 {
    if n < 10 {
        return 0;
    }
    let mut magnitude = 1u64;
    while n / magnitude >= 10 {
        magnitude *= 10;
    }
    n % magnitude
}
