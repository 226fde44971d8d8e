//! Snootboop Stake Game Contract
//!
//! Participants deposit stake tokens into a shared pool and are ranked by
//! balance, descending, with ties broken by insertion order. Each tick an
//! authorized keeper advances the game: the tick counter is reduced to a
//! bounded index (see `snootboop-shared`) and every rank that divides the
//! index, or that the index divides, wins an equal share of that tick's
//! reward drawdown. Winnings accrue as a pending balance claimable at any
//! time.
//!
//! ## Storage Strategy
//! - `instance()`: Admin, token addresses, player cap, pause flag, keeper
//!   grants. Small, fixed-size contract config.
//! - `persistent()`: pool counters, the tick counter, rank order, and
//!   per-player entries; each is a separate ledger entry with its own TTL,
//!   bumped on every write.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, token::TokenClient,
    Address, Env, Vec,
};

use snootboop_shared::{is_winning_rank, reduce_tick};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

// ---------------------------------------------------------------------------
// Error Types
// ---------------------------------------------------------------------------

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    NotAuthorized = 3,
    ContractPaused = 4,
    InvalidAmount = 5,
    InsufficientBalance = 6,
    PlayerNotFound = 7,
    MaxPlayersReached = 8,
    Overflow = 9,
    AlreadyPaused = 10,
    NotPaused = 11,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

#[contracttype]
pub enum DataKey {
    // --- instance() ---
    Admin,
    StakeToken,
    RewardToken,
    MaxPlayers,
    Paused,
    /// Addresses allowed to drive `advance_tick`.
    Keeper(Address),
    // --- persistent() ---
    RewardPool,
    RewardRate,
    Tick,
    TotalDistributed,
    /// Monotonic insertion counter used as the rank tie-break.
    NextSeq,
    /// Rank order, best balance first.
    Rankings,
    Player(Address),
}

/// Per-participant record. Created on first stake, removed when the staked
/// balance returns to zero.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlayerData {
    pub balance: i128,
    pub pending: i128,
    pub lifetime: i128,
    pub win_count: u32,
    /// Insertion order; earlier entrants rank above later ones on equal
    /// balances and the order never re-randomizes.
    pub seq: u32,
}

/// Snapshot returned by `get_pool_stats`.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PoolStats {
    pub reward_pool: i128,
    pub reward_rate: i128,
    pub tick: u64,
    pub total_distributed: i128,
    pub player_count: u32,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct StakeDeposited {
    #[topic]
    pub player: Address,
    pub amount: i128,
    pub balance: i128,
}

#[contractevent]
pub struct StakeWithdrawn {
    #[topic]
    pub player: Address,
    pub amount: i128,
    pub balance: i128,
}

#[contractevent]
pub struct RewardPoolFunded {
    #[topic]
    pub from: Address,
    pub amount: i128,
}

#[contractevent]
pub struct RewardRateChanged {
    pub rate: i128,
}

#[contractevent]
pub struct TickAdvanced {
    #[topic]
    pub tick: u64,
    pub reduced_index: u64,
    pub winner_count: u32,
    pub distributed: i128,
}

#[contractevent]
pub struct PendingClaimed {
    #[topic]
    pub player: Address,
    pub amount: i128,
}

#[contractevent]
pub struct PauseChanged {
    pub paused: bool,
    pub admin: Address,
}

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

#[contract]
pub struct StakeGame;

#[contractimpl]
impl StakeGame {
    /// Initialize the game. May only be called once.
    ///
    /// Stake and reward assets are SEP-41 contract addresses. The admin is
    /// also the initial tick keeper.
    pub fn init(
        env: Env,
        admin: Address,
        stake_token: Address,
        reward_token: Address,
        max_players: u32,
        reward_rate: i128,
    ) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Admin) {
            return Err(Error::AlreadyInitialized);
        }
        if max_players == 0 || reward_rate < 0 {
            return Err(Error::InvalidAmount);
        }

        admin.require_auth();

        env.storage().instance().set(&DataKey::Admin, &admin);
        env.storage().instance().set(&DataKey::StakeToken, &stake_token);
        env.storage().instance().set(&DataKey::RewardToken, &reward_token);
        env.storage().instance().set(&DataKey::MaxPlayers, &max_players);
        env.storage().instance().set(&DataKey::Paused, &false);
        env.storage().instance().set(&DataKey::Keeper(admin), &true);

        set_persistent_i128(&env, DataKey::RewardPool, 0);
        set_persistent_i128(&env, DataKey::RewardRate, reward_rate);
        set_persistent_i128(&env, DataKey::TotalDistributed, 0);
        env.storage().persistent().set(&DataKey::Tick, &0u64);
        env.storage().persistent().set(&DataKey::NextSeq, &0u32);
        env.storage()
            .persistent()
            .set(&DataKey::Rankings, &Vec::<Address>::new(&env));

        Ok(())
    }

    /// Authorize or deauthorize an address to advance ticks.
    pub fn set_keeper(env: Env, admin: Address, addr: Address, allowed: bool) -> Result<(), Error> {
        require_admin(&env, &admin)?;
        env.storage().instance().set(&DataKey::Keeper(addr), &allowed);
        Ok(())
    }

    /// Stake `amount` tokens. Creates the participant on first stake and
    /// re-derives the rank order.
    pub fn deposit(env: Env, player: Address, amount: i128) -> Result<(), Error> {
        require_initialized(&env)?;
        require_not_paused(&env)?;
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        player.require_auth();

        let mut rankings = get_rankings(&env);
        let mut data = match get_player(&env, &player) {
            Some(data) => data,
            None => {
                let max_players: u32 = env
                    .storage()
                    .instance()
                    .get(&DataKey::MaxPlayers)
                    .unwrap_or(0);
                if rankings.len() >= max_players {
                    return Err(Error::MaxPlayersReached);
                }
                let seq: u32 = env.storage().persistent().get(&DataKey::NextSeq).unwrap_or(0);
                env.storage()
                    .persistent()
                    .set(&DataKey::NextSeq, &(seq + 1));
                PlayerData {
                    balance: 0,
                    pending: 0,
                    lifetime: 0,
                    win_count: 0,
                    seq,
                }
            }
        };

        data.balance = data.balance.checked_add(amount).ok_or(Error::Overflow)?;

        reinsert_ranked(&env, &mut rankings, &player, &data);
        save_rankings(&env, &rankings);
        save_player(&env, &player, &data);

        let stake_token = get_token(&env, DataKey::StakeToken);
        TokenClient::new(&env, &stake_token).transfer(
            &player,
            &env.current_contract_address(),
            &amount,
        );

        StakeDeposited {
            player,
            amount,
            balance: data.balance,
        }
        .publish(&env);

        Ok(())
    }

    /// Unstake `amount` tokens.
    ///
    /// Pending accrual is flushed (paid out) before the balance changes, so
    /// rewards already earned at the current rank are not lost to the rank
    /// change. A participant whose balance reaches zero is removed entirely.
    pub fn withdraw(env: Env, player: Address, amount: i128) -> Result<(), Error> {
        require_initialized(&env)?;
        require_not_paused(&env)?;
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        player.require_auth();

        let mut data = get_player(&env, &player).ok_or(Error::PlayerNotFound)?;
        if amount > data.balance {
            return Err(Error::InsufficientBalance);
        }

        let flushed = data.pending;
        data.pending = 0;
        data.balance -= amount;

        let mut rankings = get_rankings(&env);
        remove_from_rankings(&mut rankings, &player);
        if data.balance == 0 {
            env.storage()
                .persistent()
                .remove(&DataKey::Player(player.clone()));
        } else {
            reinsert_ranked(&env, &mut rankings, &player, &data);
            save_player(&env, &player, &data);
        }
        save_rankings(&env, &rankings);

        // State is settled; transfers come last.
        if flushed > 0 {
            let reward_token = get_token(&env, DataKey::RewardToken);
            TokenClient::new(&env, &reward_token).transfer(
                &env.current_contract_address(),
                &player,
                &flushed,
            );
            PendingClaimed {
                player: player.clone(),
                amount: flushed,
            }
            .publish(&env);
        }

        let stake_token = get_token(&env, DataKey::StakeToken);
        TokenClient::new(&env, &stake_token).transfer(
            &env.current_contract_address(),
            &player,
            &amount,
        );

        StakeWithdrawn {
            player,
            amount,
            balance: data.balance,
        }
        .publish(&env);

        Ok(())
    }

    /// Top up the reward pool. Any address may fund it.
    pub fn deposit_rewards(env: Env, from: Address, amount: i128) -> Result<(), Error> {
        require_initialized(&env)?;
        require_not_paused(&env)?;
        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }

        from.require_auth();

        let pool = get_persistent_i128(&env, DataKey::RewardPool)
            .checked_add(amount)
            .ok_or(Error::Overflow)?;
        set_persistent_i128(&env, DataKey::RewardPool, pool);

        let reward_token = get_token(&env, DataKey::RewardToken);
        TokenClient::new(&env, &reward_token).transfer(
            &from,
            &env.current_contract_address(),
            &amount,
        );

        RewardPoolFunded { from, amount }.publish(&env);

        Ok(())
    }

    /// Set the per-tick reward drawdown rate. Admin only.
    pub fn set_reward_rate(env: Env, admin: Address, rate: i128) -> Result<(), Error> {
        require_admin(&env, &admin)?;
        require_not_paused(&env)?;
        if rate < 0 {
            return Err(Error::InvalidAmount);
        }
        set_persistent_i128(&env, DataKey::RewardRate, rate);
        RewardRateChanged { rate }.publish(&env);
        Ok(())
    }

    /// Advance the game by one tick, accruing that tick's rewards.
    ///
    /// `reward = min(rate, pool)` is split evenly (floor division) across the
    /// tick's winner set; the division remainder stays in the pool. Ticks with
    /// no reward or no participants still advance the counter.
    pub fn advance_tick(env: Env, keeper: Address) -> Result<(), Error> {
        require_initialized(&env)?;
        require_not_paused(&env)?;

        keeper.require_auth();
        if !env
            .storage()
            .instance()
            .get(&DataKey::Keeper(keeper))
            .unwrap_or(false)
        {
            return Err(Error::NotAuthorized);
        }

        let tick: u64 = env.storage().persistent().get(&DataKey::Tick).unwrap_or(0);
        env.storage().persistent().set(&DataKey::Tick, &(tick + 1));
        env.storage().persistent().extend_ttl(
            &DataKey::Tick,
            PERSISTENT_BUMP_LEDGERS,
            PERSISTENT_BUMP_LEDGERS,
        );

        let rankings = get_rankings(&env);
        let pool = get_persistent_i128(&env, DataKey::RewardPool);
        let rate = get_persistent_i128(&env, DataKey::RewardRate);
        let reward = if rate < pool { rate } else { pool };

        if reward <= 0 || rankings.is_empty() {
            TickAdvanced {
                tick,
                reduced_index: 0,
                winner_count: 0,
                distributed: 0,
            }
            .publish(&env);
            return Ok(());
        }

        let max_players: u32 = env
            .storage()
            .instance()
            .get(&DataKey::MaxPlayers)
            .unwrap_or(0);
        let active = if rankings.len() < max_players {
            rankings.len()
        } else {
            max_players
        };
        let reduced = reduce_tick(tick, active);

        let mut winners = Vec::<Address>::new(&env);
        for i in 0..rankings.len() {
            if is_winning_rank(i + 1, reduced) {
                winners.push_back(rankings.get_unchecked(i));
            }
        }

        let mut distributed: i128 = 0;
        if !winners.is_empty() {
            let share = reward / winners.len() as i128;
            if share > 0 {
                for winner in winners.iter() {
                    let mut data = get_player(&env, &winner).ok_or(Error::PlayerNotFound)?;
                    data.pending = data.pending.checked_add(share).ok_or(Error::Overflow)?;
                    data.lifetime = data.lifetime.checked_add(share).ok_or(Error::Overflow)?;
                    data.win_count += 1;
                    save_player(&env, &winner, &data);
                }
                distributed = share
                    .checked_mul(winners.len() as i128)
                    .ok_or(Error::Overflow)?;
                set_persistent_i128(&env, DataKey::RewardPool, pool - distributed);
                let total = get_persistent_i128(&env, DataKey::TotalDistributed)
                    .checked_add(distributed)
                    .ok_or(Error::Overflow)?;
                set_persistent_i128(&env, DataKey::TotalDistributed, total);
            }
        }

        TickAdvanced {
            tick,
            reduced_index: reduced,
            winner_count: winners.len(),
            distributed,
        }
        .publish(&env);

        Ok(())
    }

    /// Claim the caller's accrued pending rewards. Claiming with nothing
    /// pending (or without ever having staked) is a no-op returning 0.
    pub fn claim_pending(env: Env, player: Address) -> Result<i128, Error> {
        require_initialized(&env)?;
        require_not_paused(&env)?;

        player.require_auth();

        let mut data = match get_player(&env, &player) {
            Some(data) => data,
            None => return Ok(0),
        };
        let amount = data.pending;
        if amount == 0 {
            return Ok(0);
        }

        data.pending = 0;
        save_player(&env, &player, &data);

        let reward_token = get_token(&env, DataKey::RewardToken);
        TokenClient::new(&env, &reward_token).transfer(
            &env.current_contract_address(),
            &player,
            &amount,
        );

        PendingClaimed { player, amount }.publish(&env);

        Ok(amount)
    }

    /// Halt every mutating entry point. Admin only.
    pub fn pause(env: Env, admin: Address) -> Result<(), Error> {
        require_admin(&env, &admin)?;
        if is_paused(&env) {
            return Err(Error::AlreadyPaused);
        }
        env.storage().instance().set(&DataKey::Paused, &true);
        PauseChanged {
            paused: true,
            admin,
        }
        .publish(&env);
        Ok(())
    }

    /// Resume normal operation. Admin only.
    pub fn unpause(env: Env, admin: Address) -> Result<(), Error> {
        require_admin(&env, &admin)?;
        if !is_paused(&env) {
            return Err(Error::NotPaused);
        }
        env.storage().instance().set(&DataKey::Paused, &false);
        PauseChanged {
            paused: false,
            admin,
        }
        .publish(&env);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read API
    // -----------------------------------------------------------------------

    /// Current rank order, best balance first.
    pub fn get_rankings(env: Env) -> Vec<Address> {
        get_rankings(&env)
    }

    /// A player's rank (1-indexed), or 0 if not currently staked.
    pub fn get_rank(env: Env, player: Address) -> u32 {
        let rankings = get_rankings(&env);
        for i in 0..rankings.len() {
            if rankings.get_unchecked(i) == player {
                return i + 1;
            }
        }
        0
    }

    /// A player's stats; zeroed stats if the player has never staked.
    pub fn get_player(env: Env, player: Address) -> PlayerData {
        get_player(&env, &player).unwrap_or(PlayerData {
            balance: 0,
            pending: 0,
            lifetime: 0,
            win_count: 0,
            seq: 0,
        })
    }

    /// Point-in-time pool statistics.
    pub fn get_pool_stats(env: Env) -> PoolStats {
        PoolStats {
            reward_pool: get_persistent_i128(&env, DataKey::RewardPool),
            reward_rate: get_persistent_i128(&env, DataKey::RewardRate),
            tick: env.storage().persistent().get(&DataKey::Tick).unwrap_or(0),
            total_distributed: get_persistent_i128(&env, DataKey::TotalDistributed),
            player_count: get_rankings(&env).len(),
        }
    }

    /// The ranks that would win a given tick with the current participant
    /// count. Selection is a pure function of (tick, active count).
    pub fn preview_winning_ranks(env: Env, tick: u64) -> Vec<u32> {
        let rankings = get_rankings(&env);
        let max_players: u32 = env
            .storage()
            .instance()
            .get(&DataKey::MaxPlayers)
            .unwrap_or(0);
        let active = if rankings.len() < max_players {
            rankings.len()
        } else {
            max_players
        };
        let reduced = reduce_tick(tick, active);
        let mut ranks = Vec::<u32>::new(&env);
        for rank in 1..=rankings.len() {
            if is_winning_rank(rank, reduced) {
                ranks.push_back(rank);
            }
        }
        ranks
    }

    /// Whether the game is currently paused.
    pub fn is_paused(env: Env) -> bool {
        is_paused(&env)
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Admin) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

fn require_admin(env: &Env, caller: &Address) -> Result<(), Error> {
    let admin: Address = env
        .storage()
        .instance()
        .get(&DataKey::Admin)
        .ok_or(Error::NotInitialized)?;
    caller.require_auth();
    if caller != &admin {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

fn require_not_paused(env: &Env) -> Result<(), Error> {
    if is_paused(env) {
        return Err(Error::ContractPaused);
    }
    Ok(())
}

fn is_paused(env: &Env) -> bool {
    env.storage()
        .instance()
        .get(&DataKey::Paused)
        .unwrap_or(false)
}

fn get_token(env: &Env, key: DataKey) -> Address {
    env.storage()
        .instance()
        .get(&key)
        .expect("StakeGame: token not set")
}

fn get_player(env: &Env, player: &Address) -> Option<PlayerData> {
    env.storage()
        .persistent()
        .get(&DataKey::Player(player.clone()))
}

fn save_player(env: &Env, player: &Address, data: &PlayerData) {
    let key = DataKey::Player(player.clone());
    env.storage().persistent().set(&key, data);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

fn get_rankings(env: &Env) -> Vec<Address> {
    env.storage()
        .persistent()
        .get(&DataKey::Rankings)
        .unwrap_or_else(|| Vec::new(env))
}

fn save_rankings(env: &Env, rankings: &Vec<Address>) {
    env.storage().persistent().set(&DataKey::Rankings, rankings);
    env.storage().persistent().extend_ttl(
        &DataKey::Rankings,
        PERSISTENT_BUMP_LEDGERS,
        PERSISTENT_BUMP_LEDGERS,
    );
}

fn remove_from_rankings(rankings: &mut Vec<Address>, player: &Address) {
    for i in 0..rankings.len() {
        if &rankings.get_unchecked(i) == player {
            rankings.remove(i);
            break;
        }
    }
}

/// Place `player` at its rank: descending balance, earlier insertion sequence
/// first on ties. Removes any stale entry before inserting.
fn reinsert_ranked(env: &Env, rankings: &mut Vec<Address>, player: &Address, data: &PlayerData) {
    remove_from_rankings(rankings, player);

    let mut inserted = false;
    for i in 0..rankings.len() {
        let other: PlayerData = env
            .storage()
            .persistent()
            .get(&DataKey::Player(rankings.get_unchecked(i)))
            .expect("StakeGame: ranked player missing");
        if data.balance > other.balance || (data.balance == other.balance && data.seq < other.seq) {
            rankings.insert(i, player.clone());
            inserted = true;
            break;
        }
    }
    if !inserted {
        rankings.push_back(player.clone());
    }
}

fn get_persistent_i128(env: &Env, key: DataKey) -> i128 {
    env.storage().persistent().get(&key).unwrap_or(0)
}

fn set_persistent_i128(env: &Env, key: DataKey, value: i128) {
    env.storage().persistent().set(&key, &value);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test;
