#![cfg(test)]

use super::*;
use soroban_sdk::{
    testutils::Address as _,
    token::{StellarAssetClient, TokenClient},
    Address, Env,
};

const RATE: i128 = 10;

fn setup_with(env: &Env, max_players: u32, rate: i128) -> (StakeGameClient<'_>, Address, Address, Address) {
    let admin = Address::generate(env);
    let token_admin = Address::generate(env);
    let stake = env.register_stellar_asset_contract_v2(token_admin.clone());
    let reward = env.register_stellar_asset_contract_v2(token_admin);

    let contract_id = env.register(StakeGame, ());
    let client = StakeGameClient::new(env, &contract_id);

    env.mock_all_auths();
    client.init(&admin, &stake.address(), &reward.address(), &max_players, &rate);

    (client, admin, stake.address(), reward.address())
}

fn setup(env: &Env) -> (StakeGameClient<'_>, Address, Address, Address) {
    setup_with(env, 100, RATE)
}

fn mint(env: &Env, token: &Address, to: &Address, amount: i128) {
    StellarAssetClient::new(env, token).mint(to, &amount);
}

/// Register a player with a starting stake balance and deposit it.
fn staked_player(
    env: &Env,
    client: &StakeGameClient<'_>,
    stake_token: &Address,
    amount: i128,
) -> Address {
    let player = Address::generate(env);
    mint(env, stake_token, &player, amount);
    client.deposit(&player, &amount);
    player
}

// ---------------------------------------------------------------------------
// init
// ---------------------------------------------------------------------------

#[test]
fn test_init_rejects_reinit() {
    let env = Env::default();
    let (client, admin, stake, reward) = setup(&env);
    let result = client.try_init(&admin, &stake, &reward, &100u32, &RATE);
    assert!(result.is_err());
}

#[test]
fn test_init_rejects_zero_player_cap() {
    let env = Env::default();
    let admin = Address::generate(&env);
    let token_admin = Address::generate(&env);
    let stake = env.register_stellar_asset_contract_v2(token_admin.clone());
    let reward = env.register_stellar_asset_contract_v2(token_admin);
    let contract_id = env.register(StakeGame, ());
    let client = StakeGameClient::new(&env, &contract_id);
    env.mock_all_auths();

    let result = client.try_init(&admin, &stake.address(), &reward.address(), &0u32, &RATE);
    assert_eq!(result, Err(Ok(Error::InvalidAmount)));
}

// ---------------------------------------------------------------------------
// Ranking
// ---------------------------------------------------------------------------

#[test]
fn test_rankings_descend_by_balance() {
    let env = Env::default();
    let (client, _, stake, _) = setup(&env);

    let p1 = staked_player(&env, &client, &stake, 100);
    let p2 = staked_player(&env, &client, &stake, 300);
    let p3 = staked_player(&env, &client, &stake, 200);

    let rankings = client.get_rankings();
    assert_eq!(rankings.len(), 3);
    assert_eq!(rankings.get_unchecked(0), p2);
    assert_eq!(rankings.get_unchecked(1), p3);
    assert_eq!(rankings.get_unchecked(2), p1);

    assert_eq!(client.get_rank(&p2), 1);
    assert_eq!(client.get_rank(&p3), 2);
    assert_eq!(client.get_rank(&p1), 3);
}

#[test]
fn test_equal_balances_break_ties_by_insertion_order() {
    let env = Env::default();
    let (client, _, stake, _) = setup(&env);

    let first = staked_player(&env, &client, &stake, 100);
    let second = staked_player(&env, &client, &stake, 100);
    let third = staked_player(&env, &client, &stake, 100);

    let rankings = client.get_rankings();
    assert_eq!(rankings.get_unchecked(0), first);
    assert_eq!(rankings.get_unchecked(1), second);
    assert_eq!(rankings.get_unchecked(2), third);

    // Overtaking on balance does reorder.
    mint(&env, &stake, &third, 50);
    client.deposit(&third, &50);
    let rankings = client.get_rankings();
    assert_eq!(rankings.get_unchecked(0), third);
}

#[test]
fn test_deposit_withdraw_round_trip_preserves_order() {
    let env = Env::default();
    let (client, _, stake, _) = setup(&env);

    let p1 = staked_player(&env, &client, &stake, 300);
    let p2 = staked_player(&env, &client, &stake, 200);
    let p3 = staked_player(&env, &client, &stake, 100);

    let before = client.get_rankings();

    mint(&env, &stake, &p2, 500);
    client.deposit(&p2, &500);
    client.withdraw(&p2, &500);

    let after = client.get_rankings();
    assert_eq!(before, after);
    assert_eq!(client.get_player(&p2).balance, 200);
    assert_eq!(client.get_rank(&p1), 1);
    assert_eq!(client.get_rank(&p3), 3);
}

#[test]
fn test_full_withdraw_removes_participant() {
    let env = Env::default();
    let (client, _, stake, _) = setup(&env);

    let p1 = staked_player(&env, &client, &stake, 100);
    let p2 = staked_player(&env, &client, &stake, 50);

    client.withdraw(&p2, &50);

    assert_eq!(client.get_rankings().len(), 1);
    assert_eq!(client.get_rank(&p2), 0);
    assert_eq!(client.get_player(&p2).balance, 0);
    assert_eq!(client.get_rank(&p1), 1);
    assert_eq!(TokenClient::new(&env, &stake).balance(&p2), 50);
}

#[test]
fn test_reentry_after_full_withdraw_gets_new_tiebreak_position() {
    let env = Env::default();
    let (client, _, stake, _) = setup(&env);

    let p1 = staked_player(&env, &client, &stake, 100);
    let p2 = staked_player(&env, &client, &stake, 100);

    // p1 leaves entirely and comes back at the same balance; p2 now has the
    // earlier insertion order and keeps rank 1.
    client.withdraw(&p1, &100);
    client.deposit(&p1, &100);

    let rankings = client.get_rankings();
    assert_eq!(rankings.get_unchecked(0), p2);
    assert_eq!(rankings.get_unchecked(1), p1);
}

// ---------------------------------------------------------------------------
// Deposit / withdraw validation
// ---------------------------------------------------------------------------

#[test]
fn test_deposit_zero_rejected() {
    let env = Env::default();
    let (client, _, stake, _) = setup(&env);
    let player = Address::generate(&env);
    mint(&env, &stake, &player, 100);

    assert_eq!(client.try_deposit(&player, &0), Err(Ok(Error::InvalidAmount)));
    assert_eq!(client.try_deposit(&player, &-5), Err(Ok(Error::InvalidAmount)));
}

#[test]
fn test_withdraw_more_than_balance_rejected() {
    let env = Env::default();
    let (client, _, stake, _) = setup(&env);
    let player = staked_player(&env, &client, &stake, 100);

    let result = client.try_withdraw(&player, &101);
    assert_eq!(result, Err(Ok(Error::InsufficientBalance)));
}

#[test]
fn test_withdraw_unknown_player_rejected() {
    let env = Env::default();
    let (client, _, _, _) = setup(&env);
    let stranger = Address::generate(&env);

    let result = client.try_withdraw(&stranger, &1);
    assert_eq!(result, Err(Ok(Error::PlayerNotFound)));
}

#[test]
fn test_player_cap_enforced() {
    let env = Env::default();
    let (client, _, stake, _) = setup_with(&env, 2, RATE);

    staked_player(&env, &client, &stake, 100);
    let p2 = staked_player(&env, &client, &stake, 50);

    let p3 = Address::generate(&env);
    mint(&env, &stake, &p3, 10);
    assert_eq!(client.try_deposit(&p3, &10), Err(Ok(Error::MaxPlayersReached)));

    // Existing players can still top up at the cap.
    mint(&env, &stake, &p2, 10);
    client.deposit(&p2, &10);
    assert_eq!(client.get_player(&p2).balance, 60);
}

// ---------------------------------------------------------------------------
// Tick accrual
// ---------------------------------------------------------------------------

#[test]
fn test_advance_tick_requires_keeper() {
    let env = Env::default();
    let (client, admin, stake, reward) = setup(&env);
    staked_player(&env, &client, &stake, 100);
    let funder = Address::generate(&env);
    mint(&env, &reward, &funder, 1_000);
    client.deposit_rewards(&funder, &1_000);

    let stranger = Address::generate(&env);
    assert_eq!(client.try_advance_tick(&stranger), Err(Ok(Error::NotAuthorized)));

    client.set_keeper(&admin, &stranger, &true);
    client.advance_tick(&stranger);
    assert_eq!(client.get_pool_stats().tick, 1);
}

#[test]
fn test_tick_zero_pays_rank_two() {
    let env = Env::default();
    let (client, admin, stake, reward) = setup(&env);

    let p1 = staked_player(&env, &client, &stake, 300);
    let p2 = staked_player(&env, &client, &stake, 200);
    let p3 = staked_player(&env, &client, &stake, 100);

    let funder = Address::generate(&env);
    mint(&env, &reward, &funder, 1_000);
    client.deposit_rewards(&funder, &1_000);

    // Tick 0 collapses to the fallback index 2: rank 2 alone wins.
    client.advance_tick(&admin);

    assert_eq!(client.get_player(&p1).pending, 0);
    assert_eq!(client.get_player(&p2).pending, RATE);
    assert_eq!(client.get_player(&p3).pending, 0);
    assert_eq!(client.get_player(&p2).win_count, 1);

    let stats = client.get_pool_stats();
    assert_eq!(stats.reward_pool, 1_000 - RATE);
    assert_eq!(stats.total_distributed, RATE);
    assert_eq!(stats.tick, 1);
}

#[test]
fn test_tick_one_splits_between_ranks_one_and_three() {
    let env = Env::default();
    let (client, admin, stake, reward) = setup(&env);

    let p1 = staked_player(&env, &client, &stake, 300);
    let p2 = staked_player(&env, &client, &stake, 200);
    let p3 = staked_player(&env, &client, &stake, 100);

    let funder = Address::generate(&env);
    mint(&env, &reward, &funder, 1_000);
    client.deposit_rewards(&funder, &1_000);

    client.advance_tick(&admin); // tick 0: rank 2
    client.advance_tick(&admin); // tick 1 -> unit fallback 3: ranks 1 and 3

    assert_eq!(client.get_player(&p1).pending, RATE / 2);
    assert_eq!(client.get_player(&p2).pending, RATE);
    assert_eq!(client.get_player(&p3).pending, RATE / 2);
}

#[test]
fn test_division_remainder_stays_in_pool() {
    let env = Env::default();
    let (client, admin, stake, reward) = setup_with(&env, 100, 11);

    staked_player(&env, &client, &stake, 300);
    staked_player(&env, &client, &stake, 200);
    staked_player(&env, &client, &stake, 100);

    let funder = Address::generate(&env);
    mint(&env, &reward, &funder, 100);
    client.deposit_rewards(&funder, &100);

    client.advance_tick(&admin); // tick 0: one winner, 11 paid
    client.advance_tick(&admin); // tick 1: two winners, 5 each, 1 retained

    let stats = client.get_pool_stats();
    assert_eq!(stats.total_distributed, 11 + 10);
    assert_eq!(stats.reward_pool, 100 - 21);
}

#[test]
fn test_empty_pool_still_advances_tick() {
    let env = Env::default();
    let (client, admin, stake, _) = setup(&env);
    let player = staked_player(&env, &client, &stake, 100);

    client.advance_tick(&admin);

    assert_eq!(client.get_pool_stats().tick, 1);
    assert_eq!(client.get_player(&player).pending, 0);
}

#[test]
fn test_no_participants_still_advances_tick() {
    let env = Env::default();
    let (client, admin, _, reward) = setup(&env);
    let funder = Address::generate(&env);
    mint(&env, &reward, &funder, 100);
    client.deposit_rewards(&funder, &100);

    client.advance_tick(&admin);

    let stats = client.get_pool_stats();
    assert_eq!(stats.tick, 1);
    assert_eq!(stats.reward_pool, 100);
    assert_eq!(stats.total_distributed, 0);
}

#[test]
fn test_reward_capped_by_remaining_pool() {
    let env = Env::default();
    let (client, admin, stake, reward) = setup_with(&env, 100, 1_000);

    let p1 = staked_player(&env, &client, &stake, 300);
    let p2 = staked_player(&env, &client, &stake, 200);

    let funder = Address::generate(&env);
    mint(&env, &reward, &funder, 7);
    client.deposit_rewards(&funder, &7);

    // Rate 1000 but only 7 in the pool; tick 0 pays rank 2 all 7.
    client.advance_tick(&admin);
    assert_eq!(client.get_player(&p2).pending, 7);
    assert_eq!(client.get_pool_stats().reward_pool, 0);

    // Pool exhausted: subsequent ticks advance without distribution.
    client.advance_tick(&admin);
    assert_eq!(client.get_pool_stats().tick, 2);
    assert_eq!(client.get_player(&p1).pending, 0);
}

#[test]
fn test_preview_matches_fixed_vector() {
    let env = Env::default();
    let (client, _, stake, _) = setup(&env);

    // Three participants: tick 56 reduces 56 -> 6 -> 0, then 56 % 3 = 2.
    staked_player(&env, &client, &stake, 300);
    staked_player(&env, &client, &stake, 200);
    staked_player(&env, &client, &stake, 100);

    let ranks = client.preview_winning_ranks(&56);
    assert_eq!(ranks.len(), 1);
    assert_eq!(ranks.get_unchecked(0), 2);

    // Selection is a pure function of (tick, active count).
    assert_eq!(client.preview_winning_ranks(&56), ranks);
}

// ---------------------------------------------------------------------------
// Pending claims
// ---------------------------------------------------------------------------

#[test]
fn test_claim_pending_transfers_and_zeroes() {
    let env = Env::default();
    let (client, admin, stake, reward) = setup(&env);

    staked_player(&env, &client, &stake, 300);
    let p2 = staked_player(&env, &client, &stake, 200);

    let funder = Address::generate(&env);
    mint(&env, &reward, &funder, 1_000);
    client.deposit_rewards(&funder, &1_000);

    client.advance_tick(&admin); // rank 2 wins RATE

    let claimed = client.claim_pending(&p2);
    assert_eq!(claimed, RATE);
    assert_eq!(TokenClient::new(&env, &reward).balance(&p2), RATE);
    assert_eq!(client.get_player(&p2).pending, 0);
    assert_eq!(client.get_player(&p2).lifetime, RATE);

    // Nothing pending: a second claim is a no-op returning zero.
    assert_eq!(client.claim_pending(&p2), 0);
}

#[test]
fn test_claim_pending_unknown_player_is_noop() {
    let env = Env::default();
    let (client, _, _, _) = setup(&env);
    let stranger = Address::generate(&env);
    assert_eq!(client.claim_pending(&stranger), 0);
}

#[test]
fn test_withdraw_flushes_pending_first() {
    let env = Env::default();
    let (client, admin, stake, reward) = setup(&env);

    staked_player(&env, &client, &stake, 300);
    let p2 = staked_player(&env, &client, &stake, 200);

    let funder = Address::generate(&env);
    mint(&env, &reward, &funder, 1_000);
    client.deposit_rewards(&funder, &1_000);

    client.advance_tick(&admin); // rank 2 wins RATE

    client.withdraw(&p2, &200);

    // Both the stake and the flushed rewards came back.
    assert_eq!(TokenClient::new(&env, &stake).balance(&p2), 200);
    assert_eq!(TokenClient::new(&env, &reward).balance(&p2), RATE);
    assert_eq!(client.get_rank(&p2), 0);
}

// ---------------------------------------------------------------------------
// Pause
// ---------------------------------------------------------------------------

#[test]
fn test_pause_blocks_mutations() {
    let env = Env::default();
    let (client, admin, stake, reward) = setup(&env);
    let player = staked_player(&env, &client, &stake, 100);
    let funder = Address::generate(&env);
    mint(&env, &reward, &funder, 100);

    client.pause(&admin);
    assert!(client.is_paused());

    mint(&env, &stake, &player, 10);
    assert_eq!(client.try_deposit(&player, &10), Err(Ok(Error::ContractPaused)));
    assert_eq!(client.try_withdraw(&player, &10), Err(Ok(Error::ContractPaused)));
    assert_eq!(client.try_deposit_rewards(&funder, &100), Err(Ok(Error::ContractPaused)));
    assert_eq!(client.try_advance_tick(&admin), Err(Ok(Error::ContractPaused)));
    assert_eq!(client.try_claim_pending(&player), Err(Ok(Error::ContractPaused)));
    assert_eq!(client.try_set_reward_rate(&admin, &5), Err(Ok(Error::ContractPaused)));

    // Reads stay available.
    assert_eq!(client.get_rank(&player), 1);

    client.unpause(&admin);
    client.deposit(&player, &10);
    assert_eq!(client.get_player(&player).balance, 110);
}

#[test]
fn test_pause_requires_admin() {
    let env = Env::default();
    let (client, admin, _, _) = setup(&env);
    let stranger = Address::generate(&env);

    assert_eq!(client.try_pause(&stranger), Err(Ok(Error::NotAuthorized)));
    client.pause(&admin);
    assert_eq!(client.try_pause(&admin), Err(Ok(Error::AlreadyPaused)));
    client.unpause(&admin);
    assert_eq!(client.try_unpause(&admin), Err(Ok(Error::NotPaused)));
}

// ---------------------------------------------------------------------------
// Reward rate
// ---------------------------------------------------------------------------

#[test]
fn test_set_reward_rate_admin_only() {
    let env = Env::default();
    let (client, admin, _, _) = setup(&env);
    let stranger = Address::generate(&env);

    assert_eq!(client.try_set_reward_rate(&stranger, &50), Err(Ok(Error::NotAuthorized)));

    client.set_reward_rate(&admin, &50);
    assert_eq!(client.get_pool_stats().reward_rate, 50);
}
