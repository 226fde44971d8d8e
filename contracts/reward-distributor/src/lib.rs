//! Snootboop Reward Distributor Contract
//!
//! Settles game and referral winnings observed off-chain. Campaign creators
//! escrow a reward budget; an off-chain aggregator watches accrual and
//! referral events, folds every participant's cumulative entitlement into a
//! single Merkle tree, and publishes its root here. Participants redeem by
//! proving their entitlement against the current root; the contract releases
//! only the delta above what they have already claimed, first come first
//! served against each campaign's remaining budget.
//!
//! After a campaign ends, leftover budget can be swept exactly once: by the
//! creator after a short cooldown, or by an admin after a longer one. The two
//! paths are mutually exclusive.
//!
//! ## Storage Strategy
//! - `instance()`: owner, pause flag, role grants, token whitelist, campaign
//!   counter, and the single global root with its update timestamp. Small,
//!   fixed-size config read on nearly every call.
//! - `persistent()`: per-campaign records, per-(campaign, account, kind)
//!   cumulative claim records, and referral markers; each entry has its own
//!   TTL, bumped on every write.
#![no_std]
#![allow(unexpected_cfgs)]

use soroban_sdk::{
    contract, contracterror, contractevent, contractimpl, contracttype, token::TokenClient,
    xdr::ToXdr, Address, BytesN, Env, Vec,
};

pub mod merkle;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Persistent storage TTL in ledgers (~30 days at 5 s/ledger).
pub const PERSISTENT_BUMP_LEDGERS: u32 = 518_400;

/// Longest allowed campaign, in seconds (90 days).
pub const MAX_CAMPAIGN_DURATION: u64 = 7_776_000;

/// How long after a campaign ends claims remain redeemable, in seconds
/// (90 days).
pub const CLAIM_EXPIRATION: u64 = 7_776_000;

/// Cooldown after campaign end before the creator may withdraw leftover
/// budget (1 day).
pub const CREATOR_WITHDRAW_COOLDOWN: u64 = 86_400;

/// Cooldown after campaign end before an admin may sweep unclaimed rewards
/// (7 days). Strictly longer than the creator's window.
pub const ADMIN_WITHDRAW_COOLDOWN: u64 = 604_800;

/// Upper bound on entries per batch claim.
pub const MAX_CLAIMS_PER_BATCH: u32 = 50;

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
    AlreadyPaused = 5,
    NotPaused = 6,
    TokenNotWhitelisted = 7,
    InvalidCampaignDuration = 8,
    InvalidAmount = 9,
    InvalidRewardRate = 10,
    CampaignNotFound = 11,
    StaleRoot = 12,
    RootNotSet = 13,
    BatchLengthMismatch = 14,
    TooManyClaims = 15,
    ClaimNotAllowed = 16,
    InvalidProof = 17,
    InvalidCumulativeAmount = 18,
    ExceedsEntitlement = 19,
    InsufficientRewardBalance = 20,
    CampaignNotEnded = 21,
    CooldownNotPassed = 22,
    TerminalWithdrawalDone = 23,
    CampaignClosed = 24,
    SelfReferral = 25,
    AlreadyReferred = 26,
    Overflow = 27,
}

// ---------------------------------------------------------------------------
// Storage Types
// ---------------------------------------------------------------------------

/// Grantable roles. The campaign creator is an implicit third role scoped to
/// its own campaign.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Role {
    Admin = 0,
    Updater = 1,
}

/// Which leaf population an entitlement belongs to. Folded into the leaf hash
/// so game and referral entitlements for the same account never collide.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RewardKind {
    Game = 0,
    Referral = 1,
}

/// Terminal sweep state of a campaign. Whichever path succeeds first
/// forecloses the other and any repeat.
#[contracttype]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TerminalWithdrawal {
    None = 0,
    Creator = 1,
    Admin = 2,
}

#[contracttype]
pub enum DataKey {
    // --- instance() ---
    Owner,
    Paused,
    RoleAdmin(Address),
    RoleUpdater(Address),
    Whitelisted(Address),
    CampaignCount,
    GlobalRoot,
    RootTimestamp,
    // --- persistent() ---
    Campaign(u64),
    /// Cumulative amount already released for (campaign, account, kind).
    /// Non-decreasing.
    Claimed(u64, Address, RewardKind),
    Referral(Address, Address),
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Campaign {
    pub creator: Address,
    pub reward_token: Address,
    pub stake_token: Address,
    /// Advertised emission ceiling; may only ever increase.
    pub max_reward_rate: i128,
    pub start_time: u64,
    pub end_time: u64,
    /// Escrowed budget. Decremented by terminal withdrawals only.
    pub total_rewards: i128,
    /// Running total released through claims. Never exceeds `total_rewards`.
    pub claimed_rewards: i128,
    pub created_at: u64,
    pub terminal: TerminalWithdrawal,
}

/// One batch-claim entry. `cumulative_amount` is the total entitlement proven
/// by `proofs[i]`, not the increment.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RewardClaim {
    pub campaign_id: u64,
    pub account: Address,
    pub cumulative_amount: i128,
    pub kind: RewardKind,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

#[contractevent]
pub struct CampaignCreated {
    #[topic]
    pub campaign_id: u64,
    #[topic]
    pub creator: Address,
    pub reward_token: Address,
    pub stake_token: Address,
    pub max_reward_rate: i128,
    pub start_time: u64,
    pub end_time: u64,
    pub total_rewards: i128,
}

#[contractevent]
pub struct MaxRewardRateIncreased {
    #[topic]
    pub campaign_id: u64,
    pub new_rate: i128,
}

#[contractevent]
pub struct RewardTokensDeposited {
    #[topic]
    pub campaign_id: u64,
    #[topic]
    pub from: Address,
    pub amount: i128,
}

#[contractevent]
pub struct GlobalRootUpdated {
    pub root: BytesN<32>,
    pub timestamp: u64,
}

#[contractevent]
pub struct RewardsClaimed {
    #[topic]
    pub account: Address,
    #[topic]
    pub campaign_id: u64,
    pub kind: RewardKind,
    pub amount: i128,
}

#[contractevent]
pub struct RewardsBatchClaimed {
    #[topic]
    pub account: Address,
    pub entries: u32,
    pub total_amount: i128,
}

#[contractevent]
pub struct RewardTokensWithdrawn {
    #[topic]
    pub campaign_id: u64,
    #[topic]
    pub creator: Address,
    pub amount: i128,
}

#[contractevent]
pub struct UnclaimedRewardsWithdrawn {
    #[topic]
    pub campaign_id: u64,
    #[topic]
    pub admin: Address,
    pub amount: i128,
}

#[contractevent]
pub struct ReferralMade {
    #[topic]
    pub referrer: Address,
    #[topic]
    pub referee: Address,
    pub amount: i128,
}

#[contractevent]
pub struct RoleGranted {
    #[topic]
    pub account: Address,
    pub role: Role,
}

#[contractevent]
pub struct RoleRevoked {
    #[topic]
    pub account: Address,
    pub role: Role,
}

#[contractevent]
pub struct TokenWhitelisted {
    #[topic]
    pub token: Address,
}

#[contractevent]
pub struct TokenWhitelistRemoved {
    #[topic]
    pub token: Address,
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
pub struct RewardDistributor;

#[contractimpl]
impl RewardDistributor {
    /// Initialize with the granting authority. The owner implicitly holds
    /// both the Admin and Updater roles.
    pub fn init(env: Env, owner: Address) -> Result<(), Error> {
        if env.storage().instance().has(&DataKey::Owner) {
            return Err(Error::AlreadyInitialized);
        }
        owner.require_auth();
        env.storage().instance().set(&DataKey::Owner, &owner);
        env.storage().instance().set(&DataKey::Paused, &false);
        env.storage().instance().set(&DataKey::CampaignCount, &0u64);
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Roles, whitelist, pause
    // -----------------------------------------------------------------------

    /// Grant a role. Owner only.
    pub fn grant_role(env: Env, owner: Address, account: Address, role: Role) -> Result<(), Error> {
        require_owner(&env, &owner)?;
        env.storage()
            .instance()
            .set(&role_key(&account, role), &true);
        RoleGranted { account, role }.publish(&env);
        Ok(())
    }

    /// Revoke a role. Owner only.
    pub fn revoke_role(
        env: Env,
        owner: Address,
        account: Address,
        role: Role,
    ) -> Result<(), Error> {
        require_owner(&env, &owner)?;
        env.storage()
            .instance()
            .set(&role_key(&account, role), &false);
        RoleRevoked { account, role }.publish(&env);
        Ok(())
    }

    /// Allow `token` as a campaign reward asset. Admin only.
    pub fn whitelist_token(env: Env, admin: Address, token: Address) -> Result<(), Error> {
        require_role(&env, &admin, Role::Admin)?;
        env.storage()
            .instance()
            .set(&DataKey::Whitelisted(token.clone()), &true);
        TokenWhitelisted { token }.publish(&env);
        Ok(())
    }

    /// Remove `token` from the whitelist. Existing campaigns are unaffected.
    pub fn remove_whitelisted_token(env: Env, admin: Address, token: Address) -> Result<(), Error> {
        require_role(&env, &admin, Role::Admin)?;
        env.storage()
            .instance()
            .set(&DataKey::Whitelisted(token.clone()), &false);
        TokenWhitelistRemoved { token }.publish(&env);
        Ok(())
    }

    /// Halt every fund-moving entry point. Admin only. Root updates, role
    /// grants, and whitelist changes stay available so an incident can be
    /// remediated while paused.
    pub fn pause(env: Env, admin: Address) -> Result<(), Error> {
        require_role(&env, &admin, Role::Admin)?;
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
        require_role(&env, &admin, Role::Admin)?;
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
    // Campaign lifecycle
    // -----------------------------------------------------------------------

    /// Create a campaign and escrow its budget. Anyone may create one, but
    /// the reward token must already be whitelisted.
    pub fn create_campaign(
        env: Env,
        creator: Address,
        reward_token: Address,
        stake_token: Address,
        max_reward_rate: i128,
        start_time: u64,
        end_time: u64,
        total_rewards: i128,
    ) -> Result<u64, Error> {
        require_initialized(&env)?;
        require_not_paused(&env)?;

        creator.require_auth();

        if !is_whitelisted(&env, &reward_token) {
            return Err(Error::TokenNotWhitelisted);
        }
        if end_time <= start_time || end_time - start_time > MAX_CAMPAIGN_DURATION {
            return Err(Error::InvalidCampaignDuration);
        }
        if max_reward_rate <= 0 {
            return Err(Error::InvalidRewardRate);
        }
        if total_rewards <= 0 {
            return Err(Error::InvalidAmount);
        }

        let campaign_id: u64 = env
            .storage()
            .instance()
            .get(&DataKey::CampaignCount)
            .unwrap_or(0);
        env.storage()
            .instance()
            .set(&DataKey::CampaignCount, &(campaign_id + 1));

        let campaign = Campaign {
            creator: creator.clone(),
            reward_token: reward_token.clone(),
            stake_token: stake_token.clone(),
            max_reward_rate,
            start_time,
            end_time,
            total_rewards,
            claimed_rewards: 0,
            created_at: env.ledger().timestamp(),
            terminal: TerminalWithdrawal::None,
        };
        save_campaign(&env, campaign_id, &campaign);

        TokenClient::new(&env, &reward_token).transfer(
            &creator,
            &env.current_contract_address(),
            &total_rewards,
        );

        CampaignCreated {
            campaign_id,
            creator,
            reward_token,
            stake_token,
            max_reward_rate,
            start_time,
            end_time,
            total_rewards,
        }
        .publish(&env);

        Ok(campaign_id)
    }

    /// Raise a campaign's advertised emission ceiling. Creator only; the
    /// rate is monotone, never lowered.
    pub fn increase_max_reward_rate(
        env: Env,
        caller: Address,
        campaign_id: u64,
        new_rate: i128,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        require_not_paused(&env)?;

        caller.require_auth();

        let mut campaign = get_campaign(&env, campaign_id)?;
        if caller != campaign.creator {
            return Err(Error::NotAuthorized);
        }
        if new_rate <= campaign.max_reward_rate {
            return Err(Error::InvalidRewardRate);
        }

        campaign.max_reward_rate = new_rate;
        save_campaign(&env, campaign_id, &campaign);

        MaxRewardRateIncreased {
            campaign_id,
            new_rate,
        }
        .publish(&env);

        Ok(())
    }

    /// Top up a campaign's budget. Any funder may deposit until the campaign
    /// is terminally withdrawn.
    pub fn deposit_rewards(
        env: Env,
        from: Address,
        campaign_id: u64,
        amount: i128,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        require_not_paused(&env)?;

        from.require_auth();

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        let mut campaign = get_campaign(&env, campaign_id)?;
        if campaign.terminal != TerminalWithdrawal::None {
            return Err(Error::CampaignClosed);
        }

        campaign.total_rewards = campaign
            .total_rewards
            .checked_add(amount)
            .ok_or(Error::Overflow)?;
        save_campaign(&env, campaign_id, &campaign);

        TokenClient::new(&env, &campaign.reward_token).transfer(
            &from,
            &env.current_contract_address(),
            &amount,
        );

        RewardTokensDeposited {
            campaign_id,
            from,
            amount,
        }
        .publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Root updates and claims
    // -----------------------------------------------------------------------

    /// Replace the global entitlement root. Updater role only. The update
    /// timestamp must strictly increase. Replacement is atomic and total, and
    /// no history is kept, so proofs built against a replaced root fail.
    pub fn update_global_root(
        env: Env,
        updater: Address,
        new_root: BytesN<32>,
        update_timestamp: u64,
    ) -> Result<(), Error> {
        require_role(&env, &updater, Role::Updater)?;

        let current: u64 = env
            .storage()
            .instance()
            .get(&DataKey::RootTimestamp)
            .unwrap_or(0);
        if update_timestamp <= current {
            return Err(Error::StaleRoot);
        }

        env.storage().instance().set(&DataKey::GlobalRoot, &new_root);
        env.storage()
            .instance()
            .set(&DataKey::RootTimestamp, &update_timestamp);

        GlobalRootUpdated {
            root: new_root,
            timestamp: update_timestamp,
        }
        .publish(&env);

        Ok(())
    }

    /// Redeem a batch of cumulative entitlements, all or nothing.
    ///
    /// `claims[i]` is proven by `proofs[i]`. Every entry must name the
    /// caller. Each entry releases the full delta between the proven
    /// cumulative amount and what was already released for that
    /// (campaign, account, kind). Token transfers happen only after every
    /// entry has validated and all claim records are written.
    pub fn claim_rewards(
        env: Env,
        caller: Address,
        claims: Vec<RewardClaim>,
        proofs: Vec<Vec<BytesN<32>>>,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        require_not_paused(&env)?;

        caller.require_auth();

        if claims.len() != proofs.len() {
            return Err(Error::BatchLengthMismatch);
        }
        if claims.is_empty() {
            return Err(Error::InvalidAmount);
        }
        if claims.len() > MAX_CLAIMS_PER_BATCH {
            return Err(Error::TooManyClaims);
        }

        let root = global_root(&env)?;
        let now = env.ledger().timestamp();

        let mut payouts: Vec<(Address, i128)> = Vec::new(&env);
        let mut total: i128 = 0;
        for i in 0..claims.len() {
            let claim = claims.get_unchecked(i);
            let proof = proofs.get_unchecked(i);
            let (token, amount) = process_claim(&env, &caller, &claim, None, &proof, &root, now)?;
            total = total.checked_add(amount).ok_or(Error::Overflow)?;
            payouts.push_back((token, amount));
        }

        let contract = env.current_contract_address();
        for (token, amount) in payouts.iter() {
            TokenClient::new(&env, &token).transfer(&contract, &caller, &amount);
        }

        RewardsBatchClaimed {
            account: caller,
            entries: claims.len(),
            total_amount: total,
        }
        .publish(&env);

        Ok(())
    }

    /// Redeem part of a single entitlement. `requested_amount` must not
    /// exceed the unreleased delta; the claim record advances by exactly the
    /// requested amount, so the remainder stays redeemable under the same
    /// proof.
    pub fn claim_reward(
        env: Env,
        caller: Address,
        campaign_id: u64,
        cumulative_amount: i128,
        requested_amount: i128,
        kind: RewardKind,
        proof: Vec<BytesN<32>>,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        require_not_paused(&env)?;

        caller.require_auth();

        let root = global_root(&env)?;
        let now = env.ledger().timestamp();
        let claim = RewardClaim {
            campaign_id,
            account: caller.clone(),
            cumulative_amount,
            kind,
        };
        let (token, amount) = process_claim(
            &env,
            &caller,
            &claim,
            Some(requested_amount),
            &proof,
            &root,
            now,
        )?;

        TokenClient::new(&env, &token).transfer(
            &env.current_contract_address(),
            &caller,
            &amount,
        );

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Terminal withdrawals
    // -----------------------------------------------------------------------

    /// Creator path: withdraw leftover budget after the campaign has ended
    /// and the creator cooldown has passed. One-shot; forecloses the admin
    /// sweep.
    pub fn withdraw_reward_tokens(
        env: Env,
        caller: Address,
        campaign_id: u64,
        amount: i128,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        require_not_paused(&env)?;

        caller.require_auth();

        if amount <= 0 {
            return Err(Error::InvalidAmount);
        }
        let mut campaign = get_campaign(&env, campaign_id)?;
        if caller != campaign.creator {
            return Err(Error::NotAuthorized);
        }
        let now = env.ledger().timestamp();
        if now <= campaign.end_time {
            return Err(Error::CampaignNotEnded);
        }
        if now <= campaign.end_time.saturating_add(CREATOR_WITHDRAW_COOLDOWN) {
            return Err(Error::CooldownNotPassed);
        }
        if campaign.terminal != TerminalWithdrawal::None {
            return Err(Error::TerminalWithdrawalDone);
        }
        if amount > campaign.total_rewards - campaign.claimed_rewards {
            return Err(Error::InsufficientRewardBalance);
        }

        campaign.total_rewards -= amount;
        campaign.terminal = TerminalWithdrawal::Creator;
        save_campaign(&env, campaign_id, &campaign);

        TokenClient::new(&env, &campaign.reward_token).transfer(
            &env.current_contract_address(),
            &caller,
            &amount,
        );

        RewardTokensWithdrawn {
            campaign_id,
            creator: caller,
            amount,
        }
        .publish(&env);

        Ok(())
    }

    /// Admin path: sweep the entire unclaimed balance after the (longer)
    /// admin cooldown. One-shot; forecloses the creator withdrawal.
    pub fn admin_withdraw_unclaimed_rewards(
        env: Env,
        admin: Address,
        campaign_id: u64,
    ) -> Result<(), Error> {
        require_not_paused(&env)?;
        require_role(&env, &admin, Role::Admin)?;

        let mut campaign = get_campaign(&env, campaign_id)?;
        let now = env.ledger().timestamp();
        if now <= campaign.end_time {
            return Err(Error::CampaignNotEnded);
        }
        if now <= campaign.end_time.saturating_add(ADMIN_WITHDRAW_COOLDOWN) {
            return Err(Error::CooldownNotPassed);
        }
        if campaign.terminal != TerminalWithdrawal::None {
            return Err(Error::TerminalWithdrawalDone);
        }
        let remaining = campaign.total_rewards - campaign.claimed_rewards;
        if remaining <= 0 {
            return Err(Error::InsufficientRewardBalance);
        }

        campaign.total_rewards = campaign.claimed_rewards;
        campaign.terminal = TerminalWithdrawal::Admin;
        save_campaign(&env, campaign_id, &campaign);

        TokenClient::new(&env, &campaign.reward_token).transfer(
            &env.current_contract_address(),
            &admin,
            &remaining,
        );

        UnclaimedRewardsWithdrawn {
            campaign_id,
            admin,
            amount: remaining,
        }
        .publish(&env);

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Referrals
    // -----------------------------------------------------------------------

    /// Record referrals for the off-chain aggregator, which folds referral
    /// entitlements into the tree under `RewardKind::Referral`. Each
    /// (referrer, referee) pair may be recorded once.
    pub fn make_referral(
        env: Env,
        referrer: Address,
        referees: Vec<Address>,
        amounts: Vec<i128>,
    ) -> Result<(), Error> {
        require_initialized(&env)?;
        require_not_paused(&env)?;

        referrer.require_auth();

        if referees.len() != amounts.len() {
            return Err(Error::BatchLengthMismatch);
        }
        if referees.is_empty() {
            return Err(Error::InvalidAmount);
        }

        for i in 0..referees.len() {
            let referee = referees.get_unchecked(i);
            let amount = amounts.get_unchecked(i);
            if amount <= 0 {
                return Err(Error::InvalidAmount);
            }
            if referee == referrer {
                return Err(Error::SelfReferral);
            }
            let key = DataKey::Referral(referrer.clone(), referee.clone());
            if env.storage().persistent().get(&key).unwrap_or(false) {
                return Err(Error::AlreadyReferred);
            }
            env.storage().persistent().set(&key, &true);
            env.storage().persistent().extend_ttl(
                &key,
                PERSISTENT_BUMP_LEDGERS,
                PERSISTENT_BUMP_LEDGERS,
            );

            ReferralMade {
                referrer: referrer.clone(),
                referee,
                amount,
            }
            .publish(&env);
        }

        Ok(())
    }

    // -----------------------------------------------------------------------
    // Read API
    // -----------------------------------------------------------------------

    pub fn get_campaign(env: Env, campaign_id: u64) -> Result<Campaign, Error> {
        get_campaign(&env, campaign_id)
    }

    pub fn campaign_count(env: Env) -> u64 {
        env.storage()
            .instance()
            .get(&DataKey::CampaignCount)
            .unwrap_or(0)
    }

    /// Budget still claimable: `total_rewards - claimed_rewards`.
    pub fn available_rewards(env: Env, campaign_id: u64) -> Result<i128, Error> {
        let campaign = get_campaign(&env, campaign_id)?;
        Ok(campaign.total_rewards - campaign.claimed_rewards)
    }

    /// Cumulative amount already released for (campaign, account, kind).
    pub fn claimed_amount(env: Env, campaign_id: u64, account: Address, kind: RewardKind) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::Claimed(campaign_id, account, kind))
            .unwrap_or(0)
    }

    pub fn global_root(env: Env) -> Result<BytesN<32>, Error> {
        global_root(&env)
    }

    /// Timestamp of the last root update (0 before the first).
    pub fn root_timestamp(env: Env) -> u64 {
        env.storage()
            .instance()
            .get(&DataKey::RootTimestamp)
            .unwrap_or(0)
    }

    pub fn is_token_whitelisted(env: Env, token: Address) -> bool {
        is_whitelisted(&env, &token)
    }

    /// Whether `account` holds `role`. The owner implicitly holds every role.
    pub fn has_role(env: Env, account: Address, role: Role) -> bool {
        has_role(&env, &account, role)
    }

    pub fn has_referred(env: Env, referrer: Address, referee: Address) -> bool {
        env.storage()
            .persistent()
            .get(&DataKey::Referral(referrer, referee))
            .unwrap_or(false)
    }

    pub fn is_paused(env: Env) -> bool {
        is_paused(&env)
    }
}

// ---------------------------------------------------------------------------
// Leaf encoding
// ---------------------------------------------------------------------------

/// Canonical leaf hash:
/// `sha256(xdr(campaign_id) || xdr(account) || xdr(cumulative) || xdr(kind_tag))`
/// with `kind_tag` 0 for game and 1 for referral entitlements. Public so
/// aggregator tooling and tests share one encoding.
pub fn claim_leaf(
    env: &Env,
    campaign_id: u64,
    account: &Address,
    cumulative_amount: i128,
    kind: RewardKind,
) -> BytesN<32> {
    let mut data = campaign_id.to_xdr(env);
    data.append(&account.clone().to_xdr(env));
    data.append(&cumulative_amount.to_xdr(env));
    data.append(&(kind as u32).to_xdr(env));
    env.crypto().sha256(&data).to_bytes()
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Validate one claim entry against the current root, apply its state
/// effects, and return the transfer (token, amount) the caller is owed. The
/// actual token movement is the caller's responsibility and must come after
/// all state writes.
fn process_claim(
    env: &Env,
    caller: &Address,
    claim: &RewardClaim,
    requested: Option<i128>,
    proof: &Vec<BytesN<32>>,
    root: &BytesN<32>,
    now: u64,
) -> Result<(Address, i128), Error> {
    if &claim.account != caller {
        return Err(Error::NotAuthorized);
    }
    if claim.cumulative_amount < 0 {
        return Err(Error::InvalidAmount);
    }

    let mut campaign = get_campaign(env, claim.campaign_id)?;
    if now < campaign.start_time
        || now > campaign.end_time.saturating_add(CLAIM_EXPIRATION)
    {
        return Err(Error::ClaimNotAllowed);
    }

    let leaf = claim_leaf(
        env,
        claim.campaign_id,
        &claim.account,
        claim.cumulative_amount,
        claim.kind,
    );
    if !merkle::verify(env, root, leaf, proof) {
        return Err(Error::InvalidProof);
    }

    let key = DataKey::Claimed(claim.campaign_id, claim.account.clone(), claim.kind);
    let already: i128 = env.storage().persistent().get(&key).unwrap_or(0);
    if claim.cumulative_amount < already {
        return Err(Error::InvalidCumulativeAmount);
    }
    let delta = claim.cumulative_amount - already;
    if delta == 0 {
        // The proven cumulative has been fully released; nothing left.
        return Err(Error::ExceedsEntitlement);
    }

    let release = match requested {
        Some(amount) => {
            if amount <= 0 {
                return Err(Error::InvalidAmount);
            }
            if amount > delta {
                return Err(Error::ExceedsEntitlement);
            }
            amount
        }
        None => delta,
    };

    let claimed = campaign
        .claimed_rewards
        .checked_add(release)
        .ok_or(Error::Overflow)?;
    if claimed > campaign.total_rewards {
        return Err(Error::InsufficientRewardBalance);
    }

    campaign.claimed_rewards = claimed;
    save_campaign(env, claim.campaign_id, &campaign);

    env.storage().persistent().set(&key, &(already + release));
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);

    RewardsClaimed {
        account: claim.account.clone(),
        campaign_id: claim.campaign_id,
        kind: claim.kind,
        amount: release,
    }
    .publish(env);

    Ok((campaign.reward_token, release))
}

fn require_initialized(env: &Env) -> Result<(), Error> {
    if !env.storage().instance().has(&DataKey::Owner) {
        return Err(Error::NotInitialized);
    }
    Ok(())
}

fn require_owner(env: &Env, caller: &Address) -> Result<(), Error> {
    let owner: Address = env
        .storage()
        .instance()
        .get(&DataKey::Owner)
        .ok_or(Error::NotInitialized)?;
    caller.require_auth();
    if caller != &owner {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

/// Authenticate `caller` and check it holds `role` (the owner holds all
/// roles).
fn require_role(env: &Env, caller: &Address, role: Role) -> Result<(), Error> {
    require_initialized(env)?;
    caller.require_auth();
    if !has_role(env, caller, role) {
        return Err(Error::NotAuthorized);
    }
    Ok(())
}

fn has_role(env: &Env, account: &Address, role: Role) -> bool {
    let owner: Option<Address> = env.storage().instance().get(&DataKey::Owner);
    if owner.as_ref() == Some(account) {
        return true;
    }
    env.storage()
        .instance()
        .get(&role_key(account, role))
        .unwrap_or(false)
}

fn role_key(account: &Address, role: Role) -> DataKey {
    match role {
        Role::Admin => DataKey::RoleAdmin(account.clone()),
        Role::Updater => DataKey::RoleUpdater(account.clone()),
    }
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

fn is_whitelisted(env: &Env, token: &Address) -> bool {
    env.storage()
        .instance()
        .get(&DataKey::Whitelisted(token.clone()))
        .unwrap_or(false)
}

fn global_root(env: &Env) -> Result<BytesN<32>, Error> {
    env.storage()
        .instance()
        .get(&DataKey::GlobalRoot)
        .ok_or(Error::RootNotSet)
}

fn get_campaign(env: &Env, campaign_id: u64) -> Result<Campaign, Error> {
    env.storage()
        .persistent()
        .get(&DataKey::Campaign(campaign_id))
        .ok_or(Error::CampaignNotFound)
}

fn save_campaign(env: &Env, campaign_id: u64, campaign: &Campaign) {
    let key = DataKey::Campaign(campaign_id);
    env.storage().persistent().set(&key, campaign);
    env.storage()
        .persistent()
        .extend_ttl(&key, PERSISTENT_BUMP_LEDGERS, PERSISTENT_BUMP_LEDGERS);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
