/// Cache key prefix for pre-rolled claw verdicts (`game_results:<game_id>`).
pub const VERDICT_KEY_PREFIX: &str = "game_results:";

/// Cache key prefix for staged pity counters (`gacha:pity:<machine_id>:<player_id>`).
pub const PITY_KEY_PREFIX: &str = "gacha:pity:";

/// Hash field names of a staged pity entry.
pub const PITY_FIELD_ULTRA: &str = "ultra_rare_pity_count";
pub const PITY_FIELD_SUPER: &str = "super_rare_pity_count";

/// Lifetime of a verdict list in the result cache.
pub const VERDICT_TTL_SECS: u64 = 300;

/// Only the top positions of the leaderboard carry a non-zero rank.
pub const LEADERBOARD_RANK_LIMIT: usize = 100;

/// Rows returned by a leaderboard query.
pub const LEADERBOARD_PAGE_SIZE: usize = 10;

/// Pull counts accepted by a gacha request.
pub const SINGLE_PULL: i32 = 1;
pub const MULTI_PULL: i32 = 10;

/// Codec limits.
pub const MAX_NAME_LENGTH: usize = 256;
pub const MAX_MESSAGE_LENGTH: usize = 256;
pub const MAX_MACHINE_ITEMS: usize = 1_024;
pub const MAX_PAYLOAD_LENGTH: usize = 64 * 1024;

/// Error codes carried by `ErrorResp`.
pub const CODE_BAD_REQUEST: i32 = 400;
pub const CODE_INSUFFICIENT_FUNDS: i32 = 402;
pub const CODE_NOT_FOUND: i32 = 404;
pub const CODE_VERDICT_MISMATCH: i32 = 409;
pub const CODE_RESULT_EXPIRED: i32 = 410;
pub const CODE_SCORE_NOT_IMPROVED: i32 = 422;
pub const CODE_CONFIG: i32 = 500;
pub const CODE_STORE_UNAVAILABLE: i32 = 503;

/// Cache key holding the verdict list of a claw game.
pub fn verdict_key(game_id: i64) -> String {
    format!("{VERDICT_KEY_PREFIX}{game_id}")
}

/// Cache key holding the staged pity counters of a (machine, player) pair.
pub fn pity_key(machine_id: i64, player_id: i64) -> String {
    format!("{PITY_KEY_PREFIX}{machine_id}:{player_id}")
}
