//! Leaderboard ranking.

use arcade_types::LeaderboardRow;

/// Rewrites `rank` on every row: positions `1..=limit` in `(score DESC, player_id ASC)`
/// order, 0 for everything after.
pub fn materialise(rows: &mut [LeaderboardRow], limit: usize) {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    order.sort_by(|a, b| {
        rows[*b]
            .score
            .cmp(&rows[*a].score)
            .then(rows[*a].player_id.cmp(&rows[*b].player_id))
    });

    for row in rows.iter_mut() {
        row.rank = 0;
    }
    for (position, index) in order.into_iter().take(limit).enumerate() {
        rows[index].rank = position as i32 + 1;
    }
}

/// Scores only move up.
pub fn accepts_score(current: Option<i64>, proposed: i64) -> bool {
    current.map_or(true, |current| proposed > current)
}
