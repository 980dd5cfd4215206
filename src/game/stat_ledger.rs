//! Per-player, per-game cumulative counters.
//!
//! Local writes are applied synchronously so a tap shows up at once; the
//! server's aggregate replaces the local entry on every `reconcile`.

use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::models::stats::{CounterStat, PlayerGameStat, ShotOutcome, ShotType};

/// (game_id, player_id)
pub type StatKey = (Uuid, Uuid);

#[derive(Debug, Default, Clone)]
pub struct StatLedger {
    entries: HashMap<StatKey, PlayerGameStat>,
}

impl StatLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a zeroed entry if the player has none yet. Idempotent.
    pub fn ensure_initialized(&mut self, game_id: Uuid, player_id: Uuid, team_id: Uuid) -> &PlayerGameStat {
        self.entries
            .entry((game_id, player_id))
            .or_insert_with(|| PlayerGameStat::zeroed(game_id, player_id, team_id))
    }

    /// Apply `count` shots of one type and outcome. A negative count undoes
    /// previously recorded shots. Returns `None` if the player has no entry.
    pub fn apply_shot(
        &mut self,
        game_id: Uuid,
        player_id: Uuid,
        shot_type: ShotType,
        outcome: ShotOutcome,
        count: i32,
    ) -> Option<PlayerGameStat> {
        let entry = self.entries.get_mut(&(game_id, player_id))?;
        apply_shot_delta(entry, shot_type, outcome, count);
        Some(entry.clone())
    }

    pub fn apply_counter_stat(
        &mut self,
        game_id: Uuid,
        player_id: Uuid,
        stat: CounterStat,
        delta: i32,
    ) -> Option<PlayerGameStat> {
        let entry = self.entries.get_mut(&(game_id, player_id))?;
        let counter = entry.counter_mut(stat);
        *counter = add_clamped(*counter, delta);
        Some(entry.clone())
    }

    /// Replace the local entry wholesale with the server's values
    pub fn reconcile(&mut self, game_id: Uuid, player_id: Uuid, server_entry: PlayerGameStat) {
        if server_entry.game_id != game_id || server_entry.player_id != player_id {
            tracing::warn!(
                "Reconciling ({}, {}) with an entry keyed ({}, {})",
                game_id, player_id, server_entry.game_id, server_entry.player_id
            );
        }
        self.entries.insert((game_id, player_id), server_entry);
    }

    /// Adopt a complete server snapshot of one game. Local entries the server
    /// does not report are reset to zero, since the server has no events for them.
    pub fn reconcile_snapshot(&mut self, game_id: Uuid, snapshot: Vec<PlayerGameStat>) {
        let reported: HashSet<Uuid> = snapshot.iter().map(|entry| entry.player_id).collect();
        for ((entry_game, player_id), entry) in self.entries.iter_mut() {
            if *entry_game == game_id && !reported.contains(player_id) {
                *entry = PlayerGameStat::zeroed(game_id, *player_id, entry.team_id);
            }
        }
        for entry in snapshot {
            self.reconcile(game_id, entry.player_id, entry);
        }
    }

    pub fn team_score(&self, game_id: Uuid, team_id: Uuid) -> u32 {
        self.entries
            .values()
            .filter(|entry| entry.game_id == game_id && entry.team_id == team_id)
            .map(|entry| entry.points)
            .sum()
    }

    pub fn get(&self, game_id: Uuid, player_id: Uuid) -> Option<&PlayerGameStat> {
        self.entries.get(&(game_id, player_id))
    }

    /// Entries of one team, highest scorer first
    pub fn team_entries(&self, game_id: Uuid, team_id: Uuid) -> Vec<&PlayerGameStat> {
        let mut entries: Vec<&PlayerGameStat> = self
            .entries
            .values()
            .filter(|entry| entry.game_id == game_id && entry.team_id == team_id)
            .collect();
        entries.sort_by(|a, b| b.points.cmp(&a.points).then(a.player_id.cmp(&b.player_id)));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn add_clamped(value: u32, delta: i32) -> u32 {
    if delta >= 0 {
        value.saturating_add(delta.unsigned_abs())
    } else {
        value.saturating_sub(delta.unsigned_abs())
    }
}

/// Apply the shot coupling table to one entry.
///
/// | shot | outcome | FGM | FGA | 3PM | 3PA | FTM | FTA | PTS |
/// |------|---------|-----|-----|-----|-----|-----|-----|-----|
/// | 2PT  | made    | +n  | +n  |     |     |     |     | +2n |
/// | 2PT  | missed  |     | +n  |     |     |     |     |     |
/// | 3PT  | made    | +n  | +n  | +n  | +n  |     |     | +3n |
/// | 3PT  | missed  |     | +n  |     | +n  |     |     |     |
/// | FT   | made    |     |     |     |     | +n  | +n  | +n  |
/// | FT   | missed  |     |     |     |     |     | +n  |     |
///
/// Negative counts remove at most as many shots of that kind as the entry
/// holds, so no counter drops below zero and every made/attempted pair stays
/// ordered.
pub fn apply_shot_delta(entry: &mut PlayerGameStat, shot_type: ShotType, outcome: ShotOutcome, count: i32) {
    if count == 0 {
        return;
    }

    let n = if count > 0 {
        count.unsigned_abs()
    } else {
        count.unsigned_abs().min(removable_shots(entry, shot_type, outcome))
    };
    if n == 0 {
        return;
    }

    let step = |value: u32, amount: u32| {
        if count > 0 {
            value.saturating_add(amount)
        } else {
            value.saturating_sub(amount)
        }
    };

    match (shot_type, outcome) {
        (ShotType::TwoPoint, ShotOutcome::Made) => {
            entry.field_goals_made = step(entry.field_goals_made, n);
            entry.field_goals_attempted = step(entry.field_goals_attempted, n);
            entry.points = step(entry.points, n.saturating_mul(2));
        }
        (ShotType::TwoPoint, ShotOutcome::Missed) => {
            entry.field_goals_attempted = step(entry.field_goals_attempted, n);
        }
        (ShotType::ThreePoint, ShotOutcome::Made) => {
            entry.field_goals_made = step(entry.field_goals_made, n);
            entry.field_goals_attempted = step(entry.field_goals_attempted, n);
            entry.three_pointers_made = step(entry.three_pointers_made, n);
            entry.three_pointers_attempted = step(entry.three_pointers_attempted, n);
            entry.points = step(entry.points, n.saturating_mul(3));
        }
        (ShotType::ThreePoint, ShotOutcome::Missed) => {
            entry.field_goals_attempted = step(entry.field_goals_attempted, n);
            entry.three_pointers_attempted = step(entry.three_pointers_attempted, n);
        }
        (ShotType::FreeThrow, ShotOutcome::Made) => {
            entry.free_throws_made = step(entry.free_throws_made, n);
            entry.free_throws_attempted = step(entry.free_throws_attempted, n);
            entry.points = step(entry.points, n);
        }
        (ShotType::FreeThrow, ShotOutcome::Missed) => {
            entry.free_throws_attempted = step(entry.free_throws_attempted, n);
        }
    }
}

/// How many shots of this kind the entry currently holds
fn removable_shots(entry: &PlayerGameStat, shot_type: ShotType, outcome: ShotOutcome) -> u32 {
    let two_made = entry.field_goals_made.saturating_sub(entry.three_pointers_made);
    let two_attempted = entry.field_goals_attempted.saturating_sub(entry.three_pointers_attempted);
    let three_missed = entry.three_pointers_attempted.saturating_sub(entry.three_pointers_made);
    let field_goals_missed = entry.field_goals_attempted.saturating_sub(entry.field_goals_made);

    match (shot_type, outcome) {
        (ShotType::TwoPoint, ShotOutcome::Made) => two_made.min(two_attempted),
        (ShotType::TwoPoint, ShotOutcome::Missed) => two_attempted.saturating_sub(two_made),
        (ShotType::ThreePoint, ShotOutcome::Made) => entry.three_pointers_made.min(entry.field_goals_made),
        (ShotType::ThreePoint, ShotOutcome::Missed) => three_missed.min(field_goals_missed),
        (ShotType::FreeThrow, ShotOutcome::Made) => entry.free_throws_made,
        (ShotType::FreeThrow, ShotOutcome::Missed) => {
            entry.free_throws_attempted.saturating_sub(entry.free_throws_made)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger_with_player() -> (StatLedger, Uuid, Uuid, Uuid) {
        let mut ledger = StatLedger::new();
        let game_id = Uuid::new_v4();
        let player_id = Uuid::new_v4();
        let team_id = Uuid::new_v4();
        ledger.ensure_initialized(game_id, player_id, team_id);
        (ledger, game_id, player_id, team_id)
    }

    #[test]
    fn test_two_point_makes_accumulate() {
        let (mut ledger, game_id, player_id, _) = ledger_with_player();
        for k in 1..=7 {
            let entry = ledger
                .apply_shot(game_id, player_id, ShotType::TwoPoint, ShotOutcome::Made, 1)
                .unwrap();
            assert_eq!(entry.field_goals_made, k);
            assert_eq!(entry.field_goals_attempted, k);
            assert_eq!(entry.points, 2 * k);
        }
    }

    #[test]
    fn test_huge_shot_count_saturates_instead_of_overflowing() {
        let (mut ledger, game_id, player_id, _) = ledger_with_player();
        let entry = ledger
            .apply_shot(game_id, player_id, ShotType::ThreePoint, ShotOutcome::Made, 2_000_000_000)
            .unwrap();
        assert_eq!(entry.three_pointers_made, 2_000_000_000);
        assert_eq!(entry.points, u32::MAX);

        let entry = ledger
            .apply_shot(game_id, player_id, ShotType::TwoPoint, ShotOutcome::Made, i32::MAX)
            .unwrap();
        assert_eq!(entry.points, u32::MAX);
    }

    #[test]
    fn test_three_point_mix_stays_within_field_goals() {
        let (mut ledger, game_id, player_id, _) = ledger_with_player();
        let outcomes = [
            ShotOutcome::Made,
            ShotOutcome::Missed,
            ShotOutcome::Missed,
            ShotOutcome::Made,
            ShotOutcome::Missed,
        ];
        for outcome in outcomes {
            ledger.apply_shot(game_id, player_id, ShotType::ThreePoint, outcome, 1);
        }
        let entry = ledger.get(game_id, player_id).unwrap();
        assert_eq!(entry.three_pointers_attempted, 5);
        assert_eq!(entry.field_goals_attempted, 5);
        assert_eq!(entry.three_pointers_made, 2);
        assert!(entry.three_pointers_made <= entry.three_pointers_attempted);
        assert!(entry.three_pointers_attempted <= entry.field_goals_attempted);
        assert_eq!(entry.points, 6);
        assert!(entry.is_consistent());
    }

    #[test]
    fn test_free_throws() {
        let (mut ledger, game_id, player_id, _) = ledger_with_player();
        ledger.apply_shot(game_id, player_id, ShotType::FreeThrow, ShotOutcome::Made, 2);
        let entry = ledger
            .apply_shot(game_id, player_id, ShotType::FreeThrow, ShotOutcome::Missed, 1)
            .unwrap();
        assert_eq!(entry.free_throws_made, 2);
        assert_eq!(entry.free_throws_attempted, 3);
        assert_eq!(entry.points, 2);
        assert_eq!(entry.field_goals_attempted, 0);
    }

    #[test]
    fn test_undo_misclick() {
        let (mut ledger, game_id, player_id, _) = ledger_with_player();
        ledger.apply_shot(game_id, player_id, ShotType::ThreePoint, ShotOutcome::Made, 1);
        let entry = ledger
            .apply_shot(game_id, player_id, ShotType::ThreePoint, ShotOutcome::Made, -1)
            .unwrap();
        assert_eq!(entry, PlayerGameStat::zeroed(game_id, player_id, entry.team_id));
    }

    #[test]
    fn test_undo_never_goes_negative() {
        let (mut ledger, game_id, player_id, _) = ledger_with_player();
        let entry = ledger
            .apply_shot(game_id, player_id, ShotType::TwoPoint, ShotOutcome::Made, -3)
            .unwrap();
        assert_eq!(entry.field_goals_made, 0);
        assert_eq!(entry.field_goals_attempted, 0);
        assert_eq!(entry.points, 0);
    }

    #[test]
    fn test_undo_only_removes_matching_shots() {
        let (mut ledger, game_id, player_id, _) = ledger_with_player();
        // A made three must not be undone through the two-point button
        ledger.apply_shot(game_id, player_id, ShotType::ThreePoint, ShotOutcome::Made, 1);
        let entry = ledger
            .apply_shot(game_id, player_id, ShotType::TwoPoint, ShotOutcome::Made, -1)
            .unwrap();
        assert_eq!(entry.three_pointers_made, 1);
        assert_eq!(entry.field_goals_made, 1);
        assert_eq!(entry.points, 3);
        assert!(entry.is_consistent());

        ledger.apply_shot(game_id, player_id, ShotType::TwoPoint, ShotOutcome::Missed, 2);
        let entry = ledger
            .apply_shot(game_id, player_id, ShotType::TwoPoint, ShotOutcome::Missed, -5)
            .unwrap();
        assert_eq!(entry.field_goals_attempted, 1);
        assert!(entry.is_consistent());
    }

    #[test]
    fn test_counter_stats_clamp_at_zero() {
        let (mut ledger, game_id, player_id, _) = ledger_with_player();
        let entry = ledger
            .apply_counter_stat(game_id, player_id, CounterStat::Rebounds, -1)
            .unwrap();
        assert_eq!(entry.rebounds, 0);

        ledger.apply_counter_stat(game_id, player_id, CounterStat::Fouls, 2);
        let entry = ledger
            .apply_counter_stat(game_id, player_id, CounterStat::Fouls, -1)
            .unwrap();
        assert_eq!(entry.fouls, 1);
    }

    #[test]
    fn test_apply_requires_initialized_entry() {
        let mut ledger = StatLedger::new();
        let result = ledger.apply_shot(Uuid::new_v4(), Uuid::new_v4(), ShotType::TwoPoint, ShotOutcome::Made, 1);
        assert!(result.is_none());
    }

    #[test]
    fn test_ensure_initialized_is_idempotent() {
        let (mut ledger, game_id, player_id, team_id) = ledger_with_player();
        ledger.apply_counter_stat(game_id, player_id, CounterStat::Assists, 3);
        let entry = ledger.ensure_initialized(game_id, player_id, team_id);
        assert_eq!(entry.assists, 3);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_reconcile_replaces_untouched_counters() {
        let (mut ledger, game_id, player_id, team_id) = ledger_with_player();
        ledger.apply_shot(game_id, player_id, ShotType::TwoPoint, ShotOutcome::Made, 1);

        let mut server = PlayerGameStat::zeroed(game_id, player_id, team_id);
        server.points = 4;
        server.field_goals_made = 2;
        server.field_goals_attempted = 3;
        server.steals = 2;
        server.blocks = 1;
        ledger.reconcile(game_id, player_id, server.clone());

        assert_eq!(ledger.get(game_id, player_id), Some(&server));
    }

    #[test]
    fn test_snapshot_resets_entries_the_server_does_not_know() {
        let (mut ledger, game_id, player_id, team_id) = ledger_with_player();
        ledger.apply_counter_stat(game_id, player_id, CounterStat::Assists, 1);

        let other = Uuid::new_v4();
        let mut server_entry = PlayerGameStat::zeroed(game_id, other, team_id);
        server_entry.rebounds = 3;
        ledger.reconcile_snapshot(game_id, vec![server_entry]);

        assert_eq!(ledger.get(game_id, player_id).unwrap().assists, 0);
        assert_eq!(ledger.get(game_id, other).unwrap().rebounds, 3);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_team_score_sums_points_per_team() {
        let mut ledger = StatLedger::new();
        let game_id = Uuid::new_v4();
        let home = Uuid::new_v4();
        let away = Uuid::new_v4();
        let (p1, p2, p3) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        ledger.ensure_initialized(game_id, p1, home);
        ledger.ensure_initialized(game_id, p2, home);
        ledger.ensure_initialized(game_id, p3, away);

        ledger.apply_shot(game_id, p1, ShotType::ThreePoint, ShotOutcome::Made, 1);
        ledger.apply_shot(game_id, p2, ShotType::FreeThrow, ShotOutcome::Made, 2);
        ledger.apply_shot(game_id, p3, ShotType::TwoPoint, ShotOutcome::Made, 1);

        assert_eq!(ledger.team_score(game_id, home), 5);
        assert_eq!(ledger.team_score(game_id, away), 2);
        assert_eq!(ledger.team_score(Uuid::new_v4(), home), 0);
        assert_eq!(ledger.team_entries(game_id, home)[0].player_id, p1);
    }
}
