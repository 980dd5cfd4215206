//! On-court rosters for both teams of a game.
//!
//! Confirmed lineups are immutable versions; the newest one per team is the
//! current lineup. Substitutions are staged as `pending` and only become
//! current once the server confirms them, so a rejected change never shows
//! up as on court.

use std::collections::{BTreeMap, HashMap, HashSet};
use uuid::Uuid;

use crate::errors::ValidationError;
use crate::models::lineup::{BatchLineupRequest, Lineup, LineupPlayer, LineupRequest, Position, Substitution};

pub type Assignments = BTreeMap<Position, Uuid>;

#[derive(Debug, Default, Clone)]
struct TeamLineups {
    roster: HashSet<Uuid>,
    draft: Assignments,
    history: Vec<Lineup>,
    pending: Option<Assignments>,
}

impl TeamLineups {
    fn current(&self) -> Option<&Lineup> {
        self.history.last()
    }

    fn check_roster(&self, team_id: Uuid, player_id: Uuid) -> Result<(), ValidationError> {
        // An unknown roster means it was never loaded; accept any player then
        if self.roster.is_empty() || self.roster.contains(&player_id) {
            Ok(())
        } else {
            Err(ValidationError::NotOnRoster { team_id, player_id })
        }
    }
}

#[derive(Debug, Clone)]
pub struct LineupManager {
    game_id: Uuid,
    home_team_id: Uuid,
    away_team_id: Uuid,
    teams: HashMap<Uuid, TeamLineups>,
}

impl LineupManager {
    pub fn new(game_id: Uuid, home_team_id: Uuid, away_team_id: Uuid) -> Self {
        let mut teams = HashMap::new();
        teams.insert(home_team_id, TeamLineups::default());
        teams.insert(away_team_id, TeamLineups::default());
        Self {
            game_id,
            home_team_id,
            away_team_id,
            teams,
        }
    }

    fn team(&self, team_id: Uuid) -> Result<&TeamLineups, ValidationError> {
        self.teams.get(&team_id).ok_or(ValidationError::UnknownTeam(team_id))
    }

    fn team_mut(&mut self, team_id: Uuid) -> Result<&mut TeamLineups, ValidationError> {
        self.teams.get_mut(&team_id).ok_or(ValidationError::UnknownTeam(team_id))
    }

    pub fn set_roster(&mut self, team_id: Uuid, players: impl IntoIterator<Item = Uuid>) -> Result<(), ValidationError> {
        let team = self.team_mut(team_id)?;
        team.roster = players.into_iter().collect();
        Ok(())
    }

    /// Roster players who are not on court, sorted for stable display
    pub fn bench(&self, team_id: Uuid) -> Result<Vec<Uuid>, ValidationError> {
        let team = self.team(team_id)?;
        let mut bench: Vec<Uuid> = team
            .roster
            .iter()
            .filter(|player_id| !team.current().is_some_and(|lineup| lineup.contains_player(**player_id)))
            .copied()
            .collect();
        bench.sort();
        Ok(bench)
    }

    /// Stage assignments for the opening lineup. Picking a player for a new
    /// position removes them from the old one. Returns how many positions are filled.
    pub fn propose_initial_lineup(&mut self, team_id: Uuid, assignments: &[LineupPlayer]) -> Result<usize, ValidationError> {
        let team = self.team(team_id)?;
        let draft = merge_assignments(team, team_id, &team.draft, assignments)?;
        let team = self.team_mut(team_id)?;
        team.draft = draft;
        Ok(team.draft.len())
    }

    pub fn draft(&self, team_id: Uuid) -> Option<&Assignments> {
        self.teams.get(&team_id).map(|team| &team.draft)
    }

    pub fn clear_draft(&mut self, team_id: Uuid) -> Result<(), ValidationError> {
        self.team_mut(team_id)?.draft.clear();
        Ok(())
    }

    pub fn filled_count(&self, team_id: Uuid) -> usize {
        self.teams.get(&team_id).map_or(0, |team| team.draft.len())
    }

    /// All five positions filled with five different players
    pub fn is_complete(&self, team_id: Uuid) -> bool {
        self.teams
            .get(&team_id)
            .is_some_and(|team| is_full(&team.draft))
    }

    /// Validate both opening lineups and build the batch request. The drafts
    /// are only updated when both teams are complete.
    pub fn prepare_initial_commit(
        &mut self,
        home: &[LineupPlayer],
        away: &[LineupPlayer],
        period: u32,
    ) -> Result<BatchLineupRequest, ValidationError> {
        let (home_id, away_id) = (self.home_team_id, self.away_team_id);

        let home_team = self.team(home_id)?;
        let home_draft = merge_assignments(home_team, home_id, &home_team.draft, home)?;
        let away_team = self.team(away_id)?;
        let away_draft = merge_assignments(away_team, away_id, &away_team.draft, away)?;

        for (team_id, draft) in [(home_id, &home_draft), (away_id, &away_draft)] {
            if !is_full(draft) {
                return Err(ValidationError::IncompleteLineup { team_id, filled: draft.len() });
            }
        }

        let request = BatchLineupRequest {
            lineups: vec![
                LineupRequest::from_assignments(home_id, period, &home_draft),
                LineupRequest::from_assignments(away_id, period, &away_draft),
            ],
        };

        self.team_mut(home_id)?.draft = home_draft;
        self.team_mut(away_id)?.draft = away_draft;
        Ok(request)
    }

    /// Install lineups the server confirmed. Each becomes its team's current lineup.
    pub fn install_confirmed(&mut self, lineups: Vec<Lineup>) -> Result<(), ValidationError> {
        for lineup in &lineups {
            self.team(lineup.team_id)?;
        }

        for lineup in lineups {
            if lineup.players.len() != Position::ALL.len() {
                tracing::warn!(
                    "Server confirmed lineup {} for team {} with {} players",
                    lineup.id, lineup.team_id, lineup.players.len()
                );
            }
            let team = self.team_mut(lineup.team_id)?;
            team.pending = None;
            team.draft = lineup.assignments();
            team.history.push(lineup);
        }
        Ok(())
    }

    /// Validate a substitution and stage the resulting lineup as pending.
    /// Positions not named in `subs` keep their player.
    pub fn substitute(&mut self, team_id: Uuid, subs: &[Substitution], period: u32) -> Result<LineupRequest, ValidationError> {
        let team = self.team(team_id)?;

        if team.pending.is_some() {
            return Err(ValidationError::SubstitutionPending(team_id));
        }
        let current = team.current().ok_or(ValidationError::NoConfirmedLineup(team_id))?;
        if subs.is_empty() {
            return Err(ValidationError::EmptySubstitution);
        }

        let mut seen_positions = HashSet::new();
        let mut incoming = HashSet::new();
        for sub in subs {
            if !seen_positions.insert(sub.position) {
                return Err(ValidationError::DuplicatePosition(sub.position));
            }
            if current.player_at(sub.position) != Some(sub.player_out) {
                return Err(ValidationError::PlayerNotAtPosition {
                    position: sub.position,
                    player_id: sub.player_out,
                });
            }
            if current.contains_player(sub.player_in) || !incoming.insert(sub.player_in) {
                return Err(ValidationError::PlayerAlreadyOnCourt(sub.player_in));
            }
            team.check_roster(team_id, sub.player_in)?;
        }

        let mut next = current.assignments();
        for sub in subs {
            next.insert(sub.position, sub.player_in);
        }

        let request = LineupRequest::from_assignments(team_id, period, &next);
        self.team_mut(team_id)?.pending = Some(next);
        Ok(request)
    }

    pub fn confirm_substitution(&mut self, lineup: Lineup) -> Result<(), ValidationError> {
        self.install_confirmed(vec![lineup])
    }

    /// Drop the pending change; the last confirmed lineup stays current
    pub fn reject_substitution(&mut self, team_id: Uuid) -> Result<(), ValidationError> {
        self.team_mut(team_id)?.pending = None;
        Ok(())
    }

    /// Adopt the server's current lineup after a re-fetch. Returns true if it
    /// differed from the local current lineup.
    pub fn sync_current(&mut self, lineup: Lineup) -> Result<bool, ValidationError> {
        let team = self.team_mut(lineup.team_id)?;
        if team.current().is_some_and(|current| current.id == lineup.id) {
            return Ok(false);
        }
        team.draft = lineup.assignments();
        team.history.push(lineup);
        Ok(true)
    }

    pub fn current(&self, team_id: Uuid) -> Option<&Lineup> {
        self.teams.get(&team_id).and_then(TeamLineups::current)
    }

    pub fn on_court(&self, team_id: Uuid) -> Option<Assignments> {
        self.current(team_id).map(Lineup::assignments)
    }

    pub fn pending(&self, team_id: Uuid) -> Option<&Assignments> {
        self.teams.get(&team_id).and_then(|team| team.pending.as_ref())
    }

    /// Every confirmed lineup of the team, oldest first
    pub fn history(&self, team_id: Uuid) -> &[Lineup] {
        self.teams
            .get(&team_id)
            .map(|team| team.history.as_slice())
            .unwrap_or(&[])
    }

    pub fn has_confirmed(&self, team_id: Uuid) -> bool {
        self.current(team_id).is_some()
    }

    pub fn both_confirmed(&self) -> bool {
        self.has_confirmed(self.home_team_id) && self.has_confirmed(self.away_team_id)
    }

    pub fn is_on_court(&self, team_id: Uuid, player_id: Uuid) -> bool {
        self.current(team_id).is_some_and(|lineup| lineup.contains_player(player_id))
    }

    pub fn is_on_roster(&self, team_id: Uuid, player_id: Uuid) -> bool {
        self.teams
            .get(&team_id)
            .is_some_and(|team| team.check_roster(team_id, player_id).is_ok())
    }

    pub fn game_id(&self) -> Uuid {
        self.game_id
    }
}

fn is_full(assignments: &Assignments) -> bool {
    let distinct: HashSet<&Uuid> = assignments.values().collect();
    assignments.len() == Position::ALL.len() && distinct.len() == Position::ALL.len()
}

/// Apply assignments on top of a draft with exclusive-choice semantics
fn merge_assignments(
    team: &TeamLineups,
    team_id: Uuid,
    draft: &Assignments,
    assignments: &[LineupPlayer],
) -> Result<Assignments, ValidationError> {
    let mut merged = draft.clone();
    for assignment in assignments {
        team.check_roster(team_id, assignment.player_id)?;
        merged.retain(|position, player_id| *position == assignment.position || *player_id != assignment.player_id);
        merged.insert(assignment.position, assignment.player_id);
    }
    Ok(merged)
}
