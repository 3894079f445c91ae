// Tournament session: owns the teams and matches and exposes every scoring
// mutation. Each mutation runs against a copy of the match and is committed
// only if it succeeds.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::scoring::ball::BallInput;
use crate::scoring::error::ScoreError;
use crate::scoring::events::MatchEvent;
use crate::scoring::match_state::{KnockoutStage, Match, MatchStatus, TossResult};
use crate::scoring::player::{find_player, find_team, Group, Player, Team, TeamId};
use crate::scoring::scorecard::replay_player_stats;

use super::ledger::recompute_standings;
use super::standings::{standings, StandingRow};

/// Everything needed to render or persist the tournament.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TournamentSnapshot {
    pub teams: Vec<Team>,
    pub matches: Vec<Match>,
}

/// Longest innings a fixture may be scheduled for.
pub const MAX_OVERS_PER_INNINGS: u32 = 50;

/// Parameters for a new fixture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSetup {
    pub date: NaiveDate,
    pub team_a_id: TeamId,
    pub team_b_id: TeamId,
    pub total_overs: u32,
    #[serde(default)]
    pub knockout_stage: Option<KnockoutStage>,
}

#[derive(Debug, Clone, Default)]
pub struct Tournament {
    teams: Vec<Team>,
    matches: Vec<Match>,
}

impl Tournament {
    pub fn new(teams: Vec<Team>) -> Self {
        Tournament {
            teams,
            matches: Vec::new(),
        }
    }

    /// Rebuild a session from a snapshot. Player and team stats are derived
    /// from the matches rather than trusted from the snapshot.
    pub fn hydrate(snapshot: TournamentSnapshot) -> Self {
        let mut tournament = Tournament {
            teams: snapshot.teams,
            matches: snapshot.matches,
        };
        replay_player_stats(&mut tournament.teams, &tournament.matches);
        recompute_standings(&mut tournament.teams, &tournament.matches);
        info!(
            "Hydrated tournament: {} teams, {} matches",
            tournament.teams.len(),
            tournament.matches.len()
        );
        tournament
    }

    pub fn snapshot(&self) -> TournamentSnapshot {
        TournamentSnapshot {
            teams: self.teams.clone(),
            matches: self.matches.clone(),
        }
    }

    // --- reads ---

    pub fn teams(&self) -> &[Team] {
        &self.teams
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn team(&self, team_id: &str) -> Option<&Team> {
        find_team(&self.teams, team_id)
    }

    pub fn match_by_id(&self, match_id: &str) -> Option<&Match> {
        self.matches.iter().find(|m| m.id == match_id)
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        find_player(&self.teams, player_id)
    }

    pub fn standings(&self, group: Option<Group>) -> Vec<StandingRow> {
        standings(&self.teams, group)
    }

    // --- mutations ---

    pub fn create_match(&mut self, setup: MatchSetup) -> Result<Vec<MatchEvent>, ScoreError> {
        for team_id in [&setup.team_a_id, &setup.team_b_id] {
            if self.team(team_id).is_none() {
                return Err(ScoreError::UnknownTeam(team_id.clone()));
            }
        }
        if setup.team_a_id == setup.team_b_id {
            return Err(ScoreError::InvalidMatchSetup(
                "a team cannot play itself".to_string(),
            ));
        }
        if !(1..=MAX_OVERS_PER_INNINGS).contains(&setup.total_overs) {
            return Err(ScoreError::InvalidMatchSetup(format!(
                "overs per innings must be between 1 and {MAX_OVERS_PER_INNINGS}, got {}",
                setup.total_overs
            )));
        }

        let id = self.next_match_id();
        let m = Match::new(
            &id,
            setup.date,
            &setup.team_a_id,
            &setup.team_b_id,
            setup.total_overs,
            setup.knockout_stage,
        );
        info!("Created {}: {} vs {}", id, setup.team_a_id, setup.team_b_id);
        self.matches.push(m);
        Ok(vec![MatchEvent::MatchCreated { match_id: id }])
    }

    fn next_match_id(&self) -> String {
        let mut n = self.matches.len() + 1;
        loop {
            let id = format!("match_{n}");
            if self.match_by_id(&id).is_none() {
                return id;
            }
            n += 1;
        }
    }

    pub fn record_toss(&mut self, match_id: &str, toss: TossResult) -> Result<Vec<MatchEvent>, ScoreError> {
        self.apply(match_id, |m, _| m.record_toss(toss))
    }

    pub fn start_innings(
        &mut self,
        match_id: &str,
        striker_id: &str,
        non_striker_id: &str,
        bowler_id: &str,
    ) -> Result<Vec<MatchEvent>, ScoreError> {
        self.apply(match_id, |m, teams| {
            m.start_innings(teams, striker_id, non_striker_id, bowler_id)
        })
    }

    pub fn set_next_bowler(&mut self, match_id: &str, bowler_id: &str) -> Result<Vec<MatchEvent>, ScoreError> {
        self.apply(match_id, |m, teams| m.set_next_bowler(teams, bowler_id))
    }

    pub fn set_next_batter(&mut self, match_id: &str, batter_id: &str) -> Result<Vec<MatchEvent>, ScoreError> {
        self.apply(match_id, |m, teams| m.set_next_batter(teams, batter_id))
    }

    pub fn swap_strike(&mut self, match_id: &str) -> Result<Vec<MatchEvent>, ScoreError> {
        self.apply(match_id, |m, _| m.swap_strike())
    }

    /// Record a delivery, commit the batter's and bowler's updated figures,
    /// and refresh standings if the match finished.
    pub fn record_ball(
        &mut self,
        match_id: &str,
        input: &BallInput,
        next_batter_id: Option<&str>,
    ) -> Result<Vec<MatchEvent>, ScoreError> {
        let report = self.apply(match_id, |m, teams| m.record_ball(input, teams, next_batter_id))?;

        self.commit_player(report.outcome.batter);
        self.commit_player(report.outcome.bowler);

        let mut events = report.events;
        self.refresh_standings_if_needed(&mut events);
        Ok(events)
    }

    /// Undo the last ball of a match. Player stats are rebuilt from history.
    pub fn undo_last_ball(&mut self, match_id: &str) -> Result<Vec<MatchEvent>, ScoreError> {
        let mut events = self.apply(match_id, |m, _| m.undo_last_ball())?;
        if events.iter().any(|e| matches!(e, MatchEvent::BallUndone { .. })) {
            replay_player_stats(&mut self.teams, &self.matches);
        }
        self.refresh_standings_if_needed(&mut events);
        Ok(events)
    }

    pub fn end_match(&mut self, match_id: &str) -> Result<Vec<MatchEvent>, ScoreError> {
        let mut events = self.apply(match_id, |m, teams| m.end_match(teams))?;
        self.refresh_standings_if_needed(&mut events);
        Ok(events)
    }

    pub fn abandon_match(&mut self, match_id: &str, reason: &str) -> Result<Vec<MatchEvent>, ScoreError> {
        let mut events = self.apply(match_id, |m, _| m.abandon(reason))?;
        self.refresh_standings_if_needed(&mut events);
        Ok(events)
    }

    /// Run `op` on a copy of the match and swap the copy in on success.
    fn apply<T>(
        &mut self,
        match_id: &str,
        op: impl FnOnce(&mut Match, &[Team]) -> Result<T, ScoreError>,
    ) -> Result<T, ScoreError> {
        let idx = self
            .matches
            .iter()
            .position(|m| m.id == match_id)
            .ok_or_else(|| ScoreError::UnknownMatch(match_id.to_string()))?;
        let mut working = self.matches[idx].clone();
        let out = op(&mut working, &self.teams)?;
        self.matches[idx] = working;
        Ok(out)
    }

    fn commit_player(&mut self, updated: Player) {
        let slot = self
            .teams
            .iter_mut()
            .find(|t| t.id == updated.team_id)
            .and_then(|t| t.player_mut(&updated.id));
        match slot {
            Some(player) => *player = updated,
            None => warn!("Player {} vanished from roster before commit", updated.id),
        }
    }

    fn refresh_standings_if_needed(&mut self, events: &mut Vec<MatchEvent>) {
        if events.iter().any(MatchEvent::affects_standings) {
            recompute_standings(&mut self.teams, &self.matches);
            events.push(MatchEvent::StandingsUpdated);
        }
    }

    /// Matches currently in progress.
    pub fn live_matches(&self) -> impl Iterator<Item = &Match> {
        self.matches.iter().filter(|m| m.status() == MatchStatus::Live)
    }
}
