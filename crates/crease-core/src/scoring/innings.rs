// Innings engine: the live state of one innings, ball processing, and the
// exact inverse used for undo.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ball::{BallEvent, BallInput, ExtraKind};
use super::commentary::{self, CommentaryNames};
use super::error::ScoreError;
use super::overs::Overs;
use super::player::{find_player, player_name, Player, PlayerId, Team, TeamId};
use super::scorecard::{credit_batter, credit_bowler};

/// Wickets that end an innings.
pub const ALL_OUT_WICKETS: u32 = 10;

// ---------------------------------------------------------------------------
// Partnership & fall of wickets
// ---------------------------------------------------------------------------

/// Runs and balls added by the two batters currently together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partnership {
    /// Batter already at the crease when the partnership began (the striker
    /// for the opening pair).
    pub batter_a: PlayerId,
    /// Batter who joined (the non-striker for the opening pair).
    pub batter_b: PlayerId,
    pub runs: u32,
    /// Balls faced together; wides are not counted.
    pub balls: u32,
}

impl Partnership {
    pub fn new(batter_a: &str, batter_b: &str) -> Self {
        Partnership {
            batter_a: batter_a.to_string(),
            batter_b: batter_b.to_string(),
            runs: 0,
            balls: 0,
        }
    }

    /// Replay the partnership rules over a ball history: non-wicket balls add
    /// to the current pair, and a wicket with a seated replacement starts a
    /// new pair.
    pub fn rebuild(history: &[BallEvent], openers: (&str, &str)) -> Self {
        let mut partnership = Partnership::new(openers.0, openers.1);
        for ball in history {
            if !ball.is_wicket {
                partnership.add(ball);
                continue;
            }
            if let Some(incoming) = &ball.incoming_batter_id {
                let victim = ball.dismissed_player_id.as_deref().unwrap_or(&ball.batter_id);
                let survivor = if victim == ball.batter_id {
                    &ball.non_striker_id
                } else {
                    &ball.batter_id
                };
                partnership = Partnership::new(survivor, incoming);
            }
        }
        partnership
    }

    fn add(&mut self, ball: &BallEvent) {
        self.runs = self.runs.saturating_add(ball.total_runs());
        if ball.faced_by_batter() {
            self.balls += 1;
        }
    }

    fn remove(&mut self, ball: &BallEvent) {
        self.runs = self.runs.saturating_sub(ball.total_runs());
        if ball.faced_by_batter() {
            self.balls = self.balls.saturating_sub(1);
        }
    }
}

/// Score at the moment a batter was dismissed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallOfWicket {
    /// Innings total including the wicket ball.
    pub runs: u32,
    /// Wicket number (1 for the first wicket).
    pub wickets: u32,
    /// Overs completed before the wicket ball.
    pub overs: Overs,
    pub player_id: PlayerId,
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Everything a recorded ball produced. `batter` and `bowler` are updated
/// copies of the roster records; the caller commits them.
#[derive(Debug, Clone, PartialEq)]
pub struct BallOutcome {
    pub ball: BallEvent,
    pub batter: Player,
    pub bowler: Player,
    pub over_completed: bool,
    pub fall_of_wicket: Option<FallOfWicket>,
}

/// The ball removed by an undo.
#[derive(Debug, Clone, PartialEq)]
pub struct UndoneBall {
    pub ball: BallEvent,
    /// Whether the removed ball had completed an over.
    pub over_completed: bool,
}

// ---------------------------------------------------------------------------
// InningsState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InningsState {
    /// 1 or 2.
    pub number: u8,
    pub batting_team_id: TeamId,
    pub bowling_team_id: TeamId,
    pub runs: u32,
    pub wickets: u32,
    pub overs: Overs,
    pub balls: Vec<BallEvent>,
    pub striker_id: Option<PlayerId>,
    pub non_striker_id: Option<PlayerId>,
    pub bowler_id: Option<PlayerId>,
    /// Batters in order of first appearance.
    pub batting_order: Vec<PlayerId>,
    pub players_out: Vec<PlayerId>,
    pub is_free_hit: bool,
    pub partnership: Partnership,
    pub fall_of_wickets: Vec<FallOfWicket>,
}

impl InningsState {
    pub fn new(
        number: u8,
        batting_team_id: &str,
        bowling_team_id: &str,
        striker_id: &str,
        non_striker_id: &str,
        bowler_id: &str,
    ) -> Self {
        InningsState {
            number,
            batting_team_id: batting_team_id.to_string(),
            bowling_team_id: bowling_team_id.to_string(),
            runs: 0,
            wickets: 0,
            overs: Overs::ZERO,
            balls: Vec::new(),
            striker_id: Some(striker_id.to_string()),
            non_striker_id: Some(non_striker_id.to_string()),
            bowler_id: Some(bowler_id.to_string()),
            batting_order: vec![striker_id.to_string(), non_striker_id.to_string()],
            players_out: Vec::new(),
            is_free_hit: false,
            partnership: Partnership::new(striker_id, non_striker_id),
            fall_of_wickets: Vec::new(),
        }
    }

    pub fn is_all_out(&self) -> bool {
        self.wickets >= ALL_OUT_WICKETS
    }

    /// Runs per over so far.
    pub fn run_rate(&self) -> f64 {
        if self.overs.balls() == 0 {
            return 0.0;
        }
        f64::from(self.runs) / self.overs.true_overs()
    }

    /// True when a dismissed batter still occupies one of the crease slots.
    pub fn awaiting_batter(&self) -> bool {
        self.vacant_slot_holder().is_some()
    }

    fn vacant_slot_holder(&self) -> Option<&PlayerId> {
        [&self.striker_id, &self.non_striker_id]
            .into_iter()
            .flatten()
            .find(|id| self.players_out.contains(id))
    }

    fn openers(&self) -> (&str, &str) {
        match self.batting_order.as_slice() {
            [a, b, ..] => (a.as_str(), b.as_str()),
            [a] => (a.as_str(), ""),
            [] => ("", ""),
        }
    }

    pub fn swap_strike(&mut self) {
        std::mem::swap(&mut self.striker_id, &mut self.non_striker_id);
    }

    pub fn set_bowler(&mut self, bowler_id: &str) {
        self.bowler_id = Some(bowler_id.to_string());
    }

    /// Bowler of the most recent ball, if any ball has been bowled.
    pub fn last_bowler_id(&self) -> Option<&str> {
        self.balls.last().map(|b| b.bowler_id.as_str())
    }

    /// Record one delivery.
    ///
    /// Steps run in a fixed order because later ones read what earlier ones
    /// wrote: ball-in-over, total, partnership or wicket/FOW, player figures,
    /// overs, history, odd-run strike swap, replacement batter, end-of-over
    /// swap, free hit. All validation happens before the first write, so an
    /// error leaves the innings untouched.
    pub fn record_ball(
        &mut self,
        input: &BallInput,
        teams: &[Team],
        next_batter_id: Option<&str>,
    ) -> Result<BallOutcome, ScoreError> {
        input.check_runs()?;
        let striker_id = self
            .striker_id
            .clone()
            .ok_or(ScoreError::MissingActor("striker"))?;
        let non_striker_id = self
            .non_striker_id
            .clone()
            .ok_or(ScoreError::MissingActor("non-striker"))?;
        let bowler_id = self
            .bowler_id
            .clone()
            .ok_or(ScoreError::MissingActor("bowler"))?;
        if self.awaiting_batter() {
            return Err(ScoreError::AwaitingBatter);
        }

        let batter = find_player(teams, &striker_id)
            .ok_or_else(|| ScoreError::UnknownPlayer(striker_id.clone()))?;
        let bowler = find_player(teams, &bowler_id)
            .ok_or_else(|| ScoreError::UnknownPlayer(bowler_id.clone()))?;

        let victim_id = match &input.wicket {
            Some(dismissal) => {
                let victim = dismissal
                    .player_id
                    .clone()
                    .unwrap_or_else(|| striker_id.clone());
                if victim != striker_id && victim != non_striker_id {
                    return Err(ScoreError::VictimNotAtCrease(victim));
                }
                Some(victim)
            }
            None => None,
        };

        // The last wicket ends the innings, so nobody walks in after it.
        let incoming_id = match (&victim_id, next_batter_id) {
            (Some(_), Some(next)) if self.wickets + 1 < ALL_OUT_WICKETS => {
                Some(self.check_incoming(next, teams)?.id.clone())
            }
            _ => None,
        };

        // 1. Ball-in-over from the overs before this ball.
        let is_valid_ball = input.is_valid_ball();
        let overs_before = self.overs;
        let ball_in_over = if is_valid_ball {
            overs_before.balls_in_over() + 1
        } else {
            overs_before.balls_in_over()
        };

        let mut ball = BallEvent {
            id: self.balls.len() as u32 + 1,
            over_number: overs_before.whole_overs(),
            ball_in_over,
            bowler_id: bowler_id.clone(),
            batter_id: striker_id.clone(),
            non_striker_id: non_striker_id.clone(),
            runs_scored: input.runs_scored,
            extras: input.extras,
            extra_kind: input.extra_kind,
            is_wicket: victim_id.is_some(),
            wicket_kind: input.wicket.as_ref().map(|d| d.kind),
            dismissed_player_id: victim_id.clone(),
            is_valid_ball,
            is_free_hit: self.is_free_hit,
            commentary: String::new(),
            incoming_batter_id: incoming_id.clone(),
        };
        let dismissed_name = victim_id
            .as_deref()
            .map_or(batter.name.as_str(), |id| player_name(teams, id));
        ball.commentary = commentary::describe(
            &ball,
            CommentaryNames {
                bowler: &bowler.name,
                batter: &batter.name,
                dismissed: dismissed_name,
            },
        );

        // 2. Innings total.
        self.runs = self.runs.saturating_add(ball.total_runs());

        // 3-4. Partnership, or wicket and fall of wicket.
        let mut fall_of_wicket = None;
        match &victim_id {
            Some(victim) => {
                self.wickets += 1;
                self.players_out.push(victim.clone());
                let entry = FallOfWicket {
                    runs: self.runs,
                    wickets: self.wickets,
                    overs: overs_before,
                    player_id: victim.clone(),
                };
                self.fall_of_wickets.push(entry.clone());
                fall_of_wicket = Some(entry);
            }
            None => self.partnership.add(&ball),
        }

        // 5. Player figures, on copies. The bowler's overs advance here too.
        let mut batter = batter.clone();
        let mut bowler = bowler.clone();
        credit_batter(&ball, &mut batter.stats);
        credit_bowler(&ball, &mut bowler.stats);

        // 6. Innings overs.
        let over_completed = is_valid_ball && self.overs.add_ball();

        // 7. History.
        let recorded = ball.clone();
        self.balls.push(ball);

        // 8. Odd runs change ends.
        if recorded.runs_scored % 2 == 1 {
            self.swap_strike();
        }

        // 9. Replacement batter takes the dismissed batter's slot.
        if let (Some(victim), Some(incoming)) = (&victim_id, &incoming_id) {
            self.seat_in_place_of(victim, incoming);
        }

        // 10. End of over.
        if over_completed {
            self.swap_strike();
        }

        // 11. Free hit follows a no-ball until the next legal delivery.
        if recorded.extra_kind == ExtraKind::NoBall {
            self.is_free_hit = true;
        } else if is_valid_ball {
            self.is_free_hit = false;
        }

        debug!(
            "innings {} ball {}: {} ({}/{} in {})",
            self.number, recorded.id, recorded.commentary, self.runs, self.wickets, self.overs
        );

        Ok(BallOutcome {
            ball: recorded,
            batter,
            bowler,
            over_completed,
            fall_of_wicket,
        })
    }

    /// Seat a replacement for a dismissed batter after the wicket ball was
    /// recorded without one.
    pub fn seat_batter(&mut self, batter_id: &str, teams: &[Team]) -> Result<(), ScoreError> {
        if self.is_all_out() {
            return Err(ScoreError::NoVacancy);
        }
        let victim = self
            .vacant_slot_holder()
            .cloned()
            .ok_or(ScoreError::NoVacancy)?;
        let incoming = self.check_incoming(batter_id, teams)?.id.clone();

        self.seat_in_place_of(&victim, &incoming);

        // Remember who walked in so undoing the wicket ball can reverse it.
        if let Some(last) = self.balls.last_mut() {
            if last.is_wicket
                && last.incoming_batter_id.is_none()
                && last.dismissed_player_id.as_deref() == Some(victim.as_str())
            {
                last.incoming_batter_id = Some(incoming);
            }
        }
        Ok(())
    }

    /// Remove the most recent ball and reverse its effects. Returns `None`
    /// when there is nothing to undo.
    pub fn undo_last_ball(&mut self) -> Option<UndoneBall> {
        let ball = self.balls.pop()?;
        let over_completed = ball.completes_over();

        // Reverse order of record_ball: end-of-over swap first.
        if over_completed {
            self.swap_strike();
        }

        if let Some(incoming) = &ball.incoming_batter_id {
            let victim = ball
                .dismissed_player_id
                .clone()
                .unwrap_or_else(|| ball.batter_id.clone());
            if self.striker_id.as_deref() == Some(incoming.as_str()) {
                self.striker_id = Some(victim);
            } else if self.non_striker_id.as_deref() == Some(incoming.as_str()) {
                self.non_striker_id = Some(victim);
            }
            if let Some(pos) = self.batting_order.iter().rposition(|id| id == incoming) {
                self.batting_order.remove(pos);
            }
        }

        if ball.runs_scored % 2 == 1 {
            self.swap_strike();
        }

        if ball.is_valid_ball {
            self.overs.remove_ball();
        }
        self.bowler_id = Some(ball.bowler_id.clone());

        self.runs = self.runs.saturating_sub(ball.total_runs());

        if ball.is_wicket {
            self.wickets = self.wickets.saturating_sub(1);
            if let Some(victim) = &ball.dismissed_player_id {
                if let Some(pos) = self.players_out.iter().rposition(|id| id == victim) {
                    self.players_out.remove(pos);
                }
            }
            self.fall_of_wickets.pop();
            let (a, b) = self.openers();
            self.partnership = Partnership::rebuild(&self.balls, (a, b));
        } else {
            self.partnership.remove(&ball);
        }

        self.is_free_hit = free_hit_after(&self.balls);

        debug!(
            "innings {} undo ball {}: back to {}/{} in {}",
            self.number, ball.id, self.runs, self.wickets, self.overs
        );

        Some(UndoneBall {
            ball,
            over_completed,
        })
    }

    fn check_incoming<'a>(&self, batter_id: &str, teams: &'a [Team]) -> Result<&'a Player, ScoreError> {
        let player = find_player(teams, batter_id)
            .ok_or_else(|| ScoreError::UnknownPlayer(batter_id.to_string()))?;
        if player.team_id != self.batting_team_id {
            return Err(ScoreError::WrongTeam {
                player: player.id.clone(),
                team: self.batting_team_id.clone(),
            });
        }
        if self.batting_order.iter().any(|id| id == batter_id) {
            return Err(ScoreError::PlayerAlreadyBatted(batter_id.to_string()));
        }
        Ok(player)
    }

    fn seat_in_place_of(&mut self, victim: &str, incoming: &str) {
        let survivor = if self.striker_id.as_deref() == Some(victim) {
            self.striker_id = Some(incoming.to_string());
            self.non_striker_id.clone()
        } else {
            self.non_striker_id = Some(incoming.to_string());
            self.striker_id.clone()
        };
        self.batting_order.push(incoming.to_string());
        self.partnership = Partnership::new(survivor.as_deref().unwrap_or_default(), incoming);
    }
}

/// Free-hit status implied by a history: the latest no-ball or legal ball
/// decides it, and wides in between leave it alone.
fn free_hit_after(history: &[BallEvent]) -> bool {
    for ball in history.iter().rev() {
        if ball.extra_kind == ExtraKind::NoBall {
            return true;
        }
        if ball.is_valid_ball {
            return false;
        }
    }
    false
}
