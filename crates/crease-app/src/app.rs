// Application state and orchestration logic.
//
// The central event loop that applies scorer commands from the WebSocket
// client (and local shutdown commands) to the tournament, persists what
// changed, and broadcasts notifications back to connected clients.

use std::collections::BTreeSet;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crease_core::scoring::{MatchEvent, ScoreError};
use crease_core::tournament::Tournament;

use crate::config::Config;
use crate::db::Database;
use crate::protocol::{ConnectionStatus, Notification, ScorerCommand};
use crate::ws_server::WsEvent;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub config: Config,
    pub tournament: Tournament,
    pub db: Database,
    pub connection_status: ConnectionStatus,
    /// When the last local mutation was applied. Remote snapshots arriving
    /// within `sync.suppress_window_ms` of it are ignored so a stale copy
    /// cannot overwrite a ball that was just scored.
    pub last_local_write: Option<Instant>,
}

impl AppState {
    pub fn new(config: Config, tournament: Tournament, db: Database) -> Self {
        AppState {
            config,
            tournament,
            db,
            connection_status: ConnectionStatus::Disconnected,
            last_local_write: None,
        }
    }

    /// Full tournament state and the overall points table.
    pub fn build_snapshot(&self) -> Notification {
        Notification::Snapshot {
            snapshot: Box::new(self.tournament.snapshot()),
            standings: self.tournament.standings(None),
        }
    }

    /// Apply one command and return the notifications to publish.
    ///
    /// Successful mutations yield the produced events followed by a fresh
    /// snapshot. Refused commands yield a single `Rejected` and leave the
    /// tournament untouched.
    pub fn apply_command(&mut self, cmd: ScorerCommand) -> Vec<Notification> {
        let name = cmd.name();
        debug!("Applying command {}", name);

        let result: Result<Vec<MatchEvent>, ScoreError> = match cmd {
            ScorerCommand::CreateMatch { .. } => {
                match cmd.match_setup(self.config.tournament.default_overs) {
                    Some(setup) => self.tournament.create_match(setup),
                    None => Ok(Vec::new()),
                }
            }
            ScorerCommand::RecordToss { match_id, toss } => {
                self.tournament.record_toss(&match_id, toss)
            }
            ScorerCommand::StartInnings {
                match_id,
                striker_id,
                non_striker_id,
                bowler_id,
            } => self
                .tournament
                .start_innings(&match_id, &striker_id, &non_striker_id, &bowler_id),
            ScorerCommand::SetNextBowler { match_id, bowler_id } => {
                self.tournament.set_next_bowler(&match_id, &bowler_id)
            }
            ScorerCommand::SetNextBatter { match_id, batter_id } => {
                self.tournament.set_next_batter(&match_id, &batter_id)
            }
            ScorerCommand::SwapStrike { match_id } => self.tournament.swap_strike(&match_id),
            ScorerCommand::RecordBall {
                match_id,
                ball,
                next_batter_id,
            } => self
                .tournament
                .record_ball(&match_id, &ball, next_batter_id.as_deref()),
            ScorerCommand::UndoLastBall { match_id } => self.tournament.undo_last_ball(&match_id),
            ScorerCommand::EndMatch { match_id } => self.tournament.end_match(&match_id),
            ScorerCommand::AbandonMatch { match_id, reason } => {
                self.tournament.abandon_match(&match_id, &reason)
            }
            ScorerCommand::Hydrate { snapshot } => {
                if let Some(age) = self.suppressing_remote() {
                    info!(
                        "Ignoring remote snapshot, last local write {}ms ago",
                        age.as_millis()
                    );
                    return vec![Notification::Rejected {
                        command: name.to_string(),
                        reason: "local changes are newer than the remote snapshot".to_string(),
                    }];
                }
                self.tournament = Tournament::hydrate(snapshot);
                if let Err(e) = self.db.save_snapshot(&self.tournament.snapshot()) {
                    warn!("Failed to persist hydrated snapshot: {:#}", e);
                }
                return vec![self.build_snapshot()];
            }
            ScorerCommand::RequestSnapshot => return vec![self.build_snapshot()],
            ScorerCommand::Quit => return Vec::new(),
        };

        match result {
            Ok(events) => {
                info!("{} applied ({} events)", name, events.len());
                self.last_local_write = Some(Instant::now());
                self.persist(&events);
                vec![Notification::Events { events }, self.build_snapshot()]
            }
            Err(e) => {
                warn!("{} rejected: {}", name, e);
                vec![Notification::Rejected {
                    command: name.to_string(),
                    reason: e.to_string(),
                }]
            }
        }
    }

    /// Returns how long ago the last local write happened if that is still
    /// inside the suppression window.
    fn suppressing_remote(&self) -> Option<Duration> {
        let window = Duration::from_millis(self.config.sync.suppress_window_ms);
        let age = self.last_local_write?.elapsed();
        (age < window).then_some(age)
    }

    /// Save every match the events touched plus the team rosters. Failures
    /// are logged and do not undo the in-memory change.
    fn persist(&self, events: &[MatchEvent]) {
        let touched: BTreeSet<&str> = events.iter().filter_map(MatchEvent::match_id).collect();
        if touched.is_empty() {
            return;
        }
        if let Err(e) = self.db.save_teams(self.tournament.teams()) {
            warn!("Failed to persist teams: {:#}", e);
        }
        for match_id in touched {
            let Some(m) = self.tournament.match_by_id(match_id) else {
                continue;
            };
            if let Err(e) = self.db.save_match(m) {
                warn!("Failed to persist {}: {:#}", match_id, e);
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Listens on two channels using `tokio::select!`:
/// 1. WebSocket events from the scorer client
/// 2. Local commands (shutdown)
///
/// Publishes notifications through `updates`; having no subscribers is not
/// an error.
pub async fn run(
    mut ws_rx: mpsc::Receiver<WsEvent>,
    mut cmd_rx: mpsc::Receiver<ScorerCommand>,
    updates: broadcast::Sender<Notification>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    loop {
        tokio::select! {
            // --- WebSocket events ---
            ws_event = ws_rx.recv() => {
                match ws_event {
                    Some(WsEvent::Connected { addr }) => {
                        info!("Scorer connected from {}", addr);
                        state.connection_status = ConnectionStatus::Connected;
                        let _ = updates.send(Notification::ConnectionStatus { status: ConnectionStatus::Connected });
                        let _ = updates.send(state.build_snapshot());
                    }
                    Some(WsEvent::Disconnected) => {
                        info!("Scorer disconnected");
                        state.connection_status = ConnectionStatus::Disconnected;
                        let _ = updates.send(Notification::ConnectionStatus { status: ConnectionStatus::Disconnected });
                    }
                    Some(WsEvent::Message(json_str)) => {
                        handle_ws_message(&mut state, &json_str, &updates);
                    }
                    None => {
                        info!("WebSocket channel closed, shutting down");
                        break;
                    }
                }
            }

            // --- Local commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ScorerCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => {
                        publish(&updates, state.apply_command(cmd));
                    }
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    info!("Application event loop exiting");
    Ok(())
}

/// Handle an incoming WebSocket message (JSON from the scorer client).
fn handle_ws_message(
    state: &mut AppState,
    json_str: &str,
    updates: &broadcast::Sender<Notification>,
) {
    let cmd: ScorerCommand = match serde_json::from_str(json_str) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse scorer message: {}", e);
            let _ = updates.send(Notification::Rejected {
                command: "unknown".to_string(),
                reason: format!("malformed command: {e}"),
            });
            return;
        }
    };
    publish(updates, state.apply_command(cmd));
}

fn publish(updates: &broadcast::Sender<Notification>, notifications: Vec<Notification>) {
    for n in notifications {
        let _ = updates.send(n);
    }
}

// ---------------------------------------------------------------------------
// Crash recovery
// ---------------------------------------------------------------------------

/// Restore the tournament from the database after a crash/restart.
///
/// Player and team figures are rebuilt from match history rather than read
/// back from the stored rows.
pub fn recover_from_db(state: &mut AppState) -> anyhow::Result<bool> {
    if !state.db.has_snapshot()? {
        info!("No stored tournament, starting fresh");
        return Ok(false);
    }
    let Some(snapshot) = state.db.load_snapshot()? else {
        return Ok(false);
    };

    let stored_live = state.db.match_count_with_status("live")?;
    let last_saved = match state.db.load_state(Database::LAST_SAVED_KEY)? {
        Some(serde_json::Value::String(at)) => at,
        _ => "unknown".to_string(),
    };
    let match_count = snapshot.matches.len();
    state.tournament = Tournament::hydrate(snapshot);
    let live = state.tournament.live_matches().count();
    if live != stored_live {
        warn!(
            "Stored status rows list {} live matches, match history has {}",
            stored_live, live
        );
    }
    info!(
        "Crash recovery complete: {} teams, {} matches ({} live), last saved {}",
        state.tournament.teams().len(),
        match_count,
        live,
        last_saved
    );
    Ok(true)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SyncConfig, TournamentConfig};
    use chrono::NaiveDate;
    use crease_core::scoring::{
        BallInput, Group, MatchStatus, Player, Team, TossDecision, TossResult, WicketKind,
    };

    // -----------------------------------------------------------------------
    // Test helpers
    // -----------------------------------------------------------------------

    fn test_config() -> Config {
        Config {
            tournament: TournamentConfig {
                name: "Test Cup".into(),
                default_overs: 2,
                roster_csv: "data/teams.csv".into(),
            },
            ws_port: 9002,
            db_path: ":memory:".into(),
            sync: SyncConfig {
                suppress_window_ms: 3000,
            },
        }
    }

    fn squad(id: &str, prefix: &str, group: Group) -> Team {
        let mut team = Team::new(id, &format!("Team {id}"), group);
        for i in 1..=11 {
            team.players
                .push(Player::new(&format!("{prefix}{i}"), &format!("{prefix}{i}"), id));
        }
        team
    }

    fn test_state() -> AppState {
        let teams = vec![squad("t1", "f", Group::A), squad("t2", "h", Group::A)];
        let db = Database::open(":memory:").unwrap();
        AppState::new(test_config(), Tournament::new(teams), db)
    }

    fn create(state: &mut AppState) {
        state.apply_command(ScorerCommand::CreateMatch {
            date: NaiveDate::from_ymd_opt(2026, 4, 2).unwrap(),
            team_a_id: "t1".into(),
            team_b_id: "t2".into(),
            total_overs: None,
            knockout_stage: None,
        });
    }

    fn start(state: &mut AppState) {
        create(state);
        state.apply_command(ScorerCommand::RecordToss {
            match_id: "match_1".into(),
            toss: TossResult {
                winner_id: "t1".into(),
                decision: TossDecision::Bat,
            },
        });
        state.apply_command(ScorerCommand::StartInnings {
            match_id: "match_1".into(),
            striker_id: "f1".into(),
            non_striker_id: "f2".into(),
            bowler_id: "h1".into(),
        });
    }

    fn ball(input: BallInput) -> ScorerCommand {
        ScorerCommand::RecordBall {
            match_id: "match_1".into(),
            ball: input,
            next_batter_id: None,
        }
    }

    // -----------------------------------------------------------------------
    // apply_command
    // -----------------------------------------------------------------------

    #[test]
    fn create_match_uses_configured_overs() {
        let mut state = test_state();
        create(&mut state);
        let m = state.tournament.match_by_id("match_1").unwrap();
        assert_eq!(m.total_overs, 2);
        assert_eq!(state.db.load_snapshot().unwrap().unwrap().matches.len(), 1);
    }

    #[test]
    fn successful_ball_publishes_events_then_snapshot() {
        let mut state = test_state();
        start(&mut state);
        let out = state.apply_command(ball(BallInput::runs(4)));
        assert_eq!(out.len(), 2);
        let Notification::Events { events } = &out[0] else {
            panic!("expected events first");
        };
        assert!(events.iter().any(|e| matches!(e, MatchEvent::BallRecorded { .. })));
        assert!(matches!(out[1], Notification::Snapshot { .. }));
        assert!(state.last_local_write.is_some());
    }

    #[test]
    fn rejected_command_leaves_state_alone() {
        let mut state = test_state();
        start(&mut state);
        let before = state.tournament.snapshot();
        let out = state.apply_command(ScorerCommand::SetNextBatter {
            match_id: "match_1".into(),
            batter_id: "f3".into(),
        });
        assert!(matches!(&out[..], [Notification::Rejected { command, .. }] if command == "set_next_batter"));
        assert_eq!(state.tournament.snapshot(), before);
    }

    #[test]
    fn unknown_match_is_rejected() {
        let mut state = test_state();
        let out = state.apply_command(ScorerCommand::SwapStrike {
            match_id: "match_9".into(),
        });
        let [Notification::Rejected { reason, .. }] = &out[..] else {
            panic!("expected rejection");
        };
        assert!(reason.contains("match_9"));
    }

    #[test]
    fn every_ball_is_persisted() {
        let mut state = test_state();
        start(&mut state);
        state.apply_command(ball(BallInput::runs(2)));
        state.apply_command(ScorerCommand::RecordBall {
            match_id: "match_1".into(),
            ball: BallInput::wicket(WicketKind::Bowled),
            next_batter_id: Some("f3".into()),
        });

        let stored = state.db.load_snapshot().unwrap().unwrap();
        assert_eq!(stored, state.tournament.snapshot());
        let restored = Tournament::hydrate(stored);
        assert_eq!(restored.player("h1").unwrap().stats.wickets, 1);
        assert_eq!(restored.player("f1").unwrap().stats.runs, 2);
    }

    #[test]
    fn undo_is_persisted() {
        let mut state = test_state();
        start(&mut state);
        state.apply_command(ball(BallInput::runs(6)));
        state.apply_command(ScorerCommand::UndoLastBall {
            match_id: "match_1".into(),
        });
        let stored = Tournament::hydrate(state.db.load_snapshot().unwrap().unwrap());
        let innings = stored
            .match_by_id("match_1")
            .unwrap()
            .current_innings()
            .unwrap();
        assert_eq!(innings.runs, 0);
        assert!(innings.balls.is_empty());
    }

    #[test]
    fn request_snapshot_returns_snapshot_only() {
        let mut state = test_state();
        let out = state.apply_command(ScorerCommand::RequestSnapshot);
        let [Notification::Snapshot { snapshot, standings }] = &out[..] else {
            panic!("expected snapshot");
        };
        assert_eq!(snapshot.teams.len(), 2);
        assert_eq!(standings.len(), 2);
        assert!(state.last_local_write.is_none());
    }

    // -----------------------------------------------------------------------
    // Remote snapshots
    // -----------------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn hydrate_suppressed_right_after_local_write() {
        let mut state = test_state();
        let remote = state.tournament.snapshot();
        start(&mut state);

        let out = state.apply_command(ScorerCommand::Hydrate {
            snapshot: remote.clone(),
        });
        assert!(matches!(&out[..], [Notification::Rejected { .. }]));
        assert_eq!(
            state.tournament.match_by_id("match_1").unwrap().status(),
            MatchStatus::Live
        );

        tokio::time::advance(Duration::from_millis(3001)).await;
        let out = state.apply_command(ScorerCommand::Hydrate { snapshot: remote });
        assert!(matches!(&out[..], [Notification::Snapshot { .. }]));
        assert!(state.tournament.matches().is_empty());
        assert!(state.db.load_snapshot().unwrap().unwrap().matches.is_empty());
    }

    #[test]
    fn hydrate_applies_when_idle() {
        let mut state = test_state();
        let mut other = Tournament::new(state.tournament.teams().to_vec());
        other
            .create_match(crease_core::tournament::MatchSetup {
                date: NaiveDate::from_ymd_opt(2026, 4, 3).unwrap(),
                team_a_id: "t2".into(),
                team_b_id: "t1".into(),
                total_overs: 4,
                knockout_stage: None,
            })
            .unwrap();

        state.apply_command(ScorerCommand::Hydrate {
            snapshot: other.snapshot(),
        });
        assert_eq!(state.tournament.matches().len(), 1);
        assert!(state.last_local_write.is_none());
    }

    // -----------------------------------------------------------------------
    // Crash recovery
    // -----------------------------------------------------------------------

    #[test]
    fn recover_from_empty_db_returns_false() {
        let mut state = test_state();
        assert!(!recover_from_db(&mut state).unwrap());
    }

    #[test]
    fn recover_resumes_live_match_from_status_rows() {
        let mut state = test_state();
        start(&mut state);
        state.apply_command(ball(BallInput::runs(2)));
        assert!(state.db.has_snapshot().unwrap());
        assert_eq!(state.db.match_count_with_status("live").unwrap(), 1);
        assert!(state.db.load_state(Database::LAST_SAVED_KEY).unwrap().is_some());

        state.tournament = Tournament::default();
        assert!(recover_from_db(&mut state).unwrap());
        assert_eq!(state.tournament.live_matches().count(), 1);
        let m = state.tournament.match_by_id("match_1").unwrap();
        assert_eq!(m.current_innings().unwrap().runs, 2);
    }

    #[test]
    fn recover_restores_stored_tournament() {
        let mut state = test_state();
        start(&mut state);
        state.apply_command(ball(BallInput::runs(3)));
        let expected = state.tournament.snapshot();

        // Same database, fresh in-memory state.
        state.tournament = Tournament::default();
        assert!(recover_from_db(&mut state).unwrap());
        assert_eq!(state.tournament.snapshot(), expected);
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn loop_answers_connect_and_commands() {
        let (ws_tx, ws_rx) = mpsc::channel(16);
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (updates, mut rx) = broadcast::channel(64);
        let handle = tokio::spawn(run(ws_rx, cmd_rx, updates, test_state()));

        ws_tx
            .send(WsEvent::Connected {
                addr: "127.0.0.1:5000".into(),
            })
            .await
            .unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            Notification::ConnectionStatus {
                status: ConnectionStatus::Connected
            }
        );
        assert!(matches!(rx.recv().await.unwrap(), Notification::Snapshot { .. }));

        ws_tx
            .send(WsEvent::Message("not json".into()))
            .await
            .unwrap();
        assert!(matches!(rx.recv().await.unwrap(), Notification::Rejected { .. }));

        ws_tx
            .send(WsEvent::Message(
                r#"{"type":"create_match","date":"2026-04-02","team_a_id":"t1","team_b_id":"t2"}"#.into(),
            ))
            .await
            .unwrap();
        let Notification::Events { events } = rx.recv().await.unwrap() else {
            panic!("expected events");
        };
        assert_eq!(
            events,
            vec![MatchEvent::MatchCreated {
                match_id: "match_1".into()
            }]
        );

        cmd_tx.send(ScorerCommand::Quit).await.unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn loop_exits_when_channels_close() {
        let (ws_tx, ws_rx) = mpsc::channel(16);
        let (_cmd_tx, cmd_rx) = mpsc::channel(16);
        let (updates, _rx) = broadcast::channel(16);
        let handle = tokio::spawn(run(ws_rx, cmd_rx, updates, test_state()));
        drop(ws_tx);
        handle.await.unwrap().unwrap();
    }
}
