// SQLite persistence layer for tournament state.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use rusqlite::{params, Connection, Transaction};

use crease_core::scoring::{Match, Team};
use crease_core::tournament::TournamentSnapshot;

/// SQLite-backed persistence for teams, matches, and key-value scorer state.
/// Teams and matches are stored as JSON rows keyed by id, in insertion order.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Key in `scorer_state` holding the time of the last snapshot write.
    pub const LAST_SAVED_KEY: &'static str = "last_saved_at";

    /// Open (or create) a SQLite database at `path` and ensure all tables
    /// exist. Pass `":memory:"` for an ephemeral in-memory database (useful
    /// for tests).
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS teams (
                id         TEXT PRIMARY KEY,
                position   INTEGER NOT NULL,
                name       TEXT NOT NULL,
                grp        TEXT NOT NULL,
                data       TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS matches (
                id         TEXT PRIMARY KEY,
                position   INTEGER NOT NULL,
                status     TEXT NOT NULL,
                match_date TEXT NOT NULL,
                data       TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS scorer_state (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            ",
        )
        .context("failed to create database schema")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    /// Replace all stored teams and matches with `snapshot` in one
    /// transaction.
    pub fn save_snapshot(&self, snapshot: &TournamentSnapshot) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin snapshot transaction")?;
        tx.execute("DELETE FROM teams", [])
            .context("failed to clear teams")?;
        tx.execute("DELETE FROM matches", [])
            .context("failed to clear matches")?;
        for team in &snapshot.teams {
            upsert_team(&tx, team)?;
        }
        for m in &snapshot.matches {
            upsert_match(&tx, m)?;
        }
        touch_saved(&tx)?;
        tx.commit().context("failed to commit snapshot")?;
        Ok(())
    }

    /// Insert or update every team (rosters and stats) in one transaction.
    pub fn save_teams(&self, teams: &[Team]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin teams transaction")?;
        for team in teams {
            upsert_team(&tx, team)?;
        }
        touch_saved(&tx)?;
        tx.commit().context("failed to commit teams")?;
        Ok(())
    }

    /// Insert or update a single match. New matches are appended after the
    /// existing ones.
    pub fn save_match(&self, m: &Match) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction().context("failed to begin match transaction")?;
        upsert_match(&tx, m)?;
        touch_saved(&tx)?;
        tx.commit().context("failed to commit match")?;
        Ok(())
    }

    /// Load the stored tournament. Returns `None` if no teams were ever saved.
    pub fn load_snapshot(&self) -> Result<Option<TournamentSnapshot>> {
        let conn = self.conn();

        let teams: Vec<Team> = {
            let mut stmt = conn
                .prepare("SELECT data FROM teams ORDER BY position")
                .context("failed to prepare teams query")?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .context("failed to query teams")?;
            let mut teams = Vec::new();
            for row in rows {
                let json = row.context("failed to read team row")?;
                teams.push(serde_json::from_str(&json).context("failed to deserialize team")?);
            }
            teams
        };

        if teams.is_empty() {
            return Ok(None);
        }

        let matches: Vec<Match> = {
            let mut stmt = conn
                .prepare("SELECT data FROM matches ORDER BY position")
                .context("failed to prepare matches query")?;
            let rows = stmt
                .query_map([], |row| row.get::<_, String>(0))
                .context("failed to query matches")?;
            let mut matches = Vec::new();
            for row in rows {
                let json = row.context("failed to read match row")?;
                matches.push(serde_json::from_str(&json).context("failed to deserialize match")?);
            }
            matches
        };

        Ok(Some(TournamentSnapshot { teams, matches }))
    }

    /// Returns `true` if a roster has been saved.
    pub fn has_snapshot(&self) -> Result<bool> {
        let conn = self.conn();
        let exists: bool = conn
            .query_row("SELECT EXISTS(SELECT 1 FROM teams)", [], |row| row.get(0))
            .context("failed to check teams existence")?;
        Ok(exists)
    }

    /// Number of stored matches with the given status (e.g. `"live"`).
    pub fn match_count_with_status(&self, status: &str) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM matches WHERE status = ?1",
                params![status],
                |row| row.get(0),
            )
            .context("failed to count matches")?;
        Ok(count as usize)
    }

    // ------------------------------------------------------------------
    // Key-value state
    // ------------------------------------------------------------------

    /// Load a previously saved JSON value by `key`. Returns `None` if the key
    /// does not exist.
    pub fn load_state(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare("SELECT value FROM scorer_state WHERE key = ?1")
            .context("failed to prepare load_state query")?;

        let mut rows = stmt
            .query_map(params![key], |row| row.get::<_, String>(0))
            .context("failed to query scorer state")?;

        match rows.next() {
            Some(row_result) => {
                let json_str = row_result.context("failed to read state row")?;
                let value: serde_json::Value = serde_json::from_str(&json_str)
                    .context("failed to deserialize state value")?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

fn upsert_team(tx: &Transaction<'_>, team: &Team) -> Result<()> {
    let json = serde_json::to_string(team).context("failed to serialize team")?;
    tx.execute(
        "INSERT INTO teams (id, position, name, grp, data, updated_at)
         VALUES (?1, (SELECT COALESCE(MAX(position), -1) + 1 FROM teams), ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            name       = excluded.name,
            grp        = excluded.grp,
            data       = excluded.data,
            updated_at = excluded.updated_at",
        params![team.id, team.name, team.group.to_string(), json, Database::now()],
    )
    .with_context(|| format!("failed to save team {}", team.id))?;
    Ok(())
}

fn upsert_match(tx: &Transaction<'_>, m: &Match) -> Result<()> {
    let json = serde_json::to_string(m).context("failed to serialize match")?;
    tx.execute(
        "INSERT INTO matches (id, position, status, match_date, data, updated_at)
         VALUES (?1, (SELECT COALESCE(MAX(position), -1) + 1 FROM matches), ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            status     = excluded.status,
            match_date = excluded.match_date,
            data       = excluded.data,
            updated_at = excluded.updated_at",
        params![
            m.id,
            m.status().to_string(),
            m.date.to_string(),
            json,
            Database::now()
        ],
    )
    .with_context(|| format!("failed to save match {}", m.id))?;
    Ok(())
}

fn touch_saved(tx: &Transaction<'_>) -> Result<()> {
    let value = serde_json::Value::String(Database::now());
    tx.execute(
        "INSERT OR REPLACE INTO scorer_state (key, value) VALUES (?1, ?2)",
        params![Database::LAST_SAVED_KEY, value.to_string()],
    )
    .context("failed to record save time")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use crease_core::scoring::{BallInput, Group, Player, TossDecision, TossResult};
    use crease_core::tournament::{MatchSetup, Tournament};

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn sample_tournament() -> Tournament {
        let mut a = Team::new("t1", "Falcons", Group::A);
        let mut b = Team::new("t2", "Herons", Group::B);
        for i in 1..=11 {
            a.players.push(Player::new(&format!("f{i}"), &format!("F{i}"), "t1"));
            b.players.push(Player::new(&format!("h{i}"), &format!("H{i}"), "t2"));
        }
        let mut t = Tournament::new(vec![a, b]);
        t.create_match(MatchSetup {
            date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            team_a_id: "t1".into(),
            team_b_id: "t2".into(),
            total_overs: 5,
            knockout_stage: None,
        })
        .unwrap();
        t.record_toss(
            "match_1",
            TossResult {
                winner_id: "t1".into(),
                decision: TossDecision::Bat,
            },
        )
        .unwrap();
        t.start_innings("match_1", "f1", "f2", "h1").unwrap();
        t.record_ball("match_1", &BallInput::runs(4), None).unwrap();
        t
    }

    // ------------------------------------------------------------------
    // Schema / open
    // ------------------------------------------------------------------

    #[test]
    fn open_creates_tables() {
        let db = test_db();
        let conn = db.conn();

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        assert_eq!(tables, vec!["matches", "scorer_state", "teams"]);
    }

    // ------------------------------------------------------------------
    // Snapshots
    // ------------------------------------------------------------------

    #[test]
    fn empty_database_has_no_snapshot() {
        let db = test_db();
        assert!(!db.has_snapshot().unwrap());
        assert!(db.load_snapshot().unwrap().is_none());
    }

    #[test]
    fn snapshot_round_trips() {
        let db = test_db();
        let snapshot = sample_tournament().snapshot();
        db.save_snapshot(&snapshot).unwrap();

        assert!(db.has_snapshot().unwrap());
        let loaded = db.load_snapshot().unwrap().unwrap();
        assert_eq!(loaded, snapshot);
        assert_eq!(db.match_count_with_status("live").unwrap(), 1);
        assert!(db.load_state(Database::LAST_SAVED_KEY).unwrap().is_some());
    }

    #[test]
    fn save_match_updates_in_place() {
        let db = test_db();
        let mut t = sample_tournament();
        db.save_snapshot(&t.snapshot()).unwrap();

        t.abandon_match("match_1", "rain").unwrap();
        db.save_match(t.match_by_id("match_1").unwrap()).unwrap();
        db.save_teams(t.teams()).unwrap();

        let loaded = db.load_snapshot().unwrap().unwrap();
        assert_eq!(loaded.matches.len(), 1);
        assert_eq!(loaded, t.snapshot());
        assert_eq!(db.match_count_with_status("abandoned").unwrap(), 1);
        assert_eq!(db.match_count_with_status("live").unwrap(), 0);
    }

    #[test]
    fn new_matches_keep_insertion_order() {
        let db = test_db();
        let mut t = sample_tournament();
        for _ in 0..3 {
            t.create_match(MatchSetup {
                date: NaiveDate::from_ymd_opt(2026, 5, 2).unwrap(),
                team_a_id: "t2".into(),
                team_b_id: "t1".into(),
                total_overs: 5,
                knockout_stage: None,
            })
            .unwrap();
        }
        db.save_teams(t.teams()).unwrap();
        for m in t.matches() {
            db.save_match(m).unwrap();
        }
        let ids: Vec<String> = db
            .load_snapshot()
            .unwrap()
            .unwrap()
            .matches
            .into_iter()
            .map(|m| m.id)
            .collect();
        assert_eq!(ids, vec!["match_1", "match_2", "match_3", "match_4"]);
    }

    // ------------------------------------------------------------------
    // Key-value state
    // ------------------------------------------------------------------

    #[test]
    fn last_saved_time_tracks_writes() {
        let db = test_db();
        assert_eq!(db.load_state(Database::LAST_SAVED_KEY).unwrap(), None);
        db.save_snapshot(&sample_tournament().snapshot()).unwrap();
        let saved = db.load_state(Database::LAST_SAVED_KEY).unwrap();
        assert!(matches!(saved, Some(serde_json::Value::String(_))));
        assert_eq!(db.load_state("missing").unwrap(), None);
    }
}
