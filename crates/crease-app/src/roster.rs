// Roster import from CSV.
//
// One row per player: team_id,team_name,group,player_id,player_name. Teams
// appear in the order of their first row; players keep file order.

use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;
use tracing::warn;

use crease_core::scoring::{Group, Player, Team};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RosterError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV row
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawRosterRow {
    team_id: String,
    team_name: String,
    group: String,
    player_id: String,
    player_name: String,
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Build teams from any CSV reader. Malformed rows, rows with an unknown
/// group and duplicate player ids are skipped with a warning.
pub fn load_roster_from_reader<R: Read>(rdr: R) -> Result<Vec<Team>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut teams: Vec<Team> = Vec::new();
    let mut seen_players: HashSet<String> = HashSet::new();

    for result in reader.deserialize::<RawRosterRow>() {
        let raw = match result {
            Ok(raw) => raw,
            Err(e) => {
                warn!("skipping malformed roster row: {}", e);
                continue;
            }
        };

        let team_id = raw.team_id.trim();
        let player_id = raw.player_id.trim();
        if team_id.is_empty() || player_id.is_empty() {
            warn!("skipping roster row with empty id");
            continue;
        }
        let Some(group) = Group::from_str_group(raw.group.trim()) else {
            warn!("skipping player '{}': unknown group '{}'", player_id, raw.group);
            continue;
        };
        if !seen_players.insert(player_id.to_string()) {
            warn!("duplicate player id '{}', keeping first entry", player_id);
            continue;
        }

        let idx = match teams.iter().position(|t| t.id == team_id) {
            Some(idx) => {
                if teams[idx].group != group {
                    warn!(
                        "player '{}' lists group {} for team '{}' already in group {}",
                        player_id, group, team_id, teams[idx].group
                    );
                }
                idx
            }
            None => {
                teams.push(Team::new(team_id, raw.team_name.trim(), group));
                teams.len() - 1
            }
        };
        teams[idx]
            .players
            .push(Player::new(player_id, raw.player_name.trim(), team_id));
    }

    Ok(teams)
}

/// Load and validate a roster CSV from disk.
pub fn load_roster(path: &Path) -> Result<Vec<Team>, RosterError> {
    let file = std::fs::File::open(path).map_err(|e| RosterError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    let teams = load_roster_from_reader(file).map_err(|e| RosterError::Csv {
        path: path.display().to_string(),
        source: e,
    })?;
    validate(&teams)?;
    Ok(teams)
}

/// A usable roster has at least two teams, each able to field two batters
/// and a bowler.
fn validate(teams: &[Team]) -> Result<(), RosterError> {
    if teams.len() < 2 {
        return Err(RosterError::Validation(format!(
            "roster needs at least 2 teams, found {}",
            teams.len()
        )));
    }
    if let Some(short) = teams.iter().find(|t| t.players.len() < 2) {
        return Err(RosterError::Validation(format!(
            "team '{}' has {} player(s), needs at least 2",
            short.id,
            short.players.len()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
