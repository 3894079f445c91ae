// Players, teams, and their cumulative statistics.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::overs::Overs;

pub type PlayerId = String;
pub type TeamId = String;

/// Cumulative cricket statistics for one player across the tournament.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub runs: u32,
    pub balls_faced: u32,
    pub wickets: u32,
    pub overs_bowled: Overs,
    pub runs_conceded: u32,
    pub fours: u32,
    pub sixes: u32,
}

impl PlayerStats {
    /// Runs per 100 balls faced; 0 before the first ball.
    pub fn strike_rate(&self) -> f64 {
        if self.balls_faced == 0 {
            return 0.0;
        }
        f64::from(self.runs) * 100.0 / f64::from(self.balls_faced)
    }

    /// Runs conceded per over bowled; 0 before the first legal ball.
    pub fn economy(&self) -> f64 {
        if self.overs_bowled.balls() == 0 {
            return 0.0;
        }
        f64::from(self.runs_conceded) / self.overs_bowled.true_overs()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team_id: TeamId,
    #[serde(default)]
    pub stats: PlayerStats,
}

impl Player {
    pub fn new(id: &str, name: &str, team_id: &str) -> Self {
        Player {
            id: id.to_string(),
            name: name.to_string(),
            team_id: team_id.to_string(),
            stats: PlayerStats::default(),
        }
    }
}

/// Group-stage pool a team is drawn into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Group {
    A,
    B,
}

impl Group {
    pub fn from_str_group(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "A" => Some(Group::A),
            "B" => Some(Group::B),
            _ => None,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Group::A => write!(f, "A"),
            Group::B => write!(f, "B"),
        }
    }
}

/// Aggregate tournament figures for a team. Written only by the ledger.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamStats {
    pub played: u32,
    pub won: u32,
    pub lost: u32,
    pub tied: u32,
    pub points: u32,
    pub net_run_rate: f64,
    pub total_runs_scored: u32,
    pub total_overs_faced: Overs,
    pub total_runs_conceded: u32,
    pub total_overs_bowled: Overs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub group: Group,
    /// Roster in batting-card order.
    pub players: Vec<Player>,
    #[serde(default)]
    pub stats: TeamStats,
}

impl Team {
    pub fn new(id: &str, name: &str, group: Group) -> Self {
        Team {
            id: id.to_string(),
            name: name.to_string(),
            group,
            players: Vec::new(),
            stats: TeamStats::default(),
        }
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn player_mut(&mut self, player_id: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }
}

/// Find a player anywhere in the given teams.
pub fn find_player<'a>(teams: &'a [Team], player_id: &str) -> Option<&'a Player> {
    teams.iter().find_map(|t| t.player(player_id))
}

/// Find a team by id.
pub fn find_team<'a>(teams: &'a [Team], team_id: &str) -> Option<&'a Team> {
    teams.iter().find(|t| t.id == team_id)
}

/// Display name for a team id, falling back to the id itself.
pub fn team_name<'a>(teams: &'a [Team], team_id: &'a str) -> &'a str {
    find_team(teams, team_id).map_or(team_id, |t| t.name.as_str())
}

/// Display name for a player id, falling back to the id itself.
pub fn player_name<'a>(teams: &'a [Team], player_id: &'a str) -> &'a str {
    find_player(teams, player_id).map_or(player_id, |p| p.name.as_str())
}
