// Points table rows, ordered for display.

use serde::{Deserialize, Serialize};

use crate::scoring::player::{Group, Team, TeamId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandingRow {
    /// 1-based position in the table.
    pub position: usize,
    pub team_id: TeamId,
    pub team_name: String,
    pub group: Group,
    pub played: u32,
    pub won: u32,
    pub lost: u32,
    pub tied: u32,
    pub points: u32,
    pub net_run_rate: f64,
}

/// Teams ordered by points, then net run rate, then name. `group` limits the
/// table to one pool.
pub fn standings(teams: &[Team], group: Option<Group>) -> Vec<StandingRow> {
    let mut rows: Vec<&Team> = teams
        .iter()
        .filter(|t| group.map_or(true, |g| t.group == g))
        .collect();
    rows.sort_by(|a, b| {
        b.stats
            .points
            .cmp(&a.stats.points)
            .then_with(|| b.stats.net_run_rate.total_cmp(&a.stats.net_run_rate))
            .then_with(|| a.name.cmp(&b.name))
    });
    rows.into_iter()
        .enumerate()
        .map(|(i, t)| StandingRow {
            position: i + 1,
            team_id: t.id.clone(),
            team_name: t.name.clone(),
            group: t.group,
            played: t.stats.played,
            won: t.stats.won,
            lost: t.stats.lost,
            tied: t.stats.tied,
            points: t.stats.points,
            net_run_rate: t.stats.net_run_rate,
        })
        .collect()
}
