// Ball-by-ball commentary lines. Pure and deterministic.

use super::ball::{BallEvent, ExtraKind, WicketKind};

/// Names needed to describe a delivery.
#[derive(Debug, Clone, Copy)]
pub struct CommentaryNames<'a> {
    pub bowler: &'a str,
    pub batter: &'a str,
    /// Dismissed player's name; only read for wickets.
    pub dismissed: &'a str,
}

/// Describe a recorded ball, e.g. `"Rashid to Kohli, FOUR"`.
pub fn describe(ball: &BallEvent, names: CommentaryNames<'_>) -> String {
    let mut line = String::new();
    if ball.is_free_hit {
        line.push_str("Free hit: ");
    }
    line.push_str(names.bowler);
    line.push_str(" to ");
    line.push_str(names.batter);
    line.push_str(", ");
    line.push_str(&outcome_text(ball, names));
    line
}

fn outcome_text(ball: &BallEvent, names: CommentaryNames<'_>) -> String {
    if ball.is_wicket {
        return wicket_text(ball, names);
    }

    match ball.extra_kind {
        ExtraKind::Wide => plural(ball.extras, "wide", "wides"),
        ExtraKind::NoBall => {
            if ball.runs_scored > 0 {
                format!("no ball, {}", runs_text(ball.runs_scored))
            } else {
                "no ball".to_string()
            }
        }
        ExtraKind::Bye => plural(ball.extras, "bye", "byes"),
        ExtraKind::LegBye => plural(ball.extras, "leg bye", "leg byes"),
        ExtraKind::None => runs_text(ball.runs_scored),
    }
}

fn wicket_text(ball: &BallEvent, names: CommentaryNames<'_>) -> String {
    match ball.wicket_kind {
        Some(WicketKind::RunOut) => {
            let mut text = format!("OUT! {} run out", names.dismissed);
            if ball.runs_scored > 0 {
                text.push_str(&format!(" after {}", plural(ball.runs_scored, "run", "runs")));
            }
            text
        }
        Some(kind) => format!("OUT! {kind}"),
        None => "OUT!".to_string(),
    }
}

fn runs_text(runs: u32) -> String {
    match runs {
        0 => "no run".to_string(),
        4 => "FOUR".to_string(),
        6 => "SIX".to_string(),
        n => plural(n, "run", "runs"),
    }
}

fn plural(n: u32, one: &str, many: &str) -> String {
    if n == 1 {
        format!("1 {one}")
    } else {
        format!("{n} {many}")
    }
}
