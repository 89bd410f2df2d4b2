// Match totals, winners, and the season leaderboard.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::assignment::Assignment;
use crate::league::{Match, MatchId, Member, MemberId};
use crate::scores::ScoreTable;

/// Sum of the runs at the assignment's two positions. A position without an
/// entered score counts as 0 here; use [`ScoreTable::is_complete`] to tell
/// "0 runs" from "not entered". Saturates at `u32::MAX`.
pub fn member_total(assignment: &Assignment, m: &Match, scores: &ScoreTable) -> u32 {
    assignment
        .positions(m)
        .iter()
        .flatten()
        .map(|p| scores.get(p).unwrap_or(0))
        .fold(0, u32::saturating_add)
}

// ---------------------------------------------------------------------------
// Winners
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemberTotal {
    pub member_id: MemberId,
    pub total: u32,
}

/// Outcome of winner determination for one match, with a human-readable
/// trace of how it was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WinnerReport {
    pub match_id: MatchId,
    pub winners: Vec<MemberTotal>,
    pub trace: Vec<String>,
}

impl WinnerReport {
    pub fn is_tie(&self) -> bool {
        self.winners.len() > 1
    }

    pub fn winner_ids(&self) -> impl Iterator<Item = &str> {
        self.winners.iter().map(|w| w.member_id.as_str())
    }

    pub fn top_total(&self) -> Option<u32> {
        self.winners.first().map(|w| w.total)
    }
}

/// Everyone sharing the highest total in a completed match, in the order
/// their assignments were given. Duplicate assignments for one member are
/// ignored after the first.
pub fn match_winners(m: &Match, assignments: &[Assignment], scores: &ScoreTable) -> WinnerReport {
    let mut trace = Vec::new();

    if !m.is_completed() {
        trace.push(format!("match {} is {}; no winners yet", m.id, m.status()));
        return WinnerReport {
            match_id: m.id.clone(),
            winners: Vec::new(),
            trace,
        };
    }

    let mut seen = HashSet::new();
    let mut totals = Vec::new();
    for a in assignments {
        if !seen.insert(a.member_id.as_str()) {
            trace.push(format!("member {}: duplicate assignment {} skipped", a.member_id, a.id));
            continue;
        }
        let total = member_total(a, m, scores);
        let parts: Vec<String> = a
            .positions(m)
            .iter()
            .flatten()
            .map(|p| match scores.get(p) {
                Some(runs) => format!("{p}={runs}"),
                None => format!("{p}=-"),
            })
            .collect();
        trace.push(format!("member {}: {} -> {total}", a.member_id, parts.join(" + ")));
        totals.push(MemberTotal {
            member_id: a.member_id.clone(),
            total,
        });
    }

    let Some(max) = totals.iter().map(|t| t.total).max() else {
        trace.push(format!("match {}: no assignments", m.id));
        return WinnerReport {
            match_id: m.id.clone(),
            winners: Vec::new(),
            trace,
        };
    };

    let winners: Vec<MemberTotal> = totals.into_iter().filter(|t| t.total == max).collect();
    let names: Vec<&str> = winners.iter().map(|w| w.member_id.as_str()).collect();
    trace.push(format!("max {max}; winners: {}", names.join(", ")));

    WinnerReport {
        match_id: m.id.clone(),
        winners,
        trace,
    }
}

// ---------------------------------------------------------------------------
// Leaderboard
// ---------------------------------------------------------------------------

/// Season money rules. Every member pays `buy_in`; each match win pays
/// `payout_per_win`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub buy_in: i64,
    pub payout_per_win: i64,
}

impl Payout {
    pub fn profit_loss(&self, wins: u32) -> i64 {
        i64::from(wins) * self.payout_per_win - self.buy_in
    }
}

impl Default for Payout {
    fn default() -> Self {
        Payout {
            buy_in: 2100,
            payout_per_win: 210,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub member_id: MemberId,
    pub name: String,
    pub wins: u32,
    pub profit_loss: i64,
}

/// Rank every roster member by wins across completed matches, then by name.
/// Tied members get consecutive ranks in name order.
pub fn season_leaderboard(
    members: &[Member],
    matches: &[Match],
    assignments: &BTreeMap<MatchId, Vec<Assignment>>,
    scores: &BTreeMap<MatchId, ScoreTable>,
    payout: Payout,
) -> Vec<LeaderboardRow> {
    let empty_scores = ScoreTable::new();
    let mut wins: HashMap<MemberId, u32> = HashMap::new();

    for m in matches.iter().filter(|m| m.is_completed()) {
        let match_assignments = assignments.get(&m.id).map(Vec::as_slice).unwrap_or(&[]);
        let match_scores = scores.get(&m.id).unwrap_or(&empty_scores);
        let report = match_winners(m, match_assignments, match_scores);
        for w in &report.winners {
            *wins.entry(w.member_id.clone()).or_default() += 1;
        }
    }

    let mut rows: Vec<LeaderboardRow> = members
        .iter()
        .map(|member| {
            let w = wins.get(&member.id).copied().unwrap_or(0);
            LeaderboardRow {
                rank: 0,
                member_id: member.id.clone(),
                name: member.name.clone(),
                wins: w,
                profit_loss: payout.profit_loss(w),
            }
        })
        .collect();

    rows.sort_by(|a, b| b.wins.cmp(&a.wins).then_with(|| a.name.cmp(&b.name)));
    for (i, row) in rows.iter_mut().enumerate() {
        row.rank = i + 1;
    }
    rows
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
