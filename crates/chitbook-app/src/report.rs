// Season report: per-match results and the leaderboard, as JSON or text.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use chitbook_core::{LeaderboardRow, MatchStatus, Payout, ReconcileSummary, ScoreTable, Season};

#[derive(Debug, Clone, Serialize)]
pub struct MatchLine {
    pub match_id: String,
    pub date: NaiveDate,
    pub label: String,
    pub status: MatchStatus,
    /// Winner names, empty until the match is completed.
    pub winners: Vec<String>,
    pub top_total: Option<u32>,
    pub assigned: usize,
    /// Positions with a score entered.
    pub scored: usize,
    /// Assignments still missing a score for one of their positions.
    pub incomplete: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub season: String,
    pub payout: Payout,
    pub matches: Vec<MatchLine>,
    pub leaderboard: Vec<LeaderboardRow>,
    /// Reconcile results from the sync that produced this report.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sync: Vec<ReconcileSummary>,
}

impl Report {
    pub fn build(season_name: &str, season: &Season, payout: Payout) -> Self {
        let name_of = |id: &str| -> String {
            season
                .member(id)
                .map(|m| m.name.clone())
                .unwrap_or_else(|_| id.to_string())
        };

        let matches = season
            .matches()
            .iter()
            .map(|m| {
                let assignments = season.assignments(&m.id);
                let (winners, top_total) = match season.winners(&m.id) {
                    Ok(report) => (
                        report.winner_ids().map(&name_of).collect(),
                        report.top_total(),
                    ),
                    Err(_) => (Vec::new(), None),
                };
                MatchLine {
                    match_id: m.id.clone(),
                    date: m.date,
                    label: m.label(),
                    status: m.status(),
                    winners,
                    top_total,
                    assigned: assignments.len(),
                    scored: season.scores(&m.id).map_or(0, ScoreTable::len),
                    incomplete: assignments.iter().filter(|a| !season.is_complete(a)).count(),
                }
            })
            .collect();

        Report {
            season: season_name.to_string(),
            payout,
            matches,
            leaderboard: season.leaderboard(payout),
            sync: Vec::new(),
        }
    }

    pub fn with_sync(mut self, summaries: Vec<ReconcileSummary>) -> Self {
        self.sync = summaries;
        self
    }

    pub fn issue_count(&self) -> usize {
        self.sync.iter().map(|s| s.issues.len()).sum()
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.season)?;
        writeln!(
            f,
            "Buy-in {} / {} per win",
            self.payout.buy_in, self.payout.payout_per_win
        )?;
        writeln!(f)?;

        for line in self.matches.iter().filter(|l| l.status != MatchStatus::Upcoming) {
            let result = if line.winners.is_empty() {
                "-".to_string()
            } else {
                format!("{} ({})", line.winners.join(", "), line.top_total.unwrap_or(0))
            };
            write!(
                f,
                "#{:<3} {} {:<26} {:<9} {}",
                line.match_id, line.date, line.label, line.status, result
            )?;
            if line.incomplete > 0 {
                write!(f, "  [{} missing scores]", line.incomplete)?;
            }
            writeln!(f)?;
        }

        writeln!(f)?;
        writeln!(f, "{:>4}  {:<12} {:>4} {:>8}", "Rank", "Member", "Wins", "P/L")?;
        for row in &self.leaderboard {
            writeln!(
                f,
                "{:>4}  {:<12} {:>4} {:>8}",
                row.rank, row.name, row.wins, row.profit_loss
            )?;
        }

        let issues = self.issue_count();
        if issues > 0 {
            writeln!(f)?;
            writeln!(f, "{} sheet issues (see log)", issues)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
