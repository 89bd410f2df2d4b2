// Season fixtures: teams, members, and matches with derived status.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::position::TeamCode;

pub type MatchId = String;
pub type MemberId = String;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeagueError {
    #[error("match `{match_id}` not found")]
    UnknownMatch { match_id: MatchId },

    #[error("member `{member_id}` not found")]
    UnknownMember { member_id: MemberId },

    #[error("match `{match_id}` is not a playoff; its teams are fixed")]
    NotAPlayoff { match_id: MatchId },

    #[error("a match cannot be played between `{team}` and itself")]
    SameTeamTwice { team: TeamCode },

    #[error("match `{match_id}` already has {assigned} member chits; remove them before changing teams")]
    PlayoffTeamsLocked { match_id: MatchId, assigned: usize },
}

// ---------------------------------------------------------------------------
// Roster
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub short_code: TeamCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    pub name: String,
}

impl Member {
    pub fn new(id: &str, name: &str) -> Self {
        Member {
            id: id.to_string(),
            name: name.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Match status
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Upcoming,
    Live,
    Completed,
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MatchStatus::Upcoming => "upcoming",
            MatchStatus::Live => "live",
            MatchStatus::Completed => "completed",
        };
        f.pad(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayoffKind {
    #[serde(rename = "Qualifier 1")]
    Qualifier1,
    #[serde(rename = "Eliminator")]
    Eliminator,
    #[serde(rename = "Qualifier 2")]
    Qualifier2,
    #[serde(rename = "Final")]
    Final,
}

impl PlayoffKind {
    pub fn display_str(&self) -> &'static str {
        match self {
            PlayoffKind::Qualifier1 => "Qualifier 1",
            PlayoffKind::Eliminator => "Eliminator",
            PlayoffKind::Qualifier2 => "Qualifier 2",
            PlayoffKind::Final => "Final",
        }
    }
}

// ---------------------------------------------------------------------------
// Match
// ---------------------------------------------------------------------------

/// One fixture of the season.
///
/// League matches know both teams from creation. Playoff matches may start
/// with undecided teams; [`Match::set_playoff_teams`] is the only mutation of
/// a match's identity after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub date: NaiveDate,
    team_a: Option<TeamCode>,
    team_b: Option<TeamCode>,
    playoff: Option<PlayoffKind>,
    status: MatchStatus,
    status_override: Option<MatchStatus>,
}

impl Match {
    /// A regular league match between two known teams. Status starts as
    /// `Upcoming` until the first [`Match::refresh_status`].
    pub fn league(id: &str, date: NaiveDate, team_a: TeamCode, team_b: TeamCode) -> Self {
        Match {
            id: id.to_string(),
            date,
            team_a: Some(team_a),
            team_b: Some(team_b),
            playoff: None,
            status: MatchStatus::Upcoming,
            status_override: None,
        }
    }

    /// A playoff match whose teams are not yet known.
    pub fn playoff(id: &str, date: NaiveDate, kind: PlayoffKind) -> Self {
        Match {
            id: id.to_string(),
            date,
            team_a: None,
            team_b: None,
            playoff: Some(kind),
            status: MatchStatus::Upcoming,
            status_override: None,
        }
    }

    /// Builder: pin the status with an explicit override.
    pub fn with_status(mut self, status: MatchStatus) -> Self {
        self.override_status(Some(status));
        self
    }

    pub fn team_a(&self) -> Option<&TeamCode> {
        self.team_a.as_ref()
    }

    pub fn team_b(&self) -> Option<&TeamCode> {
        self.team_b.as_ref()
    }

    /// Both teams, once known.
    pub fn teams(&self) -> Option<(&TeamCode, &TeamCode)> {
        Some((self.team_a.as_ref()?, self.team_b.as_ref()?))
    }

    pub fn has_team(&self, team: &TeamCode) -> bool {
        self.team_a.as_ref() == Some(team) || self.team_b.as_ref() == Some(team)
    }

    pub fn is_playoff(&self) -> bool {
        self.playoff.is_some()
    }

    pub fn playoff_kind(&self) -> Option<PlayoffKind> {
        self.playoff
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn is_completed(&self) -> bool {
        self.status == MatchStatus::Completed
    }

    /// Status implied by the calendar alone: completed once the match date is
    /// strictly before `today`.
    pub fn date_status(&self, today: NaiveDate) -> MatchStatus {
        if self.date < today {
            MatchStatus::Completed
        } else {
            MatchStatus::Upcoming
        }
    }

    /// Effective status: the override when present, else the date status.
    pub fn derive_status(&self, today: NaiveDate) -> MatchStatus {
        self.status_override
            .unwrap_or_else(|| self.date_status(today))
    }

    /// Recompute the stored status. Returns true if it changed.
    pub fn refresh_status(&mut self, today: NaiveDate) -> bool {
        let next = self.derive_status(today);
        let changed = next != self.status;
        self.status = next;
        changed
    }

    /// Set or clear the explicit status override. Setting takes effect
    /// immediately; clearing takes effect on the next refresh.
    pub fn override_status(&mut self, status: Option<MatchStatus>) {
        self.status_override = status;
        if let Some(s) = status {
            self.status = s;
        }
    }

    /// Overwrite a playoff match's teams once they are decided.
    pub fn set_playoff_teams(
        &mut self,
        team_a: TeamCode,
        team_b: TeamCode,
    ) -> Result<(), LeagueError> {
        if !self.is_playoff() {
            return Err(LeagueError::NotAPlayoff {
                match_id: self.id.clone(),
            });
        }
        if team_a == team_b {
            return Err(LeagueError::SameTeamTwice { team: team_a });
        }
        self.team_a = Some(team_a);
        self.team_b = Some(team_b);
        Ok(())
    }

    /// Human-readable fixture label, e.g. `KKR vs RCB` or `Final (TBD)`.
    pub fn label(&self) -> String {
        match (self.teams(), self.playoff) {
            (Some((a, b)), Some(kind)) => format!("{}: {a} vs {b}", kind.display_str()),
            (Some((a, b)), None) => format!("{a} vs {b}"),
            (None, Some(kind)) => format!("{} (TBD)", kind.display_str()),
            (None, None) => "TBD".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
