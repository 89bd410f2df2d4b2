// Batting-position chits: team short codes, seat numbers, and the
// `KKR7`-style string form used by the spreadsheet.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::league::Match;

/// Highest seat number on a team. Seat `MAX_SEATS` is reserved for the
/// fixed member.
pub const MAX_SEATS: u8 = 8;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("position code is empty")]
    Empty,

    #[error("position code `{code}` has no team letters")]
    MissingTeam { code: String },

    #[error("position code `{code}` has no seat number")]
    MissingSeat { code: String },

    #[error("team code `{code}` must be 2-4 uppercase letters")]
    InvalidTeamCode { code: String },

    #[error("seat {seat} in `{code}` is outside 1..={max}", max = MAX_SEATS)]
    SeatOutOfRange { code: String, seat: u32 },

    #[error("position code `{code}` has trailing characters after the seat")]
    TrailingCharacters { code: String },
}

// ---------------------------------------------------------------------------
// TeamCode
// ---------------------------------------------------------------------------

/// A team's short code (`KKR`, `MI`, `PBKS`). Always 2-4 uppercase ASCII
/// letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TeamCode(String);

impl TeamCode {
    pub fn new(code: &str) -> Result<Self, PositionError> {
        let valid = (2..=4).contains(&code.len())
            && code.bytes().all(|b| b.is_ascii_uppercase());
        if valid {
            Ok(TeamCode(code.to_string()))
        } else {
            Err(PositionError::InvalidTeamCode {
                code: code.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TeamCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for TeamCode {
    type Error = PositionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        TeamCode::new(&value)
    }
}

impl From<TeamCode> for String {
    fn from(code: TeamCode) -> Self {
        code.0
    }
}

impl FromStr for TeamCode {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TeamCode::new(s)
    }
}

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// One batting-order slot: a team and a seat in `1..=MAX_SEATS`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub team: TeamCode,
    pub seat: u8,
}

impl Position {
    /// Build a position from parts, checking the seat bound.
    pub fn new(team: TeamCode, seat: u8) -> Result<Self, PositionError> {
        if seat == 0 || seat > MAX_SEATS {
            return Err(PositionError::SeatOutOfRange {
                code: format!("{team}{seat}"),
                seat: u32::from(seat),
            });
        }
        Ok(Position { team, seat })
    }

    /// Parse a code such as `"KKR7"`: leading letters are the team, trailing
    /// digits the seat. Surrounding whitespace is ignored.
    pub fn parse(code: &str) -> Result<Self, PositionError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(PositionError::Empty);
        }

        let split = code
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(code.len());
        let (letters, rest) = code.split_at(split);
        if letters.is_empty() {
            return Err(PositionError::MissingTeam {
                code: code.to_string(),
            });
        }

        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let (digits, trailing) = rest.split_at(digits_end);
        if digits.is_empty() {
            return Err(PositionError::MissingSeat {
                code: code.to_string(),
            });
        }
        if !trailing.is_empty() {
            return Err(PositionError::TrailingCharacters {
                code: code.to_string(),
            });
        }

        let team = TeamCode::new(letters)?;
        // Anything that doesn't fit in u32 is certainly out of range.
        let seat: u32 = digits.parse().unwrap_or(u32::MAX);
        if seat == 0 || seat > u32::from(MAX_SEATS) {
            return Err(PositionError::SeatOutOfRange {
                code: code.to_string(),
                seat,
            });
        }

        Ok(Position {
            team,
            seat: seat as u8,
        })
    }

    /// Canonical string form, e.g. `"KKR7"`.
    pub fn code(&self) -> String {
        self.to_string()
    }

    /// Whether this is the seat reserved for the fixed member.
    pub fn is_reserved_seat(&self) -> bool {
        self.seat == MAX_SEATS
    }

    /// True iff the position's team is one of the match's two teams.
    /// Always false while a playoff match's teams are still undecided.
    pub fn belongs_to_match(&self, m: &Match) -> bool {
        m.has_team(&self.team)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.team, self.seat)
    }
}

impl FromStr for Position {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::parse(s)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
