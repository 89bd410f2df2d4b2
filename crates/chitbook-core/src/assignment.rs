// Chit assignments: which two seats a member holds in a match, and the
// rules that keep seats unique within a match.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::league::{Match, MatchId, MemberId};
use crate::position::{Position, PositionError, TeamCode, MAX_SEATS};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// A rejected assignment. Each variant names the rule that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("exactly two positions are required, got {given}")]
    WrongPositionCount { given: usize },

    #[error("invalid position: {0}")]
    InvalidPosition(#[from] PositionError),

    #[error("teams for match `{match_id}` are not decided yet")]
    TeamsUndecided { match_id: MatchId },

    #[error("{position} is not on either team of match `{match_id}`")]
    ForeignTeam { position: Position, match_id: MatchId },

    #[error("{position} was chosen twice")]
    DuplicatePosition { position: Position },

    #[error("the fixed member must hold seat {max} on both teams, got {position}", max = MAX_SEATS)]
    FixedMemberSeat { position: Position },

    #[error("seat {max} is reserved for the fixed member, got {position}", max = MAX_SEATS)]
    ReservedSeat { position: Position },

    #[error("{position} is already held by member `{holder}`")]
    SeatTaken { position: Position, holder: MemberId },

    #[error("member `{member_id}` already has an assignment for match `{match_id}`")]
    AlreadyAssigned { member_id: MemberId, match_id: MatchId },

    #[error("the fixed member's assignment is managed automatically")]
    FixedMemberLocked,
}

// ---------------------------------------------------------------------------
// Chits
// ---------------------------------------------------------------------------

/// The two seats a member holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Chits {
    /// Both seats on one team; `seat_low < seat_high`.
    SameTeam {
        team: TeamCode,
        seat_low: u8,
        seat_high: u8,
    },
    /// One seat on each team. A side is `None` only for imported rows whose
    /// other position was rejected.
    Split {
        team_a_seat: Option<u8>,
        team_b_seat: Option<u8>,
    },
}

impl Chits {
    /// Canonical chits for up to two positions of a match. Two positions on
    /// the same team become `SameTeam` with the smaller seat first; anything
    /// else is mapped onto the team A / team B slots. Returns `None` when no
    /// position lands on a team of the match.
    pub fn from_positions(m: &Match, first: Option<&Position>, second: Option<&Position>) -> Option<Chits> {
        if let (Some(p1), Some(p2)) = (first, second) {
            if p1.team == p2.team {
                return Some(Chits::SameTeam {
                    team: p1.team.clone(),
                    seat_low: p1.seat.min(p2.seat),
                    seat_high: p1.seat.max(p2.seat),
                });
            }
        }

        let mut team_a_seat = None;
        let mut team_b_seat = None;
        for pos in [first, second].into_iter().flatten() {
            if m.team_a() == Some(&pos.team) {
                team_a_seat = Some(pos.seat);
            } else if m.team_b() == Some(&pos.team) {
                team_b_seat = Some(pos.seat);
            }
        }

        if team_a_seat.is_none() && team_b_seat.is_none() {
            return None;
        }
        Some(Chits::Split {
            team_a_seat,
            team_b_seat,
        })
    }

    pub fn is_same_team(&self) -> bool {
        matches!(self, Chits::SameTeam { .. })
    }

    /// The team both seats come from, for same-team chits.
    pub fn same_team_code(&self) -> Option<&TeamCode> {
        match self {
            Chits::SameTeam { team, .. } => Some(team),
            Chits::Split { .. } => None,
        }
    }

    /// Resolve to concrete positions in slot order (`seatA`, `seatB`).
    pub fn positions(&self, m: &Match) -> [Option<Position>; 2] {
        match self {
            Chits::SameTeam {
                team,
                seat_low,
                seat_high,
            } => [
                Some(Position {
                    team: team.clone(),
                    seat: *seat_low,
                }),
                Some(Position {
                    team: team.clone(),
                    seat: *seat_high,
                }),
            ],
            Chits::Split {
                team_a_seat,
                team_b_seat,
            } => {
                let resolve = |team: Option<&TeamCode>, seat: &Option<u8>| {
                    Some(Position {
                        team: team?.clone(),
                        seat: (*seat)?,
                    })
                };
                [
                    resolve(m.team_a(), team_a_seat),
                    resolve(m.team_b(), team_b_seat),
                ]
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub id: String,
    pub match_id: MatchId,
    pub member_id: MemberId,
    pub chits: Chits,
}

impl Assignment {
    /// The fixed member's system-managed assignment: seat 8 on both teams.
    pub fn fixed(id: String, match_id: &str, member_id: &str) -> Self {
        Assignment {
            id,
            match_id: match_id.to_string(),
            member_id: member_id.to_string(),
            chits: Chits::Split {
                team_a_seat: Some(MAX_SEATS),
                team_b_seat: Some(MAX_SEATS),
            },
        }
    }

    pub fn positions(&self, m: &Match) -> [Option<Position>; 2] {
        self.chits.positions(m)
    }

    pub fn holds(&self, m: &Match, pos: &Position) -> bool {
        self.positions(m).iter().flatten().any(|p| p == pos)
    }

    /// Whether these are the canonical fixed-member chits (8 / 8 split).
    pub fn is_fixed_layout(&self) -> bool {
        self.chits
            == Chits::Split {
                team_a_seat: Some(MAX_SEATS),
                team_b_seat: Some(MAX_SEATS),
            }
    }
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Validation context for one match: the match itself, the assignments that
/// already exist for it, and who the fixed member is.
#[derive(Debug, Clone, Copy)]
pub struct AssignmentRules<'a> {
    pub game: &'a Match,
    pub existing: &'a [Assignment],
    pub fixed_member: &'a str,
}

impl<'a> AssignmentRules<'a> {
    pub fn new(game: &'a Match, existing: &'a [Assignment], fixed_member: &'a str) -> Self {
        AssignmentRules {
            game,
            existing,
            fixed_member,
        }
    }

    /// Validate a member's chosen positions and build the assignment.
    ///
    /// `editing` is the id of the assignment being replaced, if any; its own
    /// positions don't count as taken.
    pub fn create(
        &self,
        id: String,
        member_id: &str,
        chosen: &[Position],
        editing: Option<&str>,
    ) -> Result<Assignment, ValidationError> {
        // 1. Two valid positions on this match's teams.
        let [first, second] = chosen else {
            return Err(ValidationError::WrongPositionCount {
                given: chosen.len(),
            });
        };
        for pos in [first, second] {
            Position::new(pos.team.clone(), pos.seat)?;
        }
        if self.game.teams().is_none() {
            return Err(ValidationError::TeamsUndecided {
                match_id: self.game.id.clone(),
            });
        }
        for pos in [first, second] {
            if !pos.belongs_to_match(self.game) {
                return Err(ValidationError::ForeignTeam {
                    position: pos.clone(),
                    match_id: self.game.id.clone(),
                });
            }
        }
        if first == second {
            return Err(ValidationError::DuplicatePosition {
                position: first.clone(),
            });
        }

        let is_fixed = member_id == self.fixed_member;

        // 2. Fixed member: seat 8 only (one per team, guaranteed by 1).
        // 3. Everyone else: never seat 8.
        for pos in [first, second] {
            if is_fixed && !pos.is_reserved_seat() {
                return Err(ValidationError::FixedMemberSeat {
                    position: pos.clone(),
                });
            }
            if !is_fixed && pos.is_reserved_seat() {
                return Err(ValidationError::ReservedSeat {
                    position: pos.clone(),
                });
            }
        }

        // 4. Seat uniqueness against other members.
        if !is_fixed {
            for pos in [first, second] {
                if let Some(holder) = self.holder_of(pos, member_id, editing) {
                    return Err(ValidationError::SeatTaken {
                        position: pos.clone(),
                        holder: holder.member_id.clone(),
                    });
                }
            }
        }

        // 5. Canonical chits.
        let chits = Chits::from_positions(self.game, Some(first), Some(second)).ok_or_else(|| {
            ValidationError::ForeignTeam {
                position: first.clone(),
                match_id: self.game.id.clone(),
            }
        })?;

        Ok(Assignment {
            id,
            match_id: self.game.id.clone(),
            member_id: member_id.to_string(),
            chits,
        })
    }

    /// Another member's assignment holding `pos`, skipping `member_id`'s own
    /// assignments and the one being edited.
    pub fn holder_of(
        &self,
        pos: &Position,
        member_id: &str,
        editing: Option<&str>,
    ) -> Option<&'a Assignment> {
        self.existing.iter().find(|a| {
            a.match_id == self.game.id
                && a.member_id != member_id
                && Some(a.id.as_str()) != editing
                && a.holds(self.game, pos)
        })
    }

    /// Seats already claimed on `team`, excluding the assignment being
    /// edited. Seat 8 is left out; it is never up for grabs.
    pub fn occupied_seats(&self, team: &TeamCode, editing: Option<&str>) -> BTreeSet<u8> {
        self.existing
            .iter()
            .filter(|a| a.match_id == self.game.id && Some(a.id.as_str()) != editing)
            .flat_map(|a| a.positions(self.game))
            .flatten()
            .filter(|p| &p.team == team && !p.is_reserved_seat())
            .map(|p| p.seat)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
