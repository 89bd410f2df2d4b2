// Snapshot reconciliation: diff one match's rows from the sheet against the
// local assignments and produce a plan to bring local state in line.
//
// The sheet is the record of truth. Row-level problems are collected as
// issues and never abort the reconciliation.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::assignment::{Assignment, Chits};
use crate::league::{Match, MatchId, Member, MemberId};
use crate::position::{Position, MAX_SEATS};
use crate::season::FixedMemberRepair;

/// One member's row for one match, as read from the sheet. Every cell may be
/// blank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotRow {
    /// Member name as written in the sheet header.
    pub member_name: String,
    /// First position code, e.g. `KKR3`.
    pub pos1: Option<String>,
    pub pos1_score: Option<u32>,
    /// Second position code.
    pub pos2: Option<String>,
    pub pos2_score: Option<u32>,
    /// The sheet's own total column. Reported on, never used.
    pub sheet_total: Option<u32>,
}

/// A problem with a single row or cell. Accumulated, never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RowIssue {
    #[error("match `{match_id}` has no teams yet; snapshot ignored")]
    TeamsUndecided { match_id: MatchId },

    #[error("no roster member named `{name}`")]
    UnknownMember { name: String },

    #[error("member `{member_id}` appears more than once; later rows ignored")]
    DuplicateRow { member_id: MemberId },

    #[error("member `{member_id}`: `{code}` is not a valid position ({reason})")]
    InvalidPosition {
        member_id: MemberId,
        code: String,
        reason: String,
    },

    #[error("member `{member_id}`: {position} is not on either team")]
    ForeignTeam { member_id: MemberId, position: String },

    #[error("member `{member_id}`: seat {max} is reserved, dropped {position}", max = MAX_SEATS)]
    ReservedSeat { member_id: MemberId, position: String },

    #[error("fixed member `{member_id}` may only hold seat {max}, dropped {position}", max = MAX_SEATS)]
    FixedMemberSeat { member_id: MemberId, position: String },

    #[error("member `{member_id}`: {position} already taken by `{holder}`")]
    DuplicatePosition {
        member_id: MemberId,
        position: String,
        holder: MemberId,
    },

    #[error("member `{member_id}`: sheet total {sheet_total} != computed {computed}")]
    SheetTotalMismatch {
        member_id: MemberId,
        sheet_total: u32,
        computed: u32,
    },
}

/// A change to one local assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssignmentOp {
    Create {
        member_id: MemberId,
        chits: Chits,
    },
    Update {
        assignment_id: String,
        member_id: MemberId,
        chits: Chits,
    },
    Delete {
        assignment_id: String,
        member_id: MemberId,
    },
}

/// Everything needed to bring one match in line with a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub match_id: MatchId,
    pub assignment_ops: Vec<AssignmentOp>,
    /// Members whose local assignment already matches the snapshot.
    pub unchanged: Vec<MemberId>,
    /// Scores present in the snapshot for accepted positions.
    pub score_entries: Vec<(Position, u32)>,
    /// Positions whose local scores survive. `None` leaves scores alone.
    pub score_keep: Option<BTreeSet<Position>>,
    pub issues: Vec<RowIssue>,
}

impl ReconcilePlan {
    fn empty(match_id: &str) -> Self {
        ReconcilePlan {
            match_id: match_id.to_string(),
            assignment_ops: Vec::new(),
            unchanged: Vec::new(),
            score_entries: Vec::new(),
            score_keep: None,
            issues: Vec::new(),
        }
    }
}

/// What applying a plan actually did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub match_id: MatchId,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
    pub scores_inserted: usize,
    pub scores_updated: usize,
    pub scores_deleted: usize,
    pub fixed_member: FixedMemberRepair,
    pub issues: Vec<RowIssue>,
}

impl ReconcileSummary {
    pub fn has_changes(&self) -> bool {
        self.created + self.updated + self.deleted > 0
            || self.scores_inserted + self.scores_updated + self.scores_deleted > 0
            || self.fixed_member != FixedMemberRepair::AlreadyPresent
    }
}

/// Map a sheet name to a roster id: exact match first, then
/// case-insensitive. Surrounding whitespace is ignored.
pub fn resolve_member_id(roster: &[Member], name: &str) -> Option<MemberId> {
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    roster
        .iter()
        .find(|m| m.name == name)
        .or_else(|| roster.iter().find(|m| m.name.eq_ignore_ascii_case(name)))
        .map(|m| m.id.clone())
}

/// Build the plan for one match. `local` may hold assignments for other
/// matches; they are ignored.
pub fn plan_reconcile(
    game: &Match,
    rows: &[SnapshotRow],
    roster: &[Member],
    local: &[Assignment],
    fixed_member: &str,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::empty(&game.id);

    if game.teams().is_none() {
        plan.issues.push(RowIssue::TeamsUndecided {
            match_id: game.id.clone(),
        });
        return plan;
    }

    let mut claimed: HashMap<Position, MemberId> = HashMap::new();
    let mut seen: HashSet<MemberId> = HashSet::new();
    let mut targets: Vec<(MemberId, Chits)> = Vec::new();
    let mut keep = BTreeSet::new();

    for row in rows {
        let slots: Vec<(&str, Option<u32>)> = [
            (row.pos1.as_deref(), row.pos1_score),
            (row.pos2.as_deref(), row.pos2_score),
        ]
        .into_iter()
        .filter_map(|(code, score)| {
            let code = code?.trim();
            (!code.is_empty()).then_some((code, score))
        })
        .collect();

        // A member with nothing entered is simply not in this snapshot.
        if slots.is_empty() {
            continue;
        }

        let Some(member_id) = resolve_member_id(roster, &row.member_name) else {
            warn!("Skipping snapshot row for unknown member '{}'", row.member_name);
            plan.issues.push(RowIssue::UnknownMember {
                name: row.member_name.trim().to_string(),
            });
            continue;
        };
        if !seen.insert(member_id.clone()) {
            warn!("Member {} appears twice in match {} snapshot", member_id, game.id);
            plan.issues.push(RowIssue::DuplicateRow { member_id });
            continue;
        }

        let is_fixed = member_id == fixed_member;
        let mut accepted: Vec<Position> = Vec::new();
        let mut computed = 0u32;

        for (code, score) in slots {
            match check_position(game, code, &member_id, is_fixed, &claimed, &accepted) {
                Ok(pos) => {
                    if let Some(runs) = score {
                        computed = computed.saturating_add(runs);
                        keep.insert(pos.clone());
                        plan.score_entries.push((pos.clone(), runs));
                    }
                    accepted.push(pos);
                }
                Err(issue) => {
                    warn!("Match {}: {}", game.id, issue);
                    plan.issues.push(issue);
                }
            }
        }

        if accepted.is_empty() {
            continue;
        }
        for pos in accepted.iter().filter(|p| !p.is_reserved_seat()) {
            claimed.insert(pos.clone(), member_id.clone());
        }

        if let Some(sheet_total) = row.sheet_total {
            if sheet_total != computed {
                let issue = RowIssue::SheetTotalMismatch {
                    member_id: member_id.clone(),
                    sheet_total,
                    computed,
                };
                warn!("Match {}: {}", game.id, issue);
                plan.issues.push(issue);
            }
        }

        // The fixed member's assignment is system-managed; only their
        // scores come from the sheet.
        if is_fixed {
            continue;
        }
        if let Some(chits) = Chits::from_positions(game, accepted.first(), accepted.get(1)) {
            targets.push((member_id, chits));
        }
    }

    let present: HashSet<&str> = targets.iter().map(|(id, _)| id.as_str()).collect();
    let in_match = || local.iter().filter(|a| a.match_id == game.id);

    for (member_id, chits) in &targets {
        let mut mine = in_match().filter(|a| &a.member_id == member_id);
        match mine.next() {
            None => plan.assignment_ops.push(AssignmentOp::Create {
                member_id: member_id.clone(),
                chits: chits.clone(),
            }),
            Some(existing) if &existing.chits == chits => plan.unchanged.push(member_id.clone()),
            Some(existing) => plan.assignment_ops.push(AssignmentOp::Update {
                assignment_id: existing.id.clone(),
                member_id: member_id.clone(),
                chits: chits.clone(),
            }),
        }
        for dup in mine {
            debug!("Dropping duplicate assignment {} for member {}", dup.id, member_id);
            plan.assignment_ops.push(AssignmentOp::Delete {
                assignment_id: dup.id.clone(),
                member_id: member_id.clone(),
            });
        }
    }

    for a in in_match() {
        if a.member_id != fixed_member && !present.contains(a.member_id.as_str()) {
            plan.assignment_ops.push(AssignmentOp::Delete {
                assignment_id: a.id.clone(),
                member_id: a.member_id.clone(),
            });
        }
    }

    plan.score_keep = Some(keep);
    plan
}

/// Validate one position cell of a row against the match, the seat-8 rule,
/// and the positions already accepted from this snapshot.
fn check_position(
    game: &Match,
    code: &str,
    member_id: &str,
    is_fixed: bool,
    claimed: &HashMap<Position, MemberId>,
    same_row: &[Position],
) -> Result<Position, RowIssue> {
    let pos = Position::parse(code).map_err(|e| RowIssue::InvalidPosition {
        member_id: member_id.to_string(),
        code: code.to_string(),
        reason: e.to_string(),
    })?;

    if !pos.belongs_to_match(game) {
        return Err(RowIssue::ForeignTeam {
            member_id: member_id.to_string(),
            position: pos.code(),
        });
    }
    if is_fixed && !pos.is_reserved_seat() {
        return Err(RowIssue::FixedMemberSeat {
            member_id: member_id.to_string(),
            position: pos.code(),
        });
    }
    if !is_fixed && pos.is_reserved_seat() {
        return Err(RowIssue::ReservedSeat {
            member_id: member_id.to_string(),
            position: pos.code(),
        });
    }

    let holder = if same_row.contains(&pos) {
        Some(member_id.to_string())
    } else if pos.is_reserved_seat() {
        None
    } else {
        claimed.get(&pos).cloned()
    };
    if let Some(holder) = holder {
        return Err(RowIssue::DuplicatePosition {
            member_id: member_id.to_string(),
            position: pos.code(),
            holder,
        });
    }

    Ok(pos)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
