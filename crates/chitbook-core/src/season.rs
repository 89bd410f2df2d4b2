// Season state: roster, fixtures, assignments, and scores for one season.
//
// This is the only mutable state in the core crate. Callers own it (the app
// keeps it behind a mutex) and pass it to the engine by reference.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::assignment::{Assignment, AssignmentRules, ValidationError};
use crate::league::{LeagueError, Match, MatchId, MatchStatus, Member, MemberId};
use crate::position::{Position, TeamCode};
use crate::reconcile::{AssignmentOp, ReconcilePlan, ReconcileSummary};
use crate::scores::{ScoreChanges, ScoreTable};
use crate::scoring::{self, LeaderboardRow, Payout, WinnerReport};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeasonError {
    #[error(transparent)]
    League(#[from] LeagueError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("assignment `{assignment_id}` not found")]
    UnknownAssignment { assignment_id: String },
}

/// What [`Season::ensure_fixed_member_assigned`] had to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FixedMemberRepair {
    #[default]
    AlreadyPresent,
    Created,
    Deduplicated { removed: usize },
}

#[derive(Debug, Clone)]
pub struct Season {
    members: Vec<Member>,
    matches: Vec<Match>,
    assignments: BTreeMap<MatchId, Vec<Assignment>>,
    scores: BTreeMap<MatchId, ScoreTable>,
    fixed_member: MemberId,
    next_seq: u64,
}

impl Season {
    /// Build a season. The fixed member must be on the roster and match ids
    /// must be unique.
    pub fn new(
        members: Vec<Member>,
        matches: Vec<Match>,
        fixed_member: &str,
    ) -> Result<Self, LeagueError> {
        if !members.iter().any(|m| m.id == fixed_member) {
            return Err(LeagueError::UnknownMember {
                member_id: fixed_member.to_string(),
            });
        }
        let mut seen = BTreeSet::new();
        let mut unique = Vec::with_capacity(matches.len());
        for m in matches {
            if seen.insert(m.id.clone()) {
                unique.push(m);
            } else {
                warn!("Duplicate match id {} in schedule; later copy ignored", m.id);
            }
        }

        Ok(Season {
            members,
            matches: unique,
            assignments: BTreeMap::new(),
            scores: BTreeMap::new(),
            fixed_member: fixed_member.to_string(),
            next_seq: 1,
        })
    }

    // -- Accessors ----------------------------------------------------------

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn fixed_member(&self) -> &str {
        &self.fixed_member
    }

    pub fn member(&self, member_id: &str) -> Result<&Member, LeagueError> {
        self.members
            .iter()
            .find(|m| m.id == member_id)
            .ok_or_else(|| LeagueError::UnknownMember {
                member_id: member_id.to_string(),
            })
    }

    pub fn get_match(&self, match_id: &str) -> Result<&Match, LeagueError> {
        self.matches
            .iter()
            .find(|m| m.id == match_id)
            .ok_or_else(|| LeagueError::UnknownMatch {
                match_id: match_id.to_string(),
            })
    }

    fn match_mut(&mut self, match_id: &str) -> Result<&mut Match, LeagueError> {
        self.matches
            .iter_mut()
            .find(|m| m.id == match_id)
            .ok_or_else(|| LeagueError::UnknownMatch {
                match_id: match_id.to_string(),
            })
    }

    /// Assignments for a match, in creation order.
    pub fn assignments(&self, match_id: &str) -> &[Assignment] {
        self.assignments
            .get(match_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn scores(&self, match_id: &str) -> Option<&ScoreTable> {
        self.scores.get(match_id)
    }

    pub fn is_complete(&self, assignment: &Assignment) -> bool {
        match (self.get_match(&assignment.match_id), self.scores(&assignment.match_id)) {
            (Ok(m), Some(table)) => table.is_complete(assignment, m),
            _ => false,
        }
    }

    fn next_assignment_id(&mut self, match_id: &str) -> String {
        let id = format!("asg_{match_id}_{}", self.next_seq);
        self.next_seq += 1;
        id
    }

    fn find_assignment(&self, assignment_id: &str) -> Result<&Assignment, SeasonError> {
        self.assignments
            .values()
            .flatten()
            .find(|a| a.id == assignment_id)
            .ok_or_else(|| SeasonError::UnknownAssignment {
                assignment_id: assignment_id.to_string(),
            })
    }

    // -- Assignments --------------------------------------------------------

    /// Give a member their two chits for a match.
    pub fn assign(
        &mut self,
        match_id: &str,
        member_id: &str,
        chosen: &[Position],
    ) -> Result<&Assignment, SeasonError> {
        self.member(member_id)?;
        if member_id == self.fixed_member {
            return Err(ValidationError::FixedMemberLocked.into());
        }
        if self.assignments(match_id).iter().any(|a| a.member_id == member_id) {
            return Err(ValidationError::AlreadyAssigned {
                member_id: member_id.to_string(),
                match_id: match_id.to_string(),
            }
            .into());
        }

        let id = self.next_assignment_id(match_id);
        let game = self.get_match(match_id)?;
        let rules = AssignmentRules::new(game, self.assignments(match_id), &self.fixed_member);
        let assignment = rules.create(id, member_id, chosen, None)?;

        debug!("Assigned {} to member {} in match {}", assignment.id, member_id, match_id);
        let list = self.assignments.entry(match_id.to_string()).or_default();
        list.push(assignment);
        Ok(&list[list.len() - 1])
    }

    /// Replace the chits of an existing assignment.
    pub fn edit_assignment(
        &mut self,
        assignment_id: &str,
        chosen: &[Position],
    ) -> Result<&Assignment, SeasonError> {
        let current = self.find_assignment(assignment_id)?;
        if current.member_id == self.fixed_member {
            return Err(ValidationError::FixedMemberLocked.into());
        }
        let match_id = current.match_id.clone();
        let member_id = current.member_id.clone();

        let game = self.get_match(&match_id)?;
        let rules = AssignmentRules::new(game, self.assignments(&match_id), &self.fixed_member);
        let edited = rules.create(
            assignment_id.to_string(),
            &member_id,
            chosen,
            Some(assignment_id),
        )?;

        let list = self.assignments.entry(match_id).or_default();
        let idx = list
            .iter()
            .position(|a| a.id == assignment_id)
            .ok_or_else(|| SeasonError::UnknownAssignment {
                assignment_id: assignment_id.to_string(),
            })?;
        list[idx] = edited;
        Ok(&list[idx])
    }

    pub fn remove_assignment(&mut self, assignment_id: &str) -> Result<Assignment, SeasonError> {
        let current = self.find_assignment(assignment_id)?;
        if current.member_id == self.fixed_member {
            return Err(ValidationError::FixedMemberLocked.into());
        }
        let match_id = current.match_id.clone();
        self.take_assignment(&match_id, assignment_id)
            .ok_or_else(|| SeasonError::UnknownAssignment {
                assignment_id: assignment_id.to_string(),
            })
    }

    fn take_assignment(&mut self, match_id: &str, assignment_id: &str) -> Option<Assignment> {
        let list = self.assignments.get_mut(match_id)?;
        let idx = list.iter().position(|a| a.id == assignment_id)?;
        Some(list.remove(idx))
    }

    /// Seats on `team` a new or edited assignment can no longer pick.
    pub fn occupied_seats(
        &self,
        match_id: &str,
        team: &TeamCode,
        editing: Option<&str>,
    ) -> Result<BTreeSet<u8>, LeagueError> {
        let game = self.get_match(match_id)?;
        let rules = AssignmentRules::new(game, self.assignments(match_id), &self.fixed_member);
        Ok(rules.occupied_seats(team, editing))
    }

    /// Make sure the fixed member holds exactly one 8/8 assignment in the
    /// match. Idempotent.
    pub fn ensure_fixed_member_assigned(
        &mut self,
        match_id: &str,
    ) -> Result<FixedMemberRepair, LeagueError> {
        self.get_match(match_id)?;
        let fixed = self.fixed_member.clone();

        let held = self
            .assignments(match_id)
            .iter()
            .filter(|a| a.member_id == fixed)
            .count();

        match held {
            0 => {
                let id = self.next_assignment_id(match_id);
                info!("Creating fixed-member assignment {} for match {}", id, match_id);
                self.assignments
                    .entry(match_id.to_string())
                    .or_default()
                    .push(Assignment::fixed(id, match_id, &fixed));
                Ok(FixedMemberRepair::Created)
            }
            1 => Ok(FixedMemberRepair::AlreadyPresent),
            n => {
                let list = self.assignments.entry(match_id.to_string()).or_default();
                let mut first = true;
                list.retain(|a| {
                    if a.member_id != fixed {
                        return true;
                    }
                    std::mem::replace(&mut first, false)
                });
                warn!(
                    "Removed {} duplicate fixed-member assignments from match {}",
                    n - 1,
                    match_id
                );
                Ok(FixedMemberRepair::Deduplicated { removed: n - 1 })
            }
        }
    }

    /// Run [`Season::ensure_fixed_member_assigned`] for every match. Returns
    /// how many matches needed a repair.
    pub fn ensure_fixed_member_everywhere(&mut self) -> usize {
        let ids: Vec<MatchId> = self.matches.iter().map(|m| m.id.clone()).collect();
        ids.iter()
            .filter_map(|id| self.ensure_fixed_member_assigned(id).ok())
            .filter(|r| *r != FixedMemberRepair::AlreadyPresent)
            .count()
    }

    // -- Scores -------------------------------------------------------------

    /// Enter or clear runs for a match.
    pub fn set_scores<I>(&mut self, match_id: &str, entries: I) -> Result<ScoreChanges, LeagueError>
    where
        I: IntoIterator<Item = (Position, Option<u32>)>,
    {
        self.get_match(match_id)?;
        Ok(self
            .scores
            .entry(match_id.to_string())
            .or_default()
            .upsert_many(entries))
    }

    // -- Matches ------------------------------------------------------------

    /// Recompute every match's status for `today`. Returns how many changed.
    pub fn refresh_statuses(&mut self, today: NaiveDate) -> usize {
        self.matches
            .iter_mut()
            .map(|m| m.refresh_status(today))
            .filter(|changed| *changed)
            .count()
    }

    pub fn override_status(
        &mut self,
        match_id: &str,
        status: Option<MatchStatus>,
    ) -> Result<(), LeagueError> {
        self.match_mut(match_id)?.override_status(status);
        Ok(())
    }

    pub fn set_playoff_teams(
        &mut self,
        match_id: &str,
        team_a: TeamCode,
        team_b: TeamCode,
    ) -> Result<(), LeagueError> {
        let current = self
            .get_match(match_id)?
            .teams()
            .map(|(a, b)| (a.clone(), b.clone()));
        let assigned = self
            .assignments(match_id)
            .iter()
            .filter(|a| a.member_id != self.fixed_member)
            .count();
        // Chits already placed refer to the current teams' positions.
        if assigned > 0 && current != Some((team_a.clone(), team_b.clone())) {
            return Err(LeagueError::PlayoffTeamsLocked {
                match_id: match_id.to_string(),
                assigned,
            });
        }
        self.match_mut(match_id)?.set_playoff_teams(team_a, team_b)?;
        info!("Playoff match {} teams set", match_id);
        Ok(())
    }

    // -- Scoring ------------------------------------------------------------

    pub fn winners(&self, match_id: &str) -> Result<WinnerReport, LeagueError> {
        let game = self.get_match(match_id)?;
        let empty = ScoreTable::new();
        let scores = self.scores.get(match_id).unwrap_or(&empty);
        Ok(scoring::match_winners(game, self.assignments(match_id), scores))
    }

    pub fn leaderboard(&self, payout: Payout) -> Vec<LeaderboardRow> {
        scoring::season_leaderboard(
            &self.members,
            &self.matches,
            &self.assignments,
            &self.scores,
            payout,
        )
    }

    // -- Reconciliation -----------------------------------------------------

    /// Execute a reconcile plan, then re-ensure the fixed member.
    pub fn apply_plan(&mut self, plan: ReconcilePlan) -> Result<ReconcileSummary, LeagueError> {
        self.get_match(&plan.match_id)?;
        let match_id = plan.match_id.clone();

        let mut summary = ReconcileSummary {
            match_id: match_id.clone(),
            unchanged: plan.unchanged.len(),
            issues: plan.issues,
            ..Default::default()
        };

        for op in plan.assignment_ops {
            match op {
                AssignmentOp::Create { member_id, chits } => {
                    let id = self.next_assignment_id(&match_id);
                    self.assignments
                        .entry(match_id.clone())
                        .or_default()
                        .push(Assignment {
                            id,
                            match_id: match_id.clone(),
                            member_id,
                            chits,
                        });
                    summary.created += 1;
                }
                AssignmentOp::Update {
                    assignment_id,
                    chits,
                    ..
                } => {
                    let target = self
                        .assignments
                        .get_mut(&match_id)
                        .and_then(|list| list.iter_mut().find(|a| a.id == assignment_id));
                    match target {
                        Some(a) => {
                            a.chits = chits;
                            summary.updated += 1;
                        }
                        None => warn!("Update for missing assignment {}", assignment_id),
                    }
                }
                AssignmentOp::Delete { assignment_id, .. } => {
                    if self.take_assignment(&match_id, &assignment_id).is_some() {
                        summary.deleted += 1;
                    }
                }
            }
        }

        let table = self.scores.entry(match_id.clone()).or_default();
        let changes = table.upsert_many(
            plan.score_entries
                .into_iter()
                .map(|(pos, runs)| (pos, Some(runs))),
        );
        summary.scores_inserted = changes.inserted;
        summary.scores_updated = changes.updated;
        if let Some(keep) = plan.score_keep {
            summary.scores_deleted = table.retain_positions(&keep);
        }

        summary.fixed_member = self.ensure_fixed_member_assigned(&match_id)?;

        info!(
            "Reconciled match {}: +{} ~{} ={} -{} assignments, scores +{} ~{} -{}, {} issues",
            match_id,
            summary.created,
            summary.updated,
            summary.unchanged,
            summary.deleted,
            summary.scores_inserted,
            summary.scores_updated,
            summary.scores_deleted,
            summary.issues.len()
        );
        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assignment::Chits;
    use crate::league::PlayoffKind;
    use crate::reconcile::{plan_reconcile, SnapshotRow};

    const FIXED: &str = "8";

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn team(code: &str) -> TeamCode {
        TeamCode::new(code).unwrap()
    }

    fn pos(code: &str) -> Position {
        Position::parse(code).unwrap()
    }

    fn test_season() -> Season {
        let members = vec![
            Member::new("1", "Ronak"),
            Member::new("2", "Tilak"),
            Member::new("3", "Kishan"),
            Member::new(FIXED, "Rajesh"),
        ];
        let matches = vec![
            Match::league("1", day(3, 22), team("KKR"), team("RCB")),
            Match::league("2", day(3, 23), team("SRH"), team("RR")),
            Match::playoff("74", day(5, 25), PlayoffKind::Final),
        ];
        Season::new(members, matches, FIXED).unwrap()
    }

    #[test]
    fn new_requires_fixed_member_on_roster() {
        let err = Season::new(vec![Member::new("1", "Ronak")], vec![], FIXED).unwrap_err();
        assert!(matches!(err, LeagueError::UnknownMember { .. }));
    }

    #[test]
    fn new_drops_duplicate_match_ids() {
        let matches = vec![
            Match::league("1", day(3, 22), team("KKR"), team("RCB")),
            Match::league("1", day(3, 23), team("SRH"), team("RR")),
        ];
        let season = Season::new(vec![Member::new(FIXED, "Rajesh")], matches, FIXED).unwrap();
        assert_eq!(season.matches().len(), 1);
        assert!(season.get_match("1").unwrap().has_team(&team("KKR")));
    }

    #[test]
    fn assign_edit_remove_cycle() {
        let mut season = test_season();
        let id = season
            .assign("1", "1", &[pos("KKR1"), pos("RCB2")])
            .unwrap()
            .id
            .clone();
        assert_eq!(id, "asg_1_1");

        let err = season
            .assign("1", "1", &[pos("KKR3"), pos("RCB4")])
            .unwrap_err();
        assert!(matches!(
            err,
            SeasonError::Validation(ValidationError::AlreadyAssigned { .. })
        ));

        let err = season
            .assign("1", "2", &[pos("KKR1"), pos("RCB5")])
            .unwrap_err();
        assert!(matches!(
            err,
            SeasonError::Validation(ValidationError::SeatTaken { .. })
        ));

        let edited = season.edit_assignment(&id, &[pos("KKR1"), pos("KKR4")]).unwrap();
        assert!(edited.chits.is_same_team());

        let removed = season.remove_assignment(&id).unwrap();
        assert_eq!(removed.member_id, "1");
        assert!(season.assignments("1").is_empty());
    }

    #[test]
    fn unknown_ids_are_not_found() {
        let mut season = test_season();
        assert!(matches!(
            season.assign("99", "1", &[pos("KKR1"), pos("RCB2")]),
            Err(SeasonError::League(LeagueError::UnknownMatch { .. }))
        ));
        assert!(matches!(
            season.assign("1", "42", &[pos("KKR1"), pos("RCB2")]),
            Err(SeasonError::League(LeagueError::UnknownMember { .. }))
        ));
        assert!(matches!(
            season.remove_assignment("nope"),
            Err(SeasonError::UnknownAssignment { .. })
        ));
    }

    #[test]
    fn fixed_member_is_system_managed() {
        let mut season = test_season();
        assert_eq!(
            season.ensure_fixed_member_assigned("1").unwrap(),
            FixedMemberRepair::Created
        );
        assert_eq!(
            season.ensure_fixed_member_assigned("1").unwrap(),
            FixedMemberRepair::AlreadyPresent
        );

        let fixed_id = season.assignments("1")[0].id.clone();
        assert!(matches!(
            season.remove_assignment(&fixed_id),
            Err(SeasonError::Validation(ValidationError::FixedMemberLocked))
        ));
        assert!(matches!(
            season.edit_assignment(&fixed_id, &[pos("KKR8"), pos("RCB8")]),
            Err(SeasonError::Validation(ValidationError::FixedMemberLocked))
        ));
        assert!(matches!(
            season.assign("1", FIXED, &[pos("KKR8"), pos("RCB8")]),
            Err(SeasonError::Validation(ValidationError::FixedMemberLocked))
        ));
    }

    #[test]
    fn fixed_member_duplicates_collapse_to_first() {
        let mut season = test_season();
        let list = season.assignments.entry("1".into()).or_default();
        list.push(Assignment::fixed("f1".into(), "1", FIXED));
        list.push(Assignment::fixed("f2".into(), "1", FIXED));
        list.push(Assignment::fixed("f3".into(), "1", FIXED));

        assert_eq!(
            season.ensure_fixed_member_assigned("1").unwrap(),
            FixedMemberRepair::Deduplicated { removed: 2 }
        );
        let ids: Vec<_> = season.assignments("1").iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["f1"]);
    }

    #[test]
    fn ensure_everywhere_counts_repairs() {
        let mut season = test_season();
        assert_eq!(season.ensure_fixed_member_everywhere(), 3);
        assert_eq!(season.ensure_fixed_member_everywhere(), 0);
    }

    #[test]
    fn status_refresh_and_override() {
        let mut season = test_season();
        assert_eq!(season.refresh_statuses(day(3, 23)), 1);
        assert_eq!(season.refresh_statuses(day(3, 23)), 0);

        season.override_status("2", Some(MatchStatus::Live)).unwrap();
        assert_eq!(season.refresh_statuses(day(4, 1)), 0);
        assert_eq!(season.get_match("2").unwrap().status(), MatchStatus::Live);
        assert!(season.override_status("99", None).is_err());
    }

    #[test]
    fn playoff_accepts_chits_after_teams_set() {
        let mut season = test_season();
        assert!(season.assign("74", "1", &[pos("KKR1"), pos("SRH1")]).is_err());
        season.set_playoff_teams("74", team("KKR"), team("SRH")).unwrap();
        assert!(season.assign("74", "1", &[pos("KKR1"), pos("SRH1")]).is_ok());
        assert!(season.set_playoff_teams("1", team("GT"), team("MI")).is_err());
    }

    #[test]
    fn playoff_teams_locked_once_members_hold_chits() {
        let mut season = test_season();
        season.set_playoff_teams("74", team("KKR"), team("SRH")).unwrap();
        // Only the fixed member is placed, so the teams can still move.
        season.ensure_fixed_member_everywhere();
        season.set_playoff_teams("74", team("GT"), team("MI")).unwrap();

        season.assign("74", "1", &[pos("GT1"), pos("MI1")]).unwrap();
        assert_eq!(
            season.set_playoff_teams("74", team("KKR"), team("SRH")),
            Err(LeagueError::PlayoffTeamsLocked {
                match_id: "74".to_string(),
                assigned: 1,
            })
        );
        assert!(season.get_match("74").unwrap().has_team(&team("GT")));
        // Re-sending the same teams is harmless.
        season.set_playoff_teams("74", team("GT"), team("MI")).unwrap();
    }

    #[test]
    fn winners_and_leaderboard_read_state() {
        let mut season = test_season();
        season.assign("1", "1", &[pos("KKR1"), pos("RCB2")]).unwrap();
        season.assign("1", "2", &[pos("KKR3"), pos("RCB4")]).unwrap();
        season
            .set_scores(
                "1",
                [
                    (pos("KKR1"), Some(30)),
                    (pos("RCB2"), Some(50)),
                    (pos("KKR3"), Some(40)),
                    (pos("RCB4"), Some(50)),
                ],
            )
            .unwrap();

        // Not completed yet.
        assert!(season.winners("1").unwrap().winners.is_empty());

        season.refresh_statuses(day(3, 30));
        let report = season.winners("1").unwrap();
        assert_eq!(report.winner_ids().collect::<Vec<_>>(), vec!["2"]);

        let board = season.leaderboard(Payout::default());
        assert_eq!(board[0].name, "Tilak");
        assert_eq!(board[0].wins, 1);
        assert_eq!(board[0].profit_loss, 210 - 2100);
        assert_eq!(board.len(), 4);
    }

    #[test]
    fn apply_plan_reports_real_changes() {
        let mut season = test_season();
        season.assign("1", "1", &[pos("KKR1"), pos("RCB2")]).unwrap();
        season.assign("1", "2", &[pos("KKR3"), pos("RCB4")]).unwrap();
        season.set_scores("1", [(pos("KKR7"), Some(5))]).unwrap();

        let rows = vec![
            SnapshotRow {
                member_name: "Ronak".into(),
                pos1: Some("KKR1".into()),
                pos1_score: Some(12),
                pos2: Some("RCB2".into()),
                pos2_score: None,
                sheet_total: Some(12),
            },
            SnapshotRow {
                member_name: "Kishan".into(),
                pos1: Some("KKR5".into()),
                pos1_score: None,
                pos2: Some("KKR6".into()),
                pos2_score: None,
                sheet_total: None,
            },
        ];
        let plan = plan_reconcile(
            season.get_match("1").unwrap(),
            &rows,
            season.members(),
            season.assignments("1"),
            season.fixed_member(),
        );
        let summary = season.apply_plan(plan).unwrap();

        assert_eq!(summary.created, 1);
        assert_eq!(summary.unchanged, 1);
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.scores_inserted, 1);
        assert_eq!(summary.scores_deleted, 1);
        assert_eq!(summary.fixed_member, FixedMemberRepair::Created);
        assert!(summary.issues.is_empty());
        assert!(summary.has_changes());

        let members: Vec<_> = season
            .assignments("1")
            .iter()
            .map(|a| a.member_id.as_str())
            .collect();
        assert_eq!(members, vec!["1", "3", FIXED]);
        assert!(season.assignments("1")[1].chits
            == Chits::SameTeam {
                team: team("KKR"),
                seat_low: 5,
                seat_high: 6
            });
    }

    #[test]
    fn is_complete_tracks_entered_scores() {
        let mut season = test_season();
        let a = season
            .assign("1", "1", &[pos("KKR1"), pos("RCB2")])
            .unwrap()
            .clone();
        assert!(!season.is_complete(&a));
        season
            .set_scores("1", [(pos("KKR1"), Some(0)), (pos("RCB2"), Some(0))])
            .unwrap();
        assert!(season.is_complete(&a));
    }
}
