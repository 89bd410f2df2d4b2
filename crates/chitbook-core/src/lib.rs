// Library root: the league model and scoring engine. Pure and synchronous;
// the app crate owns I/O, timing, and logging setup.

pub mod assignment;
pub mod league;
pub mod position;
pub mod reconcile;
pub mod scores;
pub mod scoring;
pub mod season;

pub use assignment::{Assignment, AssignmentRules, Chits, ValidationError};
pub use league::{LeagueError, Match, MatchId, MatchStatus, Member, MemberId, PlayoffKind, Team};
pub use position::{Position, PositionError, TeamCode, MAX_SEATS};
pub use reconcile::{plan_reconcile, ReconcilePlan, ReconcileSummary, RowIssue, SnapshotRow};
pub use scores::{ScoreChanges, ScoreTable};
pub use scoring::{LeaderboardRow, Payout, WinnerReport};
pub use season::{FixedMemberRepair, Season, SeasonError};
