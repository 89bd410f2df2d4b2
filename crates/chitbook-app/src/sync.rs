// Sync service: fetch the sheet, reconcile local state against it, and push
// local edits back.
//
// The season lives behind a `std::sync::Mutex` and is never locked across an
// await. The fetch is the only suspension point in a sync.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveDate;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use chitbook_core::{
    plan_reconcile, Assignment, LeagueError, MatchId, Position, ReconcileSummary, ScoreChanges, Season,
    SeasonError,
};

use crate::retry::{run_with_retry, CancelToken, RetryPolicy};
use crate::sheet::{self, CellWrite, SheetLayout, SheetMatch};
use crate::transport::{BatchWriteReport, SheetSource, SheetWriter, TransportError};

/// Shared season state.
pub type SharedSeason = Arc<Mutex<Season>>;

/// A background sheet write started by [`Publisher::spawn_publish`].
pub type PublishHandle = JoinHandle<Result<BatchWriteReport, TransportError>>;

// ---------------------------------------------------------------------------
// Outcomes and errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("sheet fetch failed: {0}")]
    Transport(#[from] TransportError),

    #[error("match `{match_id}` not found in snapshot")]
    MatchNotInSnapshot { match_id: MatchId },

    #[error(transparent)]
    League(#[from] LeagueError),

    #[error(transparent)]
    Season(#[from] SeasonError),

    #[error("season state lock poisoned")]
    Poisoned,
}

/// Why a sync request did nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// A fetch for the same target started less than the throttle ago.
    Throttled,
    /// A fetch for the same target is still running.
    InFlight,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome<T> {
    Applied(T),
    Skipped(SkipReason),
}

impl<T> SyncOutcome<T> {
    pub fn applied(self) -> Option<T> {
        match self {
            SyncOutcome::Applied(v) => Some(v),
            SyncOutcome::Skipped(_) => None,
        }
    }
}

fn lock(store: &Mutex<Season>) -> Result<MutexGuard<'_, Season>, SyncError> {
    store.lock().map_err(|_| SyncError::Poisoned)
}

// ---------------------------------------------------------------------------
// Fetch guards
// ---------------------------------------------------------------------------

/// `None` is the whole-sheet sync; `Some(id)` a single match.
type GuardKey = Option<MatchId>;

#[derive(Debug, Default)]
struct FetchState {
    in_flight: bool,
    last_started: Option<Instant>,
}

/// Clears the in-flight flag when the fetch ends, however it ends.
struct InFlight<'a> {
    guards: &'a Mutex<HashMap<GuardKey, FetchState>>,
    key: GuardKey,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut guards = self.guards.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(state) = guards.get_mut(&self.key) {
            state.in_flight = false;
        }
    }
}

// ---------------------------------------------------------------------------
// Syncer
// ---------------------------------------------------------------------------

pub struct Syncer<S> {
    source: S,
    layout: SheetLayout,
    policy: RetryPolicy,
    throttle: Duration,
    guards: Mutex<HashMap<GuardKey, FetchState>>,
}

impl<S: SheetSource> Syncer<S> {
    pub fn new(source: S, layout: SheetLayout, policy: RetryPolicy, throttle: Duration) -> Self {
        Syncer {
            source,
            layout,
            policy,
            throttle,
            guards: Mutex::new(HashMap::new()),
        }
    }

    fn try_begin(&self, key: GuardKey) -> Result<InFlight<'_>, SkipReason> {
        let mut guards = self.guards.lock().unwrap_or_else(|e| e.into_inner());
        let state = guards.entry(key.clone()).or_default();
        if state.in_flight {
            return Err(SkipReason::InFlight);
        }
        let now = Instant::now();
        if let Some(last) = state.last_started {
            if now.duration_since(last) < self.throttle {
                return Err(SkipReason::Throttled);
            }
        }
        state.in_flight = true;
        state.last_started = Some(now);
        Ok(InFlight {
            guards: &self.guards,
            key,
        })
    }

    async fn fetch_matches(
        &self,
        store: &Mutex<Season>,
        cancel: &CancelToken,
    ) -> Result<Vec<SheetMatch>, SyncError> {
        let grid = run_with_retry(&self.policy, cancel, "sheet fetch", || self.source.fetch_grid()).await?;
        let members = lock(store)?.members().to_vec();
        Ok(sheet::parse_grid(&grid, &self.layout, &members))
    }

    /// Bring one match in line with the sheet.
    pub async fn sync_match(
        &self,
        store: &Mutex<Season>,
        match_id: &str,
        cancel: &CancelToken,
    ) -> Result<SyncOutcome<ReconcileSummary>, SyncError> {
        lock(store)?.get_match(match_id)?;

        let _guard = match self.try_begin(Some(match_id.to_string())) {
            Ok(guard) => guard,
            Err(reason) => {
                debug!("Sync for match {} skipped: {:?}", match_id, reason);
                return Ok(SyncOutcome::Skipped(reason));
            }
        };

        let sheet_matches = self.fetch_matches(store, cancel).await.map_err(|e| {
            warn!("Sync for match {} failed, keeping local data: {}", match_id, e);
            e
        })?;
        let sheet_match =
            sheet::find_match(&sheet_matches, match_id).ok_or_else(|| SyncError::MatchNotInSnapshot {
                match_id: match_id.to_string(),
            })?;

        let mut season = lock(store)?;
        let summary = reconcile_one(&mut season, sheet_match)?;
        Ok(SyncOutcome::Applied(summary))
    }

    /// One fetch, then every match row in the sheet that the season knows.
    pub async fn sync_all(
        &self,
        store: &Mutex<Season>,
        cancel: &CancelToken,
    ) -> Result<SyncOutcome<Vec<ReconcileSummary>>, SyncError> {
        let _guard = match self.try_begin(None) {
            Ok(guard) => guard,
            Err(reason) => {
                debug!("Full sync skipped: {:?}", reason);
                return Ok(SyncOutcome::Skipped(reason));
            }
        };

        let sheet_matches = self.fetch_matches(store, cancel).await.map_err(|e| {
            warn!("Full sync failed, keeping local data: {}", e);
            e
        })?;

        let mut season = lock(store)?;
        let mut summaries = Vec::new();
        for sheet_match in &sheet_matches {
            if season.get_match(&sheet_match.match_id).is_err() {
                warn!("Sheet row {} has unknown match id {}", sheet_match.row_index + 1, sheet_match.match_id);
                continue;
            }
            summaries.push(reconcile_one(&mut season, sheet_match)?);
        }
        info!("Full sync reconciled {} matches", summaries.len());
        Ok(SyncOutcome::Applied(summaries))
    }
}

fn reconcile_one(season: &mut Season, sheet_match: &SheetMatch) -> Result<ReconcileSummary, LeagueError> {
    let match_id = sheet_match.match_id.as_str();
    let plan = plan_reconcile(
        season.get_match(match_id)?,
        &sheet_match.rows,
        season.members(),
        season.assignments(match_id),
        season.fixed_member(),
    );
    season.apply_plan(plan)
}

// ---------------------------------------------------------------------------
// Write-back
// ---------------------------------------------------------------------------

/// Pushes cell writes to the sheet. Local state is updated before publishing
/// and is never rolled back when a write fails.
pub struct Publisher<W> {
    writer: Arc<W>,
    policy: RetryPolicy,
}

impl<W> Clone for Publisher<W> {
    fn clone(&self) -> Self {
        Publisher {
            writer: Arc::clone(&self.writer),
            policy: self.policy,
        }
    }
}

impl<W: SheetWriter + 'static> Publisher<W> {
    pub fn new(writer: W, policy: RetryPolicy) -> Self {
        Publisher {
            writer: Arc::new(writer),
            policy,
        }
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub async fn publish(
        &self,
        cells: &[CellWrite],
        cancel: &CancelToken,
    ) -> Result<BatchWriteReport, TransportError> {
        if cells.is_empty() {
            return Ok(BatchWriteReport::default());
        }
        let writer = &self.writer;
        let report = run_with_retry(&self.policy, cancel, "sheet write", || writer.write_cells(cells)).await?;
        for failed in report.failures() {
            warn!(
                "Cell {} was not written: {}",
                failed.cell,
                failed.error.as_deref().unwrap_or("unknown error")
            );
        }
        info!("Wrote {}/{} cells", report.success_count(), cells.len());
        Ok(report)
    }

    /// Publish in the background. The caller has already applied the change
    /// locally; a failure is logged and surfaced through the handle.
    pub fn spawn_publish(&self, cells: Vec<CellWrite>, cancel: CancelToken) -> PublishHandle {
        let publisher = self.clone();
        tokio::spawn(async move {
            let result = publisher.publish(&cells, &cancel).await;
            if let Err(e) = &result {
                error!("Background sheet write of {} cells failed: {}", cells.len(), e);
            }
            result
        })
    }

    /// Record a member's chits locally, then write the two position cells
    /// into the match row. The assignment stays even if the write fails.
    pub fn assign_and_publish(
        &self,
        store: &Mutex<Season>,
        layout: &SheetLayout,
        sheet_match: &SheetMatch,
        member_id: &str,
        chosen: &[Position],
        cancel: &CancelToken,
    ) -> Result<(Assignment, PublishHandle), SyncError> {
        let match_id = sheet_match.match_id.as_str();
        let (assignment, cells) = {
            let mut season = lock(store)?;
            let member_index = season
                .members()
                .iter()
                .position(|m| m.id == member_id)
                .ok_or_else(|| LeagueError::UnknownMember {
                    member_id: member_id.to_string(),
                })?;
            let assignment = season.assign(match_id, member_id, chosen)?.clone();
            // `assign` only accepts exactly two positions.
            let cells = match chosen {
                [first, second] => {
                    sheet::position_cells(layout, member_index, sheet_match.row_index, first, second)
                }
                _ => Vec::new(),
            };
            (assignment, cells)
        };
        info!(
            "Member {} assigned in match {}; publishing {} cells",
            member_id,
            match_id,
            cells.len()
        );
        Ok((assignment, self.spawn_publish(cells, cancel.clone())))
    }

    /// Store runs locally, then write them into the score cells of whoever
    /// holds each position in the sheet row. Positions nobody holds in the
    /// sheet are kept locally and skipped in the write.
    pub fn record_scores_and_publish(
        &self,
        store: &Mutex<Season>,
        layout: &SheetLayout,
        sheet_match: &SheetMatch,
        scores: &[(Position, u32)],
        cancel: &CancelToken,
    ) -> Result<(ScoreChanges, PublishHandle), SyncError> {
        let match_id = sheet_match.match_id.as_str();
        let changes = lock(store)?.set_scores(
            match_id,
            scores.iter().map(|(pos, runs)| (pos.clone(), Some(*runs))),
        )?;
        let plan = sheet::score_cells(layout, sheet_match, scores);
        debug!(
            "Match {} scores: {} to write, {} already in sheet, {} unheld",
            match_id,
            plan.writes.len(),
            plan.unchanged,
            plan.unheld.len()
        );
        Ok((changes, self.spawn_publish(plan.writes, cancel.clone())))
    }
}

// ---------------------------------------------------------------------------
// Status ticker
// ---------------------------------------------------------------------------

/// Recompute match statuses now and then every `period` until cancelled.
pub fn spawn_status_ticker<C>(
    store: SharedSeason,
    period: Duration,
    today: C,
    cancel: CancelToken,
) -> JoinHandle<()>
where
    C: Fn() -> NaiveDate + Send + 'static,
{
    tokio::spawn(async move {
        // The first tick completes immediately.
        let mut interval = tokio::time::interval(period);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let date = today();
                    let changed = match store.lock() {
                        Ok(mut season) => season.refresh_statuses(date),
                        Err(_) => {
                            error!("Season lock poisoned; status ticker stopping");
                            break;
                        }
                    };
                    if changed > 0 {
                        info!("{} match statuses changed on {}", changed, date);
                    }
                }
            }
        }
    })
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chitbook_core::{Match, MatchStatus, Member, Position, TeamCode};

    use crate::sheet::SheetGrid;
    use crate::transport::CellOutcome;

    // -- Test doubles -------------------------------------------------------

    /// Source that replays scripted responses, then repeats the last one.
    struct ScriptedSource {
        responses: Mutex<VecDeque<Result<SheetGrid, u16>>>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<SheetGrid, u16>>) -> Self {
            ScriptedSource {
                responses: Mutex::new(responses.into()),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
            }
        }

        fn slow(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SheetSource for ScriptedSource {
        async fn fetch_grid(&self) -> Result<SheetGrid, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = {
                let mut responses = self.responses.lock().unwrap();
                if responses.len() > 1 {
                    responses.pop_front().unwrap()
                } else {
                    responses.front().cloned().unwrap()
                }
            };
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            next.map_err(|status| TransportError::Status { status })
        }
    }

    struct FlakyWriter {
        failures_left: AtomicUsize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SheetWriter for FlakyWriter {
        async fn write_cells(&self, cells: &[CellWrite]) -> Result<BatchWriteReport, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let left = self.failures_left.load(Ordering::SeqCst);
            if left > 0 {
                self.failures_left.store(left - 1, Ordering::SeqCst);
                return Err(TransportError::Status { status: 502 });
            }
            let mut report = BatchWriteReport::all_ok(cells);
            if let Some(first) = report.outcomes.first_mut() {
                if first.cell == "Z99" {
                    *first = CellOutcome {
                        cell: first.cell.clone(),
                        ok: false,
                        error: Some("out of range".into()),
                    };
                }
            }
            Ok(report)
        }
    }

    // -- Fixtures -----------------------------------------------------------

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, m, d).unwrap()
    }

    fn season() -> Season {
        let members = vec![
            Member::new("2", "Ronak"),
            Member::new("7", "Tilak"),
            Member::new("8", "Rajesh"),
        ];
        let matches = vec![
            Match::league("1", day(3, 22), TeamCode::new("KKR").unwrap(), TeamCode::new("RCB").unwrap()),
            Match::league("2", day(3, 23), TeamCode::new("SRH").unwrap(), TeamCode::new("RR").unwrap()),
        ];
        Season::new(members, matches, "8").unwrap()
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn grid() -> SheetGrid {
        vec![
            row(&["IPL"]),
            row(&["#", "Date", "Match", "Time", "Venue", "Winner", "Amount"]),
            row(&[
                "1", "22-Mar", "KKR vs RCB", "", "", "", "210",
                "KKR1", "30", "RCB2", "50", "80",
                "KKR3", "40", "RCB4", "50", "90",
                "KKR8", "2", "RCB8", "5", "7",
            ]),
            row(&[
                "2", "23-Mar", "SRH vs RR", "", "", "", "210",
                "SRH2", "", "RR2", "", "",
            ]),
        ]
    }

    fn syncer(source: ScriptedSource) -> Syncer<ScriptedSource> {
        Syncer::new(source, SheetLayout::default(), RetryPolicy::default(), Duration::from_secs(5))
    }

    // -- Sync ---------------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn sync_match_applies_snapshot() {
        let store = Mutex::new(season());
        let syncer = syncer(ScriptedSource::new(vec![Ok(grid())]));

        let outcome = syncer.sync_match(&store, "1", &CancelToken::new()).await.unwrap();
        let summary = outcome.applied().expect("should apply");
        assert_eq!(summary.created, 2);
        assert_eq!(summary.scores_inserted, 6);

        let mut season = store.lock().unwrap();
        assert_eq!(season.assignments("1").len(), 3);
        // Match 2 untouched by a single-match sync.
        assert!(season.assignments("2").is_empty());

        season.override_status("1", Some(MatchStatus::Completed)).unwrap();
        let report = season.winners("1").unwrap();
        assert_eq!(report.winner_ids().collect::<Vec<_>>(), vec!["7"]);
    }

    #[tokio::test(start_paused = true)]
    async fn second_sync_within_throttle_is_skipped() {
        let store = Mutex::new(season());
        let syncer = syncer(ScriptedSource::new(vec![Ok(grid())]));
        let cancel = CancelToken::new();

        assert!(matches!(
            syncer.sync_match(&store, "1", &cancel).await.unwrap(),
            SyncOutcome::Applied(_)
        ));
        assert_eq!(
            syncer.sync_match(&store, "1", &cancel).await.unwrap(),
            SyncOutcome::Skipped(SkipReason::Throttled)
        );
        assert_eq!(syncer.source.calls(), 1);

        // A different match has its own throttle.
        assert!(matches!(
            syncer.sync_match(&store, "2", &cancel).await.unwrap(),
            SyncOutcome::Applied(_)
        ));

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(matches!(
            syncer.sync_match(&store, "1", &cancel).await.unwrap(),
            SyncOutcome::Applied(_)
        ));
        assert_eq!(syncer.source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_sync_for_same_match_is_in_flight() {
        let store = Mutex::new(season());
        let syncer = syncer(ScriptedSource::new(vec![Ok(grid())]).slow(Duration::from_secs(2)));
        let cancel = CancelToken::new();

        let (first, second) = tokio::join!(
            syncer.sync_match(&store, "1", &cancel),
            syncer.sync_match(&store, "1", &cancel),
        );
        assert!(matches!(first.unwrap(), SyncOutcome::Applied(_)));
        assert_eq!(second.unwrap(), SyncOutcome::Skipped(SkipReason::InFlight));
        assert_eq!(syncer.source.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failure_is_retried() {
        let store = Mutex::new(season());
        let syncer = syncer(ScriptedSource::new(vec![Err(503), Ok(grid())]));

        let outcome = syncer.sync_match(&store, "1", &CancelToken::new()).await.unwrap();
        assert!(matches!(outcome, SyncOutcome::Applied(_)));
        assert_eq!(syncer.source.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn timeouts_leave_local_state_alone() {
        let store = Mutex::new(season());
        let chosen = [Position::parse("KKR5").unwrap(), Position::parse("RCB5").unwrap()];
        store.lock().unwrap().assign("1", "2", &chosen).unwrap();
        let syncer = syncer(ScriptedSource::new(vec![Ok(grid())]).slow(Duration::from_secs(60)));

        let err = syncer.sync_match(&store, "1", &CancelToken::new()).await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(TransportError::Timeout(_))));
        assert_eq!(syncer.source.calls(), 2);
        assert_eq!(store.lock().unwrap().assignments("1").len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn guard_is_released_after_failure() {
        let store = Mutex::new(season());
        let syncer = syncer(ScriptedSource::new(vec![Err(404), Ok(grid())]));
        let cancel = CancelToken::new();

        assert!(syncer.sync_match(&store, "1", &cancel).await.is_err());
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(matches!(
            syncer.sync_match(&store, "1", &cancel).await.unwrap(),
            SyncOutcome::Applied(_)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_and_missing_matches() {
        let store = Mutex::new(season());
        let mut only_header = grid();
        only_header.truncate(3);
        let syncer = syncer(ScriptedSource::new(vec![Ok(only_header)]));
        let cancel = CancelToken::new();

        assert!(matches!(
            syncer.sync_match(&store, "99", &cancel).await,
            Err(SyncError::League(LeagueError::UnknownMatch { .. }))
        ));
        assert!(matches!(
            syncer.sync_match(&store, "2", &cancel).await,
            Err(SyncError::MatchNotInSnapshot { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn sync_all_reconciles_every_known_row() {
        let store = Mutex::new(season());
        let mut g = grid();
        g.push(row(&["500", "", "", "", "", "", ""]));
        let syncer = syncer(ScriptedSource::new(vec![Ok(g)]));

        let summaries = syncer
            .sync_all(&store, &CancelToken::new())
            .await
            .unwrap()
            .applied()
            .unwrap();
        let ids: Vec<_> = summaries.iter().map(|s| s.match_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);

        let season = store.lock().unwrap();
        assert_eq!(season.assignments("2").len(), 2);
    }

    // -- Publisher ----------------------------------------------------------

    fn cells(refs: &[&str]) -> Vec<CellWrite> {
        refs.iter()
            .map(|r| CellWrite {
                cell: r.to_string(),
                value: "1".into(),
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn publish_retries_once() {
        let publisher = Publisher::new(
            FlakyWriter {
                failures_left: AtomicUsize::new(1),
                calls: AtomicUsize::new(0),
            },
            RetryPolicy::default(),
        );
        let report = publisher
            .publish(&cells(&["I3", "K3"]), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(report.success_count(), 2);
        assert_eq!(publisher.writer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn publish_reports_per_cell_failures() {
        let publisher = Publisher::new(
            FlakyWriter {
                failures_left: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            },
            RetryPolicy::default(),
        );
        let report = publisher
            .publish(&cells(&["Z99", "K3"]), &CancelToken::new())
            .await
            .unwrap();
        assert_eq!(report.success_count(), 1);

        let empty = publisher.publish(&[], &CancelToken::new()).await.unwrap();
        assert!(empty.outcomes.is_empty());
        assert_eq!(publisher.writer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_publish_surfaces_failure() {
        let publisher = Publisher::new(
            FlakyWriter {
                failures_left: AtomicUsize::new(5),
                calls: AtomicUsize::new(0),
            },
            RetryPolicy::default(),
        );
        let handle = publisher.spawn_publish(cells(&["I3"]), CancelToken::new());
        let result = handle.await.unwrap();
        assert!(matches!(result, Err(TransportError::Status { status: 502 })));
        assert_eq!(publisher.writer.calls.load(Ordering::SeqCst), 2);
    }

    // -- Local edits --------------------------------------------------------

    fn writer(failures: usize) -> FlakyWriter {
        FlakyWriter {
            failures_left: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        }
    }

    fn sheet_match(store: &Mutex<Season>, match_id: &str) -> SheetMatch {
        let season = store.lock().unwrap();
        let matches = sheet::parse_grid(&grid(), &SheetLayout::default(), season.members());
        sheet::find_match(&matches, match_id).unwrap().clone()
    }

    fn written(report: &BatchWriteReport) -> Vec<&str> {
        report.outcomes.iter().map(|o| o.cell.as_str()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn failed_assignment_write_keeps_local_chits() {
        let store = Mutex::new(season());
        let publisher = Publisher::new(writer(5), RetryPolicy::default());
        let target = sheet_match(&store, "2");
        let chosen = [Position::parse("SRH3").unwrap(), Position::parse("RR3").unwrap()];

        let (assignment, handle) = publisher
            .assign_and_publish(&store, &SheetLayout::default(), &target, "7", &chosen, &CancelToken::new())
            .unwrap();
        assert_eq!(assignment.member_id, "7");

        let result = handle.await.unwrap();
        assert!(matches!(result, Err(TransportError::Status { status: 502 })));
        assert_eq!(store.lock().unwrap().assignments("2"), &[assignment][..]);
    }

    #[tokio::test(start_paused = true)]
    async fn assignment_writes_member_position_cells() {
        let store = Mutex::new(season());
        let publisher = Publisher::new(writer(0), RetryPolicy::default());
        let target = sheet_match(&store, "2");
        let chosen = [Position::parse("SRH3").unwrap(), Position::parse("RR3").unwrap()];

        let (_, handle) = publisher
            .assign_and_publish(&store, &SheetLayout::default(), &target, "7", &chosen, &CancelToken::new())
            .unwrap();
        let report = handle.await.unwrap().unwrap();
        // Tilak is the second member; match 2 is sheet row 4.
        assert_eq!(written(&report), vec!["M4", "O4"]);
    }

    #[tokio::test(start_paused = true)]
    async fn rejected_assignment_writes_nothing() {
        let store = Mutex::new(season());
        let publisher = Publisher::new(writer(0), RetryPolicy::default());
        let target = sheet_match(&store, "2");
        let wrong_team = [Position::parse("KKR3").unwrap(), Position::parse("RR3").unwrap()];
        let cancel = CancelToken::new();

        let err = publisher
            .assign_and_publish(&store, &SheetLayout::default(), &target, "7", &wrong_team, &cancel)
            .unwrap_err();
        assert!(matches!(err, SyncError::Season(SeasonError::Validation(_))));

        let stranger = [Position::parse("SRH3").unwrap(), Position::parse("RR3").unwrap()];
        let err = publisher
            .assign_and_publish(&store, &SheetLayout::default(), &target, "42", &stranger, &cancel)
            .unwrap_err();
        assert!(matches!(err, SyncError::League(LeagueError::UnknownMember { .. })));

        assert!(store.lock().unwrap().assignments("2").is_empty());
        assert_eq!(publisher.writer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn scores_write_to_holder_cells() {
        let store = Mutex::new(season());
        let publisher = Publisher::new(writer(0), RetryPolicy::default());
        let target = sheet_match(&store, "1");
        let scores = [
            (Position::parse("KKR1").unwrap(), 30),
            (Position::parse("RCB4").unwrap(), 61),
            (Position::parse("KKR6").unwrap(), 4),
        ];

        let (changes, handle) = publisher
            .record_scores_and_publish(&store, &SheetLayout::default(), &target, &scores, &CancelToken::new())
            .unwrap();
        assert_eq!(changes.inserted, 3);

        // KKR1 already reads 30 in the sheet and nobody holds KKR6 there.
        let report = handle.await.unwrap().unwrap();
        assert_eq!(written(&report), vec!["P3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_score_write_keeps_local_runs() {
        let store = Mutex::new(season());
        let publisher = Publisher::new(writer(5), RetryPolicy::default());
        let target = sheet_match(&store, "1");
        let rcb4 = Position::parse("RCB4").unwrap();

        let (_, handle) = publisher
            .record_scores_and_publish(
                &store,
                &SheetLayout::default(),
                &target,
                &[(rcb4.clone(), 61)],
                &CancelToken::new(),
            )
            .unwrap();
        assert!(handle.await.unwrap().is_err());
        assert_eq!(store.lock().unwrap().scores("1").unwrap().get(&rcb4), Some(61));
    }

    // -- Status ticker ------------------------------------------------------

    #[tokio::test(start_paused = true)]
    async fn ticker_refreshes_immediately_and_stops_on_cancel() {
        let store: SharedSeason = Arc::new(Mutex::new(season()));
        let cancel = CancelToken::new();
        let handle = spawn_status_ticker(
            Arc::clone(&store),
            Duration::from_secs(3600),
            || day(3, 23),
            cancel.clone(),
        );

        tokio::time::sleep(Duration::from_millis(10)).await;
        {
            let season = store.lock().unwrap();
            assert!(season.get_match("1").unwrap().is_completed());
            assert!(!season.get_match("2").unwrap().is_completed());
        }

        cancel.cancel();
        handle.await.unwrap();
    }
}
