// Spreadsheet layout: turning a fetched grid into per-match snapshot rows,
// and turning local changes back into cell writes.
//
// Layout (0-based columns):
//   0 match id, 1 date, 2 details, 3 time, 4 venue, 5 winner, 6 amount
//   then 5 columns per member, in roster order:
//   pos1, pos1 score, pos2, pos2 score, total

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use chitbook_core::{Member, Position, SnapshotRow};

/// Raw cell values, row-major. Rows may have different lengths.
pub type SheetGrid = Vec<Vec<String>>;

/// Where things live in the sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLayout {
    /// Rows at the top of the grid that hold headers, not matches.
    #[serde(default = "default_header_rows")]
    pub header_rows: usize,
    /// Column of the first member's first position.
    #[serde(default = "default_first_member_column")]
    pub first_member_column: usize,
    /// Columns occupied by each member.
    #[serde(default = "default_columns_per_member")]
    pub columns_per_member: usize,
}

fn default_header_rows() -> usize {
    2
}

fn default_first_member_column() -> usize {
    7
}

fn default_columns_per_member() -> usize {
    5
}

impl Default for SheetLayout {
    fn default() -> Self {
        SheetLayout {
            header_rows: default_header_rows(),
            first_member_column: default_first_member_column(),
            columns_per_member: default_columns_per_member(),
        }
    }
}

/// Offsets within a member's block of columns.
const POS1: usize = 0;
const POS1_SCORE: usize = 1;
const POS2: usize = 2;
const POS2_SCORE: usize = 3;
const TOTAL: usize = 4;

impl SheetLayout {
    pub fn member_column(&self, member_index: usize, offset: usize) -> usize {
        self.first_member_column + member_index * self.columns_per_member + offset
    }

    fn score_column(&self, member_index: usize, slot: Slot) -> usize {
        match slot {
            Slot::First => self.member_column(member_index, POS1_SCORE),
            Slot::Second => self.member_column(member_index, POS2_SCORE),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    First,
    Second,
}

/// One cell to write, by A1 reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellWrite {
    pub cell: String,
    pub value: String,
}

/// One match row of the sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetMatch {
    /// 0-based index into the grid. The sheet row number is one more.
    pub row_index: usize,
    pub match_id: String,
    pub date: String,
    pub details: String,
    pub time: String,
    pub venue: String,
    pub winner: String,
    pub amount: String,
    /// One entry per roster member, in roster order.
    pub rows: Vec<SnapshotRow>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a score cell. Blank and `-` mean "not entered"; otherwise the
/// leading integer is used (`"42*"` is 42). Negative or non-numeric values
/// are treated as not entered.
pub fn parse_score(cell: &str) -> Option<u32> {
    let cell = cell.trim();
    if cell.is_empty() || cell == "-" {
        return None;
    }
    let digits = cell.strip_prefix('+').unwrap_or(cell);
    if digits.starts_with('-') {
        return None;
    }
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    digits[..end].parse().ok()
}

fn cell(row: &[String], col: usize) -> &str {
    row.get(col).map(String::as_str).unwrap_or("")
}

fn non_blank(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Split a grid into match rows. Header rows and rows too short to carry the
/// match columns are skipped.
pub fn parse_grid(grid: &[Vec<String>], layout: &SheetLayout, members: &[Member]) -> Vec<SheetMatch> {
    let mut matches = Vec::new();

    for (row_index, row) in grid.iter().enumerate().skip(layout.header_rows) {
        if row.len() < layout.first_member_column {
            debug!("Skipping short sheet row {} ({} cells)", row_index + 1, row.len());
            continue;
        }
        let match_id = cell(row, 0).trim();
        if match_id.is_empty() {
            continue;
        }

        let rows = members
            .iter()
            .enumerate()
            .map(|(i, member)| SnapshotRow {
                member_name: member.name.clone(),
                pos1: non_blank(cell(row, layout.member_column(i, POS1))),
                pos1_score: parse_score(cell(row, layout.member_column(i, POS1_SCORE))),
                pos2: non_blank(cell(row, layout.member_column(i, POS2))),
                pos2_score: parse_score(cell(row, layout.member_column(i, POS2_SCORE))),
                sheet_total: parse_score(cell(row, layout.member_column(i, TOTAL))),
            })
            .collect();

        matches.push(SheetMatch {
            row_index,
            match_id: match_id.to_string(),
            date: cell(row, 1).trim().to_string(),
            details: cell(row, 2).trim().to_string(),
            time: cell(row, 3).trim().to_string(),
            venue: cell(row, 4).trim().to_string(),
            winner: cell(row, 5).trim().to_string(),
            amount: cell(row, 6).trim().to_string(),
            rows,
        });
    }

    matches
}

pub fn find_match<'a>(matches: &'a [SheetMatch], match_id: &str) -> Option<&'a SheetMatch> {
    matches.iter().find(|m| m.match_id == match_id)
}

// ---------------------------------------------------------------------------
// Cell references
// ---------------------------------------------------------------------------

/// Spreadsheet column letters for a 0-based index: 0 -> `A`, 25 -> `Z`,
/// 26 -> `AA`.
pub fn column_letter(index: usize) -> String {
    let mut n = index + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(b'A' + rem as u8);
        n = (n - 1) / 26;
    }
    letters.iter().rev().map(|&b| char::from(b)).collect()
}

/// A1 reference for a 0-based column and 0-based grid row.
pub fn cell_ref(column: usize, row_index: usize) -> String {
    format!("{}{}", column_letter(column), row_index + 1)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Cells that record a member's two positions in a match row.
pub fn position_cells(
    layout: &SheetLayout,
    member_index: usize,
    row_index: usize,
    first: &Position,
    second: &Position,
) -> Vec<CellWrite> {
    vec![
        CellWrite {
            cell: cell_ref(layout.member_column(member_index, POS1), row_index),
            value: first.code(),
        },
        CellWrite {
            cell: cell_ref(layout.member_column(member_index, POS2), row_index),
            value: second.code(),
        },
    ]
}

/// Score writes for one match, resolved against the positions the sheet
/// currently shows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScoreCellPlan {
    pub writes: Vec<CellWrite>,
    /// Positions that no member holds in the sheet row.
    pub unheld: Vec<Position>,
    /// Updates skipped because the sheet already has that value.
    pub unchanged: usize,
}

/// Map runs for positions onto the score cells of whoever holds them.
pub fn score_cells(
    layout: &SheetLayout,
    sheet_match: &SheetMatch,
    updates: &[(Position, u32)],
) -> ScoreCellPlan {
    let mut holders: HashMap<Position, (usize, Slot, Option<u32>)> = HashMap::new();
    for (i, row) in sheet_match.rows.iter().enumerate() {
        let slots = [
            (row.pos1.as_deref(), Slot::First, row.pos1_score),
            (row.pos2.as_deref(), Slot::Second, row.pos2_score),
        ];
        for (code, slot, current) in slots {
            if let Some(pos) = code.and_then(|c| Position::parse(c).ok()) {
                holders.entry(pos).or_insert((i, slot, current));
            }
        }
    }

    let mut plan = ScoreCellPlan::default();
    for (pos, runs) in updates {
        let Some(&(member_index, slot, current)) = holders.get(pos) else {
            warn!("No member holds {} in match {}", pos, sheet_match.match_id);
            plan.unheld.push(pos.clone());
            continue;
        };
        if current == Some(*runs) {
            plan.unchanged += 1;
            continue;
        }
        plan.writes.push(CellWrite {
            cell: cell_ref(layout.score_column(member_index, slot), sheet_match.row_index),
            value: runs.to_string(),
        });
    }
    plan
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> Vec<Member> {
        vec![Member::new("1", "Ronak"), Member::new("2", "Tilak")]
    }

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|s| s.to_string()).collect()
    }

    fn grid() -> SheetGrid {
        vec![
            row(&["IPL 2025"]),
            row(&["#", "Date", "Match", "Time", "Venue", "Winner", "Amount", "Ronak"]),
            row(&[
                "1", "22-Mar", "KKR vs RCB", "7:30 PM", "Kolkata", "Tilak", "210",
                "KKR1", "30", "RCB2", "50", "80",
                "KKR3", "-", "RCB4", "0", "0",
            ]),
            row(&["2", "23-Mar"]),
            row(&["3", "23-Mar", "SRH vs RR", "3:30 PM", "Hyderabad", "", ""]),
        ]
    }

    #[test]
    fn score_cells_parse_like_sheet_values() {
        assert_eq!(parse_score(""), None);
        assert_eq!(parse_score("  -  "), None);
        assert_eq!(parse_score("0"), Some(0));
        assert_eq!(parse_score(" 42 "), Some(42));
        assert_eq!(parse_score("42*"), Some(42));
        assert_eq!(parse_score("+7"), Some(7));
        assert_eq!(parse_score("-5"), None);
        assert_eq!(parse_score("DNB"), None);
    }

    #[test]
    fn parse_grid_skips_headers_and_short_rows() {
        let matches = parse_grid(&grid(), &SheetLayout::default(), &members());
        let ids: Vec<_> = matches.iter().map(|m| m.match_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        let first = &matches[0];
        assert_eq!(first.row_index, 2);
        assert_eq!(first.details, "KKR vs RCB");
        assert_eq!(first.rows.len(), 2);
        assert_eq!(first.rows[0].member_name, "Ronak");
        assert_eq!(first.rows[0].pos1.as_deref(), Some("KKR1"));
        assert_eq!(first.rows[0].sheet_total, Some(80));
        assert_eq!(first.rows[1].pos1_score, None);
        assert_eq!(first.rows[1].pos2_score, Some(0));

        // Row 3 has no member cells at all.
        assert!(matches[1].rows.iter().all(|r| r.pos1.is_none() && r.pos2.is_none()));
    }

    #[test]
    fn column_letters() {
        assert_eq!(column_letter(0), "A");
        assert_eq!(column_letter(25), "Z");
        assert_eq!(column_letter(26), "AA");
        assert_eq!(column_letter(45), "AT");
        assert_eq!(column_letter(701), "ZZ");
        assert_eq!(column_letter(702), "AAA");
    }

    #[test]
    fn member_columns_follow_layout() {
        let layout = SheetLayout::default();
        // Ronak's scores in I and K, Tilak's in N and P.
        assert_eq!(column_letter(layout.member_column(0, POS1_SCORE)), "I");
        assert_eq!(column_letter(layout.member_column(0, POS2_SCORE)), "K");
        assert_eq!(column_letter(layout.member_column(1, POS1_SCORE)), "N");
        assert_eq!(column_letter(layout.member_column(1, POS2_SCORE)), "P");
        // Eighth member's second score and total.
        assert_eq!(column_letter(layout.member_column(7, POS2_SCORE)), "AT");
        assert_eq!(column_letter(layout.member_column(7, TOTAL)), "AU");
    }

    #[test]
    fn position_cells_use_sheet_row_numbers() {
        let writes = position_cells(
            &SheetLayout::default(),
            1,
            2,
            &Position::parse("KKR3").unwrap(),
            &Position::parse("RCB4").unwrap(),
        );
        assert_eq!(
            writes,
            vec![
                CellWrite {
                    cell: "M3".into(),
                    value: "KKR3".into()
                },
                CellWrite {
                    cell: "O3".into(),
                    value: "RCB4".into()
                },
            ]
        );
    }

    #[test]
    fn score_cells_skip_unchanged_and_report_unheld() {
        let layout = SheetLayout::default();
        let matches = parse_grid(&grid(), &layout, &members());
        let updates = vec![
            (Position::parse("KKR1").unwrap(), 30),
            (Position::parse("RCB2").unwrap(), 55),
            (Position::parse("KKR3").unwrap(), 12),
            (Position::parse("KKR6").unwrap(), 1),
        ];
        let plan = score_cells(&layout, &matches[0], &updates);
        assert_eq!(plan.unchanged, 1);
        assert_eq!(plan.unheld, vec![Position::parse("KKR6").unwrap()]);
        assert_eq!(
            plan.writes,
            vec![
                CellWrite {
                    cell: "K3".into(),
                    value: "55".into()
                },
                CellWrite {
                    cell: "N3".into(),
                    value: "12".into()
                },
            ]
        );
    }
}
