use crate::error::SyncError;
use crate::ledger::config::IndexConfig;
use crate::ledger::dates::DatePoints;
use chrono::{Datelike, NaiveDate};

const TABLE_HEADER: &str = "| 日 | 月 | 火 | 水 | 木 | 金 | 土 |";
const TABLE_ALIGN: &str = "|:--:|:--:|:--:|:--:|:--:|:--:|:--:|";

/// Separator between short-title references inside a day cell.
const REF_SEPARATOR: &str = "<br>・";

/// One cell of a month grid. `Raw` preserves hand-edited content the
/// parser cannot interpret; such cells are re-rendered byte-identical
/// and never patched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DayCell {
    Empty,
    Plain(u32),
    Linked {
        day: u32,
        link: String,
        refs: Vec<String>,
    },
    Raw(String),
}

impl DayCell {
    fn day(&self) -> Option<u32> {
        match self {
            Self::Plain(day) | Self::Linked { day, .. } => Some(*day),
            Self::Empty | Self::Raw(_) => None,
        }
    }

    fn render(&self) -> String {
        match self {
            Self::Empty => "  ".to_string(),
            Self::Plain(day) => format!(" {day} "),
            Self::Linked { day, link, refs } => {
                let mut out = format!(" [{day}]({link})");
                for reference in refs {
                    out.push_str(REF_SEPARATOR);
                    out.push_str(reference);
                }
                out.push(' ');
                out
            }
            Self::Raw(raw) => raw.clone(),
        }
    }
}

/// Parse one cell. Returns `Raw` when the content matches neither the
/// canonical grammar nor the legacy day-inside-link-text form.
fn parse_cell(raw: &str) -> DayCell {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return DayCell::Empty;
    }
    if let Ok(day) = trimmed.parse::<u32>() {
        return DayCell::Plain(day);
    }
    if trimmed.starts_with('[') {
        if let Some(cell) = parse_linked_cell(trimmed) {
            return cell;
        }
    }
    DayCell::Raw(raw.to_string())
}

fn parse_linked_cell(trimmed: &str) -> Option<DayCell> {
    let close = trimmed.find("](")?;
    let text = &trimmed[1..close];
    let rest = &trimmed[close + 2..];
    let link_end = rest.find(')')?;
    let link = &rest[..link_end];
    let tail = &rest[link_end + 1..];

    let refs: Vec<String> = if tail.is_empty() {
        Vec::new()
    } else {
        tail.strip_prefix(REF_SEPARATOR)?
            .split(REF_SEPARATOR)
            .map(str::to_string)
            .collect()
    };

    // Canonical cells carry the bare day number as link text. Legacy
    // cells embedded extra text after the number; the number is kept
    // and the extra text dropped on the next write.
    if let Ok(day) = text.parse::<u32>() {
        return Some(DayCell::Linked {
            day,
            link: link.to_string(),
            refs,
        });
    }
    let digits: String = text.chars().take_while(char::is_ascii_digit).collect();
    let day = digits.parse::<u32>().ok()?;
    Some(DayCell::Linked {
        day,
        link: link.to_string(),
        refs,
    })
}

/// One month grid: the fixed weekday header, the alignment row, and the
/// data rows of seven cells each.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthTable {
    pub rows: Vec<Vec<DayCell>>,
}

impl MonthTable {
    /// Build the blank grid for a month: leading cells empty up to the
    /// weekday of day 1, trailing cells padded to a full week.
    pub fn generate(year: i32, month: u32) -> Self {
        let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid month");
        let leading = first.weekday().num_days_from_sunday() as usize;
        let last_day = days_in_month(year, month);

        let mut rows = Vec::new();
        let mut row: Vec<DayCell> = vec![DayCell::Empty; leading];
        for day in 1..=last_day {
            row.push(DayCell::Plain(day));
            if row.len() == 7 {
                rows.push(row);
                row = Vec::new();
            }
        }
        if !row.is_empty() {
            row.resize(7, DayCell::Empty);
            rows.push(row);
        }
        Self { rows }
    }

    pub fn parse(lines: &[&str]) -> Option<Self> {
        // header + alignment + at least one data row
        if lines.len() < 3 || lines[0] != TABLE_HEADER || lines[1] != TABLE_ALIGN {
            return None;
        }
        let mut rows = Vec::new();
        for line in &lines[2..] {
            let trimmed = line.strip_prefix('|')?.strip_suffix('|')?;
            let cells: Vec<DayCell> = trimmed.split('|').map(parse_cell).collect();
            if cells.len() != 7 {
                return None;
            }
            rows.push(cells);
        }
        Some(Self { rows })
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(TABLE_HEADER);
        out.push('\n');
        out.push_str(TABLE_ALIGN);
        for row in &self.rows {
            out.push('\n');
            out.push('|');
            for cell in row {
                out.push_str(&cell.render());
                out.push('|');
            }
        }
        out
    }

    fn cell_mut(&mut self, day: u32) -> Option<&mut DayCell> {
        self.rows
            .iter_mut()
            .flatten()
            .find(|cell| cell.day() == Some(day))
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.expect("valid month")
        .pred_opt()
        .expect("not the epoch floor")
        .day()
}

/// Grid text for display and for first-time insertion into an index.
pub fn generate_grid_text(year: i32, month: u32) -> String {
    MonthTable::generate(year, month).render()
}

/// Skeleton for an index document that has never been written: a title
/// line, plus the aggregator heading when the index nests its month
/// tables under one.
pub fn empty_index_document(index: &IndexConfig) -> String {
    match &index.aggregator {
        Some(heading) => format!("# メディアログ\n\n{heading}\n\n"),
        None => "# 視聴カレンダー\n\n".to_string(),
    }
}

/// Outcome of patching one index document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellPatch {
    Updated(String),
    Unchanged,
    /// The expected structure was absent; the document is left alone
    /// and the caller reports a warning.
    Skipped(&'static str),
}

fn month_heading(index: &IndexConfig, year: i32, month: u32) -> String {
    let level = if index.aggregator.is_some() { "###" } else { "##" };
    format!("{level} {year}年{month}月")
}

fn day_link(index: &IndexConfig, points: &DatePoints) -> String {
    format!(
        "{}{}-{:02}.md#{}",
        index.link_prefix, points.year, points.month, points.anchor
    )
}

/// Byte offset of the start of `line` appearing as a whole line.
fn find_line_start(doc: &str, line: &str) -> Option<usize> {
    for (idx, _) in doc.match_indices(line) {
        let at_start = idx == 0 || doc.as_bytes()[idx - 1] == b'\n';
        let end = idx + line.len();
        let at_end = end == doc.len() || doc.as_bytes()[end] == b'\n';
        if at_start && at_end {
            return Some(idx);
        }
    }
    None
}

/// Locate the table belonging to the heading at `heading_start`:
/// the run of `|`-prefixed lines after the blank lines that follow the
/// heading. Returns the byte span of the table text, newlines between
/// rows included, trailing newline excluded.
fn table_span(doc: &str, heading_start: usize) -> Option<(usize, usize)> {
    let after_heading = doc[heading_start..]
        .find('\n')
        .map(|p| heading_start + p + 1)?;
    let mut cursor = after_heading;
    while doc[cursor..].starts_with('\n') {
        cursor += 1;
    }
    if !doc[cursor..].starts_with('|') {
        return None;
    }
    let start = cursor;
    let mut end = start;
    for line in doc[start..].split_inclusive('\n') {
        if !line.starts_with('|') {
            break;
        }
        end += line.len();
    }
    // exclude the final row's newline so the splice point stays stable
    if doc[..end].ends_with('\n') {
        end -= 1;
    }
    Some((start, end))
}

/// Where a freshly generated month section goes: right after the
/// document title block, or right after the aggregator heading block
/// when one is configured.
fn section_insert_point(doc: &str, index: &IndexConfig) -> Result<usize, &'static str> {
    let from = match &index.aggregator {
        Some(heading) => find_line_start(doc, heading).ok_or("aggregator heading missing")?,
        None => 0,
    };
    match doc[from..].find("\n\n") {
        Some(pos) => Ok(from + pos + 2),
        None => Err("no insertion point after heading"),
    }
}

fn render_new_section(index: &IndexConfig, year: i32, month: u32) -> String {
    let heading = month_heading(index, year, month);
    let table = generate_grid_text(year, month);
    if index.aggregator.is_some() {
        format!("{heading}\n\n{table}\n\n")
    } else {
        format!("{heading}\n\n{table}\n\n---\n\n")
    }
}

fn load_table(
    doc: &str,
    path: &str,
    start: usize,
    end: usize,
) -> Result<MonthTable, SyncError> {
    let lines: Vec<&str> = doc[start..end].lines().collect();
    MonthTable::parse(&lines)
        .ok_or_else(|| SyncError::invalid_document(path, "month table does not parse"))
}

/// Add `short_title` to the cell for the target day, generating the
/// month section first when the index has never seen this month.
/// Inserting the same reference twice leaves the document unchanged.
pub fn insert_reference(
    doc: &str,
    path: &str,
    index: &IndexConfig,
    points: &DatePoints,
    short_title: &str,
) -> Result<CellPatch, SyncError> {
    let heading = month_heading(index, points.year, points.month);
    let link = day_link(index, points);

    let mut doc = doc.to_string();
    let heading_start = match find_line_start(&doc, &heading) {
        Some(start) => start,
        None => {
            let at = match section_insert_point(&doc, index) {
                Ok(at) => at,
                Err(reason) => return Ok(CellPatch::Skipped(reason)),
            };
            let section = render_new_section(index, points.year, points.month);
            doc.insert_str(at, &section);
            find_line_start(&doc, &heading).expect("section just inserted")
        }
    };

    let Some((start, end)) = table_span(&doc, heading_start) else {
        return Ok(CellPatch::Skipped("month heading has no table"));
    };
    let mut table = load_table(&doc, path, start, end)?;

    let Some(cell) = table.cell_mut(points.day) else {
        return Ok(CellPatch::Skipped("day cell missing from month table"));
    };
    match cell {
        DayCell::Plain(day) => {
            let day = *day;
            *cell = DayCell::Linked {
                day,
                link,
                refs: vec![short_title.to_string()],
            };
        }
        DayCell::Linked { link: have, refs, .. } => {
            if *have != link {
                return Ok(CellPatch::Skipped("day cell links elsewhere"));
            }
            if refs.iter().any(|r| r == short_title) {
                return Ok(CellPatch::Unchanged);
            }
            refs.push(short_title.to_string());
        }
        DayCell::Empty | DayCell::Raw(_) => {
            return Ok(CellPatch::Skipped("day cell missing from month table"));
        }
    }

    doc.replace_range(start..end, &table.render());
    Ok(CellPatch::Updated(doc))
}

/// Remove `short_title` from the day cell; a cell left without
/// references collapses back to a plain day number. Absent month,
/// absent cell, or absent reference are all no-ops.
pub fn remove_reference(
    doc: &str,
    path: &str,
    index: &IndexConfig,
    points: &DatePoints,
    short_title: &str,
) -> Result<CellPatch, SyncError> {
    let heading = month_heading(index, points.year, points.month);
    let link = day_link(index, points);

    let Some(heading_start) = find_line_start(doc, &heading) else {
        return Ok(CellPatch::Unchanged);
    };
    let Some((start, end)) = table_span(doc, heading_start) else {
        return Ok(CellPatch::Unchanged);
    };
    let mut table = load_table(doc, path, start, end)?;

    let Some(cell) = table.cell_mut(points.day) else {
        return Ok(CellPatch::Unchanged);
    };
    let stripped = match cell {
        DayCell::Linked { refs, .. } => match refs.iter().position(|r| r == short_title) {
            Some(at) => {
                refs.remove(at);
                true
            }
            None => false,
        },
        _ => false,
    };
    if !stripped {
        return Ok(CellPatch::Unchanged);
    }
    // collapse only cells that still point at our month log; a
    // hand-retargeted link is not ours to delete
    if let DayCell::Linked { day, link: have, refs } = cell
        && refs.is_empty()
        && *have == link
    {
        let day = *day;
        *cell = DayCell::Plain(day);
    }

    let mut doc = doc.to_string();
    doc.replace_range(start..end, &table.render());
    Ok(CellPatch::Updated(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::dates;

    fn local_index() -> IndexConfig {
        IndexConfig {
            path: "logs/README.md".to_string(),
            link_prefix: String::new(),
            aggregator: None,
        }
    }

    fn global_index() -> IndexConfig {
        IndexConfig {
            path: "README.md".to_string(),
            link_prefix: "logs/".to_string(),
            aggregator: Some("## 聴取カレンダー".to_string()),
        }
    }

    fn march_5() -> DatePoints {
        dates::derive(
            "logs",
            NaiveDate::from_ymd_opt(2024, 3, 5).expect("valid date"),
        )
    }

    #[test]
    fn march_2024_grid_shape() {
        let table = MonthTable::generate(2024, 3);
        // March 2024 starts on a Friday
        let leading = table.rows[0]
            .iter()
            .take_while(|c| **c == DayCell::Empty)
            .count();
        assert_eq!(leading, 5);
        for row in &table.rows {
            assert_eq!(row.len(), 7);
        }
        let last_row = table.rows.last().expect("rows");
        assert_eq!(last_row[0], DayCell::Plain(31));
        assert!(last_row[1..].iter().all(|c| *c == DayCell::Empty));
    }

    #[test]
    fn grid_text_round_trips_through_the_parser() {
        let text = generate_grid_text(2024, 3);
        let lines: Vec<&str> = text.lines().collect();
        let table = MonthTable::parse(&lines).expect("parse");
        assert_eq!(table.render(), text);
    }

    #[test]
    fn insert_generates_month_section_after_title() {
        let doc = "# メディアログ\n\nnotes\n";
        let patch = insert_reference(doc, "logs/README.md", &local_index(), &march_5(), "Test Episode")
            .expect("patch");
        let CellPatch::Updated(updated) = patch else {
            panic!("expected update, got {patch:?}");
        };
        assert!(updated.starts_with("# メディアログ\n\n## 2024年3月\n\n| 日 |"));
        assert!(updated.contains(" [5](2024-03.md#35)<br>・Test Episode |"));
        assert!(updated.contains("\n\n---\n\nnotes\n"));
    }

    #[test]
    fn insert_nests_under_aggregator_heading() {
        let doc = "# メディアログ\n\n## 聴取カレンダー\n\n## 週間スケジュール\n\n| 曜日 | 番組 |\n";
        let patch = insert_reference(doc, "README.md", &global_index(), &march_5(), "Test Episode")
            .expect("patch");
        let CellPatch::Updated(updated) = patch else {
            panic!("expected update, got {patch:?}");
        };
        let aggregator = updated.find("## 聴取カレンダー").expect("aggregator");
        let month = updated.find("### 2024年3月").expect("month heading");
        let schedule = updated.find("## 週間スケジュール").expect("schedule");
        assert!(aggregator < month && month < schedule);
        assert!(updated.contains(" [5](logs/2024-03.md#35)<br>・Test Episode |"));
    }

    #[test]
    fn insert_skips_when_aggregator_is_missing() {
        let doc = "# メディアログ\n\nnothing else\n";
        let patch = insert_reference(doc, "README.md", &global_index(), &march_5(), "Test Episode")
            .expect("patch");
        assert_eq!(patch, CellPatch::Skipped("aggregator heading missing"));
    }

    #[test]
    fn insert_is_idempotent_per_reference() {
        let doc = "# メディアログ\n\nnotes\n";
        let index = local_index();
        let CellPatch::Updated(once) =
            insert_reference(doc, "logs/README.md", &index, &march_5(), "Test Episode")
                .expect("first")
        else {
            panic!("expected update");
        };
        let again = insert_reference(&once, "logs/README.md", &index, &march_5(), "Test Episode")
            .expect("second");
        assert_eq!(again, CellPatch::Unchanged);
    }

    #[test]
    fn second_reference_appends_after_the_first() {
        let doc = "# メディアログ\n\nnotes\n";
        let index = local_index();
        let CellPatch::Updated(once) =
            insert_reference(doc, "logs/README.md", &index, &march_5(), "Test Episode")
                .expect("first")
        else {
            panic!("expected update");
        };
        let CellPatch::Updated(twice) =
            insert_reference(&once, "logs/README.md", &index, &march_5(), "Other")
                .expect("second")
        else {
            panic!("expected update");
        };
        assert!(twice.contains(" [5](2024-03.md#35)<br>・Test Episode<br>・Other |"));
    }

    #[test]
    fn legacy_cell_normalizes_on_insert() {
        let doc = "# メディアログ\n\n## 2024年3月\n\n\
            | 日 | 月 | 火 | 水 | 木 | 金 | 土 |\n\
            |:--:|:--:|:--:|:--:|:--:|:--:|:--:|\n\
            |  |  |  |  |  | 1 | 2 |\n\
            | 3 | 4 | [5 📻](2024-03.md#35)<br>・Old Show | 6 | 7 | 8 | 9 |\n\n---\n\n";
        let CellPatch::Updated(updated) =
            insert_reference(doc, "logs/README.md", &local_index(), &march_5(), "Test Episode")
                .expect("patch")
        else {
            panic!("expected update");
        };
        assert!(updated.contains(" [5](2024-03.md#35)<br>・Old Show<br>・Test Episode |"));
        assert!(!updated.contains("[5 📻]"));
    }

    #[test]
    fn remove_leaves_other_references_and_the_link() {
        let doc = "# メディアログ\n\nnotes\n";
        let index = local_index();
        let CellPatch::Updated(one) =
            insert_reference(doc, "logs/README.md", &index, &march_5(), "Test Episode")
                .expect("first")
        else {
            panic!("expected update");
        };
        let CellPatch::Updated(two) =
            insert_reference(&one, "logs/README.md", &index, &march_5(), "Other")
                .expect("second")
        else {
            panic!("expected update");
        };
        let CellPatch::Updated(removed) =
            remove_reference(&two, "logs/README.md", &index, &march_5(), "Other")
                .expect("remove")
        else {
            panic!("expected update");
        };
        assert_eq!(removed, one);
    }

    #[test]
    fn removing_the_last_reference_collapses_to_plain_day() {
        let doc = "# メディアログ\n\nnotes\n";
        let index = local_index();
        let CellPatch::Updated(one) =
            insert_reference(doc, "logs/README.md", &index, &march_5(), "Test Episode")
                .expect("insert")
        else {
            panic!("expected update");
        };
        let CellPatch::Updated(removed) =
            remove_reference(&one, "logs/README.md", &index, &march_5(), "Test Episode")
                .expect("remove")
        else {
            panic!("expected update");
        };
        assert!(removed.contains("| 3 | 4 | 5 | 6 |"));
        assert!(!removed.contains("2024-03.md#35"));
    }

    #[test]
    fn remove_of_absent_reference_is_a_no_op() {
        let doc = "# メディアログ\n\nnotes\n";
        let patch = remove_reference(doc, "logs/README.md", &local_index(), &march_5(), "Nope")
            .expect("remove");
        assert_eq!(patch, CellPatch::Unchanged);
    }

    #[test]
    fn unparseable_cells_survive_untouched() {
        let doc = "# メディアログ\n\n## 2024年3月\n\n\
            | 日 | 月 | 火 | 水 | 木 | 金 | 土 |\n\
            |:--:|:--:|:--:|:--:|:--:|:--:|:--:|\n\
            |  |  |  |  |  | 1 | hand note |\n\
            | 3 | 4 | 5 | 6 | 7 | 8 | 9 |\n\n---\n\n";
        let CellPatch::Updated(updated) =
            insert_reference(doc, "logs/README.md", &local_index(), &march_5(), "Test Episode")
                .expect("patch")
        else {
            panic!("expected update");
        };
        assert!(updated.contains("| hand note |"));
    }
}
