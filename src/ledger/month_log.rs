use crate::error::SyncError;
use crate::ledger::dates;

/// Structured form of one month-log document. Day sections appear in
/// creation order, not date order; entries within a day are
/// most-recent-first. Parsing is strict: a document either matches the
/// canonical grammar or the caller gets `InvalidDocument`, with no
/// repair guesses on hand-edited files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthLog {
    pub title_line: String,
    pub sections: Vec<DaySection>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaySection {
    /// `{month}/{day}`, the text after `## `.
    pub day_key: String,
    /// Entry blocks, each ending with the `---` separator and a blank
    /// line, newest first.
    pub entries: Vec<String>,
}

impl MonthLog {
    pub fn new(year: i32, month: u32) -> Self {
        Self {
            title_line: dates::month_log_title(year, month),
            sections: Vec::new(),
        }
    }

    pub fn parse(path: &str, text: &str) -> Result<Self, SyncError> {
        let err = |reason: &str| SyncError::invalid_document(path, reason);

        let lines: Vec<&str> = text.lines().collect();
        if lines.is_empty() || !lines[0].starts_with("# ") {
            return Err(err("missing document title line"));
        }
        let title_line = lines[0].to_string();
        if lines.len() > 1 && !lines[1].is_empty() {
            return Err(err("missing blank line after document title"));
        }

        let mut sections: Vec<DaySection> = Vec::new();
        let mut i = 2usize;
        while i < lines.len() {
            let line = lines[i];
            if line.is_empty() {
                i += 1;
            } else if let Some(day_key) = line.strip_prefix("## ") {
                if i + 1 < lines.len() && !lines[i + 1].is_empty() {
                    return Err(err("missing blank line after day header"));
                }
                sections.push(DaySection {
                    day_key: day_key.to_string(),
                    entries: Vec::new(),
                });
                i += 2;
            } else if line.starts_with("### ") {
                let Some(section) = sections.last_mut() else {
                    return Err(err("entry block before any day header"));
                };
                let Some(sep) = lines[i..].iter().position(|l| *l == "---").map(|p| i + p)
                else {
                    return Err(err("entry block missing --- separator"));
                };
                if lines[i + 1..sep]
                    .iter()
                    .any(|l| l.starts_with("## ") || l.starts_with("### "))
                {
                    return Err(err("entry block missing --- separator"));
                }
                if sep + 1 < lines.len() && !lines[sep + 1].is_empty() {
                    return Err(err("missing blank line after entry separator"));
                }
                let mut block = lines[i..=sep].join("\n");
                block.push_str("\n\n");
                section.entries.push(block);
                i = sep + 2;
            } else {
                return Err(err("unexpected content outside entry blocks"));
            }
        }

        Ok(Self {
            title_line,
            sections,
        })
    }

    /// Splice a formatted block into the section for `day_key`, creating
    /// the section at the document end on first use. The block lands
    /// ahead of the day's existing entries.
    pub fn insert(&mut self, day_key: &str, block: &str) {
        let idx = match self.sections.iter().position(|s| s.day_key == day_key) {
            Some(idx) => idx,
            None => {
                self.sections.push(DaySection {
                    day_key: day_key.to_string(),
                    entries: Vec::new(),
                });
                self.sections.len() - 1
            }
        };
        self.sections[idx].entries.insert(0, block.to_string());
    }

    /// Excise the first block whose heading line matches `heading`
    /// exactly. Returns false when nothing matched; the caller reports
    /// that as a warning rather than failing. A day section emptied by
    /// the removal is dropped with it.
    pub fn remove(&mut self, heading: &str) -> bool {
        for section_idx in 0..self.sections.len() {
            let Some(entry_idx) = self.sections[section_idx]
                .entries
                .iter()
                .position(|block| block.lines().next() == Some(heading))
            else {
                continue;
            };
            self.sections[section_idx].entries.remove(entry_idx);
            if self.sections[section_idx].entries.is_empty() {
                self.sections.remove(section_idx);
            }
            return true;
        }
        false
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.title_line);
        out.push_str("\n\n");
        for section in &self.sections {
            out.push_str("## ");
            out.push_str(&section.day_key);
            out.push_str("\n\n");
            for block in &section.entries {
                out.push_str(block);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK_A: &str = "### 📻 Ch1 - Test Episode\n\n[YouTube](http://x)\n\n---\n\n";
    const BLOCK_B: &str = "### 📻 Ch1 - Other\n\n[YouTube](http://y)\n\n---\n\n";

    #[test]
    fn insert_into_new_document() {
        let mut log = MonthLog::new(2024, 3);
        log.insert("3/5", BLOCK_A);
        assert_eq!(
            log.render(),
            "# 2024年3月\n\n## 3/5\n\n### 📻 Ch1 - Test Episode\n\n[YouTube](http://x)\n\n---\n\n"
        );
    }

    #[test]
    fn second_insert_lands_ahead_of_the_first() {
        let mut log = MonthLog::new(2024, 3);
        log.insert("3/5", BLOCK_A);
        log.insert("3/5", BLOCK_B);
        let text = log.render();
        let other = text.find("Other").expect("other present");
        let test = text.find("Test Episode").expect("test present");
        assert!(other < test, "newest entry must precede older ones");
    }

    #[test]
    fn new_day_section_appends_at_document_end() {
        let mut log = MonthLog::new(2024, 3);
        log.insert("3/7", BLOCK_A);
        log.insert("3/5", BLOCK_B);
        assert_eq!(log.sections[0].day_key, "3/7");
        assert_eq!(log.sections[1].day_key, "3/5");
    }

    #[test]
    fn parse_render_round_trips() {
        let mut log = MonthLog::new(2024, 3);
        log.insert("3/5", BLOCK_A);
        log.insert("3/5", BLOCK_B);
        log.insert("3/7", BLOCK_A);
        let text = log.render();
        let reparsed = MonthLog::parse("logs/2024-03.md", &text).expect("parse");
        assert_eq!(reparsed.render(), text);
    }

    #[test]
    fn parse_accepts_memo_lines_inside_blocks() {
        let text = "# 2024年3月\n\n## 3/5\n\n### 🎙️ Ch2 - Talk\n\n> good one\n\n[stand.fm](http://z)\n\n---\n\n";
        let log = MonthLog::parse("logs/2024-03.md", text).expect("parse");
        assert_eq!(log.render(), text);
    }

    #[test]
    fn remove_matches_heading_exactly() {
        let mut log = MonthLog::new(2024, 3);
        log.insert("3/5", BLOCK_A);
        log.insert("3/5", BLOCK_B);
        assert!(log.remove("### 📻 Ch1 - Other"));
        let text = log.render();
        assert!(!text.contains("Other"));
        assert!(text.contains("Test Episode"));
    }

    #[test]
    fn remove_reports_missing_blocks() {
        let mut log = MonthLog::new(2024, 3);
        log.insert("3/5", BLOCK_A);
        assert!(!log.remove("### 📻 Ch1 - Nope"));
    }

    #[test]
    fn removing_the_last_entry_drops_the_day_section() {
        let mut log = MonthLog::new(2024, 3);
        log.insert("3/5", BLOCK_A);
        assert!(log.remove("### 📻 Ch1 - Test Episode"));
        assert_eq!(log.render(), "# 2024年3月\n\n");
    }

    #[test]
    fn record_then_remove_restores_previous_text() {
        let mut log = MonthLog::new(2024, 3);
        log.insert("3/5", BLOCK_A);
        let before = log.render();

        let mut log = MonthLog::parse("logs/2024-03.md", &before).expect("parse");
        log.insert("3/5", BLOCK_B);
        assert!(log.remove("### 📻 Ch1 - Other"));
        assert_eq!(log.render(), before);
    }

    #[test]
    fn parse_rejects_stray_text() {
        let text = "# 2024年3月\n\nhand-written note\n";
        assert!(MonthLog::parse("logs/2024-03.md", text).is_err());
    }

    #[test]
    fn parse_rejects_block_without_separator() {
        let text = "# 2024年3月\n\n## 3/5\n\n### 📻 Ch1 - A\n\n### 📻 Ch1 - B\n\n---\n\n";
        assert!(MonthLog::parse("logs/2024-03.md", text).is_err());
    }

    #[test]
    fn parse_rejects_missing_title() {
        assert!(MonthLog::parse("logs/2024-03.md", "## 3/5\n\n").is_err());
    }
}
