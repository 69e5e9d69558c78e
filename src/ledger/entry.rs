use crate::ledger::util::truncate_with_ellipsis;
use chrono::NaiveDate;

/// Titles longer than this render truncated inside calendar cells.
const SHORT_TITLE_MAX: usize = 15;
const SHORT_TITLE_KEEP: usize = 14;

/// One consumption event, as captured from the caller. Immutable once
/// formatted; the engine projects it into the month log and the
/// calendar indexes and never stores it as an object.
#[derive(Debug, Clone)]
pub struct LedgerEntry {
    pub title: String,
    pub channel: String,
    pub url: String,
    pub memo: Option<String>,
    pub category_tag: String,
    pub link_label: String,
    pub target_date: NaiveDate,
}

/// The canonical text projection of a [`LedgerEntry`]. `heading` doubles
/// as the removal key: undo locates the block by matching this exact
/// line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedEntry {
    pub heading: String,
    pub block: String,
    pub short_title: String,
}

pub fn heading_line(category_tag: &str, channel: &str, title: &str) -> String {
    format!("### {category_tag} {channel} - {title}")
}

/// Display form of a title inside calendar cells. Log entries always
/// keep the full title.
pub fn short_title(title: &str) -> String {
    if title.chars().count() > SHORT_TITLE_MAX {
        truncate_with_ellipsis(title, SHORT_TITLE_KEEP)
    } else {
        title.to_string()
    }
}

/// Render the entry block. The trailing `---` separator bounds the block
/// for removal, so the format must stay exactly reversible.
pub fn format(entry: &LedgerEntry) -> FormattedEntry {
    let heading = heading_line(&entry.category_tag, &entry.channel, &entry.title);

    let mut block = String::new();
    block.push_str(&heading);
    block.push_str("\n\n");
    if let Some(memo) = entry.memo.as_deref().filter(|m| !m.trim().is_empty()) {
        block.push_str(&format!("> {memo}\n\n"));
    }
    block.push_str(&format!("[{}]({})\n\n---\n\n", entry.link_label, entry.url));

    FormattedEntry {
        heading,
        block,
        short_title: short_title(&entry.title),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(title: &str, memo: Option<&str>) -> LedgerEntry {
        LedgerEntry {
            title: title.to_string(),
            channel: "Ch1".to_string(),
            url: "http://x".to_string(),
            memo: memo.map(str::to_string),
            category_tag: "📻".to_string(),
            link_label: "YouTube".to_string(),
            target_date: NaiveDate::from_ymd_opt(2024, 3, 5).expect("valid date"),
        }
    }

    #[test]
    fn block_without_memo() {
        let formatted = format(&entry("Test Episode", None));
        assert_eq!(formatted.heading, "### 📻 Ch1 - Test Episode");
        assert_eq!(
            formatted.block,
            "### 📻 Ch1 - Test Episode\n\n[YouTube](http://x)\n\n---\n\n"
        );
    }

    #[test]
    fn block_with_memo_quotes_it() {
        let formatted = format(&entry("Test Episode", Some("great talk")));
        assert_eq!(
            formatted.block,
            "### 📻 Ch1 - Test Episode\n\n> great talk\n\n[YouTube](http://x)\n\n---\n\n"
        );
    }

    #[test]
    fn blank_memo_is_dropped() {
        let formatted = format(&entry("Test Episode", Some("   ")));
        assert!(!formatted.block.contains('>'));
    }

    #[test]
    fn fifteen_chars_stay_untruncated() {
        let title = "a".repeat(15);
        assert_eq!(short_title(&title), title);
    }

    #[test]
    fn sixteen_chars_truncate_to_fourteen_plus_ellipsis() {
        let title = "b".repeat(16);
        let mut want = "b".repeat(14);
        want.push('…');
        assert_eq!(short_title(&title), want);
    }

    #[test]
    fn truncation_is_char_based_for_japanese_titles() {
        let title = "あ".repeat(16);
        let got = short_title(&title);
        assert_eq!(got.chars().count(), 15);
        assert!(got.ends_with('…'));
    }
}
