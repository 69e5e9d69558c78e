use chrono::{Datelike, NaiveDate};

/// Everything the engine derives from a target date: where the month log
/// lives, the day section key inside it, and the URI fragment calendar
/// cells link to. Pure and total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatePoints {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// `{log_dir}/{year}-{month:02}.md`
    pub month_log_path: String,
    /// `{month}/{day}`, no zero padding; rendered as a `##` heading.
    pub day_key: String,
    /// `{month}{day}`, no separator; fragment of the day link.
    pub anchor: String,
}

pub fn derive(log_dir: &str, date: NaiveDate) -> DatePoints {
    let year = date.year();
    let month = date.month();
    let day = date.day();
    DatePoints {
        year,
        month,
        day,
        month_log_path: format!("{log_dir}/{year}-{month:02}.md"),
        day_key: format!("{month}/{day}"),
        anchor: format!("{month}{day}"),
    }
}

/// Title line of a month log document.
pub fn month_log_title(year: i32, month: u32) -> String {
    format!("# {year}年{month}月")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn derives_zero_padded_path_and_unpadded_day_key() {
        let points = derive("logs", date(2024, 3, 5));
        assert_eq!(points.month_log_path, "logs/2024-03.md");
        assert_eq!(points.day_key, "3/5");
        assert_eq!(points.anchor, "35");
    }

    #[test]
    fn december_needs_no_padding() {
        let points = derive("logs", date(2024, 12, 31));
        assert_eq!(points.month_log_path, "logs/2024-12.md");
        assert_eq!(points.day_key, "12/31");
        assert_eq!(points.anchor, "1231");
    }

    #[test]
    fn title_line_is_japanese_year_month() {
        assert_eq!(month_log_title(2024, 3), "# 2024年3月");
    }
}
