use clap::ValueEnum;

/// Where an entry was consumed. Each source contributes its category
/// tag, the label of the source link line, and URL cleanup; the
/// recording path itself is source-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    Youtube,
    Standfm,
    Other,
}

#[derive(Debug, Clone)]
pub struct SourceProfile {
    pub category_tag: &'static str,
    pub link_label: &'static str,
}

impl SourceKind {
    pub fn profile(self) -> SourceProfile {
        match self {
            Self::Youtube => SourceProfile {
                category_tag: "📻",
                link_label: "YouTube",
            },
            Self::Standfm => SourceProfile {
                category_tag: "🎙️",
                link_label: "stand.fm",
            },
            Self::Other => SourceProfile {
                category_tag: "📻",
                link_label: "Link",
            },
        }
    }

    /// Strip per-source noise from a shared URL. YouTube watch links
    /// carry a resume-position `&t=` suffix that must not end up in the
    /// ledger; other sources are recorded as-is.
    pub fn normalize_url(self, url: &str) -> String {
        match self {
            Self::Youtube => url.split("&t=").next().unwrap_or(url).to_string(),
            Self::Standfm | Self::Other => url.to_string(),
        }
    }
}

/// Category tag for schedule and watchlist items.
pub fn media_kind_tag(kind: &str) -> &'static str {
    match kind {
        "radio" => "📻",
        "tv" | "drama" => "📺",
        "movie" => "🎬",
        "streaming" => "🎧",
        "anime" => "🎌",
        "game" => "🎮",
        "book" => "📖",
        "manga" => "📚",
        "youtube" => "▶️",
        _ => "📻",
    }
}
