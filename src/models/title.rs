use serde::Serialize;
use std::fmt::Display;

/// Placeholder shown when no release year could be extracted
pub const UNKNOWN_YEAR: &str = "N/A";

/// Release years at or below this are not trusted as a year suffix
const EARLIEST_YEAR: i64 = 1900;

/// A raw catalog title split into its display title and release year
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedTitle {
    pub title: String,
    pub year: Option<String>,
}

impl ParsedTitle {
    /// Parses a "Title (Year)" string.
    ///
    /// The last whitespace-separated token is treated as the year when, with
    /// one leading "(" and one trailing ")" removed, it is an integer above
    /// 1900. Otherwise the raw string is returned unchanged with no year.
    pub fn parse(raw: &str) -> Self {
        let mut parts: Vec<&str> = raw.split_whitespace().collect();

        if parts.len() > 1 {
            let last = parts[parts.len() - 1];
            let candidate = last.strip_prefix('(').unwrap_or(last);
            let candidate = candidate.strip_suffix(')').unwrap_or(candidate);

            if let Ok(year) = candidate.parse::<i64>() {
                if year > EARLIEST_YEAR {
                    parts.pop();
                    return Self {
                        title: parts.join(" "),
                        year: Some(candidate.to_string()),
                    };
                }
            }
        }

        Self {
            title: raw.to_string(),
            year: None,
        }
    }

    /// Year as displayed to clients
    pub fn year_or_unknown(&self) -> &str {
        self.year.as_deref().unwrap_or(UNKNOWN_YEAR)
    }
}

impl Display for ParsedTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.title, self.year_or_unknown())
    }
}
