//! Journal output parser

/// Split log-tool output into trimmed, non-empty lines, oldest first.
pub fn parse_journal(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}
