//! `systemctl status` report parser

use serde::ser::{Serialize, SerializeMap, Serializer};

/// Leading markers of the report's title line
pub const STATUS_GLYPHS: &[char] = &['●', '○', '×', '↻', ASCII_GLYPH];

/// Fallback title marker on terminals without Unicode; also a plain bullet
const ASCII_GLYPH: char = '*';

/// A `*` line is only a title when its first word names a unit
const UNIT_SUFFIXES: &[&str] = &[
    ".service", ".socket", ".target", ".timer", ".mount", ".automount", ".swap", ".path",
    ".slice", ".scope", ".device",
];

/// Journal lines interleaved in the report start with one of these
const MONTHS: &[&str] = &[
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Flat key/value view of a status report.
///
/// The key set depends on the unit and the service-manager version, so this
/// is an insertion-ordered string map rather than a fixed struct. `unit` and
/// `description` come from the title line; every other key is a normalized
/// report label (`Main PID` becomes `main_pid`). Inserting an existing key
/// overwrites its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusRecord {
    entries: Vec<(String, String)>,
}

impl StatusRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn unit(&self) -> Option<&str> {
        self.get("unit")
    }

    pub fn description(&self) -> Option<&str> {
        self.get("description")
    }

    pub fn active(&self) -> Option<&str> {
        self.get("active")
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StatusRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Self::new();
        for (k, v) in iter {
            record.insert(k, v);
        }
        record
    }
}

impl Serialize for StatusRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Parse a status report into a [`StatusRecord`].
///
/// Lines are trimmed and blanks dropped. A line starting with a month
/// abbreviation is a journal excerpt and is skipped. The title line (leading
/// status glyph) is split on the first `" - "` into `unit` and `description`;
/// with the ASCII `*` marker it must be followed by a space and a unit name,
/// and other `*` lines are bullets and ignored. Any other line containing `:`
/// becomes a normalized key and trimmed value. Everything else is ignored.
pub fn parse_status(raw: &str) -> StatusRecord {
    let mut record = StatusRecord::new();

    for line in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if is_journal_line(line) {
            continue;
        }

        if let Some(title) = title_line(line) {
            match title.split_once(" - ") {
                Some((unit, description)) => {
                    record.insert("unit", unit.trim());
                    record.insert("description", description.trim());
                }
                None => record.insert("unit", title),
            }
        } else if line.starts_with(ASCII_GLYPH) {
            // bullet
        } else if let Some((key, value)) = line.split_once(':') {
            record.insert(normalize_key(key), value.trim());
        }
    }

    record
}

/// The title text after the glyph, if `line` is the report's title line
fn title_line(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix(ASCII_GLYPH) {
        let rest = rest.strip_prefix(' ')?.trim();
        let name = rest.split_whitespace().next()?;
        return UNIT_SUFFIXES
            .iter()
            .any(|suffix| name.ends_with(suffix))
            .then_some(rest);
    }
    if line.starts_with(STATUS_GLYPHS) {
        return Some(line.trim_start_matches(STATUS_GLYPHS).trim());
    }
    None
}

fn is_journal_line(line: &str) -> bool {
    line.get(..3).is_some_and(|prefix| MONTHS.contains(&prefix))
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase().replace(' ', "_")
}

#[cfg(test)]
mod tests {
    use super::*;

    const NGINX_STATUS: &str = "\
● nginx.service - A high performance web server and a reverse proxy server
     Loaded: loaded (/lib/systemd/system/nginx.service; enabled; vendor preset: enabled)
     Active: active (running) since Sat 2026-10-17 09:12:44 UTC; 1 day 2h ago
       Docs: man:nginx(8)
    Process: 812 ExecStartPre=/usr/sbin/nginx -t -q -g daemon on; master_process on; (code=exited, status=0/SUCCESS)
   Main PID: 845 (nginx)
      Tasks: 3 (limit: 4558)
     Memory: 5.1M
        CPU: 61ms
     CGroup: /system.slice/nginx.service
             ├─845 \"nginx master process /usr/sbin/nginx -g daemon on; master_process on;\"
             └─846 \"nginx worker process\"

Oct 17 09:12:44 web systemd[1]: Starting A high performance web server...
Oct 17 09:12:44 web systemd[1]: Started A high performance web server.
";

    #[test]
    fn test_parse_full_report() {
        let record = parse_status(NGINX_STATUS);

        assert_eq!(record.unit(), Some("nginx.service"));
        assert_eq!(
            record.description(),
            Some("A high performance web server and a reverse proxy server")
        );
        assert_eq!(
            record.get("loaded"),
            Some("loaded (/lib/systemd/system/nginx.service; enabled; vendor preset: enabled)")
        );
        assert_eq!(
            record.active(),
            Some("active (running) since Sat 2026-10-17 09:12:44 UTC; 1 day 2h ago")
        );
        assert_eq!(record.get("docs"), Some("man:nginx(8)"));
        assert_eq!(record.get("main_pid"), Some("845 (nginx)"));
        assert_eq!(record.get("cgroup"), Some("/system.slice/nginx.service"));
        assert!(record.iter().all(|(k, _)| !k.starts_with("oct")));
    }

    #[test]
    fn test_minimal_report() {
        let record = parse_status("● nginx.service - A web server\n   Active: active (running)\n");
        let expected: StatusRecord = [
            ("unit", "nginx.service"),
            ("description", "A web server"),
            ("active", "active (running)"),
        ]
        .into_iter()
        .collect();
        assert_eq!(record, expected);
    }

    #[test]
    fn test_title_without_description() {
        let record = parse_status("● ghost.service\n   Loaded: not-found (Reason: Unit ghost.service not found.)\n");
        assert_eq!(record.unit(), Some("ghost.service"));
        assert_eq!(record.description(), None);
        assert_eq!(
            record.get("loaded"),
            Some("not-found (Reason: Unit ghost.service not found.)")
        );
    }

    #[test]
    fn test_other_glyphs_mark_title() {
        for glyph in ['○', '×', '↻', '*'] {
            let record = parse_status(&format!("{} cron.service - Regular jobs: daily\n", glyph));
            assert_eq!(record.unit(), Some("cron.service"));
            assert_eq!(record.description(), Some("Regular jobs: daily"));
            assert_eq!(record.len(), 2);
        }
    }

    #[test]
    fn test_ascii_bullets_do_not_replace_title() {
        let raw = "\
* backup.service - Nightly backup
   Active: active (running)
* Note: the unit file changed on disk
*nginx.service - no space after marker
* not-a-unit - still a bullet
";
        let record = parse_status(raw);
        assert_eq!(record.unit(), Some("backup.service"));
        assert_eq!(record.description(), Some("Nightly backup"));
        assert_eq!(record.active(), Some("active (running)"));
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn test_ascii_marker_accepts_other_unit_types() {
        let record = parse_status("* docker.socket - Docker Socket for the API\n");
        assert_eq!(record.unit(), Some("docker.socket"));
        assert_eq!(record.description(), Some("Docker Socket for the API"));
    }

    #[test]
    fn test_month_lines_skipped_regardless_of_content() {
        let raw = MONTHS
            .iter()
            .map(|m| format!("{} key: value", m))
            .collect::<Vec<_>>()
            .join("\n");
        assert!(parse_status(&raw).is_empty());
    }

    #[test]
    fn test_keys_normalize_and_last_write_wins() {
        let record = parse_status("Main PID: 1\n  main pid : 2\nMAIN PID:3\n");
        assert_eq!(record.len(), 1);
        assert_eq!(record.get("main_pid"), Some("3"));
    }

    #[test]
    fn test_value_keeps_later_colons() {
        let record = parse_status("Docs: https://nginx.org/en/docs/\n");
        assert_eq!(record.get("docs"), Some("https://nginx.org/en/docs/"));
    }

    #[test]
    fn test_unrecognized_lines_ignored() {
        let record = parse_status("├─845 nginx\nWarning without separator\n");
        assert!(record.is_empty());
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let record = parse_status("● a.service - A\nActive: active\nMain PID: 7\n");
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            r#"{"unit":"a.service","description":"A","active":"active","main_pid":"7"}"#
        );
    }
}
