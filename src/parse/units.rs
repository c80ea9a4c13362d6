//! `systemctl list-units` table parser
//!
//! The table is read by fixed character columns rather than by splitting on
//! whitespace, because descriptions routinely contain spaces. The offsets
//! match the service manager's default layout with `--no-pager` on an
//! 80-column-wide table; a tool version or locale that changes the column
//! widths will shift fields. That is a known limitation, not something to
//! paper over with whitespace splitting.

use serde::Serialize;

/// Character offsets of the UNIT, LOAD, ACTIVE and SUB columns. DESCRIPTION
/// runs from the last offset to end of line.
const UNIT_COLUMN: (usize, usize) = (0, 56);
const LOAD_COLUMN: (usize, usize) = (56, 63);
const ACTIVE_COLUMN: (usize, usize) = (63, 70);
const SUB_COLUMN: (usize, usize) = (70, 78);
const DESCRIPTION_START: usize = 78;

const SUMMARY_MARKER: &str = "loaded units listed";
const UNIT_SUFFIX: &str = ".service";

/// One row of the unit table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitRecord {
    pub unit: String,
    pub load: String,
    pub active: String,
    pub sub: String,
    pub description: String,
}

impl UnitRecord {
    fn from_line(line: &str) -> Self {
        Self {
            unit: column(line, UNIT_COLUMN.0, Some(UNIT_COLUMN.1)),
            load: column(line, LOAD_COLUMN.0, Some(LOAD_COLUMN.1)),
            active: column(line, ACTIVE_COLUMN.0, Some(ACTIVE_COLUMN.1)),
            sub: column(line, SUB_COLUMN.0, Some(SUB_COLUMN.1)),
            description: column(line, DESCRIPTION_START, None),
        }
    }
}

/// Parse the unit table into records, preserving the tool's ordering.
///
/// Nothing is emitted until the header line (containing both `UNIT` and
/// `LOAD`) has been seen. After it, blank lines, the trailing summary and any
/// line without `.service` are skipped.
pub fn parse_units(raw: &str) -> Vec<UnitRecord> {
    let mut header_found = false;
    let mut units = Vec::new();

    for line in raw.lines() {
        if !header_found {
            header_found = line.contains("UNIT") && line.contains("LOAD");
            continue;
        }
        if line.trim().is_empty() || line.contains(SUMMARY_MARKER) {
            continue;
        }
        if !line.contains(UNIT_SUFFIX) {
            continue;
        }
        units.push(UnitRecord::from_line(line));
    }

    units
}

/// Slice `line` by character (not byte) offsets and trim the result.
/// Offsets past the end of the line yield an empty string.
fn column(line: &str, start: usize, end: Option<usize>) -> String {
    let byte_at = |chars: usize| {
        line.char_indices()
            .nth(chars)
            .map_or(line.len(), |(idx, _)| idx)
    };
    let from = byte_at(start);
    let to = end.map_or(line.len(), byte_at);
    line[from..to.max(from)].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "  UNIT                                                   LOAD   ACTIVE SUB     DESCRIPTION";

    fn row(unit: &str, load: &str, active: &str, sub: &str, desc: &str) -> String {
        format!("{:<56}{:<7}{:<7}{:<8}{}", unit, load, active, sub, desc)
    }

    #[test]
    fn test_parse_single_row() {
        let raw = format!(
            "{}\n{}\n\n1 loaded units listed.\n",
            HEADER,
            row("  sshd.service", "loaded", "active", "running", "OpenSSH server daemon")
        );
        let units = parse_units(&raw);
        assert_eq!(
            units,
            vec![UnitRecord {
                unit: "sshd.service".into(),
                load: "loaded".into(),
                active: "active".into(),
                sub: "running".into(),
                description: "OpenSSH server daemon".into(),
            }]
        );
    }

    #[test]
    fn test_descriptions_keep_spaces_and_order() {
        let raw = [
            HEADER.to_string(),
            row("  cron.service", "loaded", "active", "running", "Regular background program processing daemon"),
            row("  getty@tty1.service", "loaded", "active", "running", "Getty on tty1"),
            row("  systemd-fsck-root.service", "loaded", "active", "exited", "File System Check on Root Device"),
            String::new(),
            "LOAD   = Reflects whether the unit definition was properly loaded.".to_string(),
            "ACTIVE = The high-level unit activation state, i.e. generalization of SUB.".to_string(),
            "3 loaded units listed. Pass --all to see loaded but inactive units, too.".to_string(),
        ]
        .join("\n");

        let units = parse_units(&raw);
        assert_eq!(units.len(), 3);
        assert_eq!(units[0].unit, "cron.service");
        assert_eq!(units[0].description, "Regular background program processing daemon");
        assert_eq!(units[1].unit, "getty@tty1.service");
        assert_eq!(units[2].sub, "exited");
        assert_eq!(units[2].description, "File System Check on Root Device");
    }

    #[test]
    fn test_no_header_yields_nothing() {
        let raw = row("  sshd.service", "loaded", "active", "running", "OpenSSH server daemon");
        assert!(parse_units(&raw).is_empty());
        assert!(parse_units("").is_empty());
    }

    #[test]
    fn test_rows_before_header_are_ignored() {
        let raw = format!(
            "{}\n{}\n{}\n",
            row("  early.service", "loaded", "active", "running", "Before header"),
            HEADER,
            row("  late.service", "loaded", "active", "running", "After header"),
        );
        let units = parse_units(&raw);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit, "late.service");
    }

    #[test]
    fn test_non_service_lines_skipped() {
        let raw = format!(
            "{}\n{}\n{}\n",
            HEADER,
            row("  dev-sda1.device", "loaded", "active", "plugged", "Disk"),
            row("  dbus.service", "loaded", "active", "running", "D-Bus System Message Bus"),
        );
        let units = parse_units(&raw);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit, "dbus.service");
    }

    #[test]
    fn test_short_line_gives_empty_fields() {
        let raw = format!("{}\n  short.service\n", HEADER);
        let units = parse_units(&raw);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].unit, "short.service");
        assert_eq!(units[0].load, "");
        assert_eq!(units[0].description, "");
    }

    #[test]
    fn test_failed_unit_keeps_glyph_in_unit_column() {
        let raw = format!(
            "{}\n{}\n",
            HEADER,
            row("● broken.service", "loaded", "failed", "failed", "Broken thing"),
        );
        let units = parse_units(&raw);
        assert_eq!(units[0].unit, "● broken.service");
        assert_eq!(units[0].active, "failed");
        assert_eq!(units[0].description, "Broken thing");
    }

    #[test]
    fn test_column_uses_character_offsets() {
        assert_eq!(column("é-abc", 1, Some(3)), "-a");
        assert_eq!(column("abc", 5, Some(9)), "");
        assert_eq!(column("abc  ", 1, None), "bc");
    }
}
