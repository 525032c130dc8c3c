//! Archive file naming: `<volume>_<YYYYMMDDTHHMMSS>.tar.gz`
//!
//! The name is the source of truth for an archive's age during rotation.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Extension of every archive file
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// Compact ISO-8601 timestamp embedded in archive names (UTC)
pub const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S";

const TIMESTAMP_LEN: usize = 15;

/// Parsed or to-be-written archive file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveName {
    pub volume: String,
    pub created_at: DateTime<Utc>,
}

impl ArchiveName {
    pub fn new(volume: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            volume: volume.into(),
            created_at,
        }
    }

    /// Name for an archive of `volume` taken now
    pub fn now(volume: impl Into<String>) -> Self {
        Self::new(volume, Utc::now())
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}_{}{}",
            self.volume,
            self.created_at.format(TIMESTAMP_FORMAT),
            ARCHIVE_EXTENSION
        )
    }

    /// Split a conforming file name at its last `_`.
    ///
    /// Returns `None` for names that do not follow the convention.
    pub fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(ARCHIVE_EXTENSION)?;
        let (volume, stamp) = stem.rsplit_once('_')?;
        if volume.is_empty() {
            return None;
        }
        let created_at = parse_timestamp(stamp)?;
        Some(Self::new(volume, created_at))
    }
}

/// Parse the compact timestamp used in archive names
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if raw.len() != TIMESTAMP_LEN {
        return None;
    }
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Whether `file_name` belongs to the archive series of `volume`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesMatch {
    /// Not an archive of this volume
    Foreign,
    /// Conforming name with its embedded timestamp
    Dated(DateTime<Utc>),
    /// Matches `<volume>_*.tar.gz` but the timestamp is unreadable
    Malformed,
}

/// Classify a file name against `volume`'s series.
///
/// A name such as `app_data_20240101T000000.tar.gz` matches the `app_*`
/// glob but is a dated archive of volume `app_data`, so it is foreign to
/// `app`.
pub fn classify(volume: &str, file_name: &str) -> SeriesMatch {
    let Some(stem) = file_name.strip_suffix(ARCHIVE_EXTENSION) else {
        return SeriesMatch::Foreign;
    };
    let Some(rest) = stem
        .strip_prefix(volume)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return SeriesMatch::Foreign;
    };

    if let Some(ts) = parse_timestamp(rest) {
        return SeriesMatch::Dated(ts);
    }

    match rest.rsplit_once('_') {
        Some((_, stamp)) if parse_timestamp(stamp).is_some() => SeriesMatch::Foreign,
        _ => SeriesMatch::Malformed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_file_name_format() {
        let name = ArchiveName::new("pg_data", ts(2024, 3, 9, 4, 5, 6));
        assert_eq!(name.file_name(), "pg_data_20240309T040506.tar.gz");
    }

    #[test]
    fn test_parse_conforming_name() {
        let parsed = ArchiveName::parse("pg_data_20240309T040506.tar.gz").unwrap();
        assert_eq!(parsed.volume, "pg_data");
        assert_eq!(parsed.created_at, ts(2024, 3, 9, 4, 5, 6));
    }

    #[test]
    fn test_parse_rejects_non_conforming_names() {
        assert!(ArchiveName::parse("pg_data.tar.gz").is_none());
        assert!(ArchiveName::parse("pg_data_yesterday.tar.gz").is_none());
        assert!(ArchiveName::parse("_20240309T040506.tar.gz").is_none());
        assert!(ArchiveName::parse("pg_data_20240309T040506.tar").is_none());
        assert!(ArchiveName::parse("pg_data_20240309T040506.tar.gz.partial").is_none());
        assert!(ArchiveName::parse("pg_data_20241309T040506.tar.gz").is_none());
    }

    #[test]
    fn test_classify() {
        assert_eq!(
            classify("app", "app_20240101T000000.tar.gz"),
            SeriesMatch::Dated(ts(2024, 1, 1, 0, 0, 0))
        );
        assert_eq!(classify("app", "app_old-copy.tar.gz"), SeriesMatch::Malformed);
        assert_eq!(classify("app", "app_data_20240101T000000.tar.gz"), SeriesMatch::Foreign);
        assert_eq!(classify("app", "application_20240101T000000.tar.gz"), SeriesMatch::Foreign);
        assert_eq!(classify("app", "app_20240101T000000.tar.gz.partial"), SeriesMatch::Foreign);
        assert_eq!(classify("app", "notes.txt"), SeriesMatch::Foreign);
        assert_eq!(
            classify("app_data", "app_data_20240101T000000.tar.gz"),
            SeriesMatch::Dated(ts(2024, 1, 1, 0, 0, 0))
        );
    }
}
