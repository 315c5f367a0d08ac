use std::fmt;

use albumsplit_core::Track;

use super::timestamp::{parse_timestamp, TimestampParseError};

/// Parse a plain-text track listing.
///
/// Each non-blank line holds a start timestamp followed by the title, with an
/// optional ` - ` between them:
///
/// ```text
/// # Side A
/// 0:00 Intro
/// 12.5 - Song A
/// 1:20 Rock & Roll: Pt. 1/2
/// ```
///
/// Lines starting with `#` are comments. Tracks are returned in file order.
pub fn parse_tracklist(text: &str) -> Result<Vec<Track>, TracklistError> {
    let mut tracks = Vec::new();

    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (timestamp, rest) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));
        let start = parse_timestamp(timestamp).map_err(|source| TracklistError::Timestamp {
            line: number + 1,
            source,
        })?;

        let rest = rest.trim_start();
        let title = rest
            .strip_prefix('-')
            .filter(|after| after.is_empty() || after.starts_with(char::is_whitespace))
            .unwrap_or(rest)
            .trim();

        tracks.push(Track::new(title, start));
    }

    if tracks.is_empty() {
        return Err(TracklistError::Empty);
    }

    Ok(tracks)
}

#[derive(Debug, Clone, PartialEq)]
pub enum TracklistError {
    Empty,
    Timestamp {
        line: usize,
        source: TimestampParseError,
    },
}

impl std::error::Error for TracklistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TracklistError::Empty => None,
            TracklistError::Timestamp { source, .. } => Some(source),
        }
    }
}

impl fmt::Display for TracklistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TracklistError::Empty => write!(f, "track list does not contain any tracks"),
            TracklistError::Timestamp { line, source } => {
                write!(f, "invalid timestamp on line {line}: {source}")
            }
        }
    }
}
