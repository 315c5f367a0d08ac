use std::path::{Path, PathBuf};

use crate::AudioSplitError;

/// Characters removed from titles before they are used as file names.
pub const FORBIDDEN_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Longest file name, in characters, that the planner will produce.
pub const MAX_FILE_NAME_CHARS: usize = 255;

/// A titled start marker within the source recording.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub title: String,
    /// Offset from the start of the source, in seconds.
    pub start: f64,
}

impl Track {
    pub fn new<S: Into<String>>(title: S, start: f64) -> Self {
        Self {
            title: title.into(),
            start,
        }
    }
}

/// One planned output file and the `[start, end)` window it covers.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub output_path: PathBuf,
    pub start: f64,
    pub end: f64,
}

/// Compute the per-track windows and output paths for `tracks`.
///
/// Each segment ends where the next track starts; the last one ends at
/// `source_duration`. Tracks are taken in the order given and are not
/// checked here, see [`validate_tracks`] for that. An empty track list
/// yields an empty plan.
pub fn plan(
    tracks: &[Track],
    source_duration: f64,
    destination: &Path,
    extension: &str,
) -> Vec<Segment> {
    let width = pad_width(tracks.len());

    tracks
        .iter()
        .enumerate()
        .map(|(index, track)| {
            let end = tracks
                .get(index + 1)
                .map(|next| next.start)
                .unwrap_or(source_duration);

            Segment {
                output_path: destination.join(file_name(index + 1, width, &track.title, extension)),
                start: track.start,
                end,
            }
        })
        .collect()
}

/// Number of decimal digits needed to print `count`.
pub fn pad_width(count: usize) -> usize {
    let mut value = count;
    let mut width = 1;
    while value >= 10 {
        value /= 10;
        width += 1;
    }
    width
}

/// Strip every character in [`FORBIDDEN_CHARS`] from `title`.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !FORBIDDEN_CHARS.contains(c))
        .collect()
}

/// Build `"{index} {title}.{extension}"`, cutting the title so the whole name
/// stays within [`MAX_FILE_NAME_CHARS`].
pub fn file_name(number: usize, width: usize, title: &str, extension: &str) -> String {
    let prefix = format!("{number:0width$}");
    // prefix + ' ' + title + '.' + extension
    let fixed = prefix.chars().count() + extension.chars().count() + 2;
    let budget = MAX_FILE_NAME_CHARS.saturating_sub(fixed);

    let title: String = sanitize_title(title).chars().take(budget).collect();
    format!("{prefix} {title}.{extension}")
}

/// Check that the start markers describe non-empty, in-range segments.
///
/// `source_duration` must be finite and non-negative. Starts must be finite
/// and non-negative, strictly increasing, and strictly below
/// `source_duration`. An empty list is accepted.
pub fn validate_tracks(tracks: &[Track], source_duration: f64) -> Result<(), AudioSplitError> {
    if !source_duration.is_finite() || source_duration < 0.0 {
        return Err(AudioSplitError::InvalidDuration {
            duration: source_duration,
        });
    }

    let mut previous: Option<f64> = None;

    for (index, track) in tracks.iter().enumerate() {
        if !track.start.is_finite() || track.start < 0.0 {
            return Err(AudioSplitError::InvalidTimestamp {
                index,
                start: track.start,
            });
        }

        if let Some(previous) = previous {
            if track.start <= previous {
                return Err(AudioSplitError::UnorderedTracks {
                    index,
                    previous,
                    start: track.start,
                });
            }
        }

        if track.start >= source_duration {
            return Err(AudioSplitError::TrackOutOfRange {
                index,
                start: track.start,
                duration: source_duration,
            });
        }

        previous = Some(track.start);
    }

    Ok(())
}
