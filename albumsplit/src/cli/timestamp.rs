use std::fmt;

/// Parse a track start offset into seconds.
///
/// # Grammar
///
/// ```text
/// timestamp = [ [ hours ":" ] minutes ":" ] seconds ;
/// hours     = digits ;
/// minutes   = digits ;
/// seconds   = digits [ "." digits ] ;
/// digits    = digit , { digit } ;
/// ```
///
/// Once a larger field is present, minutes and seconds must be below 60, so
/// `"1:75"` is rejected while a bare `"75"` means 75 seconds.
pub fn parse_timestamp(value: &str) -> Result<f64, TimestampParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TimestampParseError::Empty);
    }

    let bytes = trimmed.as_bytes();
    if let Some((index, ch)) = trimmed
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == ':' || *c == '.'))
    {
        return Err(TimestampParseError::UnexpectedChar { index, found: ch });
    }

    let fields: Vec<(usize, &str)> = field_spans(trimmed);
    if fields.len() > 3 {
        return Err(TimestampParseError::TooManyFields);
    }

    let (last_index, last) = fields[fields.len() - 1];
    let seconds = parse_seconds(bytes, last_index, last)?;

    let mut whole: Vec<u64> = Vec::with_capacity(2);
    for &(index, field) in &fields[..fields.len() - 1] {
        whole.push(parse_whole(index, field)?);
    }

    let units: &[Field] = match whole.len() {
        0 => &[],
        1 => &[Field::Minutes],
        _ => &[Field::Hours, Field::Minutes],
    };

    if !whole.is_empty() && seconds >= 60.0 {
        return Err(TimestampParseError::OutOfRange {
            field: Field::Seconds,
            value: seconds,
        });
    }

    let mut total = seconds;
    for (&value, &field) in whole.iter().zip(units) {
        if field == Field::Minutes && whole.len() == 2 && value >= 60 {
            return Err(TimestampParseError::OutOfRange {
                field,
                value: value as f64,
            });
        }
        total += value as f64 * field.seconds();
    }

    Ok(total)
}

/// Render seconds as `[h:]mm:ss.mmm`.
pub fn format_timestamp(seconds: f64) -> String {
    let total_millis = (seconds.max(0.0) * 1_000.0).round() as u64;
    let millis = total_millis % 1_000;
    let total_secs = total_millis / 1_000;
    let (hours, minutes, secs) = (total_secs / 3_600, total_secs / 60 % 60, total_secs % 60);

    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}.{millis:03}")
    } else {
        format!("{minutes:02}:{secs:02}.{millis:03}")
    }
}

fn field_spans(value: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut start = 0usize;
    for field in value.split(':') {
        spans.push((start, field));
        start += field.len() + 1;
    }
    spans
}

fn parse_whole(index: usize, field: &str) -> Result<u64, TimestampParseError> {
    if field.is_empty() {
        return Err(TimestampParseError::ExpectedNumber { index, found: None });
    }
    if let Some(offset) = field.find('.') {
        return Err(TimestampParseError::UnexpectedChar {
            index: index + offset,
            found: '.',
        });
    }

    field.parse::<u64>().map_err(|_| TimestampParseError::Overflow)
}

fn parse_seconds(bytes: &[u8], index: usize, field: &str) -> Result<f64, TimestampParseError> {
    if field.is_empty() {
        return Err(TimestampParseError::ExpectedNumber { index, found: None });
    }
    if !bytes[index].is_ascii_digit() {
        return Err(TimestampParseError::ExpectedNumber {
            index,
            found: Some(bytes[index] as char),
        });
    }

    let mut dots = field.match_indices('.');
    if let (Some(_), Some((offset, _))) = (dots.next(), dots.next()) {
        return Err(TimestampParseError::UnexpectedChar {
            index: index + offset,
            found: '.',
        });
    }
    if field.ends_with('.') {
        return Err(TimestampParseError::MissingFractionDigits {
            index: index + field.len() - 1,
        });
    }

    field
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or(TimestampParseError::Overflow)
}

#[derive(Debug, Clone, PartialEq)]
pub enum TimestampParseError {
    Empty,
    ExpectedNumber { index: usize, found: Option<char> },
    UnexpectedChar { index: usize, found: char },
    MissingFractionDigits { index: usize },
    TooManyFields,
    OutOfRange { field: Field, value: f64 },
    Overflow,
}

impl std::error::Error for TimestampParseError {}

impl fmt::Display for TimestampParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimestampParseError::Empty => write!(f, "timestamp cannot be empty"),
            TimestampParseError::ExpectedNumber { index, found } => match found {
                Some(ch) => write!(
                    f,
                    "expected a number at position {} but found '{}'",
                    index + 1,
                    ch
                ),
                None => write!(f, "expected a number at position {}", index + 1),
            },
            TimestampParseError::UnexpectedChar { index, found } => write!(
                f,
                "unexpected character '{}' at position {}",
                found,
                index + 1
            ),
            TimestampParseError::MissingFractionDigits { index } => write!(
                f,
                "expected digits after decimal point at position {}",
                index + 1
            ),
            TimestampParseError::TooManyFields => {
                write!(f, "timestamps have at most three fields (hours:minutes:seconds)")
            }
            TimestampParseError::OutOfRange { field, value } => {
                write!(f, "{} must be below 60, got {}", field.name(), value)
            }
            TimestampParseError::Overflow => write!(f, "timestamp component is too large"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Field {
    Hours,
    Minutes,
    Seconds,
}

impl Field {
    fn seconds(self) -> f64 {
        match self {
            Field::Hours => 3_600.0,
            Field::Minutes => 60.0,
            Field::Seconds => 1.0,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Field::Hours => "hours",
            Field::Minutes => "minutes",
            Field::Seconds => "seconds",
        }
    }
}
