//! Split a continuous recording into per-track files.
//!
//! [`plan()`] turns start markers into contiguous `[start, end)` windows with
//! ordered, filesystem-safe names; [`extract()`] hands the whole plan to ffmpeg
//! in a single stream-copy invocation.

mod extract;
mod plan;
mod probe;

use std::path::{Path, PathBuf};

use log::info;
use symphonia::core::errors::Error as SymphoniaError;
use thiserror::Error;

pub use crate::extract::{
    ensure_directory, extract, prepare_directories, Encoder, ExtractionRequest, FfmpegEncoder,
    OutputSpec, GLOBAL_OPTIONS,
};
pub use crate::plan::{
    file_name, pad_width, plan, sanitize_title, validate_tracks, Segment, Track,
    FORBIDDEN_CHARS, MAX_FILE_NAME_CHARS,
};
pub use crate::probe::{parse_duration_output, DurationProbe, FfprobeProbe, SymphoniaProbe};

/// Errors that can occur while splitting audio files.
#[derive(Debug, Error)]
pub enum AudioSplitError {
    /// The source file does not exist.
    #[error("input file does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    /// A track does not start after the one before it.
    #[error("track {} starts at {start}s, not after the previous track at {previous}s", .index + 1)]
    UnorderedTracks {
        index: usize,
        previous: f64,
        start: f64,
    },

    /// A track starts at or past the end of the source.
    #[error("track {} starts at {start}s, past the end of the {duration}s source", .index + 1)]
    TrackOutOfRange {
        index: usize,
        start: f64,
        duration: f64,
    },

    /// The source duration is negative or not a finite number.
    #[error("source duration of {duration}s is not a usable length")]
    InvalidDuration { duration: f64 },

    /// A start offset is negative or not a number.
    #[error("track {} has an invalid start offset of {start}s", .index + 1)]
    InvalidTimestamp { index: usize, start: f64 },

    /// The duration of the source could not be determined.
    #[error("failed to probe the duration of the source: {0}")]
    Probe(#[source] ToolError),

    /// The encoder failed; files it already wrote are left in place.
    #[error("failed to split the source file: {0}")]
    Extraction(#[source] ToolError),

    /// A destination directory could not be created.
    #[error("failed to create directory '{}': {source}", .path.display())]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures reported by an external tool or decoder.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The program could not be started.
    #[error("failed to run {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The program ran but did not succeed; `stderr` holds its diagnostics.
    #[error("{program} exited with {}: {stderr}", exit_label(.code))]
    Exited {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The probe printed something other than a number of seconds.
    #[error("expected a duration in seconds, got {0:?}")]
    InvalidDuration(String),

    /// Wrapper around errors produced by the Symphonia decoding library.
    #[error(transparent)]
    Decode(#[from] SymphoniaError),

    /// The input lacks something the native probe needs to compute a length.
    #[error("{0}")]
    Unsupported(&'static str),
}

impl ToolError {
    pub(crate) fn exited(program: &str, code: Option<i32>, stderr: &[u8]) -> Self {
        let stderr = String::from_utf8_lossy(stderr).trim().to_owned();
        Self::Exited {
            program: program.to_owned(),
            code,
            stderr: if stderr.is_empty() {
                String::from("no diagnostic output")
            } else {
                stderr
            },
        }
    }
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => String::from("a signal"),
    }
}

/// Progress notifications emitted while a split runs.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// The source duration is known, in seconds.
    Probed { duration: f64 },
    /// The plan has been computed.
    Planned { segments: usize },
    /// The encoder is about to run with this command line.
    Executing { command: String },
    /// The encoder completed and wrote this many files.
    Finished { outputs: usize },
}

/// Observer for [`ProgressEvent`]s. Closures taking an event implement it too.
pub trait ProgressReporter {
    fn report(&mut self, _event: ProgressEvent) {}
}

/// Reporter that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {}

impl<F> ProgressReporter for F
where
    F: FnMut(ProgressEvent),
{
    fn report(&mut self, event: ProgressEvent) {
        self(event)
    }
}

/// Where the source duration comes from when the caller does not supply it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProbeBackend {
    /// Spawn `ffprobe`.
    #[default]
    Ffprobe,
    /// Read the container in-process with Symphonia.
    Native,
}

/// Configuration for a split run.
#[derive(Clone, Debug)]
pub struct Config {
    /// Source recording.
    pub input_path: PathBuf,
    /// Directory the track files are written to.
    pub output_dir: PathBuf,
    /// Start markers in playback order.
    pub tracks: Vec<Track>,
    /// Extension of the produced files; also selects the output container.
    pub extension: String,
    /// Known source duration in seconds, which skips probing.
    pub duration: Option<f64>,
    /// Reject unordered or out-of-range start markers before planning.
    pub validate: bool,
    pub probe_backend: ProbeBackend,
    pub ffmpeg_program: String,
    pub ffprobe_program: String,
}

impl Config {
    /// Construct a [`Config`] with default options.
    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(
        input: P,
        output: Q,
        tracks: Vec<Track>,
    ) -> Result<Self, AudioSplitError> {
        Self::builder(input, output, tracks).build()
    }

    pub fn builder<P: AsRef<Path>, Q: AsRef<Path>>(
        input: P,
        output: Q,
        tracks: Vec<Track>,
    ) -> ConfigBuilder {
        ConfigBuilder {
            input_path: input.as_ref().to_path_buf(),
            output_dir: output.as_ref().to_path_buf(),
            tracks,
            extension: String::from("flac"),
            duration: None,
            validate: true,
            probe_backend: ProbeBackend::default(),
            ffmpeg_program: String::from("ffmpeg"),
            ffprobe_program: String::from("ffprobe"),
        }
    }

    /// The probe selected by [`Config::probe_backend`].
    pub fn duration_probe(&self) -> Box<dyn DurationProbe> {
        match self.probe_backend {
            ProbeBackend::Ffprobe => Box::new(FfprobeProbe::new(self.ffprobe_program.clone())),
            ProbeBackend::Native => Box::new(SymphoniaProbe),
        }
    }
}

/// Builder for [`Config`].
#[derive(Clone, Debug)]
pub struct ConfigBuilder {
    input_path: PathBuf,
    output_dir: PathBuf,
    tracks: Vec<Track>,
    extension: String,
    duration: Option<f64>,
    validate: bool,
    probe_backend: ProbeBackend,
    ffmpeg_program: String,
    ffprobe_program: String,
}

impl ConfigBuilder {
    pub fn extension<S: Into<String>>(mut self, extension: S) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn duration(mut self, seconds: f64) -> Self {
        self.duration = Some(seconds);
        self
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn probe_backend(mut self, backend: ProbeBackend) -> Self {
        self.probe_backend = backend;
        self
    }

    pub fn ffmpeg_program<S: Into<String>>(mut self, program: S) -> Self {
        self.ffmpeg_program = program.into();
        self
    }

    pub fn ffprobe_program<S: Into<String>>(mut self, program: S) -> Self {
        self.ffprobe_program = program.into();
        self
    }

    pub fn build(self) -> Result<Config, AudioSplitError> {
        if !self.input_path.is_file() {
            return Err(AudioSplitError::MissingInput(self.input_path));
        }

        Ok(Config {
            input_path: self.input_path,
            output_dir: self.output_dir,
            tracks: self.tracks,
            extension: self.extension,
            duration: self.duration,
            validate: self.validate,
            probe_backend: self.probe_backend,
            ffmpeg_program: self.ffmpeg_program,
            ffprobe_program: self.ffprobe_program,
        })
    }
}

/// Plan the output files for `config` given the source duration.
pub fn plan_segments(config: &Config, source_duration: f64) -> Result<Vec<Segment>, AudioSplitError> {
    if config.validate {
        validate_tracks(&config.tracks, source_duration)?;
    }

    Ok(plan(
        &config.tracks,
        source_duration,
        &config.output_dir,
        &config.extension,
    ))
}

/// Resolve the source duration, probing only when the config does not carry one.
pub fn source_duration<P>(config: &Config, probe: &P) -> Result<f64, AudioSplitError>
where
    P: DurationProbe + ?Sized,
{
    match config.duration {
        Some(duration) => Ok(duration),
        None => probe
            .duration(&config.input_path)
            .map_err(AudioSplitError::Probe),
    }
}

/// Split the source described by `config` with ffmpeg.
pub fn run(config: Config) -> Result<Vec<PathBuf>, AudioSplitError> {
    run_with_progress(config, &mut NoProgress)
}

/// Like [`run`], reporting progress to `reporter`.
pub fn run_with_progress<R>(config: Config, reporter: &mut R) -> Result<Vec<PathBuf>, AudioSplitError>
where
    R: ProgressReporter + ?Sized,
{
    let probe = config.duration_probe();
    let encoder = FfmpegEncoder::new(config.ffmpeg_program.clone());
    run_with(config, &*probe, &encoder, reporter)
}

/// Run a split with explicit probe and encoder implementations.
///
/// An empty track list is a no-op: nothing is probed, created or encoded.
pub fn run_with<P, E, R>(
    config: Config,
    probe: &P,
    encoder: &E,
    reporter: &mut R,
) -> Result<Vec<PathBuf>, AudioSplitError>
where
    P: DurationProbe + ?Sized,
    E: Encoder + ?Sized,
    R: ProgressReporter + ?Sized,
{
    if config.tracks.is_empty() {
        info!("no tracks given for '{}'", config.input_path.display());
        return Ok(Vec::new());
    }

    ensure_directory(&config.output_dir)?;

    let duration = source_duration(&config, probe)?;
    reporter.report(ProgressEvent::Probed { duration });

    let segments = plan_segments(&config, duration)?;
    info!(
        "splitting '{}' ({duration}s) into {} track(s)",
        config.input_path.display(),
        segments.len()
    );
    reporter.report(ProgressEvent::Planned {
        segments: segments.len(),
    });

    extract(&config.input_path, &segments, encoder, reporter)
}
