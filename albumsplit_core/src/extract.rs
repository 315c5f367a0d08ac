use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use log::{debug, info};

use crate::plan::Segment;
use crate::{AudioSplitError, ProgressEvent, ProgressReporter, ToolError};

/// Options applied once, ahead of the input: overwrite outputs, keep only stats.
pub const GLOBAL_OPTIONS: [&str; 5] = ["-y", "-hide_banner", "-loglevel", "error", "-stats"];

/// One output of a multi-output extraction.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputSpec {
    pub path: PathBuf,
    /// Absolute offset into the source, in seconds.
    pub start: f64,
    /// Absolute offset into the source, in seconds.
    pub end: f64,
}

impl OutputSpec {
    fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-vn", "-c", "copy", "-ss"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.push(self.start.to_string().into());
        args.push("-to".into());
        args.push(self.end.to_string().into());
        args.push(self.path.clone().into_os_string());
        args
    }
}

/// A single encoder invocation: one input and every planned output.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtractionRequest {
    pub input: PathBuf,
    pub outputs: Vec<OutputSpec>,
}

impl ExtractionRequest {
    pub fn new<P: Into<PathBuf>>(input: P, plan: &[Segment]) -> Self {
        Self {
            input: input.into(),
            outputs: plan
                .iter()
                .map(|segment| OutputSpec {
                    path: segment.output_path.clone(),
                    start: segment.start,
                    end: segment.end,
                })
                .collect(),
        }
    }

    /// Encoder arguments, excluding the program name.
    pub fn args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = GLOBAL_OPTIONS.into_iter().map(OsString::from).collect();
        args.push("-i".into());
        args.push(self.input.clone().into_os_string());
        for output in &self.outputs {
            args.extend(output.args());
        }
        args
    }

    /// Printable command line for logs and progress output.
    pub fn command_line(&self, program: &str) -> String {
        let mut line = String::from(program);
        for arg in self.args() {
            line.push(' ');
            let arg = arg.to_string_lossy();
            if arg.is_empty() || arg.contains(|c: char| c.is_whitespace() || c == '"') {
                line.push('"');
                for c in arg.chars() {
                    if c == '"' || c == '\\' {
                        line.push('\\');
                    }
                    line.push(c);
                }
                line.push('"');
            } else {
                line.push_str(&arg);
            }
        }
        line
    }
}

/// The external facility that performs a multi-output extraction.
pub trait Encoder {
    /// Name shown in the command line handed to reporters.
    fn program(&self) -> &str;

    /// Run `request` to completion in a single invocation.
    fn encode(&self, request: &ExtractionRequest) -> Result<(), ToolError>;
}

/// [`Encoder`] backed by an `ffmpeg` executable.
#[derive(Clone, Debug)]
pub struct FfmpegEncoder {
    program: String,
}

impl FfmpegEncoder {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl Encoder for FfmpegEncoder {
    fn program(&self) -> &str {
        &self.program
    }

    fn encode(&self, request: &ExtractionRequest) -> Result<(), ToolError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(request.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        debug!("running {:?}", cmd);

        let output = cmd.output().map_err(|source| ToolError::Spawn {
            program: self.program.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(ToolError::exited(
                &self.program,
                output.status.code(),
                &output.stderr,
            ));
        }

        let stats = String::from_utf8_lossy(&output.stderr);
        if !stats.trim().is_empty() {
            debug!("{} finished: {}", self.program, stats.trim());
        }

        Ok(())
    }
}

/// Create every directory the plan writes into, parents included.
///
/// Existing directories are left alone, so repeated calls are harmless.
pub fn prepare_directories(plan: &[Segment]) -> Result<(), AudioSplitError> {
    let directories: BTreeSet<&Path> = plan
        .iter()
        .filter_map(|segment| segment.output_path.parent())
        .filter(|dir| !dir.as_os_str().is_empty())
        .collect();

    for dir in directories {
        ensure_directory(dir)?;
    }

    Ok(())
}

/// `mkdir -p` with the failing path attached to the error.
pub fn ensure_directory(dir: &Path) -> Result<(), AudioSplitError> {
    fs::create_dir_all(dir).map_err(|source| AudioSplitError::CreateDirectory {
        path: dir.to_path_buf(),
        source,
    })
}

/// Write every segment of `plan` from `source` with one encoder invocation.
///
/// Returns the output paths in plan order. Nothing is cleaned up when the
/// encoder fails; files it already wrote stay on disk.
pub fn extract<E, R>(
    source: &Path,
    plan: &[Segment],
    encoder: &E,
    reporter: &mut R,
) -> Result<Vec<PathBuf>, AudioSplitError>
where
    E: Encoder + ?Sized,
    R: ProgressReporter + ?Sized,
{
    if plan.is_empty() {
        return Ok(Vec::new());
    }

    prepare_directories(plan)?;

    let request = ExtractionRequest::new(source, plan);
    reporter.report(ProgressEvent::Executing {
        command: request.command_line(encoder.program()),
    });

    encoder
        .encode(&request)
        .map_err(AudioSplitError::Extraction)?;

    let outputs: Vec<PathBuf> = plan.iter().map(|s| s.output_path.clone()).collect();
    info!("wrote {} track(s) from '{}'", outputs.len(), source.display());
    reporter.report(ProgressEvent::Finished {
        outputs: outputs.len(),
    });

    Ok(outputs)
}
