use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};

use log::debug;
use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;

use crate::ToolError;

/// Looks up the total duration of a media file, in seconds.
pub trait DurationProbe {
    fn duration(&self, source: &Path) -> Result<f64, ToolError>;
}

/// Asks `ffprobe` for the container duration.
#[derive(Clone, Debug)]
pub struct FfprobeProbe {
    program: String,
}

impl FfprobeProbe {
    pub fn new<S: Into<String>>(program: S) -> Self {
        Self {
            program: program.into(),
        }
    }
}

impl Default for FfprobeProbe {
    fn default() -> Self {
        Self::new("ffprobe")
    }
}

impl DurationProbe for FfprobeProbe {
    fn duration(&self, source: &Path) -> Result<f64, ToolError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(["-v", "quiet", "-show_entries", "format=duration", "-of", "csv=p=0"])
            .arg(source)
            .stdin(Stdio::null());

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

        parse_duration_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// Parse the single number printed by the probe.
pub fn parse_duration_output(text: &str) -> Result<f64, ToolError> {
    let trimmed = text.trim();
    match trimmed.parse::<f64>() {
        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(seconds),
        _ => Err(ToolError::InvalidDuration(trimmed.to_owned())),
    }
}

/// Reads the duration from the container's default track with Symphonia,
/// without spawning a process.
#[derive(Clone, Copy, Debug, Default)]
pub struct SymphoniaProbe;

impl DurationProbe for SymphoniaProbe {
    fn duration(&self, source: &Path) -> Result<f64, ToolError> {
        let mut hint = Hint::new();
        if let Some(extension) = source.extension().and_then(|ext| ext.to_str()) {
            hint.with_extension(extension);
        }

        let file = File::open(source).map_err(|err| ToolError::Decode(err.into()))?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let probed = get_probe().format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )?;
        let reader = probed.format;

        let track = reader
            .default_track()
            .ok_or(ToolError::Unsupported("input stream does not provide a default track"))?;
        if track.codec_params.codec == CODEC_TYPE_NULL {
            return Err(ToolError::Unsupported("unsupported codec"));
        }

        let params = &track.codec_params;
        let frames = params
            .n_frames
            .ok_or(ToolError::Unsupported("input stream does not report its length"))?;

        if let Some(time_base) = params.time_base {
            let time = time_base.calc_time(frames);
            return Ok(time.seconds as f64 + time.frac);
        }

        let sample_rate = params
            .sample_rate
            .ok_or(ToolError::Unsupported("input stream does not advertise a sample rate"))?;

        Ok(frames as f64 / f64::from(sample_rate))
    }
}
