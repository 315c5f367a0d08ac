use albumsplit_core::{
    prepare_directories, run, run_with, AudioSplitError, Config, DurationProbe, Encoder,
    ExtractionRequest, NoProgress, ProbeBackend, ProgressEvent, Segment, SymphoniaProbe,
    ToolError, Track,
};
use std::cell::RefCell;
use std::error::Error;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Generate a small single-channel WAV file at runtime.
///
/// The fixture is synthesised procedurally so that no binary test assets need
/// to be stored in the repository.
fn write_test_tone<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    duration_ms: u64,
) -> Result<(), Box<dyn Error>> {
    let total_samples = sample_rate as u64 * duration_ms / 1_000;
    let mut samples = Vec::with_capacity(total_samples as usize * 2);

    for n in 0..total_samples {
        let theta = (n as f32 / sample_rate as f32) * 2.0 * std::f32::consts::PI * 440.0;
        let sample = (theta.sin() * i16::MAX as f32) as i16;
        samples.extend_from_slice(&sample.to_le_bytes());
    }

    let mut file = File::create(path)?;
    let data_len = samples.len() as u32;
    let chunk_size = 36u32 + data_len;
    file.write_all(b"RIFF")?;
    file.write_all(&chunk_size.to_le_bytes())?;
    file.write_all(b"WAVE")?;
    file.write_all(b"fmt ")?;
    file.write_all(&16u32.to_le_bytes())?;
    file.write_all(&1u16.to_le_bytes())?;
    file.write_all(&1u16.to_le_bytes())?;
    file.write_all(&sample_rate.to_le_bytes())?;
    let byte_rate = sample_rate * 2;
    file.write_all(&byte_rate.to_le_bytes())?;
    file.write_all(&2u16.to_le_bytes())?;
    file.write_all(&16u16.to_le_bytes())?;
    file.write_all(b"data")?;
    file.write_all(&data_len.to_le_bytes())?;
    file.write_all(&samples)?;
    Ok(())
}

fn album_tracks() -> Vec<Track> {
    vec![
        Track::new("Intro", 0.0),
        Track::new("Song A", 12.5),
        Track::new("Rock & Roll: Pt. 1/2", 80.0),
    ]
}

struct FixedProbe(f64);

impl DurationProbe for FixedProbe {
    fn duration(&self, _source: &Path) -> Result<f64, ToolError> {
        Ok(self.0)
    }
}

struct FailingProbe;

impl DurationProbe for FailingProbe {
    fn duration(&self, _source: &Path) -> Result<f64, ToolError> {
        Err(ToolError::InvalidDuration(String::from("N/A")))
    }
}

/// Records every request and optionally fails like a crashed encoder.
#[derive(Default)]
struct RecordingEncoder {
    requests: RefCell<Vec<ExtractionRequest>>,
    failure: Option<String>,
}

impl Encoder for RecordingEncoder {
    fn program(&self) -> &str {
        "ffmpeg"
    }

    fn encode(&self, request: &ExtractionRequest) -> Result<(), ToolError> {
        self.requests.borrow_mut().push(request.clone());
        match &self.failure {
            Some(stderr) => Err(ToolError::Exited {
                program: String::from("ffmpeg"),
                code: Some(1),
                stderr: stderr.clone(),
            }),
            None => Ok(()),
        }
    }
}

#[test]
fn run_invokes_encoder_once_for_all_tracks() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("album.flac");
    File::create(&input_path)?;
    let output_dir = work_dir.path().join("out").join("nested");

    let config = Config::new(&input_path, &output_dir, album_tracks())?;
    let encoder = RecordingEncoder::default();
    let mut events = Vec::new();

    let outputs = run_with(config, &FixedProbe(200.0), &encoder, &mut |event: ProgressEvent| {
        events.push(event)
    })?;

    assert_eq!(
        outputs,
        vec![
            output_dir.join("1 Intro.flac"),
            output_dir.join("2 Song A.flac"),
            output_dir.join("3 Rock & Roll Pt. 12.flac"),
        ]
    );
    assert!(output_dir.is_dir());

    let requests = encoder.requests.borrow();
    assert_eq!(requests.len(), 1, "all tracks must go through one invocation");
    let request = &requests[0];
    assert_eq!(request.input, input_path);
    let windows: Vec<(f64, f64)> = request.outputs.iter().map(|o| (o.start, o.end)).collect();
    assert_eq!(windows, vec![(0.0, 12.5), (12.5, 80.0), (80.0, 200.0)]);

    assert_eq!(events.first(), Some(&ProgressEvent::Probed { duration: 200.0 }));
    assert!(events.contains(&ProgressEvent::Planned { segments: 3 }));
    assert!(events
        .iter()
        .any(|e| matches!(e, ProgressEvent::Executing { command } if command.starts_with("ffmpeg -y"))));
    assert_eq!(events.last(), Some(&ProgressEvent::Finished { outputs: 3 }));

    work_dir.close()?;
    Ok(())
}

#[test]
fn supplied_duration_skips_the_probe() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("album.flac");
    File::create(&input_path)?;

    let config = Config::builder(&input_path, work_dir.path(), album_tracks())
        .duration(95.0)
        .extension("ogg")
        .build()?;
    let encoder = RecordingEncoder::default();

    let outputs = run_with(config, &FailingProbe, &encoder, &mut NoProgress)?;
    assert_eq!(outputs[0], work_dir.path().join("1 Intro.ogg"));
    assert_eq!(encoder.requests.borrow()[0].outputs[2].end, 95.0);

    work_dir.close()?;
    Ok(())
}

#[test]
fn encoder_failure_preserves_the_diagnostic() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("album.flac");
    File::create(&input_path)?;

    let config = Config::new(&input_path, work_dir.path(), album_tracks())?;
    let encoder = RecordingEncoder {
        failure: Some(String::from("album.flac: Invalid data found when processing input")),
        ..RecordingEncoder::default()
    };

    let err = run_with(config, &FixedProbe(200.0), &encoder, &mut NoProgress)
        .expect_err("encoder failure should be reported");

    assert!(matches!(err, AudioSplitError::Extraction(_)));
    assert!(err
        .to_string()
        .contains("Invalid data found when processing input"));
    let cause = err.source().expect("extraction failure keeps its cause");
    assert!(cause.to_string().contains("exited with status 1"));
    assert_eq!(encoder.requests.borrow().len(), 1, "failures are not retried");

    work_dir.close()?;
    Ok(())
}

#[test]
fn probe_failure_stops_before_encoding() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("album.flac");
    File::create(&input_path)?;

    let config = Config::new(&input_path, work_dir.path(), album_tracks())?;
    let encoder = RecordingEncoder::default();

    let err = run_with(config, &FailingProbe, &encoder, &mut NoProgress)
        .expect_err("probe failure should be reported");
    assert!(matches!(err, AudioSplitError::Probe(ToolError::InvalidDuration(_))));
    assert!(encoder.requests.borrow().is_empty());

    work_dir.close()?;
    Ok(())
}

#[test]
fn empty_track_list_is_a_no_op() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("album.flac");
    File::create(&input_path)?;
    let output_dir = work_dir.path().join("never");

    let config = Config::new(&input_path, &output_dir, Vec::new())?;
    let encoder = RecordingEncoder::default();

    let outputs = run_with(config, &FailingProbe, &encoder, &mut NoProgress)?;
    assert!(outputs.is_empty());
    assert!(encoder.requests.borrow().is_empty());
    assert!(!output_dir.exists());

    work_dir.close()?;
    Ok(())
}

#[test]
fn validation_rejects_tracks_past_the_end() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("album.flac");
    File::create(&input_path)?;

    let config = Config::new(&input_path, work_dir.path(), album_tracks())?;
    let encoder = RecordingEncoder::default();

    let err = run_with(config, &FixedProbe(60.0), &encoder, &mut NoProgress)
        .expect_err("track past the end should be rejected");
    assert!(matches!(err, AudioSplitError::TrackOutOfRange { index: 2, .. }));
    assert!(encoder.requests.borrow().is_empty());

    work_dir.close()?;
    Ok(())
}

#[test]
fn disabled_validation_passes_markers_through() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("album.flac");
    File::create(&input_path)?;

    let tracks = vec![Track::new("B", 30.0), Track::new("A", 10.0)];
    let config = Config::builder(&input_path, work_dir.path(), tracks)
        .validate(false)
        .build()?;
    let encoder = RecordingEncoder::default();

    run_with(config, &FixedProbe(60.0), &encoder, &mut NoProgress)?;
    let requests = encoder.requests.borrow();
    assert_eq!(requests[0].outputs[0].start, 30.0);
    assert_eq!(requests[0].outputs[0].end, 10.0);

    work_dir.close()?;
    Ok(())
}

#[test]
fn config_rejects_missing_input() {
    let err = Config::new("does/not/exist.flac", "out", album_tracks())
        .expect_err("missing input should be rejected");
    match err {
        AudioSplitError::MissingInput(path) => {
            assert_eq!(path, PathBuf::from("does/not/exist.flac"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn preparing_directories_twice_is_harmless() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let dir = work_dir.path().join("a").join("b");
    let plan = vec![
        Segment {
            output_path: dir.join("1 x.flac"),
            start: 0.0,
            end: 1.0,
        },
        Segment {
            output_path: dir.join("2 y.flac"),
            start: 1.0,
            end: 2.0,
        },
    ];

    prepare_directories(&plan)?;
    prepare_directories(&plan)?;
    assert!(dir.is_dir());
    assert_eq!(fs::read_dir(work_dir.path().join("a"))?.count(), 1);

    work_dir.close()?;
    Ok(())
}

#[test]
fn directory_creation_failure_is_reported() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let blocker = work_dir.path().join("file");
    File::create(&blocker)?;
    let plan = vec![Segment {
        output_path: blocker.join("sub").join("1 x.flac"),
        start: 0.0,
        end: 1.0,
    }];

    let err = prepare_directories(&plan).expect_err("a file blocks the directory");
    assert!(matches!(err, AudioSplitError::CreateDirectory { .. }));

    work_dir.close()?;
    Ok(())
}

#[test]
fn native_probe_reads_wav_duration() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("tone.wav");
    write_test_tone(&input_path, 8_000, 1_500)?;

    let duration = SymphoniaProbe.duration(&input_path)?;
    assert!((duration - 1.5).abs() < 1e-6, "unexpected duration {duration}");

    work_dir.close()?;
    Ok(())
}

#[test]
fn native_probe_rejects_unknown_input() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("input.bin");
    File::create(&input_path)?.write_all(b"not an audio file")?;

    assert!(SymphoniaProbe.duration(&input_path).is_err());

    work_dir.close()?;
    Ok(())
}

#[cfg(unix)]
#[test]
fn run_reports_failing_encoder_process() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("tone.wav");
    write_test_tone(&input_path, 8_000, 1_000)?;

    let config = Config::builder(&input_path, work_dir.path().join("out"), album_tracks())
        .duration(200.0)
        .ffmpeg_program("false")
        .build()?;

    let err = run(config).expect_err("`false` exits with a failure status");
    assert!(matches!(
        err,
        AudioSplitError::Extraction(ToolError::Exited { code: Some(1), .. })
    ));

    work_dir.close()?;
    Ok(())
}

#[cfg(unix)]
#[test]
fn run_returns_paths_from_successful_encoder_process() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("tone.wav");
    write_test_tone(&input_path, 8_000, 2_000)?;

    let tracks = vec![Track::new("One", 0.0), Track::new("Two", 1.0)];
    let config = Config::builder(&input_path, work_dir.path(), tracks)
        .probe_backend(ProbeBackend::Native)
        .extension("wav")
        .ffmpeg_program("true")
        .build()?;

    let outputs = run(config)?;
    assert_eq!(
        outputs,
        vec![
            work_dir.path().join("1 One.wav"),
            work_dir.path().join("2 Two.wav"),
        ]
    );

    work_dir.close()?;
    Ok(())
}

#[cfg(unix)]
#[test]
fn unparseable_probe_output_is_a_probe_failure() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("album.flac");
    File::create(&input_path)?;

    // `echo` prints its arguments instead of a number.
    let config = Config::builder(&input_path, work_dir.path(), album_tracks())
        .ffprobe_program("echo")
        .ffmpeg_program("true")
        .build()?;

    let err = run(config).expect_err("echo output is not a duration");
    assert!(matches!(
        err,
        AudioSplitError::Probe(ToolError::InvalidDuration(_))
    ));

    work_dir.close()?;
    Ok(())
}

#[test]
fn missing_encoder_program_is_a_spawn_failure() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("album.flac");
    File::create(&input_path)?;

    let config = Config::builder(&input_path, work_dir.path(), album_tracks())
        .duration(200.0)
        .ffmpeg_program("albumsplit-no-such-encoder")
        .build()?;

    let err = run(config).expect_err("missing program should fail to spawn");
    assert!(matches!(
        err,
        AudioSplitError::Extraction(ToolError::Spawn { .. })
    ));

    work_dir.close()?;
    Ok(())
}

#[test]
fn supplied_nan_duration_is_rejected_before_encoding() -> Result<(), Box<dyn Error>> {
    let work_dir = tempdir()?;
    let input_path = work_dir.path().join("album.flac");
    File::create(&input_path)?;

    let config = Config::builder(&input_path, work_dir.path(), album_tracks())
        .duration(f64::NAN)
        .build()?;
    let encoder = RecordingEncoder::default();

    let err = run_with(config, &FailingProbe, &encoder, &mut NoProgress)
        .expect_err("a NaN duration cannot bound the last track");
    assert!(matches!(err, AudioSplitError::InvalidDuration { .. }));
    assert!(encoder.requests.borrow().is_empty());

    work_dir.close()?;
    Ok(())
}
