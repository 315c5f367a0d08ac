mod cli;

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use albumsplit_core::{
    plan_segments, run_with_progress, source_duration, Config, ProbeBackend, ProgressEvent,
};
use anyhow::{anyhow, Context};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use log::info;

use crate::cli::build_cli;
use crate::cli::timestamp::format_timestamp;
use crate::cli::tracklist::parse_tracklist;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let matches = build_cli().get_matches();

    let input_path = matches
        .get_one::<PathBuf>("file_path")
        .expect("required argument");
    if !input_path.is_file() {
        return Err(anyhow!(
            "input file does not exist: {}",
            input_path.display()
        ));
    }

    let tracklist_path = matches
        .get_one::<PathBuf>("tracks")
        .expect("required argument");
    let listing = fs::read_to_string(tracklist_path)
        .with_context(|| format!("failed to read track list '{}'", tracklist_path.display()))?;
    let tracks = parse_tracklist(&listing)
        .with_context(|| format!("failed to parse track list '{}'", tracklist_path.display()))?;

    let output_dir = matches
        .get_one::<PathBuf>("output")
        .expect("defaulted argument");
    let format = matches
        .get_one::<String>("format")
        .expect("defaulted argument");
    let ffmpeg = matches
        .get_one::<String>("ffmpeg")
        .expect("defaulted argument");
    let ffprobe = matches
        .get_one::<String>("ffprobe")
        .expect("defaulted argument");
    let probe_backend = if matches.get_flag("native-probe") {
        ProbeBackend::Native
    } else {
        ProbeBackend::Ffprobe
    };
    let dry_run = matches.get_flag("dry-run");

    let mut builder = Config::builder(input_path, output_dir, tracks)
        .extension(format.as_str())
        .validate(!matches.get_flag("no-validate"))
        .probe_backend(probe_backend)
        .ffmpeg_program(ffmpeg.as_str())
        .ffprobe_program(ffprobe.as_str());
    if let Some(duration) = matches.get_one::<f64>("duration") {
        builder = builder.duration(*duration);
    }
    let config = builder.build().with_context(|| {
        format!(
            "failed to create configuration for '{}'",
            input_path.display()
        )
    })?;

    if dry_run {
        let duration = source_duration(&config, &*config.duration_probe())
            .with_context(|| format!("failed to read the length of '{}'", input_path.display()))?;
        let plan = plan_segments(&config, duration)
            .with_context(|| format!("failed to plan tracks for '{}'", input_path.display()))?;

        println!("Dry run: would generate {} track(s):", plan.len());
        for segment in plan {
            println!(
                "  {}  [{} - {}]",
                segment.output_path.display(),
                format_timestamp(segment.start),
                format_timestamp(segment.end)
            );
        }

        return Ok(());
    }

    let progress = ProgressBar::new_spinner();
    progress.set_draw_target(ProgressDrawTarget::stderr());
    let spinner_style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    progress.set_style(spinner_style);
    progress.enable_steady_tick(Duration::from_millis(100));

    let progress_handle = progress.clone();
    let mut planned = 0usize;
    let result = run_with_progress(config, &mut |event: ProgressEvent| match event {
        ProgressEvent::Probed { duration } => {
            progress_handle.set_message(format!("Source length {}", format_timestamp(duration)));
        }
        ProgressEvent::Planned { segments } => {
            planned = segments;
        }
        ProgressEvent::Executing { command } => {
            info!("running command: {command}");
            progress_handle.set_message(format!("Splitting into {planned} track(s)"));
        }
        ProgressEvent::Finished { .. } => {
            progress_handle.set_message(String::from("Completed"));
        }
    })
    .with_context(|| format!("failed to split '{}'", input_path.display()));

    progress.finish_and_clear();

    for path in result? {
        println!("{}", path.display());
    }

    Ok(())
}
