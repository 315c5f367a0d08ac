pub mod timestamp;
pub mod tracklist;

use std::path::PathBuf;

use clap::{builder::ValueParser, value_parser, Arg, ArgAction, Command};

use self::timestamp::parse_timestamp;

pub const DEFAULT_FORMAT: &str = "flac";

pub fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .author(env!("CARGO_PKG_AUTHORS"))
        .about("Split a continuous album recording into per-track files")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("tracks")
                .short('t')
                .long("tracks")
                .value_name("TRACKLIST")
                .help("Text file with one '<start> <title>' line per track (e.g. '3:25 Song A')")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("OUTPUT_DIR")
                .help("Directory where the split tracks will be written")
                .default_value(".")
                .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("format")
                .short('f')
                .long("format")
                .value_name("EXTENSION")
                .help("Extension of the produced files; the audio stream is copied, not re-encoded")
                .default_value(DEFAULT_FORMAT),
        )
        .arg(
            Arg::new("duration")
                .long("duration")
                .value_name("TIMESTAMP")
                .help("Total length of the source (e.g. 42:17.5); probed when omitted")
                .value_parser(ValueParser::new(parse_timestamp)),
        )
        .arg(
            Arg::new("native-probe")
                .long("native-probe")
                .help("Read the source length in-process instead of running ffprobe")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-validate")
                .long("no-validate")
                .help("Pass unordered or out-of-range track starts through to ffmpeg")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("ffmpeg")
                .long("ffmpeg")
                .value_name("PROGRAM")
                .help("ffmpeg executable used for extraction")
                .default_value("ffmpeg"),
        )
        .arg(
            Arg::new("ffprobe")
                .long("ffprobe")
                .value_name("PROGRAM")
                .help("ffprobe executable used to read the source length")
                .default_value("ffprobe"),
        )
        .arg(
            Arg::new("dry-run")
                .long("dry-run")
                .help("Preview the planned tracks without writing files")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("file_path")
                .value_name("FILE_PATH")
                .help("Path to the input audio file")
                .required(true)
                .value_parser(value_parser!(PathBuf)),
        )
}
