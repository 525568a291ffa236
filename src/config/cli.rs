//! Command line surface

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;

use crate::geometry::Dimension;

/// Stream a framebuffer device over HTTP as multipart PNG frames
///
/// Every option left out falls back to the config file, then to the built-in
/// default.
#[derive(Parser, Debug, Clone, Default, PartialEq)]
#[command(name = "fbstream", version, about)]
pub struct CliArgs {
    /// External configuration file
    #[arg(short = 'c', long = "config-file", alias = "config_file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Turn on debug messaging
    #[arg(long)]
    pub debug: bool,

    /// Log level (off, error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<LevelFilter>,

    /// Framebuffer device name under /dev, or an absolute path [default: fb1]
    #[arg(short = 'd', long, value_name = "DEVICE")]
    pub device: Option<String>,

    /// Width of the framebuffer in pixels, or 'auto' [default: auto]
    #[arg(short = 'W', long, value_name = "PIXELS")]
    pub width: Option<Dimension>,

    /// Height of the framebuffer in pixels, or 'auto' [default: auto]
    #[arg(short = 'H', long, value_name = "PIXELS")]
    pub height: Option<Dimension>,

    /// Colour depth in bits per pixel, or 'auto' [default: auto]
    #[arg(short = 'D', long, value_name = "INT")]
    pub depth: Option<Dimension>,

    /// Minimum server threads [default: 1]
    #[arg(long = "minthreads", value_name = "INT")]
    pub min_threads: Option<usize>,

    /// Maximum concurrent streams [default: 4]
    #[arg(long = "maxthreads", value_name = "INT")]
    pub max_threads: Option<usize>,

    /// TCP port to listen on [default: 8808]
    #[arg(short = 'p', long, value_name = "PORT")]
    pub port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn short_flags_match_the_documented_surface() {
        let args = CliArgs::try_parse_from([
            "fbstream", "-c", "/tmp/fb.yaml", "-d", "fb0", "-W", "640", "-H", "auto", "-D", "16",
            "-p", "9000",
        ])
        .unwrap();

        assert_eq!(args.config_file, Some(PathBuf::from("/tmp/fb.yaml")));
        assert_eq!(args.device.as_deref(), Some("fb0"));
        assert_eq!(args.width, Some(Dimension::Explicit(640)));
        assert_eq!(args.height, Some(Dimension::Auto));
        assert_eq!(args.depth, Some(Dimension::Explicit(16)));
        assert_eq!(args.port, Some(9000));
        assert!(!args.debug);
    }

    #[test]
    fn long_flags_and_aliases() {
        let args = CliArgs::try_parse_from([
            "fbstream",
            "--config_file",
            "fb.yaml",
            "--debug",
            "--log-level",
            "warn",
            "--minthreads",
            "2",
            "--maxthreads",
            "8",
        ])
        .unwrap();

        assert_eq!(args.config_file, Some(PathBuf::from("fb.yaml")));
        assert!(args.debug);
        assert_eq!(args.log_level, Some(LevelFilter::WARN));
        assert_eq!((args.min_threads, args.max_threads), (Some(2), Some(8)));
    }

    #[test]
    fn omitted_flags_stay_unset() {
        let args = CliArgs::try_parse_from(["fbstream"]).unwrap();
        assert_eq!(args, CliArgs::default());
    }

    #[test]
    fn bad_dimensions_are_rejected() {
        assert!(CliArgs::try_parse_from(["fbstream", "-W", "wide"]).is_err());
        assert!(CliArgs::try_parse_from(["fbstream", "-H", "0"]).is_err());
        assert!(CliArgs::try_parse_from(["fbstream", "--minthreads", "-1"]).is_err());
    }
}
