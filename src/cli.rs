//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Resolve music-track links and download the audio.
///
/// Links are read from the arguments, or from stdin one per line. A page URL
/// whose fragment carries a track link is accepted too.
#[derive(Parser, Debug)]
#[command(name = "trackgrab")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Resolution endpoint URL
    #[arg(long = "api", value_name = "URL")]
    pub api: Option<String>,

    /// Directory downloads are written to (browser host)
    #[arg(short = 'o', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Download host
    #[arg(long, value_enum)]
    pub host: Option<HostChoice>,

    /// Storage root for the shell host; files land in <DIR>/Download
    #[arg(long, value_name = "DIR")]
    pub storage_root: Option<PathBuf>,

    /// Resolve and print track details without downloading
    #[arg(long)]
    pub info: bool,

    /// Print resolved tracks as JSON
    #[arg(long)]
    pub json: bool,

    /// Reset the session after each link so repeats resolve again
    #[arg(long)]
    pub fresh: bool,

    /// Track links to process
    #[arg(value_name = "LINK")]
    pub links: Vec<String>,
}

/// Host selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HostChoice {
    /// Stream into the output directory
    Browser,
    /// Permission-checked transfer into <storage-root>/Download
    Shell,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["trackgrab"]).unwrap();
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(args.api.is_none());
        assert!(args.host.is_none());
        assert!(!args.info);
        assert!(!args.json);
        assert!(!args.fresh);
        assert!(args.links.is_empty());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["trackgrab", "-v"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["trackgrab", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["trackgrab", "--quiet"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        let err = Args::try_parse_from(["trackgrab", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag_shows_version() {
        let err = Args::try_parse_from(["trackgrab", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["trackgrab", "--invalid-flag"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_cli_host_values() {
        let args = Args::try_parse_from(["trackgrab", "--host", "shell"]).unwrap();
        assert_eq!(args.host, Some(HostChoice::Shell));
        let args = Args::try_parse_from(["trackgrab", "--host", "browser"]).unwrap();
        assert_eq!(args.host, Some(HostChoice::Browser));

        let err = Args::try_parse_from(["trackgrab", "--host", "desktop"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::InvalidValue);
    }

    #[test]
    fn test_cli_paths_and_endpoint() {
        let args = Args::try_parse_from([
            "trackgrab",
            "--api",
            "http://localhost:8080/api",
            "-o",
            "music",
            "--storage-root",
            "/sdcard",
        ])
        .unwrap();
        assert_eq!(args.api.as_deref(), Some("http://localhost:8080/api"));
        assert_eq!(args.output_dir, Some(PathBuf::from("music")));
        assert_eq!(args.storage_root, Some(PathBuf::from("/sdcard")));
    }

    #[test]
    fn test_cli_collects_links_and_flags() {
        let args = Args::try_parse_from([
            "trackgrab",
            "--info",
            "--json",
            "--fresh",
            "https://open.spotify.com/track/a",
            "spotify.link/track/b",
        ])
        .unwrap();
        assert!(args.info && args.json && args.fresh);
        assert_eq!(args.links.len(), 2);
    }
}
