use clap::{Parser, Subcommand};

use crate::download::types::{DownloadRequest, UserId};

#[derive(Parser)]
#[command(name = "vidfetch")]
#[command(author, version, about = "Resolve YouTube, TikTok and Instagram links into local video files", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read links from stdin (one per line, optionally prefixed with a user id)
    /// and resolve them on the worker pool
    Run {
        /// Keep delivered files instead of releasing them once reported
        #[arg(long)]
        keep: bool,
    },

    /// Resolve a single link and print where the file landed
    Download {
        /// Link or message text containing a link
        text: String,

        /// Requesting user id, used to find their YouTube cookies
        #[arg(short, long)]
        user: Option<UserId>,

        /// Delete the file after reporting it
        #[arg(long)]
        discard: bool,
    },

    /// Print which platform a link belongs to and the providers that would be tried
    Classify {
        /// Link to classify
        url: String,
    },

    /// Manage per-user YouTube cookie jars
    Cookies {
        #[command(subcommand)]
        action: CookiesAction,
    },

    /// Remove abandoned files from the scratch directory
    Sweep {
        /// Minimum age in minutes for a file to be removed
        #[arg(long, default_value_t = 60)]
        max_age_mins: u64,
    },

    /// Check that yt-dlp is installed and print its version
    CheckYtdlp,
}

#[derive(Subcommand)]
pub enum CookiesAction {
    /// Store a Netscape cookie export for a user
    Set {
        user: UserId,
        /// Path to the cookies.txt export
        path: String,
    },

    /// Store a base64-encoded cookie export for a user
    SetBase64 { user: UserId, data: String },

    /// Delete a user's cookies
    Delete { user: UserId },

    /// Show cookie counts for a user (never values)
    Show { user: UserId },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Parses one `run` input line: `[user_id] text with a link`.
pub fn parse_request_line(line: &str) -> Option<DownloadRequest> {
    let line = line.trim();
    let (owner, text) = match line.split_once(char::is_whitespace) {
        Some((first, rest)) => match first.parse::<UserId>() {
            Ok(id) => (Some(id), rest),
            Err(_) => (None, line),
        },
        None => (None, line),
    };
    DownloadRequest::from_text(text, owner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::platform::PlatformKind;

    #[test]
    fn test_parse_request_line_with_user() {
        let req = parse_request_line("42 look https://youtu.be/abc").unwrap();
        assert_eq!(req.owner, Some(42));
        assert_eq!(req.source_url, "https://youtu.be/abc");
        assert_eq!(req.platform, PlatformKind::YouTube);
    }

    #[test]
    fn test_parse_request_line_without_user() {
        let req = parse_request_line("  https://www.instagram.com/reel/C1/  ").unwrap();
        assert_eq!(req.owner, None);
        assert_eq!(req.platform, PlatformKind::Instagram);
    }

    #[test]
    fn test_parse_request_line_without_link() {
        assert!(parse_request_line("").is_none());
        assert!(parse_request_line("7 no link here").is_none());
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["vidfetch", "download", "https://vm.tiktok.com/x", "--user", "5"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Download { user: Some(5), discard: false, .. })
        ));

        let cli = Cli::try_parse_from(["vidfetch", "run"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Run { keep: false })));

        let cli = Cli::try_parse_from(["vidfetch", "run", "--keep"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Run { keep: true })));

        let cli = Cli::try_parse_from(["vidfetch", "sweep"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Sweep { max_age_mins: 60 })));

        let cli = Cli::try_parse_from(["vidfetch", "cookies", "delete", "9"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Commands::Cookies {
                action: CookiesAction::Delete { user: 9 }
            })
        ));
    }
}
