use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// SAML federation metadata compliance statistics
#[derive(Parser, Debug)]
#[command(
    name = "fedcheck",
    subcommand_negates_reqs = true,
    args_conflicts_with_subcommands = true,
    version,
    about = "Privacy, security contact and SIRTFI statistics for SAML metadata",
    long_about = "Reads a SAML metadata aggregate and reports, globally and per federation, \
                  how many entities publish a privacy statement (SPs), a security contact \
                  and a SIRTFI certification. Optionally checks that every SP privacy \
                  statement URL is reachable.",
    after_help = "\
EXAMPLES:
  fedcheck edugain-v2.xml                          Statistics for an aggregate
  fedcheck --federations feds.json edugain.xml     Show federation display names
  fedcheck --validate --cache urls.json md.xml     Also check privacy statement URLs
  fedcheck -v --json md.xml                        Detail rows as JSON
  fedcheck check-urls https://sp.example.org/privacy

EXIT CODES:
  0  Analysis completed
  1  SP privacy coverage below --fail-under
  2  Tool failure (e.g., unreadable or malformed metadata)

CONFIG:
  Defaults may be set in .fedcheckrc (TOML), looked up in the working
  directory and then in $HOME. Command-line flags win."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// SAML metadata aggregate (XML)
    #[arg(value_name = "METADATA", required = true)]
    pub metadata: Option<PathBuf>,

    /// JSON file mapping registrationAuthority to federation display name
    #[arg(long, value_name = "FILE")]
    pub federations: Option<PathBuf>,

    /// Check that SP privacy statement URLs are reachable
    #[arg(long)]
    pub validate: bool,

    #[command(flatten)]
    pub network: NetworkArgs,

    /// JSON file of previous URL results, read before and written after validation
    #[arg(long, value_name = "FILE")]
    pub cache: Option<PathBuf>,

    /// Show per-entity detail rows
    #[arg(short, long)]
    pub verbose: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Exit 1 if fewer than PCT percent of SPs publish a privacy statement
    #[arg(long, value_name = "PCT")]
    pub fail_under: Option<f64>,
}

/// Options shared by every command that touches the network.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct NetworkArgs {
    /// Worker threads per validation batch
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,

    /// Maximum simultaneous network requests
    #[arg(long, value_name = "N")]
    pub max_in_flight: Option<usize>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Delay before every request, in milliseconds
    #[arg(long, value_name = "MS")]
    pub pacing_ms: Option<u64>,

    /// Retry bot-protected URLs once with a browser-style request
    #[arg(long)]
    pub retry_protected: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check URLs directly and print the results
    #[command(name = "check-urls")]
    CheckUrls {
        /// URLs to check
        #[arg(required = true, value_name = "URL")]
        urls: Vec<String>,

        #[command(flatten)]
        network: NetworkArgs,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_analysis_flags() {
        let cli = Cli::try_parse_from([
            "fedcheck",
            "--validate",
            "--workers",
            "8",
            "--fail-under",
            "75.5",
            "md.xml",
        ])
        .unwrap();
        assert!(cli.validate);
        assert_eq!(cli.network.workers, Some(8));
        assert_eq!(cli.fail_under, Some(75.5));
        assert_eq!(cli.metadata.as_deref(), Some(std::path::Path::new("md.xml")));
    }

    #[test]
    fn metadata_required_without_subcommand() {
        assert!(Cli::try_parse_from(["fedcheck"]).is_err());
        assert!(Cli::try_parse_from(["fedcheck", "completions", "bash"]).is_ok());
    }
}
