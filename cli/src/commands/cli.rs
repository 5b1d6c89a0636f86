use std::path::PathBuf;

use clap::Parser;

/// Run a command or transfer a file on every selected zone or compute node.
///
/// Select targets with --all-zones, or with any combination of --zonename,
/// --service and --compute-node (a zone must match every kind of filter
/// given). With --global-zone the operation runs once on each compute node
/// hosting a selected zone instead of inside the zones.
#[derive(Parser, Debug, Clone)]
#[command(name = "oneach", version)]
pub struct Args {
    /// Select every zone (except disallowed services).
    #[arg(short = 'a', long = "all-zones")]
    pub all_zones: bool,

    /// Select zones by name. Repeatable; comma-separated lists accepted.
    #[arg(
        short = 'z',
        long = "zonename",
        value_delimiter = ',',
        action = clap::ArgAction::Append
    )]
    pub zonenames: Vec<String>,

    /// Select zones by service name.
    #[arg(
        short = 's',
        long = "service",
        value_delimiter = ',',
        action = clap::ArgAction::Append
    )]
    pub services: Vec<String>,

    /// Select zones on compute nodes, by server UUID or hostname.
    #[arg(
        short = 'S',
        long = "compute-node",
        value_delimiter = ',',
        action = clap::ArgAction::Append
    )]
    pub compute_nodes: Vec<String>,

    /// Operate on the global zone of each compute node hosting a selected zone.
    #[arg(short = 'G', long = "global-zone")]
    pub global_zone: bool,

    /// Report what would be done without doing it.
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Omit the column header and the summary line.
    #[arg(short = 'N', long = "omit-header")]
    pub omit_header: bool,

    /// Print results as they arrive instead of sorted at the end.
    #[arg(short = 'I', long = "immediate")]
    pub immediate: bool,

    /// Print one JSON object per result.
    #[arg(short = 'J', long = "jsonstream", conflicts_with_all = ["oneline", "multiline"])]
    pub jsonstream: bool,

    /// Print only the last line of output for each target.
    #[arg(short = '1', long = "oneline", conflicts_with = "multiline")]
    pub oneline: bool,

    /// Print all output for each target under a banner.
    #[arg(long = "multiline")]
    pub multiline: bool,

    /// Seconds to wait for each operation.
    #[arg(short = 'T', long = "exectimeout")]
    pub exec_timeout: Option<u64>,

    /// Maximum number of operations in flight.
    #[arg(short = 'c', long = "concurrency")]
    pub concurrency: Option<usize>,

    /// Fetch this file from each target into --dir.
    #[arg(short = 'g', long = "get", conflicts_with = "put")]
    pub get: Option<String>,

    /// Send this local file to --dir on each target.
    #[arg(short = 'p', long = "put")]
    pub put: Option<PathBuf>,

    /// Local directory for --get, remote directory for --put.
    #[arg(short = 'd', long = "dir")]
    pub dir: Option<String>,

    /// Overwrite existing remote files with --put.
    #[arg(short = 'X', long = "clobber", requires = "put")]
    pub clobber: bool,

    /// Local address remote hosts should use for transfers.
    #[arg(long = "bind-ip")]
    pub bind_ip: Option<String>,

    /// Read configuration from this file instead of the default locations.
    #[arg(long = "config")]
    pub config: Option<PathBuf>,

    /// Command to run on each target.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub command: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_scope_and_trailing_command() {
        let args = Args::try_parse_from([
            "oneach", "-s", "webapi,moray", "-z", "z1", "-G", "-1", "svcs", "-x",
        ])
        .unwrap();
        assert_eq!(args.services, vec!["webapi", "moray"]);
        assert_eq!(args.zonenames, vec!["z1"]);
        assert!(args.global_zone);
        assert!(args.oneline);
        assert_eq!(args.command, vec!["svcs", "-x"]);
    }

    #[test]
    fn test_conflicting_output_flags_are_rejected() {
        assert!(Args::try_parse_from(["oneach", "-a", "-1", "--multiline", "true"]).is_err());
        assert!(Args::try_parse_from(["oneach", "-a", "-J", "-1", "true"]).is_err());
        assert!(Args::try_parse_from(["oneach", "-a", "-X", "true"]).is_err());
    }
}
