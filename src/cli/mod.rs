//! CLI argument parsing and validation module
//!
//! Handles the command-line interface using clap, including:
//! - Root config file selection
//! - Verify / cache-write modes
//! - Kind selection (--objects) and regex member matching
//! - Output format selection (human/JSON)

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::{Arg, ArgAction, Command};

use hostwatch::records::KindMask;

/// Parsed command-line configuration.
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Root configuration file (the one carrying cfg_file/cfg_dir lines).
    pub config_path: PathBuf,
    /// Load and validate only; nonzero exit on any error.
    pub verify_only: bool,
    /// Write the flattened object cache here after a successful load.
    pub cache_path: Option<PathBuf>,
    /// Treat the input as an already-flattened cache.
    pub precached: bool,
    /// Which entity kinds to parse and register.
    pub kinds: KindMask,
    /// Enable regex member matching.
    pub use_regex: bool,
    /// Suppress the summary on success.
    pub quiet: bool,
    /// Emit the summary as JSON.
    pub json: bool,
}

/// Map an --objects token to its selection bit.
fn kind_flag(token: &str) -> Option<KindMask> {
    Some(match token {
        "timeperiods" => KindMask::TIMEPERIODS,
        "commands" => KindMask::COMMANDS,
        "contacts" => KindMask::CONTACTS,
        "contactgroups" => KindMask::CONTACTGROUPS,
        "hosts" => KindMask::HOSTS,
        "hostgroups" => KindMask::HOSTGROUPS,
        "services" => KindMask::SERVICES,
        "servicegroups" => KindMask::SERVICEGROUPS,
        "servicedependencies" => KindMask::SERVICEDEPENDENCIES,
        "serviceescalations" => KindMask::SERVICEESCALATIONS,
        "hostdependencies" => KindMask::HOSTDEPENDENCIES,
        "hostescalations" => KindMask::HOSTESCALATIONS,
        "hostextinfo" => KindMask::HOSTEXTINFO,
        "serviceextinfo" => KindMask::SERVICEEXTINFO,
        "all" => KindMask::all(),
        _ => return None,
    })
}

/// Parse command line arguments and return configuration
pub fn parse_args() -> Result<CliConfig> {
    let matches = Command::new("hostwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Load and verify hostwatch monitoring configuration")
        .long_about(
            "Reads a template-based monitoring configuration tree, resolves \
             inheritance and group membership, and either verifies it or writes \
             the flattened object cache.",
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Root configuration file")
                .required(true),
        )
        .arg(
            Arg::new("verify")
                .short('v')
                .long("verify")
                .help("Verify the configuration and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("cache")
                .long("cache")
                .value_name("FILE")
                .help("Write the flattened object cache to FILE"),
        )
        .arg(
            Arg::new("precached")
                .long("precached")
                .help("Input is an already-flattened cache file; skip resolution and fan-out")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("objects")
                .long("objects")
                .value_name("LIST")
                .help("Comma list of object kinds to load (default: all)"),
        )
        .arg(
            Arg::new("regex")
                .long("regex")
                .help("Treat group member tokens with regex metacharacters as regular expressions")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .help("Suppress the summary on success")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("json")
                .short('j')
                .long("json")
                .help("Output the load summary as JSON")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let config_path = matches
        .get_one::<String>("config")
        .map(PathBuf::from)
        .ok_or_else(|| anyhow!("--config is required"))?;

    let kinds = match matches.get_one::<String>("objects") {
        Some(list) => {
            let mut mask = KindMask::empty();
            for token in list.split(',').map(str::trim).filter(|t| !t.is_empty()) {
                let flag = kind_flag(token)
                    .ok_or_else(|| anyhow!("unknown object kind '{}' in --objects", token))?;
                mask |= flag;
            }
            if mask.is_empty() {
                return Err(anyhow!("--objects selected no object kinds"));
            }
            mask
        }
        None => KindMask::all(),
    };

    Ok(CliConfig {
        config_path,
        verify_only: matches.get_flag("verify"),
        cache_path: matches.get_one::<String>("cache").map(PathBuf::from),
        precached: matches.get_flag("precached"),
        kinds,
        use_regex: matches.get_flag("regex"),
        quiet: matches.get_flag("quiet"),
        json: matches.get_flag("json"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_flag_tokens() {
        assert_eq!(kind_flag("hosts"), Some(KindMask::HOSTS));
        assert_eq!(kind_flag("servicegroups"), Some(KindMask::SERVICEGROUPS));
        assert_eq!(kind_flag("all"), Some(KindMask::all()));
        assert_eq!(kind_flag("widgets"), None);
    }
}
