use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::cli::fetch::FetchArg;
use crate::cli::merge::MergeArg;
use crate::cli::setup::CompletionsArg;
use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Clone, Debug, Parser)]
#[command(name="sogscat",version=env!("CARGO_PKG_VERSION"),about,long_about=None,propagate_version=true)]
pub struct App {
    #[command(flatten)]
    pub global: GlobalArg,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Args, Clone, Debug)]
pub struct GlobalArg {
    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,
    /// Disable colored log output
    #[arg(long, global = true)]
    pub no_color: bool,
    /// Configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

#[derive(Clone, Debug, Subcommand)]
pub enum Commands {
    #[command(alias = "f", name = "fetch", about = "Discover, resolve and save servers")]
    Fetch(FetchArg),
    #[command(alias = "m", name = "merge", about = "Merge saved server listings offline")]
    Merge(MergeArg),
    #[command(name = "completions", about = "Print shell completions")]
    Completions(CompletionsArg),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_command_is_well_formed() {
        App::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let app = App::try_parse_from(["sogscat", "f", "--fast", "-v", "-c", "x.toml"]).unwrap();
        assert!(app.global.verbose);
        assert_eq!(app.global.config, PathBuf::from("x.toml"));
        let Commands::Fetch(arg) = app.cmd else {
            panic!("expected fetch");
        };
        assert!(arg.fast);
        assert!(!arg.dry_run);
    }

    #[test]
    fn test_merge_requires_inputs() {
        assert!(App::try_parse_from(["sogscat", "merge"]).is_err());
        let app = App::try_parse_from(["sogscat", "m", "a.json", "b.json", "-n"]).unwrap();
        let Commands::Merge(arg) = app.cmd else {
            panic!("expected merge");
        };
        assert_eq!(arg.inputs.len(), 2);
        assert!(arg.dry_run);
    }
}
