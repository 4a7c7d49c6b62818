// src/cli.rs

use clap::{Parser, Subcommand, ValueEnum};
use committools::analysis::activity::GRACE_PERIOD;
use committools::analysis::retention::INTERNAL_COMMITTER_LIMIT;
use committools::CommitOrdering;
use std::path::PathBuf;

/// Upper bound for `--grace-days`, about a century.
const MAX_GRACE_DAYS: i64 = 36_500;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Log debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the commits of a repository in walk order
    Order {
        /// Path to the git repository
        repo: PathBuf,

        #[arg(long, value_enum, default_value_t = OrderingArg::Base)]
        ordering: OrderingArg,
    },

    /// Number of active committers per period
    Activity {
        #[arg(value_enum)]
        scope: Scope,

        /// A repository, or a directory of repositories with `multiple`
        path: PathBuf,

        /// Days after their last commit a committer still counts as active
        #[arg(
            long,
            default_value_t = GRACE_PERIOD / 86_400,
            value_parser = clap::value_parser!(i64).range(1..=MAX_GRACE_DAYS)
        )]
        grace_days: i64,
    },

    /// Internal and external committers of every repository in a directory
    Retention {
        path: PathBuf,

        /// Commits needed to count as internal
        #[arg(long, default_value_t = INTERNAL_COMMITTER_LIMIT)]
        limit: usize,
    },

    /// Find repositories that share their history
    Dedup {
        path: PathBuf,

        /// Common commits above which two repositories are duplicates
        #[arg(long, default_value_t = 1)]
        threshold: usize,

        /// Compare repositories on all cores
        #[arg(long)]
        parallel: bool,
    },

    /// Count commits whose message contains any of the keywords
    Keywords {
        #[arg(value_enum)]
        scope: Scope,

        path: PathBuf,

        #[arg(required = true)]
        keywords: Vec<String>,
    },

    /// Age in seconds of every deleted or replaced line
    Lifecycle {
        repo: PathBuf,

        /// Only consider files ending with this suffix (repeatable)
        #[arg(long)]
        suffix: Vec<String>,

        /// Only consider files matching this glob (repeatable)
        #[arg(long)]
        glob: Vec<String>,

        /// Stop after this many commits
        #[arg(long)]
        limit: Option<usize>,
    },
}

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum Scope {
    /// `path` is a repository
    Single,
    /// `path` is a directory of repositories
    Multiple,
}

#[derive(ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
pub enum OrderingArg {
    /// Parents before children, every reachable commit
    Topological,
    /// First-parent chain from the root to HEAD
    Base,
}

impl From<OrderingArg> for CommitOrdering {
    fn from(arg: OrderingArg) -> Self {
        match arg {
            OrderingArg::Topological => CommitOrdering::Topological,
            OrderingArg::Base => CommitOrdering::BaseChain,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grace_days_must_be_positive() {
        assert!(Args::try_parse_from(["committools", "activity", "single", ".", "--grace-days", "0"]).is_err());
        assert!(Args::try_parse_from(["committools", "activity", "single", ".", "--grace-days", "-3"]).is_err());
        assert!(Args::try_parse_from(["committools", "activity", "single", ".", "--grace-days", "99999999"]).is_err());

        let args = Args::try_parse_from(["committools", "activity", "single", ".", "--grace-days", "30"]).unwrap();
        assert!(matches!(args.command, Command::Activity { grace_days: 30, .. }));
    }

    #[test]
    fn grace_days_default_to_six_months() {
        let args = Args::try_parse_from(["committools", "activity", "multiple", "repos"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Activity { scope: Scope::Multiple, grace_days: 180, .. }
        ));
    }
}
