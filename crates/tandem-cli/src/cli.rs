use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "tandem")]
#[command(about = "Shared task list for two, synced when you're both online")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new task
    #[command(alias = "new")]
    Add {
        /// Task title
        title: Vec<String>,
        /// Free-form description
        #[arg(short, long)]
        description: Option<String>,
        /// Category label
        #[arg(short, long)]
        category: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
    },
    /// List cached tasks
    List {
        /// Filter by status
        #[arg(long, value_enum)]
        status: Option<StatusFilter>,
        /// Only tasks assigned to me
        #[arg(long)]
        mine: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update a task's fields
    Update {
        /// Task ID or unique ID prefix
        id: String,
        /// New title
        #[arg(short, long)]
        title: Option<String>,
        /// New description
        #[arg(short, long)]
        description: Option<String>,
        /// New category
        #[arg(short, long)]
        category: Option<String>,
        /// New due date (YYYY-MM-DD)
        #[arg(long, value_name = "DATE")]
        due: Option<String>,
        /// Clear the due date
        #[arg(long, conflicts_with = "due")]
        clear_due: bool,
    },
    /// Claim an unassigned task for yourself
    Claim {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Mark a task done, crediting yourself
    #[command(alias = "done")]
    Complete {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Assign a task to a user, or clear its assignment
    Assign {
        /// Task ID or unique ID prefix
        id: String,
        /// Assignee user id
        #[arg(long, value_name = "USER", conflicts_with = "clear")]
        to: Option<String>,
        /// Clear the assignment
        #[arg(long)]
        clear: bool,
    },
    /// Delete a task
    Delete {
        /// Task ID or unique ID prefix
        id: String,
    },
    /// Drain queued actions against the remote store
    Sync {
        /// Only retry actions that have already failed
        #[arg(long, conflicts_with = "force")]
        retry: bool,
        /// Drain even when nothing is queued, refreshing the sync timestamp
        #[arg(long)]
        force: bool,
        /// Output the sync result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show queue depth, unconfirmed edits, and last sync time
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusFilter {
    Todo,
    InProgress,
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_sync_force_flag_parses() {
        let cli = Cli::try_parse_from(["tandem", "sync", "--force"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sync {
                force: true,
                retry: false,
                ..
            }
        ));
    }

    #[test]
    fn test_sync_force_and_retry_are_exclusive() {
        assert!(Cli::try_parse_from(["tandem", "sync", "--force", "--retry"]).is_err());
    }
}
