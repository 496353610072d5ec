use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "dms", about = concat!("Drawing Management System v", env!("CARGO_PKG_VERSION")), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Configuration file (default: ./dms.toml if present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// SQLite database file (overrides [database] path)
    #[arg(long, global = true, env = "DMS_DATABASE")]
    pub database: Option<PathBuf>,

    /// Run the UI against sample data in memory (sign in as admin/admin)
    #[arg(long)]
    pub demo: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the database tables, optionally with an administrator
    Init(InitArgs),
    /// Manage user accounts
    User(UserCmd),
    /// Manage drawings
    Drawing(DrawingCmd),
}

#[derive(Args)]
pub struct InitArgs {
    /// Create an administrator account with every permission
    #[arg(long, requires = "password")]
    pub admin: Option<String>,
    /// Password for the administrator
    #[arg(long)]
    pub password: Option<String>,
}

// ---------------------------------------------------------------------------
// User commands
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct UserCmd {
    #[command(subcommand)]
    pub action: UserAction,
}

#[derive(Subcommand)]
pub enum UserAction {
    /// List user accounts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a user account
    Add(UserAddArgs),
    /// Set a user's password
    Passwd {
        /// Username
        name: String,
        /// New password
        #[arg(long)]
        password: String,
    },
    /// Delete a user account
    Delete {
        /// Username
        name: String,
    },
}

#[derive(Args)]
pub struct UserAddArgs {
    /// Username
    pub name: String,
    /// Password
    #[arg(long)]
    pub password: String,
    /// Department
    #[arg(long, default_value = "")]
    pub department: String,
    /// Permission code 1-5 (repeatable)
    #[arg(long = "perm", value_parser = clap::value_parser!(i64).range(1..=5))]
    pub perms: Vec<i64>,
}

// ---------------------------------------------------------------------------
// Drawing commands
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct DrawingCmd {
    #[command(subcommand)]
    pub action: DrawingAction,
}

#[derive(Subcommand)]
pub enum DrawingAction {
    /// List drawings
    List(DrawingListArgs),
    /// Add an approved drawing
    Add(DrawingAddArgs),
}

#[derive(Args)]
pub struct DrawingListArgs {
    /// Filter by status (approved, requested, issued, returned)
    #[arg(long)]
    pub status: Option<String>,
    /// Case-insensitive text match against number, revision, status and requester
    #[arg(long)]
    pub search: Option<String>,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct DrawingAddArgs {
    /// Drawing number
    pub number: String,
    /// Title
    #[arg(long, default_value = "")]
    pub title: String,
    /// Revision
    #[arg(long, default_value = "0")]
    pub revision: String,
    /// Approval date (YYYY-MM-DD)
    #[arg(long)]
    pub approved_on: Option<String>,
}
