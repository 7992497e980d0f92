//! OpenWeed CLI - Database migrations, demo data, and account management.
//!
//! # Usage
//!
//! ```bash
//! # Run migrations and create the session table
//! ow-cli migrate
//!
//! # Load the demo dataset
//! ow-cli seed demo
//! ow-cli seed demo --file path/to/data.yaml
//!
//! # Create an admin account
//! ow-cli user create -e admin@example.com -n "Admin Name" -r admin --password '...'
//!
//! # Change an account's role
//! ow-cli user set-role -e someone@example.com -r driver
//! ```
//!
//! # Environment Variables
//!
//! - `OPENWEED_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ow-cli")]
#[command(author, version, about = "OpenWeed CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations and create the session table
    Migrate,
    /// Load seed data
    Seed {
        #[command(subcommand)]
        dataset: SeedDataset,
    },
    /// Manage accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
}

#[derive(Subcommand)]
enum SeedDataset {
    /// Demo zone, driver, catalog, buyer, order, and lounge messages
    Demo {
        /// YAML file to load instead of the bundled dataset
        #[arg(short, long)]
        file: Option<String>,
    },
}

#[derive(Subcommand)]
enum UserAction {
    /// Create an account
    Create {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: String,

        /// Role (`buyer`, `driver`, `admin`)
        #[arg(short, long, default_value = "admin")]
        role: String,

        /// Password; without one the account cannot sign in
        #[arg(long)]
        password: Option<String>,
    },
    /// Change an account's role
    SetRole {
        /// Email address
        #[arg(short, long)]
        email: String,

        /// Role (`buyer`, `driver`, `admin`)
        #[arg(short, long)]
        role: String,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { dataset } => match dataset {
            SeedDataset::Demo { file } => {
                commands::seed::demo(file.as_deref()).await?;
            }
        },
        Commands::User { action } => match action {
            UserAction::Create {
                email,
                name,
                role,
                password,
            } => {
                commands::user::create(&email, &name, &role, password.as_deref()).await?;
            }
            UserAction::SetRole { email, role } => {
                commands::user::set_role(&email, &role).await?;
            }
        },
    }
    Ok(())
}
