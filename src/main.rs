use anyhow::Result;
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use planpilot::config::{ClientArgs, ClientConfig, ServeArgs, ServerSettings};
use planpilot_common::{ColumnSort, CompactionPolicy, NewTask, Priority, TaskPatch, TaskStatus};

mod cmd;

#[derive(Parser)]
#[command(name = "planpilot")]
#[command(version, about = "Kanban task board: REST server and terminal client")]
pub struct Cli {
    #[command(flatten)]
    pub client: ClientArgs,

    /// Log level filter (trace, debug, info, warn, error). RUST_LOG wins when set.
    #[arg(long, global = true, env = "PLANPILOT_LOG")]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the board server
    Serve(ServeArgs),
    /// Create the database and run migrations, then exit
    InitDb {
        /// SQLite database path
        #[arg(long, env = "PLANPILOT_DB")]
        db_path: Option<PathBuf>,

        /// Path to config file (default: ./planpilot.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Register a new account
    Signup {
        username: String,
        email: String,
        /// Prompted for when neither the flag nor PLANPILOT_PASSWORD is set
        #[arg(long, env = "PLANPILOT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Log in and save the session
    Login {
        email: String,
        /// Prompted for when neither the flag nor PLANPILOT_PASSWORD is set
        #[arg(long, env = "PLANPILOT_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Forget the saved session
    Logout,
    /// Show the board
    List {
        /// Only tasks whose title or description contains this text
        #[arg(short, long)]
        search: Option<String>,

        /// Only tasks with this priority
        #[arg(short, long)]
        priority: Option<Priority>,

        /// Card order inside each column: position or priority
        #[arg(long, default_value = "position")]
        sort: ColumnSort,

        /// Print the raw task list as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a task at the end of its column
    Add {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long, default_value = "To Do")]
        status: TaskStatus,
        #[arg(short, long, default_value = "Low")]
        priority: Priority,
    },
    /// Change fields of a task
    Edit {
        /// Task id or unique id prefix
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,
        #[arg(long)]
        status: Option<TaskStatus>,
        #[arg(short, long)]
        priority: Option<Priority>,
    },
    /// Drop a task onto a column or onto another task
    Move {
        /// Task id or unique id prefix
        task: String,
        /// Column name (todo, in-progress, done) or the id of the task to land before
        target: String,
        /// Whether the origin column is renumbered: gapped or compact
        #[arg(long, default_value = "gapped")]
        policy: CompactionPolicy,
    },
    /// Delete a task
    Delete {
        /// Task id or unique id prefix
        id: String,
    },
}

fn init_tracing(level: &str, format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Values from .env feed the clap `env` fallbacks, so load it first.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut server_settings = match &cli.command {
        Commands::Serve(args) => Some(ServerSettings::load(args)?),
        _ => None,
    };
    let level = cli
        .log_level
        .clone()
        .or_else(|| server_settings.as_ref().map(|s| s.log_level.clone()))
        .unwrap_or_else(|| "warn".to_string());
    init_tracing(&level, cli.log_format);

    let config = ClientConfig::resolve(&cli.client);
    match &cli.command {
        Commands::Serve(args) => {
            let settings = match server_settings.take() {
                Some(settings) => settings,
                None => ServerSettings::load(args)?,
            };
            cmd::cmd_serve(settings).await?;
        }
        Commands::InitDb { db_path, config } => {
            cmd::cmd_init_db(db_path.clone(), config.clone())?;
        }
        Commands::Signup {
            username,
            email,
            password,
        } => cmd::cmd_signup(&config, username, email, password.clone()).await?,
        Commands::Login { email, password } => cmd::cmd_login(&config, email, password.clone()).await?,
        Commands::Logout => cmd::cmd_logout(&config)?,
        Commands::List {
            search,
            priority,
            sort,
            json,
        } => cmd::cmd_list(&config, search.clone(), *priority, *sort, *json).await?,
        Commands::Add {
            title,
            description,
            due,
            status,
            priority,
        } => {
            let new = NewTask {
                title: title.clone(),
                description: description.clone(),
                due_date: *due,
                status: *status,
                priority: *priority,
            };
            cmd::cmd_add(&config, new).await?
        }
        Commands::Edit {
            id,
            title,
            description,
            due,
            status,
            priority,
        } => {
            let patch = TaskPatch {
                title: title.clone(),
                description: description.clone(),
                due_date: *due,
                status: *status,
                priority: *priority,
                position: None,
            };
            cmd::cmd_edit(&config, id, patch).await?
        }
        Commands::Move {
            task,
            target,
            policy,
        } => cmd::cmd_move(&config, task, target, *policy).await?,
        Commands::Delete { id } => cmd::cmd_delete(&config, id).await?,
    }

    Ok(())
}
