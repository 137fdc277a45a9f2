//! ticket-desk - ticket management client
//!
//! Lists, creates, edits and deletes tickets on a ticket REST backend.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use ticket_desk::config::Config;
use ticket_desk::form::CreateForm;
use ticket_desk::view;
use ticket_desk::{Catalogs, Reconciler, TicketApi, TicketService};

#[derive(Parser)]
#[command(name = "ticket-desk")]
#[command(about = "Manage tickets on a ticket REST backend")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Backend origin (overrides config)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all tickets
    List {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Show one ticket
    Show {
        id: Uuid,

        #[arg(long)]
        json: bool,
    },

    /// Create a ticket
    Create {
        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        description: Option<String>,

        /// Low, Medium, High or Critical
        #[arg(short, long)]
        priority: Option<String>,

        /// Mark the ticket as recurring
        #[arg(long)]
        recurring: bool,

        /// Enable notifications for the ticket
        #[arg(long)]
        notify: bool,

        /// Due date (ISO-8601)
        #[arg(long)]
        due: Option<String>,
    },

    /// Edit a ticket; without --set, print its editable fields
    Edit {
        id: Uuid,

        /// Field assignment, e.g. --set title="New title" --set dueDate=
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },

    /// Delete a ticket
    Delete { id: Uuid },

    /// Initialize a new config file
    Init {
        /// Output path for config file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(name, value)| (name.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{raw}'"))
}

/// Build the HTTP client from the config file and CLI overrides
fn connect(
    config: Option<&Path>,
    base_url: Option<String>,
    catalogs: Catalogs,
) -> Result<TicketService> {
    let mut cfg = match config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(base_url) = base_url {
        cfg.api.base_url = base_url;
    }

    TicketService::new(&cfg.api, catalogs).context("Failed to build HTTP client")
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ticket_desk=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let catalogs = Catalogs::default();
    let client = || connect(cli.config.as_deref(), cli.base_url.clone(), catalogs);

    match cli.command {
        Commands::List { json } => {
            let mut board = Reconciler::new(client()?, catalogs);
            board.load().await.context("Failed to fetch tickets")?;
            if json {
                println!("{}", serde_json::to_string_pretty(board.tickets())?);
            } else {
                print!("{}", view::render_board(&board.snapshot()));
            }
        }

        Commands::Show { id, json } => {
            let ticket = client()?
                .get_ticket_by_id(id)
                .await
                .with_context(|| format!("Failed to fetch ticket {id}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&ticket)?);
            } else {
                print!("{}", view::render_details(&ticket));
            }
        }

        Commands::Create {
            title,
            description,
            priority,
            recurring,
            notify,
            due,
        } => {
            let mut form = CreateForm::new();
            let fields = [
                ("title", title),
                ("description", description),
                ("priority", priority),
                ("dueDate", due),
                ("isRecurring", Some(recurring.to_string())),
                ("isNotificationEnabled", Some(notify.to_string())),
            ];
            for (name, value) in fields {
                if let Some(value) = value {
                    form.set(name, &value, &catalogs)?;
                }
            }

            let mut board = Reconciler::new(client()?, catalogs);
            let created = board
                .submit_form(&mut form)
                .await
                .context("Failed to create ticket")?;
            println!("Created ticket {}", created.id);
        }

        Commands::Edit { id, set } => {
            let mut board = Reconciler::new(client()?, catalogs);
            board.load().await.context("Failed to fetch tickets")?;
            let session = board.begin_edit(id)?;

            if set.is_empty() {
                print!("{}", view::render_edit_form(session.ticket(), &catalogs));
                board.cancel();
                return Ok(());
            }

            for (name, value) in &set {
                board
                    .set_field(name, value)
                    .with_context(|| format!("Invalid value for {name}"))?;
            }
            let saved = board.save().await.context("Failed to update ticket")?;
            print!("{}", view::render_details(&saved));
        }

        Commands::Delete { id } => {
            let mut board = Reconciler::new(client()?, catalogs);
            board.delete(id).await.context("Failed to delete ticket")?;
            println!("Deleted ticket {id}");
        }

        Commands::Init { output } => {
            let path = output.unwrap_or_else(|| PathBuf::from("config.toml"));
            Config::default().save_to(&path)?;
            println!("Created config file: {}", path.display());
            println!("Set [api] base_url to your ticket backend, then run: ticket-desk list");
        }
    }

    Ok(())
}
