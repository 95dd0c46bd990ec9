//! `cashper-admin` command-line console.
//!
//! Usage:
//! ```bash
//! # Store a token for later commands
//! cashper-admin login --token eyJhbGciOi...
//!
//! # Page through pending loan applications
//! cashper-admin list loans --status Pending --page 2
//!
//! # Inspect one record and move it along
//! cashper-admin show loans 42
//! cashper-admin set-status loans 42 Approved
//!
//! # Export the filtered inquiry inbox
//! cashper-admin export inquiries --category "Business Tax" --out ./exports
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};

use cashper_admin::{
    AdminConfig, AdminResourceBrowser, Backend, ColumnSpec, FetchOutcome, FileTokenStore,
    HttpBackend, NotificationLevel, NotificationLog, ReportRequest, TransitionOutcome,
    generate_report, load_profile, resources,
};
use cashper_auth::{MemoryTokenStore, Session, TokenStore};
use cashper_core::{Entity, EntityId, Record};

#[derive(Parser)]
#[command(
    name = "cashper-admin",
    about = "Cashper admin console",
    long_about = "Browse, filter, export and update the records behind the Cashper admin screens."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Backend base URL override (otherwise CASHPER_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,
}

#[derive(Args, Default)]
struct FilterArgs {
    /// Case-insensitive text search
    #[arg(long)]
    search: Option<String>,

    /// Status filter ("all" for none)
    #[arg(long)]
    status: Option<String>,

    /// Category/type filter ("all" for none)
    #[arg(long)]
    category: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Store an access token in the credentials file
    Login {
        #[arg(long)]
        token: String,
    },

    /// Forget the stored token and cached profile
    Logout,

    /// Show the signed-in administrator
    Whoami,

    /// List the known resource names
    Resources,

    /// List one page of a resource
    List {
        resource: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// 1-based page number
        #[arg(long, default_value_t = 1)]
        page: usize,
    },

    /// Show one record with its available status actions
    Show { resource: String, id: String },

    /// Change a record's status
    SetStatus {
        resource: String,
        id: String,
        status: String,
    },

    /// Export the filtered list as CSV
    Export {
        resource: String,

        #[command(flatten)]
        filters: FilterArgs,

        /// Output directory
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Download a document attached to a record
    Download {
        resource: String,
        id: String,
        /// Key in the record's documents map
        key: String,

        #[arg(long, default_value = ".")]
        out: PathBuf,
    },

    /// Ask the backend to generate an analytics report
    Report {
        report_type: String,

        #[arg(long, default_value = "last_30_days")]
        range: String,

        #[arg(long, default_value = "pdf")]
        format: String,
    },
}

struct Console {
    config: AdminConfig,
    session: Session,
    backend: Arc<dyn Backend>,
    notifications: Arc<NotificationLog>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AdminConfig::from_env().context("invalid configuration")?;
    if let Some(url) = cli.api_url {
        config.api_url = url;
    }
    cashper_observability::init_with(config.log_format);

    let session = open_session(&config)?;
    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::from_config(&config, session.clone())?);
    let console = Console {
        config,
        session,
        backend,
        notifications: Arc::new(NotificationLog::new()),
    };

    let result = console.run(cli.command).await;
    for note in console.notifications.drain() {
        let label = match note.level {
            NotificationLevel::Success => "ok",
            NotificationLevel::Info => "info",
            NotificationLevel::Error => "error",
        };
        eprintln!("[{label}] {}", note.message);
    }
    result
}

/// An explicit token wins over the persisted one.
fn open_session(config: &AdminConfig) -> Result<Session> {
    let store: Arc<dyn TokenStore> = match &config.auth_token {
        Some(token) => Arc::new(MemoryTokenStore::with_token(&config.token_key, token)),
        None => Arc::new(FileTokenStore::default_location()?),
    };
    Ok(Session::with_token_key(store, config.token_key.clone()))
}

impl Console {
    async fn run(&self, command: Command) -> Result<()> {
        match command {
            Command::Login { token } => {
                self.session.sign_in(token.trim())?;
                println!("token stored under '{}'", self.session.token_key());
            }
            Command::Logout => {
                self.session.sign_out()?;
                println!("signed out");
            }
            Command::Whoami => match load_profile(&*self.backend, &self.session).await? {
                Some(profile) => println!(
                    "{} <{}> role={}",
                    profile.display_name(),
                    profile.email.as_deref().unwrap_or("-"),
                    profile.role.as_deref().unwrap_or("-")
                ),
                None => println!("not signed in"),
            },
            Command::Resources => {
                for name in resources::names() {
                    println!("{name}");
                }
            }
            Command::List {
                resource,
                filters,
                page,
            } => {
                let mut browser = self.browser(&resource, &filters).await?;
                browser.set_page(page);
                let view = browser.view();
                print_table(&browser.descriptor().columns, &view.items);
                println!(
                    "page {}/{} ({} matching)",
                    view.page_index, view.total_pages, view.total_items
                );
            }
            Command::Show { resource, id } => {
                let browser = self.browser(&resource, &FilterArgs::default()).await?;
                let entity = browser.open_detail(&parse_id(&id)?).await?;
                println!("{}", serde_json::to_string_pretty(&entity)?);
                if let Some(source) = entity.source() {
                    println!("source: {source}");
                }
                let actions: Vec<String> = browser
                    .actions(&entity)
                    .into_iter()
                    .map(|a| if a.enabled { a.status } else { format!("[{}]", a.status) })
                    .collect();
                println!("actions: {}", actions.join("  "));
            }
            Command::SetStatus {
                resource,
                id,
                status,
            } => {
                let browser = self.browser(&resource, &FilterArgs::default()).await?;
                match browser.change_status(&parse_id(&id)?, &status).await? {
                    TransitionOutcome::Applied { command, .. } => {
                        println!("{} -> {}", command.entity_id, command.to)
                    }
                    TransitionOutcome::Unchanged => println!("{id} already has status {status}"),
                    TransitionOutcome::Ignored => bail!("another status change is in progress"),
                    TransitionOutcome::Invalid { reason } => bail!(reason),
                    TransitionOutcome::Failed { reason, .. } => bail!("status change failed: {reason}"),
                }
            }
            Command::Export {
                resource,
                filters,
                out,
            } => {
                let browser = self.browser(&resource, &filters).await?;
                let file = browser.export_csv(Utc::now().date_naive());
                let path = file
                    .write_to(&out)
                    .with_context(|| format!("writing {}", out.display()))?;
                println!("wrote {}", path.display());
            }
            Command::Download {
                resource,
                id,
                key,
                out,
            } => {
                let browser = self.browser(&resource, &FilterArgs::default()).await?;
                let doc = browser.download_document(&parse_id(&id)?, &key).await?;
                let path = doc
                    .save_to(&out)
                    .with_context(|| format!("writing {}", out.display()))?;
                println!("saved {} ({} bytes)", path.display(), doc.len());
            }
            Command::Report {
                report_type,
                range,
                format,
            } => {
                let request = ReportRequest::new(report_type).date_range(range).format(format);
                let response = generate_report(&*self.backend, &request).await?;
                println!("{}", response.message.as_deref().unwrap_or("report generated"));
            }
        }
        Ok(())
    }

    /// Build a browser for `resource`, apply the filters and load it.
    async fn browser(
        &self,
        resource: &str,
        filters: &FilterArgs,
    ) -> Result<AdminResourceBrowser<Record>> {
        let descriptor = resources::by_name(resource).with_context(|| {
            format!(
                "unknown resource '{resource}' (expected one of: {})",
                resources::names().join(", ")
            )
        })?;
        let mut browser = AdminResourceBrowser::new(
            descriptor,
            self.backend.clone(),
            self.notifications.clone(),
            &self.config,
        )?;
        if let Some(search) = &filters.search {
            browser.set_search(search.as_str());
        }
        if let Some(status) = &filters.status {
            let options = browser.status_options();
            let Some(chosen) = options.iter().find(|o| o.eq_ignore_ascii_case(status.trim())) else {
                bail!(
                    "unknown status '{status}' for {} (expected one of: {})",
                    browser.descriptor().name,
                    options.join(", ")
                );
            };
            browser.set_status_filter(chosen.as_str());
        }
        if let Some(category) = &filters.category {
            browser.set_category_filter(category.as_str());
        }

        let report = browser.mount().await;
        if let FetchOutcome::Failed { error } = report.outcome {
            bail!("could not load {}: {error}", browser.descriptor().name);
        }
        Ok(browser)
    }
}

fn parse_id(raw: &str) -> Result<EntityId> {
    raw.parse::<EntityId>()
        .with_context(|| format!("invalid id '{raw}'"))
}

fn print_table(columns: &[ColumnSpec<Record>], items: &[Record]) {
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| columns.iter().map(|c| c.value(item)).collect())
        .collect();
    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.header.chars().count()))
                .max()
                .unwrap_or(0)
                .min(32)
        })
        .collect();

    let render = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, w)| {
                let clipped: String = cell.replace('\n', " ").chars().take(*w).collect();
                format!("{clipped:<w$}", w = *w)
            })
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("{}", render(columns.iter().map(|c| c.header.as_str()).collect()));
    for row in &rows {
        println!("{}", render(row.iter().map(String::as_str).collect()));
    }
    if rows.is_empty() {
        println!("(no records)");
    }
}
