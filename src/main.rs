//! CRM Desktop - Main Entry Point
//!
//! Headless front end for the CRM backend. The session persists in the
//! local data directory between runs; every resource command first
//! navigates to its page so the route guard applies.

use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crm_desktop_lib::{
    api::{CustomerQuery, CustomerStatus, DealQuery, DealStage},
    commands,
    config::Config,
    logging,
    router::LOGIN_PATH,
    storage::FileStorage,
    AppState,
};

#[derive(Parser, Debug)]
#[command(name = "crm-desktop", version, about = "CRM desktop client")]
struct Cli {
    /// API base URL (overrides CRM_API_BASE_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Log in and store the session
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long, env = "CRM_PASSWORD")]
        password: String,
    },
    /// Clear the stored session
    Logout,
    /// Show the stored session
    Status,
    /// Navigate to a route and print where the guard lands
    Open { path: String },
    /// List customers
    Customers {
        #[arg(long, value_parser = parse_customer_status)]
        status: Option<CustomerStatus>,
        #[arg(long)]
        keyword: Option<String>,
        #[arg(long)]
        page: Option<u32>,
        #[arg(long)]
        size: Option<u32>,
        #[arg(long)]
        sort: Option<String>,
    },
    /// Show one customer
    Customer { id: i64 },
    /// List deals
    Deals {
        #[arg(long, value_parser = parse_deal_stage)]
        stage: Option<DealStage>,
        #[arg(long)]
        open_only: bool,
    },
    /// Show pipeline statistics
    DealStats,
    /// List approvals
    Approvals {
        #[command(subcommand)]
        view: ApprovalView,
    },
    /// Approve or reject an approval request
    Process {
        id: i64,
        #[arg(long, conflicts_with = "reject")]
        approve: bool,
        #[arg(long)]
        reject: bool,
    },
    /// List users (administrators only)
    Users,
}

#[derive(Subcommand, Debug)]
enum ApprovalView {
    Pending,
    History,
    /// Approvals submitted by the logged-in user
    Mine,
}

fn parse_customer_status(raw: &str) -> Result<CustomerStatus, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_uppercase()))
        .map_err(|_| format!("unknown customer status: {raw}"))
}

fn parse_deal_stage(raw: &str) -> Result<DealStage, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_uppercase()))
        .map_err(|_| format!("unknown deal stage: {raw}"))
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Open `path`; fail when the guard sends the user somewhere else
fn open_page(state: &AppState, path: &str) -> anyhow::Result<()> {
    let nav = commands::navigate(state, path)?;
    if nav.location != path {
        if nav.location == LOGIN_PATH {
            bail!("Not logged in. Run `crm-desktop login` first.");
        }
        bail!("Access to {} denied; redirected to {}", path, nav.location);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::from_env()?;
    if let Some(url) = cli.api_url {
        config.api_base_url = url.trim_end_matches('/').to_string();
    }

    logging::init(&config.log_dir());
    info!("CRM Desktop starting against {}", config.api_base_url);

    let storage = FileStorage::open(&config.data_dir).context("opening local storage")?;
    let state = AppState::new(&config, Arc::new(storage))?;

    match cli.command {
        Command::Login { username, password } => {
            let response = commands::login(&state, username, password).await;
            print_json(&response)?;
            if !response.success {
                bail!("Login failed");
            }
        }
        Command::Logout => {
            commands::logout(&state)?;
            println!("Logged out");
        }
        Command::Status => print_json(&commands::get_session_status(&state))?,
        Command::Open { path } => print_json(&commands::navigate(&state, &path)?.location)?,
        Command::Customers {
            status,
            keyword,
            page,
            size,
            sort,
        } => {
            open_page(&state, "/customers")?;
            let query = CustomerQuery {
                status,
                keyword,
                page,
                size,
                sort,
            };
            print_json(&state.api.customers().get_all(&query).await?)?;
        }
        Command::Customer { id } => {
            open_page(&state, "/customers")?;
            print_json(&state.api.customers().get_by_id(id).await?)?;
        }
        Command::Deals { stage, open_only } => {
            open_page(&state, "/deals")?;
            let query = DealQuery {
                stage,
                open_only: open_only.then_some(true),
            };
            print_json(&state.api.deals().get_all(&query).await?)?;
        }
        Command::DealStats => {
            open_page(&state, "/dashboard")?;
            print_json(&state.api.deals().get_statistics().await?)?;
        }
        Command::Approvals { view } => {
            open_page(&state, "/approvals")?;
            let approvals = state.api.approvals();
            let list = match view {
                ApprovalView::Pending => approvals.get_pending().await?,
                ApprovalView::History => approvals.get_history().await?,
                ApprovalView::Mine => {
                    let user = state
                        .session
                        .current_user()
                        .context("no user stored in session")?;
                    approvals.get_my(user.id).await?
                }
            };
            print_json(&list)?;
        }
        Command::Process { id, approve, reject } => {
            if approve == reject {
                bail!("Pass exactly one of --approve or --reject");
            }
            open_page(&state, "/approvals")?;
            print_json(&state.api.approvals().process(id, approve).await?)?;
        }
        Command::Users => {
            open_page(&state, "/users")?;
            print_json(&state.api.users().get_all().await?)?;
        }
    }

    Ok(())
}
