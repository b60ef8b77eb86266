use std::{fs, path::PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use mrf_portal::{
    catalog,
    config::{self, AppConfig},
    export,
    lpo::{self, layout, LayoutOptions, LpoDraft},
    models::RequestStatus,
};
use serde::Serialize;
use tracing::{debug, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    config::init_tracing("warn", false);
    let cfg = match config::load_config() {
        Ok(cfg) => cfg,
        Err(err) => {
            warn!(error = %err, "configuration not loaded; using built-in defaults");
            AppConfig::default()
        }
    };

    match cli.command {
        Commands::Lpo(command) => handle_lpo_command(&cfg, command, cli.json)?,
        Commands::Catalog(command) => handle_catalog_command(command, cli.json)?,
        Commands::Requests(command) => handle_requests_command(cfg, command, cli.json).await?,
    }

    Ok(())
}

#[derive(Parser)]
#[command(name = "mrf", about = "Material request portal tools", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(subcommand)]
    Lpo(LpoCommands),
    #[command(subcommand)]
    Catalog(CatalogCommands),
    #[command(subcommand)]
    Requests(RequestsCommands),
}

#[derive(Subcommand)]
enum LpoCommands {
    /// Render a draft JSON file to PDF
    Render(LpoRenderArgs),
    /// Print line totals, VAT and amount in words for a draft
    Totals(LpoInputArgs),
}

#[derive(Args)]
struct LpoInputArgs {
    #[arg(long, help = "Path to an LPO draft JSON file")]
    input: PathBuf,
}

#[derive(Args)]
struct LpoRenderArgs {
    #[arg(long, help = "Path to an LPO draft JSON file")]
    input: PathBuf,
    #[arg(long, help = "Output PDF path (defaults to LPO-<number>.pdf)")]
    output: Option<PathBuf>,
    #[arg(long, help = "PNG logo to place on the letterhead")]
    logo: Option<PathBuf>,
}

#[derive(Subcommand)]
enum CatalogCommands {
    /// List departments and their subdepartments
    Departments,
    /// List subdepartments of one department
    Subdepartments {
        #[arg(long)]
        department: String,
    },
}

#[derive(Subcommand)]
enum RequestsCommands {
    /// List requests from the configured backend
    List {
        #[arg(long, help = "Pending, Approved or Rejected")]
        status: Option<RequestStatus>,
    },
    /// Write every request to a CSV file
    Export {
        #[arg(long, help = "Output CSV path (defaults to material_requests_<millis>.csv)")]
        output: Option<PathBuf>,
    },
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn read_draft(path: &PathBuf) -> Result<LpoDraft> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read draft {}", path.display()))?;
    let draft: LpoDraft = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid LPO draft", path.display()))?;
    validator::Validate::validate(&draft).map_err(|e| anyhow!("invalid draft: {}", e))?;
    Ok(draft)
}

fn handle_lpo_command(cfg: &AppConfig, command: LpoCommands, json: bool) -> Result<()> {
    match command {
        LpoCommands::Totals(args) => {
            let draft = read_draft(&args.input)?;
            let preview = draft.preview(&cfg.currency);
            if json {
                return print_json(&preview);
            }
            for line in &preview.items {
                println!(
                    "{:>3}  {:<40} {:>8} {:<6} x {:>10} = {:>12}",
                    line.sc_no,
                    line.description,
                    line.quantity,
                    line.unit,
                    lpo::format_money(line.rate),
                    lpo::format_money(line.line_total)
                );
            }
            println!("Subtotal: {}", lpo::format_money(preview.subtotal));
            println!("VAT 5%:   {}", lpo::format_money(preview.vat));
            println!("Total:    {}", lpo::format_money(preview.total));
            println!("{}", preview.total_in_words);
        }
        LpoCommands::Render(args) => {
            let draft = read_draft(&args.input)?;
            let logo_path = args
                .logo
                .or_else(|| cfg.company.logo_path.as_ref().map(PathBuf::from));
            let logo = match logo_path {
                Some(path) => match fs::read(&path) {
                    Ok(bytes) => Some(bytes),
                    Err(err) => {
                        warn!(path = %path.display(), error = %err, "logo unreadable; skipping");
                        None
                    }
                },
                None => None,
            };

            let options = LayoutOptions {
                currency: cfg.currency.clone(),
                include_logo: logo.is_some(),
            };
            let document = layout::build(&draft, &cfg.company, &options);
            let bytes = lpo::render_pdf(&document, logo.as_deref())?;
            let output = args
                .output
                .unwrap_or_else(|| PathBuf::from(draft.file_name()));
            fs::write(&output, &bytes)
                .with_context(|| format!("failed to write {}", output.display()))?;
            debug!(pages = document.page_count(), "document written");
            println!(
                "Wrote {} ({} page(s), {} bytes)",
                output.display(),
                document.page_count(),
                bytes.len()
            );
        }
    }
    Ok(())
}

fn handle_catalog_command(command: CatalogCommands, json: bool) -> Result<()> {
    match command {
        CatalogCommands::Departments => {
            let tree = catalog::department_tree();
            if json {
                return print_json(&tree);
            }
            for entry in tree {
                println!("{}", entry.name);
                for sub in entry.subdepartments {
                    println!("  {}", sub);
                }
            }
        }
        CatalogCommands::Subdepartments { department } => {
            if !catalog::is_known_department(&department) {
                return Err(anyhow!("unknown department '{}'", department));
            }
            let subs = catalog::subdepartments_by_department(&department);
            if json {
                return print_json(&subs);
            }
            for sub in subs {
                println!("{}", sub);
            }
        }
    }
    Ok(())
}

async fn handle_requests_command(cfg: AppConfig, command: RequestsCommands, json: bool) -> Result<()> {
    let state = mrf_portal::build_state(cfg).context("failed to build application state")?;
    let requests = state
        .store
        .refresh_requests()
        .await
        .context("failed to fetch material requests")?;

    match command {
        RequestsCommands::List { status } => {
            let selected: Vec<_> = requests
                .into_iter()
                .filter(|r| status.map_or(true, |s| r.status == s))
                .collect();
            if json {
                return print_json(&selected);
            }
            for request in &selected {
                println!(
                    "{}  {:<8}  {:<14}  {}  {}",
                    request.mrf_number,
                    request.status,
                    request.department,
                    request.request_date,
                    request.project_name
                );
            }
            println!("{} request(s)", selected.len());
        }
        RequestsCommands::Export { output } => {
            let csv = export::requests_to_csv(&requests)?;
            let output = output.unwrap_or_else(|| PathBuf::from(export::export_file_name()));
            fs::write(&output, csv)
                .with_context(|| format!("failed to write {}", output.display()))?;
            println!("Exported {} request(s) to {}", requests.len(), output.display());
        }
    }
    Ok(())
}
