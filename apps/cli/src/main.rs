use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{
    config::load_settings, CollectionError, CollectionSpec, CollectionView, HttpStore,
    StatusFilter,
};
use shared::{
    domain::{DealStage, LeadStatus, Record, RecordId},
    protocol::{
        to_fields, Deal, Lead, LeadPatch, NewDeal, NewLead, NewStatus, StatusPatch, StatusRow,
    },
};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod render;

#[derive(Parser, Debug)]
#[command(name = "crm", about = "Browse and edit CRM collections on the hosted backend")]
struct Cli {
    /// Backend project url; overrides crm.toml and SUPABASE_URL.
    #[arg(long)]
    supabase_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List one page of a collection after search and status filtering.
    List {
        #[arg(long, default_value = "leads")]
        collection: String,
        #[arg(long, default_value = "")]
        search: String,
        /// Status to keep, or "all".
        #[arg(long, default_value = "all")]
        status: String,
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    CreateLead(LeadArgs),
    UpdateLead {
        id: String,
        #[command(flatten)]
        fields: LeadPatchArgs,
    },
    /// Delete one or more rows; every id is attempted even if some fail.
    Delete {
        #[arg(long, default_value = "leads")]
        collection: String,
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Show the configured lead statuses.
    Statuses,
    CreateStatus {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "#4CAF50")]
        color: String,
    },
    UpdateStatus {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        color: Option<String>,
    },
    CreateDeal(DealArgs),
}

#[derive(Args, Debug)]
struct DealArgs {
    #[arg(long)]
    lead_id: String,
    #[arg(long)]
    amount: f64,
    #[arg(long, default_value = "discovery")]
    stage: DealStage,
    #[arg(long, default_value_t = 0.0)]
    probability: f64,
    /// Expected close date, e.g. 2024-06-30.
    #[arg(long)]
    expected_close_date: String,
    #[arg(long)]
    owner_id: Option<String>,
    #[arg(long)]
    lost_reason: Option<String>,
}

#[derive(Args, Debug)]
struct LeadArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    company: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long, default_value = "New")]
    status: LeadStatus,
    #[arg(long, default_value_t = 0.0)]
    value: f64,
    #[arg(long)]
    assigned_to: Option<String>,
}

#[derive(Args, Debug)]
struct LeadPatchArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    company: Option<String>,
    #[arg(long)]
    email: Option<String>,
    #[arg(long)]
    phone: Option<String>,
    #[arg(long)]
    status: Option<LeadStatus>,
    #[arg(long)]
    value: Option<f64>,
    #[arg(long)]
    assigned_to: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    let mut settings = load_settings();
    if let Some(url) = cli.supabase_url {
        settings.supabase_url = url;
    }
    let store = Arc::new(HttpStore::from_settings(&settings)?);
    let page_size = settings.page_size;

    let open = |spec: CollectionSpec| {
        CollectionView::new_with_dependencies(
            spec.clone(),
            store.clone(),
            client_core::schema_for(&spec),
            page_size,
        )
    };

    match cli.command {
        Command::List {
            collection,
            search,
            status,
            page,
            page_size: requested_size,
            json,
        } => {
            let view = open(collection_spec(&collection)?);
            view.load().await?;
            view.set_filter(search, StatusFilter::parse(&status)).await;
            let slice = view
                .paginate(page, requested_size.unwrap_or(page_size))
                .await;
            if json {
                println!("{}", serde_json::to_string_pretty(&slice.records)?);
            } else {
                render::print_page(view.spec(), &slice, view.page_count().await);
            }
        }
        Command::CreateLead(args) => {
            let view = open(CollectionSpec::LEADS);
            let fields = to_fields(&NewLead {
                name: args.name,
                company: args.company,
                email: args.email,
                phone: args.phone,
                status: args.status,
                value: args.value,
                assigned_to: args.assigned_to,
            })?;
            let record = report(view.create(fields).await)?;
            println!("created lead id={}", record.id);
        }
        Command::UpdateLead { id, fields } => {
            let view = open(CollectionSpec::LEADS);
            let patch = to_fields(&LeadPatch {
                name: fields.name,
                company: fields.company,
                email: fields.email,
                phone: fields.phone,
                status: fields.status,
                value: fields.value,
                assigned_to: fields.assigned_to,
            })?;
            if patch.is_empty() {
                return Err(anyhow!("nothing to update: pass at least one field"));
            }
            let record = report(view.update(&RecordId::from(id), patch).await)?;
            let lead: Lead = record.decode().context("backend returned a malformed lead")?;
            render::print_lead(&lead);
        }
        Command::Delete { collection, ids } => {
            let view = open(collection_spec(&collection)?);
            let ids: Vec<RecordId> = ids.into_iter().map(RecordId::from).collect();
            let outcome = view.bulk_delete(&ids).await?;
            for id in &outcome.deleted {
                println!("deleted {id}");
            }
            for (id, err) in &outcome.failed {
                error!(id = %id, error = %err, "delete failed");
            }
            if !outcome.is_complete() {
                return Err(anyhow!(
                    "{} of {} deletions failed",
                    outcome.failed.len(),
                    ids.len()
                ));
            }
        }
        Command::Statuses => {
            let view = open(CollectionSpec::LEAD_STATUSES);
            let snapshot = view.load().await?;
            render::print_statuses(&snapshot);
        }
        Command::CreateStatus { name, color } => {
            let view = open(CollectionSpec::LEAD_STATUSES);
            let fields = to_fields(&NewStatus {
                status_name: name,
                status_color: color,
            })?;
            let record = report(view.create(fields).await)?;
            let status: StatusRow = record
                .decode()
                .context("backend returned a malformed status")?;
            render::print_status(&status);
        }
        Command::UpdateStatus { id, name, color } => {
            let view = open(CollectionSpec::LEAD_STATUSES);
            let patch = to_fields(&StatusPatch {
                status_name: name,
                status_color: color,
            })?;
            if patch.is_empty() {
                return Err(anyhow!("nothing to update: pass --name or --color"));
            }
            let record = report(view.update(&RecordId::from(id), patch).await)?;
            let status: StatusRow = record
                .decode()
                .context("backend returned a malformed status")?;
            render::print_status(&status);
        }
        Command::CreateDeal(args) => {
            let view = open(CollectionSpec::DEALS);
            let fields = to_fields(&NewDeal {
                lead_id: RecordId::from(args.lead_id),
                amount: args.amount,
                stage: args.stage,
                probability: args.probability,
                expected_close_date: args.expected_close_date,
                owner_id: args.owner_id,
                lost_reason: args.lost_reason,
            })?;
            let record = report(view.create(fields).await)?;
            let deal: Deal = record.decode().context("backend returned a malformed deal")?;
            render::print_deal(&deal);
        }
    }

    Ok(())
}

fn collection_spec(table: &str) -> Result<CollectionSpec> {
    CollectionSpec::by_table(table).ok_or_else(|| anyhow!("unknown collection '{table}'"))
}

/// Prints field-level validation failures the way a form would show them.
fn report(result: Result<Record, CollectionError>) -> Result<Record> {
    result.map_err(|err| {
        for failure in err.validation_failures() {
            eprintln!("  {:<12} {}", failure.field, failure.message);
        }
        anyhow!(err)
    })
}
