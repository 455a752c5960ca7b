#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

mod config;
mod logging;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use dinekit_db::DbHandle;
use dinekit_security::{PrivilegeAssertion, TenantContext, TenantContextResolver};
use restaurant_store::{CategoriesRepo, DishesRepo, Migrator, duplicate_menu, tenant_report};
use serde_json::json;

use crate::config::AppConfig;

/// Dinekit administrative tool
#[derive(Parser)]
#[command(name = "dinekit-admin")]
#[command(about = "Dinekit administrative tool: migrations, menu duplication, tenant reports")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print effective configuration (YAML) and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Print the menu of one restaurant
    Menu {
        /// Restaurant to act as; falls back to `tenancy.static_tenant`
        #[arg(long)]
        tenant: Option<i64>,
    },
    /// Copy the menu of one restaurant into another
    DuplicateMenu {
        /// Restaurant to copy from
        #[arg(long)]
        from: i64,
        /// Restaurant to copy into; falls back to `tenancy.static_tenant`
        #[arg(long)]
        tenant: Option<i64>,
        /// Administrative role asserted by the operator
        #[arg(long)]
        admin_role: String,
    },
    /// Row counts per restaurant
    Report {
        /// Administrative role asserted by the operator
        #[arg(long)]
        admin_role: String,
        /// Limit the report to these tables (repeatable)
        #[arg(long = "table")]
        tables: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref())?;
    logging::init(&config.logging, cli.verbose);

    if cli.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    let Some(command) = cli.command else {
        anyhow::bail!("no command given; see --help");
    };

    let resolver = TenantContextResolver::from_config(&config.tenancy)?;
    let db = DbHandle::connect(&config.database)
        .await
        .context("cannot connect to database")?;
    tracing::info!(engine = ?db.engine(), "dinekit-admin starting");

    let res = run(command, &db, &resolver).await;
    finish(res, db.close().await)
}

/// The command's own error wins over a failure to close the connection.
fn finish<E>(res: Result<()>, closed: Result<(), E>) -> Result<()>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match (res, closed) {
        (Err(e), Err(close_err)) => {
            tracing::warn!(error = %close_err, "closing the database failed");
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(()), closed) => closed.context("cannot close database"),
    }
}

async fn run(command: Commands, db: &DbHandle, resolver: &TenantContextResolver) -> Result<()> {
    match command {
        Commands::Migrate => {
            db.run_migrations::<Migrator>()
                .await
                .context("migration failed")?;
            println!("migrations applied");
        }
        Commands::Menu { tenant } => {
            let ctx = scoped(resolver, tenant)?;
            let categories = CategoriesRepo::new(db.conn(), ctx.clone()).list().await?;
            let dishes = DishesRepo::new(db.conn(), ctx);
            let mut menu = Vec::with_capacity(categories.len());
            for category in categories {
                let items = dishes.by_category(category.id).await?;
                menu.push(json!({"category": category, "dishes": items}));
            }
            println!("{}", serde_json::to_string_pretty(&menu)?);
        }
        Commands::DuplicateMenu {
            from,
            tenant,
            admin_role,
        } => {
            let target = scoped(resolver, tenant)?;
            let from = dinekit_security::TenantId::new(from)
                .with_context(|| format!("invalid source restaurant: {from}"))?;
            let to = target
                .tenant_id()
                .context("no target restaurant resolved")?;
            let copied = duplicate_menu(db, &PrivilegeAssertion::new(admin_role), from, to)
                .await
                .context("menu duplication failed")?;
            println!("{}", serde_json::to_string_pretty(&copied)?);
        }
        Commands::Report { admin_role, tables } => {
            let report = tenant_report(db.conn(), &PrivilegeAssertion::new(admin_role), &tables)
                .await
                .context("report failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}

/// Tenant for scoped commands: `--tenant`, else the configured static tenant.
fn scoped(resolver: &TenantContextResolver, explicit: Option<i64>) -> Result<TenantContext> {
    let ctx = resolver.resolve_job(explicit);
    if !ctx.has_tenant() {
        anyhow::bail!("no restaurant given: pass --tenant or set tenancy.static_tenant");
    }
    tracing::debug!(tenant = ?ctx.tenant_id(), origin = ?ctx.origin(), "tenant resolved");
    Ok(ctx)
}
