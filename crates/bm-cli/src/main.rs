use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bm")]
#[command(about = "BeatMarket order tooling", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> overrides)
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Reconciled "my purchases" view for a buyer
    Orders {
        #[arg(long)]
        buyer: String,

        /// Layered config paths in merge order
        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Print JSON instead of key=value lines
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Reconciled "my sales" view for a seller
    Sales {
        #[arg(long)]
        seller: String,

        #[arg(long = "config")]
        config_paths: Vec<String>,

        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Seller dashboard: revenue, monthly buckets, recent orders, payout
    Dashboard {
        #[arg(long)]
        seller: String,

        #[arg(long = "config")]
        config_paths: Vec<String>,
    },

    /// Reconcile a JSON record export offline (no store) and print the report
    Reconcile {
        /// JSON file: an array of records or {"records": [...]}
        #[arg(long)]
        input: String,

        /// Seller view for this seller id; buyer view when absent
        #[arg(long)]
        seller: Option<String>,

        /// Evaluation time (RFC 3339); defaults to the current time
        #[arg(long)]
        now: Option<String>,

        #[arg(long = "config")]
        config_paths: Vec<String>,

        /// Fail on config keys the offline path does not read
        #[arg(long, default_value_t = false)]
        strict_config: bool,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations.
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Silent if the file does not exist.
    let _ = dotenvy::from_filename(".env.local");

    // stdout carries command output; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Db { cmd } => {
            let pool = bm_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = bm_db::status(&pool).await?;
                    println!("db_ok={} has_purchases_table={}", s.ok, s.has_purchases_table);
                }
                DbCmd::Migrate => {
                    bm_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = bm_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Orders {
            buyer,
            config_paths,
            json,
        } => commands::orders::orders(&buyer, &config_paths, json).await?,

        Commands::Sales {
            seller,
            config_paths,
            json,
        } => commands::orders::sales(&seller, &config_paths, json).await?,

        Commands::Dashboard {
            seller,
            config_paths,
        } => commands::orders::dashboard(&seller, &config_paths).await?,

        Commands::Reconcile {
            input,
            seller,
            now,
            config_paths,
            strict_config,
        } => {
            let now = now.as_deref().map(parse_now).transpose()?;
            commands::reconcile::run(commands::reconcile::ReconcileArgs {
                input,
                seller,
                now,
                config_paths,
                strict_config,
            })?;
        }
    }

    Ok(())
}

fn parse_now(s: &str) -> Result<DateTime<Utc>> {
    let ts = DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("invalid --now (expected RFC 3339): {s}"))?;
    Ok(ts.with_timezone(&Utc))
}
