//! Sumoq CLI - Run Sumo Logic search jobs from query files
//!
//! Query files may carry `// @from`, `// @to`, `// @mode` and similar
//! directives; command-line flags override them.

mod api;
mod config;
mod output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use dialoguer::Password;
use std::fs;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use api::SumoClient;
use config::{Config, Profile};
use sumoq::{
    resolve_time, MetadataCache, OutputFormat, QueryDocument, ResultEntry, ResultMode,
    SearchError, SearchJobConfig, SearchJobHandle, SearchJobRequest, SearchJobService,
    SearchJobStatus, DEFAULT_PAGE_LIMIT,
};

const DEFAULT_FROM: &str = "-15m";
const DEFAULT_TO: &str = "now";
const DEFAULT_TIME_ZONE: &str = "UTC";

#[derive(Parser)]
#[command(name = "sumoq")]
#[command(about = "Sumoq CLI - Run Sumo Logic search jobs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage profiles (region + access keys)
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },

    /// Run a query: submit, wait, fetch, delete
    Run {
        /// Query file ("-" for stdin)
        file: Option<String>,
        #[command(flatten)]
        query: QueryArgs,
        /// Result mode: records or messages (inferred from the query if omitted)
        #[arg(short, long)]
        mode: Option<ResultMode>,
        /// Output format: table, json, csv
        #[arg(short, long)]
        output: Option<OutputFormat>,
        /// Max results to fetch
        #[arg(short, long)]
        limit: Option<u32>,
        /// Profile to use
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Individual search job steps
    Job {
        #[command(subcommand)]
        action: JobAction,
    },

    /// Suggest field names seen in earlier results
    Fields {
        /// Field name prefix
        #[arg(default_value = "")]
        prefix: String,
        /// Profile to use
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Suggest values of a metadata field (_sourceCategory, _collector, ...)
    Values {
        field: String,
        #[arg(default_value = "")]
        prefix: String,
        /// Profile to use
        #[arg(short, long)]
        profile: Option<String>,
    },

    /// Resolve a time expression (now, -15m, ISO-8601) to epoch millis
    Time { expr: String },

    /// Show current configuration
    Config,
}

#[derive(clap::Args)]
struct QueryArgs {
    /// Query text (instead of a file)
    #[arg(short = 'q', long = "query")]
    text: Option<String>,
    /// Start time: now, -15m, epoch millis, or ISO-8601
    #[arg(long)]
    from: Option<String>,
    /// End time
    #[arg(long)]
    to: Option<String>,
    /// Time zone (IANA name)
    #[arg(long = "tz")]
    time_zone: Option<String>,
    /// Search by receipt time instead of message time
    #[arg(long)]
    by_receipt_time: bool,
}

#[derive(Subcommand)]
enum ProfileAction {
    /// Add a new profile
    Add {
        /// Profile name (e.g., "prod", "staging")
        name: String,
        /// Access ID
        #[arg(long)]
        access_id: String,
        /// Access key (will prompt if not provided)
        #[arg(long)]
        access_key: Option<String>,
        /// Deployment region (us1, us2, eu, jp, au, ...)
        #[arg(long, default_value = "us1")]
        region: String,
        /// Full API base URL, overrides the region
        #[arg(long)]
        endpoint: Option<String>,
        /// Default time zone for queries
        #[arg(long = "tz")]
        time_zone: Option<String>,
    },
    /// List all profiles
    List,
    /// Set default profile
    Set {
        /// Profile name to set as default
        name: String,
    },
    /// Remove a profile
    Remove {
        /// Profile name to remove
        name: String,
    },
}

#[derive(Subcommand)]
enum JobAction {
    /// Create a search job and print its id
    Submit {
        /// Query file ("-" for stdin)
        file: Option<String>,
        #[command(flatten)]
        query: QueryArgs,
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Show the state of a search job
    Status {
        id: String,
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Fetch one page of results
    Fetch {
        id: String,
        #[arg(short, long, default_value = "records")]
        mode: ResultMode,
        #[arg(long, default_value = "0")]
        offset: u32,
        #[arg(short, long)]
        limit: Option<u32>,
        #[arg(short, long, default_value = "table")]
        output: OutputFormat,
        #[arg(short, long)]
        profile: Option<String>,
    },
    /// Delete a search job
    Delete {
        id: String,
        #[arg(short, long)]
        profile: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Profile { action } => cmd_profile(action),
        Commands::Run {
            file,
            query,
            mode,
            output,
            limit,
            profile,
        } => cmd_run(file, query, mode, output, limit, profile).await,
        Commands::Job { action } => cmd_job(action).await,
        Commands::Fields { prefix, profile } => cmd_fields(&prefix, profile),
        Commands::Values {
            field,
            prefix,
            profile,
        } => cmd_values(&field, &prefix, profile),
        Commands::Time { expr } => {
            println!("{}", resolve_time(&expr));
            Ok(())
        }
        Commands::Config => cmd_config(),
    }
}

// ============================================
// Helpers
// ============================================

/// Resolved profile plus a service bound to it
struct Session {
    name: String,
    profile: Profile,
    service: SearchJobService<SumoClient>,
}

fn connect(config: &Config, profile: Option<&str>, page_limit: Option<u32>) -> Result<Session> {
    let (name, profile) = config.get_profile(profile).context(
        "No profile specified and no default profile set. Use -p <profile> or 'sumoq profile add'.",
    )?;

    let access_key = profile.access_key().with_context(|| {
        format!(
            "No access key for profile '{}'. Store one with 'sumoq profile add' or set SUMOQ_ACCESS_KEY.",
            name
        )
    })?;

    let client = SumoClient::new(&profile.endpoint(), &profile.access_id, &access_key)?;
    let job_config = SearchJobConfig {
        page_limit: page_limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        ..SearchJobConfig::default()
    };

    Ok(Session {
        name: name.to_string(),
        profile: profile.clone(),
        service: SearchJobService::new(Arc::new(client), job_config),
    })
}

fn read_query(file: Option<&str>, text: Option<&str>) -> Result<QueryDocument> {
    let source = match (file, text) {
        (Some(_), Some(_)) => bail!("Cannot specify both a query file and --query"),
        (None, Some(t)) => t.to_string(),
        (Some("-"), None) | (None, None) => {
            io::read_to_string(io::stdin()).context("Failed to read query from stdin")?
        }
        (Some(f), None) => {
            fs::read_to_string(f).with_context(|| format!("Failed to read file: {}", f))?
        }
    };

    let doc = QueryDocument::parse(&source);
    if doc.is_empty() {
        bail!("Query is empty");
    }
    Ok(doc)
}

/// Flags win over directives, directives over profile defaults
fn build_request(doc: &QueryDocument, args: &QueryArgs, profile: &Profile) -> SearchJobRequest {
    let meta = &doc.metadata;

    let from = args.from.as_deref().or(meta.from.as_deref()).unwrap_or(DEFAULT_FROM);
    let to = args.to.as_deref().or(meta.to.as_deref()).unwrap_or(DEFAULT_TO);
    let time_zone = args
        .time_zone
        .as_deref()
        .or(meta.time_zone.as_deref())
        .or(profile.time_zone.as_deref())
        .unwrap_or(DEFAULT_TIME_ZONE);
    let by_receipt_time = args.by_receipt_time || meta.by_receipt_time.unwrap_or(false);

    SearchJobRequest::new(doc.query.clone(), resolve_time(from), resolve_time(to))
        .with_time_zone(time_zone)
        .with_receipt_time(by_receipt_time)
}

fn print_progress(status: &SearchJobStatus) {
    eprint!(
        "\r{} {} messages, {} records   ",
        status.state.to_string().dimmed(),
        status.message_count,
        status.record_count
    );
}

fn update_cache(profile: &str, entries: &[ResultEntry]) {
    let result = Config::cache_path(profile).and_then(|path| {
        let mut cache = MetadataCache::load(&path)?;
        if cache.absorb(entries) {
            cache.save(&path)?;
        }
        Ok(())
    });

    if let Err(e) = result {
        tracing::warn!("Failed to update metadata cache: {:#}", e);
    }
}

fn load_cache(config: &Config, profile: Option<&str>) -> Result<MetadataCache> {
    let (name, _) = config
        .get_profile(profile)
        .context("No profile specified and no default profile set. Use -p <profile>.")?;
    let path = Config::cache_path(name)?;
    MetadataCache::load(&path).with_context(|| format!("Failed to read cache {:?}", path))
}

// ============================================
// Command Implementations
// ============================================

fn cmd_profile(action: ProfileAction) -> Result<()> {
    let mut config = Config::load()?;

    match action {
        ProfileAction::Add {
            name,
            access_id,
            access_key,
            region,
            endpoint,
            time_zone,
        } => {
            Config::check_profile_name(&name)?;

            let access_key = match access_key {
                Some(k) => k,
                None => Password::new()
                    .with_prompt("Access key (empty to use SUMOQ_ACCESS_KEY)")
                    .allow_empty_password(true)
                    .interact()
                    .context("Failed to read access key")?,
            };

            let profile = Profile {
                access_key: Some(access_key).filter(|k| !k.is_empty()),
                endpoint,
                time_zone,
                ..Profile::new(region, access_id)
            };
            let endpoint = profile.endpoint();

            config.add_profile(name.clone(), profile);
            config.save()?;
            println!("{} Profile '{}' added ({})", "✓".green(), name, endpoint);
        }

        ProfileAction::List => {
            if config.profiles.is_empty() {
                println!("No profiles configured.");
                println!("\n{}", "Add one with:".dimmed());
                println!("  sumoq profile add <name> --access-id <ID> --region <REGION>");
                return Ok(());
            }

            println!("{}", "Profiles:".bold());
            for (name, profile) in &config.profiles {
                let is_default = config.default_profile.as_ref() == Some(name);
                let default_marker = if is_default {
                    " (default)".green().to_string()
                } else {
                    String::new()
                };

                println!(
                    "  {} {} ({}){}",
                    name.cyan(),
                    profile.endpoint().dimmed(),
                    profile.access_id,
                    default_marker
                );
            }
        }

        ProfileAction::Set { name } => {
            if config.set_default_profile(name.clone()) {
                config.save()?;
                println!("{} Default profile set to '{}'", "✓".green(), name);
            } else {
                bail!("Profile '{}' not found", name);
            }
        }

        ProfileAction::Remove { name } => {
            if config.remove_profile(&name) {
                config.save()?;
                println!("{} Profile '{}' removed", "✓".green(), name);
            } else {
                bail!("Profile '{}' not found", name);
            }
        }
    }

    Ok(())
}

async fn cmd_run(
    file: Option<String>,
    args: QueryArgs,
    mode: Option<ResultMode>,
    output: Option<OutputFormat>,
    limit: Option<u32>,
    profile: Option<String>,
) -> Result<()> {
    let doc = read_query(file.as_deref(), args.text.as_deref())?;
    let meta = &doc.metadata;

    let config = Config::load()?;
    let session = connect(&config, profile.as_deref(), limit.or(meta.limit))?;

    let request = build_request(&doc, &args, &session.profile);
    let mode = mode
        .or(meta.mode)
        .unwrap_or_else(|| ResultMode::infer(&doc.query));
    let format = output.or(meta.output).unwrap_or_default();

    if let Some(name) = &meta.name {
        eprintln!("{} {}", "Running".dimmed(), name.cyan());
    }
    tracing::info!(
        "Search {} → {} ({}) as {}",
        request.from,
        request.to,
        request.time_zone,
        mode
    );

    let result = session
        .service
        .execute(&request, mode, Some(&print_progress))
        .await;
    eprintln!();

    let entries = match result {
        Ok(entries) => entries,
        Err(SearchError::Timeout { id, attempts }) => {
            // Timed-out jobs are left running on the server
            let _ = session.service.cleanup(&SearchJobHandle::new(id.clone())).await;
            return Err(SearchError::Timeout { id, attempts }.into());
        }
        Err(e) => return Err(e.into()),
    };

    let mut stdout = io::stdout().lock();
    output::render(&entries, format, &mut stdout)?;
    stdout.flush()?;

    eprintln!(
        "{} {} {}",
        entries.len().to_string().green(),
        mode,
        format!("({})", session.name).dimmed()
    );

    update_cache(&session.name, &entries);

    Ok(())
}

async fn cmd_job(action: JobAction) -> Result<()> {
    let config = Config::load()?;

    match action {
        JobAction::Submit {
            file,
            query,
            profile,
        } => {
            let doc = read_query(file.as_deref(), query.text.as_deref())?;
            let session = connect(&config, profile.as_deref(), None)?;
            let request = build_request(&doc, &query, &session.profile);

            let handle = session.service.submit(&request).await?;
            println!("{}", handle);
        }

        JobAction::Status { id, profile } => {
            let session = connect(&config, profile.as_deref(), None)?;
            let status = session.service.status(&SearchJobHandle::new(id)).await?;

            println!("{}", status.state.to_string().bold());
            println!("  Messages: {}", status.message_count);
            println!("  Records: {}", status.record_count);
            for warning in &status.pending_warnings {
                println!("  {} {}", "warning:".yellow(), warning);
            }
            for error in &status.pending_errors {
                println!("  {} {}", "error:".red(), error);
            }
        }

        JobAction::Fetch {
            id,
            mode,
            offset,
            limit,
            output: format,
            profile,
        } => {
            let session = connect(&config, profile.as_deref(), limit)?;
            let entries = session
                .service
                .fetch(&SearchJobHandle::new(id), mode, Some(offset), limit)
                .await?;

            let mut stdout = io::stdout().lock();
            output::render(&entries, format, &mut stdout)?;
            stdout.flush()?;

            update_cache(&session.name, &entries);
        }

        JobAction::Delete { id, profile } => {
            let session = connect(&config, profile.as_deref(), None)?;
            let handle = SearchJobHandle::new(id);
            session.service.delete_job(&handle).await?;
            println!("{} Search job {} deleted", "✓".green(), handle);
        }
    }

    Ok(())
}

fn cmd_fields(prefix: &str, profile: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let cache = load_cache(&config, profile.as_deref())?;

    for field in cache.suggest_fields(prefix) {
        println!("{}", field);
    }
    Ok(())
}

fn cmd_values(field: &str, prefix: &str, profile: Option<String>) -> Result<()> {
    let config = Config::load()?;
    let cache = load_cache(&config, profile.as_deref())?;

    for value in cache.suggest_values(field, prefix) {
        println!("{}", value);
    }
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = Config::load()?;

    println!("{}", "Configuration:".bold());
    println!("  Path: {:?}", Config::config_path()?);
    println!(
        "  Default Profile: {}",
        config.default_profile.as_deref().unwrap_or("None").cyan()
    );
    println!("  Profiles: {}", config.profiles.len());

    if let Some((name, profile)) = config.get_profile(None) {
        println!("  Endpoint: {}", profile.endpoint());
        println!(
            "  Access Key: {}",
            if profile.access_key().is_some() {
                "Set".green()
            } else {
                "Not set".red()
            }
        );
        println!("  Cache: {:?}", Config::cache_path(name)?);
    }

    Ok(())
}
