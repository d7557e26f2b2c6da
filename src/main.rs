//! CLI entry point for forge-harvest.

use std::io::{self, IsTerminal, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result, bail};
use clap::Parser;
use forge_harvest::config::{Overrides, Settings, TOKENS_ENV, load_file_config};
use forge_harvest::fetch::{
    CredentialPool, FetchOutcome, Fetcher, Page, PageCeiling, RateLimiter, StopReason,
    build_forge_client,
};
use forge_harvest::forge::{ForgeApi, RepoSlug, Repository};
use forge_harvest::harvest::{HarvestPool, harvest_contributor_countries};
use forge_harvest::locate::{LocationResolver, NominatimGeocoder};
use forge_harvest::user_agent::forge_user_agent;
use secrecy::SecretString;
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

mod cli;

use cli::{Cli, Command, ContributorsArgs, LocateArgs, RepoArgs};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let mut cli = Cli::parse();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    // Logs go to stderr; stdout carries JSON lines only.
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let file = load_file_config(cli.config.as_deref()).context("Failed to load configuration")?;
    let overrides = Overrides {
        tokens: std::mem::take(&mut cli.tokens)
            .into_iter()
            .map(SecretString::new)
            .collect(),
        concurrency: cli.concurrency.map(usize::from),
        offline: cli.offline(),
    };
    let env_tokens = std::env::var(TOKENS_ENV).ok();
    let settings = Settings::resolve(file, env_tokens.as_deref(), overrides)
        .context("Invalid configuration")?;
    debug!(
        api = %settings.api_base_url,
        tokens = settings.tokens.len(),
        geocoding = settings.geocoding,
        "configuration resolved"
    );

    match cli.command {
        Command::Locate(args) => run_locate(&settings, args).await,
        Command::Contributors(args) => run_contributors(settings, args).await,
        Command::Repo(args) => run_repo(settings, args).await,
    }
}

fn build_resolver(settings: &Settings) -> Result<LocationResolver> {
    if !settings.geocoding {
        debug!("geocoding disabled");
        return Ok(LocationResolver::offline());
    }
    let geocoder = NominatimGeocoder::with_base_url(&settings.geocoder_base_url)
        .context("Failed to set up the geocoder")?;
    Ok(LocationResolver::with_geocoder(Arc::new(geocoder)))
}

fn build_api(settings: &mut Settings) -> Result<ForgeApi> {
    let tokens = std::mem::take(&mut settings.tokens);
    if tokens.is_empty() {
        bail!("No forge tokens configured. Pass --token, set {TOKENS_ENV} or add `tokens` to the config file");
    }
    let pool = CredentialPool::new(tokens).context("Invalid forge token")?;
    let client = build_forge_client(&forge_user_agent(), settings.request_timeout)
        .context("Failed to build HTTP client")?;
    let pacer = Arc::new(RateLimiter::new(settings.request_spacing));
    let fetcher = Fetcher::new(client, pool, settings.retry_policy(), pacer)
        .with_page_size(settings.page_size)?;
    ForgeApi::new(fetcher, &settings.api_base_url).context("Invalid API base URL")
}

fn emit<T: Serialize>(out: &mut impl Write, row: &T) -> Result<()> {
    serde_json::to_writer(&mut *out, row)?;
    writeln!(out)?;
    Ok(())
}

#[derive(Serialize)]
struct LocateRow<'a> {
    location: &'a str,
    country: Option<&'a str>,
    decided_by: Option<&'static str>,
}

async fn run_locate(settings: &Settings, args: LocateArgs) -> Result<ExitCode> {
    let resolver = build_resolver(settings)?;

    let locations = if !args.locations.is_empty() {
        args.locations
    } else if !io::stdin().is_terminal() {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let mut collected = Vec::new();
        while let Some(line) = lines.next_line().await? {
            collected.push(line);
        }
        collected
    } else {
        info!("No input provided. Pass locations as arguments or pipe them via stdin.");
        info!("Example: echo 'Berlin, Germany' | forge-harvest locate");
        return Ok(ExitCode::SUCCESS);
    };

    let mut out = io::stdout().lock();
    let mut resolved = 0_usize;
    for location in &locations {
        let classification = resolver.resolve_detailed(location).await;
        if classification.verdict.is_resolved() {
            resolved += 1;
        }
        emit(
            &mut out,
            &LocateRow {
                location,
                country: classification.verdict.as_country(),
                decided_by: classification.decided_by,
            },
        )?;
    }
    info!(total = locations.len(), resolved, "locations classified");
    Ok(ExitCode::SUCCESS)
}

async fn run_contributors(mut settings: Settings, args: ContributorsArgs) -> Result<ExitCode> {
    let repo: RepoSlug = args.repo.parse()?;
    let resolver = Arc::new(build_resolver(&settings)?);
    let api = build_api(&mut settings)?;

    let interrupt = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&interrupt);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing in-flight work");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let pool = match settings.concurrency {
        Some(concurrency) => HarvestPool::new(concurrency)?,
        None => HarvestPool::for_credentials(api.fetcher().pool_size()),
    }
    .with_interrupt(interrupt);
    info!(repo = %repo, concurrency = pool.concurrency(), "harvesting contributor countries");

    let harvest = harvest_contributor_countries(&api, resolver, &repo, &pool).await?;

    let mut out = io::stdout().lock();
    for row in harvest
        .rows
        .iter()
        .filter(|row| !args.resolved_only || row.country.is_some())
    {
        emit(&mut out, row)?;
    }

    let fetch_stats = api.fetcher().stats();
    info!(
        rows = harvest.rows.len(),
        resolved = harvest.rows.iter().filter(|row| row.country.is_some()).count(),
        skipped = harvest.stats.skipped,
        failed = harvest.stats.failed,
        requests = fetch_stats.requests(),
        rate_limited = fetch_stats.rate_limited(),
        cooldowns = fetch_stats.cooldowns(),
        "contributor harvest finished"
    );
    if harvest.listing_stop != StopReason::EndOfData {
        warn!(stop = ?harvest.listing_stop, "contributor list may be incomplete");
    }
    if harvest.stats.interrupted {
        return Ok(ExitCode::from(130));
    }
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct RepoSummary {
    repository: Repository,
    commits: Option<u64>,
    contributors: Option<u64>,
    releases: Option<u64>,
    pull_requests: Option<usize>,
}

fn optional_count(label: &str, outcome: FetchOutcome<u64>) -> Option<u64> {
    match outcome {
        FetchOutcome::Success(Page { payload, .. }) => Some(payload),
        other => {
            warn!(count = label, outcome = other.label(), "count unavailable");
            None
        }
    }
}

async fn run_repo(mut settings: Settings, args: RepoArgs) -> Result<ExitCode> {
    let repo: RepoSlug = args.repo.parse()?;
    let api = build_api(&mut settings)?;

    let repository = match api.repository(&repo).await {
        FetchOutcome::Success(Page { payload, .. }) => payload,
        FetchOutcome::NotFound => bail!("Repository {repo} not found"),
        FetchOutcome::Failed(failure) => {
            return Err(failure).with_context(|| format!("Failed to fetch repository {repo}"));
        }
        FetchOutcome::ExhaustedRetries(exhaustion) => {
            bail!("Gave up fetching repository {repo}: {exhaustion}")
        }
        other => bail!("Unexpected outcome {} for repository {repo}", other.label()),
    };

    let (commits, contributors, releases, pulls) = futures_util::future::join4(
        api.commit_count(&repo),
        api.contributor_count(&repo),
        api.release_count(&repo),
        api.pull_requests(&repo, PageCeiling::EXTENDED),
    )
    .await;

    let pull_requests = match pulls.stop {
        StopReason::EndOfData | StopReason::PageCeiling => Some(pulls.entries.len()),
        stop => {
            warn!(?stop, fetched = pulls.entries.len(), "pull request count unavailable");
            None
        }
    };

    let summary = RepoSummary {
        repository,
        commits: optional_count("commits", commits),
        contributors: optional_count("contributors", contributors),
        releases: optional_count("releases", releases),
        pull_requests,
    };
    emit(&mut io::stdout().lock(), &summary)?;
    Ok(ExitCode::SUCCESS)
}
