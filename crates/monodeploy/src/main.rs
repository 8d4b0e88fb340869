use clap::{Parser, Subcommand};
use monodeploy::core::config::MonodeployConfig;
use monodeploy::core::error::{DeployError, DeployResult};
use monodeploy::pipeline::DeployContext;
use monodeploy::publish::pack::NpmPacker;
use monodeploy::registry::npm::NpmRegistry;
use monodeploy::registry::{MemoryRegistry, Registry};
use monodeploy::commands;
use monodeploy::vcs::git::GitAdapter;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing_subscriber::EnvFilter;

/// Automated versioning and publishing for package monorepos
#[derive(Parser)]
#[command(name = "monodeploy")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(styles = get_styles())]
struct Cli {
  /// Workspace root (defaults to the current directory)
  #[arg(long, global = true)]
  cwd: Option<PathBuf>,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Analyze changes and print the release plan
  Plan {
    /// Output as JSON for CI integration
    #[arg(long)]
    json: bool,
  },
  /// Run the release pipeline
  Run {
    /// Suppress registry uploads, commits and tag pushes
    #[arg(long)]
    dry_run: bool,

    /// Registry base URL
    #[arg(long)]
    registry_url: Option<String>,

    /// Skip the registry entirely
    #[arg(long)]
    no_registry: bool,

    /// Keep version bumps on disk after a successful run
    #[arg(long)]
    persist_versions: bool,

    /// Publish dependency groups strictly before their dependents
    #[arg(long)]
    topological: bool,

    /// Produce prerelease versions under the prerelease dist-tag
    #[arg(long)]
    prerelease: bool,

    /// Baseline revision for change analysis
    #[arg(long)]
    base_branch: Option<String>,

    /// Head revision for change analysis
    #[arg(long)]
    commit_sha: Option<String>,

    /// Cap on simultaneous per-package pipelines (0 = unbounded)
    #[arg(long)]
    jobs: Option<usize>,

    /// Write the applied strategies as JSON to this path
    #[arg(long)]
    changeset: Option<PathBuf>,
  },
}

fn get_styles() -> clap::builder::Styles {
  clap::builder::Styles::styled()
    .usage(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .header(
      anstyle::Style::new()
        .bold()
        .underline()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Yellow))),
    )
    .literal(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Green))))
    .invalid(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .error(
      anstyle::Style::new()
        .bold()
        .fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::Red))),
    )
    .placeholder(anstyle::Style::new().fg_color(Some(anstyle::Color::Ansi(anstyle::AnsiColor::White))))
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("monodeploy=warn")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();
  if let Err(e) = execute(cli).await {
    eprintln!("❌ {e}");
    std::process::exit(e.exit_code().as_i32());
  }
}

async fn execute(cli: Cli) -> DeployResult<()> {
  let cwd = match cli.cwd {
    Some(path) => path,
    None => std::env::current_dir().map_err(|e| anyhow::anyhow!("failed to resolve current directory: {e}"))?,
  };

  let mut config = if MonodeployConfig::exists(&cwd) {
    MonodeployConfig::load(&cwd)?
  } else {
    MonodeployConfig::default()
  };
  config.cwd = Some(cwd.clone());

  match cli.command {
    Commands::Plan { json } => {
      let ctx = build_context(config, &cwd)?;
      commands::run_plan(&ctx, json).await
    }
    Commands::Run {
      dry_run,
      registry_url,
      no_registry,
      persist_versions,
      topological,
      prerelease,
      base_branch,
      commit_sha,
      jobs,
      changeset,
    } => {
      config.dry_run |= dry_run;
      config.no_registry |= no_registry;
      config.persist_versions |= persist_versions;
      config.topological |= topological;
      config.prerelease |= prerelease;
      if let Some(url) = registry_url {
        config.registry_url = Some(url);
      }
      if let Some(base) = base_branch {
        config.git.base_branch = base;
      }
      if let Some(sha) = commit_sha {
        config.git.commit_sha = sha;
      }
      if let Some(jobs) = jobs {
        config.jobs = jobs;
      }
      if let Some(changeset) = changeset {
        config.changeset_filename = Some(changeset);
      }

      let mut ctx = build_context(config, &cwd)?;
      ctx.show_progress = true;

      // A signal after APPLY must trigger the restore path, not a hard exit.
      let cancel = ctx.cancel.clone();
      tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
          cancel.store(true, Ordering::Relaxed);
        }
      });

      commands::run_deploy(&ctx).await?;
      Ok(())
    }
  }
}

fn build_context(config: MonodeployConfig, cwd: &PathBuf) -> DeployResult<DeployContext> {
  let scm = GitAdapter::open(cwd).map_err(DeployError::Other)?;

  let registry: Arc<dyn Registry> = match (&config.registry_url, config.no_registry) {
    (Some(url), false) => Arc::new(NpmRegistry::new(url.clone())),
    _ => Arc::new(MemoryRegistry::new()),
  };

  Ok(DeployContext::new(config, Arc::new(scm), registry, Arc::new(NpmPacker)))
}
