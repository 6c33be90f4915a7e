use std::{collections::HashMap, io};

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use tracing_subscriber::EnvFilter;

use crate::{
    collect::collect_branches,
    git2_ops::GitRepo,
    github::{fetch_pull_requests, pull_request_source},
    render::{Painter, Table, TableOptions},
    tree::Forest,
};

mod branch;
mod collect;
mod config;
mod divergence;
mod git;
mod git2_ops;
mod github;
mod render;
mod repo;
mod tree;

/// Print git branches showing upstream branch linkages.
#[derive(Parser)]
#[command(author, version, about)]
struct Args {
    /// Concise output that does not include PR information.
    #[arg(long)]
    concise: bool,

    /// Highlight the given branch.
    #[arg(long, value_name = "BRANCH")]
    highlight: Option<String>,

    /// Remote whose HEAD names the default branch [default: from config, else origin].
    #[arg(long)]
    remote: Option<String>,

    #[arg(long, short, help = "Enable verbose output")]
    verbose: bool,

    /// Print a shell completion script and exit.
    #[arg(long, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn main() {
    if let Err(e) = inner_main() {
        tracing::error!(error = ?e);
        std::process::exit(1);
    }
    std::process::exit(0);
}

fn inner_main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    if let Some(shell) = args.completions {
        clap_complete::generate(
            shell,
            &mut Args::command(),
            env!("CARGO_PKG_NAME"),
            &mut io::stdout(),
        );
        return Ok(());
    }

    git::ensure_work_tree()?;
    let mut config = config::load_config().context("loading config")?;
    if let Some(remote) = args.remote {
        config.remote = remote;
    }
    let concise = args.concise || config.concise;

    let repo = GitRepo::discover(".", &config.remote)?;
    let default_branch = repo.default_branch()?;
    let lines = git::list_branches()?;

    let prs = if concise {
        HashMap::new()
    } else {
        let source = pull_request_source(repo.remote_url().as_deref(), &config);
        fetch_pull_requests(source.as_ref())
    };

    let branches = collect_branches(&lines, &default_branch, &config.remote, &repo, &prs)
        .context("parsing `git branch -vv` output")?;
    tracing::debug!(
        "{} local branches, default is {}",
        branches.len(),
        default_branch
    );
    let forest = Forest::build(&branches);
    let entries = forest.linearize();
    let options = TableOptions {
        concise,
        highlight: args.highlight.as_deref(),
    };
    let table = Table::build(&entries, &branches, &forest, &options);
    print!("{}", table.render(&Painter::for_stdout()));
    Ok(())
}

fn init_logging(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
