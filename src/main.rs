use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use disksage::cli::{Cli, Command, DiffArgs, ListArgs, ScanArgs};
use disksage::config::Config;
use disksage::report::{json, table};
use disksage::scan;
use disksage::store::{self, diff};

fn init_logging(verbose: bool) {
    let default = if verbose { "disksage=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run_scan(mut config: Config, args: ScanArgs) -> Result<()> {
    if args.index_files {
        config.index_files = true;
    }
    if let Some(out) = &args.out {
        config
            .set_snapshot_dir(out)
            .with_context(|| format!("invalid output directory {}", out.display()))?;
    }

    let output = scan::run(&args.path, &config)
        .with_context(|| format!("failed to scan {}", args.path.display()))?;

    let saved = store::save(&output.result, &config.snapshot_dir).with_context(|| {
        format!("failed to save snapshot in {}", config.snapshot_dir.display())
    })?;

    print!(
        "{}",
        table::render_scan(&saved, output.result.total_bytes(), &output.stats)
    );
    Ok(())
}

fn run_diff(mut config: Config, args: DiffArgs) -> Result<()> {
    if let Some(dir) = &args.dir {
        config.set_snapshot_dir(dir)?;
    }
    let store_dir = &config.snapshot_dir;

    let (old_path, new_path) = if args.latest {
        store::latest_two(store_dir)?
    } else {
        let (Some(old), Some(new)) = (&args.old, &args.new) else {
            bail!("diff needs two snapshots, or --latest");
        };
        (store::resolve(store_dir, old)?, store::resolve(store_dir, new)?)
    };

    let old = store::load(&old_path)
        .with_context(|| format!("failed to load snapshot {}", old_path.display()))?;
    let new = store::load(&new_path)
        .with_context(|| format!("failed to load snapshot {}", new_path.display()))?;

    let report = diff::compare(&old, &new);

    if args.json {
        println!("{}", json::render_diff(&report)?);
    } else {
        print!("{}", table::render_diff(&report, args.limit));
    }
    Ok(())
}

fn run_list(mut config: Config, args: ListArgs) -> Result<()> {
    if let Some(dir) = &args.dir {
        config.set_snapshot_dir(dir)?;
    }

    let listings = store::list(&config.snapshot_dir)
        .with_context(|| format!("failed to list {}", config.snapshot_dir.display()))?;

    if args.json {
        println!("{}", json::render_listing(&listings)?);
    } else {
        print!("{}", table::render_listing(&listings));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = Config::load().context("failed to load config")?;

    match cli.command {
        Command::Scan(args) => run_scan(config, args),
        Command::Diff(args) => run_diff(config, args),
        Command::List(args) => run_list(config, args),
    }
}
