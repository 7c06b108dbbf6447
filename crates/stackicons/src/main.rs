use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand};
use stackicons_core::config::{StoreSettings, ValueSource, load_config, resolve_config_path};
use stackicons_core::fallback::FallbackTable;
use stackicons_core::matcher::ResolutionKind;
use stackicons_core::model::Item;
use stackicons_core::repair::{RepairOptions, RepairReport, inspect_remote, repair_remote};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "stackicons",
    version,
    about = "Copy tech-stack icons from the English homepage onto the Arabic one"
)]
struct Cli {
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Print resolved store settings")]
    diagnostics: bool,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone)]
struct RuntimeOptions {
    config: Option<PathBuf>,
    diagnostics: bool,
}

impl RuntimeOptions {
    fn from_cli(cli: &Cli) -> Self {
        Self {
            config: cli.config.clone(),
            diagnostics: cli.diagnostics,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    #[command(about = "Fill missing target icons and write the list back")]
    Repair(RepairArgs),
    #[command(about = "Fetch both tech-stack lists and print them")]
    Inspect(InspectArgs),
    #[command(about = "Print the effective fallback table")]
    Fallback,
}

#[derive(Debug, Args)]
struct RepairArgs {
    #[arg(long, help = "Resolve icons but skip the mutation")]
    dry_run: bool,
    #[arg(long, help = "Re-match items that already have an icon")]
    overwrite_existing: bool,
}

#[derive(Debug, Args)]
struct InspectArgs {
    #[arg(long, help = "Print items as JSON")]
    json: bool,
}

struct Loaded {
    config_path: PathBuf,
    config_source: ValueSource,
    settings: StoreSettings,
    table: FallbackTable,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let runtime = RuntimeOptions::from_cli(&cli);

    match cli.command {
        Some(Commands::Repair(args)) => run_repair(&runtime, args),
        Some(Commands::Inspect(args)) => run_inspect(&runtime, args),
        Some(Commands::Fallback) => run_fallback(&runtime),
        None => {
            let mut command = Cli::command();
            command.print_help()?;
            println!();
            Ok(())
        }
    }
}

fn run_repair(runtime: &RuntimeOptions, args: RepairArgs) -> Result<()> {
    let loaded = load_runtime(runtime)?;
    let report = repair_remote(
        &loaded.settings,
        &loaded.table,
        &RepairOptions {
            dry_run: args.dry_run,
            overwrite_existing: args.overwrite_existing,
        },
    )?;

    println!("repair");
    print_scope(&loaded.settings);
    println!("overwrite_existing: {}", args.overwrite_existing);
    print_repair_report(&report);
    print_diagnostics(runtime, &loaded);

    report.ensure_written()?;
    if let Some(outcome) = &report.write {
        info!(
            document = %report.scope.document_id,
            status = outcome.status,
            items = report.target_items,
            "tech stack updated"
        );
    }
    Ok(())
}

fn run_inspect(runtime: &RuntimeOptions, args: InspectArgs) -> Result<()> {
    let loaded = load_runtime(runtime)?;
    let report = inspect_remote(&loaded.settings)?;

    if args.json {
        let rendered = serde_json::json!({
            report.scope.source_language.clone(): report.source,
            report.scope.target_language.clone(): report.target,
        });
        println!("{}", serde_json::to_string_pretty(&rendered)?);
        return Ok(());
    }

    println!("inspect");
    print_scope(&loaded.settings);
    print_items(&report.scope.source_language, &report.source);
    print_items(&report.scope.target_language, &report.target);
    print_diagnostics(runtime, &loaded);
    Ok(())
}

fn run_fallback(runtime: &RuntimeOptions) -> Result<()> {
    let loaded = load_runtime(runtime)?;
    println!("fallback table");
    println!("config_path: {}", normalize_path(&loaded.config_path));
    println!("entries: {}", loaded.table.len());
    println!("default_icon: {}", loaded.table.default_icon());
    for (name, icon) in loaded.table.entries() {
        println!("entry: {name} -> {icon}");
    }
    print_diagnostics(runtime, &loaded);
    Ok(())
}

fn print_scope(settings: &StoreSettings) {
    println!("project_id: {}", settings.project_id);
    println!("dataset: {}", settings.dataset);
    println!("document_id: {}", settings.document_id);
    println!("source_language: {}", settings.source_language);
    println!("target_language: {}", settings.target_language);
}

fn print_repair_report(report: &RepairReport) {
    println!("source_items: {}", report.source_items);
    println!("target_items: {}", report.target_items);
    for resolution in &report.resolutions {
        match &resolution.matched_source {
            Some(source) => println!(
                "item: {} -> {} ({} \"{}\")",
                resolution.name,
                resolution.icon,
                resolution.kind.as_str(),
                source
            ),
            None => println!(
                "item: {} -> {} ({})",
                resolution.name,
                resolution.icon,
                resolution.kind.as_str()
            ),
        }
    }
    for kind in ResolutionKind::ALL {
        println!("resolved.{}: {}", kind.as_str(), report.count(kind));
    }
    println!("dry_run: {}", report.dry_run);
    println!("requests: {}", report.request_count);
    match &report.write {
        None => println!("write: skipped"),
        Some(outcome) if outcome.is_success() => {
            println!("write.status: {}", outcome.status);
            println!("write.result: success");
            println!("updated_items: {}", report.target_items);
        }
        Some(outcome) => {
            println!("write.status: {}", outcome.status);
            println!("write.result: failed");
            println!("write.body: {}", outcome.body);
        }
    }
}

fn print_items(language: &str, items: &[Item]) {
    println!("{language}.count: {}", items.len());
    if items.is_empty() {
        println!("{language}.items: <none>");
    }
    for item in items {
        println!(
            "{language}.item: {} -> {}",
            item.name,
            item.icon().unwrap_or("<missing>")
        );
    }
}

fn print_diagnostics(runtime: &RuntimeOptions, loaded: &Loaded) {
    if runtime.diagnostics {
        println!(
            "\n[diagnostics]\nconfig_path={} ({})\n{}",
            normalize_path(&loaded.config_path),
            loaded.config_source.as_str(),
            loaded.settings.diagnostics()
        );
    }
}

fn load_runtime(runtime: &RuntimeOptions) -> Result<Loaded> {
    dotenvy::dotenv().ok();

    let cwd = env::current_dir().context("failed to read current directory")?;
    let (config_path, config_source) = resolve_config_path(runtime.config.as_deref(), &cwd);
    if config_source == ValueSource::Flag && !config_path.exists() {
        bail!("config file not found: {}", normalize_path(&config_path));
    }
    let config = load_config(&config_path)?;
    let settings = config.resolve_store_settings()?;
    let table = FallbackTable::from_config(&config.fallback)?;

    Ok(Loaded {
        config_path,
        config_source,
        settings,
        table,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}
