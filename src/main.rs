//! Command-line entry point for building datasets from tagged imagesets.

use std::path::PathBuf;

use dsforge::app_dirs;
use dsforge::catalog;
use dsforge::config::{CreateConfig, load_create_config};
use dsforge::dataset::{
    CreateInput, CreateOutput, Dataset, DatasetError, PipelineReport, assemble, process_result,
};
use dsforge::interaction::{BatchInteraction, Interaction, TerminalInteraction};
use dsforge::local_cache::LocalCache;
use dsforge::logging::{self, Console};
use dsforge::plugins::{self, BuiltinPlugin, copy::CopyPlugin};
use dsforge::store::{ArtifactKind, ImagesetStore, LocalDirStore};

/// Entries of the application root that survive a plain `clean`.
const PRESERVED_ON_CLEAN: &[&str] = &["logs"];

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, PartialEq)]
enum Command {
    Create(CreateOptions),
    List {
        kind: ArtifactKind,
        store: PathBuf,
        details: Option<Details>,
    },
    Inspect(InspectTarget),
    InspectImageset {
        name: String,
        store: PathBuf,
    },
    Clean {
        all: bool,
    },
}

#[derive(Debug, PartialEq)]
struct CreateOptions {
    config: PathBuf,
    store: PathBuf,
    plugin: String,
    batch: bool,
}

#[derive(Debug, PartialEq)]
struct Details {
    filter: Option<String>,
}

#[derive(Debug, PartialEq)]
enum InspectTarget {
    Dir(PathBuf),
    Named { name: String, store: PathBuf },
}

fn run() -> Result<(), String> {
    let Some(command) = parse_args(std::env::args().skip(1).collect())? else {
        return Ok(());
    };
    match command {
        Command::Create(options) => create(options).map_err(|err| err.to_string()),
        Command::List {
            kind,
            store,
            details,
        } => {
            start_logging(Console::Verbose);
            list(kind, &LocalDirStore::new(store), details)
        }
        Command::Inspect(target) => {
            start_logging(Console::Verbose);
            inspect(target)
        }
        Command::InspectImageset { name, store } => {
            start_logging(Console::Verbose);
            inspect_imageset(&name, &LocalDirStore::new(store))
        }
        Command::Clean { all } => clean(all),
    }
}

fn start_logging(console: Console) {
    if let Err(err) = logging::init(console) {
        eprintln!("Logging disabled: {err}");
    }
}

fn create(options: CreateOptions) -> Result<(), DatasetError> {
    let (plugin, config) = prepare_create(&options)?;
    start_logging(Console::for_batch(options.batch));
    let store = LocalDirStore::new(&options.store);
    let cache = LocalCache::for_plugin(plugin.name())?;
    let mut oracle: Box<dyn Interaction> = if options.batch {
        Box::new(BatchInteraction)
    } else {
        Box::new(TerminalInteraction::stdio())
    };

    let input = CreateInput::new(config, plugin.name(), &cache, &store, oracle.as_mut())?;
    let report = {
        let _run = logging::run_span(plugin.name(), &input.dataset_name).entered();
        match plugin {
            BuiltinPlugin::Copy => {
                let copy = CopyPlugin::from_table(&input.plugin_config)?;
                assemble(copy, &input, oracle.as_mut())?
            }
        }
    };
    print_report(&report);

    let output = CreateOutput::decide(&input, oracle.as_mut())?;
    let processed = process_result(&output, &store)?;
    if processed.uploaded {
        println!("Uploaded {} to {}", output.dataset_name, options.store.display());
    }
    match processed.local_path {
        Some(path) => println!("Local copy: {}", path.display()),
        None => println!("Local copy deleted"),
    }
    Ok(())
}

/// Resolve the plugin and check the config. Touches nothing on disk beyond
/// reading the config file.
fn prepare_create(
    options: &CreateOptions,
) -> Result<(BuiltinPlugin, CreateConfig), DatasetError> {
    let plugin = plugins::lookup(&options.plugin).ok_or_else(|| {
        DatasetError::configuration(
            "plugin",
            format!(
                "unknown plugin {:?}; available: {}",
                options.plugin,
                plugins::BUILTIN_PLUGINS.join(", ")
            ),
        )
    })?;
    let config = load_create_config(&options.config)?;
    config.validate()?;
    Ok((plugin, config))
}

fn list(
    kind: ArtifactKind,
    store: &dyn ImagesetStore,
    details: Option<Details>,
) -> Result<(), String> {
    match details {
        Some(Details { filter }) => {
            let text = catalog::detailed_listing(store, kind, filter.as_deref())
                .map_err(|err| err.to_string())?;
            print!("{text}");
        }
        None => {
            for name in store.list_available(kind).map_err(|err| err.to_string())? {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn inspect(target: InspectTarget) -> Result<(), String> {
    let dir = match target {
        InspectTarget::Dir(path) => path,
        InspectTarget::Named { name, store } => LocalDirStore::new(store)
            .fetch(ArtifactKind::Dataset, &name)
            .map_err(|err| err.to_string())?,
    };
    let dataset = Dataset::open(dir).map_err(|err| err.to_string())?;
    let counts = catalog::split_file_counts(&dataset).map_err(|err| err.to_string())?;
    let metadata = &dataset.metadata;
    println!("Dataset: {}", dataset.name);
    println!("Created: {} by {}", metadata.date_created, metadata.created_by);
    println!("Training type: {}", metadata.training_type);
    println!("Comments: {}", metadata.comments);
    println!("Records: {}", metadata.image_ids.len());
    if let Some(percent) = metadata.test_percent {
        println!("Test percent: {percent}");
    }
    if let Some(kfolds) = metadata.kfolds {
        println!("Folds: {kfolds}");
    }
    for group in &metadata.filters.groups {
        println!("  {}: {}", group.name, group.number_included);
    }
    println!(
        "Files  test: {}  train: {}  validation: {}",
        counts.test, counts.dev_train, counts.dev_test
    );
    Ok(())
}

fn inspect_imageset(name: &str, store: &dyn ImagesetStore) -> Result<(), String> {
    let metadata = catalog::imageset_metadata(store, name).map_err(|err| err.to_string())?;
    if metadata.from_sample {
        println!("Set-wide metadata not found. Showing the first record's metadata.");
    }
    print!("{}", metadata.describe());
    Ok(())
}

fn clean(all: bool) -> Result<(), String> {
    let cache = LocalCache::new(app_dirs::app_root_path().map_err(|err| err.to_string())?);
    let removed = if all {
        cache.clean().map_err(|err| err.to_string())?
    } else {
        cache
            .clean_except(PRESERVED_ON_CLEAN)
            .map_err(|err| err.to_string())?
            > 0
    };
    if removed {
        println!("Cleaned {}", cache.path().display());
    } else {
        println!("No cache to clean.");
    }
    Ok(())
}

fn print_report(report: &PipelineReport) {
    println!(
        "Selected {} of {} records into {}",
        report.selected,
        report.discovered,
        report.dataset_root.display()
    );
    println!(
        "  test: {}  train: {}  validation: {}",
        report.split.test, report.split.dev_train, report.split.dev_test
    );
}

fn parse_args(args: Vec<String>) -> Result<Option<Command>, String> {
    let Some(sub) = args.first() else {
        return Err(help_text());
    };
    let rest = &args[1..];
    match sub.as_str() {
        "-h" | "--help" => {
            println!("{}", help_text());
            Ok(None)
        }
        "create" => parse_create(rest).map(|options| options.map(Command::Create)),
        "list" => parse_list(rest).map(Some),
        "inspect" => match rest {
            [path] => Ok(Some(Command::Inspect(InspectTarget::Dir(PathBuf::from(path))))),
            [name, flag, store] if flag == "--store" => {
                Ok(Some(Command::Inspect(InspectTarget::Named {
                    name: name.clone(),
                    store: PathBuf::from(store),
                })))
            }
            _ => Err(format!(
                "inspect expects a dataset directory or a name with --store\n\n{}",
                help_text()
            )),
        },
        "inspect-imageset" => match rest {
            [name, rest @ ..] => Ok(Some(Command::InspectImageset {
                name: name.clone(),
                store: store_flag(rest)?,
            })),
            [] => Err(format!("inspect-imageset expects a name\n\n{}", help_text())),
        },
        "clean" => match rest {
            [] => Ok(Some(Command::Clean { all: false })),
            [flag] if flag == "--all" => Ok(Some(Command::Clean { all: true })),
            _ => Err(format!("clean accepts only --all\n\n{}", help_text())),
        },
        unknown => Err(format!("Unknown command: {unknown}\n\n{}", help_text())),
    }
}

fn parse_list(args: &[String]) -> Result<Command, String> {
    let kind = match args.first().map(String::as_str) {
        Some("imagesets") => ArtifactKind::Imageset,
        Some("datasets") => ArtifactKind::Dataset,
        other => {
            return Err(format!(
                "list expects `imagesets` or `datasets`, got {other:?}\n\n{}",
                help_text()
            ));
        }
    };
    let mut store = None;
    let mut details = None;
    let mut idx = 1usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "--store" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--store requires a value".to_string())?;
                store = Some(PathBuf::from(value));
            }
            "--details" => {
                let filter = args.get(idx + 1).filter(|next| !next.starts_with("--")).cloned();
                if filter.is_some() {
                    idx += 1;
                }
                details = Some(Details { filter });
            }
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }
    Ok(Command::List {
        kind,
        store: store.ok_or_else(|| "--store <dir> is required".to_string())?,
        details,
    })
}

fn parse_create(args: &[String]) -> Result<Option<CreateOptions>, String> {
    let mut config = None;
    let mut store = None;
    let mut plugin = plugins::copy::PLUGIN_NAME.to_string();
    let mut batch = false;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => {
                println!("{}", help_text());
                return Ok(None);
            }
            "--config" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--config requires a value".to_string())?;
                config = Some(PathBuf::from(value));
            }
            "--store" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--store requires a value".to_string())?;
                store = Some(PathBuf::from(value));
            }
            "--plugin" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--plugin requires a value".to_string())?;
                plugin = value.to_string();
            }
            "--batch" => batch = true,
            unknown => {
                return Err(format!("Unknown argument: {unknown}\n\n{}", help_text()));
            }
        }
        idx += 1;
    }

    Ok(Some(CreateOptions {
        config: config.ok_or_else(|| "--config is required".to_string())?,
        store: store.ok_or_else(|| "--store is required".to_string())?,
        plugin,
        batch,
    }))
}

fn store_flag(args: &[String]) -> Result<PathBuf, String> {
    match args {
        [flag, value] if flag == "--store" => Ok(PathBuf::from(value)),
        _ => Err("--store <dir> is required".to_string()),
    }
}

fn help_text() -> String {
    [
        "dsforge",
        "",
        "Builds filtered, split training datasets from tagged imagesets.",
        "",
        "Usage:",
        "  dsforge create --config <file> --store <dir> [--plugin <name>] [--batch]",
        "  dsforge list <imagesets|datasets> --store <dir> [--details [filter]]",
        "  dsforge inspect <dataset-dir>",
        "  dsforge inspect <dataset-name> --store <dir>",
        "  dsforge inspect-imageset <name> --store <dir>",
        "  dsforge clean [--all]",
        "",
        "Options:",
        "  --config <file>     Dataset creation config (TOML).",
        "  --store <dir>       Store root holding imagesets/ and datasets/.",
        "  --plugin <name>     Dataset plugin (default: copy).",
        "  --batch             Never prompt; fail if the config leaves a question open.",
        "  --details [filter]  Print each entry's metadata, optionally only matching ones.",
        "  --all               Also remove logs when cleaning.",
    ]
    .join("\n")
}
