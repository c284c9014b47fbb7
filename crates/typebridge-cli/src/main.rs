//! `typebridge` command-line interface.

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use typebridge::generate::{build_schema, load_routes, provider_from_config};
use typebridge::{Config, FlavorRegistry, FsSink, Schema};

/// Generate TypeScript types and validators from Go service types.
#[derive(Parser, Debug)]
#[command(name = "typebridge", version, about)]
struct Cli {
    /// Log at debug level.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct ProjectArgs {
    /// Route map JSON (`"Service.Method" -> {verb, path, request, response}`).
    #[arg(short, long)]
    routes: PathBuf,

    /// Config file; discovered from the project root when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Project root. Relative config paths resolve against it.
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Extract, validate and write all configured artifacts.
    Generate {
        #[command(flatten)]
        project: ProjectArgs,

        /// Output directory, overriding `output-dir`.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    /// Print the extracted IR as JSON.
    Schema {
        #[command(flatten)]
        project: ProjectArgs,
    },
    /// Validate an IR JSON document.
    Validate {
        /// IR document produced by `typebridge schema`.
        file: PathBuf,
    },
    /// List available output flavors.
    Flavors,
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let registry = FlavorRegistry::builtin();
    match cli.command {
        Commands::Generate { project, out } => {
            let config = load_config(&project)?;
            let routes = load_routes(&project.routes)?;
            let provider = provider_from_config(&config, &project.root)?;
            let out_dir = out.unwrap_or_else(|| project.root.join(&config.output_dir));
            let mut sink = FsSink::new(&out_dir);

            let report =
                typebridge::generate(&routes, &config, provider.as_ref(), &registry, &mut sink)?;
            for file in &report.files {
                println!("{}", out_dir.join(&file.path).display());
            }
            if !report.warnings.is_empty() {
                eprintln!("{} warning(s)", report.warnings.len());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Schema { project } => {
            let config = load_config(&project)?;
            let routes = load_routes(&project.routes)?;
            let provider = provider_from_config(&config, &project.root)?;
            let schema = build_schema(&routes, &config, provider.as_ref())?;
            println!("{}", schema.to_json()?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate { file } => {
            let input = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let schema = Schema::from_json(&input)
                .with_context(|| format!("failed to decode {}", file.display()))?;
            let errors = schema.validate();
            if errors.is_empty() {
                println!(
                    "ok: {} type(s), {} service(s)",
                    schema.types.len(),
                    schema.services.len()
                );
                return Ok(ExitCode::SUCCESS);
            }
            for error in &errors {
                match &error.type_name {
                    Some(name) => println!("{} ({})", error, name),
                    None => println!("{}", error),
                }
            }
            eprintln!("{} violation(s)", errors.len());
            Ok(ExitCode::FAILURE)
        }
        Commands::Flavors => {
            for name in registry.names() {
                if let Some(flavor) = registry.create(name) {
                    println!("{:<10} *.{}", name, flavor.file_suffix());
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("typebridge=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("typebridge=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(project: &ProjectArgs) -> anyhow::Result<Config> {
    let config = match &project.config {
        Some(path) => Config::load(path)?,
        None => {
            let (config, path) = Config::discover(&project.root)?;
            match path {
                Some(p) => tracing::debug!(path = %p.display(), "using config"),
                None => tracing::debug!("no config file found, using defaults"),
            }
            config
        }
    };
    check_root(&project.root)?;
    Ok(config)
}

fn check_root(root: &Path) -> anyhow::Result<()> {
    if !root.is_dir() {
        bail!("project root {} is not a directory", root.display());
    }
    Ok(())
}
