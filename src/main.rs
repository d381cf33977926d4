use clap::{Parser, Subcommand};
use std::path::PathBuf;
use yaml_pages::pipeline::{self, Project};
use yaml_pages::{config, output};

#[derive(Parser)]
#[command(name = "yaml-pages")]
#[command(about = "Turn YAML index documents into site routes")]
#[command(long_about = "\
Turn YAML index documents into site routes

Every index.yaml under the content root that declares a document kind
becomes one page. The route comes from the file's directory, the template
from the kind.

Project structure:

  site/
  ├── config.toml                 # Optional (see 'yaml-pages gen-config')
  ├── content/
  │   └── posts/hi/index.yaml     # BlogPost: {...}  →  /posts/hi/
  ├── data/
  │   └── images/hi.jpg           # Meta.Image: images/hi.jpg
  └── src/templates/
      └── BlogPost.js             # Template for BlogPost pages

Stages:
  scan    content/ + data/  →  <temp-dir>/nodes.json
  pages   nodes.json        →  <output>/pages.json")]
#[command(version)]
struct Cli {
    /// Project root (holds config.toml, content and data directories)
    #[arg(long, default_value = ".", global = true)]
    root: PathBuf,

    /// Output directory for pages.json
    #[arg(long, default_value = "public", global = true)]
    output: PathBuf,

    /// Directory for intermediate files (nodes.json)
    #[arg(long, default_value = ".yaml-pages-temp", global = true)]
    temp_dir: PathBuf,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest and annotate content into a node manifest
    Scan,
    /// Build pages.json from the node manifest
    Pages,
    /// Run the full pipeline: scan → pages
    Build,
    /// Validate content, templates, and asset references without writing
    Check,
    /// Resolve a data-relative asset path to a file
    Resolve {
        /// Path relative to the data directory, e.g. images/hi.jpg
        path: String,
    },
    /// Print the content schema definitions
    Schema,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Command::GenConfig = cli.command {
        print!("{}", config::stock_config_toml());
        return Ok(());
    }

    let project = Project::load(&cli.root)?;
    let temp_dir = project.root.join(&cli.temp_dir);
    let output_dir = project.root.join(&cli.output);

    match cli.command {
        Command::Scan => {
            let scan = project.scan()?;
            pipeline::write_nodes(&scan.store, &temp_dir)?;
            output::print_scan_output(&scan.store, &scan.summary);
        }
        Command::Pages => {
            let store = pipeline::read_nodes(&temp_dir)?;
            let (pages, _) = project.write_pages(&store, &output_dir)?;
            output::print_pages_output(&pages);
        }
        Command::Build => {
            println!("==> Stage 1: Scanning {}", project.root.display());
            let scan = project.scan()?;
            pipeline::write_nodes(&scan.store, &temp_dir)?;
            output::print_scan_output(&scan.store, &scan.summary);

            println!("==> Stage 2: Building pages → {}", output_dir.display());
            let (pages, manifest) = project.write_pages(&scan.store, &output_dir)?;
            output::print_pages_output(&pages);

            println!("==> Build complete: {}", manifest.display());
        }
        Command::Check => {
            println!("==> Checking {}", project.root.display());
            let report = project.check()?;
            output::print_check_output(&report);
            if !report.is_ok() {
                std::process::exit(1);
            }
        }
        Command::Resolve { path } => {
            let scan = project.scan()?;
            let file = project.resolve_asset(&scan.store, &path);
            println!("{}", output::format_asset_lookup(&path, file));
        }
        Command::Schema => {
            print!("{}", project.schema.to_sdl());
        }
        // printed before the project is loaded
        Command::GenConfig => {}
    }

    Ok(())
}

/// Log to stderr; `RUST_LOG` overrides the `-v` level.
fn init_tracing(verbose: u8) {
    use tracing_subscriber::{EnvFilter, fmt};

    let level = match verbose {
        0 => "yaml_pages=warn",
        1 => "yaml_pages=debug",
        _ => "yaml_pages=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
