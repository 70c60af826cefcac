use clap::{Parser, Subcommand};
use media_versions::config::{self, Config};
use media_versions::file_object::FileObject;
use media_versions::generator::{GenerateOptions, VersionGenerator};
use media_versions::{output, process, site::Site};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "media-versions")]
#[command(version)]
#[command(about = "Resized and cropped image versions for a media library")]
#[command(long_about = "\
Resized and cropped image versions for a media library

Originals live under the media directory. Each configured version (thumbnail,
small, large, ...) is derived on demand, stored next to the original or in a
mirrored versions tree, and regenerated when the original is newer.

  media/
  └── uploads/
      ├── dawn.jpg                 # original
      ├── dawn_thumbnail.jpg       # version (suffix namer)
      └── dawn_large.jpg

Paths given to commands are relative to the media root ('location').

Run 'media-versions gen-config' to print a documented media-versions.toml.")]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = config::DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// More log output (-v debug, -vv trace); RUST_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create or refresh versions for every image under PATH
    Generate {
        /// File or directory (default: the media directory)
        path: Option<String>,
        /// Only this version
        #[arg(long)]
        version: Option<String>,
        /// Rewrite fresh versions too and upscale small originals
        #[arg(long)]
        force: bool,
    },
    /// Delete every file that is a version of one id
    Remove {
        /// File or directory (default: the media directory)
        path: Option<String>,
        #[arg(long)]
        version: String,
        /// List what would be deleted without deleting
        #[arg(long)]
        dry_run: bool,
    },
    /// List the version paths of a file and whether they exist
    Versions {
        file: String,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Resolve one version of a file, generating it if needed
    Show {
        file: String,
        version: String,
        #[arg(long)]
        force: bool,
    },
    /// Validate the config file
    Check,
    /// Print a stock media-versions.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Generate {
            path,
            version,
            force,
        } => {
            let site = load_site(&cli.config)?;
            init_thread_pool(&site.config.processing);
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for event in rx {
                    for line in output::format_process_event(&event) {
                        println!("{}", line);
                    }
                }
            });
            let result = process::generate_versions(
                &site,
                path.as_deref(),
                version.as_deref(),
                force,
                Some(tx),
            );
            printer.join().ok();
            output::print_generate_summary(&result?);
        }
        Command::Remove {
            path,
            version,
            dry_run,
        } => {
            let site = load_site(&cli.config)?;
            let report = process::remove_versions(&site, path.as_deref(), &version, dry_run)?;
            output::print_remove_report(&report);
        }
        Command::Versions { file, json } => {
            let site = load_site(&cli.config)?;
            let listing = output::version_listing(&FileObject::new(&file, &site));
            if json {
                output::print_versions_json(&listing)?;
            } else {
                output::print_versions(&listing);
            }
        }
        Command::Show {
            file,
            version,
            force,
        } => {
            let site = load_site(&cli.config)?;
            let original = FileObject::new(&file, &site);
            let options = GenerateOptions {
                force,
                ..GenerateOptions::default()
            };
            let resolved = VersionGenerator::new(&site).resolve(&original, &version, &options)?;
            let derived = FileObject::new(&resolved.path, &site);
            let url = derived.exists().then(|| derived.url());
            output::print_show(&version, &resolved, url.as_deref(), derived.dimensions());
        }
        Command::Check => {
            println!("==> Checking {}", cli.config.display());
            let config = config::load_config(&cli.config)?;
            output::print_config_summary(&config);
            println!("==> Config is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the config and build a site over the filesystem.
///
/// A relative `location` is resolved against the config file's directory.
fn load_site(config_path: &Path) -> Result<Site, config::ConfigError> {
    let config: Config = config::load_config(config_path)?;
    let base_dir = config_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    Ok(Site::from_config(config, base_dir))
}

/// `RUST_LOG` wins; otherwise `-v` raises the crate's level from `warn`.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "warn,media_versions=debug",
        _ => "warn,media_versions=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Capped at the number of available cores; the config can only lower it.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
