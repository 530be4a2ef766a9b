use std::path::Path;

use clap::{Args, Parser, Subcommand};
use tfvm::config::Config;
use tfvm::install::installer::InstallOutcome;
use tfvm::logging;
use tfvm::toolchain::Toolchain;

#[derive(Parser)]
#[command(name = "tfvm")]
#[command(version, about = "Install and switch between Terraform versions")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Consider prerelease versions (alpha, beta, rc)
    #[arg(long, global = true)]
    include_prerelease: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args)]
struct RequestArgs {
    /// A version, `latest`, `latest-allowed` or `min-required`.
    /// Defaults to TFVM_TERRAFORM_VERSION, then .terraform-version, then `latest`
    version: Option<String>,

    /// Regex that versions must match (only after `latest`)
    pattern: Option<String>,
}

#[derive(Args)]
struct UninstallArgs {
    /// A version or `latest`
    version: String,

    /// Regex that versions must match (only after `latest`)
    pattern: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Download and install a version
    Install(RequestArgs),
    /// Install a version if needed and make it the active one
    Use(RequestArgs),
    /// Remove an installed version
    Uninstall(UninstallArgs),
    /// List installed versions
    List,
    /// List versions available for download
    ListRemote,
    /// Write the active version to .terraform-version
    Pin,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    logging::init(Some(&config.root_dir), cli.verbose)?;
    let working_dir = std::env::current_dir()?;

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(run(cli, config, &working_dir))
}

async fn run(cli: Cli, config: Config, working_dir: &Path) -> anyhow::Result<()> {
    let bin_dir = config.bin_dir();
    let toolchain = Toolchain::new(config, working_dir)?;
    let include_prerelease = cli.include_prerelease;

    match cli.command {
        Command::Install(args) => {
            let request = toolchain.request(args.version.as_deref(), args.pattern.as_deref())?;
            match toolchain.install(&request, include_prerelease).await? {
                (version, InstallOutcome::Installed(installed)) => {
                    println!(
                        "Installed Terraform v{} to {}",
                        version,
                        installed.path.display()
                    );
                }
                (version, InstallOutcome::AlreadyInstalled(_)) => {
                    println!("Terraform v{version} is already installed");
                }
            }
        }
        Command::Use(args) => {
            let request = toolchain.request(args.version.as_deref(), args.pattern.as_deref())?;
            let version = toolchain.use_version(&request, include_prerelease).await?;
            println!("Switched to Terraform v{version}");
            if !on_path(&bin_dir) {
                println!("Add {} to your PATH to use it", bin_dir.display());
            }
        }
        Command::Uninstall(args) => {
            let request = toolchain.request(Some(args.version.as_str()), args.pattern.as_deref())?;
            match toolchain.uninstall(&request, include_prerelease).await? {
                Some(version) => println!("Uninstalled Terraform v{version}"),
                None => println!("Terraform {} is not installed", args.version),
            }
        }
        Command::List => {
            let entries = toolchain.list_installed(include_prerelease).await?;
            if entries.is_empty() {
                println!("No Terraform versions installed");
            }
            for entry in entries {
                let marker = if entry.active { "*" } else { " " };
                println!("{marker} {}", entry.version);
            }
        }
        Command::ListRemote => {
            for version in toolchain.list_remote(include_prerelease).await?.versions() {
                println!("{version}");
            }
        }
        Command::Pin => {
            let (version, path) = toolchain.pin()?;
            println!("Pinned Terraform v{} in {}", version, path.display());
        }
    }

    Ok(())
}

fn on_path(dir: &Path) -> bool {
    std::env::var_os("PATH")
        .is_some_and(|paths| std::env::split_paths(&paths).any(|entry| entry == dir))
}
