use anyhow::Result;
use clap::Parser;
use hdrpack::commands::{self, config::Config};
use std::io::Write;
use std::path::PathBuf;

/// hdrpack - package the continuable header-only library
///
/// Resolves the package version from git tags, exports license and headers
/// into a package folder and reports the configuration-independent package id.
///
/// Examples:
///   hdrpack info                       # Show package metadata
///   hdrpack export /tmp/pkg            # Copy license and headers into /tmp/pkg
///   hdrpack package-id -s compiler=gcc # Same id for every compiler
#[derive(Parser, Debug)]
#[command(author, version = env!("HDRPACK_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Library checkout to package (defaults to the current directory; also via HDRPACK_SOURCE)
    #[arg(
        long = "source",
        short = 'C',
        env = "HDRPACK_SOURCE",
        value_name = "PATH",
        global = true
    )]
    pub source: Option<PathBuf>,

    /// Only accept a tag pointing at HEAD as version
    #[arg(long = "exact", global = true)]
    pub exact: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Show package metadata
    Info(InfoArgs),

    /// Print the version resolved from git tags (empty when untagged)
    Version,

    /// List declared dependencies
    Requires,

    /// Print the package id for a build configuration
    PackageId(SettingsArgs),

    /// Copy license and headers into a destination folder
    Export(ExportArgs),

    /// Export the package into the local package cache
    Create(CreateArgs),

    /// List cached packages of the current version
    List(CacheArgs),
}

#[derive(clap::Args, Debug)]
pub struct InfoArgs {
    /// Print as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(clap::Args, Debug)]
pub struct SettingsArgs {
    /// Build setting as key=value (e.g. compiler=gcc); may be repeated
    #[arg(long = "setting", short = 's', value_name = "KEY=VALUE")]
    pub settings: Vec<String>,
}

#[derive(clap::Args, Debug)]
pub struct ExportArgs {
    /// Destination folder
    #[arg(value_name = "DEST")]
    pub destination: PathBuf,

    /// Also pack the destination into a .tgz archive
    #[arg(long, value_name = "FILE")]
    pub archive: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
pub struct CreateArgs {
    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(flatten)]
    pub cache: CacheArgs,
}

#[derive(clap::Args, Debug)]
pub struct CacheArgs {
    /// Package cache root (defaults to ~/.hdrpack/data; also via HDRPACK_CACHE)
    #[arg(long, env = "HDRPACK_CACHE", value_name = "PATH")]
    pub cache: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = Config::new(hdrpack::runtime::RealRuntime, cli.source, cli.exact)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Info(args) => commands::info(&config, args.json, &mut out)?,
        Commands::Version => commands::version(&config, &mut out)?,
        Commands::Requires => commands::requires(&config, &mut out)?,
        Commands::PackageId(args) => commands::package_id(&config, &args.settings, &mut out)?,
        Commands::Export(args) => commands::export(
            &config,
            &args.destination,
            args.archive.as_deref(),
            &mut out,
        )?,
        Commands::Create(args) => {
            commands::create(&config, &args.settings.settings, args.cache.cache, &mut out)?
        }
        Commands::List(args) => commands::list(&config, args.cache, &mut out)?,
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn test_cli_export_parsing() {
        let cli = Cli::try_parse_from(["hdrpack", "export", "/tmp/pkg"]).unwrap();
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.destination, PathBuf::from("/tmp/pkg"));
                assert_eq!(args.archive, None);
            }
            _ => panic!("Expected Export command"),
        }
        assert!(!cli.exact);
    }

    #[test]
    fn test_cli_export_archive_parsing() {
        let cli = Cli::try_parse_from([
            "hdrpack", "export", "/tmp/pkg", "--archive", "/tmp/pkg.tgz",
        ])
        .unwrap();
        match cli.command {
            Commands::Export(args) => {
                assert_eq!(args.archive, Some(PathBuf::from("/tmp/pkg.tgz")));
            }
            _ => panic!("Expected Export command"),
        }
    }

    #[test]
    fn test_cli_package_id_settings() {
        let cli = Cli::try_parse_from([
            "hdrpack", "package-id", "-s", "compiler=gcc", "--setting", "build_type=Debug",
        ])
        .unwrap();
        match cli.command {
            Commands::PackageId(args) => {
                assert_eq!(args.settings, vec!["compiler=gcc", "build_type=Debug"]);
            }
            _ => panic!("Expected PackageId command"),
        }
    }

    #[test]
    fn test_cli_global_source_and_exact() {
        let cli = Cli::try_parse_from(["hdrpack", "--source", "/src", "version", "--exact"]).unwrap();
        assert_eq!(cli.source, Some(PathBuf::from("/src")));
        assert!(cli.exact);
        assert!(matches!(cli.command, Commands::Version));
    }

    #[test]
    fn test_cli_list_cache_parsing() {
        let cli = Cli::try_parse_from(["hdrpack", "list", "--cache", "/tmp/cache"]).unwrap();
        match cli.command {
            Commands::List(args) => assert_eq!(args.cache, Some(PathBuf::from("/tmp/cache"))),
            _ => panic!("Expected List command"),
        }
    }

    #[test]
    fn test_cli_no_subcommand_fails() {
        assert!(Cli::try_parse_from(["hdrpack"]).is_err());
    }
}
