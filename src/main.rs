mod logging;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{ArgAction, Args, Parser, Subcommand};

use gomajor::atomic::replace_file;
use gomajor::config::Config;
use gomajor::env::EnvCache;
use gomajor::imports::{RewriteModuleOptions, rewrite_module};
use gomajor::parser::{GoModParser, ModFile, replace_module_path};
use gomajor::version::path::{join_path, mod_major, mod_prefix};
use gomajor::version::registries::GoProxyRegistry;
use gomajor::version::resolver::Resolver;
use gomajor::version::semver::{is_valid, next_major};
use gomajor::version::updates::{ModuleVersion, UpdateOptions, updates};

#[derive(Parser)]
#[command(name = "gomajor")]
#[command(version, about = "Major version upgrades for Go modules")]
struct Cli {
    /// Increase logging verbosity (-v INFO, -vv DEBUG, -vvv TRACE)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Write logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    /// JSON configuration file used instead of GOPROXY and GOPRIVATE
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Upgrade to a major version
    Get(GetArgs),
    /// List available updates
    List(ListArgs),
    /// Modify the module path
    Path(PathArgs),
}

#[derive(Args)]
struct GetArgs {
    /// Package spec: path[@version|latest|master]
    spec: String,

    /// Allow non-v0 prerelease versions
    #[arg(long)]
    pre: bool,

    /// Rewrite import paths
    #[arg(long, default_value_t = true, num_args = 0..=1, default_missing_value = "true", action = ArgAction::Set)]
    rewrite: bool,

    /// Only fetch cached content from the module proxy
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    cached: Option<bool>,

    /// Working directory
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

#[derive(Args)]
struct ListArgs {
    /// Allow non-v0 prerelease versions
    #[arg(long)]
    pre: bool,

    /// Only show newer major versions
    #[arg(long)]
    major: bool,

    /// Only fetch cached content from the module proxy
    #[arg(long, num_args = 0..=1, default_missing_value = "true")]
    cached: Option<bool>,

    /// Print one JSON object per update
    #[arg(long)]
    json: bool,

    /// Working directory
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

#[derive(Args)]
struct PathArgs {
    /// New module path, defaults to the current one
    modpath: Option<String>,

    /// Increment the module path version
    #[arg(long)]
    next: bool,

    /// Set the module path version
    #[arg(long)]
    version: Option<String>,

    /// Rewrite go.mod and import paths
    #[arg(long, default_value_t = true, num_args = 0..=1, default_missing_value = "true", action = ArgAction::Set)]
    rewrite: bool,

    /// Working directory
    #[arg(long, default_value = ".")]
    dir: PathBuf,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_json);

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::from_env(&EnvCache::default()).await,
    };

    match cli.command {
        Command::Get(args) => get(&config, args).await,
        Command::List(args) => list(&config, args).await,
        Command::Path(args) => path(args).await,
    }
}

fn load_config(path: &Path) -> anyhow::Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config {}", path.display()))
}

fn resolver(config: &Config, cached: Option<bool>) -> anyhow::Result<Resolver> {
    let config = Config {
        cached: cached.unwrap_or(config.cached),
        ..config.clone()
    };
    let registry = GoProxyRegistry::from_config(&config)?;
    Ok(Resolver::new(Arc::new(registry)))
}

fn read_mod_file(dir: &Path) -> anyhow::Result<(PathBuf, String, ModFile)> {
    let name = dir.join("go.mod");
    let content =
        fs::read_to_string(&name).with_context(|| format!("failed to read {}", name.display()))?;
    let mod_file = GoModParser::new()
        .parse(&content)
        .with_context(|| format!("failed to parse {}", name.display()))?;
    Ok((name, content, mod_file))
}

async fn get(config: &Config, args: GetArgs) -> anyhow::Result<()> {
    let spec = resolver(config, args.cached)?
        .resolve(&args.spec, args.pre)
        .await?;
    println!("go get {spec}");

    if !args.rewrite {
        return Ok(());
    }
    let options = RewriteModuleOptions {
        prefix: spec.mod_prefix.clone(),
        new_version: spec.version.clone(),
        new_prefix: None,
        package_dir: Some(spec.package_dir.clone()),
    };
    rewrite_imports(args.dir, options).await
}

async fn list(config: &Config, args: ListArgs) -> anyhow::Result<()> {
    let (_, _, mod_file) = read_mod_file(&args.dir)?;
    let cached = args.cached.unwrap_or(config.cached);
    let options = UpdateOptions {
        allow_prerelease: args.pre,
        cached,
        major_only: args.major,
        private: config.private.join(","),
        modules: mod_file
            .direct_requires()
            .map(|r| ModuleVersion::new(&r.path, &r.version))
            .collect(),
    };

    let mut rx = updates(Arc::new(resolver(config, Some(cached))?), options);
    while let Some(update) = rx.recv().await {
        if args.json {
            println!("{}", serde_json::to_string(&update)?);
            continue;
        }
        match (&update.err, &update.latest) {
            (Some(err), _) => println!("{}: failed: {}", update.module.path, err),
            (None, Some(latest)) => println!(
                "{}: {} [latest {}]",
                update.module.path, update.module.version, latest.version
            ),
            (None, None) => {}
        }
    }
    Ok(())
}

async fn path(args: PathArgs) -> anyhow::Result<()> {
    let (name, content, mod_file) = read_mod_file(&args.dir)?;
    let current = mod_file
        .module
        .with_context(|| format!("{} has no module directive", name.display()))?;
    let modpath = args.modpath.unwrap_or_else(|| current.clone());

    let mut version = match args.version {
        Some(version) => version,
        None => mod_major(&modpath)
            .filter(|major| !major.is_empty())
            .unwrap_or("v1")
            .to_string(),
    };
    if args.next {
        version = next_major(&version)?;
    }
    if !is_valid(&version) {
        bail!("invalid version: {version:?}");
    }

    let prefix = mod_prefix(&modpath).to_string();
    let new_path = join_path(&prefix, &version, "");
    println!("module {new_path}");

    if !args.rewrite {
        return Ok(());
    }
    let updated = replace_module_path(&content, &new_path)?;
    replace_file(&name, updated.as_bytes())
        .with_context(|| format!("failed to write {}", name.display()))?;

    let options = RewriteModuleOptions {
        prefix: mod_prefix(&current).to_string(),
        new_version: version,
        new_prefix: Some(prefix),
        package_dir: None,
    };
    rewrite_imports(args.dir, options).await
}

async fn rewrite_imports(dir: PathBuf, options: RewriteModuleOptions) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || {
        rewrite_module(&dir, &options, |position, _, new_path| {
            println!("{position} {new_path}");
        })
    })
    .await??;
    Ok(())
}
