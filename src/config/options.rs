//! Command line options

use anyhow::{anyhow, bail, Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use super::{default_extensions, normalize_extension, Config, ConfigFile};
use crate::sources::expand_globs;

/// Apply transformation plugins to many source files
#[derive(Parser, Debug)]
#[command(name = "codemod", version)]
#[command(about = "Apply transformation plugins to source files", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Plugin manifest or plugin directory to run (repeatable)
    #[arg(short = 'p', long = "plugin", value_name = "PATH")]
    plugins: Vec<PathBuf>,

    /// Options for a plugin as NAME=JSON or NAME=@FILE (repeatable)
    #[arg(short = 'o', long = "plugin-options", value_name = "NAME=OPTS")]
    plugin_options: Vec<String>,

    /// Module to load before any file is transformed (repeatable)
    #[arg(short = 'r', long = "require", value_name = "PATH")]
    requires: Vec<PathBuf>,

    /// Comma-separated extensions to process, replacing the defaults
    #[arg(long, value_delimiter = ',', value_name = "EXTS")]
    extensions: Option<Vec<String>>,

    /// Extension to process in addition to the defaults (repeatable)
    #[arg(long = "add-extension", value_name = "EXT")]
    add_extensions: Vec<String>,

    /// Read source from stdin and write the result to stdout
    #[arg(short, long)]
    stdio: bool,

    /// Run plugins without writing changes back
    #[arg(short, long)]
    dry: bool,

    /// Path to a configuration file (defaults to ./codemod.toml when present)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Source files, directories or glob patterns
    #[arg(value_name = "PATH")]
    sources: Vec<String>,
}

/// What the command line asked for
#[derive(Debug)]
pub enum Command {
    Run(Box<Config>),
    Help(String),
    Version(String),
}

/// Parses command line arguments, excluding the program name
pub struct Options {
    args: Vec<OsString>,
}

impl Options {
    pub fn new<I, T>(args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_env() -> Self {
        Self::new(std::env::args_os().skip(1))
    }

    pub fn parse(self) -> Result<Command> {
        let argv = std::iter::once(OsString::from("codemod")).chain(self.args);
        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::DisplayHelp => Ok(Command::Help(e.render().to_string())),
                    ErrorKind::DisplayVersion => Ok(Command::Version(e.render().to_string())),
                    _ => Err(anyhow!("{}", e.render().to_string().trim_end())),
                };
            }
        };

        let cwd = std::env::current_dir().context("Failed to determine working directory")?;
        let file = match &cli.config {
            Some(path) => Some(ConfigFile::load(path)?),
            None => ConfigFile::discover(&cwd)?,
        };

        build_config(cli, file.unwrap_or_default(), &cwd).map(|c| Command::Run(Box::new(c)))
    }
}

fn build_config(cli: Cli, file: ConfigFile, cwd: &Path) -> Result<Config> {
    let mut config = Config::new();

    config.extensions = match cli.extensions.or_else(|| file.extensions.clone()) {
        Some(list) => list
            .iter()
            .filter(|ext| !ext.trim().is_empty())
            .map(|ext| normalize_extension(ext))
            .collect(),
        None => default_extensions(),
    };
    for ext in file.add_extensions.iter().chain(&cli.add_extensions) {
        config.extensions.insert(normalize_extension(ext));
    }

    config.source_paths = expand_globs(&cli.sources)?;
    config.local_plugins = file.plugins.iter().chain(&cli.plugins).cloned().collect();

    config.plugin_options = file.plugin_options_json()?;
    for raw in &cli.plugin_options {
        let (name, options) = parse_plugin_options(raw, cwd)?;
        config.plugin_options.insert(name, options);
    }

    config.requires = file
        .requires
        .iter()
        .chain(&cli.requires)
        .map(|path| resolve_require(path, cwd))
        .collect::<Result<_>>()?;

    config.stdio = cli.stdio;
    config.dry = cli.dry || file.dry.unwrap_or(false);
    config.verbosity = cli.verbose;

    Ok(config)
}

fn resolve_require(path: &Path, cwd: &Path) -> Result<PathBuf> {
    let candidate = cwd.join(path);
    candidate
        .canonicalize()
        .with_context(|| format!("Cannot resolve required module {}", path.display()))
}

/// Parse `NAME=JSON` or `NAME=@FILE` into a plugin name and its options
pub fn parse_plugin_options(raw: &str, cwd: &Path) -> Result<(String, serde_json::Value)> {
    let Some((name, value)) = raw.split_once('=') else {
        bail!("Invalid plugin options '{raw}': expected NAME=JSON or NAME=@FILE");
    };
    if name.is_empty() {
        bail!("Invalid plugin options '{raw}': missing plugin name");
    }

    let options = match value.strip_prefix('@') {
        Some(file) => {
            let path = cwd.join(file);
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read plugin options {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", path.display()))?
        }
        None => serde_json::from_str(value)
            .with_context(|| format!("Invalid JSON options for plugin {name}"))?,
    };

    Ok((name.to_string(), options))
}
