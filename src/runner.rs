//! Runs the configured plugins over every source file
//!
//! Each file is transformed inside [`Host::isolate`], so modules, listeners and
//! globals a plugin leaves behind are rolled back before the next file starts.

use crate::config::Config;
use crate::error::Result;
use crate::plugin::{PluginContext, PluginLoader, PluginRegistry};
use crate::runtime::Host;
use crate::snapshot::{AuditSink, TracingSink};
use crate::sources::{discover_sources, is_ignored, SourceFile};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, error, info};

pub const STDIN_NAME: &str = "<stdin>";

/// Counts reported at the end of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub modified: usize,
    pub errors: usize,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} file(s), {} modified, {} errors",
            self.total, self.modified, self.errors
        )
    }
}

pub struct Runner {
    config: Config,
    host: Host,
    plugins: PluginRegistry,
    sink: Arc<dyn AuditSink>,
}

impl Runner {
    /// Create a runner, loading every plugin named in the config
    pub async fn new(config: Config, host: Host) -> Result<Self> {
        let loader = PluginLoader::new();
        let mut plugins = PluginRegistry::new();
        for path in &config.local_plugins {
            plugins.register(Arc::new(loader.load(path).await?))?;
        }
        Ok(Self::with_plugins(config, host, plugins))
    }

    pub fn with_plugins(config: Config, host: Host, plugins: PluginRegistry) -> Self {
        Self {
            config,
            host,
            plugins,
            sink: Arc::new(TracingSink),
        }
    }

    /// Report restore messages somewhere other than the log
    pub fn with_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    /// Transform every discovered source file, or stdin when configured
    pub async fn run(&self) -> Result<RunStats> {
        self.preload()?;

        if self.config.stdio {
            let mut stdout = tokio::io::stdout();
            return self.run_stdio(tokio::io::stdin(), &mut stdout).await;
        }

        let files = discover_sources(&self.config.source_paths, &self.config.extensions, is_ignored)?;
        info!(
            "Running {} plugin(s) over {} file(s)",
            self.plugins.len(),
            files.len()
        );

        let mut stats = RunStats::default();
        for path in files {
            stats.total += 1;
            match self.process_file(path.clone()).await {
                Ok(true) => stats.modified += 1,
                Ok(false) => {}
                Err(e) => {
                    stats.errors += 1;
                    error!("{}: {}", path.display(), e);
                }
            }
        }

        info!("{}", stats);
        Ok(stats)
    }

    /// Transform a single source read from `input`, writing the result to `output`
    pub async fn run_stdio<R, W>(&self, mut input: R, output: &mut W) -> Result<RunStats>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut content = String::new();
        input.read_to_string(&mut content).await?;
        let source = SourceFile::new(STDIN_NAME, content);

        let mut stats = RunStats {
            total: 1,
            ..Default::default()
        };
        let text = match self.transform_source(&source).await {
            Ok(Some(text)) => {
                stats.modified = 1;
                text
            }
            Ok(None) => source.content,
            Err(e) => {
                stats.errors = 1;
                error!("{}: {}", STDIN_NAME, e);
                source.content
            }
        };

        output.write_all(text.as_bytes()).await?;
        output.flush().await?;
        Ok(stats)
    }

    /// Load `--require` modules so they are part of every file's baseline
    fn preload(&self) -> Result<()> {
        for path in &self.config.requires {
            debug!("Preloading {}", path.display());
            self.host.loader.require(path)?;
        }
        Ok(())
    }

    /// Returns whether the file changed
    async fn process_file(&self, path: PathBuf) -> Result<bool> {
        let source = SourceFile::read(&path).await?;
        let Some(output) = self.transform_source(&source).await? else {
            return Ok(false);
        };

        if self.config.dry {
            info!("Would modify {}", path.display());
        } else {
            tokio::fs::write(&path, &output).await?;
            debug!("Wrote {}", path.display());
        }
        Ok(true)
    }

    /// Run every plugin over `source` inside an isolated host scope.
    ///
    /// Returns `None` when the final text equals the input.
    pub async fn transform_source(&self, source: &SourceFile) -> Result<Option<String>> {
        let output = self
            .host
            .isolate(self.sink.clone(), async {
                let mut current = source.clone();
                for plugin in self.plugins.iter() {
                    let context = PluginContext {
                        host: self.host.clone(),
                        options: self.config.plugin_options_for(plugin.as_ref()),
                        filename: source.path.clone(),
                    };
                    if let Some(text) = plugin.transform(&current, &context).await? {
                        current.content = text;
                    }
                }
                Ok(current.content)
            })
            .await?;

        Ok((output != source.content).then_some(output))
    }
}
