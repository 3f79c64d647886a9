//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{EventHandlerConfig, PipelineConfig};
use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::mapping::{list_builtin, load_mapping, MappingTable};
use crate::pipeline::{BatchJob, EventHandler};
use serde::Serialize;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Batch { no_pushdown } => self.batch(*no_pushdown).await,
            Commands::Event {
                event_json,
                event_file,
                from_env,
            } => {
                self.event(event_json.as_deref(), event_file.as_deref(), *from_env)
                    .await
            }
            Commands::ValidateMapping { mapping } => self.validate_mapping(mapping),
            Commands::ShowMapping { mapping } => self.show_mapping(mapping.as_deref()),
        }
    }

    /// Load the pipeline file, or defaults when none was given
    fn load_config(&self) -> Result<PipelineConfig> {
        match &self.cli.config {
            Some(path) => PipelineConfig::load(path),
            None => Ok(PipelineConfig::default()),
        }
    }

    /// Run the batch job
    async fn batch(&self, no_pushdown: bool) -> Result<()> {
        let config = self.load_config()?;
        let batch = config.batch()?;
        let catalog = config.catalog.open(&config.storage)?;

        let mut extractor = Extractor::new()
            .with_catalog(catalog.clone())
            .with_timeout(config.storage.timeout());
        if no_pushdown {
            extractor = extractor.without_pushdown();
        }

        let job = BatchJob::new(batch, &config.storage)?
            .with_catalog(catalog)
            .with_extractor(extractor);
        let report = job.run().await?;

        self.output(&json!({ "type": "BATCH_REPORT", "report": report }));
        Ok(())
    }

    /// Handle one event
    async fn event(
        &self,
        event_json: Option<&str>,
        event_file: Option<&Path>,
        from_env: bool,
    ) -> Result<()> {
        let config = self.load_config()?;
        let handler_config = if from_env {
            EventHandlerConfig::from_env()?
        } else {
            config.event()?.clone()
        };

        let event: Value = match (event_json, event_file) {
            (Some(inline), _) => serde_json::from_str(inline)
                .map_err(|e| Error::config(format!("Invalid event JSON: {e}")))?,
            (None, Some(path)) => {
                let content = fs::read_to_string(path)
                    .map_err(|e| Error::config(format!("Failed to read event file: {e}")))?;
                serde_json::from_str(&content)
                    .map_err(|e| Error::config(format!("Invalid event JSON: {e}")))?
            }
            (None, None) => {
                return Err(Error::config(
                    "No event given (use --event-json or --event-file)",
                ))
            }
        };

        let catalog = config.catalog.open(&config.storage)?;
        let handler = EventHandler::new(&handler_config, catalog, &config.storage)?;
        let result = handler.handle_json(&event).await?;

        self.output(&json!({ "type": "WRITE_RESULT", "result": result }));
        Ok(())
    }

    /// Validate a mapping table
    fn validate_mapping(&self, mapping: &str) -> Result<()> {
        let table = load_mapping(mapping)?;

        self.output(&json!({
            "type": "LOG",
            "log": {
                "level": "INFO",
                "message": format!(
                    "Mapping table '{}' is valid with {} fields",
                    table.name.as_deref().unwrap_or(mapping),
                    table.len()
                )
            }
        }));
        Ok(())
    }

    /// Print a mapping table, or list the built-in ones
    fn show_mapping(&self, mapping: Option<&str>) -> Result<()> {
        match mapping {
            Some(name) => {
                let table: MappingTable = load_mapping(name)?;
                self.output(&json!({ "type": "MAPPING", "mapping": table }));
            }
            None => {
                self.output(&json!({ "type": "MAPPINGS", "builtin": list_builtin() }));
            }
        }
        Ok(())
    }

    /// Output a message to stdout
    fn output<T: Serialize>(&self, msg: &T) {
        let rendered = match self.cli.format {
            OutputFormat::Json => serde_json::to_string(msg),
            OutputFormat::Pretty => serde_json::to_string_pretty(msg),
        };
        println!("{}", rendered.unwrap_or_default());
    }
}
