use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use serde_json::Value as Json;
use tracing::{debug, info};

use crate::openapi;
use crate::schema::{Declarations, Model, ModelRegistry};
use crate::server::{Envelope, Response};

/// Command-line interface for brrtkit
#[derive(Parser)]
#[command(name = "brrtkit")]
#[command(about = "Model schema and envelope tooling", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the OpenAPI components for a model declaration file
    Schema {
        /// YAML model declarations
        #[arg(short, long)]
        models: PathBuf,

        /// Single-line JSON instead of pretty output
        #[arg(long, default_value_t = false)]
        compact: bool,
    },
    /// Validate a JSON document against one declared model
    Validate {
        /// YAML model declarations
        #[arg(short, long)]
        models: PathBuf,

        /// Name of the model to validate against
        #[arg(long)]
        model: String,

        /// JSON document to validate
        #[arg(short, long)]
        input: PathBuf,

        /// Envelope for the printed result (standard, detailed, plain)
        #[arg(long, default_value = "standard")]
        envelope: Envelope,
    },
}

/// Result of one command: text to print and whether it succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub success: bool,
}

fn load_registry(models: &Path) -> anyhow::Result<(ModelRegistry, Declarations)> {
    let decls = Declarations::from_file(models)
        .with_context(|| format!("failed to load model declarations from {}", models.display()))?;
    let registry = ModelRegistry::new();
    decls.register_into(&registry)?;
    debug!(
        models = %models.display(),
        model_count = decls.models.len(),
        "Model declarations loaded"
    );
    Ok((registry, decls))
}

/// Run a parsed command without touching stdout.
pub fn execute(command: &Commands) -> anyhow::Result<CommandOutput> {
    match command {
        Commands::Schema { models, compact } => {
            let (registry, decls) = load_registry(models)?;
            let components = openapi::components(&registry, &decls.security_schemes());
            let text = if *compact {
                serde_json::to_string(&components)?
            } else {
                serde_json::to_string_pretty(&components)?
            };
            Ok(CommandOutput {
                text,
                success: true,
            })
        }
        Commands::Validate {
            models,
            model,
            input,
            envelope,
        } => {
            let (registry, _) = load_registry(models)?;
            let schema = registry
                .schema(model)
                .ok_or_else(|| anyhow!("unknown model '{model}'"))?;
            let raw = fs::read_to_string(input)
                .with_context(|| format!("failed to read {}", input.display()))?;
            let document: Json = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not valid JSON", input.display()))?;

            let instance = Model::from_json(schema, &document);
            let success = !instance.has_errors();
            let response = if success {
                Response::ok(instance)
            } else {
                let errors = serde_json::to_value(instance.errors())?;
                match envelope {
                    Envelope::Detailed => Response::new(422)
                        .with_body(instance.to_json())
                        .with_errors(errors),
                    _ => Response::new(422).with_errors(errors),
                }
            };
            info!(
                model = %model,
                input = %input.display(),
                success,
                "Document validated"
            );
            let bytes = response.with_envelope(*envelope).body_bytes()?;
            Ok(CommandOutput {
                text: String::from_utf8_lossy(&bytes).into_owned(),
                success,
            })
        }
    }
}

/// Parse arguments, run the command and print its output.
///
/// # Errors
///
/// Returns an error if the declarations or input cannot be loaded, or if
/// validation reported field errors (the failure envelope is printed first).
pub fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let output = execute(&cli.command)?;
    println!("{}", output.text);
    if output.success {
        Ok(())
    } else {
        Err(anyhow!("validation failed"))
    }
}
