//! Tracehook - operator CLI for the in-process agent's instrumentation policy
//!
//! Loads `AI-Agent.xml` from the agent's config directory with the same code
//! path the agent uses at startup, and reports what it resolves to.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::error::Error;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use tabled::{
    settings::{object::Rows, Alignment, Modify, Style},
    Table, Tabled,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tracehook_core::policy::{InstrumentationPolicy, PolicyDocumentLoader};
use tracehook_core::telemetry::{
    telemetry_name, JsonLinesSink, SpanFactory, TelemetrySink, TracingSink,
};

mod config_dir;

/// Modules that can be switched to trace-level logging
#[derive(Debug, Clone, ValueEnum)]
enum TraceModule {
    Policy,
    Telemetry,
    All,
}

/// Log levels
#[derive(Debug, Clone, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_filter_directive(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Parser, Debug)]
#[clap(
    name = "tracehook",
    about = "Inspect and validate in-process agent instrumentation policies",
    version
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,

    /// Enable trace logging for modules (comma-separated: policy,telemetry,all)
    #[clap(long, value_delimiter = ',', global = true)]
    trace: Vec<TraceModule>,

    /// Set log level
    #[clap(long, default_value = "warn", global = true)]
    log_level: LogLevel,

    /// Directory containing AI-Agent.xml
    #[clap(long, global = true, env = config_dir::CONFIG_DIR_ENV)]
    config_dir: Option<PathBuf>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Check that the policy document resolves
    Validate {
        /// Output result as JSON
        #[clap(long)]
        json: bool,
    },

    /// Print the resolved policy
    Inspect {
        /// Output as JSON
        #[clap(long, conflicts_with_all = ["yaml", "table"])]
        json: bool,

        /// Output as YAML
        #[clap(long, conflicts_with = "table")]
        yaml: bool,

        /// Output as a table (default)
        #[clap(long)]
        table: bool,
    },

    /// Show whether a method is traced and at what threshold
    Lookup {
        /// Fully qualified class name
        #[clap(long = "class")]
        class_name: String,

        /// Method name
        #[clap(long)]
        method: String,

        /// Method signature descriptor
        #[clap(long, default_value = "")]
        signature: String,
    },

    /// Print the telemetry name derived from span identity text
    SpanName {
        /// Identity text, e.g. "__custom,com.foo.Bar,doWork"
        identity: String,
    },

    /// Run one span through the telemetry pipeline
    Emit {
        /// Identity text, e.g. "__custom,com.foo.Bar,doWork"
        identity: String,

        /// Complete the span with this error message
        #[clap(long)]
        error: Option<String>,

        /// Append records to this JSON lines file instead of logging them
        #[clap(long)]
        output: Option<PathBuf>,
    },
}

/// Initialize tracing. Logs go to stderr so stdout stays machine-readable.
fn initialize_tracing(log_level: &LogLevel, trace_modules: &[TraceModule]) {
    let mut filter = EnvFilter::new(log_level.to_filter_directive());
    if let Ok(parsed) = "tracehook::telemetry=info".parse() {
        filter = filter.add_directive(parsed);
    }

    for module in trace_modules {
        let directive = match module {
            TraceModule::Policy => "tracehook_core::policy=trace",
            TraceModule::Telemetry => "tracehook_core::telemetry=trace",
            TraceModule::All => "tracehook_core=trace",
        };

        if let Ok(parsed) = directive.parse() {
            filter = filter.add_directive(parsed);
        }
    }

    if !trace_modules.is_empty() {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_writer(std::io::stderr)
            .init();

        tracing::info!(trace_modules = ?trace_modules, "Tracehook tracing enabled");
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_ansi(std::io::stderr().is_terminal())
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    initialize_tracing(&cli.log_level, &cli.trace);

    match cli.command {
        Command::Validate { json } => validate_command(cli.config_dir, json),
        Command::Inspect { json, yaml, table: _ } => {
            let format = if json {
                OutputFormat::Json
            } else if yaml {
                OutputFormat::Yaml
            } else {
                OutputFormat::Table
            };
            inspect_command(cli.config_dir, format)
        }
        Command::Lookup {
            class_name,
            method,
            signature,
        } => lookup_command(cli.config_dir, &class_name, &method, &signature),
        Command::SpanName { identity } => {
            println!("{}", telemetry_name(&identity));
            Ok(())
        }
        Command::Emit {
            identity,
            error,
            output,
        } => emit_command(&identity, error, output),
    }
}

fn emit_command(identity: &str, error: Option<String>, output: Option<PathBuf>) -> Result<()> {
    let sink: Arc<dyn TelemetrySink> = match output {
        Some(path) => Arc::new(
            JsonLinesSink::create(&path)
                .with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => Arc::new(TracingSink),
    };

    let span = SpanFactory::new(sink).start(identity);
    debug!(span_id = span.span_id(), "Emitting span");
    match error {
        Some(message) => span.end_with_error(message),
        None => span.end(),
    };

    println!("{}", span.span_id());
    Ok(())
}

fn loader(config_dir: Option<PathBuf>) -> Result<PolicyDocumentLoader> {
    let base_dir = config_dir::resolve(config_dir.as_deref())?;
    Ok(PolicyDocumentLoader::new(base_dir))
}

/// Load the policy, failing when none can be produced.
fn load_policy(config_dir: Option<PathBuf>) -> Result<InstrumentationPolicy> {
    let loader = loader(config_dir)?;
    let path = loader.document_path();
    loader
        .try_load_policy()
        .with_context(|| format!("No instrumentation policy produced from {}", path.display()))
}

fn validate_command(config_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let loader = loader(config_dir)?;
    let path = loader.document_path();
    info!("Validating policy document: {}", path.display());

    let result = loader.try_load_policy();

    if json {
        let output = match &result {
            Ok(policy) => serde_json::json!({
                "path": path,
                "valid": true,
                "document_present": path.is_file(),
                "classes": policy.class_count(),
                "methods": policy.method_count(),
                "builtins": policy.builtins().enabled_features(),
            }),
            Err(e) => serde_json::json!({
                "path": path,
                "valid": false,
                "error": e.to_string(),
            }),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        match &result {
            Ok(policy) if policy.is_empty() => {
                println!("No instrumentation configured in {}", path.display());
            }
            Ok(policy) => {
                println!(
                    "Policy valid: {} classes, {} methods",
                    policy.class_count(),
                    policy.method_count()
                );
                let features = policy.builtins().enabled_features();
                if !features.is_empty() {
                    println!("Built-in instrumentation: {}", features.join(", "));
                }
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                let mut source = e.source();
                while let Some(cause) = source {
                    eprintln!("  caused by: {cause}");
                    source = cause.source();
                }
            }
        }
    }

    if result.is_err() {
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Debug, Clone, Copy)]
enum OutputFormat {
    Json,
    Yaml,
    Table,
}

#[derive(Tabled)]
struct MethodTableRow {
    #[tabled(rename = "Class")]
    class_name: String,
    #[tabled(rename = "Type")]
    type_tag: String,
    #[tabled(rename = "Method")]
    method: String,
    #[tabled(rename = "Signature")]
    signature: String,
    #[tabled(rename = "Threshold (ms)")]
    threshold_ms: u64,
}

fn table_rows(policy: &InstrumentationPolicy) -> Vec<MethodTableRow> {
    let mut rows = Vec::new();
    for (class_name, rule) in policy.classes() {
        if rule.method_count() == 0 {
            rows.push(MethodTableRow {
                class_name: class_name.to_string(),
                type_tag: rule.type_tag().to_string(),
                method: "-".to_string(),
                signature: "-".to_string(),
                threshold_ms: rule.default_threshold_ms(),
            });
            continue;
        }

        for method in rule.methods() {
            rows.push(MethodTableRow {
                class_name: class_name.to_string(),
                type_tag: rule.type_tag().to_string(),
                method: method.name().to_string(),
                signature: if method.matches_any_signature() {
                    "*".to_string()
                } else {
                    method.signature().to_string()
                },
                threshold_ms: method.threshold_ms(),
            });
        }
    }
    rows
}

fn inspect_command(config_dir: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let policy = load_policy(config_dir)?;
    debug!("Inspecting policy with {} classes", policy.class_count());

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&policy)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml_ng::to_string(&policy)?);
        }
        OutputFormat::Table => {
            let builtins = policy.builtins();
            let features = builtins.enabled_features();
            if features.is_empty() {
                println!("Built-in instrumentation: disabled");
            } else {
                println!("Built-in instrumentation: {}", features.join(", "));
                if builtins.logging_enabled() {
                    println!("  logging threshold: {}", builtins.logging_threshold_level());
                }
                if builtins.jdbc_enabled() {
                    println!("  query plan threshold: {} ms", builtins.query_plan_threshold_ms());
                }
            }
            println!();

            let rows = table_rows(&policy);
            if rows.is_empty() {
                println!("No classes instrumented.");
            } else {
                let table = Table::new(&rows)
                    .with(Style::rounded())
                    .with(Modify::new(Rows::first()).with(Alignment::center()))
                    .to_string();
                println!("{} classes, {} methods\n", policy.class_count(), policy.method_count());
                println!("{table}");
            }
        }
    }

    Ok(())
}

fn lookup_command(
    config_dir: Option<PathBuf>,
    class_name: &str,
    method: &str,
    signature: &str,
) -> Result<()> {
    let policy = load_policy(config_dir)?;

    let Some(rule) = policy.class_rule(class_name) else {
        println!("{class_name} is not instrumented");
        return Ok(());
    };

    match rule.method_rule(method, signature) {
        Some(method_rule) => println!(
            "{}.{} traced as {} with threshold {} ms",
            class_name,
            method,
            rule.type_tag(),
            method_rule.threshold_ms()
        ),
        None => println!("{class_name}.{method} is not traced"),
    }

    Ok(())
}
