use crate::config::{render_config, ConfigFormat, Settings};
use crate::error::{AemonError, IoContext, Result};
use crate::html::{render_all, render_index, render_version_page};
use crate::loader::{app_warnings, load_app};
use crate::logging::{init_logging, LogConfig};
use crate::schema::{extract_schema, GENERATOR_NAME};
use crate::server;
use crate::validator::{log_report, validate_document, validate_version, ValidationReport};
use crate::versions::existing_versions;
use crate::writer::{read_record, write_artifacts, RecordConfig, VersionRecord};
use chrono::{SecondsFormat, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info, warn};

/// Command-line interface for aemon
///
/// Generates versioned API documentation from a web application's schema
/// and serves it locally.
#[derive(Parser, Debug)]
#[command(name = "aemon", version)]
#[command(about = "Versioned OpenAPI documentation generator", long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Path to a configuration file (YAML, JSON, TOML or setup.cfg)
    #[arg(short, long, global = true, env = "AEMON_CONFIG")]
    pub config: Option<PathBuf>,

    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a configuration file with default settings
    Init {
        /// File format of the configuration file
        #[arg(long, value_enum, default_value_t = InitFormat::Yaml)]
        format: InitFormat,

        /// Overwrite an existing configuration file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Generate a new documentation version from an application
    Generate {
        /// Module reference: a schema file or an exporter command
        #[arg(short, long)]
        module: String,

        /// Attribute naming the application inside the module
        #[arg(short, long, default_value = "app")]
        app: String,

        /// Overwrite the target version if it already exists
        #[arg(short, long, default_value_t = false)]
        force: bool,

        /// Skip schema validation before writing
        #[arg(long, default_value_t = false)]
        no_validate: bool,

        /// Explicit target version (e.g. v3) instead of the next one
        #[arg(long)]
        version: Option<String>,
    },
    /// Re-render the index and every version page
    RenderHtml {
        /// Versions directory (defaults to the configured output_dir)
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Validate generated versions
    Validate {
        /// Version to validate; all versions when omitted
        version: Option<String>,

        /// Treat warnings as failures
        #[arg(long, default_value_t = false)]
        strict: bool,
    },
    /// List generated versions
    List {
        /// Output format
        #[arg(long, value_enum, default_value_t = ListFormat::Table)]
        format: ListFormat,

        /// Include metadata for each version
        #[arg(long, default_value_t = false)]
        detailed: bool,
    },
    /// Serve the documentation over HTTP
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// Host to bind
        #[arg(long, default_value = "localhost")]
        host: String,

        /// Open the index in a browser
        #[arg(short, long, default_value_t = false)]
        open: bool,
    },
}

/// Format for `init`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum InitFormat {
    Yaml,
    Json,
}

impl From<InitFormat> for ConfigFormat {
    fn from(format: InitFormat) -> Self {
        match format {
            InitFormat::Yaml => ConfigFormat::Yaml,
            InitFormat::Json => ConfigFormat::Json,
        }
    }
}

/// Format for `list`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ListFormat {
    Table,
    Json,
    Yaml,
}

/// Parse arguments, initialise logging and run the selected command.
///
/// Usage errors exit with `1` like every other failure; `--help` and
/// `--version` exit with `0`.
pub fn run_cli() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => return usage_exit(&e),
    };
    if let Err(e) = init_logging(&LogConfig::from_env(cli.verbose)) {
        eprintln!("warning: {e:#}");
    }
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ {e}");
            ExitCode::FAILURE
        }
    }
}

/// Print a clap parse result and exit with its [`usage_status`].
fn usage_exit(e: &clap::Error) -> ExitCode {
    if let Err(io) = e.print() {
        eprintln!("{io}");
    }
    ExitCode::from(usage_status(e))
}

/// `0` for help and version output, `1` for everything clap rejects.
pub(crate) fn usage_status(e: &clap::Error) -> u8 {
    u8::from(e.use_stderr())
}

/// Run a parsed command line.
///
/// # Errors
///
/// Whatever the selected command fails with.
pub fn run(cli: &Cli) -> Result<()> {
    let settings = || Settings::load(cli.config.as_deref());
    match &cli.command {
        Commands::Init { format, force } => {
            handle_init(cli.config.as_deref(), (*format).into(), *force).map(|_| ())
        }
        Commands::Generate {
            module,
            app,
            force,
            no_validate,
            version,
        } => handle_generate(
            &settings()?,
            &GenerateRequest {
                module,
                app,
                force: *force,
                validate: !*no_validate,
                version: version.as_deref(),
            },
        )
        .map(|_| ()),
        Commands::RenderHtml { output_dir } => {
            let settings = match output_dir {
                Some(dir) => settings()?.with_output_dir(dir),
                None => settings()?,
            };
            handle_render_html(&settings).map(|_| ())
        }
        Commands::Validate { version, strict } => {
            handle_validate(&settings()?, version.as_deref(), *strict)
        }
        Commands::List { format, detailed } => {
            println!("{}", render_list(&settings()?, *format, *detailed)?);
            Ok(())
        }
        Commands::Serve { port, host, open } => server::serve(&settings()?, host, *port, *open),
    }
}

/// Write a default configuration file.
pub fn handle_init(path: Option<&Path>, format: ConfigFormat, force: bool) -> Result<PathBuf> {
    let path = path.map_or_else(|| PathBuf::from(format.file_name()), Path::to_path_buf);
    if path.exists() && !force {
        return Err(AemonError::configuration(format!(
            "Configuration file {} already exists. Use --force to overwrite.",
            path.display()
        )));
    }
    let content = render_config(&Settings::default(), format)?;
    fs::write(&path, content).at(&path)?;
    info!("✅ Created configuration file: {}", path.display());
    info!("You can now customize the configuration and run 'aemon generate'");
    Ok(path)
}

/// Arguments of one generate run.
#[derive(Debug, Clone, Copy)]
pub struct GenerateRequest<'a> {
    pub module: &'a str,
    pub app: &'a str,
    pub force: bool,
    pub validate: bool,
    pub version: Option<&'a str>,
}

/// Load the application, snapshot its schema as a new version and refresh
/// the HTML. Returns the version written.
///
/// Validation runs before anything is written, so a failing schema leaves
/// the output directory untouched.
pub fn handle_generate(settings: &Settings, request: &GenerateRequest<'_>) -> Result<String> {
    let app = load_app(request.module, request.app)?;
    for warning in app_warnings(&app) {
        warn!("⚠️  {warning}");
    }

    let spec = extract_schema(&app, settings);
    if request.validate {
        let report = ValidationReport {
            version: request.version.unwrap_or("new version").to_string(),
            findings: validate_document(&spec),
        };
        log_report(&report);
        if !report.is_valid() {
            return Err(AemonError::Validation { failed: 1 });
        }
    }

    let (version, version_dir) =
        crate::versions::prepare_version(settings, request.version, request.force)?;

    let record = VersionRecord {
        version: version.clone(),
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
        generator: GENERATOR_NAME.to_string(),
        generator_version: env!("CARGO_PKG_VERSION").to_string(),
        module_path: request.module.to_string(),
        app_name: request.app.to_string(),
        routes_count: Some(app.routes_count()),
        title: spec
            .pointer("/info/title")
            .and_then(Value::as_str)
            .unwrap_or(&settings.title)
            .to_string(),
        config: RecordConfig {
            output_dir: settings.output_dir.display().to_string(),
            title: settings.title.clone(),
            description: settings.description.clone(),
        },
        ..VersionRecord::default()
    };
    write_artifacts(&version_dir, &spec, &record)?;
    render_version_page(&version_dir, &version, settings)?;
    let index = render_index(settings)?;

    info!("✅ Successfully generated API documentation version {version}");
    info!("📁 Output directory: {}", absolute(&settings.output_dir).display());
    info!("🌐 Open in browser: file://{}", absolute(&index).display());
    Ok(version)
}

fn absolute(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Regenerate every version page and the index.
pub fn handle_render_html(settings: &Settings) -> Result<PathBuf> {
    let index = render_all(settings)?;
    info!("✅ Successfully regenerated HTML index");
    Ok(index)
}

/// Validate one version, or every version when `version` is `None`.
pub fn handle_validate(settings: &Settings, version: Option<&str>, strict: bool) -> Result<()> {
    let targets: Vec<(String, PathBuf)> = match version {
        Some(v) => {
            let dir = settings.output_dir.join(v);
            if !dir.is_dir() {
                return Err(AemonError::configuration(format!(
                    "Version {v} not found in {}",
                    settings.output_dir.display()
                )));
            }
            vec![(v.to_string(), dir)]
        }
        None => existing_versions(&settings.output_dir, &settings.version_prefix)?
            .into_iter()
            .map(|v| (v.name, v.path))
            .collect(),
    };

    if targets.is_empty() {
        warn!("No versions found to validate");
        return Ok(());
    }

    let failed = targets
        .iter()
        .map(|(name, dir)| validate_version(dir, name))
        .inspect(log_report)
        .filter(|report| !report.passes(strict))
        .count();

    if failed > 0 {
        return Err(AemonError::Validation { failed });
    }
    info!("✅ {} version(s) valid", targets.len());
    Ok(())
}

/// Render the version list in `format`.
///
/// JSON and YAML always produce a document; the table says so when there
/// is nothing to list.
pub fn render_list(settings: &Settings, format: ListFormat, detailed: bool) -> Result<String> {
    let versions = existing_versions(&settings.output_dir, &settings.version_prefix)?;

    let detail = |name: &str, path: &Path| -> Value {
        let mut entry = serde_json::Map::new();
        entry.insert("version".into(), Value::String(name.to_string()));
        if let Some(record) = read_record(path) {
            if let Ok(Value::Object(fields)) = serde_json::to_value(&record) {
                for (key, value) in fields {
                    if key != "version" {
                        entry.insert(key, value);
                    }
                }
            }
        }
        Value::Object(entry)
    };

    let document = if detailed {
        Value::Array(versions.iter().map(|v| detail(&v.name, &v.path)).collect())
    } else {
        json!({ "versions": versions.iter().map(|v| v.name.as_str()).collect::<Vec<_>>() })
    };

    Ok(match format {
        ListFormat::Json => serde_json::to_string_pretty(&document)?,
        ListFormat::Yaml => serde_yaml::to_string(&document)?.trim_end().to_string(),
        ListFormat::Table if versions.is_empty() => "No API versions found".to_string(),
        ListFormat::Table if detailed => {
            let mut out = format!("{:<10} {:<20} {:<8} {:<30}\n", "Version", "Generated", "Routes", "Module");
            out.push_str(&"-".repeat(70));
            for v in &versions {
                let record = read_record(&v.path);
                let generated = record
                    .as_ref()
                    .map_or_else(|| "Unknown".to_string(), |r| r.display_date());
                let routes = record
                    .as_ref()
                    .and_then(|r| r.routes_count)
                    .map_or_else(|| "Unknown".to_string(), |n| n.to_string());
                let module = record
                    .as_ref()
                    .map(|r| r.module_path.as_str())
                    .filter(|m| !m.is_empty())
                    .unwrap_or("Unknown");
                out.push_str(&format!("\n{:<10} {generated:<20} {routes:<8} {module:<30}", v.name));
            }
            out
        }
        ListFormat::Table => {
            let mut out = String::from("Available API versions:");
            for v in &versions {
                out.push_str(&format!("\n  • {}", v.name));
            }
            out
        }
    })
}
