//! PDF Trust CLI
//!
//! Operator front end for remote signature validation, A1 signing,
//! certificate inspection and A3 digest preparation.

use clap::{Parser, Subcommand, ValueEnum};
use miette::{Context, IntoDiagnostic, Result};
use pdf_trust::{
    infra::config::ExportFormat, A3HashPreparer, BatchValidator, BrowserSignatureValidator,
    CertificateLoader, ConfigManager, DocumentInput, DriverPool, Passphrase, SignOptions,
    SignatureAnchor, TargetPage, TrustConfiguration, ValidationRecord,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "pdf-trust")]
#[command(about = "Validate and sign PDF documents")]
#[command(long_about = "
PDF Trust - signature validation and PKCS#12 signing for PDF documents

EXAMPLES:
    # Validate documents against the remote authority
    pdf-trust validate contrato.pdf anexo.pdf

    # Sign with a visible stamp on the last page
    pdf-trust sign contrato.pdf --pfx certificado.pfx --visible --page last

    # Inspect a certificate bundle
    pdf-trust cert-info --pfx certificado.pfx

    # Digest for signing with a hardware token
    pdf-trust a3-hash contrato.pdf

ENVIRONMENT VARIABLES:
    PDF_TRUST_PFX_PASSWORD    PKCS#12 passphrase
    RUST_LOG                  Logging level (debug, info, warn, error)
")]
#[command(version)]
struct Cli {
    /// Configuration file (defaults to the per-user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate PDF signatures with the remote authority
    Validate {
        /// PDF files to validate
        #[arg(value_name = "PDF", required = true)]
        files: Vec<PathBuf>,

        /// Maximum documents validated at once (overrides config)
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// WebDriver endpoint (overrides config)
        #[arg(long, value_name = "URL")]
        webdriver_url: Option<String>,

        /// Use reduced polling waits
        #[arg(long)]
        quick: bool,

        /// Print records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign a PDF with a PKCS#12 certificate
    Sign {
        /// PDF file to sign
        #[arg(value_name = "INPUT_FILE")]
        input_file: PathBuf,

        /// Output file path (defaults to <input>-signed.pdf)
        #[arg(short, long, value_name = "OUTPUT_FILE")]
        output: Option<PathBuf>,

        /// PKCS#12 bundle (.pfx / .p12)
        #[arg(long, value_name = "FILE")]
        pfx: PathBuf,

        /// Bundle passphrase
        #[arg(long, env = "PDF_TRUST_PFX_PASSWORD", hide_env_values = true)]
        password: String,

        /// Signature reason (defaults to config)
        #[arg(long)]
        reason: Option<String>,

        /// Signature location (defaults to config)
        #[arg(long)]
        location: Option<String>,

        /// Draw a visible stamp
        #[arg(long)]
        visible: bool,

        /// Stamp corner: bottom-right, bottom-left, top-right, top-left, center-bottom
        #[arg(long, default_value = "bottom-right")]
        anchor: SignatureAnchor,

        /// Stamp page: first, last, or a zero-based page index
        #[arg(long, default_value = "first")]
        page: TargetPage,
    },

    /// Show certificate details from a PKCS#12 bundle
    CertInfo {
        /// PKCS#12 bundle (.pfx / .p12)
        #[arg(long, value_name = "FILE")]
        pfx: PathBuf,

        /// Bundle passphrase
        #[arg(long, env = "PDF_TRUST_PFX_PASSWORD", hide_env_values = true)]
        password: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Compute the digest package for an external (A3) signer
    A3Hash {
        /// PDF file to hash
        #[arg(value_name = "PDF")]
        file: PathBuf,
    },

    /// Configuration management
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Create default configuration file
    Init,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,
        /// Configuration value
        value: String,
    },

    /// Export configuration
    Export {
        /// Export format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import configuration
    Import {
        /// Configuration file to import
        file: PathBuf,
        /// Import format
        #[arg(short, long, value_enum, default_value = "toml")]
        format: ExportFormatArg,
    },
}

#[derive(ValueEnum, Clone)]
enum ExportFormatArg {
    Toml,
    Json,
    Yaml,
}

impl From<ExportFormatArg> for ExportFormat {
    fn from(arg: ExportFormatArg) -> Self {
        match arg {
            ExportFormatArg::Toml => ExportFormat::Toml,
            ExportFormatArg::Json => ExportFormat::Json,
            ExportFormatArg::Yaml => ExportFormat::Yaml,
        }
    }
}

struct ValidateArgs {
    files: Vec<PathBuf>,
    concurrency: Option<usize>,
    webdriver_url: Option<String>,
    quick: bool,
    json: bool,
}

struct SignArgs {
    input_file: PathBuf,
    output: Option<PathBuf>,
    pfx: PathBuf,
    password: Passphrase,
    options: SignOptions,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path),
        None => ConfigManager::new()?,
    };

    match cli.command {
        Commands::Validate {
            files,
            concurrency,
            webdriver_url,
            quick,
            json,
        } => {
            let args = ValidateArgs {
                files,
                concurrency,
                webdriver_url,
                quick,
                json,
            };
            handle_validate_command(&config_manager, args).await?;
        }

        Commands::Sign {
            input_file,
            output,
            pfx,
            password,
            reason,
            location,
            visible,
            anchor,
            page,
        } => {
            let args = SignArgs {
                input_file,
                output,
                pfx,
                password: Passphrase::new(password),
                options: SignOptions {
                    reason,
                    location,
                    visible,
                    anchor,
                    target_page: page,
                },
            };
            handle_sign_command(&config_manager, args)?;
        }

        Commands::CertInfo {
            pfx,
            password,
            json,
        } => {
            handle_cert_info_command(&pfx, &Passphrase::new(password), json)?;
        }

        Commands::A3Hash { file } => {
            let bytes = std::fs::read(&file)
                .into_diagnostic()
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let package = A3HashPreparer::prepare(&bytes);
            println!(
                "{}",
                serde_json::to_string_pretty(&package).into_diagnostic()?
            );
        }

        Commands::Config(config_cmd) => {
            handle_config_command(&config_manager, config_cmd)?;
        }
    }

    Ok(())
}

/// The configured settings, or the defaults when no file exists yet.
fn load_configuration(config_manager: &ConfigManager) -> Result<TrustConfiguration> {
    if config_manager.config_path().exists() {
        Ok(config_manager.load()?)
    } else {
        log::debug!(
            "No configuration at {}, using defaults",
            config_manager.config_path().display()
        );
        Ok(TrustConfiguration::default())
    }
}

async fn handle_validate_command(config_manager: &ConfigManager, args: ValidateArgs) -> Result<()> {
    let config = load_configuration(config_manager)?;
    let mut validator_config = config.validator.clone();
    if args.quick {
        validator_config = validator_config.with_quick_timings();
    }
    if let Some(url) = args.webdriver_url {
        validator_config.webdriver_url = url;
    }
    let concurrency = args.concurrency.unwrap_or(config.batch.max_concurrency);

    let mut documents = Vec::with_capacity(args.files.len());
    for path in &args.files {
        let bytes = std::fs::read(path)
            .into_diagnostic()
            .with_context(|| format!("Failed to read {}", path.display()))?;
        documents.push(DocumentInput::new(display_name(path), bytes));
    }

    let pool = DriverPool::start(validator_config.clone()).await?;
    let validator = Arc::new(BrowserSignatureValidator::new(
        pool,
        validator_config.clone(),
        config.markers.clone(),
    )?);
    let batch = BatchValidator::from_config(validator.clone(), &validator_config, &config.batch);

    let cancel = batch.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupted, cancelling pending validations");
            cancel.cancel();
        }
    });

    let records = batch.validate_many(documents, concurrency).await;
    drop(batch);

    match Arc::try_unwrap(validator) {
        Ok(validator) => validator.into_factory().shutdown().await?,
        Err(_) => log::warn!("WebDriver still in use; leaving it to exit with the process"),
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&records).into_diagnostic()?
        );
    } else {
        for record in &records {
            print_record(record);
        }
    }

    let validated = records.iter().filter(|r| r.is_validated()).count();
    println!("\n{validated}/{} document(s) validated", records.len());
    Ok(())
}

fn print_record(record: &ValidationRecord) {
    let icon = if record.is_validated() { "✅" } else { "❌" };
    println!(
        "{icon} {} - {} (score {})",
        record.filename, record.final_verdict, record.score
    );
    let checks = [
        ("Extension", record.extension_valid),
        ("No password", record.no_password),
        ("File size", record.file_size_ok),
        ("Page size", record.page_size_ok),
        ("Signed", record.signed),
        ("Authenticity/integrity", record.authenticity_ok),
        ("Searchable", record.searchable),
    ];
    for (label, ok) in checks {
        println!("    {label}: {}", if ok { "ok" } else { "failed" });
    }
    if let Some(message) = &record.error_message {
        println!("    Note: {message}");
    }
}

fn handle_sign_command(config_manager: &ConfigManager, args: SignArgs) -> Result<()> {
    let config = load_configuration(config_manager)?;
    let output = args
        .output
        .unwrap_or_else(|| default_signed_path(&args.input_file));

    let outcome = pdf_trust::sign_pdf_file(
        &args.input_file,
        &output,
        &args.pfx,
        &args.password,
        &args.options,
        config.signing,
    )?;

    println!("✅ Signed by {}", outcome.document.signer_common_name);
    println!("   Output: {}", output.display());
    println!(
        "   Certificate valid until {} ({} days remaining)",
        outcome.certificate.not_after.format("%Y-%m-%d"),
        outcome.certificate.validity.days_remaining
    );
    Ok(())
}

fn handle_cert_info_command(pfx: &Path, password: &Passphrase, json: bool) -> Result<()> {
    let bytes = std::fs::read(pfx)
        .into_diagnostic()
        .with_context(|| format!("Failed to read {}", pfx.display()))?;
    let info = CertificateLoader::inspect(&bytes, password)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info).into_diagnostic()?);
        return Ok(());
    }

    println!("📋 Certificate:");
    println!("  Holder: {}", info.display_name());
    if let Some(document) = &info.identity_document {
        println!("  Document: {} ({:?})", document.number, document.kind);
    }
    if let Some(org) = &info.organization {
        println!("  Organization: {org}");
    }
    if let Some(email) = &info.email {
        println!("  Email: {email}");
    }
    if let Some(issuer) = &info.issuer_common_name {
        println!("  Issuer: {issuer}");
    }
    println!("  Serial: {}", info.serial_number);
    println!("  Not before: {}", info.not_before.to_rfc3339());
    println!("  Not after: {}", info.not_after.to_rfc3339());
    if info.validity.is_valid {
        println!("  Status: valid ({} days remaining)", info.validity.days_remaining);
    } else if info.validity.expired {
        println!("  Status: expired");
    } else {
        println!("  Status: not yet valid");
    }
    Ok(())
}

fn handle_config_command(config_manager: &ConfigManager, config_cmd: ConfigCommands) -> Result<()> {
    match config_cmd {
        ConfigCommands::Show => match config_manager.load() {
            Ok(config) => {
                println!("📋 Current Configuration:");
                println!("  Validation URL: {}", config.validator.validation_url);
                println!("  WebDriver URL: {}", config.validator.webdriver_url);
                println!("  Headless: {}", config.validator.headless);
                println!(
                    "  Polling: every {}ms, {} unchanged repeats, max {}s",
                    config.validator.poll_interval_ms,
                    config.validator.stable_samples,
                    config.validator.max_wait_secs
                );
                println!("  Hard timeout: {}s", config.validator.hard_timeout_secs);
                println!("  Max concurrency: {}", config.batch.max_concurrency);
                println!("  Default reason: {}", config.signing.default_reason);
                println!("  Default location: {}", config.signing.default_location);
                println!(
                    "  Configuration file: {}",
                    config_manager.config_path().display()
                );
            }
            Err(_) => {
                println!("📋 No configuration file found. Use 'config init' to create one.");
            }
        },

        ConfigCommands::Init => {
            config_manager.load_or_create_default()?;
            println!(
                "✅ Configuration initialized: {}",
                config_manager.config_path().display()
            );
            println!("   Edit the file to customize settings, or use 'config set' commands.");
        }

        ConfigCommands::Set { key, value } => {
            config_manager.update_value(&key, &value)?;
            println!("✅ Configuration updated: {key} = {value}");
        }

        ConfigCommands::Export { format, output } => {
            let content = config_manager.export_config(format.into())?;

            if let Some(output_path) = output {
                std::fs::write(&output_path, content).into_diagnostic()?;
                println!("✅ Configuration exported to: {}", output_path.display());
            } else {
                println!("{content}");
            }
        }

        ConfigCommands::Import { file, format } => {
            let content = std::fs::read_to_string(&file).into_diagnostic()?;
            config_manager.import_config(&content, format.into())?;
            println!("✅ Configuration imported from: {}", file.display());
        }
    }

    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned())
}

fn default_signed_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "document".into(), |s| s.to_string_lossy().into_owned());
    input.with_file_name(format!("{stem}-signed.pdf"))
}
