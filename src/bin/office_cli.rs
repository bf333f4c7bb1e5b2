//! Site Office command line
//!
//! # Usage
//!
//! ```bash
//! # Generate a handover act
//! office_cli generate handover_act --apartment 45 --date 03.07.2024
//!
//! # Generate a letter from a JSON parameter file
//! office_cli generate letter --params letter.json --output out/
//!
//! # Inspect an existing document
//! office_cli analyze act.docx
//!
//! # See how free text is understood
//! office_cli parse "создай отчет о работах; адрес: ул. Лесная, 3"
//!
//! # Process pending commands once (use OFFICE_STORE=postgres for a shared queue)
//! office_cli agent --once
//!
//! # Browse Yandex Disk
//! YANDEX_DISK_TOKEN=... office_cli disk ls disk:/Акты
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use office_types::{CommandAction, DocumentParams, TemplateType};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use site_office::commands::parse_command_text;
use site_office::docx::analyze_docx;
use site_office::{LetterStyle, OfficeConfig, Services, YandexDiskClient};

#[derive(Parser)]
#[command(name = "office_cli")]
#[command(version)]
#[command(about = "Construction-site office helper: documents, command queue, Yandex Disk")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, short = 'o', global = true, default_value = "pretty", value_enum)]
    format: OutputFormat,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a document
    Generate {
        /// handover_act, defect_report, work_report or letter
        template: TemplateType,

        /// JSON file with document parameters
        #[arg(long)]
        params: Option<PathBuf>,

        #[arg(long)]
        apartment: Option<String>,

        /// dd.mm.yyyy or yyyy-mm-dd, today by default
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        recipient: Option<String>,

        #[arg(long)]
        subject: Option<String>,

        /// Letter style: standard, underlined, compact, formal
        #[arg(long)]
        style: Option<String>,

        /// Output directory
        #[arg(long, default_value = ".")]
        output: PathBuf,

        /// Ignore learning examples
        #[arg(long)]
        no_learning: bool,
    },

    /// Analyze the structure of a .docx file
    Analyze {
        file: PathBuf,

        /// Also print every paragraph
        #[arg(long)]
        verbose: bool,
    },

    /// Show how a free-text command is interpreted
    Parse { text: String },

    /// Run the command agent
    Agent {
        /// Process one batch and exit
        #[arg(long)]
        once: bool,
    },

    /// Yandex Disk operations
    Disk {
        #[command(subcommand)]
        command: DiskCommands,
    },

    /// List templates and letter styles
    Templates,
}

#[derive(Subcommand)]
enum DiskCommands {
    /// List a folder
    Ls {
        #[arg(default_value = "disk:/")]
        path: String,

        #[arg(long)]
        limit: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("site_office=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let format = cli.format;

    let result = match cli.command {
        Commands::Generate {
            template,
            params,
            apartment,
            date,
            recipient,
            subject,
            style,
            output,
            no_learning,
        } => {
            let overrides = DocumentParams {
                apartment,
                date,
                recipient,
                subject,
                style,
                ..Default::default()
            };
            cmd_generate(template, params, overrides, output, !no_learning, format).await
        }
        Commands::Analyze { file, verbose } => cmd_analyze(file, verbose, format),
        Commands::Parse { text } => cmd_parse(&text, format),
        Commands::Agent { once } => cmd_agent(once).await,
        Commands::Disk {
            command: DiskCommands::Ls { path, limit },
        } => cmd_disk_ls(&path, limit, format).await,
        Commands::Templates => cmd_templates(format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Flags override values from the parameter file
fn merge_params(mut base: DocumentParams, overrides: DocumentParams) -> DocumentParams {
    fn take(target: &mut Option<String>, value: Option<String>) {
        if value.is_some() {
            *target = value;
        }
    }
    take(&mut base.apartment, overrides.apartment);
    take(&mut base.date, overrides.date);
    take(&mut base.recipient, overrides.recipient);
    take(&mut base.subject, overrides.subject);
    take(&mut base.style, overrides.style);
    base
}

async fn cmd_generate(
    template: TemplateType,
    params_file: Option<PathBuf>,
    overrides: DocumentParams,
    output: PathBuf,
    use_learning: bool,
    format: OutputFormat,
) -> Result<()> {
    let base = match params_file {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid parameters in {:?}", path))?
        }
        None => DocumentParams::default(),
    };
    let params = merge_params(base, overrides);

    let config = OfficeConfig::load()?;
    let services = Services::from_config(&config).await?;
    let profile = if use_learning {
        services.learning.profile_for(template)
    } else {
        None
    };
    let generated = services
        .generator
        .generate(template, &params, profile.as_ref())?;

    std::fs::create_dir_all(&output).with_context(|| format!("Failed to create {:?}", output))?;
    let path = output.join(&generated.file_name);
    std::fs::write(&path, &generated.bytes).with_context(|| format!("Failed to write {:?}", path))?;

    if format == OutputFormat::Json {
        return print_json(&generated);
    }
    println!("{} {}", "OK".green().bold(), path.display());
    println!(
        "  {} paragraphs, {} tables, {} bytes",
        generated.paragraph_count, generated.table_count, generated.size
    );
    if let Some(source) = &generated.profile_source {
        println!("  layout from {}", source.cyan());
    }
    Ok(())
}

fn cmd_analyze(file: PathBuf, verbose: bool, format: OutputFormat) -> Result<()> {
    let bytes = std::fs::read(&file).with_context(|| format!("Failed to read {:?}", file))?;
    let structure = analyze_docx(&bytes)?;

    if format == OutputFormat::Json {
        return print_json(&structure);
    }

    println!("{}", file.display().to_string().cyan().bold());
    println!(
        "  paragraphs: {}  tables: {}  words: {}",
        structure.paragraph_count, structure.table_count, structure.word_count
    );
    match structure.detected_type {
        Some(t) => println!("  detected: {} ({})", t.name().green().bold(), t.title_ru()),
        None => println!("  detected: {}", "unknown".yellow()),
    }
    if !structure.keywords.is_empty() {
        println!("  keywords: {}", structure.keywords.join(", "));
    }
    for heading in &structure.headings {
        println!("  {} {}", "#".bold(), heading);
    }
    for (i, table) in structure.tables.iter().enumerate() {
        println!("  table {}: {}x{}", i + 1, table.rows, table.columns);
        if let Some(header) = table.header() {
            println!("    {}", header.join(" | ").dimmed());
        }
    }
    if verbose {
        for p in structure.paragraphs.iter().filter(|p| !p.text.is_empty()) {
            let align = p.alignment.as_deref().unwrap_or("-");
            println!("  [{:>7}] {}", align, p.text);
        }
    }
    Ok(())
}

fn cmd_parse(text: &str, format: OutputFormat) -> Result<()> {
    let action = parse_command_text(text)?;
    if format == OutputFormat::Json {
        return print_json(&action);
    }
    println!("{} {}", "action:".bold(), action.kind().green());
    match &action {
        CommandAction::CreateDocument {
            template_type,
            params,
        } => {
            println!("  template: {}", template_type);
            if let Some(apartment) = &params.apartment {
                println!("  apartment: {}", apartment);
            }
            if let Some(date) = &params.date {
                println!("  date: {}", date);
            }
        }
        CommandAction::PrintDocument { file_path, copies } => {
            println!("  file: {}", file_path);
            println!("  copies: {}", copies);
        }
        CommandAction::UploadDocument {
            file_path,
            disk_path,
        } => {
            println!("  file: {}", file_path);
            println!("  disk path: {}", disk_path.as_deref().unwrap_or("(default)"));
        }
    }
    Ok(())
}

async fn cmd_agent(once: bool) -> Result<()> {
    let config = OfficeConfig::load()?;
    let services = Services::from_config(&config).await?;
    let agent = Arc::new(services.agent(&config));

    if once {
        let count = agent.run_once().await?;
        println!("{} processed {} command(s)", "OK".green().bold(), count);
        return Ok(());
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handle = agent.spawn(shutdown_rx);
    tokio::signal::ctrl_c().await?;
    let _ = shutdown_tx.send(true);
    handle.await?;
    Ok(())
}

async fn cmd_disk_ls(path: &str, limit: Option<u32>, format: OutputFormat) -> Result<()> {
    let config = OfficeConfig::load()?;
    let client = YandexDiskClient::new(&config.disk)?;
    let listing = client.list(path, limit, None).await?;

    if format == OutputFormat::Json {
        return print_json(&listing);
    }
    println!("{}", listing.path.cyan().bold());
    for item in &listing.items {
        if item.is_dir() {
            println!("  {}/", item.name.blue().bold());
        } else {
            println!("  {:<48} {:>10}", item.name, item.size.unwrap_or(0));
        }
    }
    if let Some(total) = listing.total {
        if total as usize > listing.items.len() {
            println!(
                "  ... {} of {} shown (offset {})",
                listing.items.len(),
                total,
                listing.offset
            );
        }
    }
    Ok(())
}

fn cmd_templates(format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        let templates: Vec<_> = TemplateType::all()
            .iter()
            .map(|t| serde_json::json!({ "name": t.name(), "title": t.title_ru() }))
            .collect();
        return print_json(&serde_json::json!({
            "templates": templates,
            "letter_styles": LetterStyle::all(),
        }));
    }

    println!("{}", "Templates".cyan().bold());
    for t in TemplateType::all() {
        println!("  {:<15} {}", t.name().green(), t.title_ru());
        println!("  {:<15} {}", "", t.description().dimmed());
    }
    println!("{}", "Letter styles".cyan().bold());
    for style in LetterStyle::all() {
        println!(
            "  {:<15} {}pt, line {}, after {}pt{}",
            style.name.green(),
            style.font_size_pt,
            style.line_spacing,
            style.spacing_after_pt,
            if style.underline_subject { ", underlined" } else { "" }
        );
    }
    Ok(())
}
