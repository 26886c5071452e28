//! Command line front end for `feder_core`.
//!
//! # Responsibility
//! - Expose render, section, citation and checkbox operations on project
//!   folders for scripting and quick local checks.
//! - Print machine-readable JSON on stdout; errors go to stderr.

use clap::{Parser, Subcommand};
use feder_core::markdown::frontmatter;
use feder_core::markdown::tasks::checkbox_state;
use feder_core::render::toc::table_of_contents;
use feder_core::service::templates::today_iso;
use feder_core::{
    init_logging_from_config, load_core_config, parse_bibliography, reference_list,
    resolve_citations, split_sections, CoreConfig, DocumentController, FsStorage, NoPrompt,
    OpenOutcome, Patch, Persona, UserSettings,
};
use log::info;
use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "feder", author, version, about, long_about = None)]
struct Cli {
    /// Write logs to this directory.
    #[arg(long, global = true)]
    log_dir: Option<String>,
    /// JSON file with controller settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the render tree of a project document as JSON
    Render {
        project: PathBuf,
        /// Document to render instead of the project default
        #[arg(long)]
        file: Option<String>,
        /// Section indices to render collapsed
        #[arg(long)]
        collapse: Vec<usize>,
    },
    /// Print the level-1 sections of a markdown file
    Sections { file: PathBuf },
    /// Print the table of contents of a markdown file
    Toc { file: PathBuf },
    /// Resolve citations of a markdown file against a bibliography
    Cite { bib: PathBuf, file: PathBuf },
    /// Flip the checkbox on a body line and save the document
    Toggle {
        project: PathBuf,
        file: String,
        line: usize,
    },
    /// Create a project folder from a persona template
    New {
        parent: PathBuf,
        name: String,
        #[arg(long, default_value = "researcher")]
        mode: Persona,
        /// Only write the project sidecar
        #[arg(long)]
        no_template: bool,
    },
}

type CliResult = Result<(), Box<dyn Error>>;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => match load_core_config(path) {
            Ok(config) => config,
            Err(err) => {
                eprintln!("Error: {err}");
                return ExitCode::FAILURE;
            }
        },
        None => CoreConfig::default(),
    };

    if let Some(log_dir) = &cli.log_dir {
        let log_dir = std::path::absolute(log_dir).unwrap_or_else(|_| PathBuf::from(log_dir));
        if let Err(err) = init_logging_from_config(&config, &log_dir.to_string_lossy()) {
            eprintln!("Error: {err}");
            return ExitCode::FAILURE;
        }
    }

    let result = match cli.command {
        Commands::Render {
            project,
            file,
            collapse,
        } => render_command(config, &project, file.as_deref(), &collapse),
        Commands::Sections { file } => sections_command(&file),
        Commands::Toc { file } => toc_command(&file),
        Commands::Cite { bib, file } => cite_command(&bib, &file),
        Commands::Toggle {
            project,
            file,
            line,
        } => toggle_command(config, &project, &file, line),
        Commands::New {
            parent,
            name,
            mode,
            no_template,
        } => new_command(config, &parent, &name, mode, !no_template),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn open_project(config: CoreConfig, project: &Path) -> Result<DocumentController<FsStorage>, Box<dyn Error>> {
    let fallback_name = project
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "Untitled Project".to_string());
    let mut controller = DocumentController::new(
        FsStorage::open(project)?,
        config,
        UserSettings::default(),
        Instant::now(),
    );
    controller.open_project(FsStorage::open(project)?, &fallback_name, &mut NoPrompt)?;
    Ok(controller)
}

fn render_command(config: CoreConfig, project: &Path, file: Option<&str>, collapse: &[usize]) -> CliResult {
    let mut controller = open_project(config, project)?;
    if let Some(file) = file {
        if let OpenOutcome::Cancelled = controller.open_document(file, &mut NoPrompt)? {
            return Ok(());
        }
    }
    for index in collapse {
        controller.view_mut().toggle_section(*index);
    }

    let rendered = controller
        .render(&today_iso())
        .ok_or("no markdown document to render")?;
    println!("{}", serde_json::to_string_pretty(&rendered)?);
    Ok(())
}

fn read_body(file: &Path) -> Result<String, Box<dyn Error>> {
    let raw = fs::read_to_string(file)?;
    let (_, body) = frontmatter::decode(&raw);
    Ok(body)
}

fn sections_command(file: &Path) -> CliResult {
    let sections = split_sections(&read_body(file)?);
    println!("{}", serde_json::to_string_pretty(&sections)?);
    Ok(())
}

fn toc_command(file: &Path) -> CliResult {
    let entries = table_of_contents(&read_body(file)?);
    println!("{}", serde_json::to_string_pretty(&entries)?);
    Ok(())
}

fn cite_command(bib: &Path, file: &Path) -> CliResult {
    let bibliography = parse_bibliography(&fs::read_to_string(bib)?);
    let resolved = resolve_citations(&read_body(file)?, &bibliography);
    let references = reference_list(&bibliography, &resolved.cited_keys);
    let output = serde_json::json!({
        "text": resolved.text,
        "citedKeys": resolved.cited_keys,
        "references": references,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn toggle_command(config: CoreConfig, project: &Path, file: &str, line: usize) -> CliResult {
    let mut controller = open_project(config, project)?;
    controller.open_document(file, &mut NoPrompt)?;

    let checked = controller
        .content()
        .split('\n')
        .nth(line)
        .and_then(checkbox_state)
        .ok_or_else(|| format!("line {line} of {file} is not a checkbox"))?;
    controller.apply_patch(&Patch::ToggleCheckbox { line, checked })?;
    controller.save(&mut NoPrompt)?;

    info!(
        "event=cli_toggle module=cli status=ok path={} line={} checked={}",
        file, line, !checked
    );
    println!("{}", serde_json::json!({ "line": line, "checked": !checked }));
    Ok(())
}

fn new_command(config: CoreConfig, parent: &Path, name: &str, mode: Persona, use_template: bool) -> CliResult {
    let root = parent.join(name);
    if root.exists() {
        return Err(format!("{} already exists", root.display()).into());
    }
    let mut controller = DocumentController::new(
        FsStorage::open(parent)?,
        config,
        UserSettings::default(),
        Instant::now(),
    );
    let outcome = controller.create_project(
        FsStorage::create(&root)?,
        name,
        mode,
        use_template,
        &today_iso(),
        &mut NoPrompt,
    )?;

    let opened = match outcome {
        OpenOutcome::Opened(path) => Some(path),
        OpenOutcome::NoDocument | OpenOutcome::Cancelled => None,
    };
    println!(
        "{}",
        serde_json::json!({
            "root": root.display().to_string(),
            "mode": mode.as_str(),
            "open": opened,
        })
    );
    Ok(())
}
