//! particle_scope - analyze images, browse saved results, export reports.
//!
//! Results are normalized before anything else sees them, saved to a bounded
//! history in the configured SQLite slot, and can be re-projected onto an
//! image of any rendered size or exported as CSV/HTML.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use particle_scope::config::ScopeConfig;
use particle_scope::report::{csv_report, html_report};
use particle_scope::{
    classify, project_all, AnalysisSession, CannedDetectionService, DetectionService,
    HistoryStore, ImagePayload, LabelAnchor, RenderedSize, SqliteHistoryPersistence,
};

#[path = "../ui.rs"]
mod ui;

#[derive(Parser, Debug)]
#[command(
    name = "particle_scope",
    version,
    about = "Particle detection results: analyze, browse history, export"
)]
struct Args {
    /// Progress output on stderr (auto|plain|spinner)
    #[arg(long, default_value = "auto", value_name = "MODE", global = true)]
    ui: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send an image for detection and save the result to history
    Analyze {
        /// Image file to analyze
        #[arg(long)]
        image: PathBuf,
        /// Use a saved service response instead of calling the service
        #[arg(long, value_name = "JSON")]
        response: Option<PathBuf>,
    },

    /// Browse or edit saved results
    History {
        #[command(subcommand)]
        command: HistoryCommand,
    },

    /// Print overlay rectangles for a saved result on an image of the given size
    Overlay {
        id: String,
        #[arg(long)]
        width: u32,
        #[arg(long)]
        height: u32,
    },

    /// Export a saved result
    Export {
        id: String,
        #[arg(long, value_name = "PATH", required_unless_present = "html")]
        csv: Option<PathBuf>,
        #[arg(long, value_name = "PATH")]
        html: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    /// List one page of saved results, most recent first
    List {
        /// Zero-based page number
        #[arg(long, default_value_t = 0)]
        page: usize,
        #[arg(long)]
        page_size: Option<usize>,
    },
    /// Print a saved result as JSON
    Show { id: String },
    /// Delete one saved result
    Remove { id: String },
    /// Delete all saved results
    Clear,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let ui = ui::Ui::new(ui::UiMode::parse(&args.ui));
    let cfg = ScopeConfig::load()?;

    let history = {
        let _stage = ui.stage("Open history");
        let persistence = SqliteHistoryPersistence::open(&cfg.db_path, &cfg.history.slot)?;
        HistoryStore::open(persistence)
    };

    match args.command {
        Command::Analyze { image, response } => {
            cmd_analyze(&ui, &cfg, history, &image, response.as_deref())
        }
        Command::History { command } => cmd_history(&cfg, history, command),
        Command::Overlay { id, width, height } => cmd_overlay(&cfg, &history, &id, width, height),
        Command::Export { id, csv, html } => {
            cmd_export(&ui, &history, &id, csv.as_deref(), html.as_deref())
        }
    }
}

fn cmd_analyze(
    ui: &ui::Ui,
    cfg: &ScopeConfig,
    history: HistoryStore<SqliteHistoryPersistence>,
    image_path: &Path,
    response: Option<&Path>,
) -> Result<()> {
    let image = {
        let _stage = ui.stage("Read image");
        ImagePayload::from_path(image_path)?
    };
    let mut service = detection_service(cfg, response)?;
    let mut session = AnalysisSession::new(history);

    let result = {
        let mut stage = ui.stage(&format!("Detect via {}", service.name()));
        let result = session
            .run(service.as_mut(), image)
            .map_err(|notice| anyhow!(notice.message))?;
        stage.detail(format!("{} detections", result.count));
        result
    };

    println!("count:       {}", result.count);
    println!("returned:    {}", result.detections.len());
    println!(
        "size counts: nanoplastic={} small={} medium={} large={}",
        result.size_counts.nanoplastic,
        result.size_counts.small,
        result.size_counts.medium,
        result.size_counts.large
    );
    for (index, detection) in result.detections.iter().enumerate() {
        let bucket = classify(detection, &cfg.particle_label);
        println!(
            "  #{:<3} {:<16} {:>5.1}%  {}",
            index + 1,
            detection.label,
            detection.confidence * 100.0,
            bucket.label()
        );
    }
    if let Some(saved) = session.history().items().first() {
        println!("saved as {}", saved.id);
    }
    Ok(())
}

fn detection_service(
    cfg: &ScopeConfig,
    response: Option<&Path>,
) -> Result<Box<dyn DetectionService>> {
    if let Some(path) = response {
        return Ok(Box::new(CannedDetectionService::from_path(path)?));
    }
    http_service(cfg)
}

#[cfg(feature = "service-http")]
fn http_service(cfg: &ScopeConfig) -> Result<Box<dyn DetectionService>> {
    Ok(Box::new(particle_scope::transport::HttpDetectionService::new(
        &cfg.service_url,
    )?))
}

#[cfg(not(feature = "service-http"))]
fn http_service(cfg: &ScopeConfig) -> Result<Box<dyn DetectionService>> {
    Err(anyhow!(
        "built without the service-http feature; cannot reach {} \
         (pass --response to replay a saved response)",
        cfg.service_url
    ))
}

fn cmd_history(
    cfg: &ScopeConfig,
    mut history: HistoryStore<SqliteHistoryPersistence>,
    command: HistoryCommand,
) -> Result<()> {
    match command {
        HistoryCommand::List { page, page_size } => {
            let size = page_size.unwrap_or(cfg.history.page_size);
            if size == 0 {
                return Err(anyhow!("page size must be greater than zero"));
            }
            let items = history.page(page, size);
            println!(
                "page {} of {} ({} saved)",
                page + 1,
                history.page_count(size).max(1),
                history.len()
            );
            for item in items {
                println!(
                    "{}  {}  {:<24} {} detections",
                    item.id, item.timestamp, item.filename, item.result.count
                );
            }
        }
        HistoryCommand::Show { id } => {
            let item = find_item(&history, &id)?;
            println!("{}", serde_json::to_string_pretty(&item.result)?);
        }
        HistoryCommand::Remove { id } => {
            if history.remove(&id) {
                println!("removed {}", id);
            } else {
                println!("no saved result with id {}", id);
            }
        }
        HistoryCommand::Clear => {
            history.clear();
            println!("history cleared");
        }
    }
    Ok(())
}

fn cmd_overlay(
    cfg: &ScopeConfig,
    history: &HistoryStore<SqliteHistoryPersistence>,
    id: &str,
    width: u32,
    height: u32,
) -> Result<()> {
    let item = find_item(history, id)?;
    let overlays = project_all(
        &item.result,
        Some(RenderedSize::new(width, height)),
        &cfg.particle_label,
    );
    for overlay in overlays {
        let anchor = match overlay.rect.label_anchor {
            LabelAnchor::Above => "above",
            LabelAnchor::InsideTop => "inside",
        };
        println!(
            "#{:<3} left={:.2}% top={:.2}% width={:.2}% height={:.2}% label={} color={} {}",
            overlay.index + 1,
            overlay.rect.left_pct,
            overlay.rect.top_pct,
            overlay.rect.width_pct,
            overlay.rect.height_pct,
            anchor,
            overlay.bucket.color(),
            overlay.caption
        );
    }
    Ok(())
}

fn cmd_export(
    ui: &ui::Ui,
    history: &HistoryStore<SqliteHistoryPersistence>,
    id: &str,
    csv: Option<&Path>,
    html: Option<&Path>,
) -> Result<()> {
    let item = find_item(history, id)?;
    if let Some(path) = csv {
        let _stage = ui.stage("Write CSV report");
        std::fs::write(path, csv_report(&item.result))
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("csv report written to {}", path.display());
    }
    if let Some(path) = html {
        let _stage = ui.stage("Write HTML report");
        std::fs::write(path, html_report(&item.result, &item.image, &item.filename))
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("html report written to {}", path.display());
    }
    Ok(())
}

fn find_item<'a>(
    history: &'a HistoryStore<SqliteHistoryPersistence>,
    id: &str,
) -> Result<&'a particle_scope::HistoryItem> {
    history
        .get(id)
        .ok_or_else(|| anyhow!("no saved result with id {}", id))
}
