//! evalmark - weighted rubric scoring CLI
//!
//! The `evalmark` command manages rubrics, scores evaluation sheets against
//! them and tracks how criterion scores move over time.
//!
//! ## Commands
//!
//! - `templates`: List built-in rubric templates
//! - `rubric`: Create, import, inspect and export rubrics
//! - `evaluate`: Score a sheet of records and record a snapshot
//! - `history`: Show recorded snapshots
//! - `trend`: Per-criterion improvement across snapshots
//! - `report`: Write a report artifact
//! - `prompt`: Generate scorer prompts

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, Level};

use evalmark_core::export::{criteria_table, read_csv_rows, score_table, to_csv_string};
use evalmark_core::metrics::METRICS;
use evalmark_core::prompt::{code_scorer_template, llm_judge_prompt};
use evalmark_core::reporting::{write_report_json, write_report_md};
use evalmark_core::{
    analyze, build_report, builtin_templates, find_template, from_imported_str, load_workspace,
    normalize_rows, obs, save_workspace, validate_rubric, Dimension, EngineConfig, FieldMapping,
    Rubric, RubricId, RubricSource, ScoreChannel, WeightPolicy, Workspace,
};
use evalmark_state::FsKvStore;

#[derive(Parser)]
#[command(name = "evalmark")]
#[command(author = "Evalmark Contributors")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Weighted rubric scoring for AI product evaluations", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Directory holding the persisted workspace
    #[arg(long, global = true, env = "EVALMARK_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Save-time handling of weights that do not sum to 1 (lenient | strict)
    #[arg(long, global = true, env = "EVALMARK_WEIGHT_POLICY")]
    weight_policy: Option<WeightPolicy>,

    /// Maximum snapshots kept in history
    #[arg(long, global = true, env = "EVALMARK_HISTORY_CAP")]
    history_cap: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List built-in rubric templates
    Templates,

    /// Rubric management
    Rubric {
        #[command(subcommand)]
        action: RubricAction,
    },

    /// Score a sheet of records against a rubric and record a snapshot
    Evaluate {
        /// Rows to score (.json array of objects, or .csv)
        #[arg(long)]
        rows: PathBuf,

        /// Rubric id (default: the active rubric)
        #[arg(long)]
        rubric: Option<String>,

        /// Score channel to read
        #[arg(long, value_enum, default_value = "human")]
        channel: Channel,

        /// Read columns named exactly after each criterion
        #[arg(long, conflicts_with = "bind")]
        by_name: bool,

        /// Explicit `field=criterion` binding (repeatable)
        #[arg(long, value_name = "FIELD=CRITERION")]
        bind: Vec<String>,
    },

    /// Show recorded snapshots
    History {
        /// Only snapshots of this rubric
        #[arg(long)]
        rubric: Option<String>,
    },

    /// Per-criterion improvement across snapshots
    Trend {
        /// Rubric id (default: the active rubric)
        #[arg(long)]
        rubric: Option<String>,
    },

    /// Write an evaluation report artifact
    Report {
        /// Rubric id (default: the active rubric)
        #[arg(long)]
        rubric: Option<String>,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,

        /// Render markdown instead of JSON
        #[arg(long)]
        markdown: bool,
    },

    /// Generate scorer prompts for a rubric
    Prompt {
        #[command(subcommand)]
        kind: PromptKind,
    },
}

#[derive(Subcommand)]
enum RubricAction {
    /// Instantiate a built-in template
    New {
        /// Template id (see `evalmark templates`)
        #[arg(long)]
        template: String,

        /// Name override
        #[arg(long, default_value = "")]
        name: String,

        /// Description override
        #[arg(long, default_value = "")]
        description: String,
    },

    /// Build a rubric from a JSON list of dimensions
    FromDimensions {
        /// File holding `[{"name", "description", "weight"}, ...]`
        file: PathBuf,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "")]
        description: String,

        /// Mark the dimensions as AI-generated
        #[arg(long)]
        ai: bool,
    },

    /// Import a rubric file
    Import {
        /// JSON file with `name`, `description` and `criteria`
        file: PathBuf,
    },

    /// List stored rubrics
    List,

    /// Print a rubric as JSON
    Show { id: String },

    /// Make a rubric the active one
    Activate { id: String },

    /// Delete a rubric
    Delete { id: String },

    /// Report validation findings for a rubric
    Check { id: String },

    /// Export a rubric
    Export {
        id: String,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Export the criteria sheet as CSV instead of the rubric JSON
        #[arg(long)]
        csv: bool,
    },
}

#[derive(Subcommand)]
enum PromptKind {
    /// LLM judging prompt with input/output placeholders
    Llm {
        #[arg(long)]
        rubric: Option<String>,
    },
    /// Code scorer skeleton with one weighted term per criterion
    Code {
        #[arg(long)]
        rubric: Option<String>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Channel {
    Human,
    Llm,
    Code,
    #[value(alias = "composite")]
    Benchmark,
}

impl From<Channel> for ScoreChannel {
    fn from(c: Channel) -> Self {
        match c {
            Channel::Human => ScoreChannel::Human,
            Channel::Llm => ScoreChannel::Llm,
            Channel::Code => ScoreChannel::Code,
            Channel::Benchmark => ScoreChannel::Composite,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    evalmark_core::telemetry::init_tracing(cli.json, level);

    let mut config = EngineConfig::from_env().context("Invalid EVALMARK_* configuration")?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    if let Some(policy) = cli.weight_policy {
        config = config.with_weight_policy(policy);
    }
    if let Some(cap) = cli.history_cap {
        if cap == 0 {
            bail!("--history-cap must be at least 1");
        }
        config = config.with_history_cap(cap);
    }

    if let Commands::Templates = cli.command {
        cmd_templates();
        return Ok(());
    }

    let kv = FsKvStore::open(&config.data_dir)
        .await
        .with_context(|| format!("Failed to open data dir {:?}", config.data_dir))?;
    let mut ws = load_workspace(&kv, &config)
        .await
        .context("Failed to load workspace")?;

    let dirty = match cli.command {
        Commands::Templates => false,
        Commands::Rubric { action } => match action {
            RubricAction::New {
                template,
                name,
                description,
            } => cmd_rubric_new(&mut ws, &config, &template, &name, &description)?,
            RubricAction::FromDimensions {
                file,
                name,
                description,
                ai,
            } => cmd_rubric_from_dimensions(&mut ws, &config, &file, &name, &description, ai)?,
            RubricAction::Import { file } => cmd_rubric_import(&mut ws, &config, &file)?,
            RubricAction::List => cmd_rubric_list(&ws),
            RubricAction::Show { id } => cmd_rubric_show(&ws, &id)?,
            RubricAction::Activate { id } => cmd_rubric_activate(&mut ws, &id)?,
            RubricAction::Delete { id } => cmd_rubric_delete(&mut ws, &id)?,
            RubricAction::Check { id } => cmd_rubric_check(&ws, &config, &id)?,
            RubricAction::Export { id, output, csv } => {
                cmd_rubric_export(&ws, &id, output.as_deref(), csv)?
            }
        },
        Commands::Evaluate {
            rows,
            rubric,
            channel,
            by_name,
            bind,
        } => cmd_evaluate(
            &mut ws,
            &rows,
            rubric.as_deref(),
            channel.into(),
            by_name,
            &bind,
        )?,
        Commands::History { rubric } => cmd_history(&ws, rubric.as_deref()),
        Commands::Trend { rubric } => cmd_trend(&ws, rubric.as_deref())?,
        Commands::Report {
            rubric,
            output,
            markdown,
        } => cmd_report(&mut ws, rubric.as_deref(), &output, markdown)?,
        Commands::Prompt { kind } => cmd_prompt(&ws, kind)?,
    };

    if dirty {
        save_workspace(&kv, &ws)
            .await
            .context("Failed to save workspace")?;
    }
    METRICS.flush();
    Ok(())
}

fn resolve<'a>(ws: &'a Workspace, id: Option<&str>) -> Result<&'a Rubric> {
    let id = id.map(RubricId::from);
    ws.benchmarks
        .resolve(id.as_ref())
        .context("No rubric given and none is active (see `evalmark rubric activate`)")
}

/// List built-in rubric templates
fn cmd_templates() {
    for template in builtin_templates() {
        println!("{:<18} {}", template.id, template.name);
        for c in template.criteria {
            println!("    {:<18} {:>5.0}%  {}", c.name, c.weight * 100.0, c.description);
        }
    }
}

/// Store a new rubric and make it active when nothing else is.
fn store_rubric(ws: &mut Workspace, config: &EngineConfig, rubric: Rubric) -> Result<RubricId> {
    let id = rubric.id.clone();
    let findings = ws
        .benchmarks
        .add(rubric, config)
        .context("Rubric was rejected")?;
    for finding in &findings {
        println!("warning: {}", finding);
    }
    if ws.benchmarks.active_id().is_none() {
        ws.benchmarks.set_active(Some(&id))?;
    }
    Ok(id)
}

/// Instantiate a built-in template
fn cmd_rubric_new(
    ws: &mut Workspace,
    config: &EngineConfig,
    template: &str,
    name: &str,
    description: &str,
) -> Result<bool> {
    let template = find_template(template)?;
    let rubric = Rubric::from_template(template, name, description);
    let label = rubric.name.clone();
    let id = store_rubric(ws, config, rubric)?;
    println!("Created rubric {} ({})", label, id);
    Ok(true)
}

/// Build a rubric from a dimension list
fn cmd_rubric_from_dimensions(
    ws: &mut Workspace,
    config: &EngineConfig,
    file: &Path,
    name: &str,
    description: &str,
    ai: bool,
) -> Result<bool> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read dimensions file: {:?}", file))?;
    let dims: Vec<Dimension> =
        serde_json::from_str(&content).context("Failed to parse dimensions as JSON")?;

    let source = if ai {
        RubricSource::AiGenerated
    } else {
        RubricSource::Custom
    };
    let rubric = Rubric::from_dimensions(name, description, &dims, source)?;
    let id = store_rubric(ws, config, rubric)?;
    println!("Created rubric {} ({} criteria, {})", name, dims.len(), id);
    Ok(true)
}

/// Import a rubric file
fn cmd_rubric_import(ws: &mut Workspace, config: &EngineConfig, file: &Path) -> Result<bool> {
    let content = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read rubric file: {:?}", file))?;
    let rubric = from_imported_str(&content)
        .with_context(|| format!("Failed to import {:?}", file))?;

    let name = rubric.name.clone();
    let criteria = rubric.criteria.len();
    let id = store_rubric(ws, config, rubric)?;
    METRICS.inc_rubrics_imported();
    obs::emit_rubric_imported(id.as_str(), &name, criteria);

    println!("Imported rubric {} ({})", name, id);
    Ok(true)
}

/// List stored rubrics
fn cmd_rubric_list(ws: &Workspace) -> bool {
    if ws.benchmarks.is_empty() {
        println!("No rubrics stored");
        return false;
    }
    let active = ws.benchmarks.active_id();
    for rubric in ws.benchmarks.list() {
        let marker = if Some(&rubric.id) == active { "*" } else { " " };
        println!(
            "{} {}  {}  ({} criteria, {:?})",
            marker,
            rubric.id,
            rubric.name,
            rubric.criteria.len(),
            rubric.source
        );
    }
    false
}

/// Print a rubric as JSON
fn cmd_rubric_show(ws: &Workspace, id: &str) -> Result<bool> {
    let rubric = ws.benchmarks.require(&RubricId::from(id))?;
    println!("{}", serde_json::to_string_pretty(rubric)?);
    Ok(false)
}

/// Make a rubric the active one
fn cmd_rubric_activate(ws: &mut Workspace, id: &str) -> Result<bool> {
    let id = RubricId::from(id);
    ws.benchmarks.set_active(Some(&id))?;
    println!("Active rubric: {}", id);
    Ok(true)
}

/// Delete a rubric
fn cmd_rubric_delete(ws: &mut Workspace, id: &str) -> Result<bool> {
    let removed = ws.benchmarks.delete(&RubricId::from(id))?;
    println!("Deleted rubric {} ({})", removed.name, removed.id);
    Ok(true)
}

/// Report validation findings for a rubric
fn cmd_rubric_check(ws: &Workspace, config: &EngineConfig, id: &str) -> Result<bool> {
    let rubric = ws.benchmarks.require(&RubricId::from(id))?;
    let findings = validate_rubric(rubric, config.weight_tolerance);
    if findings.is_empty() {
        println!("{}: ok", rubric.id);
        return Ok(false);
    }

    for finding in &findings {
        let severity = if finding.is_blocking() {
            "error"
        } else {
            "note"
        };
        println!("{}: {}", severity, finding);
    }
    if findings.iter().any(|f| f.is_blocking()) {
        bail!("{} has blocking findings", rubric.id);
    }
    Ok(false)
}

/// Export a rubric
fn cmd_rubric_export(ws: &Workspace, id: &str, output: Option<&Path>, csv: bool) -> Result<bool> {
    let rubric = ws.benchmarks.require(&RubricId::from(id))?;
    let content = if csv {
        to_csv_string(&criteria_table(rubric))?
    } else {
        serde_json::to_string_pretty(rubric)?
    };

    match output {
        Some(path) => {
            std::fs::write(path, &content)
                .with_context(|| format!("Failed to write to {:?}", path))?;
            println!("Exported {} to {:?}", rubric.id, path);
        }
        None => println!("{}", content),
    }
    Ok(false)
}

/// Read evaluation rows from a `.json` array or a `.csv` sheet.
fn load_rows(path: &Path) -> Result<Vec<Map<String, Value>>> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("csv") => {
            let file =
                std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
            read_csv_rows(file).with_context(|| format!("Failed to read CSV {:?}", path))
        }
        Some("json") => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {:?}", path))?;
            let value: Value =
                serde_json::from_str(&content).context("Failed to parse rows as JSON")?;
            let Value::Array(items) = value else {
                bail!("{:?}: expected a JSON array of row objects", path);
            };
            items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(map) => Ok(map),
                    _ => bail!("{:?}: row {} is not an object", path, i + 1),
                })
                .collect()
        }
        _ => bail!("{:?}: unsupported row file (expected .json or .csv)", path),
    }
}

fn parse_bindings(bind: &[String]) -> Result<FieldMapping> {
    bind.iter().try_fold(FieldMapping::new(), |mapping, binding| {
        let Some((field, criterion)) = binding.split_once('=') else {
            bail!("invalid binding '{}': expected FIELD=CRITERION", binding);
        };
        Ok(mapping.bind(field.trim(), criterion.trim()))
    })
}

/// Score rows and record a snapshot
fn cmd_evaluate(
    ws: &mut Workspace,
    rows_path: &Path,
    rubric_id: Option<&str>,
    channel: ScoreChannel,
    by_name: bool,
    bind: &[String],
) -> Result<bool> {
    let rubric = resolve(ws, rubric_id)?.clone();
    let rows = load_rows(rows_path)?;
    let records = normalize_rows(&rows);

    let mapping = if by_name {
        FieldMapping::by_criterion_name(&rubric)
    } else if !bind.is_empty() {
        parse_bindings(bind)?
    } else {
        FieldMapping::uniform(&rubric, channel)
    };

    info!(rubric = %rubric.id, records = records.len(), ?channel, "evaluating");
    let recorded = ws
        .evaluations
        .record_evaluation(&rubric, records, channel, &mapping)?;
    ws.evaluations.set_current_evaluation(recorded.records);

    for warning in &recorded.batch.warnings {
        println!("warning: {}", warning);
    }
    let means: HashMap<String, f64> = recorded
        .batch
        .criterion_means
        .iter()
        .map(|(k, v)| (k.clone(), *v))
        .collect();
    println!("{:<20} {:>7} {:>7} {:>9}", "Dimension", "Score", "Weight", "Weighted");
    for row in score_table(&rubric, &means) {
        println!(
            "{:<20} {:>7.3} {:>7.2} {:>9.3}",
            row.dimension, row.score, row.weight, row.weighted_score
        );
    }
    println!(
        "Scored {} record(s), mean composite {:.3}",
        recorded.batch.composites.len(),
        recorded.batch.mean_composite
    );
    if !recorded.evicted.is_empty() {
        println!("Evicted {} old snapshot(s)", recorded.evicted.len());
    }
    Ok(true)
}

/// Show recorded snapshots
fn cmd_history(ws: &Workspace, rubric_id: Option<&str>) -> bool {
    let filter = rubric_id.map(RubricId::from);
    let mut shown = 0;
    for snap in ws.evaluations.history() {
        if filter.as_ref().is_some_and(|id| &snap.rubric.id != id) {
            continue;
        }
        let scores = snap
            .scores
            .iter()
            .map(|(k, v)| format!("{}={:.2}", k, v))
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{}  {}  {} record(s)  {}",
            snap.date.format("%Y-%m-%d %H:%M:%S"),
            snap.rubric.id,
            snap.records.len(),
            scores
        );
        shown += 1;
    }
    if shown == 0 {
        println!("No snapshots recorded");
    }
    false
}

/// Per-criterion improvement across snapshots
fn cmd_trend(ws: &Workspace, rubric_id: Option<&str>) -> Result<bool> {
    let rubric = resolve(ws, rubric_id)?;
    let report = analyze(ws.evaluations.history(), &rubric.id);
    if report.is_empty() {
        println!("No snapshots recorded for {}", rubric.id);
        return Ok(false);
    }

    println!(
        "{} across {} snapshot(s){}",
        rubric.name,
        report.dates.len(),
        if report.rubric_changed {
            " (rubric changed between snapshots)"
        } else {
            ""
        }
    );
    for t in &report.ranking {
        println!(
            "{:<20} {:>6.2} -> {:>6.2}  {:>+8.1}%  {}",
            t.criterion, t.first, t.last, t.improvement_pct, t.suggestion
        );
    }
    Ok(false)
}

/// Write an evaluation report artifact
fn cmd_report(
    ws: &mut Workspace,
    rubric_id: Option<&str>,
    output: &Path,
    markdown: bool,
) -> Result<bool> {
    let rubric = resolve(ws, rubric_id)?.clone();
    let latest = ws.evaluations.latest_for(&rubric.id).cloned();
    let trend = analyze(ws.evaluations.history(), &rubric.id);
    let trend = (!trend.is_empty()).then_some(trend);

    let artifact = build_report(&rubric, latest.as_ref(), trend)?;
    if markdown {
        write_report_md(output, &artifact)?;
    } else {
        write_report_json(output, &artifact)?;
    }
    println!("Wrote report for {} to {:?}", rubric.id, output);

    match latest {
        Some(snap) => {
            ws.evaluations.add_recent_report(rubric.id, snap.scores);
            Ok(true)
        }
        None => Ok(false),
    }
}

/// Generate scorer prompts
fn cmd_prompt(ws: &Workspace, kind: PromptKind) -> Result<bool> {
    let text = match kind {
        PromptKind::Llm { rubric } => llm_judge_prompt(resolve(ws, rubric.as_deref())?),
        PromptKind::Code { rubric } => code_scorer_template(resolve(ws, rubric.as_deref())?),
    };
    println!("{}", text);
    Ok(false)
}
