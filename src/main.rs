use agentlint::graph::display_path;
use agentlint::{
    Baseline, Config, CorpusCache, Document, FsDiscovery, ImportGraph, Pipeline, Report, Severity,
    ValidationIssue,
};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// agentlint - Cross-document checks and issue baselines for agent/skill/command configs
#[derive(Parser)]
#[command(name = "agentlint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, default_value = agentlint::config::DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Corpus root (overrides the config file)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Quiet mode - suppress non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint the corpus, or only the given files, hiding baselined issues
    Check {
        /// Files or directories to report on (default: whole corpus)
        paths: Vec<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Report every issue, ignoring the baseline
        #[arg(long)]
        no_baseline: bool,

        /// Baseline file (overrides the config file)
        #[arg(short, long)]
        baseline: Option<PathBuf>,

        /// Exit 0 even when errors remain
        #[arg(long)]
        no_fail: bool,
    },

    /// Snapshot every current issue into a fresh baseline
    Baseline {
        /// Where to write the baseline (overrides the config file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show import edges and circular imports
    Graph {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    let result = load_config(&cli.config, cli.root.as_deref()).and_then(|config| match cli.command {
        Commands::Check { paths, json, no_baseline, baseline, no_fail } => {
            cmd_check(&config, &paths, json, no_baseline, baseline.as_deref(), cli.quiet)
                .map(|passed| passed || no_fail)
        }
        Commands::Baseline { output } => {
            cmd_baseline(&config, output.as_deref(), cli.quiet).map(|_| true)
        }
        Commands::Graph { json } => cmd_graph(&config, json).map(|_| true),
    });

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_logging(quiet: bool, verbose: bool) {
    let default = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_env("AGENTLINT_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: &Path, root: Option<&Path>) -> Result<Config, Box<dyn std::error::Error>> {
    let mut config = Config::load(path)?;
    if let Some(root) = root {
        config.root = root.to_path_buf();
    }
    config.root = fs::canonicalize(&config.root)
        .map_err(|e| format!("corpus root {}: {}", config.root.display(), e))?;
    Ok(config)
}

fn corpus(config: &Config) -> Result<CorpusCache<FsDiscovery>, Box<dyn std::error::Error>> {
    Ok(CorpusCache::new(config.discovery()?))
}

/// Expand CLI paths to the documents they cover.
fn select_targets(
    documents: &[Document],
    paths: &[PathBuf],
) -> Result<Vec<PathBuf>, Box<dyn std::error::Error>> {
    let mut targets = Vec::new();
    for path in paths {
        let abs = fs::canonicalize(path).map_err(|e| format!("{}: {}", path.display(), e))?;
        let before = targets.len();
        targets.extend(
            documents
                .iter()
                .filter(|d| d.path == abs || (abs.is_dir() && d.path.starts_with(&abs)))
                .map(|d| d.path.clone()),
        );
        if targets.len() == before {
            tracing::warn!(path = %path.display(), "not part of the corpus");
        }
    }
    Ok(targets)
}

fn cmd_check(
    config: &Config,
    paths: &[PathBuf],
    json: bool,
    no_baseline: bool,
    baseline_override: Option<&Path>,
    quiet: bool,
) -> Result<bool, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let cache = corpus(config)?;
    let documents = cache.get()?;

    let targets = if paths.is_empty() {
        None
    } else {
        Some(select_targets(&documents, paths)?)
    };

    let pipeline = Pipeline::new(&config.root);
    let results = pipeline.run(&documents, targets.as_deref());

    let baseline = if no_baseline || !config.use_baseline {
        None
    } else {
        let path = baseline_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config.baseline_path());
        Baseline::load_optional(&path)
    };

    let report = Report::new(results, baseline.as_ref());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, quiet);
        if !quiet {
            println!("  Time elapsed:     {:.2?}", start.elapsed());
        }
    }

    Ok(report.passed())
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    let label = format!("{:<10}", severity.as_str());
    match severity {
        Severity::Error => label.red().bold(),
        Severity::Warning => label.yellow().bold(),
        Severity::Suggestion => label.cyan(),
        Severity::Info => label.dimmed(),
    }
}

fn print_issue(issue: &ValidationIssue) {
    let location = issue.line.map(|l| format!(" (line {})", l)).unwrap_or_default();
    println!(
        "  {} {}{} {}",
        severity_label(issue.severity),
        issue.message,
        location,
        format!("[{}]", issue.source).dimmed()
    );
}

fn print_report(report: &Report, quiet: bool) {
    for result in &report.results {
        if result.issues().next().is_none() {
            continue;
        }
        let status = if result.passed { "ok".green() } else { "FAIL".red().bold() };
        println!("{} {} {}", status, result.file.bold(), format!("({})", result.doc_type).dimmed());
        for issue in result.issues() {
            print_issue(issue);
        }
        println!();
    }

    if quiet {
        return;
    }

    let s = &report.summary;
    println!("{}", "Lint Summary".green().bold());
    println!("  Files checked:    {}", s.total_files.to_string().cyan());
    println!("  Files failed:     {}", s.failed_files.to_string().cyan());
    println!("  Errors:           {}", s.total_errors.to_string().cyan());
    println!("  Warnings:         {}", s.total_warnings.to_string().cyan());
    println!("  Suggestions:      {}", s.total_suggestions.to_string().cyan());
    if let Some(filter) = &report.baseline {
        println!(
            "  Baseline ignored: {} ({} errors, {} suggestions)",
            filter.total_ignored.to_string().cyan(),
            filter.errors_ignored,
            filter.suggestions_ignored
        );
    }
}

fn cmd_baseline(
    config: &Config,
    output: Option<&Path>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let cache = corpus(config)?;
    let documents = cache.get()?;

    let results = Pipeline::new(&config.root).run(&documents, None);
    let issues = Pipeline::collect_issues(&results);
    let baseline = Baseline::create(&issues);

    let path = output.map(Path::to_path_buf).unwrap_or_else(|| config.baseline_path());
    baseline.save(&path)?;

    if !quiet {
        println!(
            "{} {} ({} issues, {} fingerprints)",
            "Baseline written to".green(),
            path.display().to_string().cyan(),
            issues.len(),
            baseline.len()
        );
    }
    Ok(())
}

fn cmd_graph(config: &Config, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let cache = corpus(config)?;
    let documents = cache.get()?;
    let graph = ImportGraph::from_documents(&documents);
    let cycles = graph.detect_cycles();
    let root = config.root.as_path();

    if json {
        let edges: BTreeMap<String, Vec<String>> = graph
            .files()
            .map(|f| {
                let targets = graph.imports_of(f).iter().map(|t| display_path(t, root)).collect();
                (display_path(f, root), targets)
            })
            .collect();
        let chains: Vec<Vec<String>> = cycles
            .iter()
            .map(|c| c.nodes.iter().map(|n| display_path(n, root)).collect())
            .collect();
        let out = serde_json::json!({ "edges": edges, "cycles": chains });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for file in graph.files() {
        let imports = graph.imports_of(file);
        if imports.is_empty() {
            continue;
        }
        println!("{}", display_path(file, root).bold());
        for target in imports {
            let marker = if target.exists() { "->".green() } else { "->".red() };
            println!("  {} {}", marker, display_path(target, root));
        }
    }

    println!();
    println!("{}", "Import Graph".green().bold());
    println!("  Files:            {}", documents.len().to_string().cyan());
    println!("  Import edges:     {}", graph.edge_count().to_string().cyan());
    println!("  Cycles:           {}", cycles.len().to_string().cyan());
    for cycle in &cycles {
        println!("  {} {}", "cycle".red().bold(), cycle.chain(root));
    }
    Ok(())
}
