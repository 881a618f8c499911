use anyhow::{Context as AnyhowContext, Result};
use clap::{Args, Parser, Subcommand};
use discovery_context::{
    extract_keywords, CitationVerifier, ContextBuilder, DiscoveryConfig,
};
use discovery_graph::ManifestParser;
use discovery_indexer::FileIndex;
use discovery_search::{GrepEngine, GrepMatch, SearchMeta, TestMapper};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "repo-discovery")]
#[command(about = "Ground planning in facts read from the local repository", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Repository root
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// TOML config file (DISCOVERY_* environment variables override it)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for output)
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the discovery report for keywords and/or free text
    Context(ContextArgs),

    /// Search indexed files for one or more regular expressions
    Grep(GrepArgs),

    /// Show the module graph parsed from build manifests
    Modules(ModulesArgs),

    /// Map source files to their conventional test files
    Tests(TestsArgs),

    /// Resolve a bare file name to a unique indexed path
    Find(FindArgs),

    /// Check `Source: path:lines` citations in markdown against the files on disk
    Verify(VerifyArgs),
}

#[derive(Args)]
struct ContextArgs {
    /// Free text to extract keywords from (ticket, plan, question)
    #[arg(long)]
    text: Option<String>,

    /// Explicit keyword (repeatable)
    #[arg(long = "keyword", short = 'k')]
    keywords: Vec<String>,

    /// Markdown character budget (defaults to the configured budget)
    #[arg(long)]
    budget: Option<usize>,

    /// Emit the report as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct GrepArgs {
    /// Patterns; more than one runs a single-pass batch search
    #[arg(required = true)]
    patterns: Vec<String>,

    /// Case-insensitive matching
    #[arg(short = 'i', long)]
    ignore_case: bool,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ModulesArgs {
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct TestsArgs {
    /// Repository-relative source paths
    #[arg(required = true)]
    sources: Vec<String>,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct FindArgs {
    /// File name (or path; only its last component is used)
    filename: String,
}

#[derive(Args)]
struct VerifyArgs {
    /// Markdown file to check; `-` or omitted reads stdin
    input: Option<PathBuf>,

    /// Emit the per-citation checks as JSON instead of the annotated text
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct GrepOutput<'a> {
    pattern: &'a str,
    matches: &'a [GrepMatch],
    #[serde(skip_serializing_if = "Option::is_none")]
    meta: Option<&'a SearchMeta>,
}

fn main() -> Result<ExitCode> {
    let mut cli = Cli::parse();

    let json_output = match &cli.command {
        Commands::Context(args) => args.json,
        Commands::Grep(args) => args.json,
        Commands::Modules(args) => args.json,
        Commands::Tests(args) => args.json,
        Commands::Verify(args) => args.json,
        Commands::Find(_) => false,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let config = load_config(cli.config.as_deref())?;
    let root = cli.root;

    match cli.command {
        Commands::Context(args) => run_context(&root, config, args)?,
        Commands::Grep(args) => run_grep(&root, &config, args)?,
        Commands::Modules(args) => run_modules(&root, args)?,
        Commands::Tests(args) => run_tests(&root, &config, args)?,
        Commands::Find(args) => return run_find(&root, &config, args),
        Commands::Verify(args) => run_verify(&root, &config, args)?,
    }

    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&Path>) -> Result<DiscoveryConfig> {
    let config = match path {
        Some(path) => DiscoveryConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => DiscoveryConfig::default(),
    };
    Ok(config.with_env_overrides())
}

fn build_index(root: &Path, config: &DiscoveryConfig) -> Result<FileIndex> {
    let index = FileIndex::build_with_source(root, config.max_files, config.listing)
        .context("Invalid repository root")?;
    log::info!("Indexed {} files under {}", index.file_count(), index.root().display());
    Ok(index)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run_context(root: &Path, config: DiscoveryConfig, args: ContextArgs) -> Result<()> {
    let mut keywords = args.keywords;
    if let Some(text) = &args.text {
        keywords.extend(extract_keywords(text, config.max_keywords));
    }
    let budget = args.budget.unwrap_or(config.markdown_budget);

    let report = ContextBuilder::with_config(root, config).build(&keywords, None);

    if args.json {
        print_json(&report)
    } else {
        print!("{}", report.to_markdown(budget));
        Ok(())
    }
}

fn run_grep(root: &Path, config: &DiscoveryConfig, args: GrepArgs) -> Result<()> {
    let index = build_index(root, config)?;
    let mut grep = GrepEngine::new(
        index.root(),
        index.paths().to_vec(),
        config.grep.to_options(),
    );

    if let [pattern] = args.patterns.as_slice() {
        let (matches, meta) = grep.search_with_meta(pattern, args.ignore_case);
        if args.json {
            return print_json(&GrepOutput {
                pattern,
                matches: &matches,
                meta: Some(&meta),
            });
        }
        print_matches(&matches);
        print_meta(&meta);
        return Ok(());
    }

    let batch = grep.search_batch_with_meta(&args.patterns, args.ignore_case);
    if args.json {
        return print_json(&batch);
    }
    for entry in &batch.results {
        println!("== {} ({} matches)", entry.pattern, entry.matches.len());
        print_matches(&entry.matches);
    }
    print_meta(&batch.meta);
    Ok(())
}

fn print_matches(matches: &[GrepMatch]) {
    for hit in matches {
        println!("{}:{}: {}", hit.file, hit.line_number, hit.line);
    }
}

fn print_meta(meta: &SearchMeta) {
    if meta.was_truncated {
        log::warn!(
            "Search truncated ({}) after {} of {} files",
            meta.truncation_reason.as_str(),
            meta.files_searched,
            meta.files_total
        );
    }
}

fn run_modules(root: &Path, args: ModulesArgs) -> Result<()> {
    let graph = ManifestParser::new(root).parse();
    if args.json {
        return print_json(&graph);
    }

    println!("{} ({} modules)", graph.project_type, graph.modules.len());
    for module in &graph.modules {
        println!("  {} [{}]", module.name, module.manifest_path());
        for dep in graph.dependencies_of(&module.name) {
            println!("    -> {dep}");
        }
    }
    Ok(())
}

fn run_tests(root: &Path, config: &DiscoveryConfig, args: TestsArgs) -> Result<()> {
    let index = build_index(root, config)?;
    let mapping = TestMapper::new(&index).map_all(&args.sources);
    if args.json {
        return print_json(&mapping);
    }

    for source in &args.sources {
        match mapping.get(source) {
            Some(tests) => {
                println!("{source}");
                for test in tests {
                    println!("  {test}");
                }
            }
            None => println!("{source}\n  (no tests found)"),
        }
    }
    Ok(())
}

fn run_find(root: &Path, config: &DiscoveryConfig, args: FindArgs) -> Result<ExitCode> {
    let index = build_index(root, config)?;
    match index.fuzzy_find(&args.filename) {
        Some(path) => {
            println!("{path}");
            Ok(ExitCode::SUCCESS)
        }
        None => {
            log::warn!("No unique match for '{}'", args.filename);
            Ok(ExitCode::FAILURE)
        }
    }
}

fn run_verify(root: &Path, config: &DiscoveryConfig, args: VerifyArgs) -> Result<()> {
    let text = match args.input.as_deref() {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        _ => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };

    let verifier =
        CitationVerifier::new(root).with_overlap_threshold(config.citations.overlap_threshold);
    let report = verifier.verify_citations(&text);

    if args.json {
        return print_json(&report.checks);
    }
    print!("{}", report.text);
    log::info!(
        "{} of {} citations verified",
        report.verified_count(),
        report.checks.len()
    );
    Ok(())
}
