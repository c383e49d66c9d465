//! pine-lint CLI
//!
//! Lints charting scripts and applies automatic fixes.

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;
use glob::glob;
use pine_lint::config::{ColorMode, Config, OutputFormat};
use pine_lint::output::{FileReport, JsonFormatter, LintRun, OutputFormatter, TextFormatter};
use pine_lint::Analyzer;
use rayon::prelude::*;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Exit code for configuration and I/O failures
const EXIT_FAILURE: i32 = 3;

#[derive(Parser)]
#[command(
    name = "pine-lint",
    version,
    about = "Static analyzer for Pine-style charting scripts",
    long_about = "Reports syntax, logic, performance, security and style issues in charting scripts, \
                  scores their performance and applies automatic fixes."
)]
struct Cli {
    /// Files or glob patterns to lint (`-` reads stdin)
    files: Vec<String>,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    format: Format,

    /// Apply automatic fixes for these diagnostic codes (comma-separated)
    #[arg(long, value_delimiter = ',')]
    fix: Option<Vec<String>>,

    /// Write fixes back to the files instead of printing the fixed source
    #[arg(long, requires = "fix")]
    write: bool,

    /// Disable rules by id or diagnostic code (comma-separated)
    #[arg(long, value_delimiter = ',')]
    disable: Option<Vec<String>>,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// List active rules and exit
    #[arg(long)]
    list_rules: bool,

    /// Explain a rule by id or diagnostic code and exit
    #[arg(long, value_name = "RULE")]
    explain: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

/// One input read into memory
struct Input {
    path: String,
    source: String,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(filter)).init();

    match run(cli) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{}: {:#}", "error".red().bold(), e);
            std::process::exit(EXIT_FAILURE);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => Config::load_default().context("Failed to load config")?,
    };

    let format = match cli.format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
    };
    config.merge_cli(Some(format), Some(cli.verbose), cli.disable.clone(), cli.no_color);

    match config.output.color {
        ColorMode::Never => colored::control::set_override(false),
        ColorMode::Always => colored::control::set_override(true),
        ColorMode::Auto => {}
    }

    let output = config.output.clone();
    let analyzer = Analyzer::new(config).context("Invalid analyzer configuration")?;

    if cli.list_rules {
        list_rules(&analyzer);
        return Ok(0);
    }
    if let Some(rule) = &cli.explain {
        return explain(&analyzer, rule);
    }

    let inputs = read_inputs(&cli.files)?;
    if output.verbose {
        eprintln!(
            "Analyzing {} {} with {} rules",
            inputs.len(),
            if inputs.len() == 1 { "file" } else { "files" },
            analyzer.rules().count()
        );
    }

    let inputs = match &cli.fix {
        Some(codes) => {
            let codes: Vec<&str> = codes.iter().map(|c| c.trim()).collect();
            if !cli.write {
                print_fixed(&analyzer, &inputs, &codes);
                return Ok(0);
            }
            write_fixes(&analyzer, inputs, &codes)?
        }
        None => inputs,
    };

    let start = Instant::now();
    let files: Vec<FileReport> = inputs
        .par_iter()
        .map(|input| FileReport::new(&input.path, &input.source, analyzer.validate(&input.source)))
        .collect();
    let run = LintRun {
        files,
        duration: start.elapsed(),
    };

    let formatter: Box<dyn OutputFormatter> = match output.format {
        OutputFormat::Text => Box::new(TextFormatter::new()),
        OutputFormat::Json => Box::new(JsonFormatter::new().pretty()),
    };
    print!("{}", formatter.format(&run));
    if output.format == OutputFormat::Json {
        println!();
    }

    Ok(run.exit_code())
}

/// Expand file arguments: `-` is stdin, existing paths are read as-is, anything else is a glob
fn read_inputs(patterns: &[String]) -> Result<Vec<Input>> {
    let default = ["**/*.pine".to_string()];
    let patterns = if patterns.is_empty() { &default[..] } else { patterns };

    let mut inputs = Vec::new();
    for pattern in patterns {
        if pattern == "-" {
            let mut source = String::new();
            std::io::stdin()
                .read_to_string(&mut source)
                .context("Failed to read stdin")?;
            inputs.push(Input {
                path: "-".to_string(),
                source,
            });
            continue;
        }

        let paths: Vec<PathBuf> = if Path::new(pattern).is_file() {
            vec![PathBuf::from(pattern)]
        } else {
            glob(pattern)
                .with_context(|| format!("Invalid glob pattern '{}'", pattern))?
                .filter_map(|entry| match entry {
                    Ok(path) if path.is_file() => Some(path),
                    Ok(_) => None,
                    Err(e) => {
                        log::warn!("skipping unreadable path: {}", e);
                        None
                    }
                })
                .collect()
        };

        if paths.is_empty() {
            bail!("No files match '{}'", pattern);
        }
        for path in paths {
            let source = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            inputs.push(Input {
                path: path.display().to_string(),
                source,
            });
        }
    }

    Ok(inputs)
}

fn print_fixed(analyzer: &Analyzer, inputs: &[Input], codes: &[&str]) {
    for input in inputs {
        if inputs.len() > 1 {
            eprintln!("{}", input.path.underline());
        }
        print!("{}", analyzer.auto_fix(&input.source, codes));
    }
}

/// Fix files in place and return the fixed inputs for reporting
fn write_fixes(analyzer: &Analyzer, inputs: Vec<Input>, codes: &[&str]) -> Result<Vec<Input>> {
    let mut fixed = Vec::with_capacity(inputs.len());

    for input in inputs {
        let result = analyzer.fix(&input.source, codes);
        for code in &result.ignored {
            eprintln!("{}: no automatic fix for {}", "warning".yellow(), code);
        }
        if result.changed() && input.path != "-" {
            std::fs::write(&input.path, &result.content)
                .with_context(|| format!("Failed to write {}", input.path))?;
            eprintln!("{} {} ({})", "Fixed".green(), input.path, result.applied.join(", "));
        }
        fixed.push(Input {
            path: input.path,
            source: result.content,
        });
    }

    Ok(fixed)
}

fn list_rules(analyzer: &Analyzer) {
    for rule in analyzer.rules() {
        println!(
            "{} {:<26} {:<12} {}",
            format!("{:<28}", rule.id).cyan(),
            rule.code,
            rule.category.to_string(),
            rule.severity
        );
    }
}

fn explain(analyzer: &Analyzer, query: &str) -> Result<i32> {
    let matches: Vec<_> = analyzer
        .rules()
        .filter(|r| r.id == query || r.code == query)
        .collect();
    if matches.is_empty() {
        bail!("Unknown rule '{}'", query);
    }

    for rule in matches {
        println!("{} ({})", rule.id.cyan().bold(), rule.code);
        if !rule.name.is_empty() {
            println!("  {}", rule.name);
        }
        println!("  category: {}, severity: {}", rule.category, rule.severity);
        println!("  pattern:  {}", rule.pattern);
        println!("  message:  {}", rule.message);
        if let Some(suggestion) = &rule.suggestion {
            println!("  help:     {}", suggestion);
        }
        if let Some(fix) = &rule.fix {
            println!("  fix:      {}", fix.title);
        }
    }
    Ok(0)
}
