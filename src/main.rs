use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result};

use fixpulse_core::{DatasetFormat, FirstFixTime, FixPulseConfig, HistorySource};
use fixpulse_dataset::builder::{BuildReport, DatasetBuilder};
use fixpulse_dataset::group::GroupAggregator;
use fixpulse_dataset::schema::{AttributeType, Label};
use fixpulse_mining::fixes::FixClassifier;
use fixpulse_mining::index::HistoryIndex;
use fixpulse_mining::mining::{mine_history, MiningOptions};

#[derive(Parser)]
#[command(
    name = "fixpulse",
    version,
    about = "Mine git history into fix-cycle feature datasets",
    long_about = "fixpulse walks a repository's history, splits each file's versions into\n\
                   chunks that end at bug-fix commits, and emits one feature vector per\n\
                   chunk prefix describing the commits leading up to the fix.\n\n\
                   Examples:\n  \
                     fixpulse build --repo .                   Write an ARFF dataset to stdout\n  \
                     fixpulse build --format csv -o data.csv   Write CSV to a file\n  \
                     fixpulse schema                           Show the dataset attributes\n  \
                     fixpulse init                             Create a .fixpulse.toml"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to configuration file (default: .fixpulse.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    verbose: bool,

    /// When to use colors
    #[arg(long, global = true, default_value = "auto")]
    color: ColorChoice,
}

#[derive(Subcommand)]
enum Command {
    /// Build a fix-cycle dataset from git history
    #[command(long_about = "Build a fix-cycle dataset from git history.\n\n\
        Mines every commit reachable from HEAD (or --branch), classifies bug-fix\n\
        commits by message keywords, and aggregates group features for each\n\
        prefix of every fix-delimited chunk. Failures are reported per file and\n\
        never stop the build.\n\n\
        Examples:\n  fixpulse build --repo . > dataset.arff\n  \
        fixpulse build --format jsonl --jobs 4 --output rows.jsonl\n  \
        fixpulse build --first-fix-time entity --fixed-only")]
    Build {
        /// Repository path (default: current directory)
        #[arg(long, default_value = ".")]
        repo: PathBuf,

        /// Output file, or `-` for stdout (default: stdout)
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Dataset format: arff, csv or jsonl
        #[arg(long)]
        format: Option<DatasetFormat>,

        /// Worker threads (default: one per CPU)
        #[arg(long, short)]
        jobs: Option<usize>,

        /// Reference time for each file's first chunk
        #[arg(
            long,
            long_help = "Reference time for each file's first chunk.\n\n\
                Policies:\n  \
                  repository  Earliest commit in the repository (default)\n  \
                  entity      The file's own first version\n  \
                  epoch       Unix epoch (0)"
        )]
        first_fix_time: Option<FirstFixTime>,

        /// Branch to walk instead of HEAD
        #[arg(long)]
        branch: Option<String>,

        /// Only emit rows for chunks that end in a fix
        #[arg(long)]
        fixed_only: bool,

        /// ARFF relation name
        #[arg(long)]
        relation: Option<String>,
    },
    /// Print the dataset attribute schema
    Schema {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create a default .fixpulse.toml configuration file
    #[command(long_about = "Create a default .fixpulse.toml configuration file.\n\n\
        Generates a commented-out template with all available options.\n\
        Fails if .fixpulse.toml already exists.")]
    Init,
    /// Generate shell completion scripts
    #[command(hide = true)]
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Clone, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    /// Auto-detect based on terminal
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

fn print_welcome(use_color: bool) {
    let version = env!("CARGO_PKG_VERSION");

    if use_color {
        println!("\x1b[1mfixpulse\x1b[0m v{version}: fix-cycle datasets from git history\n");
        println!("Quick start:");
        println!("  \x1b[36mfixpulse init\x1b[0m                 Create a .fixpulse.toml config file");
        println!("  \x1b[36mfixpulse build --repo .\x1b[0m       Build an ARFF dataset\n");
        println!("All commands:");
        println!("  \x1b[32mbuild\x1b[0m     Mine history and write the dataset");
        println!("  \x1b[32mschema\x1b[0m    Show the dataset attributes");
        println!("  \x1b[32minit\x1b[0m      Create a default configuration file");
    } else {
        println!("fixpulse v{version}: fix-cycle datasets from git history\n");
        println!("Quick start:");
        println!("  fixpulse init                 Create a .fixpulse.toml config file");
        println!("  fixpulse build --repo .       Build an ARFF dataset\n");
        println!("All commands:");
        println!("  build     Mine history and write the dataset");
        println!("  schema    Show the dataset attributes");
        println!("  init      Create a default configuration file");
    }
    println!("\nRun 'fixpulse <command> --help' for details.");
}

fn spinner(message: &str) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new_spinner();
    if let Ok(style) = indicatif::ProgressStyle::with_template("{spinner:.cyan} {msg} ({elapsed})")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    Some(pb)
}

fn entity_bar(len: usize) -> Option<indicatif::ProgressBar> {
    if !std::io::stderr().is_terminal() {
        return None;
    }
    let pb = indicatif::ProgressBar::new(len as u64);
    if let Ok(style) = indicatif::ProgressStyle::with_template(
        "{spinner:.cyan} Aggregating [{bar:30.cyan/blue}] {pos}/{len} files ({elapsed})",
    ) {
        pb.set_style(style.progress_chars("=> "));
    }
    Some(pb)
}

fn format_day(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| secs.to_string())
}

fn print_summary(report: &BuildReport, use_color: bool) {
    let fixed = report.dataset.count_label(Label::Fixed);
    let unfixed = report.dataset.count_label(Label::Unfixed);
    eprintln!(
        "Wrote {} rows ({} fixed, {} unfixed) from {} chunks across {} files.",
        report.dataset.len(),
        fixed,
        unfixed,
        report.chunks,
        report.entities,
    );

    if !report.has_failures() {
        return;
    }
    let header = format!(
        "{} failures in {} aggregation:",
        report.failures.len(),
        report.processor
    );
    if use_color {
        eprintln!("\x1b[33m{header}\x1b[0m");
    } else {
        eprintln!("{header}");
    }
    for failure in &report.failures {
        match failure.chunk {
            Some(chunk) => eprintln!("  {} (chunk {}): {}", failure.entity, chunk, failure.error),
            None => eprintln!("  {}: {}", failure.entity, failure.error),
        }
    }
}

fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) if path != Path::new("-") => {
            std::fs::write(path, content).into_diagnostic()?;
        }
        _ => print!("{content}"),
    }
    Ok(())
}

const DEFAULT_CONFIG: &str = r#"# fixpulse configuration

[mining]
# branch = "main"
# extensions = ["java"]
# max_files_per_commit = 200

[fixes]
# keywords = ["fix", "fixes", "fixed", "bug", "bugfix", "defect", "fault", "issue"]
# ignore_merges = true

[dataset]
# format = "arff"            # arff | csv | jsonl
# first_fix_time = "repository"  # repository | entity | epoch
# include_unfixed = true
# relation = "fixpulse"
"#;

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .build(),
        )
    }))
    .expect("miette handler");
    human_panic::setup_panic!();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => FixPulseConfig::from_file(path)?,
        None => {
            let default_path = Path::new(".fixpulse.toml");
            if default_path.exists() {
                FixPulseConfig::from_file(default_path)?
            } else {
                FixPulseConfig::default()
            }
        }
    };

    let use_color = match cli.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => {
            std::io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err()
        }
    };

    match cli.command {
        None => {
            print_welcome(use_color);
        }
        Some(Command::Build {
            ref repo,
            ref output,
            format,
            jobs,
            first_fix_time,
            ref branch,
            fixed_only,
            ref relation,
        }) => {
            let workdir = match git2::Repository::discover(repo) {
                Ok(r) => r
                    .workdir()
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| repo.clone()),
                Err(_) => {
                    miette::bail!(miette::miette!(
                        help = "Run fixpulse from inside a git repository, or specify --repo",
                        "Not a git repository: {}",
                        repo.display()
                    ));
                }
            };

            let mut options = MiningOptions::from(&config.mining);
            if branch.is_some() {
                options.branch.clone_from(branch);
            }
            let format = format.unwrap_or(config.dataset.format);
            let first_fix_time = first_fix_time.unwrap_or(config.dataset.first_fix_time);
            let include_unfixed = config.dataset.include_unfixed && !fixed_only;
            let relation = relation.as_deref().unwrap_or(&config.dataset.relation);

            if cli.verbose {
                eprintln!("format: {format}");
                eprintln!("first fix time: {first_fix_time}");
                eprintln!("extensions: {}", options.extensions.join(", "));
                eprintln!("fix keywords: {}", config.fixes.keywords.join(", "));
            }

            eprintln!("Mining git history at {}...", workdir.display());
            let pb = spinner("Mining history...");
            let history = mine_history(&workdir, &options).inspect_err(|_| {
                if let Some(pb) = &pb {
                    pb.finish_with_message("Failed");
                }
            })?;
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }

            let classifier = FixClassifier::new(&config.fixes);
            let index = HistoryIndex::build(&history, &classifier);
            eprintln!(
                "Analyzed {} commits ({} fixes, {} authors).",
                index.commit_count(),
                index.fix_count(),
                index.author_count(),
            );
            if cli.verbose {
                if history.skipped_commits > 0 {
                    eprintln!(
                        "Skipped {} bulk commits touching more than {} files.",
                        history.skipped_commits, options.max_files_per_commit
                    );
                }
                if let Some((first, last)) = index.time_span() {
                    eprintln!("History spans {} to {}.", format_day(first), format_day(last));
                }
            }

            let builder = DatasetBuilder::new(GroupAggregator)
                .first_fix_time(first_fix_time)
                .include_unfixed(include_unfixed);

            let pb = entity_bar(index.entities().len());
            let run = || {
                builder.build_with_progress(&index, |_| {
                    if let Some(pb) = &pb {
                        pb.inc(1);
                    }
                })
            };
            let report = match jobs {
                Some(n) => rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .into_diagnostic()?
                    .install(run),
                None => run(),
            };
            if let Some(pb) = pb {
                pb.finish_and_clear();
            }

            let rendered = fixpulse_dataset::output::format_dataset(
                &report.dataset,
                format,
                relation,
            )?;
            write_output(output.as_deref(), &rendered)?;
            print_summary(&report, use_color);

            if report.dataset.is_empty() && report.has_failures() {
                miette::bail!(miette::miette!(
                    help = "Run with --verbose to see the mining settings",
                    "No rows could be aggregated; {} failures",
                    report.failures.len()
                ));
            }
        }
        Some(Command::Schema { json }) => {
            let builder = DatasetBuilder::new(GroupAggregator);
            let schema = builder.schema();
            if json {
                println!("{}", serde_json::to_string_pretty(schema).into_diagnostic()?);
            } else {
                for attribute in schema.columns() {
                    let kind = match &attribute.kind {
                        AttributeType::Numeric => "numeric".to_string(),
                        AttributeType::Nominal(values) => format!("{{{}}}", values.join(",")),
                    };
                    println!("{:<20} {kind}", attribute.name);
                }
            }
        }
        Some(Command::Init) => {
            let path = Path::new(".fixpulse.toml");
            if path.exists() {
                miette::bail!(".fixpulse.toml already exists");
            }
            std::fs::write(path, DEFAULT_CONFIG).into_diagnostic()?;
            println!("Created .fixpulse.toml with default configuration");
        }
        Some(Command::Completions { shell }) => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "fixpulse", &mut std::io::stdout());
        }
    }

    Ok(())
}
