use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use editmatch::differ::DEFAULT_CONTEXT_LINES;
use editmatch::normalize::normalize_to_lf;
use editmatch::{
    edit_file, find_edit_match, generate_diff_string, unified_diff, EditOptions, MatchOptions,
    MatchOutcome, NormalizedText, DEFAULT_FUZZY_THRESHOLD,
};
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Find and replace text blocks in files, tolerating whitespace drift")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace a unique block of text in a file
    Edit {
        /// The file to edit
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        old: OldText,

        /// Replacement text
        #[arg(long, conflicts_with = "new_file", required_unless_present = "new_file")]
        new: Option<String>,

        /// Read the replacement text from a file
        #[arg(long)]
        new_file: Option<PathBuf>,

        #[command(flatten)]
        matching: MatchArgs,

        /// Number of context lines in the printed diff
        #[arg(short, long, default_value_t = DEFAULT_CONTEXT_LINES)]
        context: usize,

        /// Print the diff without writing the file
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Print a unified diff instead of the numbered one
        #[arg(short, long, default_value_t = false)]
        unified: bool,
    },

    /// Report where a block of text matches in a file
    Find {
        /// The file to search
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        old: OldText,

        #[command(flatten)]
        matching: MatchArgs,
    },

    /// Show the line diff between two files
    Diff {
        /// The original file
        #[arg(short = 'i', long)]
        old: PathBuf,

        /// The new file
        #[arg(short, long)]
        new: PathBuf,

        /// Number of context lines to include
        #[arg(short, long, default_value_t = DEFAULT_CONTEXT_LINES)]
        context: usize,

        /// Print a unified diff instead of the numbered one
        #[arg(short, long, default_value_t = false)]
        unified: bool,
    },
}

#[derive(Args)]
struct OldText {
    /// Text to find
    #[arg(long, conflicts_with = "old_file", required_unless_present = "old_file")]
    old: Option<String>,

    /// Read the text to find from a file
    #[arg(long)]
    old_file: Option<PathBuf>,
}

#[derive(Args)]
struct MatchArgs {
    /// Only accept exact matches
    #[arg(long, default_value_t = false)]
    no_fuzzy: bool,

    /// Minimum similarity for a fuzzy match, between 0 and 1
    #[arg(short, long, default_value_t = DEFAULT_FUZZY_THRESHOLD)]
    threshold: f64,

    /// Skip fuzzy matching for files larger than this many bytes (0 = no limit)
    #[arg(long)]
    fuzzy_limit: Option<usize>,
}

impl OldText {
    fn resolve(self) -> Result<String> {
        read_text_arg(self.old, self.old_file)
    }
}

impl MatchArgs {
    fn options(&self) -> MatchOptions {
        let mut options = MatchOptions::default()
            .allow_fuzzy(!self.no_fuzzy)
            .similarity_threshold(self.threshold);
        if let Some(limit) = self.fuzzy_limit {
            options = options.fuzzy_content_limit((limit > 0).then_some(limit));
        }
        options
    }
}

fn read_text_arg(inline: Option<String>, file: Option<PathBuf>) -> Result<String> {
    match (inline, file) {
        (Some(text), _) => Ok(text),
        (None, Some(path)) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display())),
        (None, None) => anyhow::bail!("no text given"),
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Edit {
            file,
            old,
            new,
            new_file,
            matching,
            context,
            dry_run,
            unified,
        } => {
            let old_text = old.resolve()?;
            let new_text = read_text_arg(new, new_file)?;
            let options = EditOptions::default()
                .match_options(matching.options())
                .context_lines(context)
                .dry_run(dry_run);

            let result = edit_file(&file, &old_text, &new_text, &options)?;
            let path = file.display().to_string();

            if unified {
                print!("{}", result.unified(&path, context));
            } else {
                println!("{}", result.diff);
            }
            if dry_run {
                println!("\nDry run: {} was not modified.", path);
            } else {
                println!("\n{}", result.summary(&path));
            }
        }

        Commands::Find {
            file,
            old,
            matching,
        } => {
            let old_text = old.resolve()?;
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let source = NormalizedText::new(&raw);
            let needle = normalize_to_lf(&old_text);

            match find_edit_match(&source.text, &needle, &matching.options()) {
                MatchOutcome::Unique(candidate) => {
                    println!(
                        "Match at line {} (offset {}, {:.0}% similar):",
                        candidate.line,
                        candidate.start_index,
                        candidate.similarity * 100.0
                    );
                    println!("{}", candidate.actual_text);
                }
                MatchOutcome::Ambiguous { occurrences, fuzzy } => {
                    anyhow::bail!(
                        "{} {} found in {}, add more context",
                        occurrences,
                        if fuzzy { "equally close matches" } else { "occurrences" },
                        file.display()
                    );
                }
                MatchOutcome::NotFound {
                    closest,
                    fuzzy_matches,
                    fuzzy_skipped,
                } => {
                    if fuzzy_skipped {
                        eprintln!("Fuzzy matching skipped: file is too large to scan for this text");
                    }
                    for candidate in &fuzzy_matches {
                        eprintln!(
                            "  candidate at line {} ({:.0}% similar)",
                            candidate.line,
                            candidate.similarity * 100.0
                        );
                    }
                    match closest {
                        Some(candidate) => anyhow::bail!(
                            "no match in {}, closest at line {} ({:.0}% similar):\n{}",
                            file.display(),
                            candidate.line,
                            candidate.similarity * 100.0,
                            candidate.actual_text
                        ),
                        None => anyhow::bail!("no match in {}", file.display()),
                    }
                }
            }
        }

        Commands::Diff {
            old,
            new,
            context,
            unified,
        } => {
            let old_content = NormalizedText::new(&fs::read_to_string(&old)?).text;
            let new_content = NormalizedText::new(&fs::read_to_string(&new)?).text;

            if unified {
                let path = new
                    .file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or("modified");
                print!("{}", unified_diff(&old_content, &new_content, path, context));
            } else {
                let result = generate_diff_string(&old_content, &new_content, context);
                match result.first_changed_line {
                    Some(line) => {
                        println!("{}", result.diff);
                        println!("\nFirst change at line {}", line);
                    }
                    None => println!("Files are identical"),
                }
            }
        }
    }

    Ok(())
}
