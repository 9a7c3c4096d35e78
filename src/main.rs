use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use scripref::canon::BOOKS;
use scripref::engine::Engine;
use scripref::errors::{Result, ScripRefError};
use scripref::import::download_bible_json;
use scripref::plan::{audit_plan, parse_plan_content};
use scripref::reference::{classify, split_references, validate_reference};
use scripref::resolution::CancelToken;

/// Scripture reference parsing, validation, and lookup.
#[derive(Parser)]
#[command(name = "scripref", about = "Scripture reference parsing, validation, and lookup")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a verse store
    Init {
        /// Deployment path (default: current directory)
        path: Option<String>,
    },
    /// Import a Bible JSON document into the store
    Import {
        /// Bible JSON file
        file: Option<PathBuf>,
        /// Download the Bible JSON from this URL instead
        #[arg(short, long, conflicts_with = "file")]
        url: Option<String>,
        /// Deployment path
        #[arg(short, long)]
        path: Option<String>,
        /// Re-import even if the source is unchanged
        #[arg(short, long)]
        force: bool,
    },
    /// Look up the text of one or more references
    Lookup {
        /// References, e.g. "John 3:16" or "Matthew 5:1-7:29"
        #[arg(required = true)]
        references: Vec<String>,
        /// Deployment path
        #[arg(short, long)]
        path: Option<String>,
        /// Give up after this many milliseconds
        #[arg(short, long)]
        timeout_ms: Option<u64>,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
    /// Show the canonical segments a reference splits into
    Split {
        /// Reference to split
        reference: String,
    },
    /// Validate one or more references
    Validate {
        /// References to validate
        #[arg(required = true)]
        references: Vec<String>,
    },
    /// Audit the references in a reading-plan JSON file
    Audit {
        /// Plan JSON file (`{"daily_verses": [...]}`)
        file: PathBuf,
    },
    /// List the canonical books and their aliases
    Books,
    /// Show store statistics
    Status {
        /// Deployment path (default: current directory)
        path: Option<String>,
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "scripref=info".into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Runs a command and returns the process exit code.
fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Init { path } => {
            let root = resolve_path(path);
            Engine::init(&root)?;
            println!("Initialized verse store at {}", root.display());
        }
        Commands::Import {
            file,
            url,
            path,
            force,
        } => {
            let root = resolve_path(path);
            let engine = Engine::open(&root)?;
            let summary = match (file, url) {
                (_, Some(url)) => {
                    let json = download_bible_json(&url)?;
                    engine.import_json(&json, force)?
                }
                (Some(file), None) => engine.import_file(&file, force)?,
                (None, None) => {
                    return Err(ScripRefError::Import {
                        message: "either a file or --url is required".to_string(),
                    });
                }
            };
            if summary.unchanged {
                println!("Source unchanged since last import; nothing to do (use --force to re-import)");
            } else {
                println!(
                    "Imported {} books, {} chapters, {} verses ({} skipped) in {}ms",
                    summary.books, summary.chapters, summary.verses, summary.skipped, summary.duration_ms
                );
            }
        }
        Commands::Lookup {
            references,
            path,
            timeout_ms,
            json,
        } => {
            let root = resolve_path(path);
            let engine = Engine::open(&root)?;
            let cancel = match timeout_ms {
                Some(ms) => CancelToken::with_timeout(Duration::from_millis(ms)),
                None => CancelToken::new(),
            };
            let texts = engine.get_verses_by_references(&references, &cancel)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&texts)?);
            } else {
                for reference in &references {
                    match texts.get(reference) {
                        Some(text) => println!("{}\n{}\n", reference, text),
                        None => println!("{}\n  (not found)\n", reference),
                    }
                }
            }
            if texts.len() < references.len() {
                return Ok(2);
            }
        }
        Commands::Split { reference } => {
            for piece in reference.split(',').map(str::trim).filter(|p| !p.is_empty()) {
                let rule = classify(piece).map(|r| r.as_str()).unwrap_or("unrecognized");
                println!("{} [{}]", piece, rule);
                for segment in split_references(piece) {
                    match segment.as_canonical() {
                        Some(_) => println!("  {}", segment),
                        None => println!("  {} (passed through)", segment),
                    }
                }
            }
        }
        Commands::Validate { references } => {
            let mut failures = 0;
            for reference in &references {
                match validate_reference(reference) {
                    Ok(()) => println!("ok      {}", reference),
                    Err(invalid) => {
                        failures += 1;
                        println!("invalid {}: {}", reference, invalid);
                    }
                }
            }
            if failures > 0 {
                return Ok(2);
            }
        }
        Commands::Audit { file } => {
            let raw = std::fs::read_to_string(&file)?;
            let readings = parse_plan_content(&raw)?;
            let audit = audit_plan(&readings);
            if audit.is_clean() {
                println!("All {} readings have valid references", readings.len());
            } else {
                print!("{}", audit.feedback());
                return Ok(2);
            }
        }
        Commands::Books => {
            for book in BOOKS.iter() {
                if book.aliases.is_empty() {
                    println!("{:>2}  {}", book.ordinal, book.name);
                } else {
                    println!("{:>2}  {} ({})", book.ordinal, book.name, book.aliases.join(", "));
                }
            }
        }
        Commands::Status { path, json } => {
            let root = resolve_path(path);
            let engine = Engine::open(&root)?;
            let stats = engine.stats()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Verse Store Status");
                println!("  Verses:   {}", stats.verse_count);
                println!("  Books:    {}", stats.book_count);
                println!("  Chapters: {}", stats.chapter_count);
                println!("  Scheme:   {}", engine.config().id_scheme.as_str());
                if !stats.translations.is_empty() {
                    println!("  Translations: {}", stats.translations.join(", "));
                }
                println!("  DB Size:  {} bytes", stats.db_size_bytes);
            }
        }
    }
    Ok(0)
}

/// Resolves an optional path argument to a `PathBuf`.
///
/// Defaults to the current working directory if no path is provided.
fn resolve_path(path: Option<String>) -> PathBuf {
    match path {
        Some(p) => PathBuf::from(p),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
