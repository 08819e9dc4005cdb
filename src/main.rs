use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use client_selection::api::{Album, SmugMugClient};
use client_selection::browser::{BrowserConfig, BrowserManager, SnapshotPage};
use client_selection::clock::SystemClock;
use client_selection::config::{self, Config, ConfigError, Credentials};
use client_selection::gallery::{GalleryScanner, ReviewerMatcher, ScanError, ScanOutcome};
use client_selection::models::{GalleryTarget, ScanResult};
use client_selection::report::{ReportKind, ReportWriter};

const LOG_CONFIG: &str = "log4rs.yml";
const GALLERY_PASSWORD_VAR: &str = "SMUGMUG_GALLERY_PASSWORD";
const PREVIEW_LEN: usize = 10;

type CliResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(
    name = "client-selection",
    version,
    about = "List the SmugMug images a client commented on"
)]
struct Cli {
    /// Config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory for reports and debug screenshots
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a gallery in headless Chrome
    Scrape {
        #[arg(long)]
        url: Option<String>,

        /// Gallery password (or set SMUGMUG_GALLERY_PASSWORD)
        #[arg(long)]
        password: Option<String>,

        /// Name used in the report
        #[arg(long)]
        label: Option<String>,

        /// Show the browser window
        #[arg(long)]
        headful: bool,
    },

    /// Scan an album through the REST API
    Api {
        /// Album key or name; prompts when omitted
        #[arg(long)]
        album: Option<String>,

        /// Only count comments written by the configured reviewer
        #[arg(long)]
        reviewer_only: bool,
    },

    /// Verify the API credentials
    Check,

    /// Run the comment and filename probes against a saved lightbox page
    Inspect {
        html: PathBuf,

        /// URL the page was saved from
        #[arg(long)]
        url: Option<String>,
    },
}

fn init_logging() {
    if Path::new(LOG_CONFIG).exists() {
        match log4rs::init_file(LOG_CONFIG, Default::default()) {
            Ok(()) => return,
            Err(e) => eprintln!("Failed to load {}: {}", LOG_CONFIG, e),
        }
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    config::load_dotenv();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => match Config::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::load(),
    };
    if let Some(dir) = cli.output_dir {
        config.output.dir = dir;
    }

    let result = match cli.command {
        Command::Scrape {
            url,
            password,
            label,
            headful,
        } => run_scrape(config, url, password, label, headful).await,
        Command::Api {
            album,
            reviewer_only,
        } => run_api(config, album, reviewer_only).await,
        Command::Check => run_check(config).await,
        Command::Inspect { html, url } => run_inspect(config, &html, url.as_deref()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            eprintln!("\nError: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run_scrape(
    config: Config,
    url: Option<String>,
    password: Option<String>,
    label: Option<String>,
    headful: bool,
) -> CliResult {
    let url = url
        .or_else(|| config.gallery.url.clone())
        .ok_or(ConfigError::MissingGalleryUrl)?;
    let password = password
        .or_else(|| std::env::var(GALLERY_PASSWORD_VAR).ok())
        .or_else(|| config.gallery.password.clone());
    let label = label
        .or_else(|| config.gallery.label.clone())
        .unwrap_or_else(|| label_from_url(&url));
    let target = GalleryTarget::new(url, password, label.clone());

    println!("SmugMug Web Scraper - Client Selection Tool");
    println!("{}", "=".repeat(50));
    println!("Gallery URL: {}", target.url);

    let mut browser_config = BrowserConfig::from_settings(&config.browser);
    if headful {
        browser_config.headless = false;
    }

    // headless_chrome blocks on every call
    let outcome = tokio::task::spawn_blocking(move || -> Result<ScanOutcome, ScanError> {
        let manager = BrowserManager::new(browser_config)?;
        let page = manager.new_page()?;
        GalleryScanner::new(&config).scan(&page, &SystemClock::new(), &target)
    })
    .await??;

    println!("Unique images found: {}", outcome.images_found);
    print_summary(&label, &outcome.results, &outcome.report_path);

    match outcome.error {
        Some(error) if !outcome.completed => Err(format!("scan stopped early: {}", error).into()),
        _ => Ok(()),
    }
}

async fn run_api(config: Config, album: Option<String>, reviewer_only: bool) -> CliResult {
    println!("SmugMug Client Selection Tool");
    println!("{}", "=".repeat(40));

    let credentials = Credentials::from_env()?;
    let client = SmugMugClient::new(&config.api, credentials)?;

    let albums = client.get_user_albums().await;
    if albums.is_empty() {
        println!("No albums found or unable to fetch albums");
        return Ok(());
    }

    let selected = match album {
        Some(wanted) => find_album(&albums, &wanted).ok_or_else(|| format!("No album matches {}", wanted))?,
        None => {
            list_albums(&albums);
            let stdin = io::stdin();
            &albums[choose_album(albums.len(), &mut stdin.lock())?]
        }
    };

    let reviewer = if reviewer_only || config.api.reviewer_only {
        Some(ReviewerMatcher::new(&config.reviewer.name, config.reviewer.match_mode)?)
    } else {
        None
    };

    let name = selected.display_name();
    let mut report = ReportWriter::create(
        &config.output.dir,
        name,
        selected.web_uri.as_deref(),
        ReportKind::Api,
    )?;
    let results = client
        .process_album_for_comments(selected, reviewer.as_ref(), &mut report)
        .await;
    let path = report.finalize()?;

    if results.is_empty() {
        println!("\nNo images with comments found in album: {}", name);
    }
    print_summary(name, &results, &path);
    Ok(())
}

async fn run_check(config: Config) -> CliResult {
    println!("Testing SmugMug API connection...");

    let credentials = Credentials::from_env()?;
    println!("✓ Credentials loaded successfully");

    let client = SmugMugClient::new(&config.api, credentials)?;
    let user = client.authenticated_user().await?;
    println!("✓ API connection successful!");
    println!("  Connected as: {}", user.name);
    Ok(())
}

fn run_inspect(config: Config, html: &Path, url: Option<&str>) -> CliResult {
    let page = SnapshotPage::from_file(html, url)?;
    let scanner = GalleryScanner::new(&config).with_scan_config(config.scan.without_delays());
    let inspection = scanner.inspect_page(&page, &SystemClock::new())?;

    println!("Comment selectors:");
    for (selector, count) in &inspection.comment_selector_counts {
        match count {
            Some(n) => println!("  {:>4}  {}", n, selector),
            None => println!("   err  {}", selector),
        }
    }

    println!("\nComments from {} ({}):", config.reviewer.name, inspection.comments.len());
    for comment in &inspection.comments {
        println!("  - [{}] {}", comment.source, comment.text);
    }

    println!(
        "\nFilename: {} (via {})",
        inspection.filename.name, inspection.filename.method
    );
    Ok(())
}

fn print_summary(label: &str, results: &[ScanResult], report_path: &Path) {
    println!("\nSUMMARY:");
    println!("Album: {}", label);
    println!("Images with comments: {}", results.len());
    println!("Output file: {}", report_path.display());

    if results.is_empty() {
        return;
    }

    println!("\nPreview of commented image filenames:");
    for result in results.iter().take(PREVIEW_LEN) {
        println!("  {}", result.filename);
    }
    if results.len() > PREVIEW_LEN {
        println!("  ... and {} more", results.len() - PREVIEW_LEN);
    }
}

/// Last path segment of the gallery URL
fn label_from_url(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
        })
        .unwrap_or_else(|| "gallery".to_string())
}

fn find_album<'a>(albums: &'a [Album], wanted: &str) -> Option<&'a Album> {
    albums
        .iter()
        .find(|a| a.album_key == wanted)
        .or_else(|| albums.iter().find(|a| a.display_name().eq_ignore_ascii_case(wanted)))
}

fn list_albums(albums: &[Album]) {
    println!("\nFound {} albums:", albums.len());
    println!("{}", "-".repeat(40));
    for (i, album) in albums.iter().enumerate() {
        println!("{:2}. {} ({} images)", i + 1, album.display_name(), album.image_count);
    }
}

/// Ask for a 1-based album number until a valid one is entered
fn choose_album(count: usize, input: &mut impl BufRead) -> io::Result<usize> {
    loop {
        print!("\nSelect album to process (1-{}): ", count);
        io::stdout().flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no album selected"));
        }

        match line.trim().parse::<usize>() {
            Ok(n) if (1..=count).contains(&n) => return Ok(n - 1),
            Ok(_) => println!("Please enter a number between 1 and {}", count),
            Err(_) => println!("Please enter a valid number"),
        }
    }
}
