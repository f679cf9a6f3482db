use clap::{Parser, Subcommand};
use pageforge::routes::link_list;
use pageforge::validator::validate_site;
use pageforge::{
    CachedStore, ComponentTable, EngineConfig, HttpFetcher, JsonDirStore, MemoryCache, PageEngine,
    PageStore, PageTree, PreviewSession, RandomIds, RenderError, RenderResult, RequestContext,
    RouteTable, SiteData, DEFAULT_PAGE,
};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Render JSON-described sites to HTML
#[derive(Parser, Debug)]
#[command(name = "pageforge")]
#[command(about = "Render JSON-described, component-based pages to HTML", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render one page of a tenant's site
    Render(RenderArgs),
    /// Check site files for invalid elements, styles and imports
    Validate {
        #[arg(value_name = "FILES", required = true)]
        files: Vec<PathBuf>,
    },
}

#[derive(clap::Args, Debug)]
struct RenderArgs {
    /// Site domain; data is read from `{sites_dir}/{tenant}.json`
    #[arg(value_name = "TENANT")]
    tenant: String,

    /// Page to render (defaults to the home page)
    #[arg(long, default_value = DEFAULT_PAGE)]
    page: String,

    /// Tag elements with pids and inject the editor bootstrap
    #[arg(long)]
    preview: bool,

    /// Generate a CSP nonce for <style> and <script> output
    #[arg(long)]
    nonce: bool,

    /// YAML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Overrides `sites_dir` from the configuration
    #[arg(long, value_name = "DIR")]
    sites_dir: Option<PathBuf>,

    /// Write HTML here instead of stdout
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

fn main() -> ExitCode {
    init_logging();
    let args = Args::parse();

    match args.command {
        Command::Render(options) => match render(options) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("error: {}", e);
                ExitCode::FAILURE
            }
        },
        Command::Validate { files } => validate(&files),
    }
}

/// Logs go to stderr so rendered HTML on stdout stays clean.
///
/// ```bash
/// PAGEFORGE_LOG=debug pageforge render example.com
/// ```
fn init_logging() {
    let env_filter = EnvFilter::try_from_env("PAGEFORGE_LOG")
        .unwrap_or_else(|_| EnvFilter::new("pageforge=info,warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(io::stderr).with_target(true))
        .init();
}

fn render(args: RenderArgs) -> RenderResult<()> {
    let mut config = match args.config {
        Some(ref path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if let Some(dir) = args.sites_dir {
        config.sites_dir = dir;
    }

    let store = CachedStore::new(JsonDirStore::new(&config.sites_dir), MemoryCache::new());
    let site = store.fetch(&args.tenant)?;
    validate_site(&site)?;
    let page = site.page(&args.page).ok_or_else(|| RenderError::PageNotFound {
        name: args.page.clone(),
    })?;

    let routes = site_routes(&site);
    let fetcher = HttpFetcher::from_config(&config.fetch)?;
    let request = RequestContext::default().with_tenant(args.tenant.clone());
    let nonce = args.nonce.then(pageforge::ids::nonce);
    if let Some(ref value) = nonce {
        tracing::info!(nonce = %value, "generated CSP nonce");
    }

    let mut writer: Box<dyn Write> = match args.out {
        Some(ref path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let mut components = ComponentTable::from_base(Arc::clone(&site.components));
    let mut ids = RandomIds::new();
    let mut engine = PageEngine::new(&mut components, &mut ids)
        .with_router(&routes)
        .with_fetcher(&fetcher)
        .with_request(&request)
        .with_options(config.render_options(nonce));

    if args.preview {
        let mut session = PreviewSession::new(page);
        session.render(&mut engine, &mut writer)?;
        tracing::info!(pids = session.pids().len(), "preview rendered");
    } else {
        let mut tree = PageTree::from_page(page);
        engine.render_page(&mut tree, None, &mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Internal routes available to every page of `site`
fn site_routes(site: &SiteData) -> RouteTable {
    let links: Vec<(String, String)> = site
        .page_names()
        .into_iter()
        .map(|name| {
            let href = if name == DEFAULT_PAGE {
                "/".to_string()
            } else {
                format!("/{}", name)
            };
            (name, href)
        })
        .collect();

    let mut routes = RouteTable::new();
    routes.register("/pages", move |_request| {
        Ok(link_list(links.iter().map(|(label, href)| (label.as_str(), href.as_str()))))
    });
    routes
}

fn validate(files: &[PathBuf]) -> ExitCode {
    let mut exit_code = ExitCode::SUCCESS;
    for path in files {
        match validate_file(path) {
            Ok(()) => println!("✓ {} is valid", path.display()),
            Err(e) => {
                eprintln!("✗ {} has errors:", path.display());
                eprintln!("  {}", e);
                exit_code = ExitCode::FAILURE;
            }
        }
    }
    exit_code
}

fn validate_file(path: &Path) -> RenderResult<()> {
    let content = fs::read_to_string(path)
        .map_err(|e| RenderError::ValidationError(format!("Failed to read file: {}", e)))?;
    let site = SiteData::from_json(&content)?;
    validate_site(&site)
}
