use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use vidfetch::cli::{parse_request_line, Cli, Commands, CookiesAction};
use vidfetch::core::utils::format_size;
use vidfetch::core::{config, init_logger, log_cookies_configuration};
use vidfetch::download::source::ProviderRegistry;
use vidfetch::download::ytdlp::check_ytdlp_version;
use vidfetch::download::{classify, DownloadRequest, DownloadResult, ResolutionEngine, ResolutionPool};
use vidfetch::storage::cookies::{summarize_jar, CredentialStore, FileCredentialStore};
use vidfetch::storage::ScratchDir;

/// Main entry point
///
/// Parses CLI arguments and dispatches to the matching subcommand.
///
/// # Errors
/// Returns an error if initialization fails (logging, HTTP client, scratch dir).
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Log panics instead of losing them on stderr of a worker thread
    std::panic::set_hook(Box::new(|panic_info| {
        log::error!("Panic caught: {:?}", panic_info);
        if let Some(location) = panic_info.location() {
            log::error!("Panic at {}:{}:{}", location.file(), location.line(), location.column());
        }
    }));

    // Load environment variables from .env if present
    let _ = dotenv();

    init_logger(&config::LOG_FILE_PATH)?;

    match cli.command {
        Some(Commands::Run { keep }) => run_resolver(keep).await,
        None => run_resolver(false).await,
        Some(Commands::Download { text, user, discard }) => run_cli_download(text, user, discard).await,
        Some(Commands::Classify { url }) => run_classify(url),
        Some(Commands::Cookies { action }) => run_cookies(action).await,
        Some(Commands::Sweep { max_age_mins }) => run_sweep(max_age_mins).await,
        Some(Commands::CheckYtdlp) => {
            let version = check_ytdlp_version(&config::CONFIG.ytdl_bin).await?;
            println!("yt-dlp {}", version);
            Ok(())
        }
    }
}

fn build_engine() -> Result<Arc<ResolutionEngine>> {
    let cfg = &*config::CONFIG;
    log_cookies_configuration(cfg);
    log::info!(
        "Scratch dir: {} | max file size: {} | workers: {}",
        cfg.scratch_dir.display(),
        format_size(cfg.max_file_size),
        cfg.worker_pool_size
    );
    let engine = ResolutionEngine::from_config(cfg).map_err(|e| anyhow::anyhow!("Failed to build engine: {}", e))?;
    Ok(Arc::new(engine))
}

fn report(source_url: &str, result: &DownloadResult) {
    match result {
        Ok(media) => println!(
            "✅ {} -> {} | {} | {} | {}",
            source_url,
            media.local_file_path.display(),
            media.title,
            media.uploader,
            format_size(media.file_size)
        ),
        Err(failure) => {
            log::warn!("Resolution failed for {}: {}", source_url, failure);
            println!("{} ({})", failure.user_message(), failure.reason);
        }
    }
}

/// Long-running mode: stdin lines in, one resolution per line on the pool.
///
/// Delivered files are released right after they are reported unless `keep` is set.
async fn run_resolver(keep: bool) -> Result<()> {
    let engine = build_engine()?;
    let pool = Arc::new(ResolutionPool::new(engine.clone(), config::CONFIG.worker_pool_size));
    log::info!("🚀 Resolver ready, reading links from stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reporters = JoinSet::new();

    loop {
        while let Some(done) = reporters.try_join_next() {
            if let Err(e) = done {
                log::error!("Reporter task failed: {}", e);
            }
        }

        let line = tokio::select! {
            _ = signal::ctrl_c() => {
                log::info!("Received Ctrl+C");
                pool.shutdown();
                break;
            }
            line = lines.next_line() => line?,
        };

        let Some(line) = line else { break };
        let Some(request) = parse_request_line(&line) else {
            if !line.trim().is_empty() {
                log::warn!("No link found in input line");
            }
            continue;
        };

        let source_url = request.source_url.clone();
        let handle = pool.dispatch(request);
        let engine = engine.clone();
        reporters.spawn(async move {
            let result = handle.join().await;
            report(&source_url, &result);
            match &result {
                Ok(media) if !keep => {
                    engine.scratch().release(&media.local_file_path).await;
                }
                _ => {}
            }
        });
    }

    while let Some(done) = reporters.join_next().await {
        if let Err(e) = done {
            log::error!("Reporter task failed: {}", e);
        }
    }
    log::info!("Resolver stopped");
    Ok(())
}

async fn run_cli_download(text: String, user: Option<i64>, discard: bool) -> Result<()> {
    let request = DownloadRequest::from_text(&text, user).ok_or_else(|| anyhow::anyhow!("No link found in input"))?;
    let engine = build_engine()?;

    let cancel = CancellationToken::new();
    let ctrl_c_cancel = cancel.clone();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            ctrl_c_cancel.cancel();
        }
    });

    let result = engine.resolve(&request, &cancel).await;
    report(&request.source_url, &result);

    match result {
        Ok(media) => {
            if discard {
                engine.scratch().release(&media.local_file_path).await;
            }
            Ok(())
        }
        Err(failure) => Err(anyhow::anyhow!("{}", failure)),
    }
}

fn run_classify(url: String) -> Result<()> {
    let platform = classify(&url);
    println!("Platform: {}", platform.display_name());

    let registry = ProviderRegistry::default_registry(&config::CONFIG)?;
    let chain: Vec<&str> = registry.providers_for(platform).iter().map(|p| p.id()).collect();
    if chain.is_empty() {
        println!("Providers: none (unsupported link)");
    } else {
        println!("Providers: {}", chain.join(" → "));
    }
    Ok(())
}

async fn run_cookies(action: CookiesAction) -> Result<()> {
    let store = FileCredentialStore::new(&config::CONFIG.cookies_dir);

    match action {
        CookiesAction::Set { user, path } => {
            let record = store.put_from_file(user, &config::expand_path(&path)).await?;
            println!("✅ Cookies stored for user {} at {}", user, record.cookie_jar_path.display());
        }
        CookiesAction::SetBase64 { user, data } => {
            let record = store.put_base64(user, &data).await?;
            println!("✅ Cookies stored for user {} at {}", user, record.cookie_jar_path.display());
        }
        CookiesAction::Delete { user } => {
            if store.delete(user).await? {
                println!("🗑 Cookies deleted for user {}", user);
            } else {
                println!("No cookies stored for user {}", user);
            }
        }
        CookiesAction::Show { user } => match store.get(user).await {
            Some(record) => {
                let content = tokio::fs::read_to_string(&record.cookie_jar_path).await?;
                let summary = summarize_jar(&content);
                println!("🍪 User {} (updated {})", user, record.last_updated_at.to_rfc3339());
                println!("   Cookies: {} total, {} youtube", summary.total_cookies, summary.youtube_cookies);
                if !summary.auth_cookies_missing.is_empty() {
                    println!("   Missing auth cookies: {}", summary.auth_cookies_missing.join(", "));
                }
                if !summary.auth_cookies_expired.is_empty() {
                    println!("   Expired auth cookies: {}", summary.auth_cookies_expired.join(", "));
                }
            }
            None => println!("No cookies stored for user {}", user),
        },
    }
    Ok(())
}

async fn run_sweep(max_age_mins: u64) -> Result<()> {
    let scratch = ScratchDir::new(&config::CONFIG.scratch_dir);
    let removed = scratch.sweep_stale(Duration::from_secs(max_age_mins.saturating_mul(60))).await?;
    println!("🧹 Removed {} stale file(s) from {}", removed, scratch.root().display());
    Ok(())
}
