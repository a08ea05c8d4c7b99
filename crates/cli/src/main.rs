#![deny(warnings)]

use anyhow::Context;
use clap::Parser;
use live_translator_core::config::{
    resolve_endpoint, resolve_optional_string, AppConfig, StdEnv, StorageLocation, TimingConfig,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SETTLE_MS, DEFAULT_SOURCE_LANG, DEFAULT_TARGET_LANG,
    DEFAULT_TYPING_MS, ENV_DATA_DIR,
};
use live_translator_core::coordinator::{self, CoordinatorHandle, Snapshot};
use live_translator_core::model::{Language, Theme};
use live_translator_core::store::{FileStore, KeyValueStore, MemoryStore};
use live_translator_core::translate::MyMemoryTranslator;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "live-translator")]
#[command(about = "Translate as you type, one line at a time (lines starting with ':' are commands)")]
struct Args {
    #[arg(long)]
    endpoint: Option<String>,

    #[arg(long)]
    data_dir: Option<String>,

    #[arg(long, conflicts_with = "data_dir")]
    ephemeral: bool,

    #[arg(long, default_value = DEFAULT_SOURCE_LANG)]
    source: String,

    #[arg(long, default_value = DEFAULT_TARGET_LANG)]
    target: String,

    #[arg(long, default_value_t = DEFAULT_SETTLE_MS)]
    settle_ms: u64,

    #[arg(long, default_value_t = DEFAULT_TYPING_MS)]
    typing_ms: u64,

    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    timeout_secs: u64,

    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level)?;

    let env = StdEnv;
    let cfg = build_config(args, &env)?;

    tracing::info!(
        endpoint = %cfg.endpoint,
        source = %cfg.source.value,
        target = %cfg.target.value,
        settle_ms = cfg.timing.settle_ms,
        typing_ms = cfg.timing.typing_ms,
        "config loaded"
    );

    run(cfg).await
}

async fn run(cfg: AppConfig) -> anyhow::Result<()> {
    let store: Arc<dyn KeyValueStore> = match &cfg.storage {
        StorageLocation::Memory => Arc::new(MemoryStore::new()),
        StorageLocation::Dir(dir) => Arc::new(
            FileStore::open(dir).with_context(|| format!("failed to open store in {}", dir.display()))?,
        ),
        StorageLocation::PlatformDefault => {
            Arc::new(FileStore::open_default().context("failed to open default store")?)
        }
    };
    let translator = MyMemoryTranslator::new(cfg.endpoint.clone(), cfg.request_timeout)
        .context("failed to build http client")?;

    let session = coordinator::Session::new(store, cfg.source, cfg.target, cfg.timing);
    let handle = coordinator::spawn(session, translator);
    let mut updates = handle.subscribe();
    let mut shown = handle.snapshot();
    print_header(&shown);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                if !dispatch(&handle, parse_line(&line))? {
                    break;
                }
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let snap = updates.borrow_and_update().clone();
                render(&shown, &snap);
                shown = snap;
            }
        }
    }

    handle.shutdown().await;
    Ok(())
}

/// What one line of stdin asks for.
#[derive(Debug, PartialEq, Eq)]
enum Line {
    Input(String),
    Swap,
    Source(String),
    Target(String),
    History,
    Select(String),
    Delete(String),
    Theme,
    Quit,
    Unknown(String),
}

fn parse_line(line: &str) -> Line {
    let Some(command) = line.strip_prefix(':') else {
        return Line::Input(line.to_owned());
    };
    let mut parts = command.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::to_owned);
    match (name, arg) {
        ("swap", None) => Line::Swap,
        ("source", Some(code)) => Line::Source(code),
        ("target", Some(code)) => Line::Target(code),
        ("history", None) => Line::History,
        ("select", Some(id)) => Line::Select(id),
        ("delete", Some(id)) => Line::Delete(id),
        ("theme", None) => Line::Theme,
        ("quit" | "q", None) => Line::Quit,
        _ => Line::Unknown(line.to_owned()),
    }
}

/// Returns false when the user asked to quit.
fn dispatch(handle: &CoordinatorHandle, line: Line) -> anyhow::Result<bool> {
    match line {
        Line::Input(text) => handle.input_changed(text)?,
        Line::Swap => handle.swap_languages()?,
        Line::Source(code) => match Language::from_code(&code) {
            Ok(lang) => handle.source_changed(lang)?,
            Err(e) => eprintln!("{e}"),
        },
        Line::Target(code) => match Language::from_code(&code) {
            Ok(lang) => handle.target_changed(lang)?,
            Err(e) => eprintln!("{e}"),
        },
        Line::History => print_history(&handle.snapshot()),
        Line::Select(id) => handle.select_history(id)?,
        Line::Delete(id) => handle.delete_history(id)?,
        Line::Theme => handle.toggle_theme()?,
        Line::Quit => return Ok(false),
        Line::Unknown(raw) => eprintln!(
            "unknown command: {raw} (try :swap, :source <code>, :target <code>, :history, :select <id>, :delete <id>, :theme, :quit)"
        ),
    }
    Ok(true)
}

fn print_header(snap: &Snapshot) {
    println!(
        "{} → {} ({} theme, {} saved)",
        snap.source.label,
        snap.target.label,
        theme_name(snap.theme),
        snap.history.len()
    );
}

fn render(prev: &Snapshot, next: &Snapshot) {
    if prev.source != next.source || prev.target != next.target || prev.theme != next.theme {
        print_header(next);
    }
    if next.loading && !prev.loading {
        println!("…");
    }
    if prev.translation != next.translation && !next.translation.is_empty() {
        println!("= {}", next.translation);
    }
}

fn print_history(snap: &Snapshot) {
    if snap.history.is_empty() {
        println!("(no history)");
        return;
    }
    for entry in &snap.history {
        println!(
            "[{}] {} → {}  ({} → {})",
            entry.id,
            entry.original_text,
            entry.translated_text,
            entry.source_lang.label,
            entry.target_lang.label
        );
    }
}

fn theme_name(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "light",
        Theme::Dark => "dark",
    }
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(
            level
                .parse()
                .with_context(|| format!("invalid --log-level: {level}"))?,
        )
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn build_config(
    args: Args,
    env: &impl live_translator_core::config::Env,
) -> anyhow::Result<AppConfig> {
    let endpoint = resolve_endpoint(args.endpoint, env)?;
    let timing = TimingConfig::new(args.settle_ms, args.typing_ms)?;
    let source = Language::from_code(&args.source)?;
    let target = Language::from_code(&args.target)?;

    let storage = if args.ephemeral {
        StorageLocation::Memory
    } else {
        match resolve_optional_string(args.data_dir, ENV_DATA_DIR, env) {
            Some(dir) => StorageLocation::Dir(PathBuf::from(dir)),
            None => StorageLocation::PlatformDefault,
        }
    };

    if args.timeout_secs == 0 {
        anyhow::bail!("--timeout-secs must be > 0");
    }

    Ok(AppConfig {
        endpoint,
        timing,
        source,
        target,
        storage,
        request_timeout: Duration::from_secs(args.timeout_secs),
    })
}
