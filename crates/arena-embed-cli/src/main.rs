use arena_embed::{
    ArenaGateway, EmbedProcessor, FileStore, HttpGateway, Notifier, RenderStatus, RenderTarget,
    Settings, Template,
};
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand, ValueEnum};

mod fences;
mod telemetry;

#[derive(Parser)]
#[command(version, about = "Render are.na blocks and channels embedded in markdown", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to settings file (.toml or .json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// are.na access token, overrides the saved one
    #[arg(long, global = true, env = "ARENA_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace every `arena` block in a markdown document with rendered HTML
    Render {
        /// Markdown document to read
        input: PathBuf,

        /// Write the result here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Render the body of a single `arena` block
    Line {
        /// One or more lines (URLs or `random:personal`)
        #[arg(required = true)]
        lines: Vec<String>,
    },
    /// Print a prefilled `arena` block
    Insert { kind: TemplateKind },
    /// Show or change saved settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the current settings, token masked
    Show,
    /// Set one setting and save
    Set { key: String, value: String },
    /// Reset all settings to defaults
    Clear,
}

#[derive(Clone, Copy, ValueEnum)]
enum TemplateKind {
    Block,
    Channel,
    Random,
}

impl From<TemplateKind> for Template {
    fn from(kind: TemplateKind) -> Self {
        match kind {
            TemplateKind::Block => Template::Block,
            TemplateKind::Channel => Template::Channel,
            TemplateKind::Random => Template::RandomPersonal,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();
    telemetry::init_tracing();

    let cli = Cli::parse();
    let store = FileStore::new(cli.config.unwrap_or_else(default_settings_path));

    match cli.command {
        Commands::Render { input, output } => {
            let settings = load_settings(&store, cli.token).await?;
            render_document(input, output, settings).await?;
        }
        Commands::Line { lines } => {
            let settings = load_settings(&store, cli.token).await?;
            let processor = EmbedProcessor::new(HttpGateway::new(), settings);
            let (status, html) = render_block(&processor, &lines.join("\n")).await;
            println!("{html}");
            ensure_loaded(&[status])?;
        }
        Commands::Insert { kind } => {
            print!("{}", Template::from(kind).render());
        }
        Commands::Config { action } => {
            config_command(&store, action).await?;
        }
    }

    Ok(())
}

fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("arena-embed"))
        .unwrap_or_else(|| PathBuf::from(".arena-embed"))
        .join("settings.toml")
}

async fn load_settings(store: &FileStore, token: Option<String>) -> Result<Arc<Settings>> {
    let mut settings = Settings::load(store).await?;
    if let Some(token) = token {
        settings.arena_access_token = token;
    }
    tracing::debug!(path = %store.path().display(), "loaded settings");
    Ok(Arc::new(settings))
}

async fn render_block<G: ArenaGateway, N: Notifier>(
    processor: &EmbedProcessor<G, N>,
    source: &str,
) -> (RenderStatus, String) {
    let target = RenderTarget::new();
    let status = processor.process(source, &target).await;
    let html = target.to_html();
    target.detach();
    (status, html)
}

async fn render_document(
    input: PathBuf,
    output: Option<PathBuf>,
    settings: Arc<Settings>,
) -> Result<()> {
    if !input.exists() {
        return Err(miette::miette!("Input file not found: {}", input.display()));
    }
    let document = tokio::fs::read_to_string(&input).await.into_diagnostic()?;
    let fences = fences::find_arena_fences(&document)?;
    if fences.is_empty() {
        tracing::info!(input = %input.display(), "no arena blocks found");
    }

    let start = Instant::now();
    let processor = EmbedProcessor::new(HttpGateway::new(), settings);
    let results =
        n0_future::join_all(fences.iter().map(|f| render_block(&processor, &f.source))).await;

    let (statuses, rendered): (Vec<RenderStatus>, Vec<String>) = results.into_iter().unzip();
    let document = fences::splice(&document, &fences, &rendered);

    match output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                tokio::fs::create_dir_all(parent).await.into_diagnostic()?;
            }
            tokio::fs::write(&path, document).await.into_diagnostic()?;
            println!("✓ Wrote {}", path.display());
        }
        None => print!("{document}"),
    }

    tracing::info!(
        blocks = fences.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "rendered document"
    );
    ensure_loaded(&statuses)
}

/// Fails when any block had a line that didn't load, so the exit code shows it
fn ensure_loaded(statuses: &[RenderStatus]) -> Result<()> {
    let failed = statuses
        .iter()
        .filter(|status| **status == RenderStatus::Error)
        .count();
    if failed > 0 {
        miette::bail!(
            "{failed} of {} arena blocks had lines that failed to load",
            statuses.len()
        );
    }
    Ok(())
}

async fn config_command(store: &FileStore, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let settings = Settings::load(store).await?.masked();
            println!("# {}", store.path().display());
            println!("arena_access_token = {:?}", settings.arena_access_token);
            println!("notification_header = {:?}", settings.notification_header);
            println!("enable_channel_block = {}", settings.enable_channel_block);
            println!("length_max = {:?}", settings.length_max);
            println!("user_slug = {:?}", settings.user_slug);
        }
        ConfigAction::Set { key, value } => {
            let mut settings = Settings::load(store).await?;
            settings.set(&key, &value)?;
            settings.save(store).await?;
            println!("✓ Saved {key}");
        }
        ConfigAction::Clear => {
            Settings::default().save(store).await?;
            println!("✓ Settings have been cleared.");
        }
    }
    Ok(())
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
