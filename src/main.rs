use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;

use flowcanvas::config::EditorConfig;
use flowcanvas::editor::{BlockCatalog, EditorContext, EditorState};
use flowcanvas::script::{load_script, run};

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a block-diagram editing script and print the resulting diagram as JSON", long_about = None)]
struct Cli {
    /// JSON array of editor commands
    #[arg(value_name = "SCRIPT")]
    script: Utf8PathBuf,

    /// Editor configuration file (JSON)
    #[arg(long)]
    config: Option<Utf8PathBuf>,

    /// Block catalog file (JSON); the built-in catalog is used otherwise
    #[arg(long)]
    catalog: Option<Utf8PathBuf>,

    /// Log every edit to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let catalog = match &cli.catalog {
        Some(path) => BlockCatalog::load(path)?,
        None => BlockCatalog::builtin(),
    };
    let commands = load_script(&cli.script)?;

    let canvas = std::rc::Rc::new(config.clone());
    let mut state = EditorState::new(EditorContext::new(config, catalog, canvas));
    let report = run(&mut state, &commands);

    let json = serde_json::to_string_pretty(&report).context("Serialize report")?;
    println!("{}", json);
    Ok(())
}
