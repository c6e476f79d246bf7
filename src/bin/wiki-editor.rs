use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::debug;
use wiki_editor::{
    Command, ContentBackend, ContentKey, Document, Editor, EditorConfig, FileStore, RenderMode,
    Renderer, SequentialIds, VersionHistory,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Editor settings file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Renders a document to HTML
    Render {
        document: PathBuf,
        #[arg(long)]
        read_only: bool,
    },
    /// Checks a document for structural problems
    Check {
        document: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Applies a list of commands to a document and prints the result
    Replay {
        document: PathBuf,
        commands: PathBuf,
        /// Print the operation log instead of the document
        #[arg(long)]
        operations: bool,
    },
    /// Stores a document as the draft of a section
    Save {
        #[command(flatten)]
        target: Target,
        document: PathBuf,
    },
    /// Publishes the stored draft as a new version
    Publish {
        #[command(flatten)]
        target: Target,
    },
    /// Makes a published version the draft again
    Restore {
        #[command(flatten)]
        target: Target,
        version_id: String,
    },
    /// Lists published versions, newest first
    History {
        #[command(flatten)]
        target: Target,
        #[arg(long)]
        json: bool,
    },
    /// Lists stored sections
    Entries {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct Target {
    #[arg(long)]
    store: PathBuf,
    #[arg(long)]
    site: String,
    #[arg(long)]
    entry: String,
    #[arg(long, default_value = wiki_editor::autosave::DEFAULT_SECTION)]
    section: String,
}

impl Target {
    fn key(&self) -> ContentKey {
        ContentKey::new(&self.site, &self.entry, &self.section)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport {
    blocks: usize,
    missing_ids: usize,
    duplicate_ids: Vec<String>,
    extensions: Vec<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VersionSummary {
    id: String,
    updated_at: String,
    author_id: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => EditorConfig::load(path).unwrap_or_else(|err| fail(err)),
        None => EditorConfig::default(),
    };

    match &cli.command {
        Commands::Render {
            document,
            read_only,
        } => render_command(document, *read_only, &config),
        Commands::Check { document, json } => check_command(document, *json),
        Commands::Replay {
            document,
            commands,
            operations,
        } => replay_command(document, commands, *operations),
        Commands::Save { target, document } => save_command(target, document, &config),
        Commands::Publish { target } => publish_command(target, &config),
        Commands::Restore { target, version_id } => restore_command(target, version_id, &config),
        Commands::History { target, json } => history_command(target, *json, &config),
        Commands::Entries { store, json } => entries_command(store, *json),
    }
}

fn fail(err: impl Display) -> ! {
    eprintln!("Error: {err}");
    process::exit(1);
}

fn load_document(path: &Path) -> Document {
    let raw = fs::read_to_string(path).unwrap_or_else(|err| fail(format!("{}: {err}", path.display())));
    Document::from_json(&raw).unwrap_or_else(|err| fail(format!("{}: {err}", path.display())))
}

fn open_store(root: &Path, config: &EditorConfig) -> FileStore {
    FileStore::open(root)
        .unwrap_or_else(|err| fail(err))
        .with_max_versions(config.max_versions)
}

fn print_json(value: &impl Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(out) => println!("{out}"),
        Err(err) => fail(err),
    }
}

fn render_command(path: &Path, read_only: bool, config: &EditorConfig) {
    let document = load_document(path);
    let mode = if read_only {
        RenderMode::ReadOnly
    } else {
        RenderMode::Editable
    };
    let caret = document.start_point(&[0]);
    let mut renderer = Renderer::new(mode);
    if let Some(caret) = &caret {
        renderer = renderer.with_placeholder(&config.placeholder, caret);
    }
    println!("{}", renderer.render_document(&document));
}

fn check_command(path: &Path, json: bool) {
    let document = load_document(path);
    let extensions = document
        .extension_tags()
        .into_iter()
        .map(str::to_string)
        .collect();
    let report = CheckReport {
        blocks: document.len(),
        missing_ids: document.missing_ids(),
        duplicate_ids: document
            .duplicate_ids()
            .into_iter()
            .map(|id| id.to_string())
            .collect(),
        extensions,
    };
    let ok = report.duplicate_ids.is_empty();

    if json {
        print_json(&report);
    } else {
        println!("{} blocks, {} without id", report.blocks, report.missing_ids);
        for id in &report.duplicate_ids {
            println!("Duplicate id: {id}");
        }
        for tag in &report.extensions {
            println!("Custom block: {tag}");
        }
    }
    if !ok {
        process::exit(1);
    }
}

fn replay_command(document: &Path, commands: &Path, operations: bool) {
    let start = load_document(document);
    let raw = fs::read_to_string(commands).unwrap_or_else(|err| fail(format!("{}: {err}", commands.display())));
    let commands: Vec<Command> = serde_json::from_str(&raw).unwrap_or_else(|err| fail(err));

    let mut editor = Editor::with_id_source(start, SequentialIds::new());
    for (index, command) in commands.iter().enumerate() {
        debug!(index, command = command.name(), "replaying");
        if let Err(err) = editor.execute(command) {
            fail(format!("command {index} ({}): {err}", command.name()));
        }
    }
    if operations {
        print_json(&editor.take_operations());
    } else {
        print_json(editor.document());
    }
}

fn save_command(target: &Target, document: &Path, config: &EditorConfig) {
    let content = load_document(document);
    let mut store = open_store(&target.store, config);
    let key = target.key();
    if let Err(err) = store.update_content(&key, &content) {
        fail(err);
    }
    println!("Saved draft for {key}");
}

fn publish_command(target: &Target, config: &EditorConfig) {
    let mut store = open_store(&target.store, config);
    let key = target.key();
    match store.publish(&key) {
        Ok(version) => println!("Published {key} as version {}", version.id),
        Err(err) => fail(err),
    }
}

fn restore_command(target: &Target, version_id: &str, config: &EditorConfig) {
    let store = open_store(&target.store, config);
    let key = target.key();
    match store.restore_version(&key, version_id) {
        Ok(_) => println!("Restored {key} to version {version_id}"),
        Err(err) => fail(err),
    }
}

fn history_command(target: &Target, json: bool, config: &EditorConfig) {
    let store = open_store(&target.store, config);
    let key = target.key();
    let versions = store.versions(&key).unwrap_or_else(|err| fail(err));
    let draft = store.draft(&key).unwrap_or_else(|err| fail(err));
    let history = VersionHistory::from_versions(versions, config.max_versions);
    let changed = draft.is_some_and(|draft| history.has_changed(&draft));
    let versions: Vec<_> = history.iter().collect();

    if json {
        let summaries: Vec<VersionSummary> = versions
            .iter()
            .map(|version| VersionSummary {
                id: version.id.clone(),
                updated_at: version.updated_at.to_rfc3339(),
                author_id: version.author_id.clone(),
            })
            .collect();
        print_json(&serde_json::json!({
            "versions": summaries,
            "changed": changed,
        }));
        return;
    }
    if versions.is_empty() {
        println!("No published versions for {key}");
    }
    for (index, version) in versions.iter().enumerate() {
        let marker = if index == 0 { " (live)" } else { "" };
        println!("{} {}{marker}", version.updated_at.to_rfc3339(), version.id);
    }
    if changed {
        println!("Draft has unpublished changes.");
    }
}

fn entries_command(store: &Path, json: bool) {
    let store = FileStore::open(store).unwrap_or_else(|err| fail(err));
    let keys = store.entries().unwrap_or_else(|err| fail(err));
    if json {
        print_json(&serde_json::json!({ "entries": keys }));
        return;
    }
    for key in keys {
        println!("{key}");
    }
}
