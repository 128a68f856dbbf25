//! glossa CLI: SKOS thesaurus over a named-graph store.

use std::collections::BTreeSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use serde::Serialize;

use glossa::context::{ContextId, Iri};
use glossa::engine::{Thesaurus, ThesaurusConfig};
use glossa::identifier::IdentifierResolver;
use glossa::model::{MultilingualString, Term, TermInfo, Versioned, Vocabulary};
use glossa::paths::GlossaPaths;
use glossa::workspace::{WorkspaceConfig, WorkspaceManager, WorkspaceRegistry};

#[derive(Parser)]
#[command(name = "glossa", version, about = "SKOS thesaurus over a named-graph store")]
struct Cli {
    /// Root directory holding config, data and state (overrides XDG paths).
    #[arg(long, global = true)]
    home: Option<PathBuf>,

    /// Workspace whose registrations apply.
    #[arg(long, global = true, default_value = "default")]
    workspace: String,

    /// Display language (overrides the configured one).
    #[arg(long, global = true)]
    language: Option<String>,

    /// Print results as JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the glossa directories and the global configuration.
    Init,

    /// Show thesaurus info and statistics.
    Info,

    /// Manage vocabularies.
    Vocabulary {
        #[command(subcommand)]
        action: VocabularyAction,
    },

    /// Manage terms.
    Term {
        #[command(subcommand)]
        action: TermAction,
    },

    /// Manage workspaces and their working contexts.
    Workspace {
        #[command(subcommand)]
        action: WorkspaceAction,
    },

    /// List recently modified terms and vocabularies.
    Recent {
        #[arg(long, default_value = "10")]
        limit: usize,
    },
}

#[derive(Subcommand)]
enum VocabularyAction {
    /// List visible vocabularies.
    List,
    /// Show one vocabulary.
    Show { iri: String },
    /// Create a vocabulary.
    Create {
        iri: String,
        #[arg(long)]
        label: String,
        /// Imported vocabulary IRIs.
        #[arg(long = "import")]
        imports: Vec<String>,
    },
    /// Freeze the vocabulary and its terms as a snapshot.
    Snapshot { iri: String },
}

#[derive(Subcommand)]
enum TermAction {
    /// Root terms of a vocabulary with their sub-terms.
    Roots {
        vocabulary: String,
        /// Include roots of imported vocabularies.
        #[arg(long)]
        imports: bool,
        #[arg(long, default_value = "0")]
        offset: usize,
    },
    /// Show one term (or snapshot).
    Show { iri: String },
    /// Search terms by label.
    Search {
        text: String,
        #[arg(long)]
        vocabulary: Option<String>,
    },
    /// Create a term; its identifier is derived from the label.
    Create {
        vocabulary: String,
        label: String,
        #[arg(long = "parent")]
        parents: Vec<String>,
        #[arg(long)]
        definition: Option<String>,
    },
    /// Remove a term without sub-terms.
    Remove { iri: String },
    /// List snapshots of a term.
    Versions { iri: String },
    /// The version of a term valid at an RFC 3339 timestamp.
    AsOf { iri: String, at: String },
}

#[derive(Subcommand)]
enum WorkspaceAction {
    /// Show the registrations of the selected workspace.
    Show,
    /// List workspaces.
    List,
    /// Create an empty workspace.
    Create { name: String },
    /// Edit a vocabulary in a working context, seeding it from the canonical one.
    Register { vocabulary: String, context: String },
    /// Stop editing a vocabulary in the selected workspace.
    Clear { vocabulary: String },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let paths = match &cli.home {
        Some(root) => GlossaPaths::under(root),
        None => GlossaPaths::resolve()?,
    };
    let manager = WorkspaceManager::new(paths.clone());

    match cli.command {
        Commands::Init => {
            paths.ensure_dirs()?;
            let config_file = paths.global_config_file();
            if !config_file.exists() {
                let config = ThesaurusConfig {
                    data_dir: Some(paths.store_dir()),
                    ..Default::default()
                };
                let content = toml::to_string_pretty(&config).into_diagnostic()?;
                std::fs::write(&config_file, content).into_diagnostic()?;
            }
            let (thesaurus, _) = open(&paths, &manager, &cli.workspace, cli.language.as_deref())?;
            println!("Initialized glossa at {}", paths.data_dir.display());
            println!("{}", thesaurus.info()?);
        }

        Commands::Info => {
            let (thesaurus, _) = open(&paths, &manager, &cli.workspace, cli.language.as_deref())?;
            println!("{}", thesaurus.info()?);
        }

        Commands::Vocabulary { action } => {
            let (thesaurus, ws) = open(&paths, &manager, &cli.workspace, cli.language.as_deref())?;
            let scope = scope_for(&thesaurus, &ws);
            let lang = scope.language().to_string();
            let vocabularies = thesaurus.vocabularies();
            match action {
                VocabularyAction::List => {
                    let all = vocabularies.find_all(&scope)?;
                    if cli.json {
                        return print_json(&all);
                    }
                    if all.is_empty() {
                        println!("No vocabularies.");
                    }
                    for v in &all {
                        println!("  {}  {}", v.id, label(&v.label, &lang));
                    }
                }
                VocabularyAction::Show { iri } => {
                    let id = Iri::new(iri)?;
                    match vocabularies.lookup(&scope, &id)? {
                        Some(Versioned::Live(v)) => {
                            if cli.json {
                                return print_json(&v);
                            }
                            print_vocabulary(&v, &lang);
                        }
                        Some(Versioned::Snapshot(s)) => {
                            if cli.json {
                                return print_json(&s);
                            }
                            println!("{} (snapshot of {} at {})", s.id, s.version_of, s.created);
                        }
                        None => miette::bail!("vocabulary {id} not found"),
                    }
                }
                VocabularyAction::Create { iri, label: text, imports } => {
                    let mut vocabulary = Vocabulary::new(Iri::new(iri)?).with_label(&lang, &text);
                    for imported in imports {
                        vocabulary = vocabulary.with_import(&Iri::new(imported)?);
                    }
                    let created = vocabularies.persist(&scope, vocabulary)?;
                    println!("Created vocabulary {}", created.id);
                }
                VocabularyAction::Snapshot { iri } => {
                    let snapshot = vocabularies.create_snapshot(&scope, &Iri::new(iri)?, Utc::now())?;
                    println!("Created snapshot {}", snapshot.id);
                }
            }
        }

        Commands::Term { action } => {
            let (thesaurus, ws) = open(&paths, &manager, &cli.workspace, cli.language.as_deref())?;
            let scope = scope_for(&thesaurus, &ws);
            let lang = scope.language().to_string();
            let terms = thesaurus.terms();
            match action {
                TermAction::Roots { vocabulary, imports, offset } => {
                    let vocabulary = Iri::new(vocabulary)?;
                    let page = thesaurus.page(offset);
                    let roots = if imports {
                        terms.find_all_roots_including_imports(&scope, &vocabulary, page)?
                    } else {
                        terms.find_all_roots(&scope, &vocabulary, page)?
                    };
                    if cli.json {
                        return print_json(&roots);
                    }
                    for node in &roots {
                        println!("{}", info_line(&node.info, &lang));
                        for sub in &node.sub_terms {
                            println!("    {}", info_line(sub, &lang));
                        }
                    }
                }
                TermAction::Show { iri } => {
                    let id = Iri::new(iri)?;
                    match terms.lookup(&scope, &id)? {
                        Some(Versioned::Live(term)) => {
                            if cli.json {
                                return print_json(&term);
                            }
                            print_term(&term, &lang);
                        }
                        Some(Versioned::Snapshot(s)) => {
                            if cli.json {
                                return print_json(&s);
                            }
                            println!("{} (snapshot of {} at {})", s.id, s.version_of, s.created);
                            println!("  label: {}", label(&s.label, &lang));
                        }
                        None => miette::bail!("term {id} not found"),
                    }
                }
                TermAction::Search { text, vocabulary } => {
                    let vocabulary = vocabulary.map(Iri::new).transpose()?;
                    let found = terms.search(&scope, &text, vocabulary.as_ref())?;
                    if cli.json {
                        return print_json(&found);
                    }
                    for info in &found {
                        println!("{}", info_line(info, &lang));
                    }
                }
                TermAction::Create { vocabulary, label: text, parents, definition } => {
                    let vocabulary = Iri::new(vocabulary)?;
                    let taken: BTreeSet<Iri> = terms
                        .find_all(&scope, &vocabulary)?
                        .into_iter()
                        .map(|i| i.id)
                        .collect();
                    let id = IdentifierResolver::unique_term_identifier(&vocabulary, &text, |c| {
                        taken.contains(c)
                    })?;
                    let mut term = Term::new(id).with_label(&lang, &text);
                    if let Some(definition) = definition {
                        term = term.with_definition(&lang, &definition);
                    }
                    for parent in parents {
                        term = term.with_parent(&Iri::new(parent)?);
                    }
                    let created = terms.persist(&scope, term, &vocabulary)?;
                    println!("Created term {}", created.id);
                }
                TermAction::Remove { iri } => {
                    let id = Iri::new(iri)?;
                    terms.remove(&scope, &id)?;
                    println!("Removed term {id}");
                }
                TermAction::Versions { iri } => {
                    let snapshots = terms.find_snapshots(&Iri::new(iri)?)?;
                    if cli.json {
                        return print_json(&snapshots);
                    }
                    if snapshots.is_empty() {
                        println!("No snapshots.");
                    }
                    for s in &snapshots {
                        println!("  {}  {}  {}", s.created, s.id, label(&s.label, &lang));
                    }
                }
                TermAction::AsOf { iri, at } => {
                    let at: DateTime<Utc> = DateTime::parse_from_rfc3339(&at)
                        .into_diagnostic()?
                        .with_timezone(&Utc);
                    match terms.find_version_valid_at(&scope, &Iri::new(iri)?, at)? {
                        Some(Versioned::Live(term)) => print_term(&term, &lang),
                        Some(Versioned::Snapshot(s)) => {
                            println!("{} (snapshot created {})", s.id, s.created);
                            println!("  label: {}", label(&s.label, &lang));
                        }
                        None => println!("No version valid at {at}."),
                    }
                }
            }
        }

        Commands::Workspace { action } => match action {
            WorkspaceAction::Show => {
                let ws = manager.load(&cli.workspace)?;
                println!("workspace {} (language {})", ws.name, ws.language);
                if ws.editable.is_empty() {
                    println!("  no editable vocabularies");
                }
                for r in &ws.editable {
                    println!("  {} -> {}", r.vocabulary, r.context);
                }
            }
            WorkspaceAction::List => {
                for name in manager.list() {
                    println!("  {name}");
                }
            }
            WorkspaceAction::Create { name } => {
                let path = manager.create(WorkspaceConfig::with_name(&name))?;
                println!("Created workspace {name} at {}", path.display());
            }
            WorkspaceAction::Register { vocabulary, context } => {
                let (thesaurus, ws) = open(&paths, &manager, &cli.workspace, cli.language.as_deref())?;
                let vocabulary = Iri::new(vocabulary)?;
                let context = ContextId::parse(context)?;
                let copied = thesaurus.checkout(&vocabulary, &context)?;
                manager.save_registrations(&ws, thesaurus.registry())?;
                println!("Registered {vocabulary} -> {context} ({copied} statements copied)");
            }
            WorkspaceAction::Clear { vocabulary } => {
                let (thesaurus, ws) = open(&paths, &manager, &cli.workspace, cli.language.as_deref())?;
                let vocabulary = Iri::new(vocabulary)?;
                match thesaurus.release(&vocabulary) {
                    Some(context) => {
                        manager.save_registrations(&ws, thesaurus.registry())?;
                        println!("Cleared {vocabulary} (working context {context} kept)");
                    }
                    None => println!("{vocabulary} is not registered in {}", ws.name),
                }
            }
        },

        Commands::Recent { limit } => {
            let (thesaurus, ws) = open(&paths, &manager, &cli.workspace, cli.language.as_deref())?;
            let recent = thesaurus.recently_modified(limit)?;
            if cli.json {
                return print_json(&recent);
            }
            let lang = cli.language.unwrap_or(ws.language);
            for asset in &recent {
                println!(
                    "  {}  {:<10} {:<8} {}  {}",
                    asset.modified,
                    asset.kind,
                    asset.change,
                    asset.id,
                    label(&asset.label, &lang)
                );
            }
        }
    }

    Ok(())
}

/// Open the shared store with the registrations of `workspace`.
fn open(
    paths: &GlossaPaths,
    manager: &WorkspaceManager,
    workspace: &str,
    language: Option<&str>,
) -> Result<(Thesaurus, WorkspaceConfig)> {
    let ws = manager.load(workspace)?;
    let config_file = paths.global_config_file();
    let mut config = if config_file.exists() {
        let content = std::fs::read_to_string(&config_file).into_diagnostic()?;
        let mut config: ThesaurusConfig = toml::from_str(&content).into_diagnostic()?;
        config.data_dir.get_or_insert_with(|| paths.store_dir());
        config
    } else {
        ws.to_thesaurus_config(paths)
    };
    if let Some(language) = language {
        config.language = language.to_string();
    } else {
        config.language = ws.language.clone();
    }
    let registry = WorkspaceRegistry::from_config(&ws)?;
    let thesaurus = Thesaurus::with_registry(config, registry)?;
    Ok((thesaurus, ws))
}

fn scope_for(thesaurus: &Thesaurus, ws: &WorkspaceConfig) -> glossa::workspace::OperationScope {
    match &ws.author {
        Some(author) => thesaurus.scope_as(author),
        None => thesaurus.scope(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value).into_diagnostic()?);
    Ok(())
}

fn label<'a>(text: &'a MultilingualString, language: &str) -> &'a str {
    text.get_or_fallback(language).unwrap_or("<unlabeled>")
}

fn info_line(info: &TermInfo, language: &str) -> String {
    format!("  {}  {}", label(&info.label, language), info.id)
}

fn print_vocabulary(v: &Vocabulary, language: &str) {
    println!("{}", v.id);
    println!("  title:    {}", label(&v.label, language));
    println!("  glossary: {}", v.glossary.id);
    println!("  roots:    {}", v.glossary.root_terms.len());
    for imported in &v.imports {
        println!("  imports:  {imported}");
    }
}

fn print_term(term: &Term, language: &str) {
    println!("{}", term.id);
    println!("  label:      {}", label(&term.label, language));
    if let Some(definition) = term.definition.get_or_fallback(language) {
        println!("  definition: {definition}");
    }
    if let Some(vocabulary) = &term.vocabulary {
        println!("  vocabulary: {vocabulary}");
    }
    for parent in term.all_parents() {
        println!("  parent:     {parent}");
    }
    for sub in &term.sub_terms {
        println!("  sub-term:   {}", info_line(sub, language).trim_start());
    }
    for (name, set) in [
        ("related", &term.relationships.related),
        ("related-match", &term.relationships.related_match),
        ("exact-match", &term.relationships.exact_match),
    ] {
        for info in &set.forward {
            println!("  {name}:  {}", info.id);
        }
        for info in &set.inverse {
            println!("  {name} (inverse):  {}", info.id);
        }
    }
    println!("  draft:      {}", term.draft);
}
