use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storyliner::config::Settings;
use storyliner::models::{
    Arc, Book, Character, ElementId, ElementKind, NodeId, ProjectInfo, Root, TurningPoint,
};
use storyliner::{stlx, tree_render, AddElementInput, Frontend, ProjectController, Story};

#[derive(Parser)]
#[command(name = "storyliner")]
#[command(about = "Outline story arcs, turning points, characters and books")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new project file
    New {
        path: PathBuf,

        /// Project title
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Print the project outline
    Show {
        /// Project file; defaults to the last one opened
        path: Option<PathBuf>,

        /// Print the full records as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an arc, turning point, character or book
    Add {
        path: PathBuf,

        /// arc, turning_point, character or book
        #[arg(value_parser = parse_kind)]
        kind: ElementKind,

        /// Element to insert after, or arc to append a turning point to
        #[arg(long)]
        target: Option<NodeId>,

        #[arg(short, long)]
        title: Option<String>,
    },
    /// Delete an element and everything below it
    Delete {
        path: PathBuf,

        id: ElementId,

        /// Don't ask for confirmation
        #[arg(short, long)]
        yes: bool,
    },
    /// Move an element onto a sibling, an arc or its root
    Move {
        path: PathBuf,

        id: ElementId,

        target: NodeId,
    },
}

fn parse_kind(s: &str) -> Result<ElementKind, String> {
    ElementKind::from_str(s).ok_or_else(|| format!("unknown element kind \"{}\"", s))
}

/// Front end for one-shot commands: questions go to the terminal.
struct Terminal {
    assume_yes: bool,
}

impl Frontend for Terminal {
    fn ask_yes_no(&self, question: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{} [y/N] ", question);
        let _ = io::stderr().flush();
        let mut answer = String::new();
        if io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }

    fn report(&self, message: &str, is_error: bool) {
        if is_error {
            tracing::error!("{}", message);
        } else {
            tracing::info!("{}", message);
        }
    }
}

/// Initialize tracing with output to stderr so stdout stays clean for `show`
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "storyliner=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut settings = Settings::load();

    match cli.command {
        Commands::New { path, title } => {
            let path = match path.extension() {
                Some(_) => path,
                None => path.with_extension(stlx::EXTENSION),
            };
            let mut controller = ProjectController::new(Terminal { assume_yes: false });
            controller.new_project(None)?;
            if let (Some(title), Some(story)) = (title, controller.story_mut()) {
                story.edit_project(|project| project.title = title);
            }
            controller.save_project_as(&path)?;
            remember(&mut settings, path);
        }
        Commands::Show { path, json } => {
            let path = match path.or_else(|| settings.last_project.clone()) {
                Some(path) => path,
                None => bail!("No project given and no project opened before"),
            };
            let controller = open(&path, false)?;
            let story = loaded(&controller)?;
            if json {
                let snapshot = Snapshot::of(story);
                println!(
                    "{}",
                    serde_json::to_string_pretty(&snapshot).context("Failed to serialize project")?
                );
            } else {
                print!("{}", tree_render::render_story(story));
            }
            remember(&mut settings, path);
        }
        Commands::Add {
            path,
            kind,
            target,
            title,
        } => {
            let mut controller = open(&path, false)?;
            let input = AddElementInput {
                target,
                title,
                position: None,
            };
            let added = match kind {
                ElementKind::Arc => controller.add_arc(input),
                ElementKind::TurningPoint => controller.add_turning_point(input),
                ElementKind::Character => controller.add_character(input),
                ElementKind::Book => controller.add_book(input),
            };
            let Some(id) = added else {
                bail!("A turning point needs an arc or turning point as --target");
            };
            controller.save_project()?;
            println!("{}", id);
            remember(&mut settings, path);
        }
        Commands::Delete { path, id, yes } => {
            let assume_yes = yes || !settings.confirm_delete;
            let mut controller = open(&path, assume_yes)?;
            if !loaded(&controller)?.tree().contains(&id) {
                bail!("No element {} in {}", id, path.display());
            }
            if !controller.delete_element(&id) {
                println!("Nothing deleted");
                return Ok(());
            }
            controller.save_project()?;
            remember(&mut settings, path);
        }
        Commands::Move { path, id, target } => {
            let mut controller = open(&path, false)?;
            if !controller.move_node(&id, &target) {
                bail!("Cannot move {} onto {}", id, target);
            }
            controller.save_project()?;
            remember(&mut settings, path);
        }
    }

    Ok(())
}

fn open(path: &Path, assume_yes: bool) -> anyhow::Result<ProjectController<Terminal>> {
    let mut controller = ProjectController::new(Terminal { assume_yes });
    controller
        .open_project(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(controller)
}

fn loaded<F: Frontend>(controller: &ProjectController<F>) -> anyhow::Result<&Story> {
    controller
        .story()
        .ok_or_else(|| anyhow::anyhow!("No project is open"))
}

fn remember(settings: &mut Settings, path: PathBuf) {
    let path = path.canonicalize().unwrap_or(path);
    if settings.last_project.as_ref() == Some(&path) {
        return;
    }
    settings.last_project = Some(path);
    if let Err(e) = settings.save() {
        tracing::warn!("Failed to save settings: {:#}", e);
    }
}

/// JSON view of a project: records in tree order with their IDs.
#[derive(Serialize)]
struct Snapshot<'a> {
    project: &'a ProjectInfo,
    arcs: Vec<Entry<'a, Arc>>,
    characters: Vec<Entry<'a, Character>>,
    books: Vec<Entry<'a, Book>>,
}

#[derive(Serialize)]
struct Entry<'a, E> {
    id: &'a ElementId,
    #[serde(flatten)]
    record: &'a E,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    turning_points: Vec<Entry<'a, TurningPoint>>,
}

impl<'a> Snapshot<'a> {
    fn of(story: &'a Story) -> Self {
        Self {
            project: story.project(),
            arcs: entries(story, story.arcs(), Root::Arcs),
            characters: entries(story, story.characters(), Root::Characters),
            books: entries(story, story.books(), Root::Books),
        }
    }
}

fn entries<'a, E>(
    story: &'a Story,
    records: &'a HashMap<ElementId, E>,
    root: Root,
) -> Vec<Entry<'a, E>> {
    story
        .children(&NodeId::Root(root))
        .iter()
        .filter_map(|id| {
            let record = records.get(id)?;
            let turning_points = story
                .children(&NodeId::Element(id.clone()))
                .iter()
                .filter_map(|point| {
                    Some(Entry {
                        id: point,
                        record: story.turning_points().get(point)?,
                        turning_points: Vec::new(),
                    })
                })
                .collect();
            Some(Entry {
                id,
                record,
                turning_points,
            })
        })
        .collect()
}
