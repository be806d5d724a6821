//! Project lifecycle: new, open, save, close and reload, with the
//! confirmations a front end has to give along the way.

use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::{ProjectError, StlxError};
use crate::models::{ElementId, NodeId};
use crate::stlx::StlxFile;
use crate::story::{AddElementInput, ChangeObserver, Story};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectState {
    NoProject,
    OpenUnmodified,
    OpenModified,
}

/// What the controller needs from the user interface.
pub trait Frontend {
    /// Ask a yes/no question. `false` means "no" or "cancel".
    fn ask_yes_no(&self, question: &str) -> bool;

    /// Show a status message.
    fn report(&self, message: &str, is_error: bool);

    /// The node currently selected, used as default insertion target.
    fn selection(&self) -> Option<NodeId> {
        None
    }
}

/// Owns the open story and its file, and mediates every change that needs
/// the user's consent.
pub struct ProjectController<F: Frontend> {
    frontend: F,
    story: Option<Story>,
    file: Option<StlxFile>,
    clients: Vec<Rc<dyn ChangeObserver>>,
}

impl<F: Frontend> ProjectController<F> {
    pub fn new(frontend: F) -> Self {
        Self {
            frontend,
            story: None,
            file: None,
            clients: Vec::new(),
        }
    }

    pub fn frontend(&self) -> &F {
        &self.frontend
    }

    pub fn state(&self) -> ProjectState {
        match &self.story {
            None => ProjectState::NoProject,
            Some(story) if story.is_modified() => ProjectState::OpenModified,
            Some(_) => ProjectState::OpenUnmodified,
        }
    }

    pub fn story(&self) -> Option<&Story> {
        self.story.as_ref()
    }

    /// Direct access for field edits; structural changes have wrappers below.
    pub fn story_mut(&mut self) -> Option<&mut Story> {
        self.story.as_mut()
    }

    pub fn path(&self) -> Option<&Path> {
        self.file.as_ref().map(StlxFile::path)
    }

    pub fn file(&self) -> Option<&StlxFile> {
        self.file.as_ref()
    }

    /// Observers survive across projects: they are attached to every story
    /// this controller opens or creates.
    pub fn register_client(&mut self, client: Rc<dyn ChangeObserver>) {
        if let Some(story) = &mut self.story {
            story.register_client(client.clone());
        }
        if !self.clients.iter().any(|c| Rc::ptr_eq(c, &client)) {
            self.clients.push(client);
        }
    }

    pub fn unregister_client(&mut self, client: &Rc<dyn ChangeObserver>) {
        if let Some(story) = &mut self.story {
            story.unregister_client(client);
        }
        self.clients.retain(|c| !Rc::ptr_eq(c, client));
    }

    // ============================================================
    // Lifecycle
    // ============================================================

    /// Close the current project, then start an empty one.
    ///
    /// With a path the new project is written right away. An existing file
    /// there is only replaced if the user agrees.
    pub fn new_project(&mut self, path: Option<PathBuf>) -> Result<(), ProjectError> {
        let result = self.try_new_project(path);
        self.reported(result)
    }

    fn try_new_project(&mut self, path: Option<PathBuf>) -> Result<(), ProjectError> {
        if let Some(path) = &path {
            self.confirm_overwrite(path)?;
        }
        self.try_close_project()?;
        self.attach(Story::new(), path.map(StlxFile::new));
        tracing::info!("Created a new project");
        if self.file.is_some() {
            self.try_save_project()?;
        }
        Ok(())
    }

    /// Close the current project, then read `path`.
    ///
    /// On failure no project is open.
    pub fn open_project(&mut self, path: impl Into<PathBuf>) -> Result<(), ProjectError> {
        let result = self
            .try_close_project()
            .and_then(|()| self.load(path.into()));
        self.reported(result)
    }

    fn load(&mut self, path: PathBuf) -> Result<(), ProjectError> {
        let mut file = StlxFile::new(path);
        let story = file.read()?;
        let message = format!(
            "Opened {} (last saved on {})",
            file.path().display(),
            file.file_date().unwrap_or_default()
        );
        self.attach(story, Some(file));
        self.frontend.report(&message, false);
        Ok(())
    }

    /// Write the project to its file.
    ///
    /// If someone else changed the file since we last touched it, the user
    /// has to agree to overwrite it.
    pub fn save_project(&mut self) -> Result<(), ProjectError> {
        let result = self.try_save_project();
        self.reported(result)
    }

    fn try_save_project(&mut self) -> Result<(), ProjectError> {
        let story = self.story.as_mut().ok_or(ProjectError::NoProject)?;
        let file = self.file.as_mut().ok_or(ProjectError::NoPath)?;
        if file.has_changed_on_disk()
            && !self
                .frontend
                .ask_yes_no("File has changed on disk. Save anyway?")
        {
            return Err(ProjectError::Conflict(file.path().to_path_buf()));
        }
        file.write(story)?;
        story.set_modified(false);
        let message = format!(
            "Saved {} (last saved on {})",
            file.path().display(),
            file.file_date().unwrap_or_default()
        );
        self.frontend.report(&message, false);
        Ok(())
    }

    /// Write the project to `path` and keep using that path afterwards.
    ///
    /// Replacing another existing file needs the user's consent.
    pub fn save_project_as(&mut self, path: impl Into<PathBuf>) -> Result<(), ProjectError> {
        let result = self.try_save_project_as(path.into());
        self.reported(result)
    }

    fn try_save_project_as(&mut self, path: PathBuf) -> Result<(), ProjectError> {
        if self.story.is_none() {
            return Err(ProjectError::NoProject);
        }
        if self.path() != Some(path.as_path()) {
            self.confirm_overwrite(&path)?;
        }
        let story = self.story.as_mut().ok_or(ProjectError::NoProject)?;
        let mut file = StlxFile::new(path);
        file.write(story)?;
        story.set_modified(false);
        self.frontend.report(
            &format!("Saved {}", file.path().display()),
            false,
        );
        self.file = Some(file);
        Ok(())
    }

    /// Close the project, offering to save unsaved changes first.
    ///
    /// If the user wants to save and saving fails, the project stays open.
    pub fn close_project(&mut self) -> Result<(), ProjectError> {
        let result = self.try_close_project();
        self.reported(result)
    }

    fn try_close_project(&mut self) -> Result<(), ProjectError> {
        let Some(story) = &self.story else {
            return Ok(());
        };
        if story.is_modified() && self.frontend.ask_yes_no("Save changes?") {
            self.try_save_project()?;
        }
        self.detach();
        Ok(())
    }

    /// Discard the in-memory project and read its file again.
    ///
    /// Returns `Ok(false)` if the user declined.
    pub fn reload_project(&mut self) -> Result<bool, ProjectError> {
        let result = self.try_reload_project();
        self.reported(result)
    }

    fn try_reload_project(&mut self) -> Result<bool, ProjectError> {
        let story = self.story.as_ref().ok_or(ProjectError::NoProject)?;
        let file = self.file.as_ref().ok_or(ProjectError::NoPath)?;
        if story.is_modified()
            && !self
                .frontend
                .ask_yes_no("Discard changes and reload the project?")
        {
            return Ok(false);
        }
        if file.has_changed_on_disk()
            && !self
                .frontend
                .ask_yes_no("File has changed on disk. Reload anyway?")
        {
            return Ok(false);
        }
        let path = file.path().to_path_buf();
        self.detach();
        self.load(path)?;
        self.frontend
            .report("Project successfully restored from disk.", false);
        Ok(true)
    }

    /// Replace the project file with its `.bak` and open it.
    ///
    /// Returns `Ok(false)` if there is no backup or the user declined.
    pub fn restore_backup(&mut self) -> Result<bool, ProjectError> {
        let result = self.try_restore_backup();
        self.reported(result)
    }

    fn try_restore_backup(&mut self) -> Result<bool, ProjectError> {
        let story = self.story.as_ref().ok_or(ProjectError::NoProject)?;
        let file = self.file.as_ref().ok_or(ProjectError::NoPath)?;
        let backup = file.backup_path();
        if !backup.is_file() {
            self.frontend.report("No backup available", true);
            return Ok(false);
        }
        let question = if story.is_modified() {
            "Discard changes and restore the latest backup?"
        } else {
            "Restore the latest backup?"
        };
        if !self.frontend.ask_yes_no(question) {
            return Ok(false);
        }
        let path = file.path().to_path_buf();
        fs::rename(&backup, &path).map_err(|e| StlxError::io(&path, e))?;
        self.detach();
        self.load(path)?;
        self.frontend
            .report("Latest backup successfully restored.", false);
        Ok(true)
    }

    // ============================================================
    // Structure
    // ============================================================

    /// `None` if no project is open.
    pub fn add_arc(&mut self, input: AddElementInput) -> Option<ElementId> {
        let input = self.with_selection(input);
        Some(self.story.as_mut()?.add_arc(input))
    }

    pub fn add_character(&mut self, input: AddElementInput) -> Option<ElementId> {
        let input = self.with_selection(input);
        Some(self.story.as_mut()?.add_character(input))
    }

    pub fn add_book(&mut self, input: AddElementInput) -> Option<ElementId> {
        let input = self.with_selection(input);
        Some(self.story.as_mut()?.add_book(input))
    }

    /// `None` if no project is open or the target is not an arc or turning point.
    pub fn add_turning_point(&mut self, input: AddElementInput) -> Option<ElementId> {
        let input = self.with_selection(input);
        self.story.as_mut()?.add_turning_point(input)
    }

    /// Delete an element after the user confirmed it.
    pub fn delete_element(&mut self, id: &ElementId) -> bool {
        let Some(story) = &self.story else {
            return false;
        };
        let Some(title) = story.element_title(id) else {
            return false;
        };
        let question = format!("Delete {} \"{}\"?", id.kind().label(), title);
        if !self.frontend.ask_yes_no(&question) {
            return false;
        }
        self.story
            .as_mut()
            .is_some_and(|story| story.delete_element(id))
    }

    pub fn move_node(&mut self, id: &ElementId, target: &NodeId) -> bool {
        self.story
            .as_mut()
            .is_some_and(|story| story.move_node(id, target))
    }

    // ============================================================
    // Helpers
    // ============================================================

    fn confirm_overwrite(&self, path: &Path) -> Result<(), ProjectError> {
        let question = format!("File \"{}\" exists. Overwrite?", path.display());
        if path.exists() && !self.frontend.ask_yes_no(&question) {
            return Err(ProjectError::Exists(path.to_path_buf()));
        }
        Ok(())
    }

    fn with_selection(&self, mut input: AddElementInput) -> AddElementInput {
        if input.target.is_none() {
            input.target = self.frontend.selection();
        }
        input
    }

    fn attach(&mut self, mut story: Story, file: Option<StlxFile>) {
        for client in &self.clients {
            story.register_client(client.clone());
        }
        story.set_modified(false);
        self.story = Some(story);
        self.file = file;
    }

    fn detach(&mut self) {
        self.story = None;
        self.file = None;
        tracing::debug!("Project closed");
        for client in &self.clients {
            client.refresh();
        }
    }

    fn reported<T>(&self, result: Result<T, ProjectError>) -> Result<T, ProjectError> {
        if let Err(e) = &result {
            tracing::warn!("{}", e);
            self.frontend.report(&e.to_string(), true);
        }
        result
    }
}
