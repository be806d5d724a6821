use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::rc::Rc;
use std::time::{Duration, SystemTime};

use speculate2::speculate;
use storyliner::models::*;
use storyliner::story::{AddElementInput, ChangeObserver};
use storyliner::{Frontend, ProjectController, ProjectError, ProjectState};

/// Answers questions from a script and records everything it is told.
#[derive(Default)]
struct ScriptedFrontend {
    answers: RefCell<VecDeque<bool>>,
    questions: RefCell<Vec<String>>,
    errors: RefCell<Vec<String>>,
    selected: RefCell<Option<NodeId>>,
}

impl ScriptedFrontend {
    fn answering(answers: &[bool]) -> Self {
        Self {
            answers: RefCell::new(answers.iter().copied().collect()),
            ..Self::default()
        }
    }
}

impl Frontend for ScriptedFrontend {
    fn ask_yes_no(&self, question: &str) -> bool {
        self.questions.borrow_mut().push(question.to_string());
        self.answers.borrow_mut().pop_front().unwrap_or(false)
    }

    fn report(&self, message: &str, is_error: bool) {
        if is_error {
            self.errors.borrow_mut().push(message.to_string());
        }
    }

    fn selection(&self) -> Option<NodeId> {
        self.selected.borrow().clone()
    }
}

struct Counter(Cell<usize>);

impl ChangeObserver for Counter {
    fn refresh(&self) {
        self.0.set(self.0.get() + 1);
    }
}

fn touch_later(path: &std::path::Path) {
    fs::File::options()
        .write(true)
        .open(path)
        .expect("Failed to open file")
        .set_modified(SystemTime::now() + Duration::from_secs(120))
        .expect("Failed to set mtime");
}

speculate! {
    before {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("saga.stlx");
    }

    describe "new_project" {
        it "opens an unmodified project without a path" {
            let mut controller = ProjectController::new(ScriptedFrontend::default());
            controller.new_project(None).expect("Failed to create project");
            assert_eq!(controller.state(), ProjectState::OpenUnmodified);
            assert!(controller.path().is_none());
        }

        it "writes the file when a path is given" {
            let mut controller = ProjectController::new(ScriptedFrontend::default());
            controller.new_project(Some(path.clone())).expect("Failed to create project");
            assert!(path.is_file());
            assert_eq!(controller.path(), Some(path.as_path()));
            assert_eq!(controller.state(), ProjectState::OpenUnmodified);
        }

        it "leaves an existing file alone when the user declines" {
            fs::write(&path, "keep me").expect("Failed to write file");
            let mut controller = ProjectController::new(ScriptedFrontend::answering(&[false]));

            let result = controller.new_project(Some(path.clone()));
            assert!(matches!(result, Err(ProjectError::Exists(_))));
            assert_eq!(fs::read_to_string(&path).expect("Failed to read file"), "keep me");
            assert_eq!(controller.state(), ProjectState::NoProject);
            assert_eq!(controller.frontend().questions.borrow().len(), 1);
        }

        it "replaces an existing file when the user agrees" {
            fs::write(&path, "old").expect("Failed to write file");
            let mut controller = ProjectController::new(ScriptedFrontend::answering(&[true]));

            controller.new_project(Some(path.clone())).expect("Failed to create project");
            assert_eq!(controller.state(), ProjectState::OpenUnmodified);
            let mut reader = ProjectController::new(ScriptedFrontend::default());
            reader.open_project(&path).expect("Failed to open");
        }

        it "offers to save the previous project" {
            let mut controller = ProjectController::new(ScriptedFrontend::answering(&[false]));
            controller.new_project(Some(path.clone())).expect("Failed to create project");
            controller.add_arc(AddElementInput::default());

            controller.new_project(None).expect("Failed to create project");
            assert_eq!(controller.frontend().questions.borrow().as_slice(), ["Save changes?"]);
            assert!(controller.story().unwrap().arcs().is_empty());
        }
    }

    describe "modification state" {
        it "tracks edits and saves" {
            let mut controller = ProjectController::new(ScriptedFrontend::default());
            controller.new_project(Some(path.clone())).expect("Failed to create project");

            let arc = controller.add_arc(AddElementInput::titled("Main Plot")).unwrap();
            assert_eq!(controller.state(), ProjectState::OpenModified);

            controller.save_project().expect("Failed to save");
            assert_eq!(controller.state(), ProjectState::OpenUnmodified);

            controller
                .story_mut()
                .unwrap()
                .edit(&arc, |a: &mut Arc| a.description = "Grows".to_string());
            assert_eq!(controller.state(), ProjectState::OpenModified);
        }

        it "keeps observers across projects" {
            let counter = Rc::new(Counter(Cell::new(0)));
            let mut controller = ProjectController::new(ScriptedFrontend::default());
            controller.register_client(counter.clone());

            controller.new_project(None).expect("Failed to create project");
            let after_new = counter.0.get();
            assert!(after_new > 0);

            controller.add_book(AddElementInput::default());
            assert_eq!(counter.0.get(), after_new + 1);

            let client: Rc<dyn ChangeObserver> = counter.clone();
            controller.unregister_client(&client);
            controller.add_book(AddElementInput::default());
            assert_eq!(counter.0.get(), after_new + 1);
        }
    }

    describe "open_project" {
        it "loads a saved project unmodified" {
            let mut writer = ProjectController::new(ScriptedFrontend::default());
            writer.new_project(Some(path.clone())).expect("Failed to create project");
            let arc = writer.add_arc(AddElementInput::titled("Main Plot")).unwrap();
            writer.save_project().expect("Failed to save");

            let mut reader = ProjectController::new(ScriptedFrontend::default());
            reader.open_project(&path).expect("Failed to open");
            assert_eq!(reader.state(), ProjectState::OpenUnmodified);
            assert_eq!(reader.story().unwrap().element_title(&arc), Some("Main Plot"));
        }

        it "leaves no project open after a failure" {
            fs::write(&path, "not xml at all").expect("Failed to write file");
            let mut controller = ProjectController::new(ScriptedFrontend::default());
            controller.new_project(None).expect("Failed to create project");

            assert!(controller.open_project(&path).is_err());
            assert_eq!(controller.state(), ProjectState::NoProject);
            assert_eq!(controller.frontend().errors.borrow().len(), 1);
        }
    }

    describe "save_project" {
        it "needs a path" {
            let mut controller = ProjectController::new(ScriptedFrontend::default());
            controller.new_project(None).expect("Failed to create project");
            assert!(matches!(controller.save_project(), Err(ProjectError::NoPath)));
        }

        it "refuses to overwrite an externally changed file when declined" {
            let mut controller = ProjectController::new(ScriptedFrontend::answering(&[false]));
            controller.new_project(Some(path.clone())).expect("Failed to create project");
            controller.add_character(AddElementInput::default());
            touch_later(&path);
            let on_disk = fs::read(&path).expect("Failed to read file");

            let result = controller.save_project();
            assert!(matches!(result, Err(ProjectError::Conflict(_))));
            assert_eq!(fs::read(&path).expect("Failed to read file"), on_disk);
            assert_eq!(controller.state(), ProjectState::OpenModified);
            assert_eq!(
                controller.frontend().questions.borrow().as_slice(),
                ["File has changed on disk. Save anyway?"]
            );
        }

        it "overwrites an externally changed file when confirmed" {
            let mut controller = ProjectController::new(ScriptedFrontend::answering(&[true]));
            controller.new_project(Some(path.clone())).expect("Failed to create project");
            controller.add_character(AddElementInput::default());
            touch_later(&path);

            controller.save_project().expect("Failed to save");
            assert_eq!(controller.state(), ProjectState::OpenUnmodified);
            assert!(!controller.file().unwrap().has_changed_on_disk());
        }

        it "asks before saving over another file" {
            let other = dir.path().join("other.stlx");
            fs::write(&other, "someone else's").expect("Failed to write file");
            let mut controller = ProjectController::new(ScriptedFrontend::answering(&[false]));
            controller.new_project(Some(path.clone())).expect("Failed to create project");

            let result = controller.save_project_as(&other);
            assert!(matches!(result, Err(ProjectError::Exists(_))));
            assert_eq!(fs::read_to_string(&other).expect("Failed to read file"), "someone else's");
            assert_eq!(controller.path(), Some(path.as_path()));
        }

        it "does not ask when saving as the current path" {
            let mut controller = ProjectController::new(ScriptedFrontend::default());
            controller.new_project(Some(path.clone())).expect("Failed to create project");
            controller.save_project_as(&path).expect("Failed to save");
            assert!(controller.frontend().questions.borrow().is_empty());
        }

        it "switches to the new path on save as" {
            let other = dir.path().join("copy.stlx");
            let mut controller = ProjectController::new(ScriptedFrontend::default());
            controller.new_project(None).expect("Failed to create project");
            controller.add_arc(AddElementInput::default());

            controller.save_project_as(&other).expect("Failed to save");
            assert_eq!(controller.path(), Some(other.as_path()));
            assert_eq!(controller.state(), ProjectState::OpenUnmodified);
            assert!(other.is_file());
        }
    }

    describe "close_project" {
        it "saves when the user agrees" {
            let mut controller = ProjectController::new(ScriptedFrontend::answering(&[true]));
            controller.new_project(Some(path.clone())).expect("Failed to create project");
            let arc = controller.add_arc(AddElementInput::titled("Kept")).unwrap();

            controller.close_project().expect("Failed to close");
            assert_eq!(controller.state(), ProjectState::NoProject);

            controller.open_project(&path).expect("Failed to open");
            assert_eq!(controller.story().unwrap().element_title(&arc), Some("Kept"));
        }

        it "does not ask when nothing changed" {
            let mut controller = ProjectController::new(ScriptedFrontend::default());
            controller.new_project(Some(path.clone())).expect("Failed to create project");
            controller.close_project().expect("Failed to close");
            assert!(controller.frontend().questions.borrow().is_empty());
        }

        it "stays open when saving fails" {
            let mut controller = ProjectController::new(ScriptedFrontend::answering(&[true]));
            controller.new_project(None).expect("Failed to create project");
            controller.add_arc(AddElementInput::default());

            assert!(matches!(controller.close_project(), Err(ProjectError::NoPath)));
            assert_eq!(controller.state(), ProjectState::OpenModified);
        }
    }

    describe "reload_project" {
        it "keeps changes when the user declines" {
            let mut controller = ProjectController::new(ScriptedFrontend::answering(&[false]));
            controller.new_project(Some(path.clone())).expect("Failed to create project");
            controller.add_arc(AddElementInput::default());

            assert!(!controller.reload_project().expect("Reload failed"));
            assert_eq!(controller.story().unwrap().arcs().len(), 1);
        }

        it "discards changes when the user agrees" {
            let mut controller = ProjectController::new(ScriptedFrontend::answering(&[true]));
            controller.new_project(Some(path.clone())).expect("Failed to create project");
            controller.add_arc(AddElementInput::default());

            assert!(controller.reload_project().expect("Reload failed"));
            assert!(controller.story().unwrap().arcs().is_empty());
            assert_eq!(controller.state(), ProjectState::OpenUnmodified);
        }

        it "needs an open project" {
            let mut controller = ProjectController::new(ScriptedFrontend::default());
            assert!(matches!(controller.reload_project(), Err(ProjectError::NoProject)));
        }
    }

    describe "restore_backup" {
        it "brings back the previous save" {
            let mut controller = ProjectController::new(ScriptedFrontend::answering(&[true]));
            controller.new_project(Some(path.clone())).expect("Failed to create project");
            controller.add_arc(AddElementInput::default());
            controller.save_project().expect("Failed to save");

            assert!(controller.restore_backup().expect("Restore failed"));
            assert!(controller.story().unwrap().arcs().is_empty());
            assert!(!dir.path().join("saga.stlx.bak").exists());
        }

        it "reports a missing backup" {
            let mut controller = ProjectController::new(ScriptedFrontend::default());
            controller.new_project(Some(path.clone())).expect("Failed to create project");
            assert!(!controller.restore_backup().expect("Restore failed"));
            assert_eq!(
                controller.frontend().errors.borrow().as_slice(),
                ["No backup available"]
            );
        }
    }

    describe "structure" {
        it "uses the selection as insertion target" {
            let mut controller = ProjectController::new(ScriptedFrontend::default());
            controller.new_project(None).expect("Failed to create project");
            let first = controller.add_character(AddElementInput::default()).unwrap();
            let second = controller.add_character(AddElementInput::default()).unwrap();

            *controller.frontend().selected.borrow_mut() = Some(first.clone().into());
            let third = controller.add_character(AddElementInput::default()).unwrap();
            assert_eq!(
                controller.story().unwrap().children(&NodeId::Root(Root::Characters)),
                &[first, third, second]
            );
        }

        it "deletes after confirmation" {
            let mut controller = ProjectController::new(ScriptedFrontend::answering(&[true]));
            controller.new_project(None).expect("Failed to create project");
            let arc = controller.add_arc(AddElementInput::titled("Main Plot")).unwrap();
            controller.add_turning_point(AddElementInput::after(arc.clone()));

            assert!(controller.delete_element(&arc));
            assert_eq!(
                controller.frontend().questions.borrow().as_slice(),
                ["Delete Arc \"Main Plot\"?"]
            );
            let story = controller.story().unwrap();
            assert!(story.arcs().is_empty());
            assert!(story.turning_points().is_empty());
        }

        it "moves turning points between arcs" {
            let mut controller = ProjectController::new(ScriptedFrontend::default());
            controller.new_project(None).expect("Failed to create project");
            let first = controller.add_arc(AddElementInput::default()).unwrap();
            let second = controller.add_arc(AddElementInput::default()).unwrap();
            let point = controller
                .add_turning_point(AddElementInput::after(first.clone()))
                .unwrap();

            assert!(controller.move_node(&point, &NodeId::Element(second.clone())));
            assert!(!controller.move_node(&second, &NodeId::Element(point.clone())));
            let story = controller.story().unwrap();
            assert!(story.children(&first.into()).is_empty());
            assert_eq!(story.children(&second.into()), &[point]);
        }
    }
}
