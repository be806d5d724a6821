use std::cell::Cell;
use std::rc::Rc;

use speculate2::speculate;
use storyliner::models::*;
use storyliner::story::{AddElementInput, ChangeObserver, Story};

struct Counter(Cell<usize>);

impl ChangeObserver for Counter {
    fn refresh(&self) {
        self.0.set(self.0.get() + 1);
    }
}

fn create_arc_with_points(story: &mut Story, title: &str, points: &[&str]) -> (ElementId, Vec<ElementId>) {
    let arc = story.add_arc(AddElementInput::titled(title));
    let ids = points
        .iter()
        .map(|title| {
            story
                .add_turning_point(AddElementInput::after(arc.clone()).with_title(*title))
                .expect("Failed to add turning point")
        })
        .collect();
    (arc, ids)
}

fn arcs_root() -> NodeId {
    NodeId::Root(Root::Arcs)
}

speculate! {
    before {
        let mut story = Story::new();
    }

    describe "identifiers" {
        it "numbers each kind from one" {
            assert_eq!(story.add_arc(AddElementInput::default()).as_str(), "ac1");
            assert_eq!(story.add_arc(AddElementInput::default()).as_str(), "ac2");
            assert_eq!(story.add_character(AddElementInput::default()).as_str(), "cr1");
            assert_eq!(story.add_book(AddElementInput::default()).as_str(), "bk1");
        }

        it "never reuses the ID of a deleted element" {
            let first = story.add_character(AddElementInput::default());
            let second = story.add_character(AddElementInput::default());
            assert!(story.delete_element(&second));
            assert!(story.delete_element(&first));

            let third = story.add_character(AddElementInput::default());
            assert_eq!(third.as_str(), "cr3");
        }

        it "keeps IDs unique across many additions" {
            let ids: Vec<_> = (0..50).map(|_| story.add_book(AddElementInput::default())).collect();
            let mut unique = ids.clone();
            unique.sort();
            unique.dedup();
            assert_eq!(unique.len(), ids.len());
        }
    }

    describe "add" {
        it "appends when there is no target" {
            let a = story.add_arc(AddElementInput::default());
            let b = story.add_arc(AddElementInput::default());
            assert_eq!(story.children(&arcs_root()), &[a, b]);
        }

        it "inserts right after a same-kind target" {
            let a = story.add_character(AddElementInput::default());
            let b = story.add_character(AddElementInput::default());
            let c = story.add_character(AddElementInput::after(a.clone()));
            assert_eq!(story.children(&NodeId::Root(Root::Characters)), &[a, c, b]);
        }

        it "appends when the target is of another kind" {
            let book = story.add_book(AddElementInput::default());
            let a = story.add_arc(AddElementInput::default());
            let b = story.add_arc(AddElementInput::after(book));
            assert_eq!(story.children(&arcs_root()), &[a, b]);
        }

        it "places a turning point after a turning point target" {
            let (arc, points) = create_arc_with_points(&mut story, "Main", &["one", "two"]);
            let middle = story
                .add_turning_point(AddElementInput::after(points[0].clone()))
                .expect("Failed to add turning point");
            assert_eq!(
                story.children(&arc.into()),
                &[points[0].clone(), middle, points[1].clone()]
            );
        }

        it "rejects a turning point without an arc" {
            let character = story.add_character(AddElementInput::default());
            story.set_modified(false);

            assert!(story.add_turning_point(AddElementInput::default()).is_none());
            assert!(story.add_turning_point(AddElementInput::after(character)).is_none());
            assert!(story.add_turning_point(AddElementInput::after(Root::Arcs)).is_none());
            assert!(story.turning_points().is_empty());
            assert!(!story.is_modified());
        }

        it "keeps the timeline position" {
            let arc = story.add_arc(AddElementInput::default());
            let point = story
                .add_turning_point(AddElementInput::after(arc).with_position(12))
                .expect("Failed to add turning point");
            assert_eq!(story.get::<TurningPoint>(&point).unwrap().position, Some(12));
        }
    }

    describe "delete" {
        it "removes an arc together with its turning points" {
            let (arc, points) = create_arc_with_points(&mut story, "Main", &["one", "two"]);
            assert!(story.delete_element(&arc));

            assert!(story.arcs().is_empty());
            assert!(story.turning_points().is_empty());
            for point in &points {
                assert!(!story.tree().contains(point));
            }
        }

        it "strips a deleted book from every turning point" {
            let book = story.add_book(AddElementInput::titled("Vol. 1"));
            let (_, points) = create_arc_with_points(&mut story, "Main", &["one", "two"]);
            for point in &points {
                story.edit(point, |p: &mut TurningPoint| p.add_book(book.clone()));
            }
            assert_eq!(story.turning_points_with_book(&book), points);

            assert!(story.delete_element(&book));
            assert!(story.turning_points_with_book(&book).is_empty());
            for point in &points {
                assert!(story.get::<TurningPoint>(point).unwrap().books().is_empty());
            }
        }

        it "ignores unknown and malformed IDs" {
            story.add_character(AddElementInput::default());
            story.set_modified(false);
            assert!(!story.delete_element(&ElementId::new(ElementKind::Character, 9)));
            assert!(!story.delete_element_str("zz1"));
            assert!(!story.delete_element_str(""));
            assert_eq!(story.characters().len(), 1);
            assert!(!story.is_modified());
        }
    }

    describe "move_node" {
        it "moves a turning point onto a turning point of another arc" {
            let (first, a) = create_arc_with_points(&mut story, "First", &["a1", "a2"]);
            let (second, b) = create_arc_with_points(&mut story, "Second", &["b1", "b2"]);

            assert!(story.move_node(&a[0], &NodeId::Element(b[1].clone())));
            assert_eq!(story.children(&first.into()), &[a[1].clone()]);
            assert_eq!(
                story.children(&second.into()),
                &[b[0].clone(), a[0].clone(), b[1].clone()]
            );
        }

        it "appends a turning point dropped onto an arc" {
            let (_, a) = create_arc_with_points(&mut story, "First", &["a1"]);
            let (second, b) = create_arc_with_points(&mut story, "Second", &["b1"]);

            assert!(story.move_node(&a[0], &NodeId::Element(second.clone())));
            assert_eq!(story.children(&second.into()), &[b[0].clone(), a[0].clone()]);
        }

        it "reorders arcs" {
            let a = story.add_arc(AddElementInput::default());
            let b = story.add_arc(AddElementInput::default());
            let c = story.add_arc(AddElementInput::default());
            assert!(story.move_node(&c, &NodeId::Element(a.clone())));
            assert_eq!(story.children(&arcs_root()), &[c, a, b]);
        }

        it "rejects a character dropped onto an arc" {
            let arc = story.add_arc(AddElementInput::default());
            let character = story.add_character(AddElementInput::default());
            let before = story.tree().clone();
            story.set_modified(false);

            assert!(!story.move_node(&character, &NodeId::Element(arc)));
            assert_eq!(story.tree(), &before);
            assert!(!story.is_modified());
        }

        it "rejects an arc dropped onto a turning point" {
            let (arc, points) = create_arc_with_points(&mut story, "Main", &["one"]);
            let other = story.add_arc(AddElementInput::default());
            let before = story.tree().clone();

            assert!(!story.move_node(&other, &NodeId::Element(points[0].clone())));
            assert!(!story.move_node(&arc, &NodeId::Element(arc.clone())));
            assert_eq!(story.tree(), &before);
        }
    }

    describe "modification flag" {
        it "starts clean" {
            assert!(!story.is_modified());
        }

        it "is raised by structural changes and cleared on demand" {
            let arc = story.add_arc(AddElementInput::default());
            assert!(story.is_modified());
            story.set_modified(false);

            story.edit(&arc, |a: &mut Arc| a.short_name = "main".to_string());
            assert!(story.is_modified());
        }

        it "is raised by project edits" {
            story.edit_project(|p| p.set_locale("de-DE"));
            assert!(story.is_modified());
            assert_eq!(story.project().locale().as_deref(), Some("de-DE"));
        }

        it "notifies observers on each assignment" {
            let counter = Rc::new(Counter(Cell::new(0)));
            story.register_client(counter.clone());

            story.add_character(AddElementInput::default());
            story.add_character(AddElementInput::default());
            story.set_modified(false);
            assert_eq!(counter.0.get(), 3);
        }
    }
}
