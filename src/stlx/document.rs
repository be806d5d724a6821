//! Mapping between a [`Story`] and the `.stlx` element tree.

use roxmltree::{Document, Node, ParsingOptions};

use super::xml::XmlElement;
use super::{MAJOR_VERSION, MINOR_VERSION};
use crate::error::StlxError;
use crate::models::*;
use crate::story::Story;

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";
const ROOT_TAG: &str = "stlx";

// ============================================================
// Reading
// ============================================================

/// Parse a project document into a fresh story.
///
/// Books are read before arcs so that turning point references can be
/// checked against them. Nothing is returned unless the whole document
/// was accepted.
pub fn parse_story(text: &str) -> Result<Story, StlxError> {
    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    let document = Document::parse_with_options(text, options)?;
    let root = document.root_element();
    check_version(root)?;

    let mut story = Story::new();
    if let Some(locale) = root.attribute((XML_NAMESPACE, "lang")) {
        story.project_mut().set_locale(locale);
    }
    if let Some(project) = child(root, "PROJECT") {
        let info = story.project_mut();
        info.title = element_text(project, "Title");
        info.description = paragraph_text(project, "Desc");
    }
    read_books(root, &mut story)?;
    read_arcs(root, &mut story)?;
    read_characters(root, &mut story)?;
    Ok(story)
}

fn check_version(root: Node) -> Result<(), StlxError> {
    let (major, minor) = root
        .attribute("version")
        .and_then(|version| version.split_once('.'))
        .and_then(|(major, minor)| Some((major.parse::<u32>().ok()?, minor.parse::<u32>().ok()?)))
        .ok_or_else(|| StlxError::format("No valid version found in file"))?;

    if major > MAJOR_VERSION || (major == MAJOR_VERSION && minor > MINOR_VERSION) {
        return Err(StlxError::format(format!(
            "The project was created with a newer storyliner version ({}.{})",
            major, minor
        )));
    }
    if major < MAJOR_VERSION {
        return Err(StlxError::format(format!(
            "The project was created with an outdated storyliner version ({}.{})",
            major, minor
        )));
    }
    Ok(())
}

fn read_books(root: Node, story: &mut Story) -> Result<(), StlxError> {
    for node in section(root, "BOOKS", "BOOK") {
        let id = element_id(node, ElementKind::Book, story)?;
        let book = Book {
            title: element_text(node, "Title"),
            description: paragraph_text(node, "Desc"),
            notes: paragraph_text(node, "Notes"),
            path: node.attribute("path").map(str::to_string),
        };
        story.insert_loaded(&NodeId::Root(Root::Books), id, book);
    }
    Ok(())
}

fn read_arcs(root: Node, story: &mut Story) -> Result<(), StlxError> {
    for node in section(root, "ARCS", "ARC") {
        let arc_id = element_id(node, ElementKind::Arc, story)?;
        let arc = Arc {
            title: element_text(node, "Title"),
            description: paragraph_text(node, "Desc"),
            short_name: element_text(node, "ShortName"),
            notes: paragraph_text(node, "Notes"),
        };
        story.insert_loaded(&NodeId::Root(Root::Arcs), arc_id.clone(), arc);

        let parent = NodeId::Element(arc_id);
        for point_node in node.children().filter(|c| c.has_tag_name("POINT")) {
            let id = element_id(point_node, ElementKind::TurningPoint, story)?;
            let mut point = TurningPoint::default();
            point.title = element_text(point_node, "Title");
            point.description = paragraph_text(point_node, "Desc");
            point.notes = paragraph_text(point_node, "Notes");
            point.position = point_node
                .attribute("position")
                .and_then(|p| p.trim().parse().ok());
            point.set_books(book_references(point_node, story, &id));
            story.insert_loaded(&parent, id, point);
        }
    }
    Ok(())
}

fn read_characters(root: Node, story: &mut Story) -> Result<(), StlxError> {
    for node in section(root, "CHARACTERS", "CHARACTER") {
        let id = element_id(node, ElementKind::Character, story)?;
        let character = Character {
            title: element_text(node, "Title"),
            description: paragraph_text(node, "Desc"),
            full_name: element_text(node, "FullName"),
            role: paragraph_text(node, "Role"),
            notes: paragraph_text(node, "Notes"),
        };
        story.insert_loaded(&NodeId::Root(Root::Characters), id, character);
    }
    Ok(())
}

/// Book IDs listed in `<Books ids="...">`, restricted to books already loaded.
fn book_references(node: Node, story: &Story, point: &ElementId) -> Vec<ElementId> {
    let Some(ids) = child(node, "Books").and_then(|books| books.attribute("ids")) else {
        return Vec::new();
    };
    ids.split_whitespace()
        .filter_map(|raw| match ElementId::parse(raw) {
            Ok(id) if story.books().contains_key(&id) => Some(id),
            _ => {
                tracing::debug!("Dropping unknown book reference {:?} from {}", raw, point);
                None
            }
        })
        .collect()
}

fn element_id(node: Node, kind: ElementKind, story: &Story) -> Result<ElementId, StlxError> {
    let tag = node.tag_name().name();
    let raw = node
        .attribute("id")
        .ok_or_else(|| StlxError::format(format!("<{}> element without id", tag)))?;
    let id = ElementId::parse(raw).map_err(|e| StlxError::format(e.to_string()))?;
    if id.kind() != kind {
        return Err(StlxError::format(format!(
            "<{}> element has a {} ID: \"{}\"",
            tag,
            id.kind().label().to_lowercase(),
            raw
        )));
    }
    if story.tree().contains(&id) {
        return Err(StlxError::format(format!("Duplicate element ID: \"{}\"", raw)));
    }
    Ok(id)
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|c| c.has_tag_name(name))
}

fn section<'a, 'input: 'a>(
    root: Node<'a, 'input>,
    name: &str,
    item: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    child(root, name)
        .into_iter()
        .flat_map(move |s| s.children().filter(move |c| c.has_tag_name(item)))
}

fn element_text(node: Node, name: &str) -> String {
    child(node, name)
        .and_then(|c| c.text())
        .unwrap_or_default()
        .to_string()
}

/// Multi-line text, stored one `<p>` per line. Plain element text is accepted too.
fn paragraph_text(node: Node, name: &str) -> String {
    let Some(element) = child(node, name) else {
        return String::new();
    };
    let lines: Vec<&str> = element
        .children()
        .filter(|c| c.has_tag_name("p"))
        .map(|p| p.text().unwrap_or_default())
        .collect();
    if lines.is_empty() {
        element.text().unwrap_or_default().to_string()
    } else {
        lines.join("\n")
    }
}

// ============================================================
// Writing
// ============================================================

/// Build a fresh element tree from the story, in file order: project,
/// arcs with turning points, characters, books.
///
/// # Panics
/// If the tree index references an element missing from its collection.
pub fn build_document(story: &Story) -> XmlElement {
    let mut root = XmlElement::new(ROOT_TAG);
    root.set_attribute("version", format!("{}.{}", MAJOR_VERSION, MINOR_VERSION));
    if let Some(locale) = story.project().locale() {
        root.set_attribute("xml:lang", locale);
    }

    let project = root.sub_element("PROJECT");
    push_text(project, "Title", &story.project().title);
    push_paragraphs(project, "Desc", &story.project().description);

    let arcs = root.sub_element("ARCS");
    for id in story.children(&NodeId::Root(Root::Arcs)) {
        arcs.push(build_arc(story, id));
    }

    let characters = root.sub_element("CHARACTERS");
    for id in story.children(&NodeId::Root(Root::Characters)) {
        let character: &Character = lookup(story, id);
        let mut node = XmlElement::new("CHARACTER");
        node.set_attribute("id", id.as_str());
        push_text(&mut node, "Title", &character.title);
        push_text(&mut node, "FullName", &character.full_name);
        push_paragraphs(&mut node, "Desc", &character.description);
        push_paragraphs(&mut node, "Role", &character.role);
        push_paragraphs(&mut node, "Notes", &character.notes);
        characters.push(node);
    }

    let books = root.sub_element("BOOKS");
    for id in story.children(&NodeId::Root(Root::Books)) {
        let book: &Book = lookup(story, id);
        let mut node = XmlElement::new("BOOK");
        node.set_attribute("id", id.as_str());
        if let Some(path) = &book.path {
            node.set_attribute("path", path.as_str());
        }
        push_text(&mut node, "Title", &book.title);
        push_paragraphs(&mut node, "Desc", &book.description);
        push_paragraphs(&mut node, "Notes", &book.notes);
        books.push(node);
    }

    root
}

fn build_arc(story: &Story, id: &ElementId) -> XmlElement {
    let arc: &Arc = lookup(story, id);
    let mut node = XmlElement::new("ARC");
    node.set_attribute("id", id.as_str());
    push_text(&mut node, "Title", &arc.title);
    push_text(&mut node, "ShortName", &arc.short_name);
    push_paragraphs(&mut node, "Desc", &arc.description);
    push_paragraphs(&mut node, "Notes", &arc.notes);

    for point_id in story.children(&NodeId::Element(id.clone())) {
        let point: &TurningPoint = lookup(story, point_id);
        let mut point_node = XmlElement::new("POINT");
        point_node.set_attribute("id", point_id.as_str());
        if let Some(position) = point.position {
            point_node.set_attribute("position", position.to_string());
        }
        push_text(&mut point_node, "Title", &point.title);
        push_paragraphs(&mut point_node, "Desc", &point.description);
        push_paragraphs(&mut point_node, "Notes", &point.notes);
        if !point.books().is_empty() {
            let ids: Vec<&str> = point.books().iter().map(ElementId::as_str).collect();
            point_node
                .sub_element("Books")
                .set_attribute("ids", ids.join(" "));
        }
        node.push(point_node);
    }
    node
}

fn lookup<'s, E: crate::story::Element>(story: &'s Story, id: &ElementId) -> &'s E {
    story
        .get::<E>(id)
        .unwrap_or_else(|| panic!("tree index references missing element {}", id))
}

fn push_text(parent: &mut XmlElement, name: &str, text: &str) {
    if !text.is_empty() {
        parent.push(XmlElement::with_text(name, text));
    }
}

fn push_paragraphs(parent: &mut XmlElement, name: &str, text: &str) {
    if !text.is_empty() {
        parent.push(XmlElement::paragraphs(name, text));
    }
}
