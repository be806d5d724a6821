//! ASCII outline rendering for a story.

use crate::models::{ElementId, NodeId, Root};
use crate::story::Story;

const UNTITLED: &str = "(untitled project)";

/// One line of the outline and the lines nested under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineNode {
    pub label: String,
    pub children: Vec<OutlineNode>,
}

impl OutlineNode {
    fn leaf(label: String) -> Self {
        Self {
            label,
            children: Vec::new(),
        }
    }
}

/// Collect the story into an outline: the project title, then one branch per
/// root in the order arcs, characters, books.
pub fn outline(story: &Story) -> OutlineNode {
    let title = story.project().title.trim();
    let label = if title.is_empty() { UNTITLED } else { title };
    OutlineNode {
        label: label.to_string(),
        children: Root::ALL
            .iter()
            .map(|root| OutlineNode {
                label: root.label().to_string(),
                children: story
                    .children(&NodeId::Root(*root))
                    .iter()
                    .map(|id| element_node(story, id))
                    .collect(),
            })
            .collect(),
    }
}

fn element_node(story: &Story, id: &ElementId) -> OutlineNode {
    let mut node = OutlineNode::leaf(element_label(story, id));
    node.children = story
        .children(&NodeId::Element(id.clone()))
        .iter()
        .map(|child| OutlineNode::leaf(element_label(story, child)))
        .collect();
    node
}

fn element_label(story: &Story, id: &ElementId) -> String {
    let title = story.element_title(id).unwrap_or_default();
    match story.turning_points().get(id).and_then(|point| point.position) {
        Some(position) => format!("[{}] {} @{}", id, title, position),
        None => format!("[{}] {}", id, title),
    }
}

/// Render a story as an ASCII tree.
///
/// Example output:
/// ```text
/// Saga
/// ├── Arcs
/// │   └── [ac1] Main Plot
/// │       └── [ap1] Inciting Incident @3
/// ├── Characters
/// │   └── [cr1] Ann
/// └── Books
/// ```
pub fn render_story(story: &Story) -> String {
    render_tree(&outline(story))
}

pub fn render_tree(root: &OutlineNode) -> String {
    let mut output = String::new();
    render_node(&mut output, root, "", true, true);
    output
}

fn render_node(output: &mut String, node: &OutlineNode, prefix: &str, is_last: bool, is_root: bool) {
    if is_root {
        output.push_str(&node.label);
    } else {
        let branch = if is_last { "└── " } else { "├── " };
        output.push_str(prefix);
        output.push_str(branch);
        output.push_str(&node.label);
    }
    output.push('\n');

    let child_prefix = if is_root {
        String::new()
    } else {
        let continuation = if is_last { "    " } else { "│   " };
        format!("{}{}", prefix, continuation)
    };

    for (i, child) in node.children.iter().enumerate() {
        let child_is_last = i == node.children.len() - 1;
        render_node(output, child, &child_prefix, child_is_last, false);
    }
}
