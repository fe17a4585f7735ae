use crate::config::HierarchyConfig;
use crate::headings::{classify_lines, LineRole};
use crate::types::{HeadingLevel, HeadingNode, IndexEntry, Line, NodeId, TreeIndex};

/// Internal builder that accumulates content before finalizing into a `HeadingNode`.
struct NodeBuilder {
    text: String,
    level: u8,
    content: Vec<String>,
    children: Vec<HeadingNode>,
    pages: Option<(usize, usize)>,
}

impl NodeBuilder {
    fn new(text: String, level: u8) -> Self {
        NodeBuilder {
            text,
            level,
            content: Vec::new(),
            children: Vec::new(),
            pages: None,
        }
    }

    /// Untitled holder for content that precedes the first heading.
    fn is_preface(&self) -> bool {
        self.level == 1 && self.text.is_empty()
    }

    fn append_text(&mut self, text: &str, page: usize) {
        self.content.push(text.to_string());
        self.update_pages(page, page);
    }

    fn add_child(&mut self, child: HeadingNode) {
        if let Some((first, last)) = child.page_range {
            self.update_pages(first, last);
        }
        self.children.push(child);
    }

    fn update_pages(&mut self, first: usize, last: usize) {
        self.pages = Some(match self.pages {
            Some((a, b)) => (a.min(first), b.max(last)),
            None => (first, last),
        });
    }

    fn build(self) -> HeadingNode {
        HeadingNode {
            text: self.text,
            level: self.level,
            content: self.content,
            subsections: self.children,
            page_range: self.pages,
        }
    }
}

/// Classify every line and assemble the heading tree.
///
/// The root is synthetic (level 0, no text). Content that precedes the first
/// heading is gathered under an untitled level-1 node, so a document without
/// headings yields the root plus one content-only child, and an empty line
/// stream yields a root-only tree.
pub fn build_tree(lines: &[Line], median_font: f32, config: &HierarchyConfig) -> HeadingNode {
    let roles = classify_lines(lines, median_font, config);
    assemble_tree(lines, &roles)
}

/// Stack-based nesting of classified lines.
///
/// A heading at level L closes every open node at level >= L, each becoming a
/// child of the node beneath it, and is then pushed on top. Levels therefore
/// strictly increase from the root down any chain.
pub fn assemble_tree(lines: &[Line], roles: &[LineRole]) -> HeadingNode {
    // stack[0] is the root and is never popped before the final unwind.
    let mut stack: Vec<NodeBuilder> = vec![NodeBuilder::new(String::new(), 0)];

    for (line, role) in lines.iter().zip(roles) {
        let page = line.page_number();
        match role {
            LineRole::Heading(level) => {
                let lvl = level.as_u8();
                while stack.len() > 1 {
                    let top = &stack[stack.len() - 1];
                    if top.level < lvl && !top.is_preface() {
                        break;
                    }
                    close_top(&mut stack);
                }
                let mut builder = NodeBuilder::new(line.text.clone(), lvl);
                builder.update_pages(page, page);
                stack.push(builder);
            }
            LineRole::Content => {
                if stack.len() == 1 {
                    stack.push(NodeBuilder::new(String::new(), HeadingLevel::H1.as_u8()));
                }
                if let Some(top) = stack.last_mut() {
                    top.append_text(&line.text, page);
                }
            }
        }
    }

    while stack.len() > 1 {
        close_top(&mut stack);
    }
    match stack.pop() {
        Some(root) => root.build(),
        None => HeadingNode::root(),
    }
}

fn close_top(stack: &mut Vec<NodeBuilder>) {
    if let Some(builder) = stack.pop() {
        let finished = builder.build();
        if let Some(parent) = stack.last_mut() {
            parent.add_child(finished);
        }
    }
}

/// Build a flat index of all titled nodes with breadcrumb paths.
///
/// Ids are `n-{level}-{k}` where `k` counts titled nodes of that level in
/// document order.
pub fn build_tree_index(root: &HeadingNode) -> TreeIndex {
    let entries = titled_nodes(root)
        .into_iter()
        .map(|(id, path, node)| IndexEntry {
            id,
            level: HeadingLevel::try_from(node.level).unwrap_or(HeadingLevel::H1),
            title: node.text.clone(),
            path,
            page_range: node.page_range,
        })
        .collect();
    TreeIndex { entries }
}

/// Look up a node by the id [`build_tree_index`] assigned to it.
pub fn find_node<'a>(root: &'a HeadingNode, id: &NodeId) -> Option<&'a HeadingNode> {
    titled_nodes(root)
        .into_iter()
        .find(|(node_id, _, _)| node_id == id)
        .map(|(_, _, node)| node)
}

fn titled_nodes(root: &HeadingNode) -> Vec<(NodeId, Vec<String>, &HeadingNode)> {
    let mut counters = [0usize; 7];
    let mut out = Vec::new();
    for child in &root.subsections {
        flatten_node(child, &[], &mut counters, &mut out);
    }
    out
}

/// Recursively flatten a node tree, accumulating breadcrumb paths.
fn flatten_node<'a>(
    node: &'a HeadingNode,
    parent_path: &[String],
    counters: &mut [usize; 7],
    out: &mut Vec<(NodeId, Vec<String>, &'a HeadingNode)>,
) {
    let mut path = parent_path.to_vec();
    if !node.text.is_empty() {
        path.push(node.text.clone());
        let lvl = node.level.clamp(1, 6);
        let idx = counters[lvl as usize];
        counters[lvl as usize] += 1;
        out.push((NodeId::new(lvl, idx), path.clone(), node));
    }
    for child in &node.subsections {
        flatten_node(child, &path, counters, out);
    }
}
