use crate::cleanup::join_lines;
use crate::types::HeadingNode;

/// Render a heading tree as Markdown.
///
/// Titled nodes become ATX headings at their own level; each node's content
/// lines are joined into one paragraph. The synthetic root renders only its
/// descendants.
pub fn render_tree(root: &HeadingNode) -> String {
    let mut output = String::new();
    render_node(root, &mut output);
    output.trim_end().to_string()
}

fn render_node(node: &HeadingNode, output: &mut String) {
    if node.level > 0 && !node.text.is_empty() {
        let hashes = "#".repeat(node.level.clamp(1, 6) as usize);
        output.push_str(&format!("{} {}\n\n", hashes, escape_markdown(&node.text)));
    }
    if !node.content.is_empty() {
        let paragraph = join_lines(node.content.iter().map(String::as_str)).replace('\n', " ");
        output.push_str(&escape_markdown(&paragraph));
        output.push_str("\n\n");
    }
    for child in &node.subsections {
        render_node(child, output);
    }
}

/// Escape Markdown special characters in text.
pub fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' | '`' | '*' | '_' | '[' | ']' | '|' | '#' => {
                result.push('\\');
                result.push(c);
            }
            _ => result.push(c),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(text: &str, level: u8, content: &[&str], subsections: Vec<HeadingNode>) -> HeadingNode {
        HeadingNode {
            text: text.to_string(),
            level,
            content: content.iter().map(|s| s.to_string()).collect(),
            subsections,
            page_range: None,
        }
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("Hello *world*"), "Hello \\*world\\*");
        assert_eq!(escape_markdown("[link]"), "\\[link\\]");
        assert_eq!(escape_markdown("plain text"), "plain text");
        assert_eq!(escape_markdown("a|b"), "a\\|b");
    }

    #[test]
    fn test_render_root_only() {
        assert_eq!(render_tree(&HeadingNode::root()), "");
    }

    #[test]
    fn test_render_nested_tree() {
        let mut root = HeadingNode::root();
        root.subsections.push(node(
            "MANAGEMENT DISCUSSION AND ANALYSIS",
            1,
            &["The economy grew.", "Demand was strong."],
            vec![node("Outlook", 2, &["We expect grow-", "th to continue."], vec![])],
        ));
        let md = render_tree(&root);
        assert_eq!(
            md,
            "# MANAGEMENT DISCUSSION AND ANALYSIS\n\nThe economy grew. Demand was strong.\n\n## Outlook\n\nWe expect growth to continue."
        );
    }

    #[test]
    fn test_untitled_node_renders_content_only() {
        let mut root = HeadingNode::root();
        root.subsections.push(node("", 1, &["Loose text"], vec![]));
        assert_eq!(render_tree(&root), "Loose text");
    }
}
