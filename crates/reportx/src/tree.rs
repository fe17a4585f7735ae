use structure::tree::{build_tree_index, find_node};
use structure::{HeadingNode, NodeId, SectionType, StructureConfig, TreeIndex};

use crate::prelude::{println, *};

#[derive(Debug, clap::Args, Clone)]
pub struct Options {
    /// Path to the input document (JSON)
    pub input: std::path::PathBuf,

    /// Render the tree as Markdown instead of JSON
    #[arg(long)]
    pub markdown: bool,

    /// Only the tree of a detected section: letter or mdna
    #[arg(long)]
    pub section: Option<String>,

    /// Only the subtree under a node id (e.g., "n-2-0")
    #[arg(long)]
    pub node: Option<String>,
}

#[derive(Debug, serde::Serialize)]
struct TreeOutput<'a> {
    tree: &'a HeadingNode,
    index: TreeIndex,
}

pub fn run(options: Options, config: &StructureConfig) -> Result<()> {
    let doc = crate::input::structure_file(&options.input, config)?;

    let tree = match &options.section {
        Some(name) => {
            let section_type = SectionType::parse(name)
                .map_err(|_| Error::UnknownSection(name.clone()))?;
            doc.section_tree(section_type)
                .ok_or_else(|| eyre!("{} section not found", section_type))?
        }
        None => &doc.tree,
    };
    let tree = select_node(tree, options.node.as_deref())?;

    if options.markdown {
        println!("{}", structure::render::render_tree(tree));
    } else {
        let output = TreeOutput {
            tree,
            index: build_tree_index(tree),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

fn select_node<'a>(tree: &'a HeadingNode, node: Option<&str>) -> Result<&'a HeadingNode> {
    let Some(raw) = node else {
        return Ok(tree);
    };
    let id = NodeId::parse(raw).map_err(|e| eyre!(e))?;
    find_node(tree, &id).ok_or_else(|| Error::NodeNotFound(raw.to_string()).into())
}
