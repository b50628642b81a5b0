//! Box-drawing outline of a walked tree

use crate::tree::{FileTree, NodeBody, NodeId, TreeNode};

/// Render the tree as an indented outline. Directories carry a trailing
/// `/`, symlinks show their target and excluded entries their reason.
pub fn render_outline(tree: &FileTree) -> String {
    let mut output = String::new();
    let root = tree.node(tree.root());
    output.push_str(tree.root_label());
    push_annotation(&mut output, root);
    output.push('\n');

    let mut stack: Vec<(NodeId, String, bool)> = Vec::new();
    push_children(&mut stack, root, String::new());

    while let Some((id, prefix, is_last)) = stack.pop() {
        let node = tree.node(id);
        let connector = if is_last { "└── " } else { "├── " };

        output.push_str(&prefix);
        output.push_str(connector);
        output.push_str(&node.name);
        if node.is_dir() {
            output.push('/');
        }
        if let Some(target) = &node.link_target {
            output.push_str(" -> ");
            output.push_str(target);
        }
        push_annotation(&mut output, node);
        output.push('\n');

        let child_prefix = if is_last {
            format!("{}    ", prefix)
        } else {
            format!("{}│   ", prefix)
        };
        push_children(&mut stack, node, child_prefix);
    }

    output
}

/// Schedule children so the first one is popped next.
fn push_children(stack: &mut Vec<(NodeId, String, bool)>, node: &TreeNode, prefix: String) {
    let children = node.children();
    for (i, child) in children.iter().enumerate().rev() {
        stack.push((*child, prefix.clone(), i + 1 == children.len()));
    }
}

fn push_annotation(output: &mut String, node: &TreeNode) {
    let label = match &node.body {
        NodeBody::Excluded(exclusion) => exclusion.label(),
        NodeBody::Directory {
            error: Some(error), ..
        } => error.to_string(),
        _ => return,
    };
    output.push_str(" [");
    output.push_str(&label);
    output.push(']');
}
