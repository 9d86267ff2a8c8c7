//! Structural edits for designer tooling
//!
//! Edits address nodes by `id` or `data-obj-id` and return a new root. Only
//! the path from the root to the edited node is rebuilt; every other subtree
//! keeps its `Arc`. When nothing matches, the input root is returned as is.

use std::sync::Arc;

use super::{Schema, SchemaNode};

enum Edit {
    Keep,
    Replace(Schema),
    Remove,
}

fn rewrite(schema: &Schema, op: &mut dyn FnMut(&Arc<SchemaNode>) -> Edit) -> Edit {
    match schema {
        Schema::List(items) => {
            let mut changed = false;
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                match rewrite(item, op) {
                    Edit::Keep => out.push(item.clone()),
                    Edit::Replace(replacement) => {
                        changed = true;
                        out.push(replacement);
                    }
                    Edit::Remove => changed = true,
                }
            }
            if changed {
                Edit::Replace(Schema::List(out))
            } else {
                Edit::Keep
            }
        }
        Schema::Node(node) => {
            match op(node) {
                Edit::Keep => {}
                decided => return decided,
            }
            let rebuilt = node.map_children(&mut |child| match rewrite(child, op) {
                Edit::Keep => None,
                Edit::Replace(replacement) => Some(replacement),
                // A single child slot cannot shrink, so it is emptied
                Edit::Remove => Some(Schema::Null),
            });
            match rebuilt {
                Some(node) => Edit::Replace(Schema::node(node)),
                None => Edit::Keep,
            }
        }
        _ => Edit::Keep,
    }
}

fn apply(root: &Schema, op: &mut dyn FnMut(&Arc<SchemaNode>) -> Edit) -> Schema {
    match rewrite(root, op) {
        Edit::Keep => root.clone(),
        Edit::Replace(replacement) => replacement,
        Edit::Remove => Schema::Null,
    }
}

/// Depth-first search for the first node matching `key`
pub fn find_node(root: &Schema, key: &str) -> Option<Arc<SchemaNode>> {
    match root {
        Schema::List(items) => items.iter().find_map(|item| find_node(item, key)),
        Schema::Node(node) => {
            if node.matches_key(key) {
                return Some(Arc::clone(node));
            }
            node.children()
                .into_iter()
                .find_map(|child| find_node(child, key))
        }
        _ => None,
    }
}

/// Replace the first node matching `key` with `f(node)`
pub fn update_node<F>(root: &Schema, key: &str, f: F) -> Schema
where
    F: FnOnce(&SchemaNode) -> SchemaNode,
{
    let mut f = Some(f);
    apply(root, &mut |node| {
        if !node.matches_key(key) {
            return Edit::Keep;
        }
        match f.take() {
            Some(f) => Edit::Replace(Schema::node(f(node))),
            None => Edit::Keep,
        }
    })
}

/// Remove every node matching `key`
pub fn remove_node(root: &Schema, key: &str) -> Schema {
    apply(root, &mut |node| {
        if node.matches_key(key) {
            Edit::Remove
        } else {
            Edit::Keep
        }
    })
}

/// Insert `child` into the `children` slot of the node matching `parent_key`
///
/// `index` is clamped to the current child count. Parents whose kind has no
/// `children` slot are left unchanged.
pub fn insert_child(root: &Schema, parent_key: &str, index: usize, child: Schema) -> Schema {
    let mut child = Some(child);
    apply(root, &mut |node| {
        if !node.matches_key(parent_key) || !node.accepts_children() {
            return Edit::Keep;
        }
        let Some(child) = child.take() else {
            return Edit::Keep;
        };
        let mut items = match node.children_slot() {
            None | Some(Schema::Null) => Vec::new(),
            Some(Schema::List(items)) => items.clone(),
            Some(single) => vec![single.clone()],
        };
        let at = index.min(items.len());
        items.insert(at, child);
        match node.with_children(Schema::List(items)) {
            Some(updated) => Edit::Replace(Schema::node(updated)),
            None => Edit::Keep,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TextSchema;
    use serde_json::json;

    fn doc() -> Schema {
        Schema::from_value(json!({
            "type": "page",
            "id": "root",
            "children": [
                {"type": "container", "data-obj-id": "left", "children": [
                    {"type": "text", "id": "greeting", "content": "Hello"}
                ]},
                {"type": "container", "data-obj-id": "right", "children": [
                    {"type": "text", "content": "Untouched"}
                ]},
                {"type": "dashboard", "widgets": [
                    {"id": "w1", "component": {"type": "text", "id": "metric", "content": "1"}}
                ]}
            ]
        }))
        .unwrap()
    }

    fn child(root: &Schema, index: usize) -> Schema {
        match root.as_node().and_then(|n| n.children_slot()) {
            Some(Schema::List(items)) => items[index].clone(),
            other => panic!("unexpected children {:?}", other),
        }
    }

    fn same_arc(a: &Schema, b: &Schema) -> bool {
        match (a, b) {
            (Schema::Node(a), Schema::Node(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    #[test]
    fn test_find_by_id_and_designer_id() {
        let root = doc();
        assert!(find_node(&root, "greeting").is_some());
        assert_eq!(find_node(&root, "right").unwrap().type_name(), "container");
        assert_eq!(find_node(&root, "metric").unwrap().type_name(), "text");
        assert!(find_node(&root, "missing").is_none());
    }

    #[test]
    fn test_update_shares_untouched_subtrees() {
        let root = doc();
        let updated = update_node(&root, "greeting", |_| {
            SchemaNode::Text(TextSchema {
                content: Some("Bonjour".into()),
                ..Default::default()
            })
        });

        assert!(!same_arc(&root, &updated));
        assert!(!same_arc(&child(&root, 0), &child(&updated, 0)));
        assert!(same_arc(&child(&root, 1), &child(&updated, 1)));
        assert!(same_arc(&child(&root, 2), &child(&updated, 2)));

        let greeting = find_node(&updated, "greeting");
        assert!(greeting.is_none(), "replacement node has no id");
        assert!(updated.to_value().to_string().contains("Bonjour"));
        // The input tree is not modified
        assert!(root.to_value().to_string().contains("Hello"));
    }

    #[test]
    fn test_update_without_match_returns_same_root() {
        let root = doc();
        let updated = update_node(&root, "nope", |n| n.clone());
        assert!(same_arc(&root, &updated));
    }

    #[test]
    fn test_update_inside_dashboard_widget() {
        let root = doc();
        let updated = update_node(&root, "metric", |_| {
            SchemaNode::Text(TextSchema {
                content: Some("2".into()),
                ..Default::default()
            })
        });
        let value = updated.to_value();
        assert_eq!(
            value["children"][2]["widgets"][0]["component"]["content"],
            json!("2")
        );
        assert_eq!(value["children"][2]["widgets"][0]["id"], json!("w1"));
    }

    #[test]
    fn test_remove_from_list() {
        let root = doc();
        let updated = remove_node(&root, "right");
        let value = updated.to_value();
        assert_eq!(value["children"].as_array().unwrap().len(), 2);
        assert!(find_node(&updated, "right").is_none());
    }

    #[test]
    fn test_insert_child_clamps_index() {
        let root = doc();
        let updated = insert_child(
            &root,
            "left",
            99,
            Schema::from_value(json!({"type": "text", "id": "added", "content": "!"})).unwrap(),
        );
        let value = updated.to_value();
        let left_children = value["children"][0]["children"].as_array().unwrap();
        assert_eq!(left_children.len(), 2);
        assert_eq!(left_children[1]["id"], json!("added"));
    }

    #[test]
    fn test_insert_into_leaf_is_noop() {
        let root = doc();
        let updated = insert_child(&root, "greeting", 0, Schema::text("x"));
        assert!(same_arc(&root, &updated));
    }
}
