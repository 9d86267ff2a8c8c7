//! Dashboard widget identity
//!
//! Widgets need an id before first render so layout state and designer
//! selection can follow them. Generated ids are derived from the widget
//! position (`widget-{index}`), so rendering the same document twice assigns
//! the same ids.

use std::collections::HashSet;
use std::sync::Arc;

use super::{DashboardSchema, DashboardWidget, SchemaNode};

impl DashboardSchema {
    /// Copy with ids assigned to widgets lacking one, or `None` when every
    /// widget already has an id
    pub fn with_widget_ids(&self) -> Option<DashboardSchema> {
        let widgets = self.widgets.as_ref()?;
        if widgets.iter().all(|w| has_id(w)) {
            return None;
        }

        let mut taken: HashSet<String> = widgets
            .iter()
            .filter(|w| has_id(w))
            .filter_map(|w| w.id.clone())
            .collect();

        let assigned = widgets
            .iter()
            .enumerate()
            .map(|(index, widget)| {
                if has_id(widget) {
                    return widget.clone();
                }
                let id = unique_id(index, &taken);
                taken.insert(id.clone());
                DashboardWidget {
                    id: Some(id),
                    ..widget.clone()
                }
            })
            .collect();

        Some(DashboardSchema {
            widgets: Some(assigned),
            ..self.clone()
        })
    }
}

/// Assign ids to dashboard widgets that lack one
///
/// Returns the same `Arc` when the node is not a dashboard or when no widget
/// needs an id, so downstream identity checks see no change.
pub fn ensure_widget_ids(node: &Arc<SchemaNode>) -> Arc<SchemaNode> {
    match node.as_ref() {
        SchemaNode::Dashboard(dashboard) => match dashboard.with_widget_ids() {
            Some(updated) => Arc::new(SchemaNode::Dashboard(updated)),
            None => Arc::clone(node),
        },
        _ => Arc::clone(node),
    }
}

fn has_id(widget: &DashboardWidget) -> bool {
    widget.id.as_deref().is_some_and(|id| !id.is_empty())
}

fn unique_id(index: usize, taken: &HashSet<String>) -> String {
    let base = format!("widget-{}", index);
    if !taken.contains(&base) {
        return base;
    }
    (1..)
        .map(|n| format!("{}-{}", base, n))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Schema;
    use proptest::prelude::*;
    use serde_json::json;

    fn dashboard(value: serde_json::Value) -> Arc<SchemaNode> {
        match Schema::from_value(value).unwrap() {
            Schema::Node(node) => node,
            other => panic!("expected node, got {:?}", other),
        }
    }

    fn widget_ids(node: &SchemaNode) -> Vec<Option<String>> {
        match node {
            SchemaNode::Dashboard(d) => d
                .widgets
                .iter()
                .flatten()
                .map(|w| w.id.clone())
                .collect(),
            _ => vec![],
        }
    }

    #[test]
    fn test_all_ids_present_returns_same_arc() {
        let node = dashboard(json!({
            "type": "dashboard",
            "widgets": [{"id": "a"}, {"id": "b"}]
        }));
        let result = ensure_widget_ids(&node);
        assert!(Arc::ptr_eq(&node, &result));
    }

    #[test]
    fn test_non_dashboard_returns_same_arc() {
        let node = dashboard(json!({"type": "text", "content": "hi"}));
        assert!(Arc::ptr_eq(&node, &ensure_widget_ids(&node)));
    }

    #[test]
    fn test_missing_ids_are_generated_without_collisions() {
        let node = dashboard(json!({
            "type": "dashboard",
            "widgets": [
                {"title": "first"},
                {"id": "widget-0", "title": "second"},
                {"id": "", "title": "third"}
            ]
        }));
        let result = ensure_widget_ids(&node);
        assert!(!Arc::ptr_eq(&node, &result));

        let ids = widget_ids(&result);
        assert_eq!(
            ids,
            vec![
                Some("widget-0-1".to_string()),
                Some("widget-0".to_string()),
                Some("widget-2".to_string()),
            ]
        );
    }

    #[test]
    fn test_generation_is_stable() {
        let node = dashboard(json!({
            "type": "dashboard",
            "widgets": [{"title": "a"}, {"title": "b"}]
        }));
        let first = ensure_widget_ids(&node);
        let second = ensure_widget_ids(&node);
        assert_eq!(first, second);

        // Already-normalized output is a fixed point
        let third = ensure_widget_ids(&first);
        assert!(Arc::ptr_eq(&first, &third));
    }

    proptest! {
        #[test]
        fn prop_ids_complete_unique_and_preserved(
            slots in proptest::collection::vec(
                proptest::option::of("[a-z]{1,3}|widget-[0-9]"),
                0..12,
            )
        ) {
            let widgets: Vec<serde_json::Value> = slots
                .iter()
                .enumerate()
                .map(|(i, id)| match id {
                    Some(id) => json!({"id": id, "title": format!("t{}", i)}),
                    None => json!({"title": format!("t{}", i)}),
                })
                .collect();
            let node = dashboard(json!({"type": "dashboard", "widgets": widgets}));
            let result = ensure_widget_ids(&node);

            if slots.iter().all(Option::is_some) {
                prop_assert!(Arc::ptr_eq(&node, &result));
            }

            let ids = widget_ids(&result);
            prop_assert!(ids.iter().all(Option::is_some));

            let SchemaNode::Dashboard(after) = result.as_ref() else {
                return Err(TestCaseError::fail("dashboard expected"));
            };
            let pairs = slots.iter().zip(after.widgets.iter().flatten());
            for (i, (slot, widget)) in pairs.enumerate() {
                prop_assert_eq!(widget.title.clone(), Some(format!("t{}", i)));
                if let Some(original) = slot {
                    prop_assert_eq!(widget.id.as_ref(), Some(original));
                }
            }

            // Generated ids never collide with each other or with existing ones
            let generated: Vec<&String> = slots
                .iter()
                .zip(ids.iter())
                .filter(|(slot, _)| slot.is_none())
                .filter_map(|(_, id)| id.as_ref())
                .collect();
            let unique: HashSet<&String> = generated.iter().copied().collect();
            prop_assert_eq!(unique.len(), generated.len());
            for id in &generated {
                prop_assert!(!slots.iter().flatten().any(|existing| existing == *id));
            }
        }
    }
}
