//! Building blocks for keyword pointer collectors.
//!
//! The keyword vocabulary is dialect-specific and supplied by the caller;
//! these constructors cover the three shapes keyword values come in, so a
//! dialect only has to name its keywords.

use serde_json::Value;

use crate::pointer::Pointer;
use crate::tree::SchemaTree;
use crate::walker::PointerCollector;

/// The keyword's value is itself a subschema (e.g. `not`, `items` in its
/// single-schema form).
pub fn self_value(keyword: impl Into<String>) -> Box<dyn PointerCollector> {
    let keyword = keyword.into();
    Box::new(move |_tree: &SchemaTree| vec![Pointer::root().append_token(keyword.clone())])
}

/// Each member of the keyword's object value is a subschema (e.g.
/// `properties`, `definitions`).
pub fn member_values(keyword: impl Into<String>) -> Box<dyn PointerCollector> {
    let keyword = keyword.into();
    Box::new(move |tree: &SchemaTree| {
        let base = Pointer::root().append_token(keyword.clone());
        keyword_value(tree, &keyword)
            .and_then(Value::as_object)
            .map(|map| map.keys().map(|key| base.append_token(key)).collect())
            .unwrap_or_default()
    })
}

/// Each element of the keyword's array value is a subschema (e.g. `anyOf`,
/// `allOf`, `oneOf`).
pub fn element_values(keyword: impl Into<String>) -> Box<dyn PointerCollector> {
    let keyword = keyword.into();
    Box::new(move |tree: &SchemaTree| {
        let base = Pointer::root().append_token(keyword.clone());
        keyword_value(tree, &keyword)
            .and_then(Value::as_array)
            .map(|arr| {
                (0..arr.len())
                    .map(|index| base.append_token(index.to_string()))
                    .collect()
            })
            .unwrap_or_default()
    })
}

fn keyword_value<'a>(tree: &'a SchemaTree, keyword: &str) -> Option<&'a Value> {
    tree.current()?.as_object()?.get(keyword)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Dereferencing;
    use serde_json::json;

    fn at_root(document: Value) -> SchemaTree {
        SchemaTree::anonymous(Dereferencing::Canonical, document)
    }

    #[test]
    fn self_value_points_at_the_keyword() {
        let tree = at_root(json!({"not": {"type": "string"}}));
        let pointers = self_value("not").collect(&tree);
        assert_eq!(pointers, vec![Pointer::parse("/not").unwrap()]);
    }

    #[test]
    fn member_values_lists_members_in_document_order() {
        let tree = at_root(json!({"properties": {"b": {}, "a": {}}}));
        let pointers = member_values("properties").collect(&tree);
        assert_eq!(
            pointers,
            vec![
                Pointer::parse("/properties/b").unwrap(),
                Pointer::parse("/properties/a").unwrap(),
            ]
        );
    }

    #[test]
    fn member_values_handles_non_object_value() {
        let tree = at_root(json!({"properties": 3}));
        assert!(member_values("properties").collect(&tree).is_empty());
    }

    #[test]
    fn element_values_indexes_the_array() {
        let tree = at_root(json!({"anyOf": [{}, {}]}));
        let pointers = element_values("anyOf").collect(&tree);
        assert_eq!(
            pointers,
            vec![
                Pointer::parse("/anyOf/0").unwrap(),
                Pointer::parse("/anyOf/1").unwrap(),
            ]
        );
    }

    #[test]
    fn escaped_member_names_survive() {
        let tree = at_root(json!({"properties": {"a/b": {}}}));
        let pointers = member_values("properties").collect(&tree);
        assert_eq!(pointers[0].to_string(), "/properties/a~1b");
    }
}
