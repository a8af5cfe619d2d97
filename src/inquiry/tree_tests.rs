//! Unit tests for the inquiry tree model, parser and traversals.

use pretty_assertions::assert_eq;

use super::*;
use crate::error::InquiryError;

fn sample_tree() -> InquiryNode {
    InquiryNode::with_children(
        "Is X ethical?",
        vec![
            InquiryNode::with_children(
                "Who is affected?",
                vec![
                    InquiryNode::leaf("Workers"),
                    InquiryNode::leaf("Consumers"),
                ],
            ),
            InquiryNode::leaf("What are the alternatives?"),
        ],
    )
}

fn chain(depth: usize) -> String {
    let mut json = r#"{"node": "leaf", "children": []}"#.to_string();
    for level in 1..depth {
        json = format!(r#"{{"node": "level {}", "children": [{}]}}"#, level, json);
    }
    json
}

// ============================================================================
// Depth and counting
// ============================================================================

#[test]
fn test_leaf_depth_is_one() {
    assert_eq!(InquiryNode::leaf("q").depth(), 1);
}

#[test]
fn test_depth_uses_deepest_branch() {
    assert_eq!(sample_tree().depth(), 3);
}

#[test]
fn test_tree_depth_of_absent_tree_is_zero() {
    assert_eq!(tree_depth(None), 0);
    assert_eq!(tree_depth(Some(&sample_tree())), 3);
}

#[test]
fn test_node_count() {
    assert_eq!(sample_tree().node_count(), 5);
    assert_eq!(InquiryNode::leaf("q").node_count(), 1);
}

// ============================================================================
// Traversals
// ============================================================================

#[test]
fn test_preorder_order() {
    let tree = sample_tree();
    let labels: Vec<&str> = tree.preorder().map(|n| n.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "Is X ethical?",
            "Who is affected?",
            "Workers",
            "Consumers",
            "What are the alternatives?",
        ]
    );
}

#[test]
fn test_edges_in_preorder() {
    let tree = sample_tree();
    let edges: Vec<(&str, &str)> = tree.edges().collect();
    assert_eq!(
        edges,
        vec![
            ("Is X ethical?", "Who is affected?"),
            ("Who is affected?", "Workers"),
            ("Who is affected?", "Consumers"),
            ("Is X ethical?", "What are the alternatives?"),
        ]
    );
}

#[test]
fn test_edges_count_is_node_count_minus_one() {
    let tree = sample_tree();
    assert_eq!(tree.edges().count(), tree.node_count() - 1);
    assert_eq!(InquiryNode::leaf("alone").edges().count(), 0);
}

#[test]
fn test_every_child_is_a_target_exactly_once() {
    let tree = sample_tree();
    let targets: Vec<&str> = tree.edges().map(|(_, child)| child).collect();
    for node in tree.preorder().skip(1) {
        assert_eq!(
            targets.iter().filter(|t| **t == node.label).count(),
            1,
            "{} should be targeted once",
            node.label
        );
    }
    assert!(!targets.contains(&"Is X ethical?"));
}

#[test]
fn test_edges_are_restartable() {
    let tree = sample_tree();
    let first: Vec<_> = tree.edges().collect();
    let second: Vec<_> = tree.edges().collect();
    assert_eq!(first, second);
}

#[test]
fn test_outline_levels() {
    let tree = sample_tree();
    let outline: Vec<(usize, &str)> = tree.outline().collect();
    assert_eq!(
        outline,
        vec![
            (0, "Is X ethical?"),
            (1, "Who is affected?"),
            (2, "Workers"),
            (2, "Consumers"),
            (1, "What are the alternatives?"),
        ]
    );
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_to_dot() {
    let tree = InquiryNode::with_children("root", vec![InquiryNode::leaf("say \"hi\"")]);
    assert_eq!(
        tree.to_dot(),
        "digraph G {\n\"root\" -> \"say \\\"hi\\\"\";\n}"
    );
}

#[test]
fn test_to_dot_single_node() {
    assert_eq!(InquiryNode::leaf("root").to_dot(), "digraph G {\n\"root\";\n}");
}

#[test]
fn test_to_html_list_nests_and_escapes() {
    let tree = InquiryNode::with_children("A & B", vec![InquiryNode::leaf("<C>")]);
    assert_eq!(
        tree.to_html_list(),
        "<li><strong>A &amp; B</strong><ul><li><strong>&lt;C&gt;</strong></li></ul></li>"
    );
}

// ============================================================================
// Parsing
// ============================================================================

#[test]
fn test_parse_object_root() {
    let raw = r#"{"node":"Is X ethical?","children":[{"node":"A","children":[]},{"node":"B","children":[]}]}"#;
    let tree = parse_tree(raw).unwrap();
    assert_eq!(tree.label, "Is X ethical?");
    assert_eq!(tree.children.len(), 2);
    assert_eq!(tree.depth(), 2);
}

#[test]
fn test_parse_list_root_takes_first_element() {
    let raw = r#"[{"node":"first","children":[]},{"node":"second","children":[]}]"#;
    let tree = parse_tree(raw).unwrap();
    assert_eq!(tree, InquiryNode::leaf("first"));
}

#[test]
fn test_parse_accepts_label_alias_and_missing_children() {
    let raw = r#"{"label":"root","children":[{"label":"child"}]}"#;
    let tree = parse_tree(raw).unwrap();
    assert_eq!(
        tree,
        InquiryNode::with_children("root", vec![InquiryNode::leaf("child")])
    );
}

#[test]
fn test_parse_null_children_is_leaf() {
    let tree = parse_tree(r#"{"node":"root","children":null}"#).unwrap();
    assert!(tree.is_leaf());
}

#[test]
fn test_parse_fenced_reply() {
    let raw = "```json\n{\"node\": \"root\", \"children\": []}\n```";
    assert_eq!(parse_tree(raw).unwrap(), InquiryNode::leaf("root"));
}

#[test]
fn test_parse_not_json_is_malformed() {
    let err = parse_tree("not json").unwrap_err();
    assert!(matches!(err, InquiryError::MalformedTree { .. }));
}

#[test]
fn test_parse_empty_list_is_malformed() {
    let err = parse_tree("[]").unwrap_err();
    assert!(matches!(err, InquiryError::MalformedTree { .. }));
}

#[test]
fn test_parse_list_of_strings_is_malformed() {
    let err = parse_tree(r#"["a", "b"]"#).unwrap_err();
    assert!(matches!(err, InquiryError::MalformedTree { .. }));
}

#[test]
fn test_parse_missing_label_is_malformed() {
    let err = parse_tree(r#"{"children": []}"#).unwrap_err();
    assert!(err.to_string().contains("missing"));
}

#[test]
fn test_parse_non_string_label_is_malformed() {
    let err = parse_tree(r#"{"node": 3}"#).unwrap_err();
    assert!(matches!(err, InquiryError::MalformedTree { .. }));
}

#[test]
fn test_parse_children_not_list_is_malformed() {
    let err = parse_tree(r#"{"node": "root", "children": "A, B"}"#).unwrap_err();
    assert!(err.to_string().contains("must be a list"));
}

#[test]
fn test_parse_child_not_object_is_malformed() {
    let err = parse_tree(r#"{"node": "root", "children": ["A"]}"#).unwrap_err();
    assert!(matches!(err, InquiryError::MalformedTree { .. }));
}

#[test]
fn test_parse_depth_limit() {
    assert_eq!(parse_tree_with_limit(&chain(4), 4).unwrap().depth(), 4);

    let err = parse_tree_with_limit(&chain(5), 4).unwrap_err();
    assert!(matches!(err, InquiryError::DepthExceeded { max_depth: 4 }));
}

#[test]
fn test_parse_default_depth_limit() {
    assert!(parse_tree(&chain(DEFAULT_MAX_TREE_DEPTH)).is_ok());
    assert!(parse_tree(&chain(DEFAULT_MAX_TREE_DEPTH + 1)).is_err());
}

#[test]
fn test_parse_serialize_round_trip() {
    let tree = sample_tree();
    let serialized = serde_json::to_string(&tree).unwrap();
    assert!(serialized.contains("\"node\""));
    assert_eq!(parse_tree(&serialized).unwrap(), tree);
}

#[test]
fn test_serde_round_trip() {
    let tree = sample_tree();
    let value = serde_json::to_value(&tree).unwrap();
    let back: InquiryNode = serde_json::from_value(value).unwrap();
    assert_eq!(back, tree);
}
