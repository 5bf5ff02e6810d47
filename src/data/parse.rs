use anyhow::{Context, Result};
use serde_json::Value;

use super::graph::{Edge, GraphData, Node, NodeId, NodeKind};

pub(super) fn parse_graph_json(raw: &str) -> Result<GraphData> {
    let parsed: Value = serde_json::from_str(raw).context("invalid graph JSON")?;
    Ok(graph_from_value(&parsed))
}

/// Lenient by contract: malformed records are skipped, never fatal.
pub(super) fn graph_from_value(value: &Value) -> GraphData {
    let nodes = value
        .get("nodes")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_node).collect())
        .unwrap_or_default();

    let edges = value
        .get("edges")
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(parse_edge).collect())
        .unwrap_or_default();

    GraphData { nodes, edges }
}

fn parse_id(value: Option<&Value>) -> Option<NodeId> {
    match value? {
        Value::String(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| NodeId::new(trimmed))
        }
        Value::Number(number) => number.as_f64().and_then(NodeId::from_number),
        _ => None,
    }
}

fn parse_node(value: &Value) -> Option<Node> {
    let object = value.as_object()?;
    let id = parse_id(object.get("id"))?;
    let kind = object
        .get("type")
        .and_then(Value::as_str)
        .map(NodeKind::parse)
        .unwrap_or_else(|| NodeKind::Other(String::new()));
    let label = object
        .get("label")
        .and_then(Value::as_str)
        .or_else(|| object.get("name").and_then(Value::as_str))
        .map(str::to_owned)
        .unwrap_or_else(|| id.to_string());
    let active = object.get("active").and_then(Value::as_bool).unwrap_or(true);

    Some(Node {
        id,
        kind,
        label,
        active,
    })
}

fn parse_edge(value: &Value) -> Option<Edge> {
    let object = value.as_object()?;
    let from = parse_id(object.get("from"))?;
    let to = parse_id(object.get("to"))?;
    let ratio = parse_ratio(object.get("ratio"));
    let count = object
        .get("count")
        .and_then(Value::as_f64)
        .filter(|count| count.is_finite() && *count >= 0.0)
        .map(|count| count as u32);

    Some(Edge {
        from,
        to,
        ratio,
        count,
    })
}

/// Numbers pass through; strings like `"22.0%"` keep only digits and dots.
fn parse_ratio(value: Option<&Value>) -> f32 {
    match value {
        Some(Value::Number(number)) => number
            .as_f64()
            .filter(|ratio| ratio.is_finite())
            .unwrap_or(0.0) as f32,
        Some(Value::String(text)) => {
            let cleaned = text
                .chars()
                .filter(|ch| ch.is_ascii_digit() || *ch == '.')
                .collect::<String>();
            cleaned.parse::<f32>().unwrap_or(0.0)
        }
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_mixed_id_shapes() {
        let graph = graph_from_value(&json!({
            "nodes": [
                {"id": 1, "type": "Company", "label": "Alpha"},
                {"id": "2", "type": "person", "name": "Kim"},
            ],
            "edges": [{"from": "2", "to": 1.0, "ratio": 12.5}],
        }));

        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[1].label, "Kim");
        assert_eq!(graph.edges[0].to, NodeId::from("1"));
        assert_eq!(graph.edges[0].from, graph.nodes[1].id);
    }

    #[test]
    fn non_array_collections_yield_empty_graph() {
        let graph = graph_from_value(&json!({"nodes": "oops", "edges": 7}));
        assert!(graph.nodes.is_empty());
        assert!(graph.edges.is_empty());
    }

    #[test]
    fn records_without_ids_are_skipped() {
        let graph = graph_from_value(&json!({
            "nodes": [{"type": "company"}, null, {"id": "", "type": "company"}, {"id": "a"}],
            "edges": [{"from": "a"}, {"from": "a", "to": "b", "ratio": null}],
        }));

        assert_eq!(graph.nodes.len(), 1);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.edges[0].ratio, 0.0);
    }

    #[test]
    fn ratio_strings_are_cleaned() {
        assert_eq!(parse_ratio(Some(&json!("22.0%"))), 22.0);
        assert_eq!(parse_ratio(Some(&json!(" 3.2 %"))), 3.2);
        assert_eq!(parse_ratio(Some(&json!("n/a"))), 0.0);
        assert_eq!(parse_ratio(None), 0.0);
    }

    #[test]
    fn inactive_flag_is_read() {
        let graph = graph_from_value(&json!({
            "nodes": [{"id": "a", "type": "company", "active": false}],
            "edges": [],
        }));
        assert!(!graph.nodes[0].active);
    }
}
