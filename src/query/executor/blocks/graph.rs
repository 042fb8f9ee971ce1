//! 图执行块：遍历与最短路径
//!
//! 顶点用 `collection/key` 形式的 `_id` 寻址，边文档带 `_from`/`_to`。

use std::collections::{HashMap, HashSet, VecDeque};

use serde_json::json;

use crate::core::error::QueryResult;
use crate::core::types::VariableId;
use crate::core::Value;
use crate::query::executor::context::{ExecutionContext, Row};
use crate::storage::Direction;

use super::{register, set_register, ExecutionBlock, ExpandingBlock, RowExpander};

/// 起点/终点变量的顶点 id：字符串本身或对象的 `_id`
fn vertex_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map.get("_id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}

fn fetch_vertex(ctx: &ExecutionContext, id: &str) -> QueryResult<Value> {
    let Some((collection, key)) = id.split_once('/') else {
        return Ok(Value::Null);
    };
    if !ctx.storage().collection_exists(collection) {
        return Ok(Value::Null);
    }
    Ok(ctx.storage().document(collection, key)?.unwrap_or(Value::Null))
}

/// 边的另一端
fn neighbor(edge: &Value, from: &str, direction: Direction) -> Option<String> {
    let attr = |name: &str| edge.get(name).and_then(Value::as_str).map(str::to_string);
    match direction {
        Direction::Outbound => attr("_to"),
        Direction::Inbound => attr("_from"),
        Direction::Any => {
            if attr("_from").as_deref() == Some(from) {
                attr("_to")
            } else {
                attr("_from")
            }
        }
    }
}

fn edges(ctx: &mut ExecutionContext, collection: &str, vertex: &str, direction: Direction) -> QueryResult<Vec<Value>> {
    let edges = ctx.storage().edges(collection, vertex, direction)?;
    ctx.stats.scanned_index += edges.len() as u64;
    Ok(edges)
}

/// 深度优先遍历，同一路径上不重复经过同一条边
#[derive(Debug)]
pub struct Traverser {
    start: VariableId,
    edge_collection: String,
    direction: Direction,
    min_depth: u64,
    max_depth: u64,
    vertex_out: VariableId,
    edge_out: Option<VariableId>,
    path_out: Option<VariableId>,
}

#[derive(Default)]
struct TraversalPath {
    ids: Vec<String>,
    vertices: Vec<Value>,
    edges: Vec<Value>,
}

impl Traverser {
    fn emit(&self, input: &Row, path: &TraversalPath, out: &mut Vec<Row>) {
        let mut row = input.clone();
        set_register(&mut row, self.vertex_out, path.vertices.last().cloned().unwrap_or(Value::Null));
        if let Some(edge_out) = self.edge_out {
            set_register(&mut row, edge_out, path.edges.last().cloned().unwrap_or(Value::Null));
        }
        if let Some(path_out) = self.path_out {
            set_register(
                &mut row,
                path_out,
                json!({"vertices": path.vertices, "edges": path.edges}),
            );
        }
        out.push(row);
    }

    fn visit(
        &self,
        ctx: &mut ExecutionContext,
        input: &Row,
        path: &mut TraversalPath,
        out: &mut Vec<Row>,
    ) -> QueryResult<()> {
        let depth = path.edges.len() as u64;
        if depth >= self.min_depth {
            self.emit(input, path, out);
        }
        if depth >= self.max_depth {
            return Ok(());
        }
        let Some(current) = path.ids.last().cloned() else {
            return Ok(());
        };
        for edge in edges(ctx, &self.edge_collection, &current, self.direction)? {
            let edge_id = edge.get("_id").cloned();
            if path.edges.iter().any(|e| e.get("_id").cloned() == edge_id) {
                continue;
            }
            let Some(next) = neighbor(&edge, &current, self.direction) else {
                continue;
            };
            let vertex = fetch_vertex(ctx, &next)?;
            path.ids.push(next);
            path.vertices.push(vertex);
            path.edges.push(edge);
            self.visit(ctx, input, path, out)?;
            path.ids.pop();
            path.vertices.pop();
            path.edges.pop();
        }
        Ok(())
    }
}

impl RowExpander for Traverser {
    fn expand(&mut self, ctx: &mut ExecutionContext, input: Row) -> QueryResult<Vec<Row>> {
        let Some(start) = vertex_id(&register(&input, self.start)) else {
            return Ok(Vec::new());
        };
        let vertex = fetch_vertex(ctx, &start)?;
        if vertex.is_null() {
            return Ok(Vec::new());
        }
        let mut path = TraversalPath {
            ids: vec![start],
            vertices: vec![vertex],
            edges: Vec::new(),
        };
        let mut out = Vec::new();
        self.visit(ctx, &input, &mut path, &mut out)?;
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "TraversalBlock"
    }
}

pub type TraversalBlock = ExpandingBlock<Traverser>;

impl ExpandingBlock<Traverser> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        dependency: Box<dyn ExecutionBlock>,
        start: VariableId,
        edge_collection: impl Into<String>,
        direction: Direction,
        min_depth: u64,
        max_depth: u64,
        vertex_out: VariableId,
        edge_out: Option<VariableId>,
        path_out: Option<VariableId>,
    ) -> Self {
        Self::with_expander(
            dependency,
            Traverser {
                start,
                edge_collection: edge_collection.into(),
                direction,
                min_depth,
                max_depth,
                vertex_out,
                edge_out,
                path_out,
            },
        )
    }
}

/// 广度优先搜索最短路径，每个路径顶点输出一行
#[derive(Debug)]
pub struct PathFinder {
    start: VariableId,
    target: VariableId,
    edge_collection: String,
    direction: Direction,
    vertex_out: VariableId,
    edge_out: Option<VariableId>,
}

impl PathFinder {
    /// 返回从起点到终点的 (顶点 id, 进入该顶点的边) 序列
    fn search(
        &self,
        ctx: &mut ExecutionContext,
        start: &str,
        target: &str,
    ) -> QueryResult<Option<Vec<(String, Value)>>> {
        let mut parents: HashMap<String, (String, Value)> = HashMap::new();
        let mut visited: HashSet<String> = HashSet::from([start.to_string()]);
        let mut queue = VecDeque::from([start.to_string()]);

        while let Some(current) = queue.pop_front() {
            if current == target {
                let mut steps = Vec::new();
                let mut cursor = current;
                while let Some((parent, edge)) = parents.remove(&cursor) {
                    steps.push((cursor, edge));
                    cursor = parent;
                }
                steps.push((cursor, Value::Null));
                steps.reverse();
                return Ok(Some(steps));
            }
            for edge in edges(ctx, &self.edge_collection, &current, self.direction)? {
                let Some(next) = neighbor(&edge, &current, self.direction) else {
                    continue;
                };
                if visited.insert(next.clone()) {
                    parents.insert(next.clone(), (current.clone(), edge));
                    queue.push_back(next);
                }
            }
        }
        Ok(None)
    }
}

impl RowExpander for PathFinder {
    fn expand(&mut self, ctx: &mut ExecutionContext, input: Row) -> QueryResult<Vec<Row>> {
        let (Some(start), Some(target)) = (
            vertex_id(&register(&input, self.start)),
            vertex_id(&register(&input, self.target)),
        ) else {
            return Ok(Vec::new());
        };
        let Some(steps) = self.search(ctx, &start, &target)? else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(steps.len());
        for (id, edge) in steps {
            let mut row = input.clone();
            set_register(&mut row, self.vertex_out, fetch_vertex(ctx, &id)?);
            if let Some(edge_out) = self.edge_out {
                set_register(&mut row, edge_out, edge);
            }
            out.push(row);
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "ShortestPathBlock"
    }
}

pub type ShortestPathBlock = ExpandingBlock<PathFinder>;

impl ExpandingBlock<PathFinder> {
    pub fn new(
        dependency: Box<dyn ExecutionBlock>,
        start: VariableId,
        target: VariableId,
        edge_collection: impl Into<String>,
        direction: Direction,
        vertex_out: VariableId,
        edge_out: Option<VariableId>,
    ) -> Self {
        Self::with_expander(
            dependency,
            PathFinder {
                start,
                target,
                edge_collection: edge_collection.into(),
                direction,
                vertex_out,
                edge_out,
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::expression::Expression;
    use crate::query::executor::blocks::{drain, CalculationBlock, SingletonBlock};
    use crate::storage::{CollectionType, MemoryStorage};
    use std::sync::Arc;

    /// a -> b -> c -> d, a -> c
    fn graph() -> Arc<MemoryStorage> {
        let storage = MemoryStorage::new();
        storage.create_collection("v", CollectionType::Document).unwrap();
        storage.create_collection("e", CollectionType::Edge).unwrap();
        for key in ["a", "b", "c", "d"] {
            storage.insert_document("v", json!({"_key": key})).unwrap();
        }
        for (key, from, to) in [("ab", "a", "b"), ("bc", "b", "c"), ("cd", "c", "d"), ("ac", "a", "c")] {
            storage
                .insert_document(
                    "e",
                    json!({"_key": key, "_from": format!("v/{}", from), "_to": format!("v/{}", to)}),
                )
                .unwrap();
        }
        Arc::new(storage)
    }

    fn start(id: &str) -> Box<dyn ExecutionBlock> {
        Box::new(CalculationBlock::new(
            Box::new(SingletonBlock::new(4)),
            VariableId(0),
            Expression::literal(id),
        ))
    }

    fn keys(rows: &[Row], variable: usize) -> Vec<String> {
        rows.iter()
            .map(|r| r[variable]["_key"].as_str().unwrap_or("-").to_string())
            .collect()
    }

    #[test]
    fn test_traversal_depth_window() {
        let mut ctx = ExecutionContext::new(graph(), 1);
        let mut block = TraversalBlock::new(
            start("v/a"),
            VariableId(0),
            "e",
            Direction::Outbound,
            1,
            2,
            VariableId(1),
            Some(VariableId(2)),
            Some(VariableId(3)),
        );
        block.initialize(&mut ctx, &Vec::new()).unwrap();
        let rows = drain(&mut block, &mut ctx, 10).unwrap();
        let mut reached = keys(&rows, 1);
        reached.sort();
        assert_eq!(reached, vec!["b", "c", "c", "d"]);
        assert!(rows.iter().all(|r| r[3]["edges"].as_array().map(|e| e.len()).unwrap_or(0) >= 1));
    }

    #[test]
    fn test_traversal_depth_zero_emits_start() {
        let mut ctx = ExecutionContext::new(graph(), 1);
        let mut block = TraversalBlock::new(
            start("v/d"),
            VariableId(0),
            "e",
            Direction::Outbound,
            0,
            3,
            VariableId(1),
            Some(VariableId(2)),
            None,
        );
        block.initialize(&mut ctx, &Vec::new()).unwrap();
        let rows = drain(&mut block, &mut ctx, 10).unwrap();
        assert_eq!(keys(&rows, 1), vec!["d"]);
        assert_eq!(rows[0][2], Value::Null);
    }

    #[test]
    fn test_shortest_path() {
        let mut ctx = ExecutionContext::new(graph(), 1);
        let target = Box::new(CalculationBlock::new(start("v/a"), VariableId(1), Expression::literal("v/d")));
        let mut block = ShortestPathBlock::new(
            target,
            VariableId(0),
            VariableId(1),
            "e",
            Direction::Outbound,
            VariableId(2),
            Some(VariableId(3)),
        );
        block.initialize(&mut ctx, &Vec::new()).unwrap();
        let rows = drain(&mut block, &mut ctx, 10).unwrap();
        assert_eq!(keys(&rows, 2), vec!["a", "c", "d"]);
        assert_eq!(keys(&rows, 3), vec!["-", "ac", "cd"]);
    }

    #[test]
    fn test_shortest_path_unreachable() {
        let mut ctx = ExecutionContext::new(graph(), 1);
        let target = Box::new(CalculationBlock::new(start("v/d"), VariableId(1), Expression::literal("v/a")));
        let mut block =
            ShortestPathBlock::new(target, VariableId(0), VariableId(1), "e", Direction::Outbound, VariableId(2), None);
        block.initialize(&mut ctx, &Vec::new()).unwrap();
        assert!(drain(&mut block, &mut ctx, 10).unwrap().is_empty());
    }
}
