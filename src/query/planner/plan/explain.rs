//! 计划描述（explain 输出）
//!
//! 节点描述是扁平的 JSON 对象：公共字段 `type`、`id`、`dependencies`、
//! `estimatedCost`、`estimatedNrItems`，其余为节点类型相关字段。

use serde::{Deserialize, Serialize};
use serde_json::{json, Map};

use crate::core::types::{NodeId, VariableId, VariableRegistry};
use crate::core::Value;
use crate::query::optimizer::cost::PlanCost;
use crate::query::planner::plan::execution_plan::ExecutionPlan;
use crate::query::planner::plan::node::{PlanNode, PlanNodeKind, SortPath};
use crate::query::planner::plan::walker::WalkOrder;

/// 单个节点的描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanNodeDescription {
    #[serde(rename = "type")]
    pub node_type: String,
    pub id: NodeId,
    pub dependencies: Vec<NodeId>,
    pub estimated_cost: f64,
    pub estimated_nr_items: u64,
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

impl PlanNodeDescription {
    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.get(key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionDescription {
    pub name: String,
    /// `read` 或 `write`
    #[serde(rename = "type")]
    pub access: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableDescription {
    pub id: VariableId,
    pub name: String,
}

/// 整个计划的描述
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanDescription {
    pub nodes: Vec<PlanNodeDescription>,
    pub rules: Vec<String>,
    pub collections: Vec<CollectionDescription>,
    pub variables: Vec<VariableDescription>,
    pub estimated_cost: f64,
    pub estimated_nr_items: u64,
}

impl PlanDescription {
    /// 顶层节点的类型序列
    pub fn node_types(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.node_type.as_str()).collect()
    }

    /// 第一个指定类型的节点
    pub fn find(&self, node_type: &str) -> Option<&PlanNodeDescription> {
        self.nodes.iter().find(|n| n.node_type == node_type)
    }
}

/// 生成计划描述
pub fn describe(plan: &ExecutionPlan, cost: &PlanCost, rules: &[String]) -> PlanDescription {
    let registry = plan.variables();
    let nodes = describe_chain(plan, plan.root(), cost, registry);

    let mut collections: Vec<CollectionDescription> = Vec::new();
    for node in plan.walk_subqueries(WalkOrder::Dependency) {
        if let Some(name) = node.kind.collection() {
            let access = if node.node_type().is_modification() {
                "write"
            } else {
                "read"
            };
            match collections.iter_mut().find(|c| c.name == name) {
                Some(existing) => {
                    if access == "write" {
                        existing.access = access.to_string();
                    }
                }
                None => collections.push(CollectionDescription {
                    name: name.to_string(),
                    access: access.to_string(),
                }),
            }
        }
    }

    PlanDescription {
        nodes,
        rules: rules.to_vec(),
        collections,
        variables: registry
            .iter()
            .map(|v| VariableDescription {
                id: v.id,
                name: v.name.clone(),
            })
            .collect(),
        estimated_cost: cost.total_cost,
        estimated_nr_items: cost.output_rows.round().max(0.0) as u64,
    }
}

fn describe_chain(
    plan: &ExecutionPlan,
    terminal: Option<NodeId>,
    cost: &PlanCost,
    registry: &VariableRegistry,
) -> Vec<PlanNodeDescription> {
    let Some(terminal) = terminal else {
        return Vec::new();
    };
    plan.walk_from(terminal, WalkOrder::Dependency)
        .map(|node| describe_node(plan, node, cost, registry))
        .collect()
}

fn variable_json(registry: &VariableRegistry, variable: VariableId) -> Value {
    json!({ "id": variable, "name": registry.name(variable) })
}

fn optional_variable_json(registry: &VariableRegistry, variable: Option<VariableId>) -> Value {
    variable
        .map(|v| variable_json(registry, v))
        .unwrap_or(Value::Null)
}

fn sort_path_json(registry: &VariableRegistry, element: &SortPath) -> Value {
    json!({
        "inVariable": variable_json(registry, element.variable),
        "attributePath": element.path,
        "ascending": element.ascending,
    })
}

fn describe_node(
    plan: &ExecutionPlan,
    node: &PlanNode,
    cost: &PlanCost,
    registry: &VariableRegistry,
) -> PlanNodeDescription {
    let estimate = cost.nodes.get(&node.id).copied().unwrap_or_default();
    let var = |v: VariableId| variable_json(registry, v);
    let opt = |v: Option<VariableId>| optional_variable_json(registry, v);

    let details = match &node.kind {
        PlanNodeKind::Singleton | PlanNodeKind::NoResults | PlanNodeKind::Scatter => json!({}),
        PlanNodeKind::EnumerateCollection {
            collection,
            out,
            random,
        } => json!({
            "collection": collection,
            "outVariable": var(*out),
            "random": random,
        }),
        PlanNodeKind::Index {
            collection,
            out,
            index,
            condition,
            reverse,
            ordered,
        } => json!({
            "collection": collection,
            "outVariable": var(*out),
            "indexes": [index],
            "condition": condition.to_explain_json(registry),
            "reverse": reverse,
            "sorted": !ordered.is_empty(),
        }),
        PlanNodeKind::EnumerateList { input, out } => json!({
            "inVariable": var(*input),
            "outVariable": var(*out),
        }),
        PlanNodeKind::Calculation { out, expression } => json!({
            "outVariable": var(*out),
            "expression": expression.to_explain_json(registry),
            "canThrow": expression.can_throw(),
            "deterministic": expression.is_deterministic(),
        }),
        PlanNodeKind::Filter { input } => json!({ "inVariable": var(*input) }),
        PlanNodeKind::Sort { elements, stable } => json!({
            "elements": elements
                .iter()
                .map(|e| json!({ "inVariable": var(e.variable), "ascending": e.ascending }))
                .collect::<Vec<_>>(),
            "stable": stable,
        }),
        PlanNodeKind::Limit {
            offset,
            count,
            full_count,
        } => json!({
            "offset": offset,
            "limit": count,
            "fullCount": full_count,
        }),
        PlanNodeKind::Collect {
            groups,
            aggregates,
            into,
        } => json!({
            "groups": groups
                .iter()
                .map(|g| json!({ "outVariable": var(g.out), "inVariable": var(g.input) }))
                .collect::<Vec<_>>(),
            "aggregates": aggregates
                .iter()
                .map(|a| json!({
                    "outVariable": var(a.out),
                    "inVariable": opt(a.input),
                    "type": a.function.name(),
                }))
                .collect::<Vec<_>>(),
            "outVariable": opt(into.map(|i| i.out)),
            "expressionVariable": opt(into.and_then(|i| i.projection)),
        }),
        PlanNodeKind::Subquery { root, out } => {
            let body = describe_chain(plan, Some(*root), cost, registry);
            json!({
                "outVariable": var(*out),
                "subquery": { "nodes": body },
            })
        }
        PlanNodeKind::Return { input } => json!({ "inVariable": var(*input) }),
        PlanNodeKind::Gather { elements } => json!({
            "elements": elements.iter().map(|e| sort_path_json(registry, e)).collect::<Vec<_>>(),
            "sortmode": if elements.is_empty() { "unset" } else { "minelement" },
        }),
        PlanNodeKind::Distribute { collection, input } => json!({
            "collection": collection,
            "variable": var(*input),
        }),
        PlanNodeKind::Remote { collection, server } => json!({
            "collection": collection,
            "server": server,
        }),
        PlanNodeKind::Traversal {
            start,
            edge_collection,
            direction,
            min_depth,
            max_depth,
            vertex_out,
            edge_out,
            path_out,
        } => json!({
            "inVariable": var(*start),
            "edgeCollections": [edge_collection],
            "direction": direction.name(),
            "minDepth": min_depth,
            "maxDepth": max_depth,
            "vertexOutVariable": var(*vertex_out),
            "edgeOutVariable": opt(*edge_out),
            "pathOutVariable": opt(*path_out),
        }),
        PlanNodeKind::ShortestPath {
            start,
            target,
            edge_collection,
            direction,
            vertex_out,
            edge_out,
        } => json!({
            "startInVariable": var(*start),
            "targetInVariable": var(*target),
            "edgeCollections": [edge_collection],
            "direction": direction.name(),
            "vertexOutVariable": var(*vertex_out),
            "edgeOutVariable": opt(*edge_out),
        }),
        PlanNodeKind::Insert {
            collection,
            input,
            out_new,
            options,
        } => json!({
            "collection": collection,
            "inVariable": var(*input),
            "outVariableNew": opt(*out_new),
            "modificationFlags": options,
        }),
        PlanNodeKind::Update {
            collection,
            key,
            input,
            out_old,
            out_new,
            options,
        }
        | PlanNodeKind::Replace {
            collection,
            key,
            input,
            out_old,
            out_new,
            options,
        } => json!({
            "collection": collection,
            "inKeyVariable": opt(*key),
            "inDocVariable": var(*input),
            "outVariableOld": opt(*out_old),
            "outVariableNew": opt(*out_new),
            "modificationFlags": options,
        }),
        PlanNodeKind::Remove {
            collection,
            input,
            out_old,
            options,
        } => json!({
            "collection": collection,
            "inVariable": var(*input),
            "outVariableOld": opt(*out_old),
            "modificationFlags": options,
        }),
        PlanNodeKind::Upsert {
            collection,
            search,
            insert,
            update,
            replace,
            out_new,
            options,
        } => json!({
            "collection": collection,
            "inDocVariable": var(*search),
            "insertVariable": var(*insert),
            "updateVariable": var(*update),
            "isReplace": replace,
            "outVariableNew": opt(*out_new),
            "modificationFlags": options,
        }),
    };

    let details = match details {
        Value::Object(map) => map,
        _ => Map::new(),
    };

    PlanNodeDescription {
        node_type: node.node_type().name().to_string(),
        id: node.id,
        dependencies: node.dependencies.clone(),
        estimated_cost: estimate.total_cost,
        estimated_nr_items: estimate.output_rows.round().max(0.0) as u64,
        details,
    }
}
