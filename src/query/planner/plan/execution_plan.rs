//! 执行计划
//!
//! 节点存放在以 `NodeId` 为键的 arena 中，依赖关系是显式的 id 列表。
//! 子查询体与主查询共用同一个 arena，只通过 SubqueryNode 的 `root` 引用。
//!
//! 所有结构性修改都在修改前完成检查，失败时计划保持原样。

use serde::{Deserialize, Serialize};
use serde_json::Map;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use crate::core::error::{ExpressionError, PlanError, PlanResult};
use crate::core::types::{NodeId, VariableId, VariableRegistry};
use crate::core::Value;
use crate::query::planner::plan::node::{PlanNode, PlanNodeKind, PlanNodeType};
use crate::query::planner::plan::walker::{PlanWalker, WalkOrder};

/// 执行计划
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExecutionPlan {
    #[serde(with = "node_list")]
    nodes: BTreeMap<NodeId, PlanNode>,
    root: Option<NodeId>,
    #[serde(default)]
    variables: VariableRegistry,
    #[serde(default)]
    next_id: u64,
}

impl ExecutionPlan {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== 基本访问 ====================

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) -> PlanResult<()> {
        if !self.nodes.contains_key(&root) {
            return Err(PlanError::NodeNotFound(root));
        }
        self.root = Some(root);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&PlanNode> {
        self.nodes.get(&id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut PlanNode> {
        self.nodes.get_mut(&id)
    }

    /// 与 `node` 相同，节点缺失时返回 `NodeNotFound`
    pub fn get(&self, id: NodeId) -> PlanResult<&PlanNode> {
        self.nodes.get(&id).ok_or(PlanError::NodeNotFound(id))
    }

    pub fn get_mut(&mut self, id: NodeId) -> PlanResult<&mut PlanNode> {
        self.nodes.get_mut(&id).ok_or(PlanError::NodeNotFound(id))
    }

    pub fn kind(&self, id: NodeId) -> Option<&PlanNodeKind> {
        self.nodes.get(&id).map(|n| &n.kind)
    }

    pub fn node_type(&self, id: NodeId) -> Option<PlanNodeType> {
        self.nodes.get(&id).map(|n| n.node_type())
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &PlanNode> {
        self.nodes.values()
    }

    /// arena 中的节点总数（含子查询体）
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn variables(&self) -> &VariableRegistry {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut VariableRegistry {
        &mut self.variables
    }

    // ==================== 结构修改 ====================

    fn allocate_id(&mut self) -> NodeId {
        let after_last = self.nodes.keys().next_back().map(|id| id.0 + 1).unwrap_or(1);
        let id = after_last.max(self.next_id).max(1);
        self.next_id = id + 1;
        NodeId(id)
    }

    /// 新建节点；新节点没有下游，所以不可能成环
    pub fn create_node(&mut self, kind: PlanNodeKind, dependency: Option<NodeId>) -> PlanResult<NodeId> {
        let id = self.allocate_id();
        if let Some(dep) = dependency {
            if !self.nodes.contains_key(&dep) {
                return Err(PlanError::InvalidDependency {
                    node: id,
                    dependency: dep,
                });
            }
        }
        let mut node = PlanNode::new(id, kind);
        node.dependencies.extend(dependency);
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// 增加依赖边 `node -> dependency`
    pub fn add_dependency(&mut self, node: NodeId, dependency: NodeId) -> PlanResult<()> {
        let invalid = PlanError::InvalidDependency { node, dependency };
        if !self.nodes.contains_key(&node) || !self.nodes.contains_key(&dependency) {
            return Err(invalid);
        }
        if node == dependency || self.is_upstream(node, dependency) {
            return Err(invalid);
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            if !n.dependencies.contains(&dependency) {
                n.dependencies.push(dependency);
            }
        }
        Ok(())
    }

    /// `target` 是否位于 `from` 的上游（沿依赖与子查询引用）
    pub fn is_upstream(&self, target: NodeId, from: NodeId) -> bool {
        let mut stack = vec![from];
        let mut seen = HashSet::new();
        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.nodes.get(&id) {
                stack.extend(node.dependencies.iter().copied());
                if let PlanNodeKind::Subquery { root, .. } = &node.kind {
                    stack.push(*root);
                }
            }
        }
        false
    }

    /// 用 `new` 替换 `old`
    ///
    /// `new` 没有依赖时接管 `old` 的依赖，`old` 的所有下游改为依赖 `new`，
    /// 最后从 arena 中删除 `old`。
    pub fn replace_node(&mut self, old: NodeId, new: NodeId) -> PlanResult<()> {
        if !self.nodes.contains_key(&old) {
            return Err(PlanError::NodeNotFound(old));
        }
        if !self.nodes.contains_key(&new) {
            return Err(PlanError::NodeNotFound(new));
        }
        if old == new {
            return Ok(());
        }
        if self.subquery_with_root(old).is_some() {
            return Err(PlanError::DanglingReference(old));
        }

        let dependents = self.dependents(old);
        let inherit = self.nodes.get(&new).map(|n| n.dependencies.is_empty()).unwrap_or(false);
        let inherited: Vec<NodeId> = if inherit {
            self.nodes.get(&old).map(|n| n.dependencies.clone()).unwrap_or_default()
        } else {
            Vec::new()
        };

        // 下游节点不能出现在 new 的上游
        for dependent in &dependents {
            let upstream_of_new = *dependent == new
                || self.is_upstream(*dependent, new)
                || inherited.iter().any(|d| d == dependent || self.is_upstream(*dependent, *d));
            if upstream_of_new {
                return Err(PlanError::InvalidDependency {
                    node: *dependent,
                    dependency: new,
                });
            }
        }

        if inherit {
            if let Some(n) = self.nodes.get_mut(&new) {
                n.dependencies = inherited;
            }
        }
        for dependent in dependents {
            if let Some(n) = self.nodes.get_mut(&dependent) {
                for dep in n.dependencies.iter_mut() {
                    if *dep == old {
                        *dep = new;
                    }
                }
            }
        }
        if self.root == Some(old) {
            self.root = Some(new);
        }
        self.nodes.remove(&old);
        Ok(())
    }

    /// 把单依赖节点从链中摘除，下游直接依赖它的依赖
    pub fn remove_node(&mut self, id: NodeId) -> PlanResult<()> {
        let node = self.get(id)?;
        let dependency = match node.dependencies.as_slice() {
            [] => return Err(PlanError::NodeWithoutDependency(id)),
            [single] => *single,
            _ => {
                return Err(PlanError::invalid_plan_structure(format!(
                    "节点 {} 有多个依赖",
                    id
                )))
            }
        };
        let dependents = self.dependents(id);
        if dependents.len() > 1 {
            return Err(PlanError::NodeHasMultipleDependents(id));
        }

        for dependent in dependents {
            if let Some(n) = self.nodes.get_mut(&dependent) {
                for dep in n.dependencies.iter_mut() {
                    if *dep == id {
                        *dep = dependency;
                    }
                }
            }
        }
        if let Some(subquery) = self.subquery_with_root(id) {
            if let Some(PlanNodeKind::Subquery { root, .. }) =
                self.nodes.get_mut(&subquery).map(|n| &mut n.kind)
            {
                *root = dependency;
            }
        }
        if self.root == Some(id) {
            self.root = Some(dependency);
        }
        self.nodes.remove(&id);
        Ok(())
    }

    /// 把无依赖的 `new` 插入到 `node` 与它的依赖之间
    pub fn insert_dependency(&mut self, node: NodeId, new: NodeId) -> PlanResult<()> {
        let invalid = PlanError::InvalidDependency {
            node,
            dependency: new,
        };
        let current = self.get(node)?.dependencies.clone();
        let new_node = self.get(new)?;
        if node == new || !new_node.dependencies.is_empty() || !self.dependents(new).is_empty() {
            return Err(invalid);
        }
        if let Some(n) = self.nodes.get_mut(&new) {
            n.dependencies = current;
        }
        if let Some(n) = self.nodes.get_mut(&node) {
            n.dependencies = vec![new];
        }
        Ok(())
    }

    /// 把 `id` 从当前位置摘下，重新插入到 `target` 与其依赖之间
    pub fn move_before(&mut self, id: NodeId, target: NodeId) -> PlanResult<()> {
        if id == target {
            return Ok(());
        }
        self.get(target)?;
        self.remove_detached(id)?;
        self.insert_dependency(target, id)
    }

    /// 摘除节点但保留在 arena 中，供重新插入
    fn remove_detached(&mut self, id: NodeId) -> PlanResult<()> {
        let node = self.get(id)?.clone();
        self.remove_node(id)?;
        let mut detached = node;
        detached.dependencies.clear();
        self.nodes.insert(id, detached);
        Ok(())
    }

    /// 删除节点及其全部上游（用于丢弃整段子链）
    pub fn drop_subtree(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.remove(&current) {
                stack.extend(node.dependencies);
                if let PlanNodeKind::Subquery { root, .. } = node.kind {
                    stack.push(root);
                }
            }
        }
    }

    /// 在 `after` 与它的下游之间新建节点；`after` 是链的终止节点时新节点接替它
    pub fn insert_after(&mut self, after: NodeId, kind: PlanNodeKind) -> PlanResult<NodeId> {
        let dependents = self.dependents(after);
        if dependents.len() > 1 {
            return Err(PlanError::NodeHasMultipleDependents(after));
        }
        let id = self.create_node(kind, Some(after))?;
        match dependents.first() {
            Some(dependent) => {
                if let Some(n) = self.nodes.get_mut(dependent) {
                    for dep in n.dependencies.iter_mut() {
                        if *dep == after {
                            *dep = id;
                        }
                    }
                }
            }
            None => {
                if let Some(subquery) = self.subquery_with_root(after) {
                    if let Some(PlanNodeKind::Subquery { root, .. }) =
                        self.nodes.get_mut(&subquery).map(|n| &mut n.kind)
                    {
                        *root = id;
                    }
                } else if self.root == Some(after) {
                    self.root = Some(id);
                }
            }
        }
        Ok(id)
    }

    /// 所有节点读取的变量按映射替换
    pub fn replace_variables(&mut self, replacements: &HashMap<VariableId, VariableId>) {
        for node in self.nodes.values_mut() {
            node.kind.replace_variables(replacements);
        }
    }

    // ==================== 遍历与查找 ====================

    /// 从根节点遍历主查询，不进入子查询体
    pub fn walk(&self, order: WalkOrder) -> PlanWalker<'_> {
        PlanWalker::new(self, self.root, order, false)
    }

    /// 从根节点遍历，子查询体也被访问
    pub fn walk_subqueries(&self, order: WalkOrder) -> PlanWalker<'_> {
        PlanWalker::new(self, self.root, order, true)
    }

    /// 从任意终止节点遍历一条链
    pub fn walk_from(&self, terminal: NodeId, order: WalkOrder) -> PlanWalker<'_> {
        PlanWalker::new(self, Some(terminal), order, false)
    }

    /// 链上的节点，依赖顺序（Singleton 在前）
    pub fn chain(&self, terminal: NodeId) -> Vec<NodeId> {
        self.walk_from(terminal, WalkOrder::Dependency).map(|n| n.id).collect()
    }

    /// 主查询与所有子查询体的终止节点
    pub fn chain_terminals(&self) -> Vec<NodeId> {
        let mut terminals: Vec<NodeId> = self.root.into_iter().collect();
        for node in self.walk_subqueries(WalkOrder::Dependency) {
            if let PlanNodeKind::Subquery { root, .. } = &node.kind {
                terminals.push(*root);
            }
        }
        terminals
    }

    /// 直接依赖 `id` 的节点（下游）
    pub fn dependents(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .values()
            .filter(|n| n.dependencies.contains(&id))
            .map(|n| n.id)
            .collect()
    }

    /// 下游节点，即数据流中的父节点
    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        self.dependents(id)
    }

    pub fn dependency(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.dependency())
    }

    pub fn dependent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|n| n.dependencies.contains(&id))
            .map(|n| n.id)
    }

    /// 可达节点中指定类型的节点（含子查询体），依赖顺序
    pub fn find_nodes(&self, node_type: PlanNodeType) -> Vec<NodeId> {
        self.walk_subqueries(WalkOrder::Dependency)
            .filter(|n| n.node_type() == node_type)
            .map(|n| n.id)
            .collect()
    }

    pub fn contains_node_type(&self, node_type: PlanNodeType) -> bool {
        self.walk_subqueries(WalkOrder::Dependency)
            .any(|n| n.node_type() == node_type)
    }

    /// 可达节点的类型集合，用于规则的快速预检
    pub fn node_types(&self) -> HashSet<PlanNodeType> {
        self.walk_subqueries(WalkOrder::Dependency)
            .map(|n| n.node_type())
            .collect()
    }

    /// SubqueryNode 中以 `root` 为子查询终止节点的那个
    pub fn subquery_with_root(&self, root: NodeId) -> Option<NodeId> {
        self.nodes.values().find_map(|n| match &n.kind {
            PlanNodeKind::Subquery { root: r, .. } if *r == root => Some(n.id),
            _ => None,
        })
    }

    /// 包含 `id` 的子查询节点；主查询中的节点返回 `None`
    pub fn subquery_of(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        let mut seen = HashSet::new();
        while let Some(next) = self.dependent(current) {
            if !seen.insert(next) {
                return None;
            }
            current = next;
        }
        self.subquery_with_root(current)
    }

    /// 产生变量的节点
    pub fn variable_setter(&self, variable: VariableId) -> Option<NodeId> {
        self.nodes
            .values()
            .find(|n| n.kind.variables_set().contains(&variable))
            .map(|n| n.id)
    }

    /// 节点读取的变量；子查询节点包括子查询体读取的外层变量
    pub fn variables_used(&self, id: NodeId) -> BTreeSet<VariableId> {
        let Some(node) = self.nodes.get(&id) else {
            return BTreeSet::new();
        };
        let mut used: BTreeSet<VariableId> = node.kind.variables_used().into_iter().collect();
        if let PlanNodeKind::Subquery { root, .. } = &node.kind {
            let mut set_inside = BTreeSet::new();
            let mut used_inside = BTreeSet::new();
            for inner in self.chain(*root) {
                used_inside.extend(self.variables_used(inner));
                if let Some(n) = self.nodes.get(&inner) {
                    set_inside.extend(n.kind.variables_set());
                }
            }
            used.extend(used_inside.difference(&set_inside).copied());
        }
        used
    }

    /// 节点下游（含子查询外的后续部分）读取的变量
    pub fn variables_used_later(&self, id: NodeId) -> HashSet<VariableId> {
        let mut result = HashSet::new();
        let mut current = id;
        let mut seen = HashSet::new();
        loop {
            match self.dependent(current) {
                Some(next) => {
                    if !seen.insert(next) {
                        break;
                    }
                    result.extend(self.variables_used(next));
                    current = next;
                }
                None => match self.subquery_with_root(current) {
                    Some(subquery) if seen.insert(subquery) => current = subquery,
                    _ => break,
                },
            }
        }
        result
    }

    /// 节点上游是否存在循环节点（包括外层查询中的循环）
    pub fn is_in_inner_loop(&self, id: NodeId) -> bool {
        let mut current = self.dependency(id);
        let mut seen = HashSet::new();
        while let Some(node_id) = current {
            if !seen.insert(node_id) {
                return false;
            }
            let Some(node) = self.nodes.get(&node_id) else {
                return false;
            };
            if node.node_type().is_enumeration() {
                return true;
            }
            if node.dependencies.is_empty() {
                return match self.subquery_of(node_id) {
                    Some(subquery) => self.is_in_inner_loop(subquery),
                    None => false,
                };
            }
            current = node.dependency();
        }
        false
    }

    /// 在节点 `id` 执行前已经可见的变量：链上游产生的变量，以及所在子查询外层可见的变量
    pub fn variables_visible_at(&self, id: NodeId) -> HashSet<VariableId> {
        let mut visible = HashSet::new();
        let mut current = self.dependency(id);
        let mut last = id;
        let mut seen = HashSet::new();
        loop {
            match current {
                Some(node_id) => {
                    if !seen.insert(node_id) {
                        break;
                    }
                    if let Some(node) = self.nodes.get(&node_id) {
                        visible.extend(node.kind.variables_set());
                    }
                    last = node_id;
                    current = self.dependency(node_id);
                }
                None => match self.subquery_of(last) {
                    Some(subquery) if seen.insert(subquery) => {
                        last = subquery;
                        current = self.dependency(subquery);
                    }
                    _ => break,
                },
            }
        }
        visible
    }

    /// 计划读写的集合
    pub fn collections(&self) -> BTreeSet<String> {
        self.walk_subqueries(WalkOrder::Dependency)
            .filter_map(|n| n.kind.collection().map(str::to_string))
            .collect()
    }

    // ==================== 校验与绑定 ====================

    /// 校验计划结构
    ///
    /// - 根节点存在，且为 Return 或修改类节点
    /// - 每个节点至多一个依赖，依赖都存在，图中无环
    /// - 每条链以 Singleton 开始
    /// - 每个变量只有一个生产者，且读取前已产生
    pub fn validate(&self) -> PlanResult<()> {
        let root = self
            .root
            .ok_or_else(|| PlanError::invalid_plan_structure("计划没有根节点"))?;
        let root_node = self.get(root)?;
        let root_type = root_node.node_type();
        if root_type != PlanNodeType::Return && !root_type.is_modification() {
            return Err(PlanError::invalid_plan_structure(format!(
                "根节点必须是 ReturnNode 或修改节点，实际为 {}",
                root_type
            )));
        }

        for node in self.nodes.values() {
            if node.dependencies.len() > 1 {
                return Err(PlanError::invalid_plan_structure(format!(
                    "节点 {} 有多个依赖",
                    node.id
                )));
            }
            for dep in &node.dependencies {
                if !self.nodes.contains_key(dep) {
                    return Err(PlanError::InvalidDependency {
                        node: node.id,
                        dependency: *dep,
                    });
                }
            }
            if let PlanNodeKind::Subquery { root, .. } = &node.kind {
                if !self.nodes.contains_key(root) {
                    return Err(PlanError::DanglingReference(*root));
                }
            }
        }

        let mut producers: BTreeMap<VariableId, NodeId> = BTreeMap::new();
        for node in self.nodes.values() {
            for variable in node.kind.variables_set() {
                if variable.index() >= self.variables.len() {
                    return Err(PlanError::invalid_plan_structure(format!(
                        "变量 {} 未注册",
                        variable
                    )));
                }
                if let Some(other) = producers.insert(variable, node.id) {
                    return Err(PlanError::invalid_plan_structure(format!(
                        "变量 {} 同时由节点 {} 和 {} 产生",
                        self.variables.name(variable),
                        other,
                        node.id
                    )));
                }
            }
        }

        let mut on_path = HashSet::new();
        self.validate_chain(root, &HashSet::new(), &mut on_path)
    }

    fn validate_chain(
        &self,
        terminal: NodeId,
        outer: &HashSet<VariableId>,
        on_path: &mut HashSet<NodeId>,
    ) -> PlanResult<()> {
        // 从终止节点向上收集整条链，顺带检查环
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(terminal);
        while let Some(id) = current {
            if !seen.insert(id) || on_path.contains(&id) {
                return Err(PlanError::invalid_plan_structure(format!(
                    "计划在节点 {} 处成环",
                    id
                )));
            }
            let node = self.get(id)?;
            chain.push(id);
            current = node.dependency();
        }
        chain.reverse();

        let first = chain[0];
        if self.node_type(first) != Some(PlanNodeType::Singleton) {
            return Err(PlanError::invalid_plan_structure(format!(
                "链的起点必须是 SingletonNode，实际为节点 {}",
                first
            )));
        }

        on_path.extend(chain.iter().copied());
        let mut visible = outer.clone();
        for id in &chain {
            let node = self.get(*id)?;
            if node.node_type() == PlanNodeType::Singleton && *id != first {
                return Err(PlanError::invalid_plan_structure(format!(
                    "SingletonNode {} 不在链的起点",
                    id
                )));
            }
            for variable in node.kind.variables_used() {
                if !visible.contains(&variable) {
                    return Err(PlanError::invalid_plan_structure(format!(
                        "节点 {} 在变量 {} 产生之前读取它",
                        id,
                        self.variables.name(variable)
                    )));
                }
            }
            if let PlanNodeKind::Subquery { root, .. } = &node.kind {
                self.validate_chain(*root, &visible, on_path)?;
            }
            visible.extend(node.kind.variables_set());
        }
        for id in &chain {
            on_path.remove(id);
        }
        Ok(())
    }

    /// 把绑定参数替换为字面量
    pub fn bind_parameters(&mut self, bind_vars: &Map<String, Value>) -> Result<(), ExpressionError> {
        for node in self.nodes.values_mut() {
            match &mut node.kind {
                PlanNodeKind::Calculation { expression, .. } => {
                    expression.bind_parameters(bind_vars)?;
                }
                PlanNodeKind::Index { condition, .. } => {
                    for clause in &mut condition.clauses {
                        clause.value.bind_parameters(bind_vars)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// 计划中出现的绑定参数名
    pub fn bind_parameter_names(&self) -> BTreeSet<String> {
        let mut names = BTreeSet::new();
        for node in self.nodes.values() {
            match &node.kind {
                PlanNodeKind::Calculation { expression, .. } => {
                    expression.bind_parameter_names(&mut names);
                }
                PlanNodeKind::Index { condition, .. } => {
                    for clause in &condition.clauses {
                        clause.value.bind_parameter_names(&mut names);
                    }
                }
                _ => {}
            }
        }
        names
    }
}

/// 节点以数组形式序列化，便于手写 JSON 计划
mod node_list {
    use super::*;
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        nodes: &BTreeMap<NodeId, PlanNode>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(nodes.values())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<BTreeMap<NodeId, PlanNode>, D::Error> {
        let list: Vec<PlanNode> = Vec::deserialize(deserializer)?;
        Ok(list.into_iter().map(|n| (n.id, n)).collect())
    }
}
