//! 执行块工厂
//!
//! 沿计划的依赖链从 Singleton 向终止节点逐个包装执行块，子查询递归构建。

use log::debug;

use crate::core::error::{PlanError, QueryResult};
use crate::core::types::{NodeId, VariableId};
use crate::query::executor::blocks::{
    CalculationBlock, CollectBlock, EnumerateCollectionBlock, EnumerateListBlock, ExecutionBlock,
    FilterBlock, GatherBlock, IndexBlock, LimitBlock, ModificationBlock, ModificationKind,
    NoResultsBlock, RemoteBlock, ReturnBlock, ScatterBlock, ShortestPathBlock, SingletonBlock,
    SortBlock, SubqueryBlock, TraversalBlock,
};
use crate::query::planner::plan::{ExecutionPlan, PlanNodeKind};

/// 从执行计划构建执行块树
pub struct BlockFactory<'a> {
    plan: &'a ExecutionPlan,
    batch_size: usize,
    registers: usize,
}

impl<'a> BlockFactory<'a> {
    pub fn new(plan: &'a ExecutionPlan, batch_size: usize) -> Self {
        Self {
            plan,
            batch_size: batch_size.max(1),
            registers: plan.variables().len(),
        }
    }

    /// 为整个计划构建执行块，返回根块与结果变量
    pub fn build_plan(&self) -> QueryResult<(Box<dyn ExecutionBlock>, Option<VariableId>)> {
        let root = self
            .plan
            .root()
            .ok_or_else(|| PlanError::invalid_plan_structure("计划没有根节点"))?;
        Ok((self.build(root)?, self.result_variable(root)))
    }

    /// 终止节点为 Return 时返回其输入变量
    pub fn result_variable(&self, terminal: NodeId) -> Option<VariableId> {
        match self.plan.kind(terminal) {
            Some(PlanNodeKind::Return { input }) => Some(*input),
            _ => None,
        }
    }

    /// 构建以 `terminal` 结尾的依赖链
    pub fn build(&self, terminal: NodeId) -> QueryResult<Box<dyn ExecutionBlock>> {
        let mut current: Option<Box<dyn ExecutionBlock>> = None;
        for id in self.plan.chain(terminal) {
            let block = self.create(id, current.take())?;
            debug!("Built {} for node {}", block.name(), id);
            current = Some(block);
        }
        current.ok_or_else(|| PlanError::NodeNotFound(terminal).into())
    }

    fn create(
        &self,
        id: NodeId,
        dependency: Option<Box<dyn ExecutionBlock>>,
    ) -> QueryResult<Box<dyn ExecutionBlock>> {
        let node = self.plan.get(id)?;
        if let PlanNodeKind::Singleton = node.kind {
            return Ok(Box::new(SingletonBlock::new(self.registers)));
        }
        let dependency = dependency.ok_or(PlanError::NodeWithoutDependency(id))?;
        let batch_size = self.batch_size;

        let block: Box<dyn ExecutionBlock> = match &node.kind {
            PlanNodeKind::Singleton => Box::new(SingletonBlock::new(self.registers)),
            PlanNodeKind::EnumerateCollection {
                collection,
                out,
                random,
            } => Box::new(EnumerateCollectionBlock::new(dependency, collection.clone(), *out, *random)),
            PlanNodeKind::Index {
                out,
                index,
                condition,
                reverse,
                ..
            } => Box::new(IndexBlock::new(dependency, index.clone(), condition.clone(), *out, *reverse)),
            PlanNodeKind::EnumerateList { input, out } => {
                Box::new(EnumerateListBlock::new(dependency, *input, *out))
            }
            PlanNodeKind::Calculation { out, expression } => {
                Box::new(CalculationBlock::new(dependency, *out, expression.clone()))
            }
            PlanNodeKind::Filter { input } => Box::new(FilterBlock::new(dependency, *input)),
            PlanNodeKind::Sort { elements, .. } => Box::new(SortBlock::new(dependency, elements.clone())),
            PlanNodeKind::Limit {
                offset,
                count,
                full_count,
            } => Box::new(LimitBlock::new(dependency, *offset, *count, *full_count)),
            PlanNodeKind::Collect {
                groups,
                aggregates,
                into,
            } => {
                let keep = match into {
                    Some(into) if into.projection.is_none() => self.user_variables_at(id),
                    _ => Vec::new(),
                };
                Box::new(CollectBlock::new(
                    dependency,
                    groups.clone(),
                    aggregates.clone(),
                    *into,
                    keep,
                    self.registers,
                ))
            }
            PlanNodeKind::Subquery { root, out } => Box::new(SubqueryBlock::new(
                dependency,
                self.build(*root)?,
                self.result_variable(*root),
                *out,
                batch_size,
            )),
            PlanNodeKind::Return { input } => Box::new(ReturnBlock::new(dependency, *input)),
            PlanNodeKind::NoResults => Box::new(NoResultsBlock),
            PlanNodeKind::Scatter => Box::new(ScatterBlock::new(dependency, batch_size)),
            PlanNodeKind::Distribute { input, .. } => {
                Box::new(ScatterBlock::distribute(dependency, *input, batch_size))
            }
            PlanNodeKind::Remote { server, .. } => Box::new(RemoteBlock::new(dependency, server.clone())),
            PlanNodeKind::Gather { elements } => {
                Box::new(GatherBlock::new(dependency, elements.clone(), batch_size))
            }
            PlanNodeKind::Traversal {
                start,
                edge_collection,
                direction,
                min_depth,
                max_depth,
                vertex_out,
                edge_out,
                path_out,
            } => Box::new(TraversalBlock::new(
                dependency,
                *start,
                edge_collection.clone(),
                *direction,
                *min_depth,
                *max_depth,
                *vertex_out,
                *edge_out,
                *path_out,
            )),
            PlanNodeKind::ShortestPath {
                start,
                target,
                edge_collection,
                direction,
                vertex_out,
                edge_out,
            } => Box::new(ShortestPathBlock::new(
                dependency,
                *start,
                *target,
                edge_collection.clone(),
                *direction,
                *vertex_out,
                *edge_out,
            )),
            PlanNodeKind::Insert {
                collection,
                input,
                out_new,
                options,
            } => Box::new(ModificationBlock::new(
                dependency,
                collection.clone(),
                ModificationKind::Insert {
                    input: *input,
                    out_new: *out_new,
                },
                *options,
                batch_size,
            )),
            PlanNodeKind::Update {
                collection,
                key,
                input,
                out_old,
                out_new,
                options,
            } => Box::new(ModificationBlock::new(
                dependency,
                collection.clone(),
                ModificationKind::Update {
                    key: *key,
                    input: *input,
                    out_old: *out_old,
                    out_new: *out_new,
                },
                *options,
                batch_size,
            )),
            PlanNodeKind::Replace {
                collection,
                key,
                input,
                out_old,
                out_new,
                options,
            } => Box::new(ModificationBlock::new(
                dependency,
                collection.clone(),
                ModificationKind::Replace {
                    key: *key,
                    input: *input,
                    out_old: *out_old,
                    out_new: *out_new,
                },
                *options,
                batch_size,
            )),
            PlanNodeKind::Remove {
                collection,
                input,
                out_old,
                options,
            } => Box::new(ModificationBlock::new(
                dependency,
                collection.clone(),
                ModificationKind::Remove {
                    input: *input,
                    out_old: *out_old,
                },
                *options,
                batch_size,
            )),
            PlanNodeKind::Upsert {
                collection,
                search,
                insert,
                update,
                replace,
                out_new,
                options,
            } => Box::new(ModificationBlock::new(
                dependency,
                collection.clone(),
                ModificationKind::Upsert {
                    search: *search,
                    insert: *insert,
                    update: *update,
                    replace: *replace,
                    out_new: *out_new,
                },
                *options,
                batch_size,
            )),
        };
        Ok(block)
    }

    /// `COLLECT ... INTO g` 收集的变量：节点处可见的非临时变量，按 id 排序
    fn user_variables_at(&self, id: NodeId) -> Vec<(String, VariableId)> {
        let mut visible: Vec<VariableId> = self.plan.variables_visible_at(id).into_iter().collect();
        visible.sort();
        visible
            .into_iter()
            .filter_map(|v| self.plan.variables().get(v))
            .filter(|v| !v.is_temporary())
            .map(|v| (v.name.clone(), v.id))
            .collect()
    }
}
