//! 子查询执行块
//!
//! 对每行输入以该行初始化子查询并读完，把子查询 RETURN 的值收集成数组。

use crate::core::error::QueryResult;
use crate::core::types::VariableId;
use crate::core::Value;
use crate::query::executor::context::{ExecutionContext, Row};

use super::{drain, register, set_register, ExecutionBlock};

#[derive(Debug)]
pub struct SubqueryBlock {
    dependency: Box<dyn ExecutionBlock>,
    body: Box<dyn ExecutionBlock>,
    /// 子查询 RETURN 的变量；子查询不以 RETURN 结尾时结果为空数组
    result: Option<VariableId>,
    out: VariableId,
    batch_size: usize,
}

impl SubqueryBlock {
    pub fn new(
        dependency: Box<dyn ExecutionBlock>,
        body: Box<dyn ExecutionBlock>,
        result: Option<VariableId>,
        out: VariableId,
        batch_size: usize,
    ) -> Self {
        Self {
            dependency,
            body,
            result,
            out,
            batch_size: batch_size.max(1),
        }
    }
}

impl ExecutionBlock for SubqueryBlock {
    fn initialize(&mut self, ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()> {
        self.dependency.initialize(ctx, input)
    }

    fn get_some(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<Vec<Row>> {
        let mut rows = self.dependency.get_some(ctx, at_most)?;
        for row in rows.iter_mut() {
            self.body.initialize(ctx, row)?;
            let produced = drain(self.body.as_mut(), ctx, self.batch_size)?;
            let values = match self.result {
                Some(result) => produced.iter().map(|r| register(r, result)).collect(),
                None => Vec::new(),
            };
            set_register(row, self.out, Value::Array(values));
        }
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "SubqueryBlock"
    }
}
