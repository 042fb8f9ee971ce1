//! 基础执行块：Singleton、Calculation、Filter、Return、NoResults

use crate::core::error::QueryResult;
use crate::core::types::expression::Expression;
use crate::core::types::VariableId;
use crate::core::value::to_bool;
use crate::core::Value;
use crate::query::executor::context::{ExecutionContext, Row};

use super::{register, set_register, ExecutionBlock};

/// 计划的起点，每次初始化产出一行
#[derive(Debug)]
pub struct SingletonBlock {
    registers: usize,
    row: Option<Row>,
}

impl SingletonBlock {
    pub fn new(registers: usize) -> Self {
        Self {
            registers,
            row: None,
        }
    }
}

impl ExecutionBlock for SingletonBlock {
    fn initialize(&mut self, _ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()> {
        let mut row = input.clone();
        if row.len() < self.registers {
            row.resize(self.registers, Value::Null);
        }
        self.row = Some(row);
        Ok(())
    }

    fn get_some(&mut self, _ctx: &mut ExecutionContext, _at_most: usize) -> QueryResult<Vec<Row>> {
        Ok(self.row.take().into_iter().collect())
    }

    fn name(&self) -> &'static str {
        "SingletonBlock"
    }
}

/// 逐行计算表达式并写入输出变量
#[derive(Debug)]
pub struct CalculationBlock {
    dependency: Box<dyn ExecutionBlock>,
    out: VariableId,
    expression: Expression,
}

impl CalculationBlock {
    pub fn new(dependency: Box<dyn ExecutionBlock>, out: VariableId, expression: Expression) -> Self {
        Self {
            dependency,
            out,
            expression,
        }
    }
}

impl ExecutionBlock for CalculationBlock {
    fn initialize(&mut self, ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()> {
        self.dependency.initialize(ctx, input)
    }

    fn get_some(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<Vec<Row>> {
        let mut rows = self.dependency.get_some(ctx, at_most)?;
        for row in rows.iter_mut() {
            let value = ctx.evaluate(&self.expression, row)?;
            set_register(row, self.out, value);
        }
        Ok(rows)
    }

    fn name(&self) -> &'static str {
        "CalculationBlock"
    }
}

/// 丢弃输入变量为假的行
#[derive(Debug)]
pub struct FilterBlock {
    dependency: Box<dyn ExecutionBlock>,
    input: VariableId,
}

impl FilterBlock {
    pub fn new(dependency: Box<dyn ExecutionBlock>, input: VariableId) -> Self {
        Self { dependency, input }
    }
}

impl ExecutionBlock for FilterBlock {
    fn initialize(&mut self, ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()> {
        self.dependency.initialize(ctx, input)
    }

    fn get_some(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<Vec<Row>> {
        loop {
            let batch = self.dependency.get_some(ctx, at_most)?;
            if batch.is_empty() {
                return Ok(batch);
            }
            let before = batch.len();
            let kept: Vec<Row> = batch
                .into_iter()
                .filter(|row| to_bool(&register(row, self.input)))
                .collect();
            ctx.stats.filtered += (before - kept.len()) as u64;
            if !kept.is_empty() {
                return Ok(kept);
            }
        }
    }

    fn name(&self) -> &'static str {
        "FilterBlock"
    }
}

/// 结果出口，行原样上交；结果值由游标按 `input` 读取
#[derive(Debug)]
pub struct ReturnBlock {
    dependency: Box<dyn ExecutionBlock>,
    input: VariableId,
}

impl ReturnBlock {
    pub fn new(dependency: Box<dyn ExecutionBlock>, input: VariableId) -> Self {
        Self { dependency, input }
    }

    pub fn input(&self) -> VariableId {
        self.input
    }
}

impl ExecutionBlock for ReturnBlock {
    fn initialize(&mut self, ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()> {
        self.dependency.initialize(ctx, input)
    }

    fn get_some(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<Vec<Row>> {
        self.dependency.get_some(ctx, at_most)
    }

    fn name(&self) -> &'static str {
        "ReturnBlock"
    }
}

/// 永远不产出行，也不读取上游
#[derive(Debug, Default)]
pub struct NoResultsBlock;

impl ExecutionBlock for NoResultsBlock {
    fn initialize(&mut self, _ctx: &mut ExecutionContext, _input: &Row) -> QueryResult<()> {
        Ok(())
    }

    fn get_some(&mut self, _ctx: &mut ExecutionContext, _at_most: usize) -> QueryResult<Vec<Row>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "NoResultsBlock"
    }
}
