//! COLLECT 执行块
//!
//! 物化全部输入后按分组键排序分组，输出顺序即分组键的升序。

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::core::error::QueryResult;
use crate::core::types::VariableId;
use crate::core::value::{compare_values, number_value, ValueKey};
use crate::core::Value;
use crate::query::executor::context::{ExecutionContext, Row};
use crate::query::planner::plan::{AggregateFunction, CollectAggregate, CollectGroup, CollectInto};

use super::{drain, register, set_register, ExecutionBlock};

#[derive(Debug, Clone)]
enum Accumulator {
    Count(u64),
    Sum { total: f64, invalid: bool },
    Min(Option<Value>),
    Max(Option<Value>),
    Average { total: f64, count: u64 },
    Unique { values: Vec<Value>, seen: BTreeSet<ValueKey> },
}

impl Accumulator {
    fn new(function: AggregateFunction) -> Self {
        match function {
            AggregateFunction::Count => Accumulator::Count(0),
            AggregateFunction::Sum => Accumulator::Sum {
                total: 0.0,
                invalid: false,
            },
            AggregateFunction::Min => Accumulator::Min(None),
            AggregateFunction::Max => Accumulator::Max(None),
            AggregateFunction::Average => Accumulator::Average { total: 0.0, count: 0 },
            AggregateFunction::Unique => Accumulator::Unique {
                values: Vec::new(),
                seen: BTreeSet::new(),
            },
        }
    }

    fn add(&mut self, value: Value) {
        match self {
            Accumulator::Count(n) => *n += 1,
            Accumulator::Sum { total, invalid } => match &value {
                Value::Null => {}
                Value::Number(n) => *total += n.as_f64().unwrap_or(0.0),
                _ => *invalid = true,
            },
            Accumulator::Min(current) => {
                if !value.is_null()
                    && current
                        .as_ref()
                        .map(|c| compare_values(&value, c).is_lt())
                        .unwrap_or(true)
                {
                    *current = Some(value);
                }
            }
            Accumulator::Max(current) => {
                if !value.is_null()
                    && current
                        .as_ref()
                        .map(|c| compare_values(&value, c).is_gt())
                        .unwrap_or(true)
                {
                    *current = Some(value);
                }
            }
            Accumulator::Average { total, count } => {
                if let Value::Number(n) = &value {
                    *total += n.as_f64().unwrap_or(0.0);
                    *count += 1;
                }
            }
            Accumulator::Unique { values, seen } => {
                if seen.insert(ValueKey(vec![value.clone()])) {
                    values.push(value);
                }
            }
        }
    }

    fn finish(self) -> Value {
        match self {
            Accumulator::Count(n) => Value::from(n),
            Accumulator::Sum { invalid: true, .. } => Value::Null,
            Accumulator::Sum { total, .. } => number_value(total),
            Accumulator::Min(v) | Accumulator::Max(v) => v.unwrap_or(Value::Null),
            Accumulator::Average { count: 0, .. } => Value::Null,
            Accumulator::Average { total, count } => number_value(total / count as f64),
            Accumulator::Unique { values, .. } => Value::Array(values),
        }
    }
}

#[derive(Debug)]
struct Group {
    row: Row,
    accumulators: Vec<Accumulator>,
    members: Vec<Value>,
}

/// COLLECT 执行块
#[derive(Debug)]
pub struct CollectBlock {
    dependency: Box<dyn ExecutionBlock>,
    groups: Vec<CollectGroup>,
    aggregates: Vec<CollectAggregate>,
    into: Option<CollectInto>,
    /// `INTO` 无投影时收集的用户变量
    keep: Vec<(String, VariableId)>,
    registers: usize,
    input: Row,
    output: Option<VecDeque<Row>>,
}

impl CollectBlock {
    pub fn new(
        dependency: Box<dyn ExecutionBlock>,
        groups: Vec<CollectGroup>,
        aggregates: Vec<CollectAggregate>,
        into: Option<CollectInto>,
        keep: Vec<(String, VariableId)>,
        registers: usize,
    ) -> Self {
        Self {
            dependency,
            groups,
            aggregates,
            into,
            keep,
            registers,
            input: Vec::new(),
            output: None,
        }
    }

    fn member(&self, row: &Row) -> Value {
        match self.into.and_then(|into| into.projection) {
            Some(projection) => register(row, projection),
            None => Value::Object(
                self.keep
                    .iter()
                    .map(|(name, variable)| (name.clone(), register(row, *variable)))
                    .collect(),
            ),
        }
    }

    fn new_group(&self, row: Row) -> Group {
        Group {
            row,
            accumulators: self.aggregates.iter().map(|a| Accumulator::new(a.function)).collect(),
            members: Vec::new(),
        }
    }

    fn aggregate(&self, rows: Vec<Row>) -> VecDeque<Row> {
        let mut grouped: BTreeMap<ValueKey, Group> = BTreeMap::new();
        if self.groups.is_empty() {
            let mut base = self.input.clone();
            if base.len() < self.registers {
                base.resize(self.registers, Value::Null);
            }
            grouped.insert(ValueKey(Vec::new()), self.new_group(base));
        }

        for row in rows {
            let key = ValueKey(self.groups.iter().map(|g| register(&row, g.input)).collect());
            let member = self.into.map(|_| self.member(&row));
            let values: Vec<Value> = self
                .aggregates
                .iter()
                .map(|a| a.input.map(|v| register(&row, v)).unwrap_or(Value::Null))
                .collect();
            let group = grouped.entry(key).or_insert_with(|| self.new_group(row));
            for (accumulator, value) in group.accumulators.iter_mut().zip(values) {
                accumulator.add(value);
            }
            if let Some(member) = member {
                group.members.push(member);
            }
        }

        grouped
            .into_iter()
            .map(|(key, group)| {
                let mut row = group.row;
                for (spec, value) in self.groups.iter().zip(key.0) {
                    set_register(&mut row, spec.out, value);
                }
                for (spec, accumulator) in self.aggregates.iter().zip(group.accumulators) {
                    set_register(&mut row, spec.out, accumulator.finish());
                }
                if let Some(into) = self.into {
                    set_register(&mut row, into.out, Value::Array(group.members));
                }
                row
            })
            .collect()
    }
}

impl ExecutionBlock for CollectBlock {
    fn initialize(&mut self, ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()> {
        self.input = input.clone();
        self.output = None;
        self.dependency.initialize(ctx, input)
    }

    fn get_some(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<Vec<Row>> {
        if self.output.is_none() {
            let rows = drain(self.dependency.as_mut(), ctx, at_most.max(1))?;
            let bytes = ctx.track_memory(&rows);
            let output = self.aggregate(rows);
            ctx.release_memory(bytes);
            self.output = Some(output);
        }
        let Some(output) = self.output.as_mut() else {
            return Ok(Vec::new());
        };
        let take = at_most.min(output.len());
        Ok(output.drain(..take).collect())
    }

    fn name(&self) -> &'static str {
        "CollectBlock"
    }
}
