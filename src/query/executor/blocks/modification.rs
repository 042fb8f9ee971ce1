//! 修改类执行块：INSERT、UPDATE、REPLACE、REMOVE、UPSERT
//!
//! 第一次拉取时读完上游，在同一个写事务里处理全部行后提交。出错且未设置
//! `ignoreErrors` 时错误向上传播，未提交的事务随之回滚。

use std::collections::VecDeque;

use log::debug;

use crate::core::error::{QueryResult, StorageError, StorageResult};
use crate::core::types::VariableId;
use crate::core::Value;
use crate::query::executor::context::{ExecutionContext, Row};
use crate::query::planner::plan::ModificationOptions;
use crate::storage::WriteTransaction;

use super::{drain, register, set_register, ExecutionBlock};

/// 修改操作及其变量
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModificationKind {
    Insert {
        input: VariableId,
        out_new: Option<VariableId>,
    },
    Update {
        key: Option<VariableId>,
        input: VariableId,
        out_old: Option<VariableId>,
        out_new: Option<VariableId>,
    },
    Replace {
        key: Option<VariableId>,
        input: VariableId,
        out_old: Option<VariableId>,
        out_new: Option<VariableId>,
    },
    Remove {
        input: VariableId,
        out_old: Option<VariableId>,
    },
    Upsert {
        search: VariableId,
        insert: VariableId,
        update: VariableId,
        replace: bool,
        out_new: Option<VariableId>,
    },
}

/// 一行修改的结果 (OLD, NEW)
type Modified = (Option<Value>, Option<Value>);

/// 文档键：字符串本身、`collection/key` 的键部分或对象的 `_key`
fn document_key(value: &Value) -> StorageResult<String> {
    match value {
        Value::String(key) => Ok(key.rsplit('/').next().unwrap_or(key).to_string()),
        Value::Object(map) => map
            .get("_key")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| StorageError::InvalidInput("文档缺少 _key".to_string())),
        other => Err(StorageError::DocumentTypeInvalid(other.to_string())),
    }
}

#[derive(Debug)]
pub struct ModificationBlock {
    dependency: Box<dyn ExecutionBlock>,
    collection: String,
    kind: ModificationKind,
    options: ModificationOptions,
    batch_size: usize,
    output: Option<VecDeque<Row>>,
}

impl ModificationBlock {
    pub fn new(
        dependency: Box<dyn ExecutionBlock>,
        collection: impl Into<String>,
        kind: ModificationKind,
        options: ModificationOptions,
        batch_size: usize,
    ) -> Self {
        Self {
            dependency,
            collection: collection.into(),
            kind,
            options,
            batch_size: batch_size.max(1),
            output: None,
        }
    }

    fn apply(&self, trx: &mut dyn WriteTransaction, row: &Row) -> StorageResult<Modified> {
        let collection = self.collection.as_str();
        match self.kind {
            ModificationKind::Insert { input, .. } => {
                let new = trx.insert(collection, register(row, input))?;
                Ok((None, Some(new)))
            }
            ModificationKind::Update { key, input, .. } => {
                let document = register(row, input);
                let key = document_key(&key.map(|k| register(row, k)).unwrap_or_else(|| document.clone()))?;
                let (old, new) = trx.update(collection, &key, document)?;
                Ok((Some(old), Some(new)))
            }
            ModificationKind::Replace { key, input, .. } => {
                let document = register(row, input);
                let key = document_key(&key.map(|k| register(row, k)).unwrap_or_else(|| document.clone()))?;
                let (old, new) = trx.replace(collection, &key, document)?;
                Ok((Some(old), Some(new)))
            }
            ModificationKind::Remove { input, .. } => {
                let key = document_key(&register(row, input))?;
                let old = trx.remove(collection, &key)?;
                Ok((Some(old), None))
            }
            ModificationKind::Upsert {
                search,
                insert,
                update,
                replace,
                ..
            } => match trx.find_by_example(collection, &register(row, search))? {
                Some(found) => {
                    let key = document_key(&found)?;
                    let (old, new) = if replace {
                        trx.replace(collection, &key, register(row, update))?
                    } else {
                        trx.update(collection, &key, register(row, update))?
                    };
                    Ok((Some(old), Some(new)))
                }
                None => {
                    let new = trx.insert(collection, register(row, insert))?;
                    Ok((None, Some(new)))
                }
            },
        }
    }

    fn outputs(&self) -> (Option<VariableId>, Option<VariableId>) {
        match self.kind {
            ModificationKind::Insert { out_new, .. } | ModificationKind::Upsert { out_new, .. } => {
                (None, out_new)
            }
            ModificationKind::Update { out_old, out_new, .. }
            | ModificationKind::Replace { out_old, out_new, .. } => (out_old, out_new),
            ModificationKind::Remove { out_old, .. } => (out_old, None),
        }
    }

    fn execute(&self, ctx: &mut ExecutionContext, rows: Vec<Row>) -> QueryResult<VecDeque<Row>> {
        let storage = ctx.storage().clone();
        let mut trx = storage.begin_write()?;
        let (out_old, out_new) = self.outputs();
        let mut output = VecDeque::with_capacity(rows.len());

        for mut row in rows {
            let (old, new) = match self.apply(trx.as_mut(), &row) {
                Ok(modified) => {
                    ctx.stats.writes_executed += 1;
                    modified
                }
                Err(e) if self.options.ignore_errors => {
                    debug!("Ignoring failed write on {}: {}", self.collection, e);
                    ctx.stats.writes_ignored += 1;
                    (None, None)
                }
                Err(e) => return Err(e.into()),
            };
            if let Some(variable) = out_old {
                set_register(&mut row, variable, old.unwrap_or(Value::Null));
            }
            if let Some(variable) = out_new {
                set_register(&mut row, variable, new.unwrap_or(Value::Null));
            }
            output.push_back(row);
        }

        trx.commit()?;
        Ok(output)
    }
}

impl ExecutionBlock for ModificationBlock {
    fn initialize(&mut self, ctx: &mut ExecutionContext, input: &Row) -> QueryResult<()> {
        self.output = None;
        self.dependency.initialize(ctx, input)
    }

    fn get_some(&mut self, ctx: &mut ExecutionContext, at_most: usize) -> QueryResult<Vec<Row>> {
        if self.output.is_none() {
            let rows = drain(self.dependency.as_mut(), ctx, self.batch_size)?;
            self.output = Some(self.execute(ctx, rows)?);
        }
        let Some(output) = self.output.as_mut() else {
            return Ok(Vec::new());
        };
        let take = at_most.min(output.len());
        Ok(output.drain(..take).collect())
    }

    fn name(&self) -> &'static str {
        match self.kind {
            ModificationKind::Insert { .. } => "InsertBlock",
            ModificationKind::Update { .. } => "UpdateBlock",
            ModificationKind::Replace { .. } => "ReplaceBlock",
            ModificationKind::Remove { .. } => "RemoveBlock",
            ModificationKind::Upsert { .. } => "UpsertBlock",
        }
    }
}
