use serde_json::Value;
use std::cmp::Ordering;

/// AQL 类型权重：null < bool < number < string < array < object
pub fn type_weight(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// 按 AQL 语义比较两个值
///
/// 不同类型按类型权重比较；数组逐元素比较，短数组缺失的位置视为 null；
/// 对象按两侧属性名并集的字典序逐个比较属性值。
pub fn compare_values(left: &Value, right: &Value) -> Ordering {
    let (lw, rw) = (type_weight(left), type_weight(right));
    if lw != rw {
        return lw.cmp(&rw);
    }

    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Array(a), Value::Array(b)) => {
            let len = a.len().max(b.len());
            for i in 0..len {
                let l = a.get(i).unwrap_or(&Value::Null);
                let r = b.get(i).unwrap_or(&Value::Null);
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
        (Value::Object(a), Value::Object(b)) => {
            let mut keys: Vec<&String> = a.keys().chain(b.keys()).collect();
            keys.sort();
            keys.dedup();
            for key in keys {
                let l = a.get(key.as_str()).unwrap_or(&Value::Null);
                let r = b.get(key.as_str()).unwrap_or(&Value::Null);
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        }
        _ => Ordering::Equal,
    }
}

/// AQL 相等比较（`==`）
pub fn values_equal(left: &Value, right: &Value) -> bool {
    compare_values(left, right) == Ordering::Equal
}

/// 按 AQL 顺序比较的值包装，用于分组键、去重集合等有序容器
#[derive(Debug, Clone)]
pub struct ValueKey(pub Vec<Value>);

impl PartialEq for ValueKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for ValueKey {}

impl PartialOrd for ValueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ValueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        for (l, r) in self.0.iter().zip(other.0.iter()) {
            let ord = compare_values(l, r);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.0.len().cmp(&other.0.len())
    }
}
