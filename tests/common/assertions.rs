//! 测试断言辅助函数

use serde_json::Value;

use aql_optimizer::query::planner::plan::PlanDescription;

/// 与顺序无关的比较形式
pub fn normalized(values: &[Value]) -> Vec<String> {
    let mut rows: Vec<String> = values.iter().map(Value::to_string).collect();
    rows.sort();
    rows
}

/// 断言两个结果集合相同（忽略顺序）
pub fn assert_same_rows(expected: &[Value], actual: &[Value], context: &str) {
    assert_eq!(
        normalized(expected),
        normalized(actual),
        "结果不一致: {}",
        context
    );
}

/// 断言计划应用了规则
pub fn assert_rule_applied(plan: &PlanDescription, rule: &str) {
    assert!(
        plan.rules.iter().any(|r| r == rule),
        "期望应用规则 {}，实际为 {:?}",
        rule,
        plan.rules
    );
}

/// 断言计划没有应用规则
pub fn assert_rule_not_applied(plan: &PlanDescription, rule: &str) {
    assert!(
        !plan.rules.iter().any(|r| r == rule),
        "不应应用规则 {}，实际为 {:?}",
        rule,
        plan.rules
    );
}

/// 断言数值序列单调
pub fn assert_monotonic(values: &[Value], ascending: bool) {
    for pair in values.windows(2) {
        let (a, b) = (pair[0].as_f64().unwrap(), pair[1].as_f64().unwrap());
        if ascending {
            assert!(a <= b, "{} 出现在 {} 之前，期望升序", a, b);
        } else {
            assert!(a >= b, "{} 出现在 {} 之前，期望降序", a, b);
        }
    }
}
