//! 规则过滤器
//!
//! `optimizer.rules` 选项里的令牌按从左到右的顺序作用在默认启用状态上：
//!
//! | 令牌 | 含义 |
//! |------|------|
//! | `+name` / `name` | 启用规则 |
//! | `-name` | 禁用规则 |
//! | `+all` | 启用全部规则 |
//! | `-all` | 禁用全部规则 |
//!
//! 所以 `["-all", "+use-indexes"]` 只启用 `use-indexes`，而 `["+use-indexes", "-all"]`
//! 什么都不启用。未知规则名只产生警告。

use log::warn;

use crate::core::{ErrorCode, Warning, WarningCollector};
use crate::query::planner::rewrite::rule_enum::RuleRegistry;

/// 规则启用位图，下标与注册表位置一一对应
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleSelection {
    words: Vec<u64>,
    len: usize,
}

impl RuleSelection {
    /// 全部禁用
    pub fn none(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
            len,
        }
    }

    /// 全部启用
    pub fn all(len: usize) -> Self {
        let mut selection = Self::none(len);
        for i in 0..len {
            selection.set(i, true);
        }
        selection
    }

    /// 按注册表的默认启用状态
    pub fn defaults(registry: &RuleRegistry) -> Self {
        let mut selection = Self::none(registry.len());
        for (i, definition) in registry.iter().enumerate() {
            selection.set(i, definition.default_enabled);
        }
        selection
    }

    pub fn set(&mut self, index: usize, enabled: bool) {
        if index >= self.len {
            return;
        }
        let mask = 1u64 << (index % 64);
        if enabled {
            self.words[index / 64] |= mask;
        } else {
            self.words[index / 64] &= !mask;
        }
    }

    pub fn is_enabled(&self, index: usize) -> bool {
        index < self.len && self.words[index / 64] & (1u64 << (index % 64)) != 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn enabled_count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum RuleTarget {
    All,
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RuleToken {
    enable: bool,
    target: RuleTarget,
}

/// 解析后的规则过滤令牌
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleFilter {
    tokens: Vec<RuleToken>,
}

impl RuleFilter {
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Self {
        let tokens = tokens
            .iter()
            .map(|t| t.as_ref().trim())
            .filter(|t| !t.is_empty())
            .map(|token| {
                let (enable, name) = match token.as_bytes()[0] {
                    b'+' => (true, &token[1..]),
                    b'-' => (false, &token[1..]),
                    _ => (true, token),
                };
                let target = if name == "all" {
                    RuleTarget::All
                } else {
                    RuleTarget::Name(name.to_string())
                };
                RuleToken { enable, target }
            })
            .collect();
        Self { tokens }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// 计算本次调用的启用位图
    pub fn apply(&self, registry: &RuleRegistry, warnings: &mut WarningCollector) -> RuleSelection {
        let mut selection = RuleSelection::defaults(registry);
        for token in &self.tokens {
            match &token.target {
                RuleTarget::All => {
                    selection = if token.enable {
                        RuleSelection::all(registry.len())
                    } else {
                        RuleSelection::none(registry.len())
                    };
                }
                RuleTarget::Name(name) => match registry.position(name) {
                    Some(index) => selection.set(index, token.enable),
                    None => {
                        warn!("unknown optimizer rule '{}'", name);
                        warnings.push(Warning::new(
                            ErrorCode::BadParameter,
                            format!("unknown optimizer rule '{}'", name),
                        ));
                    }
                },
            }
        }
        selection
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn enabled_names(registry: &RuleRegistry, selection: &RuleSelection) -> Vec<&'static str> {
        registry
            .iter()
            .enumerate()
            .filter(|(i, _)| selection.is_enabled(*i))
            .map(|(_, d)| d.name())
            .collect()
    }

    #[test]
    fn test_bitset() {
        let mut selection = RuleSelection::none(70);
        selection.set(3, true);
        selection.set(65, true);
        selection.set(100, true);
        assert!(selection.is_enabled(65));
        assert!(!selection.is_enabled(100));
        assert_eq!(selection.enabled_count(), 2);
        assert_eq!(RuleSelection::all(70).enabled_count(), 70);
    }

    #[test]
    fn test_tokens_apply_left_to_right() {
        let registry = RuleRegistry::default();
        let mut warnings = WarningCollector::default();

        let selection = RuleFilter::parse(&["-all", "+use-indexes"]).apply(&registry, &mut warnings);
        assert_eq!(enabled_names(&registry, &selection), vec!["use-indexes"]);

        let selection = RuleFilter::parse(&["+use-indexes", "-all"]).apply(&registry, &mut warnings);
        assert_eq!(selection.enabled_count(), 0);

        let selection = RuleFilter::parse(&["-move-calculations-down"]).apply(&registry, &mut warnings);
        assert_eq!(selection.enabled_count(), registry.len() - 1);
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_unknown_rule_warns() {
        let registry = RuleRegistry::default();
        let mut warnings = WarningCollector::default();
        let selection = RuleFilter::parse(&["-all", "+no-such-rule", "remove-sort-rand"])
            .apply(&registry, &mut warnings);
        assert_eq!(enabled_names(&registry, &selection), vec!["remove-sort-rand"]);
        assert_eq!(warnings.as_slice().len(), 1);
        assert_eq!(warnings.as_slice()[0].code, ErrorCode::BadParameter.as_i32());
        assert!(warnings.as_slice()[0].message.contains("no-such-rule"));
    }
}
