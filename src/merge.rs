//! 覆盖合并：按令牌把测试替身换入基础依赖列表。
use smallvec::SmallVec;

use crate::dependency::{Dependency, Token};

/// 一次 setup 提供的覆盖，单个依赖与依赖序列等价（展平后按序处理）。
#[derive(Clone, Debug, Default)]
pub struct Overrides(Vec<Dependency>);

impl Overrides {
    pub fn none() -> Self {
        Self::default()
    }
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
    pub fn len(&self) -> usize {
        self.0.len()
    }
    pub fn push(&mut self, dep: Dependency) {
        self.0.push(dep);
    }
}

impl From<Dependency> for Overrides {
    fn from(d: Dependency) -> Self {
        Overrides(vec![d])
    }
}

impl From<Vec<Dependency>> for Overrides {
    fn from(v: Vec<Dependency>) -> Self {
        Overrides(v)
    }
}

impl From<Option<Dependency>> for Overrides {
    fn from(d: Option<Dependency>) -> Self {
        Overrides(d.into_iter().collect())
    }
}

impl FromIterator<Dependency> for Overrides {
    fn from_iter<I: IntoIterator<Item = Dependency>>(iter: I) -> Self {
        Overrides(iter.into_iter().collect())
    }
}

impl IntoIterator for Overrides {
    type Item = Dependency;
    type IntoIter = std::vec::IntoIter<Dependency>;
    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// 单个覆盖的处理结果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverrideOutcome {
    pub name: String,
    pub token: Option<Token>,
    /// 被移除条目的名字，按工作列表中的顺序。
    pub shadowed: SmallVec<[String; 4]>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeReport {
    pub outcomes: Vec<OverrideOutcome>,
}

impl MergeReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
    /// 至少移除了一个条目的令牌。
    pub fn shadowed_tokens(&self) -> impl Iterator<Item = &Token> {
        self.outcomes
            .iter()
            .filter(|o| !o.shadowed.is_empty())
            .filter_map(|o| o.token.as_ref())
    }
    /// 没有令牌、只能追加的覆盖。
    pub fn additive(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|o| o.token.is_none())
            .map(|o| o.name.as_str())
    }
    pub fn shadowed_count(&self) -> usize {
        self.outcomes.iter().map(|o| o.shadowed.len()).sum()
    }
}

/// 逐个处理覆盖：有令牌则移除工作列表中所有同令牌条目，然后无条件追加到末尾。
/// 比较的是令牌值而不是对象身份，所以同一次调用里后来的同令牌覆盖会替换先前的覆盖。
/// 零匹配、多匹配、无令牌都不是错误。
pub fn merge(base: &[Dependency], overrides: Overrides) -> (Vec<Dependency>, MergeReport) {
    let mut list = base.to_vec();
    let mut report = MergeReport::default();
    for o in overrides {
        let mut shadowed = SmallVec::new();
        if let Some(token) = o.provider() {
            list.retain(|d| {
                let hit = d.provider() == Some(token);
                if hit {
                    tracing::debug!(token = %token, shadowed = %d.name(), by = %o.name(), "override shadows dependency");
                    shadowed.push(d.name().to_string());
                }
                !hit
            });
        } else {
            tracing::debug!(dependency = %o.name(), "override has no provider token; appending only");
        }
        report.outcomes.push(OverrideOutcome {
            name: o.name().to_string(),
            token: o.provider().cloned(),
            shadowed,
        });
        list.push(o);
    }
    (list, report)
}
