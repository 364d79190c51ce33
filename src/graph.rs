//! 依赖图：注入容器接缝与一个最小的默认实现。
use std::{
    collections::{HashMap, HashSet},
    fmt,
    sync::Arc,
};

use anyhow::{anyhow, bail, Context};

use crate::{
    dependency::{Dependency, Instance},
    error::{Result, TestEnvError},
};

/// 构建中的只读视图，供工厂获取 `Inject` 声明的依赖。
pub struct Resolved<'a> {
    instances: &'a HashMap<String, Instance>,
}

impl<'a> Resolved<'a> {
    pub fn get(&self, key: &str) -> Option<&'a Instance> {
        self.instances.get(key)
    }

    pub fn resolve<T: Clone + 'static>(&self, key: &str) -> anyhow::Result<T> {
        let inst = self
            .instances
            .get(key)
            .ok_or_else(|| anyhow!("`{key}` is not built yet; declare it with inject()"))?;
        inst.downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| anyhow!("`{key}` is not a {}", std::any::type_name::<T>()))
    }
}

/// 一次测试运行的组件实例集合。
///
/// 有令牌的组件按令牌索引；无令牌的组件放在单独的命名空间里按名字查找，
/// 同名者全部保留，既不互相覆盖，也不会遮住任何令牌。
pub struct Graph {
    instances: HashMap<String, Instance>,
    anonymous: Vec<(String, Instance)>,
    order: Vec<String>,
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph").field("keys", &self.order).finish()
    }
}

impl Graph {
    /// 先按令牌查；查不到再取第一个同名的无令牌组件（基础列表中的先于覆盖追加的）。
    pub fn get(&self, key: &str) -> Option<&Instance> {
        self.instances.get(key).or_else(|| {
            self.anonymous
                .iter()
                .find(|(n, _)| n == key)
                .map(|(_, inst)| inst)
        })
    }

    /// 所有名为 `name` 的无令牌组件，按构建顺序。
    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Instance> + 'a {
        self.anonymous
            .iter()
            .filter(move |(n, _)| n == name)
            .map(|(_, inst)| inst)
    }

    /// 取出并克隆组件；trait 对象以 `Arc<dyn Trait>` 形式注册时按同一类型取回。
    pub fn resolve<T: Clone + 'static>(&self, key: &str) -> Result<T> {
        let inst = self
            .get(key)
            .ok_or_else(|| TestEnvError::Unresolved(key.to_string()))?;
        inst.downcast_ref::<T>()
            .cloned()
            .ok_or_else(|| TestEnvError::TypeMismatch(key.to_string()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// 构建顺序（依赖先于依赖者）。
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// 外部注入容器的接缝：把依赖列表变成可查询的图。
pub trait Injector: Send + Sync {
    fn build(&self, deps: &[Dependency]) -> anyhow::Result<Graph>;
}

/// 最小容器：按 `Inject` 注解拓扑排序后逐个调用工厂。
/// 调用任何工厂之前先拒绝缺失依赖和循环依赖。
/// `Inject` 只能引用令牌；无令牌依赖不参与同键替换，也不能被注入。
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultInjector;

impl Injector for DefaultInjector {
    fn build(&self, deps: &[Dependency]) -> anyhow::Result<Graph> {
        // 同令牌后者覆盖前者；无令牌的全部保留
        let mut index: HashMap<&str, usize> = HashMap::new();
        let mut live: Vec<usize> = Vec::with_capacity(deps.len());
        for (i, d) in deps.iter().enumerate() {
            let Some(token) = d.provider() else {
                live.push(i);
                continue;
            };
            if let Some(prev) = index.insert(token.as_str(), i) {
                tracing::warn!(token = %token, replaced = %deps[prev].name(), by = %d.name(), "duplicate token in dependency list; later entry wins");
            }
        }
        live.extend(index.values().copied());
        live.sort_unstable();

        for &i in &live {
            let d = &deps[i];
            for t in d.requires() {
                if !index.contains_key(t.as_str()) {
                    bail!("`{}` requires `{}`, which nothing provides", d.name(), t);
                }
            }
        }

        let mut order = Vec::with_capacity(live.len());
        let mut visited = HashSet::new();
        let mut visiting = Vec::new();
        for &i in &live {
            visit(i, deps, &index, &mut visited, &mut visiting, &mut order)?;
        }

        let mut instances = HashMap::with_capacity(order.len());
        let mut anonymous = Vec::new();
        let mut keys = Vec::with_capacity(order.len());
        for i in order {
            let d = &deps[i];
            let inst = {
                let view = Resolved {
                    instances: &instances,
                };
                d.instantiate(&view)
                    .with_context(|| format!("factory for `{}` failed", d.name()))?
            };
            match d.provider() {
                Some(token) => {
                    instances.insert(token.to_string(), inst);
                }
                None => anonymous.push((d.name().to_string(), inst)),
            }
            keys.push(d.key().to_string());
        }
        Ok(Graph {
            instances,
            anonymous,
            order: keys,
        })
    }
}

fn visit(
    i: usize,
    deps: &[Dependency],
    index: &HashMap<&str, usize>,
    visited: &mut HashSet<usize>,
    visiting: &mut Vec<usize>,
    order: &mut Vec<usize>,
) -> anyhow::Result<()> {
    if visited.contains(&i) {
        return Ok(());
    }
    if let Some(pos) = visiting.iter().position(|&v| v == i) {
        let chain = visiting[pos..]
            .iter()
            .chain(std::iter::once(&i))
            .map(|&v| deps[v].key())
            .collect::<Vec<_>>()
            .join(" -> ");
        bail!("cyclic requirement: {chain}");
    }
    visiting.push(i);
    for t in deps[i].requires() {
        if let Some(&j) = index.get(t.as_str()) {
            visit(j, deps, index, visited, visiting, order)?;
        }
    }
    visiting.pop();
    visited.insert(i);
    order.push(i);
    Ok(())
}

/// 包装注入容器，把失败统一为 `Construction`。
#[derive(Clone)]
pub struct GraphBuilder {
    injector: Arc<dyn Injector>,
}

impl fmt::Debug for GraphBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphBuilder(..)")
    }
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new(Arc::new(DefaultInjector))
    }
}

impl GraphBuilder {
    pub fn new(injector: Arc<dyn Injector>) -> Self {
        Self { injector }
    }

    pub fn build(&self, deps: &[Dependency]) -> Result<Graph> {
        let graph = self
            .injector
            .build(deps)
            .map_err(TestEnvError::Construction)?;
        tracing::debug!(dependencies = deps.len(), components = graph.len(), "graph built");
        Ok(graph)
    }
}
