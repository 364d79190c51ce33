//! 编排器只通过这几个接口与被测应用交互；实现由应用或测试替身提供。
use std::{collections::BTreeMap, fmt, sync::Arc};

use async_trait::async_trait;

/// 负责启停所有长生命周期资源（监听器、消息队列连接等）的核心服务。
#[async_trait]
pub trait CoreService: Send + Sync + 'static {
    async fn start(&self) -> anyhow::Result<Box<dyn RunningCore>>;
}

/// `CoreService::start` 返回的运行实例，停止时消费自身。
#[async_trait]
pub trait RunningCore: Send + Sync + 'static {
    async fn stop(self: Box<Self>) -> anyhow::Result<()>;
}

impl fmt::Debug for dyn RunningCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunningCore(..)")
    }
}

#[async_trait]
pub trait ConfigurationService: Send + Sync + 'static {
    async fn set(&self, key: &str, value: serde_json::Value) -> anyhow::Result<()>;
}

/// 删除条件；空条件表示清空整个集合。
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Criteria(serde_json::Map<String, serde_json::Value>);

impl Criteria {
    pub fn all() -> Self {
        Self::default()
    }
    pub fn is_all(&self) -> bool {
        self.0.is_empty()
    }
    pub fn with(mut self, field: impl Into<String>, value: serde_json::Value) -> Self {
        self.0.insert(field.into(), value);
        self
    }
    pub fn as_map(&self) -> &serde_json::Map<String, serde_json::Value> {
        &self.0
    }
}

#[async_trait]
pub trait Destroy: Send + Sync {
    async fn destroy(&self, criteria: &Criteria) -> anyhow::Result<()>;
}

/// 持久化集合；不具备删除能力的集合在 reset 时被跳过。
pub trait Collection: Send + Sync + 'static {
    fn destroyer(&self) -> Option<&dyn Destroy> {
        None
    }
}

/// 集合名到集合对象的动态映射。
#[derive(Clone, Default)]
pub struct CollectionRegistry {
    inner: BTreeMap<String, Arc<dyn Collection>>,
}

impl fmt::Debug for CollectionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.inner.keys()).finish()
    }
}

impl CollectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, name: impl Into<String>, c: Arc<dyn Collection>) -> &mut Self {
        self.inner.insert(name.into(), c);
        self
    }
    pub fn with(mut self, name: impl Into<String>, c: Arc<dyn Collection>) -> Self {
        self.insert(name, c);
        self
    }
    pub fn get(&self, name: &str) -> Option<&Arc<dyn Collection>> {
        self.inner.get(name)
    }
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<dyn Collection>)> {
        self.inner.iter().map(|(k, v)| (k.as_str(), v))
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
