#![allow(dead_code)]
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc, Mutex,
};
use std::time::Duration;

use anyhow::anyhow;
use mmg_testenv::prelude::*;

/// 共享事件日志，用来断言调用顺序。
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, s: impl Into<String>) {
        self.0.lock().unwrap().push(s.into());
    }
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

pub struct FakeCore {
    pub label: &'static str,
    pub log: Log,
    pub fail_start: bool,
    pub fail_stop: bool,
    pub start_delay: Option<Duration>,
}

impl FakeCore {
    pub fn new(label: &'static str, log: &Log) -> Self {
        Self {
            label,
            log: log.clone(),
            fail_start: false,
            fail_stop: false,
            start_delay: None,
        }
    }
}

#[async_trait::async_trait]
impl CoreService for FakeCore {
    async fn start(&self) -> anyhow::Result<Box<dyn RunningCore>> {
        if let Some(d) = self.start_delay {
            tokio::time::sleep(d).await;
        }
        if self.fail_start {
            return Err(anyhow!("{} refused to start", self.label));
        }
        self.log.push(format!("start:{}", self.label));
        Ok(Box::new(FakeRunning {
            label: self.label,
            log: self.log.clone(),
            fail_stop: self.fail_stop,
        }))
    }
}

struct FakeRunning {
    label: &'static str,
    log: Log,
    fail_stop: bool,
}

#[async_trait::async_trait]
impl RunningCore for FakeRunning {
    async fn stop(self: Box<Self>) -> anyhow::Result<()> {
        self.log.push(format!("stop:{}", self.label));
        if self.fail_stop {
            return Err(anyhow!("{} hung up", self.label));
        }
        Ok(())
    }
}

pub struct FakeConfig {
    pub log: Log,
    pub reject: Option<&'static str>,
}

#[async_trait::async_trait]
impl ConfigurationService for FakeConfig {
    async fn set(&self, key: &str, value: serde_json::Value) -> anyhow::Result<()> {
        if self.reject == Some(key) {
            return Err(anyhow!("read-only key"));
        }
        self.log.push(format!("set:{key}={value}"));
        Ok(())
    }
}

pub struct FakeCollection {
    pub destroyed: Arc<AtomicUsize>,
    pub fail: bool,
    pub delay: Duration,
    pub done: Arc<AtomicBool>,
}

impl FakeCollection {
    pub fn ok(counter: &Arc<AtomicUsize>) -> Self {
        Self {
            destroyed: counter.clone(),
            fail: false,
            delay: Duration::ZERO,
            done: Arc::new(AtomicBool::new(false)),
        }
    }
}

#[async_trait::async_trait]
impl Destroy for FakeCollection {
    async fn destroy(&self, criteria: &Criteria) -> anyhow::Result<()> {
        assert!(criteria.is_all());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail {
            return Err(anyhow!("collection locked"));
        }
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        self.done.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl Collection for FakeCollection {
    fn destroyer(&self) -> Option<&dyn Destroy> {
        Some(self)
    }
}

/// 没有删除能力的集合。
pub struct ReadOnlyCollection;
impl Collection for ReadOnlyCollection {}

pub fn core_dep(core: FakeCore) -> Dependency {
    Dependency::wrap(tokens::CORE, Arc::new(core) as Arc<dyn CoreService>)
}

pub fn config_dep(log: &Log, reject: Option<&'static str>) -> Dependency {
    let cfg = FakeConfig {
        log: log.clone(),
        reject,
    };
    Dependency::wrap(tokens::CONFIGURATION, Arc::new(cfg) as Arc<dyn ConfigurationService>)
}

pub fn store_dep(reg: CollectionRegistry) -> Dependency {
    Dependency::wrap(tokens::STORE, reg)
}

/// 基础应用：真实核心、配置服务、空集合注册表，外加一个无令牌的依赖。
pub fn base(log: &Log) -> Vec<Dependency> {
    vec![
        config_dep(log, None),
        core_dep(FakeCore::new("real", log)),
        store_dep(CollectionRegistry::new()),
        Dependency::value("Logger", ()),
    ]
}
