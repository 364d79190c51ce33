use std::sync::Arc;

use tracing::Instrument;
use uuid::Uuid;

use crate::{
    config::EnvConfig,
    dependency::Dependency,
    error::{Result, TestEnvError},
    graph::{Graph, GraphBuilder, Injector},
    merge::{merge, MergeReport, Overrides},
    reset::{CollectionResetter, ResetReport},
    seed::ConfigSeeder,
    services::{CoreService, RunningCore},
    tokens,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Building,
    Seeding,
    Starting,
    Running,
    Stopping,
}

/// 一个测试套件独占的环境：持有当前图与运行中的核心服务。
///
/// 由调用方按套件创建并以 `&mut` 传入钩子；同一时间最多一张活动图，
/// 重新 setup 会直接丢弃旧图（不做任何清理）。
pub struct TestEnvironment {
    run_id: Uuid,
    cfg: EnvConfig,
    base: Vec<Dependency>,
    builder: GraphBuilder,
    graph: Option<Graph>,
    core: Option<Box<dyn RunningCore>>,
    phase: Phase,
}

impl std::fmt::Debug for TestEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestEnvironment")
            .field("run_id", &self.run_id)
            .field("phase", &self.phase)
            .field("base", &self.base.len())
            .field("graph", &self.graph)
            .field("running", &self.core.is_some())
            .finish()
    }
}

impl TestEnvironment {
    pub fn new(base: Vec<Dependency>) -> Self {
        Self::with_config(base, EnvConfig::default())
    }

    pub fn with_config(base: Vec<Dependency>, cfg: EnvConfig) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            cfg,
            base,
            builder: GraphBuilder::default(),
            graph: None,
            core: None,
            phase: Phase::Idle,
        }
    }

    /// 基础依赖取自 `declare_dependency!` 在链接期登记的全部依赖。
    pub fn from_registry(cfg: EnvConfig) -> Self {
        Self::with_config(crate::registry::base_dependencies(), cfg)
    }

    /// 替换注入容器实现。
    pub fn with_injector(mut self, injector: Arc<dyn Injector>) -> Self {
        self.builder = GraphBuilder::new(injector);
        self
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }
    pub fn phase(&self) -> Phase {
        self.phase
    }
    pub fn config(&self) -> &EnvConfig {
        &self.cfg
    }
    pub fn graph(&self) -> Option<&Graph> {
        self.graph.as_ref()
    }
    pub fn is_running(&self) -> bool {
        self.core.is_some()
    }
    pub fn base(&self) -> &[Dependency] {
        &self.base
    }

    /// 合并覆盖并构建新图。构建失败时旧图同样已被丢弃。
    pub fn setup(&mut self, overrides: impl Into<Overrides>) -> Result<MergeReport> {
        let overrides = overrides.into();
        let span = tracing::info_span!("setup", run_id = %self.run_id);
        let _g = span.enter();
        self.phase = Phase::Building;
        self.graph = None;
        let (report, built) = if overrides.is_empty() {
            (MergeReport::default(), self.builder.build(&self.base))
        } else {
            let (deps, report) = merge(&self.base, overrides);
            (report, self.builder.build(&deps))
        };
        self.phase = Phase::Idle;
        self.graph = Some(built?);
        tracing::info!(shadowed = report.shadowed_count(), "test graph ready");
        Ok(report)
    }

    /// setup → 播种配置 → 启动核心服务。播种或启动失败不回滚：图保留，需重新 setup 后再试。
    pub async fn start(&mut self, overrides: impl Into<Overrides>) -> Result<MergeReport> {
        let report = self.setup(overrides)?;
        if self.core.is_some() {
            tracing::warn!(run_id = %self.run_id, "start() while a core instance is held; dropping the old handle without stopping it");
            self.core = None;
        }
        let span = tracing::info_span!("start", run_id = %self.run_id);
        match self.start_core().instrument(span).await {
            Ok(running) => {
                self.core = Some(running);
                self.phase = Phase::Running;
                tracing::info!(run_id = %self.run_id, "core service running");
                Ok(report)
            }
            Err(e) => {
                self.phase = Phase::Idle;
                Err(TestEnvError::Startup(e))
            }
        }
    }

    async fn start_core(&mut self) -> anyhow::Result<Box<dyn RunningCore>> {
        let graph = self.graph.as_ref().ok_or(TestEnvError::NotBuilt)?;
        self.phase = Phase::Seeding;
        ConfigSeeder.seed(graph, &self.cfg.seed).await?;
        self.phase = Phase::Starting;
        let core: Arc<dyn CoreService> = graph.resolve(tokens::CORE)?;
        core.start().await
    }

    /// 未持有核心实例时直接返回。无论 stop 成败，持有的实例都会被清除。
    /// 启动中途被丢弃（例如钩子超时）留下的阶段也在这里归位为 `Idle`。
    pub async fn stop(&mut self) -> Result<()> {
        let Some(core) = self.core.take() else {
            self.phase = Phase::Idle;
            return Ok(());
        };
        self.phase = Phase::Stopping;
        let res = core
            .stop()
            .instrument(tracing::info_span!("stop", run_id = %self.run_id))
            .await;
        self.phase = Phase::Idle;
        match res {
            Ok(()) => {
                tracing::info!(run_id = %self.run_id, "core service stopped");
                Ok(())
            }
            Err(e) => Err(TestEnvError::Shutdown(e)),
        }
    }

    /// 清空当前图中所有可删除的集合。
    pub async fn reset(&self) -> Result<ResetReport> {
        let graph = self.graph.as_ref().ok_or(TestEnvError::NotBuilt)?;
        CollectionResetter
            .reset(graph)
            .instrument(tracing::debug_span!("reset", run_id = %self.run_id))
            .await
    }
}
