//! 套件示例：用替身核心服务覆盖真实实现，运行套件体并在其中 reset 集合

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use mmg_testenv::prelude::*;

struct LoudCore(&'static str);
struct LoudRunning(&'static str);

#[async_trait::async_trait]
impl CoreService for LoudCore {
    async fn start(&self) -> anyhow::Result<Box<dyn RunningCore>> {
        tracing::info!(core = self.0, "starting");
        Ok(Box::new(LoudRunning(self.0)))
    }
}

#[async_trait::async_trait]
impl RunningCore for LoudRunning {
    async fn stop(self: Box<Self>) -> anyhow::Result<()> {
        tracing::info!(core = self.0, "stopping");
        Ok(())
    }
}

struct PrintConfig;

#[async_trait::async_trait]
impl ConfigurationService for PrintConfig {
    async fn set(&self, key: &str, value: serde_json::Value) -> anyhow::Result<()> {
        tracing::info!(key, %value, "config set");
        Ok(())
    }
}

struct Nodes(AtomicUsize);

#[async_trait::async_trait]
impl Destroy for Nodes {
    async fn destroy(&self, _criteria: &Criteria) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Collection for Nodes {
    fn destroyer(&self) -> Option<&dyn Destroy> {
        Some(self)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mmg_testenv::logging::init();
    let nodes = Arc::new(Nodes(AtomicUsize::new(0)));
    let base = vec![
        Dependency::wrap(tokens::CONFIGURATION, Arc::new(PrintConfig) as Arc<dyn ConfigurationService>),
        Dependency::wrap(tokens::CORE, Arc::new(LoudCore("real")) as Arc<dyn CoreService>),
        Dependency::wrap(
            tokens::STORE,
            CollectionRegistry::new().with("nodes", nodes.clone()),
        ),
    ];
    let mut env = TestEnvironment::with_config(
        base,
        EnvConfig {
            seed: SeedValues::from_env(),
            ..EnvConfig::default()
        },
    );

    let mut suite = Suite::new("walkthrough");
    register_suite(
        &mut suite,
        env.config().hook_timeout,
        Some(override_callback(|_ctx| {
            Box::pin(async move {
                Ok(Dependency::wrap(tokens::CORE, Arc::new(LoudCore("mock")) as Arc<dyn CoreService>).into())
            })
        })),
    );
    suite
        .run(&mut env, |env, _ctx| {
            Box::pin(async move {
                let report = env.reset().await?;
                tracing::info!(destroyed = ?report.destroyed, skipped = ?report.skipped, "reset");
                Ok(())
            })
        })
        .await?;
    tracing::info!(resets = nodes.0.load(Ordering::Relaxed), "done");
    Ok(())
}
