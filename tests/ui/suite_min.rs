use std::sync::Arc;

use mmg_testenv::prelude::*;

struct Core;
struct Running;

#[async_trait::async_trait]
impl CoreService for Core {
    async fn start(&self) -> anyhow::Result<Box<dyn RunningCore>> {
        Ok(Box::new(Running))
    }
}

#[async_trait::async_trait]
impl RunningCore for Running {
    async fn stop(self: Box<Self>) -> anyhow::Result<()> {
        Ok(())
    }
}

struct Config;

#[async_trait::async_trait]
impl ConfigurationService for Config {
    async fn set(&self, _key: &str, _value: serde_json::Value) -> anyhow::Result<()> {
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let base = vec![
        Dependency::wrap(tokens::CONFIGURATION, Arc::new(Config) as Arc<dyn ConfigurationService>),
        Dependency::wrap(tokens::CORE, Arc::new(Core) as Arc<dyn CoreService>),
        Dependency::wrap(tokens::STORE, CollectionRegistry::new()),
    ];
    let mut env = TestEnvironment::new(base);
    let mut suite = Suite::new("min");
    register_suite(&mut suite, DEFAULT_HOOK_TIMEOUT, None);
    suite
        .run(&mut env, |env, _ctx| {
            Box::pin(async move {
                env.reset().await?;
                Ok(())
            })
        })
        .await?;
    Ok(())
}
