use std::sync::Arc;

use crate::{
    config::SeedValues,
    error::{Result, TestEnvError},
    graph::Graph,
    services::ConfigurationService,
    tokens,
};

/// 在任何组件启动前，把测试用的存储与消息目标写入图中的配置服务。
#[derive(Debug, Default, Clone, Copy)]
pub struct ConfigSeeder;

impl ConfigSeeder {
    /// 顺序写入 `mongo` 与 `amqp`；前一个写入完成后才发起下一个。
    pub async fn seed(&self, graph: &Graph, values: &SeedValues) -> Result<()> {
        let cfg: Arc<dyn ConfigurationService> = graph.resolve(tokens::CONFIGURATION)?;
        let mongo = serde_json::to_value(&values.mongo).map_err(|e| TestEnvError::ConfigWrite {
            key: "mongo".to_string(),
            source: e.into(),
        })?;
        let writes = [
            ("mongo", mongo),
            ("amqp", serde_json::Value::String(values.amqp.clone())),
        ];
        for (key, value) in writes {
            cfg.set(key, value)
                .await
                .map_err(|source| TestEnvError::ConfigWrite {
                    key: key.to_string(),
                    source,
                })?;
            tracing::debug!(key, "seeded test configuration");
        }
        Ok(())
    }
}
