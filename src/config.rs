use std::time::Duration;

use serde::{Deserialize, Serialize};

/// 启动钩子的默认超时；启动可能要真实连接后端服务。
pub const DEFAULT_HOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MongoTarget {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl Default for MongoTarget {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 27017,
            database: "renasar-pxe-test".to_string(),
            user: String::new(),
            password: String::new(),
        }
    }
}

/// 启动前写入配置服务的测试目标。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedValues {
    pub mongo: MongoTarget,
    pub amqp: String,
}

impl Default for SeedValues {
    fn default() -> Self {
        Self {
            mongo: MongoTarget::default(),
            amqp: "amqp://localhost".to_string(),
        }
    }
}

impl SeedValues {
    /// 默认值之上叠加 `TESTENV_*` 环境变量。
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub(crate) fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut v = Self::default();
        if let Some(h) = get("TESTENV_MONGO_HOST") {
            v.mongo.host = h;
        }
        if let Some(p) = get("TESTENV_MONGO_PORT") {
            match p.parse() {
                Ok(port) => v.mongo.port = port,
                Err(_) => {
                    tracing::warn!(value = %p, "TESTENV_MONGO_PORT is not a port number; keeping default")
                }
            }
        }
        if let Some(d) = get("TESTENV_MONGO_DATABASE") {
            v.mongo.database = d;
        }
        if let Some(u) = get("TESTENV_MONGO_USER") {
            v.mongo.user = u;
        }
        if let Some(pw) = get("TESTENV_MONGO_PASSWORD") {
            v.mongo.password = pw;
        }
        if let Some(a) = get("TESTENV_AMQP_URL") {
            v.amqp = a;
        }
        v
    }
}

#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub hook_timeout: Duration,
    pub seed: SeedValues,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            hook_timeout: DEFAULT_HOOK_TIMEOUT,
            seed: SeedValues::default(),
        }
    }
}
