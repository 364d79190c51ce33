//! 统一错误类型：手写 Display，不引入派生宏；协作方错误一律以 anyhow::Error 承载。
use std::{error::Error as StdError, fmt, time::Duration};

#[derive(Debug)]
pub enum TestEnvError {
    Construction(anyhow::Error), // 注入容器拒绝依赖列表（缺失依赖 / 循环依赖 / 工厂失败）
    ConfigWrite {
        key: String,
        source: anyhow::Error,
    },
    Startup(anyhow::Error),  // 播种或核心服务启动失败
    Shutdown(anyhow::Error), // 核心服务停止失败（句柄已清除）
    Reset {
        collection: String,
        source: anyhow::Error,
    },
    Unresolved(String),   // 图中没有该键
    TypeMismatch(String), // 键存在但类型不符
    NotBuilt,             // 尚未 setup
    HookTimeout(Duration),
    Hook(anyhow::Error), // 覆盖回调自身失败
}

impl fmt::Display for TestEnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestEnvError::Construction(e) => write!(f, "graph construction failed: {e:#}"),
            TestEnvError::ConfigWrite { key, source } => {
                write!(f, "configuration rejected `{key}`: {source:#}")
            }
            TestEnvError::Startup(e) => write!(f, "core service failed to start: {e:#}"),
            TestEnvError::Shutdown(e) => write!(f, "core service failed to stop: {e:#}"),
            TestEnvError::Reset { collection, source } => {
                write!(f, "collection `{collection}` failed to reset: {source:#}")
            }
            TestEnvError::Unresolved(key) => write!(f, "no component registered for `{key}`"),
            TestEnvError::TypeMismatch(key) => {
                write!(f, "component `{key}` has an unexpected type")
            }
            TestEnvError::NotBuilt => write!(f, "graph not built; call setup() or start() first"),
            TestEnvError::HookTimeout(d) => write!(f, "suite hook timed out after {d:?}"),
            TestEnvError::Hook(e) => write!(f, "suite hook callback failed: {e:#}"),
        }
    }
}

impl StdError for TestEnvError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TestEnvError::Construction(e)
            | TestEnvError::Startup(e)
            | TestEnvError::Shutdown(e)
            | TestEnvError::Hook(e)
            | TestEnvError::ConfigWrite { source: e, .. }
            | TestEnvError::Reset { source: e, .. } => Some(&**e),
            _ => None,
        }
    }
}

pub type Result<T = ()> = std::result::Result<T, TestEnvError>;
