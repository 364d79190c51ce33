pub mod config;
pub mod dependency;
pub mod env;
pub mod error;
pub mod graph;
pub mod hooks;
pub mod logging;
pub mod merge;
pub mod registry;
pub mod reset;
pub mod seed;
pub mod services;
pub mod tokens;

// 供 declare_dependency! 展开使用
#[doc(hidden)]
pub use inventory;

pub mod prelude {
    pub use crate::config::{EnvConfig, MongoTarget, SeedValues, DEFAULT_HOOK_TIMEOUT};
    pub use crate::dependency::{resolve_provider, Annotation, Dependency, Instance, Token};
    pub use crate::env::{Phase, TestEnvironment};
    pub use crate::error::{Result, TestEnvError};
    pub use crate::graph::{DefaultInjector, Graph, Injector};
    pub use crate::hooks::{
        hook, override_callback, register_after, register_before, register_suite, Suite,
        SuiteContext, SuiteHooks,
    };
    pub use crate::merge::{merge, MergeReport, Overrides};
    pub use crate::reset::ResetReport;
    pub use crate::services::{
        Collection, CollectionRegistry, ConfigurationService, CoreService, Criteria, Destroy,
        RunningCore,
    };
    pub use crate::tokens;
}
