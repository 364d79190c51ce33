//! 把环境的启停绑定到测试套件的前置/后置钩子上。
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    time::Duration,
};

use futures::future::BoxFuture;

use crate::{
    env::TestEnvironment,
    error::{Result, TestEnvError},
    merge::Overrides,
};

pub type Hook = Box<
    dyn for<'a> FnOnce(&'a mut TestEnvironment, &'a mut SuiteContext) -> BoxFuture<'a, Result<()>>
        + Send,
>;

pub type OverrideCallback = Box<
    dyn for<'a> FnOnce(&'a mut SuiteContext) -> BoxFuture<'a, anyhow::Result<Overrides>> + Send,
>;

/// 构造钩子，闭包签名由此处的约束推导。
pub fn hook<F>(f: F) -> Hook
where
    F: for<'a> FnOnce(&'a mut TestEnvironment, &'a mut SuiteContext) -> BoxFuture<'a, Result<()>>
        + Send
        + 'static,
{
    Box::new(f)
}

/// 构造覆盖回调：收到可写的套件上下文，返回要换入的依赖。
pub fn override_callback<F>(f: F) -> OverrideCallback
where
    F: for<'a> FnOnce(&'a mut SuiteContext) -> BoxFuture<'a, anyhow::Result<Overrides>>
        + Send
        + 'static,
{
    Box::new(f)
}

/// 测试运行器提供的注册原语。
pub trait SuiteHooks {
    fn before(&mut self, timeout: Duration, hook: Hook);
    fn after(&mut self, hook: Hook);
}

/// 套件级的可写上下文，按类型存放回调里创建的替身，供后续测试取用。
#[derive(Default)]
pub struct SuiteContext {
    slots: HashMap<TypeId, Box<dyn Any + Send>>,
}

impl fmt::Debug for SuiteContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SuiteContext")
            .field("slots", &self.slots.len())
            .finish()
    }
}

impl SuiteContext {
    /// 同类型再次写入会替换旧值并返回它。
    pub fn insert<T: Send + 'static>(&mut self, v: T) -> Option<T> {
        self.slots
            .insert(TypeId::of::<T>(), Box::new(v))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|b| *b)
    }
    pub fn get<T: Send + 'static>(&self) -> Option<&T> {
        self.slots
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref::<T>())
    }
    pub fn get_mut<T: Send + 'static>(&mut self) -> Option<&mut T> {
        self.slots
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut::<T>())
    }
    pub fn remove<T: Send + 'static>(&mut self) -> Option<T> {
        self.slots
            .remove(&TypeId::of::<T>())
            .and_then(|b| b.downcast::<T>().ok())
            .map(|b| *b)
    }
}

/// 前置钩子：有回调时先等待回调给出覆盖，再以这些覆盖启动环境。
pub fn register_before<H: SuiteHooks + ?Sized>(
    hooks: &mut H,
    timeout: Duration,
    callback: Option<OverrideCallback>,
) {
    hooks.before(
        timeout,
        hook(move |env, ctx| {
            Box::pin(async move {
                let overrides = match callback {
                    Some(cb) => cb(ctx).await.map_err(TestEnvError::Hook)?,
                    None => Overrides::none(),
                };
                env.start(overrides).await.map(|_| ())
            })
        }),
    );
}

/// 后置钩子：停止核心服务；从未启动时为空操作。
pub fn register_after<H: SuiteHooks + ?Sized>(hooks: &mut H) {
    hooks.after(hook(|env, _ctx| Box::pin(env.stop())));
}

pub fn register_suite<H: SuiteHooks + ?Sized>(
    hooks: &mut H,
    timeout: Duration,
    callback: Option<OverrideCallback>,
) {
    register_before(hooks, timeout, callback);
    register_after(hooks);
}

/// 最小的套件运行器：依次执行前置钩子（各自限时）、套件体、后置钩子。
/// 前置失败时跳过套件体；后置钩子总会执行；返回第一个错误。
pub struct Suite {
    name: String,
    befores: Vec<(Duration, Hook)>,
    afters: Vec<Hook>,
    ctx: SuiteContext,
}

impl fmt::Debug for Suite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Suite")
            .field("name", &self.name)
            .field("befores", &self.befores.len())
            .field("afters", &self.afters.len())
            .finish()
    }
}

impl SuiteHooks for Suite {
    fn before(&mut self, timeout: Duration, hook: Hook) {
        self.befores.push((timeout, hook));
    }
    fn after(&mut self, hook: Hook) {
        self.afters.push(hook);
    }
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            befores: Vec::new(),
            afters: Vec::new(),
            ctx: SuiteContext::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn run<F>(mut self, env: &mut TestEnvironment, body: F) -> anyhow::Result<SuiteContext>
    where
        F: for<'a> FnOnce(
                &'a mut TestEnvironment,
                &'a mut SuiteContext,
            ) -> BoxFuture<'a, anyhow::Result<()>>
            + Send
            + 'static,
    {
        let mut first: Option<anyhow::Error> = None;
        for (limit, h) in std::mem::take(&mut self.befores) {
            match tokio::time::timeout(limit, h(&mut *env, &mut self.ctx)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    first = Some(e.into());
                    break;
                }
                Err(_) => {
                    first = Some(TestEnvError::HookTimeout(limit).into());
                    break;
                }
            }
        }
        if first.is_none() {
            if let Err(e) = body(&mut *env, &mut self.ctx).await {
                first = Some(e);
            }
        } else {
            tracing::warn!(suite = %self.name, "before hook failed; suite body skipped");
        }
        for h in std::mem::take(&mut self.afters) {
            if let Err(e) = h(&mut *env, &mut self.ctx).await {
                tracing::error!(suite = %self.name, error = %e, "after hook failed");
                first.get_or_insert(e.into());
            }
        }
        match first {
            Some(e) => Err(e),
            None => Ok(self.ctx),
        }
    }
}
