//! 依赖单元与提供者令牌。
//!
//! 依赖的身份不是它的名字，而是它声明"提供"的令牌。令牌在构造时就从注解中解析出来，
//! 之后只通过 [`Dependency::provider`] 读取。
use std::{any::Any, borrow::Borrow, fmt, sync::Arc};

use crate::graph::Resolved;

/// 提供者令牌：覆盖匹配只看令牌相等。
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Token(String);

impl Token {
    pub fn new(s: impl Into<String>) -> Self {
        Token(s.into())
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Token {
    fn from(s: &str) -> Self {
        Token(s.to_string())
    }
}

impl From<String> for Token {
    fn from(s: String) -> Self {
        Token(s)
    }
}

impl Borrow<str> for Token {
    fn borrow(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Annotation {
    /// 声明本依赖提供的令牌；只有第一个生效。
    Provides(Token),
    /// 构造前必须已就绪的令牌。
    Inject(Vec<Token>),
    /// 纯标记，不参与匹配。
    Tag(String),
}

/// 注册时固定下来的提供者身份。
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub token: Option<Token>,
}

impl ProviderDescriptor {
    fn from_annotations(annotations: &[Annotation]) -> Self {
        let token = annotations.iter().find_map(|a| match a {
            Annotation::Provides(t) => Some(t.clone()),
            _ => None,
        });
        Self { token }
    }
}

pub type Instance = Arc<dyn Any + Send + Sync>;

pub type FactoryFn = Arc<dyn Fn(&Resolved<'_>) -> anyhow::Result<Instance> + Send + Sync>;

#[derive(Clone)]
pub struct Dependency {
    name: String,
    annotations: Vec<Annotation>,
    descriptor: ProviderDescriptor,
    factory: FactoryFn,
}

impl fmt::Debug for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependency")
            .field("name", &self.name)
            .field("annotations", &self.annotations)
            .field("provides", &self.descriptor.token)
            .finish()
    }
}

impl Dependency {
    /// 由工厂构造；工厂在图构建时调用一次，可通过 `Resolved` 取得 `Inject` 声明的依赖。
    pub fn factory<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&Resolved<'_>) -> anyhow::Result<Instance> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            annotations: Vec::new(),
            descriptor: ProviderDescriptor::default(),
            factory: Arc::new(f),
        }
    }

    /// 直接注册现成的值。
    ///
    /// 注意：这个值不会随图重建而更新。每次 setup 都会丢弃旧图，但新图拿到的
    /// 仍是同一个 `Arc` 实例，上一轮测试写入的内部状态会原样带进下一轮。
    /// 需要每张图一个新实例时改用 [`Dependency::factory`]。
    /// `wrap` 同理。
    pub fn value<T: Send + Sync + 'static>(name: impl Into<String>, v: T) -> Self {
        let inst: Instance = Arc::new(v);
        Self::factory(name, move |_| Ok(inst.clone()))
    }

    /// 以令牌为名包装一个值并声明提供该令牌，测试替身的常用写法。
    pub fn wrap<T: Send + Sync + 'static>(token: impl Into<Token>, v: T) -> Self {
        let token = token.into();
        Self::value(token.as_str(), v).provides(token)
    }

    pub fn provides(self, token: impl Into<Token>) -> Self {
        self.annotate(Annotation::Provides(token.into()))
    }

    pub fn inject<I, T>(self, tokens: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Token>,
    {
        let tokens = tokens.into_iter().map(Into::into).collect();
        self.annotate(Annotation::Inject(tokens))
    }

    pub fn annotate(mut self, a: Annotation) -> Self {
        self.annotations.push(a);
        self.descriptor = ProviderDescriptor::from_annotations(&self.annotations);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }

    pub fn descriptor(&self) -> &ProviderDescriptor {
        &self.descriptor
    }

    /// 提供者令牌；没有 `Provides` 注解时为 None，此依赖不能被覆盖。
    pub fn provider(&self) -> Option<&Token> {
        self.descriptor.token.as_ref()
    }

    /// 图中的键：有令牌用令牌，否则用名字。
    pub fn key(&self) -> &str {
        self.provider().map(Token::as_str).unwrap_or(&self.name)
    }

    /// 所有 `Inject` 注解声明的令牌，按出现顺序。
    pub fn requires(&self) -> impl Iterator<Item = &Token> {
        self.annotations.iter().flat_map(|a| match a {
            Annotation::Inject(ts) => ts.as_slice(),
            _ => &[],
        })
    }

    pub(crate) fn instantiate(&self, resolved: &Resolved<'_>) -> anyhow::Result<Instance> {
        (self.factory)(resolved)
    }
}

pub fn resolve_provider(dep: &Dependency) -> Option<&Token> {
    dep.provider()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_is_first_provides_annotation() {
        let d = Dependency::value("A", 1u8)
            .annotate(Annotation::Tag("x".into()))
            .provides("first")
            .provides("second");
        assert_eq!(d.provider().map(Token::as_str), Some("first"));
        assert_eq!(d.key(), "first");
    }

    #[test]
    fn no_provides_means_no_token() {
        let d = Dependency::value("B", ()).inject(["svc"]);
        assert!(resolve_provider(&d).is_none());
        assert_eq!(d.key(), "B");
        assert_eq!(d.requires().map(Token::as_str).collect::<Vec<_>>(), vec!["svc"]);
    }

    #[test]
    fn wrap_names_after_token() {
        let d = Dependency::wrap("Services.Core", 7u32);
        assert_eq!(d.name(), "Services.Core");
        assert_eq!(d.provider(), Some(&Token::new("Services.Core")));
    }
}
