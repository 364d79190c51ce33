//! 编排器直接访问的三个组件的提供者令牌。

/// 负责启停所有长生命周期资源的核心服务。
pub const CORE: &str = "Services.Core";
/// 配置服务：启动前写入测试用的存储与消息目标。
pub const CONFIGURATION: &str = "Services.Configuration";
/// 持久化集合注册表：reset 时逐个清空。
pub const STORE: &str = "Services.Waterline";
