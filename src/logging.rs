use tracing_subscriber::EnvFilter;

/// 为测试二进制安装 fmt 订阅者，按 `RUST_LOG` 过滤（默认 info）。可重复调用。
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
