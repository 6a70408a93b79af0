//! 可观测性：tracing 订阅器初始化
//!
//! 日志写 stderr，stdout 只留给最终结果；级别由 RUST_LOG 控制，默认 info。

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
