//! 日志初始化
//!
//! 文件日志按天滚动写入 `{work_dir}/logs/tableside.log`；
//! 终端只输出 WARN 及以上 (`--verbose` 时与文件相同)，stdout 留给命令输出。

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{EnvFilter, Layer, fmt, prelude::*};

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

fn env_filter() -> EnvFilter {
    if let Ok(from_env) = EnvFilter::try_from_default_env() {
        from_env
    } else if cfg!(debug_assertions) {
        EnvFilter::new("info,tableside=debug,tableside_client=debug")
    } else {
        EnvFilter::new("warn,tableside=info")
    }
}

/// 初始化日志；返回的 guard 需持有到进程结束，否则文件日志会丢失
pub fn init(log_dir: &Path, verbose: bool) -> WorkerGuard {
    let file_appender = rolling::daily(log_dir, "tableside.log");
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_timer(LocalTimer)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_writer(non_blocking_file);

    let stderr_level = if verbose {
        LevelFilter::TRACE
    } else {
        LevelFilter::WARN
    };
    let stderr_layer = fmt::layer()
        .with_timer(LocalTimer)
        .with_ansi(true)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_filter(stderr_level);

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(stderr_layer)
        .try_init();

    tracing::info!(path = %log_dir.display(), "Tracing initialized");
    guard
}
