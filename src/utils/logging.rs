use chrono::{DateTime, Utc};
use chrono_tz::Asia::Kolkata;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::utils::config::ServerConfig;

const DEFAULT_FILTER: &str = "info,tower_http=info,axum=info";
const LOG_FILE_PREFIX: &str = "stock-ingest.log";

/// 日志时间使用交易所本地时间 (IST, UTC+5:30)
struct ExchangeTime;

fn exchange_timestamp(now: DateTime<Utc>) -> String {
    now.with_timezone(&Kolkata)
        .format("%Y-%m-%d %H:%M:%S%.3f")
        .to_string()
}

impl FormatTime for ExchangeTime {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        w.write_str(&exchange_timestamp(Utc::now()))
    }
}

/// 初始化全局日志
///
/// 控制台始终输出；`log_to_file` 开启时另写入 `log_dir` 下按天轮转的文件。
/// 返回的 guard 需在进程生命周期内持有，drop 时刷新文件缓冲。
pub fn init_logging(cfg: &ServerConfig) -> Option<WorkerGuard> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let console_layer = fmt::layer()
        .with_timer(ExchangeTime)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    let (file_layer, guard) = if cfg.log_to_file {
        let appender = rolling::daily(&cfg.log_dir, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = fmt::layer()
            .with_timer(ExchangeTime)
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    if cfg.log_to_file {
        tracing::info!("Writing logs to {}", cfg.log_dir.display());
    }
    guard
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamps_are_in_exchange_time() {
        let utc = Utc.with_ymd_and_hms(2023, 1, 2, 3, 45, 0).unwrap();
        assert_eq!(exchange_timestamp(utc), "2023-01-02 09:15:00.000");
    }

    #[test]
    fn utc_evening_rolls_into_next_exchange_day() {
        let utc = Utc.with_ymd_and_hms(2023, 1, 2, 20, 0, 0).unwrap();
        assert_eq!(exchange_timestamp(utc), "2023-01-03 01:30:00.000");
    }
}
