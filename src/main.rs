use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use payperiod_recon::service::worker::{self, PROGRESS_CHANNEL_CAPACITY};
use payperiod_recon::service::{Level, ProgressEvent};
use payperiod_recon::store::{self, DirectoryInbox};
use payperiod_recon::{AppConfig, PeriodResolver};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ppr", version, about = "Pay-period report filing and reconciliation")]
struct Cli {
    /// INI 配置文件
    #[arg(long, global = true, default_value = "config.ini")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 从收件箱拉取报表, 归档并合并
    Run,
    /// 处理落地目录中的一对报表
    Sweep,
    /// 显示某日期所属的周期目录与归档子目录
    Resolve {
        #[arg(long)]
        date: NaiveDate,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // 加载配置
    let config = AppConfig::load(&cli.config)?;
    init_tracing(&config)?;
    info!("Loaded configuration from {}", cli.config.display());

    match cli.command {
        Command::Run => {
            let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
            let source = Box::new(DirectoryInbox::new(
                config.inbox.path.clone(),
                config.inbox.account.clone(),
            ));
            let handle = worker::spawn_ingest(config, source, tx);
            worker::drain(rx, print_event).await;
            if let Some(summary) = handle.await? {
                info!(
                    "downloaded {} attachment(s), merged {} period(s), {} failed",
                    summary.downloaded,
                    summary.merged_periods.len(),
                    summary.failed_periods.len()
                );
            }
        }
        Command::Sweep => {
            let (tx, rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
            let handle = worker::spawn_sweep(config, tx);
            worker::drain(rx, print_event).await;
            handle.await?;
        }
        Command::Resolve { date } => {
            let schedule = store::load_schedule(&config.folders.pay_period_schedule_csv)?;
            let resolver =
                PeriodResolver::with_buffer_days(schedule, config.fuzzylogic.final_pull_buffer_days);
            match resolver.resolve(date) {
                Ok(resolution) => println!(
                    "{} / {}",
                    resolution.folder_name(),
                    resolution.bucket.folder_name()
                ),
                Err(e) => println!("{date}: {e}"),
            }
        }
    }

    Ok(())
}

fn print_event(event: ProgressEvent) {
    match event.level {
        Level::Info => println!("{}", event.message),
        level => println!("[{level}] {}", event.message),
    }
}

/// 控制台 (本地时间) + 追加写入的日志文件
fn init_tracing(config: &AppConfig) -> std::io::Result<()> {
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.folders.log_file)?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console = tracing_subscriber::fmt::layer()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr);
    let file = tracing_subscriber::fmt::layer()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(false)
        .with_ansi(false)
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .init();
    Ok(())
}
