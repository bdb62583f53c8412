use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::events::{ChannelSink, EventSink, Progress, ProgressEvent};
use super::ingest::{IngestionOrchestrator, RunSummary};
use super::landing::{LandingSweep, SweepOutcome};
use super::period::PeriodResolver;
use crate::config::AppConfig;
use crate::store::{self, MessageSource};

/// 进度通道容量
pub const PROGRESS_CHANNEL_CAPACITY: usize = 64;

/// 在阻塞线程上执行一次收件箱运行; 无论结果如何, 通道最后一条都是 `Done`.
/// 排班表加载失败时只发送错误消息, 返回 `None`.
pub fn spawn_ingest(
    config: AppConfig,
    mut source: Box<dyn MessageSource>,
    tx: mpsc::Sender<Progress>,
) -> JoinHandle<Option<RunSummary>> {
    tokio::task::spawn_blocking(move || {
        let mut sink = ChannelSink::new(tx);
        let summary = load_resolver(&config, &config.folders.pay_period_schedule_csv, &mut sink)
            .map(|resolver| {
                IngestionOrchestrator::new(&config, resolver).run(source.as_mut(), &mut sink)
            });
        sink.finish();
        summary
    })
}

/// 落地目录扫描, 通道约定同 [`spawn_ingest`]
pub fn spawn_sweep(config: AppConfig, tx: mpsc::Sender<Progress>) -> JoinHandle<Option<SweepOutcome>> {
    tokio::task::spawn_blocking(move || {
        let mut sink = ChannelSink::new(tx);
        let outcome = load_resolver(&config, &config.landing.pay_period_schedule, &mut sink)
            .map(|resolver| LandingSweep::new(&config, resolver).run(&mut sink));
        sink.finish();
        outcome
    })
}

fn load_resolver(
    config: &AppConfig,
    schedule_path: &std::path::Path,
    sink: &mut dyn EventSink,
) -> Option<PeriodResolver> {
    match store::load_schedule(schedule_path) {
        Ok(schedule) => Some(PeriodResolver::with_buffer_days(
            schedule,
            config.fuzzylogic.final_pull_buffer_days,
        )),
        Err(e) => {
            sink.error(format!("Failed to load pay period schedule: {e}"));
            None
        }
    }
}

/// 按产生顺序消费进度消息, 直到收到 `Done` (或发送端全部释放)
pub async fn drain<F>(mut rx: mpsc::Receiver<Progress>, mut on_event: F) -> usize
where
    F: FnMut(ProgressEvent),
{
    let mut received = 0;
    while let Some(progress) = rx.recv().await {
        match progress {
            Progress::Event(event) => {
                received += 1;
                on_event(event);
            }
            Progress::Done => break,
        }
    }
    received
}
