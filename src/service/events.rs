use std::fmt;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Info => "INFO",
            Level::Warning => "WARNING",
            Level::Error => "ERROR",
        })
    }
}

/// 一条人类可读的进度消息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressEvent {
    pub level: Level,
    pub message: String,
}

/// 通道中传递的消息; `Done` 是终止标记, 无论运行成功与否都会发送
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Progress {
    Event(ProgressEvent),
    Done,
}

/// "记录日志并通知" 的出口, 由编排层持有; 核心组件不使用
pub trait EventSink {
    fn emit(&mut self, event: ProgressEvent);

    fn log(&mut self, level: Level, message: String) {
        match level {
            Level::Info => tracing::info!("{}", message),
            Level::Warning => tracing::warn!("{}", message),
            Level::Error => tracing::error!("{}", message),
        }
        self.emit(ProgressEvent { level, message });
    }

    fn info(&mut self, message: String) {
        self.log(Level::Info, message);
    }

    fn warn(&mut self, message: String) {
        self.log(Level::Warning, message);
    }

    fn error(&mut self, message: String) {
        self.log(Level::Error, message);
    }
}

/// 收集到内存 (测试 / 同步调用)
impl EventSink for Vec<ProgressEvent> {
    fn emit(&mut self, event: ProgressEvent) {
        self.push(event);
    }
}

/// 从阻塞的 worker 线程向异步消费端推送, 保持产生顺序
pub struct ChannelSink {
    tx: mpsc::Sender<Progress>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<Progress>) -> Self {
        Self { tx }
    }

    /// 发送终止标记并释放发送端
    pub fn finish(self) {
        if self.tx.blocking_send(Progress::Done).is_err() {
            tracing::debug!("progress receiver dropped before completion marker");
        }
    }
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: ProgressEvent) {
        if self.tx.blocking_send(Progress::Event(event)).is_err() {
            tracing::debug!("progress receiver dropped, event discarded");
        }
    }
}
