use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreError;
use crate::models::{Attachment, IncomingItem};

pub const MANIFEST_FILE: &str = "manifest.json";

/// 邮件来源; 协议细节 (连接 / 重试) 由实现方负责
pub trait MessageSource: Send {
    /// 建立连接, 返回账户名 (用于进度消息)
    fn connect(&mut self) -> Result<String, StoreError>;

    /// 最近的 `limit` 封邮件, 按收件时间由新到旧
    fn recent(&mut self, limit: usize) -> Result<Vec<IncomingItem>, StoreError>;
}

#[derive(Debug, Deserialize)]
struct ManifestEntry {
    subject: String,
    received: DateTime<FixedOffset>,
    #[serde(default)]
    attachments: Vec<String>,
}

/// 以目录模拟的收件箱: `manifest.json` 列出邮件, 附件与之同目录
///
/// ```json
/// [{"subject": "...", "received": "2024-01-05T09:00:00-05:00", "attachments": ["a.xlsx"]}]
/// ```
#[derive(Debug, Clone)]
pub struct DirectoryInbox {
    root: PathBuf,
    account: String,
}

impl DirectoryInbox {
    pub fn new(root: impl Into<PathBuf>, account: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            account: account.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl MessageSource for DirectoryInbox {
    fn connect(&mut self) -> Result<String, StoreError> {
        if !self.root.is_dir() {
            return Err(StoreError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("inbox directory {} does not exist", self.root.display()),
            )));
        }
        Ok(self.account.clone())
    }

    fn recent(&mut self, limit: usize) -> Result<Vec<IncomingItem>, StoreError> {
        let raw = fs::read_to_string(self.root.join(MANIFEST_FILE))?;
        let entries: Vec<ManifestEntry> = serde_json::from_str(&raw)?;

        let mut items = entries
            .into_iter()
            .map(|entry| -> Result<IncomingItem, StoreError> {
                let attachments = entry
                    .attachments
                    .into_iter()
                    .map(|name| -> Result<Attachment, StoreError> {
                        let content = fs::read(self.root.join(&name))?;
                        Ok(Attachment { name, content })
                    })
                    .collect::<Result<Vec<_>, StoreError>>()?;
                Ok(IncomingItem {
                    subject: entry.subject,
                    received: entry.received,
                    attachments,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        // 新邮件在前; 同一时刻保持清单顺序
        items.sort_by(|a, b| b.received.cmp(&a.received));
        items.truncate(limit);
        Ok(items)
    }
}
