//! `nntp-rs` backed [`NewsSource`]

use super::{GroupRange, NewsSource, OverviewRow, SessionFactory};
use crate::config::ServerConfig;
use crate::error::{Error, Result, ScanError};
use chrono::{DateTime, NaiveDateTime, Utc};
use nntp_rs::{NntpClient, NntpError, XoverEntry};
use std::sync::Arc;

// 423: no article with that number / no articles in that range
const NO_SUCH_ARTICLE_NUMBER: u16 = 423;

/// One authenticated NNTP connection
///
/// A dropped or broken connection is reopened on the next call and the
/// previously selected group is selected again.
pub struct NntpSession {
    config: Arc<nntp_rs::ServerConfig>,
    client: Option<NntpClient>,
    group: Option<String>,
}

impl NntpSession {
    /// Connect (and authenticate when credentials are configured)
    pub async fn connect(config: Arc<nntp_rs::ServerConfig>) -> Result<Self> {
        let client = open_client(&config).await?;
        Ok(Self {
            config,
            client: Some(client),
            group: None,
        })
    }

    async fn client(&mut self) -> Result<&mut NntpClient> {
        if self.client.as_ref().is_none_or(|c| c.is_broken()) {
            tracing::debug!(host = %self.config.host, "Reconnecting NNTP session");
            self.client = None;
            let mut client = open_client(&self.config).await?;
            if let Some(group) = &self.group {
                client.select_group(group).await?;
            }
            self.client = Some(client);
        }
        self.client
            .as_mut()
            .ok_or_else(|| Error::Other("NNTP session has no connection".to_string()))
    }

    // Transport-level failures poison the connection; the next call reconnects.
    fn note_failure(&mut self, e: &NntpError) {
        if matches!(
            e,
            NntpError::Io(_)
                | NntpError::Timeout
                | NntpError::ConnectionClosed
                | NntpError::Tls(_)
                | NntpError::NoGroupSelected
        ) {
            self.client = None;
        }
    }
}

async fn open_client(config: &Arc<nntp_rs::ServerConfig>) -> Result<NntpClient> {
    let mut client = NntpClient::connect(config.clone()).await?;
    if !config.username.is_empty() {
        client.authenticate().await?;
    }
    Ok(client)
}

#[async_trait::async_trait]
impl NewsSource for NntpSession {
    async fn select_group(&mut self, group: &str) -> Result<GroupRange> {
        let result = self.client().await?.select_group(group).await;
        match result {
            Ok(info) => {
                self.group = Some(group.to_string());
                Ok(GroupRange {
                    count: info.count,
                    first: info.first,
                    last: info.last,
                })
            }
            Err(NntpError::NoSuchGroup(_)) => Err(ScanError::GroupUnavailable {
                group: group.to_string(),
                reason: "no such group".to_string(),
            }
            .into()),
            Err(e) => {
                self.note_failure(&e);
                Err(e.into())
            }
        }
    }

    async fn fetch_overview(&mut self, start: u64, end: u64) -> Result<Vec<OverviewRow>> {
        let range = format!("{}-{}", start, end);
        let result = self.client().await?.over(&range).await;
        match result {
            Ok(entries) => Ok(entries.into_iter().map(overview_row).collect()),
            Err(NntpError::Protocol {
                code: NO_SUCH_ARTICLE_NUMBER,
                ..
            }) => Ok(Vec::new()),
            Err(e) => {
                self.note_failure(&e);
                Err(e.into())
            }
        }
    }

    async fn article_date(&mut self, article_number: u64) -> Result<Option<DateTime<Utc>>> {
        let result = self
            .client()
            .await?
            .over(&article_number.to_string())
            .await;
        match result {
            Ok(entries) => Ok(entries
                .into_iter()
                .find(|e| e.article_number == article_number)
                .and_then(|e| nntp_rs::parse_date(&e.date).ok())),
            Err(NntpError::InvalidArticleNumber)
            | Err(NntpError::NoSuchArticle(_))
            | Err(NntpError::Protocol {
                code: NO_SUCH_ARTICLE_NUMBER,
                ..
            }) => Ok(None),
            Err(e) => {
                self.note_failure(&e);
                Err(e.into())
            }
        }
    }

    async fn server_time(&mut self) -> Result<DateTime<Utc>> {
        let result = self.client().await?.date().await;
        match result {
            Ok(stamp) => Ok(parse_server_date(&stamp).unwrap_or_else(|| {
                tracing::debug!(stamp = %stamp, "Unparseable DATE response, using local clock");
                Utc::now()
            })),
            Err(e) => {
                self.note_failure(&e);
                Err(e.into())
            }
        }
    }
}

fn overview_row(entry: XoverEntry) -> OverviewRow {
    OverviewRow {
        article_number: entry.article_number,
        subject: decode_header(&entry.subject),
        poster: decode_header(&entry.author),
        date: nntp_rs::parse_date(&entry.date).ok(),
        message_id: entry.message_id,
        bytes: entry.bytes as u64,
    }
}

// Plain headers are passed through untouched so raw UTF-8 survives.
fn decode_header(raw: &str) -> String {
    if raw.contains("=?") {
        nntp_rs::encoded_words::decode_header_value(raw)
    } else {
        raw.to_string()
    }
}

fn parse_server_date(stamp: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(stamp, "%Y%m%d%H%M%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Opens [`NntpSession`]s against one configured server
pub struct NntpSessionFactory {
    config: Arc<nntp_rs::ServerConfig>,
}

impl NntpSessionFactory {
    /// Create a factory for the given server
    pub fn new(server: ServerConfig) -> Self {
        Self {
            config: Arc::new(server.into()),
        }
    }
}

#[async_trait::async_trait]
impl SessionFactory for NntpSessionFactory {
    async fn open(&self) -> Result<Box<dyn NewsSource>> {
        let session = NntpSession::connect(self.config.clone()).await?;
        Ok(Box::new(session))
    }
}
