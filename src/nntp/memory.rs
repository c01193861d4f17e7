//! In-memory news server
//!
//! Holds articles per group and hands out [`MemorySession`]s that behave like
//! a real connection: overview ranges, missing article numbers, and injected
//! block failures. Useful for replaying captured overviews and for tests.

use super::{GroupRange, NewsSource, OverviewRow, SessionFactory};
use crate::error::{Result, ScanError};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Default)]
struct ServerState {
    groups: HashMap<String, BTreeMap<u64, OverviewRow>>,
    // (group, block start) -> remaining failures
    failures: HashMap<(String, u64), u32>,
    overview_requests: u64,
    now: Option<DateTime<Utc>>,
}

/// Shared in-memory article store
#[derive(Clone, Default)]
pub struct MemoryNewsServer {
    state: Arc<Mutex<ServerState>>,
}

impl MemoryNewsServer {
    /// Create an empty server
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a group exist even when it holds no articles
    pub async fn create_group(&self, group: &str) {
        self.state
            .lock()
            .await
            .groups
            .entry(group.to_string())
            .or_default();
    }

    /// Store an article row in a group
    pub async fn post(&self, group: &str, row: OverviewRow) {
        self.state
            .lock()
            .await
            .groups
            .entry(group.to_string())
            .or_default()
            .insert(row.article_number, row);
    }

    /// Remove an article (simulates expiry or takedown gaps)
    pub async fn expire(&self, group: &str, article_number: u64) {
        if let Some(articles) = self.state.lock().await.groups.get_mut(group) {
            articles.remove(&article_number);
        }
    }

    /// Fail the next `times` overview requests whose range starts at `start`
    pub async fn fail_block(&self, group: &str, start: u64, times: u32) {
        self.state
            .lock()
            .await
            .failures
            .insert((group.to_string(), start), times);
    }

    /// Pin the server clock returned by DATE
    pub async fn set_time(&self, now: DateTime<Utc>) {
        self.state.lock().await.now = Some(now);
    }

    /// Number of overview requests served so far (including failed ones)
    pub async fn overview_requests(&self) -> u64 {
        self.state.lock().await.overview_requests
    }

    /// Open a session without going through the [`SessionFactory`] trait
    pub fn session(&self) -> MemorySession {
        MemorySession {
            state: self.state.clone(),
            group: None,
        }
    }
}

#[async_trait::async_trait]
impl SessionFactory for MemoryNewsServer {
    async fn open(&self) -> Result<Box<dyn NewsSource>> {
        Ok(Box::new(self.session()))
    }
}

/// A session against a [`MemoryNewsServer`]
pub struct MemorySession {
    state: Arc<Mutex<ServerState>>,
    group: Option<String>,
}

impl MemorySession {
    fn selected(&self) -> Result<&str> {
        self.group
            .as_deref()
            .ok_or_else(|| nntp_rs::NntpError::NoGroupSelected.into())
    }
}

#[async_trait::async_trait]
impl NewsSource for MemorySession {
    async fn select_group(&mut self, group: &str) -> Result<GroupRange> {
        let state = self.state.lock().await;
        let Some(articles) = state.groups.get(group) else {
            return Err(ScanError::GroupUnavailable {
                group: group.to_string(),
                reason: "no such group".to_string(),
            }
            .into());
        };
        let range = match (articles.keys().next(), articles.keys().next_back()) {
            (Some(&first), Some(&last)) => GroupRange {
                count: articles.len() as u64,
                first,
                last,
            },
            _ => GroupRange {
                count: 0,
                first: 1,
                last: 0,
            },
        };
        drop(state);
        self.group = Some(group.to_string());
        Ok(range)
    }

    async fn fetch_overview(&mut self, start: u64, end: u64) -> Result<Vec<OverviewRow>> {
        let group = self.selected()?.to_string();
        let mut state = self.state.lock().await;
        state.overview_requests += 1;

        if let Some(remaining) = state.failures.get_mut(&(group.clone(), start))
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(nntp_rs::NntpError::Timeout.into());
        }

        Ok(state
            .groups
            .get(&group)
            .map(|articles| articles.range(start..=end).map(|(_, row)| row.clone()).collect())
            .unwrap_or_default())
    }

    async fn article_date(&mut self, article_number: u64) -> Result<Option<DateTime<Utc>>> {
        let group = self.selected()?.to_string();
        let state = self.state.lock().await;
        Ok(state
            .groups
            .get(&group)
            .and_then(|articles| articles.get(&article_number))
            .and_then(|row| row.date))
    }

    async fn server_time(&mut self) -> Result<DateTime<Utc>> {
        Ok(self.state.lock().await.now.unwrap_or_else(Utc::now))
    }
}
