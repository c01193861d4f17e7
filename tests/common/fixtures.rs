//! Overview fixtures: posting binaries to an in-memory news server

use chrono::{DateTime, Duration, SubsecRound, Utc};
use usenet_indexer::MemoryNewsServer;
use usenet_indexer::nntp::OverviewRow;

/// Bytes per posted segment
pub const SEGMENT_BYTES: u64 = 1_000;

/// A TV group with both a group suggestion and TV rules
pub const TEEVEE: &str = "alt.binaries.teevee";

/// A group without any category suggestion
pub const MISC_GROUP: &str = "alt.binaries.misc";

/// A point `hours` before now, truncated to whole seconds like the store keeps it
pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    (Utc::now() - Duration::hours(hours)).trunc_subsecs(0)
}

/// One overview row with a unique message id
pub fn overview(group: &str, article_number: u64, subject: &str, posted: DateTime<Utc>) -> OverviewRow {
    OverviewRow {
        article_number,
        subject: subject.to_string(),
        poster: "poster@example.com".to_string(),
        date: Some(posted),
        message_id: format!("<{}.{}@fixtures.test>", article_number, group),
        bytes: SEGMENT_BYTES,
    }
}

/// Posts articles to one group with consecutive article numbers
pub struct Poster {
    server: MemoryNewsServer,
    group: String,
    next: u64,
}

impl Poster {
    /// Start posting at article 1
    pub fn new(server: &MemoryNewsServer, group: &str) -> Self {
        Self {
            server: server.clone(),
            group: group.to_string(),
            next: 1,
        }
    }

    /// Article number the next post gets
    pub fn next_article(&self) -> u64 {
        self.next
    }

    /// Post one article and return its number
    pub async fn segment(&mut self, subject: &str, posted: DateTime<Utc>) -> u64 {
        let number = self.next;
        self.server
            .post(&self.group, overview(&self.group, number, subject, posted))
            .await;
        self.next += 1;
        number
    }

    /// Post every segment of a single file: `{base} yEnc (s/segments)`
    pub async fn file(&mut self, base: &str, segments: u32, posted: DateTime<Utc>) {
        for s in 1..=segments {
            self.segment(&format!("{} yEnc ({}/{})", base, s, segments), posted)
                .await;
        }
    }

    /// Post a multi-volume binary: `[i/n] - "{name}{ext}" yEnc (s/segments)`
    pub async fn volumes(
        &mut self,
        name: &str,
        extensions: &[&str],
        segments: u32,
        posted: DateTime<Utc>,
    ) {
        let total = extensions.len();
        for (i, ext) in extensions.iter().enumerate() {
            let base = format!(r#"[{}/{}] - "{}{}""#, i + 1, total, name, ext);
            self.file(&base, segments, posted).await;
        }
    }
}
