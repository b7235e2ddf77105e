//! Source items: RSS articles and community posts
//!
//! Both are owned by the upstream content system; agora-ai reads them and only
//! flips the `issue_created` flag on articles after deriving an issue.

use serde::{Deserialize, Serialize};

/// Which upstream system a source item (and any issue derived from it) came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceKind {
    /// RSS article
    Rss,
    /// Community post
    Community,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Rss => "RSS",
            SourceKind::Community => "COMMUNITY",
        }
    }
}

/// RSS article row (read-mostly)
#[derive(Debug, Clone)]
pub struct Article {
    pub article_id: i64,
    pub title: String,
    pub content: Option<String>,
    pub thumbnail_url: Option<String>,
    pub is_deleted: bool,
}

/// Community post row (read-only)
#[derive(Debug, Clone)]
pub struct CommunityPost {
    pub post_id: i64,
    pub title: String,
    pub content: Option<String>,
}

/// A source item normalized for enrichment, regardless of kind
#[derive(Debug, Clone)]
pub struct SourceItem {
    pub kind: SourceKind,
    pub id: i64,
    pub title: String,
    pub content: Option<String>,
    pub thumbnail_url: Option<String>,
}

impl From<Article> for SourceItem {
    fn from(a: Article) -> Self {
        Self {
            kind: SourceKind::Rss,
            id: a.article_id,
            title: a.title,
            content: a.content,
            thumbnail_url: a.thumbnail_url,
        }
    }
}

impl From<CommunityPost> for SourceItem {
    fn from(p: CommunityPost) -> Self {
        Self {
            kind: SourceKind::Community,
            id: p.post_id,
            title: p.title,
            content: p.content,
            thumbnail_url: None,
        }
    }
}
