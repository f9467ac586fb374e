//! Stored records and their wire representations.

use serde::{Deserialize, Serialize};

use super::db::StoreError;

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub created_at: i64,
    pub name: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(skip)]
    pub version: i64,
}

/// Permission codes held by a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Permissions(Vec<String>);

impl Permissions {
    pub fn new(mut codes: Vec<String>) -> Self {
        codes.sort();
        codes.dedup();
        Self(codes)
    }

    pub fn include(&self, code: &str) -> bool {
        self.0.iter().any(|c| c == code)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn codes(&self) -> &[String] {
        &self.0
    }
}

/// Where a quote comes from: both parts or neither.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Source {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl Source {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.kind.is_empty()
    }

    pub fn is_partial(&self) -> bool {
        !self.is_empty() && (self.title.is_empty() || self.kind.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Quote {
    pub id: i64,
    pub created_at: i64,
    pub modified_at: i64,
    pub user_id: i64,
    pub content: String,
    pub author: String,
    #[serde(skip_serializing_if = "Source::is_empty")]
    pub source: Source,
    pub tags: Vec<String>,
    pub version: i64,
}

/// A quote that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewQuote {
    pub user_id: i64,
    pub content: String,
    pub author: String,
    pub source: Source,
    pub tags: Vec<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QuoteRow {
    pub id: i64,
    pub created_at: i64,
    pub modified_at: i64,
    pub user_id: i64,
    pub content: String,
    pub author: String,
    pub source_title: String,
    pub source_type: String,
    pub tags: String,
    pub version: i64,
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QuoteListRow {
    pub total_records: i64,
    #[sqlx(flatten)]
    pub quote: QuoteRow,
}

impl TryFrom<QuoteRow> for Quote {
    type Error = StoreError;

    fn try_from(row: QuoteRow) -> Result<Self, Self::Error> {
        let tags: Vec<String> = serde_json::from_str(&row.tags)
            .map_err(|e| StoreError::Corrupt(format!("quote {} tags: {e}", row.id)))?;

        Ok(Self {
            id: row.id,
            created_at: row.created_at,
            modified_at: row.modified_at,
            user_id: row.user_id,
            content: row.content,
            author: row.author,
            source: Source {
                title: row.source_title,
                kind: row.source_type,
            },
            tags,
            version: row.version,
        })
    }
}

/// A user's reaction to a quote. Stored as 0 (dislike) or 1 (like).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reaction {
    Dislike,
    Like,
}

impl Reaction {
    pub fn code(self) -> i64 {
        match self {
            Self::Dislike => 0,
            Self::Like => 1,
        }
    }
}

impl TryFrom<i64> for Reaction {
    type Error = StoreError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Dislike),
            1 => Ok(Self::Like),
            other => Err(StoreError::Corrupt(format!("unknown reaction code {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReactionCounts {
    pub likes: i64,
    pub dislikes: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_partial() {
        assert!(!Source::default().is_partial());
        assert!(!Source { title: "Dune".into(), kind: "book".into() }.is_partial());
        assert!(Source { title: "Dune".into(), kind: String::new() }.is_partial());
        assert!(Source { title: String::new(), kind: "film".into() }.is_partial());
    }

    #[test]
    fn test_reaction_codes() {
        assert_eq!(Reaction::try_from(1).unwrap(), Reaction::Like);
        assert_eq!(Reaction::try_from(Reaction::Dislike.code()).unwrap(), Reaction::Dislike);
        assert!(matches!(Reaction::try_from(7), Err(StoreError::Corrupt(_))));
        assert_eq!(serde_json::to_string(&Reaction::Like).unwrap(), "\"like\"");
    }

    #[test]
    fn test_corrupt_tags_are_an_error() {
        let row = QuoteRow {
            id: 1,
            created_at: 0,
            modified_at: 0,
            user_id: 1,
            content: "c".into(),
            author: "a".into(),
            source_title: String::new(),
            source_type: String::new(),
            tags: "not json".into(),
            version: 1,
        };
        assert!(matches!(Quote::try_from(row), Err(StoreError::Corrupt(_))));
    }

    #[test]
    fn test_permissions_dedup() {
        let perms = Permissions::new(vec!["quotes:write".into(), "quotes:read".into(), "quotes:read".into()]);
        assert_eq!(perms.codes(), ["quotes:read", "quotes:write"]);
        assert!(perms.include("quotes:write"));
        assert!(!perms.include("admin"));
    }
}
