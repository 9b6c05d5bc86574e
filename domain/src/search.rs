use crate::{Document, DomainError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Filter criteria for a document search. Every field is optional; an absent
/// list and an empty list both leave that criterion inactive.
///
/// Lists are OR-ed internally, and all active criteria are AND-ed together.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    /// Title must start with at least one of these (case-sensitive).
    #[serde(default)]
    pub title_prefixes: Option<Vec<String>>,
    /// Content must contain at least one of these (case-sensitive).
    #[serde(default)]
    pub contains_contents: Option<Vec<String>>,
    /// Author id must be one of these.
    #[serde(default)]
    pub author_ids: Option<Vec<String>>,
    /// Inclusive lower bound on `created`.
    #[serde(default)]
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created`.
    #[serde(default)]
    pub created_to: Option<DateTime<Utc>>,
}

impl SearchRequest {
    /// A request with every criterion inactive; matches all documents.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn title_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.title_prefixes = Some(prefixes.into_iter().map(Into::into).collect());
        self
    }

    pub fn contains_contents<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.contains_contents = Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    pub fn author_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.author_ids = Some(ids.into_iter().map(Into::into).collect());
        self
    }

    pub fn created_from(mut self, from: DateTime<Utc>) -> Self {
        self.created_from = Some(from);
        self
    }

    pub fn created_to(mut self, to: DateTime<Utc>) -> Self {
        self.created_to = Some(to);
        self
    }

    /// True when no criterion is active.
    pub fn is_unfiltered(&self) -> bool {
        active(&self.title_prefixes).is_none()
            && active(&self.contains_contents).is_none()
            && active(&self.author_ids).is_none()
            && self.created_from.is_none()
            && self.created_to.is_none()
    }

    /// Both bounds set with `from` after `to`; no document can match.
    pub fn has_inverted_range(&self) -> bool {
        matches!((self.created_from, self.created_to), (Some(from), Some(to)) if from > to)
    }

    /// Evaluates every active criterion against `document`, stopping at the
    /// first one that fails.
    ///
    /// Returns `Err(DomainError::MissingAuthor)` when an author filter is
    /// active and the document has no author. Callers scanning many
    /// documents should treat that as "excluded" and keep going.
    pub fn evaluate(&self, document: &Document) -> Result<bool, DomainError> {
        // Title: any prefix, absent title never matches
        if let Some(prefixes) = active(&self.title_prefixes) {
            let title_matches = document.title.as_deref().is_some_and(|title| {
                prefixes
                    .iter()
                    .any(|prefix| title.starts_with(prefix.as_str()))
            });
            if !title_matches {
                return Ok(false);
            }
        }

        // Content: any substring, absent content never matches
        if let Some(keywords) = active(&self.contains_contents) {
            let content_matches = document.content.as_deref().is_some_and(|content| {
                keywords
                    .iter()
                    .any(|keyword| content.contains(keyword.as_str()))
            });
            if !content_matches {
                return Ok(false);
            }
        }

        if let Some(author_ids) = active(&self.author_ids) {
            let author = document
                .author
                .as_ref()
                .ok_or_else(|| DomainError::MissingAuthor(document.id_label().to_string()))?;
            if !author_ids.iter().any(|id| *id == author.id) {
                return Ok(false);
            }
        }

        if let Some(from) = self.created_from {
            if document.created < from {
                return Ok(false);
            }
        }

        if let Some(to) = self.created_to {
            if document.created > to {
                return Ok(false);
            }
        }

        Ok(true)
    }

    /// Like [`evaluate`](Self::evaluate), with a document that cannot be
    /// evaluated counted as not matching.
    pub fn matches(&self, document: &Document) -> bool {
        self.evaluate(document).unwrap_or(false)
    }
}

/// Treats `None` and an empty list the same way: inactive.
fn active(criteria: &Option<Vec<String>>) -> Option<&[String]> {
    criteria.as_deref().filter(|values| !values.is_empty())
}
