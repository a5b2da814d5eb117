//! Local field checks run before any statement is issued.

use crate::models::{CollectionDraft, QueryDraft};
use crate::{DbError, Result};

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_QUERY_DESCRIPTION_LEN: usize = 1000;
pub const MAX_COLLECTION_NAME_LEN: usize = 100;
pub const MAX_COLLECTION_DESCRIPTION_LEN: usize = 500;

impl QueryDraft {
    /// Trim every field, drop blank tags and check lengths.
    pub fn validated(self) -> Result<Self> {
        let title = self.title.trim().to_string();
        let content = self.content.trim().to_string();
        let description = trimmed_optional(self.description);

        if title.is_empty() {
            return Err(invalid("Title is required"));
        }
        if content.is_empty() {
            return Err(invalid("Content is required"));
        }
        if title.chars().count() > MAX_TITLE_LEN {
            return Err(invalid(format!(
                "Title must be less than {MAX_TITLE_LEN} characters"
            )));
        }
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_QUERY_DESCRIPTION_LEN)
        {
            return Err(invalid(format!(
                "Description must be less than {MAX_QUERY_DESCRIPTION_LEN} characters"
            )));
        }

        let tags = self
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            title,
            content,
            description,
            tags,
        })
    }
}

impl CollectionDraft {
    pub fn validated(self) -> Result<Self> {
        let name = self.name.trim().to_string();
        let description = trimmed_optional(self.description);

        if name.is_empty() {
            return Err(invalid("Collection name is required"));
        }
        if name.chars().count() > MAX_COLLECTION_NAME_LEN {
            return Err(invalid(format!(
                "Collection name must be less than {MAX_COLLECTION_NAME_LEN} characters"
            )));
        }
        if description
            .as_ref()
            .is_some_and(|d| d.chars().count() > MAX_COLLECTION_DESCRIPTION_LEN)
        {
            return Err(invalid(format!(
                "Description must be less than {MAX_COLLECTION_DESCRIPTION_LEN} characters"
            )));
        }

        Ok(Self { name, description })
    }
}

fn trimmed_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn invalid(reason: impl Into<String>) -> DbError {
    DbError::Validation(reason.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(title: &str, content: &str) -> QueryDraft {
        QueryDraft {
            title: title.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    fn reason(err: DbError) -> String {
        match err {
            DbError::Validation(msg) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn query_requires_title_and_content() {
        assert_eq!(reason(draft("  ", "x").validated().unwrap_err()), "Title is required");
        assert_eq!(reason(draft("t", "\n\t").validated().unwrap_err()), "Content is required");
    }

    #[test]
    fn query_length_limits() {
        let long_title = "a".repeat(MAX_TITLE_LEN + 1);
        assert!(draft(&long_title, "x").validated().is_err());
        assert!(draft(&"a".repeat(MAX_TITLE_LEN), "x").validated().is_ok());

        let mut d = draft("t", "x");
        d.description = Some("d".repeat(MAX_QUERY_DESCRIPTION_LEN + 1));
        assert!(d.validated().is_err());
    }

    #[test]
    fn query_fields_are_normalised() {
        let d = QueryDraft {
            title: "  Error rate  ".into(),
            content: " dataset | count ".into(),
            description: Some("   ".into()),
            tags: vec![" logs ".into(), "".into(), "logs".into()],
        }
        .validated()
        .unwrap();

        assert_eq!(d.title, "Error rate");
        assert_eq!(d.content, "dataset | count");
        assert_eq!(d.description, None);
        assert_eq!(d.tags, vec!["logs", "logs"]);
    }

    #[test]
    fn collection_rules() {
        let ok = CollectionDraft {
            name: "n".repeat(MAX_COLLECTION_NAME_LEN),
            description: Some("d".repeat(MAX_COLLECTION_DESCRIPTION_LEN)),
        };
        assert!(ok.validated().is_ok());

        let blank = CollectionDraft::default();
        assert_eq!(reason(blank.validated().unwrap_err()), "Collection name is required");

        let long_name = CollectionDraft {
            name: "n".repeat(MAX_COLLECTION_NAME_LEN + 1),
            description: None,
        };
        assert!(long_name.validated().is_err());

        let long_desc = CollectionDraft {
            name: "ok".into(),
            description: Some("d".repeat(MAX_COLLECTION_DESCRIPTION_LEN + 1)),
        };
        assert!(long_desc.validated().is_err());
    }
}
