//! Reference item use-case service.
//!
//! # Responsibility
//! - Provide reference create/edit/get/list APIs.
//! - Derive the markdown preview projection (`preview_text`) on every write.
//! - Normalize and atomically replace reference tags.
//!
//! # Invariants
//! - Edits use full body replacement semantics.
//! - Lists are sorted by `updated_at DESC, uuid ASC`.
//! - Tag names are normalized to lowercase and deduplicated.

use crate::model::item::{now_epoch_ms, ItemId, ItemKind, ItemRef};
use crate::model::reference::ReferenceItem;
use crate::repo::reference_repo::{
    normalize_tag, normalize_tags, ReferenceListQuery, ReferenceRepository,
};
use crate::service::{require_usable_parent, ServiceError, ServiceResult};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;

pub const DEFAULT_REFERENCE_LIMIT: u32 = 20;
pub const MAX_REFERENCE_LIMIT: u32 = 100;
const PREVIEW_CHARS: usize = 100;

static MARKDOWN_IMAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*]\(([^)]+)\)").expect("valid image regex"));
static MARKDOWN_LINK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link regex"));
static MARKDOWN_SYMBOL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[\*_`#>~\-\[\]\(\)!]+"#).expect("valid markdown symbol regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Input for [`ReferenceService::add`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewReference {
    pub title: String,
    pub body: String,
    pub url: Option<String>,
    pub category_uuid: Option<ItemId>,
    pub tags: Vec<String>,
}

/// Partial update. Outer `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferencePatch {
    pub title: Option<String>,
    pub body: Option<String>,
    pub url: Option<Option<String>>,
    pub category_uuid: Option<Option<ItemId>>,
}

/// List result envelope used by service callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceListResult {
    pub items: Vec<ReferenceItem>,
    /// Effective normalized limit used by the query.
    pub applied_limit: u32,
}

/// Markdown-derived preview projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkdownPreview {
    /// Sanitized summary text.
    pub preview_text: Option<String>,
    /// Target of the first markdown link; becomes the item url when none
    /// was given.
    pub first_link: Option<String>,
}

pub struct ReferenceService<R: ReferenceRepository> {
    repo: R,
}

impl<R: ReferenceRepository> ReferenceService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn add(&self, input: NewReference) -> ServiceResult<ReferenceItem> {
        reject_blank_tags(&input.tags)?;
        let preview = derive_markdown_preview(&input.body);

        let mut item = ReferenceItem::new(input.title.trim());
        item.url = clean_url(input.url).or(preview.first_link);
        item.preview_text = preview.preview_text;
        item.body = input.body;
        item.category_uuid = input.category_uuid;
        item.tags = normalize_tags(&input.tags);
        item.validate()?;
        self.check_category(item.category_uuid)?;

        let id = self.repo.create_reference(&item)?;
        info!("event=reference_add module=service status=ok id={id}");
        self.read_back(id, "created reference not found in read-back")
    }

    pub fn edit(&self, id: ItemId, patch: ReferencePatch) -> ServiceResult<ReferenceItem> {
        let mut item = self.require_active(id)?;
        if let Some(title) = patch.title {
            item.title = title.trim().to_string();
        }
        if let Some(url) = patch.url {
            item.url = clean_url(url);
        }
        if let Some(body) = patch.body {
            let preview = derive_markdown_preview(&body);
            item.preview_text = preview.preview_text;
            if item.url.is_none() {
                item.url = preview.first_link;
            }
            item.body = body;
        }
        if let Some(category_uuid) = patch.category_uuid {
            if category_uuid != item.category_uuid {
                self.check_category(category_uuid)?;
            }
            item.category_uuid = category_uuid;
        }
        self.repo.update_reference(&item)?;
        self.read_back(id, "edited reference not found in read-back")
    }

    pub fn get(&self, id: ItemId) -> ServiceResult<Option<ReferenceItem>> {
        Ok(self.repo.get_reference(id, false)?)
    }

    /// Lists references using optional tag/category filters and pagination.
    pub fn list(
        &self,
        tag: Option<String>,
        category_uuid: Option<ItemId>,
        limit: Option<u32>,
        offset: u32,
    ) -> ServiceResult<ReferenceListResult> {
        let applied_limit = normalize_reference_limit(limit);
        let query = ReferenceListQuery {
            tag: tag.and_then(|value| normalize_tag(&value)),
            category_uuid,
            include_deleted: false,
            limit: Some(applied_limit),
            offset,
        };
        Ok(ReferenceListResult {
            items: self.repo.list_references(&query)?,
            applied_limit,
        })
    }

    /// Atomically replaces the full tag set for one reference item.
    pub fn set_tags(&self, id: ItemId, tags: Vec<String>) -> ServiceResult<ReferenceItem> {
        reject_blank_tags(&tags)?;
        self.repo.set_reference_tags(id, &normalize_tags(&tags))?;
        self.read_back(id, "reference missing after tag replacement")
    }

    /// Lists normalized tags known by storage.
    pub fn list_tags(&self) -> ServiceResult<Vec<String>> {
        Ok(self.repo.list_tags()?)
    }

    pub fn trash(&self, id: ItemId) -> ServiceResult<()> {
        self.repo.soft_delete_reference(id, now_epoch_ms())?;
        info!("event=reference_trash module=service status=ok id={id}");
        Ok(())
    }

    pub fn restore(&self, id: ItemId) -> ServiceResult<ReferenceItem> {
        self.repo.restore_reference(id)?;
        self.read_back(id, "restored reference not found in read-back")
    }

    fn check_category(&self, category_uuid: Option<ItemId>) -> ServiceResult<()> {
        let Some(category_uuid) = category_uuid else {
            return Ok(());
        };
        let parent = ItemRef::new(ItemKind::Category, category_uuid);
        require_usable_parent(parent, self.repo.parent_state(parent)?, false)
    }

    fn require_active(&self, id: ItemId) -> ServiceResult<ReferenceItem> {
        self.repo
            .get_reference(id, false)?
            .ok_or(ServiceError::NotFound(ItemRef::new(ItemKind::ReferenceItem, id)))
    }

    fn read_back(&self, id: ItemId, details: &'static str) -> ServiceResult<ReferenceItem> {
        self.repo
            .get_reference(id, false)?
            .ok_or(ServiceError::InconsistentState(details))
    }
}

/// Clamps a caller limit into `1..=MAX_REFERENCE_LIMIT`, defaulting to
/// `DEFAULT_REFERENCE_LIMIT`.
pub fn normalize_reference_limit(limit: Option<u32>) -> u32 {
    match limit {
        None | Some(0) => DEFAULT_REFERENCE_LIMIT,
        Some(value) => value.min(MAX_REFERENCE_LIMIT),
    }
}

fn reject_blank_tags(tags: &[String]) -> ServiceResult<()> {
    match tags.iter().find(|tag| tag.trim().is_empty()) {
        Some(tag) => Err(ServiceError::InvalidTag(tag.clone())),
        None => Ok(()),
    }
}

fn clean_url(url: Option<String>) -> Option<String> {
    url.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Derives preview fields from markdown content.
///
/// Rules:
/// - `first_link`: target of the first non-image markdown link.
/// - `preview_text`: images dropped, links reduced to their label,
///   markdown symbols removed, whitespace normalized, first 100 chars kept.
pub fn derive_markdown_preview(content: &str) -> MarkdownPreview {
    let without_images = MARKDOWN_IMAGE_RE.replace_all(content, " ");
    let first_link = MARKDOWN_LINK_RE
        .captures(&without_images)
        .and_then(|caps| caps.get(2).map(|m| m.as_str().trim().to_string()))
        .filter(|value| !value.is_empty());

    let without_links = MARKDOWN_LINK_RE.replace_all(&without_images, "$1");
    let without_symbols = MARKDOWN_SYMBOL_RE.replace_all(&without_links, " ");
    let normalized = WHITESPACE_RE.replace_all(&without_symbols, " ");
    let trimmed = normalized.trim();
    let preview_text = if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(PREVIEW_CHARS).collect())
    };

    MarkdownPreview {
        preview_text,
        first_link,
    }
}

#[cfg(test)]
mod tests {
    use super::{derive_markdown_preview, normalize_reference_limit};

    #[test]
    fn preview_takes_first_link_but_skips_images() {
        let preview =
            derive_markdown_preview("![logo](logo.png) see [docs](https://docs.rs) and [b](x)");
        assert_eq!(preview.first_link.as_deref(), Some("https://docs.rs"));
        assert_eq!(preview.preview_text.as_deref(), Some("see docs and b"));
    }

    #[test]
    fn preview_strips_markdown_symbols_and_limits_length() {
        let source = format!("# title\n\n**bold** `code` {}", "word ".repeat(40));
        let preview = derive_markdown_preview(&source);
        let text = preview.preview_text.expect("preview_text should exist");
        assert!(!text.contains('#'));
        assert!(!text.contains('*'));
        assert_eq!(text.chars().count(), 100);
    }

    #[test]
    fn blank_body_has_no_preview() {
        let preview = derive_markdown_preview("  \n# \n");
        assert_eq!(preview.preview_text, None);
        assert_eq!(preview.first_link, None);
    }

    #[test]
    fn limit_defaults_and_clamps() {
        assert_eq!(normalize_reference_limit(None), 20);
        assert_eq!(normalize_reference_limit(Some(0)), 20);
        assert_eq!(normalize_reference_limit(Some(7)), 7);
        assert_eq!(normalize_reference_limit(Some(1000)), 100);
    }
}
