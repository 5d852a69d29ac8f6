//! Form listing — filter, rank, sort, paginate and facet metadata documents.
//!
//! Comparison is case- and diacritic-insensitive: strings are folded through
//! NFD with combining marks dropped, then lower-cased.

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::{FormMetadataDocument, FormStatus};

pub const DEFAULT_PAGE: usize = 1;
pub const DEFAULT_PER_PAGE: usize = 10;
pub const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Updated,
    Title,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListOptions {
    pub page: usize,
    pub per_page: usize,
    pub sort_by: SortBy,
    pub order: SortOrder,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organisations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status: Vec<FormStatus>,
}

impl Default for ListOptions {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
            sort_by: SortBy::default(),
            order: SortOrder::default(),
            title: None,
            author: None,
            organisations: vec![],
            status: vec![],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationResult {
    pub page: usize,
    pub per_page: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Distinct values across every form, independent of the current filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterFacets {
    pub authors: Vec<String>,
    pub organisations: Vec<String>,
    pub status: Vec<FormStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMeta {
    pub pagination: PaginationResult,
    pub sorting: SortingMeta,
    pub search: ListOptions,
    pub filters: FilterFacets,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortingMeta {
    pub sort_by: SortBy,
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub data: Vec<FormMetadataDocument>,
    pub meta: QueryMeta,
}

/// Case- and diacritic-insensitive key.
pub fn fold(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Title search term, folded and compiled once per query.
pub struct TitleSearch {
    term: String,
    whole_word: Option<Regex>,
}

impl TitleSearch {
    /// `None` for a blank term.
    pub fn new(term: &str) -> Option<Self> {
        let term = fold(term.trim());
        if term.is_empty() {
            return None;
        }
        let whole_word = Regex::new(&format!(r"\b{}\b", regex::escape(&term))).ok();
        Some(Self { term, whole_word })
    }

    /// Match quality of `title`: 3 exact, 2 whole word, 1 substring, 0 none.
    pub fn rank(&self, title: &str) -> u8 {
        let title = fold(title);
        if title == self.term {
            3
        } else if self.whole_word.as_ref().is_some_and(|re| re.is_match(&title)) {
            2
        } else if title.contains(&self.term) {
            1
        } else {
            0
        }
    }
}

/// One-off [`TitleSearch::rank`].
pub fn rank(title: &str, term: &str) -> u8 {
    TitleSearch::new(term).map_or(0, |search| search.rank(title))
}

fn author_name(doc: &FormMetadataDocument) -> &str {
    &doc.updated_by.display_name
}

fn updated_date_only(doc: &FormMetadataDocument) -> NaiveDate {
    doc.updated_at.date_naive()
}

fn matches(doc: &FormMetadataDocument, options: &ListOptions) -> bool {
    if let Some(title) = options.title.as_deref().filter(|t| !t.trim().is_empty()) {
        if !fold(&doc.title).contains(&fold(title.trim())) {
            return false;
        }
    }
    if let Some(author) = options.author.as_deref().filter(|a| !a.trim().is_empty()) {
        if !fold(author_name(doc)).contains(&fold(author.trim())) {
            return false;
        }
    }
    if !options.organisations.is_empty() {
        let org = fold(&doc.organisation);
        if !options.organisations.iter().any(|o| fold(o) == org) {
            return false;
        }
    }
    if !options.status.is_empty() {
        let any = options.status.iter().any(|s| match s {
            FormStatus::Live => doc.is_live(),
            FormStatus::Draft => doc.has_draft(),
        });
        if !any {
            return false;
        }
    }
    true
}

fn compare(a: &FormMetadataDocument, b: &FormMetadataDocument, options: &ListOptions) -> Ordering {
    let primary = match options.sort_by {
        SortBy::Updated => a.updated_at.cmp(&b.updated_at),
        SortBy::Title => fold(&a.title).cmp(&fold(&b.title)),
    };
    let primary = match options.order {
        SortOrder::Asc => primary,
        SortOrder::Desc => primary.reverse(),
    };
    primary
        .then_with(|| updated_date_only(b).cmp(&updated_date_only(a)))
        .then_with(|| fold(author_name(a)).cmp(&fold(author_name(b))))
}

fn facets(docs: &[FormMetadataDocument]) -> FilterFacets {
    let mut authors: Vec<String> = docs
        .iter()
        .map(|d| author_name(d).to_string())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    authors.sort_by_key(|a| fold(a));

    let mut organisations: Vec<String> = docs
        .iter()
        .map(|d| d.organisation.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    organisations.sort_by_key(|o| fold(o));

    let mut status = vec![];
    if docs.iter().any(FormMetadataDocument::has_draft) {
        status.push(FormStatus::Draft);
    }
    if docs.iter().any(FormMetadataDocument::is_live) {
        status.push(FormStatus::Live);
    }

    FilterFacets {
        authors,
        organisations,
        status,
    }
}

/// Run a listing query over every metadata document.
pub fn query(docs: Vec<FormMetadataDocument>, options: &ListOptions) -> QueryResult {
    let page = options.page.max(1);
    let per_page = options.per_page.clamp(1, MAX_PER_PAGE);
    let filters = facets(&docs);

    let search = options.title.as_deref().and_then(TitleSearch::new);
    let mut hits: Vec<(u8, FormMetadataDocument)> = docs
        .into_iter()
        .filter(|d| matches(d, options))
        .map(|d| (search.as_ref().map_or(0, |s| s.rank(&d.title)), d))
        .collect();

    hits.sort_by(|(rank_a, a), (rank_b, b)| {
        rank_b.cmp(rank_a).then_with(|| compare(a, b, options))
    });

    let total_items = hits.len();
    let total_pages = total_items.div_ceil(per_page);
    let data = hits
        .into_iter()
        .skip((page - 1).saturating_mul(per_page))
        .take(per_page)
        .map(|(_, d)| d)
        .collect();

    QueryResult {
        data,
        meta: QueryMeta {
            pagination: PaginationResult {
                page,
                per_page,
                total_items,
                total_pages,
            },
            sorting: SortingMeta {
                sort_by: options.sort_by,
                order: options.order,
            },
            search: options.clone(),
            filters,
        },
    }
}
