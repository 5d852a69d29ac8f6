//! Whole-definition validation.
//!
//! Runs after every draft mutation and on upload. All violations are collected
//! rather than stopping at the first, so a caller gets the full cause list in
//! one round trip.

use std::collections::HashSet;

use crate::error::{FormsError, Result, ValidationCause};
use crate::model::{Condition, FormDefinition};

// ── Error codes ───────────────────────────────────────────────

pub const PAGE_INVALID_PATH: &str = "DEF:PAGE:INVALID_PATH";
pub const PAGE_DUPLICATE_PATH: &str = "DEF:PAGE:DUPLICATE_PATH";
pub const PAGE_DUPLICATE_ID: &str = "DEF:PAGE:DUPLICATE_ID";
pub const PAGE_MISSING_ID: &str = "DEF:PAGE:MISSING_ID";
pub const PAGE_MULTIPLE_SUMMARY: &str = "DEF:PAGE:MULTIPLE_SUMMARY";
pub const PAGE_UNKNOWN_CONDITION: &str = "DEF:PAGE:UNKNOWN_CONDITION";
pub const PAGE_UNKNOWN_SECTION: &str = "DEF:PAGE:UNKNOWN_SECTION";
pub const COMPONENT_EMPTY_NAME: &str = "DEF:COMPONENT:EMPTY_NAME";
pub const COMPONENT_DUPLICATE_NAME: &str = "DEF:COMPONENT:DUPLICATE_NAME";
pub const COMPONENT_DUPLICATE_ID: &str = "DEF:COMPONENT:DUPLICATE_ID";
pub const COMPONENT_MISSING_ID: &str = "DEF:COMPONENT:MISSING_ID";
pub const COMPONENT_UNKNOWN_LIST: &str = "DEF:COMPONENT:UNKNOWN_LIST";
pub const LIST_DUPLICATE_NAME: &str = "DEF:LIST:DUPLICATE_NAME";
pub const LIST_DUPLICATE_TITLE: &str = "DEF:LIST:DUPLICATE_TITLE";
pub const LIST_DUPLICATE_ITEM_TEXT: &str = "DEF:LIST:DUPLICATE_ITEM_TEXT";
pub const LIST_DUPLICATE_ITEM_VALUE: &str = "DEF:LIST:DUPLICATE_ITEM_VALUE";
pub const CONDITION_DUPLICATE_ID: &str = "DEF:CONDITION:DUPLICATE_ID";
pub const CONDITION_INVALID_ITEM: &str = "DEF:CONDITION:INVALID_ITEM";
pub const CONDITION_UNKNOWN_COMPONENT: &str = "DEF:CONDITION:UNKNOWN_COMPONENT";
pub const CONDITION_UNKNOWN_CONDITION: &str = "DEF:CONDITION:UNKNOWN_CONDITION";
pub const SECTION_DUPLICATE_NAME: &str = "DEF:SECTION:DUPLICATE_NAME";
pub const SECTION_DUPLICATE_TITLE: &str = "DEF:SECTION:DUPLICATE_TITLE";
pub const START_PAGE_UNKNOWN: &str = "DEF:START_PAGE:UNKNOWN";

#[derive(Default)]
struct Causes(Vec<ValidationCause>);

impl Causes {
    fn push(&mut self, path: String, code: &str, message: String) {
        self.0.push(ValidationCause {
            path,
            code: code.to_string(),
            message,
        });
    }
}

/// Validate `def`, returning `InvalidDefinition` with every violation found.
///
/// The summary-page position is not checked here: it is restored by the
/// reposition operation, and legacy definitions may still carry it elsewhere.
pub fn validate_definition(def: &FormDefinition) -> Result<()> {
    let mut causes = Causes::default();

    validate_pages(def, &mut causes);
    validate_components(def, &mut causes);
    validate_lists(def, &mut causes);
    validate_conditions(def, &mut causes);
    validate_sections(def, &mut causes);

    if let Some(start) = &def.start_page {
        if !def.pages.iter().any(|p| &p.path == start) {
            causes.push(
                "startPage".into(),
                START_PAGE_UNKNOWN,
                format!("start page '{start}' does not match any page path"),
            );
        }
    }

    if causes.0.is_empty() {
        Ok(())
    } else {
        Err(FormsError::InvalidDefinition(causes.0))
    }
}

fn validate_pages(def: &FormDefinition, causes: &mut Causes) {
    let mut paths = HashSet::new();
    let mut ids = HashSet::new();
    let mut summaries = 0usize;
    let conditions: HashSet<String> = def.conditions.iter().map(Condition::reference).collect();
    let sections: HashSet<String> = def.sections.iter().map(|s| s.reference()).collect();

    for (i, page) in def.pages.iter().enumerate() {
        if !page.path.starts_with('/') {
            causes.push(
                format!("pages.{i}.path"),
                PAGE_INVALID_PATH,
                format!("page path '{}' must start with '/'", page.path),
            );
        }
        if !paths.insert(page.path.as_str()) {
            causes.push(
                format!("pages.{i}.path"),
                PAGE_DUPLICATE_PATH,
                format!("page path '{}' is used more than once", page.path),
            );
        }
        match page.id {
            Some(id) if !ids.insert(id) => causes.push(
                format!("pages.{i}.id"),
                PAGE_DUPLICATE_ID,
                format!("page id '{id}' is used more than once"),
            ),
            None if def.is_v2() => causes.push(
                format!("pages.{i}.id"),
                PAGE_MISSING_ID,
                "pages of a V2 definition must have an id".into(),
            ),
            _ => {}
        }
        if page.is_summary() {
            summaries += 1;
            if summaries > 1 {
                causes.push(
                    format!("pages.{i}.controller"),
                    PAGE_MULTIPLE_SUMMARY,
                    "a definition may have at most one summary page".into(),
                );
            }
        }
        if let Some(condition) = &page.condition {
            if !conditions.contains(condition) {
                causes.push(
                    format!("pages.{i}.condition"),
                    PAGE_UNKNOWN_CONDITION,
                    format!("condition '{condition}' does not exist"),
                );
            }
        }
        if let Some(section) = &page.section {
            if !sections.contains(section) {
                causes.push(
                    format!("pages.{i}.section"),
                    PAGE_UNKNOWN_SECTION,
                    format!("section '{section}' does not exist"),
                );
            }
        }
    }
}

fn validate_components(def: &FormDefinition, causes: &mut Causes) {
    let mut names = HashSet::new();
    let mut ids = HashSet::new();
    let lists: HashSet<String> = def
        .lists
        .iter()
        .flat_map(|l| {
            let mut keys = vec![l.name.clone()];
            if let Some(id) = l.id {
                keys.push(id.to_string());
            }
            keys
        })
        .collect();

    for (p, page) in def.pages.iter().enumerate() {
        for (c, component) in page.components().iter().enumerate() {
            let path = format!("pages.{p}.components.{c}");
            if component.name.trim().is_empty() {
                causes.push(
                    format!("{path}.name"),
                    COMPONENT_EMPTY_NAME,
                    "component name must not be empty".into(),
                );
            } else if !names.insert(component.name.as_str()) {
                causes.push(
                    format!("{path}.name"),
                    COMPONENT_DUPLICATE_NAME,
                    format!("component name '{}' is used more than once", component.name),
                );
            }
            match component.id {
                Some(id) if !ids.insert(id) => causes.push(
                    format!("{path}.id"),
                    COMPONENT_DUPLICATE_ID,
                    format!("component id '{id}' is used more than once"),
                ),
                None if def.is_v2() => causes.push(
                    format!("{path}.id"),
                    COMPONENT_MISSING_ID,
                    "components of a V2 definition must have an id".into(),
                ),
                _ => {}
            }
            if let Some(list) = &component.list {
                if !lists.contains(list) {
                    causes.push(
                        format!("{path}.list"),
                        COMPONENT_UNKNOWN_LIST,
                        format!("list '{list}' does not exist"),
                    );
                }
            }
        }
    }
}

fn validate_lists(def: &FormDefinition, causes: &mut Causes) {
    let mut names = HashSet::new();
    let mut titles = HashSet::new();

    for (i, list) in def.lists.iter().enumerate() {
        if !names.insert(list.name.as_str()) {
            causes.push(
                format!("lists.{i}.name"),
                LIST_DUPLICATE_NAME,
                format!("list name '{}' is used more than once", list.name),
            );
        }
        if !titles.insert(list.title.as_str()) {
            causes.push(
                format!("lists.{i}.title"),
                LIST_DUPLICATE_TITLE,
                format!("list title '{}' is used more than once", list.title),
            );
        }
        let mut texts = HashSet::new();
        let mut values = HashSet::new();
        for (j, item) in list.items.iter().enumerate() {
            if !texts.insert(item.text.as_str()) {
                causes.push(
                    format!("lists.{i}.items.{j}.text"),
                    LIST_DUPLICATE_ITEM_TEXT,
                    format!("item text '{}' is used more than once", item.text),
                );
            }
            if !values.insert(item.value.to_string()) {
                causes.push(
                    format!("lists.{i}.items.{j}.value"),
                    LIST_DUPLICATE_ITEM_VALUE,
                    format!("item value {} is used more than once", item.value),
                );
            }
        }
    }
}

fn validate_conditions(def: &FormDefinition, causes: &mut Causes) {
    let component_ids: HashSet<_> = def.components().filter_map(|c| c.id).collect();
    let condition_ids: HashSet<_> = def.conditions_v2().map(|c| c.id).collect();
    let mut seen = HashSet::new();

    for (i, condition) in def.conditions.iter().enumerate() {
        let Some(condition) = condition.as_v2() else {
            continue;
        };
        if !seen.insert(condition.id) {
            causes.push(
                format!("conditions.{i}.id"),
                CONDITION_DUPLICATE_ID,
                format!("condition id '{}' is used more than once", condition.id),
            );
        }
        for (j, item) in condition.items.iter().enumerate() {
            let path = format!("conditions.{i}.items.{j}");
            match (item.component_id, item.condition_id) {
                (Some(component_id), None) => {
                    if !component_ids.contains(&component_id) {
                        causes.push(
                            format!("{path}.componentId"),
                            CONDITION_UNKNOWN_COMPONENT,
                            format!("component '{component_id}' does not exist"),
                        );
                    }
                }
                (None, Some(condition_id)) => {
                    if condition_id == condition.id || !condition_ids.contains(&condition_id) {
                        causes.push(
                            format!("{path}.conditionId"),
                            CONDITION_UNKNOWN_CONDITION,
                            format!("condition '{condition_id}' cannot be referenced here"),
                        );
                    }
                }
                _ => causes.push(
                    path,
                    CONDITION_INVALID_ITEM,
                    "condition item must reference exactly one component or condition".into(),
                ),
            }
        }
    }
}

fn validate_sections(def: &FormDefinition, causes: &mut Causes) {
    let mut names = HashSet::new();
    let mut titles = HashSet::new();
    for (i, section) in def.sections.iter().enumerate() {
        if !names.insert(section.name.as_str()) {
            causes.push(
                format!("sections.{i}.name"),
                SECTION_DUPLICATE_NAME,
                format!("section name '{}' is used more than once", section.name),
            );
        }
        if !titles.insert(section.title.as_str()) {
            causes.push(
                format!("sections.{i}.title"),
                SECTION_DUPLICATE_TITLE,
                format!("section title '{}' is used more than once", section.title),
            );
        }
    }
}
