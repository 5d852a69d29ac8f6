use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::components::assign_ids_to_components;
use super::{insert_at, reorder_by_ids};
use crate::error::{FormsError, Result};
use crate::model::{
    double_option, ComponentType, ControllerType, Engine, FormDefinition, Page, Repeat, SCHEMA_V2,
};

/// Index of the page with `page_id`, or `NotFound`.
pub fn page_index(def: &FormDefinition, page_id: Uuid) -> Result<usize> {
    def.pages
        .iter()
        .position(|p| p.id == Some(page_id))
        .ok_or_else(|| FormsError::not_found("page", page_id))
}

fn ensure_unique_path(def: &FormDefinition, path: &str, except: Option<usize>) -> Result<()> {
    let clash = def
        .pages
        .iter()
        .enumerate()
        .any(|(i, p)| Some(i) != except && p.path == path);
    if clash {
        return Err(FormsError::Conflict(format!(
            "duplicate page path '{path}'"
        )));
    }
    Ok(())
}

/// Payment pages need a reference number to reconcile against.
fn refresh_show_reference_number(def: &mut FormDefinition) {
    if def.pages.iter().any(Page::is_payment) {
        def.options.show_reference_number = Some(true);
    }
}

pub fn add_page(
    mut def: FormDefinition,
    mut page: Page,
    position: Option<i64>,
) -> Result<FormDefinition> {
    ensure_unique_path(&def, &page.path, None)?;
    if def.is_v2() {
        page.id.get_or_insert_with(Uuid::new_v4);
        if let Some(components) = page.components.as_mut() {
            assign_ids_to_components(components);
        }
    }
    insert_at(&mut def.pages, page, position);
    refresh_show_reference_number(&mut def);
    Ok(def)
}

/// Replace the page with `page_id` wholesale, keeping its id.
pub fn update_page(mut def: FormDefinition, page_id: Uuid, mut page: Page) -> Result<FormDefinition> {
    let index = page_index(&def, page_id)?;
    ensure_unique_path(&def, &page.path, Some(index))?;
    page.id = Some(page_id);
    if let Some(components) = page.components.as_mut() {
        assign_ids_to_components(components);
    }
    def.pages[index] = page;
    refresh_show_reference_number(&mut def);
    Ok(def)
}

/// Partial page update. An absent field is left alone; an explicit `null`
/// clears `controller`, `repeat` or `condition`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageFieldsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub controller: Option<Option<ControllerType>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub repeat: Option<Option<Repeat>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub condition: Option<Option<String>>,
}

pub fn update_page_fields(
    mut def: FormDefinition,
    page_id: Uuid,
    patch: PageFieldsPatch,
) -> Result<FormDefinition> {
    let index = page_index(&def, page_id)?;
    if let Some(path) = &patch.path {
        ensure_unique_path(&def, path, Some(index))?;
    }
    let page = &mut def.pages[index];

    if let Some(title) = patch.title {
        page.title = title;
    }
    if let Some(path) = patch.path {
        page.path = path;
    }
    if let Some(repeat) = patch.repeat {
        page.repeat = repeat;
    }
    if let Some(condition) = patch.condition {
        page.condition = condition;
    }
    if let Some(controller) = patch.controller {
        page.controller = controller;
        if controller == Some(ControllerType::FileUpload) {
            if let Some(field) = page
                .components
                .iter_mut()
                .flatten()
                .find(|c| !c.component_type.is_content())
            {
                field.component_type = ComponentType::FileUploadField;
            }
        }
    }

    refresh_show_reference_number(&mut def);
    Ok(def)
}

pub fn delete_page(mut def: FormDefinition, page_id: Uuid) -> Result<FormDefinition> {
    let index = page_index(&def, page_id)?;
    def.pages.remove(index);
    Ok(def)
}

pub fn reorder_pages(mut def: FormDefinition, order: &[Uuid]) -> Result<FormDefinition> {
    def.pages = reorder_by_ids(std::mem::take(&mut def.pages), order, |p| p.id);
    Ok(def)
}

/// Where a new page belongs so the summary page stays last, and payment stays
/// directly before it.
pub fn page_insert_position(def: &FormDefinition, page: &Page) -> Option<i64> {
    let last = def.pages.last()?;
    if !last.is_summary() {
        return None;
    }
    if page.is_payment() {
        return Some(-1);
    }
    let len = def.pages.len();
    let payment_before_summary = len >= 2 && def.pages[len - 2].is_payment();
    if payment_before_summary {
        Some(-2)
    } else {
        Some(-1)
    }
}

/// Move a misplaced summary page to the end. Other pages keep their relative
/// order; a definition without a summary page, or with it already last, comes
/// back unchanged.
pub fn reposition_summary_page(mut def: FormDefinition) -> Result<FormDefinition> {
    let Some(index) = def.summary_page_index() else {
        return Ok(def);
    };
    if index + 1 == def.pages.len() {
        return Ok(def);
    }
    let summary = def.pages.remove(index);
    def.pages.push(summary);
    Ok(def)
}

pub fn summary_page_misplaced(def: &FormDefinition) -> bool {
    def.summary_page_index()
        .is_some_and(|index| index + 1 != def.pages.len())
}

/// Give every page lacking an id a fresh one.
pub fn assign_page_ids(mut def: FormDefinition) -> Result<FormDefinition> {
    for page in &mut def.pages {
        page.id.get_or_insert_with(Uuid::new_v4);
    }
    Ok(def)
}

/// Final migration step: flag the definition as a V2 document.
pub fn set_engine_v2(mut def: FormDefinition) -> Result<FormDefinition> {
    def.engine = Engine::V2;
    def.schema = SCHEMA_V2;
    Ok(def)
}
