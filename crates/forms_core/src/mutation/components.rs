use uuid::Uuid;

use super::pages::page_index;
use super::{insert_at, reorder_by_ids};
use crate::error::{FormsError, Result};
use crate::model::{ComponentDef, FormDefinition, Page};

/// Index of the component with `component_id` on `page`, or `NotFound`.
pub fn component_index(page: &Page, component_id: Uuid) -> Result<usize> {
    page.components()
        .iter()
        .position(|c| c.id == Some(component_id))
        .ok_or_else(|| FormsError::not_found("component", component_id))
}

pub(crate) fn assign_ids_to_components(components: &mut [ComponentDef]) {
    for component in components {
        component.id.get_or_insert_with(Uuid::new_v4);
    }
}

pub fn add_component(
    mut def: FormDefinition,
    page_id: Uuid,
    mut component: ComponentDef,
    position: Option<i64>,
) -> Result<FormDefinition> {
    let index = page_index(&def, page_id)?;
    component.id.get_or_insert_with(Uuid::new_v4);
    // Summary pages are created without a components array.
    let components = def.pages[index].components.get_or_insert_with(Vec::new);
    insert_at(components, component, position);
    Ok(def)
}

/// Replace a component wholesale, keeping its id.
pub fn update_component(
    mut def: FormDefinition,
    page_id: Uuid,
    component_id: Uuid,
    mut component: ComponentDef,
) -> Result<FormDefinition> {
    let page_idx = page_index(&def, page_id)?;
    let idx = component_index(&def.pages[page_idx], component_id)?;
    component.id = Some(component_id);
    if let Some(components) = def.pages[page_idx].components.as_mut() {
        components[idx] = component;
    }
    Ok(def)
}

pub fn delete_component(
    mut def: FormDefinition,
    page_id: Uuid,
    component_id: Uuid,
) -> Result<FormDefinition> {
    let page_idx = page_index(&def, page_id)?;
    let idx = component_index(&def.pages[page_idx], component_id)?;
    if let Some(components) = def.pages[page_idx].components.as_mut() {
        components.remove(idx);
    }
    Ok(def)
}

pub fn reorder_components(
    mut def: FormDefinition,
    page_id: Uuid,
    order: &[Uuid],
) -> Result<FormDefinition> {
    let page_idx = page_index(&def, page_id)?;
    if let Some(components) = def.pages[page_idx].components.take() {
        def.pages[page_idx].components = Some(reorder_by_ids(components, order, |c| c.id));
    }
    Ok(def)
}

/// Give every component lacking an id a fresh one.
pub fn assign_component_ids(mut def: FormDefinition) -> Result<FormDefinition> {
    for page in &mut def.pages {
        if let Some(components) = page.components.as_mut() {
            assign_ids_to_components(components);
        }
    }
    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ComponentType;
    use serde_json::Map;

    fn field(name: &str) -> ComponentDef {
        ComponentDef {
            id: Some(Uuid::new_v4()),
            component_type: ComponentType::TextField,
            name: name.into(),
            title: name.into(),
            hint: None,
            content: None,
            list: None,
            options: Map::new(),
            schema: Map::new(),
        }
    }

    fn names(def: &FormDefinition, page: usize) -> Vec<&str> {
        def.pages[page]
            .components()
            .iter()
            .map(|c| c.name.as_str())
            .collect()
    }

    #[test]
    fn add_component_initialises_summary_components() {
        let mut def = FormDefinition::empty("Test");
        def.pages[0].components = None;
        let page_id = def.pages[0].id.unwrap();
        let def = add_component(def, page_id, field("declaration"), None).unwrap();
        assert_eq!(names(&def, 0), vec!["declaration"]);
    }

    #[test]
    fn add_component_at_position() {
        let def = FormDefinition::empty("Test");
        let page_id = def.pages[0].id.unwrap();
        let def = add_component(def, page_id, field("a"), None).unwrap();
        let def = add_component(def, page_id, field("b"), None).unwrap();
        let def = add_component(def, page_id, field("c"), Some(0)).unwrap();
        let def = add_component(def, page_id, field("d"), Some(-1)).unwrap();
        assert_eq!(names(&def, 0), vec!["c", "a", "d", "b"]);
    }

    #[test]
    fn add_component_assigns_missing_id() {
        let def = FormDefinition::empty("Test");
        let page_id = def.pages[0].id.unwrap();
        let mut c = field("a");
        c.id = None;
        let def = add_component(def, page_id, c, None).unwrap();
        assert!(def.pages[0].components()[0].id.is_some());
    }

    #[test]
    fn unknown_page_or_component_is_not_found() {
        let def = FormDefinition::empty("Test");
        let page_id = def.pages[0].id.unwrap();
        assert!(matches!(
            add_component(def.clone(), Uuid::new_v4(), field("a"), None),
            Err(FormsError::NotFound(_))
        ));
        let err = delete_component(def, page_id, Uuid::new_v4()).unwrap_err();
        assert!(err.to_string().contains("component"));
    }

    #[test]
    fn update_and_delete_component() {
        let def = FormDefinition::empty("Test");
        let page_id = def.pages[0].id.unwrap();
        let c = field("a");
        let cid = c.id.unwrap();
        let def = add_component(def, page_id, c, None).unwrap();
        let def = update_component(def, page_id, cid, field("renamed")).unwrap();
        assert_eq!(names(&def, 0), vec!["renamed"]);
        assert_eq!(def.pages[0].components()[0].id, Some(cid));
        let def = delete_component(def, page_id, cid).unwrap();
        assert!(def.pages[0].components().is_empty());
    }

    #[test]
    fn reorder_components_partial_and_identity() {
        let def = FormDefinition::empty("Test");
        let page_id = def.pages[0].id.unwrap();
        let def = ["a", "b", "c"]
            .into_iter()
            .try_fold(def, |d, n| add_component(d, page_id, field(n), None))
            .unwrap();
        let ids: Vec<Uuid> = def.pages[0].components().iter().filter_map(|c| c.id).collect();

        let same = reorder_components(def.clone(), page_id, &ids).unwrap();
        assert_eq!(same, def);

        let out = reorder_components(def, page_id, &[ids[2], ids[0]]).unwrap();
        assert_eq!(names(&out, 0), vec!["c", "a", "b"]);
    }

    #[test]
    fn assign_component_ids_fills_gaps_only() {
        let mut def = FormDefinition::empty("Test");
        let keep = field("keep");
        let kept_id = keep.id;
        let mut missing = field("missing");
        missing.id = None;
        def.pages[0].components = Some(vec![keep, missing]);
        let def = assign_component_ids(def).unwrap();
        assert_eq!(def.pages[0].components()[0].id, kept_id);
        assert!(def.pages[0].components()[1].id.is_some());
    }
}
