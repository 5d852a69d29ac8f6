use std::collections::HashMap;

use uuid::Uuid;

use super::pages::page_index;
use crate::error::{FormsError, Result};
use crate::model::{FormDefinition, Section, SectionAssignment, SectionResponse};
use crate::slug::slugify;

pub fn section_index(def: &FormDefinition, section_id: Uuid) -> Result<usize> {
    def.sections
        .iter()
        .position(|s| s.id == Some(section_id))
        .ok_or_else(|| FormsError::not_found("section", section_id))
}

/// Replace the section list and rebuild page membership from it.
///
/// Sections without an id get a fresh one; sections without a name get one
/// slugified from the title. Every page's `section` is cleared before the
/// requested membership is applied.
pub fn assign_sections(
    mut def: FormDefinition,
    assignments: Vec<SectionAssignment>,
) -> Result<FormDefinition> {
    let mut membership: HashMap<Uuid, String> = HashMap::new();
    let mut sections = Vec::with_capacity(assignments.len());

    for assignment in assignments {
        let id = assignment.id.unwrap_or_else(Uuid::new_v4);
        let name = match assignment.name {
            Some(name) if !name.trim().is_empty() => name,
            _ => slugify(&assignment.title),
        };
        for page_id in &assignment.page_ids {
            page_index(&def, *page_id)?;
            if membership.insert(*page_id, id.to_string()).is_some() {
                return Err(FormsError::Conflict(format!(
                    "page '{page_id}' is assigned to more than one section"
                )));
            }
        }
        sections.push(Section {
            id: Some(id),
            name,
            title: assignment.title,
            hide_title: assignment.hide_title,
        });
    }

    for page in &mut def.pages {
        page.section = page.id.and_then(|id| membership.get(&id).cloned());
    }
    def.sections = sections;
    Ok(def)
}

/// Sections with their page membership derived from the pages.
pub fn build_sections_response(def: &FormDefinition) -> Vec<SectionResponse> {
    def.sections
        .iter()
        .map(|section| {
            let reference = section.reference();
            let page_ids = def
                .pages
                .iter()
                .filter(|p| p.section.as_deref() == Some(reference.as_str()))
                .filter_map(|p| p.id)
                .collect();
            SectionResponse {
                id: section.id,
                name: section.name.clone(),
                title: section.title.clone(),
                hide_title: section.hide_title,
                page_ids,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Page;
    use std::collections::HashSet;

    fn def_with_pages(n: usize) -> FormDefinition {
        let mut def = FormDefinition::empty("T");
        def.pages = (0..n)
            .map(|i| Page {
                id: Some(Uuid::new_v4()),
                path: format!("/p{i}"),
                title: format!("Page {i}"),
                controller: None,
                components: Some(vec![]),
                next: None,
                section: None,
                condition: None,
                repeat: None,
            })
            .collect();
        def
    }

    fn assignment(title: &str, page_ids: Vec<Uuid>) -> SectionAssignment {
        SectionAssignment {
            id: None,
            name: None,
            title: title.into(),
            hide_title: None,
            page_ids,
        }
    }

    #[test]
    fn round_trip_membership() {
        let def = def_with_pages(5);
        let ids: Vec<Uuid> = def.pages.iter().filter_map(|p| p.id).collect();
        let input = vec![
            assignment("About you", vec![ids[3], ids[0]]),
            assignment("Your business", vec![ids[1]]),
            assignment("Empty", vec![]),
        ];
        let def = assign_sections(def, input.clone()).unwrap();
        let response = build_sections_response(&def);
        assert_eq!(response.len(), 3);
        for (want, got) in input.iter().zip(&response) {
            let want: HashSet<_> = want.page_ids.iter().collect();
            let got: HashSet<_> = got.page_ids.iter().collect();
            assert_eq!(want, got);
        }
    }

    #[test]
    fn new_sections_get_id_and_slug_name() {
        let def = def_with_pages(1);
        let def = assign_sections(def, vec![assignment("About You", vec![])]).unwrap();
        assert!(def.sections[0].id.is_some());
        assert_eq!(def.sections[0].name, "about-you");
    }

    #[test]
    fn reassignment_clears_old_membership() {
        let def = def_with_pages(2);
        let ids: Vec<Uuid> = def.pages.iter().filter_map(|p| p.id).collect();
        let def = assign_sections(def, vec![assignment("A", vec![ids[0], ids[1]])]).unwrap();
        let def = assign_sections(def, vec![assignment("B", vec![ids[1]])]).unwrap();
        assert!(def.pages[0].section.is_none());
        assert_eq!(
            def.pages[1].section,
            def.sections[0].id.map(|id| id.to_string())
        );
    }

    #[test]
    fn unknown_page_is_not_found() {
        let def = def_with_pages(1);
        let err = assign_sections(def, vec![assignment("A", vec![Uuid::new_v4()])]).unwrap_err();
        assert!(matches!(err, FormsError::NotFound(_)));
    }

    #[test]
    fn page_in_two_sections_conflicts() {
        let def = def_with_pages(1);
        let id = def.pages[0].id.unwrap();
        let err = assign_sections(
            def,
            vec![assignment("A", vec![id]), assignment("B", vec![id])],
        )
        .unwrap_err();
        assert!(matches!(err, FormsError::Conflict(_)));
    }
}
