use uuid::Uuid;

use crate::error::{FormsError, Result};
use crate::model::{FormDefinition, List};

pub fn list_index(def: &FormDefinition, list_id: Uuid) -> Result<usize> {
    def.lists
        .iter()
        .position(|l| l.id == Some(list_id))
        .ok_or_else(|| FormsError::not_found("list", list_id))
}

fn ensure_unique_list(def: &FormDefinition, list: &List, except: Option<usize>) -> Result<()> {
    for (i, existing) in def.lists.iter().enumerate() {
        if Some(i) == except {
            continue;
        }
        if existing.name == list.name {
            return Err(FormsError::Conflict(format!(
                "duplicate list name '{}'",
                list.name
            )));
        }
        if existing.title == list.title {
            return Err(FormsError::Conflict(format!(
                "duplicate list title '{}'",
                list.title
            )));
        }
    }
    Ok(())
}

fn assign_item_ids(list: &mut List) {
    for item in &mut list.items {
        item.id.get_or_insert_with(Uuid::new_v4);
    }
}

pub fn add_list(mut def: FormDefinition, mut list: List) -> Result<FormDefinition> {
    ensure_unique_list(&def, &list, None)?;
    list.id.get_or_insert_with(Uuid::new_v4);
    assign_item_ids(&mut list);
    def.lists.push(list);
    Ok(def)
}

pub fn update_list(mut def: FormDefinition, list_id: Uuid, mut list: List) -> Result<FormDefinition> {
    let index = list_index(&def, list_id)?;
    ensure_unique_list(&def, &list, Some(index))?;
    list.id = Some(list_id);
    assign_item_ids(&mut list);
    def.lists[index] = list;
    Ok(def)
}

pub fn delete_list(mut def: FormDefinition, list_id: Uuid) -> Result<FormDefinition> {
    let index = list_index(&def, list_id)?;
    def.lists.remove(index);
    Ok(def)
}
