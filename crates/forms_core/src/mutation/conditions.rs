use uuid::Uuid;

use crate::error::{FormsError, Result};
use crate::model::{Condition, ConditionWrapperV2, FormDefinition};

pub fn condition_index(def: &FormDefinition, condition_id: Uuid) -> Result<usize> {
    def.conditions
        .iter()
        .position(|c| c.as_v2().is_some_and(|c| c.id == condition_id))
        .ok_or_else(|| FormsError::not_found("condition", condition_id))
}

pub fn add_condition(
    mut def: FormDefinition,
    condition: ConditionWrapperV2,
) -> Result<FormDefinition> {
    if condition_index(&def, condition.id).is_ok() {
        return Err(FormsError::Conflict(format!(
            "duplicate condition id '{}'",
            condition.id
        )));
    }
    def.conditions.push(Condition::V2(condition));
    Ok(def)
}

pub fn update_condition(
    mut def: FormDefinition,
    condition_id: Uuid,
    mut condition: ConditionWrapperV2,
) -> Result<FormDefinition> {
    let index = condition_index(&def, condition_id)?;
    condition.id = condition_id;
    def.conditions[index] = Condition::V2(condition);
    Ok(def)
}

/// Clear `condition` on every page that points at `condition_id`.
pub fn unassign_condition(mut def: FormDefinition, condition_id: Uuid) -> Result<FormDefinition> {
    let reference = condition_id.to_string();
    for page in &mut def.pages {
        if page.condition.as_deref() == Some(reference.as_str()) {
            page.condition = None;
        }
    }
    Ok(def)
}

/// Remove a condition. Callers unassign it from pages first.
pub fn delete_condition(mut def: FormDefinition, condition_id: Uuid) -> Result<FormDefinition> {
    let index = condition_index(&def, condition_id)?;
    def.conditions.remove(index);
    Ok(def)
}
