//! Form definition document — pages, components, lists, conditions, sections.
//!
//! Shapes follow the camelCase JSON the form designer exchanges. The
//! definition is semi-structured: `options` and `schema` on components stay as
//! JSON objects, everything the mutation engine reasons about is typed.

// `FormStatus::from_str` returns None for unknown values rather than an error.
#![allow(clippy::should_implement_trait)]

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub const SCHEMA_V1: u32 = 1;
pub const SCHEMA_V2: u32 = 2;

// ── Enums ─────────────────────────────────────────────────────

/// The two co-existing states of a form.
///
/// Doubles as the lookup table from state to the root field (or column) that
/// holds that state's sub-document, so draft/live code paths are written once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FormStatus {
    Draft,
    Live,
}

impl FormStatus {
    pub fn field(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Live => "live",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "live" => Some(Self::Live),
            _ => None,
        }
    }
}

impl std::fmt::Display for FormStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.field())
    }
}

/// Rendering engine the definition targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Engine {
    #[default]
    V1,
    V2,
}

/// Page controllers. A closed set: legacy file-path controller names are not
/// accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerType {
    #[serde(rename = "StartPageController")]
    Start,
    #[serde(rename = "SummaryPageController")]
    Summary,
    #[serde(rename = "FileUploadPageController")]
    FileUpload,
    #[serde(rename = "StatusPageController")]
    Status,
    #[serde(rename = "PaymentPageController")]
    Payment,
    #[serde(rename = "RepeatPageController")]
    Repeat,
    #[serde(rename = "TerminalPageController")]
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComponentType {
    TextField,
    MultilineTextField,
    YesNoField,
    DatePartsField,
    MonthYearField,
    SelectField,
    AutocompleteField,
    RadiosField,
    CheckboxesField,
    NumberField,
    UkAddressField,
    TelephoneNumberField,
    EmailAddressField,
    FileUploadField,
    DeclarationField,
    EastingNorthingField,
    OsGridRefField,
    NationalGridFieldNumberField,
    LatLongField,
    HiddenField,
    PaymentField,
    Html,
    Markdown,
    InsetText,
    Details,
    List,
}

impl ComponentType {
    /// Content components render guidance and collect no answer.
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            Self::Html | Self::Markdown | Self::InsetText | Self::Details | Self::List
        )
    }

    /// Components whose answers come from a list.
    pub fn uses_list(&self) -> bool {
        matches!(
            self,
            Self::SelectField
                | Self::AutocompleteField
                | Self::RadiosField
                | Self::CheckboxesField
                | Self::List
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListType {
    String,
    Number,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coordinator {
    And,
    Or,
}

// ── Components & pages ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(rename = "type")]
    pub component_type: ComponentType,
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// List id (V2) or list name (V1) for list-backed components.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub list: Option<String>,
    #[serde(default)]
    pub options: Map<String, Value>,
    #[serde(default)]
    pub schema: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatOptions {
    pub name: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeatSchema {
    pub min: u32,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Repeat {
    pub options: RepeatOptions,
    pub schema: RepeatSchema,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub path: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<ControllerType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub components: Option<Vec<ComponentDef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Vec<Link>>,
    /// Section id (V2) or section name (V1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    /// Condition id (V2) or condition name (V1).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<Repeat>,
}

impl Page {
    pub fn is_summary(&self) -> bool {
        self.controller == Some(ControllerType::Summary)
    }

    pub fn is_payment(&self) -> bool {
        self.controller == Some(ControllerType::Payment)
    }

    pub fn components(&self) -> &[ComponentDef] {
        self.components.as_deref().unwrap_or_default()
    }
}

// ── Lists ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub text: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    pub title: String,
    #[serde(rename = "type")]
    pub list_type: ListType,
    #[serde(default)]
    pub items: Vec<ListItem>,
}

// ── Conditions ────────────────────────────────────────────────

/// One clause of a V2 condition. Refers either to a component's answer or to
/// another condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionItem {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConditionWrapperV2 {
    pub id: Uuid,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinator: Option<Coordinator>,
    #[serde(default)]
    pub items: Vec<ConditionItem>,
}

/// V1 condition, carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyCondition {
    pub name: String,
    pub display_name: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    V2(ConditionWrapperV2),
    Legacy(LegacyCondition),
}

impl Condition {
    pub fn as_v2(&self) -> Option<&ConditionWrapperV2> {
        match self {
            Self::V2(c) => Some(c),
            Self::Legacy(_) => None,
        }
    }

    /// The key pages use to reference this condition.
    pub fn reference(&self) -> String {
        match self {
            Self::V2(c) => c.id.to_string(),
            Self::Legacy(c) => c.name.clone(),
        }
    }
}

// ── Sections ──────────────────────────────────────────────────

/// Persisted section. Page membership lives on `Page::section`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_title: Option<bool>,
}

impl Section {
    /// The key pages use to reference this section.
    pub fn reference(&self) -> String {
        match self.id {
            Some(id) => id.to_string(),
            None => self.name.clone(),
        }
    }
}

/// Requested section layout, as sent by the designer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionAssignment {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    pub title: String,
    #[serde(default)]
    pub hide_title: Option<bool>,
    #[serde(default)]
    pub page_ids: Vec<Uuid>,
}

/// Section as returned to callers, with derived page membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionResponse {
    pub id: Option<Uuid>,
    pub name: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_title: Option<bool>,
    pub page_ids: Vec<Uuid>,
}

// ── Definition ────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_reference_number: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disable_user_feedback: Option<bool>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_schema() -> u32 {
    SCHEMA_V1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDefinition {
    pub name: String,
    #[serde(default)]
    pub engine: Engine,
    #[serde(default = "default_schema")]
    pub schema: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_page: Option<String>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub lists: Vec<List>,
    #[serde(default)]
    pub conditions: Vec<Condition>,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub options: FormOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_email: Option<String>,
}

impl FormDefinition {
    /// The definition every new form starts with: a V2 document holding only
    /// the summary page.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            engine: Engine::V2,
            schema: SCHEMA_V2,
            start_page: None,
            pages: vec![Page {
                id: Some(Uuid::new_v4()),
                path: "/summary".into(),
                title: "Check your answers before sending your form".into(),
                controller: Some(ControllerType::Summary),
                components: Some(vec![]),
                next: None,
                section: None,
                condition: None,
                repeat: None,
            }],
            lists: vec![],
            conditions: vec![],
            sections: vec![],
            options: FormOptions::default(),
            output_email: None,
        }
    }

    pub fn is_v2(&self) -> bool {
        self.engine == Engine::V2
    }

    pub fn summary_page_index(&self) -> Option<usize> {
        self.pages.iter().position(Page::is_summary)
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentDef> {
        self.pages.iter().flat_map(|p| p.components().iter())
    }

    pub fn conditions_v2(&self) -> impl Iterator<Item = &ConditionWrapperV2> {
        self.conditions.iter().filter_map(Condition::as_v2)
    }
}

/// Deserialize a field so that an explicit `null` is distinguishable from an
/// absent field: absent → `None`, `null` → `Some(None)`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn status_field_lookup() {
        assert_eq!(FormStatus::Draft.field(), "draft");
        assert_eq!(FormStatus::Live.field(), "live");
        assert_eq!(FormStatus::from_str("live"), Some(FormStatus::Live));
        assert_eq!(FormStatus::from_str("archived"), None);
    }

    #[test]
    fn empty_definition_is_v2_with_summary_last() {
        let def = FormDefinition::empty("My form");
        assert!(def.is_v2());
        assert_eq!(def.schema, SCHEMA_V2);
        assert_eq!(def.summary_page_index(), Some(def.pages.len() - 1));
        assert!(def.pages[0].id.is_some());
    }

    #[test]
    fn controller_uses_page_controller_names() {
        let page: Page = serde_json::from_value(json!({
            "path": "/summary",
            "title": "Summary",
            "controller": "SummaryPageController"
        }))
        .unwrap();
        assert!(page.is_summary());
        assert_eq!(
            serde_json::to_value(ControllerType::FileUpload).unwrap(),
            json!("FileUploadPageController")
        );
    }

    #[test]
    fn legacy_controller_path_is_rejected() {
        let result = serde_json::from_value::<Page>(json!({
            "path": "/summary",
            "title": "Summary",
            "controller": "./pages/summary.js"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn v1_definition_deserializes_with_defaults() {
        let def: FormDefinition = serde_json::from_value(json!({
            "name": "Legacy",
            "startPage": "/first",
            "pages": [{ "path": "/first", "title": "First", "components": [] }],
            "conditions": [{ "name": "isBig", "displayName": "Is big", "value": "size == big" }]
        }))
        .unwrap();
        assert_eq!(def.engine, Engine::V1);
        assert_eq!(def.schema, SCHEMA_V1);
        assert!(def.pages[0].id.is_none());
        assert!(matches!(def.conditions[0], Condition::Legacy(_)));
        assert_eq!(def.conditions[0].reference(), "isBig");
    }

    #[test]
    fn v2_condition_deserializes_as_v2() {
        let id = Uuid::new_v4();
        let condition: Condition = serde_json::from_value(json!({
            "id": id,
            "displayName": "Lives in England",
            "items": []
        }))
        .unwrap();
        assert_eq!(condition.as_v2().map(|c| c.id), Some(id));
    }

    #[test]
    fn options_keep_unknown_keys() {
        let def: FormDefinition = serde_json::from_value(json!({
            "name": "Opts",
            "options": { "showReferenceNumber": true, "customBanner": "beta" }
        }))
        .unwrap();
        assert_eq!(def.options.show_reference_number, Some(true));
        let back = serde_json::to_value(&def).unwrap();
        assert_eq!(back["options"]["customBanner"], json!("beta"));
    }

    #[test]
    fn content_components() {
        assert!(ComponentType::Html.is_content());
        assert!(ComponentType::Details.is_content());
        assert!(!ComponentType::TextField.is_content());
        assert!(ComponentType::RadiosField.uses_list());
    }
}
