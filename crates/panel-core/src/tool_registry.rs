use serde_json::json;
use serde_json::Map;
use serde_json::Number;
use serde_json::Value;
use thiserror::Error;

use crate::contracts::InputMap;

/// Property every tool schema carries; the panel owns its value.
pub const APPLY_PROPERTY: &str = "apply";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ToolId {
    ContentRefresh = 0,
    BillingPlanSync = 1,
    BrandTokenUpdate = 2,
    ChangelogDraft = 3,
    StoryAudit = 4,
    TokenDriftReport = 5,
}

impl ToolId {
    pub fn as_str(self) -> &'static str {
        ToolRegistry::get(self).name
    }

    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        TOOL_SPECS
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| spec.id)
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PropertyKind {
    Boolean {
        default: bool,
    },
    String {
        options: &'static [&'static str],
        default: Option<&'static str>,
    },
    Number {
        integer: bool,
        default: Option<f64>,
    },
    Array {
        items: &'static [&'static str],
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertySpec {
    pub name: &'static str,
    pub title: &'static str,
    pub kind: PropertyKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToolSpec {
    pub id: ToolId,
    pub name: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub properties: &'static [PropertySpec],
}

impl ToolSpec {
    /// Properties shown in the input form; `apply` is never user-editable.
    pub fn editable_properties(&self) -> impl Iterator<Item = &'static PropertySpec> {
        self.properties
            .iter()
            .filter(|property| property.name != APPLY_PROPERTY)
    }

    pub fn property(&self, name: &str) -> Option<&'static PropertySpec> {
        self.properties.iter().find(|property| property.name == name)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("{tool} has no input named `{key}`")]
    UnknownProperty { tool: &'static str, key: String },
    #[error("`{key}` is set by the panel and cannot be edited")]
    ReservedProperty { key: String },
    #[error("`{key}` expects true or false, got `{raw}`")]
    InvalidBoolean { key: String, raw: String },
    #[error("`{key}` expects a number, got `{raw}`")]
    InvalidNumber { key: String, raw: String },
    #[error("`{key}` expects one of [{allowed}], got `{raw}`")]
    NotInEnum {
        key: String,
        raw: String,
        allowed: String,
    },
}

const APPLY: PropertySpec = PropertySpec {
    name: APPLY_PROPERTY,
    title: "Apply changes",
    kind: PropertyKind::Boolean { default: false },
};

const LOCALES: &[&str] = &["en-US", "en-GB", "de-DE", "fr-FR", "ja-JP"];

const TOOL_SPECS: [ToolSpec; 6] = [
    ToolSpec {
        id: ToolId::ContentRefresh,
        name: "content_refresh",
        label: "Refresh content",
        description: "Regenerate story copy and docs snippets from the content source.",
        properties: &[
            PropertySpec {
                name: "collection",
                title: "Collection",
                kind: PropertyKind::String {
                    options: &["marketing", "docs", "onboarding"],
                    default: Some("docs"),
                },
            },
            PropertySpec {
                name: "locales",
                title: "Locales",
                kind: PropertyKind::Array { items: LOCALES },
            },
            PropertySpec {
                name: "includeDrafts",
                title: "Include drafts",
                kind: PropertyKind::Boolean { default: false },
            },
            APPLY,
        ],
    },
    ToolSpec {
        id: ToolId::BillingPlanSync,
        name: "billing_plan_sync",
        label: "Sync billing plans",
        description: "Update plan cards and pricing tables from the billing catalog.",
        properties: &[
            PropertySpec {
                name: "catalog",
                title: "Catalog",
                kind: PropertyKind::String {
                    options: &["production", "staging"],
                    default: None,
                },
            },
            PropertySpec {
                name: "currency",
                title: "Currency",
                kind: PropertyKind::String {
                    options: &[],
                    default: Some("USD"),
                },
            },
            PropertySpec {
                name: "roundTo",
                title: "Round prices to",
                kind: PropertyKind::Number {
                    integer: false,
                    default: Some(0.01),
                },
            },
            APPLY,
        ],
    },
    ToolSpec {
        id: ToolId::BrandTokenUpdate,
        name: "brand_token_update",
        label: "Update brand tokens",
        description: "Rewrite brand color and type tokens from the brand source of truth.",
        properties: &[
            PropertySpec {
                name: "theme",
                title: "Theme",
                kind: PropertyKind::String {
                    options: &["light", "dark", "high-contrast"],
                    default: None,
                },
            },
            PropertySpec {
                name: "scopes",
                title: "Token scopes",
                kind: PropertyKind::Array {
                    items: &["color", "typography", "spacing", "radius"],
                },
            },
            PropertySpec {
                name: "maxChanges",
                title: "Max changes",
                kind: PropertyKind::Number {
                    integer: true,
                    default: Some(50.0),
                },
            },
            APPLY,
        ],
    },
    ToolSpec {
        id: ToolId::ChangelogDraft,
        name: "changelog_draft",
        label: "Draft changelog",
        description: "Summarize merged component changes into a changelog draft.",
        properties: &[
            PropertySpec {
                name: "since",
                title: "Since tag",
                kind: PropertyKind::String {
                    options: &[],
                    default: None,
                },
            },
            PropertySpec {
                name: "labels",
                title: "Labels",
                kind: PropertyKind::Array { items: &[] },
            },
            APPLY,
        ],
    },
    ToolSpec {
        id: ToolId::StoryAudit,
        name: "story_audit",
        label: "Audit stories",
        description: "Report stories with missing args, docs or controls.",
        properties: &[
            PropertySpec {
                name: "strict",
                title: "Strict mode",
                kind: PropertyKind::Boolean { default: true },
            },
            PropertySpec {
                name: "limit",
                title: "Result limit",
                kind: PropertyKind::Number {
                    integer: true,
                    default: None,
                },
            },
            APPLY,
        ],
    },
    ToolSpec {
        id: ToolId::TokenDriftReport,
        name: "token_drift_report",
        label: "Token drift report",
        description: "Compare component styles against the token set and list drift.",
        properties: &[
            PropertySpec {
                name: "threshold",
                title: "Drift threshold",
                kind: PropertyKind::Number {
                    integer: false,
                    default: Some(0.05),
                },
            },
            APPLY,
        ],
    },
];

/// Tools that have a write phase; everything else is preview-only.
const APPLY_CAPABLE: [ToolId; 3] = [
    ToolId::ContentRefresh,
    ToolId::BillingPlanSync,
    ToolId::BrandTokenUpdate,
];

pub struct ToolRegistry;

impl ToolRegistry {
    pub fn list() -> &'static [ToolSpec] {
        &TOOL_SPECS
    }

    pub fn get(id: ToolId) -> &'static ToolSpec {
        &TOOL_SPECS[id.index()]
    }

    pub fn supports_apply(id: ToolId) -> bool {
        APPLY_CAPABLE.contains(&id)
    }

    pub fn default_inputs(id: ToolId) -> InputMap {
        let mut inputs = Map::new();
        for property in Self::get(id).properties {
            inputs.insert(property.name.to_string(), default_value(property.kind));
        }
        inputs.insert(APPLY_PROPERTY.to_string(), Value::Bool(false));
        inputs
    }

    /// JSON Schema (`object` with a `properties` map) describing the tool's form.
    pub fn schema(id: ToolId) -> Value {
        let spec = Self::get(id);
        let mut properties = Map::new();
        for property in spec.properties {
            properties.insert(property.name.to_string(), property_schema(property));
        }
        json!({
            "type": "object",
            "title": spec.label,
            "description": spec.description,
            "properties": properties,
        })
    }

    /// Coerces raw form text into the JSON value the schema expects.
    pub fn parse_input(id: ToolId, key: &str, raw: &str) -> Result<Value, InputError> {
        let spec = Self::get(id);
        if key == APPLY_PROPERTY {
            return Err(InputError::ReservedProperty {
                key: key.to_string(),
            });
        }
        let property = spec.property(key).ok_or_else(|| InputError::UnknownProperty {
            tool: spec.name,
            key: key.to_string(),
        })?;
        let raw = raw.trim();

        match property.kind {
            PropertyKind::Boolean { .. } => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Value::Bool(true)),
                "false" | "no" | "off" | "0" => Ok(Value::Bool(false)),
                _ => Err(InputError::InvalidBoolean {
                    key: key.to_string(),
                    raw: raw.to_string(),
                }),
            },
            PropertyKind::String { options, .. } => {
                check_enum(key, raw, options)?;
                Ok(Value::String(raw.to_string()))
            }
            PropertyKind::Number { integer, .. } => {
                let invalid = || InputError::InvalidNumber {
                    key: key.to_string(),
                    raw: raw.to_string(),
                };
                if integer {
                    raw.parse::<i64>().map(Value::from).map_err(|_| invalid())
                } else {
                    raw.parse::<f64>()
                        .ok()
                        .and_then(Number::from_f64)
                        .map(Value::Number)
                        .ok_or_else(invalid)
                }
            }
            PropertyKind::Array { items } => {
                let mut values = Vec::new();
                for item in raw.split(',').map(str::trim).filter(|item| !item.is_empty()) {
                    check_enum(key, item, items)?;
                    values.push(Value::String(item.to_string()));
                }
                Ok(Value::Array(values))
            }
        }
    }

    /// Copy of `inputs` with the `apply` flag forced to `apply`.
    pub fn build_payload(inputs: &InputMap, apply: bool) -> InputMap {
        let mut payload = inputs.clone();
        payload.insert(APPLY_PROPERTY.to_string(), Value::Bool(apply));
        payload
    }
}

fn check_enum(key: &str, raw: &str, options: &[&str]) -> Result<(), InputError> {
    if options.is_empty() || options.contains(&raw) {
        return Ok(());
    }
    Err(InputError::NotInEnum {
        key: key.to_string(),
        raw: raw.to_string(),
        allowed: options.join(", "),
    })
}

fn default_value(kind: PropertyKind) -> Value {
    match kind {
        PropertyKind::Boolean { default } => Value::Bool(default),
        PropertyKind::String { options, default } => default
            .or_else(|| options.first().copied())
            .map(|value| Value::String(value.to_string()))
            .unwrap_or_else(|| Value::String(String::new())),
        PropertyKind::Number { integer, default } => match default {
            Some(value) if integer => Value::from(value as i64),
            Some(value) => Number::from_f64(value)
                .map(Value::Number)
                .unwrap_or_else(|| Value::from(0)),
            None => Value::from(0),
        },
        PropertyKind::Array { .. } => Value::Array(Vec::new()),
    }
}

fn property_schema(property: &PropertySpec) -> Value {
    match property.kind {
        PropertyKind::Boolean { default } => json!({
            "type": "boolean",
            "title": property.title,
            "default": default,
        }),
        PropertyKind::String { options, default } => {
            let mut schema = json!({ "type": "string", "title": property.title });
            if !options.is_empty() {
                schema["enum"] = json!(options);
            }
            if let Some(default) = default {
                schema["default"] = json!(default);
            }
            schema
        }
        PropertyKind::Number { integer, default } => {
            let type_name = if integer { "integer" } else { "number" };
            let mut schema = json!({ "type": type_name, "title": property.title });
            if let Some(default) = default {
                schema["default"] = default_value(PropertyKind::Number {
                    integer,
                    default: Some(default),
                });
            }
            schema
        }
        PropertyKind::Array { items } => {
            let item_schema = if items.is_empty() {
                json!({ "type": "string" })
            } else {
                json!({ "type": "string", "enum": items })
            };
            json!({
                "type": "array",
                "title": property.title,
                "items": item_schema,
            })
        }
    }
}
