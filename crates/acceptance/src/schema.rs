//! JSON Schemas for response bodies, addressed by logical name

use std::collections::BTreeMap;

use jsonschema::Validator;
use serde_json::Value;

use crate::error::{HarnessError, HarnessResult};

const BUILTIN: &[(&str, &str)] = &[
    ("message_dto", include_str!("../schemas/message_dto.json")),
    ("token_response", include_str!("../schemas/token_response.json")),
    ("user_page", include_str!("../schemas/user_page.json")),
];

/// Compiled validators keyed by logical schema name
pub struct SchemaRegistry {
    validators: BTreeMap<String, Validator>,
}

impl SchemaRegistry {
    /// Registry holding the bundled schemas
    pub fn builtin() -> HarnessResult<Self> {
        let mut registry = Self {
            validators: BTreeMap::new(),
        };
        for (name, source) in BUILTIN {
            let schema: Value = serde_json::from_str(source)?;
            registry.register(name, &schema)?;
        }
        Ok(registry)
    }

    pub fn register(&mut self, name: &str, schema: &Value) -> HarnessResult<()> {
        let validator =
            jsonschema::validator_for(schema).map_err(|e| HarnessError::SchemaCompile {
                name: name.to_string(),
                reason: e.to_string(),
            })?;
        self.validators.insert(logical_name(name).to_string(), validator);
        Ok(())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.validators.keys().map(String::as_str)
    }

    /// Every violation of `instance` against schema `name`; empty means valid
    pub fn violations(&self, name: &str, instance: &Value) -> HarnessResult<Vec<String>> {
        let validator = self
            .validators
            .get(logical_name(name))
            .ok_or_else(|| HarnessError::UnknownSchema(name.to_string()))?;
        Ok(validator
            .iter_errors(instance)
            .map(|err| err.to_string())
            .collect())
    }
}

/// `schemas/message_dto.json` and `message_dto` name the same schema
pub fn logical_name(name: &str) -> &str {
    let name = name.trim();
    let name = name.rsplit('/').next().unwrap_or(name);
    name.strip_suffix(".json").unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_logical_name() {
        assert_eq!(logical_name("schemas/message_dto.json"), "message_dto");
        assert_eq!(logical_name("user_page.json"), "user_page");
        assert_eq!(logical_name("token_response"), "token_response");
    }

    #[test]
    fn test_builtin_schemas_compile() {
        let registry = SchemaRegistry::builtin().unwrap();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names, vec!["message_dto", "token_response", "user_page"]);
    }

    #[test]
    fn test_message_dto() {
        let registry = SchemaRegistry::builtin().unwrap();
        let ok = json!({ "error": false, "respuesta": "Usuario creado" });
        assert!(registry.violations("message_dto", &ok).unwrap().is_empty());

        let bad = json!({ "respuesta": "missing error flag" });
        assert!(!registry.violations("message_dto", &bad).unwrap().is_empty());
    }

    #[test]
    fn test_token_response_accepts_both_shapes() {
        let registry = SchemaRegistry::builtin().unwrap();
        let nested = json!({ "error": false, "respuesta": { "token": "abc" } });
        let flat = json!({ "token": "abc" });
        let neither = json!({ "respuesta": {} });
        assert!(registry.violations("token_response", &nested).unwrap().is_empty());
        assert!(registry.violations("token_response", &flat).unwrap().is_empty());
        assert!(!registry.violations("token_response", &neither).unwrap().is_empty());
    }

    #[test]
    fn test_user_page() {
        let registry = SchemaRegistry::builtin().unwrap();
        let page = json!({ "error": false, "respuesta": [{ "usuario": "user_1" }] });
        assert!(registry.violations("user_page.json", &page).unwrap().is_empty());

        let wrong = json!({ "error": false, "respuesta": "nope" });
        assert!(!registry.violations("user_page", &wrong).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_schema() {
        let registry = SchemaRegistry::builtin().unwrap();
        assert!(matches!(
            registry.violations("missing", &json!({})),
            Err(HarnessError::UnknownSchema(_))
        ));
    }
}
