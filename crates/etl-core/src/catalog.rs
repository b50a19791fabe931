use etl_domain::mapping::{FieldMapping, FieldType};
use etl_domain::MappingCatalog;

use crate::errors::CoreError;

/// Parses a mapping catalog from a YAML document and validates it. `type`
/// values outside the enumerated set fail during parsing itself, since
/// `FieldType` only deserializes the three known variants.
pub fn load_catalog(yaml: &str) -> Result<MappingCatalog, CoreError> {
    let catalog: MappingCatalog = serde_yaml::from_str(yaml)?;
    let catalog = catalog.finalize();
    validate(&catalog)?;
    Ok(catalog)
}

fn validate(catalog: &MappingCatalog) -> Result<(), CoreError> {
    for mapping in catalog.all_mappings() {
        validate_mapping(mapping)?;
    }
    Ok(())
}

fn validate_mapping(mapping: &FieldMapping) -> Result<(), CoreError> {
    if mapping.sources.is_empty() {
        return Err(CoreError::EmptySources { target: mapping.target.clone() });
    }

    if mapping.field_type == FieldType::Boolean {
        for value in mapping
            .true_values
            .iter()
            .chain(mapping.false_values.iter())
            .chain(mapping.null_values.iter())
        {
            let memberships = [
                mapping.true_values.contains(value),
                mapping.false_values.contains(value),
                mapping.null_values.contains(value),
            ]
            .into_iter()
            .filter(|&present| present)
            .count();
            if memberships > 1 {
                return Err(CoreError::AmbiguousBooleanVocabulary {
                    target: mapping.target.clone(),
                    value: value.clone(),
                });
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID_YAML: &str = r#"
permanent:
  - target: gender
    sources: ["GENDER"]
    type: string
changeable:
  - target: push_permission
    sources: ["PUSH_PERMISSION"]
    type: boolean
    true_values: ["true", "1"]
    false_values: ["false", "0"]
    null_values: ["N/A"]
"#;

    #[test]
    fn loads_valid_catalog() {
        let catalog = load_catalog(VALID_YAML).unwrap();
        assert_eq!(catalog.permanent.len(), 1);
        assert!(catalog.known_keys().contains("GENDER"));
    }

    #[test]
    fn rejects_empty_sources() {
        let yaml = r#"
permanent:
  - target: gender
    sources: []
    type: string
changeable: []
"#;
        let err = load_catalog(yaml).unwrap_err();
        assert!(matches!(err, CoreError::EmptySources { .. }));
    }

    #[test]
    fn rejects_ambiguous_boolean_vocabulary() {
        let yaml = r#"
permanent: []
changeable:
  - target: push_permission
    sources: ["PUSH_PERMISSION"]
    type: boolean
    true_values: ["true"]
    false_values: ["true"]
    null_values: []
"#;
        let err = load_catalog(yaml).unwrap_err();
        assert!(matches!(err, CoreError::AmbiguousBooleanVocabulary { .. }));
    }

    #[test]
    fn rejects_unknown_type_at_parse_time() {
        let yaml = r#"
permanent:
  - target: gender
    sources: ["GENDER"]
    type: float
changeable: []
"#;
        assert!(load_catalog(yaml).is_err());
    }
}
