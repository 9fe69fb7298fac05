//! Where a record's text to synthesize comes from.

use crate::error::{ConfigError, SourceError};
use crate::record::RecordFields;
use crate::template::{Template, TemplateFormatVersion};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source configuration of a batch, persisted with a `mode` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum BatchSource {
    /// The raw value of one field.
    Simple { source_field: String },
    /// A template evaluated against all fields of the record.
    Template {
        source_template: String,
        #[serde(default)]
        template_format_version: TemplateFormatVersion,
    },
}

impl BatchSource {
    pub fn simple(field: impl Into<String>) -> Self {
        Self::Simple {
            source_field: field.into(),
        }
    }

    pub fn template(template: impl Into<String>, version: TemplateFormatVersion) -> Self {
        Self::Template {
            source_template: template.into(),
            template_format_version: version,
        }
    }

    /// Parses the template (if any) once, for resolving many records.
    pub fn compile(&self) -> Result<CompiledSource, ConfigError> {
        match self {
            Self::Simple { source_field } => {
                if source_field.trim().is_empty() {
                    return Err(ConfigError::EmptySourceField);
                }
                Ok(CompiledSource::Field(source_field.clone()))
            }
            Self::Template {
                source_template,
                template_format_version,
            } => {
                if source_template.trim().is_empty() {
                    return Err(ConfigError::EmptyTemplate);
                }
                let template = Template::parse(source_template, *template_format_version)?;
                Ok(CompiledSource::Template(template))
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.compile().map(|_| ())
    }

    /// Resolves the source text of one record.
    ///
    /// A template that fails to parse surfaces as [`SourceError::Template`].
    pub fn resolve(&self, fields: &RecordFields) -> Result<String, SourceError> {
        match self {
            Self::Simple { source_field } => CompiledSource::Field(source_field.clone()).resolve(fields),
            Self::Template {
                source_template,
                template_format_version,
            } => Template::parse(source_template, *template_format_version)?
                .render(fields)
                .map_err(SourceError::from),
        }
    }
}

impl fmt::Display for BatchSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple { source_field } => f.write_str(source_field),
            Self::Template {
                template_format_version,
                ..
            } => write!(f, "template ({template_format_version})"),
        }
    }
}

/// A validated source, ready to resolve records.
#[derive(Debug, Clone, PartialEq)]
pub enum CompiledSource {
    Field(String),
    Template(Template),
}

impl CompiledSource {
    pub fn resolve(&self, fields: &RecordFields) -> Result<String, SourceError> {
        match self {
            Self::Field(name) => fields
                .get(name)
                .cloned()
                .ok_or_else(|| SourceError::FieldNotFound(name.clone())),
            Self::Template(template) => Ok(template.render(fields)?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateError;
    use serde_json::json;

    fn record() -> RecordFields {
        [("Front", "chat"), ("Back", "cat")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn simple_returns_raw_field() {
        assert_eq!(BatchSource::simple("Front").resolve(&record()).unwrap(), "chat");
    }

    #[test]
    fn simple_missing_field() {
        assert_eq!(
            BatchSource::simple("Missing").resolve(&record()),
            Err(SourceError::FieldNotFound("Missing".to_string()))
        );
    }

    #[test]
    fn template_resolves_and_reports_errors() {
        let source = BatchSource::template("{Front}/{Back}", TemplateFormatVersion::V1);
        assert_eq!(source.resolve(&record()).unwrap(), "chat/cat");

        let undefined = BatchSource::template("{Nope}", TemplateFormatVersion::V2);
        assert_eq!(
            undefined.resolve(&record()),
            Err(SourceError::Template(TemplateError::UndefinedField(
                "Nope".to_string()
            )))
        );

        let broken = BatchSource::template("{Front", TemplateFormatVersion::V1);
        assert!(matches!(
            broken.resolve(&record()),
            Err(SourceError::Template(TemplateError::Unterminated(0)))
        ));
    }

    #[test]
    fn validation() {
        assert_eq!(
            BatchSource::simple(" ").validate(),
            Err(ConfigError::EmptySourceField)
        );
        assert_eq!(
            BatchSource::template("", TemplateFormatVersion::V2).validate(),
            Err(ConfigError::EmptyTemplate)
        );
        assert!(matches!(
            BatchSource::template("{A|bogus}", TemplateFormatVersion::V2).validate(),
            Err(ConfigError::Template(TemplateError::UnknownFilter(_)))
        ));
        assert!(BatchSource::template("{A|bogus}", TemplateFormatVersion::V1)
            .validate()
            .is_ok());
    }

    #[test]
    fn serialized_shape() {
        let simple = serde_json::to_value(BatchSource::simple("Front")).unwrap();
        assert_eq!(simple, json!({"mode": "simple", "source_field": "Front"}));

        let template = serde_json::to_value(BatchSource::template("{Front}", TemplateFormatVersion::V2))
            .unwrap();
        assert_eq!(
            template,
            json!({
                "mode": "template",
                "source_template": "{Front}",
                "template_format_version": "v2"
            })
        );

        let legacy: BatchSource =
            serde_json::from_value(json!({"mode": "template", "source_template": "{Front}"}))
                .unwrap();
        assert_eq!(legacy, BatchSource::template("{Front}", TemplateFormatVersion::V1));
    }
}
