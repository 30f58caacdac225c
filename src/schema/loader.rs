//! Schema definition files
//!
//! Schemas can be declared in JSON, one file per schema:
//!
//! ```json
//! {
//!   "name": "users",
//!   "standard_fields": true,
//!   "fields": [
//!     { "name": "email", "kind": "email", "required": true, "unique": true },
//!     { "name": "role", "kind": "enum", "legal_values": ["user", "admin"], "default": "user" },
//!     { "name": "tags", "kind": "list", "element": { "name": "tag", "kind": "string" } },
//!     { "name": "key", "kind": "concatenated", "fields": ["email", "role"] }
//!   ]
//! }
//! ```
//!
//! Default functions are referenced by generator name (`unique_id`,
//! `timestamp`). Derived fields other than concatenations need code and
//! cannot be declared here.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{SchemaError, SchemaResult};
use super::generators;
use super::record_schema::Schema;
use super::spec::FieldSpec;
use crate::observability::{Event, Logger};

/// One schema definition file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Compose with `id`, `created_at` and `updated_at`.
    #[serde(default)]
    pub standard_fields: bool,
    pub fields: Vec<FieldDef>,
}

/// One field declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(flatten)]
    pub kind: KindDef,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Name of a default generator.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub empty_allowed: Option<bool>,
}

/// Declarable field kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KindDef {
    Boolean,
    Int,
    Float,
    String,
    Enum {
        legal_values: Vec<String>,
    },
    List {
        #[serde(default)]
        element: Option<Box<FieldDef>>,
    },
    Dict {
        #[serde(default)]
        fields: Option<Vec<FieldDef>>,
    },
    Concatenated {
        fields: Vec<String>,
    },
    Timestamp,
    Id,
    Url,
    Email,
    Timezone,
}

impl FieldDef {
    /// Builds the field spec this declaration describes.
    pub fn build(&self) -> SchemaResult<FieldSpec> {
        let name = self.name.as_str();
        let description = self.description.as_str();

        let mut spec = match &self.kind {
            KindDef::Boolean => FieldSpec::boolean(name, description),
            KindDef::Int => FieldSpec::int(name, description),
            KindDef::Float => FieldSpec::float(name, description),
            KindDef::String => FieldSpec::string(name, description),
            KindDef::Enum { legal_values } => {
                FieldSpec::enum_string(name, description, legal_values.iter().cloned())
            }
            KindDef::List { element } => {
                let spec = FieldSpec::list(name, description);
                match element {
                    Some(element) => spec.with_element(element.build()?),
                    None => spec,
                }
            }
            KindDef::Dict { fields } => {
                let spec = FieldSpec::dict(name, description);
                match fields {
                    Some(fields) => spec.with_sub_schema(build_schema(name, fields, false)?),
                    None => spec,
                }
            }
            KindDef::Concatenated { fields } => {
                FieldSpec::concatenated(name, description, fields.iter().cloned())
            }
            KindDef::Timestamp => FieldSpec::timestamp(name, description),
            KindDef::Id => FieldSpec::id(name, description),
            KindDef::Url => FieldSpec::url(name, description),
            KindDef::Email => FieldSpec::email(name, description),
            KindDef::Timezone => FieldSpec::timezone(name, description),
        };

        if self.required {
            spec = spec.required();
        }
        if self.unique {
            spec = spec.unique();
        }
        if let Some(allowed) = self.empty_allowed {
            spec = spec.empty_allowed(allowed);
        }
        if let Some(default) = &self.default {
            spec = spec.with_default(default.clone());
        }
        if let Some(generator) = &self.generator {
            let producer = generators::named(generator).ok_or_else(|| SchemaError::UnknownGenerator {
                field: self.name.clone(),
                generator: generator.clone(),
            })?;
            spec = spec.with_shared_default_fn(producer);
        }
        Ok(spec)
    }
}

impl SchemaDef {
    /// Parses a definition from JSON text. `origin` names the source in errors.
    pub fn parse(origin: &str, content: &str) -> SchemaResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| SchemaError::malformed(origin, format!("invalid JSON: {}", e)))
    }

    pub fn build(&self) -> SchemaResult<Schema> {
        build_schema(&self.name, &self.fields, self.standard_fields)
    }
}

fn build_schema(name: &str, fields: &[FieldDef], standard_fields: bool) -> SchemaResult<Schema> {
    let specs = fields
        .iter()
        .map(FieldDef::build)
        .collect::<SchemaResult<Vec<_>>>()?;
    let schema = if standard_fields {
        Schema::standard(specs)
    } else {
        Schema::new(specs)
    };

    if let Some((field, depends_on)) = schema.derivation_order_violations().into_iter().next() {
        Logger::error(
            Event::SchemaRejected,
            &[
                ("schema", name),
                ("field", field.as_str()),
                ("depends_on", depends_on.as_str()),
            ],
        );
        return Err(SchemaError::DerivationOrder { field, depends_on });
    }
    Ok(schema)
}

/// Reads schema definition files and keeps the built schemas by name.
pub struct SchemaLoader {
    schema_dir: PathBuf,
    schemas: BTreeMap<String, Schema>,
}

impl SchemaLoader {
    /// Schema files are `*.json` directly inside `schema_dir`.
    pub fn new(schema_dir: &Path) -> Self {
        Self {
            schema_dir: schema_dir.to_path_buf(),
            schemas: BTreeMap::new(),
        }
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    /// Loads every definition file, in file name order.
    pub fn load_all(&mut self) -> SchemaResult<()> {
        let dir = self.schema_dir.display().to_string();
        let entries = fs::read_dir(&self.schema_dir).map_err(|e| SchemaError::io(&dir, e))?;

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| SchemaError::io(&dir, e))?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {
            self.load_file(&path)?;
        }
        Ok(())
    }

    /// Loads one definition file.
    pub fn load_file(&mut self, path: &Path) -> SchemaResult<()> {
        let origin = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|e| SchemaError::io(&origin, e))?;
        let def = SchemaDef::parse(&origin, &content)?;
        let schema = def.build()?;
        self.register(&def.name, schema)
    }

    /// Registers a schema built in code.
    pub fn register(&mut self, name: &str, schema: Schema) -> SchemaResult<()> {
        if self.schemas.contains_key(name) {
            return Err(SchemaError::DuplicateSchema {
                name: name.to_string(),
            });
        }
        let field_count = schema.len().to_string();
        self.schemas.insert(name.to_string(), schema);
        Logger::info(
            Event::SchemaLoaded,
            &[("schema", name), ("fields", field_count.as_str())],
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    /// Like [`get`](Self::get) but fails with `UnknownSchema`.
    pub fn require(&self, name: &str) -> SchemaResult<&Schema> {
        self.get(name).ok_or_else(|| SchemaError::UnknownSchema {
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    pub fn schema_count(&self) -> usize {
        self.schemas.len()
    }
}
