//! Backward compatibility between Avro schemas
//!
//! A new schema is backward compatible with an old one when a reader using
//! the new schema can resolve data written with the old one under the Avro
//! schema-resolution rules.

use std::collections::HashMap;

use apache_avro::schema::{EnumSchema, FixedSchema, Name, RecordSchema, Schema};
use serde::{Deserialize, Serialize};

use crate::convert::{collect_names, fullname, schema_kind};

/// Result of a compatibility check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompatibilityResult {
    /// Whether the schemas are compatible
    pub is_compatible: bool,
    /// Why not, one message per problem
    pub messages: Vec<String>,
}

impl CompatibilityResult {
    pub fn compatible() -> Self {
        Self {
            is_compatible: true,
            messages: Vec::new(),
        }
    }

    pub fn incompatible(messages: Vec<String>) -> Self {
        Self {
            is_compatible: false,
            messages,
        }
    }
}

/// Backward compatibility checker
#[derive(Debug, Default)]
pub struct CompatibilityChecker;

impl CompatibilityChecker {
    pub fn new() -> Self {
        Self
    }

    /// Can `new_schema` read data written with `old_schema`?
    pub fn check_backward(&self, new_schema: &Schema, old_schema: &Schema) -> CompatibilityResult {
        let mut reader_names = HashMap::new();
        collect_names(new_schema, &mut reader_names);
        let mut writer_names = HashMap::new();
        collect_names(old_schema, &mut writer_names);

        let mut walk = Resolution {
            reader_names: &reader_names,
            writer_names: &writer_names,
            messages: Vec::new(),
            seen: Vec::new(),
        };
        walk.check(new_schema, old_schema, "");

        if walk.messages.is_empty() {
            CompatibilityResult::compatible()
        } else {
            CompatibilityResult::incompatible(walk.messages)
        }
    }
}

struct Resolution<'a> {
    reader_names: &'a HashMap<String, Schema>,
    writer_names: &'a HashMap<String, Schema>,
    messages: Vec<String>,
    /// record pairs already being compared, for recursive types
    seen: Vec<(String, String)>,
}

impl<'a> Resolution<'a> {
    fn deref<'s>(names: &'s HashMap<String, Schema>, schema: &'s Schema) -> &'s Schema {
        match schema {
            Schema::Ref { name } => names.get(&fullname(name)).unwrap_or(schema),
            other => other,
        }
    }

    fn check(&mut self, reader: &'a Schema, writer: &'a Schema, path: &str) {
        let reader = Self::deref(self.reader_names, reader);
        let writer = Self::deref(self.writer_names, writer);

        match (reader, writer) {
            (_, Schema::Union(w)) => {
                for (i, variant) in w.variants().iter().enumerate() {
                    if !self.readable(reader, variant) {
                        self.fail(
                            path,
                            format!(
                                "writer union branch {} ({}) cannot be read",
                                i,
                                schema_kind(variant)
                            ),
                        );
                    }
                }
            }
            (Schema::Union(r), _) => {
                if !r.variants().iter().any(|v| self.readable(v, writer)) {
                    self.fail(
                        path,
                        format!("no reader union branch accepts {}", schema_kind(writer)),
                    );
                }
            }
            (Schema::Record(r), Schema::Record(w)) => self.check_record(r, w, path),
            (Schema::Enum(EnumSchema { name: rn, symbols: rs, .. }), Schema::Enum(EnumSchema { name: wn, symbols: ws, .. })) => {
                self.check_name(rn, wn, path);
                for symbol in ws {
                    if !rs.contains(symbol) {
                        self.fail(path, format!("enum symbol '{}' was removed", symbol));
                    }
                }
            }
            (Schema::Fixed(FixedSchema { name: rn, size: rsize, .. }), Schema::Fixed(FixedSchema { name: wn, size: wsize, .. })) => {
                self.check_name(rn, wn, path);
                if rsize != wsize {
                    self.fail(path, format!("fixed size changed from {} to {}", wsize, rsize));
                }
            }
            (Schema::Array(r), Schema::Array(w)) => self.check(r, w, &format!("{}[]", path)),
            (Schema::Map(r), Schema::Map(w)) => self.check(r, w, &format!("{}{{}}", path)),
            (r, w) if primitive_promotes(w, r) => {}
            (r, w) => self.fail(
                path,
                format!("{} cannot be read as {}", schema_kind(w), schema_kind(r)),
            ),
        }
    }

    fn check_record(&mut self, reader: &'a RecordSchema, writer: &'a RecordSchema, path: &str) {
        self.check_name(&reader.name, &writer.name, path);

        let pair = (fullname(&reader.name), fullname(&writer.name));
        if self.seen.contains(&pair) {
            return;
        }
        self.seen.push(pair);

        for reader_field in &reader.fields {
            let field_path = if path.is_empty() {
                reader_field.name.clone()
            } else {
                format!("{}.{}", path, reader_field.name)
            };
            match writer.fields.iter().find(|f| f.name == reader_field.name) {
                Some(writer_field) => {
                    self.check(&reader_field.schema, &writer_field.schema, &field_path)
                }
                None if reader_field.default.is_some() => {}
                None => self.fail(&field_path, "added without a default".to_string()),
            }
        }
    }

    fn check_name(&mut self, reader: &Name, writer: &Name, path: &str) {
        if reader.name != writer.name {
            self.fail(
                path,
                format!("type renamed from '{}' to '{}'", writer.name, reader.name),
            );
        }
    }

    /// Check without recording messages
    fn readable(&mut self, reader: &'a Schema, writer: &'a Schema) -> bool {
        let before = self.messages.len();
        self.check(reader, writer, "");
        let ok = self.messages.len() == before;
        self.messages.truncate(before);
        ok
    }

    fn fail(&mut self, path: &str, message: String) {
        let location = if path.is_empty() { "<root>" } else { path };
        self.messages.push(format!("{}: {}", location, message));
    }
}

/// Same primitive, or an Avro-permitted promotion from writer to reader
fn primitive_promotes(writer: &Schema, reader: &Schema) -> bool {
    use Schema::*;
    matches!(
        (writer, reader),
        (Null, Null)
            | (Boolean, Boolean)
            | (Int, Int)
            | (Int, Long)
            | (Int, Float)
            | (Int, Double)
            | (Long, Long)
            | (Long, Float)
            | (Long, Double)
            | (Float, Float)
            | (Float, Double)
            | (Double, Double)
            | (Bytes, Bytes)
            | (Bytes, String)
            | (String, String)
            | (String, Bytes)
            | (Date, Date)
            | (TimestampMillis, TimestampMillis)
            | (TimestampMicros, TimestampMicros)
    )
}
