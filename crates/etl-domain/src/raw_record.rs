use serde_json::{Map, Value};

/// Which upstream feed a [`RawRecord`] came from. Drives the key under which
/// the transformer finds the nested user-property bag, and the outer shape
/// the orchestrator drives it with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceTag {
    /// A line read from a daily Amplitude export archive.
    Archive,
    /// A row read from the `tmp_user_properties` staging table.
    Staging,
}

impl SourceTag {
    /// The top-level key holding the nested user-property bag for this
    /// source (`user_properties` for archive lines, `user_properties_json`
    /// for staging rows).
    pub fn nested_bag_key(self) -> &'static str {
        match self {
            SourceTag::Archive => "user_properties",
            SourceTag::Staging => "user_properties_json",
        }
    }
}

/// An untyped key/value bag describing one raw event, as read verbatim from
/// the archive provider or the staging table. Shapes are source-dependent
/// by design: a fixed struct would defeat the catalog-driven extraction the
/// transformer performs, so this wraps a JSON object directly.
#[derive(Debug, Clone)]
pub struct RawRecord {
    fields: Map<String, Value>,
}

impl RawRecord {
    pub fn new(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Parses one line of NDJSON into a `RawRecord`. The line must decode to
    /// a JSON object; any other JSON shape (array, scalar) is treated the
    /// same as a decode failure by the caller.
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(line)?;
        Ok(Self::from_value(value))
    }

    /// Wraps a `serde_json::Value`; non-object values become an empty
    /// record (no top-level keys), matching the Python original's permissive
    /// `dict(row)` handling of already-decoded DB rows.
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::new(map),
            _ => Self::new(Map::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The nested user-property bag for the given source, defaulting to an
    /// empty mapping when the field is absent or not itself an object.
    pub fn nested_bag(&self, source: SourceTag) -> Map<String, Value> {
        match self.fields.get(source.nested_bag_key()) {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        }
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}
