/// Column type, fixing the on-page width of its cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    Bool,
    Int64,
    Float64,
    /// Strings up to `cap` bytes; longer values are truncated on encode.
    Varchar(usize),
}

impl FieldType {
    /// Width of the value payload, excluding the 1-byte cell tag.
    pub fn payload_size(&self) -> usize {
        match self {
            FieldType::Bool => 1,
            FieldType::Int64 => 8,
            FieldType::Float64 => 8,
            // a length byte plus the declared capacity
            FieldType::Varchar(cap) => 1 + cap,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    field_type: FieldType,
}

impl Field {
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }
}

/// Ordered column list of a table or of an executor's output.
#[derive(Debug, Clone)]
pub struct TableSchema {
    fields: Vec<Field>,
}

impl TableSchema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Byte width of an encoded tuple: one tag byte plus the payload per
    /// cell.
    pub fn tuple_size(&self) -> usize {
        self.fields
            .iter()
            .map(|f| 1 + f.field_type().payload_size())
            .sum()
    }

    /// Sub-schema selecting `key_attrs`, in the given order.
    pub fn project(&self, key_attrs: &[usize]) -> TableSchema {
        let fields = key_attrs
            .iter()
            .filter_map(|&i| self.fields.get(i).cloned())
            .collect();
        TableSchema::new(fields)
    }
}

/// Schema of `columns` Int64 fields, named `<prefix>0..<prefix>n`. Handy in
/// tests.
pub fn int64_schema(columns: usize, prefix: &str) -> TableSchema {
    let fields = (0..columns)
        .map(|i| Field::new(&format!("{}{}", prefix, i), FieldType::Int64))
        .collect();
    TableSchema::new(fields)
}
