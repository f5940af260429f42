/// Scalar type of a column, reduced to the categories the generator needs to
/// reason about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Boolean,
    Integer,
    BigInt,
    Float,
    Decimal,
    Varchar,
    Text,
    Date,
    Time,
    Timestamp,
    Enum,
    Set,
    Array,
    Json,
    Object,
    Blob,
    Uuid,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ColumnType::Integer | ColumnType::BigInt | ColumnType::Float | ColumnType::Decimal
        )
    }

    pub fn is_text(self) -> bool {
        matches!(
            self,
            ColumnType::Varchar | ColumnType::Text | ColumnType::Enum | ColumnType::Uuid
        )
    }

    /// PHP parameter type hint for values of this type, if one exists.
    pub fn php_hint(self) -> Option<&'static str> {
        match self {
            ColumnType::Boolean => Some("bool"),
            ColumnType::Integer | ColumnType::BigInt => Some("int"),
            ColumnType::Float | ColumnType::Decimal => Some("float"),
            ColumnType::Varchar | ColumnType::Text | ColumnType::Enum | ColumnType::Uuid => {
                Some("string")
            }
            ColumnType::Date | ColumnType::Time | ColumnType::Timestamp => None,
            ColumnType::Set | ColumnType::Array => Some("array"),
            ColumnType::Json | ColumnType::Object | ColumnType::Blob => None,
        }
    }
}
