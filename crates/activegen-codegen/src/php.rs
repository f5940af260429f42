//! Small text helpers shared by the producers. Generated PHP is built as
//! plain strings; producers interpolate names into method templates and the
//! orchestrator concatenates the results.

/// Lowercases only the first character, turning a type-style identifier into
/// a variable-style one.
pub(crate) fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// Renders a single-quoted PHP string literal.
pub(crate) fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'"))
}

/// Renders `value` as a PHP literal for `column`'s type.
pub(crate) fn column_literal(column: &activegen_core::schema::Column, value: &str) -> String {
    use activegen_core::schema::ColumnType;

    if value.eq_ignore_ascii_case("null") {
        return "null".to_string();
    }

    if column.ty == ColumnType::Boolean {
        return if value == "1" || value.eq_ignore_ascii_case("true") {
            "true".to_string()
        } else {
            "false".to_string()
        };
    }

    if column.ty.is_numeric() {
        value.to_string()
    } else {
        quote(value)
    }
}

/// The mutator argument a related object's default collapses to when the
/// relation is cleared: the column default if declared, `null` otherwise.
pub(crate) fn cleared_value(column: &activegen_core::schema::Column) -> String {
    match &column.default {
        Some(value) => column_literal(column, value),
        None => "null".to_string(),
    }
}
