use crate::names::NameResolver;
use crate::php;

use activegen_core::schema::{Column, ForeignKey, Schema};

use std::fmt::Write;

/// Default-value policy for one generated argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultPolicy {
    /// Argument is required.
    None,
    /// Embed the column's declared default literal. Only meaningful for
    /// plain-column arguments.
    ColumnDefault,
    /// Nullable argument defaulting to `null`, for filter/create-query
    /// helpers where not every discriminator is known at call time.
    Null,
}

#[derive(Debug, Clone)]
struct Argument {
    /// Variable name without the `$` sigil.
    name: String,
    /// Parameter type hint, if any.
    hint: Option<String>,
    /// Type rendered into the PHPDoc line.
    doc_type: String,
    /// Rendered default literal, if the policy produced one.
    default: Option<String>,
    nullable: bool,
}

/// Accumulates the ordered, typed argument list of a generated method and
/// renders it three ways: parameter declarations, bare call arguments, and a
/// PHPDoc `@param` block.
#[derive(Debug, Default)]
pub struct SignatureBuilder {
    arguments: Vec<Argument>,
}

impl SignatureBuilder {
    /// One argument per crossing target of a cross relation, in declaration
    /// order, typed as the target table's object type.
    pub fn add_cross_target(
        &mut self,
        schema: &Schema,
        resolver: &NameResolver<'_>,
        fk: &ForeignKey,
        policy: DefaultPolicy,
    ) {
        let class = fk.target_table(schema).php_name();
        let name = resolver.identifier(fk, false, true);
        let nullable = policy == DefaultPolicy::Null;

        self.arguments.push(Argument {
            name,
            hint: Some(class.clone()),
            doc_type: class,
            default: nullable.then(|| "null".to_string()),
            nullable,
        });
    }

    /// One argument per unclassified junction primary key column, typed as
    /// the column's scalar type.
    pub fn add_column(&mut self, column: &Column, policy: DefaultPolicy) {
        let hint = column.ty.php_hint().map(str::to_string);
        let default = match policy {
            DefaultPolicy::None => None,
            DefaultPolicy::ColumnDefault => column
                .default
                .as_ref()
                .map(|value| php::column_literal(column, value)),
            DefaultPolicy::Null => Some("null".to_string()),
        };

        self.arguments.push(Argument {
            name: column.name.camel_case(),
            doc_type: hint.clone().unwrap_or_else(|| "mixed".to_string()),
            hint,
            nullable: matches!(policy, DefaultPolicy::Null),
            default,
        });
    }

    /// Moves the named argument to the front of the list. Used by producers
    /// that want the concrete other-side object first.
    pub fn move_to_front(&mut self, name: &str) {
        if let Some(position) = self.arguments.iter().position(|arg| arg.name == name) {
            let argument = self.arguments.remove(position);
            self.arguments.insert(0, argument);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.arguments.is_empty()
    }

    /// Parameter declaration string, e.g. `Team $team, ?string $day = null`.
    pub fn parameters(&self) -> String {
        let mut out = String::new();
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            if let Some(hint) = &arg.hint {
                if arg.nullable {
                    out.push('?');
                }
                out.push_str(hint);
                out.push(' ');
            }
            let _ = write!(out, "${}", arg.name);
            if let Some(default) = &arg.default {
                let _ = write!(out, " = {default}");
            }
        }
        out
    }

    /// Bare call-argument string, e.g. `$team, $day`.
    pub fn call_arguments(&self) -> String {
        let mut out = String::new();
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let _ = write!(out, "${}", arg.name);
        }
        out
    }

    /// PHPDoc `@param` lines, one per argument.
    pub fn phpdoc(&self) -> String {
        let mut out = String::new();
        for arg in &self.arguments {
            let nullable = if arg.nullable { "|null" } else { "" };
            let _ = writeln!(out, " * @param {}{} ${}", arg.doc_type, nullable, arg.name);
        }
        out
    }

    /// The combined element type of the argument tuple. A single argument
    /// degenerates to its own type rather than a one-element tuple.
    pub fn element_type(&self) -> String {
        match &self.arguments[..] {
            [single] => single.doc_type.clone(),
            arguments => {
                let types: Vec<&str> = arguments.iter().map(|a| a.doc_type.as_str()).collect();
                format!("({})", types.join(", "))
            }
        }
    }
}
