// Copyright Kani Contributors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use crate::intern::{InternStringOption, InternedString};
use std::fmt::Debug;

/// A `Location` represents a source location.
///
/// Assertions additionally carry a human readable `comment` and a
/// `property_class` in their location; both are empty for ordinary code.
#[derive(Copy, Clone, Debug)]
pub enum Location {
    /// Unknown source location
    None,
    /// Code is in a builtin function
    BuiltinFunction { function_name: InternedString, line: Option<u64> },
    /// Location in user code.
    /// `function` is `None` for global, `Some(function_name)` for function local.
    Loc {
        file: InternedString,
        function: Option<InternedString>,
        line: u64,
        col: Option<u64>,
        comment: InternedString,
        property_class: InternedString,
    },
}

/// Getters and predicates
impl Location {
    pub fn is_none(&self) -> bool {
        matches!(self, Location::None)
    }

    pub fn is_builtin(&self) -> bool {
        matches!(self, Location::BuiltinFunction { .. })
    }

    pub fn filename(&self) -> Option<InternedString> {
        match self {
            Location::Loc { file, .. } => Some(*file),
            _ => None,
        }
    }

    pub fn line(&self) -> Option<u64> {
        match self {
            Location::Loc { line, .. } => Some(*line),
            _ => None,
        }
    }

    pub fn column(&self) -> Option<u64> {
        match self {
            Location::Loc { col, .. } => *col,
            _ => None,
        }
    }

    pub fn function_name(&self) -> Option<InternedString> {
        match self {
            Location::Loc { function, .. } => *function,
            Location::BuiltinFunction { function_name, .. } => Some(*function_name),
            _ => None,
        }
    }

    pub fn comment(&self) -> Option<InternedString> {
        match self {
            Location::Loc { comment, .. } => Some(*comment),
            _ => None,
        }
    }

    pub fn property_class(&self) -> Option<InternedString> {
        match self {
            Location::Loc { property_class, .. } => Some(*property_class),
            _ => None,
        }
    }

    /// Convert a location to a short string suitable for (e.g.) logging.
    /// Goal is to return just "file:line" as clearly as possible.
    pub fn short_string(&self) -> String {
        match self {
            Location::None => "<none>".to_string(),
            Location::BuiltinFunction { function_name, line: Some(line) } => {
                format!("<{function_name}>:{line}")
            }
            Location::BuiltinFunction { function_name, line: None } => {
                format!("<{function_name}>")
            }
            Location::Loc { file, line, .. } => format!("{file}:{line}"),
        }
    }
}

/// Constructors
impl Location {
    pub fn new<T, U: Into<InternedString>, V: Into<InternedString>>(
        file: U,
        function: Option<V>,
        line: T,
        col: Option<T>,
    ) -> Location
    where
        T: TryInto<u64>,
        T::Error: Debug,
    {
        Location::Loc {
            file: file.into(),
            function: function.intern(),
            line: line.try_into().unwrap(),
            col: col.map(|x| x.try_into().unwrap()),
            comment: "".into(),
            property_class: "".into(),
        }
    }

    pub fn none() -> Location {
        Location::None
    }

    pub fn builtin_function<T: Into<InternedString>>(name: T, line: Option<u64>) -> Location {
        Location::BuiltinFunction { function_name: name.into(), line }
    }

    /// A location that only names the enclosing function, for properties that
    /// belong to the function as a whole rather than to a statement.
    pub fn function_scope<T: Into<InternedString>>(function_name: T) -> Location {
        Location::Loc {
            file: "".into(),
            function: Some(function_name.into()),
            line: 0,
            col: None,
            comment: "".into(),
            property_class: "".into(),
        }
    }

    /// Create a property variant of any given location.
    pub fn with_property<T: Into<InternedString>, U: Into<InternedString>>(
        self,
        comment: T,
        property_name: U,
    ) -> Location {
        let (file, function, line, col) = match self {
            Location::Loc { file, function, line, col, .. } => (file, function, line, col),
            Location::BuiltinFunction { function_name, line } => {
                ("".into(), Some(function_name), line.unwrap_or(0), None)
            }
            Location::None => ("".into(), None, 0, None),
        };
        Location::Loc {
            file,
            function,
            line,
            col,
            comment: comment.into(),
            property_class: property_name.into(),
        }
    }

    /// Fill in missing position fields from `fallback`, field by field.
    /// Comment and property class are never inherited.
    pub fn with_fallback(self, fallback: &Location) -> Location {
        let Location::Loc {
            file: fb_file,
            function: fb_function,
            line: fb_line,
            col: fb_col,
            ..
        } = *fallback
        else {
            return self;
        };
        match self {
            Location::None => Location::Loc {
                file: fb_file,
                function: fb_function,
                line: fb_line,
                col: fb_col,
                comment: "".into(),
                property_class: "".into(),
            },
            Location::Loc { file, function, line, col, comment, property_class }
                if file.is_empty() =>
            {
                Location::Loc {
                    file: fb_file,
                    function: function.or(fb_function),
                    line: if line == 0 { fb_line } else { line },
                    col: col.or(fb_col),
                    comment,
                    property_class,
                }
            }
            _ => self,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Location;

    #[test]
    fn property_location_keeps_position() {
        let loc = Location::new("main.c", Some("main"), 12, Some(3));
        let property = loc.with_property("division by zero in a / b", "division-by-zero");
        assert_eq!(property.filename(), loc.filename());
        assert_eq!(property.line(), Some(12));
        assert_eq!(property.comment().unwrap(), "division by zero in a / b");
        assert_eq!(property.property_class().unwrap(), "division-by-zero");
    }

    #[test]
    fn fallback_fills_missing_fields() {
        let source = Location::new("main.c", Some("main"), 4, Some(1));
        let inherited = Location::none().with_fallback(&source);
        assert_eq!(inherited.filename(), source.filename());
        assert_eq!(inherited.line(), Some(4));
        assert!(inherited.comment().unwrap().is_empty());

        let scoped = Location::function_scope("main").with_fallback(&source);
        assert_eq!(scoped.filename(), source.filename());
        assert_eq!(scoped.function_name().unwrap(), "main");
    }
}
