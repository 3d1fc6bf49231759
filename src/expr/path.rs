//! Field paths into documents

use std::fmt;

use crate::types::{Document, Value};

use super::errors::{ExprError, ExprResult};

/// One step of a path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathFragment {
    /// Field of a document
    Field(String),
    /// Element of an array
    Index(usize),
}

/// Path to a value nested in a document, e.g. `a.b[0].c`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path {
    fragments: Vec<PathFragment>,
}

impl Path {
    /// Path to a top-level field. The name is taken verbatim.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            fragments: vec![PathFragment::Field(name.into())],
        }
    }

    pub fn fragments(&self) -> &[PathFragment] {
        &self.fragments
    }

    /// Parses dotted notation with array indexes: `a.b[0].c`
    pub fn parse(s: &str) -> ExprResult<Self> {
        let invalid = || ExprError::InvalidPath(s.to_string());
        let mut fragments = Vec::new();

        for part in s.split('.') {
            let (name, mut rest) = match part.find('[') {
                Some(pos) => part.split_at(pos),
                None => (part, ""),
            };
            if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
                return Err(invalid());
            }
            fragments.push(PathFragment::Field(name.to_string()));

            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(invalid)?;
                let index = rest[1..close].parse::<usize>().map_err(|_| invalid())?;
                fragments.push(PathFragment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid());
                }
            }
        }

        Ok(Self { fragments })
    }

    /// Resolves the path against a document. Missing fields and
    /// out-of-range indexes resolve to `None`.
    pub fn resolve<'d>(&self, doc: &'d Document) -> Option<&'d Value> {
        let mut fragments = self.fragments.iter();
        let mut current = match fragments.next()? {
            PathFragment::Field(name) => doc.get(name)?,
            PathFragment::Index(_) => return None,
        };

        for fragment in fragments {
            current = match (fragment, current) {
                (PathFragment::Field(name), Value::Document(d)) => d.get(name)?,
                (PathFragment::Index(i), Value::Array(items)) => items.get(*i)?,
                _ => return None,
            };
        }

        Some(current)
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, fragment) in self.fragments.iter().enumerate() {
            match fragment {
                PathFragment::Field(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    if is_identifier(name) {
                        write!(f, "{}", name)?;
                    } else {
                        write!(f, "`{}`", name)?;
                    }
                }
                PathFragment::Index(index) => write!(f, "[{}]", index)?,
            }
        }
        Ok(())
    }
}
