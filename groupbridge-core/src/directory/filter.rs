//! Search filters, rendered to RFC 4515 strings for LDAP and evaluated
//! directly by the in-memory directory.

use ldap3::ldap_escape;
use std::fmt;

use super::{canonical_dn, DirectoryEntry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    And(Vec<Filter>),
    Equals { attribute: String, value: String },
    Contains { attribute: String, value: String },
    Present { attribute: String },
}

impl Filter {
    pub fn equals(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Equals {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn contains(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Filter::Contains {
            attribute: attribute.into(),
            value: value.into(),
        }
    }

    pub fn present(attribute: impl Into<String>) -> Self {
        Filter::Present {
            attribute: attribute.into(),
        }
    }

    /// `(objectClass=<class>)`, or a presence test for `*`.
    pub fn object_class(class: &str) -> Self {
        if class == "*" {
            Filter::present("objectClass")
        } else {
            Filter::equals("objectClass", class)
        }
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Filter::And(filters)
    }

    /// Evaluate against an entry. Attribute names and values compare
    /// case-insensitively, the way directory servers match names and DNs.
    pub fn matches(&self, entry: &DirectoryEntry) -> bool {
        match self {
            Filter::And(filters) => filters.iter().all(|f| f.matches(entry)),
            Filter::Equals { attribute, value } => {
                let wanted = canonical_dn(value);
                entry
                    .values(attribute)
                    .iter()
                    .any(|v| canonical_dn(v) == wanted)
            }
            Filter::Contains { attribute, value } => {
                let wanted = value.to_lowercase();
                entry
                    .values(attribute)
                    .iter()
                    .any(|v| v.to_lowercase().contains(&wanted))
            }
            Filter::Present { attribute } => !entry.values(attribute).is_empty(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::And(filters) => {
                f.write_str("(&")?;
                for filter in filters {
                    write!(f, "{}", filter)?;
                }
                f.write_str(")")
            }
            Filter::Equals { attribute, value } => {
                write!(f, "({}={})", attribute, ldap_escape(value.as_str()))
            }
            Filter::Contains { attribute, value } => {
                write!(f, "({}=*{}*)", attribute, ldap_escape(value.as_str()))
            }
            Filter::Present { attribute } => write!(f, "({}=*)", attribute),
        }
    }
}
