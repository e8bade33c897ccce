//! Load error taxonomy
//!
//! Every fatal condition aborts the whole load; there is no partial success.
//! Errors raised while a record is in scope carry the source file name and
//! line recovered from the record's provenance.

use std::path::PathBuf;

use crate::records::ObjectKind;

/// Error returned by the external object-model builder. Any builder failure
/// aborts registration.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct BuildError(pub String);

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Malformed input: bad `define`, unknown kind, nested definition,
    /// stray `}`, unknown directive, or EOF inside a definition.
    #[error("{file}:{line}: {reason}")]
    Parse {
        file: String,
        line: u32,
        reason: String,
    },

    #[error("cannot read '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Two concrete records of one kind share an identifying name.
    #[error("duplicate {kind} definition '{key}' ({file}:{line})")]
    DuplicateDefinition {
        kind: ObjectKind,
        key: String,
        file: String,
        line: u32,
    },

    #[error("template '{name}' referenced by {kind} definition ({file}:{line}) not found")]
    UnresolvedTemplate {
        kind: ObjectKind,
        name: String,
        file: String,
        line: u32,
    },

    #[error("circular template inheritance in {kind} definition ({file}:{line})")]
    TemplateCycle {
        kind: ObjectKind,
        file: String,
        line: u32,
    },

    /// A member token matched nothing, or a referenced group/entity does not
    /// exist.
    #[error("could not expand member '{pattern}' in {context}")]
    UnresolvedMember { pattern: String, context: String },

    #[error("invalid regular expression '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("object model rejected {entity}: {source}")]
    Builder {
        entity: String,
        #[source]
        source: BuildError,
    },
}
