//! Error types for hdiff-core.

use thiserror::Error;

/// Result type alias for hdiff-core operations.
pub type Result<T> = std::result::Result<T, HdiffError>;

/// Errors that make a comparison meaningless.
///
/// Structural differences are never errors; they are reported as
/// [`crate::differ::ChangeEntry`] values.
#[derive(Error, Debug)]
pub enum HdiffError {
    /// The entry header does not exist under the tree root.
    #[error("Header not found: {path}")]
    HeaderNotFound {
        /// Path that was searched for the header.
        path: String,
    },

    /// A header could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        /// File being read.
        path: String,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The C grammar could not be loaded into the parser.
    #[error("Failed to set C language: {message}")]
    Language {
        /// Description of the grammar error.
        message: String,
    },

    /// tree-sitter gave up on a header.
    #[error("Failed to parse {path}: {message}")]
    Parse {
        /// Header being parsed.
        path: String,
        /// Description of the parse failure.
        message: String,
    },
}

impl From<tree_sitter::LanguageError> for HdiffError {
    fn from(err: tree_sitter::LanguageError) -> Self {
        HdiffError::Language {
            message: err.to_string(),
        }
    }
}
