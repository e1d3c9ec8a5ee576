use std::fmt;
use std::io;

use hamill::document::VariableError;

#[derive(Debug)]
pub enum RenderError {
    UnknownVariable(String),
    /// A predefined variable that was never given a value.
    UnsetVariable(String),
    UnknownLabel(String),
    UnknownId(String),
    Variable(VariableError),
    Include { path: String, source: io::Error },
    Format(fmt::Error),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::UnknownVariable(name) => write!(f, "unknown variable: {}", name),
            RenderError::UnsetVariable(name) => write!(f, "variable {} has no value", name),
            RenderError::UnknownLabel(label) => write!(f, "label not found: {}", label),
            RenderError::UnknownId(id) => write!(f, "no element has the id: {}", id),
            RenderError::Variable(err) => write!(f, "{}", err),
            RenderError::Include { path, source } => {
                write!(f, "cannot include '{}': {}", path, source)
            }
            RenderError::Format(err) => write!(f, "formatting error: {}", err),
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::Include { source, .. } => Some(source),
            RenderError::Variable(err) => Some(err),
            _ => None,
        }
    }
}

impl From<VariableError> for RenderError {
    fn from(err: VariableError) -> Self {
        RenderError::Variable(err)
    }
}

impl From<fmt::Error> for RenderError {
    fn from(err: fmt::Error) -> Self {
        RenderError::Format(err)
    }
}
