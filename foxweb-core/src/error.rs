// Error types for the Foxweb dispatch engine

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Route not found: {0}")]
    RouteNotFound(String),

    #[error("Invalid route template: {0}")]
    RouteTemplate(String),

    #[error("Template not found: {0}")]
    TemplateNotFound(String),

    #[error("Template syntax error: {0}")]
    TemplateSyntax(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("Body read error: {0}")]
    BodyRead(String),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Discriminant of [`Error`], used as the key of the error-handler table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Http,
    RouteNotFound,
    RouteTemplate,
    TemplateNotFound,
    TemplateSyntax,
    Serialization,
    Deserialization,
    BodyRead,
    Internal,
    Io,
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::RouteNotFound(_) => 404,
            Error::TemplateNotFound(_) => 404,
            Error::Deserialization(_) => 400,
            _ => 500,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Http(_) => ErrorKind::Http,
            Error::RouteNotFound(_) => ErrorKind::RouteNotFound,
            Error::RouteTemplate(_) => ErrorKind::RouteTemplate,
            Error::TemplateNotFound(_) => ErrorKind::TemplateNotFound,
            Error::TemplateSyntax(_) => ErrorKind::TemplateSyntax,
            Error::Serialization(_) => ErrorKind::Serialization,
            Error::Deserialization(_) => ErrorKind::Deserialization,
            Error::BodyRead(_) => ErrorKind::BodyRead,
            Error::Internal(_) => ErrorKind::Internal,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Check if this is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Check if this is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

impl From<crate::templates::TemplateError> for Error {
    fn from(err: crate::templates::TemplateError) -> Self {
        match err {
            crate::templates::TemplateError::NotFound(name) => Error::TemplateNotFound(name),
            crate::templates::TemplateError::Syntax(msg) => Error::TemplateSyntax(msg),
        }
    }
}
