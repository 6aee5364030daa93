use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unable to parse provided URL")]
    UrlParseError(#[from] url::ParseError),

    #[error("Unable to convert provided path")]
    PathConversionError(Option<std::io::Error>),

    #[error("Unable to open file")]
    FileOpenError(quick_xml::Error),

    #[error("Unable to get file from server")]
    ReqwestError(#[from] reqwest::Error),

    #[error("Unsupported URL scheme {0}")]
    UnsupportedScheme(String),

    #[error("Error parsing XML input")]
    XmlParseError(#[from] quick_xml::Error),

    #[error("Element <{element}> is missing the required attribute {attribute:?}")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },

    #[error("Namespace prefix {0:?} is not declared")]
    UnknownPrefix(String),

    #[error("No target namespace is in scope for {0:?}")]
    NoTargetNamespace(String),

    #[error("Invalid occurrence bound {0:?}")]
    InvalidOccurs(String),

    #[error("Unexpected <{element}> inside <{parent}>")]
    UnexpectedElement {
        element: &'static str,
        parent: &'static str,
    },
}
