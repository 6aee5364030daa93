use thiserror::Error;

use super::assembler::UnmappedPart;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Error parsing WSDL")]
    ParseError(#[from] soapgen_wsdl::error::Error),

    #[error("Port {port} refers to unknown binding {binding}")]
    MissingBinding { port: String, binding: String },

    #[error("Binding {binding} refers to unknown port type {port_type}")]
    MissingPortType { binding: String, port_type: String },

    #[error("Operation {operation} has no {direction} message")]
    MissingDirection {
        operation: String,
        direction: &'static str,
    },

    #[error("Unknown message {0}")]
    MissingMessage(String),

    #[error("Message {message} has no part named {part}")]
    MissingPart { message: String, part: String },

    #[error("Operation {operation} left {} part(s) unmapped", .parts.len())]
    UnmappedParts {
        operation: String,
        parts: Vec<UnmappedPart>,
    },
}
