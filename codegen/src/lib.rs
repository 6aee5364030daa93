use soapgen_wsdl::{
    self as wsdl,
    types::{Definition, Namespaces},
};
use tracing::info;

mod preprocessor;

pub mod assembler;
pub mod error;
pub mod field;
pub mod resolver;
pub mod types;

pub use assembler::{assemble, assemble_with_report, Assembly, OperationEnvelopes};
pub use error::Error;
pub use preprocessor::preprocess;
pub use resolver::{ResolveFields, SchemaResolver};

/// The envelopes generated for one operation of one port.
#[derive(Debug, Clone)]
pub struct GeneratedOperation {
    pub service: String,
    pub port: String,
    pub operation: types::WsdlOperation,
    pub envelopes: OperationEnvelopes,
}

pub fn from_url<S: AsRef<str>>(url: S, strict: bool) -> Result<Vec<GeneratedOperation>, Error> {
    let (definition, namespaces) = wsdl::parse(url)?;
    from_definition(&definition, &namespaces, strict)
}

/// Assembles every operation of every SOAP port. With `strict` set, a part
/// that cannot be placed in its envelope is an error instead of being left out.
pub fn from_definition(
    definition: &Definition,
    namespaces: &Namespaces,
    strict: bool,
) -> Result<Vec<GeneratedOperation>, Error> {
    let operations = preprocessor::preprocess(definition)?;
    let resolver = SchemaResolver::new(definition, namespaces);

    let mut generated = Vec::new();

    for service in &operations.services {
        for port in &service.ports {
            for operation in &port.operations {
                let assembly = assemble_with_report(&resolver, operation);

                if strict && !assembly.unmapped.is_empty() {
                    return Err(Error::UnmappedParts {
                        operation: operation.name.clone(),
                        parts: assembly.unmapped,
                    });
                }

                generated.push(GeneratedOperation {
                    service: service.name.name.clone(),
                    port: port.name.name.clone(),
                    operation: operation.clone(),
                    envelopes: assembly.envelopes,
                });
            }
        }
    }

    info!(operations = generated.len(), "assembled envelopes");
    Ok(generated)
}
