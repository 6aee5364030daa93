use super::{error::Error, types};
use soapgen_wsdl::types::{self as wsdl, PartReference};
use tracing::debug;

pub fn preprocess(definition: &wsdl::Definition) -> Result<types::Definition, Error> {
    let mut services = Vec::new();

    for service in &definition.services {
        let mut ports = Vec::new();

        for port in &service.ports {
            let binding =
                definition
                    .binding(&port.binding)
                    .ok_or_else(|| Error::MissingBinding {
                        port: port.name.name.clone(),
                        binding: port.binding.name.clone(),
                    })?;

            if binding.transport.is_none() {
                debug!(port = %port.name.name, "skipping port without a SOAP binding");
                continue;
            }

            let port_type =
                definition
                    .port_type(&binding.ty)
                    .ok_or_else(|| Error::MissingPortType {
                        binding: binding.name.name.clone(),
                        port_type: binding.ty.name.clone(),
                    })?;

            let operations = port_type
                .operations
                .iter()
                .map(|operation| preprocess_operation(definition, binding, operation))
                .collect::<Result<Vec<_>, _>>()?;

            ports.push(types::Port {
                name: port.name.clone(),
                location: port.location.clone(),
                operations,
            });
        }

        services.push(types::Service {
            name: service.name.clone(),
            ports,
        });
    }

    Ok(types::Definition { services })
}

fn preprocess_operation(
    definition: &wsdl::Definition,
    binding: &wsdl::Binding,
    operation: &wsdl::Operation,
) -> Result<types::WsdlOperation, Error> {
    let name = &operation.name.name;

    let binding_operation = binding
        .operations
        .iter()
        .find(|binding_operation| binding_operation.name.name == *name);

    let input = operation
        .input
        .as_ref()
        .ok_or_else(|| Error::MissingDirection {
            operation: name.clone(),
            direction: "input",
        })?;

    let output = operation
        .output
        .as_ref()
        .ok_or_else(|| Error::MissingDirection {
            operation: name.clone(),
            direction: "output",
        })?;

    Ok(types::WsdlOperation {
        name: name.clone(),
        action: binding_operation.and_then(|binding_operation| binding_operation.action.clone()),
        documentation: operation.documentation.clone(),
        input: preprocess_direction(
            definition,
            input,
            binding_operation.and_then(|binding_operation| binding_operation.input.as_ref()),
            format!("{}Request", name),
        )?,
        output: preprocess_direction(
            definition,
            output,
            binding_operation.and_then(|binding_operation| binding_operation.output.as_ref()),
            format!("{}Response", name),
        )?,
    })
}

fn preprocess_direction(
    definition: &wsdl::Definition,
    message: &wsdl::OperationMessage,
    binding: Option<&wsdl::BindingMessage>,
    default_name: String,
) -> Result<types::OperationDirection, Error> {
    let body = find_message(definition, &message.message)?;
    let bound_headers = binding.map_or(&[][..], |binding| binding.headers.as_slice());

    let headers = bound_headers
        .iter()
        .map(|header| {
            let message = find_message(definition, &header.message)?;
            let part = message
                .part(&header.part)
                .ok_or_else(|| Error::MissingPart {
                    message: message.name.name.clone(),
                    part: header.part.clone(),
                })?;

            Ok(types::WsdlHeader {
                part: preprocess_part(part),
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;

    // Parts bound as headers are not repeated in the body.
    let parts = body
        .parts
        .iter()
        .filter(|part| {
            !bound_headers
                .iter()
                .any(|header| header.message == body.name && header.part == part.name)
        })
        .map(preprocess_part)
        .collect();

    Ok(types::OperationDirection {
        name: message.name.clone().unwrap_or(default_name),
        headers,
        message: types::WsdlMessage {
            name: body.name.name.clone(),
            parts,
        },
    })
}

fn preprocess_part(part: &wsdl::Part) -> types::WsdlPart {
    let element_name = match &part.reference {
        PartReference::Element(element) => element.name.clone(),
        PartReference::Type(_) => part.name.clone(),
    };

    types::WsdlPart {
        name: part.name.clone(),
        element_name,
        reference: part.reference.clone(),
    }
}

fn find_message<'a>(
    definition: &'a wsdl::Definition,
    name: &wsdl::NamespacedName,
) -> Result<&'a wsdl::Message, Error> {
    definition
        .message(name)
        .ok_or_else(|| Error::MissingMessage(name.name.clone()))
}
