use soapgen_wsdl::types::{NamespacedName, PartReference};

/// A message part as seen by the assembler. `element_name` is the key used to
/// find the part's generated field again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsdlPart {
    pub name: String,
    pub element_name: String,
    pub reference: PartReference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsdlMessage {
    pub name: String,
    pub parts: Vec<WsdlPart>,
}

/// A `soap:header` entry. Headers reuse a part of some message rather than
/// declaring a type of their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsdlHeader {
    pub part: WsdlPart,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDirection {
    pub name: String,
    pub headers: Vec<WsdlHeader>,
    pub message: WsdlMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WsdlOperation {
    pub name: String,
    pub action: Option<String>,
    pub documentation: Option<String>,
    pub input: OperationDirection,
    pub output: OperationDirection,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub name: NamespacedName,
    pub ports: Vec<Port>,
}

#[derive(Debug, Clone)]
pub struct Port {
    pub name: NamespacedName,
    pub location: Option<String>,
    pub operations: Vec<WsdlOperation>,
}

#[derive(Default, Debug, Clone)]
pub struct Definition {
    pub services: Vec<Service>,
}

impl OperationDirection {
    /// Header parts in declaration order, then body parts in declaration order.
    pub fn parts(&self) -> impl Iterator<Item = &WsdlPart> {
        self.headers
            .iter()
            .map(|header| &header.part)
            .chain(self.message.parts.iter())
    }
}
