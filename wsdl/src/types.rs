pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

#[derive(Default, Debug, Clone)]
pub struct Namespaces(Vec<String>);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespacedName {
    namespace_idx: usize,
    pub name: String,
}

/// `minOccurs`/`maxOccurs` of a schema particle. `max: None` is `unbounded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurs {
    pub min: u32,
    pub max: Option<u32>,
}

#[derive(Debug, Clone)]
pub enum TypeKind {
    Simple(NamespacedName),
    Struct(Struct),
    Alias(NamespacedName),
}

#[derive(Default, Debug, Clone)]
pub struct Struct {
    pub base: Option<NamespacedName>,
    pub fields: Vec<Field>,
    pub attributes: Vec<Attribute>,
}

#[derive(Debug, Clone)]
pub struct Type {
    pub name: NamespacedName,
    pub kind: TypeKind,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub name: NamespacedName,
    pub kind: FieldKind,
    pub nillable: bool,
}

#[derive(Debug, Clone)]
pub enum FieldKind {
    Type(NamespacedName),
    Inner(TypeKind),
    Ref(NamespacedName),
}

#[derive(Debug, Clone)]
pub struct Field {
    pub name: NamespacedName,
    pub ty: FieldKind,
    pub occurs: Occurs,
    pub nillable: bool,
}

#[derive(Debug, Clone)]
pub struct Attribute {
    pub name: String,
    pub ty: NamespacedName,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartReference {
    Element(NamespacedName),
    Type(NamespacedName),
}

#[derive(Debug, Clone)]
pub struct Part {
    pub name: String,
    pub reference: PartReference,
}

#[derive(Debug, Clone)]
pub struct Message {
    pub name: NamespacedName,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone)]
pub struct OperationMessage {
    pub name: Option<String>,
    pub message: NamespacedName,
}

#[derive(Debug, Clone)]
pub struct Operation {
    pub name: NamespacedName,
    pub documentation: Option<String>,
    pub input: Option<OperationMessage>,
    pub output: Option<OperationMessage>,
}

#[derive(Debug, Clone)]
pub struct PortType {
    pub name: NamespacedName,
    pub operations: Vec<Operation>,
}

#[derive(Debug, Clone)]
pub struct BindingHeader {
    pub message: NamespacedName,
    pub part: String,
}

#[derive(Default, Debug, Clone)]
pub struct BindingMessage {
    pub body_use: Option<String>,
    pub headers: Vec<BindingHeader>,
}

#[derive(Debug, Clone)]
pub struct BindingOperation {
    pub name: NamespacedName,
    pub action: Option<String>,
    pub style: Option<String>,
    pub input: Option<BindingMessage>,
    pub output: Option<BindingMessage>,
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub name: NamespacedName,
    pub ty: NamespacedName,
    pub transport: Option<String>,
    pub style: Option<String>,
    pub operations: Vec<BindingOperation>,
}

#[derive(Debug, Clone)]
pub struct Port {
    pub name: NamespacedName,
    pub binding: NamespacedName,
    pub location: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Service {
    pub name: NamespacedName,
    pub ports: Vec<Port>,
}

#[derive(Default, Debug, Clone)]
pub struct Definition {
    pub elements: Vec<Element>,
    pub types: Vec<Type>,
    pub messages: Vec<Message>,
    pub port_types: Vec<PortType>,
    pub bindings: Vec<Binding>,
    pub services: Vec<Service>,
}

impl Namespaces {
    pub fn namespaces(&self) -> &[String] {
        &self.0
    }

    pub fn add_or_get(&mut self, namespace: &str) -> usize {
        if let Some(index) = self.index_of(namespace) {
            index
        } else {
            let index = self.0.len();
            self.0.push(namespace.to_owned());
            index
        }
    }

    pub fn namespace_of(&self, name: &NamespacedName) -> &str {
        &self.0[name.namespace_idx]
    }

    pub fn is_xsd(&self, name: &NamespacedName) -> bool {
        self.namespace_of(name) == XSD_NAMESPACE
    }

    fn index_of(&self, namespace: &str) -> Option<usize> {
        self.0.iter().position(|value| value == namespace)
    }
}

impl NamespacedName {
    pub fn new(namespaces: &mut Namespaces, namespace: &str, name: String) -> Self {
        Self {
            namespace_idx: namespaces.add_or_get(namespace),
            name,
        }
    }

    pub fn index(&self) -> usize {
        self.namespace_idx
    }
}

impl Occurs {
    pub const ONCE: Occurs = Occurs {
        min: 1,
        max: Some(1),
    };

    pub fn is_optional(&self) -> bool {
        self.min == 0
    }
}

impl Default for Occurs {
    fn default() -> Self {
        Self::ONCE
    }
}

impl Definition {
    pub fn element(&self, name: &NamespacedName) -> Option<&Element> {
        self.elements.iter().find(|element| element.name == *name)
    }

    pub fn ty(&self, name: &NamespacedName) -> Option<&Type> {
        self.types.iter().find(|ty| ty.name == *name)
    }

    pub fn message(&self, name: &NamespacedName) -> Option<&Message> {
        self.messages.iter().find(|message| message.name == *name)
    }

    pub fn port_type(&self, name: &NamespacedName) -> Option<&PortType> {
        self.port_types
            .iter()
            .find(|port_type| port_type.name == *name)
    }

    pub fn binding(&self, name: &NamespacedName) -> Option<&Binding> {
        self.bindings.iter().find(|binding| binding.name == *name)
    }
}

impl Message {
    pub fn part(&self, name: &str) -> Option<&Part> {
        self.parts.iter().find(|part| part.name == name)
    }
}
