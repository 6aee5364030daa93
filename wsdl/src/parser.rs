use quick_xml::{
    events::{attributes::Attributes, BytesStart, BytesText, Event},
    Reader,
};
use std::{
    collections::HashMap,
    io::{BufRead, BufReader},
};
use tracing::{debug, info};
use url::Url;

use super::{
    error,
    types::{
        Attribute, Binding, BindingHeader, BindingMessage, BindingOperation, Definition, Element,
        Field, FieldKind, Message, NamespacedName, Namespaces, Occurs, Operation,
        OperationMessage, Part, PartReference, Port, PortType, Service, Struct, Type, TypeKind,
        XSD_NAMESPACE,
    },
};

fn get_attributes<B: BufRead, const N: usize>(
    reader: &Reader<B>,
    attributes: Attributes<'_>,
    names: [&'static str; N],
) -> Result<[Option<String>; N], error::Error> {
    const INIT: Option<String> = None;
    let mut result = [INIT; N];

    for attribute in attributes {
        let attribute = attribute?;
        let key = reader.decode(attribute.key)?;

        for (index, name) in names.iter().enumerate() {
            if key == *name {
                result[index] = Some(reader.decode(attribute.value.as_ref())?.to_owned());
                break;
            }
        }
    }

    Ok(result)
}

fn required<T>(
    value: Option<T>,
    element: &'static str,
    attribute: &'static str,
) -> Result<T, error::Error> {
    value.ok_or(error::Error::MissingAttribute { element, attribute })
}

fn split_namespaced_name(prefixed_name: &str) -> (Option<&str>, &str) {
    match prefixed_name.split_once(':') {
        Some((prefix, name)) => (Some(prefix), name),
        None => (None, prefixed_name),
    }
}

fn parse_occurs(min: Option<String>, max: Option<String>) -> Result<Occurs, error::Error> {
    let min = match min {
        Some(min) => min
            .parse::<u32>()
            .map_err(|_| error::Error::InvalidOccurs(min.clone()))?,
        None => 1,
    };

    let max = match max.as_deref() {
        Some("unbounded") => None,
        Some(max) => Some(
            max.parse::<u32>()
                .map_err(|_| error::Error::InvalidOccurs(max.to_owned()))?,
        ),
        None => Some(1),
    };

    Ok(Occurs { min, max })
}

#[derive(Clone, Default)]
struct CurrentNamespaces {
    target: Vec<String>,
    namespaces: HashMap<Option<String>, String>,
}

struct Parser {
    root: Url,

    definition: Definition,
    namespaces: Namespaces,
    current_namespaces: CurrentNamespaces,
}

#[derive(Debug)]
enum ParseState {
    Definitions,

    Types,
    Schema,
    Element {
        name: String,
        kind: Option<FieldKind>,
        nillable: bool,
    },
    ComplexType {
        name: Option<String>,
        kind: Option<TypeKind>,
        attributes: Vec<Attribute>,
    },
    ComplexContent {
        content: Option<Struct>,
    },
    ComplexExtension(Struct),
    SimpleContent {
        ty: Option<NamespacedName>,
    },
    SimpleExtension {
        ty: NamespacedName,
    },
    Group {
        fields: Vec<Field>,
        optional: bool,
    },
    GroupElement {
        name: String,
        kind: Option<FieldKind>,
        occurs: Occurs,
        nillable: bool,
    },
    Attribute(Attribute),
    SimpleType {
        name: Option<String>,
        ty: Option<NamespacedName>,
    },
    Restriction {
        ty: NamespacedName,
    },

    Message {
        name: String,
        parts: Vec<Part>,
    },
    Part(Part),

    PortType {
        name: String,
        operations: Vec<Operation>,
    },
    Operation {
        name: String,
        documentation: Option<String>,
        input: Option<OperationMessage>,
        output: Option<OperationMessage>,
    },
    Documentation(Option<String>),
    Input(OperationMessage),
    Output(OperationMessage),

    Binding {
        name: String,
        ty: NamespacedName,
        transport: Option<String>,
        style: Option<String>,
        operations: Vec<BindingOperation>,
    },
    BindingOperation {
        name: String,
        action: Option<String>,
        style: Option<String>,
        input: Option<BindingMessage>,
        output: Option<BindingMessage>,
    },
    BindingInput(BindingMessage),
    BindingOutput(BindingMessage),

    Service {
        name: String,
        ports: Vec<Port>,
    },
    Port {
        name: String,
        binding: NamespacedName,
        location: Option<String>,
    },

    Other(String),
}

impl ParseState {
    fn tag(&self) -> &'static str {
        match self {
            ParseState::Definitions => "definitions",
            ParseState::Types => "types",
            ParseState::Schema => "schema",
            ParseState::Element { .. } | ParseState::GroupElement { .. } => "element",
            ParseState::ComplexType { .. } => "complexType",
            ParseState::ComplexContent { .. } => "complexContent",
            ParseState::ComplexExtension(_) | ParseState::SimpleExtension { .. } => "extension",
            ParseState::SimpleContent { .. } => "simpleContent",
            ParseState::Group { .. } => "sequence",
            ParseState::Attribute(_) => "attribute",
            ParseState::SimpleType { .. } => "simpleType",
            ParseState::Restriction { .. } => "restriction",
            ParseState::Message { .. } => "message",
            ParseState::Part(_) => "part",
            ParseState::PortType { .. } => "portType",
            ParseState::Operation { .. } | ParseState::BindingOperation { .. } => "operation",
            ParseState::Documentation(_) => "documentation",
            ParseState::Input(_) | ParseState::BindingInput(_) => "input",
            ParseState::Output(_) | ParseState::BindingOutput(_) => "output",
            ParseState::Binding { .. } => "binding",
            ParseState::Service { .. } => "service",
            ParseState::Port { .. } => "port",
            ParseState::Other(_) => "other",
        }
    }
}

fn unexpected(finished: &'static str, parent: Option<&ParseState>) -> error::Error {
    error::Error::UnexpectedElement {
        element: finished,
        parent: parent.map_or("document", ParseState::tag),
    }
}

impl CurrentNamespaces {
    pub fn push_target_namespace(&mut self, namespace: String) {
        self.target.push(namespace);
    }

    pub fn pop_target_namespace(&mut self) {
        self.target.pop();
    }

    pub fn current_target(&self) -> Option<&String> {
        self.target.last()
    }

    pub fn add_namespace_prefix(&mut self, prefix: Option<String>, namespace: &str) {
        self.namespaces.insert(prefix, namespace.to_owned());
    }

    pub fn target_namespaced(
        &self,
        namespaces: &mut Namespaces,
        name: String,
    ) -> Result<NamespacedName, error::Error> {
        match self.target.last() {
            Some(target) => Ok(NamespacedName::new(namespaces, target, name)),
            None => Err(error::Error::NoTargetNamespace(name)),
        }
    }

    pub fn resolved_prefix(
        &self,
        namespaces: &mut Namespaces,
        prefix: Option<&str>,
        name: String,
    ) -> Result<NamespacedName, error::Error> {
        match self.namespaces.get(&prefix.map(ToOwned::to_owned)) {
            Some(value) => Ok(NamespacedName::new(namespaces, value, name)),
            None if matches!(prefix, None | Some("tns")) => self.target_namespaced(namespaces, name),
            None => Err(error::Error::UnknownPrefix(prefix.unwrap_or_default().to_owned())),
        }
    }
}

impl Parser {
    fn new(url: Url) -> Self {
        Self {
            root: url,

            definition: Default::default(),
            namespaces: Default::default(),
            current_namespaces: Default::default(),
        }
    }

    fn push_target_namespace(&mut self, namespace: Option<String>) {
        // Schemas without a target namespace adopt the enclosing one.
        let namespace = namespace
            .or_else(|| self.current_namespaces.current_target().cloned())
            .unwrap_or_default();

        self.current_namespaces.push_target_namespace(namespace);
    }

    fn pop_target_namespace(&mut self) {
        self.current_namespaces.pop_target_namespace();
    }

    fn add_namespace_prefix(&mut self, prefix: Option<String>, namespace: &str) {
        self.current_namespaces
            .add_namespace_prefix(prefix, namespace);
    }

    fn target_namespaced(&mut self, name: String) -> Result<NamespacedName, error::Error> {
        self.current_namespaces
            .target_namespaced(&mut self.namespaces, name)
    }

    fn resolve_namespace(&mut self, prefixed_name: &str) -> Result<NamespacedName, error::Error> {
        let (prefix, local_name) = split_namespaced_name(prefixed_name);

        self.current_namespaces
            .resolved_prefix(&mut self.namespaces, prefix, local_name.to_owned())
    }

    fn xsd_name(&mut self, name: &str) -> NamespacedName {
        NamespacedName::new(&mut self.namespaces, XSD_NAMESPACE, name.to_owned())
    }

    fn parse(mut self) -> Result<(Definition, Namespaces), error::Error> {
        self.parse_url(self.root.clone())?;
        Ok((self.definition, self.namespaces))
    }

    fn parse_str(mut self, xml: &str) -> Result<(Definition, Namespaces), error::Error> {
        self.parse_xml(self.root.clone(), Reader::from_str(xml))?;
        Ok((self.definition, self.namespaces))
    }

    fn parse_url(&mut self, url: Url) -> Result<(), error::Error> {
        info!(%url, "parsing document");

        let result = match url.scheme() {
            "file" => self.parse_xml(
                url.clone(),
                Reader::from_file(
                    url.to_file_path()
                        .map_err(|()| error::Error::PathConversionError(None))?,
                )
                .map_err(error::Error::FileOpenError)?,
            ),

            "http" | "https" => self.parse_xml(
                url.clone(),
                Reader::from_reader(BufReader::new(reqwest::blocking::get(url.clone())?)),
            ),

            other => Err(error::Error::UnsupportedScheme(other.into())),
        };

        debug!(%url, "finished parsing document");
        result
    }

    fn parse_import(&mut self, url: &Url, location: Option<String>) -> Result<(), error::Error> {
        match location {
            Some(location) => {
                self.parse_url(url.join(&location)?)?;
                debug!(%url, "back to document");
            }

            None => debug!("skipping import without a location"),
        }

        Ok(())
    }

    fn parse_xml<B: BufRead>(
        &mut self,
        url: Url,
        mut reader: Reader<B>,
    ) -> Result<(), error::Error> {
        let mut stack = Vec::new();
        let mut buffer = Vec::new();
        let mut namespace_buffer = Vec::new();

        reader.trim_text(true);

        loop {
            let (namespace, event) =
                reader.read_namespaced_event(&mut buffer, &mut namespace_buffer)?;

            match event {
                Event::Start(start) => {
                    self.handle_start(&mut stack, &reader, &start, namespace, &url)?
                }
                Event::End(..) => self.handle_end(&mut stack)?,

                Event::Empty(start) => {
                    self.handle_start(&mut stack, &reader, &start, namespace, &url)?;
                    self.handle_end(&mut stack)?;
                }

                Event::Text(text) => self.handle_text(&mut stack, &reader, text)?,

                Event::Eof => break,

                event => debug!(?event, "ignoring event"),
            }

            buffer.clear();
        }

        Ok(())
    }

    fn handle_start<B: BufRead>(
        &mut self,
        stack: &mut Vec<ParseState>,
        reader: &Reader<B>,
        start: &BytesStart<'_>,
        namespace_bytes: Option<&[u8]>,
        url: &Url,
    ) -> Result<(), error::Error> {
        let (prefix, local_name) = split_namespaced_name(reader.decode(start.name())?);

        let mut state = stack.pop();
        let mut new_state = ParseState::Other(local_name.to_owned());

        for attribute in start.attributes() {
            let attribute = attribute?;
            let key = reader.decode(attribute.key)?;
            let value = reader.decode(attribute.value.as_ref())?;

            match split_namespaced_name(key) {
                (Some("xmlns"), declared) => {
                    self.add_namespace_prefix(Some(declared.to_owned()), value)
                }
                (None, "xmlns") => self.add_namespace_prefix(None, value),
                _ => (),
            }
        }

        match &mut state {
            None | Some(ParseState::Types) if local_name == "schema" => {
                let [namespace] = get_attributes(reader, start.attributes(), ["targetNamespace"])?;
                self.push_target_namespace(namespace);

                if let Some(namespace) = namespace_bytes.and_then(|ns| std::str::from_utf8(ns).ok()) {
                    self.add_namespace_prefix(prefix.map(ToOwned::to_owned), namespace);
                }

                new_state = ParseState::Schema;
            }

            None => match local_name {
                "definitions" => {
                    let [namespace] = get_attributes(reader, start.attributes(), ["targetNamespace"])?;
                    self.push_target_namespace(namespace);

                    new_state = ParseState::Definitions
                }

                _ => debug!("found {} at document root", local_name),
            },

            Some(ParseState::Definitions) => match local_name {
                "import" => {
                    let [location] = get_attributes(reader, start.attributes(), ["location"])?;
                    self.parse_import(url, location)?;
                }

                "types" => new_state = ParseState::Types,

                "message" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::Message {
                        name: required(name, "message", "name")?,
                        parts: Vec::new(),
                    };
                }

                "portType" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::PortType {
                        name: required(name, "portType", "name")?,
                        operations: Vec::new(),
                    };
                }

                "binding" => {
                    let [name, ty] = get_attributes(reader, start.attributes(), ["name", "type"])?;
                    let ty = required(ty, "binding", "type")?;

                    new_state = ParseState::Binding {
                        name: required(name, "binding", "name")?,
                        ty: self.resolve_namespace(&ty)?,
                        transport: None,
                        style: None,
                        operations: Vec::new(),
                    };
                }

                "service" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::Service {
                        name: required(name, "service", "name")?,
                        ports: Vec::new(),
                    };
                }

                _ => debug!("found {} inside definitions block", local_name),
            },

            Some(ParseState::Types) => match local_name {
                "import" => {
                    let [location] = get_attributes(reader, start.attributes(), ["schemaLocation"])?;
                    self.parse_import(url, location)?;
                }

                _ => debug!("found {} inside types block", local_name),
            },

            Some(ParseState::Schema) => match local_name {
                "element" => {
                    let [name, ty, nillable] =
                        get_attributes(reader, start.attributes(), ["name", "type", "nillable"])?;

                    let kind = match ty {
                        Some(ty) => Some(FieldKind::Type(self.resolve_namespace(&ty)?)),
                        None => None,
                    };

                    new_state = ParseState::Element {
                        name: required(name, "element", "name")?,
                        kind,
                        nillable: nillable.as_deref() == Some("true"),
                    };
                }

                "complexType" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::ComplexType {
                        name: Some(required(name, "complexType", "name")?),
                        kind: None,
                        attributes: Vec::new(),
                    };
                }

                "simpleType" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::SimpleType {
                        name: Some(required(name, "simpleType", "name")?),
                        ty: None,
                    };
                }

                "include" | "import" => {
                    let [location] = get_attributes(reader, start.attributes(), ["schemaLocation"])?;
                    self.parse_import(url, location)?;
                }

                _ => debug!("found {} inside schema block", local_name),
            },

            Some(ParseState::Element { .. } | ParseState::GroupElement { .. }) => {
                match local_name {
                    "complexType" => {
                        new_state = ParseState::ComplexType {
                            name: None,
                            kind: None,
                            attributes: Vec::new(),
                        }
                    }

                    "simpleType" => new_state = ParseState::SimpleType { name: None, ty: None },

                    _ => debug!("found {} inside element block", local_name),
                }
            }

            Some(ParseState::ComplexType { .. }) => match local_name {
                "sequence" | "all" | "choice" => {
                    new_state = self.group_state(reader, start, local_name)?
                }

                "complexContent" => new_state = ParseState::ComplexContent { content: None },

                "simpleContent" => new_state = ParseState::SimpleContent { ty: None },

                "attribute" => new_state = self.attribute_state(reader, start)?,

                _ => debug!("found {} inside complex type block", local_name),
            },

            Some(ParseState::ComplexContent { .. }) => match local_name {
                "extension" => {
                    let [base] = get_attributes(reader, start.attributes(), ["base"])?;
                    let base = required(base, "extension", "base")?;

                    new_state = ParseState::ComplexExtension(Struct {
                        base: Some(self.resolve_namespace(&base)?),
                        ..Default::default()
                    });
                }

                // A restriction restates the content it keeps.
                "restriction" => new_state = ParseState::ComplexExtension(Struct::default()),

                _ => debug!("found {} inside complex content block", local_name),
            },

            Some(ParseState::ComplexExtension(_)) => match local_name {
                "sequence" | "all" | "choice" => {
                    new_state = self.group_state(reader, start, local_name)?
                }

                "attribute" => new_state = self.attribute_state(reader, start)?,

                _ => debug!("found {} inside complex extension block", local_name),
            },

            Some(ParseState::SimpleContent { .. }) => match local_name {
                "extension" | "restriction" => {
                    let [base] = get_attributes(reader, start.attributes(), ["base"])?;
                    let base = required(base, "extension", "base")?;

                    new_state = ParseState::SimpleExtension {
                        ty: self.resolve_namespace(&base)?,
                    };
                }

                _ => debug!("found {} inside simple content block", local_name),
            },

            Some(ParseState::SimpleType { .. }) => match local_name {
                "restriction" => {
                    let [base] = get_attributes(reader, start.attributes(), ["base"])?;
                    let base = required(base, "restriction", "base")?;

                    new_state = ParseState::Restriction {
                        ty: self.resolve_namespace(&base)?,
                    };
                }

                _ => debug!("found {} inside simple type block", local_name),
            },

            Some(ParseState::Group { .. }) => match local_name {
                "element" => {
                    let [name, ty, reference, min, max, nillable] = get_attributes(
                        reader,
                        start.attributes(),
                        ["name", "type", "ref", "minOccurs", "maxOccurs", "nillable"],
                    )?;

                    let (name, kind) = match (name, ty, reference) {
                        (_, _, Some(reference)) => {
                            let reference = self.resolve_namespace(&reference)?;
                            (reference.name.clone(), Some(FieldKind::Ref(reference)))
                        }

                        (Some(name), Some(ty), None) => {
                            (name, Some(FieldKind::Type(self.resolve_namespace(&ty)?)))
                        }

                        (Some(name), None, None) => (name, None),

                        (None, _, None) => return Err(error::Error::MissingAttribute {
                            element: "element",
                            attribute: "name",
                        }),
                    };

                    new_state = ParseState::GroupElement {
                        name,
                        kind,
                        occurs: parse_occurs(min, max)?,
                        nillable: nillable.as_deref() == Some("true"),
                    };
                }

                "sequence" | "all" | "choice" => {
                    new_state = self.group_state(reader, start, local_name)?
                }

                _ => debug!("found {} inside sequence block", local_name),
            },

            Some(ParseState::Attribute(_)) => match local_name {
                "simpleType" => new_state = ParseState::SimpleType { name: None, ty: None },

                _ => debug!("found {} inside attribute block", local_name),
            },

            Some(ParseState::Message { .. }) => match local_name {
                "part" => {
                    let [name, element, ty] =
                        get_attributes(reader, start.attributes(), ["name", "element", "type"])?;

                    let reference = match (element, ty) {
                        (Some(element), _) => PartReference::Element(self.resolve_namespace(&element)?),
                        (None, Some(ty)) => PartReference::Type(self.resolve_namespace(&ty)?),
                        (None, None) => return Err(error::Error::MissingAttribute {
                            element: "part",
                            attribute: "element",
                        }),
                    };

                    new_state = ParseState::Part(Part {
                        name: required(name, "part", "name")?,
                        reference,
                    });
                }

                _ => debug!("found {} inside message block", local_name),
            },

            Some(ParseState::PortType { .. }) => match local_name {
                "operation" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::Operation {
                        name: required(name, "operation", "name")?,
                        documentation: None,
                        input: None,
                        output: None,
                    };
                }

                _ => debug!("found {} inside port type block", local_name),
            },

            Some(ParseState::Operation { .. }) => match local_name {
                "documentation" => new_state = ParseState::Documentation(None),

                "input" | "output" => {
                    let [name, message] =
                        get_attributes(reader, start.attributes(), ["name", "message"])?;
                    let message = required(message, "input", "message")?;

                    let message = OperationMessage {
                        name,
                        message: self.resolve_namespace(&message)?,
                    };

                    if local_name == "input" {
                        new_state = ParseState::Input(message)
                    } else {
                        new_state = ParseState::Output(message)
                    }
                }

                _ => debug!("found {} inside operation block", local_name),
            },

            Some(ParseState::Binding {
                transport, style, ..
            }) => match local_name {
                "binding" => {
                    let [kind, binding_style] =
                        get_attributes(reader, start.attributes(), ["transport", "style"])?;

                    *transport = kind;
                    *style = binding_style;
                }

                "operation" => {
                    let [name] = get_attributes(reader, start.attributes(), ["name"])?;

                    new_state = ParseState::BindingOperation {
                        name: required(name, "operation", "name")?,
                        action: None,
                        style: None,
                        input: None,
                        output: None,
                    };
                }

                _ => debug!("found {} inside binding block", local_name),
            },

            Some(ParseState::BindingOperation { action, style, .. }) => match local_name {
                "operation" => {
                    let [soap_action, operation_style] =
                        get_attributes(reader, start.attributes(), ["soapAction", "style"])?;

                    *action = soap_action;
                    *style = operation_style;
                }

                "input" => new_state = ParseState::BindingInput(BindingMessage::default()),
                "output" => new_state = ParseState::BindingOutput(BindingMessage::default()),

                _ => debug!("found {} inside binding operation block", local_name),
            },

            Some(ParseState::BindingInput(binding) | ParseState::BindingOutput(binding)) => {
                match local_name {
                    "body" => {
                        let [body_use] = get_attributes(reader, start.attributes(), ["use"])?;
                        binding.body_use = body_use;
                    }

                    "header" => {
                        let [message, part] =
                            get_attributes(reader, start.attributes(), ["message", "part"])?;
                        let message = required(message, "header", "message")?;

                        binding.headers.push(BindingHeader {
                            message: self.resolve_namespace(&message)?,
                            part: required(part, "header", "part")?,
                        });
                    }

                    _ => debug!("found {} inside binding message block", local_name),
                }
            }

            Some(ParseState::Service { .. }) => match local_name {
                "port" => {
                    let [name, binding] =
                        get_attributes(reader, start.attributes(), ["name", "binding"])?;
                    let binding = required(binding, "port", "binding")?;

                    new_state = ParseState::Port {
                        name: required(name, "port", "name")?,
                        binding: self.resolve_namespace(&binding)?,
                        location: None,
                    };
                }

                _ => debug!("found {} inside service block", local_name),
            },

            Some(ParseState::Port { location, .. }) => match local_name {
                "address" => {
                    let [address] = get_attributes(reader, start.attributes(), ["location"])?;
                    *location = address;
                }

                _ => debug!("found {} inside port block", local_name),
            },

            Some(state) => debug!("found {} inside {} block", local_name, state.tag()),
        }

        stack.extend(state);
        stack.push(new_state);

        Ok(())
    }

    fn group_state<B: BufRead>(
        &mut self,
        reader: &Reader<B>,
        start: &BytesStart<'_>,
        local_name: &str,
    ) -> Result<ParseState, error::Error> {
        let [min, max] = get_attributes(reader, start.attributes(), ["minOccurs", "maxOccurs"])?;
        let occurs = parse_occurs(min, max)?;

        Ok(ParseState::Group {
            fields: Vec::new(),
            optional: local_name == "choice" || occurs.is_optional(),
        })
    }

    fn attribute_state<B: BufRead>(
        &mut self,
        reader: &Reader<B>,
        start: &BytesStart<'_>,
    ) -> Result<ParseState, error::Error> {
        let [name, reference, ty, attribute_use] =
            get_attributes(reader, start.attributes(), ["name", "ref", "type", "use"])?;

        let name = match (name, reference) {
            (Some(name), _) => name,
            (None, Some(reference)) => split_namespaced_name(&reference).1.to_owned(),
            (None, None) => return Err(error::Error::MissingAttribute {
                element: "attribute",
                attribute: "name",
            }),
        };

        let ty = match ty {
            Some(ty) => self.resolve_namespace(&ty)?,
            None => self.xsd_name("string"),
        };

        Ok(ParseState::Attribute(Attribute {
            name,
            ty,
            required: attribute_use.as_deref() == Some("required"),
        }))
    }

    fn handle_end(&mut self, stack: &mut Vec<ParseState>) -> Result<(), error::Error> {
        let finished_state = stack.pop();
        let mut next_state = stack.pop();

        let finished = finished_state.as_ref().map_or("document", ParseState::tag);

        match finished_state {
            Some(ParseState::Definitions | ParseState::Schema) => self.pop_target_namespace(),

            Some(ParseState::Element {
                name,
                kind,
                nillable,
            }) => {
                let kind = match kind {
                    Some(kind) => kind,
                    None => FieldKind::Type(self.xsd_name("anyType")),
                };

                let name = self.target_namespaced(name)?;
                self.definition.elements.push(Element {
                    name,
                    kind,
                    nillable,
                })
            }

            Some(ParseState::ComplexType {
                name,
                kind,
                attributes,
            }) => {
                let kind = match kind {
                    Some(TypeKind::Struct(mut content)) => {
                        content.attributes.extend(attributes);
                        TypeKind::Struct(content)
                    }

                    Some(kind) => kind,

                    None => TypeKind::Struct(Struct {
                        attributes,
                        ..Default::default()
                    }),
                };

                match next_state.as_mut() {
                    Some(
                        ParseState::Element {
                            kind: element_kind, ..
                        }
                        | ParseState::GroupElement {
                            kind: element_kind, ..
                        },
                    ) => *element_kind = Some(FieldKind::Inner(kind)),

                    _ => {
                        let name = self.target_namespaced(required(name, "complexType", "name")?)?;
                        self.definition.types.push(Type { name, kind })
                    }
                }
            }

            Some(ParseState::ComplexContent { content }) => match next_state.as_mut() {
                Some(ParseState::ComplexType { kind, .. }) if kind.is_none() => {
                    *kind = Some(TypeKind::Struct(content.unwrap_or_default()))
                }

                parent => return Err(unexpected(finished, parent.map(|state| &*state))),
            },

            Some(ParseState::ComplexExtension(extension)) => match next_state.as_mut() {
                Some(ParseState::ComplexContent { content }) => *content = Some(extension),

                parent => return Err(unexpected(finished, parent.map(|state| &*state))),
            },

            Some(ParseState::SimpleContent { ty }) => {
                let base = match ty {
                    Some(ty) => ty,
                    None => self.xsd_name("string"),
                };

                match next_state.as_mut() {
                    Some(ParseState::ComplexType { kind, .. }) if kind.is_none() => {
                        *kind = Some(TypeKind::Alias(base))
                    }

                    parent => return Err(unexpected(finished, parent.map(|state| &*state))),
                }
            }

            Some(ParseState::SimpleExtension { ty: base }) => match next_state.as_mut() {
                Some(ParseState::SimpleContent { ty }) => *ty = Some(base),

                parent => return Err(unexpected(finished, parent.map(|state| &*state))),
            },

            Some(ParseState::SimpleType { name, ty }) => {
                // Lists and unions fall back to their lexical form.
                let base = match ty {
                    Some(ty) => ty,
                    None => self.xsd_name("string"),
                };

                match next_state.as_mut() {
                    Some(
                        ParseState::Element { kind, .. } | ParseState::GroupElement { kind, .. },
                    ) => *kind = Some(FieldKind::Inner(TypeKind::Simple(base))),

                    Some(ParseState::Attribute(attribute)) => attribute.ty = base,

                    _ => {
                        let name = self.target_namespaced(required(name, "simpleType", "name")?)?;
                        self.definition.types.push(Type {
                            name,
                            kind: TypeKind::Simple(base),
                        })
                    }
                }
            }

            Some(ParseState::Restriction { ty: base }) => match next_state.as_mut() {
                Some(ParseState::SimpleType { ty, .. }) => *ty = Some(base),

                parent => return Err(unexpected(finished, parent.map(|state| &*state))),
            },

            Some(ParseState::Group {
                mut fields,
                optional,
            }) => {
                if optional {
                    for field in &mut fields {
                        field.occurs.min = 0;
                    }
                }

                match next_state.as_mut() {
                    Some(ParseState::ComplexType { kind, .. }) if kind.is_none() => {
                        *kind = Some(TypeKind::Struct(Struct {
                            fields,
                            ..Default::default()
                        }))
                    }

                    Some(
                        ParseState::ComplexExtension(Struct {
                            fields: parent_fields,
                            ..
                        })
                        | ParseState::Group {
                            fields: parent_fields,
                            ..
                        },
                    ) => parent_fields.extend(fields),

                    parent => return Err(unexpected(finished, parent.map(|state| &*state))),
                }
            }

            Some(ParseState::GroupElement {
                name,
                kind,
                occurs,
                nillable,
            }) => {
                let ty = match kind {
                    Some(kind) => kind,
                    None => FieldKind::Type(self.xsd_name("anyType")),
                };
                let name = self.target_namespaced(name)?;

                match next_state.as_mut() {
                    Some(ParseState::Group { fields, .. }) => fields.push(Field {
                        name,
                        ty,
                        occurs,
                        nillable,
                    }),

                    parent => return Err(unexpected(finished, parent.map(|state| &*state))),
                }
            }

            Some(ParseState::Attribute(attribute)) => match next_state.as_mut() {
                Some(ParseState::ComplexType { attributes, .. }) => attributes.push(attribute),

                Some(ParseState::ComplexExtension(extension)) => {
                    extension.attributes.push(attribute)
                }

                parent => return Err(unexpected(finished, parent.map(|state| &*state))),
            },

            Some(ParseState::Message { name, parts }) => {
                let name = self.target_namespaced(name)?;
                self.definition.messages.push(Message { name, parts })
            }

            Some(ParseState::Part(part)) => match next_state.as_mut() {
                Some(ParseState::Message { parts, .. }) => parts.push(part),

                parent => return Err(unexpected(finished, parent.map(|state| &*state))),
            },

            Some(ParseState::PortType { name, operations }) => {
                let name = self.target_namespaced(name)?;
                self.definition
                    .port_types
                    .push(PortType { name, operations })
            }

            Some(ParseState::Operation {
                name,
                documentation,
                input,
                output,
            }) => {
                let name = self.target_namespaced(name)?;

                match next_state.as_mut() {
                    Some(ParseState::PortType { operations, .. }) => operations.push(Operation {
                        name,
                        documentation,
                        input,
                        output,
                    }),

                    parent => return Err(unexpected(finished, parent.map(|state| &*state))),
                }
            }

            Some(ParseState::Documentation(text)) => match next_state.as_mut() {
                Some(ParseState::Operation { documentation, .. }) => *documentation = text,

                parent => return Err(unexpected(finished, parent.map(|state| &*state))),
            },

            Some(ParseState::Input(message)) => match next_state.as_mut() {
                Some(ParseState::Operation { input, .. }) if input.is_none() => {
                    *input = Some(message)
                }

                parent => return Err(unexpected(finished, parent.map(|state| &*state))),
            },

            Some(ParseState::Output(message)) => match next_state.as_mut() {
                Some(ParseState::Operation { output, .. }) if output.is_none() => {
                    *output = Some(message)
                }

                parent => return Err(unexpected(finished, parent.map(|state| &*state))),
            },

            Some(ParseState::Binding {
                name,
                ty,
                transport,
                style,
                operations,
            }) => {
                let name = self.target_namespaced(name)?;
                self.definition.bindings.push(Binding {
                    name,
                    ty,
                    transport,
                    style,
                    operations,
                })
            }

            Some(ParseState::BindingOperation {
                name,
                action,
                style,
                input,
                output,
            }) => {
                let name = self.target_namespaced(name)?;

                match next_state.as_mut() {
                    Some(ParseState::Binding { operations, .. }) => {
                        operations.push(BindingOperation {
                            name,
                            action,
                            style,
                            input,
                            output,
                        })
                    }

                    parent => return Err(unexpected(finished, parent.map(|state| &*state))),
                }
            }

            Some(ParseState::BindingInput(message)) => match next_state.as_mut() {
                Some(ParseState::BindingOperation { input, .. }) => *input = Some(message),

                parent => return Err(unexpected(finished, parent.map(|state| &*state))),
            },

            Some(ParseState::BindingOutput(message)) => match next_state.as_mut() {
                Some(ParseState::BindingOperation { output, .. }) => *output = Some(message),

                parent => return Err(unexpected(finished, parent.map(|state| &*state))),
            },

            Some(ParseState::Service { name, ports }) => {
                let name = self.target_namespaced(name)?;
                self.definition.services.push(Service { name, ports })
            }

            Some(ParseState::Port {
                name,
                binding,
                location,
            }) => {
                let name = self.target_namespaced(name)?;

                match next_state.as_mut() {
                    Some(ParseState::Service { ports, .. }) => ports.push(Port {
                        name,
                        binding,
                        location,
                    }),

                    parent => return Err(unexpected(finished, parent.map(|state| &*state))),
                }
            }

            Some(ParseState::Other(name)) => debug!("skipped {} element", name),

            _ => (),
        }

        stack.extend(next_state);
        Ok(())
    }

    fn handle_text<B: BufRead>(
        &mut self,
        stack: &mut [ParseState],
        reader: &Reader<B>,
        text: BytesText<'_>,
    ) -> Result<(), error::Error> {
        if let Some(ParseState::Documentation(docs)) = stack.last_mut() {
            let unescaped = text.unescaped()?;
            *docs = Some(reader.decode(unescaped.as_ref())?.trim().to_owned());
        }

        Ok(())
    }
}

pub fn parse(url: Url) -> Result<(Definition, Namespaces), error::Error> {
    Parser::new(url).parse()
}

pub fn parse_str(root: Url, xml: &str) -> Result<(Definition, Namespaces), error::Error> {
    Parser::new(root).parse_str(xml)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TNS: &str = "urn:example:quotes";

    const QUOTES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<wsdl:definitions xmlns:wsdl="http://schemas.xmlsoap.org/wsdl/"
                  xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
                  xmlns:xs="http://www.w3.org/2001/XMLSchema"
                  xmlns:tns="urn:example:quotes"
                  targetNamespace="urn:example:quotes">
  <wsdl:types>
    <xs:schema targetNamespace="urn:example:quotes" elementFormDefault="qualified">
      <xs:element name="GetQuoteRequest">
        <xs:complexType>
          <xs:sequence>
            <xs:element name="symbol" type="xs:string"/>
            <xs:element name="date" type="xs:date" minOccurs="0" nillable="true"/>
          </xs:sequence>
          <xs:attribute name="currency" type="xs:string" use="required"/>
        </xs:complexType>
      </xs:element>
      <xs:element name="AuthToken" type="xs:string"/>
      <xs:complexType name="Node">
        <xs:choice>
          <xs:element name="leaf" type="xs:int"/>
          <xs:element name="next" type="tns:Node" maxOccurs="unbounded"/>
        </xs:choice>
      </xs:complexType>
      <xs:simpleType name="Symbol">
        <xs:restriction base="xs:string">
          <xs:maxLength value="8"/>
        </xs:restriction>
      </xs:simpleType>
    </xs:schema>
  </wsdl:types>
  <wsdl:message name="GetQuoteInput">
    <wsdl:part name="parameters" element="tns:GetQuoteRequest"/>
  </wsdl:message>
  <wsdl:message name="GetQuoteOutput">
    <wsdl:part name="price" type="xs:double"/>
  </wsdl:message>
  <wsdl:message name="Auth">
    <wsdl:part name="token" element="tns:AuthToken"/>
  </wsdl:message>
  <wsdl:portType name="QuotePort">
    <wsdl:operation name="GetQuote">
      <wsdl:documentation>Returns the latest price.</wsdl:documentation>
      <wsdl:input message="tns:GetQuoteInput"/>
      <wsdl:output name="GetQuoteResult" message="tns:GetQuoteOutput"/>
    </wsdl:operation>
  </wsdl:portType>
  <wsdl:binding name="QuoteBinding" type="tns:QuotePort">
    <soap:binding style="document" transport="http://schemas.xmlsoap.org/soap/http"/>
    <wsdl:operation name="GetQuote">
      <soap:operation soapAction="urn:GetQuote"/>
      <wsdl:input>
        <soap:header message="tns:Auth" part="token" use="literal"/>
        <soap:body use="literal"/>
      </wsdl:input>
      <wsdl:output>
        <soap:body use="literal"/>
      </wsdl:output>
    </wsdl:operation>
  </wsdl:binding>
  <wsdl:service name="QuoteService">
    <wsdl:port name="QuoteSoap" binding="tns:QuoteBinding">
      <soap:address location="http://example.com/quotes"/>
    </wsdl:port>
  </wsdl:service>
</wsdl:definitions>
"#;

    fn parse_quotes() -> (Definition, Namespaces) {
        parse_str(Url::parse("file:///").unwrap(), QUOTES).unwrap()
    }

    #[test]
    fn parses_inline_element_types() {
        let (definition, namespaces) = parse_quotes();

        let element = &definition.elements[0];
        assert_eq!(element.name.name, "GetQuoteRequest");
        assert_eq!(namespaces.namespace_of(&element.name), TNS);

        let content = match &element.kind {
            FieldKind::Inner(TypeKind::Struct(content)) => content,
            other => panic!("unexpected element kind {:?}", other),
        };

        let names: Vec<_> = content.fields.iter().map(|field| field.name.name.as_str()).collect();
        assert_eq!(names, ["symbol", "date"]);
        assert!(!content.fields[0].occurs.is_optional());
        assert!(content.fields[1].occurs.is_optional());
        assert!(content.fields[1].nillable);

        assert_eq!(content.attributes.len(), 1);
        assert_eq!(content.attributes[0].name, "currency");
        assert!(content.attributes[0].required);
    }

    #[test]
    fn choice_members_are_optional() {
        let (definition, namespaces) = parse_quotes();

        let node = definition
            .types
            .iter()
            .find(|ty| ty.name.name == "Node")
            .unwrap();

        let content = match &node.kind {
            TypeKind::Struct(content) => content,
            other => panic!("unexpected type kind {:?}", other),
        };

        assert!(content.fields.iter().all(|field| field.occurs.is_optional()));
        assert_eq!(content.fields[1].occurs.max, None);

        match &content.fields[1].ty {
            FieldKind::Type(ty) => {
                assert_eq!(ty.name, "Node");
                assert_eq!(namespaces.namespace_of(ty), TNS);
            }
            other => panic!("unexpected field kind {:?}", other),
        }
    }

    #[test]
    fn simple_types_keep_their_base() {
        let (definition, namespaces) = parse_quotes();

        let symbol = definition
            .types
            .iter()
            .find(|ty| ty.name.name == "Symbol")
            .unwrap();

        match &symbol.kind {
            TypeKind::Simple(base) => {
                assert_eq!(base.name, "string");
                assert!(namespaces.is_xsd(base));
            }
            other => panic!("unexpected type kind {:?}", other),
        }
    }

    #[test]
    fn parses_messages_and_port_types() {
        let (definition, namespaces) = parse_quotes();

        assert_eq!(definition.messages.len(), 3);
        let output = &definition.messages[1];
        assert_eq!(output.parts[0].name, "price");
        match &output.parts[0].reference {
            PartReference::Type(ty) => assert!(namespaces.is_xsd(ty)),
            other => panic!("unexpected part reference {:?}", other),
        }

        let operation = &definition.port_types[0].operations[0];
        assert_eq!(operation.name.name, "GetQuote");
        assert_eq!(
            operation.documentation.as_deref(),
            Some("Returns the latest price.")
        );
        assert_eq!(operation.input.as_ref().unwrap().name, None);
        assert_eq!(
            operation.output.as_ref().unwrap().name.as_deref(),
            Some("GetQuoteResult")
        );
    }

    #[test]
    fn parses_binding_headers() {
        let (definition, _) = parse_quotes();

        let binding = &definition.bindings[0];
        assert_eq!(binding.style.as_deref(), Some("document"));
        assert_eq!(
            binding.transport.as_deref(),
            Some("http://schemas.xmlsoap.org/soap/http")
        );

        let operation = &binding.operations[0];
        assert_eq!(operation.action.as_deref(), Some("urn:GetQuote"));

        let input = operation.input.as_ref().unwrap();
        assert_eq!(input.body_use.as_deref(), Some("literal"));
        assert_eq!(input.headers.len(), 1);
        assert_eq!(input.headers[0].message.name, "Auth");
        assert_eq!(input.headers[0].part, "token");

        assert!(operation.output.as_ref().unwrap().headers.is_empty());
    }

    #[test]
    fn parses_services() {
        let (definition, _) = parse_quotes();

        let port = &definition.services[0].ports[0];
        assert_eq!(port.name.name, "QuoteSoap");
        assert_eq!(port.binding.name, "QuoteBinding");
        assert_eq!(port.location.as_deref(), Some("http://example.com/quotes"));
    }

    #[test]
    fn missing_message_name_is_an_error() {
        let xml = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" targetNamespace="urn:x">
            <message><part name="a" type="string"/></message>
        </definitions>"#;

        let result = parse_str(Url::parse("file:///").unwrap(), xml);
        assert!(matches!(
            result,
            Err(error::Error::MissingAttribute {
                element: "message",
                attribute: "name"
            })
        ));
    }

    #[test]
    fn undeclared_prefix_is_an_error() {
        let xml = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/" targetNamespace="urn:x">
            <message name="m"><part name="a" element="nope:Thing"/></message>
        </definitions>"#;

        let result = parse_str(Url::parse("file:///").unwrap(), xml);
        assert!(matches!(result, Err(error::Error::UnknownPrefix(prefix)) if prefix == "nope"));
    }
    #[test]
    fn unknown_elements_are_skipped() {
        let xml = r#"<definitions xmlns="http://schemas.xmlsoap.org/wsdl/"
                     xmlns:wsp="http://www.w3.org/ns/ws-policy"
                     xmlns:xs="http://www.w3.org/2001/XMLSchema"
                     targetNamespace="urn:x">
            <wsp:Policy><wsp:ExactlyOne><wsp:All/></wsp:ExactlyOne></wsp:Policy>
            <message name="m"><part name="a" type="xs:string"/></message>
        </definitions>"#;

        let (definition, _) = parse_str(Url::parse("file:///").unwrap(), xml).unwrap();
        assert_eq!(definition.messages.len(), 1);
        assert_eq!(definition.messages[0].parts.len(), 1);
    }
}
