//! Rebuilds the SOAP `Envelope/Header/Body` trees of an operation out of the
//! fields generated for its parts.

use super::{
    field::{ComplexField, Field},
    resolver::ResolveFields,
    types::{OperationDirection, WsdlOperation},
};
use std::fmt;
use tracing::{debug, warn};

const ENVELOPE: &str = "Envelope";
const HEADER: &str = "Header";
const BODY: &str = "Body";

/// Request and response envelope of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationEnvelopes {
    pub input: ComplexField,
    pub output: ComplexField,
}

/// The envelopes together with every part that had to be left out of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub envelopes: OperationEnvelopes,
    pub unmapped: Vec<UnmappedPart>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Header,
    Body,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmappedReason {
    /// No generated field carries the part's element name.
    Unresolved,
    /// The body part resolved to a scalar, which the body does not carry.
    Scalar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnmappedPart {
    pub direction: String,
    pub element: String,
    pub position: Position,
    pub reason: UnmappedReason,
}

pub fn assemble<R: ResolveFields + ?Sized>(
    resolver: &R,
    operation: &WsdlOperation,
) -> OperationEnvelopes {
    assemble_with_report(resolver, operation).envelopes
}

pub fn assemble_with_report<R: ResolveFields + ?Sized>(
    resolver: &R,
    operation: &WsdlOperation,
) -> Assembly {
    debug!(operation = %operation.name, "assembling envelopes");

    let mut unmapped = Vec::new();
    let input = assemble_direction(resolver, &operation.input, &mut unmapped);
    let output = assemble_direction(resolver, &operation.output, &mut unmapped);

    for part in &unmapped {
        warn!(
            operation = %operation.name,
            direction = %part.direction,
            element = %part.element,
            "part left out of the {}: {}",
            part.position,
            part.reason
        );
    }

    Assembly {
        envelopes: OperationEnvelopes { input, output },
        unmapped,
    }
}

fn assemble_direction<R: ResolveFields + ?Sized>(
    resolver: &R,
    direction: &OperationDirection,
    unmapped: &mut Vec<UnmappedPart>,
) -> ComplexField {
    let mut pool: Vec<Field> = direction
        .parts()
        .flat_map(|part| resolver.resolve(part))
        .collect();

    let mut envelope = ComplexField::new(ENVELOPE, format!("{}{}", direction.name, ENVELOPE))
        .with_attribute_name(ENVELOPE);
    let mut header = ComplexField::new(HEADER, format!("{}{}", direction.name, HEADER));
    let mut body = ComplexField::new(BODY, format!("{}{}", direction.name, BODY));

    let mut omit = |element: &str, position, reason| {
        unmapped.push(UnmappedPart {
            direction: direction.name.clone(),
            element: element.to_owned(),
            position,
            reason,
        })
    };

    for part in direction.headers.iter().map(|entry| &entry.part) {
        match find_field_mut(&mut pool, &part.element_name) {
            Some(Field::Complex(field)) => {
                field.mark_cyclic();
                header.push_field(field.clone());
            }

            Some(Field::Basic(field)) => header.push_field(field.clone()),

            None => omit(&part.element_name, Position::Header, UnmappedReason::Unresolved),
        }
    }

    for part in &direction.message.parts {
        match find_field(&pool, &part.element_name) {
            Some(Field::Complex(field)) => {
                body.push_field(
                    ComplexField::cyclic(part.element_name.as_str(), part.element_name.as_str())
                        .with_required(has_optional_member(field)),
                );
            }

            Some(Field::Basic(_)) => omit(&part.element_name, Position::Body, UnmappedReason::Scalar),

            None => omit(&part.element_name, Position::Body, UnmappedReason::Unresolved),
        }
    }

    envelope.push_field(header);
    envelope.push_field(body);
    envelope
}

/// First field of the pool named `name`. Later duplicates are never reached.
fn find_field<'a>(pool: &'a [Field], name: &str) -> Option<&'a Field> {
    pool.iter().find(|field| field.name() == name)
}

/// Headers strip the pool entry itself, so a body part naming the same element
/// sees the stripped field.
fn find_field_mut<'a>(pool: &'a mut [Field], name: &str) -> Option<&'a mut Field> {
    pool.iter_mut().find(|field| field.name() == name)
}

/// Only direct members are inspected; members pulled in from an extended type
/// are not looked at separately.
fn has_optional_member(field: &ComplexField) -> bool {
    field
        .fields()
        .iter()
        .any(|member| !member.is_required() && !member.is_nullable())
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Header => write!(f, "header"),
            Position::Body => write!(f, "body"),
        }
    }
}

impl fmt::Display for UnmappedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmappedReason::Unresolved => write!(f, "no generated field matches it"),
            UnmappedReason::Scalar => write!(f, "it resolved to a scalar"),
        }
    }
}

impl fmt::Display for UnmappedPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} part {}: {}",
            self.direction, self.position, self.element, self.reason
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        field::BasicField,
        types::{WsdlHeader, WsdlMessage, WsdlPart},
    };
    use soapgen_wsdl::types::{NamespacedName, Namespaces, PartReference};

    fn part(element_name: &str) -> WsdlPart {
        let mut namespaces = Namespaces::default();

        WsdlPart {
            name: element_name.to_lowercase(),
            element_name: element_name.to_owned(),
            reference: PartReference::Element(NamespacedName::new(
                &mut namespaces,
                "urn:test",
                element_name.to_owned(),
            )),
        }
    }

    fn direction(name: &str, headers: &[&str], body: &[&str]) -> OperationDirection {
        OperationDirection {
            name: name.to_owned(),
            headers: headers
                .iter()
                .map(|header| WsdlHeader {
                    part: part(header),
                })
                .collect(),
            message: WsdlMessage {
                name: format!("{}Message", name),
                parts: body.iter().map(|body| part(body)).collect(),
            },
        }
    }

    fn operation(name: &str, input: OperationDirection, output: OperationDirection) -> WsdlOperation {
        WsdlOperation {
            name: name.to_owned(),
            action: None,
            documentation: None,
            input,
            output,
        }
    }

    /// Resolves a part to every known field carrying its element name.
    fn resolver(known: Vec<Field>) -> impl Fn(&WsdlPart) -> Vec<Field> {
        move |part| {
            known
                .iter()
                .filter(|field| field.name() == part.element_name)
                .cloned()
                .collect()
        }
    }

    fn children(field: &ComplexField) -> Vec<&str> {
        field.fields().iter().map(Field::name).collect()
    }

    fn section<'a>(envelope: &'a ComplexField, name: &str) -> &'a ComplexField {
        envelope.field(name).and_then(Field::as_complex).unwrap()
    }

    fn quote_request() -> Field {
        ComplexField::new("GetQuoteRequest", "GetQuoteRequest")
            .with_field(BasicField::new("symbol", "string"))
            .with_field(BasicField::new("market", "string"))
            .into()
    }

    #[test]
    fn envelope_has_header_then_body_when_empty() {
        let operation = operation(
            "Empty",
            direction("EmptyRequest", &[], &[]),
            direction("EmptyResponse", &[], &[]),
        );

        let envelopes = assemble(&resolver(Vec::new()), &operation);

        for (envelope, name) in [
            (&envelopes.input, "EmptyRequest"),
            (&envelopes.output, "EmptyResponse"),
        ] {
            assert_eq!(envelope.name, "Envelope");
            assert_eq!(envelope.type_name, format!("{}Envelope", name));
            assert_eq!(envelope.attribute_name.as_deref(), Some("Envelope"));
            assert_eq!(children(envelope), ["Header", "Body"]);
            assert_eq!(section(envelope, "Header").type_name, format!("{}Header", name));
            assert_eq!(section(envelope, "Body").type_name, format!("{}Body", name));
            assert!(section(envelope, "Header").fields().is_empty());
            assert!(section(envelope, "Body").fields().is_empty());
        }
    }

    #[test]
    fn complex_body_part_becomes_a_reference() {
        let operation = operation(
            "GetQuote",
            direction("GetQuoteRequest", &[], &["GetQuoteRequest"]),
            direction("GetQuoteResponse", &[], &[]),
        );

        let envelopes = assemble(&resolver(vec![quote_request()]), &operation);

        let body = section(&envelopes.input, "Body");
        assert_eq!(children(body), ["GetQuoteRequest"]);

        let request = body.fields()[0].as_complex().unwrap();
        assert_eq!(request.type_name, "GetQuoteRequest");
        assert!(request.is_cyclic());
        assert!(request.fields().is_empty());
        // Every member is required, so nothing marks the wrapper as required.
        assert!(!request.required);
    }

    #[test]
    fn optional_non_nullable_member_makes_the_body_part_required() {
        let request = ComplexField::new("Search", "Search")
            .with_field(BasicField::new("query", "string"))
            .with_field(BasicField::new("limit", "int").with_required(false));

        let operation = operation(
            "Search",
            direction("SearchRequest", &[], &["Search"]),
            direction("SearchResponse", &[], &[]),
        );

        let envelopes = assemble(&resolver(vec![request.into()]), &operation);
        assert!(section(&envelopes.input, "Body").fields()[0].is_required());
    }

    #[test]
    fn optional_nullable_member_does_not_count() {
        let request = ComplexField::new("Search", "Search").with_field(
            BasicField::new("limit", "int")
                .with_required(false)
                .with_nullable(true),
        );

        let operation = operation(
            "Search",
            direction("SearchRequest", &[], &["Search"]),
            direction("SearchResponse", &[], &[]),
        );

        let envelopes = assemble(&resolver(vec![request.into()]), &operation);
        assert!(!section(&envelopes.input, "Body").fields()[0].is_required());
    }

    #[test]
    fn complex_header_is_stripped_to_a_reference() {
        let credentials = ComplexField::new("Credentials", "CredentialsType")
            .with_nullable(true)
            .with_field(BasicField::new("a", "string"))
            .with_field(BasicField::new("b", "string"));

        let operation = operation(
            "Login",
            direction("LoginRequest", &["Credentials"], &[]),
            direction("LoginResponse", &[], &[]),
        );

        let envelopes = assemble(&resolver(vec![credentials.into()]), &operation);

        let header = section(&envelopes.input, "Header");
        let attached = header.fields()[0].as_complex().unwrap();
        assert_eq!(attached.name, "Credentials");
        assert_eq!(attached.type_name, "CredentialsType");
        assert!(attached.nullable);
        assert!(attached.is_cyclic());
        assert!(attached.fields().is_empty());
    }

    #[test]
    fn basic_header_is_attached_unmodified() {
        let token = BasicField::new("AuthToken", "string")
            .with_required(false)
            .with_nullable(true);

        let operation = operation(
            "Ping",
            direction("PingRequest", &["AuthToken"], &["Ping"]),
            direction("PingResponse", &[], &[]),
        );

        let known = vec![
            token.clone().into(),
            ComplexField::new("Ping", "Ping")
                .with_field(BasicField::new("payload", "string").with_required(false))
                .into(),
        ];

        let envelopes = assemble(&resolver(known), &operation);

        assert_eq!(
            section(&envelopes.input, "Header").fields(),
            [Field::from(token)]
        );
        assert_eq!(children(section(&envelopes.input, "Body")), ["Ping"]);
    }

    #[test]
    fn unresolved_body_part_is_left_out() {
        let operation = operation(
            "GetQuote",
            direction("GetQuoteRequest", &[], &["Unknown", "GetQuoteRequest"]),
            direction("GetQuoteResponse", &[], &[]),
        );

        let assembly = assemble_with_report(&resolver(vec![quote_request()]), &operation);

        let body = section(&assembly.envelopes.input, "Body");
        assert_eq!(children(body), ["GetQuoteRequest"]);
        assert_eq!(
            assembly.unmapped,
            [UnmappedPart {
                direction: "GetQuoteRequest".to_owned(),
                element: "Unknown".to_owned(),
                position: Position::Body,
                reason: UnmappedReason::Unresolved,
            }]
        );
    }

    #[test]
    fn scalar_body_part_is_left_out() {
        let operation = operation(
            "Echo",
            direction("EchoRequest", &["Missing"], &[]),
            direction("EchoResponse", &[], &["result"]),
        );

        let assembly = assemble_with_report(
            &resolver(vec![BasicField::new("result", "string").into()]),
            &operation,
        );

        assert!(section(&assembly.envelopes.output, "Body").fields().is_empty());

        let reasons: Vec<_> = assembly
            .unmapped
            .iter()
            .map(|part| (part.element.as_str(), part.position, part.reason))
            .collect();
        assert_eq!(
            reasons,
            [
                ("Missing", Position::Header, UnmappedReason::Unresolved),
                ("result", Position::Body, UnmappedReason::Scalar),
            ]
        );
    }

    #[test]
    fn declaration_order_is_preserved() {
        let known = vec![
            BasicField::new("Trace", "string").into(),
            BasicField::new("Auth", "string").into(),
            ComplexField::new("Second", "Second").into(),
            ComplexField::new("First", "First").into(),
        ];

        let operation = operation(
            "Ordered",
            direction("OrderedRequest", &["Auth", "Trace"], &["First", "Second"]),
            direction("OrderedResponse", &[], &[]),
        );

        let envelopes = assemble(&resolver(known), &operation);

        assert_eq!(children(section(&envelopes.input, "Header")), ["Auth", "Trace"]);
        assert_eq!(children(section(&envelopes.input, "Body")), ["First", "Second"]);
    }

    #[test]
    fn first_pool_match_wins() {
        let shadowed = ComplexField::new("Item", "FirstItem")
            .with_field(BasicField::new("note", "string").with_required(false));
        let later = ComplexField::new("Item", "SecondItem");

        let operation = operation(
            "Duplicate",
            direction("DuplicateRequest", &["Item"], &["Item"]),
            direction("DuplicateResponse", &[], &[]),
        );

        let envelopes = assemble(&resolver(vec![shadowed.into(), later.into()]), &operation);

        let header = section(&envelopes.input, "Header");
        assert_eq!(header.fields().len(), 1);
        assert_eq!(header.fields()[0].as_complex().unwrap().type_name, "FirstItem");
    }

    #[test]
    fn body_sees_the_header_stripped_field() {
        let item = ComplexField::new("Item", "Item")
            .with_field(BasicField::new("note", "string").with_required(false));

        let operation = operation(
            "Shared",
            direction("SharedRequest", &["Item"], &["Item"]),
            direction("SharedResponse", &[], &["Item"]),
        );

        let envelopes = assemble(&resolver(vec![item.into()]), &operation);

        let request = section(&envelopes.input, "Body");
        assert_eq!(children(request), ["Item"]);
        assert!(!request.fields()[0].is_required());

        let response = section(&envelopes.output, "Body");
        assert!(response.fields()[0].is_required());
    }

    #[test]
    fn output_uses_its_own_headers() {
        let known = vec![
            BasicField::new("RequestId", "string").into(),
            BasicField::new("ServerTime", "dateTime").into(),
        ];

        let operation = operation(
            "Status",
            direction("StatusRequest", &["RequestId"], &[]),
            direction("StatusResponse", &["ServerTime"], &[]),
        );

        let envelopes = assemble(&resolver(known), &operation);

        assert_eq!(children(section(&envelopes.input, "Header")), ["RequestId"]);
        assert_eq!(children(section(&envelopes.output, "Header")), ["ServerTime"]);
    }

    #[test]
    fn assembling_twice_gives_equal_trees() {
        let operation = operation(
            "GetQuote",
            direction("GetQuoteRequest", &["AuthToken"], &["GetQuoteRequest"]),
            direction("GetQuoteResponse", &[], &["GetQuoteRequest"]),
        );
        let resolver = resolver(vec![
            quote_request(),
            BasicField::new("AuthToken", "string").into(),
        ]);

        assert_eq!(assemble(&resolver, &operation), assemble(&resolver, &operation));
    }
}
