use super::{
    field::{BasicField, ComplexField, Field},
    types::WsdlPart,
};
use soapgen_wsdl::types::{self as wsdl, FieldKind, NamespacedName, Namespaces, PartReference, TypeKind};
use tracing::{debug, warn};

/// Turns one message part into the generated fields describing its schema type.
///
/// Implementations must be deterministic: the same part always yields the same
/// fields. Nested references back to a type that is still being expanded come
/// out as cyclic [`ComplexField`]s without children.
pub trait ResolveFields {
    fn resolve(&self, part: &WsdlPart) -> Vec<Field>;
}

impl<F> ResolveFields for F
where
    F: Fn(&WsdlPart) -> Vec<Field>,
{
    fn resolve(&self, part: &WsdlPart) -> Vec<Field> {
        self(part)
    }
}

/// Resolves parts against the schema types of a parsed document.
pub struct SchemaResolver<'a> {
    definition: &'a wsdl::Definition,
    namespaces: &'a Namespaces,
}

/// A named complex type or a global element currently being expanded.
#[derive(Debug, PartialEq)]
enum Expanding {
    Type(NamespacedName),
    Element(NamespacedName),
}

type Path = Vec<Expanding>;

const FALLBACK_SCALAR: &str = "string";

impl<'a> SchemaResolver<'a> {
    pub fn new(definition: &'a wsdl::Definition, namespaces: &'a Namespaces) -> Self {
        Self {
            definition,
            namespaces,
        }
    }

    fn element_field(
        &self,
        name: &str,
        element: &NamespacedName,
        required: bool,
        path: &mut Path,
    ) -> Option<Field> {
        let element = match self.definition.element(element) {
            Some(element) => element,
            None => {
                warn!(element = %element.name, "unknown element");
                return None;
            }
        };

        let expanding = Expanding::Element(element.name.clone());

        if path.contains(&expanding) {
            debug!(element = %element.name.name, "cyclic element reference");

            let type_name = match &element.kind {
                FieldKind::Type(ty) => ty.name.as_str(),
                _ => element.name.name.as_str(),
            };

            return Some(
                ComplexField::cyclic(name, type_name)
                    .with_required(required)
                    .with_nullable(element.nillable)
                    .into(),
            );
        }

        path.push(expanding);
        let field = self.kind_field(name, &element.kind, required, element.nillable, path);
        path.pop();

        field
    }

    fn kind_field(
        &self,
        name: &str,
        kind: &FieldKind,
        required: bool,
        nullable: bool,
        path: &mut Path,
    ) -> Option<Field> {
        match kind {
            FieldKind::Type(ty) => self.type_field(name, ty, required, nullable, path),

            FieldKind::Inner(TypeKind::Struct(content)) => {
                let mut field = ComplexField::new(name, name)
                    .with_required(required)
                    .with_nullable(nullable);
                self.expand(&mut field, content, path);
                Some(field.into())
            }

            FieldKind::Inner(TypeKind::Simple(base) | TypeKind::Alias(base)) => Some(
                BasicField::new(name, self.scalar_name(base))
                    .with_required(required)
                    .with_nullable(nullable)
                    .into(),
            ),

            FieldKind::Ref(element) => self.element_field(name, element, required, path),
        }
    }

    fn type_field(
        &self,
        name: &str,
        ty: &NamespacedName,
        required: bool,
        nullable: bool,
        path: &mut Path,
    ) -> Option<Field> {
        if self.namespaces.is_xsd(ty) {
            return Some(
                BasicField::new(name, ty.name.as_str())
                    .with_required(required)
                    .with_nullable(nullable)
                    .into(),
            );
        }

        let definition = match self.definition.ty(ty) {
            Some(definition) => definition,
            None => {
                warn!(ty = %ty.name, field = name, "unknown type");
                return None;
            }
        };

        match &definition.kind {
            TypeKind::Simple(base) | TypeKind::Alias(base) => Some(
                BasicField::new(name, self.scalar_name(base))
                    .with_required(required)
                    .with_nullable(nullable)
                    .into(),
            ),

            TypeKind::Struct(content) => {
                let mut field = ComplexField::new(name, ty.name.as_str())
                    .with_required(required)
                    .with_nullable(nullable);

                let expanding = Expanding::Type(ty.clone());

                if path.contains(&expanding) {
                    debug!(ty = %ty.name, "cyclic type reference");
                    field.mark_cyclic();
                } else {
                    path.push(expanding);
                    self.expand(&mut field, content, path);
                    path.pop();
                }

                Some(field.into())
            }
        }
    }

    /// Appends the base type's members, then the type's own elements, then its attributes.
    fn expand(&self, field: &mut ComplexField, content: &wsdl::Struct, path: &mut Path) {
        if let Some(base) = &content.base {
            self.expand_base(field, base, path);
        }

        for member in &content.fields {
            let required = !member.occurs.is_optional();

            if let Some(child) =
                self.kind_field(&member.name.name, &member.ty, required, member.nillable, path)
            {
                field.push_field(child);
            }
        }

        for attribute in &content.attributes {
            field.push_field(
                BasicField::new(attribute.name.as_str(), self.scalar_name(&attribute.ty))
                    .with_required(attribute.required)
                    .with_attribute_name(attribute.name.as_str()),
            );
        }
    }

    fn expand_base(&self, field: &mut ComplexField, base: &NamespacedName, path: &mut Path) {
        let expanding = Expanding::Type(base.clone());

        if self.namespaces.is_xsd(base) || path.contains(&expanding) {
            return;
        }

        match self.definition.ty(base).map(|base| &base.kind) {
            Some(TypeKind::Struct(content)) => {
                path.push(expanding);
                self.expand(field, content, path);
                path.pop();
            }

            Some(_) => (),

            None => warn!(ty = %base.name, "unknown base type"),
        }
    }

    /// Follows simple type restrictions down to an XSD built-in.
    fn scalar_name(&self, ty: &NamespacedName) -> String {
        let mut current = ty;

        // Bounded by the number of types so a malformed restriction loop terminates.
        for _ in 0..=self.definition.types.len() {
            if self.namespaces.is_xsd(current) {
                return current.name.clone();
            }

            match self.definition.ty(current).map(|ty| &ty.kind) {
                Some(TypeKind::Simple(base) | TypeKind::Alias(base)) => current = base,
                _ => break,
            }
        }

        FALLBACK_SCALAR.to_owned()
    }
}

impl ResolveFields for SchemaResolver<'_> {
    fn resolve(&self, part: &WsdlPart) -> Vec<Field> {
        let mut path = Path::new();

        let field = match &part.reference {
            PartReference::Element(element) => {
                self.element_field(&part.element_name, element, true, &mut path)
            }

            PartReference::Type(ty) => self.type_field(&part.element_name, ty, true, false, &mut path),
        };

        match field {
            Some(field) => vec![field],
            None => {
                warn!(part = %part.name, element = %part.element_name, "part did not resolve to a field");
                Vec::new()
            }
        }
    }
}
