use std::fmt;

/// A node of a generated type tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Basic(BasicField),
    Complex(ComplexField),
}

/// A scalar leaf. `type_name` is the XSD built-in it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicField {
    pub name: String,
    pub type_name: String,
    pub attribute_name: Option<String>,
    pub required: bool,
    pub nullable: bool,
}

/// A record node. Once `cyclic_dep` is set the node is a reference to
/// `type_name` and never carries children again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexField {
    pub name: String,
    pub type_name: String,
    pub attribute_name: Option<String>,
    pub required: bool,
    pub nullable: bool,
    cyclic_dep: bool,
    fields: Vec<Field>,
}

impl Field {
    pub fn name(&self) -> &str {
        match self {
            Field::Basic(field) => &field.name,
            Field::Complex(field) => &field.name,
        }
    }

    pub fn is_required(&self) -> bool {
        match self {
            Field::Basic(field) => field.required,
            Field::Complex(field) => field.required,
        }
    }

    pub fn is_nullable(&self) -> bool {
        match self {
            Field::Basic(field) => field.nullable,
            Field::Complex(field) => field.nullable,
        }
    }

    pub fn as_complex(&self) -> Option<&ComplexField> {
        match self {
            Field::Complex(field) => Some(field),
            Field::Basic(_) => None,
        }
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        match self {
            Field::Basic(field) => field.write_tree(f, depth),
            Field::Complex(field) => field.write_tree(f, depth),
        }
    }
}

impl From<BasicField> for Field {
    fn from(field: BasicField) -> Self {
        Field::Basic(field)
    }
}

impl From<ComplexField> for Field {
    fn from(field: ComplexField) -> Self {
        Field::Complex(field)
    }
}

impl BasicField {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, type_name: T) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            attribute_name: None,
            required: true,
            nullable: false,
        }
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_attribute_name<A: Into<String>>(mut self, attribute_name: A) -> Self {
        self.attribute_name = Some(attribute_name.into());
        self
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}: {}", "", self.name, self.type_name, indent = depth * 2)?;

        if let Some(attribute_name) = &self.attribute_name {
            write!(f, " @{}", attribute_name)?;
        }

        write_flags(f, self.required, self.nullable, false)
    }
}

impl ComplexField {
    pub fn new<N: Into<String>, T: Into<String>>(name: N, type_name: T) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            attribute_name: None,
            required: true,
            nullable: false,
            cyclic_dep: false,
            fields: Vec::new(),
        }
    }

    /// Builds a reference to `type_name` that is never expanded.
    pub fn cyclic<N: Into<String>, T: Into<String>>(name: N, type_name: T) -> Self {
        let mut field = Self::new(name, type_name);
        field.mark_cyclic();
        field
    }

    pub fn with_required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn with_attribute_name<A: Into<String>>(mut self, attribute_name: A) -> Self {
        self.attribute_name = Some(attribute_name.into());
        self
    }

    pub fn with_field<F: Into<Field>>(mut self, field: F) -> Self {
        self.push_field(field);
        self
    }

    pub fn is_cyclic(&self) -> bool {
        self.cyclic_dep
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name() == name)
    }

    /// Appends a child. Cyclic nodes stay empty, so this is a no-op for them.
    pub fn push_field<F: Into<Field>>(&mut self, field: F) {
        if !self.cyclic_dep {
            self.fields.push(field.into());
        }
    }

    pub fn mark_cyclic(&mut self) {
        self.fields.clear();
        self.cyclic_dep = true;
    }

    fn write_tree(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        write!(f, "{:indent$}{}: {}", "", self.name, self.type_name, indent = depth * 2)?;
        write_flags(f, self.required, self.nullable, self.cyclic_dep)?;

        for field in &self.fields {
            writeln!(f)?;
            field.write_tree(f, depth + 1)?;
        }

        Ok(())
    }
}

fn write_flags(
    f: &mut fmt::Formatter<'_>,
    required: bool,
    nullable: bool,
    cyclic: bool,
) -> fmt::Result {
    let flags = [
        (!required, "optional"),
        (nullable, "nullable"),
        (cyclic, "ref"),
    ];

    for (_, flag) in flags.iter().filter(|(set, _)| *set) {
        write!(f, " [{}]", flag)?;
    }

    Ok(())
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}

impl fmt::Display for ComplexField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_tree(f, 0)
    }
}
