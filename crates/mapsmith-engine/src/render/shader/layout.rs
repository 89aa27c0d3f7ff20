use indexmap::IndexMap;

/// Declared type of an attribute or uniform.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum GlslType {
    Float,
    Int,
    Bool,
    Vec2,
    Vec3,
    Vec4,
    Mat2,
    Mat3,
    Mat4,
    Sampler2D,
}

impl GlslType {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "float" => GlslType::Float,
            "int" => GlslType::Int,
            "bool" => GlslType::Bool,
            "vec2" => GlslType::Vec2,
            "vec3" => GlslType::Vec3,
            "vec4" => GlslType::Vec4,
            "mat2" => GlslType::Mat2,
            "mat3" => GlslType::Mat3,
            "mat4" => GlslType::Mat4,
            "sampler2D" => GlslType::Sampler2D,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GlslType::Float => "float",
            GlslType::Int => "int",
            GlslType::Bool => "bool",
            GlslType::Vec2 => "vec2",
            GlslType::Vec3 => "vec3",
            GlslType::Vec4 => "vec4",
            GlslType::Mat2 => "mat2",
            GlslType::Mat3 => "mat3",
            GlslType::Mat4 => "mat4",
            GlslType::Sampler2D => "sampler2D",
        }
    }

    /// Scalar components per element: float=1, vec2=2, vec3=3, vec4/mat2=4,
    /// mat3=9, mat4=16. Samplers have none.
    pub fn components(self) -> u32 {
        match self {
            GlslType::Float | GlslType::Int | GlslType::Bool => 1,
            GlslType::Vec2 => 2,
            GlslType::Vec3 => 3,
            GlslType::Vec4 | GlslType::Mat2 => 4,
            GlslType::Mat3 => 9,
            GlslType::Mat4 => 16,
            GlslType::Sampler2D => 0,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Qualifier {
    Attribute,
    Uniform,
}

/// One entry of a shader's static declaration table.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Declaration {
    pub qualifier: Qualifier,
    pub ty: GlslType,
    pub name: &'static str,
}

impl Declaration {
    pub const fn attribute(name: &'static str, ty: GlslType) -> Self {
        Self { qualifier: Qualifier::Attribute, ty, name }
    }

    pub const fn uniform(name: &'static str, ty: GlslType) -> Self {
        Self { qualifier: Qualifier::Uniform, ty, name }
    }
}

/// Attribute and uniform declarations of a program, in declaration order.
///
/// Each name is recorded once; a repeated declaration keeps the first type.
/// Attribute locations are their declaration index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderLayout {
    attributes: IndexMap<String, GlslType>,
    uniforms: IndexMap<String, GlslType>,
}

impl ShaderLayout {
    pub fn from_declarations(decls: &[Declaration]) -> Self {
        let mut layout = Self::default();
        for d in decls {
            layout.insert(d.qualifier, d.name, d.ty);
        }
        layout
    }

    /// Reflects `attribute`/`uniform` declarations out of GLSL-style source.
    ///
    /// Both stages are scanned as one text with line breaks and tabs
    /// flattened, statement by statement. Precision qualifiers are skipped;
    /// declarations with a type outside `GlslType` are ignored with a warning.
    pub fn reflect(vertex: &str, fragment: &str) -> Self {
        let mut layout = Self::default();
        let source: String = vertex
            .chars()
            .chain(std::iter::once(';'))
            .chain(fragment.chars())
            .map(|c| if matches!(c, '\r' | '\n' | '\t') { ' ' } else { c })
            .collect();

        for statement in source.split(';') {
            let mut tokens = statement.split_whitespace();
            let qualifier = match tokens.next() {
                Some("attribute") => Qualifier::Attribute,
                Some("uniform") => Qualifier::Uniform,
                _ => continue,
            };
            let mut tokens = tokens.skip_while(|t| matches!(*t, "lowp" | "mediump" | "highp"));
            let (Some(ty), Some(name)) = (tokens.next(), tokens.next()) else {
                continue;
            };
            match GlslType::parse(ty) {
                Some(ty) => layout.insert(qualifier, name, ty),
                None => log::warn!("ignoring declaration of {name:?} with unsupported type {ty:?}"),
            }
        }
        layout
    }

    fn insert(&mut self, qualifier: Qualifier, name: &str, ty: GlslType) {
        let map = match qualifier {
            Qualifier::Attribute => &mut self.attributes,
            Qualifier::Uniform => &mut self.uniforms,
        };
        map.entry(name.to_string()).or_insert(ty);
    }

    pub fn attribute(&self, name: &str) -> Option<GlslType> {
        self.attributes.get(name).copied()
    }

    pub fn attribute_location(&self, name: &str) -> Option<u32> {
        self.attributes.get_index_of(name).map(|i| i as u32)
    }

    pub fn uniform(&self, name: &str) -> Option<GlslType> {
        self.uniforms.get(name).copied()
    }

    pub fn attributes(&self) -> impl Iterator<Item = (&str, GlslType)> + '_ {
        self.attributes.iter().map(|(n, t)| (n.as_str(), *t))
    }

    pub fn uniforms(&self) -> impl Iterator<Item = (&str, GlslType)> + '_ {
        self.uniforms.iter().map(|(n, t)| (n.as_str(), *t))
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }
}
