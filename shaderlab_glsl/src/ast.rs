//! A syntax tree for the restricted GLSL output of the D3D9 disassembler.
//!
//! Identifiers are stored once in an [Idents] arena and referenced by [IdentId].
//! Renaming an identifier updates every expression that uses it.
use indexmap::IndexMap;
use smol_str::SmolStr;
use strum::{Display, EnumString};

#[derive(Debug, PartialEq, Clone)]
pub struct Program {
    /// Keywords from a leading `// KEYWORDS` comment.
    pub keywords: Vec<String>,
    pub version: u32,
    pub declarations: Vec<Declaration>,
    /// Declarations added by [Program::apply_mapping] rendered before `declarations`.
    pub injected: Vec<String>,
    pub main: Vec<Statement>,
    pub idents: Idents,
}

/// A handle into [Idents].
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash, PartialOrd, Ord)]
pub struct IdentId(usize);

/// A variable reference like `name`, `name[2]`, or `name[2].xyz`.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Identifier {
    pub name: SmolStr,
    pub index: Option<u32>,
    pub swizzle: Option<SmolStr>,
}

/// Every identifier in a [Program] with an index of handles by name.
#[derive(Debug, PartialEq, Clone, Default)]
pub struct Idents {
    nodes: Vec<Identifier>,
    by_name: IndexMap<SmolStr, Vec<IdentId>>,
}

impl Idents {
    pub fn insert(&mut self, ident: Identifier) -> IdentId {
        let id = IdentId(self.nodes.len());
        self.by_name.entry(ident.name.clone()).or_default().push(id);
        self.nodes.push(ident);
        id
    }

    pub fn get(&self, id: IdentId) -> &Identifier {
        &self.nodes[id.0]
    }

    /// All handles for identifiers named `name` in insertion order.
    pub fn handles(&self, name: &str) -> &[IdentId] {
        self.by_name.get(name).map(|h| h.as_slice()).unwrap_or_default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Unique names in order of first use.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.by_name.keys().map(|n| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Rename the identifiers for `handles` and set their index to `element` if they have no index.
    pub fn rename(&mut self, handles: &[IdentId], name: &str, element: Option<u32>) {
        for handle in handles {
            let node = &mut self.nodes[handle.0];
            if let Some(old) = self.by_name.get_mut(&node.name) {
                old.retain(|h| h != handle);
                if old.is_empty() {
                    self.by_name.shift_remove(&node.name);
                }
            }

            node.name = name.into();
            if node.index.is_none() {
                node.index = element;
            }
            self.by_name.entry(node.name.clone()).or_default().push(*handle);
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(index) = self.index {
            write!(f, "[{index}]")?;
        }
        if let Some(swizzle) = &self.swizzle {
            write!(f, ".{swizzle}")?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, Display)]
pub enum TypeName {
    #[strum(serialize = "float")]
    Float,
    #[strum(serialize = "int")]
    Int,
    #[strum(serialize = "bool")]
    Bool,
    #[strum(serialize = "vec2")]
    Vec2,
    #[strum(serialize = "vec3")]
    Vec3,
    #[strum(serialize = "vec4")]
    Vec4,
    #[strum(serialize = "ivec2")]
    IVec2,
    #[strum(serialize = "ivec3")]
    IVec3,
    #[strum(serialize = "ivec4")]
    IVec4,
    #[strum(serialize = "bvec2")]
    BVec2,
    #[strum(serialize = "bvec3")]
    BVec3,
    #[strum(serialize = "bvec4")]
    BVec4,
    #[strum(serialize = "mat2")]
    Mat2,
    #[strum(serialize = "mat3")]
    Mat3,
    #[strum(serialize = "mat4")]
    Mat4,
    #[strum(serialize = "sampler2D")]
    Sampler2D,
    #[strum(serialize = "samplerCube")]
    SamplerCube,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Qualifier {
    Const,
    Attribute,
    Varying,
    Uniform,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Declaration {
    /// `#define dest src`
    Define(Define),
    Declare(Declare),
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Define {
    pub dest: IdentId,
    pub src: IdentId,
}

/// `qualifier type ident = value;`
#[derive(Debug, PartialEq, Clone)]
pub struct Declare {
    pub qualifier: Option<Qualifier>,
    pub ty: TypeName,
    pub ident: IdentId,
    pub value: Option<Initializer>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Initializer {
    Assignment(Assignment),
    Literal(Literal),
}

/// A constructor with only literal or identifier values like `vec4(0.0, a, 1.0, 1.0)`.
#[derive(Debug, PartialEq, Clone)]
pub struct Assignment {
    pub ty: TypeName,
    pub values: Vec<Value>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Value {
    Ident(IdentId),
    Literal(Literal),
}

#[derive(Debug, PartialEq, Clone)]
pub enum Literal {
    Float(FloatLiteral),
    Int(i64),
    Bool(bool),
}

#[derive(Debug, PartialEq, Clone)]
pub struct FloatLiteral {
    pub value: f64,
    /// The original text to preserve formatting like `1.0e-05` or `0.500`.
    pub text: Option<SmolStr>,
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Literal::Float(FloatLiteral {
                text: Some(text), ..
            }) => write!(f, "{text}"),
            Literal::Float(FloatLiteral { value, text: None }) => {
                // Float literals always need a decimal point.
                if value.fract() == 0.0 && value.is_finite() {
                    write!(f, "{value:.1}")
                } else {
                    write!(f, "{value}")
                }
            }
            Literal::Int(i) => write!(f, "{i}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Ident(IdentId),
    Literal(Literal),
    Function(Function),
    Unary(Unary),
    Binary(Binary),
    Ternary(Ternary),
}

#[derive(Debug, PartialEq, Clone)]
pub struct Function {
    pub name: SmolStr,
    pub params: Vec<Expr>,
}

/// Negation of a function call or identifier.
#[derive(Debug, PartialEq, Clone)]
pub struct Unary {
    pub op: UnaryOp,
    pub operand: Box<Expr>,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, Display)]
pub enum UnaryOp {
    #[strum(serialize = "-")]
    Negate,
}

#[derive(Debug, PartialEq, Clone)]
pub struct Binary {
    pub op: BinaryOp,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    /// `true` if the source wrapped this operation in parentheses.
    pub parenthesized: bool,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, Display)]
pub enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "==")]
    Equal,
    #[strum(serialize = "!=")]
    NotEqual,
    #[strum(serialize = "<=")]
    LessEqual,
    #[strum(serialize = ">=")]
    GreaterEqual,
    #[strum(serialize = "<")]
    Less,
    #[strum(serialize = ">")]
    Greater,
}

/// `((condition) ? when_true : when_false)`
#[derive(Debug, PartialEq, Clone)]
pub struct Ternary {
    pub condition: Box<Expr>,
    pub when_true: Box<Expr>,
    pub when_false: Box<Expr>,
}

#[derive(Debug, PartialEq, Clone)]
pub enum Statement {
    Instruction(Instruction),
    If(IfBlock),
    InlineIf(InlineIf),
}

/// `target = expr;`
#[derive(Debug, PartialEq, Clone)]
pub struct Instruction {
    pub target: IdentId,
    pub expr: Expr,
}

#[derive(Debug, PartialEq, Clone)]
pub struct IfBlock {
    pub condition: Expr,
    pub then_block: Vec<Statement>,
    pub else_block: Option<Vec<Statement>>,
}

/// `if (condition) command;`
#[derive(Debug, PartialEq, Clone)]
pub struct InlineIf {
    pub condition: Function,
    pub command: Command,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, EnumString, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Command {
    Discard,
}
