//! Parse disassembled GLSL into a [Program].
use pest::{
    error::LineColLocation,
    iterators::{Pair, Pairs},
    Parser,
};
use pest_derive::Parser;
use smol_str::SmolStr;
use thiserror::Error;

use crate::ast::*;

/// Functions the disassembler is allowed to emit.
pub const BUILTIN_FUNCTIONS: &[&str] = &[
    "radians",
    "degrees",
    "sin",
    "cos",
    "tan",
    "asin",
    "acos",
    "atan",
    "pow",
    "exp",
    "log",
    "exp2",
    "log2",
    "sqrt",
    "inversesqrt",
    "abs",
    "sign",
    "floor",
    "ceil",
    "fract",
    "mod",
    "min",
    "max",
    "clamp",
    "mix",
    "step",
    "smoothstep",
    "length",
    "distance",
    "dot",
    "cross",
    "normalize",
    "ftransform",
    "faceforward",
    "reflect",
    "refract",
    "matrixCompMult",
    "outerProduct",
    "transpose",
    "lessThan",
    "lessThanEqual",
    "greaterThan",
    "greaterThanEqual",
    "equal",
    "notEqual",
    "any",
    "all",
    "not",
    "texture1D",
    "texture1DProj",
    "texture1DLod",
    "texture1DProjLod",
    "texture2D",
    "texture2DProj",
    "texture2DLod",
    "texture2DProjLod",
    "texture3D",
    "texture3DProj",
    "texture3DLod",
    "texture3DProjLod",
    "textureCube",
    "textureCubeLod",
    "shadow1D",
    "shadow2D",
    "shadow1DProj",
    "shadow2DProj",
    "shadow1DLod",
    "shadow2DLod",
    "shadow1DProjLod",
    "shadow2DProjLod",
    "dFdx",
    "dFdy",
    "fwidth",
    "noise1",
    "noise2",
    "noise3",
    "noise4",
    "float",
    "int",
    "bool",
    "vec2",
    "vec3",
    "vec4",
    "ivec4",
];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("syntax error at line {line}, column {column}: {message}\n{snippet}")]
    Syntax {
        line: usize,
        column: usize,
        /// The source line containing the error.
        snippet: String,
        message: String,
    },

    #[error("unknown function {name:?} at line {line}, column {column}")]
    UnknownFunction {
        name: String,
        line: usize,
        column: usize,
    },

    #[error("invalid literal {text:?} at line {line}, column {column}")]
    InvalidLiteral {
        text: String,
        line: usize,
        column: usize,
    },

    #[error("unexpected {rule} at line {line}, column {column}")]
    UnexpectedRule {
        rule: String,
        line: usize,
        column: usize,
    },
}

impl Program {
    /// Parse `text` and create a new identifier registry for its identifiers.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let program = GlslParser::parse(Rule::program, text)
            .map_err(syntax_error)?
            .next()
            .ok_or_else(|| ParseError::UnexpectedRule {
                rule: "EOI".to_string(),
                line: 1,
                column: 1,
            })?;

        AstBuilder::default().program(program)
    }
}

fn syntax_error(e: pest::error::Error<Rule>) -> ParseError {
    let (line, column) = match e.line_col {
        LineColLocation::Pos(pos) => pos,
        LineColLocation::Span(start, _) => start,
    };
    ParseError::Syntax {
        line,
        column,
        snippet: e.line().to_string(),
        message: e.variant.message().to_string(),
    }
}

fn unexpected(pair: &Pair<Rule>) -> ParseError {
    let (line, column) = pair.line_col();
    ParseError::UnexpectedRule {
        rule: format!("{:?}", pair.as_rule()),
        line,
        column,
    }
}

fn invalid_literal(pair: &Pair<Rule>) -> ParseError {
    let (line, column) = pair.line_col();
    ParseError::InvalidLiteral {
        text: pair.as_str().to_string(),
        line,
        column,
    }
}

/// The child pairs of a rule with the parent position for errors.
struct Inner<'a> {
    pairs: Pairs<'a, Rule>,
    line: usize,
    column: usize,
}

impl<'a> Inner<'a> {
    fn new(pair: Pair<'a, Rule>) -> Self {
        let (line, column) = pair.line_col();
        Self {
            pairs: pair.into_inner(),
            line,
            column,
        }
    }

    fn next(&mut self) -> Result<Pair<'a, Rule>, ParseError> {
        self.pairs.next().ok_or(ParseError::UnexpectedRule {
            rule: "end of rule".to_string(),
            line: self.line,
            column: self.column,
        })
    }
}

#[derive(Default)]
struct AstBuilder {
    idents: Idents,
}

impl AstBuilder {
    fn program(mut self, pair: Pair<Rule>) -> Result<Program, ParseError> {
        let mut keywords = Vec::new();
        let mut version = 0;
        let mut declarations = Vec::new();
        let mut main = Vec::new();

        let mut shader = None;
        for pair in pair.into_inner() {
            match pair.as_rule() {
                Rule::keywords => {
                    keywords = pair.into_inner().map(|k| k.as_str().to_string()).collect();
                }
                Rule::shader => shader = Some(pair),
                _ => return Err(unexpected(&pair)),
            }
        }
        let shader = shader.ok_or_else(|| ParseError::UnexpectedRule {
            rule: "EOI".to_string(),
            line: 1,
            column: 1,
        })?;

        for pair in shader.into_inner() {
            match pair.as_rule() {
                Rule::version => {
                    let number = Inner::new(pair).next()?;
                    version = number.as_str().parse().map_err(|_| invalid_literal(&number))?;
                }
                Rule::define | Rule::declare => declarations.push(self.declaration(pair)?),
                Rule::main_function => main = self.statements(pair.into_inner())?,
                Rule::EOI => (),
                _ => return Err(unexpected(&pair)),
            }
        }

        Ok(Program {
            keywords,
            version,
            declarations,
            injected: Vec::new(),
            main,
            idents: self.idents,
        })
    }

    fn declaration(&mut self, pair: Pair<Rule>) -> Result<Declaration, ParseError> {
        match pair.as_rule() {
            Rule::define => {
                let mut inner = Inner::new(pair);
                let dest = self.identifier(inner.next()?)?;
                let src = self.identifier(inner.next()?)?;
                Ok(Declaration::Define(Define { dest, src }))
            }
            Rule::declare => {
                let mut inner = Inner::new(pair);
                let mut next = inner.next()?;
                let qualifier = if next.as_rule() == Rule::qualifier {
                    let qualifier = next.as_str().parse().map_err(|_| unexpected(&next))?;
                    next = inner.next()?;
                    Some(qualifier)
                } else {
                    None
                };
                let ty = type_name(&next)?;
                let ident = self.identifier(inner.next()?)?;
                let value = inner
                    .pairs
                    .next()
                    .map(|p| self.initializer(p))
                    .transpose()?;

                Ok(Declaration::Declare(Declare {
                    qualifier,
                    ty,
                    ident,
                    value,
                }))
            }
            _ => Err(unexpected(&pair)),
        }
    }

    fn initializer(&mut self, pair: Pair<Rule>) -> Result<Initializer, ParseError> {
        match pair.as_rule() {
            Rule::assignment => {
                let mut inner = Inner::new(pair);
                let ty = type_name(&inner.next()?)?;
                let values = inner
                    .pairs
                    .map(|p| match p.as_rule() {
                        Rule::literal => literal(p).map(Value::Literal),
                        Rule::identifier => self.identifier(p).map(Value::Ident),
                        _ => Err(unexpected(&p)),
                    })
                    .collect::<Result<_, _>>()?;
                Ok(Initializer::Assignment(Assignment { ty, values }))
            }
            Rule::literal => literal(pair).map(Initializer::Literal),
            _ => Err(unexpected(&pair)),
        }
    }

    fn statements(&mut self, pairs: Pairs<Rule>) -> Result<Vec<Statement>, ParseError> {
        pairs.map(|p| self.statement(p)).collect()
    }

    fn statement(&mut self, pair: Pair<Rule>) -> Result<Statement, ParseError> {
        match pair.as_rule() {
            Rule::instruction => {
                let mut inner = Inner::new(pair);
                let target = self.identifier(inner.next()?)?;
                let expr = self.expr(inner.next()?)?;
                Ok(Statement::Instruction(Instruction { target, expr }))
            }
            Rule::if_block => {
                let mut inner = Inner::new(pair);
                let condition = self.expr(inner.next()?)?;
                let then_block = self.statements(inner.next()?.into_inner())?;
                let else_block = match inner.pairs.next() {
                    // else_block -> block -> statements
                    Some(p) => {
                        let block = Inner::new(p).next()?;
                        Some(self.statements(block.into_inner())?)
                    }
                    None => None,
                };
                Ok(Statement::If(IfBlock {
                    condition,
                    then_block,
                    else_block,
                }))
            }
            Rule::inline_if => {
                let mut inner = Inner::new(pair);
                let condition = self.function(inner.next()?)?;
                let command = inner.next()?;
                let command = command.as_str().parse().map_err(|_| unexpected(&command))?;
                Ok(Statement::InlineIf(InlineIf { condition, command }))
            }
            _ => Err(unexpected(&pair)),
        }
    }

    fn expr(&mut self, pair: Pair<Rule>) -> Result<Expr, ParseError> {
        let mut inner = Inner::new(pair);
        let left = self.term(inner.next()?)?;
        match inner.pairs.next() {
            Some(op) => {
                let op = binary_op(&op)?;
                let right = self.expr(inner.next()?)?;
                Ok(Expr::Binary(Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    parenthesized: false,
                }))
            }
            None => Ok(left),
        }
    }

    fn term(&mut self, pair: Pair<Rule>) -> Result<Expr, ParseError> {
        match pair.as_rule() {
            Rule::ternary => {
                let mut inner = Inner::new(pair);
                let condition = self.expr(inner.next()?)?;
                let when_true = self.expr(inner.next()?)?;
                let when_false = self.expr(inner.next()?)?;
                Ok(Expr::Ternary(Ternary {
                    condition: Box::new(condition),
                    when_true: Box::new(when_true),
                    when_false: Box::new(when_false),
                }))
            }
            Rule::paren_binary => {
                let mut inner = Inner::new(pair);
                let left = self.term(inner.next()?)?;
                let op = binary_op(&inner.next()?)?;
                let right = self.expr(inner.next()?)?;
                Ok(Expr::Binary(Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                    parenthesized: true,
                }))
            }
            Rule::function => self.function(pair).map(Expr::Function),
            Rule::unary => {
                let mut inner = Inner::new(pair);
                let op = inner.next()?;
                let op = op.as_str().parse().map_err(|_| unexpected(&op))?;
                let operand = self.term(inner.next()?)?;
                Ok(Expr::Unary(Unary {
                    op,
                    operand: Box::new(operand),
                }))
            }
            Rule::literal => literal(pair).map(Expr::Literal),
            Rule::identifier => self.identifier(pair).map(Expr::Ident),
            _ => Err(unexpected(&pair)),
        }
    }

    fn function(&mut self, pair: Pair<Rule>) -> Result<Function, ParseError> {
        let mut inner = Inner::new(pair);
        let name = inner.next()?;
        if !BUILTIN_FUNCTIONS.contains(&name.as_str()) {
            let (line, column) = name.line_col();
            return Err(ParseError::UnknownFunction {
                name: name.as_str().to_string(),
                line,
                column,
            });
        }

        let params = inner
            .pairs
            .map(|p| self.expr(p))
            .collect::<Result<_, _>>()?;

        Ok(Function {
            name: name.as_str().into(),
            params,
        })
    }

    fn identifier(&mut self, pair: Pair<Rule>) -> Result<IdentId, ParseError> {
        if pair.as_rule() != Rule::identifier {
            return Err(unexpected(&pair));
        }

        let mut ident = Identifier {
            name: SmolStr::default(),
            index: None,
            swizzle: None,
        };
        for p in pair.into_inner() {
            match p.as_rule() {
                Rule::name => ident.name = p.as_str().into(),
                Rule::array_index => {
                    let number = Inner::new(p).next()?;
                    ident.index = Some(number.as_str().parse().map_err(|_| invalid_literal(&number))?);
                }
                Rule::swizzle => ident.swizzle = Some(p.as_str().trim_start_matches('.').into()),
                _ => return Err(unexpected(&p)),
            }
        }

        Ok(self.idents.insert(ident))
    }
}

fn literal(pair: Pair<Rule>) -> Result<Literal, ParseError> {
    let pair = Inner::new(pair).next()?;
    let text = pair.as_str();
    match pair.as_rule() {
        Rule::float => text
            .parse()
            .map(|value| {
                Literal::Float(FloatLiteral {
                    value,
                    text: Some(text.into()),
                })
            })
            .map_err(|_| invalid_literal(&pair)),
        Rule::int => text
            .parse()
            .map(Literal::Int)
            .map_err(|_| invalid_literal(&pair)),
        Rule::bool => Ok(Literal::Bool(text == "true")),
        _ => Err(unexpected(&pair)),
    }
}

fn type_name(pair: &Pair<Rule>) -> Result<TypeName, ParseError> {
    pair.as_str().parse().map_err(|_| unexpected(pair))
}

fn binary_op(pair: &Pair<Rule>) -> Result<BinaryOp, ParseError> {
    pair.as_str().parse().map_err(|_| unexpected(pair))
}

#[derive(Parser)]
#[grammar = "glsl.pest"]
struct GlslParser;
