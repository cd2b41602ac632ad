//! Replace the disassembler's register names like `vs_c4` with semantic names like `_Color`.
use indexmap::IndexMap;
use log::warn;
use shaderlab_lib::subprogram::Stage;
use smol_str::{format_smolstr, SmolStr};
use thiserror::Error;

use crate::disassembler::{DisassembledProgram, RegisterSet, Usage};

/// Symbols with this prefix are built in matrices that span 4 consecutive registers.
const MATRIX_PREFIX: &str = "unity_";

/// A replacement for a single register id.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Mapping {
    /// The disassembler's name like `vs_c4`.
    pub id: SmolStr,
    pub name: SmolStr,
    /// The matrix row for registers that are part of a `mat4`.
    pub element: Option<u32>,
    /// The GLSL declaration for `name` like `uniform vec4 _Color;`.
    pub declaration: Option<String>,
}

/// Semantic names for register ids in insertion order.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct SymbolMapping {
    mappings: IndexMap<SmolStr, Mapping>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RemapError {
    #[error("unhandled attribute {id} with usage {usage:?}")]
    UnhandledAttribute { id: String, usage: Usage },

    #[error("register {id} is already mapped")]
    DuplicateId { id: String },

    #[error("matrix {name} at register {register_index} exceeds the register range")]
    RegisterOverflow { name: String, register_index: u32 },
}

impl SymbolMapping {
    /// Create the mapping for all symbols, outputs, attributes, and uniforms in `program`.
    pub fn from_program(program: &DisassembledProgram, stage: Stage) -> Result<Self, RemapError> {
        let prefix = match stage {
            Stage::Vertex => "vs",
            Stage::Fragment => "ps",
        };

        let mut mapping = Self::default();

        for symbol in &program.symbols {
            let (register, ty) = match symbol.register_set {
                RegisterSet::Bool => ('c', "bool"),
                RegisterSet::Int4 => ('c', "ivec4"),
                RegisterSet::Float4 => ('c', "vec4"),
                RegisterSet::Sampler => ('s', "sampler2D"),
            };
            let id = format_smolstr!("{prefix}_{register}{}", symbol.register_index);

            if register == 'c' && symbol.name.starts_with(MATRIX_PREFIX) {
                // Each row of the matrix uses its own register.
                mapping.insert(Mapping {
                    id,
                    name: symbol.name.as_str().into(),
                    element: Some(0),
                    declaration: Some(format!("uniform mat4 {};", symbol.name)),
                })?;
                for element in 1..4 {
                    let register = symbol.register_index.checked_add(element).ok_or_else(|| {
                        RemapError::RegisterOverflow {
                            name: symbol.name.clone(),
                            register_index: symbol.register_index,
                        }
                    })?;
                    mapping.insert(Mapping {
                        id: format_smolstr!("{prefix}_c{register}"),
                        name: symbol.name.as_str().into(),
                        element: Some(element),
                        declaration: None,
                    })?;
                }
            } else {
                mapping.insert(Mapping {
                    id,
                    name: symbol.name.as_str().into(),
                    element: None,
                    declaration: Some(format!("uniform {ty} {};", symbol.name)),
                })?;
            }
        }

        for output in &program.outputs {
            let (name, declaration) = match output.usage {
                Usage::Position => ("gl_Position".into(), None),
                Usage::TexCoord => {
                    let name = format_smolstr!("_TexCoord{}", output.index);
                    let declaration = format!("varying vec2 {name};");
                    (name, Some(declaration))
                }
                _ => ("gl_FragColor".into(), None),
            };
            mapping.insert(Mapping {
                id: output.name.as_str().into(),
                name,
                element: None,
                declaration,
            })?;
        }

        for attribute in &program.attributes {
            let name: SmolStr = match attribute.usage {
                Usage::Position => "position".into(),
                Usage::TexCoord if attribute.index == 0 => "uv".into(),
                Usage::TexCoord => format_smolstr!("uv{}", attribute.index + 1),
                usage => {
                    return Err(RemapError::UnhandledAttribute {
                        id: attribute.name.clone(),
                        usage,
                    });
                }
            };
            let declaration = format!("attribute vec2 {name};");
            mapping.insert(Mapping {
                id: attribute.name.as_str().into(),
                name,
                element: None,
                declaration: Some(declaration),
            })?;
        }

        for uniform in &program.uniforms {
            if !mapping.contains(&uniform.name) {
                let name = format_smolstr!("uniform_{}", uniform.name);
                warn!("No symbol for {}. Using placeholder {name}.", uniform.name);

                let declaration = format!("uniform vec4 {name};");
                mapping.insert(Mapping {
                    id: uniform.name.as_str().into(),
                    name,
                    element: None,
                    declaration: Some(declaration),
                })?;
            }
        }

        Ok(mapping)
    }

    pub fn insert(&mut self, mapping: Mapping) -> Result<(), RemapError> {
        if self.mappings.contains_key(&mapping.id) {
            return Err(RemapError::DuplicateId {
                id: mapping.id.to_string(),
            });
        }
        self.mappings.insert(mapping.id.clone(), mapping);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.mappings.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Mapping> {
        self.mappings.get(id)
    }

    /// Mappings in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Mapping> {
        self.mappings.values()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Unique declarations in insertion order.
    pub fn declarations(&self) -> Vec<String> {
        let mut declarations = indexmap::IndexSet::new();
        for declaration in self.iter().filter_map(|m| m.declaration.as_ref()) {
            declarations.insert(declaration.clone());
        }
        declarations.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::disassembler::{Attribute, Output, Symbol, Uniform, UniformType};
    use pretty_assertions::assert_eq;

    fn symbol(name: &str, register_set: RegisterSet, register_index: u32) -> Symbol {
        Symbol {
            name: name.to_string(),
            register_set,
            register_index,
        }
    }

    fn uniform(name: &str, index: u32) -> Uniform {
        Uniform {
            name: name.to_string(),
            ty: UniformType::Float,
            array_count: 0,
            index,
            constant_slot: -1,
        }
    }

    #[test]
    fn matrix_symbol_registers() {
        let program = DisassembledProgram {
            symbols: vec![symbol("unity_ObjectToWorld", RegisterSet::Float4, 0)],
            uniforms: (0..4).map(|i| uniform(&format!("vs_c{i}"), i)).collect(),
            ..Default::default()
        };

        let mapping = SymbolMapping::from_program(&program, Stage::Vertex).unwrap();

        assert_eq!(4, mapping.len());
        assert_eq!(
            vec!["uniform mat4 unity_ObjectToWorld;".to_string()],
            mapping.declarations()
        );
        assert_eq!(
            Some(&Mapping {
                id: "vs_c2".into(),
                name: "unity_ObjectToWorld".into(),
                element: Some(2),
                declaration: None
            }),
            mapping.get("vs_c2")
        );
    }

    #[test]
    fn position_output() {
        let program = DisassembledProgram {
            outputs: vec![Output {
                name: "gl_Position".to_string(),
                usage: Usage::Position,
                index: 0,
            }],
            ..Default::default()
        };

        let mapping = SymbolMapping::from_program(&program, Stage::Vertex).unwrap();

        assert_eq!(
            Some(&Mapping {
                id: "gl_Position".into(),
                name: "gl_Position".into(),
                element: None,
                declaration: None
            }),
            mapping.get("gl_Position")
        );
        assert!(mapping.declarations().is_empty());
    }

    #[test]
    fn texcoord_and_color_outputs() {
        let program = DisassembledProgram {
            outputs: vec![
                Output {
                    name: "vs_o1".to_string(),
                    usage: Usage::TexCoord,
                    index: 1,
                },
                Output {
                    name: "ps_oC0".to_string(),
                    usage: Usage::Color,
                    index: 0,
                },
            ],
            ..Default::default()
        };

        let mapping = SymbolMapping::from_program(&program, Stage::Vertex).unwrap();

        assert_eq!("_TexCoord1", mapping.get("vs_o1").unwrap().name);
        assert_eq!("gl_FragColor", mapping.get("ps_oC0").unwrap().name);
        assert_eq!(
            vec!["varying vec2 _TexCoord1;".to_string()],
            mapping.declarations()
        );
    }

    #[test]
    fn attributes() {
        let attribute = |name: &str, usage, index| Attribute {
            name: name.to_string(),
            usage,
            index,
        };
        let program = DisassembledProgram {
            attributes: vec![
                attribute("vs_v0", Usage::Position, 0),
                attribute("vs_v1", Usage::TexCoord, 0),
                attribute("vs_v2", Usage::TexCoord, 1),
            ],
            ..Default::default()
        };

        let mapping = SymbolMapping::from_program(&program, Stage::Vertex).unwrap();

        assert_eq!(
            vec![
                "attribute vec2 position;".to_string(),
                "attribute vec2 uv;".to_string(),
                "attribute vec2 uv2;".to_string()
            ],
            mapping.declarations()
        );
    }

    #[test]
    fn unhandled_attribute() {
        let program = DisassembledProgram {
            attributes: vec![Attribute {
                name: "vs_v3".to_string(),
                usage: Usage::Normal,
                index: 0,
            }],
            ..Default::default()
        };

        assert_eq!(
            Err(RemapError::UnhandledAttribute {
                id: "vs_v3".to_string(),
                usage: Usage::Normal
            }),
            SymbolMapping::from_program(&program, Stage::Vertex)
        );
    }

    #[test]
    fn samplers_and_placeholders() {
        let program = DisassembledProgram {
            symbols: vec![
                symbol("_MainTex", RegisterSet::Sampler, 0),
                symbol("_Color", RegisterSet::Float4, 0),
                symbol("_Enabled", RegisterSet::Bool, 1),
            ],
            uniforms: vec![uniform("ps_c0", 0), uniform("ps_c3", 3)],
            ..Default::default()
        };

        let mapping = SymbolMapping::from_program(&program, Stage::Fragment).unwrap();

        assert_eq!("_MainTex", mapping.get("ps_s0").unwrap().name);
        assert_eq!("_Color", mapping.get("ps_c0").unwrap().name);
        assert_eq!("uniform_ps_c3", mapping.get("ps_c3").unwrap().name);
        assert_eq!(
            vec![
                "uniform sampler2D _MainTex;".to_string(),
                "uniform vec4 _Color;".to_string(),
                "uniform bool _Enabled;".to_string(),
                "uniform vec4 uniform_ps_c3;".to_string()
            ],
            mapping.declarations()
        );
    }

    #[test]
    fn duplicate_register() {
        let program = DisassembledProgram {
            symbols: vec![
                symbol("unity_MatrixVP", RegisterSet::Float4, 0),
                symbol("_Color", RegisterSet::Float4, 2),
            ],
            ..Default::default()
        };

        assert_eq!(
            Err(RemapError::DuplicateId {
                id: "vs_c2".to_string()
            }),
            SymbolMapping::from_program(&program, Stage::Vertex)
        );
    }

    #[test]
    fn matrix_register_overflow() {
        let program = DisassembledProgram {
            symbols: vec![symbol("unity_MatrixVP", RegisterSet::Float4, u32::MAX - 1)],
            ..Default::default()
        };

        assert_eq!(
            Err(RemapError::RegisterOverflow {
                name: "unity_MatrixVP".to_string(),
                register_index: u32::MAX - 1
            }),
            SymbolMapping::from_program(&program, Stage::Vertex)
        );
    }

    #[test]
    fn distinct_ids_distinct_declarations() {
        let program = DisassembledProgram {
            symbols: vec![
                symbol("unity_ObjectToWorld", RegisterSet::Float4, 0),
                symbol("unity_MatrixVP", RegisterSet::Float4, 4),
                symbol("_MainTex_ST", RegisterSet::Float4, 8),
                symbol("_MainTex", RegisterSet::Sampler, 0),
            ],
            ..Default::default()
        };

        let mapping = SymbolMapping::from_program(&program, Stage::Vertex).unwrap();

        let declarations: Vec<_> = mapping.iter().filter_map(|m| m.declaration.clone()).collect();
        assert_eq!(declarations.len(), mapping.declarations().len());
        assert!(
            mapping
                .iter()
                .filter(|m| m.element.is_some_and(|e| e > 0))
                .all(|m| m.declaration.is_none())
        );
    }
}
