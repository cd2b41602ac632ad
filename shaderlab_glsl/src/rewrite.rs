//! Apply a [SymbolMapping] to a parsed [Program].
use smol_str::format_smolstr;

use crate::{
    ast::{Declaration, Program, Qualifier},
    remap::{Mapping, RemapError, SymbolMapping},
};

impl Program {
    /// Rename mapped identifiers and replace the declarations they supersede.
    ///
    /// Texture coordinate defines without a mapping are added to `mapping` as varyings.
    /// The mapping's declarations are stored in [injected](#structfield.injected).
    pub fn apply_mapping(&mut self, mapping: &mut SymbolMapping) -> Result<(), RemapError> {
        for varying in self.texcoord_varyings(mapping) {
            mapping.insert(varying)?;
        }

        let idents = &self.idents;
        self.declarations.retain(|d| match d {
            Declaration::Define(define) => !mapping.contains(&idents.get(define.dest).name),
            Declaration::Declare(declare) => {
                let superseded = matches!(
                    declare.qualifier,
                    Some(Qualifier::Uniform | Qualifier::Attribute | Qualifier::Varying)
                );
                !(superseded && mapping.contains(&idents.get(declare.ident).name))
            }
        });

        // Find all handles before renaming in case a new name is also a mapped id.
        let renames: Vec<_> = mapping
            .iter()
            .filter(|m| self.idents.contains(&m.id))
            .map(|m| (self.idents.handles(&m.id).to_vec(), m))
            .collect();
        for (handles, m) in renames {
            self.idents.rename(&handles, &m.name, m.element);
        }

        self.injected = mapping.declarations();
        Ok(())
    }

    /// Varyings for `#define` aliases of `gl_TexCoord[N]` missing from `mapping`.
    fn texcoord_varyings(&self, mapping: &SymbolMapping) -> Vec<Mapping> {
        self.declarations
            .iter()
            .filter_map(|declaration| match declaration {
                Declaration::Define(define) => {
                    let dest = self.idents.get(define.dest);
                    let src = self.idents.get(define.src);
                    match (mapping.contains(&dest.name), src.name.as_str(), src.index) {
                        (false, "gl_TexCoord", Some(index)) => {
                            let name = format_smolstr!("_TexCoord{index}");
                            Some(Mapping {
                                id: dest.name.clone(),
                                declaration: Some(format!("varying vec2 {name};")),
                                name,
                                element: None,
                            })
                        }
                        _ => None,
                    }
                }
                Declaration::Declare(_) => None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{
        disassembler::{DisassembledProgram, Output, RegisterSet, Symbol, Uniform, UniformType, Usage},
        render::BuildOptions,
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use shaderlab_lib::subprogram::Stage;

    fn normalize(program: &DisassembledProgram, stage: Stage) -> String {
        let mut mapping = SymbolMapping::from_program(program, stage).unwrap();
        let mut ast = Program::parse(&program.text).unwrap();
        ast.apply_mapping(&mut mapping).unwrap();
        ast.to_glsl(&BuildOptions::default())
    }

    #[test]
    fn rename_vertex_matrix() {
        let program = DisassembledProgram {
            symbols: vec![Symbol {
                name: "unity_ObjectToWorld".to_string(),
                register_set: RegisterSet::Float4,
                register_index: 0,
            }],
            uniforms: vec![Uniform {
                name: "vs_uniforms_vec4".to_string(),
                ty: UniformType::Float,
                array_count: 4,
                index: 0,
                constant_slot: -1,
            }],
            outputs: vec![Output {
                name: "gl_Position".to_string(),
                usage: Usage::Position,
                index: 0,
            }],
            text: indoc! {"
                #version 120
                uniform vec4 vs_uniforms_vec4[4];
                #define vs_c0 vs_uniforms_vec4[0]
                #define vs_c1 vs_uniforms_vec4[1]
                #define vs_c3 vs_uniforms_vec4[3]
                attribute vec4 vs_v0;
                void main()
                {
                	gl_Position = vs_v0.x * vs_c0;
                	gl_Position = gl_Position + vs_v0.y * vs_c1;
                	gl_Position = gl_Position + vs_c3;
                }
            "}
            .to_string(),
            ..Default::default()
        };

        assert_eq!(
            indoc! {"
                #version 120
                uniform mat4 unity_ObjectToWorld;
                uniform vec4 uniform_vs_uniforms_vec4;
                attribute vec4 vs_v0;
                void main()
                {
                	gl_Position = vs_v0.x * unity_ObjectToWorld[0];
                	gl_Position = gl_Position + vs_v0.y * unity_ObjectToWorld[1];
                	gl_Position = gl_Position + unity_ObjectToWorld[3];
                }
            "},
            normalize(&program, Stage::Vertex)
        );
    }

    #[test]
    fn rename_fragment_sampler_and_color() {
        let program = DisassembledProgram {
            symbols: vec![
                Symbol {
                    name: "_MainTex".to_string(),
                    register_set: RegisterSet::Sampler,
                    register_index: 0,
                },
                Symbol {
                    name: "_Color".to_string(),
                    register_set: RegisterSet::Float4,
                    register_index: 0,
                },
            ],
            outputs: vec![Output {
                name: "ps_oC0".to_string(),
                usage: Usage::Color,
                index: 0,
            }],
            text: indoc! {"
                #version 120
                uniform vec4 ps_uniforms_vec4[1];
                uniform sampler2D ps_s0;
                #define ps_c0 ps_uniforms_vec4[0]
                #define ps_t0 gl_TexCoord[0]
                #define ps_oC0 gl_FragColor
                void main()
                {
                	ps_r0 = texture2D(ps_s0, ps_t0.xy);
                	ps_oC0 = ps_r0 * ps_c0;
                }
            "}
            .to_string(),
            ..Default::default()
        };

        assert_eq!(
            indoc! {"
                #version 120
                uniform sampler2D _MainTex;
                uniform vec4 _Color;
                varying vec2 _TexCoord0;
                uniform vec4 ps_uniforms_vec4[1];
                void main()
                {
                	ps_r0 = texture2D(_MainTex, _TexCoord0.xy);
                	gl_FragColor = ps_r0 * _Color;
                }
            "},
            normalize(&program, Stage::Fragment)
        );
    }

    #[test]
    fn texcoord_define_with_mapping_unchanged() {
        let mut program = Program::parse(indoc! {"
            #version 120
            #define ps_t0 gl_TexCoord[0]
            void main()
            {
            	ps_r0 = ps_t0;
            }
        "})
        .unwrap();
        let mut mapping = SymbolMapping::default();
        mapping
            .insert(Mapping {
                id: "ps_t0".into(),
                name: "uv_varying".into(),
                element: None,
                declaration: Some("varying vec4 uv_varying;".to_string()),
            })
            .unwrap();

        program.apply_mapping(&mut mapping).unwrap();

        assert_eq!(1, mapping.len());
        assert_eq!(
            indoc! {"
                #version 120
                varying vec4 uv_varying;
                void main()
                {
                	ps_r0 = uv_varying;
                }
            "},
            program.to_glsl(&BuildOptions::default())
        );
    }

    #[test]
    fn duplicate_texcoord_define() {
        let mut program = Program::parse(indoc! {"
            #version 120
            #define ps_t0 gl_TexCoord[0]
            #define ps_t0 gl_TexCoord[1]
            void main()
            {
            	ps_r0 = ps_t0;
            }
        "})
        .unwrap();

        assert_eq!(
            Err(RemapError::DuplicateId {
                id: "ps_t0".to_string()
            }),
            program.apply_mapping(&mut SymbolMapping::default())
        );
    }

    #[test]
    fn unmapped_identifiers_unchanged() {
        let text = indoc! {"
            #version 120
            const vec4 ps_c1 = vec4(0.0, 0.5, 1.0, 2.0);
            uniform vec4 ps_c2;
            void main()
            {
            	ps_r0 = ps_c1 + ps_c2;
            }
        "};
        let mut program = Program::parse(text).unwrap();

        program.apply_mapping(&mut SymbolMapping::default()).unwrap();

        assert!(program.injected.is_empty());
        assert_eq!(text, program.to_glsl(&BuildOptions::default()));
    }

    #[test]
    fn const_declaration_not_superseded() {
        let mut program = Program::parse(indoc! {"
            #version 120
            const vec4 ps_c1 = vec4(0.0, 0.5, 1.0, 2.0);
            void main()
            {
            	ps_r0 = ps_c1;
            }
        "})
        .unwrap();
        let mut mapping = SymbolMapping::default();
        mapping
            .insert(Mapping {
                id: "ps_c1".into(),
                name: "_Params".into(),
                element: None,
                declaration: None,
            })
            .unwrap();

        program.apply_mapping(&mut mapping).unwrap();

        assert_eq!(
            indoc! {"
                #version 120
                const vec4 _Params = vec4(0.0, 0.5, 1.0, 2.0);
                void main()
                {
                	ps_r0 = _Params;
                }
            "},
            program.to_glsl(&BuildOptions::default())
        );
    }
}
