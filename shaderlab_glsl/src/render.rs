//! Convert a [Program] back to GLSL text.
use crate::ast::*;

#[derive(Debug, Default, Clone, Copy)]
pub struct BuildOptions<'a> {
    /// Replace the original `#version` number.
    pub version_override: Option<u32>,
    /// Written to a `// KEYWORDS` comment on the first line.
    /// Uses the program's own keywords if empty.
    pub keywords: &'a [String],
}

impl Program {
    /// Render the program with one statement per line and tabs for indentation.
    /// The output is the same for the same program and options.
    pub fn to_glsl(&self, options: &BuildOptions) -> String {
        let mut output = String::new();
        let keywords = if options.keywords.is_empty() {
            self.keywords.as_slice()
        } else {
            options.keywords
        };
        if !keywords.is_empty() {
            output += &format!("// KEYWORDS {}\n", keywords.join(" "));
        }
        output += &format!(
            "#version {}\n",
            options.version_override.unwrap_or(self.version)
        );

        for declaration in &self.injected {
            output += declaration;
            output += "\n";
        }
        for declaration in &self.declarations {
            output += &self.declaration_glsl(declaration);
            output += "\n";
        }

        output += "void main()\n{\n";
        self.write_statements(&mut output, &self.main, 1);
        output += "}\n";
        output
    }

    pub fn declaration_glsl(&self, declaration: &Declaration) -> String {
        match declaration {
            Declaration::Define(Define { dest, src }) => {
                format!("#define {} {}", self.idents.get(*dest), self.idents.get(*src))
            }
            Declaration::Declare(declare) => {
                let mut output = String::new();
                if let Some(qualifier) = declare.qualifier {
                    output += &format!("{qualifier} ");
                }
                output += &format!("{} {}", declare.ty, self.idents.get(declare.ident));
                match &declare.value {
                    Some(Initializer::Assignment(assignment)) => {
                        let values: Vec<_> = assignment
                            .values
                            .iter()
                            .map(|v| match v {
                                Value::Ident(id) => self.idents.get(*id).to_string(),
                                Value::Literal(l) => l.to_string(),
                            })
                            .collect();
                        output += &format!(" = {}({})", assignment.ty, values.join(", "));
                    }
                    Some(Initializer::Literal(literal)) => output += &format!(" = {literal}"),
                    None => (),
                }
                output += ";";
                output
            }
        }
    }

    pub fn expr_glsl(&self, expr: &Expr) -> String {
        match expr {
            Expr::Ident(id) => self.idents.get(*id).to_string(),
            Expr::Literal(literal) => literal.to_string(),
            Expr::Function(function) => self.function_glsl(function),
            Expr::Unary(Unary { op, operand }) => format!("{op}{}", self.expr_glsl(operand)),
            Expr::Binary(Binary {
                op,
                left,
                right,
                parenthesized,
            }) => {
                let text = format!("{} {op} {}", self.expr_glsl(left), self.expr_glsl(right));
                if *parenthesized {
                    format!("({text})")
                } else {
                    text
                }
            }
            Expr::Ternary(Ternary {
                condition,
                when_true,
                when_false,
            }) => format!(
                "(({}) ? {} : {})",
                self.expr_glsl(condition),
                self.expr_glsl(when_true),
                self.expr_glsl(when_false)
            ),
        }
    }

    fn function_glsl(&self, function: &Function) -> String {
        let params: Vec<_> = function.params.iter().map(|p| self.expr_glsl(p)).collect();
        format!("{}({})", function.name, params.join(", "))
    }

    fn write_statements(&self, output: &mut String, statements: &[Statement], level: usize) {
        let indent = "\t".repeat(level);
        for statement in statements {
            match statement {
                Statement::Instruction(Instruction { target, expr }) => {
                    *output += &format!(
                        "{indent}{} = {};\n",
                        self.idents.get(*target),
                        self.expr_glsl(expr)
                    );
                }
                Statement::If(IfBlock {
                    condition,
                    then_block,
                    else_block,
                }) => {
                    *output += &format!("{indent}if ({}) {{\n", self.expr_glsl(condition));
                    self.write_statements(output, then_block, level + 1);
                    if let Some(else_block) = else_block {
                        *output += &format!("{indent}}} else {{\n");
                        self.write_statements(output, else_block, level + 1);
                    }
                    *output += &format!("{indent}}}\n");
                }
                Statement::InlineIf(InlineIf { condition, command }) => {
                    *output += &format!(
                        "{indent}if ({}) {command};\n",
                        self.function_glsl(condition)
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn rebuild(text: &str) -> String {
        Program::parse(text)
            .unwrap()
            .to_glsl(&BuildOptions::default())
    }

    #[test]
    fn render_declare_instruction() {
        let text = indoc! {"
            #version 300
            float a;
            void main()
            {
            	b = a;
            }
        "};
        assert_eq!(text, rebuild(text));
    }

    #[test]
    fn render_ternary() {
        let text = indoc! {"
            #version 120
            void main()
            {
            	c = ((a > b) ? a : b);
            }
        "};
        assert_eq!(text, rebuild(text));
    }

    #[test]
    fn render_float_literals_verbatim() {
        let text = indoc! {"
            #version 120
            const float a = 0.500;
            void main()
            {
            	r0 = vec4(1.0e-05, 0.500, -2.50, 1.0);
            	r1 = r0 * -2.50;
            }
        "};
        assert_eq!(text, rebuild(text));
    }

    #[test]
    fn render_normalized_whitespace() {
        let text = indoc! {"
            #version 120
            uniform   vec4 a;

            void main() {
                r0=(a+b)*c;
                if (r0.x<0.0) { discard_value = r0; } else { r1 = -max(r0, a); }
            }
        "};

        assert_eq!(
            indoc! {"
                #version 120
                uniform vec4 a;
                void main()
                {
                	r0 = (a + b) * c;
                	if (r0.x < 0.0) {
                		discard_value = r0;
                	} else {
                		r1 = -max(r0, a);
                	}
                }
            "},
            rebuild(text)
        );
    }

    #[test]
    fn render_nested_blocks() {
        let text = indoc! {"
            #version 120
            #define t0 gl_TexCoord[0]
            uniform sampler2D ps_s0;
            void main()
            {
            	if (any(lessThan(t0, vec4(0.0)))) discard;
            	if (t0.x >= 0.5) {
            		r0 = texture2D(ps_s0, t0.xy);
            		if (r0.w == 0.0) {
            			r0 = vec4(1.0, 0.0, 0.0, 1.0);
            		}
            	}
            	gl_FragColor = r0;
            }
        "};
        assert_eq!(text, rebuild(text));
    }

    #[test]
    fn render_keywords_version_override() {
        let program = Program::parse(indoc! {"
            #version 300
            void main()
            {
            	r0 = r1;
            }
        "})
        .unwrap();

        let keywords = vec!["DIRECTIONAL".to_string(), "FOG_LINEAR".to_string()];
        assert_eq!(
            indoc! {"
                // KEYWORDS DIRECTIONAL FOG_LINEAR
                #version 100
                void main()
                {
                	r0 = r1;
                }
            "},
            program.to_glsl(&BuildOptions {
                version_override: Some(100),
                keywords: &keywords
            })
        );
    }

    #[test]
    fn render_parsed_keywords() {
        let text = indoc! {"
            // KEYWORDS SHADOWS_SCREEN LIGHTMAP_OFF
            #version 120
            void main()
            {
            	r0 = r1;
            }
        "};
        assert_eq!(text, rebuild(text));
    }

    #[test]
    fn render_keywords_override_parsed_keywords() {
        let program = Program::parse(indoc! {"
            // KEYWORDS FOG_LINEAR
            #version 120
            void main()
            {
            	r0 = r1;
            }
        "})
        .unwrap();

        let keywords = vec!["FOG_EXP2".to_string()];
        assert!(
            program
                .to_glsl(&BuildOptions {
                    version_override: None,
                    keywords: &keywords
                })
                .starts_with("// KEYWORDS FOG_EXP2\n#version 120\n")
        );
    }

    #[test]
    fn render_injected_declarations_first() {
        let mut program = Program::parse(indoc! {"
            #version 120
            const vec4 c0 = vec4(0.0, 0.5, 1.0, 2.0);
            void main()
            {
            	r0 = c0;
            }
        "})
        .unwrap();
        program.injected = vec!["uniform vec4 _Color;".to_string()];

        assert_eq!(
            indoc! {"
                #version 120
                uniform vec4 _Color;
                const vec4 c0 = vec4(0.0, 0.5, 1.0, 2.0);
                void main()
                {
                	r0 = c0;
                }
            "},
            program.to_glsl(&BuildOptions::default())
        );
    }

    #[test]
    fn render_idempotent() {
        let text = indoc! {"
            #version 120
            attribute vec4 vs_v0;
            void main() { r0 = (vs_v0 * 2.0) - -1.0; gl_Position = r0.xyzw; }
        "};

        let first = rebuild(text);
        assert_eq!(first, rebuild(&first));
    }
}
