//! Built-in templates for the generated module tree and build descriptor.

use std::fmt::Write;

use generational_arena::Index;
use itertools::Itertools;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::CodegenConfig;
use crate::domain::NamespaceTree;

/// Template rendering the namespace tree as nested Rust modules.
pub const NAMESPACE_TEMPLATE: &str = "lib.rs";

/// Template rendering the proto paths as a tonic build script.
pub const BUILD_TEMPLATE: &str = "build.rs";

const GENERATED_HEADER: &str = "// This file is @generated by protomods. Do not edit.";
const INDENT: &str = "    ";

/// Data handed to a template.
#[derive(Debug, Clone, Copy)]
pub enum RenderContext<'a> {
    Namespace(&'a NamespaceTree),
    Paths(&'a [String]),
}

impl RenderContext<'_> {
    fn kind(&self) -> &'static str {
        match self {
            Self::Namespace(_) => "namespace tree",
            Self::Paths(_) => "path list",
        }
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("template not found: {0}")]
    TemplateNotFound(String),

    #[error("template '{template}' expects a {expected}, got a {actual}")]
    IncompatibleContext {
        template: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("formatting output failed")]
    Format(#[from] std::fmt::Error),
}

/// Template renderer abstraction.
pub trait Renderer: Send + Sync {
    /// Render the named template with the given context.
    fn render(&self, template: &str, context: &RenderContext<'_>) -> Result<String, RenderError>;
}

/// Renderer with the two compiled-in templates.
#[derive(Debug, Clone, Default)]
pub struct BuiltinRenderer {
    codegen: CodegenConfig,
}

impl BuiltinRenderer {
    pub fn new(codegen: CodegenConfig) -> Self {
        Self { codegen }
    }

    fn render_namespace(&self, tree: &NamespaceTree) -> Result<String, RenderError> {
        let mut out = String::new();
        writeln!(out, "{GENERATED_HEADER}")?;
        for child in tree.node(tree.root()).map(|n| n.children.as_slice()).unwrap_or_default() {
            writeln!(out)?;
            self.render_module(tree, *child, 0, &mut out)?;
        }
        Ok(out)
    }

    fn render_module(
        &self,
        tree: &NamespaceTree,
        idx: Index,
        level: usize,
        out: &mut String,
    ) -> Result<(), RenderError> {
        let Some(node) = tree.node(idx) else {
            return Ok(());
        };
        let indent = INDENT.repeat(level);

        writeln!(out, "{indent}pub mod {} {{", escape_module_name(&node.name))?;
        for &child in &node.children {
            self.render_module(tree, child, level + 1, out)?;
        }
        if let Some(package) = &node.package {
            writeln!(
                out,
                "{indent}{INDENT}{}!(\"{}\");",
                self.codegen.include_macro, package
            )?;
        }
        writeln!(out, "{indent}}}")?;
        Ok(())
    }

    fn render_build(&self, paths: &[String]) -> Result<String, RenderError> {
        let mut out = String::new();
        writeln!(out, "{GENERATED_HEADER}")?;
        writeln!(out)?;
        writeln!(out, "fn main() -> Result<(), Box<dyn std::error::Error>> {{")?;
        writeln!(out, "{INDENT}tonic_build::configure()")?;
        writeln!(out, "{INDENT}{INDENT}.build_server({})", self.codegen.build_server)?;
        writeln!(out, "{INDENT}{INDENT}.compile_protos(")?;
        writeln!(out, "{INDENT}{INDENT}{INDENT}&[")?;
        for path in paths {
            writeln!(out, "{INDENT}{INDENT}{INDENT}{INDENT}{path:?},")?;
        }
        writeln!(out, "{INDENT}{INDENT}{INDENT}],")?;
        let includes = self
            .codegen
            .include_dirs
            .iter()
            .map(|dir| format!("{dir:?}"))
            .join(", ");
        writeln!(out, "{INDENT}{INDENT}{INDENT}&[{includes}],")?;
        writeln!(out, "{INDENT}{INDENT})?;")?;
        writeln!(out, "{INDENT}Ok(())")?;
        writeln!(out, "}}")?;
        Ok(out)
    }
}

impl Renderer for BuiltinRenderer {
    #[instrument(level = "debug", skip(self, context))]
    fn render(&self, template: &str, context: &RenderContext<'_>) -> Result<String, RenderError> {
        let rendered = match (template, context) {
            (NAMESPACE_TEMPLATE, RenderContext::Namespace(tree)) => self.render_namespace(tree)?,
            (BUILD_TEMPLATE, RenderContext::Paths(paths)) => self.render_build(paths)?,
            (NAMESPACE_TEMPLATE, other) => {
                return Err(RenderError::IncompatibleContext {
                    template: template.to_string(),
                    expected: "namespace tree",
                    actual: other.kind(),
                })
            }
            (BUILD_TEMPLATE, other) => {
                return Err(RenderError::IncompatibleContext {
                    template: template.to_string(),
                    expected: "path list",
                    actual: other.kind(),
                })
            }
            _ => return Err(RenderError::TemplateNotFound(template.to_string())),
        };
        debug!("render: {} -> {} bytes", template, rendered.len());
        Ok(rendered)
    }
}

/// Turn a package segment into a usable module name.
///
/// Keywords become raw identifiers; the few keywords that cannot be raw
/// identifiers get a trailing underscore instead.
pub fn escape_module_name(segment: &str) -> String {
    match segment {
        // 2015 strict keywords
        "as" | "break" | "const" | "continue" | "else" | "enum" | "false" | "fn" | "for"
        | "if" | "impl" | "in" | "let" | "loop" | "match" | "mod" | "move" | "mut" | "pub"
        | "ref" | "return" | "static" | "struct" | "trait" | "true" | "type" | "unsafe"
        | "use" | "where" | "while"
        // 2018 strict keywords
        | "dyn"
        // reserved keywords
        | "abstract" | "become" | "box" | "do" | "final" | "macro" | "override" | "priv"
        | "typeof" | "unsized" | "virtual" | "yield" | "async" | "await" | "try" | "gen" => {
            format!("r#{segment}")
        }
        "self" | "super" | "extern" | "crate" => format!("{segment}_"),
        _ => segment.to_string(),
    }
}
