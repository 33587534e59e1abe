//! C source generation
//!
//! Uses four-space indentation. Expressions get the fewest parentheses
//! that preserve the tree's structure under C's precedence rules.

use ctree_ast::{Node, NodeId, Op, Tree};
use ctree_types::{Type, TypeRegistry, Value};

use crate::precedence::{node_class, PrecedenceClass};
use crate::{CodegenError, RenderRules, Result};

/// Helper to generate indentation string (four spaces per level).
pub fn indent_str(level: usize) -> String {
    "    ".repeat(level)
}

/// Escape bytes for a C string or character literal
fn escape(s: &[u8], quote: u8) -> String {
    let mut result = String::new();
    for &b in s {
        match b {
            b'\\' => result.push_str("\\\\"),
            b'\n' => result.push_str("\\n"),
            b'\t' => result.push_str("\\t"),
            b'\r' => result.push_str("\\r"),
            b'\0' => result.push_str("\\0"),
            _ if b == quote => {
                result.push('\\');
                result.push(b as char);
            }
            0x20..=0x7e => result.push(b as char),
            _ => result.push_str(&format!("\\{:03o}", b)),
        }
    }
    result
}

fn float_literal(v: f64, suffix: &str) -> String {
    if v.is_nan() {
        "NAN".to_string()
    } else if v.is_infinite() {
        let s = if v > 0.0 { "INFINITY" } else { "-INFINITY" };
        s.to_string()
    } else {
        // Debug formatting always keeps a `.` or an exponent
        format!("{:?}{}", v, suffix)
    }
}

/// C literal for a constant value
pub fn literal(value: &Value) -> String {
    match *value {
        // no C literal spells LONG_MIN: the magnitude overflows `long`
        Value::Int(i64::MIN) => format!("({}L - 1)", i64::MIN + 1),
        Value::Int(v) => v.to_string(),
        Value::UInt(v) => format!("{}u", v),
        Value::Double(v) => float_literal(v, ""),
        Value::Float(v) => {
            if v.is_finite() {
                format!("{:?}f", v)
            } else {
                float_literal(v as f64, "")
            }
        }
        Value::Char(c) => format!("'{}'", escape(&[c], b'\'')),
        Value::Bool(b) => if b { "1" } else { "0" }.to_string(),
    }
}

/// Renders nodes of one tree
pub struct CodeGenerator<'a> {
    tree: &'a Tree,
    registry: &'a TypeRegistry,
    rules: &'a RenderRules,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(tree: &'a Tree, registry: &'a TypeRegistry, rules: &'a RenderRules) -> Self {
        Self {
            tree,
            registry,
            rules,
        }
    }

    pub fn tree(&self) -> &'a Tree {
        self.tree
    }

    pub fn registry(&self) -> &'a TypeRegistry {
        self.registry
    }

    /// Render `id` at the top level. A statement gets no terminator.
    pub fn render(&self, id: NodeId) -> Result<String> {
        self.render_at(id, 0)
    }

    /// Render `id` assuming its first line starts at `indent`
    pub fn render_at(&self, id: NodeId, indent: usize) -> Result<String> {
        let node = self.tree.node(id)?;
        let text = self.render_node(id, node, indent)?;
        if self.needs_parens(id, node) {
            Ok(format!("({})", text))
        } else {
            Ok(text)
        }
    }

    fn render_node(&self, id: NodeId, node: &Node, indent: usize) -> Result<String> {
        let text = match node {
            Node::Project { files } => files
                .iter()
                .map(|&f| self.render_at(f, indent))
                .collect::<Result<Vec<_>>>()?
                .join("\n"),
            Node::File { name, body } => {
                format!("// <file: {}.c>\n{}", name, self.statements(body, indent)?)
            }

            Node::Return { value: None } => "return".to_string(),
            Node::Return { value: Some(value) } => format!("return {}", self.render_at(*value, indent)?),
            Node::If { cond, then, elze } => {
                let mut s = format!(
                    "if ({}) {}",
                    self.render_at(*cond, indent)?,
                    self.body(*then, indent)?
                );
                if let Some(elze) = elze {
                    s.push_str(" else ");
                    if matches!(self.tree.node(*elze)?, Node::If { .. }) {
                        s.push_str(&self.render_at(*elze, indent)?);
                    } else {
                        s.push_str(&self.body(*elze, indent)?);
                    }
                }
                s
            }
            Node::While { cond, body } => format!(
                "while ({}) {}",
                self.render_at(*cond, indent)?,
                self.body(*body, indent)?
            ),
            Node::DoWhile { body, cond } => format!(
                "do {} while ({})",
                self.body(*body, indent)?,
                self.render_at(*cond, indent)?
            ),
            Node::For {
                init,
                test,
                incr,
                body,
            } => {
                let init = self.optional(*init, indent)?;
                let test = self.optional(*test, indent)?;
                let incr = self.optional(*incr, indent)?;
                let spaced = |s: String| if s.is_empty() { s } else { format!(" {}", s) };
                format!(
                    "for ({};{};{}) {}",
                    init,
                    spaced(test),
                    spaced(incr),
                    self.body(*body, indent)?
                )
            }
            Node::Block { body } => self.block(body, indent)?,
            Node::Break => "break".to_string(),
            Node::Continue => "continue".to_string(),
            Node::Pass => String::new(),
            Node::FunctionDecl {
                return_type,
                name,
                params,
                defn,
                is_static,
                is_inline,
            } => {
                let mut s = String::new();
                if *is_static {
                    s.push_str("static ");
                }
                if *is_inline {
                    s.push_str("inline ");
                }
                let params = params
                    .iter()
                    .map(|&p| self.render_at(p, indent))
                    .collect::<Result<Vec<_>>>()?;
                s.push_str(&format!(
                    "{} {}({})",
                    self.registry.spell(return_type)?,
                    name,
                    params.join(", ")
                ));
                if let Some(defn) = defn {
                    s.push(' ');
                    s.push_str(&self.body(*defn, indent)?);
                }
                s
            }

            Node::UnaryOp { op, arg } => {
                let arg = self.render_at(*arg, indent)?;
                if op.is_postfix() {
                    format!("{} {}", arg, op)
                } else {
                    format!("{} {}", op, arg)
                }
            }
            Node::BinaryOp { left, op, right } => {
                let l = self.render_at(*left, indent)?;
                let r = self.render_at(*right, indent)?;
                match op {
                    Op::ArrayRef => format!("{}[{}]", l, r),
                    Op::Dot | Op::Arrow => format!("{}{}{}", l, op, r),
                    Op::Comma => format!("{}, {}", l, r),
                    _ => format!("{} {} {}", l, op, r),
                }
            }
            Node::AugAssign { target, op, value } => format!(
                "{} {}= {}",
                self.render_at(*target, indent)?,
                op,
                self.render_at(*value, indent)?
            ),
            Node::TernaryOp { cond, then, elze } => format!(
                "{} ? {} : {}",
                self.render_at(*cond, indent)?,
                self.render_at(*then, indent)?,
                self.render_at(*elze, indent)?
            ),
            Node::Cast { ty, value } => format!(
                "({}) {}",
                self.registry.spell(ty)?,
                self.render_at(*value, indent)?
            ),
            Node::FunctionCall { func, args, .. } => format!(
                "{}({})",
                self.render_at(*func, indent)?,
                self.list(args, indent)?
            ),
            Node::ArrayDef { target, size, body } => format!(
                "{}[{}] = {{{}}}",
                self.render_at(*target, indent)?,
                self.render_at(*size, indent)?,
                self.list(body, indent)?
            ),
            Node::Constant { value } => literal(value),
            Node::String { value } => format!("\"{}\"", escape(value.as_bytes(), b'"')),
            Node::SymbolRef { name, ty, is_const } => match ty {
                Some(ty) => {
                    let decl = self.declaration(ty, name)?;
                    if *is_const {
                        format!("const {}", decl)
                    } else {
                        decl
                    }
                }
                None => name.clone(),
            },

            Node::Include { target, system: true } => format!("#include <{}>", target),
            Node::Include { target, system: false } => format!("#include \"{}\"", target),
            Node::Comment { text } => {
                let sep = format!("\n{}", indent_str(indent));
                text.lines()
                    .map(|line| format!("// {}", line).trim_end().to_string())
                    .collect::<Vec<_>>()
                    .join(&sep)
            }
            Node::Custom { kind, .. } => {
                let rule = self.rules.get(kind).ok_or_else(|| CodegenError::NoRenderRule {
                    kind: kind.clone(),
                    id,
                })?;
                (rule.render)(self, id, indent)?
            }
        };
        Ok(text)
    }

    /// `type name`, or `ret (*name)(args)` for function types
    fn declaration(&self, ty: &Type, name: &str) -> Result<String> {
        let spelled = self.registry.spell(ty)?;
        if matches!(ty, Type::FuncType { .. }) && spelled.contains("(*)") {
            Ok(spelled.replacen("(*)", &format!("(*{})", name), 1))
        } else {
            Ok(format!("{} {}", spelled, name))
        }
    }

    fn optional(&self, id: Option<NodeId>, indent: usize) -> Result<String> {
        match id {
            Some(id) => self.render_at(id, indent),
            None => Ok(String::new()),
        }
    }

    fn list(&self, ids: &[NodeId], indent: usize) -> Result<String> {
        let items = ids
            .iter()
            .map(|&id| self.render_at(id, indent))
            .collect::<Result<Vec<_>>>()?;
        Ok(items.join(", "))
    }

    /// One line per statement at `indent`, each terminated as needed
    pub fn statements(&self, stmts: &[NodeId], indent: usize) -> Result<String> {
        let mut body = String::new();
        for &stmt in stmts {
            body.push_str(&indent_str(indent));
            body.push_str(&self.render_at(stmt, indent)?);
            if !self.is_self_terminating(self.tree.node(stmt)?) {
                body.push(';');
            }
            body.push('\n');
        }
        Ok(body)
    }

    /// A braced block whose statements sit one level deeper than `indent`
    pub fn block(&self, stmts: &[NodeId], indent: usize) -> Result<String> {
        if stmts.is_empty() {
            return Ok("{}".to_string());
        }
        Ok(format!(
            "{{\n{}{}}}",
            self.statements(stmts, indent + 1)?,
            indent_str(indent)
        ))
    }

    /// Loop and branch bodies are always braced
    fn body(&self, id: NodeId, indent: usize) -> Result<String> {
        match self.tree.node(id)? {
            Node::Block { body } => self.block(body, indent),
            _ => self.block(&[id], indent),
        }
    }

    pub fn is_self_terminating(&self, node: &Node) -> bool {
        match node {
            Node::Block { .. }
            | Node::If { .. }
            | Node::While { .. }
            | Node::For { .. }
            | Node::Include { .. }
            | Node::Comment { .. } => true,
            Node::FunctionDecl { defn, .. } => defn.is_some(),
            Node::Custom { kind, .. } => self.rules.get(kind).is_some_and(|r| r.self_terminating),
            _ => false,
        }
    }

    fn needs_parens(&self, id: NodeId, node: &Node) -> bool {
        let Some(class) = node_class(node) else {
            return false;
        };
        let Some(parent_node) = self.tree.parent(id).and_then(|p| self.tree.get(p)) else {
            return false;
        };

        match parent_node {
            Node::FunctionCall { func, .. } => {
                return if *func == id {
                    class < PrecedenceClass::Postfix
                } else {
                    class == PrecedenceClass::Comma
                };
            }
            Node::ArrayDef { body, .. } => {
                return class == PrecedenceClass::Comma && body.contains(&id);
            }
            Node::BinaryOp {
                op: Op::ArrayRef,
                right,
                ..
            } if *right == id => return false,
            Node::TernaryOp { then, .. } if *then == id => return false,
            _ => {}
        }

        let Some(parent_class) = node_class(parent_node) else {
            return false;
        };
        let not_last_child = match parent_node {
            Node::UnaryOp { .. } | Node::Cast { .. } => true,
            Node::BinaryOp { left, .. } => *left == id,
            Node::AugAssign { target, .. } => *target == id,
            Node::TernaryOp { elze, .. } => *elze != id,
            _ => false,
        };
        class < parent_class
            || (class == parent_class && parent_class.is_left_associative() != not_last_child)
    }
}
