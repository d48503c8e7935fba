use crate::ast::visitor::Visitor;
use crate::ast::*;

/// Prints a tree as S-expressions, one statement per line. Temporaries print
/// as `$N`.
pub struct SExprFormatter {
    output: String,
    indent: usize,
}

impl Default for SExprFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl SExprFormatter {
    pub fn new() -> Self {
        Self {
            output: String::new(),
            indent: 0,
        }
    }

    pub fn finish(self) -> String {
        self.output
    }

    fn write(&mut self, s: &str) {
        self.output.push_str(s);
    }

    fn newline(&mut self) {
        self.output.push('\n');
        for _ in 0..self.indent {
            self.output.push_str("  ");
        }
    }

    fn block<'ast>(&mut self, label: &str, stmts: &'ast [StmtId<'ast>]) {
        self.indent += 1;
        self.newline();
        self.write("(");
        self.write(label);
        self.indent += 1;
        for stmt in stmts {
            self.newline();
            self.visit_stmt(stmt);
        }
        self.indent -= 2;
        self.write(")");
    }
}

impl<'ast> Visitor<'ast> for SExprFormatter {
    fn visit_module(&mut self, module: &'ast Module<'ast>) {
        self.write("(module");
        self.indent += 1;
        for stmt in module.statements {
            self.newline();
            self.visit_stmt(stmt);
        }
        self.indent -= 1;
        self.write(")");
    }

    fn visit_stmt(&mut self, stmt: StmtId<'ast>) {
        match stmt {
            Stmt::Expression { expr, .. } => {
                self.write("(expr ");
                self.visit_expr(expr);
                self.write(")");
            }
            Stmt::Assign { target, value, .. } => {
                self.write("(assign ");
                self.visit_expr(target);
                self.write(" ");
                self.visit_expr(value);
                self.write(")");
            }
            Stmt::AugAssign { target, op, value, .. } => {
                self.write("(aug-assign ");
                self.write(op.symbol());
                self.write(" ");
                self.visit_expr(target);
                self.write(" ");
                self.visit_expr(value);
                self.write(")");
            }
            Stmt::CoalesceAssign { target, value, .. } => {
                self.write("(coalesce-assign ");
                self.visit_expr(target);
                self.write(" ");
                self.visit_expr(value);
                self.write(")");
            }
            Stmt::If { test, body, orelse, .. } => {
                self.write("(if ");
                self.visit_expr(test);
                self.block("then", body);
                if !orelse.is_empty() {
                    self.block("else", orelse);
                }
                self.write(")");
            }
            Stmt::While { test, body, .. } => {
                self.write("(while ");
                self.visit_expr(test);
                self.block("body", body);
                self.write(")");
            }
            Stmt::Assert { test, message, .. } => {
                self.write("(assert ");
                self.visit_expr(test);
                if let Some(message) = message {
                    self.write(" ");
                    self.visit_expr(message);
                }
                self.write(")");
            }
            Stmt::Pass { .. } => self.write("(pass)"),
        }
    }

    fn visit_expr(&mut self, expr: ExprId<'ast>) {
        match expr {
            Expr::Name { name, .. } => self.write(name),
            Expr::Temp { id, .. } => self.write(&format!("${id}")),
            Expr::None { .. } => self.write("None"),
            Expr::Bool { value, .. } => self.write(if *value { "True" } else { "False" }),
            Expr::Integer { value, .. } => self.write(value),
            Expr::Float { value, .. } => self.write(&format!("{value:?}")),
            Expr::String { value, .. } => self.write(&format!("{value:?}")),
            Expr::List { items, .. } => {
                self.write("(list");
                for item in *items {
                    self.write(" ");
                    self.visit_expr(item);
                }
                self.write(")");
            }
            Expr::Dict { entries, .. } => {
                self.write("(dict");
                for (key, value) in *entries {
                    self.write(" (");
                    self.visit_expr(key);
                    self.write(" ");
                    self.visit_expr(value);
                    self.write(")");
                }
                self.write(")");
            }
            Expr::Chain { base, trailers, .. } => {
                self.write("(chain ");
                self.visit_expr(base);
                for trailer in *trailers {
                    self.write(" ");
                    self.visit_trailer(trailer);
                }
                self.write(")");
            }
            Expr::Binary { left, op, right, .. } => {
                self.write("(");
                self.write(op.symbol());
                self.write(" ");
                self.visit_expr(left);
                self.write(" ");
                self.visit_expr(right);
                self.write(")");
            }
            Expr::Unary { op, operand, .. } => {
                self.write("(");
                self.write(op.symbol());
                self.write(" ");
                self.visit_expr(operand);
                self.write(")");
            }
            Expr::Power { base, exponent, .. } => {
                self.write("(** ");
                self.visit_expr(base);
                self.write(" ");
                self.visit_expr(exponent);
                self.write(")");
            }
            Expr::Coalesce { first, rest, .. } => {
                self.write("(?? ");
                self.visit_expr(first);
                for operand in *rest {
                    self.write(" ");
                    self.visit_expr(operand);
                }
                self.write(")");
            }
            Expr::Conditional { test, then, orelse, .. } => {
                self.write("(if ");
                self.visit_expr(test);
                self.write(" ");
                self.visit_expr(then);
                self.write(" ");
                self.visit_expr(orelse);
                self.write(")");
            }
            Expr::Bind { temp, value, .. } => {
                self.write(&format!("(:= ${temp} "));
                self.visit_expr(value);
                self.write(")");
            }
        }
    }

    fn visit_trailer(&mut self, trailer: &'ast Trailer<'ast>) {
        match trailer {
            Trailer::Attribute { name, .. } => {
                self.write("(. ");
                self.write(name);
                self.write(")");
            }
            Trailer::OptionalAttribute { name, .. } => {
                self.write("(?. ");
                self.write(name);
                self.write(")");
            }
            Trailer::Index { index, .. } => {
                self.write("(index ");
                self.visit_expr(index);
                self.write(")");
            }
            Trailer::OptionalIndex { index, .. } => {
                self.write("(?index ");
                self.visit_expr(index);
                self.write(")");
            }
            Trailer::Call { args, .. } => {
                self.write("(call");
                for arg in *args {
                    self.write(" ");
                    self.visit_expr(arg);
                }
                self.write(")");
            }
        }
    }
}

pub fn module_to_sexpr<'ast>(module: &'ast Module<'ast>) -> String {
    let mut formatter = SExprFormatter::new();
    formatter.visit_module(module);
    formatter.finish()
}

pub fn expr_to_sexpr<'ast>(expr: ExprId<'ast>) -> String {
    let mut formatter = SExprFormatter::new();
    formatter.visit_expr(expr);
    formatter.finish()
}
