use crate::ast::*;

/// Read-only traversal. Override a `visit_*` method and call the matching
/// `walk_*` function to keep descending.
pub trait Visitor<'ast>: Sized {
    fn visit_module(&mut self, module: &'ast Module<'ast>) {
        walk_module(self, module);
    }

    fn visit_stmt(&mut self, stmt: StmtId<'ast>) {
        walk_stmt(self, stmt);
    }

    fn visit_expr(&mut self, expr: ExprId<'ast>) {
        walk_expr(self, expr);
    }

    fn visit_trailer(&mut self, trailer: &'ast Trailer<'ast>) {
        walk_trailer(self, trailer);
    }
}

pub fn walk_module<'ast, V: Visitor<'ast>>(visitor: &mut V, module: &'ast Module<'ast>) {
    for stmt in module.statements {
        visitor.visit_stmt(stmt);
    }
}

pub fn walk_stmt<'ast, V: Visitor<'ast>>(visitor: &mut V, stmt: StmtId<'ast>) {
    match stmt {
        Stmt::Expression { expr, .. } => visitor.visit_expr(expr),
        Stmt::Assign { target, value, .. }
        | Stmt::AugAssign { target, value, .. }
        | Stmt::CoalesceAssign { target, value, .. } => {
            visitor.visit_expr(target);
            visitor.visit_expr(value);
        }
        Stmt::If { test, body, orelse, .. } => {
            visitor.visit_expr(test);
            for stmt in *body {
                visitor.visit_stmt(stmt);
            }
            for stmt in *orelse {
                visitor.visit_stmt(stmt);
            }
        }
        Stmt::While { test, body, .. } => {
            visitor.visit_expr(test);
            for stmt in *body {
                visitor.visit_stmt(stmt);
            }
        }
        Stmt::Assert { test, message, .. } => {
            visitor.visit_expr(test);
            if let Some(message) = message {
                visitor.visit_expr(message);
            }
        }
        Stmt::Pass { .. } => {}
    }
}

pub fn walk_expr<'ast, V: Visitor<'ast>>(visitor: &mut V, expr: ExprId<'ast>) {
    match expr {
        Expr::Name { .. }
        | Expr::Temp { .. }
        | Expr::None { .. }
        | Expr::Bool { .. }
        | Expr::Integer { .. }
        | Expr::Float { .. }
        | Expr::String { .. } => {}
        Expr::List { items, .. } => {
            for item in *items {
                visitor.visit_expr(item);
            }
        }
        Expr::Dict { entries, .. } => {
            for (key, value) in *entries {
                visitor.visit_expr(key);
                visitor.visit_expr(value);
            }
        }
        Expr::Chain { base, trailers, .. } => {
            visitor.visit_expr(base);
            for trailer in *trailers {
                visitor.visit_trailer(trailer);
            }
        }
        Expr::Binary { left, right, .. } => {
            visitor.visit_expr(left);
            visitor.visit_expr(right);
        }
        Expr::Unary { operand, .. } => visitor.visit_expr(operand),
        Expr::Power { base, exponent, .. } => {
            visitor.visit_expr(base);
            visitor.visit_expr(exponent);
        }
        Expr::Coalesce { first, rest, .. } => {
            visitor.visit_expr(first);
            for operand in *rest {
                visitor.visit_expr(operand);
            }
        }
        Expr::Conditional { test, then, orelse, .. } => {
            visitor.visit_expr(test);
            visitor.visit_expr(then);
            visitor.visit_expr(orelse);
        }
        Expr::Bind { value, .. } => visitor.visit_expr(value),
    }
}

pub fn walk_trailer<'ast, V: Visitor<'ast>>(visitor: &mut V, trailer: &'ast Trailer<'ast>) {
    match trailer {
        Trailer::Attribute { .. } | Trailer::OptionalAttribute { .. } => {}
        Trailer::Index { index, .. } | Trailer::OptionalIndex { index, .. } => {
            visitor.visit_expr(index)
        }
        Trailer::Call { args, .. } => {
            for arg in *args {
                visitor.visit_expr(arg);
            }
        }
    }
}
