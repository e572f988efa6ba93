use crate::parser::{Expr, FunctionDecl, LiteralValue, Stmt};

/// Renders statements and expressions back to parseable Quill source.
///
/// The output is normalised (desugared `for` loops print as their `while`
/// form, integral numbers print without a fraction) but re-parsing it yields
/// a structurally identical AST, which the `parse` subcommand and the
/// round-trip tests rely on.
pub struct AstPrinter;

impl AstPrinter {
    pub fn print_program(statements: &[Stmt<'_>]) -> String {
        statements
            .iter()
            .map(Self::print_stmt)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn print_stmt(stmt: &Stmt<'_>) -> String {
        match stmt {
            Stmt::Expression(expr) => format!("{};", Self::print_expr(expr)),

            Stmt::Print(expr) => format!("print {};", Self::print_expr(expr)),

            Stmt::Var { name, initializer } => match initializer {
                Some(expr) => format!("var {} = {};", name.lexeme, Self::print_expr(expr)),
                None => format!("var {};", name.lexeme),
            },

            Stmt::Block(statements) => {
                let inner = statements
                    .iter()
                    .map(Self::print_stmt)
                    .collect::<Vec<_>>()
                    .join(" ");

                format!("{{ {} }}", inner)
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let mut s = format!(
                    "if ({}) {}",
                    Self::print_expr(condition),
                    Self::print_stmt(then_branch)
                );

                if let Some(else_branch) = else_branch {
                    s.push_str(&format!(" else {}", Self::print_stmt(else_branch)));
                }

                s
            }

            Stmt::While { condition, body } => format!(
                "while ({}) {}",
                Self::print_expr(condition),
                Self::print_stmt(body)
            ),

            Stmt::Function(declaration) => format!("fn {}", Self::print_function(declaration)),

            Stmt::Return { value, .. } => match value {
                Some(expr) => format!("return {};", Self::print_expr(expr)),
                None => "return;".to_string(),
            },

            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let header = match superclass {
                    Some(expr) => format!("class {} : {}", name.lexeme, Self::print_expr(expr)),
                    None => format!("class {}", name.lexeme),
                };

                let body = methods
                    .iter()
                    .map(|method| Self::print_function(method))
                    .collect::<Vec<_>>()
                    .join(" ");

                format!("{} {{ {} }}", header, body)
            }
        }
    }

    fn print_function(declaration: &FunctionDecl<'_>) -> String {
        let params = declaration
            .params
            .iter()
            .map(|param| param.lexeme)
            .collect::<Vec<_>>()
            .join(", ");

        let body = declaration
            .body
            .iter()
            .map(Self::print_stmt)
            .collect::<Vec<_>>()
            .join(" ");

        format!("{}({}) {{ {} }}", declaration.name.lexeme, params, body)
    }

    pub fn print_expr(expr: &Expr<'_>) -> String {
        match expr {
            Expr::Literal(literal) => match literal {
                LiteralValue::Number(n) => {
                    if n.fract() == 0.0 {
                        format!("{:.0}", n)
                    } else {
                        n.to_string()
                    }
                }

                LiteralValue::Str(s) => format!("\"{}\"", s),

                LiteralValue::True => "true".into(),

                LiteralValue::False => "false".into(),

                LiteralValue::Nil => "nil".into(),
            },

            Expr::Grouping(inner) => format!("({})", Self::print_expr(inner)),

            Expr::Unary { operator, right } => {
                format!("{}{}", operator.lexeme, Self::print_expr(right))
            }

            Expr::Binary {
                left,
                operator,
                right,
            }
            | Expr::Logical {
                left,
                operator,
                right,
            } => format!(
                "{} {} {}",
                Self::print_expr(left),
                operator.lexeme,
                Self::print_expr(right)
            ),

            Expr::Variable { name, .. } => name.lexeme.into(),

            Expr::Assign { name, value, .. } => {
                format!("{} = {}", name.lexeme, Self::print_expr(value))
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                let args = arguments
                    .iter()
                    .map(Self::print_expr)
                    .collect::<Vec<_>>()
                    .join(", ");

                format!("{}({})", Self::print_expr(callee), args)
            }

            Expr::Get { object, name } => {
                format!("{}.{}", Self::print_expr(object), name.lexeme)
            }

            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "{}.{} = {}",
                Self::print_expr(object),
                name.lexeme,
                Self::print_expr(value)
            ),

            Expr::This { .. } => "this".into(),

            Expr::Super { method, .. } => format!("super.{}", method.lexeme),
        }
    }
}
