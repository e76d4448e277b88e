//! Operator overloads on expression nodes.
//!
//! Applying an operator to an expression (or to the props accessor) builds
//! a new node; nothing is evaluated and nothing fails here. Logical and/or
//! are spelled `&`/`|`, and only short-circuit at native evaluation time.
//! Comparisons cannot return a non-bool from `PartialOrd`, so they are
//! builder methods (`.eq`, `.lt`, ...) in the usual query-builder style.

use std::ops::{Add, BitAnd, BitOr, Div, Mul, Neg, Not, Rem, Sub};

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::props::PropsRoot;

macro_rules! binary_op {
    ($trait:ident, $method:ident, $op:ident) => {
        impl<R: Into<Expr>> $trait<R> for Expr {
            type Output = Expr;
            fn $method(self, rhs: R) -> Expr {
                Expr::binary(BinaryOp::$op, self, rhs.into())
            }
        }

        impl<R: Into<Expr>> $trait<R> for PropsRoot {
            type Output = Expr;
            fn $method(self, rhs: R) -> Expr {
                Expr::binary(BinaryOp::$op, Expr::from(self), rhs.into())
            }
        }

        binary_op!(@lhs $trait, $method, $op, i64);
        binary_op!(@lhs $trait, $method, $op, f64);
        binary_op!(@lhs $trait, $method, $op, bool);
        binary_op!(@lhs $trait, $method, $op, &str);
    };
    (@lhs $trait:ident, $method:ident, $op:ident, $lhs:ty) => {
        impl $trait<Expr> for $lhs {
            type Output = Expr;
            fn $method(self, rhs: Expr) -> Expr {
                Expr::binary(BinaryOp::$op, Expr::from(self), rhs)
            }
        }

        impl $trait<PropsRoot> for $lhs {
            type Output = Expr;
            fn $method(self, rhs: PropsRoot) -> Expr {
                Expr::binary(BinaryOp::$op, Expr::from(self), Expr::from(rhs))
            }
        }
    };
}

binary_op!(Add, add, Add);
binary_op!(Sub, sub, Sub);
binary_op!(Mul, mul, Mul);
binary_op!(Div, div, Div);
binary_op!(Rem, rem, Mod);
binary_op!(BitAnd, bitand, And);
binary_op!(BitOr, bitor, Or);

impl Neg for Expr {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Neg, self)
    }
}

impl Neg for PropsRoot {
    type Output = Expr;
    fn neg(self) -> Expr {
        Expr::unary(UnaryOp::Neg, Expr::from(self))
    }
}

impl Not for Expr {
    type Output = Expr;
    fn not(self) -> Expr {
        Expr::unary(UnaryOp::Not, self)
    }
}

impl Not for PropsRoot {
    type Output = Expr;
    fn not(self) -> Expr {
        Expr::unary(UnaryOp::Not, Expr::from(self))
    }
}

macro_rules! builder_methods {
    ($type:ty) => {
        impl $type {
            pub fn eq(self, other: impl Into<Expr>) -> Expr {
                Expr::binary(BinaryOp::Eq, self, other)
            }

            pub fn ne(self, other: impl Into<Expr>) -> Expr {
                Expr::binary(BinaryOp::Ne, self, other)
            }

            pub fn lt(self, other: impl Into<Expr>) -> Expr {
                Expr::binary(BinaryOp::Lt, self, other)
            }

            pub fn le(self, other: impl Into<Expr>) -> Expr {
                Expr::binary(BinaryOp::Le, self, other)
            }

            pub fn gt(self, other: impl Into<Expr>) -> Expr {
                Expr::binary(BinaryOp::Gt, self, other)
            }

            pub fn ge(self, other: impl Into<Expr>) -> Expr {
                Expr::binary(BinaryOp::Ge, self, other)
            }

            /// Exponentiation, `**` in predicate text.
            pub fn pow(self, other: impl Into<Expr>) -> Expr {
                Expr::binary(BinaryOp::Pow, self, other)
            }

            /// Flooring division, `//` in predicate text.
            pub fn floor_div(self, other: impl Into<Expr>) -> Expr {
                Expr::binary(BinaryOp::FloorDiv, self, other)
            }

            /// Membership test, `in` in predicate text. The right-hand
            /// side may be a sequence, a mapping (tested against its
            /// keys) or a string (substring test).
            pub fn is_in(self, other: impl Into<Expr>) -> Expr {
                Expr::binary(BinaryOp::In, self, other)
            }

            pub fn abs(self) -> Expr {
                Expr::unary(UnaryOp::Abs, self)
            }
        }
    };
}

builder_methods!(Expr);
builder_methods!(PropsRoot);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::props;

    #[test]
    fn arithmetic_builds_nodes() {
        let expr = props().item("int") + 2;
        assert_eq!(
            expr,
            Expr::binary(BinaryOp::Add, Expr::from(props().item("int")), 2)
        );
    }

    #[test]
    fn literal_on_the_left() {
        let expr = 2 * props().item("int");
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Mul, .. }));

        let expr = 2 - Expr::from(3);
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Sub, .. }));
    }

    #[test]
    fn bitwise_spelling_carries_logical_ops() {
        let expr = props().item("bool") | props().item("int").lt(2);
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::Or, .. }));

        let expr = Expr::from(true) & Expr::from(false);
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::And, .. }));
    }

    #[test]
    fn prefix_operators() {
        assert!(matches!(
            -props().item("neg"),
            Expr::Unary { op: UnaryOp::Neg, .. }
        ));
        assert!(matches!(
            !props().item("bool"),
            Expr::Unary { op: UnaryOp::Not, .. }
        ));
    }

    #[test]
    fn comparison_builders() {
        let expr = props().item("int").eq(2) | props().item("int").eq(3);
        match expr {
            Expr::Binary { op: BinaryOp::Or, lhs, rhs } => {
                assert!(matches!(*lhs, Expr::Binary { op: BinaryOp::Eq, .. }));
                assert!(matches!(*rhs, Expr::Binary { op: BinaryOp::Eq, .. }));
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn membership_builder() {
        let expr = Expr::from(1).is_in(props().item("list"));
        assert!(matches!(expr, Expr::Binary { op: BinaryOp::In, .. }));
    }
}
