//! Expression trees.
//!
//! [`ExpressionNode`] is an immutable tree. Its `Display` output is the
//! canonical text form, which re-parses to an equal tree; argument texts used
//! for function argument binding come from this form.

use std::fmt::{self, Write as _};
use std::hash::{Hash, Hasher};

use super::Reference;
use crate::base::Name;

// ============================================================================
// VALUES
// ============================================================================

/// A literal value.
#[derive(Clone, Debug)]
pub enum Value {
    Double(f64),
    String(Name),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Double(a), Value::Double(b)) => a.to_bits() == b.to_bits(),
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Double(v) => v.to_bits().hash(state),
            Value::String(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Double(v) => write!(f, "{}", v),
            Value::String(s) => {
                f.write_char('"')?;
                for c in s.chars() {
                    match c {
                        '"' => f.write_str("\\\"")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        c => f.write_char(c)?,
                    }
                }
                f.write_char('"')
            }
        }
    }
}

// ============================================================================
// OPERATORS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArithmeticOperator {
    Or,
    And,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    Power,
}

impl ArithmeticOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            ArithmeticOperator::Or => "||",
            ArithmeticOperator::And => "&&",
            ArithmeticOperator::Plus => "+",
            ArithmeticOperator::Minus => "-",
            ArithmeticOperator::Multiply => "*",
            ArithmeticOperator::Divide => "/",
            ArithmeticOperator::Modulo => "%",
            ArithmeticOperator::Power => "^",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            ArithmeticOperator::Or => 0,
            ArithmeticOperator::And => 1,
            ArithmeticOperator::Plus | ArithmeticOperator::Minus => 3,
            ArithmeticOperator::Multiply
            | ArithmeticOperator::Divide
            | ArithmeticOperator::Modulo => 4,
            ArithmeticOperator::Power => 5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    Equal,
    NotEqual,
    ApproxEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl ComparisonOperator {
    pub const PRECEDENCE: u8 = 2;

    pub fn as_str(self) -> &'static str {
        match self {
            ComparisonOperator::Equal => "==",
            ComparisonOperator::NotEqual => "!=",
            ComparisonOperator::ApproxEqual => "~=",
            ComparisonOperator::Less => "<",
            ComparisonOperator::LessOrEqual => "<=",
            ComparisonOperator::Greater => ">",
            ComparisonOperator::GreaterOrEqual => ">=",
        }
    }
}

// ============================================================================
// FUNCTIONS
// ============================================================================

/// Built-in scalar math functions, applied cell-wise to tensors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Function {
    Abs,
    Acos,
    Asin,
    Atan,
    Ceil,
    Cos,
    Cosh,
    Elu,
    Exp,
    Fabs,
    Floor,
    IsNan,
    Log,
    Log10,
    Relu,
    Round,
    Sigmoid,
    Sign,
    Sin,
    Sinh,
    Sqrt,
    Square,
    Tan,
    Tanh,
    Atan2,
    Fmod,
    Ldexp,
    Max,
    Min,
    Pow,
}

impl Function {
    const ALL: [Function; 30] = [
        Function::Abs,
        Function::Acos,
        Function::Asin,
        Function::Atan,
        Function::Ceil,
        Function::Cos,
        Function::Cosh,
        Function::Elu,
        Function::Exp,
        Function::Fabs,
        Function::Floor,
        Function::IsNan,
        Function::Log,
        Function::Log10,
        Function::Relu,
        Function::Round,
        Function::Sigmoid,
        Function::Sign,
        Function::Sin,
        Function::Sinh,
        Function::Sqrt,
        Function::Square,
        Function::Tan,
        Function::Tanh,
        Function::Atan2,
        Function::Fmod,
        Function::Ldexp,
        Function::Max,
        Function::Min,
        Function::Pow,
    ];

    pub fn from_name(name: &str) -> Option<Function> {
        Self::ALL.into_iter().find(|f| f.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            Function::Abs => "abs",
            Function::Acos => "acos",
            Function::Asin => "asin",
            Function::Atan => "atan",
            Function::Ceil => "ceil",
            Function::Cos => "cos",
            Function::Cosh => "cosh",
            Function::Elu => "elu",
            Function::Exp => "exp",
            Function::Fabs => "fabs",
            Function::Floor => "floor",
            Function::IsNan => "isNan",
            Function::Log => "log",
            Function::Log10 => "log10",
            Function::Relu => "relu",
            Function::Round => "round",
            Function::Sigmoid => "sigmoid",
            Function::Sign => "sign",
            Function::Sin => "sin",
            Function::Sinh => "sinh",
            Function::Sqrt => "sqrt",
            Function::Square => "square",
            Function::Tan => "tan",
            Function::Tanh => "tanh",
            Function::Atan2 => "atan2",
            Function::Fmod => "fmod",
            Function::Ldexp => "ldexp",
            Function::Max => "max",
            Function::Min => "min",
            Function::Pow => "pow",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Function::Atan2
            | Function::Fmod
            | Function::Ldexp
            | Function::Max
            | Function::Min
            | Function::Pow => 2,
            _ => 1,
        }
    }
}

/// Reduce aggregators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Aggregator {
    Avg,
    Count,
    Max,
    Median,
    Min,
    Prod,
    Sum,
}

impl Aggregator {
    pub fn from_name(name: &str) -> Option<Aggregator> {
        match name {
            "avg" => Some(Aggregator::Avg),
            "count" => Some(Aggregator::Count),
            "max" => Some(Aggregator::Max),
            "median" => Some(Aggregator::Median),
            "min" => Some(Aggregator::Min),
            "prod" => Some(Aggregator::Prod),
            "sum" => Some(Aggregator::Sum),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Aggregator::Avg => "avg",
            Aggregator::Count => "count",
            Aggregator::Max => "max",
            Aggregator::Median => "median",
            Aggregator::Min => "min",
            Aggregator::Prod => "prod",
            Aggregator::Sum => "sum",
        }
    }
}

/// Tensor functions whose result type depends on dimension arguments.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TensorFunction {
    /// `reduce(t, aggregator, dimensions...)`
    Reduce {
        aggregator: Aggregator,
        dimensions: Vec<Name>,
    },
    /// `rename(t, from, to)`
    Rename { from: Name, to: Name },
    /// `concat(a, b, dimension)`
    Concat { dimension: Name },
    /// `matmul(a, b, dimension)`
    Matmul { dimension: Name },
    /// `softmax(t, dimension)`
    Softmax { dimension: Name },
    /// `l2_normalize(t, dimension)`
    L2Normalize { dimension: Name },
}

impl TensorFunction {
    pub fn name(&self) -> &'static str {
        match self {
            TensorFunction::Reduce { .. } => "reduce",
            TensorFunction::Rename { .. } => "rename",
            TensorFunction::Concat { .. } => "concat",
            TensorFunction::Matmul { .. } => "matmul",
            TensorFunction::Softmax { .. } => "softmax",
            TensorFunction::L2Normalize { .. } => "l2_normalize",
        }
    }

    /// Whether `name` is the name of a tensor function.
    pub fn is_tensor_function(name: &str) -> bool {
        matches!(
            name,
            "reduce" | "rename" | "concat" | "matmul" | "softmax" | "l2_normalize"
        )
    }

    /// Number of tensor arguments taken before the dimension arguments.
    pub fn tensor_arity(name: &str) -> usize {
        match name {
            "concat" | "matmul" => 2,
            _ => 1,
        }
    }
}

// ============================================================================
// EXPRESSION NODES
// ============================================================================

/// A node in a ranking expression tree.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ExpressionNode {
    Constant(Value),
    /// A bare name in a position where it is not a feature, such as a
    /// dimension name argument.
    Name(Name),
    Reference(Reference),
    Arithmetic {
        operator: ArithmeticOperator,
        left: Box<ExpressionNode>,
        right: Box<ExpressionNode>,
    },
    Comparison {
        operator: ComparisonOperator,
        left: Box<ExpressionNode>,
        right: Box<ExpressionNode>,
    },
    Not(Box<ExpressionNode>),
    Negative(Box<ExpressionNode>),
    If {
        condition: Box<ExpressionNode>,
        if_true: Box<ExpressionNode>,
        if_false: Box<ExpressionNode>,
    },
    Function {
        function: Function,
        arguments: Vec<ExpressionNode>,
    },
    TensorFunction {
        function: TensorFunction,
        arguments: Vec<ExpressionNode>,
    },
}

impl ExpressionNode {
    pub fn number(value: f64) -> Self {
        ExpressionNode::Constant(Value::Double(value))
    }

    pub fn string(value: impl Into<Name>) -> Self {
        ExpressionNode::Constant(Value::String(value.into()))
    }

    pub fn reference(reference: Reference) -> Self {
        ExpressionNode::Reference(reference)
    }

    pub fn arithmetic(operator: ArithmeticOperator, left: ExpressionNode, right: ExpressionNode) -> Self {
        ExpressionNode::Arithmetic {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn as_reference(&self) -> Option<&Reference> {
        match self {
            ExpressionNode::Reference(reference) => Some(reference),
            _ => None,
        }
    }

    /// Whether this node has child expressions.
    pub fn is_composite(&self) -> bool {
        match self {
            ExpressionNode::Constant(_) | ExpressionNode::Name(_) => false,
            ExpressionNode::Reference(reference) => !reference.arguments().is_empty(),
            _ => true,
        }
    }

    /// The direct children of this node, in order.
    pub fn children(&self) -> Vec<&ExpressionNode> {
        match self {
            ExpressionNode::Constant(_) | ExpressionNode::Name(_) => Vec::new(),
            ExpressionNode::Reference(reference) => reference.arguments().iter().collect(),
            ExpressionNode::Arithmetic { left, right, .. }
            | ExpressionNode::Comparison { left, right, .. } => vec![&**left, &**right],
            ExpressionNode::Not(child) | ExpressionNode::Negative(child) => vec![&**child],
            ExpressionNode::If {
                condition,
                if_true,
                if_false,
            } => vec![&**condition, &**if_true, &**if_false],
            ExpressionNode::Function { arguments, .. }
            | ExpressionNode::TensorFunction { arguments, .. } => arguments.iter().collect(),
        }
    }

    /// Rebuild this node with each child replaced by `f(child)`.
    ///
    /// Leaves are returned as clones.
    pub fn map_children<E>(
        &self,
        mut f: impl FnMut(&ExpressionNode) -> Result<ExpressionNode, E>,
    ) -> Result<ExpressionNode, E> {
        let mut boxed = |node: &ExpressionNode| f(node).map(Box::new);
        Ok(match self {
            ExpressionNode::Constant(_) | ExpressionNode::Name(_) => self.clone(),
            ExpressionNode::Reference(reference) => {
                let arguments = reference
                    .arguments()
                    .iter()
                    .map(|a| boxed(a).map(|b| *b))
                    .collect::<Result<Vec<_>, E>>()?;
                ExpressionNode::Reference(reference.with_arguments(arguments))
            }
            ExpressionNode::Arithmetic {
                operator,
                left,
                right,
            } => ExpressionNode::Arithmetic {
                operator: *operator,
                left: boxed(left)?,
                right: boxed(right)?,
            },
            ExpressionNode::Comparison {
                operator,
                left,
                right,
            } => ExpressionNode::Comparison {
                operator: *operator,
                left: boxed(left)?,
                right: boxed(right)?,
            },
            ExpressionNode::Not(child) => ExpressionNode::Not(boxed(child)?),
            ExpressionNode::Negative(child) => ExpressionNode::Negative(boxed(child)?),
            ExpressionNode::If {
                condition,
                if_true,
                if_false,
            } => ExpressionNode::If {
                condition: boxed(condition)?,
                if_true: boxed(if_true)?,
                if_false: boxed(if_false)?,
            },
            ExpressionNode::Function {
                function,
                arguments,
            } => ExpressionNode::Function {
                function: *function,
                arguments: arguments
                    .iter()
                    .map(|a| boxed(a).map(|b| *b))
                    .collect::<Result<_, E>>()?,
            },
            ExpressionNode::TensorFunction {
                function,
                arguments,
            } => ExpressionNode::TensorFunction {
                function: function.clone(),
                arguments: arguments
                    .iter()
                    .map(|a| boxed(a).map(|b| *b))
                    .collect::<Result<_, E>>()?,
            },
        })
    }

    /// Binding strength of the outermost operator; atoms bind tightest.
    fn precedence(&self) -> u8 {
        match self {
            ExpressionNode::Arithmetic { operator, .. } => operator.precedence(),
            ExpressionNode::Comparison { .. } => ComparisonOperator::PRECEDENCE,
            _ => u8::MAX,
        }
    }
}

/// Write `node`, parenthesized when it binds looser than `min_precedence`.
fn write_operand(f: &mut fmt::Formatter<'_>, node: &ExpressionNode, min_precedence: u8) -> fmt::Result {
    if node.precedence() < min_precedence {
        write!(f, "({})", node)
    } else {
        write!(f, "{}", node)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: impl IntoIterator<Item = impl fmt::Display>) -> fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for ExpressionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpressionNode::Constant(value) => write!(f, "{}", value),
            ExpressionNode::Name(name) => f.write_str(name),
            ExpressionNode::Reference(reference) => write!(f, "{}", reference),
            ExpressionNode::Arithmetic {
                operator,
                left,
                right,
            } => {
                // Left-associative, except power which is right-associative.
                let p = operator.precedence();
                let (left_min, right_min) = if *operator == ArithmeticOperator::Power {
                    (p + 1, p)
                } else {
                    (p, p + 1)
                };
                write_operand(f, left, left_min)?;
                write!(f, " {} ", operator.as_str())?;
                write_operand(f, right, right_min)
            }
            ExpressionNode::Comparison {
                operator,
                left,
                right,
            } => {
                let p = ComparisonOperator::PRECEDENCE;
                write_operand(f, left, p + 1)?;
                write!(f, " {} ", operator.as_str())?;
                write_operand(f, right, p + 1)
            }
            ExpressionNode::Not(child) => {
                f.write_str("!")?;
                write_operand(f, child, u8::MAX)
            }
            ExpressionNode::Negative(child) => {
                f.write_str("-")?;
                write_operand(f, child, u8::MAX)
            }
            ExpressionNode::If {
                condition,
                if_true,
                if_false,
            } => write!(f, "if ({}, {}, {})", condition, if_true, if_false),
            ExpressionNode::Function {
                function,
                arguments,
            } => {
                write!(f, "{}(", function.name())?;
                write_list(f, arguments)?;
                f.write_str(")")
            }
            ExpressionNode::TensorFunction {
                function,
                arguments,
            } => {
                write!(f, "{}(", function.name())?;
                write_list(f, arguments)?;
                match function {
                    TensorFunction::Reduce {
                        aggregator,
                        dimensions,
                    } => {
                        write!(f, ", {}", aggregator.name())?;
                        for dimension in dimensions {
                            write!(f, ", {}", dimension)?;
                        }
                    }
                    TensorFunction::Rename { from, to } => write!(f, ", {}, {}", from, to)?,
                    TensorFunction::Concat { dimension }
                    | TensorFunction::Matmul { dimension }
                    | TensorFunction::Softmax { dimension }
                    | TensorFunction::L2Normalize { dimension } => write!(f, ", {}", dimension)?,
                }
                f.write_str(")")
            }
        }
    }
}

impl From<Reference> for ExpressionNode {
    fn from(reference: Reference) -> Self {
        ExpressionNode::Reference(reference)
    }
}
