//! 比较运算符及其修饰符
//!
//! 序列化时运算符是一个整数：低字节（`OPERATOR_MASK`）是基础运算符，
//! 更高的位是修饰符标志。文本形式为 `[修饰符]运算符`，例如 `#=` 或 `^||>=`

use std::fmt;
use std::str::FromStr;

use crate::error::{DecodeError, ParseOperatorError};

pub const OPERATOR_MASK: i64 = 0xFF;
pub const CASE_INSENSITIVE_MODIFIER: i64 = 1 << 8;
pub const OR_NULL_MODIFIER: i64 = 1 << 9;

const CASE_INSENSITIVE_PREFIX: &str = "#";
const OR_NULL_PREFIX: &str = "^||";

/// 基础比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOperator {
    Equals,         // =
    GreaterThan,    // >
    LessThan,       // <
    GreaterOrEqual, // >=
    LessOrEqual,    // <=
    NotEquals,      // !=
    In,             // in
    Like,           // like
    NotLike,        // not like
}

impl CompareOperator {
    pub const ALL: [CompareOperator; 9] = [
        CompareOperator::Equals,
        CompareOperator::GreaterThan,
        CompareOperator::LessThan,
        CompareOperator::GreaterOrEqual,
        CompareOperator::LessOrEqual,
        CompareOperator::NotEquals,
        CompareOperator::In,
        CompareOperator::Like,
        CompareOperator::NotLike,
    ];

    pub fn code(self) -> i64 {
        match self {
            CompareOperator::Equals => 0,
            CompareOperator::GreaterThan => 1,
            CompareOperator::LessThan => 2,
            CompareOperator::GreaterOrEqual => 3,
            CompareOperator::LessOrEqual => 4,
            CompareOperator::NotEquals => 5,
            CompareOperator::In => 6,
            CompareOperator::Like => 7,
            CompareOperator::NotLike => 8,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.code() == code)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            CompareOperator::Equals => "=",
            CompareOperator::GreaterThan => ">",
            CompareOperator::LessThan => "<",
            CompareOperator::GreaterOrEqual => ">=",
            CompareOperator::LessOrEqual => "<=",
            CompareOperator::NotEquals => "!=",
            CompareOperator::In => "in",
            CompareOperator::Like => "like",
            CompareOperator::NotLike => "not like",
        }
    }

    /// 交换操作数后仍然成立的运算符
    ///
    /// `=` 和 `!=` 是对称的；`in` 与 `like` 系列是拿值去匹配列表或模式，没有镜像形式
    pub fn swapped(self) -> Option<Self> {
        match self {
            CompareOperator::GreaterThan => Some(CompareOperator::LessThan),
            CompareOperator::LessThan => Some(CompareOperator::GreaterThan),
            CompareOperator::GreaterOrEqual => Some(CompareOperator::LessOrEqual),
            CompareOperator::LessOrEqual => Some(CompareOperator::GreaterOrEqual),
            CompareOperator::Equals | CompareOperator::NotEquals => Some(self),
            CompareOperator::In | CompareOperator::Like | CompareOperator::NotLike => None,
        }
    }
}

/// 比较的修饰标志
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Modifiers {
    /// 忽略大小写
    pub case_insensitive: bool,
    /// 或为 NULL 也成立
    pub or_null: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        case_insensitive: false,
        or_null: false,
    };

    fn code(self) -> i64 {
        let mut code = 0;
        if self.case_insensitive {
            code |= CASE_INSENSITIVE_MODIFIER;
        }
        if self.or_null {
            code |= OR_NULL_MODIFIER;
        }
        code
    }
}

/// 带修饰符的比较运算符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Operator {
    kind: CompareOperator,
    modifiers: Modifiers,
}

impl Operator {
    pub const EQUALS: Operator = Operator::new(CompareOperator::Equals);
    pub const NOT_EQUALS: Operator = Operator::new(CompareOperator::NotEquals);
    pub const GREATER_THAN: Operator = Operator::new(CompareOperator::GreaterThan);
    pub const LESS_THAN: Operator = Operator::new(CompareOperator::LessThan);
    pub const GREATER_OR_EQUAL: Operator = Operator::new(CompareOperator::GreaterOrEqual);
    pub const LESS_OR_EQUAL: Operator = Operator::new(CompareOperator::LessOrEqual);
    pub const IN: Operator = Operator::new(CompareOperator::In);
    pub const LIKE: Operator = Operator::new(CompareOperator::Like);
    pub const NOT_LIKE: Operator = Operator::new(CompareOperator::NotLike);

    pub const fn new(kind: CompareOperator) -> Self {
        Self {
            kind,
            modifiers: Modifiers::NONE,
        }
    }

    pub const fn case_insensitive(mut self) -> Self {
        self.modifiers.case_insensitive = true;
        self
    }

    pub const fn or_null(mut self) -> Self {
        self.modifiers.or_null = true;
        self
    }

    pub fn kind(&self) -> CompareOperator {
        self.kind
    }

    pub fn modifiers(&self) -> Modifiers {
        self.modifiers
    }

    /// 基础运算符是否为 `=`，不管修饰符
    pub fn is_equality(&self) -> bool {
        self.kind == CompareOperator::Equals
    }

    /// 镜像基础运算符，保留修饰符
    pub fn swapped(&self) -> Option<Self> {
        self.kind.swapped().map(|kind| Self {
            kind,
            modifiers: self.modifiers,
        })
    }

    pub fn code(&self) -> i64 {
        self.kind.code() | self.modifiers.code()
    }

    pub fn from_code(code: i64) -> Result<Self, DecodeError> {
        let known = OPERATOR_MASK | CASE_INSENSITIVE_MODIFIER | OR_NULL_MODIFIER;
        if code & !known != 0 {
            return Err(DecodeError::InvalidOperator(code));
        }
        let kind = CompareOperator::from_code(code & OPERATOR_MASK)
            .ok_or(DecodeError::InvalidOperator(code))?;
        Ok(Self {
            kind,
            modifiers: Modifiers {
                case_insensitive: code & CASE_INSENSITIVE_MODIFIER != 0,
                or_null: code & OR_NULL_MODIFIER != 0,
            },
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.modifiers.case_insensitive {
            f.write_str(CASE_INSENSITIVE_PREFIX)?;
        }
        if self.modifiers.or_null {
            f.write_str(OR_NULL_PREFIX)?;
        }
        f.write_str(self.kind.symbol())
    }
}

impl FromStr for Operator {
    type Err = ParseOperatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut rest = s.trim();
        let mut modifiers = Modifiers::NONE;
        loop {
            if let Some(stripped) = rest.strip_prefix(CASE_INSENSITIVE_PREFIX) {
                modifiers.case_insensitive = true;
                rest = stripped;
            } else if let Some(stripped) = rest.strip_prefix(OR_NULL_PREFIX) {
                modifiers.or_null = true;
                rest = stripped;
            } else {
                break;
            }
        }

        CompareOperator::ALL
            .into_iter()
            .find(|op| op.symbol().eq_ignore_ascii_case(rest))
            .map(|kind| Self { kind, modifiers })
            .ok_or_else(|| ParseOperatorError(s.to_string()))
    }
}

impl From<CompareOperator> for Operator {
    fn from(kind: CompareOperator) -> Self {
        Self::new(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_keeps_modifiers_above_mask() {
        let op = Operator::GREATER_OR_EQUAL.or_null();
        assert_eq!(op.code() & OPERATOR_MASK, CompareOperator::GreaterOrEqual.code());
        assert_ne!(op.code() & OR_NULL_MODIFIER, 0);
        assert_eq!(Operator::from_code(op.code()).unwrap(), op);
    }

    #[test]
    fn test_unknown_codes_are_rejected() {
        assert!(matches!(Operator::from_code(42), Err(DecodeError::InvalidOperator(42))));
        assert!(Operator::from_code(1 << 12).is_err());
    }

    #[test]
    fn test_text_form() {
        assert_eq!(Operator::EQUALS.case_insensitive().to_string(), "#=");
        assert_eq!(Operator::GREATER_THAN.or_null().to_string(), "^||>");
        assert_eq!("#^||=".parse::<Operator>().unwrap(), Operator::EQUALS.case_insensitive().or_null());
        assert_eq!("NOT LIKE".parse::<Operator>().unwrap(), Operator::NOT_LIKE);
        assert!("=>".parse::<Operator>().is_err());
    }

    #[test]
    fn test_swapped_keeps_modifiers() {
        let op = Operator::LESS_THAN.case_insensitive();
        assert_eq!(op.swapped(), Some(Operator::GREATER_THAN.case_insensitive()));
        assert_eq!(Operator::EQUALS.swapped(), Some(Operator::EQUALS));
        assert_eq!(Operator::NOT_EQUALS.swapped(), Some(Operator::NOT_EQUALS));
        assert_eq!(Operator::IN.swapped(), None);
        assert_eq!(Operator::LIKE.swapped(), None);
        assert_eq!(Operator::NOT_LIKE.case_insensitive().swapped(), None);
    }

    #[test]
    fn test_equality_ignores_modifiers() {
        assert!(Operator::EQUALS.or_null().is_equality());
        assert!(!Operator::NOT_EQUALS.is_equality());
    }
}
