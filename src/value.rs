//! 比较操作数与更新赋值中使用的标量值

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::element::QueryElement;
use crate::error::DecodeError;
use crate::serialize::{Member, ReplacedObject};
use crate::visitor::{Node, NodeMut, Visitable, Visitor};

/// 单个标量值
///
/// 用 Decimal 代替浮点数，相等关系是全序的，含有值的树都可以做哈希
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    /// SQL NULL
    Null,
    /// 布尔值
    Boolean(bool),
    /// 整数
    Integer(i64),
    /// 定点小数
    Decimal(Decimal),
    /// 文本
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Boolean(b) => write!(f, "{b}"),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Decimal(d) => write!(f, "{d}"),
            Value::Text(s) => write!(f, "'{s}'"),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Integer(i64::from(value))
    }
}

impl From<Decimal> for Value {
    fn from(value: Decimal) -> Self {
        Value::Decimal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl Visitable for Value {
    fn accept_visitor(&mut self, _visitor: &mut dyn Visitor) {}
}

impl Node for Value {
    fn as_node(&mut self) -> NodeMut<'_> {
        NodeMut::Value(self)
    }

    fn downcast<'a>(node: NodeMut<'a>) -> Option<&'a mut Self> {
        match node {
            NodeMut::Value(value) => Some(value),
            _ => None,
        }
    }
}

/// `ANY`/`IN` 比较的右侧：一组固定的值
///
/// 值列表在构造时确定，之后不再改变
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnyValues {
    values: Vec<Value>,
}

impl AnyValues {
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<Value> for AnyValues {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl fmt::Display for AnyValues {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ANY[{} values]", self.values.len())
    }
}

impl Visitable for AnyValues {
    // 值不可变，没有子节点
    fn accept_visitor(&mut self, _visitor: &mut dyn Visitor) {}
}

impl Node for AnyValues {
    fn as_node(&mut self) -> NodeMut<'_> {
        NodeMut::AnyValues(self)
    }

    fn downcast<'a>(node: NodeMut<'a>) -> Option<&'a mut Self> {
        match node {
            NodeMut::AnyValues(values) => Some(values),
            _ => None,
        }
    }
}

impl QueryElement for AnyValues {
    const KIND: &'static str = "AnyValues";

    fn write_replace(&self) -> ReplacedObject {
        let values = self.values.iter().cloned().map(Member::Value).collect();
        ReplacedObject::new(Self::KIND, vec![Member::List(values)])
    }

    fn read_replace(object: &ReplacedObject) -> Result<Self, DecodeError> {
        let mut members = object.members_of(Self::KIND)?;
        let values = members
            .list()?
            .iter()
            .map(|member| match member {
                Member::Value(value) => Ok(value.clone()),
                Member::Null => Ok(Value::Null),
                _ => Err(members.mismatch("value")),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::new(values))
    }
}
