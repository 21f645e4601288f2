//! 表与列的引用，以及构成比较条件的操作数

use std::fmt;

use crate::element::QueryElement;
use crate::error::DecodeError;
use crate::serialize::{Member, MemberReader, ReplacedObject};
use crate::value::{AnyValues, Value};
use crate::visitor::{visit, Node, NodeMut, Visitable, Visitor};

/// 查询中看到的表
///
/// 解析到物理表结构不在这里做，这里只负责保存、比较和替换
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryTable {
    /// 表名
    name: String,
    /// 表别名
    alias: Option<String>,
    /// 所属数据源
    data_source: Option<String>,
}

impl QueryTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            data_source: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_data_source(mut self, data_source: impl Into<String>) -> Self {
        self.data_source = Some(data_source.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn data_source(&self) -> Option<&str> {
        self.data_source.as_deref()
    }

    /// 用来限定列名的名字：有别名时用别名
    pub fn reference_name(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }
}

impl fmt::Display for QueryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, " {alias}")?;
        }
        Ok(())
    }
}

impl Visitable for QueryTable {
    fn accept_visitor(&mut self, _visitor: &mut dyn Visitor) {}
}

impl Node for QueryTable {
    fn as_node(&mut self) -> NodeMut<'_> {
        NodeMut::Table(self)
    }

    fn downcast<'a>(node: NodeMut<'a>) -> Option<&'a mut Self> {
        match node {
            NodeMut::Table(table) => Some(table),
            _ => None,
        }
    }
}

impl QueryElement for QueryTable {
    const KIND: &'static str = "QueryTable";

    fn write_replace(&self) -> ReplacedObject {
        ReplacedObject::new(
            Self::KIND,
            vec![
                Member::text(&self.name),
                Member::optional_text(self.alias.as_deref()),
                Member::optional_text(self.data_source.as_deref()),
            ],
        )
    }

    fn read_replace(object: &ReplacedObject) -> Result<Self, DecodeError> {
        let mut members = object.members_of(Self::KIND)?;
        Ok(Self {
            name: members.text()?,
            alias: members.optional_text()?,
            data_source: members.optional_text()?,
        })
    }
}

/// 包装后的表引用，连接的外表以这种形式保存
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableExpression {
    table: QueryTable,
}

impl TableExpression {
    pub fn new(table: QueryTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &QueryTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut QueryTable {
        &mut self.table
    }

    pub fn into_table(self) -> QueryTable {
        self.table
    }
}

impl From<QueryTable> for TableExpression {
    fn from(table: QueryTable) -> Self {
        Self::new(table)
    }
}

impl fmt::Display for TableExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.table, f)
    }
}

impl Visitable for TableExpression {
    fn accept_visitor(&mut self, visitor: &mut dyn Visitor) {
        visit(&mut self.table, visitor);
    }
}

impl Node for TableExpression {
    fn as_node(&mut self) -> NodeMut<'_> {
        NodeMut::TableExpression(self)
    }

    fn downcast<'a>(node: NodeMut<'a>) -> Option<&'a mut Self> {
        match node {
            NodeMut::TableExpression(expression) => Some(expression),
            _ => None,
        }
    }
}

impl QueryElement for TableExpression {
    const KIND: &'static str = "TableExpression";

    fn write_replace(&self) -> ReplacedObject {
        ReplacedObject::new(Self::KIND, vec![Member::object(&self.table)])
    }

    fn read_replace(object: &ReplacedObject) -> Result<Self, DecodeError> {
        let mut members = object.members_of(Self::KIND)?;
        Ok(Self::new(members.element()?))
    }
}

/// 查询表中的一列
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryColumn {
    /// 列所在的表
    table: QueryTable,
    /// 列名
    name: String,
    /// 列别名
    alias: Option<String>,
}

impl QueryColumn {
    pub fn new(table: QueryTable, name: impl Into<String>) -> Self {
        Self {
            table,
            name: name.into(),
            alias: None,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn table(&self) -> &QueryTable {
        &self.table
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }
}

impl fmt::Display for QueryColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table.reference_name(), self.name)?;
        if let Some(alias) = &self.alias {
            write!(f, " AS {alias}")?;
        }
        Ok(())
    }
}

impl Visitable for QueryColumn {
    fn accept_visitor(&mut self, visitor: &mut dyn Visitor) {
        visit(&mut self.table, visitor);
    }
}

impl Node for QueryColumn {
    fn as_node(&mut self) -> NodeMut<'_> {
        NodeMut::Column(self)
    }

    fn downcast<'a>(node: NodeMut<'a>) -> Option<&'a mut Self> {
        match node {
            NodeMut::Column(column) => Some(column),
            _ => None,
        }
    }
}

impl QueryElement for QueryColumn {
    const KIND: &'static str = "QueryColumn";

    fn write_replace(&self) -> ReplacedObject {
        ReplacedObject::new(
            Self::KIND,
            vec![
                Member::object(&self.table),
                Member::text(&self.name),
                Member::optional_text(self.alias.as_deref()),
            ],
        )
    }

    fn read_replace(object: &ReplacedObject) -> Result<Self, DecodeError> {
        let mut members = object.members_of(Self::KIND)?;
        Ok(Self {
            table: members.element()?,
            name: members.text()?,
            alias: members.optional_text()?,
        })
    }
}

/// 比较的一侧，或更新语句中的赋值
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Operand {
    /// 列引用
    Column(QueryColumn),
    /// 单个值
    Value(Value),
    /// 一组值，用于 IN 比较
    AnyValues(AnyValues),
}

impl Operand {
    pub fn as_column(&self) -> Option<&QueryColumn> {
        match self {
            Operand::Column(column) => Some(column),
            _ => None,
        }
    }

    pub fn is_column(&self) -> bool {
        matches!(self, Operand::Column(_))
    }

    /// 访问包装的节点，操作数本身不是节点
    pub fn accept(&mut self, visitor: &mut dyn Visitor) {
        match self {
            Operand::Column(column) => visit(column, visitor),
            Operand::Value(value) => visit(value, visitor),
            Operand::AnyValues(values) => visit(values, visitor),
        }
    }

    pub fn to_member(&self) -> Member {
        match self {
            Operand::Column(column) => Member::object(column),
            Operand::Value(Value::Null) => Member::Null,
            Operand::Value(value) => Member::Value(value.clone()),
            Operand::AnyValues(values) => Member::object(values),
        }
    }

    /// 把下一个成员读成操作数，按 kind 区分形态
    pub fn read(members: &mut MemberReader<'_>) -> Result<Self, DecodeError> {
        match members.next_member()? {
            Member::Null => Ok(Operand::Value(Value::Null)),
            Member::Value(value) => Ok(Operand::Value(value.clone())),
            Member::Object(object) if object.is_kind(QueryColumn::KIND) => {
                QueryColumn::read_replace(object).map(Operand::Column)
            }
            Member::Object(object) if object.is_kind(AnyValues::KIND) => {
                AnyValues::read_replace(object).map(Operand::AnyValues)
            }
            _ => Err(members.mismatch("operand")),
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(column) => fmt::Display::fmt(column, f),
            Operand::Value(value) => fmt::Display::fmt(value, f),
            Operand::AnyValues(values) => fmt::Display::fmt(values, f),
        }
    }
}

impl From<QueryColumn> for Operand {
    fn from(column: QueryColumn) -> Self {
        Operand::Column(column)
    }
}

impl From<Value> for Operand {
    fn from(value: Value) -> Self {
        Operand::Value(value)
    }
}

impl From<AnyValues> for Operand {
    fn from(values: AnyValues) -> Self {
        Operand::AnyValues(values)
    }
}
