//! UPDATE 语句

use std::fmt;

use crate::ast::{Operand, QueryColumn, QueryTable};
use crate::condition::{AndCondition, Condition};
use crate::element::QueryElement;
use crate::error::DecodeError;
use crate::join::QueryJoin;
use crate::serialize::{Member, MemberReader, ReplacedObject};
use crate::visitor::{
    deep_clone, visit, visit_all, visit_option, Node, NodeMut, Visitable, Visitor,
};

/// `UPDATE table SET columns = values WHERE condition`
///
/// 列与值按位置一一对应
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryUpdate {
    /// 被更新的表
    table: QueryTable,
    /// 被赋值的列
    columns: Vec<QueryColumn>,
    /// 与列按位置对应的值
    values: Vec<Operand>,
    /// WHERE 条件
    condition: Option<AndCondition>,
    /// 只从旧版载荷读入，执行更新时不支持连接
    joins: Vec<QueryJoin>,
}

impl QueryUpdate {
    pub fn new(table: QueryTable) -> Self {
        Self {
            table,
            columns: Vec::new(),
            values: Vec::new(),
            condition: None,
            joins: Vec::new(),
        }
    }

    /// 添加一组列赋值
    pub fn add_value(&mut self, column: QueryColumn, value: impl Into<Operand>) {
        self.columns.push(column);
        self.values.push(value.into());
    }

    pub fn has_values(&self) -> bool {
        !self.values.is_empty()
    }

    pub fn table(&self) -> &QueryTable {
        &self.table
    }

    pub fn columns(&self) -> &[QueryColumn] {
        &self.columns
    }

    pub fn values(&self) -> &[Operand] {
        &self.values
    }

    /// 替换条件，非 AND 条件会包装成 AND
    pub fn set_condition(&mut self, condition: Option<Condition>) {
        self.condition = condition.map(|condition| match condition {
            Condition::And(and) => and,
            other => AndCondition::from_conditions(vec![other]),
        });
    }

    /// 在现有条件上 AND 一个条件，`None` 忽略
    pub fn add_condition(&mut self, condition: impl Into<Option<Condition>>) {
        if let Some(condition) = condition.into() {
            self.condition
                .get_or_insert_with(AndCondition::new)
                .add_condition(condition);
        }
    }

    pub fn condition(&self) -> Option<&AndCondition> {
        self.condition.as_ref()
    }

    /// 条件的独立副本，可以随意修改和复用
    pub fn condition_clone(&self) -> Option<AndCondition> {
        self.condition.as_ref().map(deep_clone)
    }

    pub fn joins(&self) -> &[QueryJoin] {
        &self.joins
    }
}

impl fmt::Display for QueryUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "UPDATE {} SET (", self.table)?;
        for (i, column) in self.columns.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{column}")?;
        }
        f.write_str(") = (")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str("|")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str(")")?;
        if let Some(condition) = &self.condition {
            write!(f, " WHERE {condition}")?;
        }
        for join in &self.joins {
            write!(f, " {join}")?;
        }
        Ok(())
    }
}

impl Visitable for QueryUpdate {
    fn accept_visitor(&mut self, visitor: &mut dyn Visitor) {
        visit(&mut self.table, visitor);
        visit_all(&mut self.columns, visitor);
        for value in &mut self.values {
            value.accept(visitor);
        }
        visit_option(&mut self.condition, visitor);
        visit_all(&mut self.joins, visitor);
    }
}

impl Node for QueryUpdate {
    fn as_node(&mut self) -> NodeMut<'_> {
        NodeMut::Update(self)
    }

    fn downcast<'a>(node: NodeMut<'a>) -> Option<&'a mut Self> {
        match node {
            NodeMut::Update(update) => Some(update),
            _ => None,
        }
    }
}

impl QueryElement for QueryUpdate {
    const KIND: &'static str = "QueryUpdate";

    fn write_replace(&self) -> ReplacedObject {
        let joins = if self.joins.is_empty() {
            Member::Null
        } else {
            Member::list(&self.joins)
        };
        ReplacedObject::new(
            Self::KIND,
            vec![
                Member::object(&self.table),
                Member::list(&self.columns),
                Member::List(self.values.iter().map(Operand::to_member).collect()),
                Member::optional_object(self.condition.as_ref()),
                joins,
            ],
        )
    }

    fn read_replace(object: &ReplacedObject) -> Result<Self, DecodeError> {
        let mut members = object.members_of(Self::KIND)?;
        let table = members.element()?;
        let columns: Vec<QueryColumn> = members.elements()?;

        let mut value_members = MemberReader::new(Self::KIND, members.list()?);
        let mut values = Vec::with_capacity(columns.len());
        while value_members.remaining() > 0 {
            values.push(Operand::read(&mut value_members)?);
        }
        if values.len() != columns.len() {
            return Err(DecodeError::UnpairedValues {
                columns: columns.len(),
                values: values.len(),
            });
        }

        let condition = members.optional_element()?;
        let joins = if members.remaining() > 0 {
            members.elements()?
        } else {
            Vec::new()
        };

        Ok(Self {
            table,
            columns,
            values,
            condition,
            joins,
        })
    }
}
