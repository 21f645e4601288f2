//! 主表与外表引用之间的连接

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use tracing::debug;

use crate::ast::{QueryTable, TableExpression};
use crate::condition::{AndCondition, Condition};
use crate::element::QueryElement;
use crate::error::{DecodeError, QueryError};
use crate::serialize::{Member, ReplacedObject};
use crate::visitor::{visit, Node, NodeMut, Visitable, Visitor};

/// 序列化时永久连接在连接类型上设置的标志位
pub const PERMANENT_MASK: i64 = 1 << 16;

/// 连接类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinType {
    /// 内连接
    #[default]
    Inner,
    /// 左外连接
    LeftOuter,
    /// 右外连接
    RightOuter,
}

impl JoinType {
    pub fn code(self) -> i64 {
        match self {
            JoinType::Inner => 0,
            JoinType::LeftOuter => 1,
            JoinType::RightOuter => 2,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, DecodeError> {
        match code {
            0 => Ok(JoinType::Inner),
            1 => Ok(JoinType::LeftOuter),
            2 => Ok(JoinType::RightOuter),
            other => Err(DecodeError::InvalidJoinType(other)),
        }
    }

    /// 从另一侧读同一个连接时的类型
    pub fn inverted(self) -> Self {
        match self {
            JoinType::Inner => JoinType::Inner,
            JoinType::LeftOuter => JoinType::RightOuter,
            JoinType::RightOuter => JoinType::LeftOuter,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JoinType::Inner => "INNER_JOIN",
            JoinType::LeftOuter => "LEFT_OUTER_JOIN",
            JoinType::RightOuter => "RIGHT_OUTER_JOIN",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 产生该连接的来源，例如关系定义
///
/// 只供调用方使用，不参与比较、哈希和序列化
#[derive(Clone, Default)]
pub struct Origin(Option<Arc<dyn Any + Send + Sync>>);

impl Origin {
    pub fn new<T: Any + Send + Sync>(origin: T) -> Self {
        Self(Some(Arc::new(origin)))
    }

    pub fn is_set(&self) -> bool {
        self.0.is_some()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.as_deref()?.downcast_ref()
    }
}

impl fmt::Debug for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_set() {
            f.write_str("Origin(..)")
        } else {
            f.write_str("Origin(None)")
        }
    }
}

/// 连接子句
///
/// 连接条件总是比较条件的 AND，构造和解码时都会检查，之后只以只读方式提供
#[derive(Debug, Clone)]
pub struct QueryJoin {
    /// 连接名
    name: String,
    /// 主表
    primary: QueryTable,
    /// 外表引用
    foreign: TableExpression,
    /// 连接条件
    condition: AndCondition,
    join_type: JoinType,
    /// 永久连接：即使没有用到其中的列也保留
    permanent: bool,
    /// 附加在 SQL 上的注释
    comment: Option<String>,
    origin: Origin,
}

impl QueryJoin {
    /// 创建连接，单个比较条件会包装成 AND
    ///
    /// 其它形态的条件返回 [`QueryError::InvalidJoinCondition`]
    pub fn new(
        name: impl Into<String>,
        primary: QueryTable,
        foreign: TableExpression,
        condition: Condition,
        join_type: JoinType,
        permanent: bool,
    ) -> Result<Self, QueryError> {
        let condition = join_condition(condition, &foreign)?;
        Ok(Self {
            name: name.into(),
            primary,
            foreign,
            condition,
            join_type,
            permanent,
            comment: None,
            origin: Origin::default(),
        })
    }

    /// 同 [`QueryJoin::new`]，外表直接传表
    pub fn with_table(
        name: impl Into<String>,
        primary: QueryTable,
        foreign: QueryTable,
        condition: Condition,
        join_type: JoinType,
        permanent: bool,
    ) -> Result<Self, QueryError> {
        Self::new(
            name,
            primary,
            TableExpression::new(foreign),
            condition,
            join_type,
            permanent,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn primary_table(&self) -> &QueryTable {
        &self.primary
    }

    pub fn foreign_table_reference(&self) -> &TableExpression {
        &self.foreign
    }

    pub fn foreign_table(&self) -> &QueryTable {
        self.foreign.table()
    }

    pub fn condition(&self) -> &AndCondition {
        &self.condition
    }

    pub fn join_type(&self) -> JoinType {
        self.join_type
    }

    pub fn set_join_type(&mut self, join_type: JoinType) {
        self.join_type = join_type;
    }

    pub fn has_inner_join(&self) -> bool {
        self.join_type == JoinType::Inner
    }

    /// 是否为永久连接
    pub fn is_permanent(&self) -> bool {
        self.permanent
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment(&mut self, comment: Option<String>) {
        self.comment = comment;
    }

    pub fn set_origin<T: Any + Send + Sync>(&mut self, origin: T) {
        self.origin = Origin::new(origin);
    }

    pub fn origin<T: Any>(&self) -> Option<&T> {
        self.origin.downcast_ref()
    }

    /// 原地反转连接方向，改为从外表读起
    ///
    /// 主表与外表互换，列与列之间的等值比较交换操作数，左右外连接互换；
    /// 其它比较条件保持不变
    pub fn invert(&mut self, new_name: impl Into<String>) {
        std::mem::swap(&mut self.primary, self.foreign.table_mut());

        for condition in self.condition.all_conditions_mut() {
            if let Condition::Compare(compare) = condition {
                if compare.operator().is_equality()
                    && compare.operand1().is_column()
                    && compare.operand2().is_column()
                {
                    compare.swap_operands();
                }
            }
        }

        self.join_type = self.join_type.inverted();

        let new_name = new_name.into();
        debug!(from = %self.name, to = %new_name, "inverting join");
        self.name = new_name;
    }
}

/// 检查连接条件的形态：必须是比较条件或只含比较条件的 AND
fn join_condition(
    condition: Condition,
    foreign: &TableExpression,
) -> Result<AndCondition, QueryError> {
    let invalid = |kind| QueryError::InvalidJoinCondition {
        table: foreign.to_string(),
        kind,
    };

    let and = match condition {
        compare @ Condition::Compare(_) => AndCondition::from_conditions(vec![compare]),
        Condition::And(and) => and,
        other => return Err(invalid(other.kind_name())),
    };
    if let Some(child) = and
        .all_conditions()
        .find(|child| !matches!(child, Condition::Compare(_)))
    {
        return Err(invalid(child.kind_name()));
    }
    Ok(and)
}

// 注释、永久标志和来源不参与连接的相等判断
impl PartialEq for QueryJoin {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.condition == other.condition
            && self.foreign == other.foreign
            && self.join_type == other.join_type
            && self.primary == other.primary
    }
}

impl Eq for QueryJoin {}

impl Hash for QueryJoin {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.condition.hash(state);
        self.foreign.hash(state);
        self.join_type.hash(state);
        self.primary.hash(state);
    }
}

impl fmt::Display for QueryJoin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.join_type, self.name)?;
        if self.permanent {
            f.write_str("!")?;
        }
        if let Some(comment) = &self.comment {
            write!(f, " /* {comment} */")?;
        }
        write!(
            f,
            " FROM {} TO {} ON {}",
            self.primary, self.foreign, self.condition
        )
    }
}

impl Visitable for QueryJoin {
    fn accept_visitor(&mut self, visitor: &mut dyn Visitor) {
        visit(&mut self.primary, visitor);
        visit(&mut self.foreign, visitor);
        visit(&mut self.condition, visitor);
    }
}

impl Node for QueryJoin {
    fn as_node(&mut self) -> NodeMut<'_> {
        NodeMut::Join(self)
    }

    fn downcast<'a>(node: NodeMut<'a>) -> Option<&'a mut Self> {
        match node {
            NodeMut::Join(join) => Some(join),
            _ => None,
        }
    }
}

impl QueryElement for QueryJoin {
    const KIND: &'static str = "QueryJoin";

    fn write_replace(&self) -> ReplacedObject {
        let permanent = if self.permanent { PERMANENT_MASK } else { 0 };
        ReplacedObject::new(
            Self::KIND,
            vec![
                Member::text(&self.name),
                Member::object(&self.primary),
                Member::object(&self.foreign),
                Member::object(&self.condition),
                Member::Int(self.join_type.code() | permanent),
                Member::optional_text(self.comment.as_deref()),
            ],
        )
    }

    fn read_replace(object: &ReplacedObject) -> Result<Self, DecodeError> {
        let mut members = object.members_of(Self::KIND)?;
        let name = members.text()?;
        let primary: QueryTable = members.element()?;

        let foreign_object = members.object()?;
        let foreign = if foreign_object.is_kind(QueryTable::KIND) {
            debug!(join = %name, "reading legacy bare foreign table");
            TableExpression::new(QueryTable::read_replace(foreign_object)?)
        } else {
            TableExpression::read_replace(foreign_object)?
        };

        let condition: AndCondition = members.element()?;
        let code = members.int()?;
        let join_type = JoinType::from_code(code & !PERMANENT_MASK)?;

        // 后续版本新增的成员
        let comment = match members.next_optional() {
            None | Some(Member::Null) => None,
            Some(Member::Text(comment)) => Some(comment.clone()),
            Some(_) => return Err(members.mismatch("text")),
        };

        let mut join = Self::new(
            name,
            primary,
            foreign,
            Condition::And(condition),
            join_type,
            code & PERMANENT_MASK != 0,
        )?;
        join.comment = comment;
        Ok(join)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::QueryColumn;
    use crate::condition::OrCondition;
    use crate::operator::Operator;
    use crate::serialize::{from_json, to_json};
    use crate::value::Value;

    fn tables() -> (QueryTable, QueryTable) {
        (QueryTable::new("orders"), QueryTable::new("customers"))
    }

    fn key_equality() -> Condition {
        let (orders, customers) = tables();
        Condition::compare(
            Operator::EQUALS,
            QueryColumn::new(orders, "customer_id"),
            QueryColumn::new(customers, "id"),
        )
    }

    fn join(join_type: JoinType) -> QueryJoin {
        let (orders, customers) = tables();
        QueryJoin::with_table("o_to_c", orders, customers, key_equality(), join_type, false)
            .unwrap()
    }

    #[test]
    fn test_single_comparison_is_wrapped_in_and() {
        let join = join(JoinType::Inner);
        assert_eq!(join.condition().len(), 1);
        assert_eq!(join.condition().conditions(None).unwrap(), &[key_equality()]);
        assert!(join.has_inner_join());
    }

    #[test]
    fn test_non_compare_conditions_are_rejected() {
        let (orders, customers) = tables();
        let or: Condition = OrCondition::from_conditions(vec![key_equality()]).into();

        let err = QueryJoin::with_table(
            "j",
            orders.clone(),
            customers.clone(),
            or.clone(),
            JoinType::Inner,
            false,
        )
        .unwrap_err();
        assert_eq!(
            err,
            QueryError::InvalidJoinCondition {
                table: "customers".to_string(),
                kind: "OrCondition",
            }
        );

        let nested: Condition = AndCondition::from_conditions(vec![key_equality(), or]).into();
        let err =
            QueryJoin::with_table("j", orders, customers, nested, JoinType::Inner, false)
                .unwrap_err();
        assert!(err.to_string().contains("receiving OrCondition"));
    }

    #[test]
    fn test_invert_swaps_tables_operands_and_side() {
        let mut join = join(JoinType::LeftOuter);
        join.invert("c_to_o");

        let (orders, customers) = tables();
        assert_eq!(join.name(), "c_to_o");
        assert_eq!(join.primary_table(), &customers);
        assert_eq!(join.foreign_table(), &orders);
        assert_eq!(join.join_type(), JoinType::RightOuter);

        let expected = Condition::compare(
            Operator::EQUALS,
            QueryColumn::new(customers, "id"),
            QueryColumn::new(orders, "customer_id"),
        );
        assert_eq!(join.condition().conditions(None).unwrap(), &[expected]);
    }

    #[test]
    fn test_invert_leaves_other_comparisons_alone() {
        let (orders, customers) = tables();
        let greater = Condition::compare(
            Operator::GREATER_THAN,
            QueryColumn::new(orders.clone(), "created"),
            QueryColumn::new(customers.clone(), "since"),
        );
        let against_value = Condition::compare(
            Operator::EQUALS,
            QueryColumn::new(customers.clone(), "active"),
            Value::from(true),
        );
        let condition: Condition =
            AndCondition::from_conditions(vec![greater.clone(), against_value.clone()]).into();
        let mut join =
            QueryJoin::with_table("j", orders, customers, condition, JoinType::Inner, false)
                .unwrap();

        join.invert("k");
        assert_eq!(join.condition().conditions(None).unwrap(), &[greater, against_value]);
        assert_eq!(join.join_type(), JoinType::Inner);
    }

    #[test]
    fn test_invert_keeps_groups() {
        let (orders, customers) = tables();
        let mut and = AndCondition::new();
        and.add_named_condition("relation", key_equality());
        let mut join =
            QueryJoin::with_table("j", orders, customers, and.into(), JoinType::Inner, false)
                .unwrap();
        join.invert("k");
        assert!(join.condition().contains_key(Some("relation")));
        assert!(!join.condition().contains_key(None));
    }

    #[test]
    fn test_equality_ignores_comment_permanence_and_origin() {
        let (orders, customers) = tables();
        let plain = join(JoinType::Inner);
        let mut decorated =
            QueryJoin::with_table("o_to_c", orders, customers, key_equality(), JoinType::Inner, true)
                .unwrap();
        decorated.set_comment(Some("from relation".to_string()));
        decorated.set_origin(42_u32);

        assert_eq!(plain, decorated);
        assert_ne!(plain, join(JoinType::LeftOuter));
    }

    #[test]
    fn test_origin_downcast() {
        let mut join = join(JoinType::Inner);
        assert_eq!(join.origin::<String>(), None);
        join.set_origin("relation_a".to_string());
        assert_eq!(join.origin::<String>().map(String::as_str), Some("relation_a"));
        assert_eq!(join.origin::<u32>(), None);
    }

    #[test]
    fn test_display() {
        let mut join = join(JoinType::Inner);
        join.set_comment(Some("c".to_string()));
        assert_eq!(
            join.to_string(),
            "INNER_JOIN o_to_c /* c */ FROM orders TO customers ON (orders.customer_id = customers.id)"
        );
    }

    #[test]
    fn test_join_type_codes() {
        for join_type in [JoinType::Inner, JoinType::LeftOuter, JoinType::RightOuter] {
            assert_eq!(JoinType::from_code(join_type.code()).unwrap(), join_type);
        }
        assert!(matches!(JoinType::from_code(7), Err(DecodeError::InvalidJoinType(7))));
    }

    #[test]
    fn test_permanent_flag_is_packed_into_join_type() {
        let (orders, customers) = tables();
        let join =
            QueryJoin::with_table("j", orders, customers, key_equality(), JoinType::RightOuter, true)
                .unwrap();
        let object = join.write_replace();
        assert_eq!(object.members[4], Member::Int(2 | PERMANENT_MASK));

        let back = QueryJoin::read_replace(&object).unwrap();
        assert!(back.is_permanent());
        assert_eq!(back.join_type(), JoinType::RightOuter);
    }

    #[test]
    fn test_comment_survives_json_transport() {
        let mut join = join(JoinType::LeftOuter);
        join.set_comment(Some("hint".to_string()));
        let back: QueryJoin = from_json(&to_json(&join).unwrap()).unwrap();
        assert_eq!(back, join);
        assert_eq!(back.comment(), Some("hint"));
    }

    #[test]
    fn test_decoding_rechecks_condition_shape() {
        let mut object = join(JoinType::Inner).write_replace();
        let or: Condition = OrCondition::from_conditions(vec![key_equality()]).into();
        let nested = AndCondition::from_conditions(vec![key_equality(), or]);
        object.members[3] = Member::object(&nested);
        assert!(matches!(
            QueryJoin::read_replace(&object),
            Err(DecodeError::Query(QueryError::InvalidJoinCondition { .. }))
        ));
    }

    #[test]
    fn test_decoding_requires_and_condition_member() {
        let mut object = join(JoinType::Inner).write_replace();
        object.members[3] = Member::object(&key_equality());
        assert!(matches!(
            QueryJoin::read_replace(&object),
            Err(DecodeError::UnexpectedKind {
                expected: "AndCondition",
                ..
            })
        ));
    }
}
