//! 条件树：比较条件叶子节点与 AND/OR 组合条件
//!
//! 组合条件的子条件不是平铺的列表，而是按分组名保存：`None` 是默认分组，
//! 其它分组名标记某个调用方加入的条件，调用方之后可以用
//! [`ConditionGroups::remove_key`] 只撤回自己那一组，其它调用方的条件不受影响。
//! 逻辑上的子条件是所有分组的并集

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};

use tracing::debug;

use crate::ast::Operand;
use crate::element::QueryElement;
use crate::error::DecodeError;
use crate::operator::Operator;
use crate::serialize::{Member, MemberReader, ReplacedObject};
use crate::visitor::{visit, visit_groups, Node, NodeMut, Visitable, Visitor};

const NOT_KIND: &str = "NotCondition";

/// 比较条件 `operand1 <operator> operand2`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompareCondition {
    /// 比较运算符
    operator: Operator,
    /// 左操作数
    operand1: Operand,
    /// 右操作数
    operand2: Operand,
}

impl CompareCondition {
    pub fn new(operator: Operator, operand1: Operand, operand2: Operand) -> Self {
        Self {
            operator,
            operand1,
            operand2,
        }
    }

    pub fn operator(&self) -> Operator {
        self.operator
    }

    pub fn operand1(&self) -> &Operand {
        &self.operand1
    }

    pub fn operand2(&self) -> &Operand {
        &self.operand2
    }

    /// 交换左右操作数，运算符保持不变
    pub fn swap_operands(&mut self) {
        std::mem::swap(&mut self.operand1, &mut self.operand2);
    }
}

impl fmt::Display for CompareCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.operand1, self.operator, self.operand2)
    }
}

impl Visitable for CompareCondition {
    fn accept_visitor(&mut self, visitor: &mut dyn Visitor) {
        self.operand1.accept(visitor);
        self.operand2.accept(visitor);
    }
}

impl QueryElement for CompareCondition {
    const KIND: &'static str = "CompareCondition";

    fn write_replace(&self) -> ReplacedObject {
        ReplacedObject::new(
            Self::KIND,
            vec![
                Member::Int(self.operator.code()),
                self.operand1.to_member(),
                self.operand2.to_member(),
            ],
        )
    }

    fn read_replace(object: &ReplacedObject) -> Result<Self, DecodeError> {
        let mut members = object.members_of(Self::KIND)?;
        let operator = Operator::from_code(members.int()?)?;
        let operand1 = Operand::read(&mut members)?;
        let operand2 = Operand::read(&mut members)?;
        Ok(Self::new(operator, operand1, operand2))
    }
}

/// 组合条件按分组保存的子条件
///
/// 不会保存空分组：加入 `None` 不会建组，把分组替换为空会删除该分组
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConditionGroups {
    /// 分组名到条件列表的映射，`None` 为默认分组
    groups: BTreeMap<Option<String>, Vec<Condition>>,
}

impl ConditionGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// 所有条件放入默认分组
    pub fn from_conditions(conditions: Vec<Condition>) -> Self {
        let mut groups = BTreeMap::new();
        if !conditions.is_empty() {
            groups.insert(None, conditions);
        }
        Self { groups }
    }

    /// 追加到默认分组，`None` 忽略
    pub fn add_condition(&mut self, condition: impl Into<Option<Condition>>) {
        self.add_to_group(None, condition);
    }

    /// 追加到分组 `key`，分组不存在时创建
    pub fn add_named_condition(&mut self, key: &str, condition: impl Into<Option<Condition>>) {
        self.add_to_group(Some(key), condition);
    }

    /// 追加到指定分组，`key` 为 `None` 时即默认分组
    pub fn add_to_group(&mut self, key: Option<&str>, condition: impl Into<Option<Condition>>) {
        if let Some(condition) = condition.into() {
            self.groups
                .entry(key.map(str::to_string))
                .or_default()
                .push(condition);
        }
    }

    /// 整体替换分组 `key`，传 `None` 则删除该分组
    pub fn set_named_condition(&mut self, key: &str, condition: Option<Condition>) {
        match condition {
            Some(condition) => {
                self.groups.insert(Some(key.to_string()), vec![condition]);
            }
            None => {
                self.remove_key(key);
            }
        }
    }

    /// 删除命名分组及其中所有条件
    pub fn remove_key(&mut self, key: &str) -> bool {
        self.remove_group(Some(key))
    }

    /// 删除指定分组，返回分组是否存在
    pub fn remove_group(&mut self, key: Option<&str>) -> bool {
        self.groups.remove(&key.map(str::to_string)).is_some()
    }

    /// 指定分组的条件列表
    pub fn conditions(&self, key: Option<&str>) -> Option<&[Condition]> {
        self.groups
            .get(&key.map(str::to_string))
            .map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: Option<&str>) -> bool {
        self.conditions(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = Option<&str>> {
        self.groups.keys().map(Option::as_deref)
    }

    /// 所有子条件，先默认分组，再按分组名顺序
    pub fn all_conditions(&self) -> impl Iterator<Item = &Condition> {
        self.groups.values().flatten()
    }

    pub fn groups(&self) -> &BTreeMap<Option<String>, Vec<Condition>> {
        &self.groups
    }

    pub(crate) fn all_conditions_mut(&mut self) -> impl Iterator<Item = &mut Condition> {
        self.groups.values_mut().flatten()
    }

    /// 所有分组的子条件总数
    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// 空的组合条件等同于没有条件
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// 按分组逐个追加 `other` 的条件
    pub fn merge(&mut self, other: ConditionGroups) {
        for (key, conditions) in other.groups {
            self.groups.entry(key).or_default().extend(conditions);
        }
    }

    fn fmt_joined(&self, f: &mut fmt::Formatter<'_>, keyword: &str) -> fmt::Result {
        f.write_str("(")?;
        for (i, condition) in self.all_conditions().enumerate() {
            if i > 0 {
                write!(f, " {keyword} ")?;
            }
            write!(f, "{condition}")?;
        }
        f.write_str(")")
    }

    fn to_member(&self) -> Member {
        Member::Groups(
            self.groups
                .iter()
                .map(|(key, conditions)| {
                    (key.clone(), conditions.iter().map(Member::object).collect())
                })
                .collect(),
        )
    }

    /// 读取分组成员，兼容旧版的平铺列表格式
    fn read(members: &mut MemberReader<'_>) -> Result<Self, DecodeError> {
        match members.next_member()? {
            Member::Groups(entries) => {
                let mut groups = BTreeMap::new();
                for (key, entry) in entries {
                    let conditions = read_conditions(entry, members)?;
                    if conditions.is_empty() {
                        continue;
                    }
                    if groups.insert(key.clone(), conditions).is_some() {
                        return Err(members.mismatch("condition groups"));
                    }
                }
                Ok(Self { groups })
            }
            Member::List(entry) => {
                // 旧版平铺列表，后面可能跟着组合条件的名字
                let conditions = read_conditions(entry, members)?;
                let key = match members.next_optional() {
                    None | Some(Member::Null) => None,
                    Some(Member::Text(name)) => Some(name.clone()),
                    Some(_) => return Err(members.mismatch("text")),
                };
                debug!(?key, count = conditions.len(), "reading legacy flat condition list");
                let mut groups = Self::new();
                for condition in conditions {
                    groups.add_to_group(key.as_deref(), condition);
                }
                Ok(groups)
            }
            _ => Err(members.mismatch("condition groups")),
        }
    }
}

fn read_conditions(
    entry: &[Member],
    members: &MemberReader<'_>,
) -> Result<Vec<Condition>, DecodeError> {
    entry
        .iter()
        .map(|member| match member {
            Member::Object(object) => Condition::read_replace(object),
            _ => Err(members.mismatch("list of conditions")),
        })
        .collect()
}

/// 为组合条件收集子条件
///
/// 分批收集的结果按拼接合并，最终顺序就是合并的顺序
#[derive(Debug, Default)]
pub struct ConditionCollector {
    conditions: Vec<Condition>,
}

impl ConditionCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, condition: Condition) {
        self.conditions.push(condition);
    }

    pub fn merge(mut self, other: ConditionCollector) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    pub fn finish<T: From<Vec<Condition>>>(self) -> T {
        T::from(self.conditions)
    }
}

/// AND/OR 组合条件共用的合并接口
trait Composite: Default + DerefMut<Target = ConditionGroups> + Into<Condition> {
    fn take(condition: Condition) -> Result<Self, Condition>;
    fn into_groups(self) -> ConditionGroups;
}

macro_rules! composite_condition {
    ($(#[$doc:meta])* $name:ident, $variant:ident, $kind:literal, $keyword:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
        pub struct $name {
            groups: ConditionGroups,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn from_conditions(conditions: Vec<Condition>) -> Self {
                Self {
                    groups: ConditionGroups::from_conditions(conditions),
                }
            }

            pub fn into_groups(self) -> ConditionGroups {
                self.groups
            }
        }

        impl Deref for $name {
            type Target = ConditionGroups;

            fn deref(&self) -> &ConditionGroups {
                &self.groups
            }
        }

        impl DerefMut for $name {
            fn deref_mut(&mut self) -> &mut ConditionGroups {
                &mut self.groups
            }
        }

        impl From<Vec<Condition>> for $name {
            fn from(conditions: Vec<Condition>) -> Self {
                Self::from_conditions(conditions)
            }
        }

        impl From<$name> for Condition {
            fn from(condition: $name) -> Self {
                Condition::$variant(condition)
            }
        }

        impl FromIterator<Condition> for $name {
            fn from_iter<I: IntoIterator<Item = Condition>>(iter: I) -> Self {
                iter.into_iter()
                    .fold(ConditionCollector::new(), |mut collector, condition| {
                        collector.push(condition);
                        collector
                    })
                    .finish()
            }
        }

        impl Extend<Condition> for $name {
            fn extend<I: IntoIterator<Item = Condition>>(&mut self, iter: I) {
                for condition in iter {
                    self.groups.add_condition(condition);
                }
            }
        }

        impl Composite for $name {
            fn take(condition: Condition) -> Result<Self, Condition> {
                match condition {
                    Condition::$variant(composite) => Ok(composite),
                    other => Err(other),
                }
            }

            fn into_groups(self) -> ConditionGroups {
                self.groups
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.groups.fmt_joined(f, $keyword)
            }
        }

        impl Visitable for $name {
            fn accept_visitor(&mut self, visitor: &mut dyn Visitor) {
                visit_groups(&mut self.groups.groups, visitor);
            }
        }

        impl QueryElement for $name {
            const KIND: &'static str = $kind;

            fn write_replace(&self) -> ReplacedObject {
                ReplacedObject::new(Self::KIND, vec![self.groups.to_member()])
            }

            fn read_replace(object: &ReplacedObject) -> Result<Self, DecodeError> {
                let mut members = object.members_of(Self::KIND)?;
                Ok(Self {
                    groups: ConditionGroups::read(&mut members)?,
                })
            }
        }
    };
}

composite_condition!(
    /// 所有子条件的逻辑与 (AND)
    AndCondition,
    And,
    "AndCondition",
    "AND"
);

composite_condition!(
    /// 所有子条件的逻辑或 (OR)
    OrCondition,
    Or,
    "OrCondition",
    "OR"
);

impl Node for AndCondition {
    fn as_node(&mut self) -> NodeMut<'_> {
        NodeMut::AndCondition(self)
    }

    fn downcast<'a>(node: NodeMut<'a>) -> Option<&'a mut Self> {
        match node {
            NodeMut::AndCondition(condition) => Some(condition),
            _ => None,
        }
    }
}

/// 条件表达式树
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    /// 比较运算, 这是条件的叶子节点
    Compare(CompareCondition),
    /// 逻辑与运算 (AND)
    And(AndCondition),
    /// 逻辑或运算 (OR)
    Or(OrCondition),
    /// 逻辑非运算 (NOT)
    Not(Box<Condition>),
}

impl Condition {
    pub fn compare(
        operator: Operator,
        operand1: impl Into<Operand>,
        operand2: impl Into<Operand>,
    ) -> Self {
        Condition::Compare(CompareCondition::new(
            operator,
            operand1.into(),
            operand2.into(),
        ))
    }

    pub fn not(condition: Condition) -> Self {
        Condition::Not(Box::new(condition))
    }

    /// 节点在载荷中的 kind，也用于错误信息
    pub fn kind_name(&self) -> &'static str {
        match self {
            Condition::Compare(_) => CompareCondition::KIND,
            Condition::And(_) => AndCondition::KIND,
            Condition::Or(_) => OrCondition::KIND,
            Condition::Not(_) => NOT_KIND,
        }
    }

    /// 没有子条件的组合条件
    pub fn is_absent(&self) -> bool {
        match self {
            Condition::And(and) => and.is_empty(),
            Condition::Or(or) => or.is_empty(),
            _ => false,
        }
    }

    /// `left AND right`，缺失的一侧被忽略；AND 操作数按分组合并而不是嵌套
    pub fn and(left: Option<Condition>, right: Option<Condition>) -> Option<Condition> {
        combine::<AndCondition>(left, right)
    }

    /// `left OR right`，OR 操作数同样展开合并
    pub fn or(left: Option<Condition>, right: Option<Condition>) -> Option<Condition> {
        combine::<OrCondition>(left, right)
    }
}

fn combine<C: Composite>(left: Option<Condition>, right: Option<Condition>) -> Option<Condition> {
    let left = left.filter(|condition| !condition.is_absent());
    let right = right.filter(|condition| !condition.is_absent());
    let (left, right) = match (left, right) {
        (None, other) | (other, None) => return other,
        (Some(left), Some(right)) => (left, right),
    };

    let mut combined = C::take(left).unwrap_or_else(|single| {
        let mut composite = C::default();
        composite.add_condition(single);
        composite
    });
    match C::take(right) {
        Ok(composite) => combined.merge(composite.into_groups()),
        Err(single) => combined.add_condition(single),
    }
    Some(combined.into())
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Condition::Compare(compare) => fmt::Display::fmt(compare, f),
            Condition::And(and) => fmt::Display::fmt(and, f),
            Condition::Or(or) => fmt::Display::fmt(or, f),
            Condition::Not(inner) => write!(f, "NOT {inner}"),
        }
    }
}

impl From<CompareCondition> for Condition {
    fn from(condition: CompareCondition) -> Self {
        Condition::Compare(condition)
    }
}

impl Visitable for Condition {
    fn accept_visitor(&mut self, visitor: &mut dyn Visitor) {
        match self {
            Condition::Compare(compare) => compare.accept_visitor(visitor),
            Condition::And(and) => visit(and, visitor),
            Condition::Or(or) => or.accept_visitor(visitor),
            Condition::Not(inner) => visit(&mut **inner, visitor),
        }
    }
}

impl Node for Condition {
    fn as_node(&mut self) -> NodeMut<'_> {
        NodeMut::Condition(self)
    }

    fn downcast<'a>(node: NodeMut<'a>) -> Option<&'a mut Self> {
        match node {
            NodeMut::Condition(condition) => Some(condition),
            _ => None,
        }
    }
}

impl QueryElement for Condition {
    const KIND: &'static str = "Condition";

    fn write_replace(&self) -> ReplacedObject {
        match self {
            Condition::Compare(compare) => compare.write_replace(),
            Condition::And(and) => and.write_replace(),
            Condition::Or(or) => or.write_replace(),
            Condition::Not(inner) => {
                ReplacedObject::new(NOT_KIND, vec![Member::object(&**inner)])
            }
        }
    }

    fn read_replace(object: &ReplacedObject) -> Result<Self, DecodeError> {
        object.check_domain()?;
        match object.kind.as_str() {
            kind if kind == CompareCondition::KIND => {
                CompareCondition::read_replace(object).map(Condition::Compare)
            }
            kind if kind == AndCondition::KIND => {
                AndCondition::read_replace(object).map(Condition::And)
            }
            kind if kind == OrCondition::KIND => {
                OrCondition::read_replace(object).map(Condition::Or)
            }
            NOT_KIND => {
                let mut members = object.members_of(NOT_KIND)?;
                Ok(Condition::not(members.element()?))
            }
            other => Err(DecodeError::UnexpectedKind {
                expected: Self::KIND,
                found: other.to_string(),
            }),
        }
    }
}
