//! 查询节点的树遍历
//!
//! 改写（替换表、替换值）和只读遍历都走同一个入口 [`visit`]。访问者以 [`NodeMut`]
//! 的形式看到每个节点，可以原地覆盖它；之后组合节点继续遍历槽位里现在的节点，
//! 除非访问者返回了 [`Walk::Skip`]

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::ast::{QueryColumn, QueryTable, TableExpression};
use crate::condition::{AndCondition, Condition};
use crate::config::TableMappingConfig;
use crate::element::QueryElement;
use crate::join::QueryJoin;
use crate::update::QueryUpdate;
use crate::value::{AnyValues, Value};

/// 访问完一个节点之后怎么做
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Walk {
    /// 继续遍历槽位中当前节点的子节点
    Continue,
    /// 不再进入该节点的子节点
    Skip,
}

/// 交给访问者的节点可变视图
///
/// 嵌套在条件树里的 AND 会出现两次：先作为装着它的 `Condition` 槽位，
/// 再作为 `AndCondition` 本身。连接和更新语句顶层的 AND 只以 `AndCondition` 出现
#[derive(Debug)]
pub enum NodeMut<'a> {
    Table(&'a mut QueryTable),
    TableExpression(&'a mut TableExpression),
    Column(&'a mut QueryColumn),
    Value(&'a mut Value),
    AnyValues(&'a mut AnyValues),
    Condition(&'a mut Condition),
    AndCondition(&'a mut AndCondition),
    Join(&'a mut QueryJoin),
    Update(&'a mut QueryUpdate),
}

/// 访问者，`FnMut(NodeMut<'_>) -> Walk` 闭包也是访问者
pub trait Visitor {
    fn visit(&mut self, node: NodeMut<'_>) -> Walk;
}

impl<F> Visitor for F
where
    F: FnMut(NodeMut<'_>) -> Walk,
{
    fn visit(&mut self, node: NodeMut<'_>) -> Walk {
        self(node)
    }
}

/// 遍历节点拥有的子节点
pub trait Visitable {
    /// 对每个子节点槽位应用 `visitor`
    fn accept_visitor(&mut self, visitor: &mut dyn Visitor);
}

/// 自身会交给访问者的节点
pub trait Node: Visitable {
    fn as_node(&mut self) -> NodeMut<'_>;

    /// 从视图还原出具体节点类型，类型不符时返回 `None`
    fn downcast<'a>(node: NodeMut<'a>) -> Option<&'a mut Self>
    where
        Self: Sized;
}

/// 对 `node` 应用 `visitor`，再遍历槽位中当前的节点
pub fn visit<T: Node + ?Sized>(node: &mut T, visitor: &mut dyn Visitor) {
    if visitor.visit(node.as_node()) == Walk::Continue {
        node.accept_visitor(visitor);
    }
}

/// 依次访问列表中的每个节点
pub fn visit_all<T: Node>(nodes: &mut [T], visitor: &mut dyn Visitor) {
    for node in nodes {
        visit(node, visitor);
    }
}

/// 节点存在时访问它
pub fn visit_option<T: Node>(node: &mut Option<T>, visitor: &mut dyn Visitor) {
    if let Some(node) = node {
        visit(node, visitor);
    }
}

/// 访问每个分组中的条件，分组名不变
pub fn visit_groups(
    groups: &mut BTreeMap<Option<String>, Vec<Condition>>,
    visitor: &mut dyn Visitor,
) {
    for conditions in groups.values_mut() {
        visit_all(conditions, visitor);
    }
}

/// 查询树的深拷贝
///
/// 每个子节点都由父节点独占，浅拷贝就已经复制了整棵树，副本与原树不共享任何节点
pub fn deep_clone<T: QueryElement>(node: &T) -> T {
    node.shallow_clone()
}

/// 把所有等于 `original` 的节点替换为 `replacement`
///
/// 按值匹配；替换后的节点不会再被遍历，所以替换值中即使包含原值也不会递归替换
#[derive(Debug)]
pub struct ReplaceVisitor<T> {
    original: T,
    replacement: T,
    replaced: usize,
}

impl<T> ReplaceVisitor<T> {
    pub fn new(original: T, replacement: T) -> Self {
        Self {
            original,
            replacement,
            replaced: 0,
        }
    }

    /// 到目前为止替换的次数
    pub fn replaced(&self) -> usize {
        self.replaced
    }
}

impl<T: Node + PartialEq + Clone> Visitor for ReplaceVisitor<T> {
    fn visit(&mut self, node: NodeMut<'_>) -> Walk {
        match T::downcast(node) {
            Some(found) if *found == self.original => {
                *found = self.replacement.clone();
                self.replaced += 1;
                Walk::Skip
            }
            _ => Walk::Continue,
        }
    }
}

/// 按表映射把表改成物理表名，例如把针对一个库构建的查询用到另一个库上
#[derive(Debug)]
pub struct RetargetVisitor<'a> {
    mapping: &'a TableMappingConfig,
    renamed: usize,
}

impl<'a> RetargetVisitor<'a> {
    pub fn new(mapping: &'a TableMappingConfig) -> Self {
        Self {
            mapping,
            renamed: 0,
        }
    }

    pub fn renamed(&self) -> usize {
        self.renamed
    }
}

impl Visitor for RetargetVisitor<'_> {
    fn visit(&mut self, node: NodeMut<'_>) -> Walk {
        if let NodeMut::Table(table) = node {
            let physical = self.mapping.get_table_name(table.name());
            if physical != table.name() {
                debug!(from = table.name(), to = %physical, "retargeting table");
                table.set_name(physical);
                self.renamed += 1;
            }
        }
        Walk::Continue
    }
}

/// 从 `node` 可达的所有不同的表，包括列所在的表
///
/// 通过可变入口遍历，但不做任何修改
pub fn referenced_tables<T: Node>(node: &mut T) -> BTreeSet<QueryTable> {
    let mut tables = BTreeSet::new();
    let mut collect = |node: NodeMut<'_>| {
        if let NodeMut::Table(table) = node {
            tables.insert(table.clone());
        }
        Walk::Continue
    };
    visit(node, &mut collect);
    tables
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Operand;
    use crate::condition::CompareCondition;
    use crate::join::{JoinType, QueryJoin};
    use crate::operator::Operator;
    use std::collections::hash_map::DefaultHasher;
    use std::collections::HashMap;
    use std::hash::{Hash, Hasher};

    fn hash_of<T: Hash>(value: &T) -> u64 {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        hasher.finish()
    }

    fn orders_join() -> QueryJoin {
        let orders = QueryTable::new("orders");
        let customers = QueryTable::new("customers");
        let condition = Condition::compare(
            Operator::EQUALS,
            QueryColumn::new(orders.clone(), "customer_id"),
            QueryColumn::new(customers.clone(), "id"),
        );
        QueryJoin::with_table(
            "orders_to_customers",
            orders,
            customers,
            condition,
            JoinType::Inner,
            false,
        )
        .unwrap()
    }

    #[test]
    fn test_deep_clone_is_equal_but_distinct() {
        let join = orders_join();
        let copy = deep_clone(&join);

        assert!(!std::ptr::eq(&join, &copy));
        assert_eq!(copy, join);
        assert_eq!(hash_of(&copy), hash_of(&join));
    }

    #[test]
    fn test_deep_clone_does_not_share_children() {
        let join = orders_join();
        let mut copy = deep_clone(&join);
        copy.invert("customers_to_orders");

        assert_ne!(copy, join);
        assert_eq!(join.name(), "orders_to_customers");
        assert_eq!(join.primary_table().name(), "orders");
        assert_eq!(join.join_type(), JoinType::Inner);
    }

    #[test]
    fn test_replace_visitor_by_value() {
        let mut join = orders_join();
        let mut replace =
            ReplaceVisitor::new(QueryTable::new("orders"), QueryTable::new("archived_orders"));
        visit(&mut join, &mut replace);

        // 主表加上列所在的表
        assert_eq!(replace.replaced(), 2);
        assert_eq!(join.primary_table().name(), "archived_orders");
        let tables = referenced_tables(&mut join);
        assert!(!tables.contains(&QueryTable::new("orders")));
    }

    #[test]
    fn test_replace_visitor_on_values() {
        let column = QueryColumn::new(QueryTable::new("t"), "a");
        let mut condition = Condition::compare(Operator::EQUALS, column.clone(), Value::from(5));
        let mut replace = ReplaceVisitor::new(Value::from(5), Value::from(6));
        visit(&mut condition, &mut replace);

        assert_eq!(replace.replaced(), 1);
        assert_eq!(condition, Condition::compare(Operator::EQUALS, column, Value::from(6)));
    }

    #[test]
    fn test_retarget_visitor_renames_every_table() {
        let mut mapping = HashMap::new();
        mapping.insert("orders".to_string(), "sales_orders".to_string());
        mapping.insert("customers".to_string(), "crm_customers".to_string());
        let config = TableMappingConfig::new(mapping);

        let mut join = orders_join();
        let mut retarget = RetargetVisitor::new(&config);
        visit(&mut join, &mut retarget);

        let names: Vec<String> = referenced_tables(&mut join)
            .into_iter()
            .map(|table| table.name().to_string())
            .collect();
        assert_eq!(names, vec!["crm_customers", "sales_orders"]);
        // 主表、外表，以及每个比较列所在的表
        assert_eq!(retarget.renamed(), 4);
    }

    #[test]
    fn test_skip_stops_descent() {
        let mut join = orders_join();
        let mut seen = Vec::new();
        let mut visitor = |node: NodeMut<'_>| match node {
            NodeMut::AndCondition(_) => Walk::Skip,
            NodeMut::Column(column) => {
                seen.push(column.name().to_string());
                Walk::Continue
            }
            _ => Walk::Continue,
        };
        visit(&mut join, &mut visitor);
        assert!(seen.is_empty());
    }

    #[test]
    fn test_visitor_sees_conditions_in_every_group() {
        let t = QueryTable::new("t");
        let a = QueryColumn::new(t.clone(), "a");
        let b = QueryColumn::new(t, "b");
        let mut and = AndCondition::new();
        and.add_condition(Condition::compare(Operator::EQUALS, a, Value::from(1)));
        and.add_named_condition("f", Condition::compare(Operator::EQUALS, b, Value::from(2)));

        let mut count = 0;
        let mut visitor = |node: NodeMut<'_>| {
            if let NodeMut::Condition(Condition::Compare(_)) = node {
                count += 1;
            }
            Walk::Continue
        };
        visit(&mut and, &mut visitor);
        assert_eq!(count, 2);
    }

    #[test]
    fn test_visitor_can_swap_a_leaf() {
        let t = QueryTable::new("t");
        let a = QueryColumn::new(t.clone(), "a");
        let mut and = AndCondition::new();
        and.add_named_condition("f", Condition::compare(Operator::EQUALS, a, Value::from(1)));
        let replacement = Condition::Compare(CompareCondition::new(
            Operator::GREATER_THAN,
            Operand::from(QueryColumn::new(t, "a")),
            Operand::from(Value::from(0)),
        ));

        let mut visitor = |node: NodeMut<'_>| {
            if let NodeMut::Condition(condition) = node {
                *condition = replacement.clone();
                return Walk::Skip;
            }
            Walk::Continue
        };
        visit(&mut and, &mut visitor);

        assert_eq!(and.conditions(Some("f")), Some(&[replacement][..]));
    }
}
