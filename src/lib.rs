//! 与数据库方言无关的 SQL 查询树
//!
//! 条件、连接和更新语句都是普通的自有值：按结构比较和哈希，通过 [`visitor`]
//! 遍历和改写，并通过 [`serialize`] 中带版本的载荷写出和读回

pub mod ast;
pub mod condition;
pub mod config;
pub mod element;
pub mod error;
pub mod join;
pub mod operator;
pub mod serialize;
pub mod update;
pub mod value;
pub mod visitor;

pub use ast::{Operand, QueryColumn, QueryTable, TableExpression};
pub use condition::{
    AndCondition, CompareCondition, Condition, ConditionCollector, ConditionGroups, OrCondition,
};
pub use config::TableMappingConfig;
pub use element::QueryElement;
pub use error::{DecodeError, ParseOperatorError, QueryError};
pub use join::{JoinType, Origin, QueryJoin};
pub use operator::{CompareOperator, Modifiers, Operator};
pub use serialize::{from_json, to_json, Member, ReplacedObject, QUERY_SERIALIZE_DOMAIN};
pub use update::QueryUpdate;
pub use value::{AnyValues, Value};
pub use visitor::{deep_clone, visit, NodeMut, Visitable, Visitor, Walk};
