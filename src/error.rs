//! 错误类型：节点构造错误与载荷解码错误

use thiserror::Error as ThisError;

/// 构造节点时发现的结构错误
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum QueryError {
    /// 连接条件中出现了比较条件以外的节点
    #[error("expecting compare-condition in join on table {table}, receiving {kind}")]
    InvalidJoinCondition { table: String, kind: &'static str },
}

/// 不符合 `[修饰符]运算符` 格式的运算符文本
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
#[error("unknown operator '{0}'")]
pub struct ParseOperatorError(pub String);

/// 从序列化载荷读回节点时的错误
///
/// 只接受已知的旧版格式，其它与当前布局不符的载荷都在这里报错
#[derive(Debug, ThisError)]
pub enum DecodeError {
    /// 载荷的 domain 不是本模块的
    #[error("payload domain '{found}' is not '{expected}'")]
    UnknownDomain { expected: &'static str, found: String },

    /// 载荷的 kind 与期望的节点类型不符
    #[error("expected a {expected} payload, found '{found}'")]
    UnexpectedKind { expected: &'static str, found: String },

    /// 载荷成员数量不足
    #[error("{kind} payload is missing member #{index}")]
    MissingMember { kind: &'static str, index: usize },

    /// 某个位置上的成员类型不对
    #[error("{kind} payload member #{index} is not a {expected}")]
    UnexpectedMember {
        kind: &'static str,
        index: usize,
        expected: &'static str,
    },

    /// 未知的连接类型编码
    #[error("unknown join type code {0}")]
    InvalidJoinType(i64),

    /// 未知的运算符编码
    #[error("unknown operator code {0}")]
    InvalidOperator(i64),

    /// 更新语句的列与值数量不一致
    #[error("update pairs {columns} columns with {values} values")]
    UnpairedValues { columns: usize, values: usize },

    /// JSON 文本无法解析
    #[error("malformed payload text: {0}")]
    Json(#[from] serde_json::Error),

    /// 解码后重新构造节点失败
    #[error(transparent)]
    Query(#[from] QueryError),
}
