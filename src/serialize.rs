//! 所有查询节点共用的带版本载荷协议
//!
//! 节点写成 `(domain, kind, members)`：domain 区分载荷所属的族，kind 标明具体节点，
//! members 是按固定历史顺序排列的字段
//!
//! ## 兼容规则
//!
//! - 读取时按位置取成员。后续版本追加的字段用 [`MemberReader::next_optional`] 读，
//!   较短的旧版载荷会让该字段保持默认值
//! - 字段形态变过的位置，读取时检查实际拿到的成员（例如嵌套对象的 kind），
//!   先把旧形态转换成当前形态再构造节点
//! - 写出时总是当前形态
//! - 调整成员顺序或数量属于不兼容修改，除非读取时按上面的方式做了保护
//!
//! 载荷本身是 serde 数据模型，[`to_json`] 和 [`from_json`] 负责与 JSON 文本互转

use serde::{Deserialize, Serialize};

use crate::element::QueryElement;
use crate::error::DecodeError;
use crate::value::Value;

/// 本模块写出的所有载荷的 domain 标记
pub const QUERY_SERIALIZE_DOMAIN: &str = "query";

/// 节点的外部化形式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplacedObject {
    /// 载荷族
    pub domain: String,
    /// 节点类型
    pub kind: String,
    /// 按位置排列的字段
    pub members: Vec<Member>,
}

/// 载荷成员数组中的一项
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Member {
    /// 缺省的字段
    Null,
    /// 整数
    Int(i64),
    /// 文本
    Text(String),
    /// 标量值
    Value(Value),
    /// 成员列表
    List(Vec<Member>),
    /// 按分组名保存的条件，`None` 为默认分组
    Groups(Vec<(Option<String>, Vec<Member>)>),
    /// 嵌套节点
    Object(ReplacedObject),
}

impl Member {
    pub fn object<T: QueryElement>(node: &T) -> Self {
        Member::Object(node.write_replace())
    }

    pub fn optional_object<T: QueryElement>(node: Option<&T>) -> Self {
        node.map_or(Member::Null, Member::object)
    }

    pub fn list<T: QueryElement>(nodes: &[T]) -> Self {
        Member::List(nodes.iter().map(Member::object).collect())
    }

    pub fn text(text: &str) -> Self {
        Member::Text(text.to_string())
    }

    pub fn optional_text(text: Option<&str>) -> Self {
        text.map_or(Member::Null, Member::text)
    }
}

impl ReplacedObject {
    pub fn new(kind: &str, members: Vec<Member>) -> Self {
        Self {
            domain: QUERY_SERIALIZE_DOMAIN.to_string(),
            kind: kind.to_string(),
            members,
        }
    }

    pub fn check_domain(&self) -> Result<(), DecodeError> {
        if self.domain == QUERY_SERIALIZE_DOMAIN {
            Ok(())
        } else {
            Err(DecodeError::UnknownDomain {
                expected: QUERY_SERIALIZE_DOMAIN,
                found: self.domain.clone(),
            })
        }
    }

    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }

    /// 检查 domain 和 kind，然后在成员上打开按位置读取的游标
    pub fn members_of(&self, kind: &'static str) -> Result<MemberReader<'_>, DecodeError> {
        self.check_domain()?;
        if !self.is_kind(kind) {
            return Err(DecodeError::UnexpectedKind {
                expected: kind,
                found: self.kind.clone(),
            });
        }
        Ok(MemberReader::new(kind, &self.members))
    }
}

/// 按位置读取载荷成员的游标
pub struct MemberReader<'a> {
    kind: &'static str,
    members: &'a [Member],
    position: usize,
}

impl<'a> MemberReader<'a> {
    pub fn new(kind: &'static str, members: &'a [Member]) -> Self {
        Self {
            kind,
            members,
            position: 0,
        }
    }

    pub fn remaining(&self) -> usize {
        self.members.len().saturating_sub(self.position)
    }

    /// 下一个成员，载荷长度不够时报错
    pub fn next_member(&mut self) -> Result<&'a Member, DecodeError> {
        match self.members.get(self.position) {
            Some(member) => {
                self.position += 1;
                Ok(member)
            }
            None => Err(DecodeError::MissingMember {
                kind: self.kind,
                index: self.position,
            }),
        }
    }

    /// 载荷中有下一个成员时返回它，用于后续版本新增的字段
    pub fn next_optional(&mut self) -> Option<&'a Member> {
        let member = self.members.get(self.position)?;
        self.position += 1;
        Some(member)
    }

    /// 针对上一个读到的成员生成错误
    pub fn mismatch(&self, expected: &'static str) -> DecodeError {
        DecodeError::UnexpectedMember {
            kind: self.kind,
            index: self.position.saturating_sub(1),
            expected,
        }
    }

    pub fn text(&mut self) -> Result<String, DecodeError> {
        match self.next_member()? {
            Member::Text(text) => Ok(text.clone()),
            _ => Err(self.mismatch("text")),
        }
    }

    pub fn optional_text(&mut self) -> Result<Option<String>, DecodeError> {
        match self.next_member()? {
            Member::Null => Ok(None),
            Member::Text(text) => Ok(Some(text.clone())),
            _ => Err(self.mismatch("text")),
        }
    }

    pub fn int(&mut self) -> Result<i64, DecodeError> {
        match self.next_member()? {
            Member::Int(n) => Ok(*n),
            _ => Err(self.mismatch("int")),
        }
    }

    pub fn list(&mut self) -> Result<&'a [Member], DecodeError> {
        match self.next_member()? {
            Member::List(members) => Ok(members),
            _ => Err(self.mismatch("list")),
        }
    }

    pub fn object(&mut self) -> Result<&'a ReplacedObject, DecodeError> {
        match self.next_member()? {
            Member::Object(object) => Ok(object),
            _ => Err(self.mismatch("object")),
        }
    }

    pub fn element<T: QueryElement>(&mut self) -> Result<T, DecodeError> {
        T::read_replace(self.object()?)
    }

    pub fn optional_element<T: QueryElement>(&mut self) -> Result<Option<T>, DecodeError> {
        match self.next_member()? {
            Member::Null => Ok(None),
            Member::Object(object) => T::read_replace(object).map(Some),
            _ => Err(self.mismatch("object")),
        }
    }

    /// 节点列表，null 成员读作空列表
    pub fn elements<T: QueryElement>(&mut self) -> Result<Vec<T>, DecodeError> {
        let members = match self.next_member()? {
            Member::Null => return Ok(Vec::new()),
            Member::List(members) => members,
            _ => return Err(self.mismatch("list")),
        };
        members
            .iter()
            .map(|member| match member {
                Member::Object(object) => T::read_replace(object),
                _ => Err(self.mismatch("list of objects")),
            })
            .collect()
    }
}

/// 把节点写成 JSON 载荷文本
pub fn to_json<T: QueryElement>(node: &T) -> serde_json::Result<String> {
    serde_json::to_string(&node.write_replace())
}

/// 从 JSON 载荷文本读回节点，兼容旧版格式
pub fn from_json<T: QueryElement>(text: &str) -> Result<T, DecodeError> {
    let object: ReplacedObject = serde_json::from_str(text)?;
    T::read_replace(&object)
}
