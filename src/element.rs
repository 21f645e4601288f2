//! 所有查询节点共有的能力

use std::fmt;
use std::hash::Hash;

use crate::error::DecodeError;
use crate::serialize::ReplacedObject;
use crate::visitor::Visitable;

/// 查询树中的节点
///
/// 节点可以被访问者遍历（见 [`Visitable`]），按结构值比较和哈希，
/// 并能通过带版本的载荷协议写出和读回
pub trait QueryElement: Visitable + Clone + Eq + Hash + fmt::Debug + Sized {
    /// 写入载荷的 kind 标记
    const KIND: &'static str;

    /// 复制节点自身的字段
    ///
    /// 子节点由父节点独占，副本不会与原树共享任何节点，修改其中一个不会影响另一个
    fn shallow_clone(&self) -> Self {
        self.clone()
    }

    /// 写出当前版本的载荷
    fn write_replace(&self) -> ReplacedObject;

    /// 读回载荷，兼容旧版格式
    fn read_replace(object: &ReplacedObject) -> Result<Self, DecodeError>;
}
