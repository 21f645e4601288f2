//! 配置模块，负责加载表映射的JSON配置文件

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// 表映射配置结构
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMappingConfig {
    /// 逻辑表名到物理表名的映射
    #[serde(flatten)]
    pub mappings: HashMap<String, String>,
}

impl TableMappingConfig {
    pub fn new(mappings: HashMap<String, String>) -> Self {
        Self { mappings }
    }

    /// 从JSON文件加载表映射配置，文件内容为 `"逻辑表名": "物理表名"` 的平铺对象
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read table mapping file {}", path.display()))?;
        let mappings: HashMap<String, String> = serde_json::from_str(&content)
            .with_context(|| format!("cannot parse table mapping file {}", path.display()))?;

        info!(path = %path.display(), tables = mappings.len(), "loaded table mapping");
        Ok(Self { mappings })
    }

    /// 获取表对应的物理表名，没有映射时保持原名
    pub fn get_table_name(&self, table: &str) -> String {
        self.mappings
            .get(table)
            .cloned()
            .unwrap_or_else(|| table.to_string())
    }

    /// 获取所有映射
    pub fn get_mappings(&self) -> &HashMap<String, String> {
        &self.mappings
    }
}
