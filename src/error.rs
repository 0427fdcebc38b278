//! 错误类型定义
//!
//! 提取管线的硬错误只有三类，其余情况一律以空缺字段表达（软失败）

use thiserror::Error;

/// 提取过程错误类型
#[derive(Debug, Error)]
pub enum ExtractError {
    /// 结构化转换失败（调用方退回原始 HTML）
    #[error("结构转换失败: {0}")]
    Conversion(String),

    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON 序列化 / 反序列化失败
    #[error("JSON 处理失败: {0}")]
    Json(#[from] serde_json::Error),
}

// ========== 便捷构造函数 ==========

impl ExtractError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        ExtractError::File {
            path: path.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 提取结果类型
pub type ExtractResult<T> = Result<T, ExtractError>;
