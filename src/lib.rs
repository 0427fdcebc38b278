//! # Question Extract
//!
//! 一个从测验预览页提取题目内容的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的三层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有解析后的页面快照，只暴露能力
//! - `PageDom` - 唯一的解析树 owner，提供查询 / 遍历能力
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个页面
//! - `RootLocator` - 题块定位与方言判定能力
//! - `AnswerDetector` - 答案信号检测能力
//! - `RationaleExtractor` - 选项解析提取能力
//! - `MarkdownConverter` - HTML → Markdown 转换能力
//! - `ContentReader` - 正文读取能力（可替换）
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个页面"的完整提取流程
//! - `ExtractFlow` - 流程编排（定位 → 检测 → 转换 → 组装）
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{ExtractError, ExtractResult};
pub use infrastructure::PageDom;
pub use models::{Dialect, ExtractionResult, RationaleEntry};
pub use services::{ContentReader, PageContent};
pub use workflow::ExtractFlow;
