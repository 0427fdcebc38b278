//! 提取结果数据模型
//!
//! 与下游消费方约定的 JSON 记录，键名为 camelCase，缺失值序列化为 null

use serde::{Deserialize, Serialize};

use crate::error::ExtractResult;

/// 单个选项的解析条目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RationaleEntry {
    /// 选项字母（按位置派生，不读取页面上的字母文本）
    pub answer: char,
    /// 解析文本（已去除首尾空白）
    pub rationale: String,
}

/// 一次页面提取的完整结果
///
/// 每次调用产生一份，创建后不再修改，由调用方持有
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    /// 题干 Markdown（不含解析区）
    pub content: String,
    /// 解析区 Markdown（页面未给出分界词时为 None）
    pub explanation: Option<String>,
    /// 学生选择的选项字母
    pub user_answer: Option<char>,
    /// 正确答案的选项字母
    pub correct_answer: Option<char>,
    /// 按文档顺序排列的逐选项解析
    pub rationales: Vec<RationaleEntry>,
    /// 页面标题
    pub title: String,
}

impl ExtractionResult {
    /// 序列化为下游消费的 JSON 文本
    pub fn to_json(&self) -> ExtractResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_keys_are_camel_case() {
        let result = ExtractionResult {
            content: "题干".to_string(),
            explanation: None,
            user_answer: Some('B'),
            correct_answer: Some('A'),
            rationales: vec![RationaleEntry {
                answer: 'A',
                rationale: "解析".to_string(),
            }],
            title: "测试页".to_string(),
        };

        let json = result.to_json().expect("序列化成功");
        assert!(json.contains("\"userAnswer\": \"B\""));
        assert!(json.contains("\"correctAnswer\": \"A\""));
        // 缺失字段输出 null 而不是被省略
        assert!(json.contains("\"explanation\": null"));
    }

    #[test]
    fn test_json_round_trip() {
        let result = ExtractionResult {
            content: "1 + 1 = ?".to_string(),
            explanation: Some("Solution: 2".to_string()),
            user_answer: None,
            correct_answer: Some('C'),
            rationales: vec![],
            title: "Quiz".to_string(),
        };

        let json = result.to_json().expect("序列化成功");
        let parsed: ExtractionResult = serde_json::from_str(&json).expect("反序列化成功");
        assert_eq!(parsed, result);
    }
}
