//! 选项数据模型
//!
//! 两种题块标记方言的词汇表，以及按位置派生选项字母的规则

/// 题块标记方言
///
/// 宿主页面由两套测评引擎渲染，选项类名体系不同。
/// 定位阶段判定一次，之后显式传给答案检测与解析提取
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// 教师预览样式（.mcq-option 体系）
    Mcq,
    /// Learnosity 渲染样式（.lrn-mcq-option 体系）
    Learnosity,
}

impl Dialect {
    /// 选项元素选择器
    pub fn option_selector(self) -> &'static str {
        match self {
            Dialect::Mcq => ".mcq-option",
            Dialect::Learnosity => ".lrn-mcq-option",
        }
    }

    /// 方言名称（用于日志）
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Mcq => "mcq",
            Dialect::Learnosity => "learnosity",
        }
    }
}

/// 一个候选答案选项的信号快照
#[derive(Debug, Clone, Copy)]
pub struct OptionElement {
    /// 文档顺序中的 0 基索引
    pub index: usize,
    /// 学生是否选择了该选项
    pub is_user_selected: bool,
    /// 该选项是否被标记为正确答案
    pub is_marked_correct: bool,
}

impl OptionElement {
    /// 按索引派生的选项字母
    pub fn letter(&self) -> char {
        letter_for_index(self.index)
    }
}

/// 按 0 基索引派生选项字母
///
/// 0 → 'A'，4 → 'E'，5 → 'F'，依次顺延。
/// 真实页面的选项数不会超出字母表，超出时取模保持函数全定义
pub fn letter_for_index(index: usize) -> char {
    char::from_u32('A' as u32 + (index as u32 % 26)).unwrap_or('A')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_for_index_first_seven() {
        // 字母只看位置，前 7 个依次是 A..G
        let letters: Vec<char> = (0..7).map(letter_for_index).collect();
        assert_eq!(letters, vec!['A', 'B', 'C', 'D', 'E', 'F', 'G']);
    }

    #[test]
    fn test_letter_for_index_past_e() {
        assert_eq!(letter_for_index(5), 'F');
        assert_eq!(letter_for_index(6), 'G');
    }

    #[test]
    fn test_option_letter_matches_index() {
        let option = OptionElement {
            index: 2,
            is_user_selected: true,
            is_marked_correct: false,
        };
        assert_eq!(option.letter(), 'C');
    }

    #[test]
    fn test_dialect_selectors() {
        assert_eq!(Dialect::Mcq.option_selector(), ".mcq-option");
        assert_eq!(Dialect::Learnosity.option_selector(), ".lrn-mcq-option");
    }
}
