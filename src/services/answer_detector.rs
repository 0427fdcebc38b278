//! 答案信号检测服务 - 业务能力层
//!
//! 职责：
//! - 在作用域内扫描选项元素
//! - 识别学生选择信号（按方言各有一串优先级）
//! - 识别正确答案标记
//! - 两者都齐时交叉核对，只有正确答案时按假设兜底
//!
//! 页面只在作答后渲染这些信号，全部缺席是正常情况

use scraper::{ElementRef, Selector};
use tracing::{debug, info, warn};

use crate::infrastructure::PageDom;
use crate::models::{Dialect, OptionElement};
use crate::services::root_locator::QuestionScope;

/// 选择信号的 aria 属性，按检查顺序排列
const ARIA_SELECTED_ATTRS: [&str; 3] = ["aria-pressed", "aria-selected", "aria-checked"];

/// 一次检测的产出
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetectedAnswers {
    /// 学生选择的选项字母
    pub user_answer: Option<char>,
    /// 页面标记的正确选项字母
    pub correct_answer: Option<char>,
}

/// 答案信号检测服务
pub struct AnswerDetector {
    mcq_options: Selector,
    lrn_options: Selector,
    chosen_letter: Selector,
    correct_icon: Selector,
    checked_input: Selector,
}

impl AnswerDetector {
    pub fn new() -> Self {
        Self {
            mcq_options: Selector::parse(Dialect::Mcq.option_selector()).expect("合法选择器"),
            lrn_options: Selector::parse(Dialect::Learnosity.option_selector())
                .expect("合法选择器"),
            chosen_letter: Selector::parse(".letter.--chosen").expect("合法选择器"),
            correct_icon: Selector::parse(".icon.--correct").expect("合法选择器"),
            checked_input: Selector::parse("input[checked]").expect("合法选择器"),
        }
    }

    /// 检测学生答案与正确答案
    ///
    /// # 参数
    /// * `dom` - 页面文档
    /// * `scope` - 已锁定的题块作用域
    ///
    /// # 返回
    /// 两个字母都可能缺席，缺席不是错误
    pub fn detect<'a>(&self, dom: &'a PageDom, scope: &QuestionScope<'a>) -> DetectedAnswers {
        let options = self.options_in_scope(dom, scope);
        if options.is_empty() {
            debug!("作用域内没有选项元素，跳过答案检测");
            return DetectedAnswers::default();
        }
        info!(
            "🔍 检测答案信号，共 {} 个选项 (方言: {})",
            options.len(),
            scope.dialect.name()
        );

        let snapshots = self.snapshot_options(&options, scope.dialect);
        let correct_answer = snapshots
            .iter()
            .find(|o| o.is_marked_correct)
            .map(OptionElement::letter);
        let mut user_answer = snapshots
            .iter()
            .find(|o| o.is_user_selected)
            .map(OptionElement::letter);

        // 只有正确标记而没有选择信号时，按"学生选了正确答案"处理
        if user_answer.is_none() {
            if let Some(letter) = correct_answer {
                warn!("⚠️ 未发现选择信号，按\"选了正确答案\"假设处理: {}", letter);
                user_answer = Some(letter);
            }
        }

        DetectedAnswers {
            user_answer,
            correct_answer,
        }
    }

    /// 把每个选项读成一份信号快照
    fn snapshot_options(
        &self,
        options: &[ElementRef<'_>],
        dialect: Dialect,
    ) -> Vec<OptionElement> {
        let correct_index = self.correct_index(options, dialect);
        options
            .iter()
            .enumerate()
            .map(|(index, option)| {
                let signal = match dialect {
                    Dialect::Mcq => self.mcq_selected_signal(*option),
                    Dialect::Learnosity => self.lrn_selected_signal(*option),
                };
                let snapshot = OptionElement {
                    index,
                    is_user_selected: signal.is_some(),
                    is_marked_correct: Some(index) == correct_index,
                };
                if let Some(kind) = signal {
                    debug!("✓ 选项 {} 命中选择信号 ({})", snapshot.letter(), kind);
                }
                snapshot
            })
            .collect()
    }

    /// 作用域内的选项列表（文档顺序）
    fn options_in_scope<'a>(
        &self,
        dom: &'a PageDom,
        scope: &QuestionScope<'a>,
    ) -> Vec<ElementRef<'a>> {
        let selector = match scope.dialect {
            Dialect::Mcq => &self.mcq_options,
            Dialect::Learnosity => &self.lrn_options,
        };
        match scope.root {
            Some(root) => root.select(selector).collect(),
            None => dom.select_all(selector),
        }
    }

    /// 第一个带正确标记的选项下标
    ///
    /// mcq 方言先看图标，整组都没有图标时才退回类名判定
    fn correct_index(&self, options: &[ElementRef<'_>], dialect: Dialect) -> Option<usize> {
        let index = match dialect {
            Dialect::Mcq => options
                .iter()
                .position(|o| o.select(&self.correct_icon).next().is_some())
                .or_else(|| {
                    options
                        .iter()
                        .position(|o| has_any_class(*o, &["correct", "--correct"]))
                }),
            Dialect::Learnosity => options.iter().position(|o| has_class(*o, "lrn_valid")),
        };
        if let Some(i) = index {
            debug!("✓ 正确答案标记在第 {} 个选项", i + 1);
        }
        index
    }

    /// mcq 方言的选择信号，按优先级短路
    fn mcq_selected_signal(&self, option: ElementRef<'_>) -> Option<&'static str> {
        if option.select(&self.chosen_letter).next().is_some() {
            return Some("letter 徽标");
        }
        for attr in ARIA_SELECTED_ATTRS {
            if option.value().attr(attr) == Some("true") {
                return Some("aria 属性");
            }
        }
        if has_any_class(option, &["--selected", "--chosen"]) {
            return Some("类名");
        }
        None
    }

    /// learnosity 方言的选择信号
    fn lrn_selected_signal(&self, option: ElementRef<'_>) -> Option<&'static str> {
        if option.select(&self.checked_input).next().is_some() {
            return Some("checked 输入框");
        }
        if has_class(option, "lrn_selected") {
            return Some("类名");
        }
        None
    }
}

impl Default for AnswerDetector {
    fn default() -> Self {
        Self::new()
    }
}

// ========== 类名辅助 ==========

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

fn has_any_class(element: ElementRef<'_>, classes: &[&str]) -> bool {
    element.value().classes().any(|c| classes.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_scope(dialect: Dialect) -> QuestionScope<'static> {
        QuestionScope {
            root: None,
            dialect,
        }
    }

    #[test]
    fn test_detect_mcq_badge_signals() {
        // 第二项带选中徽标，第一项带正确图标
        let dom = PageDom::parse(
            r#"<html><body>
                <div class="mcq-option"><span class="icon --correct"></span>甲</div>
                <div class="mcq-option"><span class="letter --chosen">B</span>乙</div>
                <div class="mcq-option">丙</div>
            </body></html>"#,
        );
        let answers = AnswerDetector::new().detect(&dom, &doc_scope(Dialect::Mcq));
        assert_eq!(answers.user_answer, Some('B'));
        assert_eq!(answers.correct_answer, Some('A'));
    }

    #[test]
    fn test_detect_first_selected_option_wins() {
        // 多个选项带选中类名时取文档顺序里的第一个
        let dom = PageDom::parse(
            r#"<html><body>
                <div class="mcq-option">甲</div>
                <div class="mcq-option --selected">乙</div>
                <div class="mcq-option --selected">丙</div>
            </body></html>"#,
        );
        let answers = AnswerDetector::new().detect(&dom, &doc_scope(Dialect::Mcq));
        assert_eq!(answers.user_answer, Some('B'));
        assert_eq!(answers.correct_answer, None);
    }

    #[test]
    fn test_detect_aria_attribute_signal() {
        let dom = PageDom::parse(
            r#"<html><body>
                <div class="mcq-option">甲</div>
                <div class="mcq-option">乙</div>
                <div class="mcq-option" aria-checked="true">丙</div>
            </body></html>"#,
        );
        let answers = AnswerDetector::new().detect(&dom, &doc_scope(Dialect::Mcq));
        assert_eq!(answers.user_answer, Some('C'));
    }

    #[test]
    fn test_detect_assume_correct_fallback() {
        // 没有任何选择信号时，学生答案按正确答案兜底
        let dom = PageDom::parse(
            r#"<html><body>
                <div class="mcq-option">甲</div>
                <div class="mcq-option">乙</div>
                <div class="mcq-option correct">丙</div>
            </body></html>"#,
        );
        let answers = AnswerDetector::new().detect(&dom, &doc_scope(Dialect::Mcq));
        assert_eq!(answers.user_answer, Some('C'));
        assert_eq!(answers.correct_answer, Some('C'));
    }

    #[test]
    fn test_detect_learnosity_signals() {
        let dom = PageDom::parse(
            r#"<html><body>
                <div class="lrn-mcq-option lrn_valid">甲</div>
                <div class="lrn-mcq-option"><input type="checkbox" checked>乙</div>
            </body></html>"#,
        );
        let answers = AnswerDetector::new().detect(&dom, &doc_scope(Dialect::Learnosity));
        assert_eq!(answers.user_answer, Some('B'));
        assert_eq!(answers.correct_answer, Some('A'));
    }

    #[test]
    fn test_detect_without_options() {
        let dom = PageDom::parse("<html><body><p>无选项</p></body></html>");
        let answers = AnswerDetector::new().detect(&dom, &doc_scope(Dialect::Mcq));
        assert_eq!(answers, DetectedAnswers::default());
    }
}
