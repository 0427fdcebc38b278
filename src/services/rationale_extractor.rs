//! 选项解析提取服务 - 业务能力层
//!
//! 职责：
//! - 把每个选项关联到它的解析文字（选项为什么对 / 为什么错）
//! - 主通道沿选项向上找 LearnosityDistractor 容器
//! - 选项关联不上时退化为全局扫描解析块
//!
//! 解析字母跟选项位置走，与解析块内部写了什么字母无关

use scraper::{ElementRef, Selector};
use tracing::{debug, info};

use crate::infrastructure::PageDom;
use crate::models::{letter_for_index, Dialect, RationaleEntry};
use crate::services::root_locator::QuestionScope;

/// 退化扫描时最多产出的解析条数
const MAX_FALLBACK_RATIONALES: usize = 5;

/// 选项解析提取服务
pub struct RationaleExtractor {
    mcq_options: Selector,
    lrn_options: Selector,
    content_blocks: Selector,
    content_within: Selector,
}

impl RationaleExtractor {
    pub fn new() -> Self {
        Self {
            mcq_options: Selector::parse(Dialect::Mcq.option_selector()).expect("合法选择器"),
            lrn_options: Selector::parse(Dialect::Learnosity.option_selector())
                .expect("合法选择器"),
            content_blocks: Selector::parse(".LearnosityDistractor .content").expect("合法选择器"),
            content_within: Selector::parse(".content").expect("合法选择器"),
        }
    }

    /// 提取选项解析列表
    ///
    /// # 参数
    /// * `dom` - 页面文档
    /// * `scope` - 已锁定的题块作用域
    ///
    /// # 返回
    /// 按选项顺序排列的解析条目，页面没渲染解析时为空
    pub fn extract<'a>(&self, dom: &'a PageDom, scope: &QuestionScope<'a>) -> Vec<RationaleEntry> {
        let options = self.options_in_scope(dom, scope);
        let mut entries = Vec::new();

        for (index, option) in options.iter().enumerate() {
            let Some(distractor) = distractor_for(*option) else {
                continue;
            };
            let Some(content) = distractor.select(&self.content_within).next() else {
                continue;
            };
            let text = content.text().collect::<String>().trim().to_string();
            if text.is_empty() {
                continue;
            }
            let letter = letter_for_index(index);
            debug!("✓ 选项 {} 的解析 ({} 字符)", letter, text.chars().count());
            entries.push(RationaleEntry {
                answer: letter,
                rationale: text,
            });
        }

        if !entries.is_empty() {
            info!("📚 提取到 {} 条选项解析", entries.len());
            return entries;
        }

        // 选项关联不上任何解析容器时，退化为扫描解析块。
        // 空白块跳过且不占字母位，产出满 5 条即停
        let blocks = self.contents_in_scope(dom, scope);
        let mut emitted = 0;
        for block in blocks {
            if emitted >= MAX_FALLBACK_RATIONALES {
                break;
            }
            let text = block.text().collect::<String>().trim().to_string();
            if text.is_empty() {
                continue;
            }
            entries.push(RationaleEntry {
                answer: letter_for_index(emitted),
                rationale: text,
            });
            emitted += 1;
        }
        if !entries.is_empty() {
            info!("📚 退化扫描提取到 {} 条解析", entries.len());
        }
        entries
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

    /// 作用域内的解析块列表
    fn contents_in_scope<'a>(
        &self,
        dom: &'a PageDom,
        scope: &QuestionScope<'a>,
    ) -> Vec<ElementRef<'a>> {
        match scope.root {
            Some(root) => root.select(&self.content_blocks).collect(),
            None => dom.select_all(&self.content_blocks),
        }
    }
}

impl Default for RationaleExtractor {
    fn default() -> Self {
        Self::new()
    }
}

// ========== 结构辅助 ==========

/// 选项所属的解析容器（含自身）
fn distractor_for(option: ElementRef<'_>) -> Option<ElementRef<'_>> {
    if has_class(option, "LearnosityDistractor") {
        return Some(option);
    }
    option
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| has_class(*el, "LearnosityDistractor"))
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}
