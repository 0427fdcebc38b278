//! 题块定位服务 - 业务能力层
//!
//! 职责：
//! - 在整页中锁定当前可见的题目容器
//! - 判定该容器使用哪套标记方言
//! - 候选全部不可用时退化为全文档扫描
//!
//! 预览页同时挂着多份题块（翻页缓存、隐藏模板），直接全文档查
//! 选项会串题，先收口作用域再做信号检测

use scraper::{ElementRef, Selector};
use tracing::{debug, info};

use crate::infrastructure::PageDom;
use crate::models::Dialect;

/// 题块容器候选
const ROOT_CANDIDATES: &str = ".teacher-item-preview, .PerformanceItem.question-preview-player";

/// 带已选中标记的锚点，用于区分多份候选里哪份是当前题
const SELECTED_ANCHORS: &str = ".mcq-option[aria-selected=\"true\"], .lrn-mcq-option[aria-selected=\"true\"], .mcq-option.selected, .lrn-mcq-option.selected";

/// 一次定位的结果：作用域根与方言
///
/// root 为 None 表示退化为全文档扫描
#[derive(Debug, Clone, Copy)]
pub struct QuestionScope<'a> {
    pub root: Option<ElementRef<'a>>,
    pub dialect: Dialect,
}

/// 题块定位服务
pub struct RootLocator {
    candidates: Selector,
    selected_anchors: Selector,
    mcq_options: Selector,
    lrn_options: Selector,
}

impl RootLocator {
    pub fn new() -> Self {
        Self {
            candidates: Selector::parse(ROOT_CANDIDATES).expect("合法选择器"),
            selected_anchors: Selector::parse(SELECTED_ANCHORS).expect("合法选择器"),
            mcq_options: Selector::parse(Dialect::Mcq.option_selector()).expect("合法选择器"),
            lrn_options: Selector::parse(Dialect::Learnosity.option_selector())
                .expect("合法选择器"),
        }
    }

    /// 定位作用域与方言
    ///
    /// # 参数
    /// * `dom` - 页面文档
    ///
    /// # 返回
    /// 锁定的题块作用域；找不到容器时 root 为 None
    pub fn scope<'a>(&self, dom: &'a PageDom) -> QuestionScope<'a> {
        if let Some(root) = self.locate_visible_root(dom) {
            let dialect = if root.select(&self.lrn_options).next().is_some() {
                Dialect::Learnosity
            } else {
                Dialect::Mcq
            };
            info!("✓ 已锁定可见题块 (方言: {})", dialect.name());
            return QuestionScope {
                root: Some(root),
                dialect,
            };
        }

        // 没有候选容器时按选项本身反推作用域
        let mut dialect = Dialect::Mcq;
        let mut options = dom.select_all(&self.mcq_options);
        if options.is_empty() {
            options = dom.select_all(&self.lrn_options);
            dialect = Dialect::Learnosity;
        }
        let Some(first) = options.first().copied() else {
            debug!("页面上没有任何选项元素");
            return QuestionScope {
                root: None,
                dialect: Dialect::Mcq,
            };
        };

        match self.grouping_container(first, dialect) {
            Some(container) => {
                debug!(
                    "✓ 按选项反推出分组容器 <{}> (方言: {})",
                    container.value().name(),
                    dialect.name()
                );
                QuestionScope {
                    root: Some(container),
                    dialect,
                }
            }
            None => {
                debug!("未找到分组容器，退化为全文档扫描 (方言: {})", dialect.name());
                QuestionScope {
                    root: None,
                    dialect,
                }
            }
        }
    }

    /// 在候选容器里挑出当前可见的那一份
    ///
    /// 优先跟着已选中锚点走，没有锚点时取第一个参与渲染的候选
    fn locate_visible_root<'a>(&self, dom: &'a PageDom) -> Option<ElementRef<'a>> {
        let candidates = dom.select_all(&self.candidates);
        if candidates.is_empty() {
            debug!("未找到题块候选容器");
            return None;
        }
        debug!("发现 {} 个题块候选", candidates.len());

        if let Some(anchor) = dom.select_first(&self.selected_anchors) {
            if let Some(root) = candidates
                .iter()
                .copied()
                .find(|c| PageDom::contains(*c, anchor))
            {
                return Some(root);
            }
        }

        let visible = candidates.into_iter().find(|c| PageDom::is_rendered(*c));
        if visible.is_none() {
            debug!("候选容器均未参与渲染");
        }
        visible
    }

    /// 从一个选项向上找最近的分组容器（至少包着 2 个选项）
    fn grouping_container<'a>(
        &self,
        option: ElementRef<'a>,
        dialect: Dialect,
    ) -> Option<ElementRef<'a>> {
        let selector = self.option_selector(dialect);
        for node in option.ancestors() {
            if let Some(el) = ElementRef::wrap(node) {
                if el.select(selector).count() >= 2 {
                    return Some(el);
                }
            }
        }
        None
    }

    /// 方言对应的已编译选项选择器
    fn option_selector(&self, dialect: Dialect) -> &Selector {
        match dialect {
            Dialect::Mcq => &self.mcq_options,
            Dialect::Learnosity => &self.lrn_options,
        }
    }
}

impl Default for RootLocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_id(scope: &QuestionScope<'_>) -> Option<String> {
        scope
            .root
            .and_then(|el| el.value().attr("id").map(str::to_string))
    }

    #[test]
    fn test_scope_follows_selected_anchor() {
        // 两份候选都可见，锚点在第二份里，应跟着锚点走
        let dom = PageDom::parse(
            r#"<html><body>
                <div class="teacher-item-preview" id="q1">
                    <div class="mcq-option">A</div>
                    <div class="mcq-option">B</div>
                </div>
                <div class="teacher-item-preview" id="q2">
                    <div class="mcq-option selected">A</div>
                    <div class="mcq-option">B</div>
                </div>
            </body></html>"#,
        );
        let scope = RootLocator::new().scope(&dom);
        assert_eq!(root_id(&scope), Some("q2".to_string()));
        assert_eq!(scope.dialect, Dialect::Mcq);
    }

    #[test]
    fn test_scope_skips_collapsed_candidate() {
        // 没有锚点时跳过 display:none 的候选
        let dom = PageDom::parse(
            r#"<html><body>
                <div class="teacher-item-preview" id="hidden" style="display: none">
                    <div class="mcq-option">A</div>
                </div>
                <div class="teacher-item-preview" id="shown">
                    <div class="mcq-option">A</div>
                </div>
            </body></html>"#,
        );
        let scope = RootLocator::new().scope(&dom);
        assert_eq!(root_id(&scope), Some("shown".to_string()));
    }

    #[test]
    fn test_scope_detects_learnosity_dialect() {
        let dom = PageDom::parse(
            r#"<html><body>
                <div class="PerformanceItem question-preview-player" id="q">
                    <div class="lrn-mcq-option">A</div>
                    <div class="lrn-mcq-option">B</div>
                </div>
            </body></html>"#,
        );
        let scope = RootLocator::new().scope(&dom);
        assert_eq!(root_id(&scope), Some("q".to_string()));
        assert_eq!(scope.dialect, Dialect::Learnosity);
    }

    #[test]
    fn test_scope_groups_bare_options() {
        // 没有候选容器时向上找包着至少两个选项的最近容器
        let dom = PageDom::parse(
            r#"<html><body>
                <div id="noise"></div>
                <div id="group">
                    <div class="mcq-option">A</div>
                    <div class="mcq-option">B</div>
                </div>
            </body></html>"#,
        );
        let scope = RootLocator::new().scope(&dom);
        assert_eq!(root_id(&scope), Some("group".to_string()));
        assert_eq!(scope.dialect, Dialect::Mcq);
    }

    #[test]
    fn test_scope_empty_page() {
        let dom = PageDom::parse("<html><body><p>没有题目</p></body></html>");
        let scope = RootLocator::new().scope(&dom);
        assert!(scope.root.is_none());
        assert_eq!(scope.dialect, Dialect::Mcq);
    }
}
