//! 页面文档 - 基础设施层
//!
//! 持有解析后的 HTML 文档快照，只暴露查询与树遍历能力

use scraper::{ElementRef, Html, Selector};

/// 页面文档
///
/// 职责：
/// - 持有唯一的 Html 解析树
/// - 暴露选择器查询 / 包含判定 / 可见性探测能力
/// - 不认识题目与选项语义
/// - 不处理业务流程
pub struct PageDom {
    document: Html,
}

impl PageDom {
    /// 解析完整页面
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }

    /// 获取解析树的引用（用于其他操作）
    pub fn document(&self) -> &Html {
        &self.document
    }

    /// 全文档查询，返回全部匹配
    pub fn select_all(&self, selector: &Selector) -> Vec<ElementRef<'_>> {
        self.document.select(selector).collect()
    }

    /// 全文档查询，返回首个匹配
    pub fn select_first(&self, selector: &Selector) -> Option<ElementRef<'_>> {
        self.document.select(selector).next()
    }

    /// 判断 ancestor 是否包含 node（含自身）
    pub fn contains(ancestor: ElementRef<'_>, node: ElementRef<'_>) -> bool {
        let target = ancestor.id();
        node.id() == target || node.ancestors().any(|n| n.id() == target)
    }

    /// 元素是否参与布局渲染
    ///
    /// 解析树上没有真实布局信息，以 hidden 属性和内联 display:none
    /// 作为折叠判定，自身与任一祖先命中即视为未渲染
    pub fn is_rendered(element: ElementRef<'_>) -> bool {
        if element_collapsed(element) {
            return false;
        }
        for node in element.ancestors() {
            if let Some(el) = ElementRef::wrap(node) {
                if element_collapsed(el) {
                    return false;
                }
            }
        }
        true
    }

    /// 页面 <title> 文本
    pub fn title(&self) -> String {
        if let Ok(selector) = Selector::parse("title") {
            if let Some(el) = self.document.select(&selector).next() {
                return el.text().collect::<String>().trim().to_string();
            }
        }
        String::new()
    }

    /// 页面 <body> 元素
    pub fn body(&self) -> Option<ElementRef<'_>> {
        let selector = Selector::parse("body").ok()?;
        self.document.select(&selector).next()
    }
}

/// 元素自身是否被折叠
fn element_collapsed(element: ElementRef<'_>) -> bool {
    let el = element.value();
    if el.attr("hidden").is_some() {
        return true;
    }
    if let Some(style) = el.attr("style") {
        let squashed: String = style
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if squashed.contains("display:none") {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_rendered_plain_element() {
        let dom = PageDom::parse("<html><body><div class=\"box\">内容</div></body></html>");
        let selector = Selector::parse(".box").expect("合法选择器");
        let el = dom.select_first(&selector).expect("找到元素");
        assert!(PageDom::is_rendered(el));
    }

    #[test]
    fn test_is_rendered_inline_display_none() {
        let dom = PageDom::parse(
            "<html><body><div class=\"box\" style=\"color: red; DISPLAY : none\">x</div></body></html>",
        );
        let selector = Selector::parse(".box").expect("合法选择器");
        let el = dom.select_first(&selector).expect("找到元素");
        // 大小写与空白不影响判定
        assert!(!PageDom::is_rendered(el));
    }

    #[test]
    fn test_is_rendered_hidden_ancestor() {
        let dom = PageDom::parse(
            "<html><body><section hidden><div class=\"box\">x</div></section></body></html>",
        );
        let selector = Selector::parse(".box").expect("合法选择器");
        let el = dom.select_first(&selector).expect("找到元素");
        assert!(!PageDom::is_rendered(el));
    }

    #[test]
    fn test_contains_covers_descendants_and_self() {
        let dom = PageDom::parse(
            "<html><body><div id=\"outer\"><p><span id=\"inner\">x</span></p></div><div id=\"other\"></div></body></html>",
        );
        let outer = dom
            .select_first(&Selector::parse("#outer").expect("合法选择器"))
            .expect("找到元素");
        let inner = dom
            .select_first(&Selector::parse("#inner").expect("合法选择器"))
            .expect("找到元素");
        let other = dom
            .select_first(&Selector::parse("#other").expect("合法选择器"))
            .expect("找到元素");

        assert!(PageDom::contains(outer, inner));
        assert!(PageDom::contains(outer, outer));
        assert!(!PageDom::contains(outer, other));
        assert!(!PageDom::contains(inner, outer));
    }

    #[test]
    fn test_title_text() {
        let dom = PageDom::parse("<html><head><title> 测验页 </title></head><body></body></html>");
        assert_eq!(dom.title(), "测验页");
    }
}
