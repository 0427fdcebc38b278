//! 正文读取服务 - 业务能力层
//!
//! 职责：
//! - 判断页面有没有值得转换的正文
//! - 把正文 HTML 与页面标题交给流程层
//!
//! 抽成 trait 是为了让流程层不关心正文从哪来，测试时可以注入
//! 固定内容的读取器

use scraper::ElementRef;
use tracing::debug;

use crate::infrastructure::PageDom;

/// 正文判定的最小词数，低于视为页面没在展示内容
const MIN_CONTENT_WORDS: usize = 5;

/// 读出的页面正文
#[derive(Debug, Clone)]
pub struct PageContent {
    /// 正文 HTML
    pub content: String,
    /// 页面标题
    pub title: String,
}

/// 正文读取能力
pub trait ContentReader {
    /// 读取页面正文，页面没有实质内容时返回 None
    fn read(&self, dom: &PageDom) -> Option<PageContent>;
}

/// 从 <body> 整体读取正文
pub struct BodyReader {
    min_words: usize,
}

impl BodyReader {
    pub fn new() -> Self {
        Self {
            min_words: MIN_CONTENT_WORDS,
        }
    }
}

impl ContentReader for BodyReader {
    fn read(&self, dom: &PageDom) -> Option<PageContent> {
        let body = dom.body()?;
        let words = visible_word_count(body);
        if words < self.min_words {
            debug!("正文只有 {} 个词，视为无内容页面", words);
            return None;
        }
        Some(PageContent {
            content: body.inner_html(),
            title: dom.title(),
        })
    }
}

impl Default for BodyReader {
    fn default() -> Self {
        Self::new()
    }
}

/// 可见文本的词数，脚本与样式的文本不算
fn visible_word_count(body: ElementRef<'_>) -> usize {
    let mut text = String::new();
    for node in body.descendants() {
        let Some(fragment) = node.value().as_text() else {
            continue;
        };
        let parent_tag = node
            .parent()
            .and_then(ElementRef::wrap)
            .map(|el| el.value().name());
        if matches!(
            parent_tag,
            Some("script") | Some("style") | Some("noscript") | Some("template")
        ) {
            continue;
        }
        text.push_str(fragment);
        text.push(' ');
    }
    text.split_whitespace().count()
}
