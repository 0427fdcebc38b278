//! HTML → Markdown 转换 - 业务能力层
//!
//! 递归遍历解析树产出 GFM 风格的 Markdown。为保住数学内容，
//! 文本不做反斜杠转义；LaTeX 图片与标记元素有专门的替换规则。
//! 结构转换失败时整体退回原始 HTML

use phf::phf_set;
use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::warn;

use crate::error::ExtractError;
use crate::services::latex::LatexPostProcessor;

/// 递归深度上限，超过视为病态标记
const MAX_DEPTH: usize = 120;

/// 整棵子树丢弃的标签
static SKIPPED_TAGS: phf::Set<&'static str> = phf_set! {
    "script", "style", "head", "noscript", "template", "meta", "link", "title",
};

/// 按块级规则分段的标签
static BLOCK_TAGS: phf::Set<&'static str> = phf_set! {
    "address", "article", "aside", "blockquote", "body", "center", "details",
    "div", "dl", "fieldset", "figcaption", "figure", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "html", "li", "main", "nav",
    "ol", "p", "pre", "section", "summary", "table", "ul",
};

/// HTML → Markdown 转换器
pub struct MarkdownConverter {
    post: LatexPostProcessor,
    re_leading_heading: Regex,
}

impl MarkdownConverter {
    pub fn new() -> Self {
        Self {
            post: LatexPostProcessor::new(),
            re_leading_heading: Regex::new(r"^# .+\n+").expect("合法正则"),
        }
    }

    /// HTML 片段 → Markdown
    ///
    /// 结构转换失败时退回原始 HTML，保证产出非空
    pub fn convert(&self, html: &str) -> String {
        match self.convert_structural(html) {
            Ok(markdown) => {
                let text = self.post.run(&markdown);
                // 转换产物开头重复标题行的话去掉
                let text = self.re_leading_heading.replace(&text, "");
                text.trim().to_string()
            }
            Err(e) => {
                warn!("⚠️ 结构转换失败，退回原始 HTML: {}", e);
                html.to_string()
            }
        }
    }

    /// 结构化遍历阶段
    fn convert_structural(&self, html: &str) -> Result<String, ExtractError> {
        let fragment = Html::parse_fragment(html);
        let mut out = String::with_capacity(html.len() / 2);
        self.render_children(fragment.root_element(), &mut out, 0)?;
        Ok(out)
    }

    /// 渲染块级上下文中的子节点
    ///
    /// 行内内容攒进段落缓冲，遇到块级元素先冲刷段落再分发
    fn render_children(
        &self,
        parent: ElementRef<'_>,
        out: &mut String,
        depth: usize,
    ) -> Result<(), ExtractError> {
        if depth > MAX_DEPTH {
            return Err(ExtractError::Conversion(format!("嵌套深度超过 {}", MAX_DEPTH)));
        }
        let mut paragraph = String::new();
        for child in parent.children() {
            if let Some(text) = child.value().as_text() {
                push_collapsed_text(&mut paragraph, text);
                continue;
            }
            let Some(element) = ElementRef::wrap(child) else {
                continue;
            };
            let tag = element.value().name();
            if SKIPPED_TAGS.contains(tag) {
                continue;
            }
            if BLOCK_TAGS.contains(tag) {
                flush_paragraph(out, &mut paragraph);
                self.render_block(element, tag, out, depth + 1)?;
            } else {
                let piece = self.render_inline(element, depth + 1)?;
                paragraph.push_str(&piece);
            }
        }
        flush_paragraph(out, &mut paragraph);
        Ok(())
    }

    /// 块级元素分发
    fn render_block(
        &self,
        element: ElementRef<'_>,
        tag: &str,
        out: &mut String,
        depth: usize,
    ) -> Result<(), ExtractError> {
        match tag {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = tag[1..].parse::<usize>().unwrap_or(1);
                let text = self.render_inline_children(element, depth)?;
                let text = text.trim();
                if !text.is_empty() {
                    append_block(out, &format!("{} {}", "#".repeat(level), text));
                }
            }
            "p" => {
                let text = self.render_inline_children(element, depth)?;
                append_block(out, text.trim());
            }
            "div" => {
                // 数学标记的 div 整体替换，其余透明下钻
                if let Some(replacement) = self.latex_element_replacement(element) {
                    append_block(out, replacement.trim());
                } else {
                    self.render_children(element, out, depth)?;
                }
            }
            "blockquote" => {
                let mut inner = String::new();
                self.render_children(element, &mut inner, depth)?;
                let quoted = inner
                    .trim()
                    .lines()
                    .map(|line| format!("> {}", line))
                    .collect::<Vec<_>>()
                    .join("\n");
                append_block(out, &quoted);
            }
            "pre" => {
                let code: String = element.text().collect();
                let code = code.trim_matches('\n');
                append_block(out, &format!("```\n{}\n```", code));
            }
            "hr" => append_block(out, "---"),
            "ul" => self.render_list(element, out, depth, false)?,
            "ol" => self.render_list(element, out, depth, true)?,
            "table" => self.render_table(element, out, depth)?,
            "li" => {
                // 脱离列表上下文的孤立条目按段落处理
                let text = self.render_inline_children(element, depth)?;
                append_block(out, text.trim());
            }
            _ => {
                // 其余块级容器透明下钻
                self.render_children(element, out, depth)?;
            }
        }
        Ok(())
    }

    /// 列表渲染，无序用 "-"，有序用 "1." 递增
    fn render_list(
        &self,
        element: ElementRef<'_>,
        out: &mut String,
        depth: usize,
        ordered: bool,
    ) -> Result<(), ExtractError> {
        let mut lines: Vec<String> = Vec::new();
        let mut counter = 1usize;
        for child in element.children() {
            let Some(item) = ElementRef::wrap(child) else {
                continue;
            };
            if item.value().name() != "li" {
                continue;
            }
            let mut body = String::new();
            self.render_children(item, &mut body, depth + 1)?;
            let body = body.trim();
            if body.is_empty() {
                continue;
            }
            let marker = if ordered {
                let m = format!("{}.", counter);
                counter += 1;
                m
            } else {
                "-".to_string()
            };
            let mut item_lines = body.lines();
            let first = item_lines.next().unwrap_or_default();
            let mut rendered = format!("{} {}", marker, first);
            for cont in item_lines {
                rendered.push('\n');
                if !cont.is_empty() {
                    rendered.push_str("    ");
                    rendered.push_str(cont);
                }
            }
            lines.push(rendered);
        }
        if !lines.is_empty() {
            append_block(out, &lines.join("\n"));
        }
        Ok(())
    }

    /// GFM 表格渲染，首行充当表头
    fn render_table(
        &self,
        element: ElementRef<'_>,
        out: &mut String,
        depth: usize,
    ) -> Result<(), ExtractError> {
        let mut rows: Vec<Vec<String>> = Vec::new();
        self.collect_table_rows(element, &mut rows, depth)?;
        let width = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        if width == 0 {
            return Ok(());
        }
        let mut lines = Vec::with_capacity(rows.len() + 1);
        for (i, row) in rows.iter().enumerate() {
            let mut cells = row.clone();
            cells.resize(width, String::new());
            lines.push(format!("| {} |", cells.join(" | ")));
            if i == 0 {
                lines.push(format!("|{}|", vec![" --- "; width].join("|")));
            }
        }
        append_block(out, &lines.join("\n"));
        Ok(())
    }

    /// 收集表格行，穿透 thead/tbody/tfoot
    fn collect_table_rows(
        &self,
        element: ElementRef<'_>,
        rows: &mut Vec<Vec<String>>,
        depth: usize,
    ) -> Result<(), ExtractError> {
        if depth > MAX_DEPTH {
            return Err(ExtractError::Conversion(format!("嵌套深度超过 {}", MAX_DEPTH)));
        }
        for child in element.children() {
            let Some(el) = ElementRef::wrap(child) else {
                continue;
            };
            match el.value().name() {
                "thead" | "tbody" | "tfoot" => self.collect_table_rows(el, rows, depth + 1)?,
                "tr" => {
                    let mut cells = Vec::new();
                    for cell_node in el.children() {
                        let Some(cell) = ElementRef::wrap(cell_node) else {
                            continue;
                        };
                        let name = cell.value().name();
                        if name == "td" || name == "th" {
                            let text = self.render_inline_children(cell, depth + 1)?;
                            cells.push(text.trim().replace('\n', " ").replace('|', "\\|"));
                        }
                    }
                    rows.push(cells);
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// 行内元素渲染
    fn render_inline(
        &self,
        element: ElementRef<'_>,
        depth: usize,
    ) -> Result<String, ExtractError> {
        if depth > MAX_DEPTH {
            return Err(ExtractError::Conversion(format!("嵌套深度超过 {}", MAX_DEPTH)));
        }
        let tag = element.value().name();
        if SKIPPED_TAGS.contains(tag) {
            return Ok(String::new());
        }
        // 数学标记元素优先于一般规则
        if tag == "span" || tag == "div" {
            if let Some(replacement) = self.latex_element_replacement(element) {
                return Ok(replacement);
            }
        }
        match tag {
            "br" => Ok("\n".to_string()),
            "img" => Ok(self.render_image(element)),
            "a" => {
                let inner = self.render_inline_children(element, depth)?;
                // 可见文本为空的链接整体丢弃
                if inner.trim().is_empty() {
                    return Ok(String::new());
                }
                match element.value().attr("href") {
                    Some(href) if !href.is_empty() => Ok(format!("[{}]({})", inner, href)),
                    _ => Ok(inner),
                }
            }
            "strong" | "b" => self.render_wrapped(element, depth, "**"),
            "em" | "i" => self.render_wrapped(element, depth, "*"),
            "del" | "s" | "strike" => self.render_wrapped(element, depth, "~~"),
            "code" => {
                let text: String = element.text().collect();
                Ok(format!("`{}`", text))
            }
            _ => {
                let inner = self.render_inline_children(element, depth)?;
                if BLOCK_TAGS.contains(tag) && !inner.trim().is_empty() {
                    // 行内上下文（如表格单元格）里的块级内容退化为空格分隔
                    Ok(format!(" {} ", inner.trim()))
                } else {
                    Ok(inner)
                }
            }
        }
    }

    /// 前后对称包裹的行内标记
    fn render_wrapped(
        &self,
        element: ElementRef<'_>,
        depth: usize,
        mark: &str,
    ) -> Result<String, ExtractError> {
        let inner = self.render_inline_children(element, depth)?;
        if inner.trim().is_empty() {
            return Ok(String::new());
        }
        Ok(format!("{}{}{}", mark, inner, mark))
    }

    /// 渲染子节点的行内拼接
    fn render_inline_children(
        &self,
        parent: ElementRef<'_>,
        depth: usize,
    ) -> Result<String, ExtractError> {
        if depth > MAX_DEPTH {
            return Err(ExtractError::Conversion(format!("嵌套深度超过 {}", MAX_DEPTH)));
        }
        let mut buf = String::new();
        for child in parent.children() {
            if let Some(text) = child.value().as_text() {
                push_collapsed_text(&mut buf, text);
            } else if let Some(element) = ElementRef::wrap(child) {
                let piece = self.render_inline(element, depth + 1)?;
                buf.push_str(&piece);
            }
        }
        Ok(buf)
    }

    /// 图片渲染：LaTeX 痕迹图片还原为定界文本，普通图片保留引用
    fn render_image(&self, element: ElementRef<'_>) -> String {
        let el = element.value();
        let alt = el.attr("alt").unwrap_or("");
        let src = el.attr("src").unwrap_or("");
        let latex_class = el.classes().any(|c| c == "latex");
        if !alt.is_empty()
            && (alt.contains('$') || alt.contains('\\') || src.contains("latex") || latex_class)
        {
            return wrap_latex_alt(alt);
        }
        format!("![{}]({})", alt, src)
    }

    /// 数学标记元素的替换文本
    ///
    /// 命中 math/latex/katex 类名或 data-latex 属性时返回 Some
    fn latex_element_replacement(&self, element: ElementRef<'_>) -> Option<String> {
        let el = element.value();
        let flagged = el
            .classes()
            .any(|c| c == "math" || c == "latex" || c == "katex")
            || el.attr("data-latex").is_some();
        if !flagged {
            return None;
        }
        if let Some(latex) = el.attr("data-latex") {
            if latex.starts_with('$') {
                return Some(latex.to_string());
            }
            return Some(format!("${}$", latex));
        }
        let text: String = element.text().collect();
        if text.contains('$') {
            return Some(text);
        }
        if text.contains('\\')
            && (text.contains("frac") || text.contains("sum") || text.contains("int"))
        {
            return Some(format!("${}$", text));
        }
        Some(text)
    }
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

// ========== 文本辅助 ==========

/// 追加文本节点，HTML 空白折叠为单个空格
fn push_collapsed_text(buf: &mut String, text: &str) {
    for ch in text.chars() {
        if ch.is_whitespace() {
            if !buf.is_empty() && !buf.ends_with(' ') {
                buf.push(' ');
            }
        } else {
            buf.push(ch);
        }
    }
}

/// 冲刷段落缓冲为一个块
fn flush_paragraph(out: &mut String, paragraph: &mut String) {
    let text = paragraph.trim().to_string();
    paragraph.clear();
    append_block(out, &text);
}

/// 以空行分隔追加一个块
fn append_block(out: &mut String, block: &str) {
    if block.is_empty() {
        return;
    }
    if !out.is_empty() {
        while !out.ends_with("\n\n") {
            out.push('\n');
        }
    }
    out.push_str(block);
}

/// 把图片 alt 里的 LaTeX 源码还原为定界文本
///
/// 已经 $ 包裹的原样通过；超过 50 字符或含块级命令的用 $$ 展示模式
fn wrap_latex_alt(alt: &str) -> String {
    if alt.starts_with('$') && alt.ends_with('$') {
        return alt.to_string();
    }
    if alt.chars().count() > 50
        || alt.contains("\\[")
        || alt.contains("\\]")
        || alt.contains("\\frac")
    {
        format!("$${}$$", alt)
    } else {
        format!("${}$", alt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn converter() -> MarkdownConverter {
        MarkdownConverter::new()
    }

    #[test]
    fn test_basic_blocks() {
        let md = converter().convert("<h2>标题</h2><p>第一段</p><p>第二段</p>");
        assert_eq!(md, "## 标题\n\n第一段\n\n第二段");
    }

    #[test]
    fn test_inline_marks() {
        let md = converter().convert("<p><strong>粗</strong>与<em>斜</em>和<code>代码</code></p>");
        assert_eq!(md, "**粗**与*斜*和`代码`");
    }

    #[test]
    fn test_unordered_list() {
        let md = converter().convert("<ul><li>甲</li><li>乙</li></ul>");
        assert_eq!(md, "- 甲\n- 乙");
    }

    #[test]
    fn test_ordered_list() {
        let md = converter().convert("<ol><li>一</li><li>二</li></ol>");
        assert_eq!(md, "1. 一\n2. 二");
    }

    #[test]
    fn test_table_first_row_as_header() {
        let md = converter().convert(
            "<table><tr><th>x</th><th>y</th></tr><tr><td>1</td><td>2</td></tr></table>",
        );
        assert_eq!(md, "| x | y |\n| --- | --- |\n| 1 | 2 |");
    }

    #[test]
    fn test_pre_becomes_fenced_code() {
        let md = converter().convert("<pre>let a = 1;</pre>");
        assert_eq!(md, "```\nlet a = 1;\n```");
    }

    #[test]
    fn test_hr_and_blockquote() {
        let md = converter().convert("<blockquote><p>引文</p></blockquote><hr>");
        assert_eq!(md, "> 引文\n\n---");
    }

    #[test]
    fn test_plain_link_and_image() {
        let md = converter().convert(
            "<p><a href=\"https://x.test\">链接</a> <img src=\"p.png\" alt=\"图\"></p>",
        );
        assert_eq!(md, "[链接](https://x.test) ![图](p.png)");
    }

    #[test]
    fn test_empty_link_is_dropped() {
        let md = converter().convert("<p>前<a href=\"https://x.test\"> </a>后</p>");
        assert_eq!(md, "前后");
    }

    #[test]
    fn test_latex_image_wrapped_alt_passes_through() {
        let md = converter().convert("<p><img alt=\"$x^2$\" src=\"a.png\"></p>");
        assert_eq!(md, "$x^2$");
    }

    #[test]
    fn test_latex_image_short_alt_inline_wrapped() {
        let md = converter().convert("<p><img alt=\"x^2\" src=\"https://cdn.test/latex/1.png\"></p>");
        assert_eq!(md, "$x^2$");
    }

    #[test]
    fn test_latex_image_long_alt_display_wrapped() {
        // 60 个字符且含 \frac，走 $$ 展示模式
        let alt = format!("\\frac{{a}}{{b}}{}", "x".repeat(49));
        assert_eq!(alt.chars().count(), 60);
        let html = format!("<p><img alt=\"{}\" src=\"a.png\"></p>", alt);
        let md = converter().convert(&html);
        assert_eq!(md, format!("$${}$$", alt));
    }

    #[test]
    fn test_latex_span_prefers_data_attribute() {
        let md = converter().convert("<p><span class=\"katex\" data-latex=\"e=mc^2\">渲染态</span></p>");
        assert_eq!(md, "$e=mc^2$");
    }

    #[test]
    fn test_latex_span_dollar_text_passes_through() {
        let md = converter().convert("<p><span class=\"math\">$a+b$</span></p>");
        assert_eq!(md, "$a+b$");
    }

    #[test]
    fn test_latex_span_backslash_text_wrapped() {
        let md = converter().convert("<p><span class=\"math\">\\sum_{i=0}^n i</span></p>");
        assert_eq!(md, "$\\sum_{i=0}^n i$");
    }

    #[test]
    fn test_leading_heading_stripped() {
        let md = converter().convert("<h1>页面标题</h1><p>正文</p>");
        assert_eq!(md, "正文");
    }

    #[test]
    fn test_conversion_failure_returns_raw_html() {
        // 超过递归深度上限的病态嵌套触发兜底
        let depth = MAX_DEPTH + 8;
        let html = format!("{}x{}", "<div>".repeat(depth), "</div>".repeat(depth));
        let md = converter().convert(&html);
        assert_eq!(md, html);
    }

    #[test]
    fn test_script_and_style_dropped() {
        let md = converter().convert("<p>正文</p><script>1+1</script><style>p{}</style>");
        assert_eq!(md, "正文");
    }
}
