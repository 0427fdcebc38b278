//! LaTeX 后处理 - 业务能力层
//!
//! 对结构转换产出的 Markdown 做定界符修复：合并被拆行的 $ 对、
//! 把 [asy] 绘图块收进围栏、规范 \frac/\textbf 的内部空白、
//! 为裸命令补上行内定界符。围栏内的内容全程不参与修复

use regex::Regex;
use scraper::Selector;
use tracing::debug;

use crate::infrastructure::PageDom;

/// LaTeX 后处理器
///
/// 全部正则在构造时编译一次，处理过程无状态
pub struct LatexPostProcessor {
    re_excess_newlines: Regex,
    re_empty_link: Regex,
    re_merged_empty_pair: Regex,
    re_split_span: Regex,
    re_frac_spacing: Regex,
    re_textbf_spacing: Regex,
    re_space_before_dollar: Regex,
    re_space_after_dollar: Regex,
    re_bare_frac: Regex,
    re_bare_textbf: Regex,
    re_bare_qquad: Regex,
}

impl LatexPostProcessor {
    pub fn new() -> Self {
        Self {
            re_excess_newlines: Regex::new(r"\n{3,}").expect("合法正则"),
            re_empty_link: Regex::new(r"\[\]\([^)]+\)").expect("合法正则"),
            re_merged_empty_pair: Regex::new(r"\$\s*\n\s*\$").expect("合法正则"),
            re_split_span: Regex::new(r"\$\s*\n\s*([^$]+?)\s*\n\s*\$").expect("合法正则"),
            re_frac_spacing: Regex::new(r"\$\s*\\frac\s*\{([^}]+)\}\s*\{([^}]+)\}\s*\$")
                .expect("合法正则"),
            re_textbf_spacing: Regex::new(r"\$\s*\\textbf\s*\{([^}]+)\}\s*\$").expect("合法正则"),
            re_space_before_dollar: Regex::new(r"[ \t]+(\$+)").expect("合法正则"),
            re_space_after_dollar: Regex::new(r"(\$+)[ \t]+").expect("合法正则"),
            re_bare_frac: Regex::new(r"\\frac\{[^}]+\}\{[^}]+\}").expect("合法正则"),
            re_bare_textbf: Regex::new(r"\\textbf\{[^}]+\}").expect("合法正则"),
            re_bare_qquad: Regex::new(r"\\qquad").expect("合法正则"),
        }
    }

    /// 执行完整后处理管线
    pub fn run(&self, markdown: &str) -> String {
        let text = self.collapse_newlines(markdown);
        let text = self.strip_empty_links(&text);
        let text = self.fence_asy_blocks(&text);
        self.apply_outside_fences(&text)
    }

    /// 3 个以上连续换行压成 2 个
    fn collapse_newlines(&self, text: &str) -> String {
        self.re_excess_newlines.replace_all(text, "\n\n").into_owned()
    }

    /// 删除空链接残留，连同紧邻的换行
    ///
    /// ![](url) 是图片语法，不在清理范围内
    fn strip_empty_links(&self, text: &str) -> String {
        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for m in self.re_empty_link.find_iter(text) {
            if m.start() > 0 && bytes[m.start() - 1] == b'!' {
                continue;
            }
            let mut left = m.start();
            while left > cursor && bytes[left - 1] == b'\n' {
                left -= 1;
            }
            out.push_str(&text[cursor..left]);
            let mut right = m.end();
            while right < bytes.len() && bytes[right] == b'\n' {
                right += 1;
            }
            cursor = right;
        }
        out.push_str(&text[cursor..]);
        out
    }

    /// 把 [asy] 绘图块包进 ```asy 围栏
    ///
    /// 覆盖三种形态：$$ 包裹的、成对闭合的、缺少 [/asy] 的残块。
    /// 残块到空行或文本结尾为止
    fn fence_asy_blocks(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len() + 32);
        let mut cursor = 0;
        while let Some(rel) = text[cursor..].find("[asy]") {
            let mut start = cursor + rel;
            let dollar_prefix = text[..start].ends_with("$$");
            let body_end = match text[start..].find("[/asy]") {
                Some(close_rel) => {
                    let mut end = start + close_rel + "[/asy]".len();
                    if dollar_prefix && text[end..].starts_with("$$") {
                        end += 2;
                    }
                    end
                }
                None => self.unterminated_block_end(text, start, dollar_prefix),
            };
            if dollar_prefix {
                start -= 2;
            }
            out.push_str(&text[cursor..start]);
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str("```asy\n");
            out.push_str(&text[start..body_end]);
            out.push_str("\n```");
            cursor = body_end;
            if cursor < text.len() && !text[cursor..].starts_with('\n') {
                out.push('\n');
            }
        }
        out.push_str(&text[cursor..]);
        out
    }

    /// 未闭合 [asy] 块的结束位置
    fn unterminated_block_end(&self, text: &str, start: usize, dollar_prefix: bool) -> usize {
        let limit = match text[start..].find("\n\n") {
            Some(p) => start + p,
            None if text.ends_with('\n') => text.len() - 1,
            None => text.len(),
        };
        if dollar_prefix {
            // $$[asy] ... $$ 形态：右定界符先于空行出现时在那里截断
            let after_tag = start + "[asy]".len();
            if let Some(p) = text[after_tag..limit].find("$$") {
                return after_tag + p + 2;
            }
        }
        limit
    }

    /// 逐段应用定界符修复，围栏块原样保留
    fn apply_outside_fences(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        while let Some(rel) = text[cursor..].find("```") {
            let open = cursor + rel;
            out.push_str(&self.repair_delimiters(&text[cursor..open]));
            let after_open = open + 3;
            match text[after_open..].find("```") {
                Some(close_rel) => {
                    let end = after_open + close_rel + 3;
                    out.push_str(&text[open..end]);
                    cursor = end;
                }
                None => {
                    // 孤立围栏标记，剩余部分原样追加
                    out.push_str(&text[open..]);
                    return out;
                }
            }
        }
        out.push_str(&self.repair_delimiters(&text[cursor..]));
        out
    }

    /// 单个非围栏片段的定界符修复
    fn repair_delimiters(&self, segment: &str) -> String {
        let text = self.re_merged_empty_pair.replace_all(segment, "$$");
        let text = self.re_split_span.replace_all(&text, "$$${1}$$");
        let text = self.re_frac_spacing.replace_all(&text, "$$\\frac{${1}}{${2}}$$");
        let text = self.re_textbf_spacing.replace_all(&text, "$$\\textbf{${1}}$$");
        let text = self.re_space_before_dollar.replace_all(&text, " ${1}");
        let text = self.re_space_after_dollar.replace_all(&text, "${1} ");
        self.wrap_bare_commands(&text)
    }

    /// 为未定界的 \frac{}{} / \textbf{} / \qquad 补上行内 $
    ///
    /// 已处于 $ 或 $$ 包围中的命令不再包裹，紧贴 $ 的也不包裹
    fn wrap_bare_commands(&self, text: &str) -> String {
        let mut spans: Vec<(usize, usize)> = Vec::new();
        for re in [&self.re_bare_frac, &self.re_bare_textbf, &self.re_bare_qquad] {
            for m in re.find_iter(text) {
                spans.push((m.start(), m.end()));
            }
        }
        if spans.is_empty() {
            return text.to_string();
        }
        spans.sort();

        let bytes = text.as_bytes();
        let mut out = String::with_capacity(text.len() + spans.len() * 2);
        let mut cursor = 0;
        let mut in_inline = false;
        let mut in_display = false;
        for (start, end) in spans {
            if start < cursor {
                // \qquad 可能嵌在 \frac 参数里，取外层命令
                continue;
            }
            // 把定界符状态推进到命令起点
            let mut i = cursor;
            while i < start {
                if bytes[i] == b'$' && (i == 0 || bytes[i - 1] != b'\\') {
                    if !in_inline && i + 1 < bytes.len() && bytes[i + 1] == b'$' {
                        in_display = !in_display;
                        i += 2;
                        continue;
                    }
                    in_inline = !in_inline;
                }
                i += 1;
            }
            out.push_str(&text[cursor..start]);
            let prev_dollar = start > 0 && bytes[start - 1] == b'$';
            let next_dollar = end < bytes.len() && bytes[end] == b'$';
            if in_inline || in_display || prev_dollar || next_dollar {
                out.push_str(&text[start..end]);
            } else {
                out.push('$');
                out.push_str(&text[start..end]);
                out.push('$');
            }
            cursor = end;
        }
        out.push_str(&text[cursor..]);
        out
    }
}

impl Default for LatexPostProcessor {
    fn default() -> Self {
        Self::new()
    }
}

// ========== 页面 LaTeX 痕迹扫描 ==========

/// LaTeX 形态节点的选择器清单
const LATEX_TRACE_SELECTORS: [&str; 10] = [
    "span.math",
    "div.math",
    "span.latex",
    "div.latex",
    "span.katex",
    "div.katex",
    "[data-latex]",
    "img.latex",
    "img[src*=\"latex\"]",
    "script[type=\"math/tex\"]",
];

/// 页面 LaTeX 痕迹扫描器（诊断辅助，不参与结果组装）
pub struct LatexScanner {
    selectors: Vec<Selector>,
}

impl LatexScanner {
    pub fn new() -> Self {
        let selectors = LATEX_TRACE_SELECTORS
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .collect();
        Self { selectors }
    }

    /// 收集页面中疑似 LaTeX 源码的片段
    pub fn scan(&self, dom: &PageDom) -> Vec<String> {
        let mut traces = Vec::new();
        for selector in &self.selectors {
            for el in dom.select_all(selector) {
                let snippet = el
                    .value()
                    .attr("data-latex")
                    .or_else(|| el.value().attr("alt"))
                    .map(|s| s.to_string())
                    .unwrap_or_else(|| el.text().collect::<String>());
                let snippet = snippet.trim();
                if snippet.is_empty() {
                    continue;
                }
                if snippet.contains('$') || snippet.contains('\\') {
                    traces.push(snippet.to_string());
                }
            }
        }
        if !traces.is_empty() {
            debug!("🔍 页面扫描到 {} 处 LaTeX 痕迹", traces.len());
        }
        traces
    }
}

impl Default for LatexScanner {
    fn default() -> Self {
        Self::new()
    }
}
