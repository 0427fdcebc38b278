//! 内容提取流程 - 流程层
//!
//! 核心职责：定义"一个页面"的完整提取流程
//!
//! 流程顺序：
//! 1. 定位题块 → 答案信号 → 选项解析
//! 2. 读取正文，太薄则判为无内容页面
//! 3. 转换 Markdown → 切分题干与讲解 → 组装结果

use regex::Regex;
use tracing::{debug, info};

use crate::config::Config;
use crate::infrastructure::PageDom;
use crate::models::ExtractionResult;
use crate::services::{
    AnswerDetector, BodyReader, ContentReader, LatexScanner, MarkdownConverter,
    RationaleExtractor, RootLocator,
};
use crate::utils::logging::truncate_text;

/// 讲解段落的起始标记词
const SPLIT_MARKER: &str = r"(?i)Solution|Answer|Explanation|Rationale";

/// 内容提取流程
///
/// - 编排完整的页面提取流程
/// - 决定何时定位、何时转换、何时放弃
/// - 不持有页面资源，只依赖业务能力（services）
pub struct ExtractFlow {
    root_locator: RootLocator,
    answer_detector: AnswerDetector,
    rationale_extractor: RationaleExtractor,
    markdown_converter: MarkdownConverter,
    latex_scanner: LatexScanner,
    content_reader: Box<dyn ContentReader>,
    split_marker: Regex,
    verbose_logging: bool,
}

impl ExtractFlow {
    /// 创建新的内容提取流程
    pub fn new(config: &Config) -> Self {
        Self {
            root_locator: RootLocator::new(),
            answer_detector: AnswerDetector::new(),
            rationale_extractor: RationaleExtractor::new(),
            markdown_converter: MarkdownConverter::new(),
            latex_scanner: LatexScanner::new(),
            content_reader: Box::new(BodyReader::new()),
            split_marker: Regex::new(SPLIT_MARKER).expect("合法正则"),
            verbose_logging: config.verbose_logging,
        }
    }

    /// 替换正文读取器（测试注入用）
    pub fn with_content_reader(mut self, reader: Box<dyn ContentReader>) -> Self {
        self.content_reader = reader;
        self
    }

    /// 执行一次完整提取
    ///
    /// # 返回
    /// 页面没有实质内容时返回 None，其余情况都给出结果
    pub fn run(&self, dom: &PageDom) -> Option<ExtractionResult> {
        // ========== 流程 1: 题块信号 ==========
        let scope = self.root_locator.scope(dom);
        let answers = self.answer_detector.detect(dom, &scope);
        let rationales = self.rationale_extractor.extract(dom, &scope);

        let traces = self.latex_scanner.scan(dom);
        if !traces.is_empty() {
            debug!("🔍 页面含 {} 处 LaTeX 痕迹", traces.len());
            if self.verbose_logging {
                for trace in traces.iter().take(3) {
                    debug!("  LaTeX: {}", truncate_text(trace, 60));
                }
            }
        }

        // ========== 流程 2: 正文读取 ==========
        let Some(page) = self.content_reader.read(dom) else {
            info!("页面没有可分析的正文，跳过提取");
            return None;
        };

        // ========== 流程 3: 转换与组装 ==========
        let markdown = self.markdown_converter.convert(&page.content);
        let (content, explanation) = self.split_explanation(&markdown);

        let title = if page.title.trim().is_empty() {
            dom.title()
        } else {
            page.title.trim().to_string()
        };

        if self.verbose_logging {
            debug!("正文预览: {}", truncate_text(&content, 80));
        }
        info!(
            "✅ 提取完成: 学生答案 {:?} / 正确答案 {:?} / {} 条解析",
            answers.user_answer,
            answers.correct_answer,
            rationales.len()
        );

        Some(ExtractionResult {
            content,
            explanation,
            user_answer: answers.user_answer,
            correct_answer: answers.correct_answer,
            rationales,
            title,
        })
    }

    /// 在标记词处把正文切成题干与讲解两段
    ///
    /// 标记词打头的文本不切，讲解里保留标记词本身
    fn split_explanation(&self, markdown: &str) -> (String, Option<String>) {
        if let Some(m) = self.split_marker.find(markdown) {
            if m.start() > 0 {
                let content = markdown[..m.start()].trim().to_string();
                let explanation = markdown[m.start()..].trim().to_string();
                return (content, Some(explanation));
            }
        }
        (markdown.trim().to_string(), None)
    }
}
