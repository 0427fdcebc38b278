pub mod answer_detector;
pub mod content_reader;
pub mod latex;
pub mod markdown;
pub mod rationale_extractor;
pub mod root_locator;

pub use answer_detector::{AnswerDetector, DetectedAnswers};
pub use content_reader::{BodyReader, ContentReader, PageContent};
pub use latex::{LatexPostProcessor, LatexScanner};
pub use markdown::MarkdownConverter;
pub use rationale_extractor::RationaleExtractor;
pub use root_locator::{QuestionScope, RootLocator};
