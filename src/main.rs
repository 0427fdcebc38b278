use anyhow::{Context, Result};
use std::fs;

use question_extract::utils::logging;
use question_extract::{Config, ExtractError, ExtractFlow, PageDom};

fn main() -> Result<()> {
    // 初始化日志
    logging::init();

    // 加载配置
    let config = Config::from_env();
    if !config.output_log_file.is_empty() {
        logging::init_log_file(&config.output_log_file)
            .with_context(|| format!("无法创建日志文件: {}", config.output_log_file))?;
    }

    let path = std::env::args()
        .nth(1)
        .context("用法: question_extract <页面HTML文件>")?;
    logging::log_startup(&path);

    // 读入页面并提取
    let html =
        fs::read_to_string(&path).map_err(|e| ExtractError::file_read_failed(&path, e))?;
    let dom = PageDom::parse(&html);
    let flow = ExtractFlow::new(&config);

    match flow.run(&dom) {
        Some(result) => println!("{}", result.to_json()?),
        None => tracing::warn!("⚠️ 页面没有可分析的正文，未产出结果"),
    }

    Ok(())
}
