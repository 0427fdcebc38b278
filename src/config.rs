/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 是否显示详细日志（中间产物预览）
    pub verbose_logging: bool,
    /// 输出日志文件（为空则不落盘）
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            verbose_logging: false,
            output_log_file: String::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            verbose_logging: std::env::var("QE_VERBOSE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("QE_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }
}
