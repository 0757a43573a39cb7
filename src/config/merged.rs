use super::job::Job;
use super::settings::Settings;

#[derive(Debug, Clone)]
pub struct MergedConfig {
    pub settings: Settings,
    pub manual: Option<String>,
    /// 1始まりのページ番号。Noneなら全ページ。
    pub pages: Option<Vec<u32>>,
    pub preview: bool,
}

impl MergedConfig {
    /// JobのOption値がSomeならJobの値を、NoneならSettingsの値を使用する。
    pub fn new(settings: &Settings, job: &Job) -> Self {
        let mut merged = settings.clone();
        if let Some(prefix) = &job.prefix {
            merged.prefix = prefix.clone();
        }
        merged.bold_required = job.bold_required.unwrap_or(settings.bold_required);
        merged.font_size_range = job.font_size_range.unwrap_or(settings.font_size_range);

        MergedConfig {
            settings: merged,
            manual: job.manual.clone(),
            pages: job.pages.clone(),
            preview: job.preview.unwrap_or(false),
        }
    }
}
