//! Prompt documents for LogQL generation, compiled into the binary

use chrono::{DateTime, Utc};

use crate::window::TIME_FORMAT;

pub const LOGQL_SYSTEM_TEMPLATE: &str = include_str!("../prompts/logql_system.md");
pub const LOGQL_GUIDE: &str = include_str!("../prompts/logql_guide.md");
pub const SAMPLE_LOGS: &str = include_str!("../prompts/sample_logs.md");

/// System prompt for one LogQL generation call
pub fn render_system_prompt(user_application: &str, now: DateTime<Utc>) -> String {
    LOGQL_SYSTEM_TEMPLATE
        .replace("{utc_date_and_time}", &now.format(TIME_FORMAT).to_string())
        .replace("{user_application}", user_application)
        .replace("{knowledge_wiki}", LOGQL_GUIDE)
        .replace("{sample_logs}", SAMPLE_LOGS)
}
