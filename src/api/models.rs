use serde::{Deserialize, Serialize};

#[derive(Deserialize, Debug, Default, Clone)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

impl AnalyzeRequest {
    /// Text supplied directly by the caller, if it has any content.
    pub fn direct_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }

    pub fn target_url(&self) -> Option<&str> {
        self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())
    }
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct AnalysisResult {
    pub analysis: Vec<String>,
}

impl AnalysisResult {
    pub fn from_reply(reply: &str) -> Self {
        Self { analysis: split_paragraphs(reply) }
    }
}

#[derive(Serialize)]
pub struct LivenessResponse {
    pub message: String,
    pub timestamp: String,
}

/// Splits model output on blank lines; a reply without any blank line is
/// split line by line instead. Entries are trimmed and empties dropped;
/// indentation inside a multi-line paragraph is kept.
pub fn split_paragraphs(reply: &str) -> Vec<String> {
    let mut paragraphs: Vec<Vec<&str>> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in reply.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    match paragraphs.len() {
        0 => Vec::new(),
        1 => paragraphs
            .remove(0)
            .into_iter()
            .map(|line| line.trim().to_string())
            .collect(),
        _ => paragraphs
            .into_iter()
            .map(|lines| lines.join("\n").trim().to_string())
            .collect(),
    }
}
