use serde::{Deserialize, Serialize};

/// The fixed set of AI feature keys. Unknown keys fail to deserialize, so
/// they never reach the prompt store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum AiFeature {
    Homework,
    LearningReport,
    Chat,
}

impl AiFeature {
    pub const ALL: [AiFeature; 3] = [AiFeature::Homework, AiFeature::LearningReport, AiFeature::Chat];

    pub fn key(self) -> &'static str {
        match self {
            AiFeature::Homework => "homework",
            AiFeature::LearningReport => "learningReport",
            AiFeature::Chat => "chat",
        }
    }
}

impl std::str::FromStr for AiFeature {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "homework" => Ok(AiFeature::Homework),
            "learningReport" => Ok(AiFeature::LearningReport),
            "chat" => Ok(AiFeature::Chat),
            _ => Err(anyhow::anyhow!("Unknown AI feature: {s}")),
        }
    }
}

/// Per-feature prompt/parameter record, mutable at runtime by the admin
/// console and resettable to built-in defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PromptConfig {
    pub name: String,
    pub role: String,
    pub description: String,
    pub system_prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptPatch {
    pub name: Option<String>,
    pub role: Option<String>,
    pub description: Option<String>,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

// Feature request/response DTOs
#[derive(Debug, Deserialize)]
pub struct HomeworkRequest {
    pub question: Option<String>,
    /// Base64-encoded JPEG of the problem, forwarded as a vision payload.
    pub image: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningReportRequest {
    pub grade: String,
    pub subjects: Vec<String>,
    pub strengths: Option<String>,
    pub weaknesses: Option<String>,
    pub study_hours: Option<String>,
    pub goals: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
pub struct AiReply {
    pub reply: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_key_round_trip() {
        for f in AiFeature::ALL {
            let parsed: AiFeature = f.key().parse().unwrap();
            assert_eq!(parsed, f);
        }
        assert!("essayGrader".parse::<AiFeature>().is_err());
    }
}
