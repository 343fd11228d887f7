use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::RwLock,
};

use crate::error::AppError;
use crate::models::ai::{AiFeature, PromptConfig, PromptPatch};

/// File-backed store for the per-feature prompt/parameter records. The
/// in-memory map is the single source of truth; every write goes through the
/// write lock and lands on disk before returning.
pub struct PromptStore {
    path: PathBuf,
    prompts: RwLock<HashMap<AiFeature, PromptConfig>>,
}

pub fn default_prompts() -> HashMap<AiFeature, PromptConfig> {
    HashMap::from([
        (
            AiFeature::Homework,
            PromptConfig {
                name: "Homework Helper".to_string(),
                role: "Sage".to_string(),
                description: "A patient tutor who guides students toward the answer instead of giving it away"
                    .to_string(),
                system_prompt: "You are a patient, friendly tutor called \"Sage\". Your students are \
children in rural boarding programs, from primary through middle school.\n\n\
Your tutoring principles:\n\
1. Guide, don't solve: ask questions that lead the student to work out the answer themselves.\n\
2. Break it down: split a hard problem into small steps the student can follow.\n\
3. Encourage: praise effort and progress to build confidence.\n\
4. Keep it simple: explain ideas with plain language and everyday examples.\n\
5. Reinforce: after an explanation, offer a similar practice problem.\n\n\
Answer in a warm, friendly tone."
                    .to_string(),
                max_tokens: 2000,
                temperature: 0.7,
            },
        ),
        (
            AiFeature::LearningReport,
            PromptConfig {
                name: "Learning Report".to_string(),
                role: "Ms. Sage".to_string(),
                description: "A study advisor who turns a student's situation into a personalised report"
                    .to_string(),
                system_prompt: "You are a professional study advisor called \"Ms. Sage\". Based on the \
details the student provides, write a personalised learning report.\n\n\
Structure the report with clear headings:\n\
- Current standing: an honest read of where the student is now\n\
- Strengths: genuine recognition of what the student does well\n\
- Areas to improve: concrete, workable suggestions for weak spots\n\
- Study plan: a daily or weekly schedule that fits their available time\n\
- Closing note: a short, warm message of encouragement\n\n\
Keep in mind these students often study with limited resources, so keep every \
suggestion practical. Encourage more than you criticise."
                    .to_string(),
                max_tokens: 3000,
                temperature: 0.7,
            },
        ),
        (
            AiFeature::Chat,
            PromptConfig {
                name: "Chat Companion".to_string(),
                role: "Sunny".to_string(),
                description: "A warm companion offering everyday conversation and emotional support"
                    .to_string(),
                system_prompt: "You are a warm, caring companion called \"Sunny\". You chat with \
children aged 6 to 15 whose parents work far from home.\n\n\
How you behave:\n\
1. Care like an older sibling: gentle, kind, genuinely interested.\n\
2. Listen first: respond to what the child actually said.\n\
3. Support: comfort and encourage when they miss their parents or feel stuck.\n\
4. Stay positive: nudge the conversation toward hopeful, constructive places.\n\
5. Know your limits: if a child seems to be in danger or seriously struggling, \
gently suggest they talk to a trusted adult or teacher.\n\n\
Keep replies short and conversational, usually two to four sentences. Never give \
medical or psychological treatment advice; you are a companion, not a clinician."
                    .to_string(),
                max_tokens: 500,
                temperature: 0.7,
            },
        ),
    ])
}

impl PromptStore {
    /// Load from the backing file, filling in any missing feature keys from
    /// the defaults. A missing or unreadable file starts from defaults and
    /// writes them out.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let mut prompts = default_prompts();

        match std::fs::read_to_string(&path) {
            Ok(data) => match serde_json::from_str::<HashMap<AiFeature, PromptConfig>>(&data) {
                Ok(stored) => {
                    for (feature, config) in stored {
                        prompts.insert(feature, config);
                    }
                }
                Err(e) => {
                    tracing::warn!("prompt file {} is invalid, using defaults: {e}", path.display());
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!("could not read prompt file {}: {e}", path.display());
            }
        }

        let store = Self {
            path,
            prompts: RwLock::new(prompts),
        };
        store.persist()?;
        Ok(store)
    }

    pub fn get(&self, feature: AiFeature) -> PromptConfig {
        self.prompts
            .read()
            .expect("prompt store lock poisoned")
            .get(&feature)
            .cloned()
            .unwrap_or_else(|| default_prompts().remove(&feature).expect("default exists"))
    }

    pub fn all(&self) -> HashMap<AiFeature, PromptConfig> {
        self.prompts
            .read()
            .expect("prompt store lock poisoned")
            .clone()
    }

    pub fn update(&self, feature: AiFeature, patch: &PromptPatch) -> Result<PromptConfig, AppError> {
        let updated = {
            let mut prompts = self.prompts.write().expect("prompt store lock poisoned");
            let config = prompts
                .get_mut(&feature)
                .expect("all features are seeded at load");
            if let Some(ref name) = patch.name {
                config.name = name.clone();
            }
            if let Some(ref role) = patch.role {
                config.role = role.clone();
            }
            if let Some(ref description) = patch.description {
                config.description = description.clone();
            }
            if let Some(ref system_prompt) = patch.system_prompt {
                config.system_prompt = system_prompt.clone();
            }
            if let Some(max_tokens) = patch.max_tokens {
                config.max_tokens = max_tokens;
            }
            if let Some(temperature) = patch.temperature {
                config.temperature = temperature;
            }
            config.clone()
        };
        self.persist().map_err(AppError::Internal)?;
        Ok(updated)
    }

    /// Reset one feature, or all of them, to the built-in defaults.
    pub fn reset(&self, feature: Option<AiFeature>) -> Result<HashMap<AiFeature, PromptConfig>, AppError> {
        let snapshot = {
            let mut prompts = self.prompts.write().expect("prompt store lock poisoned");
            let defaults = default_prompts();
            match feature {
                Some(feature) => {
                    let config = defaults.get(&feature).expect("default exists").clone();
                    prompts.insert(feature, config);
                }
                None => *prompts = defaults,
            }
            prompts.clone()
        };
        self.persist().map_err(AppError::Internal)?;
        Ok(snapshot)
    }

    fn persist(&self) -> anyhow::Result<()> {
        let prompts = self.prompts.read().expect("prompt store lock poisoned");
        let data = serde_json::to_string_pretty(&*prompts)?;
        std::fs::write(&self.path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    fn scratch_path() -> PathBuf {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        std::env::temp_dir().join(format!(
            "carelink-prompts-{}-{n}.json",
            std::process::id()
        ))
    }

    #[test]
    fn fresh_store_has_defaults() {
        let path = scratch_path();
        let store = PromptStore::load(&path).unwrap();
        for feature in AiFeature::ALL {
            assert_eq!(store.get(feature), default_prompts()[&feature]);
        }
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn patch_persists_across_reload() {
        let path = scratch_path();
        let store = PromptStore::load(&path).unwrap();
        let patch = PromptPatch {
            name: None,
            role: None,
            description: None,
            system_prompt: Some("Answer in one word.".into()),
            max_tokens: Some(64),
            temperature: None,
        };
        let updated = store.update(AiFeature::Chat, &patch).unwrap();
        assert_eq!(updated.system_prompt, "Answer in one word.");
        assert_eq!(updated.max_tokens, 64);
        // Untouched fields keep their values.
        assert_eq!(updated.temperature, default_prompts()[&AiFeature::Chat].temperature);

        let reloaded = PromptStore::load(&path).unwrap();
        assert_eq!(reloaded.get(AiFeature::Chat), updated);
        // Other features untouched.
        assert_eq!(
            reloaded.get(AiFeature::Homework),
            default_prompts()[&AiFeature::Homework]
        );
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn reset_single_restores_default() {
        let path = scratch_path();
        let store = PromptStore::load(&path).unwrap();
        let patch = PromptPatch {
            name: Some("Renamed".into()),
            role: None,
            description: None,
            system_prompt: None,
            max_tokens: None,
            temperature: None,
        };
        store.update(AiFeature::Homework, &patch).unwrap();
        store.update(AiFeature::Chat, &patch).unwrap();

        store.reset(Some(AiFeature::Homework)).unwrap();
        assert_eq!(
            store.get(AiFeature::Homework),
            default_prompts()[&AiFeature::Homework]
        );
        assert_eq!(store.get(AiFeature::Chat).name, "Renamed");

        store.reset(None).unwrap();
        assert_eq!(store.all(), default_prompts());
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn partial_file_is_filled_with_defaults() {
        let path = scratch_path();
        std::fs::write(
            &path,
            r#"{"chat":{"name":"C","role":"R","description":"D","systemPrompt":"S","maxTokens":5,"temperature":0.1}}"#,
        )
        .unwrap();
        let store = PromptStore::load(&path).unwrap();
        assert_eq!(store.get(AiFeature::Chat).name, "C");
        assert_eq!(
            store.get(AiFeature::LearningReport),
            default_prompts()[&AiFeature::LearningReport]
        );
        let _ = std::fs::remove_file(path);
    }
}
