use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use awful_aj::{api::ask, config, config::AwfulJadeConfig, template, template::ChatTemplate};
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::models::GeneratedText;

/// Anything that turns a prompt into a completion.
// ?Send: awful_aj's request future is awaited on the current thread only.
#[async_trait(?Send)]
pub trait TextGenerator {
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// OpenAI-compatible chat endpoint configured through awful_aj.
pub struct AwfulJadeGenerator {
    cfg: AwfulJadeConfig,
    tpl: ChatTemplate,
}

impl AwfulJadeGenerator {
    pub fn new(cfg: AwfulJadeConfig, tpl: ChatTemplate) -> Self {
        Self { cfg, tpl }
    }
}

#[async_trait(?Send)]
impl TextGenerator for AwfulJadeGenerator {
    async fn complete(&self, prompt: &str) -> Result<String> {
        // Map Box<dyn StdError> -> anyhow::Error *before* `?`
        let answer = ask(&self.cfg, prompt.to_string(), &self.tpl, None, None, false)
            .await
            .map_err(|e| anyhow!(e.to_string()))?;
        Ok(answer)
    }
}

/// Where the awful_aj config and chat template live.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub config_path: PathBuf,
    pub template_name: String,
}

fn base_config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("AJ_CONFIG_DIR") {
        return Ok(PathBuf::from(dir));
    }
    awful_aj::config_dir().map_err(|e| anyhow!(e.to_string()))
}

/// Locate the awful_aj config and template. Nothing is read from disk here.
pub fn resolve_llm_settings(cli_config: Option<&str>) -> Result<LlmSettings> {
    // 1) Config file — CLI arg > AJ_CONFIG > <base>/config.yaml
    let config_path = if let Some(p) = cli_config {
        debug!("Using config file from --config argument: {}", p);
        PathBuf::from(p)
    } else if let Ok(p) = std::env::var("AJ_CONFIG") {
        PathBuf::from(p)
    } else {
        base_config_dir()?.join("config.yaml")
    };

    // 2) Template dir — make it visible to awful_aj::template loader
    if std::env::var("AJ_TEMPLATE_DIR").is_err() {
        let base = base_config_dir()
            .or_else(|e| config_path.parent().map(Path::to_path_buf).ok_or(e))?;
        std::env::set_var("AJ_TEMPLATE_DIR", base.join("templates"));
    }
    let template_name =
        std::env::var("AJ_TEMPLATE_OUTREACH").unwrap_or_else(|_| "partner_outreach".to_string());

    Ok(LlmSettings { config_path, template_name })
}

pub async fn load_generator(settings: &LlmSettings) -> Result<AwfulJadeGenerator> {
    // Friendlier error if missing
    if !settings.config_path.exists() {
        bail!(
            "awful_aj config not found at {}\n\
             Use --config to specify a config file, or set AJ_CONFIG environment variable.\n\
             Example config.yaml:\n\
             api_key: \"YOUR_KEY\"\napi_base: \"http://localhost:5001/v1\"\nmodel: \"qwen3_30b_a3\"\n",
            settings.config_path.display()
        );
    }
    let cfg = config::load_config(
        settings
            .config_path
            .to_str()
            .ok_or_else(|| anyhow!("invalid config path"))?,
    )
    .map_err(|e| anyhow!(e.to_string()))?;
    let tpl = template::load_template(&settings.template_name)
        .await
        .map_err(|e| anyhow!("template {:?}: {}", settings.template_name, e))?;
    debug!(
        "LLM client ready - config={}, template={}",
        settings.config_path.display(),
        settings.template_name
    );
    Ok(AwfulJadeGenerator::new(cfg, tpl))
}

/// Defers locating and reading config until the first generation, so browsing works without it.
/// A failed attempt is retried on the next generation.
pub struct LazyGenerator {
    cli_config: Option<String>,
    inner: OnceCell<AwfulJadeGenerator>,
}

impl LazyGenerator {
    pub fn new(cli_config: Option<String>) -> Self {
        Self { cli_config, inner: OnceCell::new() }
    }

    pub fn is_loaded(&self) -> bool {
        self.inner.initialized()
    }
}

#[async_trait(?Send)]
impl TextGenerator for LazyGenerator {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let generator = self
            .inner
            .get_or_try_init(|| async {
                let settings = resolve_llm_settings(self.cli_config.as_deref())?;
                load_generator(&settings).await
            })
            .await?;
        generator.complete(prompt).await
    }
}

/// Send the prompt; failures come back as inline text, never as an error.
pub async fn generate_outreach(generator: &dyn TextGenerator, prompt: &str) -> GeneratedText {
    let start = std::time::Instant::now();
    debug!("LLM call starting - prompt_length={} chars", prompt.len());

    match generator.complete(prompt).await {
        Ok(text) => {
            info!(
                "LLM API call completed - duration={:.2}s, response_length={} chars",
                start.elapsed().as_secs_f32(),
                text.len()
            );
            GeneratedText::Text(text)
        }
        Err(e) => {
            warn!(
                "LLM API call failed - duration={:.2}s, error={:#}",
                start.elapsed().as_secs_f32(),
                e
            );
            GeneratedText::Error(format!("{:#}", e))
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::WARNING_MARKER;
    use std::cell::RefCell;

    /// Records prompts and replays a canned answer.
    pub(crate) struct FakeGenerator {
        pub answer: Result<String, String>,
        pub seen: RefCell<Vec<String>>,
    }

    impl FakeGenerator {
        pub(crate) fn ok(text: &str) -> Self {
            Self { answer: Ok(text.to_string()), seen: RefCell::new(Vec::new()) }
        }

        pub(crate) fn failing(msg: &str) -> Self {
            Self { answer: Err(msg.to_string()), seen: RefCell::new(Vec::new()) }
        }
    }

    #[async_trait(?Send)]
    impl TextGenerator for FakeGenerator {
        async fn complete(&self, prompt: &str) -> Result<String> {
            self.seen.borrow_mut().push(prompt.to_string());
            self.answer.clone().map_err(|e| anyhow!(e))
        }
    }

    #[tokio::test]
    async fn returns_completion_text() {
        let g = FakeGenerator::ok("Subject: Let's talk");
        let out = generate_outreach(&g, "prompt").await;
        assert_eq!(out, GeneratedText::Text("Subject: Let's talk".into()));
        assert_eq!(g.seen.borrow().as_slice(), ["prompt".to_string()]);
    }

    #[tokio::test]
    async fn failure_becomes_marked_text() {
        let g = FakeGenerator::failing("429 Resource has been exhausted");
        let out = generate_outreach(&g, "prompt").await.to_string();
        assert!(out.starts_with(WARNING_MARKER));
        assert!(out.contains("429 Resource has been exhausted"));
    }

    #[tokio::test]
    async fn missing_config_surfaces_inline() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("config.yaml").display().to_string();
        let lazy = LazyGenerator::new(Some(missing));
        assert!(!lazy.is_loaded());

        let out = generate_outreach(&lazy, "prompt").await;
        assert!(out.is_error());
        assert!(out.to_string().contains("awful_aj config not found"));
        assert!(!lazy.is_loaded());
    }
}
