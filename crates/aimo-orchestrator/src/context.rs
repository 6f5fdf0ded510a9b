//! Builds the long-lived handles one pipeline run shares across stages:
//! the resolved Standard, loaded rules and vendor mapping, the Persistence
//! Gateway, and the version tuple that determines `run_key`.

use aimo_config::Config;
use aimo_core::model::RunVersions;
use aimo_ingest::mapping::VendorMapping;
use aimo_llm::{AnthropicBackend, AnthropicConfig, BudgetController, LlmBackend, PriceTable, StubBackend};
use aimo_persistence::PersistenceGateway;
use aimo_rules::loader::CompiledRule;
use aimo_standard::{ResolveRequest, ResolvedStandard};
use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use chrono::Utc;
use std::sync::Arc;

/// Everything a stage needs, assembled once in [`EngineContext::build`] and
/// shared by reference through the rest of the run.
pub struct EngineContext {
    pub config: Config,
    pub gateway: PersistenceGateway,
    pub standard: ResolvedStandard,
    pub rules: Vec<CompiledRule>,
    pub mapping: VendorMapping,
    pub llm_backend: Arc<dyn LlmBackend>,
    pub budget: BudgetController,
}

impl EngineContext {
    /// Resolves the Standard (enforcing the pinning guard per `spec.md`
    /// §4.2), loads the vendor mapping and rule set, opens the Persistence
    /// Gateway, and selects an LLM backend (`anthropic` or, under
    /// `AIMO_CLASSIFIER=stub`, the deterministic stub).
    pub fn build(config: Config) -> Result<Self> {
        let db_path = config
            .paths
            .db_path
            .clone()
            .context("--db-path (or [paths] db_path) is required")?;
        let temp_dir = db_path
            .parent()
            .map(|p| p.join(".aimo-tmp"))
            .unwrap_or_else(|| Utf8PathBuf::from(".aimo-tmp"));
        std::fs::create_dir_all(&temp_dir).with_context(|| format!("creating persistence temp dir {temp_dir}"))?;
        let gateway = PersistenceGateway::open(&db_path, &temp_dir, config.persistence.queue_capacity).context("opening persistence gateway")?;

        let cache_dir = expand_home(&config.paths.standard_cache_dir);
        let resolve_req = ResolveRequest {
            version: &config.standard_version,
            submodule_dir: &config.paths.standard_submodule_dir,
            cache_dir: &cache_dir,
            skip_pinning_check_requested: config.skip_pin_check_requested,
            env_allows_skip_pinning: aimo_config::config::env::allow_skip_pinning(),
        };
        let standard = aimo_standard::resolve_standard(&resolve_req).map_err(standard_error_to_engine)?;

        let mapping = aimo_ingest::load_vendor_mapping(&config.paths.vendors_dir, &config.vendor).map_err(|source| {
            anyhow::Error::new(aimo_core::AimoError::MappingMissing { vendor: config.vendor.clone() }).context(source.to_string())
        })?;
        let rules = aimo_rules::load_rules_dir(&config.paths.rules_dir).context("loading rule files")?;

        let taxonomy = Arc::new(standard.taxonomy.clone());
        let llm_backend: Arc<dyn LlmBackend> = if aimo_llm::stub_classifier_requested() {
            Arc::new(StubBackend::new(taxonomy))
        } else {
            let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
            Arc::new(
                AnthropicBackend::new(AnthropicConfig {
                    api_key,
                    base_url: None,
                    model: config.llm.model.clone(),
                    max_tokens: 1024,
                    temperature: 0.0,
                    request_timeout: std::time::Duration::from_secs(config.llm.timeout_seconds),
                })
                .context("constructing anthropic backend")?,
            )
        };

        let budget = BudgetController::new(
            config.llm.daily_budget_usd,
            PriceTable {
                input_price_per_token: 0.000_003,
                output_price_per_token: 0.000_015,
                estimation_buffer: config.llm.estimation_buffer,
            },
            Utc::now(),
        );

        Ok(EngineContext { config, gateway, standard, rules, mapping, llm_backend, budget })
    }

    #[must_use]
    pub fn run_versions(&self) -> RunVersions {
        let v = &self.config.versions;
        RunVersions {
            target_range: v.target_range.clone(),
            signature_version: v.signature_version.clone(),
            rule_version: v.rule_version.clone(),
            prompt_version: v.prompt_version.clone(),
            taxonomy_version: v.taxonomy_version.clone(),
            evidence_pack_version: v.evidence_pack_version.clone(),
            engine_spec_version: v.engine_spec_version.clone(),
        }
    }
}

fn expand_home(path: &Utf8PathBuf) -> Utf8PathBuf {
    if let Some(rest) = path.as_str().strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            if let Ok(home) = Utf8PathBuf::from_path_buf(home) {
                return home.join(rest);
            }
        }
    }
    path.clone()
}

fn standard_error_to_engine(e: aimo_standard::StandardResolveError) -> anyhow::Error {
    use aimo_standard::pin::PinningError;
    use aimo_standard::StandardResolveError;
    match e {
        StandardResolveError::Pinning(PinningError::CommitMismatch { pinned, resolved }) | StandardResolveError::Pinning(PinningError::DirShaMismatch { pinned, resolved }) => {
            aimo_core::AimoError::PinningMismatch { expected: pinned, resolved }.into()
        }
        StandardResolveError::Pinning(PinningError::GuardedSkipMisuse) => aimo_core::AimoError::GuardedSkipMisuse.into(),
        other => anyhow::Error::new(other).context("resolving AIMO Standard"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expand_home_rewrites_tilde_prefix() {
        let expanded = expand_home(&Utf8PathBuf::from("~/.cache/aimo/standard"));
        assert!(!expanded.as_str().starts_with('~'));
    }

    #[test]
    fn expand_home_leaves_absolute_paths_untouched() {
        let expanded = expand_home(&Utf8PathBuf::from("/var/aimo/standard"));
        assert_eq!(expanded, Utf8PathBuf::from("/var/aimo/standard"));
    }
}
