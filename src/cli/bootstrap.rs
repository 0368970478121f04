// src/cli/bootstrap.rs — Wire the assistant from config and environment

use std::sync::Arc;

use crate::core::assistant::Assistant;
use crate::core::orchestrator::ConversationOrchestrator;
use crate::infra::config::{require_secret, Config};
use crate::knowledge::KnowledgeBase;
use crate::provider::anthropic::AnthropicProvider;
use crate::provider::tiers::ModelTiers;
use crate::provider::ModelProvider;
use crate::scheduling::calendly::CalendlyApi;
use crate::scheduling::metrics::{CompositeSink, FacadeSink, TracingSink};
use crate::scheduling::SchedulingClient;
use crate::session::open_store;
use crate::tools::booking::{register_booking_tools, BookingContext};
use crate::tools::faq::SearchFaq;
use crate::tools::{ToolExecutor, ToolRegistry};

pub const MODEL_KEY_VAR: &str = "ANTHROPIC_API_KEY";
pub const SCHEDULING_TOKEN_VAR: &str = "CALENDLY_API_TOKEN";

/// Build a ready-to-serve assistant. Fails fast on missing secrets.
pub fn build_assistant(config: &Config) -> anyhow::Result<Arc<Assistant>> {
    let model_key = require_secret(MODEL_KEY_VAR)?;
    let scheduling_token = require_secret(SCHEDULING_TOKEN_VAR)?;

    let provider: Arc<dyn ModelProvider> = Arc::new(AnthropicProvider::new(model_key));
    let tiers = ModelTiers::from_config(provider, &config.models)?;
    tracing::info!(
        cheap = %tiers.cheap.model(),
        capable = %tiers.capable.model(),
        "Model tiers ready"
    );

    let api = CalendlyApi::new(
        scheduling_token,
        &config.scheduling,
        config.clinic.timezone.clone(),
    )?;
    let metrics = CompositeSink::new(vec![Box::new(TracingSink), Box::new(FacadeSink)]);
    let client = SchedulingClient::from_config(Arc::new(api), Arc::new(metrics), &config.scheduling);

    let kb = Arc::new(KnowledgeBase::load(
        &config.knowledge.path,
        config.knowledge.max_results,
    ));

    let mut registry = ToolRegistry::new();
    register_booking_tools(
        &mut registry,
        Arc::new(BookingContext::new(
            Arc::new(client),
            config.scheduling.max_range_days,
            i64::from(config.clinic.slot_minutes),
        )),
    );
    registry.register(SearchFaq::new(kb.clone()));
    tracing::debug!(tools = ?registry.tool_names(), "Tools registered");

    let orchestrator = ConversationOrchestrator::new(
        tiers,
        Arc::new(ToolExecutor::new(registry)),
        kb,
        config,
    );
    let store = open_store(&config.session)?;

    Ok(Arc::new(Assistant::new(
        Arc::new(orchestrator),
        store,
        &config.conversation,
    )))
}
