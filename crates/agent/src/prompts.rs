//! Prompt contracts per agent.
//!
//! Wording may change freely; the contract lines (which tools are mandatory and in which
//! order they are expected) are what the tests pin down.

use std::fmt::Write as _;

use leadflow_core::domain::analysis::AiAnalysis;
use leadflow_core::domain::lead::{Lead, LeadService};
use leadflow_core::domain::note::LeadNote;

use crate::agents::AgentKind;
use crate::tools::ToolName;

/// Facts the agent gets about the lead service it works on.
#[derive(Clone, Debug)]
pub struct PromptInput<'a> {
    pub lead: &'a Lead,
    pub service: &'a LeadService,
    pub notes: &'a [LeadNote],
    pub latest_analysis: Option<&'a AiAnalysis>,
    /// Extra material for this run, e.g. a call transcript summary.
    pub input: &'a str,
}

fn role(agent: AgentKind) -> &'static str {
    match agent {
        AgentKind::Gatekeeper => {
            "You triage incoming home-service requests. Judge urgency and lead quality, list \
             missing information and draft a short first message to the consumer."
        }
        AgentKind::Estimator => {
            "You estimate the job. Search the catalog for products and materials, compute every \
             number with the Calculator or CalculateEstimate tools and draft a quote."
        }
        AgentKind::Dispatcher => {
            "You find partners near the consumer who can perform the requested service."
        }
        AgentKind::Auditor => {
            "You audit whether the intake is complete enough to hand the job to a partner."
        }
        AgentKind::CallLog => {
            "You process the summary of a phone call with the consumer and record what was \
             agreed."
        }
    }
}

fn ordering(agent: AgentKind) -> &'static [&'static str] {
    match agent {
        AgentKind::Gatekeeper => &[
            "Call SaveAnalysis exactly once, then UpdatePipelineStage. Report the current \
             stage when it should not change.",
            "Only call UpdateLeadServiceType when you are sure the consumer picked the wrong \
             service; it only works while the lead is in Triage.",
        ],
        AgentKind::Estimator => &[
            "Never do arithmetic yourself; use Calculator or CalculateEstimate.",
            "Reference catalog products by catalog_product_id; the catalog price always wins.",
            "Call DraftQuote before SaveEstimation. If intake is too incomplete to quote, skip \
             DraftQuote and say so in SaveEstimation.",
            "Finish with UpdatePipelineStage.",
        ],
        AgentKind::Dispatcher => {
            &["Call FindMatchingPartners, then UpdatePipelineStage with the resulting stage."]
        }
        AgentKind::Auditor => {
            &["Call SubmitAuditResult once. List every missing item when the audit fails."]
        }
        AgentKind::CallLog => &[
            "Call SaveNote with a factual summary of the call.",
            "Only update the status or stage when the call made the change explicit.",
        ],
    }
}

fn tool_list(tools: &[ToolName]) -> String {
    tools.iter().map(ToolName::as_str).collect::<Vec<_>>().join(", ")
}

pub fn system_prompt(agent: AgentKind) -> String {
    let mut prompt = String::new();
    let _ = writeln!(prompt, "{}", role(agent));
    let _ = writeln!(prompt);
    let _ = writeln!(prompt, "Available tools: {}.", tool_list(agent.tools()));
    let _ = writeln!(prompt, "Mandatory tools: {}.", tool_list(agent.mandatory()));
    for rule in ordering(agent) {
        let _ = writeln!(prompt, "- {rule}");
    }
    let _ = writeln!(
        prompt,
        "- Amounts are integer cents and VAT rates are basis points (2100 = 21%)."
    );
    let _ = write!(prompt, "- Tool failures come back as {{\"success\": false}}; fix the call and retry.");
    prompt
}

pub fn user_prompt(input: &PromptInput<'_>) -> String {
    let mut prompt = String::new();
    let lead = input.lead;
    let service = input.service;

    let _ = writeln!(prompt, "Consumer: {}", lead.consumer_name);
    let _ = writeln!(prompt, "Phone: {}", lead.phone.as_deref().unwrap_or("unknown"));
    let _ = writeln!(prompt, "Email: {}", lead.email.as_deref().unwrap_or("unknown"));
    let _ = writeln!(prompt, "Zip code: {}", lead.zip_code.as_deref().unwrap_or("unknown"));
    let _ = writeln!(prompt, "Service: {}", service.service_type);
    let _ = writeln!(prompt, "Stage: {} / status: {}", service.stage, service.status);
    if let Some(note) = service.consumer_note.as_deref().filter(|note| !note.trim().is_empty()) {
        let _ = writeln!(prompt, "Consumer note: {}", note.trim());
    }
    if !service.customer_preferences.is_null() {
        let _ = writeln!(prompt, "Preferences: {}", service.customer_preferences);
    }

    if let Some(analysis) = input.latest_analysis {
        let _ = writeln!(
            prompt,
            "Latest analysis: quality {}, action {}{}",
            analysis.lead_quality.as_str(),
            analysis.recommended_action.as_str(),
            if analysis.is_fallback { " (automatic fallback)" } else { "" }
        );
        if !analysis.missing_information.is_empty() {
            let _ = writeln!(prompt, "Missing information: {}", analysis.missing_information.join(", "));
        }
    }

    if !input.notes.is_empty() {
        let _ = writeln!(prompt, "Notes:");
        for note in input.notes {
            let _ = writeln!(prompt, "- [{}] {}", note.author.label(), note.body);
        }
    }

    if !input.input.trim().is_empty() {
        let _ = writeln!(prompt);
        let _ = writeln!(prompt, "Input:");
        let _ = writeln!(prompt, "{}", input.input.trim());
    }
    prompt
}

/// The single explicit instruction used on retry.
pub fn retry_instruction(missing: &[ToolName]) -> String {
    format!(
        "You did not call {}. You must call {} now before doing anything else.",
        tool_list(missing),
        tool_list(missing)
    )
}
