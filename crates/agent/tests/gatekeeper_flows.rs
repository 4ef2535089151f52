mod common;

use std::sync::Arc;

use serde_json::json;

use leadflow_agent::fallback::RecoveryAction;
use leadflow_agent::llm::{ModelError, ScriptedCall, ScriptedModel};
use leadflow_agent::retry::RetryState;
use leadflow_agent::stage_machine::StageMachine;
use leadflow_agent::{AgentError, AgentKind, Orchestrator};
use leadflow_core::domain::analysis::{ContactChannel, LeadQuality, RecommendedAction};
use leadflow_core::domain::stage::{LeadServiceStatus, PipelineStage};
use leadflow_core::domain::timeline::TimelineEventKind;
use leadflow_core::events::PipelineEvent;
use leadflow_core::pipeline::DisqualifyDecision;

use common::Harness;

fn save_analysis(quality: &str, action: &str) -> ScriptedCall {
    ScriptedCall::new(
        "SaveAnalysis",
        json!({
            "urgency": "Medium",
            "lead_quality": quality,
            "recommended_action": action,
            "missing_information": [],
            "suggested_message": "Bedankt voor uw aanvraag.",
            "summary": "Dakgoot lekt, klant wil snel geholpen worden."
        }),
    )
}

fn update_stage(stage: &str) -> ScriptedCall {
    ScriptedCall::new("UpdatePipelineStage", json!({ "stage": stage, "reason": "triage complete" }))
}

#[tokio::test]
async fn silent_model_gets_one_retry_then_exactly_one_fallback_analysis() {
    let harness = Harness::new(Some("+31612345678"), PipelineStage::Triage).await;
    let model = Arc::new(ScriptedModel::silent());
    let orchestrator = Orchestrator::gatekeeper(harness.services.clone(), model.clone());

    let report = orchestrator.run(harness.request()).await.expect("run");

    assert_eq!(report.attempts, 2);
    assert_eq!(report.retry_state, RetryState::Escalated);
    let actions: Vec<_> = report.recovery.iter().map(|outcome| outcome.action).collect();
    assert_eq!(actions, vec![RecoveryAction::FallbackAnalysis, RecoveryAction::StageUpdateFallback]);
    assert!(report.recovery.iter().all(|outcome| outcome.applied));

    let analyses = harness.analyses().await;
    assert_eq!(analyses.len(), 1);
    let fallback = &analyses[0];
    assert!(fallback.is_fallback);
    assert_eq!(fallback.recommended_action, RecommendedAction::RequestInfo);
    assert_eq!(fallback.preferred_channel, ContactChannel::WhatsApp);

    assert_eq!(harness.events_of(TimelineEventKind::AnalysisFallback).await.len(), 1);
    assert_eq!(harness.events_of(TimelineEventKind::StageUpdateFallback).await.len(), 1);
    assert!(harness.events_of(TimelineEventKind::StageChange).await.is_empty());
    assert_eq!(harness.service().await.stage, PipelineStage::Triage);
    assert_eq!(report.disqualification, Some(DisqualifyDecision::NotJunk));

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert!(!requests[0].user_prompt.contains("You must call"));
    assert!(requests[1]
        .user_prompt
        .contains("You must call SaveAnalysis, UpdatePipelineStage now"));
}

#[tokio::test]
async fn missing_stage_update_is_recorded_without_moving_the_stage() {
    let harness = Harness::new(Some("+31612345678"), PipelineStage::Triage).await;
    let model = Arc::new(
        ScriptedModel::silent().with_turn(vec![save_analysis("Potential", "ScheduleSurvey")]),
    );
    let orchestrator = Orchestrator::gatekeeper(harness.services.clone(), model.clone());

    let report = orchestrator.run(harness.request()).await.expect("run");

    assert_eq!(report.attempts, 2);
    assert_eq!(report.retry_state, RetryState::Escalated);
    let requests = model.requests();
    assert!(requests[1].user_prompt.contains("You must call UpdatePipelineStage now"));

    let actions: Vec<_> = report.recovery.iter().map(|outcome| outcome.action).collect();
    assert_eq!(actions, vec![RecoveryAction::StageUpdateFallback]);

    let recorded = harness.events_of(TimelineEventKind::StageUpdateFallback).await;
    assert_eq!(recorded.len(), 1);
    assert_eq!(recorded[0].metadata.get("missing_tool").map(String::as_str), Some("UpdatePipelineStage"));
    assert_eq!(recorded[0].metadata.get("current_stage").map(String::as_str), Some("Triage"));

    let analyses = harness.analyses().await;
    assert_eq!(analyses.len(), 1);
    assert!(!analyses[0].is_fallback);
    assert!(harness.events_of(TimelineEventKind::AnalysisFallback).await.is_empty());
    assert!(harness.events_of(TimelineEventKind::StageChange).await.is_empty());
    assert_eq!(harness.service().await.stage, PipelineStage::Triage);
}

#[tokio::test]
async fn fallback_channel_is_email_without_a_phone() {
    let harness = Harness::new(None, PipelineStage::Triage).await;
    let orchestrator =
        Orchestrator::gatekeeper(harness.services.clone(), Arc::new(ScriptedModel::silent()));

    orchestrator.run(harness.request()).await.expect("run");

    let analyses = harness.analyses().await;
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].preferred_channel, ContactChannel::Email);
}

#[tokio::test]
async fn retry_that_saves_the_analysis_needs_no_fallback() {
    let harness = Harness::new(Some("+31612345678"), PipelineStage::Triage).await;
    let model = ScriptedModel::silent()
        .with_turn(Vec::new())
        .with_turn(vec![save_analysis("Potential", "ScheduleSurvey"), update_stage("Nurturing")]);
    let orchestrator = Orchestrator::gatekeeper(harness.services.clone(), Arc::new(model));

    let report = orchestrator.run(harness.request()).await.expect("run");

    assert_eq!(report.attempts, 2);
    assert_eq!(report.retry_state, RetryState::Satisfied);
    assert!(report.recovery.is_empty());

    let analyses = harness.analyses().await;
    assert_eq!(analyses.len(), 1);
    assert!(!analyses[0].is_fallback);
    assert_eq!(analyses[0].recommended_action, RecommendedAction::ScheduleSurvey);
    assert!(harness.events_of(TimelineEventKind::AnalysisFallback).await.is_empty());
    assert!(harness.events_of(TimelineEventKind::StageUpdateFallback).await.is_empty());
    assert_eq!(harness.service().await.stage, PipelineStage::Nurturing);
}

#[tokio::test]
async fn dutch_labels_are_normalized_on_save() {
    let harness = Harness::new(None, PipelineStage::Triage).await;
    let model = ScriptedModel::silent().with_turn(vec![
        ScriptedCall::new(
            "save_analysis",
            json!({
                "urgency": "spoed",
                "leadQuality": "hoog",
                "action": "bellen",
                "summary": "Acute lekkage"
            }),
        ),
        update_stage("Triage"),
    ]);
    let orchestrator = Orchestrator::gatekeeper(harness.services.clone(), Arc::new(model));

    let report = orchestrator.run(harness.request()).await.expect("run");

    assert_eq!(report.attempts, 1);
    let analyses = harness.analyses().await;
    assert_eq!(analyses.len(), 1);
    assert_eq!(analyses[0].lead_quality, LeadQuality::High);
    assert_eq!(analyses[0].recommended_action, RecommendedAction::CallImmediately);
    assert_eq!(analyses[0].preferred_channel, ContactChannel::Email);
}

#[tokio::test]
async fn junk_analysis_disqualifies_once() {
    let harness = Harness::new(Some("+31612345678"), PipelineStage::Triage).await;
    let model = ScriptedModel::silent().with_turn(vec![save_analysis("Junk", "Reject")]);
    let orchestrator = Orchestrator::gatekeeper(harness.services.clone(), Arc::new(model));

    let report = orchestrator.run(harness.request()).await.expect("run");

    assert_eq!(
        report.disqualification,
        Some(DisqualifyDecision::Disqualify {
            from_stage: PipelineStage::Triage,
            from_status: LeadServiceStatus::New,
        })
    );
    let service = harness.service().await;
    assert_eq!(service.stage, PipelineStage::Lost);
    assert_eq!(service.status, LeadServiceStatus::Disqualified);

    let machine = StageMachine::new(harness.services.clone());
    let again = machine
        .auto_disqualify_if_junk(&harness.context(AgentKind::Gatekeeper.actor()))
        .await
        .expect("second check");
    assert_eq!(again, DisqualifyDecision::AlreadyTerminal { status: LeadServiceStatus::Disqualified });

    assert_eq!(harness.events_of(TimelineEventKind::AutoDisqualified).await.len(), 1);
    let published: Vec<_> = harness
        .events
        .events()
        .into_iter()
        .filter(|event| matches!(event, PipelineEvent::AutoDisqualified { .. }))
        .collect();
    assert_eq!(published.len(), 1);
}

#[tokio::test]
async fn incomplete_context_is_rejected_before_the_model_runs() {
    let harness = Harness::new(None, PipelineStage::Triage).await;
    let model = Arc::new(ScriptedModel::silent());
    let orchestrator = Orchestrator::gatekeeper(harness.services.clone(), model.clone());

    let mut request = harness.request();
    request.lead_service_id = leadflow_core::domain::lead::LeadServiceId(uuid::Uuid::nil());
    let error = orchestrator.run(request).await.expect_err("missing context");

    assert!(matches!(error, AgentError::MissingContext { agent: AgentKind::Gatekeeper }));
    assert!(model.requests().is_empty());
    assert!(harness.analyses().await.is_empty());
}

#[tokio::test]
async fn model_failure_still_leaves_a_fallback_analysis() {
    let harness = Harness::new(None, PipelineStage::Triage).await;
    let model =
        ScriptedModel::silent().with_failure(ModelError::Provider("rate limited".to_string()));
    let orchestrator = Orchestrator::gatekeeper(harness.services.clone(), Arc::new(model));

    let error = orchestrator.run(harness.request()).await.expect_err("model failure");

    assert!(matches!(error, AgentError::Model(_)));
    let analyses = harness.analyses().await;
    assert_eq!(analyses.len(), 1);
    assert!(analyses[0].is_fallback);
}
