mod common;

use std::sync::Arc;

use serde_json::json;

use leadflow_agent::context::RunScope;
use leadflow_agent::stage_machine::StageMachine;
use leadflow_agent::tools::{
    ToolName, ToolRegistry, UpdateLeadServiceStatusTool, UpdateLeadServiceTypeTool,
    UpdatePipelineStageTool,
};
use leadflow_core::domain::lead::Actor;
use leadflow_core::domain::stage::{LeadServiceStatus, PipelineStage};
use leadflow_core::domain::timeline::TimelineEventKind;
use leadflow_core::events::PipelineEvent;

use common::Harness;

fn registry(harness: &Harness) -> ToolRegistry {
    let machine = StageMachine::new(harness.services.clone());
    let mut registry = ToolRegistry::default();
    registry.register(Arc::new(UpdatePipelineStageTool::new(machine.clone())));
    registry.register(Arc::new(UpdateLeadServiceStatusTool::new(machine.clone())));
    registry.register(Arc::new(UpdateLeadServiceTypeTool::new(machine)));
    registry
}

fn scope(harness: &Harness) -> RunScope {
    RunScope::new(harness.context(Actor::agent("gatekeeper")))
}

#[tokio::test]
async fn unknown_stage_is_rejected_without_side_effects() {
    let harness = Harness::new(None, PipelineStage::Triage).await;
    let registry = registry(&harness);
    let scope = scope(&harness);

    let output = registry
        .session(&scope)
        .call("UpdatePipelineStage", json!({ "stage": "Archived", "reason": "ready" }))
        .await;

    assert_eq!(output["success"], false);
    assert_eq!(output["error"], "invalid_enum");
    assert_eq!(harness.service().await.stage, PipelineStage::Triage);
    assert!(harness.timeline.all().await.is_empty());
    assert!(harness.events.events().is_empty());
    assert!(!scope.tracker().was_called(ToolName::UpdatePipelineStage));
}

#[tokio::test]
async fn stage_change_is_recorded_and_published() {
    let harness = Harness::new(None, PipelineStage::Triage).await;
    let registry = registry(&harness);
    let scope = scope(&harness);

    let output = registry
        .session(&scope)
        .call("UpdatePipelineStage", json!({ "stage": "estimation", "reason": "complete intake" }))
        .await;

    assert_eq!(output["success"], true);
    assert_eq!(output["changed"], true);
    assert_eq!(harness.service().await.stage, PipelineStage::Estimation);

    let changes = harness.events_of(TimelineEventKind::StageChange).await;
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].metadata.get("old_stage").map(String::as_str), Some("Triage"));
    assert_eq!(changes[0].metadata.get("new_stage").map(String::as_str), Some("Estimation"));
    assert_eq!(changes[0].metadata.get("reason").map(String::as_str), Some("complete intake"));

    assert!(matches!(
        harness.events.events().as_slice(),
        [PipelineEvent::StageChanged { old_stage: PipelineStage::Triage, new_stage: PipelineStage::Estimation, .. }]
    ));
}

#[tokio::test]
async fn requesting_the_current_stage_changes_nothing() {
    let harness = Harness::new(None, PipelineStage::Nurturing).await;
    let registry = registry(&harness);
    let scope = scope(&harness);

    let output = registry
        .session(&scope)
        .call("UpdatePipelineStage", json!({ "stage": "Nurturing", "reason": "still waiting" }))
        .await;

    assert_eq!(output["success"], true);
    assert_eq!(output["changed"], false);
    assert!(harness.timeline.all().await.is_empty());
    assert!(harness.events.events().is_empty());
}

#[tokio::test]
async fn service_type_can_change_during_triage() {
    let harness = Harness::new(None, PipelineStage::Triage).await;
    let registry = registry(&harness);
    let scope = scope(&harness);

    let output = registry
        .session(&scope)
        .call(
            "UpdateLeadServiceType",
            json!({ "service_type": "schilderwerk", "reason": "consumer asked for painting", "confidence": 0.9 }),
        )
        .await;

    assert_eq!(output["success"], true);
    assert_eq!(harness.service().await.service_type, "schilderwerk");
    assert_eq!(harness.events_of(TimelineEventKind::ServiceTypeChange).await.len(), 1);
}

#[tokio::test]
async fn service_type_is_locked_after_triage() {
    let harness = Harness::new(None, PipelineStage::Estimation).await;
    let registry = registry(&harness);
    let scope = scope(&harness);

    let output = registry
        .session(&scope)
        .call(
            "UpdateLeadServiceType",
            json!({ "service_type": "schilderwerk", "reason": "wrong service", "confidence": 1.0 }),
        )
        .await;

    assert_eq!(output["success"], false);
    assert_eq!(output["error"], "validation_failed");
    assert_eq!(harness.service().await.service_type, "dakgoot");
    assert!(harness.events_of(TimelineEventKind::ServiceTypeChange).await.is_empty());
}

#[tokio::test]
async fn low_confidence_service_type_change_is_refused() {
    let harness = Harness::new(None, PipelineStage::Triage).await;
    let registry = registry(&harness);
    let scope = scope(&harness);

    let output = registry
        .session(&scope)
        .call(
            "UpdateLeadServiceType",
            json!({ "service_type": "schilderwerk", "reason": "maybe", "confidence": 0.4 }),
        )
        .await;

    assert_eq!(output["success"], false);
    assert_eq!(harness.service().await.service_type, "dakgoot");
}

#[tokio::test]
async fn status_updates_are_normalized_and_recorded() {
    let harness = Harness::new(None, PipelineStage::Fulfillment).await;
    let registry = registry(&harness);
    let scope = scope(&harness);

    let output = registry
        .session(&scope)
        .call("UpdateLeadServiceStatus", json!({ "status": "ingepland", "reason": "call" }))
        .await;

    assert_eq!(output["success"], true);
    assert_eq!(harness.service().await.status, LeadServiceStatus::Scheduled);
    assert_eq!(harness.events_of(TimelineEventKind::StatusChange).await.len(), 1);
}
