mod common;

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;

use leadflow_agent::fallback::RecoveryAction;
use leadflow_agent::llm::{ScriptedCall, ScriptedModel};
use leadflow_agent::retry::RetryState;
use leadflow_agent::Orchestrator;
use leadflow_core::domain::analysis::{
    AiAnalysis, AnalysisId, ContactChannel, LeadQuality, RecommendedAction, Urgency,
};
use leadflow_core::domain::product::{CatalogProduct, ProductId};
use leadflow_core::domain::stage::PipelineStage;
use leadflow_core::domain::timeline::TimelineEventKind;
use leadflow_core::pipeline::IntakeGateDecision;
use leadflow_db::repositories::{AnalysisRepository, QuoteRepository};

use common::Harness;

async fn seed_analysis(harness: &Harness, action: RecommendedAction, missing: &[&str]) {
    harness
        .analyses
        .save(AiAnalysis {
            id: AnalysisId::new(),
            tenant_id: harness.tenant_id,
            lead_id: harness.lead_id,
            lead_service_id: harness.lead_service_id,
            urgency: Urgency::Medium,
            urgency_reason: None,
            lead_quality: LeadQuality::Potential,
            recommended_action: action,
            missing_information: missing.iter().map(|item| item.to_string()).collect(),
            preferred_channel: ContactChannel::Email,
            suggested_message: String::new(),
            summary: "Dakgoot vervangen".to_string(),
            is_fallback: false,
            created_at: Utc::now(),
        })
        .await
        .expect("seed analysis");
}

fn draft_quote() -> ScriptedCall {
    ScriptedCall::new(
        "DraftQuote",
        json!({
            "items": [{
                "description": "Zinken dakgoot per meter",
                "quantity": "2",
                "unit_price_cents": 3000,
                "tax_rate_bps": 900,
                "catalog_product_id": "zink-goot"
            }],
            "pricing_mode": "exclusive"
        }),
    )
}

fn save_estimation() -> ScriptedCall {
    ScriptedCall::new(
        "SaveEstimation",
        json!({ "summary": "Twee meter dakgoot vervangen", "scope": "small", "price_range": "€100-€150" }),
    )
}

fn update_stage(stage: &str) -> ScriptedCall {
    ScriptedCall::new("UpdatePipelineStage", json!({ "stage": stage, "reason": "estimate ready" }))
}

#[tokio::test]
async fn catalog_price_overrides_the_model_estimate() {
    let harness = Harness::new(None, PipelineStage::Estimation).await;
    harness
        .catalog
        .insert(
            harness.tenant_id,
            CatalogProduct {
                id: ProductId("zink-goot".to_string()),
                title: "Zinken dakgoot".to_string(),
                unit: Some("m".to_string()),
                price_cents: 4500,
                vat_rate_bps: 2100,
                score: 0.0,
                from_catalog: true,
            },
        )
        .await;
    let model = ScriptedModel::silent().with_turn(vec![
        draft_quote(),
        save_estimation(),
        update_stage("Fulfillment"),
    ]);
    let orchestrator = Orchestrator::estimator(harness.services.clone(), Arc::new(model));

    let report = orchestrator.run(harness.request()).await.expect("run");

    assert_eq!(report.attempts, 1);
    assert_eq!(report.retry_state, RetryState::Satisfied);
    assert!(report.recovery.is_empty());
    assert_eq!(report.intake_gate, Some(IntakeGateDecision::Proceed));
    assert_eq!(harness.service().await.stage, PipelineStage::Fulfillment);

    let quotes = harness
        .quotes
        .list_for_service(&harness.tenant_id, &harness.lead_service_id)
        .await
        .expect("list quotes");
    assert_eq!(quotes.len(), 1);
    let quote = &quotes[0];
    assert!(quote.number.starts_with("Q-"));
    assert!(quote.number.ends_with("-0001"));
    assert_eq!(quote.items[0].unit_price_cents, 4500);
    assert_eq!(quote.items[0].tax_rate_bps, 2100);
    assert_eq!(quote.totals.subtotal_cents, 9000);
    assert_eq!(quote.totals.vat_total_cents, 1890);
    assert_eq!(quote.totals.total_cents, 10_890);

    let drafted = harness.events_of(TimelineEventKind::QuoteDrafted).await;
    assert_eq!(drafted.len(), 1);
    assert_eq!(drafted[0].metadata.get("price_overrides").map(String::as_str), Some("1"));

    let saved = harness.events_of(TimelineEventKind::EstimationSaved).await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].metadata.get("quote_id"), Some(&quote.id.to_string()));
}

#[tokio::test]
async fn skipped_quote_with_incomplete_intake_moves_to_nurturing() {
    let harness = Harness::new(None, PipelineStage::Estimation).await;
    seed_analysis(&harness, RecommendedAction::RequestInfo, &["foto's van de dakgoot"]).await;
    let model = ScriptedModel::silent().with_turn(vec![save_estimation()]);
    let orchestrator = Orchestrator::estimator(harness.services.clone(), Arc::new(model));

    let report = orchestrator.run(harness.request()).await.expect("run");

    assert_eq!(
        report.intake_gate,
        Some(IntakeGateDecision::ForceNurturing { from: PipelineStage::Estimation })
    );
    assert_eq!(harness.service().await.stage, PipelineStage::Nurturing);

    let escalations = harness.events_of(TimelineEventKind::IntakeEscalation).await;
    assert_eq!(escalations.len(), 1);
    assert_eq!(
        escalations[0].metadata.get("reason").map(String::as_str),
        Some("insufficient_intake")
    );
}

#[tokio::test]
async fn intake_gate_leaves_nurturing_services_alone() {
    let harness = Harness::new(None, PipelineStage::Nurturing).await;
    seed_analysis(&harness, RecommendedAction::RequestInfo, &[]).await;
    let model = ScriptedModel::silent().with_turn(vec![save_estimation()]);
    let orchestrator = Orchestrator::estimator(harness.services.clone(), Arc::new(model));

    let report = orchestrator.run(harness.request()).await.expect("run");

    assert_eq!(report.intake_gate, Some(IntakeGateDecision::AlreadyNurturing));
    assert!(harness.events_of(TimelineEventKind::IntakeEscalation).await.is_empty());
    assert!(harness.events_of(TimelineEventKind::StageChange).await.is_empty());
}

#[tokio::test]
async fn a_quote_drafted_before_the_retry_still_counts_for_the_gate() {
    let harness = Harness::new(None, PipelineStage::Estimation).await;
    seed_analysis(&harness, RecommendedAction::RequestInfo, &[]).await;
    let model = ScriptedModel::silent()
        .with_turn(vec![draft_quote()])
        .with_turn(vec![save_estimation(), update_stage("Estimation")]);
    let orchestrator = Orchestrator::estimator(harness.services.clone(), Arc::new(model));

    let report = orchestrator.run(harness.request()).await.expect("run");

    assert_eq!(report.attempts, 2);
    assert_eq!(report.retry_state, RetryState::Satisfied);
    assert_eq!(report.intake_gate, Some(IntakeGateDecision::Proceed));
    assert_eq!(harness.service().await.stage, PipelineStage::Estimation);
}

#[tokio::test]
async fn silent_estimator_records_an_estimation_fallback() {
    let harness = Harness::new(None, PipelineStage::Estimation).await;
    let orchestrator =
        Orchestrator::estimator(harness.services.clone(), Arc::new(ScriptedModel::silent()));

    let report = orchestrator.run(harness.request()).await.expect("run");

    assert_eq!(report.retry_state, RetryState::Escalated);
    let actions: Vec<_> = report.recovery.iter().map(|outcome| outcome.action).collect();
    assert_eq!(actions, vec![RecoveryAction::EstimationFallback, RecoveryAction::StageUpdateFallback]);
    assert_eq!(harness.events_of(TimelineEventKind::EstimationFallback).await.len(), 1);
    assert_eq!(harness.events_of(TimelineEventKind::StageUpdateFallback).await.len(), 1);
    assert_eq!(harness.service().await.stage, PipelineStage::Estimation);
    assert_eq!(report.intake_gate, Some(IntakeGateDecision::Proceed));
}

#[tokio::test]
async fn calculator_failures_are_returned_to_the_model() {
    let harness = Harness::new(None, PipelineStage::Estimation).await;
    let model = ScriptedModel::silent().with_turn(vec![
        ScriptedCall::new("Calculator", json!({ "operation": "divide", "a": 10, "b": 0 })),
        save_estimation(),
        update_stage("Estimation"),
    ]);
    let model = Arc::new(model);
    let orchestrator = Orchestrator::estimator(harness.services.clone(), model.clone());

    let report = orchestrator.run(harness.request()).await.expect("run");

    assert_eq!(report.retry_state, RetryState::Satisfied);
    assert!(!report.called.contains(&leadflow_agent::tools::ToolName::Calculator));
    assert!(report.called.contains(&leadflow_agent::tools::ToolName::SaveEstimation));
}
