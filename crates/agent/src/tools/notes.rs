use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

use leadflow_core::domain::note::LeadNote;
use leadflow_core::domain::timeline::{TimelineEvent, TimelineEventKind};

use super::{parse_args, success, Tool, ToolName, ToolSpec};
use crate::context::RunScope;
use crate::error::ToolError;
use crate::services::PipelineServices;

#[derive(Debug, Deserialize)]
struct SaveNoteArgs {
    #[serde(alias = "note", alias = "summary", alias = "text")]
    body: String,
}

pub struct SaveNoteTool {
    services: Arc<PipelineServices>,
}

impl SaveNoteTool {
    pub fn new(services: Arc<PipelineServices>) -> Self {
        Self { services }
    }
}

#[async_trait]
impl Tool for SaveNoteTool {
    fn name(&self) -> ToolName {
        ToolName::SaveNote
    }

    fn spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name(),
            description: "Attach a note to the lead service, e.g. a summary of a phone call.",
            input_schema: json!({
                "type": "object",
                "required": ["body"],
                "properties": { "body": { "type": "string" } }
            }),
        }
    }

    async fn execute(&self, scope: &RunScope, input: Value) -> Result<Value, ToolError> {
        let context = scope.context()?;
        let args: SaveNoteArgs = parse_args(self.name(), input)?;
        let body = args.body.trim();
        if body.is_empty() {
            return Err(ToolError::invalid_arguments(self.name().as_str(), "note body is empty"));
        }

        let note = LeadNote::new(
            context.tenant_id,
            context.lead_id,
            context.lead_service_id,
            body,
            context.actor.clone(),
        );
        let note_id = note.id;
        self.services.notes.save(note).await?;
        self.services
            .timeline
            .append(
                TimelineEvent::new(
                    context.tenant_id,
                    context.lead_id,
                    context.lead_service_id,
                    TimelineEventKind::NoteAdded,
                    context.actor.clone(),
                    "Note added",
                )
                .with_metadata("note_id", note_id.0.to_string()),
            )
            .await?;

        Ok(success(json!({ "note_id": note_id })))
    }
}
