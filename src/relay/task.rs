use serde::{Deserialize, Serialize};

pub const FOLLOW_UP_REPORT_TYPE: &str = "follow_up";

/// Task description sent to the research backend as the first socket message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRequest {
    pub task: String,
    pub report_type: String,
    pub sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edits: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cadence: Option<String>,
    #[serde(rename = "analysisId", default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<String>,
    #[serde(rename = "chatId", default, skip_serializing_if = "Option::is_none")]
    pub chat_id: Option<String>,
}

impl TaskRequest {
    pub fn new(task: impl Into<String>, report_type: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            report_type: report_type.into(),
            sources: Vec::new(),
            edits: None,
            cadence: None,
            analysis_id: None,
            chat_id: None,
        }
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    pub fn with_edits(mut self, edits: Option<String>) -> Self {
        self.edits = edits;
        self
    }

    pub fn with_cadence(mut self, cadence: Option<String>) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn with_chat_id(mut self, chat_id: impl Into<String>) -> Self {
        self.chat_id = Some(chat_id.into());
        self
    }

    /// Revision request for a selected passage of a contract under review
    pub fn contract_follow_up(
        selected_text: &str,
        prompt: &str,
        jurisdictions: &[String],
        analysis_id: Option<String>,
    ) -> Self {
        let jurisdictions = if jurisdictions.is_empty() {
            String::new()
        } else {
            format!("\n\nLegal Jurisdictions: {}", jurisdictions.join(", "))
        };

        let task = format!(
            "Please suggest improvements for the following contract text based on this request: \"{}\"\n\n\
             Text to revise: {}{}\n\n\
             Please provide the revised text only, without any explanations.",
            prompt, selected_text, jurisdictions
        );

        Self {
            analysis_id,
            ..Self::new(task, FOLLOW_UP_REPORT_TYPE).with_sources(vec![String::new()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn optional_fields_are_omitted_from_wire() {
        let task = TaskRequest::new("Quarterly outlook", "research_report").with_sources(vec!["WEB".into()]);
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(
            value,
            json!({ "task": "Quarterly outlook", "report_type": "research_report", "sources": ["WEB"] })
        );
    }

    #[test]
    fn camel_case_ids_on_wire() {
        let task = TaskRequest::new("t", "r").with_chat_id("c1");
        let value: Value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["chatId"], "c1");
        assert!(value.get("chat_id").is_none());
    }

    #[test]
    fn follow_up_prompt_with_jurisdictions() {
        let task = TaskRequest::contract_follow_up(
            "The Supplier may terminate at will.",
            "make this mutual",
            &["Delaware".to_string(), "England".to_string()],
            Some("a-42".into()),
        );

        assert_eq!(task.report_type, FOLLOW_UP_REPORT_TYPE);
        assert_eq!(task.sources, vec![String::new()]);
        assert_eq!(task.analysis_id.as_deref(), Some("a-42"));
        assert_eq!(
            task.task,
            "Please suggest improvements for the following contract text based on this request: \"make this mutual\"\n\n\
             Text to revise: The Supplier may terminate at will.\n\n\
             Legal Jurisdictions: Delaware, England\n\n\
             Please provide the revised text only, without any explanations."
        );
    }

    #[test]
    fn follow_up_prompt_without_jurisdictions() {
        let task = TaskRequest::contract_follow_up("Clause", "shorten", &[], None);
        assert!(!task.task.contains("Legal Jurisdictions"));
        assert!(task.task.contains("Text to revise: Clause\n\nPlease provide"));
    }
}
