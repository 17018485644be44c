//! Symptom analysis via Claude

use async_trait::async_trait;
use symptom_core::{AnalysisError, AnalysisResult, Questionnaire};

use super::AnalysisService;
use super::client::ClaudeClient;

const SYSTEM_PROMPT: &str = r#"You are a health information assistant for a Korean consumer app. You do NOT diagnose. Based on a user's symptom questionnaire, you describe possible conditions for general information, suggest which hospital department to visit, and suggest supplements that may help with the reported symptoms.

Write all text values in Korean.

Return ONLY a JSON object with this exact structure:
{
  "results": [
    {
      "name": "condition name",
      "description": "one or two sentences",
      "riskLevel": "low|medium|high",
      "symptoms": ["related symptom", "..."],
      "managementTips": ["self-care tip", "..."]
    }
  ],
  "recommendedDepartments": ["department name"],
  "supplements": [
    {
      "name": "supplement name",
      "description": "one or two sentences",
      "benefits": ["benefit", "..."],
      "matchingSymptoms": ["reported symptom it addresses", "..."]
    }
  ],
  "disclaimer": "statement that this is not a medical diagnosis"
}

Rules:
- "results": 1 to 3 conditions, most likely first
- "recommendedDepartments": exactly 1 department
- "supplements": 1 to 3 items
- every nested list: 1 to 3 items
- no text outside the JSON object"#;

/// `AnalysisService` backed by the Claude Messages API
pub struct ClaudeAnalyzer {
    client: ClaudeClient,
}

impl ClaudeAnalyzer {
    pub fn new(client: ClaudeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AnalysisService for ClaudeAnalyzer {
    async fn analyze(&self, questionnaire: &Questionnaire) -> Result<AnalysisResult, AnalysisError> {
        let prompt = build_prompt(questionnaire);
        tracing::debug!(model = self.client.model(), "Requesting symptom analysis");

        let text = self.client.message(Some(SYSTEM_PROMPT), &prompt).await?;
        AnalysisResult::from_model_text(&text)
    }
}

/// Render the questionnaire as the user message
fn build_prompt(q: &Questionnaire) -> String {
    let mut prompt = format!(
        "Questionnaire:\n\
         - Age: {}\n\
         - Gender: {}\n\
         - Height: {} cm\n\
         - Weight: {} kg\n\
         - BMI: {:.1}\n\
         - Main symptoms: {}\n\
         - Symptom duration: {}\n",
        q.age, q.gender, q.height_cm, q.weight_kg, q.bmi, q.main_symptoms, q.symptom_duration,
    );

    for (label, value) in q.background.answered() {
        prompt.push_str(&format!("- {label}: {value}\n"));
    }

    prompt.push_str("\nAnalyze these answers and respond with the JSON object only.");
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use symptom_core::QuestionnaireInput;

    fn questionnaire() -> Questionnaire {
        Questionnaire::try_from(QuestionnaireInput {
            name: Some("김철수".into()),
            age: Some(34),
            gender: Some("남성".into()),
            height: Some(175.0),
            weight: Some(70.0),
            main_symptoms: Some("기침, 가래".into()),
            symptom_duration: Some("3일 전부터".into()),
            medical_history: Some("천식".into()),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn prompt_contains_answers_but_not_name() {
        let prompt = build_prompt(&questionnaire());
        assert!(prompt.contains("- Main symptoms: 기침, 가래"));
        assert!(prompt.contains("- BMI: 22.9"));
        assert!(prompt.contains("- Medical history: 천식"));
        assert!(!prompt.contains("Allergies"));
        assert!(!prompt.contains("김철수"));
    }
}
