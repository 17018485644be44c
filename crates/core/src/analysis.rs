//! Analysis result types and the bounded-shape validation applied to model output

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Maximum entries for every bounded list in a result
pub const MAX_ITEMS: usize = 3;

/// Shown when the model omits its own disclaimer
pub const DEFAULT_DISCLAIMER: &str = "이 결과는 AI가 생성한 참고용 정보이며 의학적 진단이 아닙니다. \
정확한 진단과 치료를 위해 반드시 의료 전문가와 상담하세요.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    #[serde(alias = "낮음")]
    Low,
    #[serde(alias = "중간", alias = "보통")]
    Medium,
    #[serde(alias = "높음")]
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    pub name: String,
    pub description: String,
    pub risk_level: RiskLevel,
    pub symptoms: Vec<String>,
    pub management_tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplement {
    pub name: String,
    pub description: String,
    pub benefits: Vec<String>,
    pub matching_symptoms: Vec<String>,
}

/// Validated analysis outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    pub conditions: Vec<Condition>,
    pub recommended_department: String,
    pub supplements: Vec<Supplement>,
    pub disclaimer: String,
}

/// Shape the model is asked to return
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisPayload {
    pub results: Vec<Condition>,
    pub recommended_departments: Vec<String>,
    pub supplements: Vec<Supplement>,
    #[serde(default)]
    pub disclaimer: Option<String>,
}

fn check_bounds(field: &str, len: usize, min: usize, max: usize) -> Result<(), AnalysisError> {
    if len < min || len > max {
        let expected = if min == max {
            format!("exactly {min}")
        } else {
            format!("{min} to {max}")
        };
        return Err(AnalysisError::MalformedResponse(format!(
            "{field} must contain {expected} entries, got {len}"
        )));
    }
    Ok(())
}

/// Nested lists must be non-empty; anything past the limit is dropped.
fn tidy_list(field: &str, mut items: Vec<String>) -> Result<Vec<String>, AnalysisError> {
    items.retain(|s| !s.trim().is_empty());
    if items.is_empty() {
        return Err(AnalysisError::MalformedResponse(format!(
            "{field} must not be empty"
        )));
    }
    items.truncate(MAX_ITEMS);
    Ok(items)
}

impl TryFrom<AnalysisPayload> for AnalysisResult {
    type Error = AnalysisError;

    fn try_from(payload: AnalysisPayload) -> Result<Self, Self::Error> {
        check_bounds("results", payload.results.len(), 1, MAX_ITEMS)?;
        check_bounds(
            "recommendedDepartments",
            payload.recommended_departments.len(),
            1,
            1,
        )?;
        check_bounds("supplements", payload.supplements.len(), 1, MAX_ITEMS)?;

        let conditions = payload
            .results
            .into_iter()
            .map(|c| {
                Ok(Condition {
                    symptoms: tidy_list("symptoms", c.symptoms)?,
                    management_tips: tidy_list("managementTips", c.management_tips)?,
                    ..c
                })
            })
            .collect::<Result<Vec<_>, AnalysisError>>()?;

        let supplements = payload
            .supplements
            .into_iter()
            .map(|s| {
                Ok(Supplement {
                    benefits: tidy_list("benefits", s.benefits)?,
                    matching_symptoms: tidy_list("matchingSymptoms", s.matching_symptoms)?,
                    ..s
                })
            })
            .collect::<Result<Vec<_>, AnalysisError>>()?;

        let recommended_department = payload
            .recommended_departments
            .into_iter()
            .next()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| {
                AnalysisError::MalformedResponse("recommended department is blank".into())
            })?;

        let disclaimer = payload
            .disclaimer
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| DEFAULT_DISCLAIMER.to_string());

        Ok(AnalysisResult {
            conditions,
            recommended_department,
            supplements,
            disclaimer,
        })
    }
}

impl AnalysisResult {
    /// Parse model text into a validated result.
    ///
    /// Accepts bare JSON or JSON wrapped in a markdown code fence.
    pub fn from_model_text(text: &str) -> Result<Self, AnalysisError> {
        let json = extract_json(text)?;
        let payload: AnalysisPayload = serde_json::from_str(json)
            .map_err(|e| AnalysisError::MalformedResponse(format!("invalid JSON: {e}")))?;
        payload.try_into()
    }
}

/// Extract a JSON object from text that might contain markdown code blocks
fn extract_json(text: &str) -> Result<&str, AnalysisError> {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return Ok(trimmed);
    }

    for fence in ["```json", "```"] {
        if let Some(start) = trimmed.find(fence) {
            let after = &trimmed[start + fence.len()..];
            if let Some(end) = after.find("```") {
                return Ok(after[..end].trim());
            }
        }
    }

    // Prose around a bare object
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&trimmed[start..=end]),
        _ => Err(AnalysisError::MalformedResponse(
            "no JSON object in response".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn condition(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "description": "상기도 감염",
            "riskLevel": "low",
            "symptoms": ["기침", "가래"],
            "managementTips": ["수분 섭취", "휴식"]
        })
    }

    fn supplement(name: &str) -> serde_json::Value {
        json!({
            "name": name,
            "description": "면역 기능 지원",
            "benefits": ["면역력 강화"],
            "matchingSymptoms": ["기침"]
        })
    }

    fn payload(conditions: usize, departments: usize, supplements: usize) -> String {
        json!({
            "results": (0..conditions).map(|i| condition(&format!("c{i}"))).collect::<Vec<_>>(),
            "recommendedDepartments": (0..departments).map(|i| format!("d{i}")).collect::<Vec<_>>(),
            "supplements": (0..supplements).map(|i| supplement(&format!("s{i}"))).collect::<Vec<_>>(),
            "disclaimer": "참고용"
        })
        .to_string()
    }

    #[test]
    fn parses_valid_payload() {
        let result = AnalysisResult::from_model_text(&payload(2, 1, 3)).unwrap();
        assert_eq!(result.conditions.len(), 2);
        assert_eq!(result.recommended_department, "d0");
        assert_eq!(result.supplements.len(), 3);
        assert_eq!(result.conditions[0].risk_level, RiskLevel::Low);
        assert_eq!(result.disclaimer, "참고용");
    }

    #[test]
    fn rejects_out_of_bounds_conditions() {
        for count in [0, 4] {
            let err = AnalysisResult::from_model_text(&payload(count, 1, 1)).unwrap_err();
            assert!(matches!(err, AnalysisError::MalformedResponse(ref m) if m.starts_with("results")));
        }
    }

    #[test]
    fn rejects_two_departments() {
        let err = AnalysisResult::from_model_text(&payload(1, 2, 1)).unwrap_err();
        assert_eq!(
            err,
            AnalysisError::MalformedResponse(
                "recommendedDepartments must contain exactly 1 entries, got 2".into()
            )
        );
        assert!(!err.is_retryable());
    }

    #[test]
    fn rejects_missing_supplements() {
        let err = AnalysisResult::from_model_text(&payload(1, 1, 0)).unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }

    #[test]
    fn accepts_fenced_json_and_korean_risk_levels() {
        let mut body: serde_json::Value = serde_json::from_str(&payload(1, 1, 1)).unwrap();
        body["results"][0]["riskLevel"] = json!("높음");
        body.as_object_mut().unwrap().remove("disclaimer");
        let text = format!("분석 결과입니다.\n```json\n{body}\n```");

        let result = AnalysisResult::from_model_text(&text).unwrap();
        assert_eq!(result.conditions[0].risk_level, RiskLevel::High);
        assert_eq!(result.disclaimer, DEFAULT_DISCLAIMER);
    }

    #[test]
    fn nested_lists_are_truncated_not_rejected() {
        let mut body: serde_json::Value = serde_json::from_str(&payload(1, 1, 1)).unwrap();
        body["results"][0]["symptoms"] = json!(["a", "b", "c", "d"]);
        let result = AnalysisResult::from_model_text(&body.to_string()).unwrap();
        assert_eq!(result.conditions[0].symptoms, vec!["a", "b", "c"]);

        body["results"][0]["managementTips"] = json!([]);
        assert!(AnalysisResult::from_model_text(&body.to_string()).is_err());
    }

    #[test]
    fn prose_without_json_is_malformed() {
        let err = AnalysisResult::from_model_text("죄송합니다, 분석할 수 없습니다.").unwrap_err();
        assert!(matches!(err, AnalysisError::MalformedResponse(_)));
    }
}
