use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::error::{FieldError, ValidationErrors};

/// Raw questionnaire body as submitted by the form.
///
/// Every field is optional on the wire so that missing answers can be
/// reported field by field instead of failing deserialization as a whole.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireInput {
    pub name: Option<String>,
    pub age: Option<u32>,
    pub gender: Option<String>,
    /// Height in centimetres
    pub height: Option<f64>,
    /// Weight in kilograms
    pub weight: Option<f64>,
    pub main_symptoms: Option<String>,
    pub symptom_duration: Option<String>,

    pub additional_symptoms: Option<String>,
    pub medical_history: Option<String>,
    pub current_medications: Option<String>,
    pub allergies: Option<String>,
    pub family_history: Option<String>,
    pub smoking: Option<String>,
    pub drinking: Option<String>,
    pub exercise: Option<String>,
    pub sleep: Option<String>,
    pub stress: Option<String>,
    pub diet: Option<String>,
}

impl QuestionnaireInput {
    /// Read a raw JSON body field by field.
    ///
    /// A wrongly typed answer (`"age": "34"`, a negative age) is reported
    /// against its own field; `null` counts as unanswered and unknown keys
    /// are ignored.
    pub fn from_json(body: Value) -> Result<Self, ValidationErrors> {
        let Value::Object(map) = body else {
            return Err(ValidationErrors(vec![FieldError::new(
                "body",
                "must be a JSON object",
            )]));
        };
        let mut fields = FieldReader {
            map,
            errors: Vec::new(),
        };

        let input = QuestionnaireInput {
            name: fields.read("name"),
            age: fields.read("age"),
            gender: fields.read("gender"),
            height: fields.read("height"),
            weight: fields.read("weight"),
            main_symptoms: fields.read("mainSymptoms"),
            symptom_duration: fields.read("symptomDuration"),
            additional_symptoms: fields.read("additionalSymptoms"),
            medical_history: fields.read("medicalHistory"),
            current_medications: fields.read("currentMedications"),
            allergies: fields.read("allergies"),
            family_history: fields.read("familyHistory"),
            smoking: fields.read("smoking"),
            drinking: fields.read("drinking"),
            exercise: fields.read("exercise"),
            sleep: fields.read("sleep"),
            stress: fields.read("stress"),
            diet: fields.read("diet"),
        };

        if fields.errors.is_empty() {
            Ok(input)
        } else {
            Err(ValidationErrors(fields.errors))
        }
    }
}

struct FieldReader {
    map: Map<String, Value>,
    errors: Vec<FieldError>,
}

impl FieldReader {
    fn read<T: DeserializeOwned>(&mut self, field: &'static str) -> Option<T> {
        match self.map.remove(field) {
            None | Some(Value::Null) => None,
            Some(value) => match serde_json::from_value(value) {
                Ok(v) => Some(v),
                Err(e) => {
                    self.errors.push(FieldError::new(field, format!("has an invalid value: {e}")));
                    None
                }
            },
        }
    }
}

/// Lifestyle and history answers. All optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Background {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_symptoms: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medical_history: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_medications: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_history: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub smoking: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drinking: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exercise: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sleep: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stress: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diet: Option<String>,
}

impl Background {
    /// Labelled answers that were actually given, in form order.
    pub fn answered(&self) -> Vec<(&'static str, &str)> {
        [
            ("Additional symptoms", &self.additional_symptoms),
            ("Medical history", &self.medical_history),
            ("Current medications", &self.current_medications),
            ("Allergies", &self.allergies),
            ("Family history", &self.family_history),
            ("Smoking", &self.smoking),
            ("Drinking", &self.drinking),
            ("Exercise", &self.exercise),
            ("Sleep", &self.sleep),
            ("Stress", &self.stress),
            ("Diet", &self.diet),
        ]
        .into_iter()
        .filter_map(|(label, value)| value.as_deref().map(|v| (label, v)))
        .collect()
    }
}

/// A questionnaire that passed validation, with BMI derived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Questionnaire {
    pub name: String,
    pub age: u32,
    pub gender: String,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub bmi: f64,
    pub main_symptoms: String,
    pub symptom_duration: String,
    #[serde(flatten)]
    pub background: Background,
}

/// Upper bounds used for plausibility checks on numeric answers.
const MAX_AGE: u32 = 150;
const MAX_HEIGHT_CM: f64 = 300.0;
const MAX_WEIGHT_KG: f64 = 500.0;

/// Body mass index from centimetres and kilograms, rounded to one decimal.
pub fn bmi(height_cm: f64, weight_kg: f64) -> f64 {
    let metres = height_cm / 100.0;
    let raw = weight_kg / (metres * metres);
    (raw * 10.0).round() / 10.0
}

/// Trimmed text, with blank answers treated as missing.
fn text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn required_text(
    value: Option<String>,
    field: &'static str,
    errors: &mut Vec<FieldError>,
) -> Option<String> {
    let value = text(value);
    if value.is_none() {
        errors.push(FieldError::required(field));
    }
    value
}

fn required_measure(
    value: Option<f64>,
    field: &'static str,
    max: f64,
    errors: &mut Vec<FieldError>,
) -> Option<f64> {
    match value {
        None => {
            errors.push(FieldError::required(field));
            None
        }
        Some(v) if !v.is_finite() || v <= 0.0 || v > max => {
            errors.push(FieldError::new(
                field,
                format!("must be greater than 0 and at most {max}"),
            ));
            None
        }
        Some(v) => Some(v),
    }
}

impl TryFrom<QuestionnaireInput> for Questionnaire {
    type Error = ValidationErrors;

    /// Checks every required field and reports all problems at once.
    fn try_from(input: QuestionnaireInput) -> Result<Self, Self::Error> {
        let mut errors = Vec::new();

        let name = required_text(input.name, "name", &mut errors);
        let age = match input.age {
            None => {
                errors.push(FieldError::required("age"));
                None
            }
            Some(0) => {
                errors.push(FieldError::new("age", "must be greater than 0"));
                None
            }
            Some(a) if a > MAX_AGE => {
                errors.push(FieldError::new("age", format!("must be at most {MAX_AGE}")));
                None
            }
            Some(a) => Some(a),
        };
        let gender = required_text(input.gender, "gender", &mut errors);
        let height = required_measure(input.height, "height", MAX_HEIGHT_CM, &mut errors);
        let weight = required_measure(input.weight, "weight", MAX_WEIGHT_KG, &mut errors);
        let main_symptoms = required_text(input.main_symptoms, "mainSymptoms", &mut errors);
        let symptom_duration =
            required_text(input.symptom_duration, "symptomDuration", &mut errors);

        match (
            name,
            age,
            gender,
            height,
            weight,
            main_symptoms,
            symptom_duration,
        ) {
            (
                Some(name),
                Some(age),
                Some(gender),
                Some(height_cm),
                Some(weight_kg),
                Some(main_symptoms),
                Some(symptom_duration),
            ) if errors.is_empty() => Ok(Questionnaire {
                name,
                age,
                gender,
                height_cm,
                weight_kg,
                bmi: bmi(height_cm, weight_kg),
                main_symptoms,
                symptom_duration,
                background: Background {
                    additional_symptoms: text(input.additional_symptoms),
                    medical_history: text(input.medical_history),
                    current_medications: text(input.current_medications),
                    allergies: text(input.allergies),
                    family_history: text(input.family_history),
                    smoking: text(input.smoking),
                    drinking: text(input.drinking),
                    exercise: text(input.exercise),
                    sleep: text(input.sleep),
                    stress: text(input.stress),
                    diet: text(input.diet),
                },
            }),
            _ => Err(ValidationErrors(errors)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_a() -> QuestionnaireInput {
        QuestionnaireInput {
            name: Some("김철수".into()),
            age: Some(34),
            gender: Some("남성".into()),
            height: Some(175.0),
            weight: Some(70.0),
            main_symptoms: Some("기침, 가래".into()),
            symptom_duration: Some("3일 전부터".into()),
            ..Default::default()
        }
    }

    #[test]
    fn valid_input_derives_bmi() {
        let q = Questionnaire::try_from(scenario_a()).unwrap();
        assert_eq!(q.name, "김철수");
        assert_eq!(q.bmi, 22.9);
        assert_eq!(q.background, Background::default());
    }

    #[test]
    fn bmi_rounds_to_one_decimal() {
        assert_eq!(bmi(180.0, 81.0), 25.0);
        assert_eq!(bmi(160.0, 50.0), 19.5);
    }

    #[test]
    fn missing_fields_are_all_reported() {
        let input = QuestionnaireInput {
            main_symptoms: Some("   ".into()),
            ..scenario_a()
        };
        let input = QuestionnaireInput {
            age: None,
            ..input
        };

        let err = Questionnaire::try_from(input).unwrap_err();
        let fields: Vec<_> = err.0.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["age", "mainSymptoms"]);
    }

    #[test]
    fn implausible_measures_are_rejected() {
        let input = QuestionnaireInput {
            height: Some(0.0),
            weight: Some(f64::NAN),
            ..scenario_a()
        };
        let err = Questionnaire::try_from(input).unwrap_err();
        assert_eq!(err.0.len(), 2);
        assert_eq!(err.0[0].field, "height");
        assert_eq!(err.0[1].field, "weight");
    }

    #[test]
    fn json_body_reads_camel_case_fields() {
        let body = serde_json::json!({
            "name": "김철수",
            "age": 34,
            "gender": "남성",
            "height": 175,
            "weight": 70.0,
            "mainSymptoms": "기침, 가래",
            "symptomDuration": "3일 전부터",
            "familyHistory": null,
            "unknownKey": true
        });
        let input = QuestionnaireInput::from_json(body).unwrap();
        assert_eq!(input.age, Some(34));
        assert_eq!(input.height, Some(175.0));
        assert_eq!(input.family_history, None);

        let q = Questionnaire::try_from(input).unwrap();
        assert_eq!(q.bmi, 22.9);
    }

    #[test]
    fn wrongly_typed_answers_are_reported_per_field() {
        let body = serde_json::json!({
            "name": "김철수",
            "age": "34",
            "height": -3,
            "weight": "70kg",
            "smoking": 1
        });
        let err = QuestionnaireInput::from_json(body).unwrap_err();
        let fields: Vec<_> = err.0.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["age", "weight", "smoking"]);
    }

    #[test]
    fn negative_age_is_a_field_error() {
        let err = QuestionnaireInput::from_json(serde_json::json!({ "age": -1 })).unwrap_err();
        assert_eq!(err.0[0].field, "age");
    }

    #[test]
    fn non_object_body_is_rejected() {
        let err = QuestionnaireInput::from_json(serde_json::json!([1, 2])).unwrap_err();
        assert_eq!(err.0[0].field, "body");
    }

    #[test]
    fn optional_answers_are_trimmed_and_flattened() {
        let input = QuestionnaireInput {
            smoking: Some(" 비흡연 ".into()),
            allergies: Some("".into()),
            ..scenario_a()
        };
        let q = Questionnaire::try_from(input).unwrap();
        assert_eq!(q.background.smoking.as_deref(), Some("비흡연"));
        assert_eq!(q.background.allergies, None);
        assert_eq!(q.background.answered(), vec![("Smoking", "비흡연")]);

        let json = serde_json::to_value(&q).unwrap();
        assert_eq!(json["smoking"], "비흡연");
        assert_eq!(json["mainSymptoms"], "기침, 가래");
        assert!(json.get("allergies").is_none());
    }
}
