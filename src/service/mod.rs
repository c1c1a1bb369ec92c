//! The remote naming and reaction prediction collaborators.
//!
//! Both are a prompt sent through a [`Transport`] and a JSON document parsed
//! out of the reply. Nothing here retries; a failure is reported once and the
//! caller decides what to show.

use serde::de::DeserializeOwned;
use tracing::*;

use crate::{GraphSnapshot, Language};

mod error;
pub use error::*;

mod types;
pub use types::*;

mod transport;
pub use transport::*;

pub struct ChemistryService {
    transport: Box<dyn Transport>,
}

impl ChemistryService {
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Box::new(transport),
        }
    }

    /// Ask the model to name the molecule drawn in the builder.
    pub async fn name_structure(
        &self,
        snapshot: &GraphSnapshot,
        language: Language,
    ) -> Result<NamingResult, ServiceError> {
        info!(
            "Requesting a name for {} atoms and {} bonds",
            snapshot.atoms.len(),
            snapshot.bonds.len()
        );
        let reply = self.transport.complete(naming_prompt(snapshot, language)).await;
        let result = reply.and_then(|text| parse_payload::<NamingResult>(&text));
        if let Err(e) = &result {
            error!("Naming failed: {}", e);
        }
        result
    }

    /// Ask the model what `reactants` turn into under `conditions`.
    pub async fn predict_reaction(
        &self,
        reactants: &str,
        conditions: &str,
        language: Language,
    ) -> Result<ReactionResult, ServiceError> {
        info!("Predicting reaction of {:?} under {:?}", reactants, conditions);
        let reply = self
            .transport
            .complete(reaction_prompt(reactants, conditions, language))
            .await;
        let result = reply.and_then(|text| parse_payload::<ReactionResult>(&text));
        if let Err(e) = &result {
            error!("Reaction prediction failed: {}", e);
        }
        result
    }
}

fn naming_language_instruction(language: Language) -> &'static str {
    match language {
        Language::Zh => {
            "Provide the IUPAC name, common names, and explanation in Simplified Chinese (zh-CN)."
        }
        Language::En => "Provide the output in English.",
    }
}

fn reaction_language_instruction(language: Language) -> &'static str {
    match language {
        Language::Zh => {
            "Provide the explanation, mechanism steps, and products in Simplified Chinese (zh-CN)."
        }
        Language::En => "Provide the output in English.",
    }
}

pub fn naming_prompt(snapshot: &GraphSnapshot, language: Language) -> String {
    format!(
        r#"
Analyze this 2D molecular graph structure:
{graph}

1. Identify the molecule.
2. Provide its IUPAC systematic name.
3. Provide common names (if any).
4. Explain the naming rules applied (e.g. functional group priority, numbering).

{instruction}

Return the result strictly as JSON matching the following schema:
{{
  "systematicName": "string",
  "commonName": "string",
  "explanation": "string"
}}
"#,
        graph = snapshot.to_json(),
        instruction = naming_language_instruction(language),
    )
}

pub fn reaction_prompt(reactants: &str, conditions: &str, language: Language) -> String {
    format!(
        r#"
Analyze the following chemical reaction:
Reactants: {reactants}
Conditions: {conditions}

Perform the following tasks:
1. Predict the products and provide the balanced chemical equation.
2. Explain the reaction mechanism step-by-step.
3. Generate a 3D coordinate representation (approximated VSEPR model) for the MAIN product of the reaction.

{instruction}

Return the result strictly as JSON matching the following schema:
{{
  "equation": "string",
  "products": ["string"],
  "mechanismSteps": ["string"],
  "vseprInfo": "string (Description of the geometry, e.g. Tetrahedral)",
  "productStructure": {{
    "atoms": [
      {{ "id": number, "element": "string", "x": number, "y": number, "z": number, "color": "string (CPK hex code)" }}
    ],
    "bonds": [
      {{ "source": number, "target": number, "order": number }}
    ]
  }}
}}
For atoms, provide x, y, z coordinates generally within range -5 to 5.
Element colors should be standard CPK hex codes.
"#,
        instruction = reaction_language_instruction(language),
    )
}

/// Parse the JSON document in a model reply, tolerating a Markdown code fence around it.
pub fn parse_payload<T: DeserializeOwned>(text: &str) -> Result<T, ServiceError> {
    let body = strip_code_fence(text);
    if body.is_empty() {
        return Err(ServiceError::EmptyResponse);
    }
    Ok(serde_json::from_str(body)?)
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Skip the info string ("json") on the opening fence line.
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AtomId, BondOrder, Element};
    use futures::executor::block_on;
    use futures::future::LocalBoxFuture;
    use std::cell::RefCell;

    /// Replays canned replies and remembers the prompts it was sent.
    struct ScriptedTransport {
        replies: RefCell<Vec<Result<String, ServiceError>>>,
        prompts: RefCell<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(replies: Vec<Result<String, ServiceError>>) -> Self {
            Self {
                replies: RefCell::new(replies),
                prompts: RefCell::new(vec![]),
            }
        }
    }

    impl Transport for std::rc::Rc<ScriptedTransport> {
        fn complete<'a>(&'a self, prompt: String) -> LocalBoxFuture<'a, Result<String, ServiceError>> {
            self.prompts.borrow_mut().push(prompt);
            let reply = self.replies.borrow_mut().remove(0);
            Box::pin(async move { reply })
        }
    }

    fn snapshot() -> GraphSnapshot {
        GraphSnapshot {
            atoms: vec![(AtomId::new(1), Element::C), (AtomId::new(2), Element::O)],
            bonds: vec![(AtomId::new(1), AtomId::new(2), BondOrder::Double)],
        }
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("  {\"a\": 1} "), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fence("```\n{}\n```\n"), "{}");
    }

    #[test]
    fn test_parse_payload_errors() {
        assert!(matches!(
            parse_payload::<NamingResult>("   "),
            Err(ServiceError::EmptyResponse)
        ));
        assert!(matches!(
            parse_payload::<NamingResult>("the molecule is ethanol"),
            Err(ServiceError::Malformed(_))
        ));
        // Missing the required systematic name.
        assert!(matches!(
            parse_payload::<NamingResult>(r#"{"commonName": "x"}"#),
            Err(ServiceError::Malformed(_))
        ));
    }

    #[test]
    fn test_naming_prompt_embeds_snapshot() {
        let prompt = naming_prompt(&snapshot(), Language::En);
        assert!(prompt.contains(r#"{"atoms":{"a1":"C","a2":"O"},"bonds":[{"source":"a1","target":"a2","order":2}]}"#));
        assert!(prompt.contains("Provide the output in English."));
        assert!(prompt.contains("\"systematicName\": \"string\""));

        let prompt = naming_prompt(&snapshot(), Language::Zh);
        assert!(prompt.contains("Simplified Chinese"));
    }

    #[test]
    fn test_name_structure() {
        let transport = std::rc::Rc::new(ScriptedTransport::new(vec![Ok(
            "```json\n{\"systematicName\": \"methanal\", \"commonName\": \"formaldehyde\", \"explanation\": \"C=O\"}\n```"
                .to_string(),
        )]));
        let service = ChemistryService::new(transport.clone());
        let result = block_on(service.name_structure(&snapshot(), Language::En)).unwrap();
        assert_eq!(result.systematic_name, "methanal");
        assert_eq!(result.common_name.as_deref(), Some("formaldehyde"));
        assert_eq!(transport.prompts.borrow().len(), 1);
    }

    #[test]
    fn test_predict_reaction() {
        let reply = r##"{
            "equation": "2H2 + O2 -> 2H2O",
            "products": ["H2O"],
            "mechanismSteps": ["Initiation", "Propagation", "Termination"],
            "vseprInfo": "Bent",
            "productStructure": {
                "atoms": [
                    {"id": 0, "element": "O", "x": 0, "y": 0, "z": 0, "color": "#FF0D0D"},
                    {"id": 1, "element": "H", "x": 0.76, "y": 0.59, "z": 0},
                    {"id": 2, "element": "H", "x": -0.76, "y": 0.59, "z": 0}
                ],
                "bonds": [
                    {"source": 0, "target": 1, "order": 1},
                    {"source": 0, "target": 2, "order": 1}
                ]
            }
        }"##;
        let transport = std::rc::Rc::new(ScriptedTransport::new(vec![Ok(reply.to_string())]));
        let service = ChemistryService::new(transport.clone());
        let result = block_on(service.predict_reaction("H2 + O2", "spark", Language::Zh)).unwrap();
        assert_eq!(result.mechanism_steps.len(), 3);
        assert_eq!(result.vsepr_info, "Bent");
        assert_eq!(result.product_structure.atoms.len(), 3);

        let prompts = transport.prompts.borrow();
        assert!(prompts[0].contains("Reactants: H2 + O2"));
        assert!(prompts[0].contains("Conditions: spark"));
        assert!(prompts[0].contains("Simplified Chinese"));
    }

    #[test]
    fn test_transport_failure_is_passed_through() {
        let transport = std::rc::Rc::new(ScriptedTransport::new(vec![Err(ServiceError::Status(
            401,
            "bad key".to_string(),
        ))]));
        let service = ChemistryService::new(transport);
        let result = block_on(service.name_structure(&snapshot(), Language::En));
        assert!(matches!(result, Err(ServiceError::Status(401, _))));
    }
}
