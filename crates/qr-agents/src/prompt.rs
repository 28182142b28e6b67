//! System prompt construction for research runs.

use qr_core::{PropertySchema, ToolParameters};

use crate::depth::Depth;

const PROTOCOL: &str = r#"You are a research assistant that helps produce a research brief.
Answer the user's question and use the necessary tools.

## Research Protocol
1. Work out which facts the question depends on.
2. Use `search` for current information and `wikipedia` for background.
3. Compare what the sources say. Note where they agree and where they conflict.
4. Write the summary only from material you gathered.
5. Set `confidence_score` from source agreement: 0.9-1.0 when sources concur,
   0.5-0.8 on partial agreement, 0.1-0.4 when they conflict.
6. Call `save_text_to_file` only if the user asks for the result to be saved."#;

const FORMAT_RULES: &str = r#"## Output Rules
- Reply with the JSON object and nothing else.
- Do not wrap the object in markdown code fences.
- Do not write any preamble before the object.
- Do not add notes or commentary after the object.
- Return an instance of the schema, not the schema itself.
- List every source you relied on in "sources" and every tool you called in "tools_used"."#;

/// JSON schema of the research record, as shown to the model.
pub fn record_schema() -> ToolParameters {
    ToolParameters::new()
        .add_property("topic", PropertySchema::string("The subject of the research"), true)
        .add_property(
            "summary",
            PropertySchema::string("The research findings written for the requested depth"),
            true,
        )
        .add_property(
            "sources",
            PropertySchema::array(
                "Sources consulted (URLs or titles)",
                PropertySchema::plain_string(),
            ),
            true,
        )
        .add_property(
            "tools_used",
            PropertySchema::array(
                "Names of the tools that were called",
                PropertySchema::plain_string(),
            ),
            true,
        )
        .add_property(
            "confidence_score",
            PropertySchema::number("Agreement between sources, from 0.0 to 1.0")
                .with_range(0.0, 1.0),
            true,
        )
}

/// Render the system prompt for a depth tier. Deterministic.
pub fn build_system_prompt(depth: Depth) -> String {
    let profile = depth.profile();
    let schema = serde_json::to_string_pretty(&record_schema()).unwrap_or_default();

    format!(
        "{protocol}\n\n\
         ## Depth: {name}\n\
         - Length: {guidance}.\n\
         - Target {min}-{max} words in \"summary\".\n\
         - Tone: {tone}.\n\n\
         ## Output Format\n\
         When your research is complete, reply with a single JSON object \
         that conforms to this JSON schema:\n\
         {schema}\n\n\
         {rules}",
        protocol = PROTOCOL,
        name = depth.as_str(),
        guidance = profile.length_guidance,
        min = profile.min_words,
        max = profile.max_words,
        tone = profile.tone,
        schema = schema,
        rules = FORMAT_RULES,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_deterministic() {
        for depth in Depth::ALL {
            assert_eq!(build_system_prompt(depth), build_system_prompt(depth));
        }
    }

    #[test]
    fn test_prompt_contains_depth_profile() {
        let prompt = build_system_prompt(Depth::Quick);
        assert!(prompt.contains("## Depth: quick"));
        assert!(prompt.contains("Target 50-100 words"));

        let academic = build_system_prompt(Depth::Academic);
        assert!(academic.contains("Target 400-700 words"));
        assert_ne!(prompt, academic);
    }

    #[test]
    fn test_prompt_embeds_schema() {
        let prompt = build_system_prompt(Depth::Detailed);
        for field in ["topic", "summary", "sources", "tools_used", "confidence_score"] {
            assert!(prompt.contains(&format!("\"{}\"", field)), "missing {}", field);
        }
        assert!(prompt.contains("\"required\""));
    }

    #[test]
    fn test_prompt_has_format_prohibitions() {
        let prompt = build_system_prompt(Depth::Detailed);
        assert!(prompt.contains("code fences"));
        assert!(prompt.contains("preamble"));
        assert!(prompt.contains("commentary after"));
    }

    #[test]
    fn test_record_schema_requires_all_fields() {
        let schema = record_schema();
        assert_eq!(schema.required.len(), 5);
        assert_eq!(schema.properties["confidence_score"].maximum, Some(1.0));
    }
}
