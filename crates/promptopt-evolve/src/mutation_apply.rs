use std::sync::Arc;

use promptopt_core::{MutationKind, MutationPrompt, TaskPrompt};
use promptopt_llm::{ChatRequest, LlmClient, LlmError, Message};

/// Textual context available when applying a mutation prompt, varying by
/// [`MutationKind`]: EDA conditions on contrastive pairs, LAMARCKIAN on a
/// high-scoring exemplar, CROSSOVER on a second parent's patch.
#[derive(Debug, Clone, Default)]
pub struct MutationContext {
    pub contrastive_pairs_text: Option<String>,
    pub exemplar_text: Option<String>,
    pub second_parent_patch: Option<String>,
    /// For HYPERMUTATION: the mutation prompt being rewritten.
    pub hypermutation_target: Option<MutationPrompt>,
}

fn render_system(kind: MutationKind) -> &'static str {
    match kind {
        MutationKind::Direct => "You rewrite a prompt patch directly to improve its outcomes. Return only the revised patch text.",
        MutationKind::Eda => "You rewrite a prompt patch conditioned on contrastive good/bad examples. Return only the revised patch text.",
        MutationKind::Lamarckian => "You rewrite a prompt patch conditioned on a high-scoring exemplar output. Return only the revised patch text.",
        MutationKind::Crossover => "You combine two prompt patches into one coherent patch. Return only the combined patch text.",
        MutationKind::Hypermutation => "You rewrite another mutation instruction given its track record. Return only the revised instruction text.",
        MutationKind::ZeroOrderHyper => "You synthesize a brand-new mutation instruction for evolving prompt patches. Return only the new instruction text.",
    }
}

fn render_user(mutation: &MutationPrompt, parent: &TaskPrompt, context: &MutationContext) -> String {
    match mutation.kind {
        MutationKind::Direct => format!(
            "Mutation instruction:\n{}\n\nCurrent patch:\n{}",
            mutation.text, parent.patch
        ),
        MutationKind::Eda => format!(
            "Mutation instruction:\n{}\n\nCurrent patch:\n{}\n\nContrastive pairs:\n{}",
            mutation.text,
            parent.patch,
            context.contrastive_pairs_text.clone().unwrap_or_default()
        ),
        MutationKind::Lamarckian => format!(
            "Mutation instruction:\n{}\n\nCurrent patch:\n{}\n\nHigh-scoring exemplar:\n{}",
            mutation.text,
            parent.patch,
            context.exemplar_text.clone().unwrap_or_default()
        ),
        MutationKind::Crossover => format!(
            "Patch A:\n{}\n\nPatch B:\n{}",
            parent.patch,
            context.second_parent_patch.clone().unwrap_or_default()
        ),
        MutationKind::Hypermutation => {
            let target = context.hypermutation_target.as_ref();
            format!(
                "Mutation instruction to rewrite:\n{}\n\nTrack record: successRate={:.2}, usageCount={}",
                target.map(|t| t.text.as_str()).unwrap_or(""),
                target.map(|t| t.success_rate).unwrap_or(0.0),
                target.map(|t| t.usage_count).unwrap_or(0),
            )
        }
        MutationKind::ZeroOrderHyper => {
            "Propose a new, distinct mutation instruction for rewriting prompt patches.".to_string()
        }
    }
}

/// Applies `mutation` to `parent`, producing new patch (or mutation
/// instruction, for HYPERMUTATION/ZERO_ORDER_HYPER) text via one LLM call.
pub async fn apply_mutation(
    llm: &Arc<dyn LlmClient>,
    model: &str,
    mutation: &MutationPrompt,
    parent: &TaskPrompt,
    context: &MutationContext,
) -> Result<String, LlmError> {
    let mut request = ChatRequest::new(
        model.to_string(),
        vec![
            Message::system(render_system(mutation.kind)),
            Message::user(render_user(mutation, parent, context)),
        ],
    );
    request.temperature = Some(0.7);
    let response = llm.complete(request).await?;
    Ok(response.text)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn parent() -> TaskPrompt {
        TaskPrompt {
            id: "p1".to_string(),
            base: "base".to_string(),
            patch: "patch v1".to_string(),
            fitness: 0.5,
            generation: 0,
            mutation_id: None,
            parent_id: None,
        }
    }

    fn mutation(kind: MutationKind) -> MutationPrompt {
        MutationPrompt {
            id: "m1".to_string(),
            text: "rewrite directly".to_string(),
            kind,
            fitness: 0.5,
            usage_count: 0,
            success_rate: 0.5,
            generation: 0,
            parent_id: None,
        }
    }

    #[tokio::test]
    async fn unit_apply_mutation_returns_llm_text() {
        let mut responses = HashMap::new();
        responses.insert(("gpt-4o-mini".to_string(), 0), "patch v2".to_string());
        let llm: Arc<dyn LlmClient> = Arc::new(promptopt_llm::FixtureLlmClient::new(responses));
        let text = apply_mutation(&llm, "gpt-4o-mini", &mutation(MutationKind::Direct), &parent(), &MutationContext::default())
            .await
            .expect("mutation applies");
        assert_eq!(text, "patch v2");
    }
}
