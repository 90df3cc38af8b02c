//! Prompt composition for retrieval-augmented answers.
//!
//! The question is scanned for length cues ("summary", "explain", ...) and
//! the matching instruction line is prefixed to it; retrieved chunks are
//! stuffed into the system prompt as context.

/// Keywords that ask for a compressed answer.
const BRIEF_KEYWORDS: [&str; 4] = ["brief", "short", "summary", "in short"];

/// Keywords that ask for an expanded answer.
const DETAILED_KEYWORDS: [&str; 4] = ["explain", "describe", "in detail", "elaborate"];

/// Answer-length instruction selected from cues in the question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStyle {
    Brief,
    Detailed,
    Default,
}

impl AnswerStyle {
    /// Detect the style from keyword cues in the question.
    ///
    /// Matching is case-insensitive; brief cues win when both kinds appear.
    pub fn detect(question: &str) -> Self {
        let lower = question.to_lowercase();
        if BRIEF_KEYWORDS.iter().any(|k| lower.contains(k)) {
            AnswerStyle::Brief
        } else if DETAILED_KEYWORDS.iter().any(|k| lower.contains(k)) {
            AnswerStyle::Detailed
        } else {
            AnswerStyle::Default
        }
    }

    /// The instruction line prefixed to the question.
    pub fn instruction(&self) -> &'static str {
        match self {
            AnswerStyle::Brief => "Answer briefly and concisely in less than 40 words.\n",
            AnswerStyle::Detailed => "Explain the answer in detail, with clarity in 100 words.\n",
            AnswerStyle::Default => {
                "Give a clear and appropriate answer based on the question, but keep short and precise.\n"
            }
        }
    }
}

/// Join retrieved chunk texts into a single context block.
pub fn build_context(texts: &[&str]) -> String {
    texts.join("\n\n")
}

/// System prompt stuffing the retrieved context ahead of the question.
pub fn build_system_prompt(context: &str) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, don't try \
         to make up an answer.\n\n{context}"
    )
}

/// User prompt: the style instruction followed by the question.
pub fn build_user_prompt(question: &str) -> String {
    let style = AnswerStyle::detect(question);
    format!("{}Question: {}", style.instruction(), question)
}
