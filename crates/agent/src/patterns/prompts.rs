//! Prompt templates for the ReAct agents, with per-backend variants.
//!
//! Variables: `tool_descriptions`, `tool_names` (bound at construction),
//! `input`, `agent_scratchpad` and, for the conversational prompt, `history`.

use stepwise_core::prompt::{ConditionalPromptSelector, PromptTemplate, is_chat_model};

const ZERO_SHOT_PREFIX: &str = "Answer the following questions as best you can. \
You have access to the following tools:

{tool_descriptions}";

const ZERO_SHOT_FORMAT: &str = "Use the following format:

Question: the input question you must answer
Thought: you should always think about what to do
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action
... (this Thought/Action/Action Input/Observation can repeat N times)
Thought: I now know the final answer
Final Answer: the final answer to the original input question";

const ZERO_SHOT_SUFFIX: &str = "Begin!

Question: {input}
Thought:{agent_scratchpad}";

/// Chat models tend to keep writing past their turn.
const CHAT_REMINDER: &str = "Reply with exactly one Thought followed by either one \
Action/Action Input pair or a Final Answer. Never write an Observation yourself.";

const CONVERSATIONAL_PREFIX: &str = "Assistant is a large language model trained to help \
with a wide range of tasks, from answering simple questions to providing in-depth \
explanations and discussions. Assistant can hold a natural-sounding conversation and \
uses tools when it needs facts or calculations it cannot produce reliably on its own.

TOOLS:
------

Assistant has access to the following tools:

{tool_descriptions}";

const CONVERSATIONAL_FORMAT: &str = "To use a tool, please use the following format:

Thought: Do I need to use a tool? Yes
Action: the action to take, should be one of [{tool_names}]
Action Input: the input to the action
Observation: the result of the action

When you have a response to say to the Human, or if you do not need to use a tool, \
you MUST use the format:

Thought: Do I need to use a tool? No
AI: [your response here]";

const CONVERSATIONAL_SUFFIX: &str = "Begin!

Previous conversation history:
{history}

New input: {input}

Thought:{agent_scratchpad}";

fn join(parts: &[&str]) -> PromptTemplate {
    PromptTemplate::new(parts.join("\n\n"))
}

pub fn zero_shot_prompt() -> PromptTemplate {
    join(&[ZERO_SHOT_PREFIX, ZERO_SHOT_FORMAT, ZERO_SHOT_SUFFIX])
}

pub fn zero_shot_chat_prompt() -> PromptTemplate {
    join(&[ZERO_SHOT_PREFIX, ZERO_SHOT_FORMAT, CHAT_REMINDER, ZERO_SHOT_SUFFIX])
}

pub fn conversational_prompt() -> PromptTemplate {
    join(&[CONVERSATIONAL_PREFIX, CONVERSATIONAL_FORMAT, CONVERSATIONAL_SUFFIX])
}

pub fn conversational_chat_prompt() -> PromptTemplate {
    join(&[
        CONVERSATIONAL_PREFIX,
        CONVERSATIONAL_FORMAT,
        CHAT_REMINDER,
        CONVERSATIONAL_SUFFIX,
    ])
}

/// Completion prompt by default, chat variant for chat backends.
pub fn zero_shot_selector() -> ConditionalPromptSelector {
    ConditionalPromptSelector::new(zero_shot_prompt()).when(is_chat_model, zero_shot_chat_prompt())
}

pub fn conversational_selector() -> ConditionalPromptSelector {
    ConditionalPromptSelector::new(conversational_prompt())
        .when(is_chat_model, conversational_chat_prompt())
}
