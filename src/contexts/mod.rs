mod change_dispatcher;
mod context_builder;
mod context_prompt;
mod post_processor;
mod prompt_renderer;
mod test_generator;

pub use change_dispatcher::{ChangeDispatcher, DispatchSummary};
pub use context_builder::ContextBuilder;
pub use context_prompt::{merge_notes, ContextPrompt, StdinContextPrompt};
pub use post_processor::{NoSyntaxCheck, PostProcessor, RubySyntaxCheck, SyntaxCheck, FROZEN_STRING_PRAGMA};
pub use prompt_renderer::{PromptRenderer, NO_CONTEXT};
pub use test_generator::{GenerationOutcome, SkipReason, TestGenerator};
