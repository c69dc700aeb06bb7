//! Wire types: editor-facing request bodies and OpenAI-compatible provider types

mod assist;
mod openai;

pub use assist::*;
pub use openai::*;
