// Editing tools built on the history engine
//
// Tools mutate the rendering surface first and then record what they did.
// Only the drawing tool lives here; it is the one tool with a multi-step,
// abortable interaction.

pub mod draw;

pub use draw::{DrawError, DrawInteraction, DrawResult, DrawState};
