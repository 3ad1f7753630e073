//! Render pass orchestration: clip regions, the image bank, input resolution and the pipeline
//! that drives the effects.

pub(crate) mod bank;
pub(crate) mod geometry;
pub(crate) mod options;
pub(crate) mod pipeline;
pub(crate) mod region;
pub(crate) mod source;
