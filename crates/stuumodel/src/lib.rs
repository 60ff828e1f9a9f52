//! stuumodel - the TheStuu project model.
//!
//! Pure data: the typed in-memory project document, the grid math it
//! snaps to, and the canonical normalize/validate pair every load and
//! mutation flows through. No I/O lives here.

pub mod grid;
pub mod normalize;
pub mod project;
pub mod validate;

pub use grid::{ceil_to_grid, is_grid_aligned, quantize, round6, GRID_STEP};
pub use normalize::normalize;
pub use project::{
    fresh_id, Clip, ClipContent, DrumStep, FileClip, FileKind, MidiNote, MixerStrip, ParamSpec,
    Pattern, PatternData, PluginNode, Project, Track, DEFAULT_STRIP_VOLUME, SCHEMA_VERSION,
    SOURCE_FORMATS,
};
pub use validate::{ensure_valid, validate, ValidateError};
