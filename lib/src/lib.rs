#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_lossless,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::many_single_char_names,
    clippy::module_name_repetitions,
    clippy::too_many_lines,
    clippy::similar_names,
    clippy::doc_markdown
)]
pub mod arena;
pub mod armor;
pub mod bodies;
pub mod frames;
pub mod integrator;
pub mod kepler;
pub mod math;
pub mod part;
pub mod projectile;
pub mod raycast;
pub mod scenario;
pub mod ship;
pub mod time;
pub mod trajectory;
pub mod weapon;
pub mod world;
