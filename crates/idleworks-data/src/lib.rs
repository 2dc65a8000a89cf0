pub mod builder;
pub mod loader;
pub mod schema;

pub use builder::{build_scene, load_scene, Scene, SceneNames};
pub use loader::DataLoadError;
