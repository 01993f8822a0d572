use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum MeshError {
    #[error("Invalid mesh resolution: {0}")]
    InvalidResolution(String),

    #[error("Invalid cell spacing: {0}")]
    InvalidSpacing(String),
}

#[derive(Error, Debug)]
pub enum SimulationError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Mesh construction failed: {0}")]
    MeshConstruction(String),

    #[error("Singular system: {0}")]
    SingularSystem(String),

    #[error("Rendering failed: {0}")]
    Rendering(String),
}
