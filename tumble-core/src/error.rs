/// Error types for polyhedron construction, animation and plane lists

/// Failure while turning a set of planes into a polyhedron.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq)]
pub enum GeometryError {
    /// A plane normal has no usable major axis (zero or non-finite vector).
    #[error("plane normal ({0}, {1}, {2}) is degenerate")]
    DegenerateNormal(f32, f32, f32),
    /// Every face was clipped away or culled.
    #[error("the plane set does not enclose any volume ({planes} planes, 0 faces)")]
    EmptyPolyhedron { planes: usize },
    /// A configuration value is out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),
}

/// Failure while advancing the rolling animation.
#[derive(thiserror::Error, Copy, Clone, Debug, PartialEq, Eq)]
pub enum AnimationError {
    /// The leading edge of the resting face has no neighboring face.
    #[error("side {side} has no neighbor across edge {edge}")]
    MissingNeighbor { side: usize, edge: usize },
    /// The resting face index is outside the side list.
    #[error("side {0} does not exist")]
    InvalidSide(usize),
}

/// Failure while reading a plane list.
#[derive(thiserror::Error, Clone, Debug, PartialEq)]
pub enum PlaneFileError {
    /// A line could not be parsed as `plane <nx> <ny> <nz> <dist>`.
    #[error("line {line}: expected `plane <nx> <ny> <nz> <dist>`, found `{text}`")]
    Syntax { line: usize, text: String },
    /// A line parsed but its normal is zero.
    #[error("line {line}: {source}")]
    Geometry {
        line: usize,
        #[source]
        source: GeometryError,
    },
}
