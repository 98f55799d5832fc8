//! Tensor types: a cell type plus a sorted set of named dimensions.
//!
//! A [`TensorType`] with no dimensions is the scalar (empty) type. Types are
//! immutable values; the combinators in this module (`join`, `reduce`, ...)
//! return new types and are used by expression type inference.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::Name;
use super::text_utils::is_identifier;

// ============================================================================
// ERRORS
// ============================================================================

/// Errors produced while building, parsing or combining tensor types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TensorTypeError {
    /// A dimension name occurs twice with different kinds.
    #[error("dimension '{name}' is both {first} and {second}")]
    ConflictingDimension {
        name: Name,
        first: DimensionKind,
        second: DimensionKind,
    },

    /// A dimension was referenced that the type does not have.
    #[error("{tensor_type} has no dimension '{name}'")]
    MissingDimension { tensor_type: TensorType, name: Name },

    /// A rename target already exists in the type.
    #[error("cannot rename to '{name}': {tensor_type} already has that dimension")]
    DuplicateDimension { tensor_type: TensorType, name: Name },

    /// The textual form could not be parsed.
    #[error("invalid tensor type '{text}': {message}")]
    Syntax { text: String, message: String },
}

// ============================================================================
// CELL TYPE
// ============================================================================

/// The value type of tensor cells.
///
/// Variants are declared in increasing size so that `max` picks the
/// "largest" of two cell types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CellType {
    Int8,
    BFloat16,
    Float,
    #[default]
    Double,
}

impl CellType {
    pub fn as_str(self) -> &'static str {
        match self {
            CellType::Int8 => "int8",
            CellType::BFloat16 => "bfloat16",
            CellType::Float => "float",
            CellType::Double => "double",
        }
    }

    /// The cell type of a combination of two tensors.
    pub fn largest_of(self, other: CellType) -> CellType {
        self.max(other)
    }
}

impl fmt::Display for CellType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CellType {
    type Err = TensorTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "double" => Ok(CellType::Double),
            "float" => Ok(CellType::Float),
            "bfloat16" => Ok(CellType::BFloat16),
            "int8" => Ok(CellType::Int8),
            other => Err(TensorTypeError::Syntax {
                text: other.to_string(),
                message: "unknown cell type".to_string(),
            }),
        }
    }
}

// ============================================================================
// DIMENSIONS
// ============================================================================

/// Whether a dimension is sparse (mapped) or dense (indexed).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    /// Sparse dimension with an unbounded label space: `x{}`.
    Mapped,
    /// Dense dimension, bound (`x[3]`) or unbound (`x[]`).
    Indexed(Option<u64>),
}

impl DimensionKind {
    pub fn is_mapped(self) -> bool {
        matches!(self, DimensionKind::Mapped)
    }

    pub fn is_indexed(self) -> bool {
        !self.is_mapped()
    }

    /// Combine two same-named dimension kinds when joining.
    ///
    /// Bound sizes win over unbound ones and the smallest bound size wins.
    fn join(self, other: DimensionKind) -> Option<DimensionKind> {
        use DimensionKind::*;
        match (self, other) {
            (Mapped, Mapped) => Some(Mapped),
            (Indexed(a), Indexed(b)) => Some(Indexed(match (a, b) {
                (Some(a), Some(b)) => Some(a.min(b)),
                (a, b) => a.or(b),
            })),
            _ => None,
        }
    }

    /// Combine two same-named dimension kinds into one which accepts both.
    fn generalize(self, other: DimensionKind) -> DimensionKind {
        use DimensionKind::*;
        match (self, other) {
            (Indexed(a), Indexed(b)) if a == b => Indexed(a),
            (Indexed(_), Indexed(_)) => Indexed(None),
            _ => Mapped,
        }
    }
}

impl fmt::Display for DimensionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DimensionKind::Mapped => f.write_str("mapped"),
            DimensionKind::Indexed(Some(size)) => write!(f, "indexed[{}]", size),
            DimensionKind::Indexed(None) => f.write_str("indexed[]"),
        }
    }
}

/// A named tensor dimension.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Dimension {
    pub name: Name,
    pub kind: DimensionKind,
}

impl Dimension {
    pub fn mapped(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            kind: DimensionKind::Mapped,
        }
    }

    pub fn indexed(name: impl Into<Name>, size: u64) -> Self {
        Self {
            name: name.into(),
            kind: DimensionKind::Indexed(Some(size)),
        }
    }

    pub fn indexed_unbound(name: impl Into<Name>) -> Self {
        Self {
            name: name.into(),
            kind: DimensionKind::Indexed(None),
        }
    }

    /// The size of this dimension, if it is a bound indexed dimension.
    pub fn size(&self) -> Option<u64> {
        match self.kind {
            DimensionKind::Indexed(size) => size,
            DimensionKind::Mapped => None,
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            DimensionKind::Mapped => write!(f, "{}{{}}", self.name),
            DimensionKind::Indexed(Some(size)) => write!(f, "{}[{}]", self.name, size),
            DimensionKind::Indexed(None) => write!(f, "{}[]", self.name),
        }
    }
}

// ============================================================================
// TENSOR TYPE
// ============================================================================

/// The type of a tensor value.
///
/// Dimensions are unique by name and kept sorted by name, so two types with
/// the same dimensions compare equal regardless of declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TensorType {
    cell_type: CellType,
    dimensions: Vec<Dimension>,
}

impl TensorType {
    /// The scalar type: no dimensions, double cells.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn builder() -> TensorTypeBuilder {
        TensorTypeBuilder::default()
    }

    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| d.name == name)
    }

    pub fn rank(&self) -> usize {
        self.dimensions.len()
    }

    /// Whether this is the scalar type (no dimensions).
    pub fn is_scalar(&self) -> bool {
        self.dimensions.is_empty()
    }

    /// The type resulting from combining every cell of `self` with every
    /// matching cell of `other`.
    ///
    /// A scalar side does not affect the cell type of the result.
    pub fn join(&self, other: &TensorType) -> Result<TensorType, TensorTypeError> {
        let cell_type = match (self.is_scalar(), other.is_scalar()) {
            (true, false) => other.cell_type,
            (false, true) => self.cell_type,
            _ => self.cell_type.largest_of(other.cell_type),
        };
        let mut builder = TensorType::builder().cell_type(cell_type);
        for dimension in self.dimensions.iter().chain(&other.dimensions) {
            builder = builder.dimension(dimension.clone());
        }
        builder.build()
    }

    /// Remove the given dimensions. An empty list reduces to a scalar.
    pub fn reduce(&self, dimensions: &[Name]) -> Result<TensorType, TensorTypeError> {
        if dimensions.is_empty() {
            return Ok(TensorType::builder().cell_type(self.cell_type).build_unchecked());
        }
        for name in dimensions {
            self.require_dimension(name)?;
        }
        Ok(TensorType {
            cell_type: self.cell_type,
            dimensions: self
                .dimensions
                .iter()
                .filter(|d| !dimensions.contains(&d.name))
                .cloned()
                .collect(),
        })
    }

    pub fn rename(&self, from: &str, to: &str) -> Result<TensorType, TensorTypeError> {
        self.require_dimension(from)?;
        if from != to && self.dimension(to).is_some() {
            return Err(TensorTypeError::DuplicateDimension {
                tensor_type: self.clone(),
                name: to.into(),
            });
        }
        let mut builder = TensorType::builder().cell_type(self.cell_type);
        for dimension in &self.dimensions {
            let mut dimension = dimension.clone();
            if dimension.name == from {
                dimension.name = to.into();
            }
            builder = builder.dimension(dimension);
        }
        builder.build()
    }

    /// Concatenate along `dimension`. A side lacking the dimension counts
    /// as size one along it.
    pub fn concat(&self, other: &TensorType, dimension: &str) -> Result<TensorType, TensorTypeError> {
        let size_along = |t: &TensorType| -> Result<Option<u64>, TensorTypeError> {
            match t.dimension(dimension) {
                None => Ok(Some(1)),
                Some(d) => match d.kind {
                    DimensionKind::Indexed(size) => Ok(size),
                    DimensionKind::Mapped => Err(TensorTypeError::ConflictingDimension {
                        name: dimension.into(),
                        first: DimensionKind::Mapped,
                        second: DimensionKind::Indexed(None),
                    }),
                },
            }
        };
        let size = match (size_along(self)?, size_along(other)?) {
            (Some(a), Some(b)) => Some(a + b),
            _ => None,
        };
        let mut builder = TensorType::builder()
            .cell_type(self.cell_type.largest_of(other.cell_type))
            .dimension(Dimension {
                name: dimension.into(),
                kind: DimensionKind::Indexed(size),
            });
        for d in self.dimensions.iter().chain(&other.dimensions) {
            if d.name != dimension {
                builder = builder.dimension(d.clone());
            }
        }
        builder.build()
    }

    /// A type which both `self` and `other` can be assigned to, if the two
    /// have the same dimension names.
    pub fn generalize(&self, other: &TensorType) -> Option<TensorType> {
        if self.dimensions.len() != other.dimensions.len() {
            return None;
        }
        let mut dimensions = Vec::with_capacity(self.dimensions.len());
        for (a, b) in self.dimensions.iter().zip(&other.dimensions) {
            if a.name != b.name {
                return None;
            }
            dimensions.push(Dimension {
                name: a.name.clone(),
                kind: a.kind.generalize(b.kind),
            });
        }
        Some(TensorType {
            cell_type: self.cell_type.largest_of(other.cell_type),
            dimensions,
        })
    }

    /// Whether a value of this type can be used where `target` is expected.
    pub fn is_assignable_to(&self, target: &TensorType) -> bool {
        self.dimensions.len() == target.dimensions.len()
            && self
                .dimensions
                .iter()
                .zip(&target.dimensions)
                .all(|(d, t)| {
                    d.name == t.name
                        && match (d.kind, t.kind) {
                            (DimensionKind::Mapped, DimensionKind::Mapped) => true,
                            (DimensionKind::Indexed(_), DimensionKind::Indexed(None)) => true,
                            (DimensionKind::Indexed(a), DimensionKind::Indexed(b)) => a == b,
                            _ => false,
                        }
                })
    }

    fn require_dimension(&self, name: &str) -> Result<&Dimension, TensorTypeError> {
        self.dimension(name)
            .ok_or_else(|| TensorTypeError::MissingDimension {
                tensor_type: self.clone(),
                name: name.into(),
            })
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("tensor")?;
        if self.cell_type != CellType::Double {
            write!(f, "<{}>", self.cell_type)?;
        }
        f.write_str("(")?;
        for (i, dimension) in self.dimensions.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{}", dimension)?;
        }
        f.write_str(")")
    }
}

impl FromStr for TensorType {
    type Err = TensorTypeError;

    /// Parses `tensor(x{},y[3])`, `tensor<float>(z[])` and `tensor()`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let syntax = |message: &str| TensorTypeError::Syntax {
            text: s.to_string(),
            message: message.to_string(),
        };

        let text = s.trim();
        let rest = text
            .strip_prefix("tensor")
            .ok_or_else(|| syntax("expected 'tensor'"))?
            .trim_start();
        let (cell_type, rest) = match rest.strip_prefix('<') {
            Some(rest) => {
                let end = rest.find('>').ok_or_else(|| syntax("unterminated cell type"))?;
                (rest[..end].trim().parse()?, rest[end + 1..].trim_start())
            }
            None => (CellType::Double, rest),
        };
        let body = rest
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .ok_or_else(|| syntax("expected a parenthesized dimension list"))?;

        let mut builder = TensorType::builder().cell_type(cell_type);
        for part in body.split(',').map(str::trim).filter(|part| !part.is_empty()) {
            let dimension = if let Some(name) = part.strip_suffix("{}") {
                Dimension::mapped(name.trim())
            } else if let Some(open) = part.find('[') {
                let size = part[open + 1..]
                    .strip_suffix(']')
                    .ok_or_else(|| syntax("unterminated indexed dimension"))?
                    .trim();
                let name = part[..open].trim();
                if size.is_empty() {
                    Dimension::indexed_unbound(name)
                } else {
                    let size = size
                        .parse::<u64>()
                        .map_err(|_| syntax("dimension size must be a non-negative integer"))?;
                    Dimension::indexed(name, size)
                }
            } else {
                return Err(syntax("dimensions must be written name{} or name[size]"));
            };
            if !is_identifier(&dimension.name) {
                return Err(syntax("dimension names must be identifiers"));
            }
            builder = builder.dimension(dimension);
        }
        builder.build()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

/// Incremental construction of a [`TensorType`].
///
/// Adding a dimension that already exists combines the two the same way
/// [`TensorType::join`] does; a mapped/indexed conflict is reported by
/// [`build`](TensorTypeBuilder::build).
#[derive(Clone, Debug, Default)]
pub struct TensorTypeBuilder {
    cell_type: CellType,
    dimensions: Vec<Dimension>,
    conflict: Option<TensorTypeError>,
}

impl TensorTypeBuilder {
    pub fn cell_type(mut self, cell_type: CellType) -> Self {
        self.cell_type = cell_type;
        self
    }

    pub fn mapped(self, name: impl Into<Name>) -> Self {
        self.dimension(Dimension::mapped(name))
    }

    pub fn indexed(self, name: impl Into<Name>, size: u64) -> Self {
        self.dimension(Dimension::indexed(name, size))
    }

    pub fn indexed_unbound(self, name: impl Into<Name>) -> Self {
        self.dimension(Dimension::indexed_unbound(name))
    }

    pub fn dimension(mut self, dimension: Dimension) -> Self {
        match self.dimensions.iter_mut().find(|d| d.name == dimension.name) {
            Some(existing) => match existing.kind.join(dimension.kind) {
                Some(kind) => existing.kind = kind,
                None => {
                    self.conflict.get_or_insert(TensorTypeError::ConflictingDimension {
                        name: dimension.name,
                        first: existing.kind,
                        second: dimension.kind,
                    });
                }
            },
            None => self.dimensions.push(dimension),
        }
        self
    }

    pub fn build(self) -> Result<TensorType, TensorTypeError> {
        match self.conflict {
            Some(conflict) => Err(conflict),
            None => Ok(self.build_unchecked()),
        }
    }

    fn build_unchecked(mut self) -> TensorType {
        self.dimensions.sort_by(|a, b| a.name.cmp(&b.name));
        TensorType {
            cell_type: self.cell_type,
            dimensions: self.dimensions,
        }
    }
}

#[cfg(feature = "model-store")]
impl serde::Serialize for TensorType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "model-store")]
impl<'de> serde::Deserialize<'de> for TensorType {
    /// Types are stored in their text form, e.g. `"tensor(x{})"`.
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
