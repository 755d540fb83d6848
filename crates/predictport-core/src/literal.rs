//! Parser for arrays written as type-prefixed bracket literals, e.g.
//! `float:[[1,2],[3,4]]` or `int:5`.

use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::error::ParseError;
use crate::{DType, Shape};

/// Element type named by the prefix of an array literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeTag {
    Int,
    Long,
    Float,
    Double,
}

impl TypeTag {
    pub fn dtype(self) -> DType {
        match self {
            TypeTag::Int => DType::I32,
            TypeTag::Long => DType::I64,
            TypeTag::Float => DType::F32,
            TypeTag::Double => DType::F64,
        }
    }
}

impl FromStr for TypeTag {
    type Err = ParseError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "int" => Ok(TypeTag::Int),
            "long" => Ok(TypeTag::Long),
            "float" => Ok(TypeTag::Float),
            "double" => Ok(TypeTag::Double),
            other => Err(ParseError::UnknownTypeTag(other.to_string())),
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self {
            TypeTag::Int => "int",
            TypeTag::Long => "long",
            TypeTag::Float => "float",
            TypeTag::Double => "double",
        };
        f.write_str(tag)
    }
}

/// A parsed literal: shape plus the scalar tokens in row-major order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EncodedArray {
    pub element_type: TypeTag,
    pub shape: Shape,
    pub values: Vec<String>,
}

impl EncodedArray {
    pub fn is_scalar(&self) -> bool {
        self.shape.rank() == 0
    }
}

pub fn parse(text: &str) -> Result<EncodedArray, ParseError> {
    let (tag, literal) = text
        .rsplit_once(':')
        .ok_or_else(|| ParseError::MissingTypeTag(text.to_string()))?;
    let element_type: TypeTag = tag.trim().parse()?;

    let shape = scan_shape(literal)?;
    let values: Vec<String> = literal
        .split(|c: char| matches!(c, '[' | ']' | ',') || c.is_whitespace())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect();

    let expected = shape.numel();
    if values.len() != expected {
        return Err(ParseError::ElementCount {
            shape: shape.dims().to_vec(),
            expected,
            found: values.len(),
        });
    }

    Ok(EncodedArray {
        element_type,
        shape,
        values,
    })
}

/// Derives the shape from bracket nesting. Every sibling at a depth must
/// close with the same element count as the first one seen at that depth.
fn scan_shape(literal: &str) -> Result<Shape, ParseError> {
    let rank = literal
        .chars()
        .filter(|c| !c.is_whitespace())
        .take_while(|c| *c == '[')
        .count();

    let mut dims: SmallVec<[Option<usize>; 6]> = SmallVec::from_elem(None, rank);
    let mut counts: Vec<usize> = Vec::with_capacity(rank);

    for c in literal.chars() {
        match c {
            '[' => counts.push(0),
            ',' => {
                if let Some(top) = counts.last_mut() {
                    *top += 1;
                }
            }
            ']' => {
                let size = counts.pop().ok_or(ParseError::UnbalancedBrackets)? + 1;
                let depth = counts.len();
                let slot = dims.get_mut(depth).ok_or(ParseError::InconsistentRank {
                    expected: rank,
                    found: depth + 1,
                })?;
                match slot {
                    None => *slot = Some(size),
                    Some(expected) if *expected != size => {
                        return Err(ParseError::InconsistentShape {
                            depth,
                            expected: *expected,
                            found: size,
                        });
                    }
                    Some(_) => {}
                }
            }
            _ => {}
        }
    }

    if !counts.is_empty() {
        return Err(ParseError::UnbalancedBrackets);
    }

    dims.into_iter()
        .collect::<Option<SmallVec<[usize; 6]>>>()
        .map(Shape)
        .ok_or(ParseError::UnbalancedBrackets)
}
