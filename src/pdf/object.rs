//! Minimal PDF object model.
//!
//! Only the object shapes the span extractor needs: the eight basic types,
//! indirect references, and streams with their raw (still encoded) data.

use std::collections::HashMap;

/// An indirect object reference (`10 0 R`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object number
    pub number: u32,
    /// Generation number
    pub generation: u16,
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.number, self.generation)
    }
}

/// A PDF object.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfObject {
    /// null
    Null,
    /// true / false
    Boolean(bool),
    /// Integer number
    Integer(i64),
    /// Real number
    Real(f64),
    /// String (literal or hex), escape sequences already decoded to bytes
    String(Vec<u8>),
    /// Name, `#xx` escapes already decoded
    Name(String),
    /// Array of objects
    Array(Vec<PdfObject>),
    /// Dictionary
    Dictionary(HashMap<String, PdfObject>),
    /// Stream: dictionary plus raw data (filters not yet applied)
    Stream {
        /// The stream dictionary
        dict: HashMap<String, PdfObject>,
        /// Raw bytes between `stream` and `endstream`
        data: Vec<u8>,
    },
    /// Indirect reference
    Reference(ObjectRef),
}

impl PdfObject {
    /// Numeric value of an Integer or Real.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PdfObject::Integer(i) => Some(*i as f64),
            PdfObject::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Integer value.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PdfObject::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Name value.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            PdfObject::Name(n) => Some(n),
            _ => None,
        }
    }

    /// Dictionary value (also the dictionary of a stream).
    pub fn as_dict(&self) -> Option<&HashMap<String, PdfObject>> {
        match self {
            PdfObject::Dictionary(d) => Some(d),
            PdfObject::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Array value.
    pub fn as_array(&self) -> Option<&[PdfObject]> {
        match self {
            PdfObject::Array(a) => Some(a),
            _ => None,
        }
    }

    /// Reference value.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            PdfObject::Reference(r) => Some(*r),
            _ => None,
        }
    }
}
