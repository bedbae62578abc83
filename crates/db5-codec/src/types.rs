//! Major/minor type codes carried in bytes 4 and 5 of every header.
//!
//! The major type says which family of software owns the body (BRL-CAD
//! geometry, attribute-only records, raw binary arrays); the minor type
//! narrows it to a specific solid or element encoding. The codec never
//! interprets bodies, it only carries these codes and names them.

use std::fmt;

/// Owner family of an object's body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MajorType {
    Reserved,
    BrlCad,
    AttributeOnly,
    BinaryExperimental,
    BinaryUniform,
    BinaryMime,
    /// A code this version does not know. Carried through untouched.
    Other(u8),
}

impl MajorType {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => Self::Reserved,
            1 => Self::BrlCad,
            2 => Self::AttributeOnly,
            8 => Self::BinaryExperimental,
            9 => Self::BinaryUniform,
            10 => Self::BinaryMime,
            other => Self::Other(other),
        }
    }

    pub fn as_byte(self) -> u8 {
        match self {
            Self::Reserved => 0,
            Self::BrlCad => 1,
            Self::AttributeOnly => 2,
            Self::BinaryExperimental => 8,
            Self::BinaryUniform => 9,
            Self::BinaryMime => 10,
            Self::Other(b) => b,
        }
    }

    /// True for the three binary families (codes 8..=10).
    pub fn is_binary(self) -> bool {
        self.as_byte() & 0x18 == 0x08
    }
}

impl fmt::Display for MajorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reserved => f.write_str("reserved"),
            Self::BrlCad => f.write_str("brlcad"),
            Self::AttributeOnly => f.write_str("attribute only"),
            Self::BinaryExperimental => f.write_str("binary (experimental)"),
            Self::BinaryUniform => f.write_str("binary (uniform array)"),
            Self::BinaryMime => f.write_str("binary (mime)"),
            Self::Other(b) => write!(f, "unknown major type {b}"),
        }
    }
}

/// BRL-CAD geometry minor types.
pub mod brlcad {
    pub const TOR: u8 = 1;
    pub const TGC: u8 = 2;
    pub const ELL: u8 = 3;
    pub const ARB8: u8 = 4;
    pub const ARS: u8 = 5;
    pub const HALF: u8 = 6;
    pub const REC: u8 = 7;
    pub const POLY: u8 = 8;
    pub const BSPLINE: u8 = 9;
    pub const SPH: u8 = 10;
    pub const NMG: u8 = 11;
    pub const EBM: u8 = 12;
    pub const VOL: u8 = 13;
    pub const ARBN: u8 = 14;
    pub const PIPE: u8 = 15;
    pub const PARTICLE: u8 = 16;
    pub const RPC: u8 = 17;
    pub const RHC: u8 = 18;
    pub const EPA: u8 = 19;
    pub const EHY: u8 = 20;
    pub const ETO: u8 = 21;
    pub const GRIP: u8 = 22;
    pub const JOINT: u8 = 23;
    pub const HF: u8 = 24;
    pub const DSP: u8 = 25;
    pub const SKETCH: u8 = 26;
    pub const EXTRUDE: u8 = 27;
    pub const SUBMODEL: u8 = 28;
    pub const CLINE: u8 = 29;
    pub const BOT: u8 = 30;
    pub const COMBINATION: u8 = 31;
    pub const SUPERELL: u8 = 35;
    pub const METABALL: u8 = 36;
    pub const BREP: u8 = 37;
    pub const HYP: u8 = 38;
    pub const CONSTRAINT: u8 = 39;
    pub const REVOLVE: u8 = 40;
    pub const PNTS: u8 = 41;
}

/// Element types of a uniform binary array (`MajorType::BinaryUniform`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryUniform {
    Float,
    Double,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
}

impl BinaryUniform {
    pub fn from_minor(minor: u8) -> Option<Self> {
        Some(match minor {
            0x02 => Self::Float,
            0x03 => Self::Double,
            0x04 => Self::U8,
            0x05 => Self::U16,
            0x06 => Self::U32,
            0x07 => Self::U64,
            0x0C => Self::I8,
            0x0D => Self::I16,
            0x0E => Self::I32,
            0x0F => Self::I64,
            _ => return None,
        })
    }

    pub fn minor(self) -> u8 {
        match self {
            Self::Float => 0x02,
            Self::Double => 0x03,
            Self::U8 => 0x04,
            Self::U16 => 0x05,
            Self::U32 => 0x06,
            Self::U64 => 0x07,
            Self::I8 => 0x0C,
            Self::I16 => 0x0D,
            Self::I32 => 0x0E,
            Self::I64 => 0x0F,
        }
    }

    /// Size in bytes of one array element on disk.
    pub fn element_size(self) -> usize {
        match self {
            Self::U8 | Self::I8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::Float | Self::U32 | Self::I32 => 4,
            Self::Double | Self::U64 | Self::I64 => 8,
        }
    }
}

// (major, minor, tag, description)
const TYPE_TABLE: &[(u8, u8, &str, &str)] = &[
    (1, brlcad::TOR, "tor", "torus"),
    (1, brlcad::TGC, "tgc", "truncated general cone"),
    (1, brlcad::ELL, "ell", "ellipsoid"),
    (1, brlcad::ARB8, "arb8", "arb8"),
    (1, brlcad::ARS, "ars", "waterline"),
    (1, brlcad::HALF, "half", "halfspace"),
    (1, brlcad::REC, "rec", "right elliptical cylinder"),
    (1, brlcad::POLY, "poly", "polysolid"),
    (1, brlcad::BSPLINE, "bspline", "b-spline"),
    (1, brlcad::SPH, "sph", "sphere"),
    (1, brlcad::NMG, "nmg", "nmg"),
    (1, brlcad::EBM, "ebm", "extruded bitmap"),
    (1, brlcad::VOL, "vol", "voxels"),
    (1, brlcad::ARBN, "arbn", "arbn"),
    (1, brlcad::PIPE, "pipe", "pipe"),
    (1, brlcad::PARTICLE, "part", "particle"),
    (1, brlcad::RPC, "rpc", "right parabolic cylinder"),
    (1, brlcad::RHC, "rhc", "right hyperbolic cylinder"),
    (1, brlcad::EPA, "epa", "elliptical paraboloid"),
    (1, brlcad::EHY, "ehy", "elliptical hyperboloid"),
    (1, brlcad::ETO, "eto", "elliptical torus"),
    (1, brlcad::GRIP, "grip", "grip"),
    (1, brlcad::JOINT, "joint", "joint"),
    (1, brlcad::HF, "hf", "height field"),
    (1, brlcad::DSP, "dsp", "displacement map"),
    (1, brlcad::SKETCH, "sketch", "sketch"),
    (1, brlcad::EXTRUDE, "extrude", "extrude"),
    (1, brlcad::SUBMODEL, "submodel", "submodel"),
    (1, brlcad::CLINE, "cline", "cline"),
    (1, brlcad::BOT, "bot", "bag o' triangles"),
    (1, brlcad::COMBINATION, "comb", "combination"),
    (1, brlcad::SUPERELL, "superell", "superquadratic ellipsoid"),
    (1, brlcad::METABALL, "metaball", "metaball"),
    (1, brlcad::BREP, "brep", "boundary representation"),
    (1, brlcad::HYP, "hyp", "hyperboloid of one sheet"),
    (1, brlcad::CONSTRAINT, "constraint", "constraint"),
    (1, brlcad::REVOLVE, "revolve", "revolution"),
    (1, brlcad::PNTS, "pnts", "collection of points"),
    (2, 0, "attr", "attribute only"),
    (9, 0x02, "float", "array of floats"),
    (9, 0x03, "double", "array of doubles"),
    (9, 0x04, "u8", "array of unsigned chars"),
    (9, 0x05, "u16", "array of unsigned shorts"),
    (9, 0x06, "u32", "array of unsigned ints"),
    (9, 0x07, "u64", "array of unsigned long longs"),
    (9, 0x0C, "i8", "array of chars"),
    (9, 0x0D, "i16", "array of shorts"),
    (9, 0x0E, "i32", "array of ints"),
    (9, 0x0F, "i64", "array of long longs"),
];

/// Short tag for a major/minor pair, e.g. `"ell"`.
pub fn type_tag(major: MajorType, minor: u8) -> Option<&'static str> {
    lookup(major, minor).map(|(_, _, tag, _)| tag)
}

/// Human-readable description for a major/minor pair.
pub fn type_description(major: MajorType, minor: u8) -> Option<&'static str> {
    lookup(major, minor).map(|(_, _, _, descrip)| descrip)
}

/// Reverse lookup: the codes for a short tag.
pub fn codes_from_tag(tag: &str) -> Option<(MajorType, u8)> {
    TYPE_TABLE
        .iter()
        .find(|(_, _, t, _)| *t == tag)
        .map(|&(major, minor, _, _)| (MajorType::from_byte(major), minor))
}

fn lookup(major: MajorType, minor: u8) -> Option<(u8, u8, &'static str, &'static str)> {
    let major = major.as_byte();
    TYPE_TABLE
        .iter()
        .copied()
        .find(|&(ma, mi, _, _)| ma == major && mi == minor)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn major_type_byte_roundtrip() {
        for b in 0..=255u8 {
            assert_eq!(MajorType::from_byte(b).as_byte(), b);
        }
    }

    #[test]
    fn binary_family() {
        assert!(MajorType::BinaryUniform.is_binary());
        assert!(MajorType::BinaryMime.is_binary());
        assert!(!MajorType::BrlCad.is_binary());
        assert!(!MajorType::AttributeOnly.is_binary());
    }

    #[test]
    fn tag_lookup() {
        assert_eq!(type_tag(MajorType::BrlCad, brlcad::ELL), Some("ell"));
        assert_eq!(type_description(MajorType::BrlCad, brlcad::BOT), Some("bag o' triangles"));
        assert_eq!(type_tag(MajorType::BrlCad, 200), None);
        assert_eq!(codes_from_tag("comb"), Some((MajorType::BrlCad, brlcad::COMBINATION)));
        assert_eq!(codes_from_tag("u16"), Some((MajorType::BinaryUniform, 0x05)));
        assert_eq!(codes_from_tag("nope"), None);
    }

    #[test]
    fn binary_uniform_sizes() {
        assert_eq!(BinaryUniform::from_minor(0x03), Some(BinaryUniform::Double));
        assert_eq!(BinaryUniform::Double.element_size(), 8);
        assert_eq!(BinaryUniform::I16.element_size(), 2);
        assert_eq!(BinaryUniform::from_minor(0x01), None);
        for minor in 0..=0x0F {
            if let Some(t) = BinaryUniform::from_minor(minor) {
                assert_eq!(t.minor(), minor);
                assert!(type_tag(MajorType::BinaryUniform, minor).is_some());
            }
        }
    }
}
