//! Case decomposition tables for topology-preserving marching cubes.
//!
//! The 256 corner-sign patterns are canonicalised into the 15 equivalence
//! classes of Lewiner, Lopes, Vieira and Tavares (2003), with triangle
//! strips per configuration and sub-configuration and the face / interior
//! probe lists for the ambiguous classes. Strip entries 0..11 are cube edge
//! identifiers; 12 is the centroid of the crossing edges. Strips are wound
//! with normals toward the material side; the cell driver reverses them on
//! emit. Configurations are numbered by ascending sign pattern within each
//! class, face probes are stored positive for primary-polarity
//! configurations and negative for their complements, and the case-13
//! sub-configuration map is per configuration.
//!
//! The tables are consumed read-only; nothing here is built at runtime.
#![allow(missing_docs)]

/// Case and configuration for each corner-sign pattern.
#[rustfmt::skip]
pub static CASES: [[i8; 2]; 256] = [
    [ 0, -1], [ 1,  0], [ 1,  1], [ 2,  0], [ 1,  2], [ 3,  0], [ 2,  1], [ 5,  0],
    [ 1,  3], [ 2,  2], [ 3,  1], [ 5,  1], [ 2,  3], [ 5,  2], [ 5,  3], [ 8,  0],
    [ 1,  4], [ 2,  4], [ 3,  2], [ 5,  4], [ 4,  0], [ 6,  0], [ 6,  1], [11,  0],
    [ 3,  3], [ 5,  5], [ 7,  0], [ 9,  0], [ 6,  2], [14,  0], [12,  0], [ 5,  6],
    [ 1,  5], [ 3,  4], [ 2,  5], [ 5,  7], [ 3,  5], [ 7,  1], [ 5,  8], [ 9,  1],
    [ 4,  1], [ 6,  3], [ 6,  4], [14,  1], [ 6,  5], [12,  1], [11,  1], [ 5,  9],
    [ 2,  6], [ 5, 10], [ 5, 11], [ 8,  1], [ 6,  6], [12,  2], [14,  2], [ 5, 12],
    [ 6,  7], [11,  2], [12,  3], [ 5, 13], [10,  0], [ 6,  8], [ 6,  9], [ 2,  7],
    [ 1,  6], [ 4,  2], [ 3,  6], [ 6, 10], [ 2,  8], [ 6, 11], [ 5, 14], [14,  3],
    [ 3,  7], [ 6, 12], [ 7,  2], [12,  4], [ 5, 15], [11,  3], [ 9,  2], [ 5, 16],
    [ 3,  8], [ 6, 13], [ 7,  3], [12,  5], [ 6, 14], [10,  1], [12,  6], [ 6, 15],
    [ 7,  4], [12,  7], [13,  0], [ 7,  5], [12,  8], [ 6, 16], [ 7,  6], [ 3,  9],
    [ 2,  9], [ 6, 17], [ 5, 17], [11,  4], [ 5, 18], [12,  9], [ 8,  2], [ 5, 19],
    [ 6, 18], [10,  2], [12, 10], [ 6, 19], [14,  4], [ 6, 20], [ 5, 20], [ 2, 10],
    [ 5, 21], [14,  5], [ 9,  3], [ 5, 22], [11,  5], [ 6, 21], [ 5, 23], [ 2, 11],
    [12, 11], [ 6, 22], [ 7,  7], [ 3, 10], [ 6, 23], [ 4,  3], [ 3, 11], [ 1,  7],
    [ 1,  8], [ 3, 12], [ 4,  4], [ 6, 24], [ 3, 13], [ 7,  8], [ 6, 25], [12, 12],
    [ 2, 12], [ 5, 24], [ 6, 26], [11,  6], [ 5, 25], [ 9,  4], [14,  6], [ 5, 26],
    [ 2, 13], [ 5, 27], [ 6, 27], [14,  7], [ 6, 28], [12, 13], [10,  3], [ 6, 29],
    [ 5, 28], [ 8,  3], [12, 14], [ 5, 29], [11,  7], [ 5, 30], [ 6, 30], [ 2, 14],
    [ 3, 14], [ 7,  9], [ 6, 31], [12, 15], [ 7, 10], [13,  1], [12, 16], [ 7, 11],
    [ 6, 32], [12, 17], [10,  4], [ 6, 33], [12, 18], [ 7, 12], [ 6, 34], [ 3, 15],
    [ 5, 31], [ 9,  5], [11,  8], [ 5, 32], [12, 19], [ 7, 13], [ 6, 35], [ 3, 16],
    [14,  8], [ 5, 33], [ 6, 36], [ 2, 15], [ 6, 37], [ 3, 17], [ 4,  5], [ 1,  9],
    [ 2, 16], [ 6, 38], [ 6, 39], [10,  5], [ 5, 34], [12, 20], [11,  9], [ 6, 40],
    [ 5, 35], [14,  9], [12, 21], [ 6, 41], [ 8,  4], [ 5, 36], [ 5, 37], [ 2, 17],
    [ 5, 38], [11, 10], [12, 22], [ 6, 42], [14, 10], [ 6, 43], [ 6, 44], [ 4,  6],
    [ 9,  6], [ 5, 39], [ 7, 14], [ 3, 18], [ 5, 40], [ 2, 18], [ 3, 19], [ 1, 10],
    [ 5, 41], [12, 23], [14, 11], [ 6, 45], [ 9,  7], [ 7, 15], [ 5, 42], [ 3, 20],
    [11, 11], [ 6, 46], [ 6, 47], [ 4,  7], [ 5, 43], [ 3, 21], [ 2, 19], [ 1, 11],
    [ 8,  5], [ 5, 44], [ 5, 45], [ 2, 20], [ 5, 46], [ 3, 22], [ 2, 21], [ 1, 12],
    [ 5, 47], [ 2, 22], [ 3, 23], [ 1, 13], [ 2, 23], [ 1, 14], [ 1, 15], [ 0, -1],
];

#[rustfmt::skip]
pub static TILING1: [[i8; 3]; 16] = [
    [0, 8, 3],
    [0, 1, 9],
    [1, 2, 10],
    [2, 3, 11],
    [4, 7, 8],
    [4, 9, 5],
    [5, 10, 6],
    [6, 7, 11],
    [6, 11, 7],
    [5, 6, 10],
    [4, 5, 9],
    [4, 8, 7],
    [2, 11, 3],
    [1, 10, 2],
    [0, 9, 1],
    [0, 3, 8],
];

#[rustfmt::skip]
pub static TILING2: [[i8; 6]; 24] = [
    [1, 9, 8, 1, 8, 3],
    [0, 2, 10, 0, 10, 9],
    [0, 8, 11, 0, 11, 2],
    [1, 3, 11, 1, 11, 10],
    [0, 4, 7, 0, 7, 3],
    [0, 1, 5, 0, 5, 4],
    [5, 7, 8, 5, 8, 9],
    [5, 7, 11, 5, 11, 10],
    [1, 2, 6, 1, 6, 5],
    [4, 9, 10, 4, 10, 6],
    [4, 8, 11, 4, 11, 6],
    [2, 6, 7, 2, 7, 3],
    [2, 3, 7, 2, 7, 6],
    [4, 6, 11, 4, 11, 8],
    [4, 6, 10, 4, 10, 9],
    [1, 5, 6, 1, 6, 2],
    [5, 10, 11, 5, 11, 7],
    [5, 9, 8, 5, 8, 7],
    [0, 4, 5, 0, 5, 1],
    [0, 3, 7, 0, 7, 4],
    [1, 10, 11, 1, 11, 3],
    [0, 2, 11, 0, 11, 8],
    [0, 9, 10, 0, 10, 2],
    [1, 3, 8, 1, 8, 9],
];

/// Signed face probe for case 3.
pub static TEST3: [i8; 24] = [5, 5, 1, 4, 1, 2, 2, 3, 6, -6, -3, -4, 4, 3, 6, -6, -3, -2, -2, -1, -4, -1, -5, -5];

#[rustfmt::skip]
pub static TILING3_1: [[i8; 6]; 24] = [
    [0, 8, 3, 1, 2, 10],
    [0, 1, 9, 2, 3, 11],
    [0, 1, 9, 4, 7, 8],
    [2, 3, 11, 4, 7, 8],
    [0, 8, 3, 4, 9, 5],
    [1, 2, 10, 4, 9, 5],
    [0, 1, 9, 5, 10, 6],
    [2, 3, 11, 5, 10, 6],
    [4, 7, 8, 5, 10, 6],
    [4, 5, 9, 6, 7, 11],
    [1, 10, 2, 6, 7, 11],
    [0, 3, 8, 6, 7, 11],
    [0, 8, 3, 6, 11, 7],
    [1, 2, 10, 6, 11, 7],
    [4, 9, 5, 6, 11, 7],
    [4, 8, 7, 5, 6, 10],
    [2, 11, 3, 5, 6, 10],
    [0, 9, 1, 5, 6, 10],
    [1, 10, 2, 4, 5, 9],
    [0, 3, 8, 4, 5, 9],
    [2, 11, 3, 4, 8, 7],
    [0, 9, 1, 4, 8, 7],
    [0, 9, 1, 2, 11, 3],
    [0, 3, 8, 1, 10, 2],
];

#[rustfmt::skip]
pub static TILING3_2: [[i8; 12]; 24] = [
    [0, 8, 3, 1, 2, 10, 3, 2, 1, 3, 1, 0],
    [0, 1, 9, 2, 3, 11, 3, 2, 1, 3, 1, 0],
    [0, 1, 9, 4, 7, 8, 9, 4, 8, 0, 9, 8],
    [2, 3, 11, 4, 7, 8, 8, 7, 11, 3, 8, 11],
    [0, 8, 3, 4, 9, 5, 9, 4, 8, 0, 9, 8],
    [1, 2, 10, 4, 9, 5, 10, 5, 9, 1, 10, 9],
    [0, 1, 9, 5, 10, 6, 10, 5, 9, 1, 10, 9],
    [2, 3, 11, 5, 10, 6, 11, 6, 10, 2, 11, 10],
    [4, 7, 8, 5, 10, 6, 5, 6, 7, 4, 5, 7],
    [4, 5, 9, 6, 7, 11, 7, 6, 5, 7, 5, 4],
    [1, 10, 2, 6, 7, 11, 10, 6, 11, 10, 11, 2],
    [0, 3, 8, 6, 7, 11, 11, 7, 8, 11, 8, 3],
    [0, 8, 3, 6, 11, 7, 8, 7, 11, 3, 8, 11],
    [1, 2, 10, 6, 11, 7, 11, 6, 10, 2, 11, 10],
    [4, 9, 5, 6, 11, 7, 5, 6, 7, 4, 5, 7],
    [4, 8, 7, 5, 6, 10, 7, 6, 5, 7, 5, 4],
    [2, 11, 3, 5, 6, 10, 10, 6, 11, 10, 11, 2],
    [0, 9, 1, 5, 6, 10, 9, 5, 10, 9, 10, 1],
    [1, 10, 2, 4, 5, 9, 9, 5, 10, 9, 10, 1],
    [0, 3, 8, 4, 5, 9, 8, 4, 9, 8, 9, 0],
    [2, 11, 3, 4, 8, 7, 11, 7, 8, 11, 8, 3],
    [0, 9, 1, 4, 8, 7, 8, 4, 9, 8, 9, 0],
    [0, 9, 1, 2, 11, 3, 1, 2, 3, 0, 1, 3],
    [0, 3, 8, 1, 10, 2, 1, 2, 3, 0, 1, 3],
];

/// Interior probe polarity for case 4.
pub static TEST4: [i8; 8] = [7, 7, 7, -7, 7, -7, -7, -7];

#[rustfmt::skip]
pub static TILING4_1: [[i8; 6]; 8] = [
    [1, 2, 10, 4, 7, 8],
    [2, 3, 11, 4, 9, 5],
    [0, 8, 3, 5, 10, 6],
    [0, 9, 1, 6, 7, 11],
    [0, 1, 9, 6, 11, 7],
    [0, 3, 8, 5, 6, 10],
    [2, 11, 3, 4, 5, 9],
    [1, 10, 2, 4, 8, 7],
];

#[rustfmt::skip]
pub static TILING4_2: [[i8; 18]; 8] = [
    [1, 2, 12, 2, 10, 12, 10, 1, 12, 4, 7, 12, 7, 8, 12, 8, 4, 12],
    [2, 3, 12, 3, 11, 12, 11, 2, 12, 4, 9, 12, 9, 5, 12, 5, 4, 12],
    [0, 8, 12, 8, 3, 12, 3, 0, 12, 5, 10, 12, 10, 6, 12, 6, 5, 12],
    [0, 9, 12, 9, 1, 12, 1, 0, 12, 6, 7, 12, 7, 11, 12, 11, 6, 12],
    [0, 1, 12, 1, 9, 12, 9, 0, 12, 6, 11, 12, 11, 7, 12, 7, 6, 12],
    [0, 3, 12, 3, 8, 12, 8, 0, 12, 5, 6, 12, 6, 10, 12, 10, 5, 12],
    [2, 11, 12, 11, 3, 12, 3, 2, 12, 4, 5, 12, 5, 9, 12, 9, 4, 12],
    [1, 10, 12, 10, 2, 12, 2, 1, 12, 4, 8, 12, 8, 7, 12, 7, 4, 12],
];

#[rustfmt::skip]
pub static TILING5: [[i8; 9]; 48] = [
    [2, 10, 9, 2, 9, 8, 2, 8, 3],
    [1, 9, 8, 1, 8, 11, 1, 11, 2],
    [0, 8, 11, 0, 11, 10, 0, 10, 1],
    [0, 3, 11, 0, 11, 10, 0, 10, 9],
    [1, 9, 4, 1, 4, 7, 1, 7, 3],
    [0, 4, 7, 0, 7, 11, 0, 11, 2],
    [4, 7, 11, 4, 11, 10, 4, 10, 9],
    [1, 5, 4, 1, 4, 8, 1, 8, 3],
    [0, 2, 10, 0, 10, 5, 0, 5, 4],
    [4, 8, 11, 4, 11, 10, 4, 10, 5],
    [0, 9, 5, 0, 5, 7, 0, 7, 3],
    [0, 1, 5, 0, 5, 7, 0, 7, 8],
    [2, 10, 5, 2, 5, 7, 2, 7, 3],
    [1, 5, 7, 1, 7, 11, 1, 11, 2],
    [0, 2, 6, 0, 6, 5, 0, 5, 9],
    [1, 3, 11, 1, 11, 6, 1, 6, 5],
    [5, 9, 8, 5, 8, 11, 5, 11, 6],
    [0, 1, 10, 0, 10, 6, 0, 6, 4],
    [1, 2, 6, 1, 6, 4, 1, 4, 9],
    [2, 6, 4, 2, 4, 8, 2, 8, 3],
    [0, 3, 11, 0, 11, 6, 0, 6, 4],
    [6, 7, 8, 6, 8, 9, 6, 9, 10],
    [1, 10, 6, 1, 6, 7, 1, 7, 3],
    [0, 2, 6, 0, 6, 7, 0, 7, 8],
    [0, 8, 7, 0, 7, 6, 0, 6, 2],
    [1, 3, 7, 1, 7, 6, 1, 6, 10],
    [6, 10, 9, 6, 9, 8, 6, 8, 7],
    [0, 4, 6, 0, 6, 11, 0, 11, 3],
    [2, 3, 8, 2, 8, 4, 2, 4, 6],
    [1, 9, 4, 1, 4, 6, 1, 6, 2],
    [0, 4, 6, 0, 6, 10, 0, 10, 1],
    [5, 6, 11, 5, 11, 8, 5, 8, 9],
    [1, 5, 6, 1, 6, 11, 1, 11, 3],
    [0, 9, 5, 0, 5, 6, 0, 6, 2],
    [1, 2, 11, 1, 11, 7, 1, 7, 5],
    [2, 3, 7, 2, 7, 5, 2, 5, 10],
    [0, 8, 7, 0, 7, 5, 0, 5, 1],
    [0, 3, 7, 0, 7, 5, 0, 5, 9],
    [4, 5, 10, 4, 10, 11, 4, 11, 8],
    [0, 4, 5, 0, 5, 10, 0, 10, 2],
    [1, 3, 8, 1, 8, 4, 1, 4, 5],
    [4, 9, 10, 4, 10, 11, 4, 11, 7],
    [0, 2, 11, 0, 11, 7, 0, 7, 4],
    [1, 3, 7, 1, 7, 4, 1, 4, 9],
    [0, 9, 10, 0, 10, 11, 0, 11, 3],
    [0, 1, 10, 0, 10, 11, 0, 11, 8],
    [1, 2, 11, 1, 11, 8, 1, 8, 9],
    [2, 3, 8, 2, 8, 9, 2, 9, 10],
];

/// Face probe, interior polarity and reference edge for case 6.
#[rustfmt::skip]
pub static TEST6: [[i8; 3]; 48] = [
    [5, 7, 10],
    [1, 7, 7],
    [4, 7, 4],
    [1, 7, 5],
    [5, 7, 11],
    [2, 7, 4],
    [2, 7, 2],
    [4, 7, 2],
    [-2, -7, 0],
    [-4, -7, 0],
    [2, 7, 6],
    [5, 7, 8],
    [3, 7, 5],
    [6, 7, 10],
    [6, 7, 8],
    [-6, -7, 9],
    [-6, -7, 11],
    [1, 7, 3],
    [3, 7, 3],
    [-3, -7, 1],
    [-1, -7, 1],
    [-5, -7, 9],
    [-3, -7, 7],
    [-4, -7, 6],
    [4, 7, 6],
    [3, 7, 7],
    [5, 7, 9],
    [1, 7, 1],
    [3, 7, 1],
    [-3, -7, 3],
    [-1, -7, 3],
    [6, 7, 11],
    [6, 7, 9],
    [-6, -7, 8],
    [-6, -7, 10],
    [-3, -7, 5],
    [-5, -7, 8],
    [-2, -7, 6],
    [4, 7, 0],
    [2, 7, 0],
    [-4, -7, 2],
    [-2, -7, 2],
    [-2, -7, 4],
    [-5, -7, 11],
    [-1, -7, 5],
    [-4, -7, 4],
    [-1, -7, 7],
    [-5, -7, 10],
];

#[rustfmt::skip]
pub static TILING6_1_1: [[i8; 9]; 48] = [
    [1, 2, 10, 0, 4, 7, 0, 7, 3],
    [4, 7, 8, 0, 2, 10, 0, 10, 9],
    [4, 7, 8, 1, 3, 11, 1, 11, 10],
    [4, 9, 5, 0, 8, 11, 0, 11, 2],
    [2, 3, 11, 0, 1, 5, 0, 5, 4],
    [4, 9, 5, 1, 3, 11, 1, 11, 10],
    [1, 2, 10, 5, 7, 8, 5, 8, 9],
    [2, 3, 11, 5, 7, 8, 5, 8, 9],
    [0, 9, 1, 5, 7, 11, 5, 11, 10],
    [0, 3, 8, 5, 7, 11, 5, 11, 10],
    [5, 10, 6, 1, 9, 8, 1, 8, 3],
    [0, 8, 3, 1, 2, 6, 1, 6, 5],
    [5, 10, 6, 0, 8, 11, 0, 11, 2],
    [5, 10, 6, 0, 4, 7, 0, 7, 3],
    [4, 7, 8, 1, 2, 6, 1, 6, 5],
    [4, 5, 9, 2, 6, 7, 2, 7, 3],
    [6, 7, 11, 0, 4, 5, 0, 5, 1],
    [0, 8, 3, 4, 9, 10, 4, 10, 6],
    [2, 3, 11, 4, 9, 10, 4, 10, 6],
    [1, 10, 2, 4, 8, 11, 4, 11, 6],
    [0, 9, 1, 4, 8, 11, 4, 11, 6],
    [0, 9, 1, 2, 6, 7, 2, 7, 3],
    [6, 7, 11, 0, 9, 10, 0, 10, 2],
    [6, 7, 11, 1, 3, 8, 1, 8, 9],
    [6, 11, 7, 1, 9, 8, 1, 8, 3],
    [6, 11, 7, 0, 2, 10, 0, 10, 9],
    [0, 1, 9, 2, 3, 7, 2, 7, 6],
    [0, 1, 9, 4, 6, 11, 4, 11, 8],
    [1, 2, 10, 4, 6, 11, 4, 11, 8],
    [2, 11, 3, 4, 6, 10, 4, 10, 9],
    [0, 3, 8, 4, 6, 10, 4, 10, 9],
    [6, 11, 7, 0, 1, 5, 0, 5, 4],
    [4, 9, 5, 2, 3, 7, 2, 7, 6],
    [4, 8, 7, 1, 5, 6, 1, 6, 2],
    [5, 6, 10, 0, 3, 7, 0, 7, 4],
    [5, 6, 10, 0, 2, 11, 0, 11, 8],
    [0, 3, 8, 1, 5, 6, 1, 6, 2],
    [5, 6, 10, 1, 3, 8, 1, 8, 9],
    [0, 8, 3, 5, 10, 11, 5, 11, 7],
    [0, 1, 9, 5, 10, 11, 5, 11, 7],
    [2, 11, 3, 5, 9, 8, 5, 8, 7],
    [1, 10, 2, 5, 9, 8, 5, 8, 7],
    [4, 5, 9, 1, 10, 11, 1, 11, 3],
    [2, 11, 3, 0, 4, 5, 0, 5, 1],
    [4, 5, 9, 0, 2, 11, 0, 11, 8],
    [4, 8, 7, 1, 10, 11, 1, 11, 3],
    [4, 8, 7, 0, 9, 10, 0, 10, 2],
    [1, 10, 2, 0, 3, 7, 0, 7, 4],
];

#[rustfmt::skip]
pub static TILING6_1_2: [[i8; 21]; 48] = [
    [0, 4, 12, 4, 7, 12, 7, 3, 12, 3, 0, 12, 1, 2, 12, 2, 10, 12, 10, 1, 12],
    [0, 2, 12, 2, 10, 12, 10, 9, 12, 9, 0, 12, 4, 7, 12, 7, 8, 12, 8, 4, 12],
    [1, 3, 12, 3, 11, 12, 11, 10, 12, 10, 1, 12, 4, 7, 12, 7, 8, 12, 8, 4, 12],
    [0, 8, 12, 8, 11, 12, 11, 2, 12, 2, 0, 12, 4, 9, 12, 9, 5, 12, 5, 4, 12],
    [0, 1, 12, 1, 5, 12, 5, 4, 12, 4, 0, 12, 2, 3, 12, 3, 11, 12, 11, 2, 12],
    [1, 3, 12, 3, 11, 12, 11, 10, 12, 10, 1, 12, 4, 9, 12, 9, 5, 12, 5, 4, 12],
    [5, 7, 12, 7, 8, 12, 8, 9, 12, 9, 5, 12, 1, 2, 12, 2, 10, 12, 10, 1, 12],
    [5, 7, 12, 7, 8, 12, 8, 9, 12, 9, 5, 12, 2, 3, 12, 3, 11, 12, 11, 2, 12],
    [5, 7, 12, 7, 11, 12, 11, 10, 12, 10, 5, 12, 0, 9, 12, 9, 1, 12, 1, 0, 12],
    [5, 7, 12, 7, 11, 12, 11, 10, 12, 10, 5, 12, 0, 3, 12, 3, 8, 12, 8, 0, 12],
    [1, 9, 12, 9, 8, 12, 8, 3, 12, 3, 1, 12, 5, 10, 12, 10, 6, 12, 6, 5, 12],
    [1, 2, 12, 2, 6, 12, 6, 5, 12, 5, 1, 12, 0, 8, 12, 8, 3, 12, 3, 0, 12],
    [0, 8, 12, 8, 11, 12, 11, 2, 12, 2, 0, 12, 5, 10, 12, 10, 6, 12, 6, 5, 12],
    [0, 4, 12, 4, 7, 12, 7, 3, 12, 3, 0, 12, 5, 10, 12, 10, 6, 12, 6, 5, 12],
    [1, 2, 12, 2, 6, 12, 6, 5, 12, 5, 1, 12, 4, 7, 12, 7, 8, 12, 8, 4, 12],
    [2, 6, 12, 6, 7, 12, 7, 3, 12, 3, 2, 12, 4, 5, 12, 5, 9, 12, 9, 4, 12],
    [0, 4, 12, 4, 5, 12, 5, 1, 12, 1, 0, 12, 6, 7, 12, 7, 11, 12, 11, 6, 12],
    [4, 9, 12, 9, 10, 12, 10, 6, 12, 6, 4, 12, 0, 8, 12, 8, 3, 12, 3, 0, 12],
    [4, 9, 12, 9, 10, 12, 10, 6, 12, 6, 4, 12, 2, 3, 12, 3, 11, 12, 11, 2, 12],
    [4, 8, 12, 8, 11, 12, 11, 6, 12, 6, 4, 12, 1, 10, 12, 10, 2, 12, 2, 1, 12],
    [4, 8, 12, 8, 11, 12, 11, 6, 12, 6, 4, 12, 0, 9, 12, 9, 1, 12, 1, 0, 12],
    [2, 6, 12, 6, 7, 12, 7, 3, 12, 3, 2, 12, 0, 9, 12, 9, 1, 12, 1, 0, 12],
    [0, 9, 12, 9, 10, 12, 10, 2, 12, 2, 0, 12, 6, 7, 12, 7, 11, 12, 11, 6, 12],
    [1, 3, 12, 3, 8, 12, 8, 9, 12, 9, 1, 12, 6, 7, 12, 7, 11, 12, 11, 6, 12],
    [1, 9, 12, 9, 8, 12, 8, 3, 12, 3, 1, 12, 6, 11, 12, 11, 7, 12, 7, 6, 12],
    [0, 2, 12, 2, 10, 12, 10, 9, 12, 9, 0, 12, 6, 11, 12, 11, 7, 12, 7, 6, 12],
    [2, 3, 12, 3, 7, 12, 7, 6, 12, 6, 2, 12, 0, 1, 12, 1, 9, 12, 9, 0, 12],
    [4, 6, 12, 6, 11, 12, 11, 8, 12, 8, 4, 12, 0, 1, 12, 1, 9, 12, 9, 0, 12],
    [4, 6, 12, 6, 11, 12, 11, 8, 12, 8, 4, 12, 1, 2, 12, 2, 10, 12, 10, 1, 12],
    [4, 6, 12, 6, 10, 12, 10, 9, 12, 9, 4, 12, 2, 11, 12, 11, 3, 12, 3, 2, 12],
    [4, 6, 12, 6, 10, 12, 10, 9, 12, 9, 4, 12, 0, 3, 12, 3, 8, 12, 8, 0, 12],
    [0, 1, 12, 1, 5, 12, 5, 4, 12, 4, 0, 12, 6, 11, 12, 11, 7, 12, 7, 6, 12],
    [2, 3, 12, 3, 7, 12, 7, 6, 12, 6, 2, 12, 4, 9, 12, 9, 5, 12, 5, 4, 12],
    [1, 5, 12, 5, 6, 12, 6, 2, 12, 2, 1, 12, 4, 8, 12, 8, 7, 12, 7, 4, 12],
    [0, 3, 12, 3, 7, 12, 7, 4, 12, 4, 0, 12, 5, 6, 12, 6, 10, 12, 10, 5, 12],
    [0, 2, 12, 2, 11, 12, 11, 8, 12, 8, 0, 12, 5, 6, 12, 6, 10, 12, 10, 5, 12],
    [1, 5, 12, 5, 6, 12, 6, 2, 12, 2, 1, 12, 0, 3, 12, 3, 8, 12, 8, 0, 12],
    [1, 3, 12, 3, 8, 12, 8, 9, 12, 9, 1, 12, 5, 6, 12, 6, 10, 12, 10, 5, 12],
    [5, 10, 12, 10, 11, 12, 11, 7, 12, 7, 5, 12, 0, 8, 12, 8, 3, 12, 3, 0, 12],
    [5, 10, 12, 10, 11, 12, 11, 7, 12, 7, 5, 12, 0, 1, 12, 1, 9, 12, 9, 0, 12],
    [5, 9, 12, 9, 8, 12, 8, 7, 12, 7, 5, 12, 2, 11, 12, 11, 3, 12, 3, 2, 12],
    [5, 9, 12, 9, 8, 12, 8, 7, 12, 7, 5, 12, 1, 10, 12, 10, 2, 12, 2, 1, 12],
    [1, 10, 12, 10, 11, 12, 11, 3, 12, 3, 1, 12, 4, 5, 12, 5, 9, 12, 9, 4, 12],
    [0, 4, 12, 4, 5, 12, 5, 1, 12, 1, 0, 12, 2, 11, 12, 11, 3, 12, 3, 2, 12],
    [0, 2, 12, 2, 11, 12, 11, 8, 12, 8, 0, 12, 4, 5, 12, 5, 9, 12, 9, 4, 12],
    [1, 10, 12, 10, 11, 12, 11, 3, 12, 3, 1, 12, 4, 8, 12, 8, 7, 12, 7, 4, 12],
    [0, 9, 12, 9, 10, 12, 10, 2, 12, 2, 0, 12, 4, 8, 12, 8, 7, 12, 7, 4, 12],
    [0, 3, 12, 3, 7, 12, 7, 4, 12, 4, 0, 12, 1, 10, 12, 10, 2, 12, 2, 1, 12],
];

#[rustfmt::skip]
pub static TILING6_2: [[i8; 15]; 48] = [
    [1, 2, 10, 0, 4, 7, 0, 7, 3, 3, 2, 1, 3, 1, 0],
    [4, 7, 8, 0, 2, 10, 0, 10, 9, 9, 4, 8, 0, 9, 8],
    [4, 7, 8, 1, 3, 11, 1, 11, 10, 8, 7, 11, 3, 8, 11],
    [4, 9, 5, 0, 8, 11, 0, 11, 2, 9, 4, 8, 0, 9, 8],
    [2, 3, 11, 0, 1, 5, 0, 5, 4, 3, 2, 1, 3, 1, 0],
    [4, 9, 5, 1, 3, 11, 1, 11, 10, 10, 5, 9, 1, 10, 9],
    [1, 2, 10, 5, 7, 8, 5, 8, 9, 10, 5, 9, 1, 10, 9],
    [2, 3, 11, 5, 7, 8, 5, 8, 9, 8, 7, 11, 3, 8, 11],
    [0, 9, 1, 5, 7, 11, 5, 11, 10, 9, 5, 10, 9, 10, 1],
    [0, 3, 8, 5, 7, 11, 5, 11, 10, 11, 7, 8, 11, 8, 3],
    [5, 10, 6, 1, 9, 8, 1, 8, 3, 10, 5, 9, 1, 10, 9],
    [0, 8, 3, 1, 2, 6, 1, 6, 5, 3, 2, 1, 3, 1, 0],
    [5, 10, 6, 0, 8, 11, 0, 11, 2, 11, 6, 10, 2, 11, 10],
    [5, 10, 6, 0, 4, 7, 0, 7, 3, 5, 6, 7, 4, 5, 7],
    [4, 7, 8, 1, 2, 6, 1, 6, 5, 5, 6, 7, 4, 5, 7],
    [4, 5, 9, 2, 6, 7, 2, 7, 3, 7, 6, 5, 7, 5, 4],
    [6, 7, 11, 0, 4, 5, 0, 5, 1, 7, 6, 5, 7, 5, 4],
    [0, 8, 3, 4, 9, 10, 4, 10, 6, 9, 4, 8, 0, 9, 8],
    [2, 3, 11, 4, 9, 10, 4, 10, 6, 11, 6, 10, 2, 11, 10],
    [1, 10, 2, 4, 8, 11, 4, 11, 6, 10, 6, 11, 10, 11, 2],
    [0, 9, 1, 4, 8, 11, 4, 11, 6, 8, 4, 9, 8, 9, 0],
    [0, 9, 1, 2, 6, 7, 2, 7, 3, 1, 2, 3, 0, 1, 3],
    [6, 7, 11, 0, 9, 10, 0, 10, 2, 10, 6, 11, 10, 11, 2],
    [6, 7, 11, 1, 3, 8, 1, 8, 9, 11, 7, 8, 11, 8, 3],
    [6, 11, 7, 1, 9, 8, 1, 8, 3, 8, 7, 11, 3, 8, 11],
    [6, 11, 7, 0, 2, 10, 0, 10, 9, 11, 6, 10, 2, 11, 10],
    [0, 1, 9, 2, 3, 7, 2, 7, 6, 3, 2, 1, 3, 1, 0],
    [0, 1, 9, 4, 6, 11, 4, 11, 8, 9, 4, 8, 0, 9, 8],
    [1, 2, 10, 4, 6, 11, 4, 11, 8, 11, 6, 10, 2, 11, 10],
    [2, 11, 3, 4, 6, 10, 4, 10, 9, 10, 6, 11, 10, 11, 2],
    [0, 3, 8, 4, 6, 10, 4, 10, 9, 8, 4, 9, 8, 9, 0],
    [6, 11, 7, 0, 1, 5, 0, 5, 4, 5, 6, 7, 4, 5, 7],
    [4, 9, 5, 2, 3, 7, 2, 7, 6, 5, 6, 7, 4, 5, 7],
    [4, 8, 7, 1, 5, 6, 1, 6, 2, 7, 6, 5, 7, 5, 4],
    [5, 6, 10, 0, 3, 7, 0, 7, 4, 7, 6, 5, 7, 5, 4],
    [5, 6, 10, 0, 2, 11, 0, 11, 8, 10, 6, 11, 10, 11, 2],
    [0, 3, 8, 1, 5, 6, 1, 6, 2, 1, 2, 3, 0, 1, 3],
    [5, 6, 10, 1, 3, 8, 1, 8, 9, 9, 5, 10, 9, 10, 1],
    [0, 8, 3, 5, 10, 11, 5, 11, 7, 8, 7, 11, 3, 8, 11],
    [0, 1, 9, 5, 10, 11, 5, 11, 7, 10, 5, 9, 1, 10, 9],
    [2, 11, 3, 5, 9, 8, 5, 8, 7, 11, 7, 8, 11, 8, 3],
    [1, 10, 2, 5, 9, 8, 5, 8, 7, 9, 5, 10, 9, 10, 1],
    [4, 5, 9, 1, 10, 11, 1, 11, 3, 9, 5, 10, 9, 10, 1],
    [2, 11, 3, 0, 4, 5, 0, 5, 1, 1, 2, 3, 0, 1, 3],
    [4, 5, 9, 0, 2, 11, 0, 11, 8, 8, 4, 9, 8, 9, 0],
    [4, 8, 7, 1, 10, 11, 1, 11, 3, 11, 7, 8, 11, 8, 3],
    [4, 8, 7, 0, 9, 10, 0, 10, 2, 8, 4, 9, 8, 9, 0],
    [1, 10, 2, 0, 3, 7, 0, 7, 4, 1, 2, 3, 0, 1, 3],
];

/// Three face probes, interior polarity and reference edge for case 7.
#[rustfmt::skip]
pub static TEST7: [[i8; 5]; 16] = [
    [1, 4, 5, 7, 0],
    [1, 2, 5, 7, 0],
    [2, 3, 5, 7, 0],
    [1, 2, 6, 7, 0],
    [3, 4, 6, 7, 2],
    [-2, -3, -6, -7, 2],
    [-1, -4, -6, -7, 0],
    [-3, -4, -5, -7, 0],
    [3, 4, 5, 7, 0],
    [1, 4, 6, 7, 0],
    [2, 3, 6, 7, 2],
    [-3, -4, -6, -7, 2],
    [-1, -2, -6, -7, 0],
    [-2, -3, -5, -7, 0],
    [-1, -2, -5, -7, 0],
    [-1, -4, -5, -7, 0],
];

#[rustfmt::skip]
pub static TILING7_1: [[i8; 9]; 16] = [
    [0, 1, 9, 2, 3, 11, 4, 7, 8],
    [0, 8, 3, 1, 2, 10, 4, 9, 5],
    [0, 1, 9, 2, 3, 11, 5, 10, 6],
    [0, 1, 9, 4, 7, 8, 5, 10, 6],
    [2, 3, 11, 4, 7, 8, 5, 10, 6],
    [1, 10, 2, 4, 5, 9, 6, 7, 11],
    [0, 3, 8, 4, 5, 9, 6, 7, 11],
    [0, 3, 8, 1, 10, 2, 6, 7, 11],
    [0, 8, 3, 1, 2, 10, 6, 11, 7],
    [0, 8, 3, 4, 9, 5, 6, 11, 7],
    [1, 2, 10, 4, 9, 5, 6, 11, 7],
    [2, 11, 3, 4, 8, 7, 5, 6, 10],
    [0, 9, 1, 4, 8, 7, 5, 6, 10],
    [0, 9, 1, 2, 11, 3, 5, 6, 10],
    [0, 3, 8, 1, 10, 2, 4, 5, 9],
    [0, 9, 1, 2, 11, 3, 4, 8, 7],
];

#[rustfmt::skip]
pub static TILING7_2: [[[i8; 15]; 3]; 16] = [
    [
        [0, 1, 9, 2, 3, 11, 4, 7, 8, 9, 4, 8, 0, 9, 8],
        [0, 1, 9, 2, 3, 11, 4, 7, 8, 8, 7, 11, 3, 8, 11],
        [0, 1, 9, 2, 3, 11, 4, 7, 8, 3, 2, 1, 3, 1, 0],
    ],
    [
        [0, 8, 3, 1, 2, 10, 4, 9, 5, 9, 4, 8, 0, 9, 8],
        [0, 8, 3, 1, 2, 10, 4, 9, 5, 10, 5, 9, 1, 10, 9],
        [0, 8, 3, 1, 2, 10, 4, 9, 5, 3, 2, 1, 3, 1, 0],
    ],
    [
        [0, 1, 9, 2, 3, 11, 5, 10, 6, 10, 5, 9, 1, 10, 9],
        [0, 1, 9, 2, 3, 11, 5, 10, 6, 11, 6, 10, 2, 11, 10],
        [0, 1, 9, 2, 3, 11, 5, 10, 6, 3, 2, 1, 3, 1, 0],
    ],
    [
        [0, 1, 9, 4, 7, 8, 5, 10, 6, 9, 4, 8, 0, 9, 8],
        [0, 1, 9, 4, 7, 8, 5, 10, 6, 10, 5, 9, 1, 10, 9],
        [0, 1, 9, 4, 7, 8, 5, 10, 6, 5, 6, 7, 4, 5, 7],
    ],
    [
        [2, 3, 11, 4, 7, 8, 5, 10, 6, 11, 6, 10, 2, 11, 10],
        [2, 3, 11, 4, 7, 8, 5, 10, 6, 8, 7, 11, 3, 8, 11],
        [2, 3, 11, 4, 7, 8, 5, 10, 6, 5, 6, 7, 4, 5, 7],
    ],
    [
        [1, 10, 2, 4, 5, 9, 6, 7, 11, 9, 5, 10, 9, 10, 1],
        [1, 10, 2, 4, 5, 9, 6, 7, 11, 10, 6, 11, 10, 11, 2],
        [1, 10, 2, 4, 5, 9, 6, 7, 11, 7, 6, 5, 7, 5, 4],
    ],
    [
        [0, 3, 8, 4, 5, 9, 6, 7, 11, 8, 4, 9, 8, 9, 0],
        [0, 3, 8, 4, 5, 9, 6, 7, 11, 11, 7, 8, 11, 8, 3],
        [0, 3, 8, 4, 5, 9, 6, 7, 11, 7, 6, 5, 7, 5, 4],
    ],
    [
        [0, 3, 8, 1, 10, 2, 6, 7, 11, 10, 6, 11, 10, 11, 2],
        [0, 3, 8, 1, 10, 2, 6, 7, 11, 11, 7, 8, 11, 8, 3],
        [0, 3, 8, 1, 10, 2, 6, 7, 11, 1, 2, 3, 0, 1, 3],
    ],
    [
        [0, 8, 3, 1, 2, 10, 6, 11, 7, 11, 6, 10, 2, 11, 10],
        [0, 8, 3, 1, 2, 10, 6, 11, 7, 8, 7, 11, 3, 8, 11],
        [0, 8, 3, 1, 2, 10, 6, 11, 7, 3, 2, 1, 3, 1, 0],
    ],
    [
        [0, 8, 3, 4, 9, 5, 6, 11, 7, 9, 4, 8, 0, 9, 8],
        [0, 8, 3, 4, 9, 5, 6, 11, 7, 8, 7, 11, 3, 8, 11],
        [0, 8, 3, 4, 9, 5, 6, 11, 7, 5, 6, 7, 4, 5, 7],
    ],
    [
        [1, 2, 10, 4, 9, 5, 6, 11, 7, 10, 5, 9, 1, 10, 9],
        [1, 2, 10, 4, 9, 5, 6, 11, 7, 11, 6, 10, 2, 11, 10],
        [1, 2, 10, 4, 9, 5, 6, 11, 7, 5, 6, 7, 4, 5, 7],
    ],
    [
        [2, 11, 3, 4, 8, 7, 5, 6, 10, 10, 6, 11, 10, 11, 2],
        [2, 11, 3, 4, 8, 7, 5, 6, 10, 11, 7, 8, 11, 8, 3],
        [2, 11, 3, 4, 8, 7, 5, 6, 10, 7, 6, 5, 7, 5, 4],
    ],
    [
        [0, 9, 1, 4, 8, 7, 5, 6, 10, 8, 4, 9, 8, 9, 0],
        [0, 9, 1, 4, 8, 7, 5, 6, 10, 9, 5, 10, 9, 10, 1],
        [0, 9, 1, 4, 8, 7, 5, 6, 10, 7, 6, 5, 7, 5, 4],
    ],
    [
        [0, 9, 1, 2, 11, 3, 5, 6, 10, 9, 5, 10, 9, 10, 1],
        [0, 9, 1, 2, 11, 3, 5, 6, 10, 10, 6, 11, 10, 11, 2],
        [0, 9, 1, 2, 11, 3, 5, 6, 10, 1, 2, 3, 0, 1, 3],
    ],
    [
        [0, 3, 8, 1, 10, 2, 4, 5, 9, 8, 4, 9, 8, 9, 0],
        [0, 3, 8, 1, 10, 2, 4, 5, 9, 9, 5, 10, 9, 10, 1],
        [0, 3, 8, 1, 10, 2, 4, 5, 9, 1, 2, 3, 0, 1, 3],
    ],
    [
        [0, 9, 1, 2, 11, 3, 4, 8, 7, 8, 4, 9, 8, 9, 0],
        [0, 9, 1, 2, 11, 3, 4, 8, 7, 11, 7, 8, 11, 8, 3],
        [0, 9, 1, 2, 11, 3, 4, 8, 7, 1, 2, 3, 0, 1, 3],
    ],
];

#[rustfmt::skip]
pub static TILING7_3: [[[i8; 27]; 3]; 16] = [
    [
        [0, 1, 12, 1, 9, 12, 9, 4, 12, 4, 7, 12, 7, 11, 12, 11, 2, 12, 2, 3, 12, 3, 8, 12, 8, 0, 12],
        [0, 3, 12, 3, 11, 12, 11, 2, 12, 2, 1, 12, 1, 9, 12, 9, 4, 12, 4, 7, 12, 7, 8, 12, 8, 0, 12],
        [0, 3, 12, 3, 8, 12, 8, 4, 12, 4, 7, 12, 7, 11, 12, 11, 2, 12, 2, 1, 12, 1, 9, 12, 9, 0, 12],
    ],
    [
        [0, 9, 12, 9, 1, 12, 1, 2, 12, 2, 10, 12, 10, 5, 12, 5, 4, 12, 4, 8, 12, 8, 3, 12, 3, 0, 12],
        [0, 9, 12, 9, 5, 12, 5, 4, 12, 4, 8, 12, 8, 3, 12, 3, 2, 12, 2, 10, 12, 10, 1, 12, 1, 0, 12],
        [0, 8, 12, 8, 3, 12, 3, 2, 12, 2, 10, 12, 10, 5, 12, 5, 4, 12, 4, 9, 12, 9, 1, 12, 1, 0, 12],
    ],
    [
        [0, 1, 12, 1, 10, 12, 10, 2, 12, 2, 3, 12, 3, 11, 12, 11, 6, 12, 6, 5, 12, 5, 9, 12, 9, 0, 12],
        [0, 3, 12, 3, 11, 12, 11, 2, 12, 2, 1, 12, 1, 10, 12, 10, 6, 12, 6, 5, 12, 5, 9, 12, 9, 0, 12],
        [0, 3, 12, 3, 11, 12, 11, 6, 12, 6, 5, 12, 5, 10, 12, 10, 2, 12, 2, 1, 12, 1, 9, 12, 9, 0, 12],
    ],
    [
        [0, 1, 12, 1, 10, 12, 10, 6, 12, 6, 5, 12, 5, 9, 12, 9, 4, 12, 4, 7, 12, 7, 8, 12, 8, 0, 12],
        [0, 1, 12, 1, 9, 12, 9, 4, 12, 4, 5, 12, 5, 10, 12, 10, 6, 12, 6, 7, 12, 7, 8, 12, 8, 0, 12],
        [0, 1, 12, 1, 10, 12, 10, 6, 12, 6, 7, 12, 7, 8, 12, 8, 4, 12, 4, 5, 12, 5, 9, 12, 9, 0, 12],
    ],
    [
        [2, 3, 12, 3, 8, 12, 8, 4, 12, 4, 7, 12, 7, 11, 12, 11, 6, 12, 6, 5, 12, 5, 10, 12, 10, 2, 12],
        [2, 3, 12, 3, 11, 12, 11, 6, 12, 6, 7, 12, 7, 8, 12, 8, 4, 12, 4, 5, 12, 5, 10, 12, 10, 2, 12],
        [2, 3, 12, 3, 8, 12, 8, 4, 12, 4, 5, 12, 5, 10, 12, 10, 6, 12, 6, 7, 12, 7, 11, 12, 11, 2, 12],
    ],
    [
        [1, 9, 12, 9, 4, 12, 4, 5, 12, 5, 10, 12, 10, 6, 12, 6, 7, 12, 7, 11, 12, 11, 2, 12, 2, 1, 12],
        [1, 9, 12, 9, 4, 12, 4, 7, 12, 7, 11, 12, 11, 6, 12, 6, 5, 12, 5, 10, 12, 10, 2, 12, 2, 1, 12],
        [1, 10, 12, 10, 6, 12, 6, 5, 12, 5, 9, 12, 9, 4, 12, 4, 7, 12, 7, 11, 12, 11, 2, 12, 2, 1, 12],
    ],
    [
        [0, 3, 12, 3, 11, 12, 11, 6, 12, 6, 7, 12, 7, 8, 12, 8, 4, 12, 4, 5, 12, 5, 9, 12, 9, 0, 12],
        [0, 3, 12, 3, 8, 12, 8, 4, 12, 4, 7, 12, 7, 11, 12, 11, 6, 12, 6, 5, 12, 5, 9, 12, 9, 0, 12],
        [0, 3, 12, 3, 11, 12, 11, 6, 12, 6, 5, 12, 5, 9, 12, 9, 4, 12, 4, 7, 12, 7, 8, 12, 8, 0, 12],
    ],
    [
        [0, 3, 12, 3, 11, 12, 11, 2, 12, 2, 1, 12, 1, 10, 12, 10, 6, 12, 6, 7, 12, 7, 8, 12, 8, 0, 12],
        [0, 1, 12, 1, 10, 12, 10, 6, 12, 6, 7, 12, 7, 11, 12, 11, 2, 12, 2, 3, 12, 3, 8, 12, 8, 0, 12],
        [0, 1, 12, 1, 10, 12, 10, 2, 12, 2, 3, 12, 3, 11, 12, 11, 6, 12, 6, 7, 12, 7, 8, 12, 8, 0, 12],
    ],
    [
        [0, 8, 12, 8, 7, 12, 7, 6, 12, 6, 10, 12, 10, 1, 12, 1, 2, 12, 2, 11, 12, 11, 3, 12, 3, 0, 12],
        [0, 8, 12, 8, 3, 12, 3, 2, 12, 2, 11, 12, 11, 7, 12, 7, 6, 12, 6, 10, 12, 10, 1, 12, 1, 0, 12],
        [0, 8, 12, 8, 7, 12, 7, 6, 12, 6, 11, 12, 11, 3, 12, 3, 2, 12, 2, 10, 12, 10, 1, 12, 1, 0, 12],
    ],
    [
        [0, 9, 12, 9, 5, 12, 5, 4, 12, 4, 8, 12, 8, 7, 12, 7, 6, 12, 6, 11, 12, 11, 3, 12, 3, 0, 12],
        [0, 9, 12, 9, 5, 12, 5, 6, 12, 6, 11, 12, 11, 7, 12, 7, 4, 12, 4, 8, 12, 8, 3, 12, 3, 0, 12],
        [0, 8, 12, 8, 7, 12, 7, 4, 12, 4, 9, 12, 9, 5, 12, 5, 6, 12, 6, 11, 12, 11, 3, 12, 3, 0, 12],
    ],
    [
        [1, 2, 12, 2, 11, 12, 11, 7, 12, 7, 6, 12, 6, 10, 12, 10, 5, 12, 5, 4, 12, 4, 9, 12, 9, 1, 12],
        [1, 2, 12, 2, 10, 12, 10, 5, 12, 5, 6, 12, 6, 11, 12, 11, 7, 12, 7, 4, 12, 4, 9, 12, 9, 1, 12],
        [1, 2, 12, 2, 11, 12, 11, 7, 12, 7, 4, 12, 4, 9, 12, 9, 5, 12, 5, 6, 12, 6, 10, 12, 10, 1, 12],
    ],
    [
        [2, 10, 12, 10, 5, 12, 5, 6, 12, 6, 11, 12, 11, 7, 12, 7, 4, 12, 4, 8, 12, 8, 3, 12, 3, 2, 12],
        [2, 10, 12, 10, 5, 12, 5, 4, 12, 4, 8, 12, 8, 7, 12, 7, 6, 12, 6, 11, 12, 11, 3, 12, 3, 2, 12],
        [2, 11, 12, 11, 7, 12, 7, 6, 12, 6, 10, 12, 10, 5, 12, 5, 4, 12, 4, 8, 12, 8, 3, 12, 3, 2, 12],
    ],
    [
        [0, 8, 12, 8, 7, 12, 7, 4, 12, 4, 9, 12, 9, 5, 12, 5, 6, 12, 6, 10, 12, 10, 1, 12, 1, 0, 12],
        [0, 8, 12, 8, 7, 12, 7, 6, 12, 6, 10, 12, 10, 5, 12, 5, 4, 12, 4, 9, 12, 9, 1, 12, 1, 0, 12],
        [0, 9, 12, 9, 5, 12, 5, 4, 12, 4, 8, 12, 8, 7, 12, 7, 6, 12, 6, 10, 12, 10, 1, 12, 1, 0, 12],
    ],
    [
        [0, 9, 12, 9, 5, 12, 5, 6, 12, 6, 11, 12, 11, 3, 12, 3, 2, 12, 2, 10, 12, 10, 1, 12, 1, 0, 12],
        [0, 9, 12, 9, 5, 12, 5, 6, 12, 6, 10, 12, 10, 1, 12, 1, 2, 12, 2, 11, 12, 11, 3, 12, 3, 0, 12],
        [0, 9, 12, 9, 1, 12, 1, 2, 12, 2, 10, 12, 10, 5, 12, 5, 6, 12, 6, 11, 12, 11, 3, 12, 3, 0, 12],
    ],
    [
        [0, 3, 12, 3, 8, 12, 8, 4, 12, 4, 5, 12, 5, 10, 12, 10, 2, 12, 2, 1, 12, 1, 9, 12, 9, 0, 12],
        [0, 1, 12, 1, 10, 12, 10, 2, 12, 2, 3, 12, 3, 8, 12, 8, 4, 12, 4, 5, 12, 5, 9, 12, 9, 0, 12],
        [0, 1, 12, 1, 9, 12, 9, 4, 12, 4, 5, 12, 5, 10, 12, 10, 2, 12, 2, 3, 12, 3, 8, 12, 8, 0, 12],
    ],
    [
        [0, 8, 12, 8, 3, 12, 3, 2, 12, 2, 11, 12, 11, 7, 12, 7, 4, 12, 4, 9, 12, 9, 1, 12, 1, 0, 12],
        [0, 8, 12, 8, 7, 12, 7, 4, 12, 4, 9, 12, 9, 1, 12, 1, 2, 12, 2, 11, 12, 11, 3, 12, 3, 0, 12],
        [0, 9, 12, 9, 1, 12, 1, 2, 12, 2, 11, 12, 11, 7, 12, 7, 4, 12, 4, 8, 12, 8, 3, 12, 3, 0, 12],
    ],
];

#[rustfmt::skip]
pub static TILING7_4_1: [[i8; 15]; 16] = [
    [0, 3, 8, 1, 9, 4, 1, 4, 7, 1, 7, 11, 1, 11, 2],
    [0, 9, 1, 2, 10, 5, 2, 5, 4, 2, 4, 8, 2, 8, 3],
    [1, 10, 2, 0, 3, 11, 0, 11, 6, 0, 6, 5, 0, 5, 9],
    [4, 5, 9, 0, 1, 10, 0, 10, 6, 0, 6, 7, 0, 7, 8],
    [6, 7, 11, 2, 3, 8, 2, 8, 4, 2, 4, 5, 2, 5, 10],
    [5, 10, 6, 1, 9, 4, 1, 4, 7, 1, 7, 11, 1, 11, 2],
    [4, 7, 8, 0, 3, 11, 0, 11, 6, 0, 6, 5, 0, 5, 9],
    [2, 3, 11, 0, 1, 10, 0, 10, 6, 0, 6, 7, 0, 7, 8],
    [2, 11, 3, 0, 8, 7, 0, 7, 6, 0, 6, 10, 0, 10, 1],
    [4, 8, 7, 0, 9, 5, 0, 5, 6, 0, 6, 11, 0, 11, 3],
    [5, 6, 10, 1, 2, 11, 1, 11, 7, 1, 7, 4, 1, 4, 9],
    [6, 11, 7, 2, 10, 5, 2, 5, 4, 2, 4, 8, 2, 8, 3],
    [4, 9, 5, 0, 8, 7, 0, 7, 6, 0, 6, 10, 0, 10, 1],
    [1, 2, 10, 0, 9, 5, 0, 5, 6, 0, 6, 11, 0, 11, 3],
    [0, 1, 9, 2, 3, 8, 2, 8, 4, 2, 4, 5, 2, 5, 10],
    [0, 8, 3, 1, 2, 11, 1, 11, 7, 1, 7, 4, 1, 4, 9],
];

#[rustfmt::skip]
pub static TILING7_4_2: [[i8; 27]; 16] = [
    [1, 9, 12, 9, 4, 12, 4, 7, 12, 7, 11, 12, 11, 2, 12, 2, 1, 12, 0, 3, 12, 3, 8, 12, 8, 0, 12],
    [2, 10, 12, 10, 5, 12, 5, 4, 12, 4, 8, 12, 8, 3, 12, 3, 2, 12, 0, 9, 12, 9, 1, 12, 1, 0, 12],
    [0, 3, 12, 3, 11, 12, 11, 6, 12, 6, 5, 12, 5, 9, 12, 9, 0, 12, 1, 10, 12, 10, 2, 12, 2, 1, 12],
    [0, 1, 12, 1, 10, 12, 10, 6, 12, 6, 7, 12, 7, 8, 12, 8, 0, 12, 4, 5, 12, 5, 9, 12, 9, 4, 12],
    [2, 3, 12, 3, 8, 12, 8, 4, 12, 4, 5, 12, 5, 10, 12, 10, 2, 12, 6, 7, 12, 7, 11, 12, 11, 6, 12],
    [1, 9, 12, 9, 4, 12, 4, 7, 12, 7, 11, 12, 11, 2, 12, 2, 1, 12, 5, 10, 12, 10, 6, 12, 6, 5, 12],
    [0, 3, 12, 3, 11, 12, 11, 6, 12, 6, 5, 12, 5, 9, 12, 9, 0, 12, 4, 7, 12, 7, 8, 12, 8, 4, 12],
    [0, 1, 12, 1, 10, 12, 10, 6, 12, 6, 7, 12, 7, 8, 12, 8, 0, 12, 2, 3, 12, 3, 11, 12, 11, 2, 12],
    [0, 8, 12, 8, 7, 12, 7, 6, 12, 6, 10, 12, 10, 1, 12, 1, 0, 12, 2, 11, 12, 11, 3, 12, 3, 2, 12],
    [0, 9, 12, 9, 5, 12, 5, 6, 12, 6, 11, 12, 11, 3, 12, 3, 0, 12, 4, 8, 12, 8, 7, 12, 7, 4, 12],
    [1, 2, 12, 2, 11, 12, 11, 7, 12, 7, 4, 12, 4, 9, 12, 9, 1, 12, 5, 6, 12, 6, 10, 12, 10, 5, 12],
    [2, 10, 12, 10, 5, 12, 5, 4, 12, 4, 8, 12, 8, 3, 12, 3, 2, 12, 6, 11, 12, 11, 7, 12, 7, 6, 12],
    [0, 8, 12, 8, 7, 12, 7, 6, 12, 6, 10, 12, 10, 1, 12, 1, 0, 12, 4, 9, 12, 9, 5, 12, 5, 4, 12],
    [0, 9, 12, 9, 5, 12, 5, 6, 12, 6, 11, 12, 11, 3, 12, 3, 0, 12, 1, 2, 12, 2, 10, 12, 10, 1, 12],
    [2, 3, 12, 3, 8, 12, 8, 4, 12, 4, 5, 12, 5, 10, 12, 10, 2, 12, 0, 1, 12, 1, 9, 12, 9, 0, 12],
    [1, 2, 12, 2, 11, 12, 11, 7, 12, 7, 4, 12, 4, 9, 12, 9, 1, 12, 0, 8, 12, 8, 3, 12, 3, 0, 12],
];

#[rustfmt::skip]
pub static TILING8: [[i8; 6]; 6] = [
    [8, 11, 10, 8, 10, 9],
    [1, 5, 7, 1, 7, 3],
    [0, 2, 6, 0, 6, 4],
    [0, 4, 6, 0, 6, 2],
    [1, 3, 7, 1, 7, 5],
    [8, 9, 10, 8, 10, 11],
];

#[rustfmt::skip]
pub static TILING9: [[i8; 12]; 8] = [
    [1, 9, 4, 1, 4, 7, 1, 7, 11, 1, 11, 2],
    [2, 10, 5, 2, 5, 4, 2, 4, 8, 2, 8, 3],
    [0, 3, 11, 0, 11, 6, 0, 6, 5, 0, 5, 9],
    [0, 1, 10, 0, 10, 6, 0, 6, 7, 0, 7, 8],
    [0, 8, 7, 0, 7, 6, 0, 6, 10, 0, 10, 1],
    [0, 9, 5, 0, 5, 6, 0, 6, 11, 0, 11, 3],
    [2, 3, 8, 2, 8, 4, 2, 4, 5, 2, 5, 10],
    [1, 2, 11, 1, 11, 7, 1, 7, 4, 1, 4, 9],
];

/// Two face probes and interior polarity for case 10.
#[rustfmt::skip]
pub static TEST10: [[i8; 3]; 6] = [
    [2, 4, 7],
    [5, 6, 7],
    [1, 3, 7],
    [1, 3, -7],
    [5, 6, -7],
    [2, 4, -7],
];

#[rustfmt::skip]
pub static TILING10_1_1: [[i8; 12]; 6] = [
    [1, 3, 11, 1, 11, 10, 5, 7, 8, 5, 8, 9],
    [0, 4, 7, 0, 7, 3, 1, 2, 6, 1, 6, 5],
    [0, 8, 11, 0, 11, 2, 4, 9, 10, 4, 10, 6],
    [0, 2, 10, 0, 10, 9, 4, 6, 11, 4, 11, 8],
    [0, 1, 5, 0, 5, 4, 2, 3, 7, 2, 7, 6],
    [1, 9, 8, 1, 8, 3, 5, 10, 11, 5, 11, 7],
];

#[rustfmt::skip]
pub static TILING10_1_1_: [[i8; 12]; 6] = [
    [1, 3, 8, 1, 8, 9, 5, 7, 11, 5, 11, 10],
    [0, 4, 5, 0, 5, 1, 2, 6, 7, 2, 7, 3],
    [0, 9, 10, 0, 10, 2, 4, 8, 11, 4, 11, 6],
    [0, 2, 11, 0, 11, 8, 4, 6, 10, 4, 10, 9],
    [0, 3, 7, 0, 7, 4, 1, 5, 6, 1, 6, 2],
    [1, 10, 11, 1, 11, 3, 5, 9, 8, 5, 8, 7],
];

#[rustfmt::skip]
pub static TILING10_1_2: [[i8; 24]; 6] = [
    [1, 3, 12, 3, 11, 12, 11, 10, 12, 10, 1, 12, 5, 7, 12, 7, 8, 12, 8, 9, 12, 9, 5, 12],
    [0, 4, 12, 4, 7, 12, 7, 3, 12, 3, 0, 12, 1, 2, 12, 2, 6, 12, 6, 5, 12, 5, 1, 12],
    [0, 8, 12, 8, 11, 12, 11, 2, 12, 2, 0, 12, 4, 9, 12, 9, 10, 12, 10, 6, 12, 6, 4, 12],
    [0, 2, 12, 2, 10, 12, 10, 9, 12, 9, 0, 12, 4, 6, 12, 6, 11, 12, 11, 8, 12, 8, 4, 12],
    [0, 1, 12, 1, 5, 12, 5, 4, 12, 4, 0, 12, 2, 3, 12, 3, 7, 12, 7, 6, 12, 6, 2, 12],
    [1, 9, 12, 9, 8, 12, 8, 3, 12, 3, 1, 12, 5, 10, 12, 10, 11, 12, 11, 7, 12, 7, 5, 12],
];

#[rustfmt::skip]
pub static TILING10_2: [[i8; 24]; 6] = [
    [1, 9, 12, 9, 8, 12, 8, 7, 12, 7, 5, 12, 5, 10, 12, 10, 11, 12, 11, 3, 12, 3, 1, 12],
    [0, 4, 12, 4, 7, 12, 7, 3, 12, 3, 2, 12, 2, 6, 12, 6, 5, 12, 5, 1, 12, 1, 0, 12],
    [0, 9, 12, 9, 10, 12, 10, 6, 12, 6, 4, 12, 4, 8, 12, 8, 11, 12, 11, 2, 12, 2, 0, 12],
    [0, 8, 12, 8, 11, 12, 11, 6, 12, 6, 4, 12, 4, 9, 12, 9, 10, 12, 10, 2, 12, 2, 0, 12],
    [0, 4, 12, 4, 5, 12, 5, 1, 12, 1, 2, 12, 2, 6, 12, 6, 7, 12, 7, 3, 12, 3, 0, 12],
    [1, 10, 12, 10, 11, 12, 11, 7, 12, 7, 5, 12, 5, 9, 12, 9, 8, 12, 8, 3, 12, 3, 1, 12],
];

#[rustfmt::skip]
pub static TILING10_2_: [[i8; 24]; 6] = [
    [1, 10, 12, 10, 11, 12, 11, 7, 12, 7, 5, 12, 5, 9, 12, 9, 8, 12, 8, 3, 12, 3, 1, 12],
    [0, 4, 12, 4, 5, 12, 5, 1, 12, 1, 2, 12, 2, 6, 12, 6, 7, 12, 7, 3, 12, 3, 0, 12],
    [0, 8, 12, 8, 11, 12, 11, 6, 12, 6, 4, 12, 4, 9, 12, 9, 10, 12, 10, 2, 12, 2, 0, 12],
    [0, 9, 12, 9, 10, 12, 10, 6, 12, 6, 4, 12, 4, 8, 12, 8, 11, 12, 11, 2, 12, 2, 0, 12],
    [0, 4, 12, 4, 7, 12, 7, 3, 12, 3, 2, 12, 2, 6, 12, 6, 5, 12, 5, 1, 12, 1, 0, 12],
    [1, 9, 12, 9, 8, 12, 8, 7, 12, 7, 5, 12, 5, 10, 12, 10, 11, 12, 11, 3, 12, 3, 1, 12],
];

#[rustfmt::skip]
pub static TILING11: [[i8; 12]; 12] = [
    [2, 10, 9, 2, 9, 4, 2, 4, 7, 2, 7, 3],
    [0, 3, 11, 0, 11, 10, 0, 10, 5, 0, 5, 4],
    [0, 9, 5, 0, 5, 7, 0, 7, 11, 0, 11, 2],
    [0, 8, 11, 0, 11, 6, 0, 6, 5, 0, 5, 1],
    [1, 10, 6, 1, 6, 4, 1, 4, 8, 1, 8, 3],
    [1, 2, 6, 1, 6, 7, 1, 7, 8, 1, 8, 9],
    [1, 9, 8, 1, 8, 7, 1, 7, 6, 1, 6, 2],
    [1, 3, 8, 1, 8, 4, 1, 4, 6, 1, 6, 10],
    [0, 1, 5, 0, 5, 6, 0, 6, 11, 0, 11, 8],
    [0, 2, 11, 0, 11, 7, 0, 7, 5, 0, 5, 9],
    [0, 4, 5, 0, 5, 10, 0, 10, 11, 0, 11, 3],
    [2, 3, 7, 2, 7, 4, 2, 4, 9, 2, 9, 10],
];

/// Two face probes, interior polarity and reference edge for case 12.
#[rustfmt::skip]
pub static TEST12: [[i8; 4]; 24] = [
    [1, 4, 7, 8],
    [1, 2, 7, 9],
    [2, 5, 7, 1],
    [4, 5, 7, 3],
    [2, 3, 7, 10],
    [2, 6, 7, 5],
    [1, 6, 7, 4],
    [3, 6, 7, 6],
    [4, 6, 7, 7],
    [1, 5, 7, 0],
    [3, 5, 7, 2],
    [3, 4, 7, 11],
    [3, 4, -7, 11],
    [3, 5, -7, 2],
    [1, 5, -7, 0],
    [4, 6, -7, 7],
    [3, 6, -7, 6],
    [1, 6, -7, 4],
    [2, 6, -7, 5],
    [2, 3, -7, 10],
    [4, 5, -7, 3],
    [2, 5, -7, 1],
    [1, 2, -7, 9],
    [1, 4, -7, 8],
];

#[rustfmt::skip]
pub static TILING12_1_1: [[i8; 12]; 24] = [
    [4, 7, 8, 0, 3, 11, 0, 11, 10, 0, 10, 9],
    [4, 9, 5, 0, 8, 11, 0, 11, 10, 0, 10, 1],
    [1, 2, 10, 0, 9, 5, 0, 5, 7, 0, 7, 3],
    [2, 3, 11, 0, 1, 5, 0, 5, 7, 0, 7, 8],
    [5, 10, 6, 1, 9, 8, 1, 8, 11, 1, 11, 2],
    [5, 10, 6, 1, 9, 4, 1, 4, 7, 1, 7, 3],
    [4, 7, 8, 0, 2, 6, 0, 6, 5, 0, 5, 9],
    [5, 10, 6, 0, 4, 7, 0, 7, 11, 0, 11, 2],
    [4, 7, 8, 1, 3, 11, 1, 11, 6, 1, 6, 5],
    [0, 8, 3, 1, 2, 6, 1, 6, 4, 1, 4, 9],
    [2, 3, 11, 0, 1, 10, 0, 10, 6, 0, 6, 4],
    [2, 3, 11, 6, 7, 8, 6, 8, 9, 6, 9, 10],
    [6, 11, 7, 2, 10, 9, 2, 9, 8, 2, 8, 3],
    [1, 2, 10, 0, 4, 6, 0, 6, 11, 0, 11, 3],
    [0, 1, 9, 2, 3, 8, 2, 8, 4, 2, 4, 6],
    [6, 11, 7, 1, 5, 4, 1, 4, 8, 1, 8, 3],
    [6, 11, 7, 0, 2, 10, 0, 10, 5, 0, 5, 4],
    [4, 9, 5, 0, 8, 7, 0, 7, 6, 0, 6, 2],
    [4, 9, 5, 1, 3, 7, 1, 7, 6, 1, 6, 10],
    [1, 2, 10, 5, 6, 11, 5, 11, 8, 5, 8, 9],
    [0, 8, 3, 1, 2, 11, 1, 11, 7, 1, 7, 5],
    [0, 1, 9, 2, 3, 7, 2, 7, 5, 2, 5, 10],
    [0, 1, 9, 4, 5, 10, 4, 10, 11, 4, 11, 8],
    [0, 8, 3, 4, 9, 10, 4, 10, 11, 4, 11, 7],
];

#[rustfmt::skip]
pub static TILING12_1_1_: [[i8; 12]; 24] = [
    [0, 3, 8, 4, 7, 11, 4, 11, 10, 4, 10, 9],
    [0, 9, 1, 4, 8, 11, 4, 11, 10, 4, 10, 5],
    [0, 9, 1, 2, 10, 5, 2, 5, 7, 2, 7, 3],
    [0, 3, 8, 1, 5, 7, 1, 7, 11, 1, 11, 2],
    [1, 10, 2, 5, 9, 8, 5, 8, 11, 5, 11, 6],
    [1, 10, 6, 1, 6, 7, 1, 7, 3, 4, 5, 9],
    [0, 2, 6, 0, 6, 7, 0, 7, 8, 4, 5, 9],
    [0, 4, 5, 0, 5, 10, 0, 10, 2, 6, 7, 11],
    [1, 3, 8, 1, 8, 4, 1, 4, 5, 6, 7, 11],
    [0, 9, 1, 2, 6, 4, 2, 4, 8, 2, 8, 3],
    [0, 3, 11, 0, 11, 6, 0, 6, 4, 1, 10, 2],
    [2, 3, 8, 2, 8, 9, 2, 9, 10, 6, 7, 11],
    [2, 11, 3, 6, 10, 9, 6, 9, 8, 6, 8, 7],
    [0, 4, 6, 0, 6, 10, 0, 10, 1, 2, 11, 3],
    [0, 3, 8, 1, 9, 4, 1, 4, 6, 1, 6, 2],
    [1, 5, 6, 1, 6, 11, 1, 11, 3, 4, 8, 7],
    [0, 2, 11, 0, 11, 7, 0, 7, 4, 5, 6, 10],
    [0, 9, 5, 0, 5, 6, 0, 6, 2, 4, 8, 7],
    [1, 3, 7, 1, 7, 4, 1, 4, 9, 5, 6, 10],
    [1, 2, 11, 1, 11, 8, 1, 8, 9, 5, 6, 10],
    [0, 8, 7, 0, 7, 5, 0, 5, 1, 2, 11, 3],
    [0, 3, 7, 0, 7, 5, 0, 5, 9, 1, 10, 2],
    [0, 1, 10, 0, 10, 11, 0, 11, 8, 4, 5, 9],
    [0, 9, 10, 0, 10, 11, 0, 11, 3, 4, 8, 7],
];

#[rustfmt::skip]
pub static TILING12_1_2: [[i8; 24]; 24] = [
    [0, 3, 12, 3, 11, 12, 11, 10, 12, 10, 9, 12, 9, 0, 12, 4, 7, 12, 7, 8, 12, 8, 4, 12],
    [0, 8, 12, 8, 11, 12, 11, 10, 12, 10, 1, 12, 1, 0, 12, 4, 9, 12, 9, 5, 12, 5, 4, 12],
    [0, 9, 12, 9, 5, 12, 5, 7, 12, 7, 3, 12, 3, 0, 12, 1, 2, 12, 2, 10, 12, 10, 1, 12],
    [0, 1, 12, 1, 5, 12, 5, 7, 12, 7, 8, 12, 8, 0, 12, 2, 3, 12, 3, 11, 12, 11, 2, 12],
    [1, 9, 12, 9, 8, 12, 8, 11, 12, 11, 2, 12, 2, 1, 12, 5, 10, 12, 10, 6, 12, 6, 5, 12],
    [1, 9, 12, 9, 4, 12, 4, 7, 12, 7, 3, 12, 3, 1, 12, 5, 10, 12, 10, 6, 12, 6, 5, 12],
    [0, 2, 12, 2, 6, 12, 6, 5, 12, 5, 9, 12, 9, 0, 12, 4, 7, 12, 7, 8, 12, 8, 4, 12],
    [0, 4, 12, 4, 7, 12, 7, 11, 12, 11, 2, 12, 2, 0, 12, 5, 10, 12, 10, 6, 12, 6, 5, 12],
    [1, 3, 12, 3, 11, 12, 11, 6, 12, 6, 5, 12, 5, 1, 12, 4, 7, 12, 7, 8, 12, 8, 4, 12],
    [1, 2, 12, 2, 6, 12, 6, 4, 12, 4, 9, 12, 9, 1, 12, 0, 8, 12, 8, 3, 12, 3, 0, 12],
    [0, 1, 12, 1, 10, 12, 10, 6, 12, 6, 4, 12, 4, 0, 12, 2, 3, 12, 3, 11, 12, 11, 2, 12],
    [6, 7, 12, 7, 8, 12, 8, 9, 12, 9, 10, 12, 10, 6, 12, 2, 3, 12, 3, 11, 12, 11, 2, 12],
    [2, 10, 12, 10, 9, 12, 9, 8, 12, 8, 3, 12, 3, 2, 12, 6, 11, 12, 11, 7, 12, 7, 6, 12],
    [0, 4, 12, 4, 6, 12, 6, 11, 12, 11, 3, 12, 3, 0, 12, 1, 2, 12, 2, 10, 12, 10, 1, 12],
    [2, 3, 12, 3, 8, 12, 8, 4, 12, 4, 6, 12, 6, 2, 12, 0, 1, 12, 1, 9, 12, 9, 0, 12],
    [1, 5, 12, 5, 4, 12, 4, 8, 12, 8, 3, 12, 3, 1, 12, 6, 11, 12, 11, 7, 12, 7, 6, 12],
    [0, 2, 12, 2, 10, 12, 10, 5, 12, 5, 4, 12, 4, 0, 12, 6, 11, 12, 11, 7, 12, 7, 6, 12],
    [0, 8, 12, 8, 7, 12, 7, 6, 12, 6, 2, 12, 2, 0, 12, 4, 9, 12, 9, 5, 12, 5, 4, 12],
    [1, 3, 12, 3, 7, 12, 7, 6, 12, 6, 10, 12, 10, 1, 12, 4, 9, 12, 9, 5, 12, 5, 4, 12],
    [5, 6, 12, 6, 11, 12, 11, 8, 12, 8, 9, 12, 9, 5, 12, 1, 2, 12, 2, 10, 12, 10, 1, 12],
    [1, 2, 12, 2, 11, 12, 11, 7, 12, 7, 5, 12, 5, 1, 12, 0, 8, 12, 8, 3, 12, 3, 0, 12],
    [2, 3, 12, 3, 7, 12, 7, 5, 12, 5, 10, 12, 10, 2, 12, 0, 1, 12, 1, 9, 12, 9, 0, 12],
    [4, 5, 12, 5, 10, 12, 10, 11, 12, 11, 8, 12, 8, 4, 12, 0, 1, 12, 1, 9, 12, 9, 0, 12],
    [4, 9, 12, 9, 10, 12, 10, 11, 12, 11, 7, 12, 7, 4, 12, 0, 8, 12, 8, 3, 12, 3, 0, 12],
];

#[rustfmt::skip]
pub static TILING12_2: [[i8; 24]; 24] = [
    [0, 3, 12, 3, 11, 12, 11, 10, 12, 10, 9, 12, 9, 4, 12, 4, 7, 12, 7, 8, 12, 8, 0, 12],
    [0, 9, 12, 9, 5, 12, 5, 4, 12, 4, 8, 12, 8, 11, 12, 11, 10, 12, 10, 1, 12, 1, 0, 12],
    [0, 9, 12, 9, 1, 12, 1, 2, 12, 2, 10, 12, 10, 5, 12, 5, 7, 12, 7, 3, 12, 3, 0, 12],
    [0, 1, 12, 1, 5, 12, 5, 7, 12, 7, 11, 12, 11, 2, 12, 2, 3, 12, 3, 8, 12, 8, 0, 12],
    [1, 10, 12, 10, 6, 12, 6, 5, 12, 5, 9, 12, 9, 8, 12, 8, 11, 12, 11, 2, 12, 2, 1, 12],
    [1, 10, 12, 10, 6, 12, 6, 5, 12, 5, 9, 12, 9, 4, 12, 4, 7, 12, 7, 3, 12, 3, 1, 12],
    [0, 2, 12, 2, 6, 12, 6, 5, 12, 5, 9, 12, 9, 4, 12, 4, 7, 12, 7, 8, 12, 8, 0, 12],
    [0, 4, 12, 4, 7, 12, 7, 11, 12, 11, 6, 12, 6, 5, 12, 5, 10, 12, 10, 2, 12, 2, 0, 12],
    [1, 3, 12, 3, 8, 12, 8, 4, 12, 4, 7, 12, 7, 11, 12, 11, 6, 12, 6, 5, 12, 5, 1, 12],
    [0, 9, 12, 9, 1, 12, 1, 2, 12, 2, 6, 12, 6, 4, 12, 4, 8, 12, 8, 3, 12, 3, 0, 12],
    [0, 1, 12, 1, 10, 12, 10, 2, 12, 2, 3, 12, 3, 11, 12, 11, 6, 12, 6, 4, 12, 4, 0, 12],
    [2, 3, 12, 3, 11, 12, 11, 6, 12, 6, 7, 12, 7, 8, 12, 8, 9, 12, 9, 10, 12, 10, 2, 12],
    [2, 11, 12, 11, 7, 12, 7, 6, 12, 6, 10, 12, 10, 9, 12, 9, 8, 12, 8, 3, 12, 3, 2, 12],
    [0, 4, 12, 4, 6, 12, 6, 10, 12, 10, 1, 12, 1, 2, 12, 2, 11, 12, 11, 3, 12, 3, 0, 12],
    [0, 1, 12, 1, 9, 12, 9, 4, 12, 4, 6, 12, 6, 2, 12, 2, 3, 12, 3, 8, 12, 8, 0, 12],
    [1, 5, 12, 5, 4, 12, 4, 8, 12, 8, 7, 12, 7, 6, 12, 6, 11, 12, 11, 3, 12, 3, 1, 12],
    [0, 2, 12, 2, 11, 12, 11, 7, 12, 7, 6, 12, 6, 10, 12, 10, 5, 12, 5, 4, 12, 4, 0, 12],
    [0, 9, 12, 9, 5, 12, 5, 4, 12, 4, 8, 12, 8, 7, 12, 7, 6, 12, 6, 2, 12, 2, 0, 12],
    [1, 3, 12, 3, 7, 12, 7, 6, 12, 6, 10, 12, 10, 5, 12, 5, 4, 12, 4, 9, 12, 9, 1, 12],
    [1, 2, 12, 2, 10, 12, 10, 5, 12, 5, 6, 12, 6, 11, 12, 11, 8, 12, 8, 9, 12, 9, 1, 12],
    [0, 8, 12, 8, 7, 12, 7, 5, 12, 5, 1, 12, 1, 2, 12, 2, 11, 12, 11, 3, 12, 3, 0, 12],
    [0, 1, 12, 1, 10, 12, 10, 2, 12, 2, 3, 12, 3, 7, 12, 7, 5, 12, 5, 9, 12, 9, 0, 12],
    [0, 1, 12, 1, 9, 12, 9, 4, 12, 4, 5, 12, 5, 10, 12, 10, 11, 12, 11, 8, 12, 8, 0, 12],
    [0, 9, 12, 9, 10, 12, 10, 11, 12, 11, 7, 12, 7, 4, 12, 4, 8, 12, 8, 3, 12, 3, 0, 12],
];

#[rustfmt::skip]
pub static TILING12_2_: [[i8; 24]; 24] = [
    [0, 3, 12, 3, 8, 12, 8, 4, 12, 4, 7, 12, 7, 11, 12, 11, 10, 12, 10, 9, 12, 9, 0, 12],
    [0, 8, 12, 8, 11, 12, 11, 10, 12, 10, 5, 12, 5, 4, 12, 4, 9, 12, 9, 1, 12, 1, 0, 12],
    [0, 9, 12, 9, 5, 12, 5, 7, 12, 7, 3, 12, 3, 2, 12, 2, 10, 12, 10, 1, 12, 1, 0, 12],
    [0, 3, 12, 3, 11, 12, 11, 2, 12, 2, 1, 12, 1, 5, 12, 5, 7, 12, 7, 8, 12, 8, 0, 12],
    [1, 9, 12, 9, 8, 12, 8, 11, 12, 11, 6, 12, 6, 5, 12, 5, 10, 12, 10, 2, 12, 2, 1, 12],
    [1, 9, 12, 9, 4, 12, 4, 5, 12, 5, 10, 12, 10, 6, 12, 6, 7, 12, 7, 3, 12, 3, 1, 12],
    [0, 2, 12, 2, 6, 12, 6, 7, 12, 7, 8, 12, 8, 4, 12, 4, 5, 12, 5, 9, 12, 9, 0, 12],
    [0, 4, 12, 4, 5, 12, 5, 10, 12, 10, 6, 12, 6, 7, 12, 7, 11, 12, 11, 2, 12, 2, 0, 12],
    [1, 3, 12, 3, 11, 12, 11, 6, 12, 6, 7, 12, 7, 8, 12, 8, 4, 12, 4, 5, 12, 5, 1, 12],
    [0, 8, 12, 8, 3, 12, 3, 2, 12, 2, 6, 12, 6, 4, 12, 4, 9, 12, 9, 1, 12, 1, 0, 12],
    [0, 3, 12, 3, 11, 12, 11, 2, 12, 2, 1, 12, 1, 10, 12, 10, 6, 12, 6, 4, 12, 4, 0, 12],
    [2, 3, 12, 3, 8, 12, 8, 9, 12, 9, 10, 12, 10, 6, 12, 6, 7, 12, 7, 11, 12, 11, 2, 12],
    [2, 10, 12, 10, 9, 12, 9, 8, 12, 8, 7, 12, 7, 6, 12, 6, 11, 12, 11, 3, 12, 3, 2, 12],
    [0, 4, 12, 4, 6, 12, 6, 11, 12, 11, 3, 12, 3, 2, 12, 2, 10, 12, 10, 1, 12, 1, 0, 12],
    [0, 3, 12, 3, 8, 12, 8, 4, 12, 4, 6, 12, 6, 2, 12, 2, 1, 12, 1, 9, 12, 9, 0, 12],
    [1, 5, 12, 5, 6, 12, 6, 11, 12, 11, 7, 12, 7, 4, 12, 4, 8, 12, 8, 3, 12, 3, 1, 12],
    [0, 2, 12, 2, 10, 12, 10, 5, 12, 5, 6, 12, 6, 11, 12, 11, 7, 12, 7, 4, 12, 4, 0, 12],
    [0, 8, 12, 8, 7, 12, 7, 4, 12, 4, 9, 12, 9, 5, 12, 5, 6, 12, 6, 2, 12, 2, 0, 12],
    [1, 3, 12, 3, 7, 12, 7, 4, 12, 4, 9, 12, 9, 5, 12, 5, 6, 12, 6, 10, 12, 10, 1, 12],
    [1, 2, 12, 2, 11, 12, 11, 8, 12, 8, 9, 12, 9, 5, 12, 5, 6, 12, 6, 10, 12, 10, 1, 12],
    [0, 8, 12, 8, 3, 12, 3, 2, 12, 2, 11, 12, 11, 7, 12, 7, 5, 12, 5, 1, 12, 1, 0, 12],
    [0, 3, 12, 3, 7, 12, 7, 5, 12, 5, 10, 12, 10, 2, 12, 2, 1, 12, 1, 9, 12, 9, 0, 12],
    [0, 1, 12, 1, 10, 12, 10, 11, 12, 11, 8, 12, 8, 4, 12, 4, 5, 12, 5, 9, 12, 9, 0, 12],
    [0, 8, 12, 8, 7, 12, 7, 4, 12, 4, 9, 12, 9, 10, 12, 10, 11, 12, 11, 3, 12, 3, 0, 12],
];

/// Six face probes and interior polarity for case 13.
#[rustfmt::skip]
pub static TEST13: [[i8; 7]; 2] = [
    [1, 2, 3, 4, 5, 6, 7],
    [1, 2, 3, 4, 5, 6, -7],
];

/// Face-probe signature to sub-configuration, per case-13 configuration.
/// Entries of -1 are signatures no trilinear field can produce.
#[rustfmt::skip]
pub static SUBCONFIG13: [[i8; 64]; 2] = [
    [0, 1, 2, 7, 3, -1, 11, -1, 4, 8, -1, -1, 14, -1, -1, -1, 5, 9, 12, 19, 15, -1, 24, 38, 17, 23, -1, 36, 20, 33, 30, 44, 6, 10, 13, 25, 16, -1, 22, 37, 18, 21, -1, 35, 26, 32, 29, 43, -1, -1, -1, 34, -1, -1, 28, 42, -1, 31, -1, 41, 27, 40, 39, 45],
    [0, 1, 2, 7, 3, -1, 11, -1, 4, 8, -1, -1, 14, -1, -1, -1, 5, 9, 12, 23, 15, -1, 20, 38, 17, 19, -1, 36, 24, 33, 30, 44, 6, 10, 13, 21, 16, -1, 26, 37, 18, 25, -1, 35, 22, 32, 29, 43, -1, -1, -1, 34, -1, -1, 28, 42, -1, 31, -1, 41, 27, 40, 39, 45],
];

#[rustfmt::skip]
pub static TILING13_1: [[i8; 12]; 2] = [
    [0, 1, 9, 2, 3, 11, 4, 7, 8, 5, 10, 6],
    [0, 8, 3, 1, 2, 10, 4, 9, 5, 6, 11, 7],
];

#[rustfmt::skip]
pub static TILING13_1_: [[i8; 12]; 2] = [
    [0, 3, 8, 1, 10, 2, 4, 5, 9, 6, 7, 11],
    [0, 9, 1, 2, 11, 3, 4, 8, 7, 5, 6, 10],
];

#[rustfmt::skip]
pub static TILING13_2: [[[i8; 18]; 6]; 2] = [
    [
        [0, 1, 9, 2, 3, 11, 4, 7, 8, 5, 10, 6, 9, 4, 8, 0, 9, 8],
        [0, 1, 9, 2, 3, 11, 4, 7, 8, 5, 10, 6, 10, 5, 9, 1, 10, 9],
        [0, 1, 9, 2, 3, 11, 4, 7, 8, 5, 10, 6, 11, 6, 10, 2, 11, 10],
        [0, 1, 9, 2, 3, 11, 4, 7, 8, 5, 10, 6, 8, 7, 11, 3, 8, 11],
        [0, 1, 9, 2, 3, 11, 4, 7, 8, 5, 10, 6, 3, 2, 1, 3, 1, 0],
        [0, 1, 9, 2, 3, 11, 4, 7, 8, 5, 10, 6, 5, 6, 7, 4, 5, 7],
    ],
    [
        [0, 8, 3, 1, 2, 10, 4, 9, 5, 6, 11, 7, 9, 4, 8, 0, 9, 8],
        [0, 8, 3, 1, 2, 10, 4, 9, 5, 6, 11, 7, 10, 5, 9, 1, 10, 9],
        [0, 8, 3, 1, 2, 10, 4, 9, 5, 6, 11, 7, 11, 6, 10, 2, 11, 10],
        [0, 8, 3, 1, 2, 10, 4, 9, 5, 6, 11, 7, 8, 7, 11, 3, 8, 11],
        [0, 8, 3, 1, 2, 10, 4, 9, 5, 6, 11, 7, 3, 2, 1, 3, 1, 0],
        [0, 8, 3, 1, 2, 10, 4, 9, 5, 6, 11, 7, 5, 6, 7, 4, 5, 7],
    ],
];

#[rustfmt::skip]
pub static TILING13_2_: [[[i8; 18]; 6]; 2] = [
    [
        [0, 3, 8, 1, 10, 2, 4, 5, 9, 6, 7, 11, 9, 8, 4, 0, 8, 9],
        [0, 3, 8, 1, 10, 2, 4, 5, 9, 6, 7, 11, 10, 9, 5, 1, 9, 10],
        [0, 3, 8, 1, 10, 2, 4, 5, 9, 6, 7, 11, 11, 10, 6, 2, 10, 11],
        [0, 3, 8, 1, 10, 2, 4, 5, 9, 6, 7, 11, 8, 11, 7, 3, 11, 8],
        [0, 3, 8, 1, 10, 2, 4, 5, 9, 6, 7, 11, 3, 1, 2, 3, 0, 1],
        [0, 3, 8, 1, 10, 2, 4, 5, 9, 6, 7, 11, 5, 7, 6, 4, 7, 5],
    ],
    [
        [0, 9, 1, 2, 11, 3, 4, 8, 7, 5, 6, 10, 9, 8, 4, 0, 8, 9],
        [0, 9, 1, 2, 11, 3, 4, 8, 7, 5, 6, 10, 10, 9, 5, 1, 9, 10],
        [0, 9, 1, 2, 11, 3, 4, 8, 7, 5, 6, 10, 11, 10, 6, 2, 10, 11],
        [0, 9, 1, 2, 11, 3, 4, 8, 7, 5, 6, 10, 8, 11, 7, 3, 11, 8],
        [0, 9, 1, 2, 11, 3, 4, 8, 7, 5, 6, 10, 3, 1, 2, 3, 0, 1],
        [0, 9, 1, 2, 11, 3, 4, 8, 7, 5, 6, 10, 5, 7, 6, 4, 7, 5],
    ],
];

#[rustfmt::skip]
pub static TILING13_3: [[[i8; 30]; 12]; 2] = [
    [
        [0, 1, 12, 1, 10, 12, 10, 6, 12, 6, 5, 12, 5, 9, 12, 9, 4, 12, 4, 7, 12, 7, 8, 12, 8, 0, 12, 2, 3, 11],
        [0, 1, 12, 1, 9, 12, 9, 4, 12, 4, 7, 12, 7, 11, 12, 11, 2, 12, 2, 3, 12, 3, 8, 12, 8, 0, 12, 5, 10, 6],
        [0, 3, 12, 3, 11, 12, 11, 2, 12, 2, 1, 12, 1, 9, 12, 9, 4, 12, 4, 7, 12, 7, 8, 12, 8, 0, 12, 5, 10, 6],
        [0, 1, 12, 1, 9, 12, 9, 4, 12, 4, 5, 12, 5, 10, 12, 10, 6, 12, 6, 7, 12, 7, 8, 12, 8, 0, 12, 2, 3, 11],
        [0, 1, 12, 1, 10, 12, 10, 2, 12, 2, 3, 12, 3, 11, 12, 11, 6, 12, 6, 5, 12, 5, 9, 12, 9, 0, 12, 4, 7, 8],
        [0, 3, 12, 3, 11, 12, 11, 2, 12, 2, 1, 12, 1, 10, 12, 10, 6, 12, 6, 5, 12, 5, 9, 12, 9, 0, 12, 4, 7, 8],
        [0, 1, 12, 1, 10, 12, 10, 6, 12, 6, 7, 12, 7, 8, 12, 8, 4, 12, 4, 5, 12, 5, 9, 12, 9, 0, 12, 2, 3, 11],
        [0, 1, 9, 2, 3, 12, 3, 8, 12, 8, 4, 12, 4, 7, 12, 7, 11, 12, 11, 6, 12, 6, 5, 12, 5, 10, 12, 10, 2, 12],
        [0, 3, 12, 3, 11, 12, 11, 6, 12, 6, 5, 12, 5, 10, 12, 10, 2, 12, 2, 1, 12, 1, 9, 12, 9, 0, 12, 4, 7, 8],
        [0, 1, 9, 2, 3, 12, 3, 11, 12, 11, 6, 12, 6, 7, 12, 7, 8, 12, 8, 4, 12, 4, 5, 12, 5, 10, 12, 10, 2, 12],
        [0, 3, 12, 3, 8, 12, 8, 4, 12, 4, 7, 12, 7, 11, 12, 11, 2, 12, 2, 1, 12, 1, 9, 12, 9, 0, 12, 5, 10, 6],
        [0, 1, 9, 2, 3, 12, 3, 8, 12, 8, 4, 12, 4, 5, 12, 5, 10, 12, 10, 6, 12, 6, 7, 12, 7, 11, 12, 11, 2, 12],
    ],
    [
        [0, 9, 12, 9, 1, 12, 1, 2, 12, 2, 10, 12, 10, 5, 12, 5, 4, 12, 4, 8, 12, 8, 3, 12, 3, 0, 12, 6, 11, 7],
        [0, 9, 12, 9, 5, 12, 5, 4, 12, 4, 8, 12, 8, 7, 12, 7, 6, 12, 6, 11, 12, 11, 3, 12, 3, 0, 12, 1, 2, 10],
        [0, 9, 12, 9, 5, 12, 5, 4, 12, 4, 8, 12, 8, 3, 12, 3, 2, 12, 2, 10, 12, 10, 1, 12, 1, 0, 12, 6, 11, 7],
        [0, 9, 12, 9, 5, 12, 5, 6, 12, 6, 11, 12, 11, 7, 12, 7, 4, 12, 4, 8, 12, 8, 3, 12, 3, 0, 12, 1, 2, 10],
        [0, 8, 3, 1, 2, 12, 2, 11, 12, 11, 7, 12, 7, 6, 12, 6, 10, 12, 10, 5, 12, 5, 4, 12, 4, 9, 12, 9, 1, 12],
        [0, 8, 12, 8, 3, 12, 3, 2, 12, 2, 10, 12, 10, 5, 12, 5, 4, 12, 4, 9, 12, 9, 1, 12, 1, 0, 12, 6, 11, 7],
        [0, 8, 3, 1, 2, 12, 2, 10, 12, 10, 5, 12, 5, 6, 12, 6, 11, 12, 11, 7, 12, 7, 4, 12, 4, 9, 12, 9, 1, 12],
        [0, 8, 12, 8, 7, 12, 7, 6, 12, 6, 10, 12, 10, 1, 12, 1, 2, 12, 2, 11, 12, 11, 3, 12, 3, 0, 12, 4, 9, 5],
        [0, 8, 12, 8, 3, 12, 3, 2, 12, 2, 11, 12, 11, 7, 12, 7, 6, 12, 6, 10, 12, 10, 1, 12, 1, 0, 12, 4, 9, 5],
        [0, 8, 3, 1, 2, 12, 2, 11, 12, 11, 7, 12, 7, 4, 12, 4, 9, 12, 9, 5, 12, 5, 6, 12, 6, 10, 12, 10, 1, 12],
        [0, 8, 12, 8, 7, 12, 7, 6, 12, 6, 11, 12, 11, 3, 12, 3, 2, 12, 2, 10, 12, 10, 1, 12, 1, 0, 12, 4, 9, 5],
        [0, 8, 12, 8, 7, 12, 7, 4, 12, 4, 9, 12, 9, 5, 12, 5, 6, 12, 6, 11, 12, 11, 3, 12, 3, 0, 12, 1, 2, 10],
    ],
];

#[rustfmt::skip]
pub static TILING13_3_: [[[i8; 30]; 12]; 2] = [
    [
        [0, 3, 12, 3, 8, 12, 8, 4, 12, 4, 5, 12, 5, 10, 12, 10, 2, 12, 2, 1, 12, 1, 9, 12, 9, 0, 12, 6, 7, 11],
        [0, 3, 12, 3, 11, 12, 11, 6, 12, 6, 7, 12, 7, 8, 12, 8, 4, 12, 4, 5, 12, 5, 9, 12, 9, 0, 12, 1, 10, 2],
        [0, 1, 12, 1, 10, 12, 10, 2, 12, 2, 3, 12, 3, 8, 12, 8, 4, 12, 4, 5, 12, 5, 9, 12, 9, 0, 12, 6, 7, 11],
        [0, 3, 12, 3, 8, 12, 8, 4, 12, 4, 7, 12, 7, 11, 12, 11, 6, 12, 6, 5, 12, 5, 9, 12, 9, 0, 12, 1, 10, 2],
        [0, 3, 8, 1, 9, 12, 9, 4, 12, 4, 5, 12, 5, 10, 12, 10, 6, 12, 6, 7, 12, 7, 11, 12, 11, 2, 12, 2, 1, 12],
        [0, 1, 12, 1, 9, 12, 9, 4, 12, 4, 5, 12, 5, 10, 12, 10, 2, 12, 2, 3, 12, 3, 8, 12, 8, 0, 12, 6, 7, 11],
        [0, 3, 8, 1, 9, 12, 9, 4, 12, 4, 7, 12, 7, 11, 12, 11, 6, 12, 6, 5, 12, 5, 10, 12, 10, 2, 12, 2, 1, 12],
        [0, 3, 12, 3, 11, 12, 11, 2, 12, 2, 1, 12, 1, 10, 12, 10, 6, 12, 6, 7, 12, 7, 8, 12, 8, 0, 12, 4, 5, 9],
        [0, 1, 12, 1, 10, 12, 10, 6, 12, 6, 7, 12, 7, 11, 12, 11, 2, 12, 2, 3, 12, 3, 8, 12, 8, 0, 12, 4, 5, 9],
        [0, 3, 8, 1, 10, 12, 10, 6, 12, 6, 5, 12, 5, 9, 12, 9, 4, 12, 4, 7, 12, 7, 11, 12, 11, 2, 12, 2, 1, 12],
        [0, 1, 12, 1, 10, 12, 10, 2, 12, 2, 3, 12, 3, 11, 12, 11, 6, 12, 6, 7, 12, 7, 8, 12, 8, 0, 12, 4, 5, 9],
        [0, 3, 12, 3, 11, 12, 11, 6, 12, 6, 5, 12, 5, 9, 12, 9, 4, 12, 4, 7, 12, 7, 8, 12, 8, 0, 12, 1, 10, 2],
    ],
    [
        [0, 8, 12, 8, 7, 12, 7, 4, 12, 4, 9, 12, 9, 5, 12, 5, 6, 12, 6, 10, 12, 10, 1, 12, 1, 0, 12, 2, 11, 3],
        [0, 8, 12, 8, 3, 12, 3, 2, 12, 2, 11, 12, 11, 7, 12, 7, 4, 12, 4, 9, 12, 9, 1, 12, 1, 0, 12, 5, 6, 10],
        [0, 8, 12, 8, 7, 12, 7, 4, 12, 4, 9, 12, 9, 1, 12, 1, 2, 12, 2, 11, 12, 11, 3, 12, 3, 0, 12, 5, 6, 10],
        [0, 8, 12, 8, 7, 12, 7, 6, 12, 6, 10, 12, 10, 5, 12, 5, 4, 12, 4, 9, 12, 9, 1, 12, 1, 0, 12, 2, 11, 3],
        [0, 9, 12, 9, 5, 12, 5, 6, 12, 6, 11, 12, 11, 3, 12, 3, 2, 12, 2, 10, 12, 10, 1, 12, 1, 0, 12, 4, 8, 7],
        [0, 9, 12, 9, 5, 12, 5, 6, 12, 6, 10, 12, 10, 1, 12, 1, 2, 12, 2, 11, 12, 11, 3, 12, 3, 0, 12, 4, 8, 7],
        [0, 9, 12, 9, 5, 12, 5, 4, 12, 4, 8, 12, 8, 7, 12, 7, 6, 12, 6, 10, 12, 10, 1, 12, 1, 0, 12, 2, 11, 3],
        [0, 9, 1, 2, 10, 12, 10, 5, 12, 5, 6, 12, 6, 11, 12, 11, 7, 12, 7, 4, 12, 4, 8, 12, 8, 3, 12, 3, 2, 12],
        [0, 9, 12, 9, 1, 12, 1, 2, 12, 2, 10, 12, 10, 5, 12, 5, 6, 12, 6, 11, 12, 11, 3, 12, 3, 0, 12, 4, 8, 7],
        [0, 9, 1, 2, 10, 12, 10, 5, 12, 5, 4, 12, 4, 8, 12, 8, 7, 12, 7, 6, 12, 6, 11, 12, 11, 3, 12, 3, 2, 12],
        [0, 9, 12, 9, 1, 12, 1, 2, 12, 2, 11, 12, 11, 7, 12, 7, 4, 12, 4, 8, 12, 8, 3, 12, 3, 0, 12, 5, 6, 10],
        [0, 9, 1, 2, 11, 12, 11, 7, 12, 7, 6, 12, 6, 10, 12, 10, 5, 12, 5, 4, 12, 4, 8, 12, 8, 3, 12, 3, 2, 12],
    ],
];

#[rustfmt::skip]
pub static TILING13_4: [[[i8; 36]; 4]; 2] = [
    [
        [0, 8, 12, 8, 7, 12, 7, 4, 12, 4, 9, 12, 9, 5, 12, 5, 6, 12, 6, 10, 12, 10, 1, 12, 1, 2, 12, 2, 11, 12, 11, 3, 12, 3, 0, 12],
        [0, 9, 12, 9, 1, 12, 1, 2, 12, 2, 10, 12, 10, 5, 12, 5, 6, 12, 6, 11, 12, 11, 7, 12, 7, 4, 12, 4, 8, 12, 8, 3, 12, 3, 0, 12],
        [0, 8, 12, 8, 3, 12, 3, 2, 12, 2, 11, 12, 11, 7, 12, 7, 6, 12, 6, 10, 12, 10, 5, 12, 5, 4, 12, 4, 9, 12, 9, 1, 12, 1, 0, 12],
        [0, 9, 12, 9, 5, 12, 5, 4, 12, 4, 8, 12, 8, 7, 12, 7, 6, 12, 6, 11, 12, 11, 3, 12, 3, 2, 12, 2, 10, 12, 10, 1, 12, 1, 0, 12],
    ],
    [
        [0, 9, 12, 9, 5, 12, 5, 4, 12, 4, 8, 12, 8, 7, 12, 7, 6, 12, 6, 11, 12, 11, 3, 12, 3, 2, 12, 2, 10, 12, 10, 1, 12, 1, 0, 12],
        [0, 8, 12, 8, 3, 12, 3, 2, 12, 2, 11, 12, 11, 7, 12, 7, 6, 12, 6, 10, 12, 10, 5, 12, 5, 4, 12, 4, 9, 12, 9, 1, 12, 1, 0, 12],
        [0, 9, 12, 9, 1, 12, 1, 2, 12, 2, 10, 12, 10, 5, 12, 5, 6, 12, 6, 11, 12, 11, 7, 12, 7, 4, 12, 4, 8, 12, 8, 3, 12, 3, 0, 12],
        [0, 8, 12, 8, 7, 12, 7, 4, 12, 4, 9, 12, 9, 5, 12, 5, 6, 12, 6, 10, 12, 10, 1, 12, 1, 2, 12, 2, 11, 12, 11, 3, 12, 3, 0, 12],
    ],
];

#[rustfmt::skip]
pub static TILING13_5_1: [[[i8; 18]; 4]; 2] = [
    [
        [0, 3, 8, 5, 10, 6, 1, 9, 4, 1, 4, 7, 1, 7, 11, 1, 11, 2],
        [1, 10, 2, 4, 7, 8, 0, 3, 11, 0, 11, 6, 0, 6, 5, 0, 5, 9],
        [2, 3, 11, 4, 5, 9, 0, 1, 10, 0, 10, 6, 0, 6, 7, 0, 7, 8],
        [0, 1, 9, 6, 7, 11, 2, 3, 8, 2, 8, 4, 2, 4, 5, 2, 5, 10],
    ],
    [
        [0, 9, 1, 6, 11, 7, 2, 10, 5, 2, 5, 4, 2, 4, 8, 2, 8, 3],
        [2, 11, 3, 4, 9, 5, 0, 8, 7, 0, 7, 6, 0, 6, 10, 0, 10, 1],
        [1, 2, 10, 4, 8, 7, 0, 9, 5, 0, 5, 6, 0, 6, 11, 0, 11, 3],
        [0, 8, 3, 5, 6, 10, 1, 2, 11, 1, 11, 7, 1, 7, 4, 1, 4, 9],
    ],
];

#[rustfmt::skip]
pub static TILING13_5_2: [[[i8; 30]; 4]; 2] = [
    [
        [1, 9, 12, 9, 4, 12, 4, 7, 12, 7, 11, 12, 11, 2, 12, 2, 1, 12, 5, 10, 12, 10, 6, 12, 6, 5, 12, 0, 3, 8],
        [0, 3, 12, 3, 11, 12, 11, 6, 12, 6, 5, 12, 5, 9, 12, 9, 0, 12, 4, 7, 12, 7, 8, 12, 8, 4, 12, 1, 10, 2],
        [0, 1, 12, 1, 10, 12, 10, 6, 12, 6, 7, 12, 7, 8, 12, 8, 0, 12, 2, 3, 12, 3, 11, 12, 11, 2, 12, 4, 5, 9],
        [2, 3, 12, 3, 8, 12, 8, 4, 12, 4, 5, 12, 5, 10, 12, 10, 2, 12, 0, 1, 12, 1, 9, 12, 9, 0, 12, 6, 7, 11],
    ],
    [
        [2, 10, 12, 10, 5, 12, 5, 4, 12, 4, 8, 12, 8, 3, 12, 3, 2, 12, 6, 11, 12, 11, 7, 12, 7, 6, 12, 0, 9, 1],
        [0, 8, 12, 8, 7, 12, 7, 6, 12, 6, 10, 12, 10, 1, 12, 1, 0, 12, 4, 9, 12, 9, 5, 12, 5, 4, 12, 2, 11, 3],
        [0, 9, 12, 9, 5, 12, 5, 6, 12, 6, 11, 12, 11, 3, 12, 3, 0, 12, 1, 2, 12, 2, 10, 12, 10, 1, 12, 4, 8, 7],
        [1, 2, 12, 2, 11, 12, 11, 7, 12, 7, 4, 12, 4, 9, 12, 9, 1, 12, 0, 8, 12, 8, 3, 12, 3, 0, 12, 5, 6, 10],
    ],
];

#[rustfmt::skip]
pub static TILING14: [[i8; 12]; 12] = [
    [0, 4, 7, 0, 7, 11, 0, 11, 10, 0, 10, 1],
    [1, 5, 4, 1, 4, 8, 1, 8, 11, 1, 11, 2],
    [0, 2, 10, 0, 10, 5, 0, 5, 7, 0, 7, 8],
    [2, 6, 5, 2, 5, 9, 2, 9, 8, 2, 8, 3],
    [1, 3, 11, 1, 11, 6, 1, 6, 4, 1, 4, 9],
    [0, 9, 10, 0, 10, 6, 0, 6, 7, 0, 7, 3],
    [0, 3, 7, 0, 7, 6, 0, 6, 10, 0, 10, 9],
    [1, 9, 4, 1, 4, 6, 1, 6, 11, 1, 11, 3],
    [2, 3, 8, 2, 8, 9, 2, 9, 5, 2, 5, 6],
    [0, 8, 7, 0, 7, 5, 0, 5, 10, 0, 10, 2],
    [1, 2, 11, 1, 11, 8, 1, 8, 4, 1, 4, 5],
    [0, 1, 10, 0, 10, 11, 0, 11, 7, 0, 7, 4],
];

