//! Portable structure files
//!
//! Grids are written as gzip-compressed Sponge schematics (version 3),
//! the format WorldEdit and most structure tools load as `.schem`.

pub mod sponge;

pub use sponge::{
    decode, encode, read_schematic, write_schematic, BlockBuffer, SchematicContents, SchematicFile,
    DATA_VERSION, FILE_EXTENSION, FORMAT_VERSION,
};
