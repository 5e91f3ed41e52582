//! Sponge schematic v3 encoding
//!
//! Layout written by `encode`:
//!
//! ```text
//! "" {
//!   Schematic {
//!     Version: int = 3, DataVersion: int,
//!     Metadata { Name: string, Date: long },
//!     Width: short, Height: short, Length: short,
//!     Offset: int[3],
//!     Blocks { Palette { <id>: int }, Data: byte[], BlockEntities: [] }
//!   }
//! }
//! ```
//!
//! `Data` holds one varint palette index per position, ordered
//! `x + z * Width + y * Width * Length`.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use fastnbt::{ByteArray, IntArray, Value};
use serde::{Deserialize, Serialize};

use crate::error::PersistError;
use crate::material::MaterialId;

/// Sponge schematic format version
pub const FORMAT_VERSION: i32 = 3;
/// Minecraft data version the palette ids belong to (1.21.1)
pub const DATA_VERSION: i32 = 3955;
/// File extension for written schematics
pub const FILE_EXTENSION: &str = "schem";

/// Dense block storage for an axis-aligned region at the origin.
///
/// Positions never set hold air (palette index 0).
#[derive(Debug, Clone)]
pub struct BlockBuffer {
    width: u16,
    height: u16,
    length: u16,
    palette: Vec<MaterialId>,
    palette_index: HashMap<MaterialId, u32>,
    blocks: Vec<u32>,
}

impl BlockBuffer {
    /// Region of `width x height x length` (x, y, z).
    ///
    /// Each side must fit a signed short, and the dense storage must be
    /// allocatable; both failures are `PersistError::Encode`.
    pub fn new(width: u32, height: u32, length: u32) -> Result<Self, PersistError> {
        let side = |value: u32, axis: &str| {
            i16::try_from(value).map(|v| v as u16).map_err(|_| {
                PersistError::Encode(format!("{} of {} exceeds schematic limit", axis, value))
            })
        };
        let (width, height, length) = (
            side(width, "width")?,
            side(height, "height")?,
            side(length, "length")?,
        );

        let volume = width as usize * height as usize * length as usize;
        let mut blocks = Vec::new();
        blocks.try_reserve_exact(volume).map_err(|e| {
            PersistError::Encode(format!("cannot allocate {} positions: {}", volume, e))
        })?;
        blocks.resize(volume, 0);

        let air = MaterialId::air();
        Ok(Self {
            width,
            height,
            length,
            palette: vec![air.clone()],
            palette_index: HashMap::from([(air, 0)]),
            blocks,
        })
    }

    pub fn dimensions(&self) -> (u32, u32, u32) {
        (self.width as u32, self.height as u32, self.length as u32)
    }

    /// Set a block; returns false when the position is outside the region
    pub fn set(&mut self, x: i32, y: i32, z: i32, material: &MaterialId) -> bool {
        let Some(index) = self.index_of(x, y, z) else {
            return false;
        };
        let next = self.palette.len() as u32;
        let id = *self.palette_index.entry(material.clone()).or_insert_with(|| {
            self.palette.push(material.clone());
            next
        });
        self.blocks[index] = id;
        true
    }

    /// Block at a position, `None` outside the region
    pub fn get(&self, x: i32, y: i32, z: i32) -> Option<&MaterialId> {
        self.index_of(x, y, z)
            .map(|index| &self.palette[self.blocks[index] as usize])
    }

    fn index_of(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let (w, h, l) = (self.width as i64, self.height as i64, self.length as i64);
        let (x, y, z) = (x as i64, y as i64, z as i64);
        if x < 0 || y < 0 || z < 0 || x >= w || y >= h || z >= l {
            return None;
        }
        Some((x + z * w + y * w * l) as usize)
    }
}

/// What a schematic file holds, keyed by position.
///
/// Air positions are omitted, including ones written explicitly; the
/// dense block data cannot tell them apart from unset positions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchematicContents {
    pub name: Option<String>,
    pub width: u32,
    pub height: u32,
    pub length: u32,
    pub blocks: BTreeMap<(i32, i32, i32), String>,
}

/// Root compound of a schematic file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchematicFile {
    #[serde(rename = "Schematic")]
    pub schematic: Schematic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Schematic {
    pub version: i32,
    pub data_version: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
    pub width: i16,
    pub height: i16,
    pub length: i16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<IntArray>,
    pub blocks: Blocks,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Blocks {
    pub palette: HashMap<String, i32>,
    pub data: ByteArray,
    #[serde(default)]
    pub block_entities: Vec<Value>,
}

/// Build the file layout for a buffer
pub fn encode(buffer: &BlockBuffer, name: &str, created: DateTime<Utc>) -> SchematicFile {
    let palette = buffer
        .palette
        .iter()
        .enumerate()
        .map(|(index, material)| (material.as_str().to_string(), index as i32))
        .collect();

    let mut data = Vec::with_capacity(buffer.blocks.len());
    for &id in &buffer.blocks {
        write_varint(&mut data, id);
    }

    SchematicFile {
        schematic: Schematic {
            version: FORMAT_VERSION,
            data_version: DATA_VERSION,
            metadata: Some(Metadata {
                name: Some(name.to_string()),
                date: Some(created.timestamp_millis()),
            }),
            width: buffer.width as i16,
            height: buffer.height as i16,
            length: buffer.length as i16,
            offset: Some(IntArray::new(vec![0, 0, 0])),
            blocks: Blocks {
                palette,
                data: ByteArray::new(data.into_iter().map(|b| b as i8).collect()),
                block_entities: Vec::new(),
            },
        },
    }
}

/// Read the block contents back out of a decoded file
pub fn decode(file: &SchematicFile) -> Result<SchematicContents, PersistError> {
    let schematic = &file.schematic;
    if schematic.version != FORMAT_VERSION {
        return Err(decode_error(&format!("unsupported version {}", schematic.version)));
    }

    let side = |value: i16, key: &str| {
        u32::try_from(value).map_err(|_| decode_error(&format!("negative {} {}", key, value)))
    };
    let (width, height, length) = (
        side(schematic.width, "Width")?,
        side(schematic.height, "Height")?,
        side(schematic.length, "Length")?,
    );

    let mut by_index: HashMap<u32, &str> = HashMap::new();
    for (id, &index) in &schematic.blocks.palette {
        let index = u32::try_from(index)
            .map_err(|_| decode_error(&format!("bad palette index for {}", id)))?;
        by_index.insert(index, id);
    }

    let data: Vec<u8> = schematic.blocks.data.iter().map(|&b| b as u8).collect();
    let volume = width as usize * height as usize * length as usize;
    let air = MaterialId::air();
    let mut contents = BTreeMap::new();
    let mut cursor = 0usize;
    for position in 0..volume {
        let index = read_varint(&data, &mut cursor)
            .ok_or_else(|| decode_error("truncated block data"))?;
        let id = by_index
            .get(&index)
            .ok_or_else(|| decode_error(&format!("palette index {} undefined", index)))?;
        if *id == air.as_str() {
            continue;
        }

        let (w, l) = (width as usize, length as usize);
        let x = position % w;
        let z = (position / w) % l;
        let y = position / (w * l);
        contents.insert((x as i32, y as i32, z as i32), id.to_string());
    }

    let name = schematic.metadata.as_ref().and_then(|m| m.name.clone());

    Ok(SchematicContents {
        name,
        width,
        height,
        length,
        blocks: contents,
    })
}

/// Gzip and write a buffer to `path`, replacing any existing file
pub fn write_schematic(buffer: &BlockBuffer, name: &str, path: &Path) -> Result<(), PersistError> {
    let bytes = fastnbt::to_bytes(&encode(buffer, name, Utc::now()))
        .map_err(|e| PersistError::Encode(e.to_string()))?;

    let file = File::create(path).map_err(|e| PersistError::io(path, e))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    encoder.write_all(&bytes).map_err(|e| PersistError::io(path, e))?;
    let mut writer = encoder.finish().map_err(|e| PersistError::io(path, e))?;
    writer.flush().map_err(|e| PersistError::io(path, e))?;
    Ok(())
}

/// Read and decode a schematic file
pub fn read_schematic(path: &Path) -> Result<SchematicContents, PersistError> {
    let file = File::open(path).map_err(|e| PersistError::io(path, e))?;
    let mut bytes = Vec::new();
    GzDecoder::new(BufReader::new(file))
        .read_to_end(&mut bytes)
        .map_err(|e| PersistError::io(path, e))?;

    let file: SchematicFile =
        fastnbt::from_bytes(&bytes).map_err(|e| decode_error(&e.to_string()))?;
    decode(&file)
}

fn decode_error(message: &str) -> PersistError {
    PersistError::Decode(message.to_string())
}

fn write_varint(out: &mut Vec<u8>, mut value: u32) {
    loop {
        let mut byte = (value & 0x7f) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            return;
        }
    }
}

fn read_varint(data: &[u8], cursor: &mut usize) -> Option<u32> {
    let mut result = 0u32;
    let mut shift = 0;
    loop {
        let byte = *data.get(*cursor)?;
        *cursor += 1;
        result |= ((byte & 0x7f) as u32) << shift;
        if byte & 0x80 == 0 {
            return Some(result);
        }
        shift += 7;
        if shift >= 32 {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn id(raw: &str) -> MaterialId {
        MaterialId::sanitize(raw)
    }

    #[test]
    fn test_varint_boundaries() {
        for value in [0u32, 1, 127, 128, 300, 16_383, 16_384, u32::MAX] {
            let mut out = Vec::new();
            write_varint(&mut out, value);
            let mut cursor = 0;
            assert_eq!(read_varint(&out, &mut cursor), Some(value));
            assert_eq!(cursor, out.len());
        }
        let mut single = Vec::new();
        write_varint(&mut single, 127);
        assert_eq!(single, vec![0x7f]);
    }

    #[test]
    fn test_buffer_rejects_outside_region() {
        let mut buffer = BlockBuffer::new(2, 3, 4).unwrap();
        assert!(buffer.set(1, 2, 3, &id("minecraft:glass")));
        assert!(!buffer.set(2, 0, 0, &id("minecraft:glass")));
        assert!(!buffer.set(0, -1, 0, &id("minecraft:glass")));
        assert_eq!(buffer.get(1, 2, 3), Some(&id("minecraft:glass")));
        assert_eq!(buffer.get(0, 0, 0), Some(&MaterialId::air()));
        assert_eq!(buffer.get(5, 5, 5), None);
    }

    #[test]
    fn test_oversized_region_rejected() {
        assert!(matches!(
            BlockBuffer::new(70_000, 1, 1),
            Err(PersistError::Encode(_))
        ));
        assert!(matches!(
            BlockBuffer::new(32_768, 1, 1),
            Err(PersistError::Encode(_))
        ));
        assert!(matches!(
            BlockBuffer::new(32_767, 32_767, 32_767).map(|_| ()),
            Err(PersistError::Encode(_))
        ));
    }

    #[test]
    fn test_largest_side_written_as_positive_short() {
        let buffer = BlockBuffer::new(32_767, 1, 1).unwrap();
        let file = encode(&buffer, "Wall", Utc::now());
        assert_eq!(file.schematic.width, i16::MAX);
        assert_eq!(decode(&file).unwrap().width, 32_767);
    }

    #[test]
    fn test_encode_layout() {
        let mut buffer = BlockBuffer::new(2, 1, 2).unwrap();
        buffer.set(1, 0, 1, &id("minecraft:glass"));
        let schematic = encode(&buffer, "Hut", Utc::now()).schematic;

        assert_eq!(schematic.version, 3);
        assert_eq!((schematic.width, schematic.height, schematic.length), (2, 1, 2));
        assert_eq!(schematic.blocks.palette.get("minecraft:air"), Some(&0));
        assert_eq!(schematic.blocks.palette.get("minecraft:glass"), Some(&1));
        // x + z*W + y*W*L = 1 + 2 = 3
        assert_eq!(schematic.blocks.data.iter().copied().collect::<Vec<i8>>(), vec![0, 0, 0, 1]);
        assert!(schematic.blocks.block_entities.is_empty());
    }

    #[test]
    fn test_file_read_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tower.schem");

        let mut buffer = BlockBuffer::new(3, 4, 5).unwrap();
        buffer.set(0, 0, 0, &id("minecraft:stone_bricks"));
        buffer.set(2, 3, 4, &id("minecraft:glass"));
        buffer.set(1, 2, 0, &id("minecraft:stone_bricks"));
        write_schematic(&buffer, "Tower", &path).unwrap();

        let contents = read_schematic(&path).unwrap();
        assert_eq!(contents.name.as_deref(), Some("Tower"));
        assert_eq!((contents.width, contents.height, contents.length), (3, 4, 5));
        assert_eq!(contents.blocks.len(), 3);
        assert_eq!(contents.blocks[&(2, 3, 4)], "minecraft:glass");
        assert_eq!(contents.blocks[&(1, 2, 0)], "minecraft:stone_bricks");
    }

    #[test]
    fn test_not_a_schematic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.schem");
        std::fs::write(&path, b"plain text").unwrap();
        assert!(read_schematic(&path).is_err());

        let other = fastnbt::to_bytes(&HashMap::from([("Other".to_string(), 1i32)])).unwrap();
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&other).unwrap();
        std::fs::write(&path, encoder.finish().unwrap()).unwrap();
        assert!(matches!(read_schematic(&path), Err(PersistError::Decode(_))));
    }

    #[test]
    fn test_wrong_version_rejected() {
        let mut file = encode(&BlockBuffer::new(1, 1, 1).unwrap(), "Old", Utc::now());
        file.schematic.version = 2;
        assert!(matches!(decode(&file), Err(PersistError::Decode(_))));
    }
}
