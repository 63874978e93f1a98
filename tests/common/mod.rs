// tests/common/mod.rs
//
// Synthetic VSS volumes built in memory:
// - VolumeBuilder writes raw store records (index header, catalog, application
//   information, diff area table / bitmap / location table blocks);
// - build_volume() lays out a whole store from a list of SnapshotSpec;
// - CountingReader wraps a Cursor and records every read.

#![allow(dead_code)]

use std::cell::RefCell;
use std::io::{self, Cursor, Read, Seek, SeekFrom};
use std::rc::Rc;

use byteorder::{ByteOrder, LittleEndian};
use uuid::Uuid;

use vsstore::consts::{
    INDEX_HEADER_OFFSET, MICROSOFT_PROVIDER_GUID, STORE_BLOCK_SIZE, VSS_IDENTIFIER,
};

pub const BLOCK: u64 = 0x4000;

/// Volume used by most tests: 128 blocks of 16 KiB.
pub const VOLUME_BLOCKS: u64 = 128;
pub const VOLUME_SIZE: u64 = VOLUME_BLOCKS * BLOCK;

/// Store records are placed from this block on.
pub const STORE_AREA: u64 = 96 * BLOCK;
pub const CATALOG_OFFSET: u64 = STORE_AREA;

pub const NODE_VOLUME_HEADER: u32 = 1;
pub const NODE_CATALOG: u32 = 2;
pub const NODE_DIFF_AREA_TABLE: u32 = 3;
pub const NODE_APPLICATION_INFO: u32 = 4;
pub const NODE_LOCATION_TABLE: u32 = 5;
pub const NODE_BITMAP: u32 = 6;

pub const FORWARDER: u32 = 0x1;
pub const OVERLAY: u32 = 0x2;
pub const UNUSED: u32 = 0x4;

/// Content of the live volume at `offset` (never zero, so zero-fill is visible).
pub fn live_byte(offset: u64) -> u8 {
    ((offset / 512) as u8).wrapping_mul(31).wrapping_add((offset % 251) as u8) | 0x01
}

/// Content written into diff area data blocks (saved copies).
pub fn saved_byte(offset: u64) -> u8 {
    ((offset / 512) as u8).wrapping_mul(7).wrapping_add((offset % 13) as u8) | 0x80
}

#[derive(Debug, Clone, Copy)]
pub struct TestEntry {
    pub offset: u64,
    pub data_relative_offset: u64,
    pub data_offset: u64,
    pub flags: u32,
    pub bitmap: u32,
}

pub fn cow(offset: u64, data: u64) -> TestEntry {
    TestEntry { offset, data_relative_offset: 0, data_offset: data, flags: 0, bitmap: 0 }
}

pub fn forwarder(offset: u64, target: u64) -> TestEntry {
    TestEntry { offset, data_relative_offset: target, data_offset: 0, flags: FORWARDER, bitmap: 0 }
}

pub fn overlay(offset: u64, data: u64, bitmap: u32) -> TestEntry {
    TestEntry { offset, data_relative_offset: 0, data_offset: data, flags: OVERLAY, bitmap }
}

pub fn overlay_continuation(offset: u64, data: u64, bitmap: u32) -> TestEntry {
    TestEntry { offset, data_relative_offset: 1, data_offset: data, flags: OVERLAY, bitmap }
}

pub struct VolumeBuilder {
    pub data: Vec<u8>,
}

impl VolumeBuilder {
    /// A volume of `size` bytes filled with `live_byte`.
    pub fn new(size: u64) -> Self {
        let data = (0..size).map(live_byte).collect();
        Self { data }
    }

    pub fn put(&mut self, at: u64, bytes: &[u8]) {
        let at = at as usize;
        self.data[at..at + bytes.len()].copy_from_slice(bytes);
    }

    pub fn zero(&mut self, at: u64, len: usize) {
        let at = at as usize;
        self.data[at..at + len].fill(0);
    }

    /// Fill a diff area data block with `saved_byte` content.
    pub fn saved_block(&mut self, at: u64) {
        let bytes: Vec<u8> = (at..at + BLOCK).map(saved_byte).collect();
        self.put(at, &bytes);
    }

    fn node(buf: &mut [u8], node_type: u32, offset: u64, next: u64) {
        buf[..16].copy_from_slice(&VSS_IDENTIFIER);
        LittleEndian::write_u32(&mut buf[16..20], 1);
        LittleEndian::write_u32(&mut buf[20..24], node_type);
        LittleEndian::write_u64(&mut buf[24..32], offset.saturating_sub(STORE_AREA));
        LittleEndian::write_u64(&mut buf[32..40], offset);
        LittleEndian::write_u64(&mut buf[40..48], next);
    }

    /// A 16 KiB store block with a node header and `body` after 128 bytes.
    pub fn store_block(&mut self, at: u64, node_type: u32, next: u64, body: &[u8]) {
        let mut b = vec![0u8; STORE_BLOCK_SIZE];
        Self::node(&mut b, node_type, at, next);
        b[128..128 + body.len()].copy_from_slice(body);
        self.put(at, &b);
    }

    pub fn index_header(&mut self, catalog: u64) {
        let mut b = vec![0u8; 512];
        Self::node(&mut b, NODE_VOLUME_HEADER, INDEX_HEADER_OFFSET, 0);
        LittleEndian::write_u64(&mut b[48..56], catalog);
        LittleEndian::write_u64(&mut b[56..64], 64 * BLOCK);
        let g = Uuid::from_u128(0x1111_2222_3333_4444_5555_6666_7777_8888).to_bytes_le();
        b[64..80].copy_from_slice(&g);
        b[80..96].copy_from_slice(&g);
        self.put(INDEX_HEADER_OFFSET, &b);
    }

    pub fn catalog(&mut self, at: u64, next: u64, entries: &[[u8; 128]]) {
        let body: Vec<u8> = entries.iter().flat_map(|e| e.iter().copied()).collect();
        self.store_block(at, NODE_CATALOG, next, &body);
    }

    pub fn application_info(&mut self, at: u64, shadow_copy_id: Uuid, machine: &str, service: &str) {
        let mut body = vec![0u8; 64];
        body[..16].copy_from_slice(&MICROSOFT_PROVIDER_GUID);
        body[16..32].copy_from_slice(&shadow_copy_id.to_bytes_le());
        body[32..48].copy_from_slice(&Uuid::from_u128(0xABCD).to_bytes_le());
        LittleEndian::write_u32(&mut body[56..60], 0x0002_000d);
        for s in [machine, service] {
            let raw: Vec<u8> = s.encode_utf16().flat_map(|u| u.to_le_bytes()).collect();
            let mut len = [0u8; 2];
            LittleEndian::write_u16(&mut len, raw.len() as u16);
            body.extend_from_slice(&len);
            body.extend_from_slice(&raw);
        }
        let size = body.len() as u64;
        self.store_block(at, NODE_APPLICATION_INFO, 0, &body);
        let mut sz = [0u8; 8];
        LittleEndian::write_u64(&mut sz, size);
        self.put(at + 48, &sz);
    }

    pub fn diff_area_table(&mut self, at: u64, next: u64, entries: &[TestEntry]) {
        let mut body = Vec::with_capacity(entries.len() * 32);
        for e in entries {
            let mut raw = [0u8; 32];
            LittleEndian::write_u64(&mut raw[0..8], e.offset);
            LittleEndian::write_u64(&mut raw[8..16], e.data_relative_offset);
            LittleEndian::write_u64(&mut raw[16..24], e.data_offset);
            LittleEndian::write_u32(&mut raw[24..28], e.flags);
            LittleEndian::write_u32(&mut raw[28..32], e.bitmap);
            body.extend_from_slice(&raw);
        }
        self.store_block(at, NODE_DIFF_AREA_TABLE, next, &body);
    }

    pub fn bitmap(&mut self, at: u64, next: u64, bytes: &[u8]) {
        self.store_block(at, NODE_BITMAP, next, bytes);
    }

    pub fn location_table(&mut self, at: u64, items: usize) {
        let mut body = vec![0u8; items * 24];
        for i in 0..items {
            body[i * 24] = 1;
        }
        self.store_block(at, NODE_LOCATION_TABLE, 0, &body);
    }

    pub fn into_cursor(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.data)
    }
}

pub fn snapshot_info_entry(guid: Uuid, size: u64, position: u64, creation_time: u64) -> [u8; 128] {
    let mut e = [0u8; 128];
    LittleEndian::write_u32(&mut e[0..4], 2);
    LittleEndian::write_u64(&mut e[8..16], size);
    e[16..32].copy_from_slice(&guid.to_bytes_le());
    LittleEndian::write_u64(&mut e[32..40], position);
    LittleEndian::write_u64(&mut e[40..48], 0x40);
    LittleEndian::write_u64(&mut e[48..56], creation_time);
    e
}

pub fn diff_area_info_entry(
    guid: Uuid,
    table: u64,
    application_info: u64,
    location: u64,
    bitmap: u64,
    previous_bitmap: u64,
) -> [u8; 128] {
    let mut e = [0u8; 128];
    LittleEndian::write_u32(&mut e[0..4], 3);
    LittleEndian::write_u64(&mut e[8..16], table);
    e[16..32].copy_from_slice(&guid.to_bytes_le());
    LittleEndian::write_u64(&mut e[32..40], application_info);
    LittleEndian::write_u64(&mut e[40..48], location);
    LittleEndian::write_u64(&mut e[48..56], bitmap);
    LittleEndian::write_u64(&mut e[64..72], 64 * BLOCK);
    LittleEndian::write_u64(&mut e[72..80], previous_bitmap);
    e
}

/// One snapshot of a synthetic store.
#[derive(Debug, Clone)]
pub struct SnapshotSpec {
    pub shadow_copy_id: Uuid,
    pub position: u64,
    pub creation_time: u64,
    pub entries: Vec<TestEntry>,
    /// Payload of the bitmap block (padded with zeros).
    pub bitmap: Vec<u8>,
    pub previous_bitmap: Option<Vec<u8>>,
    pub location_items: usize,
}

impl SnapshotSpec {
    pub fn new(n: u128, entries: Vec<TestEntry>) -> Self {
        Self {
            shadow_copy_id: Uuid::from_u128(0x5C00_0000_0000_0000_0000_0000_0000_0000 | n),
            position: n as u64,
            // 2024-01-01 plus n hours
            creation_time: 133_485_408_000_000_000 + n as u64 * 36_000_000_000,
            entries,
            bitmap: vec![],
            previous_bitmap: None,
            location_items: 0,
        }
    }

    pub fn with_bitmap(mut self, bitmap: Vec<u8>) -> Self {
        self.bitmap = bitmap;
        self
    }

    pub fn with_previous_bitmap(mut self, bitmap: Vec<u8>) -> Self {
        self.previous_bitmap = Some(bitmap);
        self
    }

    pub fn with_location_items(mut self, n: usize) -> Self {
        self.location_items = n;
        self
    }

    pub fn catalog_guid(&self) -> Uuid {
        Uuid::from_u128(self.shadow_copy_id.as_u128() ^ 0xFFFF)
    }
}

/// Blocks used per snapshot: table, application info, location, bitmap, previous bitmap.
const BLOCKS_PER_SNAPSHOT: u64 = 5;

pub fn snapshot_block(index: usize, slot: u64) -> u64 {
    STORE_AREA + BLOCK * (1 + index as u64 * BLOCKS_PER_SNAPSHOT + slot)
}

/// A complete volume with a VSS store holding `specs` (catalog order as given).
pub fn build_volume(specs: &[SnapshotSpec]) -> VolumeBuilder {
    let mut v = VolumeBuilder::new(VOLUME_SIZE);
    v.index_header(CATALOG_OFFSET);

    let mut catalog = Vec::new();
    for (i, spec) in specs.iter().enumerate() {
        let table = snapshot_block(i, 0);
        let app = snapshot_block(i, 1);
        let location = snapshot_block(i, 2);
        let bitmap = snapshot_block(i, 3);
        let previous = snapshot_block(i, 4);

        v.diff_area_table(table, 0, &spec.entries);
        v.application_info(app, spec.shadow_copy_id, "workstation.corp", "workstation.corp");
        v.location_table(location, spec.location_items);
        v.bitmap(bitmap, 0, &spec.bitmap);
        let previous_offset = match &spec.previous_bitmap {
            Some(p) => {
                v.bitmap(previous, 0, p);
                previous
            }
            None => 0,
        };

        let guid = spec.catalog_guid();
        catalog.push(snapshot_info_entry(guid, VOLUME_SIZE, spec.position, spec.creation_time));
        catalog.push(diff_area_info_entry(guid, table, app, location, bitmap, previous_offset));
    }
    v.catalog(CATALOG_OFFSET, 0, &catalog);
    v
}

/// Reader that records (offset, length) of every read call.
pub struct CountingReader {
    inner: Cursor<Vec<u8>>,
    pub reads: Rc<RefCell<Vec<(u64, usize)>>>,
}

impl CountingReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            inner: Cursor::new(data),
            reads: Rc::new(RefCell::new(Vec::new())),
        }
    }

    pub fn reset(&self) {
        self.reads.borrow_mut().clear();
    }

    pub fn read_count(&self) -> usize {
        self.reads.borrow().len()
    }

    pub fn read_offsets(&self) -> Vec<u64> {
        self.reads.borrow().iter().map(|(o, _)| *o).collect()
    }
}

impl Read for CountingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reads.borrow_mut().push((self.inner.position(), buf.len()));
        self.inner.read(buf)
    }
}

impl Seek for CountingReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.inner.seek(pos)
    }
}
