// tests/read_path.rs
//
// Chunked reads over a shadow copy, checked against the bytes of the
// synthetic image and against the reads issued to it:
// - overlay + live volume inside one block, one read per source
// - marked blocks without a saved copy read as zeros without I/O,
//   for one layer and across a chain
// - reads near u64::MAX are rejected or clamped, never wrap
// - copy-on-write reads and merging of contiguous sources across blocks
// - ShadowCopyStream: seek rules, size clamp, short reads
// - randomized comparison with a per-byte reference resolver

mod common;

use anyhow::Result;
use oorandom::Rand64;
use std::io::{self, Cursor, Read, Seek, SeekFrom};

use common::*;
use vsstore::record::diff_area::bitmap_bit;
use vsstore::snapshots::ChunkKind;
use vsstore::{ShadowCopy, ShadowCopyStream, VssConfig};

fn data_block(n: u64) -> u64 {
    116 * BLOCK + n * BLOCK
}

/// Image holding the store for `specs` plus filled data blocks.
fn image(specs: &[SnapshotSpec]) -> Vec<u8> {
    let mut v = build_volume(specs);
    for n in 0..12 {
        v.saved_block(data_block(n));
    }
    v.data
}

fn open(specs: &[SnapshotSpec], index: usize) -> Result<(CountingReader, ShadowCopy, Vec<u8>)> {
    let data = image(specs);
    let mut reader = CountingReader::new(data.clone());
    let sc = ShadowCopy::parse(&mut reader, &specs[index].shadow_copy_id, &VssConfig::default())?;
    reader.reset();
    Ok((reader, sc, data))
}

#[test]
fn overlay_and_live_volume_within_one_block() -> Result<()> {
    let specs = vec![SnapshotSpec::new(1, vec![overlay(0x4000, data_block(0), 0x0F)])];
    let (mut reader, sc, data) = open(&specs, 0)?;

    let mut buf = vec![0u8; 2048];
    let n = sc.read_at(&mut reader, 0x4100, &mut buf)?;
    assert_eq!(n, 2048);

    let overlay_src = data_block(0) as usize + 0x100;
    assert_eq!(&buf[..1792], &data[overlay_src..overlay_src + 1792]);
    assert_eq!(&buf[1792..], &data[0x4800..0x4800 + 256]);

    assert_eq!(reader.read_offsets(), vec![data_block(0) + 0x100, 0x4800]);
    Ok(())
}

#[test]
fn planned_chunks_start_on_sub_block_boundaries() -> Result<()> {
    let specs = vec![SnapshotSpec::new(1, vec![overlay(0x4000, data_block(0), 0x0F)])];
    let (_, sc, _) = open(&specs, 0)?;

    let plan = sc.plan_read(0x4100, 2048);
    assert_eq!(plan.len(), 2);
    assert_eq!(plan[0].kind, ChunkKind::Overlay);
    assert_eq!((plan[0].offset, plan[0].length), (data_block(0), 2048));
    assert_eq!(plan[1].kind, ChunkKind::CurrentVolume);
    assert_eq!((plan[1].offset, plan[1].length, plan[1].offset_in_block), (0x4800, 512, 2048));
    Ok(())
}

#[test]
fn marked_block_without_saved_copy_reads_as_zeros() -> Result<()> {
    // block 3 marked in the bitmap, no entry for it
    let specs = vec![SnapshotSpec::new(1, vec![]).with_bitmap(vec![0b0000_1000])];
    let (mut reader, sc, _) = open(&specs, 0)?;

    let mut buf = vec![0xAAu8; 4096];
    let n = sc.read_at(&mut reader, 0xC000 + 1000, &mut buf)?;
    assert_eq!(n, 4096);
    assert!(buf.iter().all(|&b| b == 0));
    assert_eq!(reader.read_count(), 0);
    Ok(())
}

#[test]
fn marked_block_without_saved_copy_in_any_layer_reads_as_zeros() -> Result<()> {
    // block 3 marked in both layers, neither records an entry for it
    let specs = vec![
        SnapshotSpec::new(1, vec![cow(0x4000, data_block(0))]).with_bitmap(vec![0xFF]),
        SnapshotSpec::new(2, vec![cow(0x8000, data_block(1))])
            .with_bitmap(vec![0xFF])
            .with_previous_bitmap(vec![0xFF]),
    ];

    for index in [1, 0] {
        let (mut reader, sc, _) = open(&specs, index)?;
        assert_eq!(bitmap_bit(sc.bitmap(), 0xC000), Some(true));
        assert_eq!(sc.get_block_descriptors(0xC000), (None, None));

        let mut buf = vec![0xAAu8; BLOCK as usize];
        assert_eq!(sc.read_at(&mut reader, 0xC000, &mut buf)?, buf.len());
        assert!(buf.iter().all(|&b| b == 0), "layer {index}");
        assert_eq!(reader.read_count(), 0, "layer {index}");
    }
    Ok(())
}

#[test]
fn blocks_beyond_the_bitmap_read_as_zeros() -> Result<()> {
    let specs = vec![SnapshotSpec::new(1, vec![])];
    let (mut reader, parsed, _) = open(&specs, 0)?;
    // an empty effective bitmap covers nothing
    let sc = ShadowCopy::initialize(&[vsstore::Snapshot::from_table(
        parsed.information().snapshot.clone(),
        &Default::default(),
        vec![],
        vec![],
    )])?;

    let mut buf = vec![0x55u8; 600];
    assert_eq!(sc.read_at(&mut reader, 0x10, &mut buf)?, 600);
    assert!(buf.iter().all(|&b| b == 0));
    assert_eq!(reader.read_count(), 0);
    Ok(())
}

#[test]
fn copy_on_write_read_with_unaligned_start() -> Result<()> {
    let specs = vec![SnapshotSpec::new(1, vec![cow(0x10000, data_block(2))]).with_bitmap(vec![0xFF])];
    let (mut reader, sc, data) = open(&specs, 0)?;

    let mut buf = vec![0u8; 5000];
    assert_eq!(sc.read_at(&mut reader, 0x10000 + 100, &mut buf)?, 5000);
    let src = data_block(2) as usize + 100;
    assert_eq!(&buf[..], &data[src..src + 5000]);
    assert_eq!(reader.read_count(), 1);
    Ok(())
}

#[test]
fn contiguous_sources_merge_across_blocks() -> Result<()> {
    let specs = vec![SnapshotSpec::new(
        1,
        vec![cow(0x14000, data_block(4)), cow(0x18000, data_block(5))],
    )];
    let (mut reader, sc, data) = open(&specs, 0)?;

    let mut buf = vec![0u8; 0x8000];
    assert_eq!(sc.read_at(&mut reader, 0x14000, &mut buf)?, 0x8000);
    let src = data_block(4) as usize;
    assert_eq!(&buf[..], &data[src..src + 0x8000]);
    assert_eq!(reader.read_count(), 1);

    // untouched live blocks merge as well
    reader.reset();
    let mut buf = vec![0u8; 0x10000 + 10];
    assert_eq!(sc.read_at(&mut reader, 0x20000 - 5, &mut buf)?, buf.len());
    assert_eq!(&buf[..], &data[0x20000 - 5..0x30000 + 5]);
    assert_eq!(reader.read_count(), 1);

    // non-contiguous sources do not
    reader.reset();
    let mut buf = vec![0u8; 0x10000];
    assert_eq!(sc.read_at(&mut reader, 0x10000, &mut buf)?, 0x10000);
    assert_eq!(
        reader.read_offsets(),
        vec![0x10000, data_block(4), 0x1C000]
    );
    Ok(())
}

#[test]
fn reads_at_the_top_of_the_offset_range() -> Result<()> {
    let specs = vec![SnapshotSpec::new(1, vec![])];
    let (mut reader, sc, _) = open(&specs, 0)?;

    let mut buf = vec![0x11u8; 100];
    let err = sc.read_at(&mut reader, u64::MAX - 10, &mut buf).unwrap_err();
    assert_eq!(err.kind(), vsstore::ErrorKind::InvalidArgument);

    // ends exactly at u64::MAX: outside the bitmap, zeros
    assert_eq!(sc.read_at(&mut reader, u64::MAX - 100, &mut buf)?, 100);
    assert!(buf.iter().all(|&b| b == 0));
    assert_eq!(reader.read_count(), 0);

    let plan = sc.plan_read(u64::MAX - 10, 100);
    assert_eq!(plan.len(), 1);
    assert_eq!(plan[0].kind, ChunkKind::Zeroes);
    assert_eq!(plan[0].end_offset, u64::MAX);
    Ok(())
}

#[test]
fn zero_length_read_does_nothing() -> Result<()> {
    let specs = vec![SnapshotSpec::new(1, vec![])];
    let (mut reader, sc, _) = open(&specs, 0)?;
    assert_eq!(sc.read_at(&mut reader, 0x4000, &mut [])?, 0);
    assert_eq!(reader.read_count(), 0);
    Ok(())
}

#[test]
fn stream_seek_rules_and_size_clamp() -> Result<()> {
    let specs = vec![SnapshotSpec::new(1, vec![cow(0x4000, data_block(0))])];
    let data = image(&specs);
    let mut stream = ShadowCopyStream::open(Cursor::new(data.clone()), &specs[0].shadow_copy_id, &VssConfig::default())?;
    assert_eq!(stream.size(), VOLUME_SIZE);

    let err = stream.seek(SeekFrom::End(0)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    let err = stream.seek(SeekFrom::Current(-1)).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    assert_eq!(stream.position(), 0);

    assert_eq!(stream.seek(SeekFrom::Start(0x4000 - 10))?, 0x4000 - 10);
    let mut buf = [0u8; 20];
    stream.read_exact(&mut buf)?;
    assert_eq!(&buf[..10], &data[0x4000 - 10..0x4000]);
    assert_eq!(&buf[10..], &data[data_block(0) as usize..data_block(0) as usize + 10]);
    assert_eq!(stream.seek(SeekFrom::Current(-20))?, 0x4000 - 10);

    stream.seek(SeekFrom::Start(VOLUME_SIZE - 100))?;
    let mut buf = vec![0u8; 4096];
    assert_eq!(stream.read(&mut buf)?, 100);
    assert_eq!(stream.read(&mut buf)?, 0);

    // past the end: nothing, no error
    stream.seek(SeekFrom::Start(VOLUME_SIZE + 4096))?;
    assert_eq!(stream.read(&mut buf)?, 0);
    Ok(())
}

#[test]
fn truncated_image_gives_short_reads() -> Result<()> {
    let specs = vec![SnapshotSpec::new(1, vec![])];
    let mut data = image(&specs);
    let cut = 120 * BLOCK;
    data.truncate(cut as usize);

    let mut reader = Cursor::new(data);
    let sc = ShadowCopy::parse(&mut reader, &specs[0].shadow_copy_id, &VssConfig::default())?;

    let mut buf = vec![0u8; 1000];
    assert_eq!(sc.read_at(&mut reader, cut - 100, &mut buf)?, 100);
    assert_eq!(sc.read_at(&mut reader, cut, &mut buf)?, 0);

    let mut stream = ShadowCopyStream::new(reader, sc);
    stream.seek(SeekFrom::Start(cut - 300))?;
    let mut all = Vec::new();
    stream.read_to_end(&mut all)?;
    assert_eq!(all.len(), 300);
    Ok(())
}

/// Byte of the shadow copy at `offset`, resolved one byte at a time.
fn reference_byte(sc: &ShadowCopy, image: &[u8], offset: u64) -> u8 {
    let block = offset & !(BLOCK - 1);
    let within = offset - block;
    let sub = (within / 512) as u32;
    let (overlay, cow) = sc.get_block_descriptors(block);

    if let Some(o) = overlay.filter(|o| o.bitmap & (1 << sub) != 0) {
        return image[(o.offset + within) as usize];
    }
    if let Some(c) = cow {
        return image[(c.offset + within) as usize];
    }
    match bitmap_bit(sc.bitmap(), block) {
        Some(false) => image[offset as usize],
        _ => 0,
    }
}

fn random_entries(rng: &mut Rand64) -> Vec<TestEntry> {
    let mut entries = Vec::new();
    for _ in 0..rng.rand_range(0..10) {
        let offset = rng.rand_range(0..64) * BLOCK;
        match rng.rand_range(0..4) {
            0 => entries.push(forwarder(offset, rng.rand_range(0..64) * BLOCK)),
            1 => entries.push(overlay(
                offset,
                data_block(rng.rand_range(0..12)),
                rng.rand_u64() as u32,
            )),
            _ => entries.push(cow(offset, data_block(rng.rand_range(0..12)))),
        }
    }
    entries
}

#[test]
fn randomized_reads_match_reference_resolver() -> Result<()> {
    let mut rng = Rand64::new(0x5EED_0F_5C_u128);

    for round in 0..6 {
        let specs: Vec<SnapshotSpec> = (0..3)
            .map(|i| {
                let bitmap: Vec<u8> = (0..8).map(|_| rng.rand_u64() as u8).collect();
                SnapshotSpec::new(i + 1, random_entries(&mut rng)).with_bitmap(bitmap)
            })
            .collect();
        let data = image(&specs);
        let mut reader = Cursor::new(data.clone());
        let shadow_copies = ShadowCopy::parse_all(&mut reader, &VssConfig::default())?;
        assert_eq!(shadow_copies.len(), 3, "round {round}");

        for sc in &shadow_copies {
            for _ in 0..20 {
                let offset = rng.rand_range(0..64 * BLOCK);
                let max_len = (64 * BLOCK - offset).min(20_000);
                let len = rng.rand_range(1..max_len + 1) as usize;

                let mut buf = vec![0u8; len];
                let n = sc.read_at(&mut reader, offset, &mut buf)?;
                assert_eq!(n, len, "round {round} offset {offset:#x} len {len}");

                for (i, &b) in buf.iter().enumerate() {
                    let at = offset + i as u64;
                    assert_eq!(
                        b,
                        reference_byte(sc, &data, at),
                        "round {round} mismatch at {at:#x} (read {offset:#x}+{len})"
                    );
                }
            }
        }
    }
    Ok(())
}
