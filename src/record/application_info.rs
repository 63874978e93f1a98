//! record/application_info — the per-snapshot ApplicationInformation block.
//!
//! Layout: 128-byte header (node + payload size), then the provider payload.
//! Only the Microsoft software provider payload (VssLocalInfo) is decoded.

use byteorder::{ByteOrder, LittleEndian};
use log::{debug, warn};
use serde::Serialize;
use std::io::{Read, Seek};
use uuid::Uuid;

use crate::consts::{
    APPLICATION_INFO_HEADER_SIZE, MICROSOFT_HIDDEN_PROVIDER_GUID, MICROSOFT_PROVIDER_GUID,
    STORE_BLOCK_SIZE, VSS_LOCAL_INFO_SIZE,
};
use crate::error::{Error, Result};
use crate::record::attributes::{SnapshotContext, VolumeSnapshotAttributes};
use crate::record::common::*;
use crate::record::node::{Node, NodeType};
use crate::util::{decode_utf16_le, guid_from_le, is_zeroed, read_block_at};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VssLocalInfo {
    /// Provider guid.
    pub guid: Uuid,
    pub shadow_copy_id: Uuid,
    pub shadow_copy_set_id: Uuid,
    pub snapshot_context: SnapshotContext,
    pub snapshots_count: u32,
    pub attributes: VolumeSnapshotAttributes,
    pub unknown: u32,
    pub machine: String,
    pub service: String,
}

/// Split a u16-length-prefixed string off the front of `buf`.
fn take_length_value<'a>(buf: &mut &'a [u8]) -> Option<&'a [u8]> {
    if buf.len() < 2 {
        return None;
    }
    let len = LittleEndian::read_u16(&buf[..2]) as usize;
    let rest = &buf[2..];
    if rest.len() < len {
        return None;
    }
    let (value, tail) = rest.split_at(len);
    *buf = tail;
    Some(value)
}

impl VssLocalInfo {
    /// `buf` starts right after the application information header.
    pub fn parse(buf: &[u8]) -> Result<Self> {
        Error::check_size("VssLocalInfo", buf, VSS_LOCAL_INFO_SIZE)?;

        let raw_guid = &buf[LOCAL_OFF_GUID..LOCAL_OFF_GUID + 16];
        let guid = guid_from_le(raw_guid);
        if raw_guid != MICROSOFT_PROVIDER_GUID && raw_guid != MICROSOFT_HIDDEN_PROVIDER_GUID {
            warn!("VSS VssLocalInfo has unexpected provider guid {}", guid);
        }

        let context = LittleEndian::read_u32(&buf[LOCAL_OFF_CONTEXT..LOCAL_OFF_CONTEXT + 4]);
        let attributes = LittleEndian::read_u32(&buf[LOCAL_OFF_ATTRIBUTES..LOCAL_OFF_ATTRIBUTES + 4]);

        let mut dynamic = &buf[VSS_LOCAL_INFO_SIZE..];
        let machine = match take_length_value(&mut dynamic) {
            Some(v) => decode_utf16_le(v),
            None => {
                debug!("VSS VssLocalInfo machine string is truncated");
                String::new()
            }
        };
        let service = match take_length_value(&mut dynamic) {
            Some(v) => decode_utf16_le(v),
            None => {
                debug!("VSS VssLocalInfo service string is truncated");
                String::new()
            }
        };

        Ok(Self {
            guid,
            shadow_copy_id: guid_from_le(&buf[LOCAL_OFF_SHADOW_COPY_ID..LOCAL_OFF_SHADOW_COPY_ID + 16]),
            shadow_copy_set_id: guid_from_le(
                &buf[LOCAL_OFF_SHADOW_COPY_SET_ID..LOCAL_OFF_SHADOW_COPY_SET_ID + 16],
            ),
            snapshot_context: SnapshotContext::from_raw(context),
            snapshots_count: LittleEndian::read_u32(
                &buf[LOCAL_OFF_SNAPSHOTS_COUNT..LOCAL_OFF_SNAPSHOTS_COUNT + 4],
            ),
            attributes: VolumeSnapshotAttributes::from_raw(attributes),
            unknown: LittleEndian::read_u32(&buf[LOCAL_OFF_UNKNOWN..LOCAL_OFF_UNKNOWN + 4]),
            machine,
            service,
        })
    }

    /// Payload size this record would occupy, for the header consistency check.
    pub fn encoded_size(&self) -> u64 {
        let utf16_len = |s: &str| s.encode_utf16().count() as u64 * 2;
        VSS_LOCAL_INFO_SIZE as u64 + 2 + utf16_len(&self.machine) + 2 + utf16_len(&self.service)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ApplicationInformation {
    pub node: Node,
    pub info_size: u64,
    /// None when the payload could not be decoded as VssLocalInfo.
    pub local_info: Option<VssLocalInfo>,
}

impl ApplicationInformation {
    pub fn parse(buf: &[u8]) -> Result<Self> {
        Error::check_size("application information", buf, APPLICATION_INFO_HEADER_SIZE)?;
        let node = Node::parse_expecting(buf, NodeType::ApplicationInfo)?;

        let info_size = LittleEndian::read_u64(&buf[APP_OFF_INFO_SIZE..APP_OFF_INFO_SIZE + 8]);
        if !is_zeroed(&buf[APP_OFF_PADDING..APPLICATION_INFO_HEADER_SIZE]) {
            debug!("VSS application information has unexpected non-zero padding");
        }

        let local_info = match VssLocalInfo::parse(&buf[APPLICATION_INFO_HEADER_SIZE..]) {
            Ok(info) => {
                let computed = info.encoded_size();
                if computed != info_size {
                    debug!(
                        "VSS application information size mismatch (stored: {}, computed: {})",
                        info_size, computed
                    );
                }
                Some(info)
            }
            Err(e) => {
                debug!("VSS application information payload not decoded: {}", e);
                None
            }
        };

        Ok(Self {
            node,
            info_size,
            local_info,
        })
    }

    /// Read the 16 KiB block at `offset` and decode it.
    pub fn read<R: Read + Seek + ?Sized>(stream: &mut R, offset: u64) -> Result<Self> {
        let mut block = vec![0u8; STORE_BLOCK_SIZE];
        read_block_at(stream, offset, &mut block, "application information")?;
        Self::parse(&block)
    }
}
