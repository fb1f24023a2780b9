use pnet::packet::ethernet::{EtherType, EthernetPacket, MutableEthernetPacket};
use pnet::util::MacAddr;

use crate::error::{ControllerError, Result};
use crate::types::{PacketMeta, PortNo, SwitchId};

pub const ETHERNET_HEADER_LEN: usize = 14;

/// Reads the Ethernet addresses of a frame received in a packet-in.
pub fn parse_frame(switch: SwitchId, in_port: PortNo, data: &[u8]) -> Result<PacketMeta> {
    let frame = EthernetPacket::new(data).ok_or(ControllerError::MalformedPacket {
        switch,
        len: data.len(),
    })?;

    Ok(PacketMeta {
        switch,
        in_port,
        src: frame.get_source(),
        dst: frame.get_destination(),
    })
}

/// Builds an Ethernet frame around `payload`.
pub fn build_frame(src: MacAddr, dst: MacAddr, ethertype: EtherType, payload: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0u8; ETHERNET_HEADER_LEN + payload.len()];
    if let Some(mut frame) = MutableEthernetPacket::new(&mut buffer) {
        frame.set_source(src);
        frame.set_destination(dst);
        frame.set_ethertype(ethertype);
    }
    buffer[ETHERNET_HEADER_LEN..].copy_from_slice(payload);
    buffer
}
