// ── ELK-BLEDOM command framing ──
//
// Every command is a fixed 9-byte frame: 0x7E header, 0xEF trailer,
// opcode and payload in between. The strip acknowledges nothing; frames
// are written without response.

use uuid::Uuid;

/// Advertised control service (the "definite match" signal during scans).
/// 16-bit UUID `0xFFF0` expanded onto the Bluetooth base UUID.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x0000_FFF0_0000_1000_8000_0080_5F9B_34FB);

/// Write characteristic carrying command frames (`0xFFF3`).
pub const WRITE_CHARACTERISTIC_UUID: Uuid =
    Uuid::from_u128(0x0000_FFF3_0000_1000_8000_0080_5F9B_34FB);

/// Short form of [`SERVICE_UUID`] as it appears in advertisement payloads.
pub const SERVICE_SHORT_ID: &str = "fff0";

const FRAME_HEADER: u8 = 0x7E;
const FRAME_TRAILER: u8 = 0xEF;

/// Build a static-color frame.
pub fn color_frame(r: u8, g: u8, b: u8) -> [u8; 9] {
    [FRAME_HEADER, 0x00, 0x05, 0x03, r, g, b, 0x00, FRAME_TRAILER]
}

/// Build a power on/off frame.
pub fn power_frame(on: bool) -> [u8; 9] {
    if on {
        [FRAME_HEADER, 0x00, 0x04, 0xF0, 0x00, 0x01, 0xFF, 0x00, FRAME_TRAILER]
    } else {
        [FRAME_HEADER, 0x00, 0x04, 0x00, 0x00, 0x00, 0xFF, 0x00, FRAME_TRAILER]
    }
}

/// Build a brightness frame. `level` is a percentage and is clamped to 100.
pub fn brightness_frame(level: u8) -> [u8; 9] {
    let level = level.min(100);
    [FRAME_HEADER, 0x00, 0x01, level, 0x00, 0x00, 0x00, 0x00, FRAME_TRAILER]
}

/// Collapse a full 128-bit UUID built on the Bluetooth base UUID into its
/// 16-bit short form (e.g. `"fff0"`); anything else keeps the hyphenated
/// 128-bit rendering. Advertisement matching compares short forms.
pub fn short_uuid(uuid: &Uuid) -> String {
    // Base UUID tail: xxxxxxxx-0000-1000-8000-00805F9B34FB
    const BASE_TAIL: [u8; 12] = [
        0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0x80, 0x5F, 0x9B, 0x34, 0xFB,
    ];
    let bytes = uuid.as_bytes();
    if bytes[0] == 0 && bytes[1] == 0 && bytes[4..] == BASE_TAIL {
        format!("{:02x}{:02x}", bytes[2], bytes[3])
    } else {
        uuid.to_string()
    }
}
