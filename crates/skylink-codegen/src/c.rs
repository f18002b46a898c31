//! C emitter for the embedded side.
//!
//! Produces an encode unit (one send function per packet, every board) and
//! a dispatch unit (one address switch for the listening board, calling
//! application-defined handlers). Integers are packed with shifts so the
//! declared byte order holds on any host; floats go through a byte union
//! and assume a little-endian target, reversing bytes for big-endian
//! packets.

use std::fmt::Write;

use skylink_frame::{ESCAPE, MAX_PAYLOAD, SYNC};
use skylink_schema::{Endian, PacketDefinition, ScalarType};

use crate::error::Result;
use crate::plan::GenerationPlan;
use crate::target::{Artifact, Target};

pub const ENCODE_HEADER: &str = "skylink_encode.h";
pub const ENCODE_SOURCE: &str = "skylink_encode.c";
pub const DISPATCH_HEADER: &str = "skylink_dispatch.h";
pub const DISPATCH_SOURCE: &str = "skylink_dispatch.c";

const BANNER: &str = "// AUTOGENERATED FILE: DO NOT EDIT MANUALLY\n";

const DATA_UNION: &str = "typedef union {
    uint8_t b[4];
    uint32_t i;
    float f;
} SkylinkDataUnion_t;
";

/// Sync, two meta bytes, payload and checksum, every byte escaped.
const MAX_FRAME: usize = 1 + 2 * (2 + MAX_PAYLOAD + 1);

#[derive(Debug, Clone, Copy, Default)]
pub struct CTarget;

impl Target for CTarget {
    fn name(&self) -> &'static str {
        "c"
    }

    fn render(&self, plan: &GenerationPlan<'_>) -> Result<Vec<Artifact>> {
        Ok(vec![
            Artifact::new(ENCODE_HEADER, encode_header(plan)?),
            Artifact::new(ENCODE_SOURCE, encode_source(plan)?),
            Artifact::new(DISPATCH_HEADER, dispatch_header()?),
            Artifact::new(DISPATCH_SOURCE, dispatch_source(plan)?),
        ])
    }
}

fn encode_header(plan: &GenerationPlan<'_>) -> std::result::Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{BANNER}")?;
    writeln!(out, "#ifndef SKYLINK_ENCODE_H")?;
    writeln!(out, "#define SKYLINK_ENCODE_H\n")?;
    writeln!(out, "#include <stdbool.h>")?;
    writeln!(out, "#include <stddef.h>")?;
    writeln!(out, "#include <stdint.h>\n")?;
    writeln!(out, "#define SKYLINK_SYNC (0x{SYNC:02X})")?;
    writeln!(out, "#define SKYLINK_ESCAPE (0x{ESCAPE:02X})")?;
    writeln!(out, "#define SKYLINK_MAX_PAYLOAD ({MAX_PAYLOAD})")?;
    writeln!(out, "#define SKYLINK_MAX_FRAME ({MAX_FRAME})\n")?;
    writeln!(
        out,
        "typedef struct {{
    uint16_t address;
    uint8_t length;
    bool rtr;
    uint8_t data[SKYLINK_MAX_PAYLOAD];
}} SkylinkPacket_t;

typedef void (*SkylinkSendFxn)(const SkylinkPacket_t *packet);

void skylink_init(SkylinkSendFxn send_serial, SkylinkSendFxn send_secondary);

size_t skylink_frame(const SkylinkPacket_t *packet, uint8_t out[SKYLINK_MAX_FRAME]);
"
    )?;

    for packet in plan.encode_packets() {
        writeln!(
            out,
            "void skylink_send_{}({});",
            c_ident(&packet.qualified_name()),
            encode_params(packet)
        )?;
    }

    writeln!(out, "\n#endif // SKYLINK_ENCODE_H")?;
    Ok(out)
}

fn encode_source(plan: &GenerationPlan<'_>) -> std::result::Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{BANNER}")?;
    writeln!(out, "#include <string.h>\n")?;
    writeln!(out, "#include \"{ENCODE_HEADER}\"\n")?;
    writeln!(out, "{DATA_UNION}")?;
    writeln!(
        out,
        "static SkylinkSendFxn send_serial_fxn = NULL;
static SkylinkSendFxn send_secondary_fxn = NULL;

void skylink_init(SkylinkSendFxn send_serial, SkylinkSendFxn send_secondary)
{{
    send_serial_fxn = send_serial;
    send_secondary_fxn = send_secondary;
}}

size_t skylink_frame(const SkylinkPacket_t *packet, uint8_t out[SKYLINK_MAX_FRAME])
{{
    uint8_t raw[2 + SKYLINK_MAX_PAYLOAD + 1];
    uint8_t length = packet->length > SKYLINK_MAX_PAYLOAD ? SKYLINK_MAX_PAYLOAD : packet->length;
    uint8_t sum = 0;
    size_t n = 0;
    size_t w = 0;
    size_t i;

    raw[n++] = (uint8_t)(packet->address / 8);
    raw[n++] = (uint8_t)((packet->address % 8) * 32 + (packet->rtr ? 16 : 0) + length);
    memcpy(&raw[n], packet->data, length);
    n += length;
    for (i = 0; i < n; i++)
    {{
        sum += raw[i];
    }}
    raw[n++] = sum;

    out[w++] = SKYLINK_SYNC;
    for (i = 0; i < n; i++)
    {{
        if (raw[i] == SKYLINK_SYNC || raw[i] == SKYLINK_ESCAPE)
        {{
            out[w++] = SKYLINK_ESCAPE;
            out[w++] = raw[i] ^ 0x20;
        }}
        else
        {{
            out[w++] = raw[i];
        }}
    }}
    return w;
}}"
    )?;

    for packet in plan.encode_packets() {
        write_send_fn(&mut out, packet)?;
    }
    Ok(out)
}

fn write_send_fn(out: &mut String, packet: &PacketDefinition) -> std::fmt::Result {
    let has_float = packet.fields().iter().any(|f| f.ty().is_float());

    writeln!(
        out,
        "\nvoid skylink_send_{}({})\n{{",
        c_ident(&packet.qualified_name()),
        encode_params(packet)
    )?;
    writeln!(out, "    SkylinkPacket_t skylink_packet;")?;
    if has_float {
        writeln!(out, "    SkylinkDataUnion_t skylink_union;")?;
    }
    writeln!(out)?;
    writeln!(out, "    skylink_packet.address = 0x{:x};", packet.address())?;
    writeln!(out, "    skylink_packet.rtr = false;")?;
    writeln!(out, "    skylink_packet.length = {};", packet.payload_len())?;

    for (offset, field) in packet.field_offsets() {
        let name = c_ident(field.name());
        let ty = field.ty();
        writeln!(out)?;
        if ty.is_float() {
            writeln!(out, "    skylink_union.f = {name};")?;
            for i in 0..ty.width() {
                let pos = offset + byte_position(i, ty.width(), packet.endian());
                writeln!(out, "    skylink_packet.data[{pos}] = skylink_union.b[{i}];")?;
            }
        } else if ty.width() == 1 {
            writeln!(out, "    skylink_packet.data[{offset}] = (uint8_t){name};")?;
        } else {
            let carrier = unsigned_carrier(ty);
            for i in 0..ty.width() {
                let shift = 8 * byte_position(i, ty.width(), packet.endian());
                writeln!(
                    out,
                    "    skylink_packet.data[{}] = (uint8_t)(({carrier}){name} >> {shift});",
                    offset + i
                )?;
            }
        }
    }

    writeln!(
        out,
        "
    if (send_serial_fxn != NULL)
    {{
        send_serial_fxn(&skylink_packet);
    }}

    if (!serial_only && send_secondary_fxn != NULL)
    {{
        send_secondary_fxn(&skylink_packet);
    }}
}}"
    )
}

fn dispatch_header() -> std::result::Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{BANNER}")?;
    writeln!(out, "#ifndef SKYLINK_DISPATCH_H")?;
    writeln!(out, "#define SKYLINK_DISPATCH_H\n")?;
    writeln!(out, "#include \"{ENCODE_HEADER}\"\n")?;
    writeln!(
        out,
        "void skylink_dispatch(uint16_t address, uint8_t length, bool rtr, const uint8_t *data);"
    )?;
    writeln!(out, "void skylink_dispatch_packet(const SkylinkPacket_t *packet);")?;
    writeln!(out, "\n#endif // SKYLINK_DISPATCH_H")?;
    Ok(out)
}

fn dispatch_source(plan: &GenerationPlan<'_>) -> std::result::Result<String, std::fmt::Error> {
    let mut out = String::new();
    writeln!(out, "{BANNER}")?;
    writeln!(out, "#include \"{DISPATCH_HEADER}\"\n")?;
    writeln!(out, "{DATA_UNION}")?;
    writeln!(out, "// Application must define all of these handlers")?;
    for packet in plan.dispatch_packets() {
        writeln!(
            out,
            "void skylink_on_{}({});",
            c_ident(&packet.qualified_name()),
            handler_params(packet)
        )?;
    }

    writeln!(
        out,
        "
void skylink_dispatch_packet(const SkylinkPacket_t *packet)
{{
    skylink_dispatch(packet->address, packet->length, packet->rtr, packet->data);
}}

void skylink_dispatch(uint16_t address, uint8_t length, bool rtr, const uint8_t *data)
{{
    (void)rtr;

    switch (address)
    {{"
    )?;

    for packet in plan.dispatch_packets() {
        let args: Vec<String> = packet
            .field_offsets()
            .map(|(offset, field)| decode_expr(field.ty(), offset, packet.endian()))
            .collect();
        writeln!(out, "        case 0x{:x}:", packet.address())?;
        writeln!(out, "            if (length < {})", packet.payload_len())?;
        writeln!(out, "            {{")?;
        writeln!(out, "                break;")?;
        writeln!(out, "            }}")?;
        writeln!(
            out,
            "            skylink_on_{}({});",
            c_ident(&packet.qualified_name()),
            args.join(", ")
        )?;
        writeln!(out, "            break;")?;
    }

    writeln!(out, "        default:")?;
    writeln!(out, "            break;")?;
    writeln!(out, "    }}")?;
    writeln!(out, "}}")?;
    Ok(out)
}

/// Expression reading one field out of `data`.
fn decode_expr(ty: ScalarType, offset: usize, endian: Endian) -> String {
    let width = ty.width();
    if ty.is_float() {
        let bytes: Vec<String> = (0..width)
            .map(|i| format!("data[{}]", offset + byte_position(i, width, endian)))
            .collect();
        return format!("((SkylinkDataUnion_t){{ .b = {{ {} }} }}).f", bytes.join(", "));
    }
    if width == 1 {
        return format!("({})data[{offset}]", ty.c_type());
    }

    let carrier = unsigned_carrier(ty);
    let parts: Vec<String> = (0..width)
        .map(|i| {
            let shift = 8 * byte_position(i, width, endian);
            if shift == 0 {
                format!("({carrier})data[{}]", offset + i)
            } else {
                format!("(({carrier})data[{}] << {shift})", offset + i)
            }
        })
        .collect();
    format!("({})({})", ty.c_type(), parts.join(" | "))
}

/// Significance of the `i`th payload byte of a field, in bytes.
///
/// Little-endian puts the least significant byte first. The same mapping
/// places float union bytes, since the target is little-endian.
fn byte_position(i: usize, width: usize, endian: Endian) -> usize {
    match endian {
        Endian::Little => i,
        Endian::Big => width - 1 - i,
    }
}

fn unsigned_carrier(ty: ScalarType) -> &'static str {
    match ty.width() {
        1 => "uint8_t",
        2 => "uint16_t",
        _ => "uint32_t",
    }
}

fn field_params(packet: &PacketDefinition) -> Vec<String> {
    packet
        .fields()
        .iter()
        .map(|field| format!("{} {}", field.ty().c_type(), c_ident(field.name())))
        .collect()
}

fn encode_params(packet: &PacketDefinition) -> String {
    let mut params = field_params(packet);
    params.push("bool serial_only".to_string());
    params.join(", ")
}

fn handler_params(packet: &PacketDefinition) -> String {
    let params = field_params(packet);
    if params.is_empty() {
        "void".to_string()
    } else {
        params.join(", ")
    }
}

/// Replace anything that cannot appear in a C identifier.
fn c_ident(name: &str) -> String {
    let mut ident: String = name
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    ident
}
