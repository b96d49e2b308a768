//! Implementation of the various GP0 commands.

use log::warn;

use crate::error::{PsxError, Result};
use crate::psx::bus::Bus;
use crate::psx::gpu::link::GpuMsg;
use crate::psx::gpu::Gp0Mode;

/// Description of a GP0 command
pub struct Command {
    /// Callback function to actually perform the command once it has been fully received. The
    /// handler works on the pre-filled command buffer, not on a word stream.
    pub handler: fn(&mut Bus) -> Result<()>,
    /// Total length of the command in words, header included
    pub len: u8,
}

impl Command {
    const fn new(len: u8, handler: fn(&mut Bus) -> Result<()>) -> Command {
        Command { len, handler }
    }
}

/// A vertex's coordinates
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Parse a position from a position word: signed 11 bit x coordinate in bits [10:0], signed
    /// 11 bit y coordinate in bits [26:16]
    pub fn from_word(word: u32) -> Position {
        let x = extend_to_i32(word, 11);
        let y = extend_to_i32(word >> 16, 11);

        Position { x, y }
    }
}

/// A vertex's color
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Color {
    pub r: u32,
    pub g: u32,
    pub b: u32,
}

impl Color {
    /// Parse a color from a color word: 8 bits per component, red in bits [23:16], green in bits
    /// [15:8], blue in bits [7:0]
    pub fn from_word(word: u32) -> Color {
        Color {
            r: (word >> 16) & 0xff,
            g: (word >> 8) & 0xff,
            b: word & 0xff,
        }
    }
}

/// A fully decoded vertex as sent to the presentation side
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Vertex {
    pub position: Position,
    pub color: Color,
}

/// Extend a signed value on `n` bits to an i32
fn extend_to_i32(val: u32, n: usize) -> i32 {
    let shift = 32 - n;

    ((val << shift) as i32) >> shift
}

/// Does nothing, but with style
fn cmd_nop(_bus: &mut Bus) -> Result<()> {
    Ok(())
}

/// GP0[0x01]: there is no texture cache to clear here
fn cmd_clear_cache(_bus: &mut Bus) -> Result<()> {
    Ok(())
}

/// GP0[0x28]: monochrome opaque quad
fn cmd_quad_mono_opaque(bus: &mut Bus) -> Result<()> {
    let gpu = &mut bus.gpu;

    let color = Color::from_word(gpu.command_buffer[0]);

    let mut vertices = [Vertex {
        position: Position { x: 0, y: 0 },
        color,
    }; 4];

    for (i, vertex) in vertices.iter_mut().enumerate() {
        vertex.position = Position::from_word(gpu.command_buffer[1 + i]);
    }

    gpu.link.put(GpuMsg::Quad(vertices));

    Ok(())
}

/// GP0[0x2c]: textured opaque quad. Textures are not sampled here, the quad is drawn with a
/// solid placeholder color instead.
fn cmd_quad_texture_blend_opaque(bus: &mut Bus) -> Result<()> {
    let gpu = &mut bus.gpu;

    let color = Color { r: 0x80, g: 0, b: 0 };

    let mut vertices = [Vertex {
        position: Position { x: 0, y: 0 },
        color,
    }; 4];

    // Vertex words are interleaved with texture coordinates
    for (i, vertex) in vertices.iter_mut().enumerate() {
        vertex.position = Position::from_word(gpu.command_buffer[1 + i * 2]);
    }

    gpu.link.put(GpuMsg::Quad(vertices));

    Ok(())
}

/// GP0[0x30]: shaded opaque triangle
fn cmd_triangle_shaded_opaque(bus: &mut Bus) -> Result<()> {
    let gpu = &mut bus.gpu;

    let mut vertices = [Vertex {
        position: Position { x: 0, y: 0 },
        color: Color { r: 0, g: 0, b: 0 },
    }; 3];

    for (i, vertex) in vertices.iter_mut().enumerate() {
        vertex.color = Color::from_word(gpu.command_buffer[i * 2]);
        vertex.position = Position::from_word(gpu.command_buffer[i * 2 + 1]);
    }

    gpu.link.put(GpuMsg::Triangle(vertices));

    Ok(())
}

/// GP0[0x38]: shaded opaque quad
fn cmd_quad_shaded_opaque(bus: &mut Bus) -> Result<()> {
    let gpu = &mut bus.gpu;

    let mut vertices = [Vertex {
        position: Position { x: 0, y: 0 },
        color: Color { r: 0, g: 0, b: 0 },
    }; 4];

    for (i, vertex) in vertices.iter_mut().enumerate() {
        vertex.color = Color::from_word(gpu.command_buffer[i * 2]);
        vertex.position = Position::from_word(gpu.command_buffer[i * 2 + 1]);
    }

    gpu.link.put(GpuMsg::Quad(vertices));

    Ok(())
}

/// GP0[0xa0]: image load. Switches the GP0 register to image-load mode for the duration of the
/// transfer; the pixel data itself is discarded since the VRAM is not emulated.
fn cmd_image_load(bus: &mut Bus) -> Result<()> {
    let gpu = &mut bus.gpu;

    // Parse the image resolution from the 3rd word
    let res = gpu.command_buffer[2];

    let width = res & 0xffff;
    let height = res >> 16;

    // Size of the image in 16 bit pixels, rounded up since we transfer 32 bits at a time
    let imgsize = (width * height + 1) & !1;

    gpu.gp0_words_remaining = imgsize / 2;
    gpu.gp0_mode = Gp0Mode::ImageLoad;

    Ok(())
}

/// GP0[0xc0]: image store. VRAM reads are not implemented.
fn cmd_image_store(bus: &mut Bus) -> Result<()> {
    let res = bus.gpu.command_buffer[2];

    let width = res & 0xffff;
    let height = res >> 16;

    warn!("Unhandled image store: {}x{}", width, height);

    Ok(())
}

/// GP0[0xe1]: draw mode setting
fn cmd_draw_mode(bus: &mut Bus) -> Result<()> {
    let val = bus.gpu.command_buffer[0];

    bus.gpu.set_draw_mode(val);

    Ok(())
}

/// GP0[0xe2]: texture window setting
fn cmd_texture_window(bus: &mut Bus) -> Result<()> {
    let val = bus.gpu.command_buffer[0];

    bus.gpu.set_texture_window(val);

    Ok(())
}

/// GP0[0xe3]: set the top-left corner of the drawing area
fn cmd_drawing_area_top_left(bus: &mut Bus) -> Result<()> {
    let val = bus.gpu.command_buffer[0];

    bus.gpu.set_drawing_area_top_left(val);

    Ok(())
}

/// GP0[0xe4]: set the bottom-right corner of the drawing area
fn cmd_drawing_area_bottom_right(bus: &mut Bus) -> Result<()> {
    let val = bus.gpu.command_buffer[0];

    bus.gpu.set_drawing_area_bottom_right(val);

    Ok(())
}

/// GP0[0xe5]: set the drawing offset. The presentation side is told about the new offset and
/// then asked to flush what it has, in that order.
fn cmd_drawing_offset(bus: &mut Bus) -> Result<()> {
    let val = bus.gpu.command_buffer[0];

    let x = (val & 0x7ff) as u16;
    let y = ((val >> 11) & 0x7ff) as u16;

    // Values are 11 bit two's complement, sign-extend by shifting into the MSBs of an i16 and
    // back
    let x = ((x << 5) as i16) >> 5;
    let y = ((y << 5) as i16) >> 5;

    bus.gpu.drawing_x_offset = x;
    bus.gpu.drawing_y_offset = y;

    bus.gpu.link.put(GpuMsg::Offset {
        x: i32::from(x),
        y: i32::from(y),
    });
    bus.gpu.link.put(GpuMsg::Draw);

    Ok(())
}

/// GP0[0xe6]: mask bit setting
fn cmd_mask_bit_setting(bus: &mut Bus) -> Result<()> {
    let val = bus.gpu.command_buffer[0];

    bus.gpu.set_mask_bit_setting(val);

    Ok(())
}

/// Placeholder for the opcodes this machine doesn't know about. Fatal.
fn cmd_unimplemented(bus: &mut Bus) -> Result<()> {
    Err(PsxError::Unimplemented(format!(
        "GP0 command 0x{:08x}",
        bus.gpu.command_buffer[0]
    )))
}

/// Shorthand to keep the LUT below readable
const UNIMPLEMENTED: Command = Command::new(1, cmd_unimplemented);

/// LUT for all GP0 commands (indexed by opcode, bits [31:24] of the first command word)
#[rustfmt::skip]
pub static GP0_COMMANDS: [Command; 0x100] = [
    // 0x00
    Command::new(1, cmd_nop),
    Command::new(1, cmd_clear_cache),
    UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0x10
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0x20
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    Command::new(5, cmd_quad_mono_opaque),
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    Command::new(9, cmd_quad_texture_blend_opaque),
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0x30
    Command::new(6, cmd_triangle_shaded_opaque),
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    Command::new(8, cmd_quad_shaded_opaque),
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0x40
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0x50
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0x60
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0x70
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0x80
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0x90
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0xa0
    Command::new(3, cmd_image_load),
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0xb0
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0xc0
    Command::new(3, cmd_image_store),
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0xd0
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0xe0
    UNIMPLEMENTED,
    Command::new(1, cmd_draw_mode),
    Command::new(1, cmd_texture_window),
    Command::new(1, cmd_drawing_area_top_left),
    Command::new(1, cmd_drawing_area_bottom_right),
    Command::new(1, cmd_drawing_offset),
    Command::new(1, cmd_mask_bit_setting),
    UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    // 0xf0
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
    UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED, UNIMPLEMENTED,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_sign_extension() {
        // 0 and positive values
        assert_eq!(Position::from_word(0), Position { x: 0, y: 0 });
        assert_eq!(Position::from_word(0x00ff_00ff), Position { x: 255, y: 255 });
        // 11 bit two's complement: 0x7ff is -1
        assert_eq!(Position::from_word(0x07ff_07ff), Position { x: -1, y: -1 });
        // Bits above the 11 bit fields are ignored
        assert_eq!(Position::from_word(0xf800_f800), Position { x: 0, y: 0 });
    }

    #[test]
    fn color_unpacking() {
        let c = Color::from_word(0x0012_3456);

        assert_eq!(c, Color { r: 0x12, g: 0x34, b: 0x56 });
    }

    #[test]
    fn command_lengths() {
        assert_eq!(GP0_COMMANDS[0x00].len, 1);
        assert_eq!(GP0_COMMANDS[0x28].len, 5);
        assert_eq!(GP0_COMMANDS[0x2c].len, 9);
        assert_eq!(GP0_COMMANDS[0x30].len, 6);
        assert_eq!(GP0_COMMANDS[0x38].len, 8);
        assert_eq!(GP0_COMMANDS[0xa0].len, 3);
        assert_eq!(GP0_COMMANDS[0xc0].len, 3);

        for op in 0xe1..=0xe6 {
            assert_eq!(GP0_COMMANDS[op].len, 1);
        }
    }
}
