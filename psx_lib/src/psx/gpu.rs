//! GPU front-end: GP0 command FIFO and GP1 control port. No rasterization happens here, draw
//! commands are decoded and forwarded to the presentation side as messages over the hand-off
//! link.

pub mod commands;
pub mod fifo;
pub mod link;

use log::{debug, warn};

use crate::error::Result;
use crate::psx::addressable::{AccessWidth, Addressable};
use crate::psx::bus::Bus;
use crate::psx::gpu::fifo::CommandBuffer;
use crate::psx::gpu::link::Link;

#[derive(serde::Serialize, serde::Deserialize)]
pub struct Gpu {
    /// Texture page base X coordinate (4 bits, 64 byte increment)
    page_base_x: u8,
    /// Texture page base Y coordinate (1 bit, 256 line increment)
    page_base_y: u8,
    /// Semi-transparency mode
    semi_transparency: u8,
    /// Texture page color depth
    texture_depth: TextureDepth,
    /// Enable dithering from 24 to 15bits RGB
    dithering: bool,
    /// Allow drawing to the display area
    draw_to_display: bool,
    /// Force "mask" bit of the pixel to 1 when writing to VRAM
    force_set_mask_bit: bool,
    /// Don't draw to pixels which have the "mask" bit set
    preserve_masked_pixels: bool,
    /// Currently displayed field. For progressive output this is always the top field
    field: Field,
    /// "Reverseflag", whatever the hardware does with it
    reverse: bool,
    /// When true all textures are disabled
    texture_disable: bool,
    /// Mirror textured rectangles along the x axis
    rectangle_texture_x_flip: bool,
    /// Mirror textured rectangles along the y axis
    rectangle_texture_y_flip: bool,
    /// Video output horizontal resolution
    hres: HorizontalRes,
    /// Video output vertical resolution
    vres: VerticalRes,
    /// Video standard
    vmode: VMode,
    /// Display depth. The GPU itself always draws 15bit RGB, 24bit output must use external
    /// assets (pre-rendered textures, MDEC, etc...)
    display_depth: DisplayDepth,
    /// Output interlaced video signal instead of progressive
    interlaced: bool,
    /// Disable the display
    display_disabled: bool,
    /// GP0 interrupt request
    interrupt: bool,
    /// DMA request direction
    dma_direction: DmaDirection,
    /// Texture window x mask (8 pixel steps)
    texture_window_x_mask: u8,
    /// Texture window y mask (8 pixel steps)
    texture_window_y_mask: u8,
    /// Texture window x offset (8 pixel steps)
    texture_window_x_offset: u8,
    /// Texture window y offset (8 pixel steps)
    texture_window_y_offset: u8,
    /// Left-most column of the drawing area
    drawing_area_left: u16,
    /// Top-most line of the drawing area
    drawing_area_top: u16,
    /// Right-most column of the drawing area
    drawing_area_right: u16,
    /// Bottom-most line of the drawing area
    drawing_area_bottom: u16,
    /// Horizontal drawing offset applied to all vertices
    pub(crate) drawing_x_offset: i16,
    /// Vertical drawing offset applied to all vertices
    pub(crate) drawing_y_offset: i16,
    /// First column of the display area in VRAM
    display_vram_x_start: u16,
    /// First line of the display area in VRAM
    display_vram_y_start: u16,
    /// Display output horizontal start relative to HSYNC
    display_horiz_start: u16,
    /// Display output horizontal end relative to HSYNC
    display_horiz_end: u16,
    /// Display output first line relative to VSYNC
    display_line_start: u16,
    /// Display output last line relative to VSYNC
    display_line_end: u16,
    /// Buffer holding the command words received so far
    pub(crate) command_buffer: CommandBuffer,
    /// Words remaining before the current GP0 command (or image transfer) completes. When this
    /// is 0 the next GP0 word is an opcode header.
    pub(crate) gp0_words_remaining: u32,
    /// Current mode of the GP0 register
    pub(crate) gp0_mode: Gp0Mode,
    /// Hand-off of draw messages to the presentation side
    #[serde(skip)]
    pub(crate) link: Link,
}

impl Gpu {
    pub fn new(link: Link) -> Gpu {
        Gpu {
            page_base_x: 0,
            page_base_y: 0,
            semi_transparency: 0,
            texture_depth: TextureDepth::T4Bit,
            dithering: false,
            draw_to_display: false,
            force_set_mask_bit: false,
            preserve_masked_pixels: false,
            field: Field::Top,
            reverse: false,
            texture_disable: false,
            rectangle_texture_x_flip: false,
            rectangle_texture_y_flip: false,
            hres: HorizontalRes::from_fields(0, 0),
            vres: VerticalRes::Y240Lines,
            vmode: VMode::Ntsc,
            display_depth: DisplayDepth::D15Bits,
            interlaced: false,
            display_disabled: true,
            interrupt: false,
            dma_direction: DmaDirection::Off,
            texture_window_x_mask: 0,
            texture_window_y_mask: 0,
            texture_window_x_offset: 0,
            texture_window_y_offset: 0,
            drawing_area_left: 0,
            drawing_area_top: 0,
            drawing_area_right: 0,
            drawing_area_bottom: 0,
            drawing_x_offset: 0,
            drawing_y_offset: 0,
            display_vram_x_start: 0,
            display_vram_y_start: 0,
            display_horiz_start: 0x200,
            display_horiz_end: 0xc00,
            display_line_start: 0x10,
            display_line_end: 0x100,
            command_buffer: CommandBuffer::new(),
            gp0_words_remaining: 0,
            gp0_mode: Gp0Mode::Command,
            link,
        }
    }

    /// Retrieve the value of the status register
    pub(crate) fn status(&self) -> u32 {
        let mut r = 0u32;

        r |= u32::from(self.page_base_x);
        r |= u32::from(self.page_base_y) << 4;
        r |= u32::from(self.semi_transparency) << 5;
        r |= (self.texture_depth as u32) << 7;
        r |= (self.dithering as u32) << 9;
        r |= (self.draw_to_display as u32) << 10;
        r |= (self.force_set_mask_bit as u32) << 11;
        r |= (self.preserve_masked_pixels as u32) << 12;
        r |= (self.field as u32) << 13;
        r |= (self.reverse as u32) << 14;
        r |= (self.texture_disable as u32) << 15;
        r |= self.hres.into_status();
        r |= (self.vres as u32) << 19;
        r |= (self.vmode as u32) << 20;
        r |= (self.display_depth as u32) << 21;
        r |= (self.interlaced as u32) << 22;
        r |= (self.display_disabled as u32) << 23;
        r |= (self.interrupt as u32) << 24;

        // We're always ready to receive commands and DMA words. Bit 27 (ready to send VRAM to
        // the CPU) stays low since VRAM reads are not implemented.
        r |= 1 << 26;
        r |= 1 << 28;

        r |= (self.dma_direction as u32) << 29;

        // Bit 31 should toggle with the currently drawn line. We don't emulate video timings so
        // it stays low.

        // The DMA request level depends on the configured direction
        let dma_request = match self.dma_direction {
            // Always 0
            DmaDirection::Off => 0,
            // Should be 0 if the FIFO is full, 1 otherwise
            DmaDirection::Fifo => 1,
            // Same as status bit 28
            DmaDirection::CpuToGp0 => (r >> 28) & 1,
            // Same as status bit 27
            DmaDirection::VRamToCpu => (r >> 27) & 1,
        };

        r |= dma_request << 25;

        r
    }

    /// GP0[0xe1]: unpack a draw mode word into the status fields and the rectangle flip flags
    pub(crate) fn set_draw_mode(&mut self, val: u32) {
        self.page_base_x = (val & 0xf) as u8;
        self.page_base_y = ((val >> 4) & 1) as u8;
        self.semi_transparency = ((val >> 5) & 3) as u8;

        self.texture_depth = match (val >> 7) & 3 {
            0 => TextureDepth::T4Bit,
            1 => TextureDepth::T8Bit,
            2 => TextureDepth::T15Bit,
            n => {
                warn!("Unhandled texture depth {}, using 15 bit", n);
                TextureDepth::T15Bit
            }
        };

        self.dithering = ((val >> 9) & 1) != 0;
        self.draw_to_display = ((val >> 10) & 1) != 0;
        self.texture_disable = ((val >> 11) & 1) != 0;
        self.rectangle_texture_x_flip = ((val >> 12) & 1) != 0;
        self.rectangle_texture_y_flip = ((val >> 13) & 1) != 0;
    }

    /// GP0[0xe2]: texture window, all fields are 5 bits wide
    pub(crate) fn set_texture_window(&mut self, val: u32) {
        self.texture_window_x_mask = (val & 0x1f) as u8;
        self.texture_window_y_mask = ((val >> 5) & 0x1f) as u8;
        self.texture_window_x_offset = ((val >> 10) & 0x1f) as u8;
        self.texture_window_y_offset = ((val >> 15) & 0x1f) as u8;
    }

    /// GP0[0xe3]: two packed 10 bit coordinates
    pub(crate) fn set_drawing_area_top_left(&mut self, val: u32) {
        self.drawing_area_left = (val & 0x3ff) as u16;
        self.drawing_area_top = ((val >> 10) & 0x3ff) as u16;
    }

    /// GP0[0xe4]: same layout as the top-left corner
    pub(crate) fn set_drawing_area_bottom_right(&mut self, val: u32) {
        self.drawing_area_right = (val & 0x3ff) as u16;
        self.drawing_area_bottom = ((val >> 10) & 0x3ff) as u16;
    }

    /// GP0[0xe6]: mask bit settings in bits 0 and 1
    pub(crate) fn set_mask_bit_setting(&mut self, val: u32) {
        self.force_set_mask_bit = (val & 1) != 0;
        self.preserve_masked_pixels = (val & 2) != 0;
    }

    /// GP1[0x00]: soft reset of the drawing and display state
    fn reset(&mut self) {
        self.interrupt = false;

        self.page_base_x = 0;
        self.page_base_y = 0;
        self.semi_transparency = 0;
        self.texture_depth = TextureDepth::T4Bit;
        self.texture_window_x_mask = 0;
        self.texture_window_y_mask = 0;
        self.texture_window_x_offset = 0;
        self.texture_window_y_offset = 0;
        self.dithering = false;
        self.draw_to_display = false;
        self.texture_disable = false;
        self.rectangle_texture_x_flip = false;
        self.rectangle_texture_y_flip = false;
        self.reverse = false;
        self.drawing_area_left = 0;
        self.drawing_area_top = 0;
        self.drawing_area_right = 0;
        self.drawing_area_bottom = 0;
        self.drawing_x_offset = 0;
        self.drawing_y_offset = 0;
        self.force_set_mask_bit = false;
        self.preserve_masked_pixels = false;
        self.field = Field::Top;

        self.dma_direction = DmaDirection::Off;

        self.display_disabled = true;
        self.display_vram_x_start = 0;
        self.display_vram_y_start = 0;
        self.hres = HorizontalRes::from_fields(0, 0);
        self.vres = VerticalRes::Y240Lines;
        self.vmode = VMode::Ntsc;
        self.interlaced = false;
        self.display_horiz_start = 0x200;
        self.display_horiz_end = 0xc00;
        self.display_line_start = 0x10;
        self.display_line_end = 0x100;
        self.display_depth = DisplayDepth::D15Bits;

        self.reset_command_buffer();
    }

    /// GP1[0x01]: drop the command currently being assembled
    fn reset_command_buffer(&mut self) {
        self.command_buffer.clear();
        self.gp0_words_remaining = 0;
        self.gp0_mode = Gp0Mode::Command;
    }

    /// GP1[0x04]: set the DMA request direction
    fn set_dma_direction(&mut self, val: u32) {
        self.dma_direction = match val & 3 {
            0 => DmaDirection::Off,
            1 => DmaDirection::Fifo,
            2 => DmaDirection::CpuToGp0,
            3 => DmaDirection::VRamToCpu,
            _ => unreachable!(),
        };
    }

    /// GP1[0x08]: configure the video output
    fn set_display_mode(&mut self, val: u32) {
        let hr1 = (val & 3) as u8;
        let hr2 = ((val >> 6) & 1) as u8;

        self.hres = HorizontalRes::from_fields(hr1, hr2);

        // Double-height output is not supported, the vertical resolution is pinned to 240 lines
        // no matter what bit 2 says
        self.vres = VerticalRes::Y240Lines;

        self.vmode = if val & 0x8 != 0 {
            VMode::Pal
        } else {
            VMode::Ntsc
        };

        self.display_depth = if val & 0x10 != 0 {
            DisplayDepth::D24Bits
        } else {
            DisplayDepth::D15Bits
        };

        self.interlaced = val & 0x20 != 0;

        self.reverse = val & 0x80 != 0;
    }
}

pub fn store<T: Addressable>(bus: &mut Bus, off: u32, val: T) -> Result<()> {
    if T::width() != AccessWidth::Word {
        panic!("Unhandled GPU store ({:?})", T::width());
    }

    let val = val.as_u32();

    match off {
        0 => gp0(bus, val),
        4 => gp1(bus, val),
        _ => unreachable!(),
    }
}

pub fn load<T: Addressable>(bus: &mut Bus, off: u32) -> T {
    if T::width() != AccessWidth::Word {
        panic!("Unhandled GPU load ({:?})", T::width());
    }

    let v = match off {
        0 => read(bus),
        4 => bus.gpu.status(),
        _ => unreachable!(),
    };

    T::from_u32(v)
}

pub fn dma_store(bus: &mut Bus, val: u32) -> Result<()> {
    gp0(bus, val)
}

/// Handles loads from the GPUREAD register. VRAM reads are not implemented so this is only a
/// placeholder.
fn read(bus: &mut Bus) -> u32 {
    let _ = bus;

    debug!("GPUREAD");

    0
}

/// Handle writes to the GP0 command FIFO
pub fn gp0(bus: &mut Bus, val: u32) -> Result<()> {
    if bus.gpu.gp0_words_remaining == 0 {
        // We start a new GP0 command
        let opcode = (val >> 24) & 0xff;

        let command = &commands::GP0_COMMANDS[opcode as usize];

        bus.gpu.gp0_words_remaining = u32::from(command.len);
        bus.gpu.command_buffer.clear();
    }

    bus.gpu.gp0_words_remaining -= 1;

    match bus.gpu.gp0_mode {
        Gp0Mode::Command => {
            bus.gpu.command_buffer.push(val);

            if bus.gpu.gp0_words_remaining == 0 {
                // We have all the parameters, we can run the command
                let opcode = bus.gpu.command_buffer.opcode();

                let command = &commands::GP0_COMMANDS[opcode as usize];

                (command.handler)(bus)?;
            }
        }
        Gp0Mode::ImageLoad => {
            // Pixel data for a VRAM transfer. We only emulate the protocol, not the VRAM, so the
            // data is discarded.
            if bus.gpu.gp0_words_remaining == 0 {
                // Load done
                bus.gpu.gp0_mode = Gp0Mode::Command;
            }
        }
    }

    Ok(())
}

/// Handle writes to the GP1 control register
pub fn gp1(bus: &mut Bus, val: u32) -> Result<()> {
    let op = val >> 24;

    match op {
        0x00 => bus.gpu.reset(),
        0x01 => bus.gpu.reset_command_buffer(),
        // IRQ acknowledge
        0x02 => bus.gpu.interrupt = false,
        0x03 => bus.gpu.display_disabled = val & 1 != 0,
        0x04 => bus.gpu.set_dma_direction(val),
        0x05 => {
            // LSB ignored: the start column is always aligned on an even pixel
            bus.gpu.display_vram_x_start = (val & 0x3fe) as u16;
            bus.gpu.display_vram_y_start = ((val >> 10) & 0x1ff) as u16;
        }
        0x06 => {
            bus.gpu.display_horiz_start = (val & 0xfff) as u16;
            bus.gpu.display_horiz_end = ((val >> 12) & 0xfff) as u16;
        }
        0x07 => {
            bus.gpu.display_line_start = (val & 0x3ff) as u16;
            bus.gpu.display_line_end = ((val >> 10) & 0x3ff) as u16;
        }
        0x08 => bus.gpu.set_display_mode(val),
        _ => {
            return Err(crate::error::PsxError::Unimplemented(format!(
                "GP1 command 0x{:08x}",
                val
            )))
        }
    }

    Ok(())
}

/// Possible states for the GP0 register
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Gp0Mode {
    /// Default mode: handling commands
    Command,
    /// Loading an image into VRAM
    ImageLoad,
}

/// Depth of the pixel values in a texture page
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum TextureDepth {
    /// 4 bits per pixel, paletted
    T4Bit = 0,
    /// 8 bits per pixel, paletted
    T8Bit = 1,
    /// 15 bits per pixel, direct color
    T15Bit = 2,
}

/// Interlaced output splits each frame in two fields
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum Field {
    /// Bottom field (even lines)
    Bottom = 0,
    /// Top field (odd lines)
    Top = 1,
}

/// Video output horizontal resolution
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct HorizontalRes(u8);

impl HorizontalRes {
    /// Create a new HorizontalRes instance from the 2 bit field `hr1` and the one bit field
    /// `hr2`
    pub fn from_fields(hr1: u8, hr2: u8) -> HorizontalRes {
        let hr = (hr2 & 1) | ((hr1 & 3) << 1);

        HorizontalRes(hr)
    }

    /// Retrieve value of bits [18:16] of the status register
    pub fn into_status(self) -> u32 {
        let HorizontalRes(hr) = self;

        u32::from(hr) << 16
    }
}

/// Video output vertical resolution
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum VerticalRes {
    /// 240 lines
    Y240Lines = 0,
    /// 480 lines (only available for interlaced output)
    Y480Lines = 1,
}

/// Video standards: NTSC (60Hz) and PAL (50Hz)
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum VMode {
    /// NTSC: 480i60Hz
    Ntsc = 0,
    /// PAL: 576i50Hz
    Pal = 1,
}

/// Display area color depth
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum DisplayDepth {
    /// 15 bits per pixel
    D15Bits = 0,
    /// 24 bits per pixel
    D24Bits = 1,
}

/// Requested DMA direction
#[derive(serde::Serialize, serde::Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum DmaDirection {
    Off = 0,
    Fifo = 1,
    CpuToGp0 = 2,
    VRamToCpu = 3,
}

