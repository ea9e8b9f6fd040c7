//! Generic bitwise CRC for 8, 16 and 32-bit widths.
//!
//! Contents
//! - `CrcParams<W>` : Rocksoft-style description (poly, init, refin, refout, xorout)
//! - `crc8` / `crc16` / `crc32` : one-shot checksums
//! - `Crc<W>`       : streaming digest (`update` as data arrives, then `finalize`)
//! - presets        : the usual catalogue entries, plus [`Preset`] lookup by name
//!
//! Notes
//! - Table-free: every byte costs eight shift/xor steps. Fine for frames,
//!   not meant for bulk hashing.
//! - `init` is applied to the unreflected register, as in the catalogue.

#![allow(clippy::cast_possible_truncation)]

/// Register width of a CRC, implemented for `u8`, `u16` and `u32`.
pub trait CrcWidth: Copy + core::fmt::Debug + PartialEq {
    const BITS: u32;
    fn widen(self) -> u32;
    fn narrow(v: u32) -> Self;
}

macro_rules! crc_width {
    ($($t:ty),*) => {$(
        impl CrcWidth for $t {
            const BITS: u32 = <$t>::BITS;
            #[inline] fn widen(self) -> u32 { u32::from(self) }
            #[inline] fn narrow(v: u32) -> Self { v as $t }
        }
    )*};
}

crc_width!(u8, u16, u32);

/// Parameters of a CRC algorithm of width `W`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CrcParams<W> {
    pub poly: W,
    pub init: W,
    pub ref_in: bool,
    pub ref_out: bool,
    pub xor_out: W,
}

impl<W: CrcWidth> CrcParams<W> {
    /// Non-reflected input and output.
    pub const fn simple(poly: W, init: W, xor_out: W) -> Self {
        Self { poly, init, ref_in: false, ref_out: false, xor_out }
    }

    pub const fn reflected(poly: W, init: W, xor_out: W) -> Self {
        Self { poly, init, ref_in: true, ref_out: true, xor_out }
    }

    /// One-shot checksum of `data`.
    #[inline]
    pub fn checksum(&self, data: &[u8]) -> W {
        let mut d = Crc::new(*self);
        d.update(data);
        d.finalize()
    }
}

/// Reverse the low `bits` bits of `x`.
#[inline]
pub fn reflect(x: u32, bits: u32) -> u32 {
    x.reverse_bits() >> (32 - bits)
}

#[inline]
fn mask(bits: u32) -> u32 {
    u32::MAX >> (32 - bits)
}

#[inline]
pub fn crc8(p: &CrcParams<u8>, data: &[u8]) -> u8 {
    p.checksum(data)
}

#[inline]
pub fn crc16(p: &CrcParams<u16>, data: &[u8]) -> u16 {
    p.checksum(data)
}

#[inline]
pub fn crc32(p: &CrcParams<u32>, data: &[u8]) -> u32 {
    p.checksum(data)
}

// ----------------------------- Streaming digest -----------------------------

/// Incremental CRC computation.
///
/// ```
/// use qlibs_core::crc::{Crc, CRC16_MODBUS};
/// let mut d = Crc::new(CRC16_MODBUS);
/// d.update(b"1234");
/// d.update(b"56789");
/// assert_eq!(d.finalize(), 0x4B37);
/// ```
#[derive(Copy, Clone, Debug)]
pub struct Crc<W: CrcWidth> {
    params: CrcParams<W>,
    reg: u32,
}

impl<W: CrcWidth> Crc<W> {
    #[inline]
    pub fn new(params: CrcParams<W>) -> Self {
        Self { params, reg: params.init.widen() }
    }

    #[inline]
    pub fn reset(&mut self) {
        self.reg = self.params.init.widen();
    }

    pub fn update(&mut self, data: &[u8]) {
        let width = W::BITS;
        let top = 1u32 << (width - 1);
        let poly = self.params.poly.widen() & mask(width);
        for &b in data {
            let b = u32::from(b);
            let b = if self.params.ref_in { reflect(b, 8) } else { b };
            self.reg ^= b << (width - 8);
            for _ in 0..8 {
                self.reg = if self.reg & top != 0 { (self.reg << 1) ^ poly } else { self.reg << 1 };
            }
        }
    }

    /// Current checksum; the digest keeps accepting data afterwards.
    #[inline]
    pub fn value(&self) -> W {
        let width = W::BITS;
        let r = if self.params.ref_out { reflect(self.reg & mask(width), width) } else { self.reg };
        W::narrow((r ^ self.params.xor_out.widen()) & mask(width))
    }

    #[inline]
    pub fn finalize(self) -> W {
        self.value()
    }
}

// ----------------------------- Presets -----------------------------

pub const CRC8: CrcParams<u8> = CrcParams::simple(0x07, 0, 0);
pub const CRC8_CDMA2000: CrcParams<u8> = CrcParams::simple(0x9B, 0xFF, 0);
pub const CRC8_DARC: CrcParams<u8> = CrcParams::reflected(0x39, 0, 0);
pub const CRC8_DVB_S2: CrcParams<u8> = CrcParams::simple(0xD5, 0, 0);
pub const CRC8_EBU: CrcParams<u8> = CrcParams::reflected(0x1D, 0xFF, 0);
pub const CRC8_I_CODE: CrcParams<u8> = CrcParams::simple(0x1D, 0xFD, 0);
pub const CRC8_ITU: CrcParams<u8> = CrcParams::simple(0x07, 0, 0x55);
pub const CRC8_MAXIM: CrcParams<u8> = CrcParams::reflected(0x31, 0, 0);
pub const CRC8_ROHC: CrcParams<u8> = CrcParams::reflected(0x07, 0xFF, 0);
pub const CRC8_WCDMA: CrcParams<u8> = CrcParams::reflected(0x9B, 0, 0);

pub const CRC16_CCITT_FALSE: CrcParams<u16> = CrcParams::simple(0x1021, 0xFFFF, 0);
pub const CRC16_ARC: CrcParams<u16> = CrcParams::reflected(0x8005, 0, 0);
pub const CRC16_AUG_CCITT: CrcParams<u16> = CrcParams::simple(0x1021, 0x1D0F, 0);
pub const CRC16_BUYPASS: CrcParams<u16> = CrcParams::simple(0x8005, 0, 0);
pub const CRC16_CDMA2000: CrcParams<u16> = CrcParams::simple(0xC867, 0xFFFF, 0);
pub const CRC16_DDS_110: CrcParams<u16> = CrcParams::simple(0x8005, 0x800D, 0);
pub const CRC16_DECT_R: CrcParams<u16> = CrcParams::simple(0x0589, 0, 0x0001);
pub const CRC16_DECT_X: CrcParams<u16> = CrcParams::simple(0x0589, 0, 0);
pub const CRC16_DNP: CrcParams<u16> = CrcParams::reflected(0x3D65, 0, 0xFFFF);
pub const CRC16_EN_13757: CrcParams<u16> = CrcParams::simple(0x3D65, 0, 0xFFFF);
pub const CRC16_GENIBUS: CrcParams<u16> = CrcParams::simple(0x1021, 0xFFFF, 0xFFFF);
pub const CRC16_MAXIM: CrcParams<u16> = CrcParams::reflected(0x8005, 0, 0xFFFF);
pub const CRC16_MCRF4XX: CrcParams<u16> = CrcParams::reflected(0x1021, 0xFFFF, 0);
pub const CRC16_RIELLO: CrcParams<u16> = CrcParams::reflected(0x1021, 0xB2AA, 0);
pub const CRC16_T10_DIF: CrcParams<u16> = CrcParams::simple(0x8BB7, 0, 0);
pub const CRC16_TELEDISK: CrcParams<u16> = CrcParams::simple(0xA097, 0, 0);
pub const CRC16_TMS37157: CrcParams<u16> = CrcParams::reflected(0x1021, 0x89EC, 0);
pub const CRC16_USB: CrcParams<u16> = CrcParams::reflected(0x8005, 0xFFFF, 0xFFFF);
pub const CRC16_A: CrcParams<u16> = CrcParams::reflected(0x1021, 0xC6C6, 0);
pub const CRC16_KERMIT: CrcParams<u16> = CrcParams::reflected(0x1021, 0, 0);
pub const CRC16_MODBUS: CrcParams<u16> = CrcParams::reflected(0x8005, 0xFFFF, 0);
pub const CRC16_X_25: CrcParams<u16> = CrcParams::reflected(0x1021, 0xFFFF, 0xFFFF);
pub const CRC16_XMODEM: CrcParams<u16> = CrcParams::simple(0x1021, 0, 0);

pub const CRC32: CrcParams<u32> = CrcParams::reflected(0x04C1_1DB7, 0xFFFF_FFFF, 0xFFFF_FFFF);
pub const CRC32_BZIP2: CrcParams<u32> = CrcParams::simple(0x04C1_1DB7, 0xFFFF_FFFF, 0xFFFF_FFFF);
pub const CRC32_C: CrcParams<u32> = CrcParams::reflected(0x1EDC_6F41, 0xFFFF_FFFF, 0xFFFF_FFFF);
pub const CRC32_D: CrcParams<u32> = CrcParams::reflected(0xA833_982B, 0xFFFF_FFFF, 0xFFFF_FFFF);
pub const CRC32_JAMCRC: CrcParams<u32> = CrcParams::reflected(0x04C1_1DB7, 0xFFFF_FFFF, 0);
pub const CRC32_MPEG2: CrcParams<u32> = CrcParams::simple(0x04C1_1DB7, 0xFFFF_FFFF, 0);
pub const CRC32_POSIX: CrcParams<u32> = CrcParams::simple(0x04C1_1DB7, 0, 0xFFFF_FFFF);
pub const CRC32_Q: CrcParams<u32> = CrcParams::simple(0x8141_41AB, 0, 0);
pub const CRC32_XFER: CrcParams<u32> = CrcParams::simple(0x0000_00AF, 0, 0);

/// A catalogue entry of any width, for callers that pick the algorithm at run time.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Preset {
    W8(&'static str, CrcParams<u8>),
    W16(&'static str, CrcParams<u16>),
    W32(&'static str, CrcParams<u32>),
}

impl Preset {
    pub const fn name(&self) -> &'static str {
        match self {
            Self::W8(n, _) | Self::W16(n, _) | Self::W32(n, _) => *n,
        }
    }

    pub const fn width(&self) -> u32 {
        match self {
            Self::W8(..) => 8,
            Self::W16(..) => 16,
            Self::W32(..) => 32,
        }
    }

    /// Checksum widened to `u32`.
    pub fn checksum(&self, data: &[u8]) -> u32 {
        match self {
            Self::W8(_, p) => u32::from(p.checksum(data)),
            Self::W16(_, p) => u32::from(p.checksum(data)),
            Self::W32(_, p) => p.checksum(data),
        }
    }

    /// Case-insensitive lookup; `-` and `_` are interchangeable.
    pub fn by_name(name: &str) -> Option<Self> {
        PRESETS.iter().copied().find(|p| {
            let a = p.name().bytes().map(norm);
            let b = name.bytes().map(norm);
            a.eq(b)
        })
    }
}

#[inline]
fn norm(c: u8) -> u8 {
    if c == b'_' { b'-' } else { c.to_ascii_lowercase() }
}

pub const PRESETS: &[Preset] = &[
    Preset::W8("crc-8", CRC8),
    Preset::W8("crc-8-cdma2000", CRC8_CDMA2000),
    Preset::W8("crc-8-darc", CRC8_DARC),
    Preset::W8("crc-8-dvb-s2", CRC8_DVB_S2),
    Preset::W8("crc-8-ebu", CRC8_EBU),
    Preset::W8("crc-8-i-code", CRC8_I_CODE),
    Preset::W8("crc-8-itu", CRC8_ITU),
    Preset::W8("crc-8-maxim", CRC8_MAXIM),
    Preset::W8("crc-8-rohc", CRC8_ROHC),
    Preset::W8("crc-8-wcdma", CRC8_WCDMA),
    Preset::W16("crc-16-ccitt-false", CRC16_CCITT_FALSE),
    Preset::W16("crc-16-arc", CRC16_ARC),
    Preset::W16("crc-16-aug-ccitt", CRC16_AUG_CCITT),
    Preset::W16("crc-16-buypass", CRC16_BUYPASS),
    Preset::W16("crc-16-cdma2000", CRC16_CDMA2000),
    Preset::W16("crc-16-dds-110", CRC16_DDS_110),
    Preset::W16("crc-16-dect-r", CRC16_DECT_R),
    Preset::W16("crc-16-dect-x", CRC16_DECT_X),
    Preset::W16("crc-16-dnp", CRC16_DNP),
    Preset::W16("crc-16-en-13757", CRC16_EN_13757),
    Preset::W16("crc-16-genibus", CRC16_GENIBUS),
    Preset::W16("crc-16-maxim", CRC16_MAXIM),
    Preset::W16("crc-16-mcrf4xx", CRC16_MCRF4XX),
    Preset::W16("crc-16-riello", CRC16_RIELLO),
    Preset::W16("crc-16-t10-dif", CRC16_T10_DIF),
    Preset::W16("crc-16-teledisk", CRC16_TELEDISK),
    Preset::W16("crc-16-tms37157", CRC16_TMS37157),
    Preset::W16("crc-16-usb", CRC16_USB),
    Preset::W16("crc-16-a", CRC16_A),
    Preset::W16("crc-16-kermit", CRC16_KERMIT),
    Preset::W16("crc-16-modbus", CRC16_MODBUS),
    Preset::W16("crc-16-x-25", CRC16_X_25),
    Preset::W16("crc-16-xmodem", CRC16_XMODEM),
    Preset::W32("crc-32", CRC32),
    Preset::W32("crc-32-bzip2", CRC32_BZIP2),
    Preset::W32("crc-32-c", CRC32_C),
    Preset::W32("crc-32-d", CRC32_D),
    Preset::W32("crc-32-jamcrc", CRC32_JAMCRC),
    Preset::W32("crc-32-mpeg-2", CRC32_MPEG2),
    Preset::W32("crc-32-posix", CRC32_POSIX),
    Preset::W32("crc-32-q", CRC32_Q),
    Preset::W32("crc-32-xfer", CRC32_XFER),
];
