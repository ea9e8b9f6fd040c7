use proptest::prelude::*;
use qlibs_core::bitfield::{slots_for, BitField};
use qlibs_core::crc::{self, reflect, Crc};

proptest! {
    #[test]
    fn prop_streaming_matches_one_shot(data in prop::collection::vec(any::<u8>(), 0..256), cut in any::<prop::sample::Index>()) {
        let cut = cut.index(data.len() + 1);
        let (head, tail) = data.split_at(cut);

        let mut d32 = Crc::new(crc::CRC32);
        d32.update(head);
        d32.update(tail);
        prop_assert_eq!(d32.finalize(), crc::crc32(&crc::CRC32, &data));

        let mut d16 = Crc::new(crc::CRC16_XMODEM);
        d16.update(head);
        d16.update(tail);
        prop_assert_eq!(d16.finalize(), crc::crc16(&crc::CRC16_XMODEM, &data));

        let mut d8 = Crc::new(crc::CRC8_MAXIM);
        d8.update(head);
        d8.update(tail);
        prop_assert_eq!(d8.finalize(), crc::crc8(&crc::CRC8_MAXIM, &data));
    }
}

proptest! {
    #[test]
    fn prop_reflect_is_an_involution(x in any::<u32>(), bits in 1u32..=32) {
        let masked = if bits == 32 { x } else { x & ((1u32 << bits) - 1) };
        prop_assert_eq!(reflect(reflect(masked, bits), bits), masked);
    }
}

proptest! {
    #[test]
    fn prop_bit_range_write_leaves_neighbours(
        seed in prop::collection::vec(any::<u32>(), 4),
        index in 0usize..96,
        width in 1usize..=32,
        value in any::<u32>()
    ) {
        prop_assume!(index + width <= 128);
        let mut area = [0u32; slots_for(128)];
        area.copy_from_slice(&seed);
        let before = area;

        let mut bf = BitField::new(&mut area);
        bf.write_uint_n(index, width, value).unwrap();
        let mask = if width == 32 { u32::MAX } else { (1u32 << width) - 1 };
        prop_assert_eq!(bf.read_uint_n(index, width).unwrap(), value & mask);

        for bit in (0..128).filter(|&b| b < index || b >= index + width) {
            let was = before[bit / 32] & (1 << (bit % 32)) != 0;
            prop_assert_eq!(bf.read_bit(bit).unwrap(), was, "bit {} changed", bit);
        }
    }
}
