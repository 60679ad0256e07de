use devices::GuestMemoryExt;
use memory::GuestAddressSpace;
use proptest::prelude::*;

proptest! {
    #[test]
    fn byte_writes_round_trip_anywhere_inside_a_ram_region(
        offset in 0u64..0x1000,
        value in any::<u8>(),
    ) {
        let mut space = GuestAddressSpace::new();
        space.add_ram(0x2000_0000, 0x1000);

        space.write_u8(0x2000_0000 + offset, value);
        prop_assert_eq!(space.read_u8(0x2000_0000 + offset), value);
    }

    #[test]
    fn u32_writes_round_trip_on_aligned_addresses(
        word_index in 0u64..(0x1000 / 4),
        value in any::<u32>(),
    ) {
        let mut space = GuestAddressSpace::new();
        space.add_ram(0x2000_0000, 0x1000);

        let addr = 0x2000_0000 + word_index * 4;
        space.write_u32(addr, value);
        prop_assert_eq!(space.read_u32(addr), value);
    }
}
