// APS2 packed relocation 解码器的单元测试，编码端由测试自带

use super::super::reloc::{PlainRelocIterator, elf_r_info, elf_r_sym};
use super::super::{ElfRela, R_GENERIC_ABS, R_GENERIC_GLOB_DAT, R_GENERIC_JUMP_SLOT};
use super::{PackedRelocIterator, Sleb128Decoder};
use crate::errno::Errno;

const GROUPED_BY_INFO: i64 = 1;
const GROUPED_BY_OFFSET_DELTA: i64 = 2;
const GROUPED_BY_ADDEND: i64 = 4;
const HAS_ADDEND: i64 = 8;

// SLEB128 编码，解码器的逆运算
fn sleb(value: i64, out: &mut Vec<u8>) {
    let mut value = value;
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        let done = (value == 0 && byte & 0x40 == 0) || (value == -1 && byte & 0x40 != 0);
        if done {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

fn encode(values: &[i64]) -> Vec<u8> {
    let mut out = Vec::new();
    for &value in values {
        sleb(value, &mut out);
    }
    out
}

#[test]
fn sleb128_round_trip() {
    let mut samples: Vec<i64> = vec![
        0, 1, -1, 2, -2, 63, 64, -64, -65, 127, 128, 255, 0x3fff, -0x4000,
    ];
    // 超出 32 位窗口的值只在 64 位字宽下可逆
    #[cfg(target_pointer_width = "64")]
    samples.extend_from_slice(&[(1 << 62) - 1, -(1 << 62)]);
    for &value in &samples {
        let stream = encode(&[value]);
        let mut decoder = unsafe { Sleb128Decoder::new(stream.as_ptr() as usize, stream.len()) };
        let decoded = unsafe { decoder.next() }.unwrap();
        assert_eq!(decoded as i64, value, "value {value}");
    }
}

#[test]
fn sleb128_truncated_stream_is_format_error() {
    let mut stream = encode(&[300]);
    stream.pop();
    let mut decoder = unsafe { Sleb128Decoder::new(stream.as_ptr() as usize, stream.len()) };
    assert_eq!(unsafe { decoder.next() }, Err(Errno::Format));
}

#[test]
fn sleb128_empty_window_is_format_error() {
    let stream: Vec<u8> = Vec::new();
    let mut decoder = unsafe { Sleb128Decoder::new(stream.as_ptr() as usize, 0) };
    assert_eq!(unsafe { decoder.next() }, Err(Errno::Format));
}

// 超长续传序列不触发移位溢出，多余数据位被丢弃
#[test]
fn sleb128_oversized_encoding_is_tolerated() {
    let mut stream = vec![0x80u8; 12];
    stream.push(0x00);
    let mut decoder = unsafe { Sleb128Decoder::new(stream.as_ptr() as usize, stream.len()) };
    assert_eq!(unsafe { decoder.next() }.unwrap(), 0);
}

#[test]
fn packed_zero_count_yields_nothing() {
    let stream = encode(&[0, 0]);
    let mut iter =
        unsafe { PackedRelocIterator::new(stream.as_ptr() as usize, stream.len(), true) }.unwrap();
    assert!(unsafe { iter.next() }.unwrap().is_none());
}

#[test]
fn packed_skips_empty_group() {
    let info = elf_r_info(5, R_GENERIC_GLOB_DAT) as i64;
    // 头部 {count=1, 初始 offset=0x100}，空分组 {0, 0}，随后分组 {1, 0}
    let stream = encode(&[1, 0x100, 0, 0, 1, 0, 0x10, info]);
    let mut iter =
        unsafe { PackedRelocIterator::new(stream.as_ptr() as usize, stream.len(), true) }.unwrap();

    let reloc = unsafe { iter.next() }.unwrap().unwrap();
    assert_eq!(reloc.r_offset, 0x110);
    assert_eq!(elf_r_sym(reloc.r_info), 5);
    assert!(unsafe { iter.next() }.unwrap().is_none());
}

#[test]
fn packed_grouped_addend_on_rel_is_format_error() {
    let stream = encode(&[1, 0, 1, HAS_ADDEND | GROUPED_BY_ADDEND, 16, 0, 0]);
    let mut iter =
        unsafe { PackedRelocIterator::new(stream.as_ptr() as usize, stream.len(), false) }.unwrap();
    assert!(matches!(unsafe { iter.next() }, Err(Errno::Format)));
}

#[test]
fn packed_grouped_info_and_offset_delta() {
    let info = elf_r_info(9, R_GENERIC_JUMP_SLOT) as i64;
    let stream = encode(&[3, 0x1000, 3, GROUPED_BY_INFO | GROUPED_BY_OFFSET_DELTA, 8, info]);
    let mut iter =
        unsafe { PackedRelocIterator::new(stream.as_ptr() as usize, stream.len(), false) }.unwrap();

    let mut offsets = Vec::new();
    while let Some(reloc) = unsafe { iter.next() }.unwrap() {
        assert_eq!(elf_r_sym(reloc.r_info), 9);
        assert_eq!(reloc.r_addend, 0);
        offsets.push(reloc.r_offset);
    }
    assert_eq!(offsets, [0x1008, 0x1010, 0x1018]);
}

#[test]
fn packed_rela_addend_accumulates_per_entry() {
    let info_a = elf_r_info(1, R_GENERIC_GLOB_DAT) as i64;
    let info_b = elf_r_info(2, R_GENERIC_ABS) as i64;
    let stream = encode(&[2, 0, 2, HAS_ADDEND, 8, info_a, 16, 8, info_b, -4]);
    let mut iter =
        unsafe { PackedRelocIterator::new(stream.as_ptr() as usize, stream.len(), true) }.unwrap();

    let first = unsafe { iter.next() }.unwrap().unwrap();
    assert_eq!((first.r_offset, first.r_addend), (8, 16));
    let second = unsafe { iter.next() }.unwrap().unwrap();
    assert_eq!((second.r_offset, second.r_addend), (16, 12));
    assert!(unsafe { iter.next() }.unwrap().is_none());
}

#[test]
fn packed_addend_resets_when_group_clears_flag() {
    let info = elf_r_info(1, R_GENERIC_GLOB_DAT) as i64;
    let stream = encode(&[
        2, 0, // 头部
        1, HAS_ADDEND, 8, info, 16, // 分组 1：addend 16
        1, 0, 8, info, // 分组 2：无 addend，累计值清零
    ]);
    let mut iter =
        unsafe { PackedRelocIterator::new(stream.as_ptr() as usize, stream.len(), true) }.unwrap();

    let first = unsafe { iter.next() }.unwrap().unwrap();
    assert_eq!(first.r_addend, 16);
    let second = unsafe { iter.next() }.unwrap().unwrap();
    assert_eq!(second.r_addend, 0);
}

// 解码结果与等价的未压缩 RELA 表逐条一致
#[test]
fn packed_matches_plain_iteration_of_equivalent_table() {
    let relas = [
        ElfRela {
            r_offset: 0x1000,
            r_info: elf_r_info(1, R_GENERIC_GLOB_DAT),
            r_addend: 8,
        },
        ElfRela {
            r_offset: 0x1008,
            r_info: elf_r_info(2, R_GENERIC_GLOB_DAT),
            r_addend: -4,
        },
        ElfRela {
            r_offset: 0x2000,
            r_info: elf_r_info(3, R_GENERIC_JUMP_SLOT),
            r_addend: 0,
        },
    ];

    let mut values: Vec<i64> = vec![relas.len() as i64, 0xff8, relas.len() as i64, HAS_ADDEND];
    let mut prev_offset: i64 = 0xff8;
    let mut prev_addend: i64 = 0;
    for rela in &relas {
        values.push(rela.r_offset as i64 - prev_offset);
        values.push(rela.r_info as i64);
        values.push(rela.r_addend as i64 - prev_addend);
        prev_offset = rela.r_offset as i64;
        prev_addend = rela.r_addend as i64;
    }
    let stream = encode(&values);

    let mut packed =
        unsafe { PackedRelocIterator::new(stream.as_ptr() as usize, stream.len(), true) }.unwrap();
    let mut plain = PlainRelocIterator::new(
        relas.as_ptr() as usize,
        std::mem::size_of_val(&relas),
        true,
    );

    loop {
        let from_packed = unsafe { packed.next() }.unwrap();
        let from_plain = unsafe { plain.next() };
        match (from_packed, from_plain) {
            (Some(a), Some(b)) => {
                assert_eq!(a.r_offset, b.r_offset);
                assert_eq!(a.r_info, b.r_info);
                assert_eq!(a.r_addend, b.r_addend);
            }
            (None, None) => break,
            _ => panic!("packed and plain iterations disagree in length"),
        }
    }
}
