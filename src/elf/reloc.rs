// 重定位条目的通用视图：r_info 拆分与普通 REL/RELA 表迭代器

use super::{ElfRel, ElfRela, ElfXword};
use std::mem;

// 统一的逻辑重定位条目，普通表与 packed 表共用
#[derive(Clone, Copy)]
pub(super) struct Reloc {
    pub(super) r_offset: usize,
    pub(super) r_info: ElfXword,
    pub(super) r_addend: isize,
}

// 提取符号索引与重定位类型，两种 ELF class 的拆分位宽不同
#[cfg(target_pointer_width = "64")]
pub(super) fn elf_r_sym(info: ElfXword) -> u32 {
    (info >> 32) as u32
}

#[cfg(target_pointer_width = "64")]
pub(super) fn elf_r_type(info: ElfXword) -> u32 {
    (info & 0xffff_ffff) as u32
}

#[cfg(target_pointer_width = "64")]
pub(super) fn elf_r_info(sym: u32, r_type: u32) -> ElfXword {
    ((sym as ElfXword) << 32) | r_type as ElfXword
}

#[cfg(target_pointer_width = "32")]
pub(super) fn elf_r_sym(info: ElfXword) -> u32 {
    info >> 8
}

#[cfg(target_pointer_width = "32")]
pub(super) fn elf_r_type(info: ElfXword) -> u32 {
    info & 0xff
}

#[cfg(target_pointer_width = "32")]
pub(super) fn elf_r_info(sym: u32, r_type: u32) -> ElfXword {
    (sym << 8) | (r_type & 0xff)
}

// 普通 .rel(a).plt / .rel(a).dyn 迭代器，把字节窗口视为定宽记录数组
pub(super) struct PlainRelocIterator {
    cur: *const u8,
    end: *const u8,
    is_use_rela: bool,
}

impl PlainRelocIterator {
    pub(super) fn new(addr: usize, size: usize, is_use_rela: bool) -> Self {
        let cur = addr as *const u8;
        Self {
            cur,
            end: cur.wrapping_add(size),
            is_use_rela,
        }
    }

    // 产出游标处的记录再前进一条，首次调用返回表中第一条
    pub(super) unsafe fn next(&mut self) -> Option<Reloc> {
        if self.cur >= self.end {
            return None;
        }

        let (reloc, entry_sz) = if self.is_use_rela {
            let rela = &*(self.cur as *const ElfRela);
            (
                Reloc {
                    r_offset: rela.r_offset as usize,
                    r_info: rela.r_info,
                    r_addend: rela.r_addend as isize,
                },
                mem::size_of::<ElfRela>(),
            )
        } else {
            let rel = &*(self.cur as *const ElfRel);
            (
                Reloc {
                    r_offset: rel.r_offset as usize,
                    r_info: rel.r_info,
                    r_addend: 0,
                },
                mem::size_of::<ElfRel>(),
            )
        };

        self.cur = self.cur.add(entry_sz);
        Some(reloc)
    }
}
