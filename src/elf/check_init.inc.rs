// ELF header 校验与 Elf 描述符初始化，通过 include! 嵌入 elf.rs

// 校验内存中的 ELF header：magic、class、字节序、版本、类型与架构
pub unsafe fn check_elf_header(base_addr: usize) -> Result<(), Errno> {
    let ehdr = &*(base_addr as *const ElfEhdr);
    if ehdr.e_ident[..SELFMAG] != ELFMAG {
        return Err(Errno::Format);
    }
    if ehdr.e_ident[EI_CLASS] != EXPECTED_CLASS {
        return Err(Errno::Format);
    }
    if ehdr.e_ident[EI_DATA] != ELFDATA2LSB {
        return Err(Errno::Format);
    }
    if ehdr.e_ident[EI_VERSION] != EV_CURRENT {
        return Err(Errno::Format);
    }
    if ehdr.e_type != ET_EXEC && ehdr.e_type != ET_DYN {
        return Err(Errno::Format);
    }
    if ehdr.e_machine != EXPECTED_MACHINE {
        return Err(Errno::Format);
    }
    if ehdr.e_version as u8 != EV_CURRENT {
        return Err(Errno::Format);
    }

    Ok(())
}

impl Elf {
    // 解析内存映像，提取 dynamic section 中的符号表、重定位表与 hash 表
    pub unsafe fn init(base_addr: usize, pathname: &str) -> Result<Self, Errno> {
        if base_addr == 0 || pathname.is_empty() {
            return Err(Errno::Invalid);
        }

        check_elf_header(base_addr)?;

        let ehdr = base_addr as *const ElfEhdr;
        let phdr = (base_addr + (*ehdr).e_phoff as usize) as *const ElfPhdr;
        let phdrs = slice::from_raw_parts(phdr, (*ehdr).e_phnum as usize);

        // 第一个 PT_LOAD 段必须从文件偏移 0 映射，bias 为加载基址与虚拟地址的差值
        let phdr0 = phdrs
            .iter()
            .find(|ph| ph.p_type == PT_LOAD)
            .ok_or(Errno::Format)?;
        if phdr0.p_offset != 0 {
            return Err(Errno::Format);
        }
        if base_addr < phdr0.p_vaddr as usize {
            return Err(Errno::Format);
        }
        let bias_addr = base_addr - phdr0.p_vaddr as usize;

        let dhdr = phdrs
            .iter()
            .find(|ph| ph.p_type == PT_DYNAMIC)
            .ok_or(Errno::Format)?;

        let dyn_section = (bias_addr + dhdr.p_vaddr as usize) as *const ElfDyn;
        let dyn_sz = dhdr.p_memsz as usize;

        let mut elf = Elf {
            pathname: pathname.to_string(),
            base_addr,
            bias_addr,
            ehdr,
            phdr,
            dyn_section,
            dyn_sz,
            strtab: ptr::null(),
            symtab: ptr::null(),
            relplt: 0,
            relplt_sz: 0,
            reldyn: 0,
            reldyn_sz: 0,
            relandroid: 0,
            relandroid_sz: 0,
            bucket: ptr::null(),
            bucket_cnt: 0,
            chain: ptr::null(),
            chain_cnt: 0,
            bloom: ptr::null(),
            bloom_sz: 0,
            bloom_shift: 0,
            symoffset: 0,
            is_use_gnu_hash: false,
            is_use_rela: false,
        };

        // 遍历 dynamic section，提取各表地址和大小；虚拟地址经 bias 转为运行时地址
        let dyn_cnt = dyn_sz / mem::size_of::<ElfDyn>();
        let dyn_entries = slice::from_raw_parts(dyn_section, dyn_cnt);
        for dyn_entry in dyn_entries {
            match dyn_entry.d_tag {
                DT_NULL => break,
                DT_STRTAB => {
                    let table = (bias_addr + dyn_entry.d_un as usize) as *const c_char;
                    if (table as usize) < base_addr {
                        return Err(Errno::Format);
                    }
                    elf.strtab = table;
                }
                DT_SYMTAB => {
                    let table = (bias_addr + dyn_entry.d_un as usize) as *const ElfSym;
                    if (table as usize) < base_addr {
                        return Err(Errno::Format);
                    }
                    elf.symtab = table;
                }
                DT_PLTREL => {
                    elf.is_use_rela = dyn_entry.d_un as ElfSxword == DT_RELA;
                }
                DT_JMPREL => {
                    let table = bias_addr + dyn_entry.d_un as usize;
                    if table < base_addr {
                        return Err(Errno::Format);
                    }
                    elf.relplt = table;
                }
                DT_PLTRELSZ => {
                    elf.relplt_sz = dyn_entry.d_un as usize;
                }
                DT_REL | DT_RELA => {
                    let table = bias_addr + dyn_entry.d_un as usize;
                    if table < base_addr {
                        return Err(Errno::Format);
                    }
                    elf.reldyn = table;
                }
                DT_RELSZ | DT_RELASZ => {
                    elf.reldyn_sz = dyn_entry.d_un as usize;
                }
                DT_ANDROID_REL | DT_ANDROID_RELA => {
                    let table = bias_addr + dyn_entry.d_un as usize;
                    if table < base_addr {
                        return Err(Errno::Format);
                    }
                    elf.relandroid = table;
                }
                DT_ANDROID_RELSZ | DT_ANDROID_RELASZ => {
                    elf.relandroid_sz = dyn_entry.d_un as usize;
                }
                DT_HASH => {
                    // 已有 GNU hash 时跳过 SysV hash
                    if elf.is_use_gnu_hash {
                        continue;
                    }
                    let raw = (bias_addr + dyn_entry.d_un as usize) as *const u32;
                    if (raw as usize) < base_addr {
                        return Err(Errno::Format);
                    }
                    elf.bucket_cnt = *raw;
                    elf.chain_cnt = *raw.add(1);
                    elf.bucket = raw.add(2);
                    elf.chain = elf.bucket.add(elf.bucket_cnt as usize);
                }
                DT_GNU_HASH => {
                    // 布局：nbuckets | symoffset | bloom_sz | bloom_shift | bloom[] | buckets[] | chains[]
                    let raw = (bias_addr + dyn_entry.d_un as usize) as *const u32;
                    if (raw as usize) < base_addr {
                        return Err(Errno::Format);
                    }
                    elf.bucket_cnt = *raw;
                    elf.symoffset = *raw.add(1);
                    elf.bloom_sz = *raw.add(2);
                    elf.bloom_shift = *raw.add(3);
                    elf.bloom = raw.add(4) as *const usize;
                    elf.bucket = elf.bloom.add(elf.bloom_sz as usize) as *const u32;
                    elf.chain = elf.bucket.add(elf.bucket_cnt as usize);
                    elf.is_use_gnu_hash = true;
                }
                _ => {}
            }
        }

        // Android packed relocation 以 "APS2" 魔数开头，校验后剥离 4 字节头部
        if elf.relandroid != 0 {
            if elf.relandroid_sz < 4 {
                return Err(Errno::Format);
            }
            let magic = slice::from_raw_parts(elf.relandroid as *const u8, 4);
            if magic != [b'A', b'P', b'S', b'2'] {
                log::error(format_args!(
                    "android rel/rela format error: {}",
                    elf.pathname
                ));
                return Err(Errno::Format);
            }
            elf.relandroid += 4;
            elf.relandroid_sz -= 4;
        }

        elf.check()?;

        log::info(format_args!(
            "init OK: {} ({} {} PLT:{} DYN:{} ANDROID:{})",
            elf.pathname,
            if elf.is_use_rela { "RELA" } else { "REL" },
            if elf.is_use_gnu_hash {
                "GNU_HASH"
            } else {
                "ELF_HASH"
            },
            elf.relplt_sz,
            elf.reldyn_sz,
            elf.relandroid_sz
        ));

        Ok(elf)
    }

    // 将描述符清零，之后的 hook 调用以 ElfInit 拒绝
    pub fn reset(&mut self) {
        self.pathname.clear();
        self.base_addr = 0;
        self.bias_addr = 0;
        self.ehdr = ptr::null();
        self.phdr = ptr::null();
        self.dyn_section = ptr::null();
        self.dyn_sz = 0;
        self.strtab = ptr::null();
        self.symtab = ptr::null();
        self.relplt = 0;
        self.relplt_sz = 0;
        self.reldyn = 0;
        self.reldyn_sz = 0;
        self.relandroid = 0;
        self.relandroid_sz = 0;
        self.bucket = ptr::null();
        self.bucket_cnt = 0;
        self.chain = ptr::null();
        self.chain_cnt = 0;
        self.bloom = ptr::null();
        self.bloom_sz = 0;
        self.bloom_shift = 0;
        self.symoffset = 0;
        self.is_use_gnu_hash = false;
        self.is_use_rela = false;
    }

    // 校验初始化后的关键字段是否均已正确填充
    fn check(&self) -> Result<(), Errno> {
        if self.pathname.is_empty()
            || self.base_addr == 0
            || self.bias_addr == 0
            || self.ehdr.is_null()
            || self.phdr.is_null()
            || self.strtab.is_null()
            || self.symtab.is_null()
            || self.bucket.is_null()
            || self.chain.is_null()
        {
            return Err(Errno::Format);
        }
        if self.is_use_gnu_hash && self.bloom.is_null() {
            return Err(Errno::Format);
        }
        Ok(())
    }

    // 扫描 PT_LOAD 程序头，返回覆盖该地址的段保护位；段区间按页边界向外取整
    fn get_mem_access(&self, addr: usize) -> Result<u32, Errno> {
        let phdrs = unsafe { slice::from_raw_parts(self.phdr, (*self.ehdr).e_phnum as usize) };
        for phdr in phdrs {
            if phdr.p_type != PT_LOAD {
                continue;
            }
            let seg_start = self.bias_addr + phdr.p_vaddr as usize;
            let seg_end = seg_start.saturating_add(phdr.p_memsz as usize);
            if addr >= memory::page_start(seg_start) && addr < memory::page_end(seg_end) {
                return Ok(phdr.p_flags);
            }
        }
        Err(Errno::NotFound)
    }
}
