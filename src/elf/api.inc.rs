// 对外 API：PLT/GOT hook 与导出函数查找，通过 include! 嵌入 elf.rs

impl Elf {
    // 对指定符号执行 PLT/GOT hook，依次扫描 .rel(a).plt、.rel(a).dyn、packed android 表
    // 先解析出符号索引，再对每张表逐条匹配
    pub unsafe fn hook(
        &self,
        symbol: &str,
        new_func: *mut libc::c_void,
        old_func: *mut *mut libc::c_void,
    ) -> Result<(), Errno> {
        if self.base_addr == 0 {
            return Err(Errno::ElfInit);
        }
        if symbol.is_empty() || new_func.is_null() {
            return Err(Errno::Invalid);
        }

        log::info(format_args!("hooking {} in {}", symbol, self.pathname));

        let symidx = self.find_symidx_by_name(symbol)?;

        // .rel(a).plt：每个符号至多一个 JUMP_SLOT，命中即停
        if self.relplt != 0 {
            let section = if self.is_use_rela {
                ".rela.plt"
            } else {
                ".rel.plt"
            };
            let mut iter = PlainRelocIterator::new(self.relplt, self.relplt_sz, self.is_use_rela);
            let mut found = false;
            while let Some(reloc) = iter.next() {
                self.match_and_patch(
                    section,
                    true,
                    symbol,
                    new_func,
                    old_func,
                    symidx,
                    &reloc,
                    Some(&mut found),
                )?;
                if found {
                    break;
                }
            }
        }

        // .rel(a).dyn：GLOB_DAT / 绝对地址类型可能引用同一符号多次，全部改写
        if self.reldyn != 0 {
            let section = if self.is_use_rela {
                ".rela.dyn"
            } else {
                ".rel.dyn"
            };
            let mut iter = PlainRelocIterator::new(self.reldyn, self.reldyn_sz, self.is_use_rela);
            while let Some(reloc) = iter.next() {
                self.match_and_patch(
                    section, false, symbol, new_func, old_func, symidx, &reloc, None,
                )?;
            }
        }

        // packed android 表同样全量扫描
        if self.relandroid != 0 {
            let section = if self.is_use_rela {
                ".rela.android"
            } else {
                ".rel.android"
            };
            let mut iter =
                PackedRelocIterator::new(self.relandroid, self.relandroid_sz, self.is_use_rela)?;
            while let Some(reloc) = iter.next()? {
                self.match_and_patch(
                    section, false, symbol, new_func, old_func, symidx, &reloc, None,
                )?;
            }
        }

        Ok(())
    }

    // 通过符号名查找导出函数的运行时地址，未定义或值为 0 时返回 None
    pub fn find_export_function(&self, symbol: &str) -> Option<usize> {
        if self.base_addr == 0 {
            return None;
        }
        let symidx = self.find_symidx_by_name(symbol).ok()?;
        unsafe {
            let sym = &*self.symtab.add(symidx as usize);
            if sym.st_shndx == SHN_UNDEF || sym.st_value == 0 {
                return None;
            }
            Some(self.bias_addr + sym.st_value as usize)
        }
    }
}
